//! Benchmark CLI executable.

use clap::Parser;
use graphbench::{
    ConfigLoader, HarnessConfig, HarnessResult, LogReporter, ObserverConfig,
    ReferenceNetFactory, default_accelerator, run_benchmark,
};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "graphbench", version, about = "Benchmark a precompiled graph")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Graph definition to benchmark
    #[arg(long)]
    net: Option<String>,

    /// Graph run once before benchmarking to initialise parameters
    #[arg(long)]
    init_net: Option<String>,

    /// builtin, nnpack, eigen, mkl, cuda or default
    #[arg(long)]
    backend: Option<String>,

    /// Comma-separated input blob names
    #[arg(long)]
    input: Option<String>,

    /// Comma-separated serialized blob files, one per input
    #[arg(long)]
    input_file: Option<String>,

    /// Semicolon-separated dimension groups, e.g. "1,3,224,224;1"
    #[arg(long)]
    input_dims: Option<String>,

    /// Semicolon-separated element types: uint8_t or float
    #[arg(long)]
    input_type: Option<String>,

    /// Comma-separated output blob names, or "*" for every blob
    #[arg(long)]
    output: Option<String>,

    /// Directory prefix for output files
    #[arg(long)]
    output_folder: Option<String>,

    /// Write outputs as text instead of serialized blobs
    #[arg(long)]
    text_output: bool,

    /// Number of warmup runs
    #[arg(long, allow_negative_numbers = true)]
    warmup: Option<i64>,

    /// Number of measured runs
    #[arg(long, allow_negative_numbers = true)]
    iter: Option<i64>,

    /// Replay every measured run with per-operator timing
    #[arg(long)]
    run_individual: bool,
}

impl Cli {
    fn into_config(self) -> HarnessResult<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load(path)?,
            None => HarnessConfig::default(),
        };

        let overrides = [
            (self.net, &mut config.net),
            (self.init_net, &mut config.init_net),
            (self.backend, &mut config.backend),
            (self.input, &mut config.input),
            (self.input_file, &mut config.input_file),
            (self.input_dims, &mut config.input_dims),
            (self.input_type, &mut config.input_type),
            (self.output, &mut config.output),
            (self.output_folder, &mut config.output_folder),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(warmup) = self.warmup {
            config.warmup = warmup;
        }
        if let Some(iter) = self.iter {
            config.iter = iter;
        }
        config.text_output |= self.text_output;
        config.run_individual |= self.run_individual;

        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("Benchmark execution failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> HarnessResult<()> {
    let config = Cli::parse().into_config()?;
    let accelerator = default_accelerator();
    let factory = ReferenceNetFactory::new(accelerator.clone());
    let observers = ObserverConfig::with_perf_reporter(Box::new(LogReporter));

    let report = run_benchmark(&config, accelerator, &factory, observers)?;

    info!("{}", "=".repeat(80));
    info!(
        "Runs: {} warmup, {} main, {} per operator",
        report.summary.warmup_runs, report.summary.measured_runs, report.summary.operator_runs
    );
    info!(
        "Main runs average: {:.3} ms",
        report.summary.average_time_ms()
    );
    for path in &report.written_outputs {
        info!("Output written to {}", path.display());
    }
    info!("{}", "=".repeat(80));
    Ok(())
}
