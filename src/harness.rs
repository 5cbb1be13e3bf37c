//! End-to-end benchmark orchestration.
//!
//! Backend configuration rewrites the graph definitions, inputs populate the
//! tensor store, the execution loop runs the net against the store, and the
//! requested outputs are read back from the store.

use crate::accelerator::Accelerator;
use crate::backend::configure_backend;
use crate::config::HarnessConfig;
use crate::errors::{HarnessError, HarnessResult};
use crate::execution_loop::{ExecutionLoop, RunSummary};
use crate::graph_definition::GraphDefinition;
use crate::input_materializer::load_inputs;
use crate::net::NetFactory;
use crate::observer::{NoopObserver, ObserverConfig};
use crate::output_writer::write_outputs;
use crate::tensor_store::TensorStore;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a benchmark invocation.
#[derive(Debug)]
pub struct BenchmarkReport {
    pub summary: RunSummary,
    pub written_outputs: Vec<PathBuf>,
    pub store: TensorStore,
}

/// Loads the graph definitions named in `config` and runs the benchmark.
pub fn run_benchmark(
    config: &HarnessConfig,
    accelerator: Arc<dyn Accelerator>,
    factory: &dyn NetFactory,
    observers: ObserverConfig,
) -> HarnessResult<BenchmarkReport> {
    let net = GraphDefinition::load(Path::new(&config.net))?;
    let init_net = if config.init_net.is_empty() {
        None
    } else {
        Some(GraphDefinition::load(Path::new(&config.init_net))?)
    };
    run_definitions(config, net, init_net, accelerator, factory, observers)
}

/// Runs the benchmark on already parsed graph definitions.
pub fn run_definitions(
    config: &HarnessConfig,
    mut net: GraphDefinition,
    init_net: Option<GraphDefinition>,
    accelerator: Arc<dyn Accelerator>,
    factory: &dyn NetFactory,
    observers: ObserverConfig,
) -> HarnessResult<BenchmarkReport> {
    let descriptors = config.input_descriptors().resolve()?;
    let output_request = config.output_request();

    let selection = configure_backend(&mut net, &config.backend, accelerator.as_ref())?;
    let mut store = TensorStore::new();

    if let Some(mut init_net) = init_net {
        selection.apply(&mut init_net);
        init_net.ensure_name("init");
        let name = init_net.name_or_default().to_string();
        info!("Running init net '{}'.", name);
        let mut init = factory.create_net(&init_net, &mut store)?;
        init.run(&mut store, &mut NoopObserver)
            .map_err(|e| HarnessError::InitRunFailed {
                net: name,
                message: e.to_string(),
            })?;
    }

    load_inputs(
        &mut store,
        &descriptors,
        selection.runs_on_accelerator(),
        &accelerator,
    )?;

    let summary = {
        let mut execution = ExecutionLoop::new(
            &mut net,
            &mut store,
            factory,
            observers,
            config.loop_settings(),
        )?;
        execution.run()?
    };

    let written_outputs = write_outputs(&store, &output_request, accelerator.as_ref())?;

    Ok(BenchmarkReport {
        summary,
        written_outputs,
        store,
    })
}
