//! Warmup and measured execution of a benchmarked net.
//!
//! The loop moves strictly forward through `Created -> WarmingUp -> Measuring
//! -> Done`; a failed run ends it in `Failed`. Both end states are final.
//! Every measured iteration runs the net once with the coarse
//! sampling profile; when per-operator reporting is requested the same
//! iteration is replayed once more with the fine profile, so per-operator
//! overhead never lands in the coarse timings.

use crate::errors::{HarnessError, HarnessResult};
use crate::graph_definition::GraphDefinition;
use crate::net::{Net, NetFactory};
use crate::observer::ObserverConfig;
use crate::tensor_store::TensorStore;
use log::{debug, info};
use std::time::{Duration, Instant};

/// Name given to graph definitions that have none.
pub const DEFAULT_NET_NAME: &str = "benchmark";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Created,
    WarmingUp,
    Measuring,
    Done,
    Failed,
}

/// Iteration counts and sampling options of a benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub warmup: i64,
    pub iter: i64,
    pub run_individual: bool,
}

/// Counts and timings of a completed benchmark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub warmup_runs: usize,
    pub measured_runs: usize,
    pub operator_runs: usize,
    /// Total latency of the coarse measured runs.
    pub measured_time: Duration,
}

impl RunSummary {
    /// Number of times the net was run.
    pub fn total_runs(&self) -> usize {
        self.warmup_runs + self.measured_runs + self.operator_runs
    }

    pub fn average_time_ms(&self) -> f64 {
        if self.measured_runs == 0 {
            return 0.0;
        }
        self.measured_time.as_secs_f64() * 1_000.0 / self.measured_runs as f64
    }
}

/// Drives warmup and measured runs of one net against a tensor store.
pub struct ExecutionLoop<'a> {
    net: Box<dyn Net>,
    store: &'a mut TensorStore,
    observers: ObserverConfig,
    settings: LoopSettings,
    state: LoopState,
    summary: RunSummary,
}

impl<'a> ExecutionLoop<'a> {
    /// Names the definition if needed and instantiates its net.
    pub fn new(
        definition: &mut GraphDefinition,
        store: &'a mut TensorStore,
        factory: &dyn NetFactory,
        observers: ObserverConfig,
        settings: LoopSettings,
    ) -> HarnessResult<Self> {
        definition.ensure_name(DEFAULT_NET_NAME);
        let net = factory.create_net(definition, store)?;

        Ok(Self {
            net,
            store,
            observers,
            settings,
            state: LoopState::Created,
            summary: RunSummary::default(),
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn net_name(&self) -> &str {
        self.net.name()
    }

    /// Runs the warmup iterations, then the measured iterations.
    ///
    /// Any failed run aborts the benchmark and leaves the loop `Failed`; it
    /// cannot be run again. Once done, further calls return the recorded
    /// summary without running the net again.
    pub fn run(&mut self) -> HarnessResult<RunSummary> {
        match self.state {
            LoopState::Created => {}
            LoopState::Done => return Ok(self.summary.clone()),
            LoopState::WarmingUp | LoopState::Measuring | LoopState::Failed => {
                return Err(HarnessError::LoopAlreadyFailed);
            }
        }

        info!("Starting benchmark.");
        // A negative warmup count runs no warmup iterations.
        let warmup = usize::try_from(self.settings.warmup).unwrap_or(0);
        self.observers
            .set_baseline(self.settings.run_individual, warmup);

        if let Err(e) = self.run_phases(warmup) {
            self.transition(LoopState::Failed);
            return Err(e);
        }

        self.transition(LoopState::Done);
        info!(
            "Finished {} main runs, average {:.3} ms",
            self.summary.measured_runs,
            self.summary.average_time_ms()
        );
        Ok(self.summary.clone())
    }

    fn run_phases(&mut self, warmup: usize) -> HarnessResult<()> {
        self.transition(LoopState::WarmingUp);
        self.warm_up(warmup)?;

        self.transition(LoopState::Measuring);
        self.measure()
    }

    fn transition(&mut self, next: LoopState) {
        debug!("Execution loop {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn warm_up(&mut self, warmup: usize) -> HarnessResult<()> {
        info!("Running warmup runs.");
        for index in 0..warmup {
            self.run_once()
                .map_err(|e| HarnessError::WarmupRunFailed {
                    index,
                    message: e.to_string(),
                })?;
            self.summary.warmup_runs += 1;
        }
        Ok(())
    }

    fn measure(&mut self) -> HarnessResult<()> {
        info!("Main runs.");
        let iter = usize::try_from(self.settings.iter).map_err(|_| {
            HarnessError::NegativeIterationCount {
                iter: self.settings.iter,
            }
        })?;

        for index in 0..iter {
            self.observers.set_coarse(index);
            let start = Instant::now();
            self.run_once()
                .map_err(|e| HarnessError::MainRunFailed {
                    index,
                    message: e.to_string(),
                })?;
            self.summary.measured_time += start.elapsed();
            self.summary.measured_runs += 1;

            if self.settings.run_individual {
                self.observers.set_fine(index);
                self.run_once()
                    .map_err(|e| HarnessError::OperatorRunFailed {
                        index,
                        message: e.to_string(),
                    })?;
                self.summary.operator_runs += 1;
            }
        }
        Ok(())
    }

    fn run_once(&mut self) -> HarnessResult<()> {
        let name = self.net.name().to_string();
        self.observers.start_run(&name);
        let result = self
            .net
            .run(self.store, self.observers.observer_mut());
        self.observers.stop_run(&name, result.is_ok());
        result
    }
}
