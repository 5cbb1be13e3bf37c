//! Run observation and sampling-rate control.
//!
//! [`ObserverConfig`] is handed to the execution loop explicitly. It owns the
//! [`SampleRateState`] the loop updates before every run, and the observer
//! that consumes that state. Runs are strictly sequential, so the state needs
//! no synchronisation.

use crate::graph_definition::OperatorRecord;
use log::info;
use std::time::{Duration, Instant};

/// Sampling configuration in effect for the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleRateState {
    /// Set while the net is warming up; such runs are not sampled.
    pub warming_up: bool,
    /// Collect per-operator timing in addition to net latency.
    pub per_operator: bool,
    /// Index of the measured iteration the next run belongs to.
    pub measured_run: usize,
    /// Number of warmup iterations preceding the measured runs.
    pub skip_iters: usize,
}

/// Receives run and operator lifecycle events.
///
/// Nets call the operator hooks; the execution loop calls the run hooks.
pub trait NetObserver {
    fn on_run_start(&mut self, _net_name: &str, _state: &SampleRateState) {}

    fn on_operator_start(&mut self, _index: usize, _op: &OperatorRecord) {}

    fn on_operator_stop(&mut self, _index: usize, _op: &OperatorRecord) {}

    fn on_run_stop(&mut self, _net_name: &str, _state: &SampleRateState, _succeeded: bool) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl NetObserver for NoopObserver {}

/// Sampling state plus the observer attached to the benchmarked net.
pub struct ObserverConfig {
    state: SampleRateState,
    observer: Box<dyn NetObserver>,
}

impl ObserverConfig {
    pub fn new(observer: Box<dyn NetObserver>) -> Self {
        Self {
            state: SampleRateState::default(),
            observer,
        }
    }

    /// Configuration with a [`PerfObserver`] reporting to `reporter`.
    pub fn with_perf_reporter(reporter: Box<dyn PerfReporter>) -> Self {
        Self::new(Box::new(PerfObserver::new(reporter)))
    }

    pub fn state(&self) -> &SampleRateState {
        &self.state
    }

    /// Initial configuration installed before the warmup runs.
    pub fn set_baseline(&mut self, run_individual: bool, warmup: usize) {
        self.state = SampleRateState {
            warming_up: true,
            per_operator: run_individual,
            measured_run: 0,
            skip_iters: warmup,
        };
    }

    /// Aggregate timing only, for measured run `index`.
    pub fn set_coarse(&mut self, index: usize) {
        self.state.warming_up = false;
        self.state.per_operator = false;
        self.state.measured_run = index;
    }

    /// Per-operator timing, for the replay of measured run `index`.
    pub fn set_fine(&mut self, index: usize) {
        self.state.warming_up = false;
        self.state.per_operator = true;
        self.state.measured_run = index;
    }

    pub fn observer_mut(&mut self) -> &mut dyn NetObserver {
        self.observer.as_mut()
    }

    pub fn start_run(&mut self, net_name: &str) {
        self.observer.on_run_start(net_name, &self.state);
    }

    pub fn stop_run(&mut self, net_name: &str, succeeded: bool) {
        self.observer.on_run_stop(net_name, &self.state, succeeded);
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self::new(Box::new(NoopObserver))
    }
}

/// Timing of one operator within a fine-profile run.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorPerfSample {
    pub index: usize,
    pub op_type: String,
    pub name: Option<String>,
    pub latency: Duration,
}

/// Timing of one sampled run.
#[derive(Debug, Clone, PartialEq)]
pub struct NetPerfSample {
    pub net_name: String,
    pub measured_run: usize,
    pub per_operator: bool,
    pub latency: Duration,
    pub operators: Vec<OperatorPerfSample>,
}

impl NetPerfSample {
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1_000.0
    }
}

/// Destination for perf samples.
pub trait PerfReporter {
    fn report(&mut self, sample: &NetPerfSample);
}

/// Reporter that logs each sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl PerfReporter for LogReporter {
    fn report(&mut self, sample: &NetPerfSample) {
        if sample.per_operator {
            info!(
                "Net '{}' run {} (per operator): {:.3} ms",
                sample.net_name,
                sample.measured_run,
                sample.latency_ms()
            );
            for op in &sample.operators {
                info!(
                    "   [{}] {}: {:.3} ms",
                    op.index,
                    op.name.as_deref().unwrap_or(&op.op_type),
                    op.latency.as_secs_f64() * 1_000.0
                );
            }
        } else {
            info!(
                "Net '{}' run {}: {:.3} ms",
                sample.net_name,
                sample.measured_run,
                sample.latency_ms()
            );
        }
    }
}

/// Observer timing every non-warmup run, and every operator of fine runs.
pub struct PerfObserver {
    reporter: Box<dyn PerfReporter>,
    run_state: Option<SampleRateState>,
    run_start: Option<Instant>,
    operator_start: Option<Instant>,
    operators: Vec<OperatorPerfSample>,
}

impl PerfObserver {
    pub fn new(reporter: Box<dyn PerfReporter>) -> Self {
        Self {
            reporter,
            run_state: None,
            run_start: None,
            operator_start: None,
            operators: Vec::new(),
        }
    }

    fn sampling_operators(&self) -> bool {
        self.run_state.is_some_and(|state| state.per_operator)
    }
}

impl NetObserver for PerfObserver {
    fn on_run_start(&mut self, _net_name: &str, state: &SampleRateState) {
        self.operators.clear();
        if state.warming_up {
            self.run_state = None;
            self.run_start = None;
            return;
        }
        self.run_state = Some(*state);
        self.run_start = Some(Instant::now());
    }

    fn on_operator_start(&mut self, _index: usize, _op: &OperatorRecord) {
        if self.sampling_operators() {
            self.operator_start = Some(Instant::now());
        }
    }

    fn on_operator_stop(&mut self, index: usize, op: &OperatorRecord) {
        if !self.sampling_operators() {
            return;
        }
        if let Some(start) = self.operator_start.take() {
            self.operators.push(OperatorPerfSample {
                index,
                op_type: op.op_type.clone(),
                name: op.name.clone(),
                latency: start.elapsed(),
            });
        }
    }

    fn on_run_stop(&mut self, net_name: &str, _state: &SampleRateState, succeeded: bool) {
        let (Some(state), Some(start)) = (self.run_state.take(), self.run_start.take()) else {
            return;
        };
        if !succeeded {
            return;
        }
        let sample = NetPerfSample {
            net_name: net_name.to_string(),
            measured_run: state.measured_run,
            per_operator: state.per_operator,
            latency: start.elapsed(),
            operators: std::mem::take(&mut self.operators),
        };
        self.reporter.report(&sample);
    }
}
