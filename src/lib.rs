//! Benchmark harness for precompiled computational graphs.
//!
//! The harness loads a graph definition, selects the backend engine and device
//! for its operators, materializes the declared input tensors, runs warmup and
//! measured iterations with optional per-operator sampling, and writes the
//! requested output tensors in binary or text form.

pub mod accelerator;
pub mod backend;
pub mod blob_serialization;
pub mod config;
pub mod errors;
pub mod execution_loop;
pub mod graph_definition;
pub mod harness;
pub mod input_materializer;
pub mod net;
pub mod observer;
pub mod output_writer;
pub mod reference_engine;
pub mod tensor;
pub mod tensor_store;

pub use accelerator::{Accelerator, NoAccelerator, default_accelerator};
pub use backend::{Backend, BackendSelection, Engine, configure_backend};
pub use config::{ConfigLoader, HarnessConfig};
pub use errors::{HarnessError, HarnessResult};
pub use execution_loop::{ExecutionLoop, LoopSettings, LoopState, RunSummary};
pub use graph_definition::{DeviceType, GraphDefinition, OperatorRecord};
pub use harness::{BenchmarkReport, run_benchmark, run_definitions};
pub use input_materializer::{InputDescriptor, InputDescriptors, InputSource, load_inputs};
pub use net::{Net, NetFactory};
pub use observer::{LogReporter, NetObserver, ObserverConfig, PerfObserver, SampleRateState};
pub use output_writer::{OutputFormat, OutputRequest, OutputSelection, write_outputs};
pub use reference_engine::ReferenceNetFactory;
pub use tensor::{DataType, HostTensor, Residency, Tensor, TensorData, TensorOps};
pub use tensor_store::{Blob, TensorStore};
