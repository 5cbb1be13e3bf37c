//! Backend configuration against graph definitions.

mod common;

use common::FakeAccelerator;
use graphbench::accelerator::NoAccelerator;
use graphbench::backend::{Backend, configure_backend};
use graphbench::errors::HarnessError;
use graphbench::graph_definition::{DeviceType, GraphDefinition, OperatorRecord};

fn two_op_graph() -> GraphDefinition {
    let mut tuned = OperatorRecord::new("Relu", &["h"], &["y"]);
    tuned.engine = Some("CUSTOM".to_string());
    GraphDefinition::new(
        Some("graph"),
        vec![OperatorRecord::new("Copy", &["x"], &["h"]), tuned],
    )
}

#[cfg(test)]
mod backend_tests {
    use super::*;

    #[test]
    fn test_every_host_backend_stamps_cpu() {
        for name in ["builtin", "nnpack", "eigen", "mkl", "default"] {
            let mut graph = two_op_graph();
            let selection = configure_backend(&mut graph, name, &NoAccelerator).unwrap();
            assert!(!selection.runs_on_accelerator());
            assert!(
                graph.ops.iter().all(|op| op.device_type == DeviceType::Cpu),
                "backend {}",
                name
            );
        }
    }

    #[test]
    fn test_builtin_keeps_operator_engines() {
        let mut graph = two_op_graph();
        configure_backend(&mut graph, "builtin", &NoAccelerator).unwrap();
        assert_eq!(graph.ops[0].engine, None);
        assert_eq!(graph.ops[1].engine.as_deref(), Some("CUSTOM"));
    }

    #[test]
    fn test_engine_tags_overwrite_every_operator() {
        let cases = [
            ("nnpack", "NNPACK"),
            ("eigen", "EIGEN"),
            ("mkl", "MKLDNN"),
            ("default", ""),
        ];
        for (name, tag) in cases {
            let mut graph = two_op_graph();
            configure_backend(&mut graph, name, &NoAccelerator).unwrap();
            assert!(
                graph.ops.iter().all(|op| op.engine.as_deref() == Some(tag)),
                "backend {}",
                name
            );
        }
    }

    #[test]
    fn test_cuda_with_accelerator() {
        let accelerator = FakeAccelerator::available();
        let mut graph = two_op_graph();
        let selection = configure_backend(&mut graph, "cuda", accelerator.as_ref()).unwrap();
        assert_eq!(selection.backend, Backend::Cuda);
        assert!(selection.runs_on_accelerator());
        for op in &graph.ops {
            assert_eq!(op.device_type, DeviceType::Cuda);
            assert_eq!(op.engine.as_deref(), Some("CUDA"));
        }
    }

    #[test]
    fn test_cuda_without_support_leaves_graph_untouched() {
        let original = two_op_graph();

        let mut graph = original.clone();
        let result = configure_backend(&mut graph, "cuda", &NoAccelerator);
        assert!(matches!(result, Err(HarnessError::AcceleratorNotCompiled)));
        assert_eq!(graph, original);

        let accelerator = FakeAccelerator::without_device();
        let result = configure_backend(&mut graph, "cuda", accelerator.as_ref());
        assert!(matches!(result, Err(HarnessError::AcceleratorNotPresent)));
        assert_eq!(graph, original);
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let mut graph = two_op_graph();
        let err = configure_backend(&mut graph, "opencl", &NoAccelerator).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, HarnessError::UnsupportedBackend { backend } if backend == "opencl"));
        assert_eq!(graph, two_op_graph());
    }
}
