//! The execution engine seam.
//!
//! The harness treats a net as an opaque "run the graph once" capability and
//! a factory that instantiates nets from graph definitions.

use crate::errors::HarnessResult;
use crate::graph_definition::GraphDefinition;
use crate::observer::NetObserver;
use crate::tensor_store::TensorStore;

/// A runnable instance of a graph definition.
pub trait Net {
    fn name(&self) -> &str;

    /// Executes every operator once against `store`, reporting each operator
    /// to `observer`.
    fn run(&mut self, store: &mut TensorStore, observer: &mut dyn NetObserver)
    -> HarnessResult<()>;
}

/// Creates nets from graph definitions.
pub trait NetFactory {
    fn create_net(
        &self,
        definition: &GraphDefinition,
        store: &mut TensorStore,
    ) -> HarnessResult<Box<dyn Net>>;
}
