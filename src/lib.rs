//! Operation dependency graphs for package-repository access traces.
//!
//! - `graph`: the in-memory model (operations, nodes, the append-only graph)
//! - `codec`: the on-disk envelope plus the operation field mapping
//! - `render`: Graphviz export

pub mod codec;
pub mod error;
pub mod graph;
pub mod render;

pub use codec::{OperationGraphCodec, WriteOptions};
pub use error::{GraphError, Result};
pub use graph::{Operation, OperationGraph, OperationNode, OperationType, OperationTypes};
