use crate::graph::OperationType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// A dependency points at a node that does not exist yet.
    #[error("dependency index {index} is out of range (graph has {count} nodes)")]
    InvalidReference { index: usize, count: usize },

    #[error("malformed graph file: {0}")]
    MalformedFormat(String),

    #[error("node {node} has no 't' property")]
    MissingDiscriminant { node: usize },

    #[error("node {node} has unknown operation type '{name}'")]
    UnknownDiscriminant { node: usize, name: String },

    #[error("node {node} ({operation_type}) is missing required property '{field}'")]
    MissingField {
        node: usize,
        operation_type: OperationType,
        field: &'static str,
    },

    /// The codec's type table does not cover this operation type.
    #[error("operation type {0} is not supported")]
    UnsupportedOperation(OperationType),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    pub fn malformed<E: std::fmt::Display>(e: E) -> Self {
        Self::MalformedFormat(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            serde_json::error::Category::Io => Self::Io(e.into()),
            _ => Self::malformed(e),
        }
    }
}
