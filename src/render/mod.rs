//! Static diagram output for visual inspection.

pub mod graphviz;

pub use graphviz::{render_graphviz, write_graphviz, write_graphviz_file};
