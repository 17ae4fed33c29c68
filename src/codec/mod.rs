//! Generic graph file envelope.
//!
//! JSON shape:
//! {
//!   ...header properties...,     // reserved, written by the format's header hook
//!   "nodes": [
//!     { ...domain properties..., "e": [0, 3] },   // "e" omitted when empty
//!     ...
//!   ]
//! }
//!
//! The engine owns `nodes` and `e`; everything else is filled in by a
//! [`GraphFormat`]. Unknown properties are ignored on read.

pub mod operation;

pub use operation::OperationGraphCodec;

use crate::{GraphError, Result};

use serde::Deserialize;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Envelope key holding the node array.
pub const NODES_KEY: &str = "nodes";
/// Node key holding the dependency indices.
pub const EDGES_KEY: &str = "e";

pub trait GraphNode {
    fn depends_on(&self) -> &[usize];
}

/// A graph the engine can walk on write and build up on read.
pub trait Graph: Default {
    type Node: GraphNode;
    /// Domain part of a node, as produced by [`GraphFormat::read_node`].
    type Item;

    fn nodes(&self) -> &[Self::Node];

    /// Add a node; must reject dependencies that do not refer to existing nodes.
    fn insert(&mut self, item: Self::Item, depends_on: Vec<usize>) -> Result<usize>;
}

/// Domain hooks filled in by a concrete codec.
pub trait GraphFormat {
    type Graph: Graph;

    fn write_header(&self, _graph: &Self::Graph, _header: &mut FieldWriter) -> Result<()> {
        Ok(())
    }

    fn write_node(
        &self,
        node: &<Self::Graph as Graph>::Node,
        fields: &mut FieldWriter,
    ) -> Result<()>;

    fn read_header(&self, _header: &Map<String, Value>, _graph: &mut Self::Graph) -> Result<()> {
        Ok(())
    }

    /// Parse one node object. Edges found under `e` go into `depends_on`
    /// (see [`read_edges`]).
    fn read_node(
        &self,
        index: usize,
        fields: &Map<String, Value>,
        depends_on: &mut Vec<usize>,
    ) -> Result<<Self::Graph as Graph>::Item>;
}

/// Ordered property list; serialized as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldWriter {
    entries: Vec<(&'static str, Value)>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: &'static str, value: impl Into<Value>) {
        self.entries.push((name, value.into()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| *n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FieldWriter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct EnvelopeOut<'a> {
    header: &'a FieldWriter,
    nodes: &'a [FieldWriter],
}

impl Serialize for EnvelopeOut<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.header.entries.len() + 1))?;
        for (name, value) in &self.header.entries {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(NODES_KEY, self.nodes)?;
        map.end()
    }
}

#[derive(Debug, Deserialize)]
struct EnvelopeIn {
    #[serde(flatten)]
    header: Map<String, Value>,
    nodes: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indent the output. The compact form is the canonical one.
    pub pretty: bool,
}

/// Serialize `graph` into `writer`.
///
/// All hooks run before the first byte is written, so a failing hook never
/// leaves a partial document behind.
pub fn write_to<F, W>(writer: W, graph: &F::Graph, format: &F, options: WriteOptions) -> Result<()>
where
    F: GraphFormat,
    W: Write,
{
    let mut header = FieldWriter::new();
    format.write_header(graph, &mut header)?;
    if header.contains(NODES_KEY) {
        return Err(GraphError::malformed(
            "header hook wrote the reserved 'nodes' property",
        ));
    }

    let mut nodes = Vec::with_capacity(graph.nodes().len());
    for node in graph.nodes() {
        let mut fields = FieldWriter::new();
        format.write_node(node, &mut fields)?;
        if fields.contains(EDGES_KEY) {
            return Err(GraphError::malformed(
                "node hook wrote the reserved 'e' property",
            ));
        }

        let depends_on = node.depends_on();
        if !depends_on.is_empty() {
            fields.put(EDGES_KEY, depends_on.to_vec());
        }
        nodes.push(fields);
    }

    let envelope = EnvelopeOut {
        header: &header,
        nodes: &nodes,
    };

    let mut writer = BufWriter::new(writer);
    if options.pretty {
        serde_json::to_writer_pretty(&mut writer, &envelope)?;
    } else {
        serde_json::to_writer(&mut writer, &envelope)?;
    }
    writer.flush()?;

    debug!(nodes = nodes.len(), "graph serialized");
    Ok(())
}

/// Parse a whole graph from `reader`. Either the complete graph is returned or
/// an error; there is no partial result.
pub fn read_from<F, R>(reader: R, format: &F) -> Result<F::Graph>
where
    F: GraphFormat,
    R: Read,
{
    let envelope: EnvelopeIn = serde_json::from_reader(BufReader::new(reader))?;

    let mut graph = F::Graph::default();
    format.read_header(&envelope.header, &mut graph)?;

    for (index, fields) in envelope.nodes.iter().enumerate() {
        let mut depends_on = Vec::new();
        let item = format.read_node(index, fields, &mut depends_on)?;
        graph.insert(item, depends_on)?;
    }

    debug!(nodes = envelope.nodes.len(), "graph deserialized");
    Ok(graph)
}

/// Write `graph` to `path`. The file only appears once fully written.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn write_to_file<F: GraphFormat>(
    path: impl AsRef<Path>,
    graph: &F::Graph,
    format: &F,
    options: WriteOptions,
) -> Result<()> {
    persist_atomically(path.as_ref(), |file| {
        write_to(file, graph, format, options)
    })
}

#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_from_file<F: GraphFormat>(path: impl AsRef<Path>, format: &F) -> Result<F::Graph> {
    let file = fs::File::open(path.as_ref())?;
    read_from(file, format)
}

/// Consume an `e` property into `depends_on`.
pub fn read_edges(value: &Value, depends_on: &mut Vec<usize>) -> Result<()> {
    let items = value
        .as_array()
        .ok_or_else(|| GraphError::malformed(format!("'e' must be an array, got {}", value)))?;

    for item in items {
        let index = item
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| {
                GraphError::malformed(format!(
                    "'e' entries must be non-negative integers, got {}",
                    item
                ))
            })?;
        depends_on.push(index);
    }
    Ok(())
}

/// Run `write` against a temporary file next to `path`, then rename it into
/// place. On error the temporary file is removed and `path` is untouched.
pub(crate) fn persist_atomically<W>(path: &Path, write: W) -> Result<()>
where
    W: FnOnce(&mut fs::File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| GraphError::Io(e.error))?;
    Ok(())
}
