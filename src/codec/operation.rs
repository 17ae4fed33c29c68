//! Field mapping between [`OperationNode`] and the node objects of the graph
//! file.
//!
//! Write order per node is fixed: `h` (only when non-zero), `t`, then the
//! operation's fields (`i`, and `v` for `WithIdVersion`). Read accepts the
//! properties in any order.

use crate::codec::{self, FieldWriter, Graph, GraphFormat, GraphNode, WriteOptions};
use crate::graph::{Operation, OperationGraph, OperationNode, OperationType, OperationTypes};
use crate::render::graphviz;
use crate::{GraphError, Result};

use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::path::Path;

const HIT_INDEX_KEY: &str = "h";
const TYPE_KEY: &str = "t";
const ID_KEY: &str = "i";
const VERSION_KEY: &str = "v";

impl GraphNode for OperationNode {
    fn depends_on(&self) -> &[usize] {
        OperationNode::depends_on(self)
    }
}

impl Graph for OperationGraph {
    type Node = OperationNode;
    type Item = (Operation, u32);

    fn nodes(&self) -> &[OperationNode] {
        OperationGraph::nodes(self)
    }

    fn insert(
        &mut self,
        (operation, hit_index): Self::Item,
        depends_on: Vec<usize>,
    ) -> Result<usize> {
        self.append(operation, hit_index, depends_on)
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperationGraphCodec {
    types: OperationTypes,
}

impl OperationGraphCodec {
    pub fn new(types: OperationTypes) -> Self {
        Self { types }
    }

    pub fn types(&self) -> &OperationTypes {
        &self.types
    }

    pub fn write_to_file(
        &self,
        path: impl AsRef<Path>,
        graph: &OperationGraph,
        options: WriteOptions,
    ) -> Result<()> {
        codec::write_to_file(path, graph, self, options)
    }

    pub fn read_from_file(&self, path: impl AsRef<Path>) -> Result<OperationGraph> {
        codec::read_from_file(path, self)
    }

    pub fn write_to<W: Write>(
        &self,
        writer: W,
        graph: &OperationGraph,
        options: WriteOptions,
    ) -> Result<()> {
        codec::write_to(writer, graph, self, options)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<OperationGraph> {
        codec::read_from(reader, self)
    }

    pub fn write_to_graphviz_file(
        &self,
        path: impl AsRef<Path>,
        graph: &OperationGraph,
    ) -> Result<()> {
        graphviz::write_graphviz_file(path, graph, |node| self.label(node))
    }

    pub fn write_graphviz<W: Write>(&self, writer: W, graph: &OperationGraph) -> Result<()> {
        graphviz::write_graphviz(writer, graph, |node| self.label(node))
    }

    /// Human-readable label, shaped like the repository path the operation hits.
    pub fn label(&self, node: &OperationNode) -> Result<String> {
        self.ensure_supported(node.operation.operation_type())?;
        Ok(match &node.operation {
            Operation::WithId { id } => format!("{}/index.json", id),
            Operation::WithIdVersion { id, version } => format!("{}.{}.nupkg", id, version),
        })
    }

    fn ensure_supported(&self, operation_type: OperationType) -> Result<()> {
        if self.types.contains(operation_type) {
            Ok(())
        } else {
            Err(GraphError::UnsupportedOperation(operation_type))
        }
    }
}

impl GraphFormat for OperationGraphCodec {
    type Graph = OperationGraph;

    fn write_node(&self, node: &OperationNode, fields: &mut FieldWriter) -> Result<()> {
        let operation_type = node.operation.operation_type();
        self.ensure_supported(operation_type)?;

        if node.hit_index != 0 {
            fields.put(HIT_INDEX_KEY, node.hit_index);
        }
        fields.put(TYPE_KEY, operation_type.name());

        match &node.operation {
            Operation::WithId { id } => {
                fields.put(ID_KEY, id.as_str());
            }
            Operation::WithIdVersion { id, version } => {
                fields.put(ID_KEY, id.as_str());
                fields.put(VERSION_KEY, version.as_str());
            }
        }
        Ok(())
    }

    fn read_node(
        &self,
        index: usize,
        fields: &Map<String, Value>,
        depends_on: &mut Vec<usize>,
    ) -> Result<(Operation, u32)> {
        let mut hit_index = 0u32;
        let mut type_name: Option<&str> = None;
        let mut id: Option<&str> = None;
        let mut version: Option<&str> = None;

        for (key, value) in fields {
            match key.as_str() {
                HIT_INDEX_KEY => hit_index = read_hit_index(index, value)?,
                TYPE_KEY => type_name = read_str(index, key, value)?,
                ID_KEY => id = read_str(index, key, value)?,
                VERSION_KEY => version = read_str(index, key, value)?,
                codec::EDGES_KEY => codec::read_edges(value, depends_on)?,
                _ => {}
            }
        }

        let type_name = type_name.ok_or(GraphError::MissingDiscriminant { node: index })?;
        let operation_type =
            self.types
                .parse(type_name)
                .ok_or_else(|| GraphError::UnknownDiscriminant {
                    node: index,
                    name: type_name.to_string(),
                })?;

        let require = |value: Option<&str>, field: &'static str| {
            value.map(str::to_string).ok_or(GraphError::MissingField {
                node: index,
                operation_type,
                field,
            })
        };

        let operation = match operation_type {
            OperationType::WithId => Operation::WithId {
                id: require(id, ID_KEY)?,
            },
            OperationType::WithIdVersion => Operation::WithIdVersion {
                id: require(id, ID_KEY)?,
                version: require(version, VERSION_KEY)?,
            },
        };

        Ok((operation, hit_index))
    }
}

fn read_hit_index(node: usize, value: &Value) -> Result<u32> {
    if value.is_null() {
        return Ok(0);
    }
    value
        .as_u64()
        .and_then(|h| u32::try_from(h).ok())
        .ok_or_else(|| {
            GraphError::malformed(format!(
                "node {}: 'h' must be a non-negative integer, got {}",
                node, value
            ))
        })
}

/// String property; `null` counts as absent.
fn read_str<'a>(node: usize, key: &str, value: &'a Value) -> Result<Option<&'a str>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.as_str())),
        other => Err(GraphError::malformed(format!(
            "node {}: '{}' must be a string, got {}",
            node, key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_node_graph() -> OperationGraph {
        let mut g = OperationGraph::new();
        let index = g.append(Operation::with_id("foo"), 0, vec![]).unwrap();
        g.append(Operation::with_id_version("foo", "1.0.0"), 3, vec![index])
            .unwrap();
        g
    }

    fn to_string(codec: &OperationGraphCodec, g: &OperationGraph) -> Result<String> {
        let mut out = Vec::new();
        codec.write_to(&mut out, g, WriteOptions::default())?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn read(text: &str) -> Result<OperationGraph> {
        OperationGraphCodec::default().read_from(text.as_bytes())
    }

    #[test]
    fn writes_compact_nodes_in_fixed_order() {
        let text = to_string(&OperationGraphCodec::default(), &two_node_graph()).unwrap();
        assert_eq!(
            text,
            r#"{"nodes":[{"t":"WithId","i":"foo"},{"h":3,"t":"WithIdVersion","i":"foo","v":"1.0.0","e":[0]}]}"#
        );
    }

    #[test]
    fn round_trip_preserves_every_node() {
        let mut g = two_node_graph();
        g.append(Operation::with_id("bar"), 0, vec![1, 0, 1]).unwrap();
        g.append(Operation::with_id_version("bar", "2.0.0-beta"), u32::MAX, vec![])
            .unwrap();

        let codec = OperationGraphCodec::default();
        let text = to_string(&codec, &g).unwrap();
        let back = codec.read_from(text.as_bytes()).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn properties_may_arrive_in_any_order() {
        let g = read(r#"{"nodes":[{"i":"foo","t":"WithId"},{"e":[0],"v":"1.0.0","i":"foo","t":"WithIdVersion","h":3}]}"#)
            .unwrap();
        assert_eq!(g, two_node_graph());
    }

    #[test]
    fn explicit_defaults_read_as_defaults() {
        let g = read(r#"{"nodes":[{"h":0,"t":"WithId","i":"foo","e":[]},{"h":null,"t":"WithId","i":"bar"}]}"#)
            .unwrap();
        assert_eq!(g.nodes()[0].hit_index, 0);
        assert!(g.nodes()[0].depends_on().is_empty());
        assert_eq!(g.nodes()[1].hit_index, 0);
    }

    #[test]
    fn missing_type_is_missing_discriminant() {
        let err = read(r#"{"nodes":[{"t":"WithId","i":"a"},{"i":"foo","v":"1.0.0"}]}"#).unwrap_err();
        assert!(matches!(err, GraphError::MissingDiscriminant { node: 1 }));

        let err = read(r#"{"nodes":[{"t":null,"i":"foo"}]}"#).unwrap_err();
        assert!(matches!(err, GraphError::MissingDiscriminant { node: 0 }));
    }

    #[test]
    fn unknown_type_name_is_rejected() {
        let err = read(r#"{"nodes":[{"t":"PackageBaseAddressIndex","i":"foo"}]}"#).unwrap_err();
        match err {
            GraphError::UnknownDiscriminant { node, name } => {
                assert_eq!(node, 0);
                assert_eq!(name, "PackageBaseAddressIndex");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn required_fields_follow_discriminant() {
        let err = read(r#"{"nodes":[{"t":"WithIdVersion","i":"foo"}]}"#).unwrap_err();
        assert!(matches!(
            err,
            GraphError::MissingField {
                node: 0,
                operation_type: OperationType::WithIdVersion,
                field: "v"
            }
        ));

        let err = read(r#"{"nodes":[{"t":"WithId"}]}"#).unwrap_err();
        assert!(matches!(
            err,
            GraphError::MissingField {
                field: "i",
                operation_type: OperationType::WithId,
                ..
            }
        ));
    }

    #[test]
    fn wrong_property_types_are_malformed() {
        for text in [
            r#"{"nodes":[{"t":1,"i":"foo"}]}"#,
            r#"{"nodes":[{"t":"WithId","i":["foo"]}]}"#,
            r#"{"nodes":[{"h":-1,"t":"WithId","i":"foo"}]}"#,
            r#"{"nodes":[{"h":1.5,"t":"WithId","i":"foo"}]}"#,
            r#"{"nodes":[{"h":4294967296,"t":"WithId","i":"foo"}]}"#,
        ] {
            assert!(matches!(read(text), Err(GraphError::MalformedFormat(_))), "{}", text);
        }
    }

    #[test]
    fn restricted_table_refuses_to_write_or_label() {
        let codec = OperationGraphCodec::new(OperationTypes::only(&[OperationType::WithId]));
        let g = two_node_graph();

        let err = to_string(&codec, &g).unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnsupportedOperation(OperationType::WithIdVersion)
        ));

        assert_eq!(codec.label(&g.nodes()[0]).unwrap(), "foo/index.json");
        assert!(matches!(
            codec.label(&g.nodes()[1]),
            Err(GraphError::UnsupportedOperation(OperationType::WithIdVersion))
        ));
    }

    #[test]
    fn restricted_table_rejects_unlisted_names_on_read() {
        let codec = OperationGraphCodec::new(OperationTypes::only(&[OperationType::WithId]));
        let err = codec
            .read_from(r#"{"nodes":[{"t":"WithIdVersion","i":"foo","v":"1"}]}"#.as_bytes())
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownDiscriminant { node: 0, .. }));
    }

    #[test]
    fn labels_match_repository_paths() {
        let codec = OperationGraphCodec::default();
        let g = two_node_graph();
        assert_eq!(codec.label(&g.nodes()[0]).unwrap(), "foo/index.json");
        assert_eq!(codec.label(&g.nodes()[1]).unwrap(), "foo.1.0.0.nupkg");
    }
}
