use crate::codec::{Graph, GraphNode, persist_atomically};
use crate::Result;

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

/// Render `graph` as a Graphviz digraph.
///
/// Vertex ids are node indices. All vertex statements come first, followed by
/// one `dependent -> dependency` edge per entry of `depends_on`.
pub fn render_graphviz<G, L>(graph: &G, mut label: L) -> Result<String>
where
    G: Graph,
    L: FnMut(&G::Node) -> Result<String>,
{
    let mut out = String::from("digraph G {\n");

    for (i, node) in graph.nodes().iter().enumerate() {
        let text = label(node)?;
        // Writing into a String cannot fail.
        let _ = writeln!(out, "  {} [label=\"{}\"];", i, escape_label(&text));
    }

    for (i, node) in graph.nodes().iter().enumerate() {
        for d in node.depends_on() {
            let _ = writeln!(out, "  {} -> {};", i, d);
        }
    }

    out.push_str("}\n");
    Ok(out)
}

pub fn write_graphviz<G, L, W>(mut writer: W, graph: &G, label: L) -> Result<()>
where
    G: Graph,
    L: FnMut(&G::Node) -> Result<String>,
    W: Write,
{
    let dot = render_graphviz(graph, label)?;
    writer.write_all(dot.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Labels are rendered before the file is created, so a failing label leaves
/// nothing on disk.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn write_graphviz_file<G, L>(path: impl AsRef<Path>, graph: &G, label: L) -> Result<()>
where
    G: Graph,
    L: FnMut(&G::Node) -> Result<String>,
{
    let dot = render_graphviz(graph, label)?;
    persist_atomically(path.as_ref(), |file| {
        file.write_all(dot.as_bytes())?;
        Ok(())
    })?;
    tracing::debug!(nodes = graph.nodes().len(), "graphviz written");
    Ok(())
}

fn escape_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
