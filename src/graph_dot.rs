//! Graphviz DOT export of a [PipelineGraph].
//!
//! Shapes: entry `Mdiamond`, terminals `Msquare`, routers `diamond`, other
//! stages `box`. Slow stages get a dashed `fallback` edge to the fallback terminal.

use std::fmt::Write;

use crate::pipeline_graph::{PipelineGraph, PipelineNode};
use crate::types::DurationClass;

fn quote(s: &str) -> String {
  format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Renders `graph` as a DOT digraph named `name`.
pub fn to_dot(graph: &PipelineGraph, name: &str) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "digraph {} {{", quote(name));
  let _ = writeln!(out, "  rankdir=LR;");
  for id in graph.node_ids() {
    let shape = match graph.node(id) {
      _ if id == graph.entry() => "Mdiamond",
      Some(PipelineNode::Router(_)) => "diamond",
      _ if graph.is_terminal(id) => "Msquare",
      _ => "box",
    };
    let style = if graph.fallback() == Some(id) {
      ", style=dashed"
    } else {
      ""
    };
    let _ = writeln!(out, "  {} [shape={}{}];", quote(id), shape, style);
  }
  for edge in graph.edges() {
    match edge.label {
      Some(label) => {
        let _ = writeln!(
          out,
          "  {} -> {} [label={}];",
          quote(edge.from),
          quote(edge.to),
          quote(label)
        );
      }
      None => {
        let _ = writeln!(out, "  {} -> {};", quote(edge.from), quote(edge.to));
      }
    }
  }
  if let Some(fallback) = graph.fallback() {
    for id in graph.node_ids() {
      let slow = matches!(
        graph.node(id),
        Some(node) if node.duration_class() == DurationClass::Slow
      );
      if slow {
        let _ = writeln!(
          out,
          "  {} -> {} [style=dashed, label=\"fallback\"];",
          quote(id),
          quote(fallback)
        );
      }
    }
  }
  out.push_str("}\n");
  out
}
