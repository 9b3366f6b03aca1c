//! Immutable pipeline graph of stages and routers, and its validating builder.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::instrument;

use crate::error::GraphError;
use crate::nodes::{Router, Stage};
use crate::types::{DurationClass, Field, NodeKind};

/// A node of the graph: a stage doing work or a router picking a successor.
#[derive(Clone)]
pub enum PipelineNode {
  Stage(Arc<dyn Stage>),
  Router(Arc<dyn Router>),
}

impl PipelineNode {
  pub fn name(&self) -> &str {
    match self {
      PipelineNode::Stage(s) => s.name(),
      PipelineNode::Router(r) => r.name(),
    }
  }

  pub fn kind(&self) -> NodeKind {
    match self {
      PipelineNode::Stage(_) => NodeKind::Stage,
      PipelineNode::Router(_) => NodeKind::Router,
    }
  }

  pub fn requires(&self) -> &[Field] {
    match self {
      PipelineNode::Stage(s) => s.requires(),
      PipelineNode::Router(r) => r.requires(),
    }
  }

  /// Routers never call out, so they are always fast.
  pub fn duration_class(&self) -> DurationClass {
    match self {
      PipelineNode::Stage(s) => s.duration_class(),
      PipelineNode::Router(_) => DurationClass::Fast,
    }
  }
}

impl fmt::Debug for PipelineNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PipelineNode::Stage(s) => write!(f, "Stage({})", s.name()),
      PipelineNode::Router(r) => write!(f, "Router({})", r.name()),
    }
  }
}

/// One edge as drawn by exporters: `label` is set for router branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeView<'a> {
  pub from: &'a str,
  pub to: &'a str,
  pub label: Option<&'a str>,
}

/// Validated pipeline graph. Built once by [PipelineGraphBuilder] and then
/// shared read-only between runs.
#[derive(Debug)]
pub struct PipelineGraph {
  nodes: BTreeMap<String, PipelineNode>,
  order: Vec<String>,
  edges: BTreeMap<String, String>,
  routes: BTreeMap<String, BTreeMap<String, String>>,
  entry: String,
  fallback: Option<String>,
}

impl PipelineGraph {
  pub fn builder() -> PipelineGraphBuilder {
    PipelineGraphBuilder::new()
  }

  pub fn entry(&self) -> &str {
    &self.entry
  }

  /// Terminal the executor jumps to after a recoverable failure.
  pub fn fallback(&self) -> Option<&str> {
    self.fallback.as_deref()
  }

  pub fn node(&self, id: &str) -> Option<&PipelineNode> {
    self.nodes.get(id)
  }

  /// Node ids in registration order.
  pub fn node_ids(&self) -> impl Iterator<Item = &str> {
    self.order.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Unconditional successor of a stage; `None` for terminals and routers.
  pub fn successor(&self, id: &str) -> Option<&str> {
    self.edges.get(id).map(String::as_str)
  }

  /// Successor a router label maps to.
  pub fn route(&self, router: &str, label: &str) -> Option<&str> {
    self.routes.get(router)?.get(label).map(String::as_str)
  }

  pub fn is_terminal(&self, id: &str) -> bool {
    matches!(self.nodes.get(id), Some(PipelineNode::Stage(_))) && !self.edges.contains_key(id)
  }

  /// All edges, unconditional ones first, in a stable order.
  pub fn edges(&self) -> Vec<EdgeView<'_>> {
    let plain = self.edges.iter().map(|(from, to)| EdgeView {
      from,
      to,
      label: None,
    });
    let routed = self.routes.iter().flat_map(|(from, map)| {
      map.iter().map(move |(label, to)| EdgeView {
        from,
        to,
        label: Some(label.as_str()),
      })
    });
    plain.chain(routed).collect()
  }

  fn next_nodes(&self, id: &str) -> Vec<&str> {
    let mut next: Vec<&str> = self.successor(id).into_iter().collect();
    if let Some(map) = self.routes.get(id) {
      next.extend(map.values().map(String::as_str));
    }
    next
  }
}

/// Collects nodes and edges; [PipelineGraphBuilder::build] checks every
/// structural rule before handing out a [PipelineGraph].
#[derive(Default)]
pub struct PipelineGraphBuilder {
  nodes: Vec<PipelineNode>,
  edges: Vec<(String, String)>,
  routes: BTreeMap<String, BTreeMap<String, String>>,
  entry: Option<String>,
  fallback: Option<String>,
}

impl PipelineGraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_stage(mut self, stage: Arc<dyn Stage>) -> Self {
    self.nodes.push(PipelineNode::Stage(stage));
    self
  }

  pub fn add_router(mut self, router: Arc<dyn Router>) -> Self {
    self.nodes.push(PipelineNode::Router(router));
    self
  }

  pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
    self.edges.push((from.into(), to.into()));
    self
  }

  /// Maps router labels to successors. A second call for the same router replaces the map.
  pub fn add_conditional_edges<I, L, T>(mut self, router: impl Into<String>, routes: I) -> Self
  where
    I: IntoIterator<Item = (L, T)>,
    L: Into<String>,
    T: Into<String>,
  {
    let map = routes
      .into_iter()
      .map(|(l, t)| (l.into(), t.into()))
      .collect();
    self.routes.insert(router.into(), map);
    self
  }

  pub fn set_entry(mut self, id: impl Into<String>) -> Self {
    self.entry = Some(id.into());
    self
  }

  pub fn set_fallback(mut self, id: impl Into<String>) -> Self {
    self.fallback = Some(id.into());
    self
  }

  #[instrument(level = "trace", skip(self))]
  pub fn build(self) -> Result<PipelineGraph, GraphError> {
    let mut nodes = BTreeMap::new();
    let mut order = Vec::new();
    for node in self.nodes {
      let id = node.name().to_string();
      if nodes.contains_key(&id) {
        return Err(GraphError::DuplicateNode(id));
      }
      order.push(id.clone());
      nodes.insert(id, node);
    }

    let entry = self.entry.ok_or(GraphError::MissingEntry)?;
    if !nodes.contains_key(&entry) {
      return Err(GraphError::UnknownNode(entry));
    }

    let mut edges = BTreeMap::new();
    for (from, to) in self.edges {
      match nodes.get(&from) {
        None => return Err(GraphError::UnknownNode(from)),
        Some(PipelineNode::Router(_)) => return Err(GraphError::RouterWithEdge(from)),
        Some(PipelineNode::Stage(_)) => {}
      }
      if !nodes.contains_key(&to) {
        return Err(GraphError::UnknownNode(to));
      }
      if edges.contains_key(&from) {
        return Err(GraphError::MultipleSuccessors(from));
      }
      edges.insert(from, to);
    }

    for (router, map) in &self.routes {
      let labels = match nodes.get(router) {
        None => return Err(GraphError::UnknownNode(router.clone())),
        Some(PipelineNode::Stage(_)) => return Err(GraphError::RoutesOnStage(router.clone())),
        Some(PipelineNode::Router(r)) => r.labels(),
      };
      for (label, target) in map {
        if !labels.iter().any(|l| *l == label.as_str()) {
          return Err(GraphError::UnknownLabel {
            router: router.clone(),
            label: label.clone(),
          });
        }
        if !nodes.contains_key(target) {
          return Err(GraphError::UnknownNode(target.clone()));
        }
      }
    }

    for id in &order {
      let Some(PipelineNode::Router(r)) = nodes.get(id) else {
        continue;
      };
      let map = self
        .routes
        .get(id)
        .ok_or_else(|| GraphError::RouterWithoutRoutes(id.clone()))?;
      if let Some(label) = r.labels().iter().find(|l| !map.contains_key(**l)) {
        return Err(GraphError::UnmappedLabel {
          router: id.clone(),
          label: label.to_string(),
        });
      }
    }

    if let Some(fallback) = &self.fallback {
      match nodes.get(fallback) {
        None => return Err(GraphError::UnknownNode(fallback.clone())),
        Some(PipelineNode::Stage(_)) if !edges.contains_key(fallback) => {}
        Some(_) => return Err(GraphError::InvalidFallback(fallback.clone())),
      }
    }

    let graph = PipelineGraph {
      nodes,
      order,
      edges,
      routes: self.routes,
      entry,
      fallback: self.fallback,
    };
    check_acyclic(&graph)?;
    check_reachable(&graph)?;
    Ok(graph)
  }
}

fn check_acyclic(graph: &PipelineGraph) -> Result<(), GraphError> {
  #[derive(Clone, Copy, PartialEq)]
  enum Mark {
    Visiting,
    Done,
  }
  fn visit<'a>(
    graph: &'a PipelineGraph,
    id: &'a str,
    marks: &mut BTreeMap<&'a str, Mark>,
  ) -> Result<(), GraphError> {
    match marks.get(id) {
      Some(Mark::Done) => return Ok(()),
      Some(Mark::Visiting) => return Err(GraphError::Cycle(id.to_string())),
      None => {}
    }
    marks.insert(id, Mark::Visiting);
    for next in graph.next_nodes(id) {
      visit(graph, next, marks)?;
    }
    marks.insert(id, Mark::Done);
    Ok(())
  }

  let mut marks = BTreeMap::new();
  for id in graph.node_ids() {
    visit(graph, id, &mut marks)?;
  }
  Ok(())
}

/// Every node must be reachable from the entry; the fallback counts as reached.
fn check_reachable(graph: &PipelineGraph) -> Result<(), GraphError> {
  let mut seen: BTreeSet<&str> = BTreeSet::new();
  let mut queue: VecDeque<&str> = VecDeque::from([graph.entry()]);
  queue.extend(graph.fallback());
  while let Some(id) = queue.pop_front() {
    if !seen.insert(id) {
      continue;
    }
    queue.extend(graph.next_nodes(id));
  }
  match graph.node_ids().find(|id| !seen.contains(id)) {
    Some(id) => Err(GraphError::Unreachable(id.to_string())),
    None => Ok(()),
  }
}
