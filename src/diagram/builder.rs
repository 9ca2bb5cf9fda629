//! Tree Builder
//!
//! Converts a parsed document value into the flat node/edge graph.
//!
//! Traversal is depth-first from a synthetic root and driven by an explicit
//! work stack, so document depth is limited by memory rather than by the
//! call stack. Nodes are created in pre-order, which is the document order
//! search results are reported in.
//!
//! Containers whose direct children are all scalars are folded: the scalars
//! become one leaf holding `key`/`value` annotation pairs (values only for
//! arrays). A container with any non-scalar child gets one node per child.

use super::graph::{Annotation, DiagramEdge, DiagramGraph, DiagramNode, PathSegment, ROOT_ID, ROOT_LABEL};
use crate::error::Result;
use serde_json::Value;

/// Suffix of the folded leaf's ID under its container
const FOLDED_SUFFIX: &str = "values";

/// Pending child visit
struct Visit<'a> {
    parent_id: String,
    parent_path: String,
    ordinal: usize,
    segment: PathSegment,
    value: &'a Value,
}

/// Build the diagram graph for a document value
pub fn build(value: &Value) -> Result<DiagramGraph> {
    let mut graph = DiagramGraph::new();
    graph.add_node(DiagramNode::root(child_count(value)))?;

    if is_scalar(value) {
        let id = format!("{}/{}", ROOT_ID, FOLDED_SUFFIX);
        let leaf = DiagramNode::leaf(&id, ROOT_LABEL, None, vec![Annotation::value(scalar_text(value))]);
        graph.add_node(leaf)?;
        graph.add_edge(DiagramEdge::new(ROOT_ID, id))?;
        return Ok(graph);
    }

    let mut stack: Vec<Visit> = Vec::new();
    expand(&mut graph, &mut stack, ROOT_ID, ROOT_LABEL, value)?;

    while let Some(visit) = stack.pop() {
        let id = format!("{}/{}", visit.parent_id, visit.ordinal);
        let mut path = visit.parent_path;
        visit.segment.append_to(&mut path);

        if is_scalar(visit.value) {
            let annotations = scalar_annotations(&visit.segment, visit.value);
            graph.add_node(DiagramNode::leaf(&id, path, Some(visit.segment), annotations))?;
            graph.add_edge(DiagramEdge::new(visit.parent_id, id))?;
        } else {
            let container = DiagramNode::container(&id, &path, visit.segment, child_count(visit.value));
            graph.add_node(container)?;
            graph.add_edge(DiagramEdge::new(visit.parent_id, &id))?;
            expand(&mut graph, &mut stack, &id, &path, visit.value)?;
        }
    }

    Ok(graph)
}

/// Emit the children of a container: either one folded leaf right away, or
/// one pending visit per child (pushed in reverse so they pop in order)
fn expand<'a>(
    graph: &mut DiagramGraph,
    stack: &mut Vec<Visit<'a>>,
    id: &str,
    path: &str,
    value: &'a Value,
) -> Result<()> {
    let children = entries(value);
    if children.is_empty() {
        return Ok(());
    }

    if children.iter().all(|(_, child)| is_scalar(child)) {
        let annotations = children
            .iter()
            .flat_map(|(segment, child)| scalar_annotations(segment, child))
            .collect();
        let leaf_id = format!("{}/{}", id, FOLDED_SUFFIX);
        graph.add_node(DiagramNode::leaf(&leaf_id, path, None, annotations))?;
        graph.add_edge(DiagramEdge::new(id, leaf_id))?;
        return Ok(());
    }

    for (ordinal, (segment, child)) in children.into_iter().enumerate().rev() {
        stack.push(Visit {
            parent_id: id.to_string(),
            parent_path: path.to_string(),
            ordinal,
            segment,
            value: child,
        });
    }
    Ok(())
}

/// Structural children of a value, in document order
fn entries(value: &Value) -> Vec<(PathSegment, &Value)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, child)| (PathSegment::Key(key.clone()), child))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, child)| (PathSegment::Index(i), child))
            .collect(),
        _ => Vec::new(),
    }
}

fn child_count(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    }
}

pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Raw text of a scalar; the geometry engine classifies and quotes it for display
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Object members carry their key; array elements are unlabeled
fn scalar_annotations(segment: &PathSegment, value: &Value) -> Vec<Annotation> {
    match segment {
        PathSegment::Key(key) => vec![Annotation::key(key.clone()), Annotation::value(scalar_text(value))],
        PathSegment::Index(_) => vec![Annotation::value(scalar_text(value))],
    }
}
