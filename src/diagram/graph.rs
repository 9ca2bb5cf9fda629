//! Diagram Graph Data Structures
//!
//! The node/edge model produced by the tree builder and consumed by the
//! geometry engine, navigation operations and the renderer.

use crate::error::{DiagramError, Result};
use eframe::egui::{Color32, Pos2, Vec2};
use serde::Serialize;
use std::collections::HashMap;

/// ID of the synthetic root node
pub const ROOT_ID: &str = "root";

/// Label the root contributes to every path
pub const ROOT_LABEL: &str = "Root";

/// What a diagram node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// The single synthetic entry node
    Root,
    /// A JSON object or array
    Container,
    /// A scalar, or a folded group of scalar properties
    Leaf,
}

/// Role of a text fragment inside a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnnotationRole {
    /// Property name, array index or container label
    Key,
    /// Scalar value text
    Value,
    /// Container child count, e.g. "[3]"
    Count,
}

/// Horizontal anchoring of a text fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

/// How a scalar value text is classified for coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ValueKind {
    #[default]
    String,
    Number,
    True,
    False,
    Null,
}

/// A text fragment of a node
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub role: AnnotationRole,

    /// Text as produced by the builder
    pub text: String,

    /// Text as drawn (quoted/lower-cased for values), filled by the geometry engine
    pub display: String,

    /// Value classification, only meaningful for `Value` fragments
    pub value_kind: Option<ValueKind>,

    /// Offset of the text anchor from the node's top-left corner
    #[serde(skip)]
    pub offset: Vec2,

    #[serde(skip)]
    pub color: Color32,

    #[serde(skip)]
    pub anchor: TextAnchor,

    /// Hidden fragments contribute no width and are not drawn
    pub visible: bool,
}

impl Annotation {
    pub fn new(role: AnnotationRole, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            role,
            display: text.clone(),
            text,
            value_kind: None,
            offset: Vec2::ZERO,
            color: Color32::TRANSPARENT,
            anchor: TextAnchor::Start,
            visible: true,
        }
    }

    pub fn key(text: impl Into<String>) -> Self {
        Self::new(AnnotationRole::Key, text)
    }

    pub fn value(text: impl Into<String>) -> Self {
        Self::new(AnnotationRole::Value, text)
    }

    pub fn count(child_count: usize) -> Self {
        Self::new(AnnotationRole::Count, format!("[{}]", child_count))
    }
}

/// One step of a path from the document root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Append this segment to a locator string
    pub fn append_to(&self, path: &mut String) {
        match self {
            PathSegment::Index(i) => {
                path.push('[');
                path.push_str(&i.to_string());
                path.push(']');
            }
            PathSegment::Key(key) if is_plain_key(key) => {
                path.push('.');
                path.push_str(key);
            }
            PathSegment::Key(key) => {
                path.push_str("[\"");
                path.push_str(&key.replace('\\', "\\\\").replace('"', "\\\""));
                path.push_str("\"]");
            }
        }
    }

    /// Label shown for this segment on a node
    pub fn label(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(i) => i.to_string(),
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
}

/// Pixel size of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Geometry {
    pub width: f32,
    pub height: f32,
}

impl Geometry {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Tree growth direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Orientation {
    #[default]
    LeftToRight,
    TopToBottom,
    RightToLeft,
    BottomToTop,
}

impl Orientation {
    /// The next orientation in the rotation cycle
    pub fn next(self) -> Self {
        match self {
            Orientation::LeftToRight => Orientation::TopToBottom,
            Orientation::TopToBottom => Orientation::RightToLeft,
            Orientation::RightToLeft => Orientation::BottomToTop,
            Orientation::BottomToTop => Orientation::LeftToRight,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Orientation::LeftToRight | Orientation::RightToLeft)
    }

    /// Whether children are placed towards smaller coordinates
    pub fn is_reversed(self) -> bool {
        matches!(self, Orientation::RightToLeft | Orientation::BottomToTop)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Orientation::LeftToRight => "Left to right",
            Orientation::TopToBottom => "Top to bottom",
            Orientation::RightToLeft => "Right to left",
            Orientation::BottomToTop => "Bottom to top",
        }
    }

    pub fn all() -> &'static [Orientation] {
        &[
            Orientation::LeftToRight,
            Orientation::TopToBottom,
            Orientation::RightToLeft,
            Orientation::BottomToTop,
        ]
    }
}

/// Search highlight tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Highlight {
    #[default]
    None,
    Matched,
    Focused,
}

/// Declarative per-node style read by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NodeStyle {
    pub highlight: Highlight,
}

/// A node in the diagram
#[derive(Debug, Clone, Serialize)]
pub struct DiagramNode {
    /// Deterministic identifier derived from the traversal position
    pub id: String,

    pub kind: NodeKind,

    /// Human-readable locator, e.g. `Root.user.tags[2]`
    pub path: String,

    /// The step from the parent node to this one (none for root and folded leaves)
    pub segment: Option<PathSegment>,

    /// Ordered text fragments
    pub annotations: Vec<Annotation>,

    /// Number of direct structural children
    pub child_count: usize,

    /// Expansion state; `None` for leaves
    pub is_expanded: Option<bool>,

    /// Computed by the geometry engine
    pub geometry: Geometry,

    pub style: NodeStyle,

    /// Expand/collapse icon center relative to the node's top-left corner
    #[serde(skip)]
    pub icon_anchor: Option<Pos2>,
}

impl DiagramNode {
    /// Create the synthetic root node
    pub fn root(child_count: usize) -> Self {
        Self {
            id: ROOT_ID.to_string(),
            kind: NodeKind::Root,
            path: ROOT_LABEL.to_string(),
            segment: None,
            annotations: Vec::new(),
            child_count,
            is_expanded: Some(true),
            geometry: Geometry::default(),
            style: NodeStyle::default(),
            icon_anchor: None,
        }
    }

    /// Create a container node labelled by its segment
    pub fn container(
        id: impl Into<String>,
        path: impl Into<String>,
        segment: PathSegment,
        child_count: usize,
    ) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Container,
            path: path.into(),
            annotations: vec![Annotation::key(segment.label()), Annotation::count(child_count)],
            segment: Some(segment),
            child_count,
            is_expanded: Some(true),
            geometry: Geometry::default(),
            style: NodeStyle::default(),
            icon_anchor: None,
        }
    }

    /// Create a leaf node from its annotations
    pub fn leaf(
        id: impl Into<String>,
        path: impl Into<String>,
        segment: Option<PathSegment>,
        annotations: Vec<Annotation>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Leaf,
            path: path.into(),
            segment,
            annotations,
            child_count: 0,
            is_expanded: None,
            geometry: Geometry::default(),
            style: NodeStyle::default(),
            icon_anchor: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    pub fn is_container(&self) -> bool {
        self.kind == NodeKind::Container
    }

    /// Whether the node shows an expand/collapse icon
    pub fn has_expand_icon(&self) -> bool {
        self.kind == NodeKind::Container && self.child_count > 0
    }

    /// Whether children of this node are currently shown
    pub fn shows_children(&self) -> bool {
        self.is_expanded.unwrap_or(false)
    }

    /// Leaf lines as (key index, value index) pairs into `annotations`;
    /// unpaired values have no key
    pub fn line_indices(&self) -> Vec<(Option<usize>, usize)> {
        let mut lines = Vec::new();
        let mut pending_key: Option<usize> = None;

        for (i, annotation) in self.annotations.iter().enumerate() {
            match annotation.role {
                AnnotationRole::Key => {
                    if let Some(key) = pending_key.take() {
                        lines.push((None, key));
                    }
                    pending_key = Some(i);
                }
                AnnotationRole::Value => lines.push((pending_key.take(), i)),
                AnnotationRole::Count => {}
            }
        }
        if let Some(key) = pending_key {
            lines.push((None, key));
        }
        lines
    }

    /// Leaf lines as (key, value) pairs
    pub fn lines(&self) -> Vec<(Option<&Annotation>, &Annotation)> {
        self.line_indices()
            .into_iter()
            .map(|(key, value)| (key.map(|k| &self.annotations[k]), &self.annotations[value]))
            .collect()
    }

    /// Whether any drawn fragment of a leaf contains `needle` (already lower-cased)
    pub fn matches_query(&self, needle: &str) -> bool {
        self.kind == NodeKind::Leaf
            && self
                .annotations
                .iter()
                .any(|a| a.display.to_lowercase().contains(needle))
    }

    /// Text copied for this node: one `key: value` line per pair
    pub fn display_text(&self) -> String {
        match self.kind {
            NodeKind::Leaf => self
                .lines()
                .iter()
                .map(|(key, value)| match key {
                    Some(key) => format!("{}: {}", key.display, value.display),
                    None => value.display.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            NodeKind::Container => self
                .annotations
                .iter()
                .find(|a| a.role == AnnotationRole::Key)
                .map(|a| a.text.clone())
                .unwrap_or_default(),
            NodeKind::Root => String::new(),
        }
    }
}

/// An edge connecting a parent node to a child node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
}

impl DiagramEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        Self {
            id: format!("{}~{}", source_id, target_id),
            source_id,
            target_id,
        }
    }
}

/// The live node/edge collection
#[derive(Debug, Clone, Default)]
pub struct DiagramGraph {
    nodes: Vec<DiagramNode>,
    edges: Vec<DiagramEdge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
    /// target id -> index of its single incoming edge
    incoming: HashMap<String, usize>,
    /// source id -> indices of outgoing edges, in creation order
    outgoing: HashMap<String, Vec<usize>>,
}

impl DiagramGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; duplicate IDs are rejected
    pub fn add_node(&mut self, node: DiagramNode) -> Result<()> {
        if self.node_index.contains_key(&node.id) {
            return Err(DiagramError::Invariant(format!("duplicate node id {}", node.id)));
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Add an edge; both endpoints must exist and the target must not have a parent yet
    pub fn add_edge(&mut self, edge: DiagramEdge) -> Result<()> {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !self.node_index.contains_key(endpoint) {
                return Err(DiagramError::Invariant(format!(
                    "edge {} references missing node {}",
                    edge.id, endpoint
                )));
            }
        }
        if self.incoming.contains_key(&edge.target_id) {
            return Err(DiagramError::Invariant(format!(
                "node {} already has a parent",
                edge.target_id
            )));
        }
        if edge.target_id == ROOT_ID || edge.source_id == edge.target_id {
            return Err(DiagramError::Invariant(format!("edge {} forms a cycle", edge.id)));
        }

        let index = self.edges.len();
        self.incoming.insert(edge.target_id.clone(), index);
        self.outgoing
            .entry(edge.source_id.clone())
            .or_default()
            .push(index);
        self.edge_index.insert(edge.id.clone(), index);
        self.edges.push(edge);
        Ok(())
    }

    /// Nodes in creation (document) order
    pub fn nodes(&self) -> &[DiagramNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut DiagramNode> {
        self.nodes.iter_mut()
    }

    pub fn edges(&self) -> &[DiagramEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by ID ("default node for id X")
    pub fn get_node(&self, id: &str) -> Option<&DiagramNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut DiagramNode> {
        match self.node_index.get(id) {
            Some(&i) => Some(&mut self.nodes[i]),
            None => None,
        }
    }

    /// Get an edge by ID ("default edge for id Y")
    pub fn get_edge(&self, id: &str) -> Option<&DiagramEdge> {
        self.edge_index.get(id).map(|&i| &self.edges[i])
    }

    pub fn root(&self) -> Option<&DiagramNode> {
        self.get_node(ROOT_ID)
    }

    /// Parent of a node, found through its incoming edge
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.incoming
            .get(id)
            .map(|&i| self.edges[i].source_id.as_str())
    }

    pub fn has_incoming(&self, id: &str) -> bool {
        self.incoming.contains_key(id)
    }

    /// Child IDs in creation order
    pub fn children_of(&self, id: &str) -> Vec<&str> {
        self.outgoing
            .get(id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| self.edges[i].target_id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ancestor IDs from the parent up to the root
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            ancestors.push(parent.to_string());
            current = parent;
        }
        ancestors
    }

    /// Rebuild the locator of a node by walking its incoming edges up to the root
    pub fn reconstruct_path(&self, id: &str) -> Option<String> {
        let node = self.get_node(id)?;
        let mut segments: Vec<&PathSegment> = node.segment.iter().collect();

        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if let Some(segment) = self.get_node(parent).and_then(|n| n.segment.as_ref()) {
                segments.push(segment);
            }
            current = parent;
        }
        if current != ROOT_ID {
            return None;
        }

        let mut path = ROOT_LABEL.to_string();
        for segment in segments.iter().rev() {
            segment.append_to(&mut path);
        }
        Some(path)
    }

    /// IDs of nodes not hidden under a collapsed ancestor, in document order
    pub fn visible_node_ids(&self) -> Vec<String> {
        let mut visible = Vec::new();
        if self.root().is_none() {
            return visible;
        }

        let mut stack = vec![ROOT_ID];
        while let Some(id) = stack.pop() {
            visible.push(id.to_string());
            let shows_children = self.get_node(id).map(|n| n.shows_children()).unwrap_or(false);
            if shows_children {
                stack.extend(self.children_of(id).into_iter().rev());
            }
        }
        visible
    }

    /// Check the tree invariants: one root, one parent per other node, everything reachable
    pub fn validate(&self) -> Result<()> {
        let roots = self.nodes.iter().filter(|n| n.kind == NodeKind::Root).count();
        if roots != 1 {
            return Err(DiagramError::Invariant(format!("expected one root, found {}", roots)));
        }
        if self.edges.len() + 1 != self.nodes.len() {
            return Err(DiagramError::Invariant(format!(
                "{} nodes but {} edges",
                self.nodes.len(),
                self.edges.len()
            )));
        }

        let mut reached = 0;
        let mut stack = vec![ROOT_ID];
        while let Some(id) = stack.pop() {
            reached += 1;
            if reached > self.nodes.len() {
                return Err(DiagramError::Invariant("cycle detected".to_string()));
            }
            stack.extend(self.children_of(id));
        }
        if reached != self.nodes.len() {
            return Err(DiagramError::Invariant(format!(
                "{} of {} nodes reachable from root",
                reached,
                self.nodes.len()
            )));
        }
        Ok(())
    }
}
