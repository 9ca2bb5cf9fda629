//! Geometry & Annotation Engine
//!
//! Sizes nodes from their annotation text and fills in the per-fragment
//! display text, color, anchor and offset. Runs once per node after the
//! tree is built and again whenever display options change.

use super::graph::{
    AnnotationRole, DiagramGraph, DiagramNode, Geometry, NodeKind, Orientation, TextAnchor, ValueKind,
};
use super::metrics::{FontSpec, TextMetrics};
use super::theme_mapper::DiagramTheme;
use crate::config::{DisplayOptions, NodeMetrics};
use eframe::egui::{Pos2, Vec2};
use regex::Regex;
use std::sync::OnceLock;

/// Separator between a key and its value on a leaf line
const KEY_VALUE_GAP: &str = "   ";

fn numeric_pattern() -> Option<&'static Regex> {
    static NUMERIC: OnceLock<Option<Regex>> = OnceLock::new();
    NUMERIC
        .get_or_init(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").ok())
        .as_ref()
}

/// Everything sizing depends on
pub struct GeometryContext<'a> {
    pub text: &'a dyn TextMetrics,
    pub metrics: &'a NodeMetrics,
    pub options: &'a DisplayOptions,
    pub theme: &'a DiagramTheme,
    pub orientation: Orientation,
}

impl GeometryContext<'_> {
    fn font(&self) -> FontSpec {
        FontSpec::monospace(self.metrics.font_size)
    }

    fn measure(&self, text: &str) -> f32 {
        self.text.measure_width(text, &self.font())
    }
}

/// Classify a scalar's text for coloring
pub fn classify_value(text: &str) -> ValueKind {
    if text.eq_ignore_ascii_case("true") {
        ValueKind::True
    } else if text.eq_ignore_ascii_case("false") {
        ValueKind::False
    } else if text == "null" {
        ValueKind::Null
    } else if numeric_pattern().is_some_and(|re| re.is_match(text)) {
        ValueKind::Number
    } else {
        ValueKind::String
    }
}

/// Text drawn for a value: strings quoted, everything else lower-cased
pub fn display_value(text: &str, kind: ValueKind) -> String {
    match kind {
        ValueKind::String if is_quoted(text) => text.to_string(),
        ValueKind::String => format!("\"{}\"", text),
        _ => text.to_lowercase(),
    }
}

fn is_quoted(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

/// Expand/collapse icon center for a node of the given size, relative to its
/// top-left corner. The icon sits on the trailing edge, where child edges leave.
pub fn icon_anchor(geometry: Geometry, orientation: Orientation) -> Pos2 {
    let Geometry { width, height } = geometry;
    match orientation {
        Orientation::LeftToRight => Pos2::new(width, height / 2.0),
        Orientation::RightToLeft => Pos2::new(0.0, height / 2.0),
        Orientation::TopToBottom => Pos2::new(width / 2.0, height),
        Orientation::BottomToTop => Pos2::new(width / 2.0, 0.0),
    }
}

/// Size one node and style its annotations in place
pub fn compute_geometry(node: &mut DiagramNode, ctx: &GeometryContext) {
    match node.kind {
        NodeKind::Root => {
            let d = ctx.metrics.root_diameter;
            node.geometry = Geometry { width: d, height: d };
            node.icon_anchor = None;
        }
        NodeKind::Leaf => layout_leaf(node, ctx),
        NodeKind::Container => layout_container(node, ctx),
    }
}

/// Size every node of a graph
pub fn compute_all(graph: &mut DiagramGraph, ctx: &GeometryContext) {
    for node in graph.nodes_mut() {
        compute_geometry(node, ctx);
    }
}

/// Reposition icons after an orientation change; sizes are unaffected
pub fn refresh_icon_anchors(graph: &mut DiagramGraph, orientation: Orientation) {
    for node in graph.nodes_mut().filter(|n| n.is_container()) {
        node.icon_anchor = node
            .has_expand_icon()
            .then(|| icon_anchor(node.geometry, orientation));
    }
}

fn layout_leaf(node: &mut DiagramNode, ctx: &GeometryContext) {
    let m = ctx.metrics;
    let lines = node.line_indices();

    for (key, value) in &lines {
        if let Some(k) = key {
            let annotation = &mut node.annotations[*k];
            annotation.display = annotation.text.clone();
            annotation.color = ctx.theme.key_color;
            annotation.anchor = TextAnchor::Start;
        }

        let annotation = &mut node.annotations[*value];
        if annotation.role == AnnotationRole::Value {
            let kind = classify_value(&annotation.text);
            annotation.value_kind = Some(kind);
            annotation.display = display_value(&annotation.text, kind);
            annotation.color = ctx.theme.value_color(kind);
        } else {
            // dangling key with no value
            annotation.display = annotation.text.clone();
            annotation.color = ctx.theme.key_color;
        }
        annotation.anchor = TextAnchor::Start;
    }

    let mut max_line: f32 = 0.0;
    let mut key_widths = Vec::with_capacity(lines.len());
    for (key, value) in &lines {
        let value_text = &node.annotations[*value].display;
        let (line_width, key_width) = match key {
            Some(k) => {
                let key_text = &node.annotations[*k].display;
                let line = format!("{}{}{}", key_text, KEY_VALUE_GAP, value_text);
                let prefix = format!("{}{}", key_text, KEY_VALUE_GAP);
                (ctx.measure(&line), ctx.measure(&prefix))
            }
            None => (ctx.measure(value_text), 0.0),
        };
        max_line = max_line.max(line_width);
        key_widths.push(key_width);
    }

    let count = lines.len() as f32;
    let width = (max_line + m.padding).max(m.min_width);
    let height = (count * m.line_height + 2.0 * m.padding).max(m.min_height);
    node.geometry = Geometry { width, height };
    node.icon_anchor = None;

    let left = m.padding / 2.0;
    for (i, ((key, value), key_width)) in lines.iter().zip(key_widths).enumerate() {
        let y = height * (i + 1) as f32 / (count + 1.0);
        if let Some(k) = key {
            node.annotations[*k].offset = Vec2::new(left, y);
        }
        node.annotations[*value].offset = Vec2::new(left + key_width, y);
    }
}

fn layout_container(node: &mut DiagramNode, ctx: &GeometryContext) {
    let m = ctx.metrics;
    let show_counts = ctx.options.show_counts;

    let key_text = annotation_text(node, AnnotationRole::Key);
    let count_text = annotation_text(node, AnnotationRole::Count);
    let label = if show_counts {
        format!("{}{}", key_text, count_text)
    } else {
        key_text
    };

    let width = (ctx.measure(&label) + m.padding + 2.0 * m.icon_width).max(m.min_width);
    let height = (m.padding * 2.0).max(m.min_height);
    node.geometry = Geometry { width, height };

    let mid_y = height / 2.0;
    for annotation in &mut node.annotations {
        annotation.display = annotation.text.clone();
        match annotation.role {
            AnnotationRole::Key | AnnotationRole::Value => {
                annotation.color = ctx.theme.key_color;
                if show_counts {
                    annotation.anchor = TextAnchor::Start;
                    annotation.offset = Vec2::new(m.padding / 2.0 + m.icon_width, mid_y);
                } else {
                    annotation.anchor = TextAnchor::Middle;
                    annotation.offset = Vec2::new(width / 2.0, mid_y);
                }
            }
            AnnotationRole::Count => {
                annotation.color = ctx.theme.count_color;
                annotation.visible = show_counts;
                annotation.anchor = TextAnchor::End;
                annotation.offset = Vec2::new(width - m.icon_width - m.count_margin, mid_y);
            }
        }
    }

    node.icon_anchor = node
        .has_expand_icon()
        .then(|| icon_anchor(node.geometry, ctx.orientation));
}

fn annotation_text(node: &DiagramNode, role: AnnotationRole) -> String {
    node.annotations
        .iter()
        .find(|a| a.role == role)
        .map(|a| a.text.clone())
        .unwrap_or_default()
}
