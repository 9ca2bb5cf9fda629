//! Tree Layout
//!
//! Places visible nodes in ranks by depth along the orientation's main axis
//! and packs subtrees along the cross axis so siblings never overlap.
//! Collapsed subtrees take no space.

use super::graph::{DiagramGraph, Orientation, ROOT_ID};
use eframe::egui::{Pos2, Rect, Vec2};
use std::collections::HashMap;

/// Layout configuration
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Distance between consecutive ranks
    pub rank_sep: f32,
    /// Distance between neighbouring subtrees within a rank
    pub node_sep: f32,
    /// Padding around the graph
    pub padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rank_sep: 80.0,
            node_sep: 20.0,
            padding: 40.0,
        }
    }
}

/// Node rectangles in canvas coordinates
#[derive(Debug, Clone)]
pub struct TreeLayout {
    pub rects: HashMap<String, Rect>,
    /// Visible node IDs in document order
    pub order: Vec<String>,
    /// Padded extent of all rects; zero-sized when nothing is laid out
    pub bounds: Rect,
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self {
            rects: HashMap::new(),
            order: Vec::new(),
            bounds: Rect::ZERO,
        }
    }
}

impl TreeLayout {
    pub fn rect(&self, id: &str) -> Option<Rect> {
        self.rects.get(id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

struct Placed {
    id: String,
    depth: usize,
    main: f32,
    cross: f32,
    children: Vec<usize>,
}

/// Compute rectangles for every visible node
pub fn compute_layout(graph: &DiagramGraph, orientation: Orientation, config: &LayoutConfig) -> TreeLayout {
    if graph.root().is_none() {
        return TreeLayout::default();
    }

    let horizontal = orientation.is_horizontal();
    let split = |size: Vec2| if horizontal { (size.x, size.y) } else { (size.y, size.x) };

    // Pre-order walk over visible nodes; parents always precede children
    let mut placed: Vec<Placed> = Vec::new();
    let mut stack: Vec<(String, usize, Option<usize>)> = vec![(ROOT_ID.to_string(), 0, None)];
    while let Some((id, depth, parent)) = stack.pop() {
        let Some(node) = graph.get_node(&id) else {
            continue;
        };
        let (main, cross) = split(node.geometry.size());
        let index = placed.len();
        if let Some(p) = parent {
            placed[p].children.push(index);
        }
        if node.shows_children() {
            for child in graph.children_of(&id).into_iter().rev() {
                stack.push((child.to_string(), depth + 1, Some(index)));
            }
        }
        placed.push(Placed {
            id,
            depth,
            main,
            cross,
            children: Vec::new(),
        });
    }

    // Rank thickness along the main axis
    let ranks = placed.iter().map(|p| p.depth).max().unwrap_or(0) + 1;
    let mut rank_size = vec![0.0f32; ranks];
    for p in &placed {
        rank_size[p.depth] = rank_size[p.depth].max(p.main);
    }
    let mut rank_offset = Vec::with_capacity(ranks);
    let mut offset = 0.0;
    for size in &rank_size {
        rank_offset.push(offset);
        offset += size + config.rank_sep;
    }
    let total_main = offset - config.rank_sep;

    // Subtree extents along the cross axis, children before parents
    let mut extent = vec![0.0f32; placed.len()];
    for i in (0..placed.len()).rev() {
        let children = &placed[i].children;
        let block = children_block(children, &extent, config.node_sep);
        extent[i] = placed[i].cross.max(block);
    }

    let mut start = vec![0.0f32; placed.len()];
    let mut layout = TreeLayout::default();
    let mut min = Pos2::new(f32::MAX, f32::MAX);
    let mut max = Pos2::new(f32::MIN, f32::MIN);

    for i in 0..placed.len() {
        let p = &placed[i];
        let block = children_block(&p.children, &extent, config.node_sep);
        let mut child_start = start[i] + (extent[i] - block) / 2.0;
        for &c in &p.children {
            start[c] = child_start;
            child_start += extent[c] + config.node_sep;
        }

        let cross = start[i] + (extent[i] - p.cross) / 2.0;
        let main = if orientation.is_reversed() {
            total_main - rank_offset[p.depth] - p.main
        } else {
            rank_offset[p.depth]
        };
        let (x, y, w, h) = if horizontal {
            (main, cross, p.main, p.cross)
        } else {
            (cross, main, p.cross, p.main)
        };

        let rect = Rect::from_min_size(
            Pos2::new(x + config.padding, y + config.padding),
            Vec2::new(w, h),
        );
        min = min.min(rect.min);
        max = max.max(rect.max);
        layout.rects.insert(p.id.clone(), rect);
        layout.order.push(p.id.clone());
    }

    if min.x <= max.x && min.y <= max.y {
        layout.bounds = Rect::from_min_max(min, max).expand(config.padding);
    }
    layout
}

fn children_block(children: &[usize], extent: &[f32], sep: f32) -> f32 {
    if children.is_empty() {
        return 0.0;
    }
    children.iter().map(|&c| extent[c]).sum::<f32>() + sep * (children.len() - 1) as f32
}

/// Edge endpoints: the parent's trailing side to the child's leading side
pub fn edge_endpoints(parent: Rect, child: Rect, orientation: Orientation) -> (Pos2, Pos2) {
    match orientation {
        Orientation::LeftToRight => (parent.right_center(), child.left_center()),
        Orientation::RightToLeft => (parent.left_center(), child.right_center()),
        Orientation::TopToBottom => (parent.center_bottom(), child.center_top()),
        Orientation::BottomToTop => (parent.center_top(), child.center_bottom()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayOptions, NodeMetrics};
    use crate::diagram::builder::build;
    use crate::diagram::geometry::{compute_all, GeometryContext};
    use crate::diagram::metrics::EstimatedMetrics;
    use crate::diagram::theme_mapper::DiagramTheme;
    use serde_json::json;

    fn sized(value: serde_json::Value) -> DiagramGraph {
        let mut graph = build(&value).unwrap();
        let text = EstimatedMetrics::default();
        let metrics = NodeMetrics::default();
        let options = DisplayOptions::default();
        let theme = DiagramTheme::dark();
        let ctx = GeometryContext {
            text: &text,
            metrics: &metrics,
            options: &options,
            theme: &theme,
            orientation: Orientation::LeftToRight,
        };
        compute_all(&mut graph, &ctx);
        graph
    }

    fn sample() -> DiagramGraph {
        sized(json!({"a": {"x": 1}, "b": {"y": [1, 2]}, "c": [{"z": 1}, {"z": 2}]}))
    }

    #[test]
    fn test_ranks_follow_orientation() {
        let graph = sample();
        let config = LayoutConfig::default();

        let ltr = compute_layout(&graph, Orientation::LeftToRight, &config);
        assert!(ltr.rect("root").unwrap().max.x < ltr.rect("root/0").unwrap().min.x);

        let rtl = compute_layout(&graph, Orientation::RightToLeft, &config);
        assert!(rtl.rect("root").unwrap().min.x > rtl.rect("root/0").unwrap().max.x);

        let ttb = compute_layout(&graph, Orientation::TopToBottom, &config);
        assert!(ttb.rect("root").unwrap().max.y < ttb.rect("root/0").unwrap().min.y);

        let btt = compute_layout(&graph, Orientation::BottomToTop, &config);
        assert!(btt.rect("root").unwrap().min.y > btt.rect("root/0").unwrap().max.y);
    }

    #[test]
    fn test_no_overlap() {
        let graph = sample();
        for &orientation in Orientation::all() {
            let layout = compute_layout(&graph, orientation, &LayoutConfig::default());
            let rects: Vec<Rect> = layout.order.iter().map(|id| layout.rect(id).unwrap()).collect();
            for (i, a) in rects.iter().enumerate() {
                for b in &rects[i + 1..] {
                    assert!(!a.shrink(0.5).intersects(b.shrink(0.5)), "{:?}", orientation);
                }
                assert!(layout.bounds.contains_rect(*a));
            }
        }
    }

    #[test]
    fn test_collapsed_subtree_is_skipped() {
        let mut graph = sample();
        graph.get_node_mut("root/2").unwrap().is_expanded = Some(false);
        let layout = compute_layout(&graph, Orientation::LeftToRight, &LayoutConfig::default());
        assert!(layout.rect("root/2").is_some());
        assert!(layout.rect("root/2/0").is_none());
        assert_eq!(layout.order, graph.visible_node_ids());
    }

    #[test]
    fn test_parent_centered_over_children() {
        let graph = sample();
        let layout = compute_layout(&graph, Orientation::TopToBottom, &LayoutConfig::default());
        let parent = layout.rect("root/2").unwrap();
        let first = layout.rect("root/2/0").unwrap();
        let last = layout.rect("root/2/1").unwrap();
        let span_center = (first.min.x + last.max.x) / 2.0;
        assert!((parent.center().x - span_center).abs() < 1e-3);
    }

    #[test]
    fn test_deep_chain() {
        let mut value = json!(1);
        for _ in 0..100 {
            value = json!([value, {}]);
        }
        let graph = sized(value);
        let layout = compute_layout(&graph, Orientation::LeftToRight, &LayoutConfig::default());
        assert_eq!(layout.rects.len(), graph.len());
    }

    #[test]
    fn test_empty_graph_has_empty_bounds() {
        let layout = compute_layout(&DiagramGraph::new(), Orientation::LeftToRight, &LayoutConfig::default());
        assert!(layout.is_empty());
        assert!(layout.order.is_empty());
        assert_eq!(layout.bounds, Rect::ZERO);
        assert_eq!(layout.bounds.width(), 0.0);
    }

    #[test]
    fn test_edge_endpoints() {
        let parent = Rect::from_min_size(Pos2::ZERO, Vec2::new(10.0, 10.0));
        let child = Rect::from_min_size(Pos2::new(30.0, 0.0), Vec2::new(10.0, 10.0));
        let (from, to) = edge_endpoints(parent, child, Orientation::LeftToRight);
        assert_eq!(from, Pos2::new(10.0, 5.0));
        assert_eq!(to, Pos2::new(30.0, 5.0));
    }
}
