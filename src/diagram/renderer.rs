//! Interactive Diagram Renderer
//!
//! Native egui rendering of the diagram graph with:
//! - Pan and zoom (mouse wheel + drag)
//! - Node selection and hover
//! - Expand/collapse icon clicks
//! - Recenter and fit requests from navigation

use super::actions::Action;
use super::graph::{DiagramGraph, DiagramNode, Highlight, NodeKind, Orientation, TextAnchor};
use super::layout::{edge_endpoints, TreeLayout};
use super::navigation::RendererTask;
use super::theme_mapper::DiagramTheme;
use crate::config::NodeMetrics;
use eframe::egui::{self, Align2, FontId, Painter, Pos2, Rect, Sense, Stroke, Vec2};

/// Diagram viewer widget; the graph and its layout are owned by the caller
pub struct DiagramViewer {
    /// Theme for rendering
    pub theme: DiagramTheme,

    /// Sizes used for text and icons
    pub metrics: NodeMetrics,

    /// Current pan offset
    pub pan: Vec2,

    /// Current zoom level (1.0 = 100%)
    pub zoom: f32,

    pub min_zoom: f32,
    pub max_zoom: f32,

    /// Whether to show grid
    pub show_grid: bool,

    /// Grid size in pixels
    pub grid_size: f32,

    /// Currently selected node ID
    pub selected_node: Option<String>,

    /// Currently hovered node ID
    pub hovered_node: Option<String>,

    /// Canvas rect from the last frame, needed to fit before the first paint
    last_rect: Option<Rect>,

    /// Fit requested before the canvas size was known
    pending_fit: bool,
}

impl Default for DiagramViewer {
    fn default() -> Self {
        Self::new(DiagramTheme::dark(), NodeMetrics::default())
    }
}

impl DiagramViewer {
    pub fn new(theme: DiagramTheme, metrics: NodeMetrics) -> Self {
        Self {
            theme,
            metrics,
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
            show_grid: true,
            grid_size: 20.0,
            selected_node: None,
            hovered_node: None,
            last_rect: None,
            pending_fit: true,
        }
    }

    /// Run a navigation request against the current layout
    pub fn apply_task(&mut self, task: &RendererTask, layout: &TreeLayout) {
        match task {
            RendererTask::CenterOn(id) => self.center_on_node(id, layout),
            RendererTask::Relayout { fit: true } => self.fit_to_view(layout),
            RendererTask::Relayout { fit: false } => {}
        }
    }

    /// Scale and pan so the whole layout is visible
    pub fn fit_to_view(&mut self, layout: &TreeLayout) {
        let Some(rect) = self.last_rect else {
            self.pending_fit = true;
            return;
        };
        self.pending_fit = false;

        let bounds = layout.bounds;
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            self.zoom = 1.0;
            self.pan = Vec2::ZERO;
            return;
        }
        self.zoom = (rect.width() / bounds.width())
            .min(rect.height() / bounds.height())
            .clamp(self.min_zoom, 1.0);
        self.pan = -bounds.center().to_vec2() * self.zoom;
    }

    /// Center on a specific node
    pub fn center_on_node(&mut self, node_id: &str, layout: &TreeLayout) {
        if let Some(rect) = layout.rect(node_id) {
            self.pan = -rect.center().to_vec2() * self.zoom;
        }
    }

    /// Draw the diagram and report the user's interactions
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        graph: &DiagramGraph,
        layout: &TreeLayout,
        orientation: Orientation,
    ) -> Vec<Action> {
        let available_size = ui.available_size();
        let (response, painter) = ui.allocate_painter(available_size, Sense::click_and_drag());
        let rect = response.rect;
        self.last_rect = Some(rect);
        if self.pending_fit {
            self.fit_to_view(layout);
        }

        painter.rect_filled(rect, 0.0, self.theme.canvas_bg);
        if self.show_grid {
            self.draw_grid(&painter, rect);
        }

        let actions = self.handle_input(ui, &response, graph, layout);
        let transform = self.get_transform(rect);

        // Edges first (behind nodes)
        for edge in graph.edges() {
            if let (Some(from), Some(to)) = (layout.rect(&edge.source_id), layout.rect(&edge.target_id)) {
                let (start, end) = edge_endpoints(from, to, orientation);
                painter.line_segment(
                    [transform.to_screen(start), transform.to_screen(end)],
                    Stroke::new(1.5, self.theme.edge_color),
                );
            }
        }

        for id in &layout.order {
            if let (Some(node), Some(world)) = (graph.get_node(id), layout.rect(id)) {
                self.draw_node(&painter, node, transform.transform_rect(world));
            }
        }

        actions
    }

    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        graph: &DiagramGraph,
        layout: &TreeLayout,
    ) -> Vec<Action> {
        let mut actions = Vec::new();

        // Zoom with scroll wheel
        if response.hovered() {
            let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 {
                let zoom_delta = 1.0 + scroll_delta * 0.001;
                let new_zoom = (self.zoom * zoom_delta).clamp(self.min_zoom, self.max_zoom);
                self.pan *= new_zoom / self.zoom;
                self.zoom = new_zoom;
            }
        }

        // Pan with any drag on empty canvas
        if response.dragged() {
            self.pan += response.drag_delta();
        }

        self.hovered_node = response
            .hover_pos()
            .map(|pos| self.screen_to_world(pos, response.rect))
            .and_then(|world| hit_node(layout, world))
            .map(str::to_string);

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let world = self.screen_to_world(pos, response.rect);
                if let Some(id) = self.hit_icon(graph, layout, world) {
                    actions.push(Action::ToggleNode(id));
                } else {
                    let hit = hit_node(layout, world).map(str::to_string);
                    self.selected_node = hit.clone();
                    actions.push(Action::Select(hit));
                }
            }
        }

        if response.hovered() {
            ui.input(|input| {
                if input.key_pressed(egui::Key::F) && !input.modifiers.command {
                    actions.push(Action::FitView);
                }
                if input.key_pressed(egui::Key::G) && !input.modifiers.command {
                    self.show_grid = !self.show_grid;
                }
            });
        }

        actions
    }

    fn hit_icon(&self, graph: &DiagramGraph, layout: &TreeLayout, world: Pos2) -> Option<String> {
        let radius = self.metrics.icon_width / 2.0;
        layout
            .order
            .iter()
            .filter_map(|id| {
                let node = graph.get_node(id)?;
                let anchor = node.icon_anchor?;
                let rect = layout.rect(id)?;
                Some((id, rect.min + anchor.to_vec2()))
            })
            .find(|(_, center)| center.distance(world) <= radius)
            .map(|(id, _)| id.clone())
    }

    /// Get the transformation for world -> screen coordinates
    fn get_transform(&self, rect: Rect) -> Transform {
        Transform {
            offset: rect.center().to_vec2() + self.pan,
            zoom: self.zoom,
        }
    }

    /// Convert screen coordinates to world coordinates
    fn screen_to_world(&self, screen_pos: Pos2, rect: Rect) -> Pos2 {
        self.get_transform(rect).to_world(screen_pos)
    }

    fn draw_grid(&self, painter: &Painter, rect: Rect) {
        let grid_size = self.grid_size * self.zoom;
        if grid_size < 4.0 {
            return;
        }
        let origin = rect.center() + self.pan;
        let offset = Vec2::new(
            (origin.x - rect.min.x).rem_euclid(grid_size),
            (origin.y - rect.min.y).rem_euclid(grid_size),
        );
        let start = rect.min + offset;
        let stroke = Stroke::new(1.0, self.theme.grid_color);

        let mut x = start.x;
        while x < rect.max.x {
            painter.line_segment([Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)], stroke);
            x += grid_size;
        }

        let mut y = start.y;
        while y < rect.max.y {
            painter.line_segment([Pos2::new(rect.min.x, y), Pos2::new(rect.max.x, y)], stroke);
            y += grid_size;
        }
    }

    fn draw_node(&self, painter: &Painter, node: &DiagramNode, rect: Rect) {
        let selected = self.selected_node.as_deref() == Some(node.id.as_str());
        let hovered = self.hovered_node.as_deref() == Some(node.id.as_str());
        let highlight = node.style.highlight;

        let fill = self.theme.fill_for(highlight);
        let stroke_color = self.theme.stroke_for(highlight, selected, hovered);
        let stroke_width = if selected || highlight == Highlight::Focused { 2.5 } else { 1.0 };
        let stroke = Stroke::new(stroke_width, stroke_color);

        if node.kind == NodeKind::Root {
            painter.circle(rect.center(), rect.width() / 2.0, self.theme.root_fill, stroke);
            return;
        }
        painter.rect(rect, 4.0 * self.zoom, fill, stroke);

        let font = FontId::monospace(self.metrics.font_size * self.zoom);
        for annotation in node.annotations.iter().filter(|a| a.visible) {
            let align = match annotation.anchor {
                TextAnchor::Start => Align2::LEFT_CENTER,
                TextAnchor::Middle => Align2::CENTER_CENTER,
                TextAnchor::End => Align2::RIGHT_CENTER,
            };
            painter.text(
                rect.min + annotation.offset * self.zoom,
                align,
                &annotation.display,
                font.clone(),
                annotation.color,
            );
        }

        if let Some(anchor) = node.icon_anchor {
            let center = rect.min + anchor.to_vec2() * self.zoom;
            let radius = self.metrics.icon_width / 2.0 * self.zoom;
            painter.circle(
                center,
                radius,
                self.theme.icon_fill,
                Stroke::new(1.0, self.theme.icon_stroke),
            );
            let glyph = if node.shows_children() { "−" } else { "+" };
            painter.text(
                center,
                Align2::CENTER_CENTER,
                glyph,
                FontId::monospace(radius * 1.6),
                self.theme.icon_stroke,
            );
        }
    }
}

fn hit_node(layout: &TreeLayout, world: Pos2) -> Option<&str> {
    layout
        .order
        .iter()
        .rev()
        .find(|id| layout.rect(id).is_some_and(|r| r.contains(world)))
        .map(String::as_str)
}

/// Coordinate transformation helper
struct Transform {
    offset: Vec2,
    zoom: f32,
}

impl Transform {
    fn to_screen(&self, world: Pos2) -> Pos2 {
        Pos2::new(
            world.x * self.zoom + self.offset.x,
            world.y * self.zoom + self.offset.y,
        )
    }

    fn to_world(&self, screen: Pos2) -> Pos2 {
        Pos2::new(
            (screen.x - self.offset.x) / self.zoom,
            (screen.y - self.offset.y) / self.zoom,
        )
    }

    fn transform_rect(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn layout_with(id: &str, rect: Rect) -> TreeLayout {
        let mut rects = HashMap::new();
        rects.insert(id.to_string(), rect);
        TreeLayout {
            rects,
            order: vec![id.to_string()],
            bounds: rect,
        }
    }

    #[test]
    fn test_transform_roundtrip() {
        let transform = Transform {
            offset: Vec2::new(100.0, 50.0),
            zoom: 2.0,
        };
        let world = Pos2::new(12.0, -7.0);
        let back = transform.to_world(transform.to_screen(world));
        assert!((back - world).length() < 1e-4);
    }

    #[test]
    fn test_center_on_node_puts_it_in_the_middle() {
        let mut viewer = DiagramViewer::default();
        viewer.zoom = 1.5;
        let node = Rect::from_min_size(Pos2::new(200.0, 80.0), Vec2::new(60.0, 40.0));
        let layout = layout_with("n", node);

        viewer.apply_task(&RendererTask::CenterOn("n".into()), &layout);
        let canvas = Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0));
        let screen = viewer.get_transform(canvas).to_screen(node.center());
        assert!((screen - canvas.center()).length() < 1e-3);
    }

    #[test]
    fn test_fit_waits_for_canvas() {
        let mut viewer = DiagramViewer::default();
        let layout = layout_with("n", Rect::from_min_size(Pos2::ZERO, Vec2::new(4000.0, 100.0)));
        viewer.fit_to_view(&layout);
        assert!(viewer.pending_fit);

        viewer.last_rect = Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)));
        viewer.fit_to_view(&layout);
        assert!(!viewer.pending_fit);
        assert!((viewer.zoom - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_hit_node() {
        let layout = layout_with("n", Rect::from_min_size(Pos2::ZERO, Vec2::splat(10.0)));
        assert_eq!(hit_node(&layout, Pos2::new(5.0, 5.0)), Some("n"));
        assert_eq!(hit_node(&layout, Pos2::new(50.0, 5.0)), None);
    }
}
