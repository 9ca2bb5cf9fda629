//! Diagram Session
//!
//! Owns the document text and the live graph built from it. Every edit
//! rebuilds the graph from scratch; a rebuild that fails leaves the previous
//! diagram in place and marks the session invalid until the next good edit.

use crate::config::{CollapsePolicy, DiagramConfig};
use crate::diagram::actions::Action;
use crate::diagram::builder::build;
use crate::diagram::document::{convert, parse_document, release, DocumentFormat};
use crate::diagram::geometry::{compute_all, GeometryContext};
use crate::diagram::graph::{DiagramGraph, Orientation};
use crate::diagram::layout::{compute_layout, LayoutConfig, TreeLayout};
use crate::diagram::metrics::TextMetrics;
use crate::diagram::navigation::{Navigator, RendererTask, SearchObserver, SearchState};
use crate::diagram::theme_mapper::DiagramTheme;
use crate::error::{DiagramError, Result};

/// What the details panel and clipboard receive for a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDetails {
    pub path: String,
    /// `key: value` lines
    pub text: String,
}

pub struct Session {
    text: String,
    format: DocumentFormat,
    config: DiagramConfig,
    theme: DiagramTheme,
    text_metrics: Box<dyn TextMetrics>,
    graph: DiagramGraph,
    layout: TreeLayout,
    layout_config: LayoutConfig,
    navigator: Navigator,
    /// Message of the last rejected rebuild
    invalid: Option<String>,
    selected: Option<String>,
}

impl Session {
    pub fn new(
        config: DiagramConfig,
        text_metrics: Box<dyn TextMetrics>,
        observer: Box<dyn SearchObserver>,
    ) -> Self {
        Self {
            text: String::new(),
            format: config.default_format,
            theme: DiagramTheme::from_options(&config.display),
            navigator: Navigator::new(config.collapse_policy, observer),
            config,
            text_metrics,
            graph: DiagramGraph::new(),
            layout: TreeLayout::default(),
            layout_config: LayoutConfig::default(),
            invalid: None,
            selected: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    pub fn theme(&self) -> &DiagramTheme {
        &self.theme
    }

    pub fn graph(&self) -> &DiagramGraph {
        &self.graph
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    pub fn orientation(&self) -> Orientation {
        self.navigator.orientation()
    }

    pub fn search_state(&self) -> &SearchState {
        self.navigator.search_state()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Whether the current text was rejected
    pub fn is_invalid(&self) -> bool {
        self.invalid.is_some()
    }

    pub fn invalid_message(&self) -> Option<&str> {
        self.invalid.as_deref()
    }

    /// Whether the next whole-graph toggle expands, per the collapse policy
    pub fn next_toggle_expands(&self) -> bool {
        self.navigator.next_toggle_expands(&self.graph)
    }

    pub fn set_collapse_policy(&mut self, policy: CollapsePolicy) {
        self.config.collapse_policy = policy;
        self.navigator.set_policy(policy);
    }

    /// Replace the text in the current format and rebuild
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.text = text.into();
        self.rebuild()
    }

    /// Replace both text and format, e.g. after opening a file
    pub fn load(&mut self, text: impl Into<String>, format: DocumentFormat) -> Result<()> {
        self.format = format;
        self.set_text(text)
    }

    /// Build a fresh graph from the current text; on failure the previous graph stays
    pub fn rebuild(&mut self) -> Result<()> {
        let value = match parse_document(&self.text, self.format) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Keeping previous diagram: {}", e);
                self.invalid = Some(e.to_string());
                return Err(e);
            }
        };

        let built = build(&value);
        release(value);
        let mut graph = match built {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("Tree builder failed: {}", e);
                return Err(e);
            }
        };

        let ctx = GeometryContext {
            text: self.text_metrics.as_ref(),
            metrics: &self.config.metrics,
            options: &self.config.display,
            theme: &self.theme,
            orientation: self.navigator.orientation(),
        };
        compute_all(&mut graph, &ctx);

        self.graph = graph;
        self.invalid = None;
        if let Some(id) = &self.selected {
            if self.graph.get_node(id).is_none() {
                self.selected = None;
            }
        }
        self.navigator.refresh_search(&mut self.graph);
        self.relayout();

        log::debug!(
            "Rebuilt {} diagram: {} nodes, {} edges",
            self.format,
            self.graph.len(),
            self.graph.edges().len()
        );
        Ok(())
    }

    /// Re-run geometry for every node, e.g. after a display option changed
    fn remeasure(&mut self) {
        let ctx = GeometryContext {
            text: self.text_metrics.as_ref(),
            metrics: &self.config.metrics,
            options: &self.config.display,
            theme: &self.theme,
            orientation: self.navigator.orientation(),
        };
        compute_all(&mut self.graph, &ctx);
    }

    fn relayout(&mut self) {
        self.layout = compute_layout(&self.graph, self.navigator.orientation(), &self.layout_config);
    }

    /// Dispatch one action
    pub fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::SetText(text) => return self.set_text(text),
            Action::Search(query) => {
                self.navigator.search(&mut self.graph, &query);
            }
            Action::NextMatch => {
                self.navigator.advance(&mut self.graph);
            }
            Action::ClearSearch => self.navigator.clear_search(&mut self.graph),
            Action::ToggleCollapseAll => {
                self.navigator.toggle_collapse_all(&mut self.graph);
            }
            Action::ExpandAll => self.navigator.expand_all(&mut self.graph),
            Action::CollapseAll => self.navigator.collapse_all(&mut self.graph),
            Action::ToggleNode(id) => {
                self.navigator.toggle_node(&mut self.graph, &id)?;
            }
            Action::RotateLayout => {
                self.navigator.rotate_orientation(&mut self.graph);
            }
            Action::SetShowCounts(show) => {
                self.config.display.show_counts = show;
                self.remeasure();
                self.navigator.schedule_deferred(RendererTask::Relayout { fit: false });
                return Ok(());
            }
            Action::SetTheme(variant) => {
                self.config.display.theme = variant;
                self.theme = DiagramTheme::from_options(&self.config.display);
                self.remeasure();
                self.navigator.schedule_deferred(RendererTask::Relayout { fit: false });
                return Ok(());
            }
            Action::SetFormat(format) => {
                self.format = format;
                return self.rebuild();
            }
            Action::ConvertTo(format) => return self.convert_to(format),
            Action::Select(id) => {
                self.selected = id;
                return Ok(());
            }
            Action::FitView => {
                self.navigator.request(RendererTask::Relayout { fit: true });
                return Ok(());
            }
        }
        self.relayout();
        Ok(())
    }

    /// Rewrite the text in another format; the text is untouched on failure
    pub fn convert_to(&mut self, format: DocumentFormat) -> Result<()> {
        if format == self.format {
            return Ok(());
        }
        let converted = convert(&self.text, self.format, format).map_err(|e| {
            log::warn!("Conversion to {} failed: {}", format, e);
            e
        })?;
        self.text = converted;
        self.format = format;
        self.rebuild()
    }

    /// Renderer work requested by the last actions
    pub fn take_tasks(&mut self) -> Vec<RendererTask> {
        self.navigator.take_tasks()
    }

    /// Run the deferred relayout, if one is pending; called once the batch
    /// that scheduled it has been rendered
    pub fn settle(&mut self) -> Option<RendererTask> {
        let task = self.navigator.take_deferred()?;
        self.relayout();
        Some(task)
    }

    /// Path and key:value text of a node
    pub fn details(&self, id: &str) -> Result<NodeDetails> {
        let node = self
            .graph
            .get_node(id)
            .ok_or_else(|| DiagramError::UnknownNode(id.to_string()))?;
        let path = self.graph.reconstruct_path(id).unwrap_or_else(|| node.path.clone());
        Ok(NodeDetails {
            path,
            text: node.display_text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::graph::{Highlight, NodeKind};
    use crate::diagram::metrics::EstimatedMetrics;
    use crate::diagram::navigation::NoopObserver;

    fn session() -> Session {
        Session::new(
            DiagramConfig::default(),
            Box::new(EstimatedMetrics::default()),
            Box::new(NoopObserver),
        )
    }

    #[test]
    fn test_rebuild_on_edit() {
        let mut s = session();
        s.set_text(r#"{"a": 1, "b": "x"}"#).unwrap();
        assert_eq!(s.graph().len(), 2);
        assert!(!s.is_invalid());
        assert_eq!(s.layout().rects.len(), 2);
        assert!(s.graph().nodes().iter().all(|n| n.geometry.width > 0.0));

        // last write wins
        s.set_text(r#"{"a": {"b": 1}}"#).unwrap();
        assert_eq!(s.graph().len(), 3);
    }

    #[test]
    fn test_invalid_text_keeps_previous_diagram() {
        let mut s = session();
        s.set_text(r#"{"a": {"b": 1}}"#).unwrap();
        let before: Vec<String> = s.graph().nodes().iter().map(|n| n.id.clone()).collect();

        let err = s.set_text(r#"{"a": "#).unwrap_err();
        assert!(err.is_invalid_content());
        assert!(s.is_invalid());
        let after: Vec<String> = s.graph().nodes().iter().map(|n| n.id.clone()).collect();
        assert_eq!(before, after);

        s.set_text("[1]").unwrap();
        assert!(!s.is_invalid());
    }

    #[test]
    fn test_xml_input() {
        let mut s = session();
        s.load("<a x=\"true\"><b>1</b></a>", DocumentFormat::Xml).unwrap();
        assert_eq!(s.format(), DocumentFormat::Xml);
        assert!(s.graph().nodes().iter().any(|n| n.kind == NodeKind::Container));

        assert!(s.set_text("not xml").is_err());
        assert!(s.is_invalid());
    }

    #[test]
    fn test_convert_failure_retains_text() {
        let mut s = session();
        s.set_text("[1, 2]").unwrap();
        let err = s.apply(Action::ConvertTo(DocumentFormat::Xml)).unwrap_err();
        assert!(matches!(err, DiagramError::Conversion(_)));
        assert_eq!(s.text(), "[1, 2]");
        assert_eq!(s.format(), DocumentFormat::Json);

        s.set_text(r#"{"a": {"b": "c"}}"#).unwrap();
        s.apply(Action::ConvertTo(DocumentFormat::Xml)).unwrap();
        assert_eq!(s.format(), DocumentFormat::Xml);
        assert!(s.text().starts_with("<a>"));
        assert_eq!(s.graph().len(), 3);
    }

    #[test]
    fn test_show_counts_relayout_is_deferred() {
        let mut s = session();
        s.set_text(r#"{"some_long_name": {"b": 1}}"#).unwrap();
        let before = s.layout().rect("root/0").unwrap().width();

        s.apply(Action::SetShowCounts(false)).unwrap();
        assert!(s.graph().get_node("root/0").unwrap().geometry.width < before);
        assert_eq!(s.layout().rect("root/0").unwrap().width(), before);

        assert_eq!(s.settle(), Some(RendererTask::Relayout { fit: false }));
        assert!(s.layout().rect("root/0").unwrap().width() < before);
        assert_eq!(s.settle(), None);
    }

    #[test]
    fn test_search_survives_rebuild() {
        let mut s = session();
        s.set_text(r#"{"a": {"name": "x"}, "b": {"name": "y"}}"#).unwrap();
        s.apply(Action::Search("name".into())).unwrap();
        assert_eq!(s.search_state().matches.len(), 2);

        s.take_tasks();
        s.set_text(r#"{"a": {"name": "x"}}"#).unwrap();
        // typing with an active query must not move the viewport
        assert!(s.take_tasks().is_empty());
        assert_eq!(s.search_state().matches.len(), 1);
        let focused = s.search_state().focused().unwrap().to_string();
        assert_eq!(s.graph().get_node(&focused).unwrap().style.highlight, Highlight::Focused);
    }

    #[test]
    fn test_collapse_hides_from_layout() {
        let mut s = session();
        s.set_text(r#"{"a": {"b": {"c": 1}}}"#).unwrap();
        assert_eq!(s.layout().rects.len(), 4);

        s.apply(Action::ToggleCollapseAll).unwrap();
        assert_eq!(s.layout().rects.len(), 2);
        s.apply(Action::ToggleCollapseAll).unwrap();
        assert_eq!(s.layout().rects.len(), 4);

        s.apply(Action::ToggleNode("root/0/0".into())).unwrap();
        assert_eq!(s.layout().rects.len(), 3);
        assert!(s.apply(Action::ToggleNode("nope".into())).is_err());
    }

    #[test]
    fn test_details() {
        let mut s = session();
        s.set_text(r#"{"user": {"tags": [{"k": "v", "n": 2}]}}"#).unwrap();
        let leaf = s
            .graph()
            .nodes()
            .iter()
            .find(|n| n.is_leaf())
            .map(|n| n.id.clone())
            .unwrap();
        let details = s.details(&leaf).unwrap();
        assert_eq!(details.path, "Root.user.tags[0]");
        assert_eq!(details.text, "k: \"v\"\nn: 2");
        assert!(s.details("missing").is_err());
    }

    #[test]
    fn test_deep_documents_build() {
        let depth = 3_000;
        let mut s = session();
        s.set_text(format!("{}1{}", "[".repeat(depth), "]".repeat(depth)))
            .unwrap();
        assert!(!s.is_invalid());
        // every array holds one array, the innermost folds into a leaf
        assert_eq!(s.graph().len(), depth + 1);
        assert_eq!(s.layout().rects.len(), depth + 1);

        s.load(
            format!("{}x{}", "<a>".repeat(depth), "</a>".repeat(depth)),
            DocumentFormat::Xml,
        )
        .unwrap();
        assert!(!s.is_invalid());
        assert_eq!(s.graph().len(), depth + 1);
    }

    #[test]
    fn test_next_toggle_follows_policy() {
        let mut s = session();
        s.set_text(r#"{"a": {"b": {"c": 1}}, "d": {"e": 1}}"#).unwrap();
        assert!(!s.next_toggle_expands());

        s.apply(Action::ToggleCollapseAll).unwrap();
        s.apply(Action::ToggleNode("root/0".into())).unwrap();
        s.apply(Action::ToggleNode("root/1".into())).unwrap();
        assert!(s.next_toggle_expands());

        s.set_collapse_policy(CollapsePolicy::Derived);
        assert!(!s.next_toggle_expands());
    }

    #[test]
    fn test_selection_cleared_when_node_disappears() {
        let mut s = session();
        s.set_text(r#"{"a": {"b": 1}}"#).unwrap();
        s.apply(Action::Select(Some("root/0".into()))).unwrap();
        s.set_text(r#"{"a": {"b": 2}}"#).unwrap();
        assert_eq!(s.selected(), Some("root/0"));
        s.set_text("[]").unwrap();
        assert_eq!(s.selected(), None);
    }
}
