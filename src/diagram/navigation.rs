//! Graph Navigation Operations
//!
//! Search with two-tier highlighting, whole-graph and per-node
//! collapse/expand, and orientation rotation. All operations mutate the live
//! graph in place and leave viewport requests for the renderer.

use super::geometry::refresh_icon_anchors;
use super::graph::{DiagramGraph, Highlight, Orientation};
use crate::config::CollapsePolicy;
use crate::error::{DiagramError, Result};

/// Receives search counter updates; injected by the host UI
pub trait SearchObserver {
    /// `current` is 1-based; `(0, 0)` means the query matched nothing
    fn on_search_update(&mut self, current: usize, total: usize);
    fn on_search_clear(&mut self);
}

/// Observer that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {
    fn on_search_update(&mut self, _current: usize, _total: usize) {}
    fn on_search_clear(&mut self) {}
}

/// Work requested from the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererTask {
    /// Pan so the node is centered in the viewport
    CenterOn(String),
    /// Re-run layout, optionally fitting the whole tree into view
    Relayout { fit: bool },
}

/// Single-slot queue for a task that must run after the current batch
#[derive(Debug, Default, Clone)]
pub struct Deferred {
    slot: Option<RendererTask>,
}

impl Deferred {
    /// Schedule a task; a later request replaces an earlier one, but a
    /// pending fit is never downgraded
    pub fn schedule(&mut self, task: RendererTask) {
        let task = match (&self.slot, task) {
            (Some(RendererTask::Relayout { fit: true }), RendererTask::Relayout { .. }) => {
                RendererTask::Relayout { fit: true }
            }
            (_, task) => task,
        };
        self.slot = Some(task);
    }

    pub fn take(&mut self) -> Option<RendererTask> {
        self.slot.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }
}

/// Matches of the current query and the focused position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    /// Matching node IDs in document order
    pub matches: Vec<String>,
    pub cursor: usize,
}

impl SearchState {
    pub fn focused(&self) -> Option<&str> {
        self.matches.get(self.cursor).map(String::as_str)
    }

    /// `(current, total)` with a 1-based current, `(0, 0)` when nothing matches
    pub fn position(&self) -> (usize, usize) {
        if self.matches.is_empty() {
            (0, 0)
        } else {
            (self.cursor + 1, self.matches.len())
        }
    }
}

/// Navigation state machine over a built graph
pub struct Navigator {
    search: SearchState,
    orientation: Orientation,
    /// Chooses the next whole-graph toggle branch under `CollapsePolicy::Toggle`
    entire_graph_collapsed: bool,
    policy: CollapsePolicy,
    observer: Box<dyn SearchObserver>,
    tasks: Vec<RendererTask>,
    deferred: Deferred,
}

impl Navigator {
    pub fn new(policy: CollapsePolicy, observer: Box<dyn SearchObserver>) -> Self {
        Self {
            search: SearchState::default(),
            orientation: Orientation::default(),
            entire_graph_collapsed: false,
            policy,
            observer,
            tasks: Vec::new(),
            deferred: Deferred::default(),
        }
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn policy(&self) -> CollapsePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CollapsePolicy) {
        self.policy = policy;
    }

    pub fn is_entire_graph_collapsed(&self) -> bool {
        self.entire_graph_collapsed
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Run a case-insensitive substring search over leaf text
    pub fn search(&mut self, graph: &mut DiagramGraph, query: &str) -> &SearchState {
        if query.is_empty() {
            self.clear_search(graph);
            return &self.search;
        }

        let needle = query.to_lowercase();
        let matches: Vec<String> = graph
            .nodes()
            .iter()
            .filter(|n| n.matches_query(&needle))
            .map(|n| n.id.clone())
            .collect();

        log::debug!("Search {:?}: {} matches", query, matches.len());
        self.search = SearchState {
            query: query.to_string(),
            matches,
            cursor: 0,
        };
        self.focus_current(graph);
        &self.search
    }

    /// Move focus to the next match, wrapping around
    pub fn advance(&mut self, graph: &mut DiagramGraph) -> Option<&str> {
        if self.search.matches.is_empty() {
            return None;
        }
        self.search.cursor = (self.search.cursor + 1) % self.search.matches.len();
        self.focus_current(graph);
        self.search.focused()
    }

    /// Drop the query and every highlight
    pub fn clear_search(&mut self, graph: &mut DiagramGraph) {
        self.search = SearchState::default();
        reset_styles(graph);
        self.observer.on_search_clear();
    }

    /// Re-match the current query against a freshly built graph. Highlights
    /// and the counter follow the new matches but the viewport stays put; the
    /// focused match is kept when it still matches.
    pub fn refresh_search(&mut self, graph: &mut DiagramGraph) {
        if self.search.query.is_empty() {
            reset_styles(graph);
            return;
        }

        let needle = self.search.query.to_lowercase();
        let previous = self.search.focused().map(str::to_string);
        self.search.matches = graph
            .nodes()
            .iter()
            .filter(|n| n.matches_query(&needle))
            .map(|n| n.id.clone())
            .collect();
        self.search.cursor = previous
            .and_then(|id| self.search.matches.iter().position(|m| *m == id))
            .unwrap_or(0);
        self.highlight_matches(graph);
    }

    /// Style matches and report the counter; returns the focused id
    fn highlight_matches(&mut self, graph: &mut DiagramGraph) -> Option<String> {
        reset_styles(graph);

        let Some(focused) = self.search.focused().map(str::to_string) else {
            self.observer.on_search_update(0, 0);
            return None;
        };

        for id in &self.search.matches {
            if let Some(node) = graph.get_node_mut(id) {
                node.style.highlight = Highlight::Matched;
            }
        }
        if let Some(node) = graph.get_node_mut(&focused) {
            node.style.highlight = Highlight::Focused;
        }

        let (current, total) = self.search.position();
        self.observer.on_search_update(current, total);
        Some(focused)
    }

    fn focus_current(&mut self, graph: &mut DiagramGraph) {
        let Some(focused) = self.highlight_matches(graph) else {
            return;
        };
        if reveal(graph, &focused) {
            self.tasks.push(RendererTask::Relayout { fit: false });
        }
        self.tasks.push(RendererTask::CenterOn(focused));
    }

    // ========================================================================
    // Collapse / expand
    // ========================================================================

    /// Expand every collapsed node
    pub fn expand_all(&mut self, graph: &mut DiagramGraph) {
        for node in graph.nodes_mut() {
            if node.is_expanded == Some(false) {
                node.is_expanded = Some(true);
            }
        }
        self.entire_graph_collapsed = false;
        self.tasks.push(RendererTask::Relayout { fit: true });
    }

    /// Collapse the top tier: a node without an incoming edge is collapsed if
    /// it has an icon, otherwise its direct children are collapsed instead
    pub fn collapse_all(&mut self, graph: &mut DiagramGraph) {
        let tops: Vec<String> = graph
            .nodes()
            .iter()
            .filter(|n| !graph.has_incoming(&n.id))
            .map(|n| n.id.clone())
            .collect();

        for top in tops {
            let has_icon = graph.get_node(&top).map(|n| n.has_expand_icon()).unwrap_or(false);
            let targets: Vec<String> = if has_icon {
                vec![top]
            } else {
                graph.children_of(&top).into_iter().map(str::to_string).collect()
            };

            for id in targets {
                if let Some(node) = graph.get_node_mut(&id) {
                    if node.has_expand_icon() {
                        node.is_expanded = Some(false);
                    }
                }
            }
        }
        self.entire_graph_collapsed = true;
        self.tasks.push(RendererTask::Relayout { fit: true });
    }

    /// Branch the next whole-graph toggle takes under the current policy
    pub fn next_toggle_expands(&self, graph: &DiagramGraph) -> bool {
        match self.policy {
            CollapsePolicy::Toggle => self.entire_graph_collapsed,
            CollapsePolicy::Derived => graph.nodes().iter().any(|n| n.is_expanded == Some(false)),
        }
    }

    /// Whole-graph toggle; returns true when the graph was collapsed
    pub fn toggle_collapse_all(&mut self, graph: &mut DiagramGraph) -> bool {
        let expand = self.next_toggle_expands(graph);
        if expand {
            self.expand_all(graph);
        } else {
            self.collapse_all(graph);
        }
        !expand
    }

    /// Flip one container; returns whether anything changed
    pub fn toggle_node(&mut self, graph: &mut DiagramGraph, id: &str) -> Result<bool> {
        let node = graph
            .get_node_mut(id)
            .ok_or_else(|| DiagramError::UnknownNode(id.to_string()))?;

        if !node.has_expand_icon() {
            return Ok(false);
        }
        node.is_expanded = Some(!node.shows_children());
        self.tasks.push(RendererTask::Relayout { fit: false });
        Ok(true)
    }

    // ========================================================================
    // Orientation
    // ========================================================================

    /// Advance to the next orientation and reposition every icon
    pub fn rotate_orientation(&mut self, graph: &mut DiagramGraph) -> Orientation {
        self.orientation = self.orientation.next();
        refresh_icon_anchors(graph, self.orientation);
        self.tasks.push(RendererTask::Relayout { fit: true });
        log::debug!("Orientation: {}", self.orientation.name());
        self.orientation
    }

    // ========================================================================
    // Renderer requests
    // ========================================================================

    /// Tasks for the renderer to run now, in request order
    pub fn take_tasks(&mut self) -> Vec<RendererTask> {
        std::mem::take(&mut self.tasks)
    }

    /// Queue a task for the renderer's next frame
    pub fn request(&mut self, task: RendererTask) {
        self.tasks.push(task);
    }

    /// Request a task after the current batch settles
    pub fn schedule_deferred(&mut self, task: RendererTask) {
        self.deferred.schedule(task);
    }

    pub fn take_deferred(&mut self) -> Option<RendererTask> {
        self.deferred.take()
    }
}

fn reset_styles(graph: &mut DiagramGraph) {
    for node in graph.nodes_mut() {
        node.style.highlight = Highlight::None;
    }
}

/// Expand collapsed ancestors of a node; returns whether any changed
fn reveal(graph: &mut DiagramGraph, id: &str) -> bool {
    let mut changed = false;
    for ancestor in graph.ancestors(id) {
        if let Some(node) = graph.get_node_mut(&ancestor) {
            if node.is_expanded == Some(false) {
                node.is_expanded = Some(true);
                changed = true;
            }
        }
    }
    changed
}
