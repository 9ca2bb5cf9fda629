//! Diagram Module
//!
//! Turns JSON or XML documents into an interactive node-link diagram:
//! - Tree building with scalar folding
//! - Text-measured node geometry and typed value coloring
//! - Search, collapse/expand and orientation rotation
//! - Tree layout and native egui rendering

pub mod actions;
pub mod builder;
pub mod document;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod metrics;
pub mod navigation;
pub mod renderer;
pub mod theme_mapper;

pub use actions::Action;
pub use builder::build;
pub use document::{convert, parse_document, DocumentFormat};
pub use geometry::{compute_all, compute_geometry, GeometryContext};
pub use graph::{
    Annotation, AnnotationRole, DiagramEdge, DiagramGraph, DiagramNode, Highlight, NodeKind, Orientation,
    ValueKind, ROOT_ID,
};
pub use layout::{compute_layout, LayoutConfig, TreeLayout};
pub use metrics::{EguiMetrics, EstimatedMetrics, FontSpec, TextMetrics};
pub use navigation::{Navigator, NoopObserver, RendererTask, SearchObserver, SearchState};
pub use renderer::DiagramViewer;
pub use theme_mapper::DiagramTheme;
