//! JSON Diagram - interactive node-link diagrams for JSON and XML documents
//!
//! Provides the document-to-graph pipeline, navigation operations and an
//! egui viewer.

pub mod config;
pub mod diagram;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use config::{CollapsePolicy, DiagramConfig, DisplayOptions, NodeMetrics, ThemeVariant};
pub use diagram::{
    build, convert, parse_document, Action, DiagramGraph, DiagramNode, DocumentFormat, Navigator,
    Orientation, RendererTask, SearchObserver,
};
pub use error::{DiagramError, Result};
pub use session::{NodeDetails, Session};
