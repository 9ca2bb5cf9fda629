//! Diagram Configuration
//!
//! Configuration can be loaded from:
//! - Default values
//! - Config file (~/.config/json-diagram/config.toml)

use crate::diagram::document::DocumentFormat;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagramConfig {
    /// How the whole-graph collapse toggle decides its next branch
    pub collapse_policy: CollapsePolicy,

    /// Document type assumed for new content
    pub default_format: DocumentFormat,

    /// Display toggles that affect node geometry
    pub display: DisplayOptions,

    /// Node sizing constants
    pub metrics: NodeMetrics,
}

/// Display options (re-running geometry is required when these change)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayOptions {
    /// Show "[n]" child counts on container nodes
    pub show_counts: bool,

    /// Color palette
    pub theme: ThemeVariant,

    /// Optional "#rrggbb" override for search highlights
    pub highlight_color: Option<String>,
}

/// Pixel constants for node geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeMetrics {
    /// Padding added around measured text
    pub padding: f32,
    /// Height of one annotation line
    pub line_height: f32,
    /// Minimum node width
    pub min_width: f32,
    /// Minimum node height
    pub min_height: f32,
    /// Width reserved for the expand/collapse icon
    pub icon_width: f32,
    /// Font size used for measuring and drawing annotations
    pub font_size: f32,
    /// Diameter of the synthetic root circle
    pub root_diameter: f32,
    /// Gap between a right-aligned count and the icon
    pub count_margin: f32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

/// Policy for the whole-graph collapse/expand toggle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollapsePolicy {
    /// Flip a remembered flag on every toggle, regardless of per-node state
    #[default]
    Toggle,
    /// Expand if any top-tier container is currently collapsed, otherwise collapse
    Derived,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_counts: true,
            theme: ThemeVariant::Dark,
            highlight_color: None,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self {
            padding: 12.0,
            line_height: 18.0,
            min_width: 60.0,
            min_height: 36.0,
            icon_width: 18.0,
            font_size: 12.0,
            root_diameter: 40.0,
            count_margin: 6.0,
        }
    }
}

impl DiagramConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("json-diagram/config.toml"))
            .unwrap_or_else(|| PathBuf::from("json-diagram.toml"))
    }

    /// Load configuration from the default file, falling back to defaults
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiagramConfig::default();
        assert!(config.display.show_counts);
        assert_eq!(config.collapse_policy, CollapsePolicy::Toggle);
        assert_eq!(config.default_format, DocumentFormat::Json);
        assert!(config.metrics.min_width > 0.0);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = DiagramConfig::default();
        config.display.show_counts = false;
        config.collapse_policy = CollapsePolicy::Derived;
        config.default_format = DocumentFormat::Xml;
        config.save_to(&path).unwrap();

        let loaded = DiagramConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "collapse_policy = \"derived\"\n[display]\nshow_counts = false\n").unwrap();

        let loaded = DiagramConfig::load_from(&path).unwrap();
        assert_eq!(loaded.collapse_policy, CollapsePolicy::Derived);
        assert!(!loaded.display.show_counts);
        assert_eq!(loaded.metrics, NodeMetrics::default());
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "display = 3").unwrap();
        assert!(DiagramConfig::load_from(&path).is_err());
    }
}
