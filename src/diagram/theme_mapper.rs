//! Theme Mapper for Diagrams
//!
//! Maps value kinds and search highlight tiers to colors.

use super::graph::{Highlight, ValueKind};
use crate::config::{DisplayOptions, ThemeVariant};
use eframe::egui::Color32;

/// Diagram color palette
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagramTheme {
    /// Background color for the canvas
    pub canvas_bg: Color32,

    /// Grid line color
    pub grid_color: Color32,

    /// Default node fill
    pub node_fill: Color32,

    /// Default node stroke
    pub node_stroke: Color32,

    /// Fill of the synthetic root circle
    pub root_fill: Color32,

    /// Keys and container labels
    pub key_color: Color32,

    /// "[n]" child counts
    pub count_color: Color32,

    /// Value colors
    pub string_color: Color32,
    pub number_color: Color32,
    pub true_color: Color32,
    pub false_color: Color32,
    pub null_color: Color32,

    /// Edge/connection color
    pub edge_color: Color32,

    /// Expand/collapse icon
    pub icon_fill: Color32,
    pub icon_stroke: Color32,

    /// Search: every match
    pub matched_fill: Color32,

    /// Search: the current match
    pub focused_fill: Color32,
    pub focused_stroke: Color32,

    /// Selected node highlight
    pub node_selected: Color32,

    /// Hovered node highlight
    pub node_hover: Color32,

    /// Error/warning indicator
    pub status_error: Color32,
}

impl DiagramTheme {
    /// VS Code Dark+ inspired palette
    pub fn dark() -> Self {
        let sidebar_bg = Color32::from_rgb(37, 37, 38); // #252526
        Self {
            canvas_bg: darken(Color32::from_rgb(30, 30, 30), 0.1),
            grid_color: Color32::from_rgba_unmultiplied(255, 255, 255, 15),
            node_fill: lighten(sidebar_bg, 0.1),
            node_stroke: Color32::from_rgb(60, 60, 60), // #3c3c3c
            root_fill: Color32::from_rgb(0, 120, 212),  // #0078d4

            key_color: Color32::from_rgb(156, 220, 254),   // #9cdcfe - light blue
            count_color: Color32::from_rgb(128, 128, 128), // #808080

            string_color: Color32::from_rgb(206, 145, 120), // #ce9178 - orange
            number_color: Color32::from_rgb(181, 206, 168), // #b5cea8 - light green
            true_color: Color32::from_rgb(63, 185, 80),     // #3fb950
            false_color: Color32::from_rgb(248, 81, 73),    // #f85149
            null_color: Color32::from_rgb(86, 156, 214),    // #569cd6 - blue

            edge_color: Color32::from_rgb(128, 128, 128),
            icon_fill: Color32::from_rgb(51, 51, 51),
            icon_stroke: Color32::from_rgb(204, 204, 204),

            matched_fill: Color32::from_rgb(38, 79, 120),  // #264f78
            focused_fill: Color32::from_rgb(204, 167, 0),  // #cca700
            focused_stroke: Color32::from_rgb(255, 255, 255),

            node_selected: Color32::from_rgb(0, 120, 212),
            node_hover: Color32::from_rgb(26, 140, 255),
            status_error: Color32::from_rgb(248, 81, 73),
        }
    }

    /// VS Code Light+ inspired palette
    pub fn light() -> Self {
        let sidebar_bg = Color32::from_rgb(243, 243, 243); // #f3f3f3
        Self {
            canvas_bg: lighten(Color32::from_rgb(255, 255, 255), 0.02),
            grid_color: Color32::from_rgba_unmultiplied(0, 0, 0, 15),
            node_fill: sidebar_bg,
            node_stroke: Color32::from_rgb(200, 200, 200),
            root_fill: Color32::from_rgb(0, 120, 212),

            key_color: Color32::from_rgb(0, 16, 128),   // #001080 - dark blue
            count_color: Color32::from_rgb(128, 128, 128),

            string_color: Color32::from_rgb(163, 21, 21), // #a31515 - red
            number_color: Color32::from_rgb(9, 136, 90),  // #09885a - green
            true_color: Color32::from_rgb(40, 160, 40),
            false_color: Color32::from_rgb(200, 50, 50),
            null_color: Color32::from_rgb(0, 0, 255), // #0000ff - blue

            edge_color: Color32::from_rgb(160, 160, 160),
            icon_fill: Color32::from_rgb(255, 255, 255),
            icon_stroke: Color32::from_rgb(51, 51, 51),

            matched_fill: Color32::from_rgb(200, 220, 240),
            focused_fill: Color32::from_rgb(255, 214, 102),
            focused_stroke: Color32::from_rgb(180, 130, 0),

            node_selected: Color32::from_rgb(0, 120, 212),
            node_hover: Color32::from_rgb(26, 140, 255),
            status_error: Color32::from_rgb(200, 50, 50),
        }
    }

    /// Palette for the configured display options
    pub fn from_options(options: &DisplayOptions) -> Self {
        let mut theme = match options.theme {
            ThemeVariant::Dark => Self::dark(),
            ThemeVariant::Light => Self::light(),
        };
        if let Some(color) = options.highlight_color.as_deref().and_then(parse_hex_color) {
            theme.focused_fill = color;
            theme.matched_fill = apply_opacity(color, 0.45);
        }
        theme
    }

    /// Color of a value fragment
    pub fn value_color(&self, kind: ValueKind) -> Color32 {
        match kind {
            ValueKind::String => self.string_color,
            ValueKind::Number => self.number_color,
            ValueKind::True => self.true_color,
            ValueKind::False => self.false_color,
            ValueKind::Null => self.null_color,
        }
    }

    /// Node fill for a search highlight tier
    pub fn fill_for(&self, highlight: Highlight) -> Color32 {
        match highlight {
            Highlight::None => self.node_fill,
            Highlight::Matched => self.matched_fill,
            Highlight::Focused => self.focused_fill,
        }
    }

    /// Node stroke for highlight and interaction state
    pub fn stroke_for(&self, highlight: Highlight, selected: bool, hovered: bool) -> Color32 {
        if highlight == Highlight::Focused {
            self.focused_stroke
        } else if selected {
            self.node_selected
        } else if hovered {
            self.node_hover
        } else {
            self.node_stroke
        }
    }
}

impl Default for DiagramTheme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Parse a hex color string to Color32
fn parse_hex_color(color_str: &str) -> Option<Color32> {
    let hex = color_str.trim_start_matches('#');

    if hex.len() == 6 {
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color32::from_rgb(r, g, b))
    } else if hex.len() == 8 {
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
        Some(Color32::from_rgba_unmultiplied(r, g, b, a))
    } else {
        None
    }
}

/// Darken a color by a factor (0.0 - 1.0)
fn darken(color: Color32, factor: f32) -> Color32 {
    let factor = (1.0 - factor).max(0.0);
    Color32::from_rgb(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
    )
}

/// Lighten a color by a factor (0.0 - 1.0)
fn lighten(color: Color32, factor: f32) -> Color32 {
    Color32::from_rgb(
        (color.r() as f32 + (255.0 - color.r() as f32) * factor) as u8,
        (color.g() as f32 + (255.0 - color.g() as f32) * factor) as u8,
        (color.b() as f32 + (255.0 - color.b() as f32) * factor) as u8,
    )
}

/// Apply opacity to a color
fn apply_opacity(color: Color32, opacity: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (color.a() as f32 * opacity) as u8,
    )
}
