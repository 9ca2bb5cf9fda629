//! Text Measurement
//!
//! Every sizing decision goes through `TextMetrics`. The estimator is
//! deterministic and used by the CLI and tests; the viewer measures with
//! egui's own font atlas.

use eframe::egui::{self, Color32, FontId};
use unicode_width::UnicodeWidthStr;

/// Font used for measuring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub size: f32,
    pub monospace: bool,
}

impl FontSpec {
    pub fn proportional(size: f32) -> Self {
        Self { size, monospace: false }
    }

    pub fn monospace(size: f32) -> Self {
        Self { size, monospace: true }
    }

    pub fn font_id(&self) -> FontId {
        if self.monospace {
            FontId::monospace(self.size)
        } else {
            FontId::proportional(self.size)
        }
    }
}

/// Pure text-width oracle
pub trait TextMetrics {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f32;
}

/// Width estimate from terminal display columns
#[derive(Debug, Clone, Copy)]
pub struct EstimatedMetrics {
    /// Average glyph advance as a fraction of the font size
    pub advance: f32,
}

impl Default for EstimatedMetrics {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMetrics for EstimatedMetrics {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f32 {
        text.lines()
            .map(|line| line.width() as f32 * font.size * self.advance)
            .fold(0.0, f32::max)
    }
}

/// Measures with the fonts loaded into an egui context
pub struct EguiMetrics {
    ctx: egui::Context,
}

impl EguiMetrics {
    pub fn new(ctx: &egui::Context) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl TextMetrics for EguiMetrics {
    fn measure_width(&self, text: &str, font: &FontSpec) -> f32 {
        self.ctx.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_string(), font.font_id(), Color32::WHITE)
                .size()
                .x
        })
    }
}
