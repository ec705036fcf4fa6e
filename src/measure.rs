use std::collections::HashMap;

use crate::fonts::FontMetrics;
use crate::model::Breakpoint;

/// Fit-check oracle: answers whether `text` would overflow `max_height_px`
/// under the style selected by `style_signature`. Implementations must be
/// deterministic for fixed inputs and a fixed environment, observable-side-
/// effect free, and must treat a missing cap as "no overflow".
///
/// Callers sanitize the signature (see [`sanitize_style_signature`]) before
/// passing it in; it ends up inside a stylesheet selector downstream.
pub trait Measurer {
    fn measure_overflow(
        &self,
        text: &str,
        style_signature: &str,
        max_height_px: Option<f32>,
    ) -> bool;
}

/// Oracle stub for headless and test environments: nothing ever overflows,
/// so the engine keeps the word-window slice untrimmed.
pub struct NoOverflow;

impl Measurer for NoOverflow {
    fn measure_overflow(&self, _text: &str, _sig: &str, _max_height_px: Option<f32>) -> bool {
        false
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_style_signature(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// The signature the engine builds for a text block's fit check.
pub fn style_signature(section_type_id: &str, block_id: &str, breakpoint: Breakpoint) -> String {
    sanitize_style_signature(&format!("{section_type_id}-{block_id}-{breakpoint}"))
}

/// Rendered-text parameters for one style signature.
#[derive(Clone, Copy, Debug)]
pub struct TextStyle {
    pub font_size_px: f32,
    /// Explicit line height; `None` uses the font's natural ratio.
    pub line_height_px: Option<f32>,
    pub column_width_px: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font_size_px: 16.0,
            line_height_px: None,
            column_width_px: 640.0,
        }
    }
}

/// Headless fit-check implementation backed by real font metrics: wraps the
/// candidate text into lines the way the renderer would and compares the
/// resulting content height to the cap.
///
/// Stateless per call, but one instance must not be shared by concurrent
/// layout computations.
pub struct FontMeasurer {
    metrics: FontMetrics,
    styles: HashMap<String, TextStyle>,
    default_style: TextStyle,
}

impl FontMeasurer {
    pub fn new(metrics: FontMetrics) -> Self {
        FontMeasurer {
            metrics,
            styles: HashMap::new(),
            default_style: TextStyle::default(),
        }
    }

    pub fn with_default_style(metrics: FontMetrics, default_style: TextStyle) -> Self {
        FontMeasurer {
            metrics,
            styles: HashMap::new(),
            default_style,
        }
    }

    /// Register the style a signature selects. The key is stored sanitized
    /// so registration and lookup agree regardless of the raw form.
    pub fn register_style(&mut self, signature: &str, style: TextStyle) {
        self.styles
            .insert(sanitize_style_signature(signature), style);
    }

    fn style_for(&self, signature: &str) -> &TextStyle {
        self.styles.get(signature).unwrap_or(&self.default_style)
    }
}

impl Measurer for FontMeasurer {
    fn measure_overflow(
        &self,
        text: &str,
        style_signature: &str,
        max_height_px: Option<f32>,
    ) -> bool {
        let Some(cap) = max_height_px else {
            return false;
        };
        let style = self.style_for(style_signature);
        let lines = self
            .metrics
            .wrap_line_count(text, style.font_size_px, style.column_width_px);
        let line_h = style
            .line_height_px
            .unwrap_or_else(|| self.metrics.line_height(style.font_size_px));
        let height = lines as f32 * line_h;
        log::trace!(
            "measure {style_signature}: {lines} lines x {line_h:.1}px = {height:.1}px vs cap {cap:.1}px"
        );
        height > cap
    }
}
