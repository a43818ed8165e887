//! Text measurement backed by `cosmic-text`.
//!
//! Hosts that render node content as text need to report the true rendered
//! size of that text back to the layout engine. [`TextMeasurer`] shapes the
//! text with real font metrics, wrapping at an optional maximum width.

use std::sync::{Mutex, OnceLock};

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping};
use log::info;

use crate::geometry::Size;

/// Font settings used for measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    font_family: String,
    font_size: u16,
}

impl TextStyle {
    pub fn new(font_family: impl Into<String>, font_size: u16) -> Self {
        Self {
            font_family: font_family.into(),
            font_size,
        }
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn font_size(&self) -> u16 {
        self.font_size
    }

    /// Line height in pixels for this style.
    pub fn line_height(&self) -> f32 {
        self.font_size_px() * 1.15
    }

    // Points to pixels at standard DPI.
    fn font_size_px(&self) -> f32 {
        self.font_size as f32 * 1.33
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new("sans-serif", 14)
    }
}

/// Shared measuring service holding one [`FontSystem`].
///
/// Creating a font system scans installed fonts, so a single instance is
/// shared process-wide through [`TextMeasurer::global`].
pub struct TextMeasurer {
    font_system: Mutex<FontSystem>,
}

static TEXT_MEASURER: OnceLock<TextMeasurer> = OnceLock::new();

impl TextMeasurer {
    /// Returns the process-wide measurer, initializing fonts on first use.
    pub fn global() -> &'static TextMeasurer {
        TEXT_MEASURER.get_or_init(|| {
            info!("Initializing FontSystem");
            TextMeasurer {
                font_system: Mutex::new(FontSystem::new()),
            }
        })
    }

    /// Measures `text`, wrapping lines at `max_width` when given.
    ///
    /// Empty text measures as zero. When shaping yields no layout runs (for
    /// example when no font is installed), an estimate from the character
    /// count is returned instead.
    pub fn measure(&self, text: &str, style: &TextStyle, max_width: Option<f32>) -> Size {
        if text.is_empty() {
            return Size::default();
        }

        let mut font_system = self
            .font_system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let metrics = Metrics::new(style.font_size_px(), style.line_height());
        let mut buffer = Buffer::new(&mut font_system, metrics);
        let mut buffer = buffer.borrow_with(&mut font_system);

        let attrs = Attrs::new().family(Family::Name(style.font_family()));
        buffer.set_size(max_width, None);
        buffer.set_text(text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(true);

        let mut width: f32 = 0.0;
        let mut height: f32 = 0.0;
        let mut runs = 0usize;
        for run in buffer.layout_runs() {
            runs += 1;
            if let Some(last) = run.glyphs.last() {
                width = width.max(last.x + last.w);
            }
            height += metrics.line_height;
        }

        if runs == 0 {
            return Self::estimate(text, style, max_width);
        }

        Size::new(width, height)
    }

    /// Character-count estimate used when shaping produced nothing.
    pub fn estimate(text: &str, style: &TextStyle, max_width: Option<f32>) -> Size {
        let char_width = style.font_size_px() * 0.55;
        let mut width: f32 = 0.0;
        let mut lines = 0usize;
        for line in text.split('\n') {
            let line_width = line.chars().count() as f32 * char_width;
            match max_width {
                Some(max) if max > 0.0 && line_width > max => {
                    width = width.max(max);
                    lines += (line_width / max).ceil() as usize;
                }
                _ => {
                    width = width.max(line_width);
                    lines += 1;
                }
            }
        }
        Size::new(width, lines as f32 * style.line_height())
    }
}
