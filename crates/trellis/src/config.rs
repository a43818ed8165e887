//! Configuration types for Trellis layout and rendering.
//!
//! All types implement [`serde::Deserialize`] so the CLI can load them from a
//! TOML file. Every field is optional in the file; missing fields take the
//! defaults below.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining layout and style settings.
//! - [`LayoutConfig`] - Element sizes, gaps, insets and the coordinate clamp bound.
//! - [`StyleConfig`] - Colors and font used when measuring and exporting.
//!
//! # Example
//!
//! ```
//! # use trellis::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.layout().vertical_gap(), 40.0);
//! assert!(config.style().background_color().is_ok());
//! ```

use indexmap::IndexMap;
use serde::Deserialize;

use trellis_core::{color::Color, element::NodeKind, text::TextStyle};

/// Top-level application configuration combining layout and style settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Style configuration section.
    #[serde(default)]
    style: StyleConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the specified layout and style configurations.
    pub fn new(layout: LayoutConfig, style: StyleConfig) -> Self {
        Self { layout, style }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Returns the style configuration.
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }
}

/// Geometry used by the layout engine.
///
/// Distances are in pixels. `coordinate_bound` limits logical `row`/`col`
/// values to `-coordinate_bound..=coordinate_bound`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    element_width: f32,
    element_height: f32,
    vertical_gap: f32,
    horizontal_gap: f32,
    padding: f32,
    header_height: f32,
    top_padding: f32,
    edge_label_safe_zone: f32,
    coordinate_bound: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            element_width: 360.0,
            element_height: 200.0,
            vertical_gap: 40.0,
            horizontal_gap: 40.0,
            padding: 40.0,
            header_height: 40.0,
            top_padding: 20.0,
            edge_label_safe_zone: 80.0,
            coordinate_bound: 100,
        }
    }
}

impl LayoutConfig {
    /// Width assumed for columns that hold no measured element yet, and for
    /// elements the host reports as unmeasured.
    pub fn element_width(&self) -> f32 {
        self.element_width
    }

    /// Height used for an element the host reports as unmeasured.
    pub fn element_height(&self) -> f32 {
        self.element_height
    }

    pub fn vertical_gap(&self) -> f32 {
        self.vertical_gap
    }

    pub fn horizontal_gap(&self) -> f32 {
        self.horizontal_gap
    }

    /// Inset between a container edge and its members.
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Height of the title band at the top of a container.
    pub fn header_height(&self) -> f32 {
        self.header_height
    }

    pub fn top_padding(&self) -> f32 {
        self.top_padding
    }

    /// Clearance reserved on the side where an inbound edge label attaches.
    pub fn edge_label_safe_zone(&self) -> f32 {
        self.edge_label_safe_zone
    }

    /// Never negative; a negative configured bound acts as zero.
    pub fn coordinate_bound(&self) -> i32 {
        self.coordinate_bound.max(0)
    }

    /// Offset from the container top to its first row.
    pub fn header_clearance(&self) -> f32 {
        self.header_height + self.top_padding
    }

    pub fn with_element_size(mut self, width: f32, height: f32) -> Self {
        self.element_width = width;
        self.element_height = height;
        self
    }

    pub fn with_gaps(mut self, horizontal: f32, vertical: f32) -> Self {
        self.horizontal_gap = horizontal;
        self.vertical_gap = vertical;
        self
    }

    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_header(mut self, header_height: f32, top_padding: f32) -> Self {
        self.header_height = header_height;
        self.top_padding = top_padding;
        self
    }

    pub fn with_edge_label_safe_zone(mut self, safe_zone: f32) -> Self {
        self.edge_label_safe_zone = safe_zone;
        self
    }

    pub fn with_coordinate_bound(mut self, bound: i32) -> Self {
        self.coordinate_bound = bound.max(0);
        self
    }
}

/// Visual styling configuration.
///
/// Color fields hold CSS color strings and are parsed on access.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StyleConfig {
    /// Canvas background color.
    #[serde(default)]
    background_color: Option<String>,

    /// Node fill colors keyed by node type.
    #[serde(default)]
    node_colors: IndexMap<NodeKind, String>,

    #[serde(default)]
    font_family: Option<String>,

    #[serde(default)]
    font_size: Option<u16>,
}

impl StyleConfig {
    /// Returns the parsed background [`Color`], or `None` if no color is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured color string cannot be parsed.
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        self.background_color
            .as_ref()
            .map(|color| Color::new(color))
            .transpose()
            .map_err(|err| format!("Invalid background color in config: {err}"))
    }

    /// Fill color for nodes of `kind`, falling back to the built-in palette.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured color for `kind` cannot be parsed.
    pub fn node_color(&self, kind: NodeKind) -> Result<Color, String> {
        let value = self
            .node_colors
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| default_node_color(kind));
        Color::new(value).map_err(|err| format!("Invalid `{kind}` node color in config: {err}"))
    }

    /// Font used for measuring and exporting node text.
    pub fn text_style(&self) -> TextStyle {
        let fallback = TextStyle::default();
        TextStyle::new(
            self.font_family
                .clone()
                .unwrap_or_else(|| fallback.font_family().to_string()),
            self.font_size.unwrap_or(fallback.font_size()),
        )
    }
}

fn default_node_color(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Concept => "#e8f0fe",
        NodeKind::Question => "#fff4e5",
        NodeKind::Example => "#e6f4ea",
        NodeKind::Detail => "#f3e8fd",
        NodeKind::Summary => "#fde7e9",
        NodeKind::Note => "#fef7e0",
        NodeKind::Default => "#ffffff",
    }
}
