//! Overlay layer types.
//!
//! Layers are stacked in declaration order: each one composites onto the
//! accumulated result of every layer before it. Positions are fractional
//! `[0.0, 1.0]` coordinates scaled to the output frame at render time.
//!
//! Layer fields are kept as they appear in the project file; the accessor
//! methods resolve defaults. Empty strings and zero values fall back to the
//! defaults the same way a missing field does.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

pub const DEFAULT_TEXT: &str = "Text";
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";
pub const DEFAULT_FONT: &str = "Segoe UI";
pub const DEFAULT_FONT_SIZE: i64 = 12;
pub const DEFAULT_OUTLINE_COLOR: &str = "#000000";
pub const DEFAULT_SHADOW_COLOR: &str = "#000000";

/// One overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// Text caption drawn onto the video.
    Text(TextLayer),

    /// Audio-reactive frequency visualization.
    Spectrograph(SpectrographLayer),

    /// A layer type this renderer does not know. Rendered as a no-op.
    Unsupported {
        /// The raw `type` value, if the entry had one.
        kind: Option<String>,
    },
}

impl Layer {
    pub fn is_spectrograph(&self) -> bool {
        matches!(self, Layer::Spectrograph(_))
    }
}

impl<'de> Deserialize<'de> for Layer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        match kind.as_deref() {
            Some("text") => TextLayer::deserialize(value)
                .map(Layer::Text)
                .map_err(D::Error::custom),
            Some("spectrograph") => SpectrographLayer::deserialize(value)
                .map(Layer::Spectrograph)
                .map_err(D::Error::custom),
            _ => Ok(Layer::Unsupported { kind }),
        }
    }
}

/// Text caption settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextLayer {
    pub text: Option<String>,
    /// Hex color, `#RGB` or `#RRGGBB`.
    pub color: Option<String>,
    pub font: Option<String>,
    pub font_size: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub outline_color: Option<String>,
    pub outline_width: Option<f64>,
    pub shadow_color: Option<String>,
    pub shadow_distance: Option<f64>,
}

impl TextLayer {
    pub fn text(&self) -> &str {
        non_empty(&self.text).unwrap_or(DEFAULT_TEXT)
    }

    pub fn color(&self) -> &str {
        non_empty(&self.color).unwrap_or(DEFAULT_TEXT_COLOR)
    }

    pub fn font(&self) -> &str {
        non_empty(&self.font).unwrap_or(DEFAULT_FONT)
    }

    /// Font size in points, truncated to an integer.
    pub fn font_size(&self) -> i64 {
        match self.font_size {
            Some(size) if size != 0.0 && size.is_finite() => size as i64,
            _ => DEFAULT_FONT_SIZE,
        }
    }

    pub fn x(&self) -> f64 {
        fraction(self.x)
    }

    pub fn y(&self) -> f64 {
        fraction(self.y)
    }

    pub fn outline_color(&self) -> &str {
        non_empty(&self.outline_color).unwrap_or(DEFAULT_OUTLINE_COLOR)
    }

    /// Outline width in pixels, never negative.
    pub fn outline_width(&self) -> i64 {
        whole(self.outline_width).max(0)
    }

    pub fn shadow_color(&self) -> &str {
        non_empty(&self.shadow_color).unwrap_or(DEFAULT_SHADOW_COLOR)
    }

    /// Shadow offset applied to both axes.
    pub fn shadow_distance(&self) -> i64 {
        whole(self.shadow_distance)
    }
}

/// Spectrograph visualization settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpectrographLayer {
    /// One of `bar`, `line`, `dots`, `solid`.
    pub mode: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl SpectrographLayer {
    pub fn mode(&self) -> SpectrographMode {
        self.mode
            .as_deref()
            .map(SpectrographMode::from_name)
            .unwrap_or_default()
    }

    pub fn x(&self) -> f64 {
        fraction(self.x)
    }

    pub fn y(&self) -> f64 {
        fraction(self.y)
    }
}

/// Visual style of a spectrograph layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpectrographMode {
    /// Per-channel spectrum bars.
    #[default]
    Bar,
    /// Frequency line.
    Line,
    /// Frequency dots.
    Dots,
    /// Combined-channel filled spectrum.
    Solid,
}

impl SpectrographMode {
    /// Parse a mode name. Unknown names render as [`SpectrographMode::Bar`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "line" => Self::Line,
            "dots" => Self::Dots,
            "solid" => Self::Solid,
            _ => Self::Bar,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn fraction(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn whole(value: Option<f64>) -> i64 {
    value.filter(|v| v.is_finite()).map(|v| v as i64).unwrap_or(0)
}
