// src/models.rs
use crate::config::AppConfig;
use crate::errors::SquishError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Concrete image container formats the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Png,
    Jpeg,
    WebP,
    Avif,
    Gif,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Jpeg => "jpeg",
            Format::WebP => "webp",
            Format::Avif => "avif",
            Format::Gif => "gif",
        }
    }

    pub fn content_type(&self) -> String {
        format!("image/{}", self.as_str())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion target requested by the caller. `Copy` keeps the source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Copy,
    WebP,
    Avif,
}

impl TargetFormat {
    /// Parse a route segment into a conversion target. Anything outside the
    /// supported output set is rejected up front, naming the offending value.
    pub fn parse(segment: &str) -> Result<Self, SquishError> {
        match segment {
            "copy" => Ok(TargetFormat::Copy),
            "webp" => Ok(TargetFormat::WebP),
            "avif" => Ok(TargetFormat::Avif),
            other => Err(SquishError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn resolve(&self, source: Format) -> Format {
        match self {
            TargetFormat::Copy => source,
            TargetFormat::WebP => Format::WebP,
            TargetFormat::Avif => Format::Avif,
        }
    }

    /// Whether encoding to this target changes the container format.
    pub fn converts_from(&self, source: Format) -> bool {
        match self {
            TargetFormat::Copy => false,
            TargetFormat::WebP => source != Format::WebP,
            TargetFormat::Avif => source != Format::Avif,
        }
    }
}

/// Header-level facts about the source image, produced once per request by
/// the probe.
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    /// EXIF orientation code; 1 is "normal" and a missing tag reads as 1.
    pub orientation: u8,
    pub has_alpha: bool,
    /// Whether a WebP source uses the lossless encoding. `None` for every
    /// other format, and for WebP files whose frame chunk could not be found.
    pub webp_lossless: Option<bool>,
}

impl ImageMetadata {
    /// A source that already went through a lossy encoder gains nothing from
    /// lossless output.
    pub fn already_lossy(&self) -> bool {
        self.format == Format::Jpeg
            || (self.format == Format::WebP && self.webp_lossless == Some(false))
    }
}

/// Pixel statistics backing the photo/graphic heuristic.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelStats {
    pub is_opaque: bool,
    pub entropy: f64,
    #[serde(rename = "standardDeviation")]
    pub std_dev: f64,
}

/// Outcome of a statistics pass: either measurements or the error that kept
/// them from being taken. Measurement failures are reported, never fatal.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatsOutcome {
    Measured(PixelStats),
    Failed { error: String },
}

/// The classifier's verdict. `stats` is `None` when the source was already
/// lossy and measurement was skipped.
#[derive(Debug, Clone)]
pub struct Classification {
    pub lossy_preferred: bool,
    pub stats: Option<StatsOutcome>,
}

/// Caller-supplied transformation parameters, resolved against the process
/// configuration.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    /// Maximum output width; 0 leaves the axis unconstrained.
    pub width: i64,
    /// Maximum output height; 0 leaves the axis unconstrained.
    pub height: i64,
    pub target: TargetFormat,
    /// Explicit lossless override; `None` lets the classifier decide.
    pub lossless: Option<bool>,
}

impl TransformRequest {
    pub fn from_query(
        target: TargetFormat,
        query: &HashMap<String, String>,
        config: &AppConfig,
    ) -> Self {
        Self {
            width: parse_dimension(query.get("width"))
                .unwrap_or(i64::from(config.default_width)),
            height: parse_dimension(query.get("height")).unwrap_or(0),
            target,
            lossless: if truthy(query.get("lossless")) {
                Some(true)
            } else {
                None
            },
        }
    }
}

/// A missing, unparseable, or zero dimension falls back to the caller's
/// default. Negative values parse and pass through untouched.
fn parse_dimension(raw: Option<&String>) -> Option<i64> {
    raw.and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value != 0)
}

/// Query-parameter booleans: "true" or "1", case-insensitively. Anything
/// else, including "false", reads as unset.
pub fn truthy(raw: Option<&String>) -> bool {
    raw.map(|value| value.eq_ignore_ascii_case("true") || value == "1")
        .unwrap_or(false)
}

/// One step of the transformation pipeline, in the order the executor runs
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Orient,
    ScaleDown,
    Convert(Format),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Orient => f.write_str("orient"),
            Action::ScaleDown => f.write_str("scale:down"),
            Action::Convert(format) => write!(f, "convert:{format}"),
        }
    }
}

/// Resolved decisions for one request; immutable once planned.
#[derive(Debug, Clone)]
pub struct TransformPlan {
    pub actions: Vec<Action>,
    pub format: Format,
    pub lossless: bool,
    pub quality: u8,
    /// Fit-inside bounds for the resize step, already clamped to the source
    /// dimensions. `None` when no resize was planned.
    pub resize_to: Option<(u32, u32)>,
}

impl TransformPlan {
    pub fn content_type(&self) -> String {
        self.format.content_type()
    }

    /// Header value for `X-Result-Actions`.
    pub fn actions_header(&self) -> String {
        self.actions
            .iter()
            .map(|action| action.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// JSON body for the metadata endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub orientation: u8,
    pub has_alpha: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsOutcome>,
}

impl MetadataResponse {
    pub fn new(metadata: &ImageMetadata, stats: Option<StatsOutcome>) -> Self {
        Self {
            width: metadata.width,
            height: metadata.height,
            format: metadata.format,
            orientation: metadata.orientation,
            has_alpha: metadata.has_alpha,
            stats,
        }
    }
}
