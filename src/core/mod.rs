// pixie-crop/src/core/mod.rs
pub mod processor;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DPI: f64 = 96.0;
pub const DEFAULT_QUALITY: i32 = 85;
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Linear unit a crop size is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Px,
    Mm,
    Cm,
    In,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::In => "in",
        }
    }
}

impl FromStr for Unit {
    type Err = CropperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "px" => Ok(Unit::Px),
            "mm" => Ok(Unit::Mm),
            "cm" => Ok(Unit::Cm),
            "in" => Ok(Unit::In),
            _ => Err(CropperError::InvalidUnit(s.to_string())),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            other => Err(CropperError::InvalidRotation(other)),
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// Whether the rotation swaps width and height.
    pub fn is_transposing(&self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// Encoder selection, resolved once from the requested format name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg { quality: u8 },
    Png,
    WebP { quality: u8 },
}

impl OutputFormat {
    /// Resolves a format name and quality.
    ///
    /// Names are matched case-insensitively; `jpg` is an alias of `jpeg` and any
    /// unrecognized name falls back to JPEG. Quality is ignored for PNG. For the
    /// lossy formats a quality of zero or below is rejected and anything above
    /// 100 is clamped.
    pub fn resolve(name: &str, quality: i32) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();

        if normalized == "png" {
            return Ok(OutputFormat::Png);
        }

        if quality <= 0 {
            return Err(CropperError::InvalidQuality(quality));
        }
        let quality = quality.min(100) as u8;

        match normalized.as_str() {
            "webp" => Ok(OutputFormat::WebP { quality }),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg { quality }),
            _ => {
                log::warn!("Unknown output format '{}', falling back to jpeg", name);
                Ok(OutputFormat::Jpeg { quality })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP { .. } => "webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP { .. } => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP { .. } => "image/webp",
        }
    }
}

/// A crop request as it arrives from the interactive front end.
///
/// `x`/`y` are always device pixels in the source frame. `width`/`height` are
/// in `unit`, converted with `dpi` when the unit is physical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRequest {
    pub asset_ref: String,
    pub x: i64,
    pub y: i64,
    pub width: f64,
    pub height: f64,
    pub unit: String,
    pub dpi: Option<f64>,
    pub rotation: i32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub output_format: String,
    pub quality: i32,
    /// Front-end hint only.
    pub aspect_lock: bool,
}

impl Default for CropRequest {
    fn default() -> Self {
        Self {
            asset_ref: String::new(),
            x: 0,
            y: 0,
            width: 0.0,
            height: 0.0,
            unit: Unit::Px.as_str().to_string(),
            dpi: None,
            rotation: 0,
            flip_horizontal: false,
            flip_vertical: false,
            output_format: "jpeg".to_string(),
            quality: DEFAULT_QUALITY,
            aspect_lock: false,
        }
    }
}

/// Crop rectangle in device pixels, inside the source bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Dimensions and format of a staged asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub asset_ref: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: u64,
}

/// An encoded crop result. Ownership passes to the caller.
#[derive(Debug, Clone)]
pub struct EncodedOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct CropperConfig {
    pub staging_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub retention: Duration,
    /// Size of the worker pool; 0 uses one thread per core.
    pub workers: usize,
    pub optimize_png: bool,
    pub max_dimensions: (u32, u32),
}

impl Default for CropperConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("staging"),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            retention: DEFAULT_RETENTION,
            workers: 0,
            optimize_png: true,
            max_dimensions: (100_000, 100_000),
        }
    }
}

impl CropperConfig {
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.staging_dir.as_os_str().is_empty() {
            return Err(CropperError::InvalidParameter(
                "Staging directory must not be empty".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(CropperError::InvalidParameter(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        let (max_w, max_h) = self.max_dimensions;
        if max_w == 0 || max_h == 0 {
            return Err(CropperError::InvalidParameter(
                "Maximum dimensions must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Coarse classification used by the request boundary to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Geometry,
    Encode,
    Io,
}

#[derive(Error, Debug)]
pub enum CropperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {0}")]
    InvalidType(String),

    #[error("File size {size} exceeds limit {limit}")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("Unknown unit: {0}")]
    InvalidUnit(String),

    #[error("Rotation must be 0, 90, 180 or 270 degrees, got {0}")]
    InvalidRotation(i32),

    #[error("Invalid asset reference: {0}")]
    InvalidAssetRef(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Crop region is empty after clamping ({width}x{height})")]
    DegenerateCrop { width: i64, height: i64 },

    #[error("Quality must be greater than zero, got {0}")]
    InvalidQuality(i32),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

impl CropperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CropperError::InvalidType(_)
            | CropperError::FileTooLarge { .. }
            | CropperError::EmptyFile
            | CropperError::InvalidUnit(_)
            | CropperError::InvalidRotation(_)
            | CropperError::InvalidAssetRef(_)
            | CropperError::InvalidParameter(_)
            | CropperError::ImageDecode(_)
            | CropperError::MemoryLimitExceeded(_) => ErrorKind::Validation,
            CropperError::NotFound(_) => ErrorKind::NotFound,
            CropperError::DegenerateCrop { .. } => ErrorKind::Geometry,
            CropperError::InvalidQuality(_) | CropperError::Encode(_) => ErrorKind::Encode,
            CropperError::Io(_) | CropperError::ProcessingError(_) => ErrorKind::Io,
        }
    }

    /// Whether the caller can fix the problem and retry.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Io)
    }
}

pub type Result<T> = std::result::Result<T, CropperError>;
