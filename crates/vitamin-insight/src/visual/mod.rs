//! Illustrative heatmap rendering.
//!
//! The artifact is an edge map of the upload recoloured from blue to red. No
//! nutrient information flows into it and it must never be presented as
//! evidence for a score.

mod filter;

use image::{DynamicImage, ImageFormat, ImageReader, Limits, Rgb, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, warn};

pub const ILLUSTRATIVE_NOTICE: &str =
    "Heatmap is an illustrative edge filter and carries no diagnostic information.";

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ImageDecodeError {
    #[error("uploaded image is empty")]
    Empty,
    #[error("uploaded image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("unsupported image format; upload a JPEG or PNG")]
    UnsupportedFormat(Option<ImageFormat>),
    #[error("could not decode image: {0}")]
    Malformed(#[source] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
#[error("could not encode heatmap: {0}")]
pub struct ArtifactEncodeError(#[from] image::ImageError);

/// Upper bounds applied before and during decoding of untrusted uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodeLimits {
    pub max_bytes: usize,
    pub max_dimension: u32,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatmapFilter {
    FindEdges,
}

impl HeatmapFilter {
    pub const fn label(self) -> &'static str {
        match self {
            Self::FindEdges => "Find Edges",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualArtifact {
    filter: HeatmapFilter,
    image: RgbImage,
}

impl VisualArtifact {
    pub fn filter(&self) -> HeatmapFilter {
        self.filter
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn content_type(&self) -> mime::Mime {
        mime::IMAGE_PNG
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ArtifactEncodeError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Decodes uploads and renders the blue-to-red edge heatmap.
#[derive(Debug, Clone)]
pub struct HeatmapExtractor {
    limits: DecodeLimits,
    low: Rgb<u8>,
    high: Rgb<u8>,
}

impl Default for HeatmapExtractor {
    fn default() -> Self {
        Self::new(DecodeLimits::default())
    }
}

impl HeatmapExtractor {
    pub fn new(limits: DecodeLimits) -> Self {
        Self {
            limits,
            low: Rgb([0, 0, 255]),
            high: Rgb([255, 0, 0]),
        }
    }

    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Accepts JPEG and PNG only, sniffed from the bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageDecodeError> {
        if bytes.is_empty() {
            return Err(ImageDecodeError::Empty);
        }
        if bytes.len() > self.limits.max_bytes {
            warn!(
                size = bytes.len(),
                limit = self.limits.max_bytes,
                "rejecting oversized upload"
            );
            return Err(ImageDecodeError::TooLarge {
                size: bytes.len(),
                limit: self.limits.max_bytes,
            });
        }

        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| ImageDecodeError::Malformed(image::ImageError::IoError(err)))?;
        match reader.format() {
            Some(ImageFormat::Png | ImageFormat::Jpeg) => {}
            other => return Err(ImageDecodeError::UnsupportedFormat(other)),
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.limits.max_dimension);
        limits.max_image_height = Some(self.limits.max_dimension);
        reader.limits(limits);

        let image = reader.decode().map_err(ImageDecodeError::Malformed)?;
        debug!(
            width = image.width(),
            height = image.height(),
            bytes = bytes.len(),
            "upload decoded"
        );
        Ok(image)
    }

    /// Colour conversion, edge filter, luma, then the two-anchor recolour.
    pub fn render(&self, image: &DynamicImage) -> VisualArtifact {
        let rgb = image.to_rgb8();
        let edges = filter::find_edges(&rgb);
        let intensity = filter::to_intensity(&edges);
        VisualArtifact {
            filter: HeatmapFilter::FindEdges,
            image: filter::colorize(&intensity, self.low, self.high),
        }
    }

    pub fn extract(&self, bytes: &[u8]) -> Result<VisualArtifact, ImageDecodeError> {
        let image = self.decode(bytes)?;
        Ok(self.render(&image))
    }
}
