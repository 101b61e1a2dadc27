// pixie-crop/src/processors/loader.rs
use crate::core::{CropperError, Result};
use crate::utils::{image_format_name, not_found_or};
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Decodes staged files.
#[derive(Clone)]
pub struct Loader {
    max_dimensions: Option<(u32, u32)>,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: Some((100_000, 100_000)),
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    pub fn load(&self, path: &Path) -> Result<DynamicImage> {
        log::debug!("Loading image from: {}", path.display());

        // Checked before decoding so oversized images never get allocated.
        let (width, height, format) = self.probe(path)?;
        self.check_dimensions(width, height)?;

        let image = ImageReader::open(path)
            .map_err(|e| not_found_or(path, e))?
            .with_guessed_format()
            .map_err(|e| not_found_or(path, e))?
            .decode()
            .map_err(|e| CropperError::ImageDecode(e.to_string()))?;

        log::info!(
            "Loaded image: {}x{} pixels, format: {}, color: {:?}",
            image.width(),
            image.height(),
            format,
            image.color()
        );

        Ok(image)
    }

    /// Reads dimensions and format from the file header without decoding pixels.
    pub fn probe(&self, path: &Path) -> Result<(u32, u32, String)> {
        let reader = ImageReader::open(path)
            .map_err(|e| not_found_or(path, e))?
            .with_guessed_format()
            .map_err(|e| not_found_or(path, e))?;

        let format = reader.format().map(image_format_name).ok_or_else(|| {
            CropperError::ImageDecode(format!("Unrecognized image data: {}", path.display()))
        })?;

        let (width, height) = reader.into_dimensions().map_err(|e| match e {
            image::ImageError::IoError(io) => not_found_or(path, io),
            other => CropperError::ImageDecode(other.to_string()),
        })?;

        Ok((width, height, format.to_string()))
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if let Some((max_w, max_h)) = self.max_dimensions {
            if width > max_w || height > max_h {
                return Err(CropperError::MemoryLimitExceeded(format!(
                    "Image dimensions {}x{} exceed maximum {}x{}",
                    width, height, max_w, max_h
                )));
            }
        }
        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
