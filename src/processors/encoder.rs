// pixie-crop/src/processors/encoder.rs
use crate::core::{CropperError, EncodedOutput, OutputFormat, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat};
use oxipng::{optimize_from_memory, Options};
use std::io::Cursor;
use uuid::Uuid;

pub struct FormatEncoder {
    optimize_png: bool,
}

impl FormatEncoder {
    pub fn new() -> Self {
        Self { optimize_png: true }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    /// Encodes `image` as the named format.
    ///
    /// See [`OutputFormat::resolve`] for how `format` and `quality` are
    /// interpreted.
    pub fn encode(
        &self,
        image: &DynamicImage,
        format: &str,
        quality: i32,
    ) -> Result<EncodedOutput> {
        let format = OutputFormat::resolve(format, quality)?;
        self.encode_as(image, format)
    }

    pub fn encode_as(&self, image: &DynamicImage, format: OutputFormat) -> Result<EncodedOutput> {
        let bytes = self.compress_to_bytes(image, format)?;
        let filename = format!("cropped_{}.{}", Uuid::new_v4().simple(), format.extension());

        log::info!(
            "Encoded {}x{} image as {} ({} bytes)",
            image.width(),
            image.height(),
            format.name(),
            bytes.len()
        );

        Ok(EncodedOutput {
            bytes,
            mime_type: format.mime_type(),
            filename,
            width: image.width(),
            height: image.height(),
        })
    }

    pub fn compress_to_bytes(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
        log::debug!("Encoding with {:?}", format);

        match format {
            OutputFormat::Jpeg { quality } => self.encode_jpeg(image, quality),
            OutputFormat::Png => self.encode_png(image),
            OutputFormat::WebP { quality } => self.encode_webp(image, quality),
        }
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        // JPEG has no alpha channel.
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality);
            encoder
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(|e| CropperError::Encode(format!("JPEG encoding failed: {}", e)))?;
        }
        Ok(buffer)
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| CropperError::Encode(format!("PNG encoding failed: {}", e)))?;

        if self.optimize_png {
            return self.optimize_png_bytes(&buffer.into_inner());
        }

        Ok(buffer.into_inner())
    }

    fn encode_webp(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        // The pure-Rust encoder is lossless only; quality is applied by
        // quantizing the colour channels beforehand.
        let mut rgba = image.to_rgba8();
        quantize_rgb(rgba.as_mut(), quality);

        let mut buffer = Vec::new();
        WebPEncoder::new_lossless(Cursor::new(&mut buffer))
            .encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
            .map_err(|e| CropperError::Encode(format!("WebP encoding failed: {}", e)))?;
        Ok(buffer)
    }

    fn optimize_png_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        optimize_from_memory(data, &Options::default())
            .map_err(|e| CropperError::Encode(format!("PNG optimization failed: {}", e)))
    }
}

impl Default for FormatEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn quantize_rgb(data: &mut [u8], quality: u8) {
    if quality >= 100 {
        return;
    }
    let step = 255.0 / (f32::from(levels_for_quality(quality)) - 1.0);
    for pixel in data.chunks_exact_mut(4) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Number of levels per channel; fine near 100, coarse at the bottom.
fn levels_for_quality(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = f32::from(quality.max(1)) / 100.0;
    (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 7) as u8, (y * 13) as u8, 90, 200]);
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_jpeg_output() {
        let encoder = FormatEncoder::new();
        let out = encoder.encode(&gradient(32, 16), "JPEG", 90).unwrap();

        assert_eq!(out.mime_type, "image/jpeg");
        assert!(out.filename.starts_with("cropped_"));
        assert!(out.filename.ends_with(".jpg"));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn test_png_ignores_quality() {
        let encoder = FormatEncoder::new().with_png_optimization(false);
        for quality in [-10, 0, 101, 5000] {
            let out = encoder.encode(&gradient(8, 8), "png", quality).unwrap();
            assert_eq!(out.mime_type, "image/png");
            assert!(out.filename.ends_with(".png"));
        }
    }

    #[test]
    fn test_optimized_png_is_lossless() {
        let image = gradient(16, 16);
        let out = FormatEncoder::new().encode(&image, "png", 0).unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.to_rgba8().as_raw(), image.to_rgba8().as_raw());
    }

    #[test]
    fn test_webp_output() {
        let out = FormatEncoder::new().encode(&gradient(10, 6), "webp", 40).unwrap();
        assert_eq!(out.mime_type, "image/webp");
        assert!(out.filename.ends_with(".webp"));
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::WebP);
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 6));
    }

    #[test]
    fn test_unknown_format_falls_back_to_jpeg() {
        let out = FormatEncoder::new().encode(&gradient(4, 4), "bmp", 80).unwrap();
        assert_eq!(out.mime_type, "image/jpeg");
        assert!(out.filename.ends_with(".jpg"));
    }

    #[test]
    fn test_non_positive_quality_is_rejected_for_lossy_formats() {
        let encoder = FormatEncoder::new();
        assert!(matches!(
            encoder.encode(&gradient(4, 4), "jpeg", 0),
            Err(CropperError::InvalidQuality(0))
        ));
        assert!(matches!(
            encoder.encode(&gradient(4, 4), "webp", -1),
            Err(CropperError::InvalidQuality(-1))
        ));
    }

    #[test]
    fn test_filenames_are_unique() {
        let encoder = FormatEncoder::new();
        let a = encoder.encode(&gradient(2, 2), "jpeg", 80).unwrap();
        let b = encoder.encode(&gradient(2, 2), "jpeg", 80).unwrap();
        assert_ne!(a.filename, b.filename);
    }

    #[test]
    fn test_quantization_levels() {
        assert_eq!(levels_for_quality(100), 256);
        assert_eq!(levels_for_quality(1), 2);
        assert!(levels_for_quality(50) < levels_for_quality(90));

        let mut data = vec![10, 128, 250, 77];
        quantize_rgb(&mut data, 1);
        assert_eq!(data, vec![0, 255, 255, 77]);
    }
}
