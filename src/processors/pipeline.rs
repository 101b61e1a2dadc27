// pixie-crop/src/processors/pipeline.rs
use crate::core::{CropperError, ResolvedCrop, Result, Rotation};
use image::{DynamicImage, GenericImageView};

/// Rotate, flip and crop in a fixed order.
///
/// The crop rectangle is captured on the already rotated and flipped preview,
/// so the crop is always the last step:
///
/// 1. rotate clockwise
/// 2. flip horizontally
/// 3. flip vertically
/// 4. crop
///
/// All work happens on an RGBA8 buffer whatever the source pixel layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformPipeline;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transform {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        image: &DynamicImage,
        transform: Transform,
        crop: ResolvedCrop,
    ) -> Result<DynamicImage> {
        let mut working = DynamicImage::ImageRgba8(image.to_rgba8());

        working = self.rotate(working, transform.rotation);

        if transform.flip_horizontal {
            log::debug!("Flipping horizontally");
            working = working.fliph();
        }

        if transform.flip_vertical {
            log::debug!("Flipping vertically");
            working = working.flipv();
        }

        self.crop(&working, crop)
    }

    pub fn rotate(&self, image: DynamicImage, rotation: Rotation) -> DynamicImage {
        if rotation == Rotation::None {
            return image;
        }

        log::debug!(
            "Rotating {}x{} image by {} degrees",
            image.width(),
            image.height(),
            rotation.degrees()
        );

        match rotation {
            Rotation::None => image,
            Rotation::Cw90 => image.rotate90(),
            Rotation::Cw180 => image.rotate180(),
            Rotation::Cw270 => image.rotate270(),
        }
    }

    /// Crops the working buffer.
    ///
    /// The rectangle was clamped against the unrotated source, so after a
    /// quarter turn it may reach past the buffer. It is intersected again here.
    pub fn crop(&self, image: &DynamicImage, crop: ResolvedCrop) -> Result<DynamicImage> {
        let (buf_w, buf_h) = image.dimensions();
        let width = crop.width.min(buf_w.saturating_sub(crop.x));
        let height = crop.height.min(buf_h.saturating_sub(crop.y));

        if width == 0 || height == 0 {
            return Err(CropperError::DegenerateCrop {
                width: i64::from(width),
                height: i64::from(height),
            });
        }

        if (crop.x, crop.y, width, height) == (0, 0, buf_w, buf_h) {
            log::debug!("Crop covers the whole image, skipping");
            return Ok(image.clone());
        }

        log::debug!(
            "Cropping {}x{} at ({}, {}) from {}x{}",
            width,
            height,
            crop.x,
            crop.y,
            buf_w,
            buf_h
        );

        Ok(image.crop_imm(crop.x, crop.y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    // Each pixel holds its own (x, y) in the red and green channels.
    fn coordinate_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([x as u8, y as u8, 0]);
        }
        DynamicImage::ImageRgb8(img)
    }

    fn full(image: &DynamicImage) -> ResolvedCrop {
        ResolvedCrop { x: 0, y: 0, width: image.width(), height: image.height() }
    }

    #[test]
    fn test_output_is_rgba() {
        let image = coordinate_image(4, 2);
        let out = TransformPipeline::new()
            .apply(&image, Transform::default(), full(&image))
            .unwrap();
        assert!(matches!(out, DynamicImage::ImageRgba8(_)));
        assert_eq!(out.get_pixel(3, 1), Rgba([3, 1, 0, 255]));
    }

    #[test]
    fn test_rotate_90_swaps_dimensions() {
        let image = coordinate_image(4, 2);
        let transform = Transform { rotation: Rotation::Cw90, ..Default::default() };
        let out = TransformPipeline::new()
            .apply(&image, transform, full(&image))
            .unwrap();
        // Clamped against 4x2, so the crop keeps only the top 2x2 of the 2x4 buffer.
        assert_eq!(out.dimensions(), (2, 2));
        // Clockwise: the bottom-left source pixel becomes the top-left one.
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 1, 0, 255]));
    }

    #[test]
    fn test_four_quarter_turns_restore_image() {
        let pipeline = TransformPipeline::new();
        let original = DynamicImage::ImageRgba8(coordinate_image(5, 3).to_rgba8());
        let mut image = original.clone();
        for _ in 0..4 {
            image = pipeline.rotate(image, Rotation::Cw90);
        }
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.as_bytes(), original.as_bytes());
    }

    #[test]
    fn test_flips_happen_after_rotation() {
        let image = coordinate_image(4, 2);
        let pipeline = TransformPipeline::new();
        let crop = ResolvedCrop { x: 0, y: 0, width: 2, height: 2 };

        let transform = Transform {
            rotation: Rotation::Cw90,
            flip_horizontal: true,
            flip_vertical: false,
        };
        let out = pipeline.apply(&image, transform, crop).unwrap();
        // Rotated buffer top row is [(0,1), (0,0)]; mirrored it becomes [(0,0), (0,1)].
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), Rgba([0, 1, 0, 255]));

        let transform = Transform {
            rotation: Rotation::None,
            flip_horizontal: false,
            flip_vertical: true,
        };
        let out = pipeline.apply(&image, transform, crop).unwrap();
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 1, 0, 255]));
    }

    #[test]
    fn test_crop_is_last() {
        let image = coordinate_image(4, 2);
        let transform = Transform { rotation: Rotation::Cw180, ..Default::default() };
        let crop = ResolvedCrop { x: 1, y: 0, width: 2, height: 1 };
        let out = TransformPipeline::new().apply(&image, transform, crop).unwrap();
        assert_eq!(out.dimensions(), (2, 1));
        // After a half turn, buffer (1, 0) holds source (2, 1).
        assert_eq!(out.get_pixel(0, 0), Rgba([2, 1, 0, 255]));
    }

    #[test]
    fn test_crop_outside_rotated_buffer_is_degenerate() {
        let image = coordinate_image(8, 2);
        let transform = Transform { rotation: Rotation::Cw90, ..Default::default() };
        let crop = ResolvedCrop { x: 4, y: 0, width: 2, height: 2 };
        let err = TransformPipeline::new().apply(&image, transform, crop).unwrap_err();
        assert!(matches!(err, CropperError::DegenerateCrop { width: 0, .. }));
    }
}
