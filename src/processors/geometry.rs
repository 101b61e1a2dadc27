// pixie-crop/src/processors/geometry.rs
use crate::core::{CropRequest, CropperError, ResolvedCrop, Result, Rotation, Unit};
use crate::processors::UnitConverter;

/// Turns a [`CropRequest`] into a pixel rectangle inside the source image.
///
/// Sizes go through the [`UnitConverter`]; the origin is already in pixels
/// because it comes from a drag gesture on screen. Everything is expressed in
/// the source frame, before any rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CropGeometryResolver {
    converter: UnitConverter,
}

impl CropGeometryResolver {
    pub fn new(converter: UnitConverter) -> Self {
        Self { converter }
    }

    pub fn resolve(
        &self,
        source_width: u32,
        source_height: u32,
        request: &CropRequest,
    ) -> Result<ResolvedCrop> {
        Self::validate_request(request)?;

        let unit: Unit = request.unit.parse()?;
        let width = self.converter.to_pixels(request.width, unit, request.dpi);
        let height = self.converter.to_pixels(request.height, unit, request.dpi);

        log::debug!(
            "Crop size {}x{} {} @ {} dpi -> {}x{} px",
            request.width,
            request.height,
            unit,
            UnitConverter::effective_dpi(request.dpi),
            width,
            height
        );

        self.clamp(source_width, source_height, request.x, request.y, width, height)
    }

    /// Clamps a pixel rectangle to `[0, source_width) x [0, source_height)`.
    pub fn clamp(
        &self,
        source_width: u32,
        source_height: u32,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    ) -> Result<ResolvedCrop> {
        let x = x.max(0);
        let y = y.max(0);
        let width = width.min(i64::from(source_width) - x);
        let height = height.min(i64::from(source_height) - y);

        if width <= 0 || height <= 0 {
            return Err(CropperError::DegenerateCrop { width, height });
        }

        // Positive width/height imply x < source_width and y < source_height.
        Ok(ResolvedCrop {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        })
    }

    fn validate_request(request: &CropRequest) -> Result<()> {
        if !(request.width.is_finite() && request.width > 0.0)
            || !(request.height.is_finite() && request.height > 0.0)
        {
            return Err(CropperError::InvalidParameter(format!(
                "Crop size must be positive, got {}x{}",
                request.width, request.height
            )));
        }

        Rotation::from_degrees(request.rotation)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(x: i64, y: i64, width: f64, height: f64, unit: &str) -> CropRequest {
        CropRequest {
            asset_ref: "asset.jpg".to_string(),
            x,
            y,
            width,
            height,
            unit: unit.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pixel_crop_inside_bounds_is_unchanged() {
        let resolver = CropGeometryResolver::default();
        let crop = resolver
            .resolve(800, 600, &request(100, 50, 200.0, 150.0, "px"))
            .unwrap();
        assert_eq!(
            crop,
            ResolvedCrop { x: 100, y: 50, width: 200, height: 150 }
        );
    }

    #[test]
    fn test_overflowing_size_is_shrunk() {
        let resolver = CropGeometryResolver::default();
        let crop = resolver
            .resolve(800, 600, &request(700, 500, 300.0, 300.0, "px"))
            .unwrap();
        assert_eq!(crop.width, 100);
        assert_eq!(crop.height, 100);
    }

    #[test]
    fn test_negative_origin_is_clamped_to_zero() {
        let resolver = CropGeometryResolver::default();
        let crop = resolver
            .resolve(800, 600, &request(-20, -5, 100.0, 100.0, "px"))
            .unwrap();
        assert_eq!((crop.x, crop.y, crop.width, crop.height), (0, 0, 100, 100));
    }

    #[test]
    fn test_millimetres_are_converted_then_clamped() {
        let resolver = CropGeometryResolver::default();
        let mut req = request(0, 0, 210.0, 297.0, "mm");
        req.dpi = Some(96.0);

        let crop = resolver.resolve(2000, 2000, &req).unwrap();
        assert_eq!((crop.width, crop.height), (793, 1122));

        let crop = resolver.resolve(800, 600, &req).unwrap();
        assert_eq!((crop.width, crop.height), (793, 600));

        let crop = resolver.resolve(600, 800, &req).unwrap();
        assert_eq!((crop.width, crop.height), (600, 800));
    }

    #[test]
    fn test_origin_past_edge_is_degenerate() {
        let resolver = CropGeometryResolver::default();
        let err = resolver
            .resolve(800, 600, &request(800, 0, 10.0, 10.0, "px"))
            .unwrap_err();
        assert!(matches!(err, CropperError::DegenerateCrop { width: 0, .. }));
    }

    #[test]
    fn test_sub_pixel_physical_size_is_degenerate() {
        let resolver = CropGeometryResolver::default();
        let err = resolver
            .resolve(800, 600, &request(0, 0, 0.1, 10.0, "mm"))
            .unwrap_err();
        assert!(matches!(err, CropperError::DegenerateCrop { .. }));
    }

    #[test]
    fn test_invalid_requests_are_rejected_before_conversion() {
        let resolver = CropGeometryResolver::default();

        let err = resolver
            .resolve(800, 600, &request(0, 0, 10.0, 10.0, "furlong"))
            .unwrap_err();
        assert!(matches!(err, CropperError::InvalidUnit(_)));

        let err = resolver
            .resolve(800, 600, &request(0, 0, 0.0, 10.0, "px"))
            .unwrap_err();
        assert!(matches!(err, CropperError::InvalidParameter(_)));

        let mut rotated = request(0, 0, 10.0, 10.0, "px");
        rotated.rotation = 45;
        let err = resolver.resolve(800, 600, &rotated).unwrap_err();
        assert!(matches!(err, CropperError::InvalidRotation(45)));
    }

    proptest! {
        #[test]
        fn prop_resolved_rectangle_stays_inside_source(
            source_width in 1u32..5000,
            source_height in 1u32..5000,
            x in -6000i64..6000,
            y in -6000i64..6000,
            width in 1i64..8000,
            height in 1i64..8000,
        ) {
            let resolver = CropGeometryResolver::default();
            if let Ok(crop) = resolver.clamp(source_width, source_height, x, y, width, height) {
                prop_assert!(crop.width > 0 && crop.height > 0);
                prop_assert!(crop.x + crop.width <= source_width);
                prop_assert!(crop.y + crop.height <= source_height);
            }
        }
    }
}
