// pixie-crop/src/processors/presets.rs
use crate::core::Unit;
use crate::processors::UnitConverter;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropPreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub unit: Unit,
    pub description: &'static str,
}

impl CropPreset {
    /// Pixel size of the preset at `dpi`, for pre-filling a crop request.
    pub fn to_pixels(&self, dpi: Option<f64>) -> (i64, i64) {
        let converter = UnitConverter::new();
        (
            converter.to_pixels(f64::from(self.width), self.unit, dpi),
            converter.to_pixels(f64::from(self.height), self.unit, dpi),
        )
    }
}

static PRESETS: [CropPreset; 9] = [
    CropPreset {
        name: "A4 Paper",
        width: 210,
        height: 297,
        unit: Unit::Mm,
        description: "Standard A4 paper size",
    },
    CropPreset {
        name: "Letter Paper",
        width: 8,
        height: 11,
        unit: Unit::In,
        description: "US Letter paper size",
    },
    CropPreset {
        name: "Instagram Square",
        width: 1080,
        height: 1080,
        unit: Unit::Px,
        description: "Instagram square post",
    },
    CropPreset {
        name: "Instagram Story",
        width: 1080,
        height: 1920,
        unit: Unit::Px,
        description: "Instagram story format",
    },
    CropPreset {
        name: "Facebook Cover",
        width: 1200,
        height: 630,
        unit: Unit::Px,
        description: "Facebook cover photo",
    },
    CropPreset {
        name: "Twitter Header",
        width: 1500,
        height: 500,
        unit: Unit::Px,
        description: "Twitter header image",
    },
    CropPreset {
        name: "YouTube Thumbnail",
        width: 1280,
        height: 720,
        unit: Unit::Px,
        description: "YouTube video thumbnail",
    },
    CropPreset {
        name: "Business Card",
        width: 89,
        height: 51,
        unit: Unit::Mm,
        description: "Standard business card",
    },
    CropPreset {
        name: "Passport Photo",
        width: 35,
        height: 45,
        unit: Unit::Mm,
        description: "Standard passport photo",
    },
];

/// Fixed table of common target sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetCatalog;

impl PresetCatalog {
    pub fn new() -> Self {
        Self
    }

    pub fn list(&self) -> &'static [CropPreset] {
        &PRESETS
    }

    pub fn find(&self, name: &str) -> Option<&'static CropPreset> {
        PRESETS
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
    }
}
