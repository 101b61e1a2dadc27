mod cli;
mod core;
mod processors;
mod utils;

pub use cli::{hours, Cli, Commands};
pub use crate::core::processor::CropService;
pub use crate::core::{
    AssetInfo, CropRequest, CropperConfig, CropperError, EncodedOutput, ErrorKind,
    OutputFormat, ResolvedCrop, Result, Rotation, Unit, DEFAULT_DPI, DEFAULT_QUALITY,
    DEFAULT_RETENTION, MAX_UPLOAD_BYTES,
};
pub use processors::{
    AssetRef, CropGeometryResolver, CropPreset, FormatEncoder, ImageAsset, Loader,
    PresetCatalog, StagedFile, TempAssetStore, Transform, TransformPipeline, UnitConverter,
};
pub use utils::{
    content_type_for_extension, extension_for_content_type, format_file_size,
    guess_content_type, image_format_name,
};

pub mod prelude {
    pub use crate::{
        CropGeometryResolver, CropRequest, CropService, CropperConfig, FormatEncoder,
        PresetCatalog, TempAssetStore, TransformPipeline, UnitConverter,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;
