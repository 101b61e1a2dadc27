// pixie-crop/src/processors/mod.rs
mod encoder;
mod geometry;
mod loader;
mod pipeline;
mod presets;
mod store;
mod units;

pub use encoder::FormatEncoder;
pub use geometry::CropGeometryResolver;
pub use loader::Loader;
pub use pipeline::{Transform, TransformPipeline};
pub use presets::{CropPreset, PresetCatalog};
pub use store::{AssetRef, ImageAsset, StagedFile, TempAssetStore};
pub use units::UnitConverter;
