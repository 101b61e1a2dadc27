// pixie-crop/src/core/processor.rs
use super::{
    AssetInfo, CropRequest, CropperConfig, CropperError, EncodedOutput, OutputFormat, Result,
    Rotation,
};
use crate::processors::{
    AssetRef, CropGeometryResolver, CropPreset, FormatEncoder, Loader, PresetCatalog, StagedFile,
    TempAssetStore, Transform, TransformPipeline, UnitConverter,
};
use std::time::Duration;

/// Entry point for the upload, crop, info, presets, download and cleanup
/// operations.
///
/// Decoding, transforming and encoding run on a bounded worker pool, so the
/// number of images held in memory at once never exceeds the pool size
/// however many threads share the service.
pub struct CropService {
    config: CropperConfig,
    store: TempAssetStore,
    loader: Loader,
    resolver: CropGeometryResolver,
    pipeline: TransformPipeline,
    encoder: FormatEncoder,
    presets: PresetCatalog,
    thread_pool: rayon::ThreadPool,
}

impl CropService {
    pub fn new(config: CropperConfig) -> Result<Self> {
        config.validate()?;

        let (max_w, max_h) = config.max_dimensions;
        let loader = Loader::new().with_max_dimensions(max_w, max_h);
        let store = TempAssetStore::new(&config.staging_dir)?
            .with_max_upload_bytes(config.max_upload_bytes)
            .with_loader(loader.clone());

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("pixie-crop-{}", i))
            .build()
            .map_err(|e| {
                CropperError::ProcessingError(format!("Failed to create thread pool: {}", e))
            })?;

        log::debug!(
            "Crop service ready: staging {}, {} workers",
            config.staging_dir.display(),
            thread_pool.current_num_threads()
        );

        Ok(Self {
            encoder: FormatEncoder::new().with_png_optimization(config.optimize_png),
            config,
            store,
            loader,
            resolver: CropGeometryResolver::new(UnitConverter::new()),
            pipeline: TransformPipeline::new(),
            presets: PresetCatalog::new(),
            thread_pool,
        })
    }

    pub fn config(&self) -> &CropperConfig {
        &self.config
    }

    pub fn store(&self) -> &TempAssetStore {
        &self.store
    }

    /// Stages an upload and reports what was decoded from it.
    ///
    /// Bytes that pass the type and size checks but are not a readable image
    /// are removed again.
    pub fn upload(&self, bytes: &[u8], content_type: &str, filename: &str) -> Result<AssetInfo> {
        log::debug!("Upload of {} ({} bytes, {})", filename, bytes.len(), content_type);

        let asset_ref = self.store.store(bytes, content_type)?;
        match self.store.inspect(asset_ref.as_str()) {
            Ok(info) => Ok(info),
            Err(e) => {
                if let Err(cleanup) = self.store.remove(asset_ref.as_str()) {
                    log::warn!("Failed to remove rejected upload {}: {}", asset_ref, cleanup);
                }
                Err(e)
            }
        }
    }

    pub fn info(&self, asset_ref: &str) -> Result<AssetInfo> {
        self.store.inspect(asset_ref)
    }

    pub fn presets(&self) -> &'static [CropPreset] {
        self.presets.list()
    }

    /// Runs a crop request and returns the encoded result.
    pub fn crop(&self, request: &CropRequest) -> Result<EncodedOutput> {
        // Cheap checks first; nothing is decoded for a request that cannot succeed.
        let rotation = Rotation::from_degrees(request.rotation)?;
        let format = OutputFormat::resolve(&request.output_format, request.quality)?;
        let info = self.store.inspect(&request.asset_ref)?;
        let crop = self.resolver.resolve(info.width, info.height, request)?;
        let path = self.store.resolve(&request.asset_ref)?;

        let transform = Transform {
            rotation,
            flip_horizontal: request.flip_horizontal,
            flip_vertical: request.flip_vertical,
        };

        log::info!(
            "Cropping {} ({}x{}): {:?}, {:?} -> {}",
            request.asset_ref,
            info.width,
            info.height,
            crop,
            transform,
            format.name()
        );

        self.thread_pool.install(|| {
            let image = self.loader.load(&path)?;
            let transformed = self.pipeline.apply(&image, transform, crop)?;
            self.encoder.encode_as(&transformed, format)
        })
    }

    /// Crops and keeps the result in the staging area for a later download.
    pub fn crop_and_store(&self, request: &CropRequest) -> Result<(EncodedOutput, AssetRef)> {
        let output = self.crop(request)?;
        let asset_ref = self.store.store_output(&output)?;
        Ok((output, asset_ref))
    }

    pub fn download(&self, asset_ref: &str) -> Result<StagedFile> {
        self.store.read(asset_ref)
    }

    /// Purges assets older than the configured retention.
    pub fn cleanup(&self) -> usize {
        self.cleanup_older_than(self.config.retention)
    }

    pub fn cleanup_older_than(&self, age: Duration) -> usize {
        let purged = self.store.purge_older_than(age);
        log::info!("Cleanup removed {} staged file(s)", purged);
        purged
    }
}
