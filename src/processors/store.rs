// pixie-crop/src/processors/store.rs
use crate::core::{AssetInfo, CropperError, EncodedOutput, Result, MAX_UPLOAD_BYTES};
use crate::processors::Loader;
use crate::utils::{content_type_for_extension, extension_for_content_type, not_found_or};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use uuid::Uuid;
use walkdir::WalkDir;

const TEMP_PREFIX: &str = ".tmp.";

/// Opaque name of a staged file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A staged file. Metadata is read on first request and then kept.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub id: AssetRef,
    pub path: PathBuf,
    pub created_at: SystemTime,
    metadata: Option<AssetInfo>,
}

impl ImageAsset {
    pub fn metadata(&mut self, loader: &Loader) -> Result<&AssetInfo> {
        let info = match self.metadata.take() {
            Some(info) => info,
            None => {
                let (width, height, format) = loader.probe(&self.path)?;
                let size_bytes = std::fs::metadata(&self.path)
                    .map_err(|e| not_found_or(&self.path, e))?
                    .len();
                AssetInfo {
                    asset_ref: self.id.to_string(),
                    width,
                    height,
                    format,
                    size_bytes,
                }
            }
        };
        let info: &AssetInfo = self.metadata.insert(info);
        Ok(info)
    }
}

/// Raw bytes of a staged file, ready to hand out as a download.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
}

/// Flat staging directory of uploads and crop results.
///
/// There is no locking: a purge may remove a file another request is about
/// to read, in which case that read reports [`CropperError::NotFound`].
/// Files are never rewritten after staging, so their modification time is
/// their creation time and header metadata can be kept for the lifetime of
/// the store.
pub struct TempAssetStore {
    root: PathBuf,
    max_upload_bytes: u64,
    loader: Loader,
    metadata: Mutex<HashMap<String, AssetInfo>>,
}

impl TempAssetStore {
    pub const ALLOWED_CONTENT_TYPES: [&'static str; 4] =
        ["image/jpeg", "image/png", "image/gif", "image/webp"];

    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        log::debug!("Staging directory: {}", root.display());
        Ok(Self {
            root,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            loader: Loader::new(),
            metadata: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates and stages an upload.
    pub fn store(&self, bytes: &[u8], declared_content_type: &str) -> Result<AssetRef> {
        let content_type = declared_content_type.trim().to_ascii_lowercase();
        if !Self::ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(CropperError::InvalidType(declared_content_type.to_string()));
        }

        let size = bytes.len() as u64;
        if size == 0 {
            return Err(CropperError::EmptyFile);
        }
        if size > self.max_upload_bytes {
            return Err(CropperError::FileTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let extension = extension_for_content_type(&content_type).unwrap_or("bin");
        let id = AssetRef(format!("{}.{}", Uuid::new_v4().simple(), extension));
        self.write_atomic(&id, bytes)?;

        log::info!("Stored upload {} ({} bytes)", id, size);
        Ok(id)
    }

    /// Stages an encoded crop result under its suggested filename.
    pub fn store_output(&self, output: &EncodedOutput) -> Result<AssetRef> {
        let id = AssetRef(output.filename.clone());
        Self::validate_ref(id.as_str())?;
        self.write_atomic(&id, &output.bytes)?;

        log::info!("Stored output {} ({} bytes)", id, output.bytes.len());
        Ok(id)
    }

    pub fn resolve(&self, asset_ref: &str) -> Result<PathBuf> {
        Self::validate_ref(asset_ref)?;

        let path = self.root.join(asset_ref);
        if !path.is_file() {
            return Err(CropperError::NotFound(asset_ref.to_string()));
        }
        Ok(path)
    }

    pub fn asset(&self, asset_ref: &str) -> Result<ImageAsset> {
        let path = self.resolve(asset_ref)?;
        let created_at = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| not_found_or(&path, e))?;
        let metadata = self.cached_metadata().get(asset_ref).cloned();

        Ok(ImageAsset {
            id: AssetRef(asset_ref.to_string()),
            path,
            created_at,
            metadata,
        })
    }

    /// Returns the asset's metadata, probing the header on first use only.
    pub fn inspect(&self, asset_ref: &str) -> Result<AssetInfo> {
        let mut asset = self.asset(asset_ref)?;
        let info = asset.metadata(&self.loader)?.clone();
        self.cached_metadata().insert(asset_ref.to_string(), info.clone());
        Ok(info)
    }

    pub fn read(&self, asset_ref: &str) -> Result<StagedFile> {
        let path = self.resolve(asset_ref)?;
        let bytes = std::fs::read(&path).map_err(|e| not_found_or(&path, e))?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(content_type_for_extension)
            .unwrap_or("application/octet-stream");

        Ok(StagedFile {
            bytes,
            mime_type,
            filename: asset_ref.to_string(),
        })
    }

    /// Deletes one asset. Returns false if it was already gone.
    pub fn remove(&self, asset_ref: &str) -> Result<bool> {
        Self::validate_ref(asset_ref)?;
        self.cached_metadata().remove(asset_ref);
        match std::fs::remove_file(self.root.join(asset_ref)) {
            Ok(()) => {
                log::debug!("Removed asset {}", asset_ref);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every staged file older than `age`. Returns how many were removed.
    pub fn purge_older_than(&self, age: Duration) -> usize {
        let cutoff = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.purge_before(cutoff)
    }

    /// Deletes every staged file created before `cutoff`.
    ///
    /// Failures are logged per entry and never stop the scan.
    pub fn purge_before(&self, cutoff: SystemTime) -> usize {
        self.purge_with(cutoff, |path| std::fs::remove_file(path))
    }

    fn purge_with<F>(&self, cutoff: SystemTime, mut remove: F) -> usize
    where
        F: FnMut(&Path) -> std::io::Result<()>,
    {
        let mut purged = 0;

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable staging entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let created = match entry
                .metadata()
                .map_err(std::io::Error::from)
                .and_then(|m| m.modified())
            {
                Ok(time) => time,
                Err(e) => {
                    log::warn!("Cannot read age of {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            if created >= cutoff {
                continue;
            }

            if let Some(name) = entry.file_name().to_str() {
                self.cached_metadata().remove(name);
            }

            match remove(entry.path()) {
                Ok(()) => {
                    purged += 1;
                    log::info!("Deleted old temp file: {}", entry.path().display());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("{} vanished before purge", entry.path().display());
                }
                Err(e) => {
                    log::warn!("Failed to delete {}: {}", entry.path().display(), e);
                }
            }
        }

        purged
    }

    fn write_atomic(&self, id: &AssetRef, bytes: &[u8]) -> Result<()> {
        self.write_atomic_with(id, |temp_path| std::fs::write(temp_path, bytes))
    }

    fn write_atomic_with<F>(&self, id: &AssetRef, write: F) -> Result<()>
    where
        F: FnOnce(&Path) -> std::io::Result<()>,
    {
        let path = self.root.join(id.as_str());
        let temp_path = self
            .root
            .join(format!("{}{}", TEMP_PREFIX, Uuid::new_v4().simple()));

        if let Err(e) = write(&temp_path).and_then(|()| std::fs::rename(&temp_path, &path)) {
            if let Err(cleanup) = std::fs::remove_file(&temp_path) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove {}: {}", temp_path.display(), cleanup);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn cached_metadata(&self) -> MutexGuard<'_, HashMap<String, AssetInfo>> {
        // Entries are inserted whole; a poisoned map is still consistent.
        self.metadata
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn validate_ref(asset_ref: &str) -> Result<()> {
        let valid = !asset_ref.is_empty()
            && !asset_ref.starts_with('.')
            && !asset_ref.contains(['/', '\\'])
            && !asset_ref.contains("..");

        if !valid {
            return Err(CropperError::InvalidAssetRef(asset_ref.to_string()));
        }
        Ok(())
    }
}
