use crate::error::{IpcError, Result};
use crate::series::CanonicalSeries;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Storage trait for persisting loaded series under a caller-chosen name
pub trait SeriesStore: Send + Sync {
    /// Saves the series and returns a reference to the stored content.
    fn save(&self, name: &str, series: &CanonicalSeries) -> Result<String>;
    fn load(&self, name: &str) -> Result<Option<CanonicalSeries>>;
}

/// In-memory storage implementation for development/testing
#[derive(Default, Clone)]
pub struct InMemorySeriesStore {
    series: Arc<Mutex<HashMap<String, CanonicalSeries>>>,
}

impl InMemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CanonicalSeries>>> {
        self.series
            .lock()
            .map_err(|_| IpcError::SourceUnavailable("series store lock poisoned".to_string()))
    }
}

impl SeriesStore for InMemorySeriesStore {
    fn save(&self, name: &str, series: &CanonicalSeries) -> Result<String> {
        self.lock()?.insert(name.to_string(), series.clone());
        debug!("Stored series '{}' in memory ({} values)", name, series.len());
        Ok(format!("mem:{}", name))
    }

    fn load(&self, name: &str) -> Result<Option<CanonicalSeries>> {
        Ok(self.lock()?.get(name).cloned())
    }
}

/// Content-addressed filesystem store: JSON blobs under `sha256/aa/bb/<hex>`
/// and one `refs/<name>` file per name holding the blob's hex digest.
pub struct FsSeriesStore {
    root: PathBuf,
}

impl FsSeriesStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, hex: &str) -> Result<PathBuf> {
        if hex.len() < 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IpcError::MalformedInput(format!("invalid content hash '{}'", hex)));
        }
        Ok(self
            .root
            .join("sha256")
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(hex))
    }

    fn ref_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && name != "."
            && name != "..";
        if !valid {
            return Err(IpcError::Config(format!("invalid series name '{}'", name)));
        }
        Ok(self.root.join("refs").join(name))
    }

    /// Writes `bytes` once under their digest; identical content is never rewritten.
    fn write_blob(&self, bytes: &[u8]) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hex = hex::encode(hasher.finalize());
        let path = self.blob_path(&hex)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        if !path.exists() {
            fs::write(&path, bytes)?;
        }
        Ok(hex)
    }
}

impl SeriesStore for FsSeriesStore {
    fn save(&self, name: &str, series: &CanonicalSeries) -> Result<String> {
        let ref_path = self.ref_path(name)?;
        let bytes = serde_json::to_vec_pretty(series)?;
        let hex = self.write_blob(&bytes)?;
        if let Some(dir) = ref_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&ref_path, &hex)?;
        debug!("Stored series '{}' as sha256:{}", name, hex);
        Ok(format!("cas:sha256:{}", hex))
    }

    fn load(&self, name: &str) -> Result<Option<CanonicalSeries>> {
        let ref_path = self.ref_path(name)?;
        if !ref_path.exists() {
            return Ok(None);
        }
        let hex = fs::read_to_string(&ref_path)?;
        let bytes = fs::read(self.blob_path(hex.trim())?)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
