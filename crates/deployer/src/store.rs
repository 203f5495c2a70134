use std::{
    fmt::Debug,
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use hebao_common::types::DeploymentManifest;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Manifest IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Manifest is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

/// Durable home of the deployment manifest between runs.
// async_trait keeps the trait object safe (`Arc<dyn ManifestStore>`).
#[async_trait::async_trait]
pub trait ManifestStore: Debug + Send + Sync {
    /// `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<DeploymentManifest>, StoreError>;

    /// Replaces the stored manifest.
    async fn save(&self, manifest: &DeploymentManifest) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore(Arc<Mutex<Option<DeploymentManifest>>>);

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(manifest: DeploymentManifest) -> Self {
        Self(Arc::new(Mutex::new(Some(manifest))))
    }

    fn inner(&self) -> Result<MutexGuard<'_, Option<DeploymentManifest>>, StoreError> {
        self.0
            .lock()
            .map_err(|_| StoreError::Custom("Failed to lock the store".to_string()))
    }
}

#[async_trait::async_trait]
impl ManifestStore for InMemoryStore {
    async fn load(&self) -> Result<Option<DeploymentManifest>, StoreError> {
        Ok(self.inner()?.clone())
    }

    async fn save(&self, manifest: &DeploymentManifest) -> Result<(), StoreError> {
        *self.inner()? = Some(manifest.clone());
        Ok(())
    }
}

/// Manifest kept as pretty-printed JSON on disk. Writes go to a sibling
/// temporary file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait::async_trait]
impl ManifestStore for JsonFileStore {
    async fn load(&self) -> Result<Option<DeploymentManifest>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, manifest: &DeploymentManifest) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(manifest)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), contracts = manifest.len(), "Manifest saved");
        Ok(())
    }
}
