use super::{validate_object_name, Locator, ObjectStore, StoreError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

/// Directory-backed object store
///
/// Writes go to a hidden temp file and are renamed into place, so readers
/// never observe a partial object. Temp names start with `.` and can never
/// collide with a valid object name.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    locator: Locator,
}

impl FsObjectStore {
    /// Open (creating if needed) a store rooted at `root`
    ///
    /// With no `public_base`, locators are `file://` URLs of the objects.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or the base URL is unusable
    pub async fn open(root: impl AsRef<Path>, public_base: Option<Url>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| StoreError::io(root.display().to_string(), e))?;
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| StoreError::io(root.display().to_string(), e))?;

        let base = match public_base {
            Some(base) => base,
            None => Url::from_directory_path(&root).map_err(|()| {
                StoreError::Locator(format!("{} is not an absolute path", root.display()))
            })?,
        };

        Ok(Self {
            root,
            locator: Locator::new(base)?,
        })
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_object_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<Url, StoreError> {
        let path = self.path_of(name)?;
        let url = self.locator.locate(name)?;
        let tmp = self.root.join(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            return Err(StoreError::io(name, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::io(name, e));
        }

        tracing::debug!(object = name, bytes = bytes.len(), "object written");
        Ok(url)
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_of(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(name.to_string())),
            Err(e) => Err(StoreError::io(name, e)),
        }
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(name, e)),
        }
    }
}
