use super::{validate_object_name, Locator, ObjectStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use url::Url;

/// In-process object store
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
    locator: Locator,
}

impl MemoryObjectStore {
    /// Store whose locators look like `memory://{container}/{name}`
    ///
    /// # Errors
    /// Returns error if `container` is not a valid URL host
    pub fn new(container: &str) -> Result<Self, StoreError> {
        let base = Url::parse(&format!("memory://{container}/"))
            .map_err(|e| StoreError::Locator(format!("container '{container}': {e}")))?;
        Ok(Self::with_locator(Locator::new(base)?))
    }

    #[must_use]
    pub fn with_locator(locator: Locator) -> Self {
        Self {
            objects: DashMap::new(),
            locator,
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All object names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<Url, StoreError> {
        let url = self.locator.locate(name)?;
        self.objects.insert(name.to_string(), bytes);
        Ok(url)
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_object_name(name)?;
        self.objects
            .get(name)
            .map(|v| v.value().clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        validate_object_name(name)?;
        Ok(self.objects.remove(name).is_some())
    }
}
