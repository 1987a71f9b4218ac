use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<&'static str>);

impl QueryKey {
    pub fn new(parts: &[&'static str]) -> Self {
        Self(parts.to_vec())
    }

    pub fn workspace_list() -> Self {
        Self::new(&["workspace", "list"])
    }

    pub fn parts(&self) -> &[&'static str] {
        &self.0
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: Option<V>,
    version: u64,
    invalidations: u64,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            value: None,
            version: 0,
            invalidations: 0,
        }
    }
}

/// Fetched values per query key.
///
/// Invalidation drops the value and bumps the key's version; views that read
/// the version re-run their fetch.
#[derive(Debug)]
pub struct QueryCache<V> {
    entries: HashMap<QueryKey, CacheEntry<V>>,
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> QueryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<&V> {
        self.entries.get(key).and_then(|entry| entry.value.as_ref())
    }

    pub fn store(&mut self, key: QueryKey, value: V) {
        self.entries.entry(key).or_default().value = Some(value);
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.get(key).is_none()
    }

    pub fn invalidate(&mut self, key: &QueryKey) {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.value = None;
        entry.version += 1;
        entry.invalidations += 1;
        log::debug!("query {:?} invalidated (version {})", key.parts(), entry.version);
    }

    pub fn version(&self, key: &QueryKey) -> u64 {
        self.entries.get(key).map_or(0, |entry| entry.version)
    }

    pub fn invalidations(&self, key: &QueryKey) -> u64 {
        self.entries.get(key).map_or(0, |entry| entry.invalidations)
    }

    /// Returns the cached value, fetching it first when the key is stale.
    /// A failed fetch leaves the entry stale.
    pub fn get_or_fetch<E>(
        &mut self,
        key: &QueryKey,
        fetch: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        let entry = self.entries.entry(key.clone()).or_default();
        let value = match entry.value.take() {
            Some(value) => value,
            None => fetch()?,
        };
        Ok(entry.value.insert(value))
    }
}
