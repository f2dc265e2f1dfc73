use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// String key-value storage that outlives a single page view.
///
/// Writes never fail from the caller's point of view; persistence problems
/// are logged and the in-memory value stays authoritative.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// Reads a non-negative integer, treating absent or malformed values as 0.
pub fn read_counter(store: &dyn KeyValueStore, key: &str) -> i64 {
    store
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(0)
}

#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

type Scopes = HashMap<String, HashMap<String, String>>;

struct FileStoreInner {
    file_path: PathBuf,
    scopes: Scopes,
}

/// JSON file holding one key-value map per browser client.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Mutex<FileStoreInner>>,
}

impl FileStore {
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        let scopes = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<Scopes>(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                Scopes::new()
            })
        } else {
            Scopes::new()
        };

        Ok(FileStore {
            inner: Arc::new(Mutex::new(FileStoreInner {
                file_path: path.to_path_buf(),
                scopes,
            })),
        })
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.lock().scopes.contains_key(scope)
    }

    pub fn scoped(&self, scope: &str) -> ScopedStore {
        ScopedStore {
            file: self.clone(),
            scope: scope.to_string(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FileStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FileStoreInner {
    fn save(&self) {
        let result = serde_json::to_string_pretty(&self.scopes)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(std::fs::write(&self.file_path, content)?));
        if let Err(e) = result {
            tracing::warn!(
                "Failed to persist client state to {}: {:?}",
                self.file_path.display(),
                e
            );
        }
    }
}

/// The slice of a `FileStore` that belongs to one browser client.
#[derive(Clone)]
pub struct ScopedStore {
    file: FileStore,
    scope: String,
}

impl KeyValueStore for ScopedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.file
            .lock()
            .scopes
            .get(&self.scope)
            .and_then(|values| values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) {
        let mut inner = self.file.lock();
        inner
            .scopes
            .entry(self.scope.clone())
            .or_default()
            .insert(key.to_string(), value);
        inner.save();
    }

    fn remove(&mut self, key: &str) {
        let mut inner = self.file.lock();
        let Some(values) = inner.scopes.get_mut(&self.scope) else {
            return;
        };
        if values.remove(key).is_none() {
            return;
        }
        if values.is_empty() {
            inner.scopes.remove(&self.scope);
        }
        inner.save();
    }
}
