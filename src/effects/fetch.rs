//! Fetching effects from a source and delivering them to a slot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::effects::source::EffectSource;
use crate::foundation::error::{MiravaError, MiravaResult};

/// Capability that resolves an [`EffectSource`] into package bytes.
///
/// `fetch` runs on a worker thread, never on the session thread, so an
/// implementation is free to block on disk or network IO. Returning an error
/// surfaces as `EffectLoadFailed` on the load ticket; the target slot is left
/// unchanged.
pub trait EffectFetcher: Send + Sync {
    /// Resolve `source` to the raw effect package bytes.
    fn fetch(&self, source: &EffectSource) -> MiravaResult<Arc<[u8]>>;
}

fn validate_package(source: &EffectSource, bytes: Arc<[u8]>) -> MiravaResult<Arc<[u8]>> {
    if bytes.is_empty() {
        return Err(MiravaError::effect_load(format!(
            "empty effect package from '{}'",
            source.describe()
        )));
    }
    Ok(bytes)
}

/// Fetcher that resolves `Url` sources as filesystem paths under a root.
#[derive(Clone, Debug)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    /// Resolve relative URLs against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl EffectFetcher for FileFetcher {
    fn fetch(&self, source: &EffectSource) -> MiravaResult<Arc<[u8]>> {
        let bytes: Arc<[u8]> = match source {
            EffectSource::Bytes(bytes) => bytes.clone(),
            EffectSource::Url(url) => {
                let path = self.root.join(url);
                std::fs::read(&path)
                    .map_err(|e| {
                        MiravaError::effect_load(format!(
                            "read effect package '{}': {e}",
                            path.display()
                        ))
                    })?
                    .into()
            }
        };
        validate_package(source, bytes)
    }
}

/// In-memory fetcher for tests and demos: a table of named packages.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Arc<[u8]>>,
}

impl MemoryFetcher {
    /// An empty table. `Bytes` sources still resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package under a URL-like name.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.entries.insert(name.into(), bytes.into());
    }
}

impl EffectFetcher for MemoryFetcher {
    fn fetch(&self, source: &EffectSource) -> MiravaResult<Arc<[u8]>> {
        let bytes = match source {
            EffectSource::Bytes(bytes) => bytes.clone(),
            EffectSource::Url(url) => self
                .entries
                .get(url)
                .cloned()
                .ok_or_else(|| MiravaError::effect_load(format!("unknown effect '{url}'")))?,
        };
        validate_package(source, bytes)
    }
}
