//! Transform cache for incremental runs.
//!
//! Block compression dominates the transform stage, so a rerun skips every
//! texture whose staged original and transform settings are unchanged.
//!
//! Entries are keyed by content, not by name. A [`CacheKey`] pairs the SHA-256
//! of the staged original with a digest of the [`TransformSettings`]. When the
//! same key shows up under a different output name (a rescan staged the
//! texture under a new basename), the existing output is copied rather than
//! re-encoded.
//!
//! A lookup only hits while the recorded output file still exists.
//!
//! The cache lives at `<processed_dir>/.transform-cache.json`. Workers only
//! read it; [`TransformCache::record`] is called after the pool's barrier.

use crate::imaging::TransformSettings;
use crate::process::TextureStatus;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Name of the cache file within the processed directory.
pub const CACHE_FILENAME: &str = ".transform-cache.json";

/// Bumped whenever key derivation changes; older files are discarded.
const CACHE_VERSION: u32 = 1;

/// Content of a staged original plus the settings it was encoded with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub source: String,
    pub settings: String,
}

impl CacheKey {
    pub fn new(source: String, settings: &str) -> Self {
        Self {
            source,
            settings: settings.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    outputs: BTreeMap<String, CacheKey>,
}

/// Output name → key, with a reverse index for content lookups.
#[derive(Debug, Default)]
pub struct TransformCache {
    outputs: BTreeMap<String, CacheKey>,
    by_key: HashMap<CacheKey, String>,
}

impl TransformCache {
    /// A cache that never hits. Used for `--no-cache`.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Load the cache from `dir`. Missing, unreadable or outdated files
    /// give an empty cache.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(CACHE_FILENAME);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str::<CacheFile>(&content) {
            Ok(file) if file.version == CACHE_VERSION => {
                let mut cache = Self::default();
                for (output, key) in file.outputs {
                    cache.record(output, key);
                }
                cache
            }
            Ok(file) => {
                tracing::debug!(version = file.version, "discarding outdated transform cache");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "discarding unreadable transform cache: {e}");
                Self::default()
            }
        }
    }

    /// Output name previously produced for `key`, if that file is still in `dir`.
    pub fn lookup(&self, key: &CacheKey, dir: &Path) -> Option<&str> {
        let output = self.by_key.get(key)?;
        dir.join(output).is_file().then_some(output.as_str())
    }

    /// Note that `output` now holds the result for `key`.
    ///
    /// An older output with the same key is forgotten, as is whatever key
    /// `output` held before.
    pub fn record(&mut self, output: String, key: CacheKey) {
        if let Some(previous) = self.outputs.remove(&output) {
            self.by_key.remove(&previous);
        }
        if let Some(stale) = self.by_key.insert(key.clone(), output.clone())
            && stale != output
        {
            self.outputs.remove(&stale);
        }
        self.outputs.insert(output, key);
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn persist(&self, dir: &Path) -> io::Result<()> {
        let file = CacheFile {
            version: CACHE_VERSION,
            outputs: self.outputs.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(dir.join(CACHE_FILENAME), json)
    }
}

/// Hex SHA-256 of a file, streamed.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hex SHA-256 of the settings that shape an output.
pub fn digest_settings(settings: &TransformSettings) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"texproc-transform\0");
    hasher.update(settings.max_dimension.value().to_le_bytes());
    hasher.update(settings.format.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Per-run tally of how outputs were produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub copies: usize,
    pub encoded: usize,
}

impl CacheStats {
    pub fn count(&mut self, status: TextureStatus) {
        match status {
            TextureStatus::Cached => self.hits += 1,
            TextureStatus::Copied => self.copies += 1,
            TextureStatus::Encoded => self.encoded += 1,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.hits, "cached"),
            (self.copies, "copied"),
            (self.encoded, "encoded"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();
        if parts.is_empty() {
            f.write_str("nothing to do")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}
