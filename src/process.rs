//! Texture transformation worker pool.
//!
//! Stage 3 of the pipeline. Takes every staged original, scales it to fit the
//! configured max dimension and re-encodes it as a block-compressed DDS.
//!
//! ## Output Structure
//!
//! ```text
//! data/processed/
//! ├── .transform-cache.json      # Transform cache (see crate::cache)
//! ├── a_armor.dds                # from originals/a_armor.dds
//! └── banner.dds                 # from originals/banner.png
//! ```
//!
//! ## Parallel Processing
//!
//! Tasks run on a dedicated [rayon](https://docs.rs/rayon) pool sized by the
//! operator's worker count. Rayon's work-stealing deque hands each idle worker
//! the next task, so a few huge textures don't stall a whole partition.
//! Collecting the results is the barrier: [`transform`] returns only after
//! every task has finished, and results come back in input order regardless
//! of completion order.
//!
//! Each task is independent. A corrupt source fails that task only; the
//! failure is recorded in the report and its siblings carry on.
//!
//! ## Progress
//!
//! An optional [`Sender`] receives one [`ProcessEvent`] per finished task, in
//! completion order, for live CLI output.

use crate::cache::{self, CacheKey, CacheStats, TransformCache};
use crate::database::processed_file_name;
use crate::imaging::{
    BackendError, ImageBackend, RustBackend, TransformOutcome, TransformSettings, TransformTask,
    is_supported_input, transform_texture,
};
use crate::types::ItemFailure;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no staged originals at {0}; run a scan first")]
    MissingOriginals(PathBuf),
    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Worker pool options that are not persisted settings.
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    pub workers: usize,
    pub use_cache: bool,
}

/// How a texture's output was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureStatus {
    /// Existing output matched source and settings; nothing written.
    Cached,
    /// Matching output found under another name and copied.
    Copied,
    /// Decoded, scaled and block-compressed.
    Encoded,
}

/// One successful task.
#[derive(Debug, Clone)]
pub struct ProcessedTexture {
    pub source: String,
    pub output: String,
    pub status: TextureStatus,
    /// Present when the texture was actually encoded this run.
    pub outcome: Option<TransformOutcome>,
}

/// Progress event sent as each task finishes.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Started {
        total: usize,
        workers: usize,
    },
    TextureDone {
        index: usize,
        total: usize,
        texture: ProcessedTexture,
    },
    TextureFailed {
        index: usize,
        total: usize,
        failure: ItemFailure,
    },
}

/// Aggregate result of a transform batch.
#[derive(Debug, Default)]
pub struct ProcessReport {
    pub processed: Vec<ProcessedTexture>,
    pub failures: Vec<ItemFailure>,
    pub cache_stats: CacheStats,
}

impl ProcessReport {
    pub fn succeeded(&self) -> usize {
        self.processed.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Textures whose requested format was swapped for an alpha-capable one.
    pub fn upgraded(&self) -> impl Iterator<Item = (&ProcessedTexture, &TransformOutcome)> {
        self.processed.iter().filter_map(|p| match &p.outcome {
            Some(o) if o.upgraded() => Some((p, o)),
            _ => None,
        })
    }
}

/// Transform all staged originals using the pure Rust backend.
pub fn transform(
    originals_dir: &Path,
    output_dir: &Path,
    settings: &TransformSettings,
    options: &ProcessOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessReport, ProcessError> {
    let backend = RustBackend::new();
    transform_with_backend(
        &backend,
        originals_dir,
        output_dir,
        settings,
        options,
        progress,
    )
}

/// A finished texture and the cache key to record for it after the barrier.
type TaskResult = Result<(ProcessedTexture, CacheKey), ItemFailure>;

/// Transform all staged originals using a specific backend (allows testing with mock).
pub fn transform_with_backend(
    backend: &impl ImageBackend,
    originals_dir: &Path,
    output_dir: &Path,
    settings: &TransformSettings,
    options: &ProcessOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessReport, ProcessError> {
    if !originals_dir.is_dir() {
        return Err(ProcessError::MissingOriginals(originals_dir.to_path_buf()));
    }
    std::fs::create_dir_all(output_dir)?;

    let (inputs, mut failures) = collect_inputs(originals_dir);
    let total = inputs.len();
    let workers = options.workers.max(1);

    let mut cache = if options.use_cache {
        TransformCache::open(output_dir)
    } else {
        TransformCache::disabled()
    };
    let settings_digest = cache::digest_settings(settings);

    if let Some(tx) = &progress {
        let _ = tx.send(ProcessEvent::Started { total, workers });
    }
    tracing::info!(total, workers, "starting transform pool");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;

    let ctx = TaskContext {
        backend,
        output_dir,
        settings,
        cache: &cache,
        settings_digest: &settings_digest,
    };
    let results: Vec<TaskResult> = pool.install(|| {
        inputs
            .par_iter()
            .enumerate()
            .map(|(i, source)| {
                let result = ctx.run(source);
                if let Some(tx) = &progress {
                    let event = match &result {
                        Ok((texture, _)) => ProcessEvent::TextureDone {
                            index: i + 1,
                            total,
                            texture: texture.clone(),
                        },
                        Err(failure) => ProcessEvent::TextureFailed {
                            index: i + 1,
                            total,
                            failure: failure.clone(),
                        },
                    };
                    let _ = tx.send(event);
                }
                result
            })
            .collect()
    });

    let mut report = ProcessReport::default();
    for result in results {
        match result {
            Ok((texture, key)) => {
                report.cache_stats.count(texture.status);
                cache.record(texture.output.clone(), key);
                report.processed.push(texture);
            }
            Err(failure) => failures.push(failure),
        }
    }
    report.failures = failures;

    if let Err(e) = cache.persist(output_dir) {
        tracing::warn!("could not save transform cache: {e}");
    }
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "transform complete"
    );
    Ok(report)
}

/// Transformable files directly under `dir`, sorted by name.
///
/// Two originals that map to the same output name (`a.png` and `a.dds`)
/// would race on one file; the later one is reported as a failure instead.
fn collect_inputs(dir: &Path) -> (Vec<PathBuf>, Vec<ItemFailure>) {
    let mut inputs = Vec::new();
    let mut failures = Vec::new();
    let mut outputs: HashMap<String, String> = HashMap::new();

    let files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_supported_input(e.path()));

    for entry in files {
        let name = entry.file_name().to_string_lossy().into_owned();
        let output = processed_file_name(&name.to_lowercase());
        if let Some(first) = outputs.get(&output) {
            failures.push(ItemFailure::new(
                name,
                format!("output {output} is already produced by {first}"),
            ));
            continue;
        }
        outputs.insert(output, name);
        inputs.push(entry.into_path());
    }
    (inputs, failures)
}

/// Shared, read-only state for every task.
struct TaskContext<'a, B: ImageBackend> {
    backend: &'a B,
    output_dir: &'a Path,
    settings: &'a TransformSettings,
    cache: &'a TransformCache,
    settings_digest: &'a str,
}

impl<B: ImageBackend> TaskContext<'_, B> {
    fn run(&self, source: &Path) -> TaskResult {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = processed_file_name(&name.to_lowercase());
        let fail = |detail: &dyn std::fmt::Display| ItemFailure::new(name.as_str(), detail);

        let source_digest = cache::digest_file(source).map_err(|e| fail(&e))?;
        let key = CacheKey::new(source_digest, self.settings_digest);

        let (status, outcome) = match self.cache.lookup(&key, self.output_dir) {
            Some(stored) if stored == output => (TextureStatus::Cached, None),
            Some(stored) => {
                std::fs::copy(self.output_dir.join(stored), self.output_dir.join(&output))
                    .map_err(|e| fail(&e))?;
                (TextureStatus::Copied, None)
            }
            None => {
                let task = TransformTask {
                    source: source.to_path_buf(),
                    output: self.output_dir.join(&output),
                    settings: *self.settings,
                };
                let outcome =
                    transform_texture(self.backend, &task).map_err(|e: BackendError| {
                        tracing::warn!(texture = %name, "transform failed: {e}");
                        fail(&e)
                    })?;
                (TextureStatus::Encoded, Some(outcome))
            }
        };

        tracing::debug!(texture = %name, ?status, "texture done");
        Ok((
            ProcessedTexture {
                source: name,
                output,
                status,
                outcome,
            },
            key,
        ))
    }
}
