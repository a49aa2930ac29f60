use crate::compressor::ImageCompressor;
use crate::constants::{MAX_BATCH_FILES, SUPPORTED_IMAGE_EXTENSIONS};
use crate::engine::CompressionEngine;
use crate::error::{CompressionError, Result};
use crate::options::CompressOptions;
use crate::payload::ImageFile;
use crate::signal::check_signal;
use glob::glob;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use walkdir::WalkDir;

/// Called once per finished file with its input path and whether it succeeded.
pub type FileDoneHandler = Arc<dyn Fn(&Path, bool) + Send + Sync>;

/// Totals for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub elapsed: Duration,
    /// Set when the abort signal stopped the run before every file was scheduled.
    pub aborted: bool,
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    /// Percentage of bytes saved over the successfully processed files.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_before == 0 {
            return 0.0;
        }
        (self.bytes_before as f64 - self.bytes_after as f64) / self.bytes_before as f64 * 100.0
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

struct FileOutcome {
    before: u64,
    after: u64,
    output: PathBuf,
}

/// Compresses every file in `files` into `output_dir`.
///
/// At most `concurrency` files are in flight. Each result is written as
/// `<output_dir>/<resolved name>`; the `file_name` option is ignored since
/// it would make every output collide. Per-file failures are counted in the
/// summary, not returned. When `options.signal` fires, no new files are
/// scheduled and in-flight ones finish with `Aborted`.
///
/// # Returns
/// * `Ok(BatchSummary)` - Totals, including failures
/// * `Err(CompressionError::BatchFileLimitExceeded)` - More than
///   `MAX_BATCH_FILES` inputs
/// * `Err(CompressionError::DirectoryCreationFailed)` - `output_dir` could
///   not be created
pub async fn batch_compress_images<E>(
    compressor: Arc<ImageCompressor<E>>,
    files: Vec<PathBuf>,
    output_dir: &Path,
    options: CompressOptions,
    concurrency: usize,
    on_file_done: Option<FileDoneHandler>,
) -> Result<BatchSummary>
where
    E: CompressionEngine + 'static,
{
    if files.len() > MAX_BATCH_FILES {
        return Err(CompressionError::BatchFileLimitExceeded(
            files.len(),
            MAX_BATCH_FILES,
        ));
    }

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|_| CompressionError::DirectoryCreationFailed(output_dir.to_path_buf()))?;

    let concurrency = concurrency.max(1);
    tracing::info!(
        files = files.len(),
        concurrency,
        output = %output_dir.display(),
        "starting batch compression"
    );

    let start_time = Instant::now();
    let signal = options.signal.clone();
    let mut options = options;
    options.file_name = None;

    let mut jobs = JoinSet::new();
    let mut summary = BatchSummary::default();

    for input_path in files {
        while jobs.len() >= concurrency {
            if let Some(joined) = jobs.join_next().await {
                record_job(&mut summary, joined, on_file_done.as_ref());
            }
        }
        if check_signal(signal.as_ref()).is_err() {
            tracing::warn!("batch aborted, not scheduling remaining files");
            summary.aborted = true;
            break;
        }

        let compressor = Arc::clone(&compressor);
        let output_dir = output_dir.to_path_buf();
        let options = options.clone();
        jobs.spawn(async move {
            let path = input_path.clone();
            let job = tokio::spawn(async move {
                compress_single_file(&compressor, &path, &output_dir, options).await
            });
            let outcome = job
                .await
                .unwrap_or_else(|e| Err(CompressionError::BatchJobFailed(e.to_string())));
            (input_path, outcome)
        });
    }

    while let Some(joined) = jobs.join_next().await {
        record_job(&mut summary, joined, on_file_done.as_ref());
    }

    summary.elapsed = start_time.elapsed();
    tracing::info!(
        processed = summary.processed,
        failed = summary.failed,
        bytes_before = summary.bytes_before,
        bytes_after = summary.bytes_after,
        ratio = summary.compression_ratio(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "batch compression finished"
    );

    Ok(summary)
}

type JobResult = std::result::Result<(PathBuf, Result<FileOutcome>), JoinError>;

fn record_job(
    summary: &mut BatchSummary,
    joined: JobResult,
    on_file_done: Option<&FileDoneHandler>,
) {
    // Jobs turn their own panics into `BatchJobFailed`.
    let (input_path, outcome) = match joined {
        Ok(done) => done,
        Err(e) => {
            tracing::error!(error = %e, "batch job lost");
            summary.failed += 1;
            return;
        }
    };

    match outcome {
        Ok(file) => {
            tracing::debug!(
                input = %input_path.display(),
                output = %file.output.display(),
                before = file.before,
                after = file.after,
                "file compressed"
            );
            summary.processed += 1;
            summary.bytes_before += file.before;
            summary.bytes_after += file.after;
            if let Some(handler) = on_file_done {
                handler(input_path.as_path(), true);
            }
        }
        Err(e) => {
            tracing::error!(input = %input_path.display(), error = %e, "failed to compress");
            summary.failed += 1;
            if let Some(handler) = on_file_done {
                handler(input_path.as_path(), false);
            }
            summary.failures.push((input_path, e.to_string()));
        }
    }
}

async fn compress_single_file<E: CompressionEngine>(
    compressor: &ImageCompressor<E>,
    input_path: &Path,
    output_dir: &Path,
    options: CompressOptions,
) -> Result<FileOutcome> {
    let input = ImageFile::from_path(input_path).await?;
    let before = input.size() as u64;
    let compressed = compressor.compress(input, options).await?;
    let output = compressed.write_to_dir(output_dir).await?;
    Ok(FileOutcome {
        before,
        after: compressed.size() as u64,
        output,
    })
}

/// Resolves `input` to a sorted list of image files.
///
/// `input` may be a single file, a directory (hidden entries are skipped;
/// subdirectories only with `recursive`), or a glob pattern.
pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let input_path = Path::new(input);
    let canonical_input = if input_path.exists() {
        input_path
            .canonicalize()
            .map_err(|_| CompressionError::NoImageFilesFound(input.to_string()))?
    } else {
        // Glob results are canonicalized individually below.
        input_path.to_path_buf()
    };

    if canonical_input.is_file() {
        image_files.push(canonical_input);
    } else if canonical_input.is_dir() {
        let walker = if recursive {
            WalkDir::new(&canonical_input)
        } else {
            WalkDir::new(&canonical_input).max_depth(1)
        };

        for entry in walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_image_file(path) {
                if let Ok(canonical_path) = path.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else if let Ok(pattern) = glob(input) {
        for entry in pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                if let Ok(canonical_path) = entry.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else {
        return Err(CompressionError::NoImageFilesFound(input.to_string()));
    }

    image_files.sort();
    image_files.dedup();
    Ok(image_files)
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
