//! Batch importers
//!
//! Importers feed files into the engine one at a time and keep going past
//! per-item problems: duplicates, unsupported content and failed items are
//! counted in an [`ImportReport`]. Only an integrity violation stops a batch.

mod directory;
mod file;
mod rate_limit;
mod url;

pub use directory::DirectoryImporter;
pub use file::FileImporter;
pub use rate_limit::RateLimiter;
pub use url::{validate_import_url, UrlImporter};

use std::path::Path;
use std::sync::Arc;

use boardy_core::{AppError, AppResult, ErrorMetadata, LogLevel, MediaKind};
use boardy_processing::classify_path;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::engine::CatalogEngine;

/// Per-batch outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub duplicates: usize,
    pub unsupported: usize,
    pub failed: usize,
}

impl ImportReport {
    pub fn processed(&self) -> usize {
        self.imported + self.duplicates + self.unsupported + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub processed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(ImportProgress) + Send + Sync>;

/// Progress reporting and cancellation shared by all importers.
///
/// Cancellation is checked between items; an item already being ingested is
/// allowed to finish.
#[derive(Clone, Default)]
pub struct ImportControl {
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl ImportControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, callback: impl Fn(ImportProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn report(&self, processed: usize, total: usize) {
        if let Some(callback) = &self.progress {
            callback(ImportProgress { processed, total });
        }
    }
}

/// Classify and ingest one file, recording the outcome in `report`.
///
/// Errors are returned only for integrity violations.
async fn ingest_one(
    engine: &CatalogEngine,
    path: &Path,
    tags: &[String],
    kind_hint: Option<MediaKind>,
    report: &mut ImportReport,
) -> AppResult<()> {
    let kind = match kind_hint {
        Some(kind) => kind,
        None => match classify_path(path).await {
            Ok((class, _)) => match class.kind() {
                Some(kind) => kind,
                None => {
                    tracing::debug!(path = %path.display(), class = ?class, "Unsupported file skipped");
                    report.unsupported += 1;
                    return Ok(());
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read file for classification");
                report.failed += 1;
                return Ok(());
            }
        },
    };

    match engine.ingest(path, tags, kind).await {
        Ok(_) => report.imported += 1,
        Err(e @ AppError::IntegrityViolation(_)) => return Err(e),
        Err(e) => {
            log_item_error(path, &e);
            if e.is_recoverable() {
                report.duplicates += 1;
            } else {
                report.failed += 1;
            }
        }
    }

    Ok(())
}

/// Log a skipped item at the level its error kind calls for.
fn log_item_error(path: &Path, e: &AppError) {
    let code = e.error_code();
    match e.log_level() {
        LogLevel::Debug => {
            tracing::debug!(path = %path.display(), error.code = code, "Import item skipped")
        }
        LogLevel::Warn => {
            tracing::warn!(path = %path.display(), error.code = code, error = %e, "Import item failed")
        }
        LogLevel::Error => {
            tracing::error!(path = %path.display(), error.code = code, error = %e, "Import item failed")
        }
    }
}
