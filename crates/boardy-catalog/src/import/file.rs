use std::path::PathBuf;

use boardy_core::AppResult;

use super::{ingest_one, ImportControl, ImportReport};
use crate::engine::CatalogEngine;

/// Imports an explicit list of files
pub struct FileImporter {
    engine: CatalogEngine,
    control: ImportControl,
}

impl FileImporter {
    pub fn new(engine: CatalogEngine) -> Self {
        Self {
            engine,
            control: ImportControl::default(),
        }
    }

    pub fn with_control(mut self, control: ImportControl) -> Self {
        self.control = control;
        self
    }

    /// Ingest each path with `tags`. Images and videos are recognized by
    /// content; anything else is counted as unsupported.
    #[tracing::instrument(skip(self, paths, tags), fields(import.kind = "files", import.total = paths.len()))]
    pub async fn import(&self, paths: &[PathBuf], tags: &[String]) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();
        let total = paths.len();

        for path in paths {
            if self.control.is_cancelled() {
                tracing::info!(processed = report.processed(), total, "File import cancelled");
                break;
            }

            ingest_one(&self.engine, path, tags, None, &mut report).await?;
            self.control.report(report.processed(), total);
        }

        tracing::info!(
            imported = report.imported,
            duplicates = report.duplicates,
            unsupported = report.unsupported,
            failed = report.failed,
            "File import finished"
        );
        Ok(report)
    }
}
