use std::path::{Path, PathBuf};

use boardy_core::constants::DEFAULT_IMPORT_TAG;
use boardy_core::{AppError, AppResult};
use walkdir::WalkDir;

use super::{ingest_one, ImportControl, ImportReport};
use crate::engine::CatalogEngine;

/// Every regular file under `root`, in a stable order.
fn scan(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Recursively imports a directory, tagging everything `general`
pub struct DirectoryImporter {
    engine: CatalogEngine,
    control: ImportControl,
}

impl DirectoryImporter {
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

    #[tracing::instrument(skip(self, root), fields(import.kind = "directory", root = %root.display()))]
    pub async fn import(&self, root: &Path) -> AppResult<ImportReport> {
        if !tokio::fs::metadata(root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(AppError::InvalidFile(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let owned = root.to_path_buf();
        let files = tokio::task::spawn_blocking(move || scan(&owned))
            .await
            .map_err(|e| AppError::Internal(format!("Directory scan failed: {}", e)))?;
        let total = files.len();
        tracing::info!(total, "Directory scanned");

        let tags = vec![DEFAULT_IMPORT_TAG.to_string()];
        let mut report = ImportReport::default();

        for path in &files {
            if self.control.is_cancelled() {
                tracing::info!(processed = report.processed(), total, "Directory import cancelled");
                break;
            }

            ingest_one(&self.engine, path, &tags, None, &mut report).await?;
            self.control.report(report.processed(), total);
        }

        tracing::info!(
            imported = report.imported,
            duplicates = report.duplicates,
            unsupported = report.unsupported,
            failed = report.failed,
            "Directory import finished"
        );
        Ok(report)
    }
}
