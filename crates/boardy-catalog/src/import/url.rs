use std::path::PathBuf;
use std::time::Duration;

use boardy_core::constants::DEFAULT_IMPORT_TAG;
use boardy_core::{AppError, AppResult, Config};
use boardy_processing::classify_bytes;
use reqwest::Url;

use super::{ingest_one, ImportControl, ImportReport, RateLimiter};
use crate::engine::CatalogEngine;

/// Accept only absolute `http`/`https` URLs that name a host.
pub fn validate_import_url(url: &str) -> AppResult<Url> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(AppError::InvalidInput(format!(
            "URL must start with http:// or https://: {}",
            trimmed
        )));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| AppError::InvalidInput(format!("Invalid URL format: {}", e)))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(AppError::InvalidInput(format!(
            "URL must have a host: {}",
            trimmed
        ))),
    }
}

/// Downloads URLs and imports them, tagging everything `general`
///
/// Fetches are rate limited and bounded by a per-request timeout. A failed
/// fetch or non-2xx response is skipped, never retried.
pub struct UrlImporter {
    engine: CatalogEngine,
    client: reqwest::Client,
    limiter: RateLimiter,
    control: ImportControl,
    download_dir: Option<PathBuf>,
}

impl UrlImporter {
    pub fn new(
        engine: CatalogEngine,
        timeout: Duration,
        requests_per_minute: u32,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            engine,
            client,
            limiter: RateLimiter::per_minute(requests_per_minute),
            control: ImportControl::default(),
            download_dir: None,
        })
    }

    /// Timeout and rate limit taken from `config`.
    pub fn from_config(engine: CatalogEngine, config: &Config) -> AppResult<Self> {
        Self::new(
            engine,
            config.fetch_timeout(),
            config.fetch_rate_limit_per_minute,
        )
    }

    pub fn with_control(mut self, control: ImportControl) -> Self {
        self.control = control;
        self
    }

    /// Stage downloads under `dir` instead of the system temp directory.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    #[tracing::instrument(skip(self, urls), fields(import.kind = "url", import.total = urls.len()))]
    pub async fn import(&self, urls: &[String]) -> AppResult<ImportReport> {
        let tags = vec![DEFAULT_IMPORT_TAG.to_string()];
        let total = urls.len();
        let mut report = ImportReport::default();

        for url in urls {
            if self.control.is_cancelled() {
                tracing::info!(processed = report.processed(), total, "URL import cancelled");
                break;
            }

            self.import_one(url, &tags, &mut report).await?;
            self.control.report(report.processed(), total);
        }

        tracing::info!(
            imported = report.imported,
            duplicates = report.duplicates,
            unsupported = report.unsupported,
            failed = report.failed,
            "URL import finished"
        );
        Ok(report)
    }

    async fn import_one(
        &self,
        url: &str,
        tags: &[String],
        report: &mut ImportReport,
    ) -> AppResult<()> {
        let parsed = match validate_import_url(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Skipping invalid URL");
                report.failed += 1;
                return Ok(());
            }
        };

        let Some(body) = self.fetch(parsed).await else {
            report.failed += 1;
            return Ok(());
        };

        let (class, extension) = classify_bytes(&body);
        let (Some(kind), Some(extension)) = (class.kind(), extension) else {
            tracing::debug!(url = %url, class = ?class, "Unsupported download skipped");
            report.unsupported += 1;
            return Ok(());
        };

        let staged = match &self.download_dir {
            Some(dir) => tempfile::tempdir_in(dir),
            None => tempfile::tempdir(),
        };
        let dir = match staged {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to create download directory");
                report.failed += 1;
                return Ok(());
            }
        };
        let path = dir.path().join(format!("download.{}", extension));
        if let Err(e) = tokio::fs::write(&path, &body).await {
            tracing::warn!(url = %url, error = %e, "Failed to write download");
            report.failed += 1;
            return Ok(());
        }

        ingest_one(&self.engine, &path, tags, Some(kind), report).await
    }

    /// Body of a successful response, or `None` after logging why not.
    async fn fetch(&self, url: Url) -> Option<Vec<u8>> {
        self.limiter.acquire().await;
        let start = std::time::Instant::now();

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Fetch failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Fetch returned non-success status");
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => {
                tracing::debug!(
                    url = %url,
                    size_bytes = bytes.len(),
                    duration_ms = start.elapsed().as_millis(),
                    "Fetched"
                );
                Some(bytes.to_vec())
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to read response body");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_import_url() {
        assert!(validate_import_url("https://example.com/cat.png").is_ok());
        assert!(validate_import_url("  http://example.com/a  ").is_ok());
        assert!(validate_import_url("ftp://example.com/cat.png").is_err());
        assert!(validate_import_url("example.com/cat.png").is_err());
        assert!(validate_import_url("http://").is_err());
    }
}
