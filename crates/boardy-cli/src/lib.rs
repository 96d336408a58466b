use std::path::Path;

use anyhow::Context;
use boardy_catalog::CatalogEngine;
use boardy_core::{normalize_tag_name, AppError, Config};
use tokio_util::sync::CancellationToken;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Store rooted at `root` when given, otherwise configured from the environment.
pub fn load_config(root: Option<&Path>) -> anyhow::Result<Config> {
    let config = match root {
        Some(root) => Config::for_root(root),
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };
    config.validate()?;
    Ok(config)
}

/// Ids of existing tags named in `names`. Any unknown name is an error.
pub async fn resolve_tag_ids(engine: &CatalogEngine, names: &[String]) -> anyhow::Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());
    for raw in names {
        let Some(name) = normalize_tag_name(raw) else {
            continue;
        };
        let tag = engine
            .get_tag_by_name(&name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} does not exist", name)))?;
        ids.push(tag.id);
    }
    Ok(ids)
}

/// Cancel `token` on the first Ctrl-C so a running import stops after its current item.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current item");
            token.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_for_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path())).unwrap();
        assert!(config.media_dir.starts_with(dir.path()));
        assert!(config.thumbnail_dir.starts_with(dir.path()));
        assert_ne!(config.media_dir, config.thumbnail_dir);
        assert!(config.database_url.starts_with("sqlite:"));
    }
}
