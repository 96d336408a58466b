//! Boardy CLI: command-line front end for a local media catalog.
//!
//! Pass `--root DIR` for a self-contained store under DIR, or configure the
//! store through BOARDY_* environment variables (a `.env` file is honored).

use std::path::PathBuf;

use anyhow::Context;
use boardy_catalog::{Catalog, DirectoryImporter, FileImporter, ImportControl, UrlImporter};
use boardy_cli::{cancel_on_ctrl_c, init_tracing, load_config, resolve_tag_ids};
use boardy_core::{parse_tag_lines, parse_tag_list, AppError, ErrorMetadata, LogLevel};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "boardy", about = "Content-addressed media catalog")]
struct Cli {
    /// Store root; overrides the environment configuration
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import files, tagging each with the given tags
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Import every file under a directory, tagged "general"
    ImportDir {
        /// Directory to walk
        dir: PathBuf,
    },
    /// Download and import URLs, tagged "general"
    ImportUrl {
        /// URLs to fetch
        urls: Vec<String>,
        /// File with one URL per line
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Records carrying every given tag, newest first
    Search {
        /// Tag names; none lists everything
        tags: Vec<String>,
        #[arg(long, default_value = "1")]
        page: i64,
        #[arg(long, default_value = "0")]
        page_size: i64,
    },
    /// Number of records in the catalog
    Count,
    /// A single record with its tags and file locations
    Show {
        /// Record id
        id: i64,
    },
    /// Delete a record and its files
    Delete {
        /// Record id
        id: i64,
    },
    /// Absolute path of a stored blob
    Path {
        /// Storage filename (content hash plus extension)
        filename: String,
    },
    /// Absolute path of a video's thumbnail
    ThumbnailPath {
        /// Storage filename (content hash plus extension)
        filename: String,
    },
    /// Tag operations
    Tag {
        #[command(subcommand)]
        sub: TagCommands,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// Create a tag
    Add {
        /// Tag name
        name: String,
    },
    /// Create tags listed one per line in a file
    Batch {
        /// File with one tag name per line
        file: PathBuf,
    },
    /// List tags, optionally only those starting with a prefix
    List {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Attach comma-separated tags to a record, creating them as needed
    Attach {
        /// Record id
        id: i64,
        /// Comma-separated tags
        tags: String,
    },
    /// Detach comma-separated tags from a record
    Detach {
        /// Record id
        id: i64,
        /// Comma-separated tags
        tags: String,
    },
    /// Delete tags everywhere
    Delete {
        /// Comma-separated tags
        tags: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Import control that logs progress and stops on Ctrl-C.
fn import_control() -> ImportControl {
    let control = ImportControl::new().with_progress(|p| {
        tracing::debug!(processed = p.processed, total = p.total, "Import progress");
    });
    cancel_on_ctrl_c(control.cancellation_token());
    control
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.root.as_deref())?;
    let catalog = Catalog::open(&config)
        .await
        .context("Failed to open catalog")?;

    let result = run(&catalog, cli.command).await;
    catalog.close().await;

    if let Err(e) = &result {
        if let Some(app_error) = e.downcast_ref::<AppError>() {
            report_error(app_error)?;
            std::process::exit(1);
        }
    }
    result
}

/// Print a catalog error as JSON and log it at its own level.
fn report_error(e: &AppError) -> anyhow::Result<()> {
    let details = e.detailed_message();
    match e.log_level() {
        LogLevel::Debug => tracing::debug!(error.code = e.error_code(), "{}", details),
        LogLevel::Warn => tracing::warn!(error.code = e.error_code(), "{}", details),
        LogLevel::Error => tracing::error!(error.code = e.error_code(), "{}", details),
    }
    print_json(&error_body(e))
}

fn error_body(e: &AppError) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "error": {
            "code": e.error_code(),
            "type": e.error_type(),
            "recoverable": e.is_recoverable(),
            "message": e.to_string(),
        }
    })
}

async fn run(catalog: &Catalog, command: Commands) -> anyhow::Result<()> {
    let engine = catalog.engine();

    match command {
        Commands::Import { files, tags } => {
            let report = FileImporter::new(engine.clone())
                .with_control(import_control())
                .import(&files, &parse_tag_list(&tags))
                .await?;
            print_json(&report)?;
        }
        Commands::ImportDir { dir } => {
            let report = DirectoryImporter::new(engine.clone())
                .with_control(import_control())
                .import(&dir)
                .await?;
            print_json(&report)?;
        }
        Commands::ImportUrl { mut urls, file } => {
            if let Some(file) = file {
                let contents = tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                urls.extend(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from),
                );
            }
            let report = UrlImporter::from_config(engine.clone(), catalog.config())?
                .with_control(import_control())
                .import(&urls)
                .await?;
            print_json(&report)?;
        }
        Commands::Search {
            tags,
            page,
            page_size,
        } => {
            let records = engine.search(&tags, page, page_size).await?;
            let total = engine.count().await?;
            let max_page = engine.max_page(page_size).await?;
            print_json(&serde_json::json!({
                "page": page,
                "max_page": max_page,
                "total": total,
                "records": records,
            }))?;
        }
        Commands::Count => {
            print_json(&serde_json::json!({ "count": engine.count().await? }))?;
        }
        Commands::Show { id } => {
            let record = engine
                .get(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Media id {} does not exist", id)))?;
            let tags = engine.tags_for(id).await?;
            let path = engine.path_for(&record.filename)?;
            let thumbnail = if record.is_video() {
                Some(engine.thumbnail_path_for(&record.filename)?)
            } else {
                None
            };
            let layout = match engine.layout_for(&record).await {
                Ok(layout) => Some(layout),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not determine layout");
                    None
                }
            };
            print_json(&serde_json::json!({
                "record": record,
                "tags": tags,
                "path": path,
                "thumbnail_path": thumbnail,
                "layout": layout,
            }))?;
        }
        Commands::Delete { id } => {
            engine.delete(id).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("Media {} deleted", id) }),
            )?;
        }
        Commands::Path { filename } => {
            print_json(&serde_json::json!({ "path": engine.path_for(&filename)? }))?;
        }
        Commands::ThumbnailPath { filename } => {
            print_json(&serde_json::json!({ "path": engine.thumbnail_path_for(&filename)? }))?;
        }
        Commands::Tag { sub } => match sub {
            TagCommands::Add { name } => {
                let tag = engine.add_tag(&name).await?;
                print_json(&tag)?;
            }
            TagCommands::Batch { file } => {
                let contents = tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let report = engine.batch_create_tags(&parse_tag_lines(&contents)).await?;
                print_json(&report)?;
            }
            TagCommands::List { prefix } => {
                let tags = match prefix {
                    Some(prefix) => engine.search_tags_by_prefix(Some(&prefix)).await?,
                    None => engine.list_tags().await?,
                };
                print_json(&tags)?;
            }
            TagCommands::Attach { id, tags } => {
                let mut attached = Vec::new();
                for name in parse_tag_list(&tags) {
                    if engine.attach_by_name(&name, id).await? {
                        attached.push(name);
                    }
                }
                print_json(&serde_json::json!({ "id": id, "attached": attached }))?;
            }
            TagCommands::Detach { id, tags } => {
                let ids = resolve_tag_ids(engine, &parse_tag_list(&tags)).await?;
                engine.detach(&ids, id).await?;
                print_json(&serde_json::json!({ "id": id, "tags": engine.tags_for(id).await? }))?;
            }
            TagCommands::Delete { tags } => {
                let ids = resolve_tag_ids(engine, &parse_tag_list(&tags)).await?;
                engine.delete_tags(&ids).await?;
                print_json(&serde_json::json!({ "success": true, "deleted": ids.len() }))?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_carries_code_and_kind() {
        let body = error_body(&AppError::NotFound("Media id 7 does not exist".to_string()));
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["type"], "NotFound");
        assert_eq!(body["error"]["recoverable"], false);
        assert_eq!(
            body["error"]["message"],
            "Not found: Media id 7 does not exist"
        );
    }

    #[test]
    fn cli_parses_tag_subcommands() {
        let cli = Cli::try_parse_from(["boardy", "--root", "/tmp/b", "tag", "attach", "3", "cat,bw"])
            .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/b")));
        assert!(matches!(
            cli.command,
            Commands::Tag { sub: TagCommands::Attach { id: 3, ref tags } } if tags == "cat,bw"
        ));
    }
}
