//! Share link commands.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use tabled::Tabled;
use tokio::io::AsyncWriteExt;

use nasbox_core::error::AppError;
use nasbox_entity::metadata::ItemKind;
use nasbox_service::RequestContext;
use nasbox_service::share::{CreateShareRequest, ShareSummary, SharedContent};

use crate::app::App;
use crate::output::{self, OutputFormat};

/// Arguments for share commands
#[derive(Debug, Args)]
pub struct ShareArgs {
    /// Share subcommand
    #[command(subcommand)]
    pub command: ShareCommand,
}

/// Share subcommands
#[derive(Debug, Subcommand)]
pub enum ShareCommand {
    /// Share a file or folder
    Create {
        /// Item to share
        path: String,
        /// Item type
        #[arg(short, long, default_value = "file")]
        kind: ItemKind,
        /// List the share publicly
        #[arg(long)]
        public: bool,
        /// Require this password
        #[arg(short, long)]
        password: Option<String>,
        /// Expire after this many hours
        #[arg(short, long)]
        expires_in_hours: Option<i64>,
    },
    /// List your shares
    List,
    /// Resolve a token as an anonymous visitor would
    Resolve {
        /// Share token
        token: String,
        /// Share password
        #[arg(short, long)]
        password: Option<String>,
        /// Save a shared file here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Revoke one of your shares
    Revoke {
        /// Share token
        token: String,
    },
}

/// Share display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ShareRow {
    /// Token
    token: String,
    /// Target path
    target: String,
    /// State
    state: String,
    /// Password protected
    protected: bool,
    /// Access count
    accesses: i64,
    /// Expires at
    expires_at: String,
}

impl From<&ShareSummary> for ShareRow {
    fn from(s: &ShareSummary) -> Self {
        Self {
            token: s.share.token.clone(),
            target: s
                .target
                .as_ref()
                .map(|t| t.path().to_string())
                .unwrap_or_else(|| "(missing)".to_string()),
            state: format!("{:?}", s.state),
            protected: s.share.is_password_protected(),
            accesses: s.share.access_count,
            expires_at: output::timestamp(s.share.expires_at),
        }
    }
}

/// Execute share commands
pub async fn execute(
    args: &ShareArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ShareCommand::Create {
            path,
            kind,
            public,
            password,
            expires_in_hours,
        } => {
            let expires_at = expires_in_hours.map(|h| Utc::now() + Duration::hours(h));
            let share = app
                .shares
                .create(
                    ctx,
                    CreateShareRequest {
                        path: path.clone(),
                        kind: *kind,
                        is_public: *public,
                        password: password.clone(),
                        expires_at,
                    },
                )
                .await?;

            match format {
                OutputFormat::Json => output::print_item(&share, format),
                OutputFormat::Table => {
                    output::print_success(&format!("Shared {kind} '{path}'"));
                    output::print_kv("Token", &share.token);
                    output::print_kv("Expires", &output::timestamp(share.expires_at));
                }
            }
        }
        ShareCommand::List => {
            let shares = app.shares.list(ctx).await?;
            match format {
                OutputFormat::Json => output::print_item(&shares, format),
                OutputFormat::Table => {
                    let rows: Vec<ShareRow> = shares.iter().map(ShareRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        ShareCommand::Resolve {
            token,
            password,
            out,
        } => {
            let resolved = app.shares.resolve(token, password.as_deref()).await?;
            output::print_kv("Accesses", &resolved.share.access_count.to_string());

            match resolved.content {
                SharedContent::File { record, content } => {
                    output::print_kv("File", &record.filename);
                    output::print_kv("Size", &output::human_bytes(content.size));
                    if let Some(out) = out {
                        let mut file = tokio::fs::File::create(out).await.map_err(|e| {
                            AppError::from_io(format!("Failed to create {}", out.display()), e)
                        })?;
                        let mut stream = content.stream;
                        while let Some(chunk) = stream.next().await {
                            let chunk =
                                chunk.map_err(|e| AppError::from_io("Failed to read file", e))?;
                            file.write_all(&chunk)
                                .await
                                .map_err(|e| AppError::from_io("Failed to write output", e))?;
                        }
                        output::print_success(&format!("Saved to {}", out.display()));
                    }
                }
                SharedContent::Folder { record, entries } => {
                    output::print_kv("Folder", &record.name);
                    for entry in &entries {
                        println!("  {:<8} {}", entry.kind.to_string(), entry.name);
                    }
                }
            }
        }
        ShareCommand::Revoke { token } => {
            app.shares.revoke(ctx, token).await?;
            output::print_success("Share revoked");
        }
    }

    Ok(())
}
