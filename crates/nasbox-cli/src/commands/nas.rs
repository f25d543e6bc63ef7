//! NAS export management commands (admin).

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_entity::nas::{NasPermission, NasProtocol, NasShare, UpdateNasShare};
use nasbox_service::RequestContext;
use nasbox_service::nas::CreateNasShareRequest;

use crate::app::App;
use crate::output::{self, OutputFormat};

/// Arguments for NAS commands
#[derive(Debug, Args)]
pub struct NasArgs {
    /// NAS subcommand
    #[command(subcommand)]
    pub command: NasCommand,
}

/// NAS subcommands
#[derive(Debug, Subcommand)]
pub enum NasCommand {
    /// List exports
    List,
    /// Export a directory inside the storage root
    Create {
        /// Export name
        name: String,
        /// Directory (absolute, or relative to the storage root)
        path: String,
        /// NFS or SMB
        #[arg(long)]
        protocol: Option<NasProtocol>,
        /// READ_ONLY or READ_WRITE
        #[arg(long)]
        permission: Option<NasPermission>,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
        /// Comma-separated client allow-list
        #[arg(long)]
        allowed_ips: Option<String>,
        /// Create the export disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Change an export
    Update {
        /// Export id
        id: Uuid,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New directory
        #[arg(long)]
        path: Option<String>,
        /// New protocol
        #[arg(long)]
        protocol: Option<NasProtocol>,
        /// New permission
        #[arg(long)]
        permission: Option<NasPermission>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// New allow-list
        #[arg(long)]
        allowed_ips: Option<String>,
        /// Enable or disable
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Remove an export
    Delete {
        /// Export id
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Export display row for table output
#[derive(Debug, Serialize, Tabled)]
struct NasRow {
    /// Export ID
    id: String,
    /// Name
    name: String,
    /// Path
    path: String,
    /// Protocol
    protocol: String,
    /// Permission
    permission: String,
    /// Enabled
    enabled: bool,
}

impl From<&NasShare> for NasRow {
    fn from(s: &NasShare) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            path: s.path.clone(),
            protocol: format!("{:?}", s.protocol).to_uppercase(),
            permission: format!("{:?}", s.permission),
            enabled: s.enabled,
        }
    }
}

fn print_share(share: &NasShare, verb: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_item(share, format),
        OutputFormat::Table => {
            output::print_success(&format!("{verb} NAS share '{}'", share.name));
            output::print_kv("ID", &share.id.to_string());
            output::print_kv("Path", &share.path);
        }
    }
}

/// Execute NAS commands
pub async fn execute(
    args: &NasArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        NasCommand::List => {
            let shares = app.nas.list(ctx).await?;
            let rows: Vec<NasRow> = shares.iter().map(NasRow::from).collect();
            output::print_list(&rows, format);
        }
        NasCommand::Create {
            name,
            path,
            protocol,
            permission,
            description,
            allowed_ips,
            disabled,
        } => {
            let share = app
                .nas
                .create(
                    ctx,
                    CreateNasShareRequest {
                        name: name.clone(),
                        path: path.clone(),
                        protocol: *protocol,
                        permission: *permission,
                        description: description.clone(),
                        allowed_ips: allowed_ips.clone(),
                        enabled: Some(!disabled),
                    },
                )
                .await?;
            print_share(&share, "Created", format);
        }
        NasCommand::Update {
            id,
            name,
            path,
            protocol,
            permission,
            description,
            allowed_ips,
            enabled,
        } => {
            let share = app
                .nas
                .update(
                    ctx,
                    *id,
                    UpdateNasShare {
                        name: name.clone(),
                        path: path.clone(),
                        protocol: *protocol,
                        permission: *permission,
                        description: description.clone(),
                        allowed_ips: allowed_ips.clone(),
                        enabled: *enabled,
                    },
                )
                .await?;
            print_share(&share, "Updated", format);
        }
        NasCommand::Delete { id, force } => {
            if !force {
                let share = app.nas.get(ctx, *id).await?;
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Remove NAS share '{}'?", share.name))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
                if !confirm {
                    output::print_warning("Aborted.");
                    return Ok(());
                }
            }
            app.nas.delete(ctx, *id).await?;
            output::print_success("NAS share removed");
        }
    }

    Ok(())
}
