//! Disk usage and reconciliation commands.

use clap::Args;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_service::RequestContext;
use nasbox_service::storage::UsageScope;

use crate::app::App;
use crate::output::{self, OutputFormat};

/// Arguments for `usage`
#[derive(Debug, Args)]
pub struct UsageArgs {
    /// Report the whole storage root (admin)
    #[arg(long, conflicts_with = "owner")]
    pub all: bool,
    /// Report another user's root (admin)
    #[arg(long)]
    pub owner: Option<Uuid>,
}

/// Arguments for `reconcile`
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Sweep another user's root (admin)
    #[arg(long)]
    pub owner: Option<Uuid>,
}

/// `usage`
pub async fn usage(
    args: &UsageArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let scope = match (args.all, args.owner) {
        (true, _) => UsageScope::All,
        (false, Some(id)) => UsageScope::User(id),
        (false, None) => UsageScope::Own,
    };
    let usage = app.storage.usage(ctx, scope).await?;

    match format {
        OutputFormat::Json => output::print_item(&usage, format),
        OutputFormat::Table => {
            let unknown = || "unknown".to_string();
            output::print_kv("Used", &output::human_bytes(usage.used_bytes));
            output::print_kv(
                "Total",
                &usage.total_bytes().map(output::human_bytes).unwrap_or_else(unknown),
            );
            output::print_kv(
                "Free",
                &usage.free_bytes().map(output::human_bytes).unwrap_or_else(unknown),
            );
            output::print_kv(
                "Used %",
                &usage
                    .used_percent()
                    .map(|p| format!("{p:.2}%"))
                    .unwrap_or_else(unknown),
            );
        }
    }
    Ok(())
}

/// `reconcile`
pub async fn reconcile(
    args: &ReconcileArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let owner_id = args.owner.unwrap_or(ctx.user_id);
    let report = app.storage.reconcile(ctx, owner_id).await?;

    match format {
        OutputFormat::Json => output::print_item(&report, format),
        OutputFormat::Table => {
            output::print_success(&format!("Reconciled storage of {owner_id}"));
            output::print_kv("Records created", &report.created.to_string());
            output::print_kv("Records updated", &report.updated.to_string());
            output::print_kv("Records removed", &report.removed.to_string());
        }
    }
    Ok(())
}
