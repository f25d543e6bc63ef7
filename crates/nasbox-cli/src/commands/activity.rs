//! Activity log command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_entity::activity::{ActivityLogEntry, ActivityType};
use nasbox_service::RequestContext;
use nasbox_service::activity::ActivityListRequest;

use crate::app::App;
use crate::output::{self, OutputFormat};

/// Arguments for `activity`
#[derive(Debug, Args)]
pub struct ActivityArgs {
    /// Only this activity type (e.g. FILE_UPLOAD)
    #[arg(short = 't', long = "type")]
    pub activity_type: Option<ActivityType>,
    /// Maximum entries
    #[arg(short, long)]
    pub limit: Option<u32>,
    /// Another user's entries (admin)
    #[arg(long, conflicts_with = "all_users")]
    pub owner: Option<Uuid>,
    /// Every user's entries (admin)
    #[arg(long)]
    pub all_users: bool,
}

/// Activity display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ActivityRow {
    /// When
    at: String,
    /// User
    user_id: String,
    /// Type
    activity_type: String,
    /// Description
    description: String,
}

impl From<&ActivityLogEntry> for ActivityRow {
    fn from(e: &ActivityLogEntry) -> Self {
        Self {
            at: e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            user_id: e.user_id.to_string(),
            activity_type: e.activity_type.to_string(),
            description: e.description.clone(),
        }
    }
}

/// Execute the activity command
pub async fn execute(
    args: &ActivityArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let entries = app
        .activity
        .list(
            ctx,
            ActivityListRequest {
                activity_type: args.activity_type,
                limit: args.limit,
                user_id: args.owner,
                all_users: args.all_users,
            },
        )
        .await?;

    match format {
        OutputFormat::Json => output::print_item(&entries, format),
        OutputFormat::Table => {
            let rows: Vec<ActivityRow> = entries.iter().map(ActivityRow::from).collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
