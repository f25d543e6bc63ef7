//! CLI command definitions and dispatch.

pub mod activity;
pub mod file;
pub mod migrate;
pub mod nas;
pub mod share;
pub mod storage;
pub mod user;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use nasbox_core::config::AppConfig;
use nasbox_core::error::AppError;
use nasbox_entity::user::UserRole;
use nasbox_service::RequestContext;

use crate::app::App;
use crate::output::OutputFormat;

/// NasBox: per-user file storage with shares and NAS exports
#[derive(Debug, Parser)]
#[command(name = "nasbox", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Act as this user id
    #[arg(long, global = true, env = "NASBOX_USER")]
    pub user: Option<Uuid>,

    /// Act with the admin role
    #[arg(long, global = true)]
    pub admin: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// User management
    User(user::UserArgs),
    /// List a folder
    Ls(file::LsArgs),
    /// Create a folder
    Mkdir(file::MkdirArgs),
    /// Upload a local file
    Put(file::PutArgs),
    /// Download a file
    Get(file::GetArgs),
    /// Move an item into another folder
    Mv(file::TransferArgs),
    /// Copy an item into another folder
    Cp(file::TransferArgs),
    /// Rename an item in place
    Rename(file::RenameArgs),
    /// Delete an item
    Rm(file::RmArgs),
    /// Search file and folder names
    Search(file::SearchArgs),
    /// Show disk usage
    Usage(storage::UsageArgs),
    /// Bring metadata back in line with the filesystem
    Reconcile(storage::ReconcileArgs),
    /// Share link management
    Share(share::ShareArgs),
    /// Show the activity log
    Activity(activity::ActivityArgs),
    /// NAS export management
    Nas(nas::NasArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        if let Commands::Migrate(args) = &self.command {
            return migrate::execute(args, &config).await;
        }

        let app = App::connect(&config).await?;
        let format = self.format;

        let result = match &self.command {
            Commands::Migrate(_) => Ok(()),
            Commands::User(args) => user::execute(args, &app, &self.context()?, format).await,
            Commands::Ls(args) => file::ls(args, &app, &self.context()?, format).await,
            Commands::Mkdir(args) => file::mkdir(args, &app, &self.context()?, format).await,
            Commands::Put(args) => file::put(args, &app, &self.context()?, format).await,
            Commands::Get(args) => file::get(args, &app, &self.context()?).await,
            Commands::Mv(args) => file::mv(args, &app, &self.context()?, format).await,
            Commands::Cp(args) => file::cp(args, &app, &self.context()?, format).await,
            Commands::Rename(args) => file::rename(args, &app, &self.context()?, format).await,
            Commands::Rm(args) => file::rm(args, &app, &self.context()?).await,
            Commands::Search(args) => file::search(args, &app, &self.context()?, format).await,
            Commands::Usage(args) => storage::usage(args, &app, &self.context()?, format).await,
            Commands::Reconcile(args) => {
                storage::reconcile(args, &app, &self.context()?, format).await
            }
            Commands::Share(args) => share::execute(args, &app, &self.context()?, format).await,
            Commands::Activity(args) => {
                activity::execute(args, &app, &self.context()?, format).await
            }
            Commands::Nas(args) => nas::execute(args, &app, &self.context()?, format).await,
        };

        app.pool.close().await;
        result
    }

    /// Build the acting identity from `--user` and `--admin`.
    ///
    /// `--admin` without `--user` acts as the system identity.
    fn context(&self) -> Result<RequestContext, AppError> {
        match (self.user, self.admin) {
            (Some(id), true) => Ok(RequestContext::new(id, UserRole::Admin)),
            (Some(id), false) => Ok(RequestContext::new(id, UserRole::User)),
            (None, true) => Ok(RequestContext::system()),
            (None, false) => Err(AppError::validation(
                "No acting user: pass --user <uuid> or set NASBOX_USER",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_context_requires_an_identity() {
        let cli = Cli::parse_from(["nasbox", "ls"]);
        assert!(cli.context().is_err());

        let cli = Cli::parse_from(["nasbox", "--admin", "ls"]);
        assert!(cli.context().unwrap().is_admin());

        let id = Uuid::new_v4();
        let cli = Cli::parse_from(["nasbox", "--user", &id.to_string(), "ls"]);
        let ctx = cli.context().unwrap();
        assert_eq!(ctx.user_id, id);
        assert!(!ctx.is_admin());
    }
}
