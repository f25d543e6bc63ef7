//! User management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use nasbox_core::error::AppError;
use nasbox_entity::user::{User, UserRole};
use nasbox_service::RequestContext;
use nasbox_service::user::CreateUserRequest;

use crate::app::App;
use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user and provision their storage root
    Create {
        /// Username
        #[arg(short, long)]
        username: Option<String>,
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Role
        #[arg(short, long, default_value = "USER")]
        role: UserRole,
    },
    /// List all users
    List,
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Username
    username: String,
    /// Email
    email: String,
    /// Role
    role: String,
    /// Created at
    created_at: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role.to_string(),
            created_at: u.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn prompt_input(prompt: &str) -> Result<String, AppError> {
    dialoguer::Input::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    app: &App,
    ctx: &RequestContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        UserCommand::Create {
            username,
            email,
            password,
            role,
        } => {
            let username = match username {
                Some(u) => u.clone(),
                None => prompt_input("Username")?,
            };
            let email = match email {
                Some(e) => e.clone(),
                None => prompt_input("Email")?,
            };
            let password = match password {
                Some(p) => p.clone(),
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
            };

            let user = app
                .users
                .create(
                    ctx,
                    CreateUserRequest {
                        email,
                        username,
                        password,
                        role: *role,
                    },
                )
                .await?;

            match format {
                OutputFormat::Json => output::print_item(&UserRow::from(&user), format),
                OutputFormat::Table => {
                    output::print_success(&format!("User '{}' created", user.username));
                    output::print_kv("ID", &user.id.to_string());
                    output::print_kv("Role", user.role.as_str());
                }
            }
        }
        UserCommand::List => {
            let users = app.users.list(ctx).await?;
            let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
