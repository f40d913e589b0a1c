//! CLI entry and dispatch.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use gatepass_core::app::App;
use gatepass_core::config;

mod commands;

#[derive(Parser)]
#[command(name = "gatepass")]
#[command(version)]
#[command(about = "Visitor access codes for estate residents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in to the estate portal
    Login {
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long, env = "GATEPASS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Create a resident account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, env = "GATEPASS_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        password_confirmation: Option<String>,
    },

    /// Confirm an email address with the code sent after registering
    VerifyEmail {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },

    /// Request a password reset link
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Show the signed-in resident
    Whoami {
        /// Reload the profile from the server first
        #[arg(long)]
        refresh: bool,
    },

    /// Show quick stats and recent activity
    Dashboard,

    /// Manage visitor access codes
    Codes {
        #[command(subcommand)]
        command: CodesCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum CodesCommands {
    /// Generate a code for a visitor
    Create {
        /// Visitor's full name
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        purpose: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Number of visitors (makes this a group code, minimum 2)
        #[arg(long, value_name = "COUNT")]
        visitors: Option<String>,
        /// Start of the visit window (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// End of the visit window (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your codes
    List {
        /// Only show codes with this status (active, expired, revoked)
        #[arg(long)]
        status: Option<String>,
        /// Print the codes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Revoke an active code
    Revoke {
        #[arg(value_name = "CODE")]
        code: String,
    },
    /// Print a shareable message for an active code
    Share {
        #[arg(value_name = "CODE")]
        code: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Save the API base URL to the config file
    SetBaseUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn load_app() -> Result<App> {
    let config = config::Config::load().context("load config")?;
    App::bootstrap(config).context("start gatepass")
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&load_app()?, email, password).await
        }
        Commands::Logout => commands::auth::logout(&load_app()?).await,
        Commands::Register {
            first_name,
            last_name,
            email,
            phone,
            password,
            password_confirmation,
        } => {
            let args = commands::auth::RegisterArgs {
                first_name,
                last_name,
                email,
                phone,
                password_confirmation: password_confirmation.unwrap_or_else(|| password.clone()),
                password,
            };
            commands::auth::register(&load_app()?, args).await
        }
        Commands::VerifyEmail { email, code } => {
            commands::auth::verify_email(&load_app()?, email, code).await
        }
        Commands::ForgotPassword { email } => {
            commands::auth::forgot_password(&load_app()?, email).await
        }
        Commands::Whoami { refresh } => commands::auth::whoami(&load_app()?, refresh).await,
        Commands::Dashboard => commands::dashboard::show(&load_app()?).await,

        Commands::Codes { command } => match command {
            CodesCommands::Create {
                name,
                purpose,
                notes,
                visitors,
                start,
                end,
                json,
            } => {
                let args = commands::codes::CreateArgs {
                    name,
                    purpose,
                    notes,
                    visitors,
                    start,
                    end,
                };
                commands::codes::create(&load_app()?, args, json).await
            }
            CodesCommands::List { status, json } => {
                commands::codes::list(&load_app()?, status.as_deref(), json).await
            }
            CodesCommands::Revoke { code } => commands::codes::revoke(&load_app()?, &code).await,
            CodesCommands::Share { code } => commands::codes::share(&load_app()?, &code).await,
        },

        // Config commands work without a loadable config.
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
            ConfigCommands::SetBaseUrl { url } => commands::config::set_base_url(&url),
        },
    }
}
