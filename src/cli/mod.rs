pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use client::ApiClient;

#[derive(Parser)]
#[command(name = "pm")]
#[command(about = "PM CLI - operator tooling and HTTP client for the project-management API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "PM_API_URL", default_value = "http://localhost:3000", help = "Base URL of a running server")]
    pub url: String,

    #[arg(long, global = true, env = "PM_TOKEN", hide_env_values = true, help = "Bearer token for protected endpoints")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Database migration and superuser bootstrap")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    #[command(about = "Token minting and identity checks")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Run mutations and read records")]
    Data {
        #[command(subcommand)]
        cmd: commands::data::DataCommands,
    },

    #[command(about = "Remote server status")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Admin { cmd } => commands::admin::handle(cmd, output_format).await,
        Commands::Auth { cmd } => {
            let client = ApiClient::new(&cli.url, cli.token)?;
            commands::auth::handle(cmd, &client, output_format).await
        }
        Commands::Data { cmd } => {
            let client = ApiClient::new(&cli.url, cli.token)?;
            commands::data::handle(cmd, &client, output_format).await
        }
        Commands::Server { cmd } => {
            let client = ApiClient::new(&cli.url, cli.token)?;
            commands::server::handle(cmd, &client, output_format).await
        }
    }
}
