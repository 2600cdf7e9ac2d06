use clap::Subcommand;

use crate::cli::client::ApiClient;
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Show server information from API root endpoint")]
    Info,

    #[command(about = "Check server health status from API /health endpoint")]
    Health,
}

pub async fn handle(cmd: ServerCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Info => {
            let response = client.get("/").await?;
            output_value(output_format, &response)
        }
        ServerCommands::Health => {
            let response = client.get("/health").await?;
            output_value(output_format, &response)
        }
    }
}
