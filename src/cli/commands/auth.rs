use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::client::ApiClient;
use crate::cli::utils::{output_success, output_value};
use crate::cli::OutputFormat;
use crate::types::EntityId;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Mint a bearer token with the local JWT secret (development)")]
    Token {
        #[arg(help = "Account id (the token subject)")]
        account_id: EntityId,
        #[arg(help = "Username carried in the token")]
        username: String,
    },

    #[command(about = "Show the principal the server resolves for the current token")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Token { account_id, username } => {
            let token = generate_jwt(&Claims::new(account_id, username))?;
            match output_format {
                OutputFormat::Json => output_success(output_format, "Token issued", Some(json!({ "token": token }))),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
        AuthCommands::Whoami => {
            let response = client.get("/api/auth/whoami").await?;
            output_value(output_format, &response)
        }
    }
}
