use clap::Subcommand;

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_value, read_json_input};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "Run a named mutation (createProject, updateTask, ...) with JSON arguments")]
    Mutate {
        #[arg(help = "Mutation name")]
        name: String,
        #[arg(long, help = "JSON argument object (read from stdin when omitted)")]
        data: Option<String>,
    },

    #[command(about = "Read all records of a table, or one record by id")]
    Get {
        #[arg(help = "Table name (projects, tasks, ...)")]
        table: String,
        #[arg(help = "Record id, numeric or opaque")]
        id: Option<String>,
        #[arg(long = "where", value_name = "FIELD=VALUE", help = "Equality filter on a field (repeatable)")]
        filters: Vec<String>,
    },
}

pub async fn handle(cmd: DataCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DataCommands::Mutate { name, data } => {
            let arguments = read_json_input(data)?;
            let response = client.post(&format!("/api/mutations/{}", name), &arguments).await?;
            output_value(output_format, &response)
        }
        DataCommands::Get { table, id, filters } => {
            let path = match id {
                Some(id) => format!("/api/data/{}/{}", table, id),
                None => format!("/api/data/{}", table),
            };
            let filters = filters
                .iter()
                .map(|filter| {
                    filter
                        .split_once('=')
                        .ok_or_else(|| anyhow::anyhow!("filter {:?} is not FIELD=VALUE", filter))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let response = client.get_with_query(&path, &filters).await?;
            output_value(output_format, &response)
        }
    }
}
