use clap::Subcommand;
use sheets_edge_client::config::{Config, ENV_CLIENT_EMAIL, ENV_PRIVATE_KEY, ENV_SPREADSHEET_ID};
use sheets_edge_client::error::Result;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show the configuration file path
    Paths,
}

impl ShowResource {
    pub async fn execute(&self) -> Result<()> {
        match self {
            ShowResource::Paths => show_paths(),
        }
    }
}

fn show_paths() -> Result<()> {
    let config_path = Config::config_file()?;

    info!(path = ?config_path, exists = config_path.exists(), "Config path");
    info!(
        client_email = ENV_CLIENT_EMAIL,
        private_key = ENV_PRIVATE_KEY,
        spreadsheet_id = ENV_SPREADSHEET_ID,
        "Environment overrides"
    );

    Ok(())
}
