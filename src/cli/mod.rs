mod auth;
mod health;
mod show;
mod values;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sheets_edge_client::config::Config;
use sheets_edge_client::error::Result;
use sheets_edge_client::sheets::{
    DateTimeRenderOption, MajorDimension, ReadOptions, SheetsClient, ValueInputOption,
    ValueRenderOption, WriteOptions,
};
use sheets_edge_client::upstream::create_upstream_safe_app_error;

pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "sheets-edge-client")]
#[command(about = "Read and write a Google Sheets spreadsheet as a service account", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Print a generic upstream error envelope instead of the raw error
    #[arg(long, global = true)]
    pub safe_errors: bool,

    /// Correlation id attached to the upstream error envelope
    #[arg(long, global = true)]
    pub correlation_id: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let result = self.dispatch().await;

        if let (true, Err(e)) = (self.safe_errors, &result) {
            let correlation_id = self
                .correlation_id
                .clone()
                .unwrap_or_else(|| format!("cli-{}", Utc::now().timestamp_millis()));
            let envelope = create_upstream_safe_app_error(e, &correlation_id);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }

        result
    }

    async fn dispatch(&self) -> Result<()> {
        match &self.command {
            Commands::Auth { reset } => auth::execute(*reset).await,
            Commands::Health => health::execute(&sheets_client()?).await,
            Commands::Get { sheet, range, read } => {
                values::get(&sheets_client()?, sheet, range, &read.into()).await
            }
            Commands::BatchGet { ranges, read } => {
                values::batch_get(&sheets_client()?, ranges, &read.into()).await
            }
            Commands::Append { sheet, cells, input } => {
                values::append(&sheets_client()?, sheet, cells, &write_options(*input)).await
            }
            Commands::Update {
                sheet,
                row,
                cells,
                input,
            } => values::update(&sheets_client()?, sheet, *row, cells, &write_options(*input)).await,
            Commands::Show { resource } => resource.execute().await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mint (or reuse) an access token for the configured service account
    Auth {
        /// Drop the cached token first
        #[arg(long)]
        reset: bool,
    },
    /// Check that the spreadsheet is reachable
    Health,
    /// Read one range of a sheet
    Get {
        sheet: String,
        /// A1 range within the sheet, e.g. A1:G
        range: String,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Read several A1 ranges in one request
    BatchGet {
        #[arg(required = true)]
        ranges: Vec<String>,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Append one row after the last row of a sheet
    Append {
        sheet: String,
        /// Cell values; valid JSON is parsed, anything else is taken as text
        #[arg(required = true)]
        cells: Vec<String>,
        #[arg(long, value_enum, default_value_t = ValueInputOption::UserEntered)]
        input: ValueInputOption,
    },
    /// Overwrite one row, starting at column A
    Update {
        sheet: String,
        /// 1-based row number
        row: u32,
        #[arg(required = true)]
        cells: Vec<String>,
        #[arg(long, value_enum, default_value_t = ValueInputOption::UserEntered)]
        input: ValueInputOption,
    },
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}

#[derive(Args, Debug, Default)]
pub struct ReadArgs {
    #[arg(long, value_enum)]
    pub render: Option<ValueRenderOption>,
    #[arg(long, value_enum)]
    pub date_time: Option<DateTimeRenderOption>,
    #[arg(long, value_enum)]
    pub dimension: Option<MajorDimension>,
}

impl From<&ReadArgs> for ReadOptions {
    fn from(args: &ReadArgs) -> Self {
        ReadOptions {
            value_render_option: args.render,
            date_time_render_option: args.date_time,
            major_dimension: args.dimension,
        }
    }
}

fn write_options(input: ValueInputOption) -> WriteOptions {
    WriteOptions {
        value_input_option: input,
    }
}

fn sheets_client() -> Result<SheetsClient> {
    let config = Config::load()?;
    SheetsClient::new(&config)
}
