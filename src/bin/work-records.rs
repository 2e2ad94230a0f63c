//! `work-records` command line.
//!
//! ```text
//! work-records --config service.toml serve
//! work-records --config service.toml ingest works.xlsx
//! work-records --config service.toml query --contractor Acme --sort-by period
//! work-records --config service.toml export --out records_export.json --date-from 2024-01-01
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use work_records::config::ServiceConfig;
use work_records::error::{ConfigError, IngestionError, QueryError, ServeError, StoreError};
use work_records::ingestion::IngestionFormat;
use work_records::query::{ExportRow, QueryParams};
use work_records::service::{DynStore, RecordService, open_store};

#[derive(Parser, Debug)]
#[command(name = "work-records", version, about = "Ingest and query work-item records")]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve,
    /// Ingest a document and print the summary as JSON.
    Ingest {
        /// Document to ingest.
        file: PathBuf,
        /// Force a format instead of inferring it from the extension.
        #[arg(long, value_name = "FORMAT")]
        format: Option<String>,
    },
    /// Print matching records as JSON.
    Query(QueryArgs),
    /// Write the export document for matching records.
    Export {
        /// Output file.
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args, Debug, Default)]
struct QueryArgs {
    #[arg(long)]
    record_id: Option<i64>,
    #[arg(long)]
    object_id: Option<String>,
    #[arg(long)]
    work_type: Option<String>,
    #[arg(long)]
    contractor: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    date_from: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    date_to: Option<NaiveDate>,
    #[arg(long)]
    quantity_min: Option<f64>,
    #[arg(long)]
    quantity_max: Option<f64>,
    #[arg(long)]
    unit_price_min: Option<f64>,
    #[arg(long)]
    unit_price_max: Option<f64>,
    #[arg(long)]
    total_cost_min: Option<f64>,
    #[arg(long)]
    total_cost_max: Option<f64>,
    #[arg(long)]
    sort_by: Option<String>,
    #[arg(long)]
    sort_order: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<i64>,
    #[arg(long)]
    offset: Option<u64>,
}

impl From<QueryArgs> for QueryParams {
    fn from(a: QueryArgs) -> Self {
        Self {
            record_id: a.record_id,
            object_id: a.object_id,
            work_type: a.work_type,
            contractor: a.contractor,
            date_from: a.date_from,
            date_to: a.date_to,
            quantity_min: a.quantity_min,
            quantity_max: a.quantity_max,
            unit_price_min: a.unit_price_min,
            unit_price_max: a.unit_price_max,
            total_cost_min: a.total_cost_min,
            total_cost_max: a.total_cost_max,
            sort_by: a.sort_by,
            sort_order: a.sort_order,
            limit: a.limit,
            offset: a.offset,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Serve(#[from] ServeError),
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
    #[error("json output error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown format '{0}'")]
    UnknownFormat(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match cli.config.as_deref() {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };

    match cli.command {
        Commands::Serve => Ok(work_records::http::serve(config).await?),
        Commands::Ingest { file, format } => {
            let format = match format {
                Some(name) => Some(
                    IngestionFormat::from_extension(&name).ok_or(CliError::UnknownFormat(name))?,
                ),
                None => None,
            };
            let summary = open_service(&config)?.ingest_path(&file, format)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Query(args) => {
            let query = QueryParams::from(args).into_query()?;
            let rows: Vec<ExportRow> = open_service(&config)?
                .list(&query)?
                .iter()
                .map(ExportRow::from)
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
        Commands::Export { out, query } => {
            let query = QueryParams::from(query).into_query()?;
            let doc = open_service(&config)?.export(&query)?;
            fs::write(&out, &doc.bytes)?;
            eprintln!("[export] wrote {} rows to {}", doc.rows, out.display());
            Ok(())
        }
    }
}

fn open_service(config: &ServiceConfig) -> Result<RecordService<DynStore>, CliError> {
    Ok(RecordService::new(open_store(&config.store)?, config.ingestion.to_options()))
}
