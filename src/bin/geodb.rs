mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{cmd_inspect, cmd_query};

#[derive(Parser)]
#[command(name = "geodb")]
#[command(
    about = "Query MaxMind DB and IP2Location BIN geolocation databases",
    long_about = "geodb - read-only geolocation lookups against local database files\n\n\
    Supports MaxMind DB (.mmdb) and IP2Location BIN (.bin) files. The format is\n\
    detected automatically; results use one canonical record shape.\n\n\
    Examples:\n\
      geodb query GeoLite2-City.mmdb 8.8.8.8\n\
      geodb query IP2LOCATION-LITE-DB11.BIN 8.8.8.8 2001:4860::8888 --json\n\
      geodb query GeoLite2-City.mmdb 1.1.1.1 --fields country_code,city,latitude\n\
      geodb inspect GeoLite2-City.mmdb"
)]
#[command(version)]
struct Cli {
    /// Log library activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one or more IP addresses
    Query {
        /// Path to the database file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Addresses to look up
        #[arg(value_name = "IP", required = true)]
        addresses: Vec<String>,

        /// Comma-separated fields to print (default: all)
        #[arg(long)]
        fields: Option<String>,

        /// Print records as JSON instead of key: value lines
        #[arg(long)]
        json: bool,

        /// Preferred language for MaxMind names
        #[arg(long, default_value = "en")]
        language: String,
    },

    /// Show database metadata
    Inspect {
        /// Path to the database file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "geodb=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Query {
            database,
            addresses,
            fields,
            json,
            language,
        } => cmd_query(database, addresses, fields, json, language),
        Commands::Inspect { database, json } => cmd_inspect(database, json),
    }
}
