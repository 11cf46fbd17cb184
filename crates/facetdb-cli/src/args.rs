use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// facetdb - maintenance tool for FacetDB item stores
#[derive(Parser, Debug)]
#[command(name = "facetdb")]
#[command(version)]
#[command(about = "Export, import, truncate and inspect a FacetDB item store", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Override storage.data_path
    #[arg(long = "data-path", global = true)]
    pub data_path: Option<String>,

    /// Override logging.level (error, warn, info, debug, trace)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Write every item as a JSON array
    Export {
        /// Output file; stdout when omitted
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long = "pretty")]
        pretty: bool,
    },

    /// Upsert every item of a JSON array
    Import {
        /// Input file, or "-" for stdin
        input: PathBuf,
    },

    /// Delete every item
    Truncate {
        /// Required: confirms the table should be emptied
        #[arg(long = "yes")]
        yes: bool,
    },

    /// Print item and partition counts
    Stats,
}
