use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "drop-catcher")]
#[command(about = "Watches a drop directory, names incoming files and files them away", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch the input directory until interrupted (the default)
    Watch,
    /// Run the pipeline once on a single file
    Process {
        /// File to analyze and move
        file: PathBuf,
    },
    /// List the most recent move records
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// Show every field of one move record
    Show {
        /// Record id as printed by `history`
        id: String,
    },
    /// Count move records per status
    Stats,
    /// Print configuration values
    PrintConfig,
}
