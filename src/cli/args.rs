use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "airq-etl")]
#[command(about = "Incremental star-schema ETL for air-quality station extracts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Settings file [default: airq-etl.toml in the working directory, if present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Store directory holding the star-schema tables")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the current extract into the star schema
    Run {
        #[arg(short, long, help = "Raw extract file [default: <data-dir>/dados_iqarj.csv]")]
        extract: Option<PathBuf>,

        #[arg(long, help = "Fact id policy (stable or renumber)")]
        fact_ids: Option<String>,

        #[arg(long, help = "Print the run report as JSON")]
        json: bool,
    },

    /// Audit the stored tables for key and referential integrity
    Check {
        #[arg(long, help = "Print the report as JSON")]
        json: bool,

        #[arg(long, default_value = "10", help = "Violations listed in the text report")]
        max_reported: usize,
    },

    /// Export the stored tables as Parquet
    Export {
        #[arg(
            short,
            long,
            help = "Output directory [default: output/airq-star-{YYMMDD}]"
        )]
        output_dir: Option<PathBuf>,

        #[arg(short, long, default_value = "snappy")]
        compression: String,

        #[arg(long, default_value = "10000")]
        row_group_size: usize,
    },

    /// Display row counts and key ranges of the stored tables
    Info,
}
