use chrono::{Datelike, Local};
use std::path::PathBuf;

/// Default Parquet export directory: output/airq-star-{YYMMDD}
pub fn generate_default_export_dir() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100;

    let dirname = format!("airq-star-{:02}{:02}{:02}", year, now.month(), now.day());
    PathBuf::from("output").join(dirname)
}

/// Name of the Parquet file exported for a table
pub fn parquet_file_name(table: &str) -> String {
    format!("{}.parquet", table)
}
