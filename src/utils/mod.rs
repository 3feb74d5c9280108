pub mod constants;
pub mod exact;
pub mod filename;
pub mod logging;
pub mod progress;
pub mod timestamps;

pub use constants::*;
pub use filename::{generate_default_export_dir, parquet_file_name};
pub use progress::ProgressReporter;
pub use timestamps::{format_rfc3339, parse_timestamp};
