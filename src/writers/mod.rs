pub mod csv_writer;
pub mod parquet_writer;
pub mod staged_commit;

pub use csv_writer::TableWriter;
pub use parquet_writer::{ExportedTable, ParquetFileInfo, ParquetWriter};
pub use staged_commit::{PreparedCommit, RecoveryOutcome, StagedCommit};
