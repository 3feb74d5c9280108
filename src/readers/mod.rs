pub mod extract_reader;
pub mod row_codec;
pub mod table_reader;

pub use extract_reader::RawExtractReader;
pub use row_codec::{ColumnIndex, TableRow};
pub use table_reader::TableReader;
