use crate::error::Result;
use crate::readers::TableRow;
use std::io::Write;

/// Writes star-schema tables and the history snapshot as CSV.
///
/// The header is always written, so an empty table still documents its
/// schema for downstream readers.
pub struct TableWriter;

impl TableWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_rows<T: TableRow, W: Write>(&self, rows: &[T], sink: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);

        writer.write_record(T::columns())?;
        for row in rows {
            writer.write_record(row.to_record())?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes<T: TableRow>(&self, rows: &[T]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_rows(rows, &mut buffer)?;
        Ok(buffer)
    }
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}
