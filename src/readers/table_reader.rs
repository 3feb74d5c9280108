use crate::error::Result;
use crate::models::{FactRecord, LocationDimension, StarSchema, StationDimension, TimeDimension};
use crate::readers::row_codec::{ColumnIndex, TableRow};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Reads persisted star-schema tables.
///
/// An absent file is the documented empty table; a present file with a
/// missing column is a schema error.
pub struct TableReader;

impl TableReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse every row of a table from any CSV source
    pub fn read_rows<T: TableRow, R: Read>(&self, source: R) -> Result<Vec<T>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let index = T::prepare_index(ColumnIndex::new(T::TABLE, reader.headers()?));
        index.require(T::required_columns())?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            rows.push(T::from_record(&index, &record)?);
        }

        Ok(rows)
    }

    /// Read a table file, or `None` if it does not exist
    pub fn read_optional<T: TableRow>(&self, path: &Path) -> Result<Option<Vec<T>>> {
        if !path.exists() {
            debug!(table = T::TABLE, path = %path.display(), "table file absent");
            return Ok(None);
        }

        let file = std::fs::File::open(path)?;
        let rows = self.read_rows(file)?;
        debug!(table = T::TABLE, rows = rows.len(), "loaded table");
        Ok(Some(rows))
    }

    /// Read a table file, starting empty if it does not exist
    pub fn read_or_empty<T: TableRow>(&self, path: &Path) -> Result<Vec<T>> {
        Ok(self.read_optional(path)?.unwrap_or_default())
    }

    pub fn read_star_schema(
        &self,
        time: &Path,
        location: &Path,
        station: &Path,
        fact: &Path,
    ) -> Result<StarSchema> {
        Ok(StarSchema {
            time: self.read_or_empty::<TimeDimension>(time)?,
            location: self.read_or_empty::<LocationDimension>(location)?,
            station: self.read_or_empty::<StationDimension>(station)?,
            fact: self.read_or_empty::<FactRecord>(fact)?,
        })
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}
