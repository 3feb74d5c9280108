use crate::error::{ProcessingError, Result};
use crate::models::RawReading;
use crate::readers::table_reader::TableReader;
use crate::utils::constants::DEFAULT_INPUT_ENCODING;
use encoding_rs::Encoding;
use std::path::Path;
use tracing::{debug, warn};
use validator::Validate;

/// Reads raw station extracts and the history snapshot.
///
/// Upstream extracts are not always UTF-8, so the file is decoded with the
/// configured encoding before CSV parsing. A byte-order mark overrides the
/// configured label.
pub struct RawExtractReader {
    encoding: &'static Encoding,
}

impl RawExtractReader {
    pub fn new() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }

    pub fn with_encoding(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            ProcessingError::Config(format!("Unsupported input encoding: {}", label))
        })?;
        Ok(Self { encoding })
    }

    /// Read the current extract; a missing file is fatal
    pub fn read_extract(&self, path: &Path) -> Result<Vec<RawReading>> {
        if !path.is_file() {
            return Err(ProcessingError::ExtractNotFound(path.to_path_buf()));
        }
        self.read_file(path)
    }

    /// Read the history snapshot, or `None` on the first run
    pub fn read_history(&self, path: &Path) -> Result<Option<Vec<RawReading>>> {
        if !path.exists() {
            debug!(path = %path.display(), "no history snapshot");
            return Ok(None);
        }
        // The snapshot is always written as UTF-8 by this crate.
        TableReader::new().read_optional(path)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<RawReading>> {
        let bytes = std::fs::read(path)?;
        let (text, used, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            warn!(
                path = %path.display(),
                encoding = used.name(),
                "extract contains bytes invalid for the encoding; replaced with U+FFFD"
            );
        }

        let rows: Vec<RawReading> = TableReader::new().read_rows(text.as_bytes())?;
        for (index, row) in rows.iter().enumerate() {
            // Line numbers count the header as line 1
            row.validate().map_err(|e| {
                ProcessingError::InvalidFormat(format!(
                    "{} line {}: {}",
                    path.display(),
                    index + 2,
                    e
                ))
            })?;
        }
        debug!(path = %path.display(), rows = rows.len(), encoding = used.name(), "read extract");
        Ok(rows)
    }
}

impl Default for RawExtractReader {
    fn default() -> Self {
        Self::with_encoding(DEFAULT_INPUT_ENCODING).unwrap_or_else(|_| Self::new())
    }
}
