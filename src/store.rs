use crate::config::EtlSettings;
use crate::error::{ProcessingError, Result};
use crate::models::{
    FactRecord, LocationDimension, RawReading, StarSchema, StationDimension, TimeDimension,
};
use crate::readers::{RawExtractReader, TableReader, TableRow};
use crate::utils::constants::LOCK_FILE;
use crate::writers::{RecoveryOutcome, StagedCommit, TableWriter};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File locations of one star-schema store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub dir: PathBuf,
    pub time_table: String,
    pub location_table: String,
    pub station_table: String,
    pub fact_table: String,
    pub history_file: String,
}

impl StoreLayout {
    pub fn from_settings(settings: &EtlSettings) -> Self {
        Self {
            dir: settings.data_dir.clone(),
            time_table: settings.time_table.clone(),
            location_table: settings.location_table.clone(),
            station_table: settings.station_table.clone(),
            fact_table: settings.fact_table.clone(),
            history_file: settings.history_file.clone(),
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn time_path(&self) -> PathBuf {
        self.path(&self.time_table)
    }

    pub fn location_path(&self) -> PathBuf {
        self.path(&self.location_table)
    }

    pub fn station_path(&self) -> PathBuf {
        self.path(&self.station_table)
    }

    pub fn fact_path(&self) -> PathBuf {
        self.path(&self.fact_table)
    }

    pub fn history_path(&self) -> PathBuf {
        self.path(&self.history_file)
    }
}

/// Exclusive claim on a store directory.
///
/// Backed by an advisory `flock`, so the kernel releases it when the holding
/// process exits for any reason. The lock file itself stays in place.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    file: File,
}

impl StoreLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: the descriptor is owned by `file` and open for the call
            let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if result != 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::WouldBlock {
                    return Err(ProcessingError::StoreLocked(path));
                }
                return Err(err.into());
            }
        }

        // Holder details for operators; never read back
        file.set_len(0)?;
        let mut writer = &file;
        writeln!(writer, "pid={}", std::process::id())?;
        writeln!(writer, "acquired_at={}", chrono::Utc::now().to_rfc3339())?;
        debug!(path = %path.display(), "store lock acquired");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: the descriptor is still owned by `self.file`
            if unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) } != 0 {
                warn!(
                    path = %self.path.display(),
                    error = %std::io::Error::last_os_error(),
                    "failed to release store lock"
                );
            }
        }
        debug!(path = %self.path.display(), "store lock released");
    }
}

/// Tabular file store for the four tables and the history snapshot.
///
/// Reads go straight to the files; writes only ever go through a
/// [`StagedCommit`] so a run publishes all of its outputs or none of them.
pub struct PersistentStore {
    layout: StoreLayout,
    reader: TableReader,
    writer: TableWriter,
}

impl PersistentStore {
    /// Open (creating if needed) the store directory described by `settings`
    pub fn open(settings: &EtlSettings) -> Result<Self> {
        Self::with_layout(StoreLayout::from_settings(settings))
    }

    pub fn with_layout(layout: StoreLayout) -> Result<Self> {
        std::fs::create_dir_all(&layout.dir)?;
        Ok(Self {
            layout,
            reader: TableReader::new(),
            writer: TableWriter::new(),
        })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(&self.layout.dir)
    }

    /// Finish or discard a commit interrupted by an earlier crash
    pub fn recover(&self) -> Result<RecoveryOutcome> {
        StagedCommit::recover(&self.layout.dir)
    }

    pub fn load_time(&self) -> Result<Vec<TimeDimension>> {
        self.reader.read_or_empty(&self.layout.time_path())
    }

    pub fn load_location(&self) -> Result<Vec<LocationDimension>> {
        self.reader.read_or_empty(&self.layout.location_path())
    }

    pub fn load_station(&self) -> Result<Vec<StationDimension>> {
        self.reader.read_or_empty(&self.layout.station_path())
    }

    pub fn load_fact(&self) -> Result<Vec<FactRecord>> {
        self.reader.read_or_empty(&self.layout.fact_path())
    }

    pub fn load_history(&self) -> Result<Option<Vec<RawReading>>> {
        RawExtractReader::new().read_history(&self.layout.history_path())
    }

    pub fn load_star_schema(&self) -> Result<StarSchema> {
        self.reader.read_star_schema(
            &self.layout.time_path(),
            &self.layout.location_path(),
            &self.layout.station_path(),
            &self.layout.fact_path(),
        )
    }

    pub fn begin(&self) -> StagedCommit {
        StagedCommit::new(&self.layout.dir)
    }

    /// Stage the full contents of one table into `commit`
    pub fn stage_table<T: TableRow>(
        &self,
        commit: &mut StagedCommit,
        file: &str,
        rows: &[T],
    ) -> Result<()> {
        commit.stage(file, |sink| self.writer.write_rows(rows, sink))?;
        debug!(table = T::TABLE, file, rows = rows.len(), "staged table");
        Ok(())
    }
}
