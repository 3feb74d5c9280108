//! All-or-nothing publication of several store files.
//!
//! Every output is first written in full to a temporary file in the store
//! directory. Once all of them are staged, a manifest naming each staged
//! file and its target is written with an atomic rename, and only then are
//! the staged files renamed over their targets. Until the manifest exists
//! the old files are untouched; once it exists the commit is durable and an
//! interrupted publish is rolled forward by [`StagedCommit::recover`].

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{COMMIT_MANIFEST_FILE, STAGED_FILE_PREFIX};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CommitManifest {
    created_at: String,
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestEntry {
    staged: String,
    target: String,
}

struct StagedEntry {
    staged: TempPath,
    target: String,
}

/// What [`StagedCommit::recover`] found in a store directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Clean,
    /// An interrupted publish was completed; number of files moved into place
    RolledForward(usize),
    /// Staged files of an abandoned commit were removed
    Discarded(usize),
}

pub struct StagedCommit {
    dir: PathBuf,
    entries: Vec<StagedEntry>,
}

impl StagedCommit {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            entries: Vec::new(),
        }
    }

    /// Stage the full contents of `target` (a file name inside the store directory)
    pub fn stage<F>(&mut self, target: &str, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        if self.entries.iter().any(|e| e.target == target) {
            return Err(ProcessingError::Commit(format!(
                "{} staged twice in one commit",
                target
            )));
        }

        let temp = tempfile::Builder::new()
            .prefix(STAGED_FILE_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            write(&mut writer)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        debug!(target, staged = %temp.path().display(), "staged file");
        self.entries.push(StagedEntry {
            staged: temp.into_temp_path(),
            target: target.to_string(),
        });
        Ok(())
    }

    /// Make the commit durable: keep staged files and write the manifest
    pub fn prepare(self) -> Result<PreparedCommit> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let staged = entry
                .staged
                .keep()
                .map_err(|e| ProcessingError::Commit(format!("cannot keep staged file: {}", e)))?;
            entries.push(ManifestEntry {
                staged: file_name(&staged)?,
                target: entry.target,
            });
        }

        let manifest = CommitManifest {
            created_at: Utc::now().to_rfc3339(),
            entries,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(STAGED_FILE_PREFIX)
            .suffix(".manifest")
            .tempfile_in(&self.dir)?;
        serde_json::to_writer_pretty(temp.as_file_mut(), &manifest)?;
        temp.as_file().sync_all()?;
        temp.persist(self.dir.join(COMMIT_MANIFEST_FILE))
            .map_err(|e| ProcessingError::Io(e.error))?;
        sync_dir(&self.dir)?;

        Ok(PreparedCommit {
            dir: self.dir,
            manifest,
        })
    }

    /// Stage-complete commit: prepare and move every file into place
    pub fn publish(self) -> Result<usize> {
        self.prepare()?.finish()
    }

    /// Complete or discard whatever an earlier run left in `dir`
    pub fn recover(dir: &Path) -> Result<RecoveryOutcome> {
        let manifest_path = dir.join(COMMIT_MANIFEST_FILE);
        if manifest_path.exists() {
            let file = File::open(&manifest_path)?;
            let manifest: CommitManifest = serde_json::from_reader(file).map_err(|e| {
                ProcessingError::Commit(format!(
                    "unreadable commit manifest {}: {}",
                    manifest_path.display(),
                    e
                ))
            })?;
            warn!(
                created_at = %manifest.created_at,
                files = manifest.entries.len(),
                "completing interrupted commit"
            );
            let moved = PreparedCommit {
                dir: dir.to_path_buf(),
                manifest,
            }
            .finish()?;
            return Ok(RecoveryOutcome::RolledForward(moved));
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STAGED_FILE_PREFIX) {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        if removed > 0 {
            warn!(files = removed, "discarded staged files of an abandoned commit");
            Ok(RecoveryOutcome::Discarded(removed))
        } else {
            Ok(RecoveryOutcome::Clean)
        }
    }
}

/// A commit whose manifest is on disk; finishing it only renames files
pub struct PreparedCommit {
    dir: PathBuf,
    manifest: CommitManifest,
}

impl PreparedCommit {
    /// Rename staged files over their targets, then drop the manifest
    pub fn finish(self) -> Result<usize> {
        let mut moved = 0;
        for entry in &self.manifest.entries {
            let staged = self.dir.join(&entry.staged);
            if staged.exists() {
                std::fs::rename(&staged, self.dir.join(&entry.target))?;
                moved += 1;
            }
        }
        sync_dir(&self.dir)?;
        std::fs::remove_file(self.dir.join(COMMIT_MANIFEST_FILE))?;
        sync_dir(&self.dir)?;
        Ok(moved)
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ProcessingError::Commit(format!("invalid staged path {}", path.display())))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read(dir: &Path, name: &str) -> String {
        std::fs::read_to_string(dir.join(name)).unwrap()
    }

    fn staged_leftovers(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with(STAGED_FILE_PREFIX)
            })
            .count()
    }

    #[test]
    fn test_publish_replaces_all_targets() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.csv"), "old a")?;

        let mut commit = StagedCommit::new(dir.path());
        commit.stage("a.csv", |w| Ok(w.write_all(b"new a")?))?;
        commit.stage("b.csv", |w| Ok(w.write_all(b"new b")?))?;
        assert_eq!(commit.publish()?, 2);

        assert_eq!(read(dir.path(), "a.csv"), "new a");
        assert_eq!(read(dir.path(), "b.csv"), "new b");
        assert!(!dir.path().join(COMMIT_MANIFEST_FILE).exists());
        assert_eq!(staged_leftovers(dir.path()), 0);
        Ok(())
    }

    #[test]
    fn test_failed_stage_leaves_old_files_untouched() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.csv"), "old a")?;
        std::fs::write(dir.path().join("b.csv"), "old b")?;

        let mut commit = StagedCommit::new(dir.path());
        commit.stage("a.csv", |w| Ok(w.write_all(b"new a")?))?;
        let failed = commit.stage("b.csv", |_| {
            Err(ProcessingError::InvalidFormat("fact build failed".to_string()))
        });
        assert!(failed.is_err());
        drop(commit);

        assert_eq!(read(dir.path(), "a.csv"), "old a");
        assert_eq!(read(dir.path(), "b.csv"), "old b");
        assert_eq!(staged_leftovers(dir.path()), 0);
        Ok(())
    }

    #[test]
    fn test_interrupted_publish_rolls_forward() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.csv"), "old a")?;

        let mut commit = StagedCommit::new(dir.path());
        commit.stage("a.csv", |w| Ok(w.write_all(b"new a")?))?;
        commit.stage("b.csv", |w| Ok(w.write_all(b"new b")?))?;
        let prepared = commit.prepare()?;
        drop(prepared);

        assert_eq!(read(dir.path(), "a.csv"), "old a");
        assert_eq!(
            StagedCommit::recover(dir.path())?,
            RecoveryOutcome::RolledForward(2)
        );
        assert_eq!(read(dir.path(), "a.csv"), "new a");
        assert_eq!(read(dir.path(), "b.csv"), "new b");
        assert_eq!(StagedCommit::recover(dir.path())?, RecoveryOutcome::Clean);
        Ok(())
    }

    #[test]
    fn test_recover_discards_orphan_staged_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(format!("{}abc.tmp", STAGED_FILE_PREFIX)), "junk")?;

        assert_eq!(
            StagedCommit::recover(dir.path())?,
            RecoveryOutcome::Discarded(1)
        );
        assert_eq!(staged_leftovers(dir.path()), 0);
        Ok(())
    }

    #[test]
    fn test_same_target_twice_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut commit = StagedCommit::new(dir.path());
        commit.stage("a.csv", |w| Ok(w.write_all(b"1")?))?;
        assert!(matches!(
            commit.stage("a.csv", |w| Ok(w.write_all(b"2")?)),
            Err(ProcessingError::Commit(_))
        ));
        Ok(())
    }
}
