use crate::error::Result;
use crate::models::RawReading;
use crate::readers::RawExtractReader;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// What change detection decided for one run
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOutcome {
    /// No history snapshot: the whole extract is new and becomes the history
    FirstLoad { rows: Vec<RawReading> },

    /// Extract and history hold the same rows; nothing to do
    Unchanged,

    /// Rows present in exactly one of extract and history
    Changed {
        rows: Vec<RawReading>,
        added: usize,
        removed: usize,
        next_history: Vec<RawReading>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDiff {
    pub current_rows: usize,
    pub history_rows: Option<usize>,
    pub outcome: DiffOutcome,
}

impl SnapshotDiff {
    pub fn is_unchanged(&self) -> bool {
        matches!(self.outcome, DiffOutcome::Unchanged)
    }

    /// Rows to feed into the dimension and fact builders
    pub fn forwarded(&self) -> &[RawReading] {
        match &self.outcome {
            DiffOutcome::FirstLoad { rows } | DiffOutcome::Changed { rows, .. } => rows,
            DiffOutcome::Unchanged => &[],
        }
    }

    /// Snapshot to persist for the next run, if anything changed
    pub fn next_history(&self) -> Option<&[RawReading]> {
        match &self.outcome {
            DiffOutcome::FirstLoad { rows } => Some(rows),
            DiffOutcome::Changed { next_history, .. } => Some(next_history),
            DiffOutcome::Unchanged => None,
        }
    }

    /// `(added, removed)` row counts
    pub fn counts(&self) -> (usize, usize) {
        match &self.outcome {
            DiffOutcome::FirstLoad { rows } => (rows.len(), 0),
            DiffOutcome::Changed { added, removed, .. } => (*added, *removed),
            DiffOutcome::Unchanged => (0, 0),
        }
    }
}

/// Whole-record change detection between the current extract and the
/// stored history snapshot.
///
/// A value correction on an existing reading shows up as one removed and one
/// added row. Both are forwarded, and the removed row stays in the history.
pub struct SnapshotDiffer;

impl SnapshotDiffer {
    pub fn diff(current: &[RawReading], history: Option<&[RawReading]>) -> SnapshotDiff {
        let Some(history) = history else {
            info!(rows = current.len(), "no history snapshot, loading full extract");
            return SnapshotDiff {
                current_rows: current.len(),
                history_rows: None,
                outcome: DiffOutcome::FirstLoad {
                    rows: current.to_vec(),
                },
            };
        };

        let summary = |outcome| SnapshotDiff {
            current_rows: current.len(),
            history_rows: Some(history.len()),
            outcome,
        };

        if current == history {
            debug!("extract identical to history snapshot");
            return summary(DiffOutcome::Unchanged);
        }

        let current_set: HashSet<&RawReading> = current.iter().collect();
        let history_set: HashSet<&RawReading> = history.iter().collect();

        let added = distinct_missing_from(current, &history_set);
        let removed = distinct_missing_from(history, &current_set);

        if added.is_empty() && removed.is_empty() {
            debug!("extract differs from history only in order or repetition");
            return summary(DiffOutcome::Unchanged);
        }

        let mut seen: HashSet<&RawReading> = HashSet::with_capacity(history.len() + added.len());
        let next_history: Vec<RawReading> = history
            .iter()
            .chain(added.iter().copied())
            .filter(|row| seen.insert(*row))
            .cloned()
            .collect();

        info!(
            added = added.len(),
            removed = removed.len(),
            history = next_history.len(),
            "extract differs from history snapshot"
        );

        let (added_count, removed_count) = (added.len(), removed.len());
        let rows: Vec<RawReading> = added.into_iter().chain(removed).cloned().collect();

        summary(DiffOutcome::Changed {
            rows,
            added: added_count,
            removed: removed_count,
            next_history,
        })
    }

    /// Read the extract and the history snapshot from disk and diff them
    pub fn diff_files(
        extract: &Path,
        history: &Path,
        reader: &RawExtractReader,
    ) -> Result<SnapshotDiff> {
        let current = reader.read_extract(extract)?;
        let history = reader.read_history(history)?;
        Ok(Self::diff(&current, history.as_deref()))
    }
}

/// Distinct rows of `rows`, in order, that are absent from `other`
fn distinct_missing_from<'a>(
    rows: &'a [RawReading],
    other: &HashSet<&RawReading>,
) -> Vec<&'a RawReading> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| !other.contains(*row) && seen.insert(*row))
        .collect()
}
