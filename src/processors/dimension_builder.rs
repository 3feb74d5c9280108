use crate::models::{Dimension, RawReading, SurrogateKey};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use tracing::debug;

/// Row counts of one dimension table after a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionOutcome {
    pub table: &'static str,
    pub existing: usize,
    pub inserted: usize,
    pub total: usize,
}

/// Incremental builder for one dimension table.
///
/// Candidates are projected from raw readings, deduplicated on the natural
/// key (first occurrence wins), and any key already stored is skipped. New
/// rows get `max(existing key) + 1` onwards, so keys are never reused.
pub struct DimensionBuilder<D: Dimension> {
    _dimension: PhantomData<D>,
}

impl<D: Dimension> DimensionBuilder<D> {
    pub fn new() -> Self {
        Self {
            _dimension: PhantomData,
        }
    }

    /// Full table: `existing` rows unchanged, followed by the new rows
    pub fn build(&self, readings: &[RawReading], existing: Vec<D>) -> (Vec<D>, DimensionOutcome) {
        let mut known: HashSet<D::NaturalKey> =
            existing.iter().map(|row| row.natural_key()).collect();
        let mut next_key = next_surrogate_key(&existing);

        let existing_count = existing.len();
        let mut table = existing;
        for reading in readings {
            if known.insert(D::reading_key(reading)) {
                table.push(D::from_reading(reading, next_key));
                next_key += 1;
            }
        }

        let outcome = DimensionOutcome {
            table: D::TABLE,
            existing: existing_count,
            inserted: table.len() - existing_count,
            total: table.len(),
        };
        debug!(
            table = outcome.table,
            existing = outcome.existing,
            inserted = outcome.inserted,
            "built dimension"
        );

        (table, outcome)
    }
}

impl<D: Dimension> Default for DimensionBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// First free surrogate key of a table; 1 for an empty table
pub fn next_surrogate_key<D: Dimension>(rows: &[D]) -> SurrogateKey {
    rows.iter().map(|row| row.surrogate_key()).max().unwrap_or(0) + 1
}

/// Natural key to surrogate key lookup used by the fact joins.
///
/// If a natural key occurs more than once, the first row wins.
pub fn key_lookup<D: Dimension>(rows: &[D]) -> HashMap<D::NaturalKey, SurrogateKey> {
    let mut lookup = HashMap::with_capacity(rows.len());
    for row in rows {
        lookup
            .entry(row.natural_key())
            .or_insert_with(|| row.surrogate_key());
    }
    lookup
}
