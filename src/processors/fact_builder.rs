use crate::config::FactIdPolicy;
use crate::models::{
    Dimension, FactContent, FactId, FactRecord, LocationDimension, RawReading, StationDimension,
    TimeDimension,
};
use crate::processors::dimension_builder::key_lookup;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Row counts of the fact table after a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FactOutcome {
    pub existing: usize,
    /// Forwarded rows whose three dimension keys all resolved
    pub resolved: usize,
    /// Forwarded rows dropped because a dimension join found no match
    pub dropped_unresolved: usize,
    /// Resolved rows identical to a stored row or to an earlier new row
    pub duplicates_collapsed: usize,
    pub inserted: usize,
    pub total: usize,
}

/// Resolves forwarded readings into fact rows and merges them into the
/// stored fact table.
pub struct FactBuilder {
    policy: FactIdPolicy,
}

impl FactBuilder {
    pub fn new(policy: FactIdPolicy) -> Self {
        Self { policy }
    }

    pub fn build(
        &self,
        readings: &[RawReading],
        time: &[TimeDimension],
        location: &[LocationDimension],
        station: &[StationDimension],
        existing: Vec<FactRecord>,
    ) -> (Vec<FactRecord>, FactOutcome) {
        let time_keys = key_lookup(time);
        let location_keys = key_lookup(location);
        let station_keys = key_lookup(station);

        let mut outcome = FactOutcome {
            existing: existing.len(),
            ..FactOutcome::default()
        };

        let mut candidates = Vec::with_capacity(readings.len());
        for reading in readings {
            let resolved = (
                time_keys.get(&TimeDimension::reading_key(reading)),
                location_keys.get(&LocationDimension::reading_key(reading)),
                station_keys.get(&StationDimension::reading_key(reading)),
            );
            match resolved {
                (Some(&tempo_key), Some(&localizacao_key), Some(&estacao_key)) => {
                    candidates.push(FactContent {
                        tempo_key,
                        estacao_key,
                        localizacao_key,
                        measurements: reading.measurements,
                    });
                }
                _ => {
                    outcome.dropped_unresolved += 1;
                    debug!(
                        timestamp = %reading.timestamp,
                        station_id = %reading.station_id,
                        station_name = %reading.station_name,
                        "reading has no matching dimension row"
                    );
                }
            }
        }
        outcome.resolved = candidates.len();

        if outcome.dropped_unresolved > 0 {
            warn!(
                dropped = outcome.dropped_unresolved,
                "dropped readings that did not resolve against every dimension"
            );
        }

        let (table, inserted) = match self.policy {
            FactIdPolicy::Stable => merge_stable(existing, candidates),
            FactIdPolicy::Renumber => merge_renumbered(existing, candidates),
        };

        outcome.total = table.len();
        outcome.inserted = inserted;
        outcome.duplicates_collapsed = outcome.resolved - inserted;

        debug!(
            policy = ?self.policy,
            existing = outcome.existing,
            inserted = outcome.inserted,
            collapsed = outcome.duplicates_collapsed,
            "built fact table"
        );

        (table, outcome)
    }
}

/// First free fact id of a table; 0 for an empty table
pub fn next_fact_id(rows: &[FactRecord]) -> FactId {
    rows.iter().map(|row| row.id + 1).max().unwrap_or(0)
}

/// Stored rows keep their ids; new distinct rows continue the sequence.
/// Returns the table and the number of candidates inserted.
fn merge_stable(
    existing: Vec<FactRecord>,
    candidates: Vec<FactContent>,
) -> (Vec<FactRecord>, usize) {
    let mut seen: HashSet<FactContent> = existing.iter().map(FactRecord::content).collect();
    let mut next_id = next_fact_id(&existing);

    let mut table = existing;
    let mut inserted = 0;
    for content in candidates {
        if seen.insert(content) {
            table.push(FactRecord::from_content(next_id, content));
            next_id += 1;
            inserted += 1;
        }
    }
    (table, inserted)
}

/// Distinct rows of stored-then-new, numbered densely from 0.
/// Duplicates already in the stored table collapse too; they do not count
/// against the candidates.
fn merge_renumbered(
    existing: Vec<FactRecord>,
    candidates: Vec<FactContent>,
) -> (Vec<FactRecord>, usize) {
    let mut seen = HashSet::with_capacity(existing.len() + candidates.len());
    let mut table: Vec<FactRecord> = Vec::with_capacity(existing.len() + candidates.len());

    for content in existing.iter().map(FactRecord::content) {
        if seen.insert(content) {
            table.push(FactRecord::from_content(table.len() as FactId, content));
        }
    }

    let mut inserted = 0;
    for content in candidates {
        if seen.insert(content) {
            table.push(FactRecord::from_content(table.len() as FactId, content));
            inserted += 1;
        }
    }
    (table, inserted)
}
