use crate::config::EtlSettings;
use crate::error::Result;
use crate::models::{LocationDimension, StationDimension, TimeDimension};
use crate::processors::dimension_builder::{DimensionBuilder, DimensionOutcome};
use crate::processors::fact_builder::{FactBuilder, FactOutcome};
use crate::processors::snapshot_differ::{DiffOutcome, SnapshotDiff, SnapshotDiffer};
use crate::readers::RawExtractReader;
use crate::store::PersistentStore;
use crate::utils::progress::ProgressReporter;
use crate::writers::RecoveryOutcome;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Number of progress steps reported by [`EtlPipeline::run`]
pub const PIPELINE_STEPS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    NoChanges,
    FirstLoad,
    Changed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub recovery: RecoveryOutcome,
    pub extract_rows: usize,
    pub history_rows: Option<usize>,
    pub forwarded_rows: usize,
    pub added: usize,
    pub removed: usize,
    /// Time, location and station, in build order; empty for a no-op run
    pub dimensions: Vec<DimensionOutcome>,
    pub fact: Option<FactOutcome>,
    pub files_published: usize,
    pub elapsed_ms: u64,
}

impl RunReport {
    fn from_diff(diff: &SnapshotDiff, recovery: RecoveryOutcome) -> Self {
        let outcome = match diff.outcome {
            DiffOutcome::FirstLoad { .. } => RunOutcome::FirstLoad,
            DiffOutcome::Unchanged => RunOutcome::NoChanges,
            DiffOutcome::Changed { .. } => RunOutcome::Changed,
        };
        let (added, removed) = diff.counts();

        Self {
            outcome,
            recovery,
            extract_rows: diff.current_rows,
            history_rows: diff.history_rows,
            forwarded_rows: diff.forwarded().len(),
            added,
            removed,
            dimensions: Vec::new(),
            fact: None,
            files_published: 0,
            elapsed_ms: 0,
        }
    }

    pub fn dimension(&self, table: &str) -> Option<&DimensionOutcome> {
        self.dimensions.iter().find(|d| d.table == table)
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== ETL Run Report ===\n");
        summary.push_str(&format!("Outcome: {:?}\n", self.outcome));
        if self.recovery != RecoveryOutcome::Clean {
            summary.push_str(&format!("Recovery: {:?}\n", self.recovery));
        }
        summary.push_str(&format!("Extract rows: {}\n", self.extract_rows));
        match self.history_rows {
            Some(rows) => summary.push_str(&format!("History rows: {}\n", rows)),
            None => summary.push_str("History rows: none (first run)\n"),
        }
        summary.push_str(&format!(
            "Forwarded rows: {} (added {}, removed {})\n",
            self.forwarded_rows, self.added, self.removed
        ));

        if !self.dimensions.is_empty() {
            summary.push_str("\nTables:\n");
            for d in &self.dimensions {
                summary.push_str(&format!(
                    "  {:<9} {:>8} rows (+{})\n",
                    d.table, d.total, d.inserted
                ));
            }
        }

        if let Some(fact) = &self.fact {
            summary.push_str(&format!(
                "  {:<9} {:>8} rows (+{})\n",
                "fact", fact.total, fact.inserted
            ));
            summary.push_str(&format!(
                "\nDuplicates collapsed: {}\nUnresolved rows dropped: {}\n",
                fact.duplicates_collapsed, fact.dropped_unresolved
            ));
        }

        summary.push_str(&format!("\nElapsed: {} ms\n", self.elapsed_ms));
        summary
    }
}

/// One incremental run over a store: change detection, dimension and fact
/// builds, and a single staged commit of every output.
pub struct EtlPipeline {
    settings: EtlSettings,
}

impl EtlPipeline {
    pub fn new(settings: EtlSettings) -> Self {
        Self { settings }
    }

    pub fn run(&self, progress: Option<&ProgressReporter>) -> Result<RunReport> {
        let started = Instant::now();
        let step = |n: usize, message: &str| {
            if let Some(p) = progress {
                p.step(n, message);
            }
        };

        let store = PersistentStore::open(&self.settings)?;
        let _lock = store.lock()?;
        let recovery = store.recover()?;
        let layout = store.layout();

        step(1, "Comparing extract with history snapshot");
        let reader = RawExtractReader::with_encoding(&self.settings.input_encoding)?;
        let diff = SnapshotDiffer::diff_files(
            &self.settings.extract_path(),
            &layout.history_path(),
            &reader,
        )?;

        let mut report = RunReport::from_diff(&diff, recovery);
        if diff.is_unchanged() {
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            info!(rows = diff.current_rows, "extract unchanged, nothing to do");
            return Ok(report);
        }

        let rows = diff.forwarded();
        let mut commit = store.begin();

        step(2, "Building time dimension");
        let (time, outcome) = DimensionBuilder::<TimeDimension>::new().build(rows, store.load_time()?);
        store.stage_table(&mut commit, &layout.time_table, &time)?;
        report.dimensions.push(outcome);

        step(3, "Building location dimension");
        let (location, outcome) =
            DimensionBuilder::<LocationDimension>::new().build(rows, store.load_location()?);
        store.stage_table(&mut commit, &layout.location_table, &location)?;
        report.dimensions.push(outcome);

        step(4, "Building station dimension");
        let (station, outcome) =
            DimensionBuilder::<StationDimension>::new().build(rows, store.load_station()?);
        store.stage_table(&mut commit, &layout.station_table, &station)?;
        report.dimensions.push(outcome);

        step(5, "Resolving fact rows");
        let (fact, fact_outcome) = FactBuilder::new(self.settings.fact_ids).build(
            rows,
            &time,
            &location,
            &station,
            store.load_fact()?,
        );
        store.stage_table(&mut commit, &layout.fact_table, &fact)?;
        if let Some(history) = diff.next_history() {
            store.stage_table(&mut commit, &layout.history_file, history)?;
        }
        report.fact = Some(fact_outcome);

        step(6, "Publishing tables");
        report.files_published = commit.publish()?;
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            outcome = ?report.outcome,
            forwarded = report.forwarded_rows,
            facts = fact_outcome.total,
            inserted = fact_outcome.inserted,
            dropped = fact_outcome.dropped_unresolved,
            "run committed"
        );

        Ok(report)
    }
}
