pub mod dimension_builder;
pub mod fact_builder;
pub mod integrity_checker;
pub mod pipeline;
pub mod snapshot_differ;

pub use dimension_builder::{DimensionBuilder, DimensionOutcome};
pub use fact_builder::{FactBuilder, FactOutcome};
pub use integrity_checker::{
    IntegrityChecker, IntegrityReport, IntegrityViolation, TableStatistics, ViolationType,
};
pub use pipeline::{EtlPipeline, RunOutcome, RunReport, PIPELINE_STEPS};
pub use snapshot_differ::{DiffOutcome, SnapshotDiff, SnapshotDiffer};
