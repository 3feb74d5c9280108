use crate::models::{
    Dimension, FactContent, FactId, FactRecord, StarSchema, SurrogateKey, TimeDimension,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub tables: Vec<TableStatistics>,
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, violation_type: ViolationType) -> usize {
        self.violations
            .iter()
            .filter(|v| v.violation_type == violation_type)
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityViolation {
    pub table: &'static str,
    /// Zero-based row position within the table
    pub row: usize,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    DuplicateNaturalKey,
    DuplicateSurrogateKey,
    NonMonotonicKey,
    KeyBelowOne,
    OrphanTimeKey,
    OrphanLocationKey,
    OrphanStationKey,
    DuplicateFactId,
    DuplicateFactContent,
    OutOfRange,
    InconsistentTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStatistics {
    pub table: &'static str,
    pub rows: usize,
    pub min_key: Option<u64>,
    pub max_key: Option<u64>,
}

/// Audits a persisted star schema for key uniqueness, key monotonicity,
/// referential integrity of the fact table and value ranges.
pub struct IntegrityChecker {
    max_reported: usize,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self { max_reported: 10 }
    }

    /// Number of violations listed by [`generate_summary`](Self::generate_summary)
    pub fn with_max_reported(max_reported: usize) -> Self {
        Self { max_reported }
    }

    pub fn check_integrity(&self, schema: &StarSchema) -> IntegrityReport {
        let mut report = IntegrityReport {
            tables: Vec::with_capacity(4),
            violations: Vec::new(),
        };

        let time_keys = self.check_dimension(&schema.time, &mut report);
        let location_keys = self.check_dimension(&schema.location, &mut report);
        let station_keys = self.check_dimension(&schema.station, &mut report);

        for (row, time) in schema.time.iter().enumerate() {
            self.check_time_row(row, time, &mut report);
        }

        let keys = ReferencedKeys {
            time: time_keys,
            location: location_keys,
            station: station_keys,
        };
        self.check_facts(&schema.fact, &keys, &mut report);

        report
    }

    /// Uniqueness and ordering checks shared by all dimensions; returns the key set
    fn check_dimension<D>(&self, rows: &[D], report: &mut IntegrityReport) -> HashSet<SurrogateKey>
    where
        D: Dimension + Validate,
    {
        let mut natural: HashMap<D::NaturalKey, usize> = HashMap::with_capacity(rows.len());
        let mut keys: HashSet<SurrogateKey> = HashSet::with_capacity(rows.len());
        let mut previous: Option<SurrogateKey> = None;

        for (row, dimension) in rows.iter().enumerate() {
            let key = dimension.surrogate_key();

            if let Some(first) = natural.get(&dimension.natural_key()) {
                report.violations.push(violation(
                    D::TABLE,
                    row,
                    ViolationType::DuplicateNaturalKey,
                    format!("natural key {:?} already used in row {}", dimension.natural_key(), first),
                ));
            } else {
                natural.insert(dimension.natural_key(), row);
            }

            if !keys.insert(key) {
                report.violations.push(violation(
                    D::TABLE,
                    row,
                    ViolationType::DuplicateSurrogateKey,
                    format!("key {} appears more than once", key),
                ));
            }

            if key < 1 {
                report.violations.push(violation(
                    D::TABLE,
                    row,
                    ViolationType::KeyBelowOne,
                    format!("key {} is below 1", key),
                ));
            }

            if let Some(prev) = previous {
                if key <= prev {
                    report.violations.push(violation(
                        D::TABLE,
                        row,
                        ViolationType::NonMonotonicKey,
                        format!("key {} follows key {}", key, prev),
                    ));
                }
            }
            previous = Some(key);

            if let Err(e) = dimension.validate() {
                report.violations.push(violation(
                    D::TABLE,
                    row,
                    ViolationType::OutOfRange,
                    e.to_string(),
                ));
            }
        }

        report.tables.push(TableStatistics {
            table: D::TABLE,
            rows: rows.len(),
            min_key: rows.iter().map(|r| r.surrogate_key()).min(),
            max_key: rows.iter().map(|r| r.surrogate_key()).max(),
        });

        keys
    }

    fn check_time_row(&self, row: usize, time: &TimeDimension, report: &mut IntegrityReport) {
        if !time.is_consistent() {
            report.violations.push(violation(
                TimeDimension::TABLE,
                row,
                ViolationType::InconsistentTime,
                format!(
                    "{}-{:02}-{:02} {:02}h does not match timestamp {}",
                    time.ano, time.mes, time.dia, time.hora, time.timestamp
                ),
            ));
        }
    }

    fn check_facts(&self, facts: &[FactRecord], keys: &ReferencedKeys, report: &mut IntegrityReport) {
        let mut ids: HashSet<FactId> = HashSet::with_capacity(facts.len());
        let mut contents: HashMap<FactContent, usize> = HashMap::with_capacity(facts.len());

        for (row, fact) in facts.iter().enumerate() {
            if !ids.insert(fact.id) {
                report.violations.push(violation(
                    FACT_TABLE,
                    row,
                    ViolationType::DuplicateFactId,
                    format!("id {} appears more than once", fact.id),
                ));
            }

            if let Some(first) = contents.get(&fact.content()) {
                report.violations.push(violation(
                    FACT_TABLE,
                    row,
                    ViolationType::DuplicateFactContent,
                    format!("identical to row {}", first),
                ));
            } else {
                contents.insert(fact.content(), row);
            }

            let references = [
                (fact.tempo_key, &keys.time, ViolationType::OrphanTimeKey, "tempo_key"),
                (
                    fact.localizacao_key,
                    &keys.location,
                    ViolationType::OrphanLocationKey,
                    "localizacao_key",
                ),
                (fact.estacao_key, &keys.station, ViolationType::OrphanStationKey, "estacao_key"),
            ];
            for (key, known, violation_type, column) in references {
                if !known.contains(&key) {
                    report.violations.push(violation(
                        FACT_TABLE,
                        row,
                        violation_type,
                        format!("{} {} has no dimension row", column, key),
                    ));
                }
            }
        }

        report.tables.push(TableStatistics {
            table: FACT_TABLE,
            rows: facts.len(),
            min_key: facts.iter().map(|f| f.id).min(),
            max_key: facts.iter().map(|f| f.id).max(),
        });
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        for table in &report.tables {
            let range = match (table.min_key, table.max_key) {
                (Some(min), Some(max)) => format!("keys {}..={}", min, max),
                _ => "empty".to_string(),
            };
            summary.push_str(&format!("{:<9} {:>8} rows  {}\n", table.table, table.rows, range));
        }

        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));

        if !report.violations.is_empty() {
            summary.push_str(&format!("\nTop {} Violations:\n", self.max_reported));
            for (i, v) in report.violations.iter().take(self.max_reported).enumerate() {
                summary.push_str(&format!(
                    "  {}. {} row {}: {:?}: {}\n",
                    i + 1,
                    v.table,
                    v.row,
                    v.violation_type,
                    v.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

const FACT_TABLE: &str = "fact";

struct ReferencedKeys {
    time: HashSet<SurrogateKey>,
    location: HashSet<SurrogateKey>,
    station: HashSet<SurrogateKey>,
}

fn violation(
    table: &'static str,
    row: usize,
    violation_type: ViolationType,
    details: String,
) -> IntegrityViolation {
    IntegrityViolation {
        table,
        row,
        violation_type,
        details,
    }
}
