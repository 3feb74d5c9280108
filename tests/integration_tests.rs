use airq_etl::config::{EtlSettings, FactIdPolicy};
use airq_etl::models::{
    FactRecord, LocationDimension, Measurements, RawReading, StationDimension, TimeDimension,
};
use airq_etl::processors::{EtlPipeline, FactBuilder, IntegrityChecker, RunOutcome, RunReport};
use airq_etl::readers::RawExtractReader;
use airq_etl::store::{PersistentStore, StoreLock};
use airq_etl::utils::constants::{LOCK_FILE, STAGED_FILE_PREFIX};
use airq_etl::utils::parse_timestamp;
use airq_etl::writers::{ParquetWriter, RecoveryOutcome, StagedCommit, TableWriter};
use airq_etl::ProcessingError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::TempDir;

const HEADER: &str = "data,lat,lon,codnum,estação,x_utm_sirgas2000,y_utm_sirgas2000,\
chuva,pres,rs,temp,ur,dir_vento,vel_vento,so2,no2,hcnm,hct,ch4,co,no,nox,o3,pm10,pm2_5";

const STATIONS: [(&str, &str); 2] = [("1", "Centro"), ("7", "Tijuca")];

fn line(day: u32, hour: u32, station: (&str, &str), o3: &str) -> String {
    format!(
        "2023/01/{:02} {:02}:00:00+00,-22.9081,-43.1786,{},{},686000.5,7466000.25,\
0,1012.5,,25.3,80,150,1.2,,,,,,,,,{},18,",
        day, hour, station.0, station.1, o3
    )
}

/// 24 hourly readings for each of two stations at one coordinate pair
fn base_lines() -> Vec<String> {
    let mut lines = Vec::new();
    for hour in 0..24 {
        for station in STATIONS {
            lines.push(line(1, hour, station, "30"));
        }
    }
    lines
}

struct Fixture {
    dir: TempDir,
    settings: EtlSettings,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let settings = EtlSettings::for_data_dir(dir.path());
        Self { dir, settings }
    }

    fn with_policy(policy: FactIdPolicy) -> Self {
        let mut fixture = Self::new();
        fixture.settings.fact_ids = policy;
        fixture
    }

    fn write_extract(&self, lines: &[String]) {
        let mut file = std::fs::File::create(self.settings.extract_path()).unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for l in lines {
            writeln!(file, "{}", l).unwrap();
        }
    }

    fn run(&self) -> Result<RunReport, ProcessingError> {
        EtlPipeline::new(self.settings.clone()).run(None)
    }

    fn store(&self) -> PersistentStore {
        PersistentStore::open(&self.settings).unwrap()
    }

    fn read(&self, file: &str) -> Vec<u8> {
        std::fs::read(self.dir.path().join(file)).unwrap()
    }

    /// Bytes of the four tables and the history snapshot
    fn snapshot(&self) -> Vec<Vec<u8>> {
        let s = &self.settings;
        [
            &s.time_table,
            &s.location_table,
            &s.station_table,
            &s.fact_table,
            &s.history_file,
        ]
        .iter()
        .map(|f| self.read(f))
        .collect()
    }

    fn staged_leftovers(&self) -> usize {
        std::fs::read_dir(self.dir.path())
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
}

fn keys<T, F: Fn(&T) -> u64>(rows: &[T], key: F) -> Vec<u64> {
    rows.iter().map(key).collect()
}

#[test]
fn test_first_run_builds_star_schema() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());

    let report = fixture.run().unwrap();
    assert_eq!(report.outcome, RunOutcome::FirstLoad);
    assert_eq!(report.forwarded_rows, 48);
    assert_eq!(report.files_published, 5);

    let schema = fixture.store().load_star_schema().unwrap();
    assert_eq!(keys(&schema.time, |t| t.tempo_key), (1..=24).collect::<Vec<u64>>());
    assert_eq!(schema.location, vec![LocationDimension::new(1, -22.9081, -43.1786)]);
    assert_eq!(
        schema.station,
        vec![
            StationDimension::new(1, "1", "Centro"),
            StationDimension::new(2, "7", "Tijuca"),
        ]
    );
    assert_eq!(schema.fact.len(), 48);
    assert_eq!(keys(&schema.fact, |f| f.id), (0..48).collect::<Vec<u64>>());

    let history = fixture.store().load_history().unwrap().unwrap();
    let extract = RawExtractReader::new()
        .read_extract(&fixture.settings.extract_path())
        .unwrap();
    assert_eq!(history, extract);
    assert_eq!(history[0].utm_x, Some(686000.5));
}

#[test]
fn test_unchanged_extract_is_a_no_op() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();
    let before = fixture.snapshot();

    let report = fixture.run().unwrap();
    assert_eq!(report.outcome, RunOutcome::NoChanges);
    assert_eq!(report.files_published, 0);
    assert_eq!(fixture.snapshot(), before);
}

#[test]
fn test_new_timestamp_extends_time_dimension_only() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();
    let before = fixture.store().load_star_schema().unwrap();

    let mut lines = base_lines();
    lines.push(line(2, 0, STATIONS[0], "31"));
    fixture.write_extract(&lines);

    let report = fixture.run().unwrap();
    assert_eq!(report.outcome, RunOutcome::Changed);
    assert_eq!((report.added, report.removed), (1, 0));
    assert_eq!(report.dimension("time").map(|d| d.inserted), Some(1));
    assert_eq!(report.dimension("station").map(|d| d.inserted), Some(0));

    let after = fixture.store().load_star_schema().unwrap();
    assert_eq!(&after.time[..24], before.time.as_slice());
    assert_eq!(after.time[24].tempo_key, 25);
    assert_eq!((after.time[24].dia, after.time[24].hora), (2, 0));
    assert_eq!(after.location, before.location);
    assert_eq!(after.station, before.station);
    assert_eq!(after.fact.len(), 49);
    assert_eq!(&after.fact[..48], before.fact.as_slice());
    assert_eq!(after.fact[48].tempo_key, 25);
}

#[test]
fn test_value_correction_appends_and_keeps_stale_fact() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();
    let before = fixture.store().load_star_schema().unwrap();

    let mut lines = base_lines();
    lines[5] = line(1, 2, STATIONS[1], "44.5");
    fixture.write_extract(&lines);

    let report = fixture.run().unwrap();
    assert_eq!((report.added, report.removed), (1, 1));
    assert_eq!(report.forwarded_rows, 2);
    let fact = report.fact.unwrap();
    assert_eq!(fact.inserted, 1);
    assert_eq!(fact.duplicates_collapsed, 1);

    let after = fixture.store().load_star_schema().unwrap();
    assert_eq!(after.time, before.time);
    assert_eq!(after.location, before.location);
    assert_eq!(after.station, before.station);
    assert_eq!(after.fact.len(), 49);
    assert!(after.fact.contains(&before.fact[5]));

    // The superseded reading stays in history and is seen again next run.
    let history = fixture.store().load_history().unwrap().unwrap();
    assert_eq!(history.len(), 49);
    let again = fixture.run().unwrap();
    assert_eq!(again.outcome, RunOutcome::Changed);
    assert_eq!((again.added, again.removed), (0, 1));
    assert_eq!(again.fact.map(|f| f.inserted), Some(0));
}

#[test]
fn test_unknown_station_dropped_by_fact_builder() {
    let ts = parse_timestamp("2023/01/01 00:00:00+00").unwrap();
    let time = vec![TimeDimension::new(1, ts)];
    let location = vec![LocationDimension::new(1, -22.9081, -43.1786)];
    let station = vec![StationDimension::new(1, "1", "Centro")];
    let readings = vec![
        RawReading::new(ts, -22.9081, -43.1786, "1", "Centro", Measurements::default()),
        RawReading::new(ts, -22.9081, -43.1786, "99", "Unknown", Measurements::default()),
    ];

    let (facts, outcome) = FactBuilder::new(FactIdPolicy::Stable).build(
        &readings,
        &time,
        &location,
        &station,
        Vec::new(),
    );
    assert_eq!(facts, vec![FactRecord::new(0, 1, 1, 1, Measurements::default())]);
    assert_eq!(outcome.dropped_unresolved, 1);
}

#[test]
fn test_fact_count_is_resolvable_rows_minus_duplicates() {
    let fixture = Fixture::new();
    let mut lines = base_lines();
    // Exact duplicate, and a row differing only in the projected coordinates.
    lines.push(lines[0].clone());
    lines.push(lines[1].replace("686000.5", "686001.5"));
    fixture.write_extract(&lines);

    let report = fixture.run().unwrap();
    let fact = report.fact.unwrap();
    assert_eq!(report.forwarded_rows, 50);
    assert_eq!(fact.resolved, 50);
    assert_eq!(fact.duplicates_collapsed, 2);
    assert_eq!(fact.total, 48);
}

#[test]
fn test_keys_stay_unique_and_monotonic_across_runs() {
    let fixture = Fixture::new();
    let mut lines = base_lines();
    fixture.write_extract(&lines);
    fixture.run().unwrap();

    for day in 2..=4 {
        lines.push(line(day, 12, STATIONS[day as usize % 2], "12"));
        lines.push(line(day, 12, ("9", "Bangu"), "8"));
        fixture.write_extract(&lines);
        fixture.run().unwrap();
    }

    let schema = fixture.store().load_star_schema().unwrap();
    let checker = IntegrityChecker::new();
    let report = checker.check_integrity(&schema);
    assert!(report.is_clean(), "{}", checker.generate_summary(&report));
    assert_eq!(keys(&schema.time, |t| t.tempo_key), (1..=27).collect::<Vec<u64>>());
    assert_eq!(keys(&schema.station, |s| s.estacao_key), vec![1, 2, 3]);
    assert_eq!(schema.fact.len(), 54);
}

#[test]
fn test_missing_extract_is_fatal() {
    let fixture = Fixture::new();
    match fixture.run() {
        Err(ProcessingError::ExtractNotFound(path)) => {
            assert_eq!(path, fixture.settings.extract_path())
        }
        other => panic!("expected missing extract, got {:?}", other.map(|r| r.outcome)),
    }
}

#[test]
fn test_failed_run_leaves_prior_state_intact() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();

    // Corrupt the fact table so the run fails after the dimensions are staged.
    std::fs::write(
        fixture.dir.path().join(&fixture.settings.fact_table),
        "id,tempo_key\n0,1\n",
    )
    .unwrap();
    let before = fixture.snapshot();

    let mut lines = base_lines();
    lines.push(line(2, 0, STATIONS[0], "31"));
    fixture.write_extract(&lines);

    match fixture.run() {
        Err(ProcessingError::Schema { table, missing }) => {
            assert_eq!(table, "df_fqualidadear");
            assert!(missing.contains(&"estacao_key".to_string()));
        }
        other => panic!("expected schema error, got {:?}", other.map(|r| r.outcome)),
    }

    assert_eq!(fixture.snapshot(), before);
    assert_eq!(fixture.staged_leftovers(), 0);
}

#[test]
fn test_interrupted_commit_rolled_forward_on_next_run() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();

    let extra = vec![
        StationDimension::new(1, "1", "Centro"),
        StationDimension::new(2, "7", "Tijuca"),
        StationDimension::new(3, "9", "Bangu"),
    ];
    let mut commit = StagedCommit::new(fixture.dir.path());
    commit
        .stage(&fixture.settings.station_table, |sink| {
            TableWriter::new().write_rows(&extra, sink)
        })
        .unwrap();
    drop(commit.prepare().unwrap());

    let report = fixture.run().unwrap();
    assert_eq!(report.recovery, RecoveryOutcome::RolledForward(1));
    assert_eq!(report.outcome, RunOutcome::NoChanges);
    assert_eq!(fixture.store().load_station().unwrap(), extra);
}

#[test]
fn test_crashed_run_lock_file_does_not_block_roll_forward() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();

    // A killed writer leaves its lock file and a prepared commit behind
    let extra = vec![
        StationDimension::new(1, "1", "Centro"),
        StationDimension::new(2, "7", "Tijuca"),
        StationDimension::new(3, "9", "Bangu"),
    ];
    let mut commit = StagedCommit::new(fixture.dir.path());
    commit
        .stage(&fixture.settings.station_table, |sink| {
            TableWriter::new().write_rows(&extra, sink)
        })
        .unwrap();
    drop(commit.prepare().unwrap());
    std::fs::write(
        fixture.dir.path().join(LOCK_FILE),
        "pid=999999\nacquired_at=2023-01-01T00:00:00+00:00\n",
    )
    .unwrap();

    let report = fixture.run().unwrap();
    assert_eq!(report.recovery, RecoveryOutcome::RolledForward(1));
    assert_eq!(fixture.store().load_station().unwrap(), extra);
}

#[cfg(unix)]
#[test]
fn test_concurrent_run_rejected_by_lock() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());

    let lock = StoreLock::acquire(fixture.dir.path()).unwrap();
    assert!(matches!(fixture.run(), Err(ProcessingError::StoreLocked(_))));
    assert!(!fixture.dir.path().join(&fixture.settings.time_table).exists());

    drop(lock);
    assert_eq!(fixture.run().unwrap().outcome, RunOutcome::FirstLoad);
}

/// Shift every stored fact id to leave gaps, as an older store would have
fn shift_fact_ids(fixture: &Fixture, offset: u64) {
    let store = fixture.store();
    let facts: Vec<FactRecord> = store
        .load_fact()
        .unwrap()
        .into_iter()
        .map(|f| FactRecord { id: f.id * 2 + offset, ..f })
        .collect();
    let bytes = TableWriter::new().to_bytes(&facts).unwrap();
    std::fs::write(fixture.dir.path().join(&fixture.settings.fact_table), bytes).unwrap();
}

fn run_with_gapped_ids(policy: FactIdPolicy) -> Vec<u64> {
    let fixture = Fixture::with_policy(policy);
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();
    shift_fact_ids(&fixture, 100);

    let mut lines = base_lines();
    lines.push(line(2, 0, STATIONS[0], "31"));
    fixture.write_extract(&lines);
    fixture.run().unwrap();

    keys(&fixture.store().load_fact().unwrap(), |f| f.id)
}

#[test]
fn test_stable_ids_survive_later_runs() {
    let ids = run_with_gapped_ids(FactIdPolicy::Stable);
    let mut expected: Vec<u64> = (0..48).map(|i| i * 2 + 100).collect();
    expected.push(195);
    assert_eq!(ids, expected);
}

#[test]
fn test_renumber_policy_rewrites_ids_densely() {
    let ids = run_with_gapped_ids(FactIdPolicy::Renumber);
    assert_eq!(ids, (0..49).collect::<Vec<u64>>());
}

#[test]
fn test_export_matches_store_row_counts() {
    let fixture = Fixture::new();
    fixture.write_extract(&base_lines());
    fixture.run().unwrap();

    let out = fixture.dir.path().join("export");
    let schema = fixture.store().load_star_schema().unwrap();
    let writer = ParquetWriter::new().with_compression("zstd").unwrap();
    let exported = writer.write_star_schema(&schema, &out).unwrap();

    let rows: Vec<usize> = exported.iter().map(|t| t.rows).collect();
    assert_eq!(rows, vec![24, 1, 2, 48]);
    let info = writer.get_file_info(&out.join("fact_air_quality.parquet")).unwrap();
    assert_eq!(info.total_rows, 48);
}

#[test]
fn test_latin1_extract_with_ascii_header() {
    let mut fixture = Fixture::new();
    fixture.settings.input_encoding = "latin1".to_string();

    let header = HEADER.replace("estação", "estacao");
    let text = format!("{}\n{}\n", header, line(1, 0, ("3", "São Cristóvão"), "5"));
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
    std::fs::write(fixture.settings.extract_path(), &bytes).unwrap();

    fixture.run().unwrap();
    let station = fixture.store().load_station().unwrap();
    assert_eq!(station, vec![StationDimension::new(1, "3", "São Cristóvão")]);
}
