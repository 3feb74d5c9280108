use airq_etl::config::FactIdPolicy;
use airq_etl::models::{
    LocationDimension, Measurement, Measurements, RawReading, StarSchema, StationDimension,
    TimeDimension,
};
use airq_etl::processors::{DimensionBuilder, FactBuilder, IntegrityChecker, SnapshotDiffer};
use chrono::{Duration, FixedOffset, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// Hourly readings for `station_count` stations over `hours` hours
fn create_test_readings(station_count: usize, hours: usize) -> Vec<RawReading> {
    let offset = FixedOffset::west_opt(3 * 3600).unwrap();
    let start = offset.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let mut readings = Vec::with_capacity(station_count * hours);

    for hour in 0..hours {
        let timestamp = start + Duration::hours(hour as i64);
        for station in 1..=station_count {
            let measurements = Measurements::default()
                .with(Measurement::Temperature, 20.0 + (hour % 24) as f64 * 0.5)
                .with(Measurement::Ozone, 10.0 + station as f64)
                .with(Measurement::Pm10, (hour * station % 90) as f64);

            readings.push(RawReading::new(
                timestamp,
                -22.9 - station as f64 * 0.01,
                -43.2 - station as f64 * 0.01,
                station.to_string(),
                format!("Station {}", station),
                measurements,
            ));
        }
    }

    readings
}

fn build_schema(readings: &[RawReading]) -> StarSchema {
    let (time, _) = DimensionBuilder::<TimeDimension>::new().build(readings, Vec::new());
    let (location, _) = DimensionBuilder::<LocationDimension>::new().build(readings, Vec::new());
    let (station, _) = DimensionBuilder::<StationDimension>::new().build(readings, Vec::new());
    let (fact, _) = FactBuilder::new(FactIdPolicy::Stable).build(
        readings,
        &time,
        &location,
        &station,
        Vec::new(),
    );
    StarSchema {
        time,
        location,
        station,
        fact,
    }
}

fn benchmark_dimension_builder(c: &mut Criterion) {
    let readings = create_test_readings(20, 24 * 30);

    c.bench_function("time_dimension_build", |b| {
        b.iter(|| {
            let (table, _) =
                DimensionBuilder::<TimeDimension>::new().build(black_box(&readings), Vec::new());
            black_box(table.len())
        })
    });

    c.bench_function("station_dimension_build", |b| {
        b.iter(|| {
            let (table, _) =
                DimensionBuilder::<StationDimension>::new().build(black_box(&readings), Vec::new());
            black_box(table.len())
        })
    });
}

fn benchmark_fact_builder(c: &mut Criterion) {
    let readings = create_test_readings(20, 24 * 30);
    let schema = build_schema(&readings);
    let builder = FactBuilder::new(FactIdPolicy::Stable);

    c.bench_function("fact_build_against_existing", |b| {
        b.iter(|| {
            let (table, outcome) = builder.build(
                black_box(&readings),
                &schema.time,
                &schema.location,
                &schema.station,
                schema.fact.clone(),
            );
            black_box((table.len(), outcome.duplicates_collapsed))
        })
    });
}

fn benchmark_snapshot_diff(c: &mut Criterion) {
    let history = create_test_readings(20, 24 * 30);
    let mut current = history.clone();
    current.extend(create_test_readings(20, 24 * 31).into_iter().skip(history.len()));

    c.bench_function("snapshot_diff_one_new_day", |b| {
        b.iter(|| {
            let diff = SnapshotDiffer::diff(black_box(&current), Some(&history));
            black_box(diff.forwarded().len())
        })
    });
}

fn benchmark_integrity_checker(c: &mut Criterion) {
    let schema = build_schema(&create_test_readings(10, 24 * 30));

    c.bench_function("integrity_checker", |b| {
        b.iter(|| {
            let report = IntegrityChecker::new().check_integrity(black_box(&schema));
            black_box(report.violations.len())
        })
    });
}

fn benchmark_varying_data_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("star_schema_build_by_size");

    for &size in &[5, 20, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("stations", size),
            &size,
            |b, &station_count| {
                let readings = create_test_readings(station_count, 24 * 7);
                b.iter(|| black_box(build_schema(&readings).fact.len()))
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_dimension_builder,
    benchmark_fact_builder,
    benchmark_snapshot_diff,
    benchmark_integrity_checker,
    benchmark_varying_data_sizes
);
criterion_main!(benches);
