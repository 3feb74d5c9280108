use crate::cli::args::{Cli, Commands};
use crate::config::EtlSettings;
use crate::error::{ProcessingError, Result};
use crate::models::Measurement;
use crate::processors::{EtlPipeline, IntegrityChecker, RunOutcome, PIPELINE_STEPS};
use crate::store::{PersistentStore, StoreLock};
use crate::utils::generate_default_export_dir;
use crate::utils::logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose, cli.log_file.as_deref())?;

    let mut settings = EtlSettings::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    match cli.command {
        Commands::Run {
            extract,
            fact_ids,
            json,
        } => {
            if let Some(extract) = extract {
                settings.extract_file = absolute(&extract)?;
            }
            if let Some(policy) = fact_ids {
                settings.fact_ids = policy.parse().map_err(ProcessingError::Config)?;
            }

            info!(
                data_dir = %settings.data_dir.display(),
                extract = %settings.extract_path().display(),
                fact_ids = ?settings.fact_ids,
                "starting run"
            );

            // The pipeline is synchronous file I/O from end to end.
            let progress = ProgressReporter::new_spinner("Running ETL...", PIPELINE_STEPS, json);
            let report = tokio::task::spawn_blocking(move || {
                let result = EtlPipeline::new(settings).run(Some(&progress));
                if let Ok(report) = &result {
                    progress.finish_with_message(&format!("{:?}", report.outcome));
                }
                result
            })
            .await??;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n{}", report.summary());
                if report.outcome == RunOutcome::NoChanges {
                    println!("No differences against the history snapshot - store left untouched");
                }
            }
        }

        Commands::Check { json, max_reported } => {
            let store = PersistentStore::open(&settings)?;
            let _lock = lock_and_recover(&store)?;
            let schema = store.load_star_schema()?;

            let checker = IntegrityChecker::with_max_reported(max_reported);
            let report = checker.check_integrity(&schema);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", checker.generate_summary(&report));
                if report.is_clean() {
                    println!("✅ All tables passed integrity checks");
                } else {
                    println!("⚠️  Found {} integrity issues", report.violations.len());
                }
            }
        }

        Commands::Export {
            output_dir,
            compression,
            row_group_size,
        } => {
            let output_dir = output_dir.unwrap_or_else(generate_default_export_dir);
            let writer = ParquetWriter::new()
                .with_compression(&compression)?
                .with_row_group_size(row_group_size);

            let store = PersistentStore::open(&settings)?;
            let schema = {
                let _lock = lock_and_recover(&store)?;
                store.load_star_schema()?
            };

            println!("Exporting star schema to {}", output_dir.display());
            let exported = writer.write_star_schema(&schema, &output_dir)?;
            for table in &exported {
                let file_info = writer.get_file_info(&table.path)?;
                println!("\n{} ({})", table.table, table.path.display());
                println!("{}", file_info.summary());
            }

            println!("\nExport complete!");
        }

        Commands::Info => {
            let store = PersistentStore::open(&settings)?;
            let layout = store.layout();
            let schema = store.load_star_schema()?;
            let history = store.load_history()?;

            println!("Store directory: {}", layout.dir.display());
            println!("Fact id policy: {:?}", settings.fact_ids);

            let report = IntegrityChecker::new().check_integrity(&schema);
            println!("\nTables:");
            for table in &report.tables {
                match (table.min_key, table.max_key) {
                    (Some(min), Some(max)) => println!(
                        "  {:<9} {:>8} rows  keys {}..={}",
                        table.table, table.rows, min, max
                    ),
                    _ => println!("  {:<9} {:>8} rows", table.table, table.rows),
                }
            }

            if !schema.fact.is_empty() {
                println!("\nMeasurement coverage (* pollutant):");
                for measurement in Measurement::ALL {
                    let present = schema
                        .fact
                        .iter()
                        .filter(|f| f.measurement(measurement).is_some())
                        .count();
                    println!(
                        "  {}{:<22} {:>6.1}%",
                        if measurement.is_pollutant() { "*" } else { " " },
                        measurement.display_name(),
                        100.0 * present as f64 / schema.fact.len() as f64
                    );
                }
                let empty = schema
                    .fact
                    .iter()
                    .filter(|f| f.measurements.present_count() == 0)
                    .count();
                println!("  Rows without any measurement: {}", empty);
            }

            match history {
                Some(rows) => println!("\nHistory snapshot: {} rows", rows.len()),
                None => println!("\nHistory snapshot: none (next run is a first load)"),
            }
        }
    }

    Ok(())
}

/// Hold the store lock and finish any interrupted commit before reading
fn lock_and_recover(store: &PersistentStore) -> Result<StoreLock> {
    let lock = store.lock()?;
    store.recover()?;
    Ok(lock)
}

/// CLI paths are relative to the working directory, not the store
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
