use crate::error::{ProcessingError, Result};
use crate::models::{
    FactRecord, LocationDimension, Measurement, StarSchema, StationDimension, TimeDimension,
};
use crate::utils::constants::*;
use crate::utils::filename::parquet_file_name;
use arrow::array::{
    ArrayRef, Float64Array, Int32Array, StringArray, TimestampSecondArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Parquet file names of the exported star schema
pub const EXPORT_TIME: &str = "dim_time";
pub const EXPORT_LOCATION: &str = "dim_location";
pub const EXPORT_STATION: &str = "dim_station";
pub const EXPORT_FACT: &str = "fact_air_quality";

/// Exports the star schema as typed Parquet files for bulk loaders
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

/// One written Parquet file
#[derive(Debug, Clone)]
pub struct ExportedTable {
    pub table: &'static str,
    pub path: PathBuf,
    pub rows: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write all four tables into `dir`, one file per table
    pub fn write_star_schema(&self, schema: &StarSchema, dir: &Path) -> Result<Vec<ExportedTable>> {
        std::fs::create_dir_all(dir)?;

        let batches = [
            (EXPORT_TIME, time_batch(&schema.time)?),
            (EXPORT_LOCATION, location_batch(&schema.location)?),
            (EXPORT_STATION, station_batch(&schema.station)?),
            (EXPORT_FACT, fact_batch(&schema.fact)?),
        ];

        let mut exported = Vec::with_capacity(batches.len());
        for (table, batch) in batches {
            let path = dir.join(parquet_file_name(table));
            self.write_batch(&batch, &path)?;
            info!(table, rows = batch.num_rows(), path = %path.display(), "exported table");
            exported.push(ExportedTable {
                table,
                path,
                rows: batch.num_rows(),
            });
        }

        Ok(exported)
    }

    /// Write one batch; an empty batch still produces a file carrying the schema
    pub fn write_batch(&self, batch: &RecordBatch, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        if batch.num_rows() > 0 {
            writer.write(batch)?;
        }
        writer.close()?;
        Ok(())
    }

    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let columns = metadata
            .file_metadata()
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: metadata.num_row_groups(),
            columns,
            file_size: std::fs::metadata(path)?.len(),
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn key_field(name: &str) -> Field {
    Field::new(name, DataType::UInt64, false)
}

fn time_batch(rows: &[TimeDimension]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        key_field("tempo_key"),
        Field::new("ano", DataType::Int32, false),
        Field::new("mes", DataType::UInt32, false),
        Field::new("dia", DataType::UInt32, false),
        Field::new("hora", DataType::UInt32, false),
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Second, Some("UTC".into())),
            false,
        ),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.tempo_key))),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.ano))),
        Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.mes))),
        Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.dia))),
        Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.hora))),
        Arc::new(
            TimestampSecondArray::from_iter_values(rows.iter().map(|r| r.timestamp.timestamp()))
                .with_timezone("UTC"),
        ),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn location_batch(rows: &[LocationDimension]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        key_field("localizacao_key"),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.localizacao_key))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.latitude))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.longitude))),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn station_batch(rows: &[StationDimension]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        key_field("estacao_key"),
        Field::new("station_id", DataType::Utf8, false),
        Field::new("station_name", DataType::Utf8, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.estacao_key))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.station_id.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.station_name.as_str()))),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn fact_batch(rows: &[FactRecord]) -> Result<RecordBatch> {
    let mut fields: Vec<Field> = FACT_KEY_COLUMNS.iter().map(|c| key_field(c)).collect();
    fields.extend(
        Measurement::ALL
            .iter()
            .map(|m| Field::new(m.column(), DataType::Float64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.id))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.tempo_key))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.estacao_key))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.localizacao_key))),
    ];
    for measurement in Measurement::ALL {
        let values: Float64Array = rows.iter().map(|r| r.measurement(measurement)).collect();
        columns.push(Arc::new(values));
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: usize,
    pub columns: Vec<String>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Columns: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} KB\n\
            - Compression: {:?}",
            self.total_rows,
            self.columns.len(),
            self.row_groups,
            self.file_size as f64 / 1024.0,
            self.compression,
        )
    }
}
