//! Column-name based mapping between CSV records and table rows.
//!
//! Tables are read by header name, so column order in a file does not
//! matter, but every required column must be present. A missing column is
//! a schema error raised before any row is parsed.

use crate::error::{ProcessingError, Result};
use crate::models::{
    FactRecord, LocationDimension, Measurement, Measurements, RawReading, StationDimension,
    TimeDimension, MEASUREMENT_COUNT,
};
use crate::utils::constants::*;
use crate::utils::timestamps::{format_raw_timestamp, format_rfc3339, parse_timestamp};
use csv::StringRecord;
use std::collections::HashMap;

/// Positions of named columns within a CSV header
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    table: String,
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(table: &str, headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();

        Self {
            table: table.to_string(),
            positions,
        }
    }

    /// Make `canonical` resolve to `alias` when only the alias is present
    pub fn with_alias(mut self, canonical: &str, alias: &str) -> Self {
        if !self.positions.contains_key(canonical) {
            if let Some(&pos) = self.positions.get(alias) {
                self.positions.insert(canonical.to_string(), pos);
            }
        }
        self
    }

    pub fn require<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let missing: Vec<String> = columns
            .into_iter()
            .filter(|c| !self.positions.contains_key(*c))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProcessingError::Schema {
                table: self.table.clone(),
                missing,
            })
        }
    }

    pub fn field<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|&pos| record.get(pos))
            .map(str::trim)
    }

    fn required<'r>(&self, record: &'r StringRecord, column: &str) -> Result<&'r str> {
        match self.field(record, column) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.invalid(record, column, "", "value is required")),
        }
    }

    fn invalid(&self, record: &StringRecord, column: &str, value: &str, why: &str) -> ProcessingError {
        let line = record.position().map_or(0, |p| p.line());
        ProcessingError::InvalidFormat(format!(
            "{} table, line {}, column '{}': {} ('{}')",
            self.table, line, column, why, value
        ))
    }

    pub fn parse_f64(&self, record: &StringRecord, column: &str) -> Result<f64> {
        let value = self.required(record, column)?;
        value
            .parse::<f64>()
            .map_err(|_| self.invalid(record, column, value, "not a number"))
    }

    pub fn parse_opt_f64(&self, record: &StringRecord, column: &str) -> Result<Option<f64>> {
        match self.field(record, column) {
            None => Ok(None),
            Some(value) if value.is_empty() || value.eq_ignore_ascii_case("nan") => Ok(None),
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.invalid(record, column, value, "not a number")),
        }
    }

    /// Parse an integer key; accepts `3.0` as written by tools that store keys as floats
    pub fn parse_u64(&self, record: &StringRecord, column: &str) -> Result<u64> {
        let value = self.required(record, column)?;
        if let Ok(parsed) = value.parse::<u64>() {
            return Ok(parsed);
        }
        match value.parse::<f64>() {
            Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
            _ => Err(self.invalid(record, column, value, "not a non-negative integer")),
        }
    }

    pub fn parse_i32(&self, record: &StringRecord, column: &str) -> Result<i32> {
        let value = self.required(record, column)?;
        value
            .parse::<i32>()
            .map_err(|_| self.invalid(record, column, value, "not an integer"))
    }

    pub fn parse_u32(&self, record: &StringRecord, column: &str) -> Result<u32> {
        let value = self.required(record, column)?;
        value
            .parse::<u32>()
            .map_err(|_| self.invalid(record, column, value, "not an integer"))
    }

    pub fn parse_string(&self, record: &StringRecord, column: &str) -> Result<String> {
        self.required(record, column).map(str::to_string)
    }

    pub fn parse_measurements(&self, record: &StringRecord) -> Result<Measurements> {
        let mut values = [None; MEASUREMENT_COUNT];
        for measurement in Measurement::ALL {
            values[measurement.index()] = self.parse_opt_f64(record, measurement.column())?;
        }
        Ok(Measurements::new(values))
    }
}

/// A row type that can be stored as one CSV record
pub trait TableRow: Sized {
    /// Table name used in schema errors
    const TABLE: &'static str;

    /// Header written for the table
    fn columns() -> Vec<&'static str>;

    /// Columns that must be present when reading
    fn required_columns() -> Vec<&'static str> {
        Self::columns()
    }

    /// Adjust the index before validation, e.g. to register aliases
    fn prepare_index(index: ColumnIndex) -> ColumnIndex {
        index
    }

    fn from_record(index: &ColumnIndex, record: &StringRecord) -> Result<Self>;

    fn to_record(&self) -> Vec<String>;
}

fn format_opt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn measurement_fields(measurements: &Measurements) -> impl Iterator<Item = String> + '_ {
    measurements.values().iter().map(|v| format_opt_f64(*v))
}

impl TableRow for TimeDimension {
    const TABLE: &'static str = "df_dtempo";

    fn columns() -> Vec<&'static str> {
        TIME_COLUMNS.to_vec()
    }

    fn from_record(index: &ColumnIndex, record: &StringRecord) -> Result<Self> {
        Ok(Self {
            tempo_key: index.parse_u64(record, "tempo_key")?,
            ano: index.parse_i32(record, "ano")?,
            mes: index.parse_u32(record, "mes")?,
            dia: index.parse_u32(record, "dia")?,
            hora: index.parse_u32(record, "hora")?,
            timestamp: parse_timestamp(&index.parse_string(record, "timestamp")?)?,
        })
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.tempo_key.to_string(),
            self.ano.to_string(),
            self.mes.to_string(),
            self.dia.to_string(),
            self.hora.to_string(),
            format_rfc3339(&self.timestamp),
        ]
    }
}

impl TableRow for LocationDimension {
    const TABLE: &'static str = "df_dlocalizacao";

    fn columns() -> Vec<&'static str> {
        LOCATION_COLUMNS.to_vec()
    }

    fn from_record(index: &ColumnIndex, record: &StringRecord) -> Result<Self> {
        Ok(Self::new(
            index.parse_u64(record, "localizacao_key")?,
            index.parse_f64(record, "latitude")?,
            index.parse_f64(record, "longitude")?,
        ))
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.localizacao_key.to_string(),
            self.latitude.to_string(),
            self.longitude.to_string(),
        ]
    }
}

impl TableRow for StationDimension {
    const TABLE: &'static str = "df_destacao";

    fn columns() -> Vec<&'static str> {
        STATION_COLUMNS.to_vec()
    }

    fn from_record(index: &ColumnIndex, record: &StringRecord) -> Result<Self> {
        Ok(Self::new(
            index.parse_u64(record, "estacao_key")?,
            index.parse_string(record, "station_id")?,
            index.field(record, "station_name").unwrap_or_default(),
        ))
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.estacao_key.to_string(),
            self.station_id.clone(),
            self.station_name.clone(),
        ]
    }
}

impl TableRow for FactRecord {
    const TABLE: &'static str = "df_fqualidadear";

    fn columns() -> Vec<&'static str> {
        FACT_KEY_COLUMNS
            .iter()
            .chain(MEASUREMENT_COLUMNS.iter())
            .copied()
            .collect()
    }

    fn from_record(index: &ColumnIndex, record: &StringRecord) -> Result<Self> {
        Ok(Self::new(
            index.parse_u64(record, "id")?,
            index.parse_u64(record, "tempo_key")?,
            index.parse_u64(record, "estacao_key")?,
            index.parse_u64(record, "localizacao_key")?,
            index.parse_measurements(record)?,
        ))
    }

    fn to_record(&self) -> Vec<String> {
        let mut fields = vec![
            self.id.to_string(),
            self.tempo_key.to_string(),
            self.estacao_key.to_string(),
            self.localizacao_key.to_string(),
        ];
        fields.extend(measurement_fields(&self.measurements));
        fields
    }
}

impl TableRow for RawReading {
    const TABLE: &'static str = "raw_extract";

    fn columns() -> Vec<&'static str> {
        let mut columns = vec![
            RAW_TIMESTAMP,
            RAW_STATION_ID,
            RAW_STATION_NAME,
            RAW_LATITUDE,
            RAW_LONGITUDE,
            RAW_UTM_X,
            RAW_UTM_Y,
        ];
        columns.extend(MEASUREMENT_COLUMNS);
        columns
    }

    fn required_columns() -> Vec<&'static str> {
        Self::columns()
            .into_iter()
            .filter(|c| *c != RAW_UTM_X && *c != RAW_UTM_Y)
            .collect()
    }

    fn prepare_index(index: ColumnIndex) -> ColumnIndex {
        index.with_alias(RAW_STATION_NAME, "estacao")
    }

    fn from_record(index: &ColumnIndex, record: &StringRecord) -> Result<Self> {
        Ok(Self {
            timestamp: parse_timestamp(&index.parse_string(record, RAW_TIMESTAMP)?)?,
            latitude: index.parse_f64(record, RAW_LATITUDE)?,
            longitude: index.parse_f64(record, RAW_LONGITUDE)?,
            station_id: index.parse_string(record, RAW_STATION_ID)?,
            station_name: index.field(record, RAW_STATION_NAME).unwrap_or_default().to_string(),
            utm_x: index.parse_opt_f64(record, RAW_UTM_X)?,
            utm_y: index.parse_opt_f64(record, RAW_UTM_Y)?,
            measurements: index.parse_measurements(record)?,
        })
    }

    fn to_record(&self) -> Vec<String> {
        let mut fields = vec![
            format_raw_timestamp(&self.timestamp),
            self.station_id.clone(),
            self.station_name.clone(),
            self.latitude.to_string(),
            self.longitude.to_string(),
            format_opt_f64(self.utm_x),
            format_opt_f64(self.utm_y),
        ];
        fields.extend(measurement_fields(&self.measurements));
        fields
    }
}
