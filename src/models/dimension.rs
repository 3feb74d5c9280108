use crate::models::raw::RawReading;
use crate::utils::exact::f64_bits;
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use validator::Validate;

/// Surrogate key shared by all dimensions; assigned from 1 upwards
pub type SurrogateKey = u64;

/// A dimension table row keyed by a natural key projected from raw readings.
pub trait Dimension: Clone {
    type NaturalKey: Eq + Hash + Clone + std::fmt::Debug;

    /// Table name used in logs, reports and schema errors
    const TABLE: &'static str;

    /// Natural key of a raw reading, as used by fact joins
    fn reading_key(reading: &RawReading) -> Self::NaturalKey;

    /// Candidate row derived from a raw reading, with `key` as surrogate key
    fn from_reading(reading: &RawReading, key: SurrogateKey) -> Self;

    fn natural_key(&self) -> Self::NaturalKey;

    fn surrogate_key(&self) -> SurrogateKey;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TimeDimension {
    pub tempo_key: SurrogateKey,

    pub ano: i32,

    #[validate(range(min = 1, max = 12))]
    pub mes: u32,

    #[validate(range(min = 1, max = 31))]
    pub dia: u32,

    #[validate(range(min = 0, max = 23))]
    pub hora: u32,

    pub timestamp: DateTime<FixedOffset>,
}

impl TimeDimension {
    /// Build a row, decomposing the timestamp in its own offset
    pub fn new(tempo_key: SurrogateKey, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            tempo_key,
            ano: timestamp.year(),
            mes: timestamp.month(),
            dia: timestamp.day(),
            hora: timestamp.hour(),
            timestamp,
        }
    }

    /// Whether the stored calendar fields agree with the timestamp
    pub fn is_consistent(&self) -> bool {
        let derived = Self::new(self.tempo_key, self.timestamp);
        (derived.ano, derived.mes, derived.dia, derived.hora)
            == (self.ano, self.mes, self.dia, self.hora)
    }
}

impl Dimension for TimeDimension {
    type NaturalKey = DateTime<FixedOffset>;
    const TABLE: &'static str = "time";

    fn reading_key(reading: &RawReading) -> Self::NaturalKey {
        reading.timestamp
    }

    fn from_reading(reading: &RawReading, key: SurrogateKey) -> Self {
        Self::new(key, reading.timestamp)
    }

    fn natural_key(&self) -> Self::NaturalKey {
        self.timestamp
    }

    fn surrogate_key(&self) -> SurrogateKey {
        self.tempo_key
    }
}

/// Exact coordinate pair usable as a hash key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    latitude_bits: u64,
    longitude_bits: u64,
}

impl CoordinateKey {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude_bits: f64_bits(latitude),
            longitude_bits: f64_bits(longitude),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationDimension {
    pub localizacao_key: SurrogateKey,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl LocationDimension {
    pub fn new(localizacao_key: SurrogateKey, latitude: f64, longitude: f64) -> Self {
        Self {
            localizacao_key,
            latitude,
            longitude,
        }
    }
}

impl Dimension for LocationDimension {
    type NaturalKey = CoordinateKey;
    const TABLE: &'static str = "location";

    fn reading_key(reading: &RawReading) -> Self::NaturalKey {
        CoordinateKey::new(reading.latitude, reading.longitude)
    }

    fn from_reading(reading: &RawReading, key: SurrogateKey) -> Self {
        Self::new(key, reading.latitude, reading.longitude)
    }

    fn natural_key(&self) -> Self::NaturalKey {
        CoordinateKey::new(self.latitude, self.longitude)
    }

    fn surrogate_key(&self) -> SurrogateKey {
        self.localizacao_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StationDimension {
    pub estacao_key: SurrogateKey,

    #[validate(length(min = 1))]
    pub station_id: String,

    pub station_name: String,
}

impl StationDimension {
    pub fn new(
        estacao_key: SurrogateKey,
        station_id: impl Into<String>,
        station_name: impl Into<String>,
    ) -> Self {
        Self {
            estacao_key,
            station_id: station_id.into(),
            station_name: station_name.into(),
        }
    }
}

impl Dimension for StationDimension {
    type NaturalKey = (String, String);
    const TABLE: &'static str = "station";

    fn reading_key(reading: &RawReading) -> Self::NaturalKey {
        (reading.station_id.clone(), reading.station_name.clone())
    }

    fn from_reading(reading: &RawReading, key: SurrogateKey) -> Self {
        Self::new(key, reading.station_id.clone(), reading.station_name.clone())
    }

    fn natural_key(&self) -> Self::NaturalKey {
        (self.station_id.clone(), self.station_name.clone())
    }

    fn surrogate_key(&self) -> SurrogateKey {
        self.estacao_key
    }
}
