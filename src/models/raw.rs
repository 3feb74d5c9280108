use crate::models::measurement::Measurements;
use crate::utils::exact::{f64_bits, opt_f64_bits};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use validator::Validate;

/// One row of the upstream station extract.
///
/// Equality is whole-record: every column takes part, floats compare
/// bit-exactly and the timestamp compares as an instant. The projected
/// UTM coordinates never reach the star schema, but they are part of the
/// record so the history snapshot mirrors the extract faithfully.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RawReading {
    pub timestamp: DateTime<FixedOffset>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(length(min = 1))]
    pub station_id: String,

    pub station_name: String,

    pub utm_x: Option<f64>,
    pub utm_y: Option<f64>,

    pub measurements: Measurements,
}

impl RawReading {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        latitude: f64,
        longitude: f64,
        station_id: impl Into<String>,
        station_name: impl Into<String>,
        measurements: Measurements,
    ) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            station_id: station_id.into(),
            station_name: station_name.into(),
            utm_x: None,
            utm_y: None,
            measurements,
        }
    }

    pub fn with_utm(mut self, x: f64, y: f64) -> Self {
        self.utm_x = Some(x);
        self.utm_y = Some(y);
        self
    }
}

impl PartialEq for RawReading {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && f64_bits(self.latitude) == f64_bits(other.latitude)
            && f64_bits(self.longitude) == f64_bits(other.longitude)
            && self.station_id == other.station_id
            && self.station_name == other.station_name
            && opt_f64_bits(self.utm_x) == opt_f64_bits(other.utm_x)
            && opt_f64_bits(self.utm_y) == opt_f64_bits(other.utm_y)
            && self.measurements == other.measurements
    }
}

impl Eq for RawReading {}

impl Hash for RawReading {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timestamp.hash(state);
        f64_bits(self.latitude).hash(state);
        f64_bits(self.longitude).hash(state);
        self.station_id.hash(state);
        self.station_name.hash(state);
        opt_f64_bits(self.utm_x).hash(state);
        opt_f64_bits(self.utm_y).hash(state);
        self.measurements.hash(state);
    }
}
