use crate::utils::constants::MEASUREMENT_COLUMNS;
use crate::utils::exact::opt_f64_bits;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

pub const MEASUREMENT_COUNT: usize = MEASUREMENT_COLUMNS.len();

/// Measured quantities carried by every reading, in fact-table column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measurement {
    Rainfall,
    Pressure,
    SolarRadiation,
    Temperature,
    RelativeHumidity,
    WindDirection,
    WindSpeed,
    SulphurDioxide,
    NitrogenDioxide,
    NonMethaneHydrocarbons,
    TotalHydrocarbons,
    Methane,
    CarbonMonoxide,
    NitricOxide,
    NitrogenOxides,
    Ozone,
    Pm10,
    Pm25,
}

impl Measurement {
    pub const ALL: [Measurement; MEASUREMENT_COUNT] = [
        Measurement::Rainfall,
        Measurement::Pressure,
        Measurement::SolarRadiation,
        Measurement::Temperature,
        Measurement::RelativeHumidity,
        Measurement::WindDirection,
        Measurement::WindSpeed,
        Measurement::SulphurDioxide,
        Measurement::NitrogenDioxide,
        Measurement::NonMethaneHydrocarbons,
        Measurement::TotalHydrocarbons,
        Measurement::Methane,
        Measurement::CarbonMonoxide,
        Measurement::NitricOxide,
        Measurement::NitrogenOxides,
        Measurement::Ozone,
        Measurement::Pm10,
        Measurement::Pm25,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name shared by the raw extract and the fact table
    pub fn column(self) -> &'static str {
        MEASUREMENT_COLUMNS[self.index()]
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Measurement::Rainfall => "Rainfall",
            Measurement::Pressure => "Atmospheric pressure",
            Measurement::SolarRadiation => "Solar radiation",
            Measurement::Temperature => "Temperature",
            Measurement::RelativeHumidity => "Relative humidity",
            Measurement::WindDirection => "Wind direction",
            Measurement::WindSpeed => "Wind speed",
            Measurement::SulphurDioxide => "SO2",
            Measurement::NitrogenDioxide => "NO2",
            Measurement::NonMethaneHydrocarbons => "Non-methane hydrocarbons",
            Measurement::TotalHydrocarbons => "Total hydrocarbons",
            Measurement::Methane => "CH4",
            Measurement::CarbonMonoxide => "CO",
            Measurement::NitricOxide => "NO",
            Measurement::NitrogenOxides => "NOx",
            Measurement::Ozone => "O3",
            Measurement::Pm10 => "PM10",
            Measurement::Pm25 => "PM2.5",
        }
    }

    pub fn is_pollutant(self) -> bool {
        self.index() >= Measurement::SulphurDioxide.index()
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The 18 nullable measurement values of one reading.
///
/// Equality is bit-exact and treats two absent values as equal, which is
/// what whole-row deduplication needs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Measurements {
    values: [Option<f64>; MEASUREMENT_COUNT],
}

impl Measurements {
    pub fn new(values: [Option<f64>; MEASUREMENT_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, measurement: Measurement) -> Option<f64> {
        self.values[measurement.index()]
    }

    pub fn set(&mut self, measurement: Measurement, value: Option<f64>) {
        self.values[measurement.index()] = value;
    }

    pub fn with(mut self, measurement: Measurement, value: f64) -> Self {
        self.set(measurement, Some(value));
        self
    }

    pub fn values(&self) -> &[Option<f64>; MEASUREMENT_COUNT] {
        &self.values
    }

    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl PartialEq for Measurements {
    fn eq(&self, other: &Self) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| opt_f64_bits(*a) == opt_f64_bits(*b))
    }
}

impl Eq for Measurements {}

impl Hash for Measurements {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in &self.values {
            opt_f64_bits(*value).hash(state);
        }
    }
}
