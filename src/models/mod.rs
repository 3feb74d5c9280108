pub mod dimension;
pub mod fact;
pub mod measurement;
pub mod raw;

pub use dimension::{
    CoordinateKey, Dimension, LocationDimension, StationDimension, SurrogateKey, TimeDimension,
};
pub use fact::{FactContent, FactId, FactRecord};
pub use measurement::{Measurement, Measurements, MEASUREMENT_COUNT};
pub use raw::RawReading;

/// The four persisted tables of the star schema, held fully in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarSchema {
    pub time: Vec<TimeDimension>,
    pub location: Vec<LocationDimension>,
    pub station: Vec<StationDimension>,
    pub fact: Vec<FactRecord>,
}

impl StarSchema {
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
            && self.location.is_empty()
            && self.station.is_empty()
            && self.fact.is_empty()
    }
}
