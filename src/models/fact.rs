use crate::models::dimension::SurrogateKey;
use crate::models::measurement::{Measurement, Measurements};
use serde::{Deserialize, Serialize};

/// Row identifier of the fact table; starts at 0
pub type FactId = u64;

/// The 21 columns that define a fact row's identity (everything except `id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactContent {
    pub tempo_key: SurrogateKey,
    pub estacao_key: SurrogateKey,
    pub localizacao_key: SurrogateKey,
    pub measurements: Measurements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub id: FactId,
    pub tempo_key: SurrogateKey,
    pub estacao_key: SurrogateKey,
    pub localizacao_key: SurrogateKey,
    pub measurements: Measurements,
}

impl FactRecord {
    pub fn new(
        id: FactId,
        tempo_key: SurrogateKey,
        estacao_key: SurrogateKey,
        localizacao_key: SurrogateKey,
        measurements: Measurements,
    ) -> Self {
        Self {
            id,
            tempo_key,
            estacao_key,
            localizacao_key,
            measurements,
        }
    }

    pub fn from_content(id: FactId, content: FactContent) -> Self {
        Self::new(
            id,
            content.tempo_key,
            content.estacao_key,
            content.localizacao_key,
            content.measurements,
        )
    }

    pub fn content(&self) -> FactContent {
        FactContent {
            tempo_key: self.tempo_key,
            estacao_key: self.estacao_key,
            localizacao_key: self.localizacao_key,
            measurements: self.measurements,
        }
    }

    pub fn measurement(&self, measurement: Measurement) -> Option<f64> {
        self.measurements.get(measurement)
    }
}
