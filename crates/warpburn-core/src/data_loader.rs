//! Data-driven configuration loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization of the
//! configuration surface and per-engine propellant tables defined in data
//! files.

use crate::config::SimConfig;
use crate::id::ResourceId;
use crate::mixture::{MixtureError, Propellant, PropellantMixture};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("mixture error in engine '{name}': {source}")]
    Mixture { name: String, source: MixtureError },
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level simulation data for JSON deserialization.
#[derive(Debug, serde::Deserialize)]
pub struct SimData {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default)]
    pub engines: Vec<EngineData>,
}

/// JSON representation of one engine's propellant table.
#[derive(Debug, serde::Deserialize)]
pub struct EngineData {
    pub name: String,
    pub propellants: Vec<PropellantData>,
}

/// JSON representation of a propellant component.
#[derive(Debug, serde::Deserialize)]
pub struct PropellantData {
    pub resource: u32,
    pub ratio: f64,
    #[serde(default)]
    pub density: f64,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load simulation data from a JSON string.
pub fn load_sim_json(json: &str) -> Result<SimData, DataLoadError> {
    Ok(serde_json::from_str(json)?)
}

/// Load simulation data from JSON bytes.
pub fn load_sim_json_bytes(bytes: &[u8]) -> Result<SimData, DataLoadError> {
    Ok(serde_json::from_slice(bytes)?)
}

impl EngineData {
    /// Component list ready for engine registration.
    pub fn components(&self) -> Vec<Propellant> {
        self.propellants
            .iter()
            .map(|p| Propellant {
                resource: ResourceId(p.resource),
                ratio: p.ratio,
                density: p.density,
            })
            .collect()
    }

    /// Build this engine's mixture, naming the engine on failure.
    pub fn build_mixture(&self) -> Result<PropellantMixture, DataLoadError> {
        PropellantMixture::build(self.components()).map_err(|source| DataLoadError::Mixture {
            name: self.name.clone(),
            source,
        })
    }
}
