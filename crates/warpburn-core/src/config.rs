//! Simulation configuration surface.

use serde::{Deserialize, Serialize};

use crate::sim::Ticks;

/// Default sampling period under the accelerated regime, steps.
pub const DEFAULT_SAMPLE_INTERVAL: Ticks = 50;

/// Recognized configuration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master toggle for persistent burn simulation.
    pub persistent_enabled: bool,
    /// Whether zero-density propellants are requested from the store.
    pub request_massless: bool,
    /// Whether propellants with mass are requested from the store.
    pub request_massed: bool,
    /// Sampling period under the accelerated regime, in steps.
    pub sample_interval: Ticks,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            persistent_enabled: true,
            request_massless: true,
            request_massed: true,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}
