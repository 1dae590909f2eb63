//! Throttled sampling of live engine operating parameters.
//!
//! During the accelerated regime the live physics state is expensive to
//! query, so the simulation works from a periodically refreshed sample
//! instead of polling every step. In real time the sample is refreshed
//! every step and therefore tracks the live values exactly.

use serde::{Deserialize, Serialize};

use crate::sim::Ticks;

// ---------------------------------------------------------------------------
// SampledEngineState
// ---------------------------------------------------------------------------

/// The last-sampled engine operating point.
///
/// Mutated only by [`SampledEngineState::sample`]; between samples it is the
/// stand-in for the live operating point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampledEngineState {
    /// Specific impulse, seconds.
    pub specific_impulse: f64,
    /// Persisted throttle fraction.
    pub throttle: f64,
    /// Instantaneous thrust, newtons.
    pub thrust: f64,
}

impl SampledEngineState {
    /// Overwrite all three fields from live values. Negative inputs are
    /// clamped to zero; no partially-updated state is ever observable.
    pub fn sample(&mut self, specific_impulse: f64, throttle: f64, thrust: f64) {
        *self = Self {
            specific_impulse: specific_impulse.max(0.0),
            throttle: throttle.max(0.0),
            thrust: thrust.max(0.0),
        };
    }
}

// ---------------------------------------------------------------------------
// SampleClock
// ---------------------------------------------------------------------------

/// Named periodic-sampling policy: fire exactly once every `interval` steps.
///
/// The counter advances by whole steps regardless of how much mission time
/// each step covers, so the cadence is stable across warp factors. The
/// counter resets to zero on firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleClock {
    interval: Ticks,
    elapsed: Ticks,
}

impl SampleClock {
    /// Create a clock firing every `interval` steps (clamped to at least 1).
    /// The first call to [`SampleClock::tick`] fires immediately so a fresh
    /// engine never integrates from default-initialized samples.
    pub fn new(interval: Ticks) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            elapsed: interval,
        }
    }

    /// Advance one step. Returns true when a sample is due.
    pub fn tick(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.interval {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }
}
