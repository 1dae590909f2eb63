//! Step bookkeeping types shared across the simulation.

use serde::{Deserialize, Serialize};

/// Ticks are the atomic unit of simulation time. One tick is one fixed step
/// of the host loop regardless of how much mission time the step covers.
pub type Ticks = u64;

/// Mutable simulation state tracked by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    /// Current tick counter. Incremented by 1 for each step.
    pub tick: Ticks,
}

impl SimState {
    /// Create a new simulation state starting at tick 0.
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-provided inputs for one fixed step.
#[derive(Debug, Clone, Copy)]
pub struct StepInputs {
    /// Mission time covered by this step, seconds. Large under the
    /// accelerated regime, one physics frame otherwise.
    pub dt: f64,
    /// Absolute universal time at which trajectory perturbations apply,
    /// seconds.
    pub universal_time: f64,
    /// Host signal: the vehicle is running under the accelerated
    /// time-advance regime.
    pub warp_active: bool,
    /// Cheat override: every propellant demand is granted without
    /// consulting the store.
    pub infinite_propellant: bool,
}

/// Result of a `Simulation::advance` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Engines whose deltaV was applied to the trajectory this step.
    pub burns_applied: u32,
    /// Engines skipped this step by a defensive integration guard.
    pub steps_skipped: u32,
    /// Set when propellant depletion forced an exit from the accelerated
    /// regime. The host should abandon warp when it sees this.
    pub warp_exit_requested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_state_starts_at_zero() {
        let state = SimState::new();
        assert_eq!(state.tick, 0);
    }

    #[test]
    fn advance_result_defaults_clear() {
        let result = AdvanceResult::default();
        assert_eq!(result.burns_applied, 0);
        assert_eq!(result.steps_skipped, 0);
        assert!(!result.warp_exit_requested);
    }
}
