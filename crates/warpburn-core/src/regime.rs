//! The dual-mode regime state machine.
//!
//! Each engine unit is simulated under exactly one time-advance regime at a
//! time. The controller re-evaluates the regime once per fixed step from the
//! feature toggle, the host warp signal, and the vehicle's orbital
//! situation, and reports the side effects the step pipeline must carry out.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Regime
// ---------------------------------------------------------------------------

/// Which time-advance regime an engine unit is currently simulated under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// Feature off for this engine; the step pipeline skips it entirely.
    #[default]
    Disabled,
    /// High-resolution regime: physics recomputed every step.
    RealTime,
    /// Accelerated regime: one step covers a large span of mission time.
    Warp,
    /// One-step edge leaving the accelerated regime; becomes `RealTime` on
    /// the next step.
    ExitingWarp,
}

// ---------------------------------------------------------------------------
// Inputs and decisions
// ---------------------------------------------------------------------------

/// Observations the controller needs for one step's decision.
#[derive(Debug, Clone, Copy)]
pub struct RegimeInputs {
    /// The feature toggle for this engine.
    pub enabled: bool,
    /// Host signal: accelerated time-advance currently active.
    pub warp_active: bool,
    /// The vehicle is below the threshold altitude for safe trajectory
    /// perturbation.
    pub sub_orbital: bool,
}

/// Side effects the step pipeline must carry out after a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegimeDecision {
    /// Write the persisted throttle back into live vehicle control. Fires
    /// exactly once per warp exit, on the transition edge.
    pub restore_throttle: bool,
    /// Zero the live throttle and emit the sub-orbital diagnostic. Repeats
    /// every step the condition holds.
    pub sub_orbital_hold: bool,
    /// The state changed this step.
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// RegimeController
// ---------------------------------------------------------------------------

/// Per-engine state machine deciding the active regime each fixed step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RegimeController {
    state: Regime,
}

impl RegimeController {
    pub fn new() -> Self {
        Self {
            state: Regime::Disabled,
        }
    }

    /// The currently active regime.
    pub fn state(&self) -> Regime {
        self.state
    }

    /// Advance the machine one step.
    pub fn step(&mut self, inputs: RegimeInputs) -> RegimeDecision {
        let mut decision = RegimeDecision::default();
        let before = self.state;

        self.state = if !inputs.enabled {
            Regime::Disabled
        } else {
            match self.state {
                Regime::Disabled => {
                    // Enabling mid-warp waits for the first non-warp step.
                    if inputs.warp_active {
                        Regime::Disabled
                    } else {
                        Regime::RealTime
                    }
                }
                Regime::RealTime => {
                    if inputs.warp_active {
                        if inputs.sub_orbital {
                            decision.sub_orbital_hold = true;
                            Regime::RealTime
                        } else {
                            Regime::Warp
                        }
                    } else {
                        Regime::RealTime
                    }
                }
                Regime::Warp => {
                    if inputs.warp_active {
                        Regime::Warp
                    } else {
                        decision.restore_throttle = true;
                        Regime::ExitingWarp
                    }
                }
                Regime::ExitingWarp => Regime::RealTime,
            }
        };

        decision.changed = before != self.state;
        decision
    }

    /// Depletion while accelerated: leave `Warp` for `RealTime` directly,
    /// bypassing the transition edge. Synchronous, so the exit is visible to
    /// the next step's sampling decision. Returns true if the exit happened.
    pub fn force_exit_warp(&mut self) -> bool {
        if self.state == Regime::Warp {
            self.state = Regime::RealTime;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(enabled: bool, warp_active: bool, sub_orbital: bool) -> RegimeInputs {
        RegimeInputs {
            enabled,
            warp_active,
            sub_orbital,
        }
    }

    #[test]
    fn disabled_to_real_time_when_enabled() {
        let mut ctrl = RegimeController::new();
        let decision = ctrl.step(inputs(true, false, false));
        assert_eq!(ctrl.state(), Regime::RealTime);
        assert!(decision.changed);
    }

    #[test]
    fn stays_disabled_while_feature_off() {
        let mut ctrl = RegimeController::new();
        let decision = ctrl.step(inputs(false, false, false));
        assert_eq!(ctrl.state(), Regime::Disabled);
        assert!(!decision.changed);
    }

    #[test]
    fn enabling_mid_warp_waits_for_real_time() {
        let mut ctrl = RegimeController::new();
        ctrl.step(inputs(true, true, false));
        assert_eq!(ctrl.state(), Regime::Disabled);
        ctrl.step(inputs(true, false, false));
        assert_eq!(ctrl.state(), Regime::RealTime);
    }

    #[test]
    fn real_time_to_warp_on_host_signal() {
        let mut ctrl = RegimeController::new();
        ctrl.step(inputs(true, false, false));
        let decision = ctrl.step(inputs(true, true, false));
        assert_eq!(ctrl.state(), Regime::Warp);
        assert!(decision.changed);
        assert!(!decision.sub_orbital_hold);
    }

    #[test]
    fn sub_orbital_holds_in_real_time() {
        let mut ctrl = RegimeController::new();
        ctrl.step(inputs(true, false, true));
        // The hold repeats every step the condition lasts.
        for _ in 0..3 {
            let decision = ctrl.step(inputs(true, true, true));
            assert_eq!(ctrl.state(), Regime::RealTime);
            assert!(decision.sub_orbital_hold);
        }
        // Once clear of the threshold, warp proceeds.
        ctrl.step(inputs(true, true, false));
        assert_eq!(ctrl.state(), Regime::Warp);
    }

    #[test]
    fn warp_exit_passes_through_edge_state() {
        let mut ctrl = RegimeController::new();
        ctrl.step(inputs(true, false, false));
        ctrl.step(inputs(true, true, false));
        assert_eq!(ctrl.state(), Regime::Warp);

        let edge = ctrl.step(inputs(true, false, false));
        assert_eq!(ctrl.state(), Regime::ExitingWarp);
        assert!(edge.restore_throttle);

        let settled = ctrl.step(inputs(true, false, false));
        assert_eq!(ctrl.state(), Regime::RealTime);
        assert!(!settled.restore_throttle);
    }

    #[test]
    fn any_state_drops_to_disabled() {
        let mut ctrl = RegimeController::new();
        ctrl.step(inputs(true, false, false));
        ctrl.step(inputs(true, true, false));
        assert_eq!(ctrl.state(), Regime::Warp);
        ctrl.step(inputs(false, true, false));
        assert_eq!(ctrl.state(), Regime::Disabled);
    }

    #[test]
    fn forced_exit_bypasses_edge_state() {
        let mut ctrl = RegimeController::new();
        ctrl.step(inputs(true, false, false));
        ctrl.step(inputs(true, true, false));
        assert!(ctrl.force_exit_warp());
        assert_eq!(ctrl.state(), Regime::RealTime);
        // Only meaningful from Warp.
        assert!(!ctrl.force_exit_warp());
    }
}
