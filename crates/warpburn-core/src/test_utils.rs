//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::DVec3;

use crate::hardware::{
    DiagnosticSink, EngineHardware, OperatingPoint, ResourceStore, Situation, Vehicle,
};
use crate::id::ResourceId;
use crate::mixture::Propellant;
use crate::sim::{AdvanceResult, StepInputs};
use crate::simulation::{Simulation, StepContext};

// ===========================================================================
// Resource constructors
// ===========================================================================

pub fn liquid_fuel() -> ResourceId {
    ResourceId(0)
}
pub fn oxidizer() -> ResourceId {
    ResourceId(1)
}
pub fn electric_charge() -> ResourceId {
    ResourceId(2)
}
pub fn xenon() -> ResourceId {
    ResourceId(3)
}

// ===========================================================================
// Mixture constructors
// ===========================================================================

/// 0.8 liquid fuel at 1000 kg/unit + 0.2 oxidizer at 500 kg/unit.
pub fn bipropellant() -> Vec<Propellant> {
    vec![
        Propellant {
            resource: liquid_fuel(),
            ratio: 0.8,
            density: 1000.0,
        },
        Propellant {
            resource: oxidizer(),
            ratio: 0.2,
            density: 500.0,
        },
    ]
}

/// A single zero-density component.
pub fn massless_mixture() -> Vec<Propellant> {
    vec![Propellant {
        resource: electric_charge(),
        ratio: 1.0,
        density: 0.0,
    }]
}

/// Xenon plus electric charge, as an ion engine would feed.
pub fn ion_mixture() -> Vec<Propellant> {
    vec![
        Propellant {
            resource: xenon(),
            ratio: 0.1,
            density: 100.0,
        },
        Propellant {
            resource: electric_charge(),
            ratio: 1.8,
            density: 0.0,
        },
    ]
}

// ===========================================================================
// Hardware fakes
// ===========================================================================

/// An always-on operating point thrusting along +X.
pub fn operating_point(thrust: f64, specific_impulse: f64) -> OperatingPoint {
    OperatingPoint {
        max_thrust: thrust,
        thrust,
        specific_impulse,
        thrust_direction: DVec3::X,
        is_operational: true,
        is_enabled: true,
    }
}

/// Hardware pinned to one operating point.
#[derive(Debug, Clone)]
pub struct FixedHardware {
    pub point: OperatingPoint,
}

impl FixedHardware {
    pub fn new(thrust: f64, specific_impulse: f64) -> Self {
        Self {
            point: operating_point(thrust, specific_impulse),
        }
    }

    pub fn boxed(thrust: f64, specific_impulse: f64) -> Box<Self> {
        Box::new(Self::new(thrust, specific_impulse))
    }
}

impl EngineHardware for FixedHardware {
    fn operating_point(&self) -> OperatingPoint {
        self.point
    }
}

/// Hardware whose operating point can be swapped from outside the
/// simulation, for exercising the sampling cadence.
#[derive(Debug, Clone)]
pub struct SharedHardware {
    point: Rc<RefCell<OperatingPoint>>,
}

impl SharedHardware {
    /// Returns the hardware and a shared handle for mutating the point.
    pub fn new(point: OperatingPoint) -> (Self, Rc<RefCell<OperatingPoint>>) {
        let cell = Rc::new(RefCell::new(point));
        (
            Self {
                point: Rc::clone(&cell),
            },
            cell,
        )
    }
}

impl EngineHardware for SharedHardware {
    fn operating_point(&self) -> OperatingPoint {
        *self.point.borrow()
    }
}

// ===========================================================================
// Vehicle fake
// ===========================================================================

/// Scripted vehicle recording control writes and perturbations.
#[derive(Debug, Clone)]
pub struct FakeVehicle {
    pub mass: f64,
    pub situation: Situation,
    pub throttle: f64,
    /// Every value written through `set_main_throttle`, in order.
    pub throttle_writes: Vec<f64>,
    /// Every `perturb` call: deltaV vector and universal time.
    pub perturbations: Vec<(DVec3, f64)>,
}

impl FakeVehicle {
    pub fn orbiting(mass: f64) -> Self {
        Self {
            mass,
            situation: Situation::Orbital,
            throttle: 1.0,
            throttle_writes: Vec::new(),
            perturbations: Vec::new(),
        }
    }

    pub fn sub_orbital(mass: f64) -> Self {
        Self {
            situation: Situation::SubOrbital,
            ..Self::orbiting(mass)
        }
    }
}

impl Vehicle for FakeVehicle {
    fn total_mass(&self) -> f64 {
        self.mass
    }

    fn situation(&self) -> Situation {
        self.situation
    }

    fn main_throttle(&self) -> f64 {
        self.throttle
    }

    fn set_main_throttle(&mut self, throttle: f64) {
        self.throttle = throttle;
        self.throttle_writes.push(throttle);
    }

    fn perturb(&mut self, delta_v: DVec3, at_time: f64) {
        self.perturbations.push((delta_v, at_time));
    }
}

// ===========================================================================
// Store fake
// ===========================================================================

/// In-memory store with per-resource amounts.
#[derive(Debug, Default, Clone)]
pub struct FakeStore {
    amounts: HashMap<ResourceId, f64>,
    /// Every request issued against the store, in order.
    pub requests: Vec<(ResourceId, f64)>,
}

impl FakeStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: ResourceId, amount: f64) -> Self {
        self.amounts.insert(resource, amount);
        self
    }

    /// Remaining amount of a resource.
    pub fn amount(&self, resource: ResourceId) -> f64 {
        self.amounts.get(&resource).copied().unwrap_or(0.0)
    }
}

impl ResourceStore for FakeStore {
    fn request(&mut self, resource: ResourceId, amount: f64) -> f64 {
        self.requests.push((resource, amount));
        let available = self.amounts.entry(resource).or_insert(0.0);
        let granted = available.min(amount).max(0.0);
        *available -= granted;
        granted
    }
}

// ===========================================================================
// Diagnostic sink fake
// ===========================================================================

/// Sink capturing screen messages and log lines.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub screen: Vec<String>,
    pub log: Vec<String>,
}

impl DiagnosticSink for RecordingSink {
    fn screen_message(&mut self, text: &str) {
        self.screen.push(text.to_string());
    }

    fn log_line(&mut self, text: &str) {
        self.log.push(text.to_string());
    }
}

// ===========================================================================
// Step helpers
// ===========================================================================

/// Inputs for a high-resolution step of `dt` seconds.
pub fn realtime_inputs(dt: f64) -> StepInputs {
    StepInputs {
        dt,
        universal_time: 0.0,
        warp_active: false,
        infinite_propellant: false,
    }
}

/// Inputs for an accelerated step covering `dt` seconds of mission time.
pub fn warp_inputs(dt: f64) -> StepInputs {
    StepInputs {
        warp_active: true,
        ..realtime_inputs(dt)
    }
}

/// Drive one step with the given collaborators.
pub fn step(
    sim: &mut Simulation,
    vehicle: &mut FakeVehicle,
    store: &mut FakeStore,
    sink: &mut RecordingSink,
    inputs: StepInputs,
) -> AdvanceResult {
    let mut ctx = StepContext {
        vehicle,
        store,
        diagnostics: sink,
        inputs,
    };
    sim.advance(&mut ctx)
}
