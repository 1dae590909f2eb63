//! Collaborator interfaces: engine hardware, the vehicle/orbit model, the
//! propellant store, and the diagnostic sink.
//!
//! The core is constructed with these rather than locating collaborators in
//! a shared registry. Multi-mode engines stand behind [`EngineHardware`],
//! whose implementor resolves the active physical configuration and hands
//! the core exactly one operating point per query -- the core never learns
//! how many modes exist.

use glam::DVec3;

use crate::id::ResourceId;

// ---------------------------------------------------------------------------
// Engine hardware
// ---------------------------------------------------------------------------

/// A snapshot of the live engine hardware, read once per sample tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    /// Maximum rated thrust, newtons.
    pub max_thrust: f64,
    /// Thrust currently produced, newtons.
    pub thrust: f64,
    /// Live specific impulse, seconds.
    pub specific_impulse: f64,
    /// Unit vector along which thrust acts, in the frame
    /// [`Vehicle::perturb`] expects.
    pub thrust_direction: DVec3,
    /// The hardware can produce thrust (ignited, not flamed out).
    pub is_operational: bool,
    /// The hardware is switched on.
    pub is_enabled: bool,
}

/// Read-only access to one engine's hardware.
///
/// Implementors must answer meaningfully under the accelerated regime too:
/// the returned point is the engine's operating point at the persisted
/// throttle, even while the host's own physics is not running the engine.
pub trait EngineHardware: std::fmt::Debug {
    /// The currently active operating point.
    fn operating_point(&self) -> OperatingPoint;
}

// ---------------------------------------------------------------------------
// Vehicle / orbit model
// ---------------------------------------------------------------------------

/// The vehicle's orbital situation. `SubOrbital` is the distinguished value
/// below the threshold altitude where trajectory perturbation is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Situation {
    Landed,
    SubOrbital,
    Orbital,
    Escaping,
}

/// The external vehicle/orbit model. The core only reads mass and situation
/// and perturbs the trajectory through this interface; it never owns them.
pub trait Vehicle {
    /// Current total vehicle mass, kg.
    fn total_mass(&self) -> f64;

    /// Current orbital situation.
    fn situation(&self) -> Situation;

    /// Live main throttle fraction. Read in real time only.
    fn main_throttle(&self) -> f64;

    /// Write the live main throttle. Written by the core exactly once per
    /// warp exit, on the transition edge, and when the sub-orbital
    /// safeguard zeroes the throttle.
    fn set_main_throttle(&mut self, throttle: f64);

    /// Apply a velocity change to the trajectory at the given universal
    /// time.
    fn perturb(&mut self, delta_v: DVec3, at_time: f64);
}

// ---------------------------------------------------------------------------
// Resource store
// ---------------------------------------------------------------------------

/// The shared external propellant store. Mutated by many engines; the core
/// issues at most one withdrawal request per component per engine per step.
pub trait ResourceStore {
    /// Withdraw up to `amount` of a resource; returns the granted amount.
    fn request(&mut self, resource: ResourceId, amount: f64) -> f64;
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Host-facing diagnostics: a short-lived on-screen message plus a durable
/// log line.
pub trait DiagnosticSink {
    /// Show a transient message to the user.
    fn screen_message(&mut self, text: &str);

    /// Append a durable log line.
    fn log_line(&mut self, text: &str);
}
