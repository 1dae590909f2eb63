//! The simulation orchestrator: owns per-engine state and runs the
//! six-phase step pipeline.
//!
//! # Architecture
//!
//! The `Simulation` owns, per engine unit (SoA, keyed by [`EngineId`]):
//! - The injected [`EngineHardware`] source
//! - A [`PropellantMixture`] (absent when construction failed; the engine
//!   then never leaves the disabled regime)
//! - A [`SampledEngineState`] and its [`SampleClock`]
//! - A [`RegimeController`]
//!
//! The vehicle, the propellant store, and the diagnostic sink are external
//! collaborators handed in per step through [`StepContext`].
//!
//! # Six-Phase Pipeline
//!
//! Each `advance()` runs:
//! 1. **Regime** -- re-evaluate each engine's regime state machine; apply
//!    throttle writes on edges and the sub-orbital safeguard.
//! 2. **Sample** -- refresh sampled engine state where due (every step in
//!    real time, on the sample clock under warp).
//! 3. **Integrate** -- compute pending burns from the sampled state.
//! 4. **Resolve** -- issue per-component store requests; flag depletion.
//! 5. **Apply** -- perturb the trajectory on success; force warp exit on
//!    depletion.
//! 6. **Bookkeeping** -- advance the tick counter; deliver buffered events.
//!
//! The phase order implements the per-step happens-before chain
//! (sample -> integrate -> resolve -> perturb) and must not be reordered.

use glam::DVec3;
use slotmap::{SecondaryMap, SlotMap};

use crate::config::SimConfig;
use crate::demand::{self, DemandPolicy, DemandResult};
use crate::event::{Event, EventBus};
use crate::hardware::{DiagnosticSink, EngineHardware, ResourceStore, Situation, Vehicle};
use crate::id::EngineId;
use crate::integrator::{self, BurnDelta};
use crate::mixture::{Propellant, PropellantMixture};
use crate::regime::{Regime, RegimeController, RegimeInputs};
use crate::sampling::{SampleClock, SampledEngineState};
use crate::sim::{AdvanceResult, SimState, StepInputs};

// ---------------------------------------------------------------------------
// Step context and telemetry
// ---------------------------------------------------------------------------

/// Collaborators and host inputs for one fixed step.
pub struct StepContext<'a> {
    pub vehicle: &'a mut dyn Vehicle,
    pub store: &'a mut dyn ResourceStore,
    pub diagnostics: &'a mut dyn DiagnosticSink,
    pub inputs: StepInputs,
}

/// Read-only display values for one engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    /// Last-sampled thrust, newtons.
    pub thrust: f64,
    /// Last-sampled specific impulse, seconds.
    pub specific_impulse: f64,
    /// Persisted throttle fraction.
    pub throttle: f64,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// The core simulation. Hosts any number of engine units and advances them
/// through the six-phase step pipeline.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,

    /// Simulation state (tick counter).
    pub sim_state: SimState,

    // -- Per-engine state (SoA, keyed by EngineId) --
    /// Injected hardware source for each engine.
    hardware: SlotMap<EngineId, Box<dyn EngineHardware>>,

    /// Propellant mixture for each engine. Absent when construction failed.
    mixtures: SecondaryMap<EngineId, PropellantMixture>,

    /// Last-sampled operating values for each engine.
    samples: SecondaryMap<EngineId, SampledEngineState>,

    /// Thrust direction captured at sample time, unit length.
    directions: SecondaryMap<EngineId, DVec3>,

    /// Sampling cadence under the accelerated regime.
    clocks: SecondaryMap<EngineId, SampleClock>,

    /// Regime state machine for each engine.
    regimes: SecondaryMap<EngineId, RegimeController>,

    // -- Per-step scratch (cleared each step) --
    /// Engines held by the sub-orbital safeguard this step.
    holds: SecondaryMap<EngineId, ()>,

    /// Burns computed by the integrate phase, consumed by resolve/apply.
    pending_burns: SecondaryMap<EngineId, BurnDelta>,

    /// Demand outcomes from the resolve phase.
    resolved: SecondaryMap<EngineId, DemandResult>,

    /// Typed event bus for simulation events.
    pub event_bus: EventBus,
}

impl Simulation {
    /// Create a new simulation with the given configuration.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            sim_state: SimState::new(),
            hardware: SlotMap::with_key(),
            mixtures: SecondaryMap::new(),
            samples: SecondaryMap::new(),
            directions: SecondaryMap::new(),
            clocks: SecondaryMap::new(),
            regimes: SecondaryMap::new(),
            holds: SecondaryMap::new(),
            pending_burns: SecondaryMap::new(),
            resolved: SecondaryMap::new(),
            event_bus: EventBus::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Engine management
    // -----------------------------------------------------------------------

    /// Register an engine unit with its hardware source and propellant
    /// components.
    ///
    /// An invalid component list is fatal to that engine's persistent
    /// simulation only: the engine is still registered, but it never leaves
    /// the disabled regime. Construction failure is silent beyond the
    /// feature not activating.
    pub fn add_engine(
        &mut self,
        hardware: Box<dyn EngineHardware>,
        components: Vec<Propellant>,
    ) -> EngineId {
        let id = self.hardware.insert(hardware);
        self.samples.insert(id, SampledEngineState::default());
        self.directions.insert(id, DVec3::ZERO);
        self.clocks
            .insert(id, SampleClock::new(self.config.sample_interval));
        self.regimes.insert(id, RegimeController::new());
        if let Ok(mixture) = PropellantMixture::build(components) {
            self.mixtures.insert(id, mixture);
        }
        id
    }

    /// Remove an engine unit and all its state.
    pub fn remove_engine(&mut self, id: EngineId) {
        self.hardware.remove(id);
        self.mixtures.remove(id);
        self.samples.remove(id);
        self.directions.remove(id);
        self.clocks.remove(id);
        self.regimes.remove(id);
        self.holds.remove(id);
        self.pending_burns.remove(id);
        self.resolved.remove(id);
    }

    /// Number of registered engine units.
    pub fn engine_count(&self) -> usize {
        self.hardware.len()
    }

    /// Whether the engine has a valid mixture and participates in the
    /// simulation.
    pub fn is_simulated(&self, id: EngineId) -> bool {
        self.mixtures.contains_key(id)
    }

    /// The engine's current regime.
    pub fn regime(&self, id: EngineId) -> Option<Regime> {
        self.regimes.get(id).map(|controller| controller.state())
    }

    /// The engine's mixture, when construction succeeded.
    pub fn mixture(&self, id: EngineId) -> Option<&PropellantMixture> {
        self.mixtures.get(id)
    }

    /// Read-only display values from the sampled state.
    pub fn telemetry(&self, id: EngineId) -> Option<Telemetry> {
        self.samples.get(id).map(|sample| Telemetry {
            thrust: sample.thrust,
            specific_impulse: sample.specific_impulse,
            throttle: sample.throttle,
        })
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// The active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the configuration. A changed sampling interval resets every
    /// engine's sample clock.
    pub fn set_config(&mut self, config: SimConfig) {
        if config.sample_interval != self.config.sample_interval {
            for (_, clock) in &mut self.clocks {
                *clock = SampleClock::new(config.sample_interval);
            }
        }
        self.config = config;
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance the simulation by one fixed step.
    ///
    /// Every failure is handled within the step: an engine that cannot
    /// contribute is skipped, never aborting the other engines or the
    /// caller's loop.
    pub fn advance(&mut self, ctx: &mut StepContext<'_>) -> AdvanceResult {
        let mut result = AdvanceResult::default();

        self.phase_regime(ctx);
        self.phase_sample(ctx);
        self.phase_integrate(ctx, &mut result);
        self.phase_resolve(ctx);
        self.phase_apply(ctx, &mut result);
        self.phase_bookkeeping();

        result
    }

    // -----------------------------------------------------------------------
    // Phase 1: Regime
    // -----------------------------------------------------------------------

    fn phase_regime(&mut self, ctx: &mut StepContext<'_>) {
        let warp_active = ctx.inputs.warp_active;
        let sub_orbital = ctx.vehicle.situation() == Situation::SubOrbital;
        let tick = self.sim_state.tick;

        self.holds.clear();

        let ids: Vec<EngineId> = self.hardware.keys().collect();
        for id in ids {
            let enabled = self.config.persistent_enabled && self.mixtures.contains_key(id);
            let Some(controller) = self.regimes.get_mut(id) else {
                continue;
            };
            let before = controller.state();
            let decision = controller.step(RegimeInputs {
                enabled,
                warp_active,
                sub_orbital,
            });
            let after = controller.state();

            if decision.changed {
                self.event_bus.emit(Event::RegimeChanged {
                    engine: id,
                    from: before,
                    to: after,
                    tick,
                });
            }
            if decision.sub_orbital_hold {
                ctx.vehicle.set_main_throttle(0.0);
                ctx.diagnostics
                    .screen_message("Thrust held: vehicle is sub-orbital");
                ctx.diagnostics.log_line(&format!(
                    "engine {id:?}: sub-orbital hold, throttle zeroed at tick {tick}"
                ));
                self.holds.insert(id, ());
                self.event_bus
                    .emit(Event::SubOrbitalHold { engine: id, tick });
            }
            if decision.restore_throttle {
                let throttle = self.samples.get(id).map_or(0.0, |sample| sample.throttle);
                ctx.vehicle.set_main_throttle(throttle);
                self.event_bus.emit(Event::ThrottleRestored {
                    engine: id,
                    throttle,
                    tick,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Sample
    // -----------------------------------------------------------------------

    fn phase_sample(&mut self, ctx: &mut StepContext<'_>) {
        let ids: Vec<EngineId> = self.hardware.keys().collect();
        for id in ids {
            let Some(regime) = self.regimes.get(id).map(|c| c.state()) else {
                continue;
            };
            let due = match regime {
                Regime::RealTime => true,
                Regime::Warp => self.clocks.get_mut(id).is_some_and(|clock| clock.tick()),
                Regime::Disabled | Regime::ExitingWarp => false,
            };
            if !due {
                continue;
            }
            let Some(source) = self.hardware.get(id) else {
                continue;
            };
            let point = source.operating_point();

            // The live throttle is only read in real time; under warp the
            // persisted value carries forward unchanged.
            let throttle = match regime {
                Regime::RealTime => ctx.vehicle.main_throttle(),
                _ => self.samples.get(id).map_or(0.0, |sample| sample.throttle),
            };
            let thrust = if point.is_operational && point.is_enabled {
                point.thrust.min(point.max_thrust)
            } else {
                0.0
            };
            if let Some(sample) = self.samples.get_mut(id) {
                sample.sample(point.specific_impulse, throttle, thrust);
            }
            self.directions
                .insert(id, point.thrust_direction.normalize_or_zero());
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Integrate
    // -----------------------------------------------------------------------

    fn phase_integrate(&mut self, ctx: &mut StepContext<'_>, result: &mut AdvanceResult) {
        self.pending_burns.clear();

        let dt = ctx.inputs.dt;
        let tick = self.sim_state.tick;
        let mass = ctx.vehicle.total_mass();

        let ids: Vec<EngineId> = self.hardware.keys().collect();
        for id in ids {
            let Some(regime) = self.regimes.get(id).map(|c| c.state()) else {
                continue;
            };
            if !matches!(regime, Regime::RealTime | Regime::Warp) {
                continue;
            }
            // Sub-orbital vehicles are excluded from perturbation integration.
            if self.holds.contains_key(id) {
                continue;
            }
            let Some(mixture) = self.mixtures.get(id) else {
                continue;
            };
            let Some(sample) = self.samples.get(id) else {
                continue;
            };
            let direction = self.directions.get(id).copied().unwrap_or(DVec3::ZERO);

            match integrator::integrate(
                mass,
                dt,
                sample.thrust,
                sample.specific_impulse,
                direction,
                mixture.average_density(),
            ) {
                Ok(delta) => {
                    if delta.delta_v != DVec3::ZERO || delta.mass_demand > 0.0 {
                        self.pending_burns.insert(id, delta);
                    }
                }
                Err(err) => {
                    result.steps_skipped += 1;
                    ctx.diagnostics
                        .log_line(&format!("engine {id:?}: step skipped: {err}"));
                    self.event_bus.emit(Event::StepSkipped { engine: id, tick });
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Resolve
    // -----------------------------------------------------------------------

    fn phase_resolve(&mut self, ctx: &mut StepContext<'_>) {
        self.resolved.clear();

        let policy = DemandPolicy {
            request_massless: self.config.request_massless,
            request_massed: self.config.request_massed,
            infinite_propellant: ctx.inputs.infinite_propellant,
        };

        let ids: Vec<EngineId> = self.pending_burns.keys().collect();
        for id in ids {
            let Some(burn) = self.pending_burns.get(id) else {
                continue;
            };
            let Some(mixture) = self.mixtures.get(id) else {
                continue;
            };
            let outcome = demand::resolve(mixture, burn.mass_demand, policy, ctx.store);
            self.resolved.insert(id, outcome);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 5: Apply
    // -----------------------------------------------------------------------

    fn phase_apply(&mut self, ctx: &mut StepContext<'_>, result: &mut AdvanceResult) {
        let tick = self.sim_state.tick;

        let ids: Vec<EngineId> = self.pending_burns.keys().collect();
        for id in ids {
            let Some(burn) = self.pending_burns.get(id).copied() else {
                continue;
            };
            let (depleted, depleted_resource) = match self.resolved.get(id) {
                Some(outcome) => (outcome.depleted, outcome.first_depleted()),
                None => continue,
            };

            if depleted {
                if let Some(resource) = depleted_resource {
                    self.event_bus.emit(Event::PropellantDepleted {
                        engine: id,
                        resource,
                        tick,
                    });
                }
                let throttle = self.samples.get(id).map_or(0.0, |sample| sample.throttle);
                let in_warp = self
                    .regimes
                    .get(id)
                    .is_some_and(|c| c.state() == Regime::Warp);
                if in_warp && throttle > 0.0 {
                    if let Some(controller) = self.regimes.get_mut(id) {
                        if controller.force_exit_warp() {
                            result.warp_exit_requested = true;
                            self.event_bus.emit(Event::RegimeChanged {
                                engine: id,
                                from: Regime::Warp,
                                to: Regime::RealTime,
                                tick,
                            });
                            self.event_bus
                                .emit(Event::WarpExitForced { engine: id, tick });
                            ctx.diagnostics
                                .screen_message("Propellant depleted: dropping out of warp");
                            ctx.diagnostics.log_line(&format!(
                                "engine {id:?}: propellant depleted at tick {tick}, warp exit forced"
                            ));
                        }
                    }
                }
                // No perturbation this step.
                continue;
            }

            ctx.vehicle.perturb(burn.delta_v, ctx.inputs.universal_time);
            result.burns_applied += 1;
            self.event_bus.emit(Event::BurnApplied {
                engine: id,
                delta_v: burn.delta_v.length(),
                mass_consumed: burn.mass_consumed,
                tick,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Phase 6: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.sim_state.tick += 1;
        self.event_bus.deliver();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::test_utils::*;

    #[test]
    fn invalid_mixture_never_activates() {
        let mut sim = Simulation::new(SimConfig::default());
        let engine = sim.add_engine(FixedHardware::boxed(1_000.0, 300.0), Vec::new());
        assert!(!sim.is_simulated(engine));

        let mut vehicle = FakeVehicle::orbiting(10_000.0);
        let mut store = FakeStore::empty().with(liquid_fuel(), 100.0);
        let mut sink = RecordingSink::default();
        for _ in 0..3 {
            step(&mut sim, &mut vehicle, &mut store, &mut sink, realtime_inputs(0.02));
        }
        assert_eq!(sim.regime(engine), Some(Regime::Disabled));
        assert!(vehicle.perturbations.is_empty());
        assert!(store.requests.is_empty());
    }

    #[test]
    fn real_time_step_samples_and_burns() {
        let mut sim = Simulation::new(SimConfig::default());
        let engine = sim.add_engine(FixedHardware::boxed(1_000.0, 300.0), bipropellant());

        let mut vehicle = FakeVehicle::orbiting(10_000.0);
        vehicle.throttle = 0.75;
        let mut store = FakeStore::empty()
            .with(liquid_fuel(), 100.0)
            .with(oxidizer(), 100.0);
        let mut sink = RecordingSink::default();

        let result = step(&mut sim, &mut vehicle, &mut store, &mut sink, realtime_inputs(0.02));
        assert_eq!(result.burns_applied, 1);
        assert_eq!(sim.regime(engine), Some(Regime::RealTime));
        assert_eq!(vehicle.perturbations.len(), 1);
        assert_eq!(store.requests.len(), 2);

        let telemetry = sim.telemetry(engine).unwrap();
        assert_eq!(telemetry.thrust, 1_000.0);
        assert_eq!(telemetry.specific_impulse, 300.0);
        assert_eq!(telemetry.throttle, 0.75);
    }

    #[test]
    fn warp_sampling_follows_the_clock() {
        let config = SimConfig {
            sample_interval: 3,
            ..SimConfig::default()
        };
        let mut sim = Simulation::new(config);
        let (hardware, cell) = SharedHardware::new(operating_point(1_000.0, 300.0));
        let engine = sim.add_engine(Box::new(hardware), bipropellant());

        let mut vehicle = FakeVehicle::orbiting(100_000.0);
        let mut store = FakeStore::empty()
            .with(liquid_fuel(), 1.0e9)
            .with(oxidizer(), 1.0e9);
        let mut sink = RecordingSink::default();

        // One real-time step to leave Disabled and take the live sample.
        step(&mut sim, &mut vehicle, &mut store, &mut sink, realtime_inputs(0.02));
        assert_eq!(sim.telemetry(engine).unwrap().thrust, 1_000.0);

        // Hardware changes while warped; the sample must hold until the
        // clock fires.
        cell.borrow_mut().thrust = 500.0;
        cell.borrow_mut().max_thrust = 500.0;

        // Entering warp: the clock was freshly created, so the first warp
        // tick fires and picks up the change.
        step(&mut sim, &mut vehicle, &mut store, &mut sink, warp_inputs(60.0));
        assert_eq!(sim.telemetry(engine).unwrap().thrust, 500.0);

        cell.borrow_mut().thrust = 250.0;
        cell.borrow_mut().max_thrust = 250.0;

        // The next two warp steps reuse the stale sample.
        step(&mut sim, &mut vehicle, &mut store, &mut sink, warp_inputs(60.0));
        step(&mut sim, &mut vehicle, &mut store, &mut sink, warp_inputs(60.0));
        assert_eq!(sim.telemetry(engine).unwrap().thrust, 500.0);

        // Third warp step after the firing: due again.
        step(&mut sim, &mut vehicle, &mut store, &mut sink, warp_inputs(60.0));
        assert_eq!(sim.telemetry(engine).unwrap().thrust, 250.0);
    }

    #[test]
    fn non_operational_hardware_samples_zero_thrust() {
        let mut sim = Simulation::new(SimConfig::default());
        let mut point = operating_point(1_000.0, 300.0);
        point.is_operational = false;
        let engine = sim.add_engine(Box::new(FixedHardware { point }), bipropellant());

        let mut vehicle = FakeVehicle::orbiting(10_000.0);
        let mut store = FakeStore::empty().with(liquid_fuel(), 100.0).with(oxidizer(), 100.0);
        let mut sink = RecordingSink::default();

        let result = step(&mut sim, &mut vehicle, &mut store, &mut sink, realtime_inputs(0.02));
        assert_eq!(result.burns_applied, 0);
        assert_eq!(sim.telemetry(engine).unwrap().thrust, 0.0);
        assert!(vehicle.perturbations.is_empty());
        assert!(store.requests.is_empty());
    }

    #[test]
    fn disabled_feature_parks_every_engine() {
        let mut sim = Simulation::new(SimConfig {
            persistent_enabled: false,
            ..SimConfig::default()
        });
        let engine = sim.add_engine(FixedHardware::boxed(1_000.0, 300.0), bipropellant());

        let mut vehicle = FakeVehicle::orbiting(10_000.0);
        let mut store = FakeStore::empty().with(liquid_fuel(), 100.0).with(oxidizer(), 100.0);
        let mut sink = RecordingSink::default();

        step(&mut sim, &mut vehicle, &mut store, &mut sink, realtime_inputs(0.02));
        assert_eq!(sim.regime(engine), Some(Regime::Disabled));
        assert!(vehicle.perturbations.is_empty());
    }

    #[test]
    fn mass_guard_skips_the_step_and_logs() {
        let mut sim = Simulation::new(SimConfig::default());
        let engine = sim.add_engine(FixedHardware::boxed(1_000.0, 300.0), bipropellant());

        // 10 kg vehicle cannot survive an hour of this burn.
        let mut vehicle = FakeVehicle::orbiting(10.0);
        let mut store = FakeStore::empty().with(liquid_fuel(), 100.0).with(oxidizer(), 100.0);
        let mut sink = RecordingSink::default();

        step(&mut sim, &mut vehicle, &mut store, &mut sink, realtime_inputs(0.02));
        let result = step(&mut sim, &mut vehicle, &mut store, &mut sink, warp_inputs(3_600.0));

        assert_eq!(result.steps_skipped, 1);
        assert_eq!(vehicle.perturbations.len(), 1); // only the real-time step
        assert_eq!(sim.event_bus.event_count(EventKind::StepSkipped), 1);
        assert!(sink.log.iter().any(|line| line.contains("step skipped")));
        assert!(sim.regime(engine).is_some());
    }

    #[test]
    fn removed_engine_stops_contributing() {
        let mut sim = Simulation::new(SimConfig::default());
        let engine = sim.add_engine(FixedHardware::boxed(1_000.0, 300.0), bipropellant());
        assert_eq!(sim.engine_count(), 1);

        sim.remove_engine(engine);
        assert_eq!(sim.engine_count(), 0);

        let mut vehicle = FakeVehicle::orbiting(10_000.0);
        let mut store = FakeStore::empty().with(liquid_fuel(), 100.0).with(oxidizer(), 100.0);
        let mut sink = RecordingSink::default();
        let result = step(&mut sim, &mut vehicle, &mut store, &mut sink, realtime_inputs(0.02));
        assert_eq!(result.burns_applied, 0);
    }

    #[test]
    fn changing_sample_interval_resets_clocks() {
        let mut sim = Simulation::new(SimConfig::default());
        sim.add_engine(FixedHardware::boxed(1_000.0, 300.0), bipropellant());
        let mut config = *sim.config();
        config.sample_interval = 7;
        sim.set_config(config);
        assert_eq!(sim.config().sample_interval, 7);
    }
}
