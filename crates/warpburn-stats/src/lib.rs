//! Burn statistics module for the warpburn core.
//!
//! Tracks per-engine deltaV, propellant consumption, and incident counts
//! over configurable tick windows. Listens to core events (`BurnApplied`,
//! `PropellantDepleted`, `WarpExitForced`, `SubOrbitalHold`, `StepSkipped`)
//! and aggregates them into rolling metrics.
//!
//! # Usage
//!
//! ```ignore
//! let mut stats = BurnStats::new(StatsConfig::default());
//! // Feed events each tick:
//! stats.process_event(&event);
//! // Advance the tick counter:
//! stats.end_tick(current_tick);
//! // Query metrics:
//! let rate = stats.burn_rate(engine);
//! ```

use std::collections::HashMap;

use warpburn_core::event::Event;
use warpburn_core::id::EngineId;
use warpburn_core::sim::Ticks;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the statistics module.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Window size in ticks for rolling averages.
    pub window_size: usize,
    /// Maximum number of historical rate snapshots retained per engine.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer — historical rate snapshots
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of f64 values for trend analysis.
///
/// When full, the oldest entry is overwritten. Iterates oldest-to-newest.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a new ring buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            data: vec![0.0; capacity],
            head: 0,
            len: 0,
        }
    }

    /// Push a value, overwriting the oldest entry if at capacity.
    pub fn push(&mut self, value: f64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    /// Number of values currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total capacity.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The most recently pushed value, if any.
    pub fn latest(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let idx = if self.head == 0 {
            self.capacity() - 1
        } else {
            self.head - 1
        };
        Some(self.data[idx])
    }

    /// Collect all stored values into a Vec, oldest to newest.
    pub fn to_vec(&self) -> Vec<f64> {
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        (0..self.len)
            .map(|offset| self.data[(start + offset) % self.capacity()])
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Rolling window
// ---------------------------------------------------------------------------

/// A rolling window accumulator over the most recent N ticks.
///
/// Per-tick totals live in a ring buffer; `current` accumulates the
/// in-progress tick until [`commit`](Self::commit) is called at end-of-tick.
/// Queries include both committed ticks and the in-progress tick.
#[derive(Debug, Clone)]
struct RollingWindow {
    tick_totals: Vec<f64>,
    write_pos: usize,
    committed_total: f64,
    current: f64,
    window_size: usize,
    committed_count: usize,
}

impl RollingWindow {
    fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "RollingWindow size must be > 0");
        Self {
            tick_totals: vec![0.0; window_size],
            write_pos: 0,
            committed_total: 0.0,
            current: 0.0,
            window_size,
            committed_count: 0,
        }
    }

    /// Accumulate a value for the current (in-progress) tick.
    fn add(&mut self, value: f64) {
        self.current += value;
    }

    /// Commit the current tick into the ring buffer and prepare for the
    /// next. If the buffer is full, the oldest tick is evicted.
    fn commit(&mut self) {
        if self.committed_count == self.window_size {
            self.committed_total -= self.tick_totals[self.write_pos];
        }
        self.tick_totals[self.write_pos] = self.current;
        self.committed_total += self.current;
        self.current = 0.0;
        self.write_pos = (self.write_pos + 1) % self.window_size;
        if self.committed_count < self.window_size {
            self.committed_count += 1;
        }
    }

    /// Running total over the window, including the in-progress tick.
    fn total(&self) -> f64 {
        self.committed_total + self.current
    }

    /// Rolling average per tick, including the in-progress tick.
    fn rate(&self) -> f64 {
        let effective_count = if self.current != 0.0 {
            self.committed_count + 1
        } else {
            self.committed_count
        };
        if effective_count == 0 {
            return 0.0;
        }
        self.total() / effective_count as f64
    }
}

// ---------------------------------------------------------------------------
// Per-engine statistics
// ---------------------------------------------------------------------------

/// Per-engine burn statistics.
#[derive(Debug, Clone)]
struct EngineStats {
    /// Rolling deltaV applied, m/s per tick.
    delta_v: RollingWindow,
    /// Rolling propellant mass consumed, kg per tick.
    mass_consumed: RollingWindow,
    /// Historical deltaV rate snapshots.
    delta_v_history: RingBuffer,
    /// Lifetime totals.
    total_delta_v: f64,
    total_mass_consumed: f64,
    total_burns: u64,
    depletions: u64,
    warp_exits_forced: u64,
    sub_orbital_holds: u64,
    steps_skipped: u64,
}

impl EngineStats {
    fn new(window_size: usize, history_capacity: usize) -> Self {
        Self {
            delta_v: RollingWindow::new(window_size),
            mass_consumed: RollingWindow::new(window_size),
            delta_v_history: RingBuffer::new(history_capacity),
            total_delta_v: 0.0,
            total_mass_consumed: 0.0,
            total_burns: 0,
            depletions: 0,
            warp_exits_forced: 0,
            sub_orbital_holds: 0,
            steps_skipped: 0,
        }
    }

    fn record_burn(&mut self, delta_v: f64, mass_consumed: f64) {
        self.delta_v.add(delta_v);
        self.mass_consumed.add(mass_consumed);
        self.total_delta_v += delta_v;
        self.total_mass_consumed += mass_consumed;
        self.total_burns += 1;
    }

    /// End-of-tick accounting: snapshot the rate, advance the windows.
    fn end_tick(&mut self) {
        self.delta_v_history.push(self.delta_v.rate());
        self.delta_v.commit();
        self.mass_consumed.commit();
    }
}

// ---------------------------------------------------------------------------
// BurnStats — main module struct
// ---------------------------------------------------------------------------

/// Main burn statistics aggregator.
///
/// Accepts events via [`process_event`](BurnStats::process_event), advances
/// time via [`end_tick`](BurnStats::end_tick), and exposes per-engine and
/// fleet-wide metrics through getter methods.
#[derive(Debug)]
pub struct BurnStats {
    config: StatsConfig,
    engines: HashMap<EngineId, EngineStats>,
    /// Fleet-wide deltaV window across all engines.
    fleet_delta_v: RollingWindow,
    /// Current tick (set by end_tick).
    current_tick: Ticks,
}

impl BurnStats {
    /// Create a new burn stats tracker with the given configuration.
    pub fn new(config: StatsConfig) -> Self {
        let fleet_delta_v = RollingWindow::new(config.window_size);
        Self {
            config,
            engines: HashMap::new(),
            fleet_delta_v,
            current_tick: 0,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// The tick most recently passed to [`end_tick`](Self::end_tick).
    pub fn current_tick(&self) -> Ticks {
        self.current_tick
    }

    fn engine_stats(&mut self, engine: EngineId) -> &mut EngineStats {
        let window = self.config.window_size;
        let history = self.config.history_capacity;
        self.engines
            .entry(engine)
            .or_insert_with(|| EngineStats::new(window, history))
    }

    /// Process one core event.
    pub fn process_event(&mut self, event: &Event) {
        match event {
            Event::BurnApplied {
                engine,
                delta_v,
                mass_consumed,
                ..
            } => {
                self.engine_stats(*engine).record_burn(*delta_v, *mass_consumed);
                self.fleet_delta_v.add(*delta_v);
            }
            Event::PropellantDepleted { engine, .. } => {
                self.engine_stats(*engine).depletions += 1;
            }
            Event::WarpExitForced { engine, .. } => {
                self.engine_stats(*engine).warp_exits_forced += 1;
            }
            Event::SubOrbitalHold { engine, .. } => {
                self.engine_stats(*engine).sub_orbital_holds += 1;
            }
            Event::StepSkipped { engine, .. } => {
                self.engine_stats(*engine).steps_skipped += 1;
            }
            Event::ThrottleRestored { .. } | Event::RegimeChanged { .. } => {}
        }
    }

    /// End-of-tick accounting. Call once per simulation step, after all of
    /// the step's events have been processed.
    pub fn end_tick(&mut self, tick: Ticks) {
        for stats in self.engines.values_mut() {
            stats.end_tick();
        }
        self.fleet_delta_v.commit();
        self.current_tick = tick;
    }

    // -----------------------------------------------------------------------
    // Per-engine queries
    // -----------------------------------------------------------------------

    /// Rolling deltaV applied per tick over the window, m/s.
    pub fn burn_rate(&self, engine: EngineId) -> f64 {
        self.engines.get(&engine).map_or(0.0, |s| s.delta_v.rate())
    }

    /// Rolling propellant mass consumed per tick over the window, kg.
    pub fn consumption_rate(&self, engine: EngineId) -> f64 {
        self.engines
            .get(&engine)
            .map_or(0.0, |s| s.mass_consumed.rate())
    }

    /// Lifetime deltaV applied by this engine, m/s.
    pub fn total_delta_v(&self, engine: EngineId) -> f64 {
        self.engines.get(&engine).map_or(0.0, |s| s.total_delta_v)
    }

    /// Lifetime propellant mass consumed by this engine, kg.
    pub fn total_mass_consumed(&self, engine: EngineId) -> f64 {
        self.engines
            .get(&engine)
            .map_or(0.0, |s| s.total_mass_consumed)
    }

    /// Number of burns this engine has applied.
    pub fn burn_count(&self, engine: EngineId) -> u64 {
        self.engines.get(&engine).map_or(0, |s| s.total_burns)
    }

    /// Number of depletion incidents for this engine.
    pub fn depletion_count(&self, engine: EngineId) -> u64 {
        self.engines.get(&engine).map_or(0, |s| s.depletions)
    }

    /// Number of forced warp exits for this engine.
    pub fn forced_exit_count(&self, engine: EngineId) -> u64 {
        self.engines.get(&engine).map_or(0, |s| s.warp_exits_forced)
    }

    /// Number of sub-orbital holds for this engine.
    pub fn hold_count(&self, engine: EngineId) -> u64 {
        self.engines.get(&engine).map_or(0, |s| s.sub_orbital_holds)
    }

    /// Number of guard-skipped steps for this engine.
    pub fn skip_count(&self, engine: EngineId) -> u64 {
        self.engines.get(&engine).map_or(0, |s| s.steps_skipped)
    }

    /// Historical per-tick deltaV rates, oldest to newest.
    pub fn burn_rate_history(&self, engine: EngineId) -> Vec<f64> {
        self.engines
            .get(&engine)
            .map_or_else(Vec::new, |s| s.delta_v_history.to_vec())
    }

    // -----------------------------------------------------------------------
    // Fleet-wide queries
    // -----------------------------------------------------------------------

    /// Rolling fleet-wide deltaV applied per tick over the window, m/s.
    pub fn fleet_burn_rate(&self) -> f64 {
        self.fleet_delta_v.rate()
    }

    /// Number of engines that have produced any statistics.
    pub fn tracked_engine_count(&self) -> usize {
        self.engines.len()
    }
}
