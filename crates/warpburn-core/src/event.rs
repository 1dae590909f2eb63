//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted during the regime, resolve, and apply phases and
//! delivered in batch during bookkeeping. Each event type has its own
//! [`EventBuffer`] ring buffer with a configurable capacity, so consumers
//! that poll (telemetry aggregation, UI) can read recent history without
//! subscribing.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind. Suppressed events have zero
//! cost.

use crate::id::{EngineId, ResourceId};
use crate::regime::Regime;
use crate::sim::Ticks;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A resolved burn's deltaV was applied to the trajectory.
    BurnApplied {
        engine: EngineId,
        /// Magnitude of the applied deltaV, m/s.
        delta_v: f64,
        /// Propellant mass drawn from the vehicle, kg.
        mass_consumed: f64,
        tick: Ticks,
    },
    /// A propellant component came back empty against a positive request.
    PropellantDepleted {
        engine: EngineId,
        resource: ResourceId,
        tick: Ticks,
    },
    /// Depletion forced an exit from the accelerated regime.
    WarpExitForced { engine: EngineId, tick: Ticks },
    /// The sub-orbital safeguard zeroed the live throttle.
    SubOrbitalHold { engine: EngineId, tick: Ticks },
    /// The persisted throttle was written back to live control on the
    /// warp-exit edge.
    ThrottleRestored {
        engine: EngineId,
        throttle: f64,
        tick: Ticks,
    },
    /// The engine's regime changed.
    RegimeChanged {
        engine: EngineId,
        from: Regime,
        to: Regime,
        tick: Ticks,
    },
    /// A defensive guard skipped the engine's contribution this step.
    StepSkipped { engine: EngineId, tick: Ticks },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BurnApplied,
    PropellantDepleted,
    WarpExitForced,
    SubOrbitalHold,
    ThrottleRestored,
    RegimeChanged,
    StepSkipped,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 7;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BurnApplied { .. } => EventKind::BurnApplied,
            Event::PropellantDepleted { .. } => EventKind::PropellantDepleted,
            Event::WarpExitForced { .. } => EventKind::WarpExitForced,
            Event::SubOrbitalHold { .. } => EventKind::SubOrbitalHold,
            Event::ThrottleRestored { .. } => EventKind::ThrottleRestored,
            Event::RegimeChanged { .. } => EventKind::RegimeChanged,
            Event::StepSkipped { .. } => EventKind::StepSkipped,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer — pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    /// The total capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    /// Number of events currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Clear all events from the buffer.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only at delivery time.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

const fn empty_subscriber_array() -> [Vec<PassiveListener>; EVENT_KIND_COUNT] {
    // Cannot use Default in const context, so we build it manually.
    [
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
        Vec::new(),
    ]
}

/// The central event bus. Holds one ring buffer per event kind, subscriber
/// lists, suppression flags, and the batch pending delivery.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    /// Events emitted since the last delivery.
    pending: Vec<Event>,
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("pending", &self.pending)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per
    /// kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: empty_subscriber_array(),
            pending: Vec::new(),
            default_capacity,
        }
    }

    /// Suppress an event kind. Suppressed events are never allocated,
    /// buffered, or delivered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    /// Check if an event kind is suppressed.
    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Emit an event into the ring buffer and the pending delivery batch.
    /// No-ops if the event kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        // Lazily allocate the buffer on first emit.
        if self.buffers[idx].is_none() {
            self.buffers[idx] = Some(EventBuffer::new(self.default_capacity));
        }
        if let Some(buffer) = &mut self.buffers[idx] {
            buffer.push(event.clone());
        }
        self.pending.push(event);
    }

    /// Register a passive listener for an event kind.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.subscribers[kind.index()].push(listener);
    }

    /// Deliver all pending events to their subscribers, in emission order.
    pub fn deliver(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for event in &pending {
            for listener in &mut self.subscribers[event.kind().index()] {
                listener(event);
            }
        }
    }

    /// Iterate the retained history for one event kind, oldest first.
    pub fn events(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.buffers[kind.index()]
            .iter()
            .flat_map(|buffer| buffer.iter())
    }

    /// Number of retained events for one kind.
    pub fn event_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, |buffer| buffer.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> EngineId {
        let mut keys: SlotMap<EngineId, ()> = SlotMap::with_key();
        keys.insert(())
    }

    fn skipped(tick: Ticks) -> Event {
        Event::StepSkipped {
            engine: engine(),
            tick,
        }
    }

    #[test]
    fn ring_buffer_drops_oldest_when_full() {
        let mut buffer = EventBuffer::new(2);
        buffer.push(skipped(1));
        buffer.push(skipped(2));
        buffer.push(skipped(3));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.total_written(), 3);
        let ticks: Vec<Ticks> = buffer
            .iter()
            .map(|e| match e {
                Event::StepSkipped { tick, .. } => *tick,
                _ => panic!("unexpected event"),
            })
            .collect();
        assert_eq!(ticks, vec![2, 3]);
    }

    #[test]
    fn suppressed_kind_is_never_recorded() {
        let mut bus = EventBus::new(8);
        bus.suppress(EventKind::StepSkipped);
        bus.emit(skipped(1));
        assert_eq!(bus.event_count(EventKind::StepSkipped), 0);
    }

    #[test]
    fn delivery_reaches_subscribers_in_order() {
        let mut bus = EventBus::new(8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_passive(
            EventKind::StepSkipped,
            Box::new(move |event| {
                if let Event::StepSkipped { tick, .. } = event {
                    sink.borrow_mut().push(*tick);
                }
            }),
        );
        bus.emit(skipped(1));
        bus.emit(skipped(2));
        bus.deliver();
        assert_eq!(*seen.borrow(), vec![1, 2]);

        // Delivery drains the batch; a second call is a no-op.
        bus.deliver();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn history_survives_delivery() {
        let mut bus = EventBus::new(8);
        bus.emit(skipped(1));
        bus.deliver();
        assert_eq!(bus.event_count(EventKind::StepSkipped), 1);
    }
}
