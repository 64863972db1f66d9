use mw_core::EntityId;
use serde::Serialize;

use crate::spawn::GridCell;

/// What kind of simulation event occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SimEventKind {
    // Spawning
    /// A grid cell triggered a burst of spawn placements.
    SpawnEvent {
        /// The cell that triggered.
        cell: GridCell,
        /// Placements queued for instantiation.
        placements: u32,
    },
    /// A wandering creature was queued on the ring around the reference point.
    WandererQueued,
    /// Placements thrown away because the population cap was reached.
    PlacementsDropped {
        /// How many were dropped this tick.
        count: u32,
    },
    /// An entity was created and is now tracked.
    Spawned {
        /// The new entity.
        entity: EntityId,
    },
    /// A tracked entity left the despawn window and was removed.
    Despawned {
        /// The removed entity.
        entity: EntityId,
    },

    // Lifecycle
    /// An entity's timed life ran out.
    Expired {
        /// The removed entity.
        entity: EntityId,
    },

    // Custom
    /// A user-defined event.
    Custom {
        /// A label identifying the custom event type.
        label: String,
        /// The entities involved in this custom event.
        entities: Vec<EntityId>,
    },
}

impl SimEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Spawned { entity } | Self::Despawned { entity } | Self::Expired { entity } => {
                *entity == id
            }
            Self::Custom { entities, .. } => entities.contains(&id),
            Self::SpawnEvent { .. } | Self::WandererQueued | Self::PlacementsDropped { .. } => {
                false
            }
        }
    }
}

/// A record of something that happened during simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimEvent {
    /// The simulation tick when this event occurred.
    pub tick: u64,
    /// The specific kind of event that occurred.
    pub kind: SimEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl SimEvent {
    /// Create a new simulation event with the given tick, kind, and description.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given entity.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Count events matching a predicate on their kind.
    pub fn count_where(&self, predicate: impl Fn(&SimEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(&e.kind)).count()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event is stored.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
