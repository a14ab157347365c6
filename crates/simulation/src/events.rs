//! Simulation event stream.
//!
//! Events are the engine's observable output besides the final results:
//! an append-only log, ordered by (tick, emitting agent, emission order).
//! The harness may drain it incrementally; the full log stays available
//! for result aggregation.

use bevy::prelude::*;
use serde::Serialize;

use crate::agent::AgentId;
use crate::environment::RoomId;
use crate::results::TerminationReason;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An idle agent committed to a target and a route.
    AgentMove { target: RoomId, escape: bool },
    /// An agent reached the end of its route.
    AgentArrive,
    RoomSearchStart { service_time: f32 },
    RoomCleared { evacuees_found: u32 },
    EvacueeFound { count: u32 },
    EvacueeRescued { source_room: RoomId, priority: f32 },
    /// An agent is waiting for a stairwell to free up.
    AgentQueued,
    AgentDied { danger: f32, burning: bool },
    SimulationEnd { reason: TerminationReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimEvent {
    pub tick: u64,
    pub sim_time: f64,
    pub agent: Option<AgentId>,
    pub room: Option<RoomId>,
    pub kind: EventKind,
}

/// Append-only event log with a drain cursor for incremental consumers.
#[derive(Resource, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    drained: usize,
}

impl EventLog {
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    pub fn all(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events appended since the last drain.
    pub fn drain_new(&mut self) -> Vec<SimEvent> {
        let new = self.events[self.drained..].to_vec();
        self.drained = self.events.len();
        new
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tick: u64) -> SimEvent {
        SimEvent {
            tick,
            sim_time: tick as f64,
            agent: Some(AgentId(0)),
            room: None,
            kind: EventKind::AgentArrive,
        }
    }

    #[test]
    fn test_drain_cursor_advances() {
        let mut log = EventLog::default();
        log.push(event(0));
        log.push(event(1));
        assert_eq!(log.drain_new().len(), 2);
        assert_eq!(log.drain_new().len(), 0);
        log.push(event(2));
        let new = log.drain_new();
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].tick, 2);
        // The full log is still intact.
        assert_eq!(log.all().len(), 3);
    }

    #[test]
    fn test_event_serializes() {
        let json = serde_json::to_string(&event(5)).unwrap();
        assert!(json.contains("agent_arrive"));
    }
}
