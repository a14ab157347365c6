//! Stairwell occupancy.
//!
//! Each stair connection admits one agent at a time. Contenders join a
//! FIFO queue; releasing the slot hands it straight to the queue head,
//! which resumes on its own next step.

use std::collections::{BTreeMap, VecDeque};

use bevy::prelude::*;

use crate::agent::AgentId;
use crate::environment::{ConnId, Environment};

#[derive(Debug, Clone, Default)]
pub struct StairSlot {
    pub occupant: Option<AgentId>,
    pub queue: VecDeque<AgentId>,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct StairOccupancy {
    slots: BTreeMap<ConnId, StairSlot>,
}

impl StairOccupancy {
    pub fn for_env(env: &Environment) -> Self {
        let slots = env
            .connections
            .iter()
            .filter(|c| c.is_stair)
            .map(|c| (c.id, StairSlot::default()))
            .collect();
        Self { slots }
    }

    /// Take the slot if it is free or already reserved for this agent.
    pub fn try_acquire(&mut self, conn: ConnId, agent: AgentId) -> bool {
        let Some(slot) = self.slots.get_mut(&conn) else {
            return false;
        };
        match slot.occupant {
            None => {
                slot.occupant = Some(agent);
                true
            }
            Some(holder) => holder == agent,
        }
    }

    pub fn enqueue(&mut self, conn: ConnId, agent: AgentId) {
        if let Some(slot) = self.slots.get_mut(&conn) {
            if !slot.queue.contains(&agent) {
                slot.queue.push_back(agent);
            }
        }
    }

    /// Free the slot, reserving it for the queue head when one is waiting.
    pub fn release(&mut self, conn: ConnId) {
        if let Some(slot) = self.slots.get_mut(&conn) {
            slot.occupant = slot.queue.pop_front();
        }
    }

    pub fn remove_queued(&mut self, conn: ConnId, agent: AgentId) {
        if let Some(slot) = self.slots.get_mut(&conn) {
            slot.queue.retain(|&a| a != agent);
        }
    }

    pub fn occupant(&self, conn: ConnId) -> Option<AgentId> {
        self.slots.get(&conn).and_then(|s| s.occupant)
    }

    pub fn queue_len(&self, conn: ConnId) -> usize {
        self.slots.get(&conn).map_or(0, |s| s.queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy() -> StairOccupancy {
        let mut slots = BTreeMap::new();
        slots.insert(ConnId(0), StairSlot::default());
        StairOccupancy { slots }
    }

    #[test]
    fn test_acquire_release_cycle() {
        let mut stairs = occupancy();
        assert!(stairs.try_acquire(ConnId(0), AgentId(0)));
        assert!(!stairs.try_acquire(ConnId(0), AgentId(1)));
        // Re-acquire by the holder is idempotent.
        assert!(stairs.try_acquire(ConnId(0), AgentId(0)));
        stairs.release(ConnId(0));
        assert!(stairs.try_acquire(ConnId(0), AgentId(1)));
    }

    #[test]
    fn test_release_promotes_fifo_head() {
        let mut stairs = occupancy();
        assert!(stairs.try_acquire(ConnId(0), AgentId(0)));
        stairs.enqueue(ConnId(0), AgentId(2));
        stairs.enqueue(ConnId(0), AgentId(1));
        stairs.release(ConnId(0));
        // First queued wins, not lowest id.
        assert_eq!(stairs.occupant(ConnId(0)), Some(AgentId(2)));
        assert_eq!(stairs.queue_len(ConnId(0)), 1);
        stairs.release(ConnId(0));
        assert_eq!(stairs.occupant(ConnId(0)), Some(AgentId(1)));
        stairs.release(ConnId(0));
        assert_eq!(stairs.occupant(ConnId(0)), None);
    }

    #[test]
    fn test_enqueue_is_deduplicated() {
        let mut stairs = occupancy();
        stairs.enqueue(ConnId(0), AgentId(1));
        stairs.enqueue(ConnId(0), AgentId(1));
        assert_eq!(stairs.queue_len(ConnId(0)), 1);
    }

    #[test]
    fn test_remove_queued_agent() {
        let mut stairs = occupancy();
        assert!(stairs.try_acquire(ConnId(0), AgentId(0)));
        stairs.enqueue(ConnId(0), AgentId(1));
        stairs.remove_queued(ConnId(0), AgentId(1));
        stairs.release(ConnId(0));
        assert_eq!(stairs.occupant(ConnId(0)), None);
    }
}
