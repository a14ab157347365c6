//! Responder entities and their components.
//!
//! Each responder is a spawned `Entity` carrying the component set below;
//! the simulator's systems drive them through ECS queries. Update order is
//! still ascending [`AgentId`] — systems sort the query results by id
//! before stepping, which keeps the determinism contract independent of
//! archetype iteration order. Evacuees are not entities; they are counters
//! owned by rooms.

use bevy::prelude::*;
use serde::Serialize;

use crate::config::ARRIVAL_EPSILON;
use crate::environment::{CellPos, ConnId, RoomId};
use crate::pathfind::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AgentId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Moving,
    Searching,
    Dragging,
    Escaping,
    Queued,
    Dead,
    Safe,
}

impl AgentState {
    /// Dead and Safe agents never update again.
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Dead | AgentState::Safe)
    }
}

// ---------------------------------------------------------------------------
// Core components
// ---------------------------------------------------------------------------

/// Marker for responder entities, carrying the stable update-order id.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Responder(pub AgentId);

/// World position plus the floor grid and room the responder occupies.
#[derive(Component, Debug, Clone, Copy)]
pub struct Position {
    pub pos: (f32, f32),
    pub floor_idx: usize,
    pub room: RoomId,
}

impl Position {
    pub fn cell(&self) -> CellPos {
        CellPos::from_world(self.pos.0, self.pos.1)
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct ResponderStateComp(pub AgentState);

/// Committed route and progress along it.
#[derive(Component, Debug, Clone, Default)]
pub struct PathCache {
    pub route: Option<Route>,
    pub leg_index: usize,
    pub waypoint_index: usize,
    /// Set when the route ahead turned lethal; triggers a replan next tick.
    pub needs_replan: bool,
}

impl PathCache {
    pub fn set(&mut self, route: Route) {
        self.route = Some(route);
        self.leg_index = 0;
        self.waypoint_index = 0;
        self.needs_replan = false;
    }

    pub fn clear(&mut self) {
        self.route = None;
        self.leg_index = 0;
        self.waypoint_index = 0;
        self.needs_replan = false;
    }
}

/// Target room and any evacuee being escorted.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Assignment {
    pub target_room: Option<RoomId>,
    pub carrying_evacuee: bool,
    /// Room the carried evacuee came from. Set iff carrying.
    pub source_room: Option<RoomId>,
}

/// Stairwell interaction: the slot held or waited for.
#[derive(Component, Debug, Clone, Copy)]
pub struct StairClimb {
    pub queued: Option<ConnId>,
    pub occupying: Option<ConnId>,
    pub progress: f32,
    /// State to resume once a queued stair frees up.
    pub resume_state: AgentState,
}

impl Default for StairClimb {
    fn default() -> Self {
        Self { queued: None, occupying: None, progress: 0.0, resume_state: AgentState::Idle }
    }
}

/// Per-state timers: time spent in the current state, and the remaining
/// duration of a timed action such as a room search.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ActionTimer {
    pub time_in_state: f32,
    pub action_remaining: f32,
}

/// Mission statistics accumulated over the run.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct SweepStats {
    pub distance_traveled: f32,
    pub hazard_exposure: f32,
    pub rescued: u32,
    pub rooms_searched: u32,
}

/// Everything a responder entity spawns with.
#[derive(Bundle)]
pub struct ResponderBundle {
    pub responder: Responder,
    pub position: Position,
    pub state: ResponderStateComp,
    pub path: PathCache,
    pub assignment: Assignment,
    pub stairs: StairClimb,
    pub timer: ActionTimer,
    pub stats: SweepStats,
}

impl ResponderBundle {
    pub fn new(id: AgentId, pos: (f32, f32), floor_idx: usize, room: RoomId) -> Self {
        Self {
            responder: Responder(id),
            position: Position { pos, floor_idx, room },
            state: ResponderStateComp(AgentState::Idle),
            path: PathCache::default(),
            assignment: Assignment::default(),
            stairs: StairClimb::default(),
            timer: ActionTimer::default(),
            stats: SweepStats::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Mutable view for the state-machine helpers
// ---------------------------------------------------------------------------

/// Borrow of one responder's components, assembled from a query row so the
/// state-machine helpers can work with a single handle.
pub struct ResponderMut<'a> {
    pub id: AgentId,
    pub pos: &'a mut Position,
    pub state: &'a mut ResponderStateComp,
    pub path: &'a mut PathCache,
    pub assignment: &'a mut Assignment,
    pub stairs: &'a mut StairClimb,
    pub timer: &'a mut ActionTimer,
    pub stats: &'a mut SweepStats,
}

impl ResponderMut<'_> {
    pub fn state(&self) -> AgentState {
        self.state.0
    }

    pub fn set_state(&mut self, state: AgentState) {
        if self.state.0 != state {
            self.state.0 = state;
            self.timer.time_in_state = 0.0;
        }
    }

    pub fn cell(&self) -> CellPos {
        self.pos.cell()
    }

    /// Move toward `target`, spending from `dist_budget` (metres). Returns
    /// true when the target is reached (within [`ARRIVAL_EPSILON`]).
    pub fn move_towards(&mut self, target: (f32, f32), dist_budget: &mut f32) -> bool {
        let dx = target.0 - self.pos.pos.0;
        let dy = target.1 - self.pos.pos.1;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist <= ARRIVAL_EPSILON {
            self.pos.pos = target;
            return true;
        }
        if *dist_budget <= 0.0 {
            return false;
        }
        let step = dist_budget.min(dist);
        self.pos.pos.0 += dx / dist * step;
        self.pos.pos.1 += dy / dist * step;
        self.stats.distance_traveled += step;
        *dist_budget -= step;
        if dist - step <= ARRIVAL_EPSILON {
            self.pos.pos = target;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Read-only flat view
// ---------------------------------------------------------------------------

/// Flat copy of one responder's components, sorted collections of which
/// feed snapshots, results and invariant checks.
#[derive(Debug, Clone)]
pub struct ResponderView {
    pub id: AgentId,
    pub pos: (f32, f32),
    pub floor_idx: usize,
    pub room: RoomId,
    pub state: AgentState,
    pub resume_state: AgentState,
    pub target_room: Option<RoomId>,
    pub carrying_evacuee: bool,
    pub source_room: Option<RoomId>,
    pub queued_stair: Option<ConnId>,
    pub occupying_stair: Option<ConnId>,
    pub stair_progress: f32,
    pub time_in_state: f32,
    pub action_time_remaining: f32,
    pub distance_traveled: f32,
    pub hazard_exposure: f32,
    pub rescued_count: u32,
    pub rooms_searched: u32,
}

impl ResponderView {
    pub fn from_parts(
        responder: &Responder,
        pos: &Position,
        state: &ResponderStateComp,
        assignment: &Assignment,
        stairs: &StairClimb,
        timer: &ActionTimer,
        stats: &SweepStats,
    ) -> Self {
        Self {
            id: responder.0,
            pos: pos.pos,
            floor_idx: pos.floor_idx,
            room: pos.room,
            state: state.0,
            resume_state: stairs.resume_state,
            target_room: assignment.target_room,
            carrying_evacuee: assignment.carrying_evacuee,
            source_room: assignment.source_room,
            queued_stair: stairs.queued,
            occupying_stair: stairs.occupying,
            stair_progress: stairs.progress,
            time_in_state: timer.time_in_state,
            action_time_remaining: timer.action_remaining,
            distance_traveled: stats.distance_traveled,
            hazard_exposure: stats.hazard_exposure,
            rescued_count: stats.rescued,
            rooms_searched: stats.rooms_searched,
        }
    }
}
