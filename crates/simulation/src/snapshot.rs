//! Per-tick world snapshots.
//!
//! A flat, serializable view of cells, agents and rooms for visualization
//! and export harnesses. The core only builds these in memory, on request.

use serde::Serialize;

use crate::agent::{AgentId, AgentState, ResponderView};
use crate::environment::{Environment, RoomId};
use crate::hazard::FireField;
use crate::layout::RoomKind;

#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: String,
    pub kind: RoomKind,
    pub floor: i32,
    pub evacuees_remaining: u32,
    pub discovered: bool,
    pub cleared: bool,
    pub hazard: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub x: f32,
    pub y: f32,
    pub floor: i32,
    pub state: AgentState,
    pub carrying_evacuee: bool,
    pub rescued: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellSnapshot {
    pub floor: i32,
    /// Cell center, world metres.
    pub x: f32,
    pub y: f32,
    pub room: RoomId,
    pub is_wall: bool,
    pub is_burning: bool,
    pub danger: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub sim_time: f64,
    pub rooms: Vec<RoomSnapshot>,
    pub agents: Vec<AgentSnapshot>,
    pub cells: Vec<CellSnapshot>,
}

pub fn build_snapshot(
    env: &Environment,
    fire: &FireField,
    responders: &[ResponderView],
    tick: u64,
    sim_time: f64,
) -> Snapshot {
    let rooms = env
        .rooms
        .iter()
        .map(|r| RoomSnapshot {
            id: r.id,
            name: r.name.clone(),
            kind: r.kind,
            floor: r.floor,
            evacuees_remaining: r.evacuees_remaining,
            discovered: r.discovered,
            cleared: r.cleared,
            hazard: r.hazard,
        })
        .collect();

    let agent_rows = responders
        .iter()
        .map(|v| AgentSnapshot {
            id: v.id,
            x: v.pos.0,
            y: v.pos.1,
            floor: env.floors[v.floor_idx].floor,
            state: v.state,
            carrying_evacuee: v.carrying_evacuee,
            rescued: v.rescued_count,
        })
        .collect();

    let mut cells = Vec::new();
    for (floor_idx, grid) in env.floors.iter().enumerate() {
        for (idx, cell) in grid.cells.iter().enumerate() {
            let Some(room) = cell.room else { continue };
            let pos = grid.pos(idx);
            let (x, y) = pos.center();
            cells.push(CellSnapshot {
                floor: grid.floor,
                x,
                y,
                room,
                is_wall: cell.is_wall,
                is_burning: fire.is_burning(floor_idx, pos),
                danger: fire.danger_at(floor_idx, pos),
            });
        }
    }

    Snapshot { tick, sim_time, rooms, agents: agent_rows, cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HazardParams;
    use crate::layout::Layout;

    #[test]
    fn test_snapshot_covers_world_and_serializes() {
        let env = Environment::build(&Layout::single_floor_office(2, &[1, 0])).unwrap();
        let fire = FireField::new(&env, &HazardParams::default()).unwrap();
        let snap = build_snapshot(&env, &fire, &[], 3, 3.0);
        assert_eq!(snap.rooms.len(), 4);
        assert!(snap.cells.len() > 50);
        assert!(snap.cells.iter().all(|c| c.danger == 0.0));
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"tick\":3"));
    }
}
