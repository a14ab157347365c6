//! Runtime building model: room arena, connection graph, per-floor cell
//! grids.
//!
//! `Environment::build` compiles a [`Layout`] into the arena form the rest
//! of the engine works with — rooms and connections keyed by dense integer
//! ids, and one dense cell grid per floor with perimeter walls and door
//! openings already punched. All layout validation happens here; a
//! simulation never starts on a malformed building.

use bevy::prelude::*;
use pathfinding::prelude::dijkstra_all;
use serde::{Deserialize, Serialize};

use crate::config::{CELL_SIZE, DOOR_WIDTH};
use crate::error::ConfigError;
use crate::layout::{ConnectionSpec, Layout, RoomKind, RoomSpec};

// ---------------------------------------------------------------------------
// Ids and cell coordinates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnId(pub u32);

/// Grid cell coordinate. Cell `(i, j)` covers the half-metre square
/// `[i·0.5, i·0.5 + 0.5) × [j·0.5, j·0.5 + 0.5)`; its center sits at
/// `(i·0.5 + 0.25, j·0.5 + 0.25)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPos(pub i32, pub i32);

impl CellPos {
    pub fn from_world(x: f32, y: f32) -> Self {
        Self((x / CELL_SIZE).floor() as i32, (y / CELL_SIZE).floor() as i32)
    }

    pub fn center(self) -> (f32, f32) {
        (
            self.0 as f32 * CELL_SIZE + CELL_SIZE / 2.0,
            self.1 as f32 * CELL_SIZE + CELL_SIZE / 2.0,
        )
    }

    pub fn chebyshev(self, other: Self) -> i32 {
        (self.0 - other.0).abs().max((self.1 - other.1).abs())
    }
}

/// The eight neighbor offsets, in a fixed order so that RNG draws during
/// fire spread are reproducible.
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

// ---------------------------------------------------------------------------
// Rooms and connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub kind: RoomKind,
    pub floor: i32,
    pub center: (f32, f32),
    pub width: f32,
    pub height: f32,
    pub area: f32,
    /// Door opening cells on this room's own perimeter.
    pub door_cells: Vec<CellPos>,
    pub evacuee_count_initial: u32,
    pub evacuees_remaining: u32,
    /// Set once the room has been searched.
    pub discovered: bool,
    pub cleared: bool,
    pub cleared_tick: Option<u64>,
    /// Mean danger over the room's open cells, maintained by the hazard
    /// field.
    pub hazard: f32,
}

impl Room {
    /// Whether the room still draws responders: never searched, or searched
    /// but with evacuees left behind for pickup.
    pub fn needs_visit(&self) -> bool {
        self.kind == RoomKind::Office && (!self.cleared || self.evacuees_remaining > 0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnId,
    pub a: RoomId,
    pub b: RoomId,
    pub distance: f32,
    pub is_stair: bool,
    pub door: Option<(f32, f32)>,
}

impl Connection {
    pub fn other(&self, room: RoomId) -> RoomId {
        if self.a == room {
            self.b
        } else {
            self.a
        }
    }
}

// ---------------------------------------------------------------------------
// Cell grids
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct GridCell {
    pub room: Option<RoomId>,
    pub is_wall: bool,
}

impl GridCell {
    /// A cell agents and fire can occupy: inside a room and not a wall.
    pub fn is_open(self) -> bool {
        self.room.is_some() && !self.is_wall
    }
}

/// Dense row-major grid covering one floor's bounding box.
#[derive(Debug, Clone)]
pub struct FloorGrid {
    pub floor: i32,
    pub origin: (i32, i32),
    pub width: usize,
    pub height: usize,
    pub cells: Vec<GridCell>,
}

impl FloorGrid {
    pub fn idx(&self, pos: CellPos) -> Option<usize> {
        let dx = pos.0 - self.origin.0;
        let dy = pos.1 - self.origin.1;
        if dx < 0 || dy < 0 || dx >= self.width as i32 || dy >= self.height as i32 {
            return None;
        }
        Some(dy as usize * self.width + dx as usize)
    }

    pub fn pos(&self, idx: usize) -> CellPos {
        CellPos(
            self.origin.0 + (idx % self.width) as i32,
            self.origin.1 + (idx / self.width) as i32,
        )
    }

    pub fn get(&self, pos: CellPos) -> GridCell {
        self.idx(pos).map(|i| self.cells[i]).unwrap_or_default()
    }

    fn get_mut(&mut self, pos: CellPos) -> Option<&mut GridCell> {
        self.idx(pos).map(|i| &mut self.cells[i])
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone)]
pub struct Environment {
    pub name: String,
    pub rooms: Vec<Room>,
    pub connections: Vec<Connection>,
    /// Per-room list of (connection, neighbor room).
    adjacency: Vec<Vec<(ConnId, RoomId)>>,
    /// One grid per floor, sorted by floor number.
    pub floors: Vec<FloorGrid>,
    /// Exit rooms in ascending id order.
    pub exits: Vec<RoomId>,
    pub agent_starts: Vec<(f32, f32, i32)>,
    /// Per-room open-cell lists as (floor index, cell index), for hazard
    /// averaging and snapshots.
    room_cells: Vec<Vec<(usize, usize)>>,
}

impl Environment {
    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id.0 as usize]
    }

    pub fn room_mut(&mut self, id: RoomId) -> &mut Room {
        &mut self.rooms[id.0 as usize]
    }

    pub fn connection(&self, id: ConnId) -> &Connection {
        &self.connections[id.0 as usize]
    }

    pub fn neighbors(&self, room: RoomId) -> &[(ConnId, RoomId)] {
        &self.adjacency[room.0 as usize]
    }

    pub fn floor_index(&self, floor: i32) -> Option<usize> {
        self.floors.iter().position(|g| g.floor == floor)
    }

    pub fn grid(&self, floor_idx: usize) -> &FloorGrid {
        &self.floors[floor_idx]
    }

    pub fn room_at(&self, floor_idx: usize, pos: CellPos) -> Option<RoomId> {
        self.floors[floor_idx].get(pos).room
    }

    pub fn open_cells_of(&self, room: RoomId) -> &[(usize, usize)] {
        &self.room_cells[room.0 as usize]
    }

    pub fn total_evacuees(&self) -> u32 {
        self.rooms.iter().map(|r| r.evacuee_count_initial).sum()
    }

    pub fn remaining_evacuees(&self) -> u32 {
        self.rooms.iter().map(|r| r.evacuees_remaining).sum()
    }

    /// Offices still worth dispatching to, ascending id order.
    pub fn rooms_needing_visit(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(|r| r.needs_visit())
    }

    /// Room-graph successors for shortest-path queries, cost in
    /// centimetres.
    pub fn graph_successors(&self, room: RoomId) -> Vec<(RoomId, u32)> {
        self.adjacency[room.0 as usize]
            .iter()
            .map(|&(conn, next)| {
                let d = self.connection(conn).distance;
                (next, (d * 100.0).round().max(1.0) as u32)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn build(layout: &Layout) -> Result<Self, ConfigError> {
        if layout.rooms.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }

        let rooms = build_rooms(&layout.rooms)?;
        let lookup = |name: &str| -> Result<RoomId, ConfigError> {
            layout
                .rooms
                .iter()
                .position(|r| r.id == name)
                .map(|i| RoomId(i as u32))
                .ok_or_else(|| ConfigError::UnknownRoom(name.to_string()))
        };

        let connections = build_connections(&layout.connections, &rooms, &lookup)?;

        let mut adjacency = vec![Vec::new(); rooms.len()];
        for conn in &connections {
            adjacency[conn.a.0 as usize].push((conn.id, conn.b));
            adjacency[conn.b.0 as usize].push((conn.id, conn.a));
        }

        let exits = resolve_exits(layout, &rooms, &lookup)?;
        validate_graph(&rooms, &adjacency, &exits)?;

        let mut env = Self {
            name: layout.name.clone(),
            rooms,
            connections,
            adjacency,
            floors: Vec::new(),
            exits,
            agent_starts: layout.agent_starts.iter().map(|s| (s.x, s.y, s.floor)).collect(),
            room_cells: Vec::new(),
        };
        env.build_grids();
        env.punch_doors();
        env.collect_room_cells();
        Ok(env)
    }

    fn build_grids(&mut self) {
        let mut floors: Vec<i32> = self.rooms.iter().map(|r| r.floor).collect();
        floors.sort_unstable();
        floors.dedup();

        for floor in floors {
            let on_floor: Vec<&Room> = self.rooms.iter().filter(|r| r.floor == floor).collect();
            let min_x = on_floor.iter().map(|r| r.center.0 - r.width / 2.0).fold(f32::INFINITY, f32::min);
            let min_y = on_floor.iter().map(|r| r.center.1 - r.height / 2.0).fold(f32::INFINITY, f32::min);
            let max_x = on_floor.iter().map(|r| r.center.0 + r.width / 2.0).fold(f32::NEG_INFINITY, f32::max);
            let max_y = on_floor.iter().map(|r| r.center.1 + r.height / 2.0).fold(f32::NEG_INFINITY, f32::max);

            let origin = ((min_x / CELL_SIZE).floor() as i32, (min_y / CELL_SIZE).floor() as i32);
            let width = ((max_x / CELL_SIZE).ceil() as i32 - origin.0).max(1) as usize;
            let height = ((max_y / CELL_SIZE).ceil() as i32 - origin.1).max(1) as usize;

            let mut grid = FloorGrid {
                floor,
                origin,
                width,
                height,
                cells: vec![GridCell::default(); width * height],
            };

            // Earlier rooms win overlapping cells, so assignment order is
            // part of the layout contract.
            for room in &self.rooms {
                if room.floor != floor {
                    continue;
                }
                let (ix0, ix1, iy0, iy1) = room_span(room);
                for iy in iy0..iy1 {
                    for ix in ix0..ix1 {
                        if let Some(cell) = grid.get_mut(CellPos(ix, iy)) {
                            if cell.room.is_none() {
                                cell.room = Some(room.id);
                                cell.is_wall = room.kind.is_walled()
                                    && (ix == ix0 || ix == ix1 - 1 || iy == iy0 || iy == iy1 - 1);
                            }
                        }
                    }
                }
            }

            self.floors.push(grid);
        }
    }

    /// Open a `DOOR_WIDTH`-wide gap in the perimeter of each walled room,
    /// at the connection's door position.
    fn punch_doors(&mut self) {
        // Phase 1: derive door midpoints while everything is borrowed
        // immutably.
        let mut jobs: Vec<(RoomId, usize, (f32, f32))> = Vec::new();
        for conn in &self.connections {
            if conn.is_stair {
                continue;
            }
            let ra = &self.rooms[conn.a.0 as usize];
            let rb = &self.rooms[conn.b.0 as usize];
            if ra.floor != rb.floor {
                continue;
            }
            for (room, other) in [(ra, rb), (rb, ra)] {
                if !room.kind.is_walled() {
                    continue;
                }
                let door = conn.door.unwrap_or_else(|| derived_door(room, other));
                if let Some(floor_idx) = self.floors.iter().position(|g| g.floor == room.floor) {
                    jobs.push((room.id, floor_idx, door));
                }
            }
        }

        // Phase 2: clear the wall cells.
        let mut openings: Vec<(RoomId, CellPos)> = Vec::new();
        let reach = (DOOR_WIDTH / CELL_SIZE / 2.0).round() as i32;
        for (room_id, floor_idx, door) in jobs {
            let grid = &mut self.floors[floor_idx];
            let door_cell = CellPos::from_world(door.0, door.1);
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let pos = CellPos(door_cell.0 + dx, door_cell.1 + dy);
                    let (cx, cy) = pos.center();
                    if (cx - door.0).abs().max((cy - door.1).abs()) > DOOR_WIDTH / 2.0 {
                        continue;
                    }
                    if let Some(cell) = grid.get_mut(pos) {
                        if cell.room == Some(room_id) && cell.is_wall {
                            cell.is_wall = false;
                            openings.push((room_id, pos));
                        }
                    }
                }
            }
        }

        for (room, pos) in openings {
            self.room_mut(room).door_cells.push(pos);
        }
    }

    fn collect_room_cells(&mut self) {
        self.room_cells = vec![Vec::new(); self.rooms.len()];
        for (floor_idx, grid) in self.floors.iter().enumerate() {
            for (cell_idx, cell) in grid.cells.iter().enumerate() {
                if let Some(room) = cell.room {
                    if !cell.is_wall {
                        self.room_cells[room.0 as usize].push((floor_idx, cell_idx));
                    }
                }
            }
        }
    }
}

/// Inclusive-exclusive cell index span of a room's footprint.
fn room_span(room: &Room) -> (i32, i32, i32, i32) {
    let ix0 = ((room.center.0 - room.width / 2.0) / CELL_SIZE).floor() as i32;
    let ix1 = ((room.center.0 + room.width / 2.0) / CELL_SIZE).ceil() as i32;
    let iy0 = ((room.center.1 - room.height / 2.0) / CELL_SIZE).floor() as i32;
    let iy1 = ((room.center.1 + room.height / 2.0) / CELL_SIZE).ceil() as i32;
    (ix0, ix1, iy0, iy1)
}

/// Door midpoint when the layout does not specify one: the other room's
/// center clamped onto this room's rectangle, pushed to the nearest edge.
fn derived_door(room: &Room, other: &Room) -> (f32, f32) {
    let (x0, x1) = (room.center.0 - room.width / 2.0, room.center.0 + room.width / 2.0);
    let (y0, y1) = (room.center.1 - room.height / 2.0, room.center.1 + room.height / 2.0);
    let px = other.center.0.clamp(x0, x1);
    let py = other.center.1.clamp(y0, y1);

    // Already on the boundary when the other room lies outside this rect.
    if px == x0 || px == x1 || py == y0 || py == y1 {
        return (px, py);
    }
    let candidates = [
        (px - x0, (x0, py)),
        (x1 - px, (x1, py)),
        (py - y0, (px, y0)),
        (y1 - py, (px, y1)),
    ];
    candidates
        .iter()
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|&(_, p)| p)
        .unwrap_or((px, py))
}

fn build_rooms(specs: &[RoomSpec]) -> Result<Vec<Room>, ConfigError> {
    let mut rooms = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|other| other.id == spec.id) {
            return Err(ConfigError::DuplicateRoom(spec.id.clone()));
        }
        if spec.evacuees > 0 && spec.kind != RoomKind::Office {
            return Err(ConfigError::EvacueesOutsideOffice(
                spec.id.clone(),
                format!("{:?}", spec.kind),
                spec.evacuees,
            ));
        }
        rooms.push(Room {
            id: RoomId(i as u32),
            name: spec.id.clone(),
            kind: spec.kind,
            floor: spec.floor,
            center: (spec.x, spec.y),
            width: spec.width,
            height: spec.height,
            area: spec.area(),
            door_cells: Vec::new(),
            evacuee_count_initial: spec.evacuees,
            evacuees_remaining: spec.evacuees,
            discovered: false,
            cleared: false,
            cleared_tick: None,
            hazard: 0.0,
        });
    }
    Ok(rooms)
}

fn build_connections(
    specs: &[ConnectionSpec],
    rooms: &[Room],
    lookup: &impl Fn(&str) -> Result<RoomId, ConfigError>,
) -> Result<Vec<Connection>, ConfigError> {
    let mut connections = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        let a = lookup(&spec.from)?;
        let b = lookup(&spec.to)?;
        let (ra, rb) = (&rooms[a.0 as usize], &rooms[b.0 as usize]);
        if spec.is_stair && (ra.floor == rb.floor || ra.kind != RoomKind::Stair || rb.kind != RoomKind::Stair) {
            return Err(ConfigError::BadStair(spec.from.clone(), spec.to.clone()));
        }
        if !spec.is_stair && ra.floor != rb.floor {
            return Err(ConfigError::CrossFloorConnection(spec.from.clone(), spec.to.clone()));
        }
        let distance = spec.distance.unwrap_or_else(|| {
            let dx = ra.center.0 - rb.center.0;
            let dy = ra.center.1 - rb.center.1;
            (dx * dx + dy * dy).sqrt()
        });
        connections.push(Connection {
            id: ConnId(i as u32),
            a,
            b,
            distance,
            is_stair: spec.is_stair,
            door: spec.door,
        });
    }
    Ok(connections)
}

fn resolve_exits(
    layout: &Layout,
    rooms: &[Room],
    lookup: &impl Fn(&str) -> Result<RoomId, ConfigError>,
) -> Result<Vec<RoomId>, ConfigError> {
    let mut exits = Vec::new();
    if layout.exits.is_empty() {
        exits.extend(rooms.iter().filter(|r| r.kind == RoomKind::Exit).map(|r| r.id));
    } else {
        for name in &layout.exits {
            let id = lookup(name)?;
            if rooms[id.0 as usize].kind != RoomKind::Exit {
                return Err(ConfigError::NotAnExit(name.clone()));
            }
            exits.push(id);
        }
        exits.sort_unstable();
        exits.dedup();
    }
    if exits.is_empty() {
        return Err(ConfigError::NoExit);
    }
    Ok(exits)
}

fn validate_graph(
    rooms: &[Room],
    adjacency: &[Vec<(ConnId, RoomId)>],
    exits: &[RoomId],
) -> Result<(), ConfigError> {
    for room in rooms {
        if room.kind != RoomKind::Office {
            continue;
        }
        let hallways = adjacency[room.id.0 as usize]
            .iter()
            .filter(|&&(_, next)| rooms[next.0 as usize].kind == RoomKind::Hallway)
            .count();
        if hallways != 1 {
            return Err(ConfigError::OfficeHallway(room.name.clone(), hallways));
        }
    }

    // Connections are undirected, so reachable-from-exit is the same set as
    // can-reach-exit.
    let reachable = dijkstra_all(&exits[0], |&room: &RoomId| {
        adjacency[room.0 as usize]
            .iter()
            .map(|&(_, next)| (next, 1u32))
            .collect::<Vec<_>>()
    });
    for room in rooms {
        if room.id != exits[0] && !reachable.contains_key(&room.id) {
            return Err(ConfigError::Unreachable(room.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;

    fn env6() -> Environment {
        Environment::build(&Layout::single_floor_office(6, &[3, 3, 3, 3, 3, 2])).unwrap()
    }

    #[test]
    fn test_build_counts() {
        let env = env6();
        assert_eq!(env.rooms.len(), 8);
        assert_eq!(env.exits.len(), 1);
        assert_eq!(env.floors.len(), 1);
        assert_eq!(env.total_evacuees(), 17);
    }

    #[test]
    fn test_cell_world_roundtrip() {
        for &(x, y) in &[(0.1f32, 0.1f32), (4.9, 3.3), (-2.7, 1.9)] {
            let pos = CellPos::from_world(x, y);
            let (cx, cy) = pos.center();
            assert!((cx - x).abs() <= CELL_SIZE / 2.0 + f32::EPSILON);
            assert!((cy - y).abs() <= CELL_SIZE / 2.0 + f32::EPSILON);
            assert_eq!(CellPos::from_world(cx, cy), pos);
        }
    }

    #[test]
    fn test_office_has_perimeter_walls_and_door() {
        let env = env6();
        let office = env.rooms.iter().find(|r| r.kind == RoomKind::Office).unwrap();
        let grid = &env.floors[0];
        let (ix0, ix1, iy0, iy1) = room_span(office);

        // Corners stay walls.
        assert!(grid.get(CellPos(ix0, iy0)).is_wall);
        assert!(grid.get(CellPos(ix1 - 1, iy1 - 1)).is_wall);

        // The south wall has a 4-cell opening facing the hallway.
        assert_eq!(office.door_cells.len(), 4);
        for &pos in &office.door_cells {
            assert_eq!(pos.1, iy0);
            assert!(!grid.get(pos).is_wall);
            assert_eq!(grid.get(pos).room, Some(office.id));
        }
        // The rest of the south wall is intact.
        let open_in_row = (ix0..ix1)
            .filter(|&ix| !grid.get(CellPos(ix, iy0)).is_wall)
            .count();
        assert_eq!(open_in_row, 4);
    }

    #[test]
    fn test_hallway_and_exit_are_open() {
        let env = env6();
        for room in &env.rooms {
            if room.kind.is_walled() {
                continue;
            }
            for &(floor_idx, cell_idx) in env.open_cells_of(room.id) {
                assert!(!env.floors[floor_idx].cells[cell_idx].is_wall);
            }
            // Open rooms have no wall cells at all.
            let (ix0, ix1, iy0, iy1) = room_span(room);
            let grid = &env.floors[0];
            for iy in iy0..iy1 {
                for ix in ix0..ix1 {
                    let cell = grid.get(CellPos(ix, iy));
                    if cell.room == Some(room.id) {
                        assert!(!cell.is_wall);
                    }
                }
            }
        }
    }

    #[test]
    fn test_duplicate_room_rejected() {
        let mut layout = Layout::single_floor_office(2, &[1, 1]);
        let dup = layout.rooms[2].clone();
        layout.rooms.push(dup);
        assert!(matches!(
            Environment::build(&layout),
            Err(ConfigError::DuplicateRoom(_))
        ));
    }

    #[test]
    fn test_unknown_connection_room_rejected() {
        let mut layout = Layout::single_floor_office(2, &[1, 1]);
        layout.connections[0].from = "NOPE".into();
        assert!(matches!(
            Environment::build(&layout),
            Err(ConfigError::UnknownRoom(_))
        ));
    }

    #[test]
    fn test_orphan_room_rejected() {
        let mut layout = Layout::single_floor_office(2, &[1, 1]);
        layout.connections.retain(|c| c.to != "O0-2");
        assert!(matches!(
            Environment::build(&layout),
            Err(ConfigError::OfficeHallway(_, 0))
        ));
    }

    #[test]
    fn test_missing_exit_rejected() {
        let mut layout = Layout::single_floor_office(2, &[1, 1]);
        layout.rooms.retain(|r| r.id != "EXIT");
        layout.connections.retain(|c| c.from != "EXIT");
        assert!(matches!(Environment::build(&layout), Err(ConfigError::NoExit)));
    }

    #[test]
    fn test_evacuees_in_hallway_rejected() {
        let mut layout = Layout::single_floor_office(2, &[1, 1]);
        layout.rooms[1].evacuees = 3;
        assert!(matches!(
            Environment::build(&layout),
            Err(ConfigError::EvacueesOutsideOffice(..))
        ));
    }

    #[test]
    fn test_two_floor_build() {
        let layout = Layout::two_floor_office(3, &[1, 1, 1], &[2, 0, 1]);
        let env = Environment::build(&layout).unwrap();
        assert_eq!(env.floors.len(), 2);
        assert_eq!(env.connections.iter().filter(|c| c.is_stair).count(), 2);
        assert_eq!(env.total_evacuees(), 6);
        assert!(env.floor_index(1).is_some());
    }

    #[test]
    fn test_stair_on_same_floor_rejected() {
        let mut layout = Layout::two_floor_office(2, &[1, 1], &[1, 1]);
        for conn in &mut layout.connections {
            if conn.is_stair {
                conn.to = "SE-0".into();
                break;
            }
        }
        assert!(matches!(
            Environment::build(&layout),
            Err(ConfigError::BadStair(..))
        ));
    }
}
