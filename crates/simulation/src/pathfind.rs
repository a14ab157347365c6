//! Grid pathfinding and route construction.
//!
//! A\* runs on the half-metre cell grid of a single floor, 8-connected,
//! with Chebyshev-distance heuristic and a danger surcharge on risky cells.
//! The open heap orders nodes by (f, h, raster id), so equal-cost frontiers
//! expand in one platform-independent order and replanning is exactly
//! reproducible.
//!
//! Cross-floor requests are stitched on the room graph: walk to the
//! stairwell, traverse the stair connection, continue on the next floor.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use pathfinding::prelude::dijkstra;

use crate::config::{CELL_SIZE, DANGER_COST_WEIGHT, SNAP_RADIUS};
use crate::environment::{CellPos, ConnId, Environment, NEIGHBORS_8, RoomId};
use crate::hazard::FireField;

/// Cost of one straight step, in milli-metres.
const STRAIGHT_MM: u32 = (CELL_SIZE * 1000.0) as u32;
/// Cost of one diagonal step (√2 · cell), in milli-metres.
const DIAGONAL_MM: u32 = 707;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Leg {
    /// Cell-by-cell waypoints on one floor.
    Walk { floor_idx: usize, cells: Vec<CellPos> },
    /// A stair connection between two stairwell rooms.
    Stair {
        conn: ConnId,
        enter_room: RoomId,
        exit_room: RoomId,
        to_floor_idx: usize,
        distance: f32,
    },
}

#[derive(Debug, Clone)]
pub struct Route {
    pub target: RoomId,
    pub legs: Vec<Leg>,
}

impl Route {
    /// Total length in metres, for nearest-exit comparisons.
    pub fn length_m(&self) -> f32 {
        self.legs
            .iter()
            .map(|leg| match leg {
                Leg::Walk { cells, .. } => cells.len().saturating_sub(1) as f32 * CELL_SIZE,
                Leg::Stair { distance, .. } => *distance,
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Grid A*
// ---------------------------------------------------------------------------

fn traversable(
    env: &Environment,
    fire: &FireField,
    floor_idx: usize,
    pos: CellPos,
    avoid_danger: bool,
    threshold: f32,
) -> bool {
    if !env.grid(floor_idx).get(pos).is_open() || fire.is_burning(floor_idx, pos) {
        return false;
    }
    !(avoid_danger && fire.danger_at(floor_idx, pos) > threshold)
}

/// Nearest usable cell within `SNAP_RADIUS` Chebyshev rings, or `None`.
/// Scan order inside a ring is fixed, so snapping is deterministic.
pub fn nearest_open_cell(
    env: &Environment,
    fire: &FireField,
    floor_idx: usize,
    pos: CellPos,
) -> Option<CellPos> {
    let usable = |p: CellPos| {
        env.grid(floor_idx).get(p).is_open() && !fire.is_burning(floor_idx, p)
    };
    if usable(pos) {
        return Some(pos);
    }
    for radius in 1..=SNAP_RADIUS {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs().max(dy.abs()) != radius {
                    continue;
                }
                let candidate = CellPos(pos.0 + dx, pos.1 + dy);
                if usable(candidate) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// A\* from one world position to another on a single floor.
///
/// Returns the ordered cell centers, or `None` when no path survives the
/// wall/burning/danger constraints.
pub fn find_grid_path(
    env: &Environment,
    fire: &FireField,
    floor_idx: usize,
    start_world: (f32, f32),
    goal_world: (f32, f32),
    avoid_danger: bool,
    threshold: f32,
) -> Option<Vec<CellPos>> {
    let grid = env.grid(floor_idx);
    let start = nearest_open_cell(env, fire, floor_idx, CellPos::from_world(start_world.0, start_world.1))?;
    let goal = nearest_open_cell(env, fire, floor_idx, CellPos::from_world(goal_world.0, goal_world.1))?;
    if start == goal {
        return Some(vec![start]);
    }

    let n = grid.width * grid.height;
    let start_idx = grid.idx(start)? as u32;
    let goal_idx = grid.idx(goal)? as u32;

    let h = |idx: u32| -> u32 {
        let pos = grid.pos(idx as usize);
        pos.chebyshev(goal) as u32 * STRAIGHT_MM
    };

    let mut g = vec![u32::MAX; n];
    let mut came_from = vec![u32::MAX; n];
    let mut closed = vec![false; n];
    let mut open: BinaryHeap<Reverse<(u32, u32, u32)>> = BinaryHeap::new();

    g[start_idx as usize] = 0;
    open.push(Reverse((h(start_idx), h(start_idx), start_idx)));

    while let Some(Reverse((_, _, current))) = open.pop() {
        if closed[current as usize] {
            continue;
        }
        closed[current as usize] = true;

        if current == goal_idx {
            let mut path = vec![grid.pos(current as usize)];
            let mut cursor = current;
            while came_from[cursor as usize] != u32::MAX {
                cursor = came_from[cursor as usize];
                path.push(grid.pos(cursor as usize));
            }
            path.reverse();
            return Some(path);
        }

        let pos = grid.pos(current as usize);
        for (dx, dy) in NEIGHBORS_8 {
            let npos = CellPos(pos.0 + dx, pos.1 + dy);
            if !traversable(env, fire, floor_idx, npos, avoid_danger, threshold) {
                continue;
            }
            let nidx = match grid.idx(npos) {
                Some(i) => i as u32,
                None => continue,
            };
            if closed[nidx as usize] {
                continue;
            }
            let step = if dx != 0 && dy != 0 { DIAGONAL_MM } else { STRAIGHT_MM };
            let penalty = if avoid_danger {
                (fire.danger_at(floor_idx, npos) * DANGER_COST_WEIGHT * 1000.0) as u32
            } else {
                0
            };
            let tentative = g[current as usize].saturating_add(step + penalty);
            if tentative < g[nidx as usize] {
                g[nidx as usize] = tentative;
                came_from[nidx as usize] = current;
                let hn = h(nidx);
                open.push(Reverse((tentative + hn, hn, nidx)));
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Route planning
// ---------------------------------------------------------------------------

/// Plan a full route from an agent position to a target room, stitching
/// stair traversals when the target lies on another floor.
pub fn plan_route(
    env: &Environment,
    fire: &FireField,
    start_floor_idx: usize,
    start_pos: (f32, f32),
    start_room: RoomId,
    target: RoomId,
    avoid_danger: bool,
    threshold: f32,
) -> Option<Route> {
    let target_room = env.room(target);
    let target_floor_idx = env.floor_index(target_room.floor)?;

    if target_floor_idx == start_floor_idx {
        let cells = find_grid_path(
            env,
            fire,
            start_floor_idx,
            start_pos,
            target_room.center,
            avoid_danger,
            threshold,
        )?;
        return Some(Route {
            target,
            legs: vec![Leg::Walk { floor_idx: start_floor_idx, cells }],
        });
    }

    // Cross-floor: shortest room-graph path, cut at stair edges.
    let (room_path, _) = dijkstra(
        &start_room,
        |&room| env.graph_successors(room),
        |&room| room == target,
    )?;

    let mut legs = Vec::new();
    let mut pos = start_pos;
    let mut floor_idx = start_floor_idx;

    for pair in room_path.windows(2) {
        let (here, next) = (pair[0], pair[1]);
        let stair = env
            .neighbors(here)
            .iter()
            .find(|&&(conn, other)| other == next && env.connection(conn).is_stair)
            .map(|&(conn, _)| conn);
        let Some(conn) = stair else { continue };

        let enter = env.room(here);
        let exit = env.room(next);
        let cells = find_grid_path(env, fire, floor_idx, pos, enter.center, avoid_danger, threshold)?;
        legs.push(Leg::Walk { floor_idx, cells });

        let to_floor_idx = env.floor_index(exit.floor)?;
        legs.push(Leg::Stair {
            conn,
            enter_room: here,
            exit_room: next,
            to_floor_idx,
            distance: env.connection(conn).distance,
        });
        pos = exit.center;
        floor_idx = to_floor_idx;
    }

    let cells = find_grid_path(
        env,
        fire,
        floor_idx,
        pos,
        target_room.center,
        avoid_danger,
        threshold,
    )?;
    legs.push(Leg::Walk { floor_idx, cells });
    Some(Route { target, legs })
}

/// Route to the closest reachable exit. Exits are tried in ascending
/// straight-line Manhattan order (ties by id), first routable exit wins.
pub fn nearest_exit_route(
    env: &Environment,
    fire: &FireField,
    floor_idx: usize,
    pos: (f32, f32),
    room: RoomId,
    threshold: f32,
) -> Option<Route> {
    let mut exits: Vec<RoomId> = env.exits.clone();
    exits.sort_by(|&a, &b| {
        let da = manhattan(pos, env.room(a).center);
        let db = manhattan(pos, env.room(b).center);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });
    exits
        .into_iter()
        .find_map(|exit| plan_route(env, fire, floor_idx, pos, room, exit, true, threshold))
}

pub fn manhattan(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HazardParams;
    use crate::config::IgnitionPoint;
    use crate::layout::Layout;

    fn world() -> (Environment, FireField) {
        let env = Environment::build(&Layout::single_floor_office(6, &[3, 3, 3, 3, 3, 2])).unwrap();
        let fire = FireField::new(&env, &HazardParams { enabled: false, ..HazardParams::default() }).unwrap();
        (env, fire)
    }

    #[test]
    fn test_straight_hallway_path() {
        let (env, fire) = world();
        let path = find_grid_path(&env, &fire, 0, (0.5, 1.0), (20.0, 1.0), true, 0.8).unwrap();
        assert!(path.len() > 2);
        assert_eq!(path[0], CellPos::from_world(0.5, 1.0));
        let last = *path.last().unwrap();
        assert_eq!(last.chebyshev(CellPos::from_world(20.0, 1.0)), 0);
        // Consecutive waypoints stay 8-adjacent.
        for pair in path.windows(2) {
            assert_eq!(pair[0].chebyshev(pair[1]), 1);
        }
    }

    #[test]
    fn test_path_enters_office_through_door() {
        let (env, fire) = world();
        // Hallway to the center of office O0-3 (x in [10,15]).
        let path = find_grid_path(&env, &fire, 0, (-1.5, 1.0), (12.5, 4.0), true, 0.8).unwrap();
        let office = env.rooms.iter().find(|r| r.name == "O0-3").unwrap();
        let door_row: Vec<&CellPos> = path
            .iter()
            .filter(|p| office.door_cells.contains(p))
            .collect();
        assert!(!door_row.is_empty(), "path must pass a door cell");
    }

    #[test]
    fn test_identical_queries_identical_paths() {
        let (env, fire) = world();
        let a = find_grid_path(&env, &fire, 0, (-1.5, 1.0), (27.5, 4.0), true, 0.8).unwrap();
        let b = find_grid_path(&env, &fire, 0, (-1.5, 1.0), (27.5, 4.0), true, 0.8).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_burning_cells_block() {
        let env = Environment::build(&Layout::single_floor_office(2, &[1, 1])).unwrap();
        // Burn the entire door row of office O0-1.
        let mut params = HazardParams::default();
        let office = env.rooms.iter().find(|r| r.name == "O0-1").unwrap();
        params.ignition_cells = office
            .door_cells
            .iter()
            .map(|p| {
                let (x, y) = p.center();
                IgnitionPoint { x, y, floor: 0 }
            })
            .collect();
        let fire = FireField::new(&env, &params).unwrap();
        let path = find_grid_path(&env, &fire, 0, (-1.5, 1.0), (2.5, 4.0), false, 1.0);
        assert!(path.is_none(), "the only doorway is on fire");
    }

    #[test]
    fn test_avoid_danger_detours() {
        let (env, fire) = world();
        let direct = find_grid_path(&env, &fire, 0, (0.5, 0.5), (20.0, 0.5), false, 1.0).unwrap();

        // Put fire in the middle of the hallway; the cautious path must
        // swing around the danger bubble and get longer.
        let params = HazardParams {
            ignition_cells: vec![IgnitionPoint { x: 10.0, y: 0.5, floor: 0 }],
            danger_radius: 1.5,
            ..HazardParams::default()
        };
        let fire2 = FireField::new(&env, &params).unwrap();
        let cautious = find_grid_path(&env, &fire2, 0, (0.5, 0.5), (20.0, 0.5), true, 0.5).unwrap();
        assert!(cautious.len() >= direct.len());
        for p in &cautious {
            assert!(fire2.danger_at(0, *p) <= 0.5);
            assert!(!fire2.is_burning(0, *p));
        }
    }

    #[test]
    fn test_snap_off_wall() {
        let (env, fire) = world();
        // Start right on a wall cell of office O0-1; snapping finds the
        // interior.
        let path = find_grid_path(&env, &fire, 0, (0.3, 2.2), (2.5, 4.0), true, 0.8);
        assert!(path.is_some());
    }

    #[test]
    fn test_unreachable_goal_is_none() {
        let (env, fire) = world();
        // Far outside the building.
        let path = find_grid_path(&env, &fire, 0, (0.5, 1.0), (300.0, 300.0), true, 0.8);
        assert!(path.is_none());
    }

    #[test]
    fn test_cross_floor_route_has_stair_leg() {
        let env = Environment::build(&Layout::two_floor_office(3, &[0, 0, 0], &[1, 0, 0])).unwrap();
        let fire = FireField::new(&env, &HazardParams { enabled: false, ..HazardParams::default() }).unwrap();
        let start_room = env.exits[0];
        let target = env.rooms.iter().find(|r| r.name == "O1-1").unwrap().id;
        let route = plan_route(&env, &fire, 0, (1.5, -1.0), start_room, target, true, 0.8).unwrap();
        let stair_legs = route
            .legs
            .iter()
            .filter(|l| matches!(l, Leg::Stair { .. }))
            .count();
        assert_eq!(stair_legs, 1);
        assert!(matches!(route.legs.last(), Some(Leg::Walk { floor_idx: 1, .. })));
        assert!(route.length_m() > 0.0);
    }

    #[test]
    fn test_nearest_exit_route_prefers_closer_exit() {
        let (env, fire) = world();
        let hall = env.rooms.iter().find(|r| r.name == "HALL").unwrap().id;
        let route = nearest_exit_route(&env, &fire, 0, (2.0, 1.0), hall, 0.85).unwrap();
        assert_eq!(route.target, env.exits[0]);
    }
}
