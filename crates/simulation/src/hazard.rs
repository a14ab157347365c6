//! Fire hazard field.
//!
//! One danger/burning layer per floor, same dimensions as the floor grid.
//! Burning is monotone: once a cell ignites it never stops. Danger is the
//! halo around the fire — recomputed from scratch every tick as a
//! multi-source ring expansion from the burning set, so it respects walls
//! and reaches rooms only through their door openings.

use bevy::prelude::*;
use rand::Rng;

use crate::config::{HazardParams, CELL_SIZE};
use crate::environment::{CellPos, Environment, FloorGrid, NEIGHBORS_8};
use crate::error::ConfigError;
use crate::sim_rng::SimRng;
use crate::simulator::SimClock;

/// Burning/danger state for one floor, parallel to its `FloorGrid`.
#[derive(Debug, Clone)]
pub struct FloorFire {
    origin: (i32, i32),
    width: usize,
    height: usize,
    burning: Vec<bool>,
    burn_started: Vec<Option<u64>>,
    danger: Vec<f32>,
}

impl FloorFire {
    fn new(grid: &FloorGrid) -> Self {
        let n = grid.width * grid.height;
        Self {
            origin: grid.origin,
            width: grid.width,
            height: grid.height,
            burning: vec![false; n],
            burn_started: vec![None; n],
            danger: vec![0.0; n],
        }
    }

    fn idx(&self, pos: CellPos) -> Option<usize> {
        let dx = pos.0 - self.origin.0;
        let dy = pos.1 - self.origin.1;
        if dx < 0 || dy < 0 || dx >= self.width as i32 || dy >= self.height as i32 {
            return None;
        }
        Some(dy as usize * self.width + dx as usize)
    }
}

#[derive(Resource, Debug, Clone)]
pub struct FireField {
    pub enabled: bool,
    spread_rate: f64,
    danger_radius: f32,
    max_danger: f32,
    floors: Vec<FloorFire>,
    /// Burning cells in ignition order, as (floor index, cell index).
    burning: Vec<(usize, usize)>,
    /// High-water mark of cell danger over the whole run.
    pub max_hazard_seen: f32,
}

impl FireField {
    /// Build the field and apply the configured t=0 ignitions.
    pub fn new(env: &Environment, params: &HazardParams) -> Result<Self, ConfigError> {
        let mut field = Self {
            enabled: params.enabled,
            spread_rate: params.spread_rate,
            danger_radius: params.danger_radius,
            max_danger: params.max_danger,
            floors: env.floors.iter().map(FloorFire::new).collect(),
            burning: Vec::new(),
            max_hazard_seen: 0.0,
        };

        if field.enabled {
            for point in &params.ignition_cells {
                let bad = || ConfigError::BadIgnition {
                    x: point.x,
                    y: point.y,
                    floor: point.floor,
                };
                let floor_idx = env.floor_index(point.floor).ok_or_else(bad)?;
                let pos = CellPos::from_world(point.x, point.y);
                if env.grid(floor_idx).idx(pos).is_none() {
                    return Err(bad());
                }
                field.ignite(env, floor_idx, pos, 0);
            }
            field.recompute_danger(env);
        }
        Ok(field)
    }

    /// Mark a cell burning. No-op on walls, void cells and cells already
    /// alight.
    pub fn ignite(&mut self, env: &Environment, floor_idx: usize, pos: CellPos, tick: u64) {
        let grid = env.grid(floor_idx);
        if !grid.get(pos).is_open() {
            return;
        }
        let idx = match grid.idx(pos) {
            Some(i) => i,
            None => return,
        };
        let fire = &mut self.floors[floor_idx];
        if fire.burning[idx] {
            return;
        }
        fire.burning[idx] = true;
        fire.burn_started[idx] = Some(tick);
        self.burning.push((floor_idx, idx));
    }

    pub fn is_burning(&self, floor_idx: usize, pos: CellPos) -> bool {
        match self.cell_index(floor_idx, pos) {
            Some(i) => self.floors[floor_idx].burning[i],
            None => false,
        }
    }

    pub fn danger_at(&self, floor_idx: usize, pos: CellPos) -> f32 {
        match self.cell_index(floor_idx, pos) {
            Some(i) => self.floors[floor_idx].danger[i],
            None => 0.0,
        }
    }

    pub fn burn_started_at(&self, floor_idx: usize, pos: CellPos) -> Option<u64> {
        self.cell_index(floor_idx, pos)
            .and_then(|i| self.floors[floor_idx].burn_started[i])
    }

    pub fn burning_count(&self) -> usize {
        self.burning.len()
    }

    pub fn danger_plane(&self, floor_idx: usize) -> &[f32] {
        &self.floors[floor_idx].danger
    }

    pub fn burning_plane(&self, floor_idx: usize) -> &[bool] {
        &self.floors[floor_idx].burning
    }

    fn cell_index(&self, floor_idx: usize, pos: CellPos) -> Option<usize> {
        self.floors.get(floor_idx).and_then(|f| f.idx(pos))
    }

    /// Rebuild the danger halo from the current burning set.
    fn recompute_danger(&mut self, env: &Environment) {
        let radius = self.danger_radius;
        let max_danger = self.max_danger;
        let mut peak: f32 = 0.0;

        for (floor_idx, fire) in self.floors.iter_mut().enumerate() {
            let grid = env.grid(floor_idx);
            fire.danger.iter_mut().for_each(|d| *d = 0.0);

            let mut visited = vec![false; fire.danger.len()];
            let mut ring: Vec<usize> = Vec::new();
            for &(f, idx) in &self.burning {
                if f == floor_idx {
                    visited[idx] = true;
                    ring.push(idx);
                }
            }
            for &idx in &ring {
                fire.danger[idx] = max_danger;
            }
            if !ring.is_empty() {
                peak = peak.max(max_danger);
            }

            // Ring k sits k open cells away from the fire (Chebyshev in
            // open space); walls stop the expansion.
            let mut depth = 1;
            while !ring.is_empty() && depth as f32 * CELL_SIZE < radius {
                let level = max_danger * (1.0 - depth as f32 * CELL_SIZE / radius);
                let mut next: Vec<usize> = Vec::new();
                for &idx in &ring {
                    let pos = grid.pos(idx);
                    for (dx, dy) in NEIGHBORS_8 {
                        let npos = CellPos(pos.0 + dx, pos.1 + dy);
                        if !passable(grid, pos, npos, dx, dy) {
                            continue;
                        }
                        if let Some(nidx) = grid.idx(npos) {
                            if !visited[nidx] {
                                visited[nidx] = true;
                                fire.danger[nidx] = level;
                                next.push(nidx);
                            }
                        }
                    }
                }
                ring = next;
                depth += 1;
            }
        }

        self.max_hazard_seen = self.max_hazard_seen.max(peak);
    }
}

/// Whether fire influence can step from `pos` to `npos`. Diagonal steps
/// need one of the orthogonal intermediates open, so flames never cross a
/// sealed wall corner.
fn passable(grid: &FloorGrid, pos: CellPos, npos: CellPos, dx: i32, dy: i32) -> bool {
    if !grid.get(npos).is_open() {
        return false;
    }
    if dx != 0 && dy != 0 {
        let side_a = grid.get(CellPos(pos.0 + dx, pos.1)).is_open();
        let side_b = grid.get(CellPos(pos.0, pos.1 + dy)).is_open();
        if !side_a && !side_b {
            return false;
        }
    }
    true
}

/// Tick phase 1: spread the fire, then rebuild danger and per-room hazard.
pub fn hazard_tick(
    clock: Res<SimClock>,
    mut fire: ResMut<FireField>,
    mut env: ResMut<Environment>,
    mut rng: ResMut<SimRng>,
) {
    if clock.complete || !fire.enabled {
        return;
    }

    let p = 1.0 - (-fire.spread_rate * clock.dt).exp();
    let frontier = fire.burning.len();
    for i in 0..frontier {
        let (floor_idx, idx) = fire.burning[i];
        let grid = env.grid(floor_idx);
        let pos = grid.pos(idx);
        for (dx, dy) in NEIGHBORS_8 {
            let npos = CellPos(pos.0 + dx, pos.1 + dy);
            if !passable(grid, pos, npos, dx, dy) || fire.is_burning(floor_idx, npos) {
                continue;
            }
            if rng.0.gen::<f64>() < p {
                fire.ignite(&env, floor_idx, npos, clock.tick);
            }
        }
    }

    fire.recompute_danger(&env);

    // Per-room mean hazard feeds the decision engine's D_i.
    update_room_hazard(&fire, &mut env);
}

fn update_room_hazard(fire: &FireField, env: &mut Environment) {
    for i in 0..env.rooms.len() {
        let cells = env.open_cells_of(crate::environment::RoomId(i as u32));
        let mean = if cells.is_empty() {
            0.0
        } else {
            let sum: f32 = cells
                .iter()
                .map(|&(f, idx)| fire.floors[f].danger[idx])
                .sum();
            sum / cells.len() as f32
        };
        env.rooms[i].hazard = mean;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnitionPoint;
    use crate::layout::{Layout, RoomKind};

    fn env6() -> Environment {
        Environment::build(&Layout::single_floor_office(6, &[3, 3, 3, 3, 3, 2])).unwrap()
    }

    fn params_with_fire(x: f32, y: f32) -> HazardParams {
        HazardParams {
            ignition_cells: vec![IgnitionPoint { x, y, floor: 0 }],
            ..HazardParams::default()
        }
    }

    #[test]
    fn test_disabled_field_is_inert() {
        let env = env6();
        let params = HazardParams {
            enabled: false,
            ignition_cells: vec![IgnitionPoint { x: 2.5, y: 4.0, floor: 0 }],
            ..HazardParams::default()
        };
        let fire = FireField::new(&env, &params).unwrap();
        assert_eq!(fire.burning_count(), 0);
        assert_eq!(fire.max_hazard_seen, 0.0);
    }

    #[test]
    fn test_ignition_marks_cell_burning() {
        let env = env6();
        let fire = FireField::new(&env, &params_with_fire(2.5, 4.0)).unwrap();
        assert_eq!(fire.burning_count(), 1);
        let pos = CellPos::from_world(2.5, 4.0);
        assert!(fire.is_burning(0, pos));
        assert_eq!(fire.burn_started_at(0, pos), Some(0));
        assert_eq!(fire.danger_at(0, pos), 1.0);
    }

    #[test]
    fn test_ignite_on_wall_is_noop() {
        let env = env6();
        let mut fire = FireField::new(&env, &HazardParams::default()).unwrap();
        // South wall of office O0-1 away from the door.
        let wall = CellPos::from_world(0.3, 2.2);
        assert!(env.grid(0).get(wall).is_wall);
        fire.ignite(&env, 0, wall, 3);
        assert_eq!(fire.burning_count(), 0);
    }

    #[test]
    fn test_ignition_outside_layout_rejected() {
        let env = env6();
        let params = params_with_fire(500.0, 500.0);
        assert!(matches!(
            FireField::new(&env, &params),
            Err(ConfigError::BadIgnition { .. })
        ));
    }

    #[test]
    fn test_danger_falls_off_linearly() {
        let env = env6();
        let fire = FireField::new(&env, &params_with_fire(2.5, 4.0)).unwrap();
        let origin = CellPos::from_world(2.5, 4.0);
        // One ring out: one cell of Chebyshev distance.
        let next = CellPos(origin.0 + 1, origin.1);
        let expected = 1.0 * (1.0 - CELL_SIZE / HazardParams::default().danger_radius);
        assert!((fire.danger_at(0, next) - expected).abs() < 1e-6);
        assert!(fire.danger_at(0, next) < fire.danger_at(0, origin));
    }

    #[test]
    fn test_walls_carry_no_danger() {
        let env = env6();
        // Fire near the office wall; the wall itself stays at zero.
        let fire = FireField::new(&env, &params_with_fire(2.5, 2.7)).unwrap();
        let wall = CellPos::from_world(0.3, 2.2);
        assert!(env.grid(0).get(wall).is_wall);
        assert_eq!(fire.danger_at(0, wall), 0.0);
        assert!(fire.max_hazard_seen >= 1.0 - f32::EPSILON);
    }

    #[test]
    fn test_danger_blocked_by_walls_reaches_hallway_via_door() {
        let env = env6();
        // Burn the office interior cell just north of the door of O0-1.
        let fire = FireField::new(&env, &params_with_fire(2.5, 2.7)).unwrap();
        // A hallway cell straight through the door opening picks up danger.
        let through_door = CellPos::from_world(2.5, 1.7);
        assert!(fire.danger_at(0, through_door) > 0.0);
        // A hallway cell shielded by the solid wall further west stays
        // clear: the open-cell path around the wall is longer than the
        // danger radius.
        let shielded = CellPos::from_world(8.3, 0.3);
        assert_eq!(fire.danger_at(0, shielded), 0.0);
    }

    #[test]
    fn test_room_hazard_is_mean_of_open_cells() {
        let mut env = env6();
        let fire = FireField::new(&env, &params_with_fire(2.5, 4.0)).unwrap();
        update_room_hazard(&fire, &mut env);
        let office = env
            .rooms
            .iter()
            .find(|r| r.kind == RoomKind::Office && r.name == "O0-1")
            .unwrap();
        assert!(office.hazard > 0.0 && office.hazard < 1.0);
        let far_office = env.rooms.iter().find(|r| r.name == "O0-6").unwrap();
        assert_eq!(far_office.hazard, 0.0);
    }

    #[test]
    fn test_burning_set_monotone_under_recompute() {
        let env = env6();
        let mut fire = FireField::new(&env, &params_with_fire(2.5, 4.0)).unwrap();
        let before = fire.burning_count();
        fire.recompute_danger(&env);
        fire.recompute_danger(&env);
        assert_eq!(fire.burning_count(), before);
        assert!(fire.is_burning(0, CellPos::from_world(2.5, 4.0)));
    }
}
