//! Dispatch policies and the priority index.
//!
//! Three interchangeable strategies decide which room an idle responder
//! sweeps next. They share one interface — `select_target` / `on_event` —
//! dispatched at compile time over an enum, and they all commit to a route
//! from the grid pathfinder before an assignment counts.

use bevy::prelude::*;
use tracing::trace;

use crate::agent::Position;
use crate::config::{PolicyKind, SimParams};
use crate::environment::{CellPos, Environment, Room, RoomId};
use crate::events::SimEvent;
use crate::hazard::FireField;
use crate::layout::RoomKind;
use crate::pathfind::{manhattan, nearest_exit_route, plan_route, Route};

/// Danger at a door cell above which the doorway counts as on fire.
const DOOR_BLOCK_DANGER: f32 = 0.85;

#[derive(Debug, Clone)]
pub enum DispatchPolicy {
    /// Weighted priority index, argmax over candidate offices.
    Priority,
    /// Offices in fixed ascending id order.
    StaticOrder,
    /// Nearest candidate office by Manhattan distance.
    GreedyNearest,
}

impl DispatchPolicy {
    pub fn from_kind(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Priority => Self::Priority,
            PolicyKind::StaticOrder => Self::StaticOrder,
            PolicyKind::GreedyNearest => Self::GreedyNearest,
        }
    }

    /// Pick the next room for an idle responder at `who`, committing to a
    /// route.
    ///
    /// Candidates are ranked policy-specifically, then routes are tried in
    /// rank order; a room without a survivable route is skipped (its
    /// accessibility term is zero).
    pub fn select_target(
        &self,
        env: &Environment,
        fire: &FireField,
        params: &SimParams,
        who: &Position,
    ) -> Option<(RoomId, Route)> {
        let mut ranked: Vec<(f32, RoomId)> = match self {
            Self::Priority => env
                .rooms_needing_visit()
                .map(|room| (priority_index(env, fire, params, room.id, who.pos), room.id))
                .filter(|&(p, _)| p > 0.0)
                .collect(),
            Self::StaticOrder => env
                .rooms_needing_visit()
                .map(|room| (0.0, room.id))
                .collect(),
            Self::GreedyNearest => env
                .rooms_needing_visit()
                .map(|room| (-manhattan(who.pos, room.center), room.id))
                .collect(),
        };

        match self {
            // Static order ranks purely by id.
            Self::StaticOrder => ranked.sort_by_key(|&(_, id)| id),
            // Highest score first, ties to the lower room id.
            _ => ranked.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            }),
        }

        for (score, room) in ranked {
            let route = plan_route(
                env,
                fire,
                who.floor_idx,
                who.pos,
                who.room,
                room,
                params.policy.avoid_danger,
                params.policy.danger_threshold_path,
            );
            if let Some(route) = route {
                trace!(room = room.0, score, "dispatch");
                return Some((room, route));
            }
        }
        None
    }

    /// Observe an emitted event. None of the current policies carry
    /// internal state, so this is a hook for stateful strategies.
    pub fn on_event(&mut self, _event: &SimEvent) {}
}

/// Policy resource wrapper held by the simulator world.
#[derive(Resource, Debug, Clone)]
pub struct Dispatch(pub DispatchPolicy);

// ---------------------------------------------------------------------------
// Priority index
// ---------------------------------------------------------------------------

/// The weighted priority of a candidate office from a caller position:
///
/// `P = A · E · (β + λ·D) / max(d, d_min)`
///
/// where `A` is door accessibility (path existence is checked by the
/// caller when committing a route), `E` the expected unrescued evacuees,
/// `D` the mean room danger and `d` the Manhattan distance to the room
/// center.
pub fn priority_index(
    env: &Environment,
    fire: &FireField,
    params: &SimParams,
    room_id: RoomId,
    from: (f32, f32),
) -> f32 {
    let room = env.room(room_id);
    if room.kind != RoomKind::Office {
        return 0.0;
    }
    let expected = expected_evacuees(room) * params.policy.evacuee_weight;
    if expected <= 0.0 {
        return 0.0;
    }
    if door_blocked(env, fire, params, room) {
        return 0.0;
    }
    let d = manhattan(from, room.center).max(params.policy.d_min);
    expected * (params.policy.beta + params.policy.lambda * room.hazard) / d
}

/// Priority recorded on a rescue event, evaluated at delivery time from
/// the agent's position; the escorted evacuee keeps the expectation at
/// one even when the source room has been emptied.
pub fn rescue_priority(
    env: &Environment,
    fire: &FireField,
    params: &SimParams,
    room_id: RoomId,
    from: (f32, f32),
) -> f32 {
    let room = env.room(room_id);
    let expected = (1.0 + room.evacuees_remaining as f32) * params.policy.evacuee_weight;
    if door_blocked(env, fire, params, room) {
        return 0.0;
    }
    let d = manhattan(from, room.center).max(params.policy.d_min);
    expected * (params.policy.beta + params.policy.lambda * room.hazard) / d
}

/// Expected unrescued evacuees. An unsearched room is always worth at
/// least one expected occupant, so sweeps cover every office even when
/// the true count is zero.
fn expected_evacuees(room: &Room) -> f32 {
    if room.discovered {
        room.evacuees_remaining as f32
    } else {
        room.evacuees_remaining.max(1) as f32
    }
}

/// A doorway counts as blocked when any cell in the configured patch
/// around a door cell is burning or past the door danger limit.
pub fn door_blocked(env: &Environment, fire: &FireField, params: &SimParams, room: &Room) -> bool {
    let margin = params.policy.door_block_margin_cells;
    let floor_idx = match env.floor_index(room.floor) {
        Some(i) => i,
        None => return true,
    };
    for &door in &room.door_cells {
        for dy in -margin..=margin {
            for dx in -margin..=margin {
                let pos = CellPos(door.0 + dx, door.1 + dy);
                if fire.is_burning(floor_idx, pos)
                    || fire.danger_at(floor_idx, pos) > DOOR_BLOCK_DANGER
                {
                    return true;
                }
            }
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Service time and escape
// ---------------------------------------------------------------------------

/// Seconds needed to fully search a room: base time scaled up by area and
/// by current hazard.
pub fn service_time(params: &SimParams, room: &Room) -> f32 {
    let area_factor = 1.0 + room.area / params.policy.area_ref * params.policy.area_weight;
    let hazard_factor = 1.0 + room.hazard * params.policy.hazard_weight;
    params.agents.service_time_base * area_factor * hazard_factor
}

/// Cautious route to the nearest reachable exit, used when no room is
/// worth visiting anymore.
pub fn escape_route(
    env: &Environment,
    fire: &FireField,
    params: &SimParams,
    who: &Position,
) -> Option<Route> {
    nearest_exit_route(
        env,
        fire,
        who.floor_idx,
        who.pos,
        who.room,
        params.policy.danger_threshold_escape,
    )
}

/// Route to an exit while dragging an evacuee; uses the normal path
/// threshold.
pub fn drag_route(
    env: &Environment,
    fire: &FireField,
    params: &SimParams,
    who: &Position,
) -> Option<Route> {
    nearest_exit_route(
        env,
        fire,
        who.floor_idx,
        who.pos,
        who.room,
        params.policy.danger_threshold_path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HazardParams, IgnitionPoint};
    use crate::layout::Layout;

    fn world() -> (Environment, FireField, SimParams) {
        let env = Environment::build(&Layout::single_floor_office(6, &[3, 3, 3, 3, 3, 2])).unwrap();
        let fire =
            FireField::new(&env, &HazardParams { enabled: false, ..HazardParams::default() })
                .unwrap();
        (env, fire, SimParams::default())
    }

    fn at(env: &Environment, pos: (f32, f32)) -> Position {
        Position { pos, floor_idx: 0, room: env.exits[0] }
    }

    fn office(env: &Environment, name: &str) -> RoomId {
        env.rooms.iter().find(|r| r.name == name).unwrap().id
    }

    #[test]
    fn test_priority_prefers_near_full_rooms() {
        let (env, fire, params) = world();
        let from = (-1.5, 1.0);
        let near = priority_index(&env, &fire, &params, office(&env, "O0-1"), from);
        let far = priority_index(&env, &fire, &params, office(&env, "O0-6"), from);
        assert!(near > far, "same load, nearer room must rank higher");
    }

    #[test]
    fn test_priority_zero_for_cleared_empty_room() {
        let (mut env, fire, params) = world();
        let id = office(&env, "O0-2");
        {
            let room = env.room_mut(id);
            room.discovered = true;
            room.cleared = true;
            room.evacuees_remaining = 0;
        }
        assert_eq!(priority_index(&env, &fire, &params, id, (0.0, 1.0)), 0.0);
    }

    #[test]
    fn test_unsearched_empty_room_still_draws_visits() {
        let env = Environment::build(&Layout::single_floor_office(2, &[0, 1])).unwrap();
        let fire =
            FireField::new(&env, &HazardParams { enabled: false, ..HazardParams::default() })
                .unwrap();
        let p = priority_index(&env, &fire, &SimParams::default(), office(&env, "O0-1"), (0.0, 1.0));
        assert!(p > 0.0, "undiscovered rooms carry expectation >= 1");
    }

    #[test]
    fn test_distance_floor_caps_close_range_boost() {
        let (env, fire, params) = world();
        let id = office(&env, "O0-1");
        let at_door = priority_index(&env, &fire, &params, id, (2.5, 2.0));
        let inside_dmin = priority_index(&env, &fire, &params, id, (2.5, 3.0));
        assert!((at_door - inside_dmin).abs() < 1e-6, "both inside d_min");
    }

    #[test]
    fn test_burning_door_zeroes_priority() {
        let env = Environment::build(&Layout::single_floor_office(6, &[3, 3, 3, 3, 3, 2])).unwrap();
        let id = office(&env, "O0-3");
        let door = env.room(id).door_cells[0].center();
        let params_fire = HazardParams {
            ignition_cells: vec![IgnitionPoint { x: door.0, y: door.1, floor: 0 }],
            ..HazardParams::default()
        };
        let fire = FireField::new(&env, &params_fire).unwrap();
        let p = priority_index(&env, &fire, &SimParams::default(), id, (-1.5, 1.0));
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_service_time_scales_with_area_and_hazard() {
        let (mut env, _, params) = world();
        let id = office(&env, "O0-1");
        let base = service_time(&params, env.room(id));
        // 20 m^2 at area_ref 100, gamma 0.5 -> 1.1x base.
        assert!((base - 5.0 * 1.1).abs() < 1e-4);
        env.room_mut(id).hazard = 1.0;
        let hot = service_time(&params, env.room(id));
        assert!((hot - 5.0 * 1.1 * 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_priority_policy_picks_argmax_with_route() {
        let (env, fire, params) = world();
        let who = at(&env, (-1.5, 1.0));
        let policy = DispatchPolicy::Priority;
        let (room, route) = policy.select_target(&env, &fire, &params, &who).unwrap();
        // All rooms hold ~equal load, so the nearest office wins.
        assert_eq!(room, office(&env, "O0-1"));
        assert!(!route.legs.is_empty());
    }

    #[test]
    fn test_static_policy_walks_in_id_order() {
        let (mut env, fire, params) = world();
        let who = at(&env, (27.0, 1.0));
        let policy = DispatchPolicy::StaticOrder;
        let (first, _) = policy.select_target(&env, &fire, &params, &who).unwrap();
        // Even far away, the lowest-id office comes first.
        assert_eq!(first, office(&env, "O0-1"));
        let id = first;
        {
            let room = env.room_mut(id);
            room.cleared = true;
            room.discovered = true;
            room.evacuees_remaining = 0;
        }
        let (second, _) = policy.select_target(&env, &fire, &params, &who).unwrap();
        assert_eq!(second, office(&env, "O0-2"));
    }

    #[test]
    fn test_greedy_policy_picks_nearest() {
        let (env, fire, params) = world();
        let who = at(&env, (27.0, 1.0));
        let policy = DispatchPolicy::GreedyNearest;
        let (room, _) = policy.select_target(&env, &fire, &params, &who).unwrap();
        assert_eq!(room, office(&env, "O0-6"));
    }

    #[test]
    fn test_no_candidates_returns_none() {
        let (mut env, fire, params) = world();
        for room in &mut env.rooms {
            room.cleared = true;
            room.discovered = true;
            room.evacuees_remaining = 0;
        }
        let who = at(&env, (-1.5, 1.0));
        for policy in [
            DispatchPolicy::Priority,
            DispatchPolicy::StaticOrder,
            DispatchPolicy::GreedyNearest,
        ] {
            assert!(policy.select_target(&env, &fire, &params, &who).is_none());
        }
    }

    #[test]
    fn test_escape_route_reaches_exit() {
        let (env, fire, params) = world();
        let who = at(&env, (20.0, 1.0));
        let route = escape_route(&env, &fire, &params, &who).unwrap();
        assert_eq!(route.target, env.exits[0]);
    }
}
