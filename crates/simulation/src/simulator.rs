//! The simulation engine.
//!
//! A [`Simulator`] owns an ECS world plus one chained, single-threaded
//! schedule running the five tick phases in contract order:
//! hazard update → safety check → agent steps (ascending id) → termination
//! check → clock advance. Responders are entities; every phase that
//! touches them queries their components and sorts the rows by
//! [`AgentId`], so the update order is part of the contract rather than
//! an accident of archetype layout. `tick()` is therefore a pure function
//! of (world, rng); identical inputs replay identical event streams.

use bevy::ecs::schedule::ExecutorKind;
use bevy::prelude::*;
use tracing::{debug, info};

use crate::agent::{
    ActionTimer, AgentId, AgentState, Assignment, PathCache, Position, Responder,
    ResponderBundle, ResponderMut, ResponderStateComp, ResponderView, StairClimb, SweepStats,
};
use crate::config::SimParams;
use crate::environment::{CellPos, ConnId, Environment, RoomId};
use crate::error::ConfigError;
use crate::events::{EventKind, EventLog, SimEvent};
use crate::hazard::{hazard_tick, FireField};
use crate::layout::{Layout, RoomKind};
use crate::pathfind::{plan_route, Leg};
use crate::policy::{
    drag_route, escape_route, rescue_priority, service_time, Dispatch, DispatchPolicy,
};
use crate::results::{compile_results, SimResults, TerminationReason};
use crate::sim_rng::SimRng;
use crate::snapshot::{build_snapshot, Snapshot};
use crate::stairs::StairOccupancy;

const TIME_EPS: f32 = 1e-6;

/// Full mutable component row of one responder entity.
type ResponderParts = (
    Entity,
    &'static Responder,
    &'static mut Position,
    &'static mut ResponderStateComp,
    &'static mut PathCache,
    &'static mut Assignment,
    &'static mut StairClimb,
    &'static mut ActionTimer,
    &'static mut SweepStats,
);

/// Read-only component row, flattened into [`ResponderView`]s.
type ResponderReadParts = (
    &'static Responder,
    &'static Position,
    &'static ResponderStateComp,
    &'static Assignment,
    &'static StairClimb,
    &'static ActionTimer,
    &'static SweepStats,
);

/// Entities in ascending responder-id order, the engine's update order.
fn ordered_entities(responders: &mut Query<ResponderParts>) -> Vec<Entity> {
    let mut order: Vec<(AgentId, Entity)> = responders
        .iter_mut()
        .map(|(entity, responder, ..)| (responder.0, entity))
        .collect();
    order.sort_unstable_by_key(|&(id, _)| id);
    order.into_iter().map(|(_, entity)| entity).collect()
}

fn sorted_views(responders: &Query<ResponderReadParts>) -> Vec<ResponderView> {
    let mut views: Vec<ResponderView> = responders
        .iter()
        .map(|(responder, pos, state, assignment, stairs, timer, stats)| {
            ResponderView::from_parts(responder, pos, state, assignment, stairs, timer, stats)
        })
        .collect();
    views.sort_unstable_by_key(|v| v.id);
    views
}

// ---------------------------------------------------------------------------
// Clock and watchdog
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone)]
pub struct SimClock {
    pub tick: u64,
    pub sim_time: f64,
    pub dt: f64,
    pub time_cap: f64,
    pub complete: bool,
    pub reason: Option<TerminationReason>,
}

impl SimClock {
    pub fn new(dt: f64, time_cap: f64) -> Self {
        Self { tick: 0, sim_time: 0.0, dt, time_cap, complete: false, reason: None }
    }
}

/// Short-circuits runs where nothing observable changes for N consecutive
/// ticks. Disabled unless `simulation.no_progress_limit` is set.
#[derive(Resource, Debug, Default)]
struct ProgressWatchdog {
    limit: Option<u32>,
    stagnant: u32,
    last_events: usize,
    last_burning: usize,
    last_agents: u64,
}

impl ProgressWatchdog {
    fn new(limit: Option<u32>) -> Self {
        Self { limit, ..Self::default() }
    }
}

fn views_fingerprint(views: &[ResponderView]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for v in views {
        for x in [
            u64::from(v.pos.0.to_bits()),
            u64::from(v.pos.1.to_bits()),
            v.state as u64,
            u64::from(v.action_time_remaining.to_bits()),
            u64::from(v.stair_progress.to_bits()),
            u64::from(v.distance_traveled.to_bits()),
            u64::from(v.carrying_evacuee),
            u64::from(v.rescued_count),
        ] {
            h = (h ^ x).wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    h
}

fn emit(
    events: &mut EventLog,
    clock: &SimClock,
    agent: Option<AgentId>,
    room: Option<RoomId>,
    kind: EventKind,
) {
    events.push(SimEvent { tick: clock.tick, sim_time: clock.sim_time, agent, room, kind });
}

// ---------------------------------------------------------------------------
// Phase 2: safety check
// ---------------------------------------------------------------------------

fn safety_check(
    clock: Res<SimClock>,
    params: Res<SimParams>,
    mut responders: Query<ResponderParts>,
    fire: Res<FireField>,
    mut stairs: ResMut<StairOccupancy>,
    mut events: ResMut<EventLog>,
) {
    if clock.complete {
        return;
    }
    for entity in ordered_entities(&mut responders) {
        let Ok((_, responder, position, state, path, assignment, climb, timer, stats)) =
            responders.get_mut(entity)
        else {
            continue;
        };
        let mut r = ResponderMut {
            id: responder.0,
            pos: position.into_inner(),
            state: state.into_inner(),
            path: path.into_inner(),
            assignment: assignment.into_inner(),
            stairs: climb.into_inner(),
            timer: timer.into_inner(),
            stats: stats.into_inner(),
        };
        if r.state().is_terminal() {
            continue;
        }
        let cell = r.cell();
        let burning = fire.is_burning(r.pos.floor_idx, cell);
        let danger = fire.danger_at(r.pos.floor_idx, cell);
        if !burning && danger <= params.policy.kill_threshold {
            continue;
        }

        if let Some(conn) = r.stairs.occupying.take() {
            stairs.release(conn);
        }
        if let Some(conn) = r.stairs.queued.take() {
            stairs.remove_queued(conn, r.id);
        }
        // A carried evacuee stays with the fallen carrier: room counts
        // never rise again, and the conservation ledger still balances.
        r.path.clear();
        r.assignment.target_room = None;
        r.set_state(AgentState::Dead);
        debug!(agent = r.id.0, danger, burning, "responder died");
        emit(&mut events, &clock, Some(r.id), Some(r.pos.room), EventKind::AgentDied {
            danger,
            burning,
        });
    }
}

// ---------------------------------------------------------------------------
// Phase 3: agent state machine
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn step_agents(
    clock: Res<SimClock>,
    params: Res<SimParams>,
    mut responders: Query<ResponderParts>,
    mut env: ResMut<Environment>,
    fire: Res<FireField>,
    mut stairs: ResMut<StairOccupancy>,
    mut dispatch: ResMut<Dispatch>,
    mut events: ResMut<EventLog>,
) {
    if clock.complete {
        return;
    }
    for entity in ordered_entities(&mut responders) {
        let seen = events.len();
        let Ok((_, responder, position, state, path, assignment, climb, timer, stats)) =
            responders.get_mut(entity)
        else {
            continue;
        };
        let mut r = ResponderMut {
            id: responder.0,
            pos: position.into_inner(),
            state: state.into_inner(),
            path: path.into_inner(),
            assignment: assignment.into_inner(),
            stairs: climb.into_inner(),
            timer: timer.into_inner(),
            stats: stats.into_inner(),
        };
        if r.state().is_terminal() {
            continue;
        }
        r.timer.time_in_state += clock.dt as f32;

        match r.state() {
            AgentState::Idle => {
                dispatch_idle(&mut r, &env, &fire, &params, &dispatch.0, &mut events, &clock);
            }
            AgentState::Moving | AgentState::Dragging | AgentState::Escaping => {
                advance_route(&mut r, &mut env, &fire, &params, &mut stairs, &mut events, &clock);
            }
            AgentState::Searching => {
                continue_search(&mut r, &mut env, &fire, &params, &mut events, &clock);
            }
            AgentState::Queued => check_queued(&mut r, &stairs),
            AgentState::Dead | AgentState::Safe => {}
        }

        if !r.state().is_terminal() {
            r.stats.hazard_exposure +=
                fire.danger_at(r.pos.floor_idx, r.cell()) * clock.dt as f32;
        }

        for event in &events.all()[seen..] {
            dispatch.0.on_event(event);
        }
    }
}

fn dispatch_idle(
    r: &mut ResponderMut,
    env: &Environment,
    fire: &FireField,
    params: &SimParams,
    policy: &DispatchPolicy,
    events: &mut EventLog,
    clock: &SimClock,
) {
    if let Some((room, route)) = policy.select_target(env, fire, params, r.pos) {
        r.assignment.target_room = Some(room);
        r.path.set(route);
        r.set_state(AgentState::Moving);
        emit(events, clock, Some(r.id), Some(room), EventKind::AgentMove {
            target: room,
            escape: false,
        });
    } else if let Some(route) = escape_route(env, fire, params, r.pos) {
        let exit = route.target;
        r.assignment.target_room = Some(exit);
        r.path.set(route);
        r.set_state(AgentState::Escaping);
        emit(events, clock, Some(r.id), Some(exit), EventKind::AgentMove {
            target: exit,
            escape: true,
        });
    }
    // Neither a room nor an escape path: stay idle, retry next tick.
}

/// Copy of the data needed to step one route leg, so the route borrow does
/// not outlive component mutation.
enum LegStep {
    Walk { floor_idx: usize, next: Option<CellPos> },
    Stair { conn: ConnId, enter_room: RoomId, exit_room: RoomId, to_floor_idx: usize, distance: f32 },
    Done,
}

fn current_leg(path: &PathCache) -> Option<LegStep> {
    let route = path.route.as_ref()?;
    if path.leg_index >= route.legs.len() {
        return Some(LegStep::Done);
    }
    Some(match &route.legs[path.leg_index] {
        Leg::Walk { floor_idx, cells } => LegStep::Walk {
            floor_idx: *floor_idx,
            next: cells.get(path.waypoint_index).copied(),
        },
        Leg::Stair { conn, enter_room, exit_room, to_floor_idx, distance } => LegStep::Stair {
            conn: *conn,
            enter_room: *enter_room,
            exit_room: *exit_room,
            to_floor_idx: *to_floor_idx,
            distance: *distance,
        },
    })
}

#[allow(clippy::too_many_arguments)]
fn advance_route(
    r: &mut ResponderMut,
    env: &mut Environment,
    fire: &FireField,
    params: &SimParams,
    stairs: &mut StairOccupancy,
    events: &mut EventLog,
    clock: &SimClock,
) {
    if r.path.needs_replan && !replan(r, env, fire, params) {
        return;
    }

    let mut time_left = clock.dt as f32;
    while time_left > TIME_EPS {
        let Some(step) = current_leg(r.path) else {
            r.path.needs_replan = true;
            return;
        };
        match step {
            LegStep::Done => {
                handle_arrival(r, env, fire, params, events, clock);
                return;
            }
            LegStep::Walk { next: None, .. } => {
                r.path.leg_index += 1;
                r.path.waypoint_index = 0;
            }
            LegStep::Walk { floor_idx, next: Some(next) } => {
                // Pause rather than step into a cell that would kill.
                if next != r.cell()
                    && (fire.is_burning(floor_idx, next)
                        || fire.danger_at(floor_idx, next) > params.policy.kill_threshold)
                {
                    r.path.route = None;
                    r.path.needs_replan = true;
                    return;
                }
                let speed = if r.assignment.carrying_evacuee {
                    params.agents.speed_drag
                } else {
                    params.agents.speed_hall
                };
                let mut dist_budget = speed * time_left;
                let granted = dist_budget;
                let reached = r.move_towards(next.center(), &mut dist_budget);
                time_left -= (granted - dist_budget) / speed;
                if reached {
                    r.path.waypoint_index += 1;
                    if let Some(room) = env.room_at(floor_idx, next) {
                        r.pos.room = room;
                    }
                } else {
                    return;
                }
            }
            LegStep::Stair { conn, enter_room, exit_room, to_floor_idx, distance } => {
                if r.stairs.occupying != Some(conn) {
                    if stairs.try_acquire(conn, r.id) {
                        r.stairs.occupying = Some(conn);
                        r.stairs.progress = 0.0;
                    } else {
                        stairs.enqueue(conn, r.id);
                        r.stairs.resume_state = r.state();
                        r.stairs.queued = Some(conn);
                        r.set_state(AgentState::Queued);
                        emit(events, clock, Some(r.id), Some(enter_room), EventKind::AgentQueued);
                        return;
                    }
                }
                let speed = if r.assignment.carrying_evacuee {
                    params.agents.speed_drag
                } else {
                    params.agents.speed_stairs
                };
                let remaining = distance - r.stairs.progress;
                let reach = speed * time_left;
                if reach >= remaining {
                    time_left -= remaining / speed;
                    r.stats.distance_traveled += remaining;
                    stairs.release(conn);
                    r.stairs.occupying = None;
                    r.stairs.progress = 0.0;
                    r.pos.floor_idx = to_floor_idx;
                    r.pos.pos = env.room(exit_room).center;
                    r.pos.room = exit_room;
                    r.path.leg_index += 1;
                    r.path.waypoint_index = 0;
                } else {
                    r.stairs.progress += reach;
                    r.stats.distance_traveled += reach;
                    return;
                }
            }
        }
    }
}

/// Re-plan after a hazard pause. Exit-bound agents re-pick the nearest
/// reachable exit; room-bound agents retry their target or fall back to
/// Idle. Returns false when the agent has to give up this tick.
fn replan(r: &mut ResponderMut, env: &Environment, fire: &FireField, params: &SimParams) -> bool {
    match r.state() {
        AgentState::Dragging => {
            if let Some(route) = drag_route(env, fire, params, r.pos) {
                r.assignment.target_room = Some(route.target);
                r.path.set(route);
                return true;
            }
            // Keep the evacuee; try again next tick.
            r.path.route = None;
            r.path.needs_replan = true;
            false
        }
        AgentState::Escaping => {
            if let Some(route) = escape_route(env, fire, params, r.pos) {
                r.assignment.target_room = Some(route.target);
                r.path.set(route);
                return true;
            }
            r.assignment.target_room = None;
            r.path.clear();
            r.set_state(AgentState::Idle);
            false
        }
        _ => {
            let Some(target) = r.assignment.target_room else {
                r.path.clear();
                r.set_state(AgentState::Idle);
                return false;
            };
            let route = plan_route(
                env,
                fire,
                r.pos.floor_idx,
                r.pos.pos,
                r.pos.room,
                target,
                params.policy.avoid_danger,
                params.policy.danger_threshold_path,
            );
            match route {
                Some(route) => {
                    r.path.set(route);
                    true
                }
                None => {
                    r.assignment.target_room = None;
                    r.path.clear();
                    r.set_state(AgentState::Idle);
                    false
                }
            }
        }
    }
}

fn handle_arrival(
    r: &mut ResponderMut,
    env: &mut Environment,
    fire: &FireField,
    params: &SimParams,
    events: &mut EventLog,
    clock: &SimClock,
) {
    let Some(target) = r.assignment.target_room else {
        r.path.clear();
        r.set_state(AgentState::Idle);
        return;
    };
    r.path.clear();
    emit(events, clock, Some(r.id), Some(target), EventKind::AgentArrive);
    let kind = env.room(target).kind;

    match r.state() {
        AgentState::Escaping => {
            if kind == RoomKind::Exit {
                r.assignment.target_room = None;
                r.set_state(AgentState::Safe);
                debug!(agent = r.id.0, "responder escaped");
            } else {
                r.assignment.target_room = None;
                r.set_state(AgentState::Idle);
            }
        }
        AgentState::Dragging => {
            if kind == RoomKind::Exit {
                if let Some(source) = r.assignment.source_room.take() {
                    let priority = rescue_priority(env, fire, params, source, r.pos.pos);
                    r.stats.rescued += 1;
                    r.assignment.carrying_evacuee = false;
                    emit(events, clock, Some(r.id), Some(target), EventKind::EvacueeRescued {
                        source_room: source,
                        priority,
                    });
                    debug!(agent = r.id.0, source = source.0, "evacuee delivered");
                }
                r.assignment.target_room = None;
                r.set_state(AgentState::Idle);
            } else {
                // Drag targets are always exits; if rerouted oddly, replan.
                r.path.needs_replan = true;
            }
        }
        AgentState::Moving => {
            let (cleared, remaining) = {
                let room = env.room(target);
                (room.cleared, room.evacuees_remaining)
            };
            if kind == RoomKind::Office && !cleared {
                let st = service_time(params, env.room(target));
                r.timer.action_remaining = st;
                r.set_state(AgentState::Searching);
                emit(events, clock, Some(r.id), Some(target), EventKind::RoomSearchStart {
                    service_time: st,
                });
            } else if kind == RoomKind::Office && remaining > 0 {
                // Searched earlier, evacuees still inside: pick one up.
                try_pickup(r, env, fire, params, target);
            } else {
                r.assignment.target_room = None;
                r.set_state(AgentState::Idle);
            }
        }
        _ => {
            r.assignment.target_room = None;
            r.set_state(AgentState::Idle);
        }
    }
}

/// Shoulder one evacuee from `room` and head for the nearest exit. The
/// decrement happens only when an exit route exists, so a carrying agent
/// is always Dragging.
fn try_pickup(
    r: &mut ResponderMut,
    env: &mut Environment,
    fire: &FireField,
    params: &SimParams,
    room: RoomId,
) -> bool {
    if let Some(route) = drag_route(env, fire, params, r.pos) {
        env.room_mut(room).evacuees_remaining -= 1;
        r.assignment.carrying_evacuee = true;
        r.assignment.source_room = Some(room);
        r.assignment.target_room = Some(route.target);
        r.path.set(route);
        r.set_state(AgentState::Dragging);
        true
    } else {
        r.assignment.target_room = None;
        r.set_state(AgentState::Idle);
        false
    }
}

fn continue_search(
    r: &mut ResponderMut,
    env: &mut Environment,
    fire: &FireField,
    params: &SimParams,
    events: &mut EventLog,
    clock: &SimClock,
) {
    r.timer.action_remaining -= clock.dt as f32;
    if r.timer.action_remaining > 0.0 {
        return;
    }
    let Some(room_id) = r.assignment.target_room else {
        r.set_state(AgentState::Idle);
        return;
    };

    // Two agents can search the same room side by side; only the first
    // finisher reports the clear.
    let (first_clear, found) = {
        let room = env.room_mut(room_id);
        let first = !room.cleared;
        room.cleared = true;
        room.discovered = true;
        if first {
            room.cleared_tick = Some(clock.tick);
        }
        (first, room.evacuees_remaining)
    };
    if first_clear {
        r.stats.rooms_searched += 1;
        emit(events, clock, Some(r.id), Some(room_id), EventKind::RoomCleared {
            evacuees_found: found,
        });
        if found > 0 {
            emit(events, clock, Some(r.id), Some(room_id), EventKind::EvacueeFound {
                count: found,
            });
        }
    }
    if found > 0 {
        try_pickup(r, env, fire, params, room_id);
    } else {
        r.assignment.target_room = None;
        r.set_state(AgentState::Idle);
    }
}

/// A queued agent resumes once the stairwell slot has been reserved for it.
fn check_queued(r: &mut ResponderMut, stairs: &StairOccupancy) {
    let Some(conn) = r.stairs.queued else {
        r.set_state(AgentState::Idle);
        return;
    };
    if stairs.occupant(conn) == Some(r.id) {
        r.stairs.occupying = Some(conn);
        r.stairs.queued = None;
        r.stairs.progress = 0.0;
        let resume = r.stairs.resume_state;
        r.set_state(resume);
    }
}

// ---------------------------------------------------------------------------
// Phases 4–6: termination and clock
// ---------------------------------------------------------------------------

fn check_termination(
    mut clock: ResMut<SimClock>,
    env: Res<Environment>,
    responders: Query<ResponderReadParts>,
    fire: Res<FireField>,
    mut watchdog: ResMut<ProgressWatchdog>,
    mut events: ResMut<EventLog>,
) {
    if clock.complete {
        return;
    }

    let finish = |clock: &mut SimClock, events: &mut EventLog, reason: TerminationReason| {
        clock.complete = true;
        clock.reason = Some(reason);
        emit(events, clock, None, None, EventKind::SimulationEnd { reason });
        info!(tick = clock.tick, ?reason, "simulation ended");
    };

    let views = sorted_views(&responders);
    let carried = views.iter().filter(|v| v.carrying_evacuee).count();
    if env.remaining_evacuees() == 0 && carried == 0 {
        finish(&mut clock, &mut events, TerminationReason::AllRescued);
        return;
    }
    if !views.is_empty() && views.iter().all(|v| v.state == AgentState::Dead) {
        finish(&mut clock, &mut events, TerminationReason::AllAgentsDead);
        return;
    }
    if clock.sim_time >= clock.time_cap {
        finish(&mut clock, &mut events, TerminationReason::TimeLimit);
        return;
    }

    if let Some(limit) = watchdog.limit {
        let fp = views_fingerprint(&views);
        let unchanged = events.len() == watchdog.last_events
            && fire.burning_count() == watchdog.last_burning
            && fp == watchdog.last_agents;
        watchdog.stagnant = if unchanged { watchdog.stagnant + 1 } else { 0 };
        watchdog.last_events = events.len();
        watchdog.last_burning = fire.burning_count();
        watchdog.last_agents = fp;
        if watchdog.stagnant >= limit {
            finish(&mut clock, &mut events, TerminationReason::NoProgress);
        }
    }
}

fn advance_clock(mut clock: ResMut<SimClock>) {
    if !clock.complete {
        clock.tick += 1;
        clock.sim_time += clock.dt;
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Pristine resource state kept for `reset()`; responder entities are
/// respawned from `spawns`.
struct InitialState {
    env: Environment,
    fire: FireField,
    stairs: StairOccupancy,
    spawns: Vec<(AgentId, (f32, f32), usize, RoomId)>,
}

pub struct Simulator {
    world: World,
    schedule: Schedule,
    initial: InitialState,
    params: SimParams,
}

impl Simulator {
    /// Build a simulator from a layout and parameters. All configuration
    /// and layout validation happens here; a constructed simulator cannot
    /// fail mid-run.
    pub fn new(layout: &Layout, params: SimParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let env = Environment::build(layout)?;
        let fire = FireField::new(&env, &params.hazard)?;
        let spawns = responder_spawns(&env, &params)?;
        let stairs = StairOccupancy::for_env(&env);

        let initial = InitialState {
            env: env.clone(),
            fire: fire.clone(),
            stairs: stairs.clone(),
            spawns: spawns.clone(),
        };

        let mut world = World::new();
        world.insert_resource(env);
        world.insert_resource(fire);
        world.insert_resource(stairs);
        world.insert_resource(SimRng::from_seed_u64(params.simulation.random_seed));
        world.insert_resource(SimClock::new(
            params.simulation.tick_duration,
            params.simulation.time_cap,
        ));
        world.insert_resource(EventLog::default());
        world.insert_resource(Dispatch(DispatchPolicy::from_kind(params.policy.kind)));
        world.insert_resource(ProgressWatchdog::new(params.simulation.no_progress_limit));
        world.insert_resource(params.clone());

        for &(id, pos, floor_idx, room) in &initial.spawns {
            world.spawn(ResponderBundle::new(id, pos, floor_idx, room));
        }

        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems(
            (hazard_tick, safety_check, step_agents, check_termination, advance_clock).chain(),
        );

        Ok(Self { world, schedule, initial, params })
    }

    /// Run one tick. No-op once the simulation is complete.
    pub fn step(&mut self) {
        if self.is_complete() {
            return;
        }
        self.schedule.run(&mut self.world);
    }

    /// Run to termination and compile the results.
    pub fn run(&mut self) -> SimResults {
        let max_ticks = (self.clock().time_cap / self.clock().dt).ceil() as u64 + 1;
        while !self.is_complete() && self.clock().tick <= max_ticks {
            self.step();
        }
        if !self.is_complete() {
            let mut clock = self.world.resource_mut::<SimClock>();
            clock.complete = true;
            clock.reason = Some(TerminationReason::TimeLimit);
        }
        self.results()
    }

    /// Restore the initial world: same layout, same seed, empty log,
    /// freshly spawned responders.
    pub fn reset(&mut self) {
        self.world.clear_entities();
        self.world.insert_resource(self.initial.env.clone());
        self.world.insert_resource(self.initial.fire.clone());
        self.world.insert_resource(self.initial.stairs.clone());
        self.world
            .insert_resource(SimRng::from_seed_u64(self.params.simulation.random_seed));
        self.world.insert_resource(SimClock::new(
            self.params.simulation.tick_duration,
            self.params.simulation.time_cap,
        ));
        self.world.insert_resource(EventLog::default());
        self.world
            .insert_resource(Dispatch(DispatchPolicy::from_kind(self.params.policy.kind)));
        self.world
            .insert_resource(ProgressWatchdog::new(self.params.simulation.no_progress_limit));
        for i in 0..self.initial.spawns.len() {
            let (id, pos, floor_idx, room) = self.initial.spawns[i];
            self.world.spawn(ResponderBundle::new(id, pos, floor_idx, room));
        }
    }

    pub fn is_complete(&self) -> bool {
        self.clock().complete
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.clock().reason
    }

    pub fn clock(&self) -> &SimClock {
        self.world.resource::<SimClock>()
    }

    pub fn environment(&self) -> &Environment {
        self.world.resource::<Environment>()
    }

    pub fn stairs(&self) -> &StairOccupancy {
        self.world.resource::<StairOccupancy>()
    }

    pub fn fire(&self) -> &FireField {
        self.world.resource::<FireField>()
    }

    /// Flat per-responder views in ascending id order.
    pub fn responders(&mut self) -> Vec<ResponderView> {
        let mut query = self.world.query::<ResponderReadParts>();
        let mut views: Vec<ResponderView> = query
            .iter(&self.world)
            .map(|(responder, pos, state, assignment, stairs, timer, stats)| {
                ResponderView::from_parts(responder, pos, state, assignment, stairs, timer, stats)
            })
            .collect();
        views.sort_unstable_by_key(|v| v.id);
        views
    }

    pub fn events(&self) -> &[SimEvent] {
        self.world.resource::<EventLog>().all()
    }

    /// Flush events appended since the previous drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world.resource_mut::<EventLog>().drain_new()
    }

    pub fn snapshot(&mut self) -> Snapshot {
        let views = self.responders();
        let clock = self.world.resource::<SimClock>();
        let (tick, sim_time) = (clock.tick, clock.sim_time);
        build_snapshot(
            self.environment(),
            self.world.resource::<FireField>(),
            &views,
            tick,
            sim_time,
        )
    }

    pub fn results(&mut self) -> SimResults {
        let views = self.responders();
        let clock = self.world.resource::<SimClock>();
        let (sim_time, tick, reason) =
            (clock.sim_time, clock.tick, clock.reason.unwrap_or(TerminationReason::TimeLimit));
        compile_results(
            self.environment(),
            &views,
            self.events(),
            sim_time,
            tick,
            reason,
            self.world.resource::<FireField>().max_hazard_seen,
            self.params.agents.count,
        )
    }
}

fn responder_spawns(
    env: &Environment,
    params: &SimParams,
) -> Result<Vec<(AgentId, (f32, f32), usize, RoomId)>, ConfigError> {
    let mut starts = env.agent_starts.clone();
    if starts.is_empty() {
        let exit = env.room(env.exits[0]);
        starts.push((exit.center.0, exit.center.1, exit.floor));
    }

    let mut spawns = Vec::with_capacity(params.agents.count);
    for i in 0..params.agents.count {
        let (x, y, floor) = starts[i % starts.len()];
        let floor_idx = env.floor_index(floor).ok_or_else(|| {
            ConfigError::Parameter(format!("agent start floor {floor} does not exist"))
        })?;
        let cell = CellPos::from_world(x, y);
        let room = env.room_at(floor_idx, cell).ok_or_else(|| {
            ConfigError::Parameter(format!("agent start ({x}, {y}) is outside any room"))
        })?;
        spawns.push((AgentId(i as u32), (x, y), floor_idx, room));
    }
    Ok(spawns)
}
