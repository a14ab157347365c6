//! Result aggregation.
//!
//! Compiled once, from the final responder views plus the full event log.
//! The success score follows the traveling-repairman form:
//! `(rescued · avg_rescue_priority) / (sim_time · responders)`.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, AgentState, ResponderView};
use crate::environment::Environment;
use crate::events::{EventKind, SimEvent};
use crate::layout::RoomKind;

/// Why the run ended; first condition to fire wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    AllRescued,
    AllAgentsDead,
    TimeLimit,
    NoProgress,
}

/// Per-responder outcome row.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub id: AgentId,
    pub final_state: AgentState,
    pub distance_traveled: f32,
    pub rooms_searched: u32,
    pub evacuees_rescued: u32,
    pub hazard_exposure: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimResults {
    pub sim_time: f64,
    pub tick_count: u64,
    pub termination_reason: TerminationReason,
    pub total_evacuees: u32,
    pub evacuees_rescued: u32,
    /// rescued / total; 1.0 for a building with nobody inside.
    pub rescue_rate: f64,
    pub rooms_cleared: usize,
    /// Offices only.
    pub total_rooms: usize,
    pub max_hazard: f32,
    pub avg_hazard_exposure: f32,
    pub agent_deaths: usize,
    pub agents_escaped: usize,
    pub avg_rescue_priority: f64,
    pub success_score: f64,
    pub agents: Vec<AgentReport>,
}

/// Mean priority across rescue events, with the conventional baseline of
/// 100 when nothing was rescued.
const DEFAULT_RESCUE_PRIORITY: f64 = 100.0;

#[allow(clippy::too_many_arguments)]
pub fn compile_results(
    env: &Environment,
    responders: &[ResponderView],
    events: &[SimEvent],
    sim_time: f64,
    tick_count: u64,
    reason: TerminationReason,
    max_hazard: f32,
    responder_count: usize,
) -> SimResults {
    let total_evacuees = env.total_evacuees();
    let evacuees_rescued: u32 = responders.iter().map(|v| v.rescued_count).sum();

    let offices = env.rooms.iter().filter(|r| r.kind == RoomKind::Office);
    let total_rooms = offices.clone().count();
    let rooms_cleared = offices.filter(|r| r.cleared).count();

    let priorities: Vec<f64> = events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::EvacueeRescued { priority, .. } => Some(priority as f64),
            _ => None,
        })
        .collect();
    let avg_rescue_priority = if priorities.is_empty() {
        DEFAULT_RESCUE_PRIORITY
    } else {
        priorities.iter().sum::<f64>() / priorities.len() as f64
    };

    let denominator = (sim_time * responder_count as f64).max(f64::EPSILON);
    let success_score = f64::from(evacuees_rescued) * avg_rescue_priority / denominator;

    let avg_hazard_exposure = if responders.is_empty() {
        0.0
    } else {
        responders.iter().map(|v| v.hazard_exposure).sum::<f32>() / responders.len() as f32
    };

    SimResults {
        sim_time,
        tick_count,
        termination_reason: reason,
        total_evacuees,
        evacuees_rescued,
        rescue_rate: if total_evacuees == 0 {
            1.0
        } else {
            f64::from(evacuees_rescued) / f64::from(total_evacuees)
        },
        rooms_cleared,
        total_rooms,
        max_hazard,
        avg_hazard_exposure,
        agent_deaths: responders.iter().filter(|v| v.state == AgentState::Dead).count(),
        agents_escaped: responders.iter().filter(|v| v.state == AgentState::Safe).count(),
        avg_rescue_priority,
        success_score,
        agents: responders
            .iter()
            .map(|v| AgentReport {
                id: v.id,
                final_state: v.state,
                distance_traveled: v.distance_traveled,
                rooms_searched: v.rooms_searched,
                evacuees_rescued: v.rescued_count,
                hazard_exposure: v.hazard_exposure,
            })
            .collect(),
    }
}
