//! Simulation parameters.
//!
//! All knobs are grouped into one [`SimParams`] tree mirroring the sections
//! consumers configure (`simulation`, `agents`, `hazard`, `policy`). Every
//! field has a default, so an empty JSON object deserializes to a runnable
//! parameter set. Validation happens once, at `Simulator::new`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Side length of one grid cell in metres.
pub const CELL_SIZE: f32 = 0.5;

/// Width of a door opening in metres (4 cells).
pub const DOOR_WIDTH: f32 = 2.0;

/// Distance at which a waypoint counts as reached, in metres.
pub const ARRIVAL_EPSILON: f32 = 0.1;

/// Extra path cost per unit of danger on the destination cell, in metres.
pub const DANGER_COST_WEIGHT: f32 = 10.0;

/// How far start/goal snapping searches for a usable cell, in cells.
pub const SNAP_RADIUS: i32 = 4;

#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub simulation: SimulationParams,
    pub agents: AgentParams,
    pub hazard: HazardParams,
    pub policy: PolicyParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Seconds of simulated time per tick.
    pub tick_duration: f64,
    /// Hard cap on simulated time, in seconds.
    pub time_cap: f64,
    pub random_seed: u64,
    /// Watchdog: end the run after this many consecutive ticks with no
    /// observable change. `None` disables the watchdog.
    pub no_progress_limit: Option<u32>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            tick_duration: 1.0,
            time_cap: 600.0,
            random_seed: 42,
            no_progress_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    pub count: usize,
    /// Walking speed on open floor, m/s.
    pub speed_hall: f32,
    /// Speed on stair edges, m/s.
    pub speed_stairs: f32,
    /// Speed while dragging an evacuee, m/s.
    pub speed_drag: f32,
    /// Base room-search time, seconds.
    pub service_time_base: f32,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            count: 2,
            speed_hall: 1.5,
            speed_stairs: 0.8,
            speed_drag: 0.6,
            service_time_base: 5.0,
        }
    }
}

/// A single ignition point, in world metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IgnitionPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub floor: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardParams {
    pub enabled: bool,
    /// Ignition rate toward each neighbor, per second. The per-tick
    /// probability is `1 - exp(-spread_rate * dt)`.
    pub spread_rate: f64,
    /// Radius of the danger halo around burning cells, metres.
    pub danger_radius: f32,
    /// Danger level on a burning cell; the halo falls off linearly to zero
    /// at `danger_radius`.
    pub max_danger: f32,
    pub ignition_cells: Vec<IgnitionPoint>,
}

impl Default for HazardParams {
    fn default() -> Self {
        Self {
            enabled: true,
            spread_rate: 0.02,
            danger_radius: 4.0,
            max_danger: 1.0,
            ignition_cells: Vec::new(),
        }
    }
}

/// Which dispatch policy assigns rooms to idle responders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Weighted priority index (the default).
    #[default]
    Priority,
    /// Fixed ascending room-id order.
    StaticOrder,
    /// Nearest uncleared office by Manhattan distance.
    GreedyNearest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyParams {
    pub kind: PolicyKind,
    /// Danger weight in the priority numerator.
    pub lambda: f32,
    /// Constant term in the priority numerator.
    pub beta: f32,
    /// Distance floor in the priority denominator, metres.
    pub d_min: f32,
    /// Service-time growth per `area_ref` of room area.
    pub area_weight: f32,
    /// Scale applied to the expected-evacuee term.
    pub evacuee_weight: f32,
    /// Service-time growth at full room hazard.
    pub hazard_weight: f32,
    /// Room area that yields one `area_weight` of extra service time, m².
    pub area_ref: f32,
    /// Cells above this danger are not expanded when routing to a room.
    pub danger_threshold_path: f32,
    /// Stricter threshold used for escape routes.
    pub danger_threshold_escape: f32,
    /// Danger at the occupied cell that kills an agent outright.
    pub kill_threshold: f32,
    /// Whether non-escape routes avoid dangerous cells at all.
    pub avoid_danger: bool,
    /// Chebyshev margin around each door cell sampled by the door-block
    /// check.
    pub door_block_margin_cells: i32,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            kind: PolicyKind::Priority,
            lambda: 10.0,
            beta: 10.0,
            d_min: 5.0,
            area_weight: 0.5,
            evacuee_weight: 1.0,
            hazard_weight: 0.5,
            area_ref: 100.0,
            danger_threshold_path: 0.80,
            danger_threshold_escape: 0.85,
            kill_threshold: 0.95,
            avoid_danger: true,
            door_block_margin_cells: 2,
        }
    }
}

impl SimParams {
    /// Range-check every parameter. Called once from `Simulator::new`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let err = |msg: &str| Err(ConfigError::Parameter(msg.to_string()));

        if self.simulation.tick_duration <= 0.0 {
            return err("simulation.tick_duration must be positive");
        }
        if self.simulation.time_cap < 0.0 {
            return err("simulation.time_cap must be nonnegative");
        }
        if self.agents.speed_hall <= 0.0
            || self.agents.speed_stairs <= 0.0
            || self.agents.speed_drag <= 0.0
        {
            return err("agent speeds must be positive");
        }
        if self.agents.service_time_base < 0.0 {
            return err("agents.service_time_base must be nonnegative");
        }
        if self.hazard.spread_rate < 0.0 {
            return err("hazard.spread_rate must be nonnegative");
        }
        if self.hazard.danger_radius <= 0.0 {
            return err("hazard.danger_radius must be positive");
        }
        if !(0.0..=1.0).contains(&self.hazard.max_danger) {
            return err("hazard.max_danger must lie in [0, 1]");
        }
        for t in [
            self.policy.danger_threshold_path,
            self.policy.danger_threshold_escape,
            self.policy.kill_threshold,
        ] {
            if !(0.0..=1.0).contains(&t) {
                return err("policy danger thresholds must lie in [0, 1]");
            }
        }
        if self.policy.d_min <= 0.0 {
            return err("policy.d_min must be positive");
        }
        if self.policy.area_ref <= 0.0 {
            return err("policy.area_ref must be positive");
        }
        if self.policy.door_block_margin_cells < 0 {
            return err("policy.door_block_margin_cells must be nonnegative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimParams::default().validate().is_ok());
    }

    #[test]
    fn test_empty_json_deserializes_to_defaults() {
        let params: SimParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.simulation.random_seed, 42);
        assert_eq!(params.agents.count, 2);
        assert!(params.hazard.enabled);
        assert_eq!(params.policy.kind, PolicyKind::Priority);
    }

    #[test]
    fn test_partial_json_overrides() {
        let params: SimParams = serde_json::from_str(
            r#"{"agents": {"count": 5}, "policy": {"kind": "greedy_nearest"}}"#,
        )
        .unwrap();
        assert_eq!(params.agents.count, 5);
        assert_eq!(params.policy.kind, PolicyKind::GreedyNearest);
        assert_eq!(params.agents.speed_hall, 1.5);
    }

    #[test]
    fn test_negative_speed_rejected() {
        let mut params = SimParams::default();
        params.agents.speed_drag = -0.1;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut params = SimParams::default();
        params.policy.kill_threshold = 1.5;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_agents_allowed() {
        let mut params = SimParams::default();
        params.agents.count = 0;
        assert!(params.validate().is_ok());
    }
}
