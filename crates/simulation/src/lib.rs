//! Emergency building sweep simulation engine.
//!
//! Responders sweep a cell-decomposed floor plan for evacuees while a fire
//! spreads through it. The engine is headless and deterministic: build a
//! [`Simulator`] from a [`Layout`] plus [`SimParams`], then drive it with
//! [`Simulator::step`] or [`Simulator::run`] and consume the event stream,
//! per-tick snapshots and the final [`SimResults`].
//!
//! Everything observable is a pure function of (layout, parameters, seed).

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod hazard;
pub mod layout;
pub mod pathfind;
pub mod policy;
pub mod results;
pub mod sim_rng;
pub mod simulator;
pub mod snapshot;
pub mod stairs;

pub use agent::{AgentId, AgentState, Responder, ResponderView};
pub use config::{PolicyKind, SimParams};
pub use environment::{CellPos, Environment, RoomId};
pub use error::ConfigError;
pub use events::{EventKind, SimEvent};
pub use layout::{Layout, RoomKind};
pub use results::{SimResults, TerminationReason};
pub use simulator::{SimClock, Simulator};
pub use snapshot::Snapshot;
