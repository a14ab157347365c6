//! Construction-time error types.
//!
//! The simulator never starts with a bad world: parameter and layout
//! problems surface here, from `Simulator::new`. Per-tick conditions
//! (unreachable paths, deaths, timeouts) are events or terminal states,
//! never errors.

use thiserror::Error;

/// Raised when parameters are out of range or a layout violates its
/// structural invariants.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parameter out of range: {0}")]
    Parameter(String),

    #[error("layout has no rooms")]
    EmptyLayout,

    #[error("duplicate room id `{0}`")]
    DuplicateRoom(String),

    #[error("connection references unknown room `{0}`")]
    UnknownRoom(String),

    #[error("exit list names `{0}`, which is not an exit room")]
    NotAnExit(String),

    #[error("layout has no exit room")]
    NoExit,

    #[error("room `{0}` cannot reach any exit")]
    Unreachable(String),

    #[error("office `{0}` must connect to exactly one hallway, found {1}")]
    OfficeHallway(String, usize),

    #[error("room `{0}` of kind {1} declares {2} evacuees; only offices hold evacuees")]
    EvacueesOutsideOffice(String, String, u32),

    #[error("stair connection `{0}` -> `{1}` must join stair rooms on different floors")]
    BadStair(String, String),

    #[error("connection `{0}` -> `{1}` crosses floors without being a stair")]
    CrossFloorConnection(String, String),

    #[error("ignition cell ({x:.2}, {y:.2}) on floor {floor} is outside the layout")]
    BadIgnition { x: f32, y: f32, floor: i32 },
}
