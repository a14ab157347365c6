//! Building layout input structs.
//!
//! A [`Layout`] is the validated-on-construction description of one
//! building: rooms, connections, spawn positions. It is plain data — the
//! harness typically deserializes it from JSON — and is compiled into the
//! runtime arena form by `Environment::build`.
//!
//! The constructor helpers at the bottom produce the standard test
//! buildings used by the end-to-end scenarios.

use serde::{Deserialize, Serialize};

/// The four kinds of rooms. Only offices hold evacuees and are cleared by
/// searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Office,
    Hallway,
    Exit,
    Stair,
}

impl RoomKind {
    /// Walled rooms get a perimeter with a door opening; open rooms do not.
    pub fn is_walled(self) -> bool {
        matches!(self, RoomKind::Office | RoomKind::Stair)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSpec {
    pub id: String,
    pub kind: RoomKind,
    #[serde(default)]
    pub floor: i32,
    /// Room center, world metres.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Defaults to `width * height` when absent.
    #[serde(default)]
    pub area: Option<f32>,
    #[serde(default)]
    pub evacuees: u32,
}

impl RoomSpec {
    pub fn area(&self) -> f32 {
        self.area.unwrap_or(self.width * self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub from: String,
    pub to: String,
    /// Walking distance along the edge. Defaults to the center-to-center
    /// distance.
    #[serde(default)]
    pub distance: Option<f32>,
    #[serde(default)]
    pub is_stair: bool,
    /// Door midpoint on the shared wall, world metres. Derived from the
    /// room geometry when absent.
    #[serde(default)]
    pub door: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentStart {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub floor: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub rooms: Vec<RoomSpec>,
    pub connections: Vec<ConnectionSpec>,
    #[serde(default)]
    pub agent_starts: Vec<AgentStart>,
    /// Optional explicit exit list; derived from room kinds when empty.
    #[serde(default)]
    pub exits: Vec<String>,
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

const OFFICE_W: f32 = 5.0;
const OFFICE_H: f32 = 4.0;
const HALL_H: f32 = 2.0;

fn office_row(rooms: &mut Vec<RoomSpec>, conns: &mut Vec<ConnectionSpec>, hallway_id: &str, floor: i32, count: usize, evacuees: &[u32]) {
    for i in 0..count {
        let id = format!("O{}-{}", floor, i + 1);
        let cx = i as f32 * OFFICE_W + OFFICE_W / 2.0;
        rooms.push(RoomSpec {
            id: id.clone(),
            kind: RoomKind::Office,
            floor,
            x: cx,
            y: HALL_H + OFFICE_H / 2.0,
            width: OFFICE_W,
            height: OFFICE_H,
            area: None,
            evacuees: evacuees.get(i).copied().unwrap_or(0),
        });
        conns.push(ConnectionSpec {
            from: hallway_id.to_string(),
            to: id,
            distance: None,
            is_stair: false,
            // Door on the office's south wall, facing the hallway.
            door: Some((cx, HALL_H)),
        });
    }
}

impl Layout {
    /// One hallway with `offices` offices along it and an exit at the west
    /// end. `evacuees[i]` occupies office `O0-{i+1}`; missing entries mean
    /// empty rooms.
    pub fn single_floor_office(offices: usize, evacuees: &[u32]) -> Self {
        let hall_w = offices as f32 * OFFICE_W;
        let mut rooms = vec![
            RoomSpec {
                id: "EXIT".into(),
                kind: RoomKind::Exit,
                floor: 0,
                x: -1.5,
                y: 1.0,
                width: 3.0,
                height: HALL_H,
                area: None,
                evacuees: 0,
            },
            RoomSpec {
                id: "HALL".into(),
                kind: RoomKind::Hallway,
                floor: 0,
                x: hall_w / 2.0,
                y: 1.0,
                width: hall_w,
                height: HALL_H,
                area: None,
                evacuees: 0,
            },
        ];
        let mut connections = vec![ConnectionSpec {
            from: "EXIT".into(),
            to: "HALL".into(),
            distance: None,
            is_stair: false,
            door: None,
        }];
        office_row(&mut rooms, &mut connections, "HALL", 0, offices, evacuees);

        Self {
            name: format!("single-floor office, {offices} rooms"),
            rooms,
            connections,
            agent_starts: vec![AgentStart { x: -1.5, y: 1.0, floor: 0 }],
            exits: Vec::new(),
        }
    }

    /// Two office floors joined by two stairwells (one at each end of the
    /// hallways), exit on the ground floor next to the west stairwell.
    pub fn two_floor_office(offices_per_floor: usize, evacuees_f0: &[u32], evacuees_f1: &[u32]) -> Self {
        let hall_w = offices_per_floor as f32 * OFFICE_W;
        let mut rooms = vec![RoomSpec {
            id: "EXIT".into(),
            kind: RoomKind::Exit,
            floor: 0,
            x: 1.5,
            y: -1.0,
            width: 3.0,
            height: HALL_H,
            area: None,
            evacuees: 0,
        }];
        let mut connections = vec![ConnectionSpec {
            from: "EXIT".into(),
            to: "HALL-0".into(),
            distance: None,
            is_stair: false,
            door: None,
        }];

        for floor in 0..2 {
            let hall_id = format!("HALL-{floor}");
            rooms.push(RoomSpec {
                id: hall_id.clone(),
                kind: RoomKind::Hallway,
                floor,
                x: hall_w / 2.0,
                y: 1.0,
                width: hall_w,
                height: HALL_H,
                area: None,
                evacuees: 0,
            });
            // West and east stairwells flank the hallway.
            for (tag, cx) in [("W", -1.0), ("E", hall_w + 1.0)] {
                let stair_id = format!("S{tag}-{floor}");
                rooms.push(RoomSpec {
                    id: stair_id.clone(),
                    kind: RoomKind::Stair,
                    floor,
                    x: cx,
                    y: 1.0,
                    width: 2.0,
                    height: HALL_H,
                    area: None,
                    evacuees: 0,
                });
                let door_x = if tag == "W" { 0.0 } else { hall_w };
                connections.push(ConnectionSpec {
                    from: hall_id.clone(),
                    to: stair_id,
                    distance: None,
                    is_stair: false,
                    door: Some((door_x, 1.0)),
                });
            }
            let evac = if floor == 0 { evacuees_f0 } else { evacuees_f1 };
            office_row(&mut rooms, &mut connections, &hall_id, floor, offices_per_floor, evac);
        }

        for tag in ["W", "E"] {
            connections.push(ConnectionSpec {
                from: format!("S{tag}-0"),
                to: format!("S{tag}-1"),
                distance: Some(4.0),
                is_stair: true,
                door: None,
            });
        }

        Self {
            name: format!("two-floor office, {offices_per_floor} rooms per floor"),
            rooms,
            connections,
            agent_starts: vec![AgentStart { x: 1.5, y: -1.0, floor: 0 }],
            exits: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_floor_builder_shape() {
        let layout = Layout::single_floor_office(6, &[3, 3, 3, 3, 3, 2]);
        assert_eq!(layout.rooms.len(), 8); // exit + hallway + 6 offices
        assert_eq!(layout.connections.len(), 7);
        let total: u32 = layout.rooms.iter().map(|r| r.evacuees).sum();
        assert_eq!(total, 17);
        assert!(layout
            .rooms
            .iter()
            .all(|r| r.kind == RoomKind::Office || r.evacuees == 0));
    }

    #[test]
    fn test_two_floor_builder_has_two_stairs() {
        let layout = Layout::two_floor_office(3, &[1, 0, 0], &[0, 0, 2]);
        let stair_conns: Vec<_> = layout.connections.iter().filter(|c| c.is_stair).collect();
        assert_eq!(stair_conns.len(), 2);
        let stair_rooms = layout.rooms.iter().filter(|r| r.kind == RoomKind::Stair).count();
        assert_eq!(stair_rooms, 4);
    }

    #[test]
    fn test_layout_roundtrips_through_json() {
        let layout = Layout::single_floor_office(2, &[1, 1]);
        let json = serde_json::to_string(&layout).unwrap();
        let back: Layout = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rooms.len(), layout.rooms.len());
        assert_eq!(back.name, layout.name);
    }

    #[test]
    fn test_room_area_defaults_to_footprint() {
        let layout = Layout::single_floor_office(1, &[1]);
        let office = layout.rooms.iter().find(|r| r.kind == RoomKind::Office).unwrap();
        assert_eq!(office.area(), 20.0);
    }
}
