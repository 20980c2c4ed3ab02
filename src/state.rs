// ==============================================================================
// state.rs — WHAT CROSSES THE LOOP BOUNDARY
// ------------------------------------------------------------------------------
// Commands flow collaborators -> simulation; Snapshots flow simulation ->
// presentation. Snapshots are immutable copies built once per tick and
// published behind an Arc, so readers never touch live vehicle state.
// ==============================================================================

use serde::Serialize;

use crate::control::ControlKind;
use crate::math::Vec2;
use crate::vehicle::Vehicle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the held control ids of a player vehicle.
    SetHeld { vehicle: String, keys: Vec<String> },
    /// Queue a new AI car; merged at the start of the next tick.
    Spawn,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub name: String,
    pub kind: ControlKind,
    pub livery: [u8; 3],
    pub position: Vec2,
    pub rotation: f64,      // degrees
    pub turning_angle: f64, // degrees
    pub speed: f64,
    pub corners: [Vec2; 4],
}

impl From<&Vehicle> for VehicleSnapshot {
    fn from(v: &Vehicle) -> Self {
        Self {
            name: v.name().to_string(),
            kind: v.kind(),
            livery: v.livery(),
            position: v.position(),
            rotation: v.rotation(),
            turning_angle: v.turning_angle(),
            speed: v.speed(),
            corners: *v.corners(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub sim_rate: f64, // rolling mean ticks/s
    pub vehicles: Vec<VehicleSnapshot>,
}

impl Snapshot {
    pub fn vehicle(&self, name: &str) -> Option<&VehicleSnapshot> {
        self.vehicles.iter().find(|v| v.name == name)
    }
}
