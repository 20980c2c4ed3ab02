//! Control strategies plugged into a [`Vehicle`](crate::vehicle::Vehicle).
//!
//! The kinematic update is shared; only the four intents differ between a
//! human driver and the waypoint follower.

pub mod ai;
pub mod player;

pub use ai::{AiControl, AiTuning, AimList};
pub use player::{KeyBindings, PlayerControl};

use serde::Serialize;

use crate::math::Vec2;

/// What the driver wants this instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intents {
    pub accelerate: bool,
    pub brake: bool,
    pub turn_left: bool,
    pub turn_right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Player,
    Ai,
}

#[derive(Debug, Clone)]
pub enum Control {
    Player(PlayerControl),
    Ai(AiControl),
}

impl Control {
    pub fn kind(&self) -> ControlKind {
        match self {
            Control::Player(_) => ControlKind::Player,
            Control::Ai(_) => ControlKind::Ai,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Control::Player(_))
    }

    /// Intents given the vehicle's current pose and speed.
    pub fn intents(&self, position: &Vec2, facing: &Vec2, speed: f64) -> Intents {
        match self {
            Control::Player(p) => p.intents(),
            Control::Ai(ai) => ai.intents(position, facing, speed),
        }
    }

    /// Hook run after every position integration.
    pub fn after_position_update(&mut self, position: &Vec2) {
        if let Control::Ai(ai) = self {
            ai.advance_aims(position);
        }
    }
}
