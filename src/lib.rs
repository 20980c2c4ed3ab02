//! Top-down 2D racing simulation: vehicle dynamics, AI waypoint driving,
//! inter-vehicle collisions and skid-trail generation, driven by a
//! simulation loop that publishes snapshots to a presentation loop.

pub mod clock;
pub mod collision;
pub mod config;
pub mod control;
pub mod error;
pub mod materials;
pub mod math;
pub mod net;
pub mod physics;
pub mod runner;
pub mod spawn;
pub mod state;
pub mod trail;
pub mod vehicle;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use physics::{RaceWorld, TickReport};
