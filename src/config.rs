// ==============================================================================
// config.rs — RACE SETUP
// ------------------------------------------------------------------------------
// Everything tunable lives here and deserializes from one JSON file. Every
// section has defaults, so `{}` is a valid config describing the stock race:
// one player, six AI cars on an oval around the course center, all tarmac.
// ==============================================================================

use std::f64::consts::TAU;
use std::path::Path;

use serde::Deserialize;

use crate::collision::CollisionTuning;
use crate::control::{AiTuning, AimList, KeyBindings};
use crate::error::{Result, SimError};
use crate::materials::{SurfaceKind, TerrainGrid, TerrainSource, UniformTerrain};
use crate::trail::TrailTuning;
use crate::vehicle::{Course, VehicleConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub course: Course,
    pub vehicle: VehicleConfig,
    pub collision: CollisionTuning,
    pub trail: TrailTuning,
    pub ai: AiTuning,
    pub runtime: RuntimeConfig,
    pub race: RaceConfig,
    pub terrain: TerrainConfig,
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|e| match e {
            SimError::Json(e) => SimError::Config {
                path: path.display().to_string(),
                message: e.to_string(),
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Fails fast on anything the simulation can't run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |section: &str, message: &str| SimError::Config {
            path: section.to_string(),
            message: message.to_string(),
        };

        if !(self.course.width > Course::BOUND_MARGIN && self.course.height > Course::BOUND_MARGIN) {
            return Err(invalid("course", "width and height must exceed the bound margin"));
        }
        if !(self.vehicle.mass > 0.0) {
            return Err(invalid("vehicle.mass", "must be positive"));
        }
        if !(self.collision.player_weight > 0.0) {
            return Err(invalid("collision.player_weight", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.collision.correction_fraction) {
            return Err(invalid("collision.correction_fraction", "must be within 0..=1"));
        }
        if !(self.collision.separation_stiffness >= 0.0) {
            return Err(invalid("collision.separation_stiffness", "must not be negative"));
        }
        if self.trail.every_n == 0 || self.trail.capacity == 0 {
            return Err(invalid("trail", "capacity and every_n must be at least 1"));
        }
        if !(self.runtime.max_dt > 0.0) {
            return Err(invalid("runtime.max_dt", "must be positive"));
        }
        if self.runtime.presentation_interval_ms == 0 {
            return Err(invalid("runtime.presentation_interval_ms", "must be at least 1"));
        }
        if self.race.players.is_empty() && self.race.ai_starts.is_empty() {
            return Err(invalid("race", "no vehicles on the grid"));
        }
        // waypoint problems keep their own error variants
        self.race.aim_list()?;
        Ok(())
    }
}

// ---------------------------------------------
// RUNTIME (loop cadence, channels, viewer bridge)
// ---------------------------------------------
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub presentation_interval_ms: u64,
    pub max_dt: f64,        // s, cap on a single wall-clock step
    pub sim_idle_us: u64,   // sleep between ticks; 0 = just yield
    pub trail_channel: usize,
    pub listen: Option<String>, // websocket bind address
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            presentation_interval_ms: 5,
            max_dt: 0.25,
            sim_idle_us: 0,
            trail_channel: 1024,
            listen: None,
        }
    }
}

// ---------------------------------------------
// RACE (grid + route)
// ---------------------------------------------
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerStart {
    pub name: String,
    pub position: [f64; 2],
    pub rotation: f64, // degrees
    pub bindings: KeyBindings,
}

impl Default for PlayerStart {
    fn default() -> Self {
        Self {
            name: "Player".into(),
            position: [120.0, 95.0],
            rotation: 180.0,
            bindings: KeyBindings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub waypoints: Vec<[f64; 2]>,
    pub players: Vec<PlayerStart>,
    pub ai_starts: Vec<[f64; 2]>,
    pub ai_rotation: f64,      // degrees
    pub spawn_point: [f64; 2], // runtime spawns scatter around this
    pub spawn_spread: f64,     // ± world units per axis
}

impl RaceConfig {
    pub fn aim_list(&self) -> Result<AimList> {
        AimList::from_pairs(&self.waypoints)
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            waypoints: oval_route(16),
            players: vec![PlayerStart::default()],
            ai_starts: vec![
                [140.0, 90.0],
                [130.0, 95.0],
                [120.0, 90.0],
                [100.0, 95.0],
                [80.0, 90.0],
                [60.0, 95.0],
            ],
            ai_rotation: 180.0,
            spawn_point: [60.0, 95.0],
            spawn_spread: 5.0,
        }
    }
}

/// Oval around the default course center, starting at the bottom straight
/// and running toward -x.
fn oval_route(points: usize) -> Vec<[f64; 2]> {
    let (cx, cy, rx, ry) = (96.0, 54.0, 70.0, 38.0);
    (0..points)
        .map(|k| {
            let theta = TAU * (k as f64 / points as f64) + TAU / 4.0;
            [cx + rx * theta.cos(), cy + ry * theta.sin()]
        })
        .collect()
}

// ---------------------------------------------
// TERRAIN
// ---------------------------------------------
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerrainConfig {
    Uniform { surface: SurfaceKind },
    Grid { rows: Vec<String> },
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig::Uniform {
            surface: SurfaceKind::Tarmac,
        }
    }
}

impl TerrainConfig {
    pub fn build(&self, course: &Course) -> Result<Box<dyn TerrainSource>> {
        Ok(match self {
            TerrainConfig::Uniform { surface } => Box::new(UniformTerrain(*surface)),
            TerrainConfig::Grid { rows } => Box::new(TerrainGrid::from_rows(rows, course.width, course.height)?),
        })
    }
}
