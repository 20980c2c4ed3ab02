// ==============================================================================
// vehicle.rs — TOP-DOWN VEHICLE DYNAMICS
// ==============================================================================
// One flat record per vehicle; the only per-variant behaviour is the Control
// that produces intents. Each tick the world calls, in order:
//
//   update_rotation(dt)            steering angle + heading
//   update_velocity(dt, material)  engine + friction + external forces
//   update_position(dt, course)    integrate, clamp to course, rebuild quad
//
// Units: world units ≈ metres, seconds, kg, N. Angles in degrees unless a
// name says radians.
//
// Invariants (enforced by the setters, never bypassed):
// - rotation ∈ [0, 360), facing == heading(rotation)
// - |turning_angle| <= max_turn_angle
// - corners always describe the current position + facing
// - external_forces is drained by exactly one velocity update
// ==============================================================================

use std::f64::consts::FRAC_PI_2;

use serde::Deserialize;

use crate::control::{Control, ControlKind, Intents};
use crate::materials::SurfaceMaterial;
use crate::math::{self, Vec2, vec2};
use crate::trail::{TrailRecorder, TrailSegment, TrailTuning};

pub const GRAVITY: f64 = 9.81; // m/s²

// --- air drag: 0.5 * ρ * Cd * A * v² ---
const AIR_DENSITY: f64 = 1.225; // kg/m³
const DRAG_COEFFICIENT: f64 = 0.6;
const FRONTAL_AREA: f64 = 20.0; // generous on purpose, caps top speed

// --- steering ---
const TURN_SPEED_CAP: f64 = 20.0; // speed at which turning reaches full authority
const STEER_EASE_DEGREES: f64 = 10.0; // turning response eases in up to this angle
const HEADING_RATE: f64 = 200.0; // deg/s at full authority

// --- tyre slip correction ---
const SLIP_THRESHOLD: f64 = 0.01; // rad
const SLIP_RELAXATION: f64 = 0.7; // s, larger = lazier pull toward the wheels

// --- footprint ---
pub const HALF_LENGTH: f64 = 2.25; // along facing
pub const HALF_WIDTH: f64 = 1.5; // across facing
/// Offset from `position` (sprite origin) to the body center.
pub const BODY_OFFSET: [f64; 2] = [2.25, 1.5];

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub mass: f64,           // kg
    pub engine_force: f64,   // N, constant while accelerating
    pub brake_force: f64,    // N, replaces rolling resistance while braking
    pub max_turn_angle: f64, // degrees
    pub turn_rate: f64,      // degrees / s of steering input
}

pub const HATCHBACK: VehicleConfig = VehicleConfig {
    mass: 1500.0,
    engine_force: 14_000.0,
    brake_force: 40_000.0,
    max_turn_angle: 10.0,
    turn_rate: 90.0,
};

pub const HOT_HATCH: VehicleConfig = VehicleConfig {
    mass: 1350.0,
    engine_force: 18_000.0,
    brake_force: 40_000.0,
    max_turn_angle: 12.0,
    turn_rate: 110.0,
};

impl Default for VehicleConfig {
    fn default() -> Self {
        HATCHBACK
    }
}

/// Drivable area. Positions are clamped to `[0, width - 4] x [0, height - 4]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Course {
    pub width: f64,
    pub height: f64,
}

impl Course {
    pub const BOUND_MARGIN: f64 = 4.0;

    pub fn max_x(&self) -> f64 {
        (self.width - Self::BOUND_MARGIN).max(0.0)
    }

    pub fn max_y(&self) -> f64 {
        (self.height - Self::BOUND_MARGIN).max(0.0)
    }

    pub fn center(&self) -> Vec2 {
        vec2(self.width * 0.5, self.height * 0.5)
    }
}

impl Default for Course {
    fn default() -> Self {
        Self {
            width: 192.0,
            height: 108.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    name: String,
    control: Control,
    config: VehicleConfig,
    livery: [u8; 3],

    position: Vec2,
    velocity: Vec2,
    rotation: f64,      // degrees, [0, 360)
    turning_angle: f64, // degrees, ±max_turn_angle
    facing: Vec2,       // unit, derived from rotation

    external_forces: Vec2, // N, single-tick accumulator
    corners: [Vec2; 4],    // 0,1 rear; 2,3 front
    slip_angle: f64,       // radians, wheels vs velocity

    trail: TrailRecorder,
}

impl Vehicle {
    pub fn new(name: impl Into<String>, control: Control, config: VehicleConfig, position: Vec2, velocity: Vec2) -> Self {
        let mut v = Self {
            name: name.into(),
            control,
            config,
            livery: [0, 0, 0],
            position,
            velocity,
            rotation: 0.0,
            turning_angle: 0.0,
            facing: vec2(1.0, 0.0),
            external_forces: Vec2::zeros(),
            corners: [position; 4],
            slip_angle: 0.0,
            trail: TrailRecorder::new(TrailTuning::default(), 0, [position; 2]),
        };
        v.set_rotation(0.0);
        v.refresh_corners();
        v.trail = TrailRecorder::new(TrailTuning::default(), 0, v.front_corners());
        v
    }

    /// Replaces the trail recorder; `start_frame` staggers sampling.
    pub fn with_trail(mut self, tuning: TrailTuning, start_frame: u32) -> Self {
        self.trail = TrailRecorder::new(tuning, start_frame, self.front_corners());
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.set_rotation(degrees);
        self.refresh_corners();
        self.trail = TrailRecorder::new(self.trail_tuning(), self.trail.frame(), self.front_corners());
        self
    }

    pub fn with_livery(mut self, rgb: [u8; 3]) -> Self {
        self.livery = rgb;
        self
    }

    fn trail_tuning(&self) -> TrailTuning {
        self.trail.tuning()
    }

    // ------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut Control {
        &mut self.control
    }

    pub fn kind(&self) -> ControlKind {
        self.control.kind()
    }

    pub fn is_player(&self) -> bool {
        self.control.is_player()
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn mass(&self) -> f64 {
        self.config.mass
    }

    pub fn livery(&self) -> [u8; 3] {
        self.livery
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn turning_angle(&self) -> f64 {
        self.turning_angle
    }

    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    pub fn corners(&self) -> &[Vec2; 4] {
        &self.corners
    }

    pub fn slip_angle(&self) -> f64 {
        self.slip_angle
    }

    pub fn pending_external_force(&self) -> Vec2 {
        self.external_forces
    }

    pub fn trail_frame(&self) -> u32 {
        self.trail.frame()
    }

    /// Geometric center of the footprint.
    pub fn body_center(&self) -> Vec2 {
        self.position + vec2(BODY_OFFSET[0], BODY_OFFSET[1])
    }

    /// Unit vector the front wheels point along.
    pub fn wheel_direction(&self) -> Vec2 {
        math::heading(self.rotation + self.turning_angle)
    }

    pub fn intents(&self) -> Intents {
        self.control.intents(&self.position, &self.facing, self.speed())
    }

    pub fn wants_reset(&self) -> bool {
        match &self.control {
            Control::Player(p) => p.wants_reset(),
            Control::Ai(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // invariant-keeping setters
    // ------------------------------------------------------------------
    pub fn set_rotation(&mut self, degrees: f64) {
        assert!(degrees.is_finite(), "{}: non-finite rotation {degrees}", self.name);
        self.rotation = math::wrap_degrees(degrees);
        self.facing = math::heading(self.rotation);
    }

    pub fn set_turning_angle(&mut self, degrees: f64) {
        assert!(degrees.is_finite(), "{}: non-finite turning angle {degrees}", self.name);
        let max = self.config.max_turn_angle.abs();
        self.turning_angle = degrees.clamp(-max, max);
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        assert!(velocity.x.is_finite() && velocity.y.is_finite(), "{}: non-finite velocity", self.name);
        self.velocity = velocity;
    }

    /// Queues a force for the next velocity update only.
    pub fn add_external_force(&mut self, force: Vec2) {
        self.external_forces += force;
    }

    /// Moves the vehicle without touching velocity (collision correction,
    /// reset). Clamped to the course; corners are rebuilt.
    pub fn nudge(&mut self, delta: Vec2, course: &Course) {
        let target = self.position + delta;
        self.position = vec2(target.x.clamp(0.0, course.max_x()), target.y.clamp(0.0, course.max_y()));
        self.refresh_corners();
    }

    pub fn teleport(&mut self, position: Vec2, course: &Course) {
        self.position = vec2(position.x.clamp(0.0, course.max_x()), position.y.clamp(0.0, course.max_y()));
        self.refresh_corners();
    }

    // ==================================================================
    // Rotation
    // ------------------------------------------------------------------
    // turn_mult = clamp(|v|, 0, cap) / cap        slow cars turn slowly
    // rot_mult  = sin(clamp(|ta|, 0, 10)/10 * π/2)  ease-in on small angles
    // step      = min(200 * dt * turn_mult * rot_mult, |ta|)
    // heading moves by step toward the turning side; ta decays by the same
    // ==================================================================
    pub fn update_rotation(&mut self, dt: f64) {
        let intents = self.intents();
        let turn_mult = self.speed().clamp(0.0, TURN_SPEED_CAP) / TURN_SPEED_CAP;
        let rot_mult =
            (self.turning_angle.abs().clamp(0.0, STEER_EASE_DEGREES) / STEER_EASE_DEGREES * FRAC_PI_2).sin();

        if intents.turn_left {
            self.set_turning_angle(self.turning_angle - dt * self.config.turn_rate);
        }
        if intents.turn_right {
            self.set_turning_angle(self.turning_angle + dt * self.config.turn_rate);
        }

        // stationary cars don't rotate
        if self.turning_angle == 0.0 || math::is_zero(&self.velocity) {
            return;
        }

        let step = (HEADING_RATE * dt * turn_mult * rot_mult).min(self.turning_angle.abs());
        let sign = self.turning_angle.signum();
        self.set_rotation(self.rotation + sign * step);
        self.set_turning_angle(self.turning_angle - sign * step);
    }

    // ==================================================================
    // Velocity
    // ------------------------------------------------------------------
    // F = engine + friction + external  (external drained here)
    // v' = v + F/m * dt
    // then pull v' toward the wheel heading by a dt-weighted blend, and snap
    // components to zero instead of letting friction reverse them
    // ==================================================================
    pub fn update_velocity(&mut self, dt: f64, material: &SurfaceMaterial) {
        let intents = self.intents();
        let wheel = self.wheel_direction();

        let engine = if intents.accelerate {
            self.facing * self.config.engine_force
        } else {
            Vec2::zeros()
        };
        let friction = self.friction(&wheel, material, intents.brake);
        let external = std::mem::replace(&mut self.external_forces, Vec2::zeros());

        let acceleration = (engine + friction + external) / self.config.mass;
        let mut next = self.velocity + acceleration * dt;

        if math::is_zero(&self.velocity) {
            self.slip_angle = 0.0;
        } else {
            let slip = math::signed_angle(&self.velocity, &wheel);
            self.slip_angle = slip;
            // dt == 0 would divide by zero; nothing to blend anyway
            if slip.abs() > SLIP_THRESHOLD && dt > 0.0 {
                let k = SLIP_RELAXATION / dt;
                let aligned = math::rotate(&next, slip);
                next = (aligned + next * k) / (k + 1.0);
            }
        }

        if !intents.accelerate {
            if next.x * self.velocity.x < 0.0 {
                next.x = 0.0;
            }
            if next.y * self.velocity.y < 0.0 {
                next.y = 0.0;
            }
        }

        self.set_velocity(next);
    }

    /// Rolling (or braking) + quadratic drag + lateral scrub, all opposing
    /// the direction of travel. Zero when stationary.
    pub fn friction(&self, wheel: &Vec2, material: &SurfaceMaterial, braking: bool) -> Vec2 {
        let Ok(direction) = math::normalize(&self.velocity) else {
            return Vec2::zeros();
        };
        let speed = self.speed();
        let weight = self.config.mass * GRAVITY;

        let rolling = if braking {
            self.config.brake_force
        } else {
            material.rolling_resistance * weight
        };
        let air = 0.5 * AIR_DENSITY * DRAG_COEFFICIENT * FRONTAL_AREA * speed * speed * material.air_resistance_mult;
        let scrub = material.ground_resistance * weight * (1.0 - direction.dot(wheel)).abs();

        -direction * (rolling + air + scrub)
    }

    // ==================================================================
    // Position
    // ==================================================================
    pub fn update_position(&mut self, dt: f64, course: &Course) {
        let mut next = self.position + self.velocity * dt;

        if next.x < 0.0 {
            next.x = 0.0;
            self.velocity.x = 0.0;
        } else if next.x > course.max_x() {
            next.x = course.max_x();
            self.velocity.x = 0.0;
        }
        if next.y < 0.0 {
            next.y = 0.0;
            self.velocity.y = 0.0;
        } else if next.y > course.max_y() {
            next.y = course.max_y();
            self.velocity.y = 0.0;
        }

        assert!(next.x.is_finite() && next.y.is_finite(), "{}: non-finite position", self.name);
        self.position = next;
        self.refresh_corners();
        self.control.after_position_update(&self.position);
    }

    /// Rebuilds the oriented footprint from position + facing.
    fn refresh_corners(&mut self) {
        let c = self.body_center();
        let f = self.facing * HALF_LENGTH;
        let side = vec2(self.facing.y, -self.facing.x) * HALF_WIDTH;
        self.corners = [c - f + side, c - f - side, c + f + side, c + f - side];
    }

    pub fn front_corners(&self) -> [Vec2; 2] {
        [self.corners[2], self.corners[3]]
    }

    /// Advances the skid-mark counter; returns a segment on sampling frames.
    pub fn record_trail(&mut self) -> Option<TrailSegment> {
        let corners = self.front_corners();
        self.trail.sample(&self.name, corners, self.slip_angle)
    }
}
