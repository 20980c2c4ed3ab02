// src/physics.rs
//
// RaceWorld: the single writer of physics state. Owns every vehicle plus
// the terrain, resolver and spawner, and advances them one tick at a time.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::collision::{CollisionResolver, ForceImpulse};
use crate::config::SimConfig;
use crate::control::Control;
use crate::error::{Result, SimError};
use crate::materials::{TerrainSource, surface_at};
use crate::math::Vec2;
use crate::spawn::SpawnManager;
use crate::state::{Command, Snapshot, VehicleSnapshot};
use crate::trail::TrailSegment;
use crate::vehicle::{Course, Vehicle};

/// What one tick produced besides mutated vehicles.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub trails: Vec<TrailSegment>,
    pub impulses: Vec<ForceImpulse>,
}

impl TickReport {
    /// Number of colliding pairs this tick.
    pub fn contacts(&self) -> usize {
        self.impulses.len() / 2
    }
}

pub struct RaceWorld {
    vehicles: Vec<Vehicle>,
    pending: Vec<Vehicle>, // merged at the start of the next tick
    terrain: Box<dyn TerrainSource>,
    course: Course,
    resolver: CollisionResolver,
    spawner: SpawnManager,
    rng: StdRng,
    tick: u64,
}

impl RaceWorld {
    /// Empty world: no vehicles yet, everything else from `config`.
    pub fn new(config: &SimConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            vehicles: Vec::new(),
            pending: Vec::new(),
            terrain: config.terrain.build(&config.course)?,
            course: config.course,
            resolver: CollisionResolver::new(config.collision),
            spawner: SpawnManager::new(config)?,
            rng: StdRng::seed_from_u64(seed),
            tick: 0,
        })
    }

    /// World with the configured starting grid in place.
    pub fn from_config(config: &SimConfig, seed: u64) -> Result<Self> {
        let mut world = Self::new(config, seed)?;
        let grid = world.spawner.build_grid(config, &mut world.rng);
        for car in grid {
            world.add_vehicle(car)?;
        }
        info!("🌍 Race world ready (seed {seed})");
        Ok(world)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, name: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.name() == name)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }

    /// Adds a vehicle to the live collection. Only call between ticks.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<()> {
        if self.vehicle(vehicle.name()).is_some() {
            return Err(SimError::DuplicateVehicle(vehicle.name().to_string()));
        }
        self.vehicles.push(vehicle);
        Ok(())
    }

    // ---------------------------------------------------------
    // Collaborator input. Spawns are queued, never merged here.
    // ---------------------------------------------------------
    pub fn apply_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SetHeld { vehicle, keys } => {
                let car = self
                    .vehicles
                    .iter_mut()
                    .find(|v| v.name() == vehicle)
                    .ok_or_else(|| SimError::UnknownVehicle(vehicle.clone()))?;
                match car.control_mut() {
                    Control::Player(p) => p.set_held(keys),
                    Control::Ai(_) => return Err(SimError::NotPlayerControlled(vehicle)),
                }
            }
            Command::Spawn => {
                let car = self.spawner.spawn_ai(&mut self.rng);
                self.pending.push(car);
            }
        }
        Ok(())
    }

    fn merge_pending(&mut self) {
        for car in std::mem::take(&mut self.pending) {
            if let Err(e) = self.add_vehicle(car) {
                warn!("⚠️ Dropped queued spawn: {e}");
            }
        }
    }

    // =========================================================
    // One tick
    // ---------------------------------------------------------
    // 1) merge queued spawns
    // 2) per vehicle: rotation -> velocity -> position (+ reset key)
    // 3) collisions over the updated positions; residual forces are
    //    queued on the vehicles for the next velocity update
    // 4) trail sampling
    // =========================================================
    pub fn step(&mut self, dt: f64) -> TickReport {
        assert!(dt >= 0.0, "negative dt {dt}");
        self.merge_pending();

        let reset_to = self.course.center();
        for car in &mut self.vehicles {
            let material = surface_at(self.terrain.as_ref(), &car.body_center());
            car.update_rotation(dt);
            car.update_velocity(dt, material);
            car.update_position(dt, &self.course);

            if car.wants_reset() {
                car.teleport(reset_to, &self.course);
                car.set_velocity(Vec2::zeros());
            }
        }

        let impulses = self.resolver.resolve(&mut self.vehicles, &self.course);
        for impulse in &impulses {
            self.vehicles[impulse.vehicle].add_external_force(impulse.force);
        }

        let trails: Vec<TrailSegment> = self.vehicles.iter_mut().filter_map(Vehicle::record_trail).collect();

        self.tick += 1;
        if !impulses.is_empty() {
            debug!(tick = self.tick, contacts = impulses.len() / 2, "collisions resolved");
        }

        TickReport {
            tick: self.tick,
            trails,
            impulses,
        }
    }

    pub fn snapshot(&self, sim_rate: f64) -> Snapshot {
        Snapshot {
            tick: self.tick,
            sim_rate,
            vehicles: self.vehicles.iter().map(VehicleSnapshot::from).collect(),
        }
    }
}
