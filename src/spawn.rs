use rand::Rng;
use tracing::info;

use crate::config::SimConfig;
use crate::control::{AiControl, AiTuning, AimList, Control, PlayerControl};
use crate::error::Result;
use crate::math::{Vec2, vec2};
use crate::trail::TrailTuning;
use crate::vehicle::{Vehicle, VehicleConfig};

const PLAYER_LIVERY: [u8; 3] = [200, 30, 30];

// ---------------------------------------------
// SPAWN MANAGER FOR THE RACE
// ---------------------------------------------
// Owns the shared route and hands out fully built vehicles: the starting
// grid once, then one AI car per spawn request. AI cars are numbered
// sequentially (Car1, Car2, ...) across both.
#[derive(Debug, Clone)]
pub struct SpawnManager {
    vehicle: VehicleConfig,
    trail: TrailTuning,
    ai: AiTuning,
    route: AimList,
    spawn_point: Vec2,
    spread: f64,
    ai_rotation: f64,
    next_number: usize,
}

impl SpawnManager {
    pub fn new(config: &SimConfig) -> Result<Self> {
        let race = &config.race;
        Ok(Self {
            vehicle: config.vehicle,
            trail: config.trail,
            ai: config.ai,
            route: race.aim_list()?,
            spawn_point: vec2(race.spawn_point[0], race.spawn_point[1]),
            spread: race.spawn_spread.max(0.0),
            ai_rotation: race.ai_rotation,
            next_number: 1,
        })
    }

    pub fn route(&self) -> &AimList {
        &self.route
    }

    // ---------------------------------------------------------
    // Starting grid: players first, then AI. Vehicle i starts its trail
    // counter at i so marks don't all land on the same tick.
    // ---------------------------------------------------------
    pub fn build_grid<R: Rng + ?Sized>(&mut self, config: &SimConfig, rng: &mut R) -> Vec<Vehicle> {
        let mut grid = Vec::with_capacity(config.race.players.len() + config.race.ai_starts.len());

        for start in &config.race.players {
            let frame = grid.len() as u32;
            let car = Vehicle::new(
                start.name.clone(),
                Control::Player(PlayerControl::new(start.bindings.clone())),
                self.vehicle,
                vec2(start.position[0], start.position[1]),
                Vec2::zeros(),
            )
            .with_rotation(start.rotation)
            .with_trail(self.trail, frame)
            .with_livery(PLAYER_LIVERY);
            info!("🟢 Player {} on the grid", car.name());
            grid.push(car);
        }

        for start in &config.race.ai_starts {
            let frame = grid.len() as u32;
            let car = self.ai_car(vec2(start[0], start[1]), frame, rng);
            grid.push(car);
        }

        info!("🏁 Grid ready: {} vehicles, {} waypoints", grid.len(), self.route.len());
        grid
    }

    // ---------------------------------------------------------
    // Runtime spawn around the spawn point with a random livery
    // ---------------------------------------------------------
    pub fn spawn_ai<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vehicle {
        let offset = vec2(
            rng.gen_range(-self.spread..=self.spread),
            rng.gen_range(-self.spread..=self.spread),
        );
        self.ai_car(self.spawn_point + offset, 0, rng)
    }

    fn ai_car<R: Rng + ?Sized>(&mut self, position: Vec2, trail_frame: u32, rng: &mut R) -> Vehicle {
        let name = format!("Car{}", self.next_number);
        self.next_number += 1;

        let aims = self.route.jittered(self.ai.jitter, rng);
        let livery = [rng.gen_range(0..=255), rng.gen_range(0..=255), rng.gen_range(0..=255)];

        let car = Vehicle::new(name, Control::Ai(AiControl::new(aims, self.ai)), self.vehicle, position, Vec2::zeros())
            .with_rotation(self.ai_rotation)
            .with_trail(self.trail, trail_frame)
            .with_livery(livery);

        info!(
            "🚗 {} spawned at ({:.1}, {:.1}) livery {:?}",
            car.name(),
            position.x,
            position.y,
            livery
        );
        car
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn manager() -> (SimConfig, SpawnManager) {
        let config = SimConfig::default();
        let spawner = SpawnManager::new(&config).unwrap();
        (config, spawner)
    }

    #[test]
    fn grid_has_players_then_numbered_ai() {
        let (config, mut spawner) = manager();
        let mut rng = StdRng::seed_from_u64(7);
        let grid = spawner.build_grid(&config, &mut rng);

        assert_eq!(grid.len(), 7);
        assert_eq!(grid[0].kind(), ControlKind::Player);
        assert_eq!(grid[0].name(), "Player");
        for (i, car) in grid.iter().enumerate().skip(1) {
            assert_eq!(car.kind(), ControlKind::Ai);
            assert_eq!(car.name(), format!("Car{i}"));
        }
    }

    #[test]
    fn grid_trail_counters_are_staggered() {
        let (config, mut spawner) = manager();
        let mut rng = StdRng::seed_from_u64(7);
        let frames: Vec<u32> = spawner.build_grid(&config, &mut rng).iter().map(Vehicle::trail_frame).collect();
        assert_eq!(frames, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn spawns_continue_numbering_near_spawn_point() {
        let (config, mut spawner) = manager();
        let mut rng = StdRng::seed_from_u64(11);
        spawner.build_grid(&config, &mut rng);

        for n in 7..12 {
            let car = spawner.spawn_ai(&mut rng);
            assert_eq!(car.name(), format!("Car{n}"));
            let d = car.position() - vec2(60.0, 95.0);
            assert!(d.x.abs() <= 5.0 && d.y.abs() <= 5.0);
            assert!(car.velocity().norm() == 0.0);
        }
    }

    #[test]
    fn same_seed_same_race() {
        let (config, _) = manager();
        let mut a = SpawnManager::new(&config).unwrap();
        let mut b = SpawnManager::new(&config).unwrap();
        let car_a = a.spawn_ai(&mut StdRng::seed_from_u64(3));
        let car_b = b.spawn_ai(&mut StdRng::seed_from_u64(3));
        assert_eq!(car_a.position(), car_b.position());
        assert_eq!(car_a.livery(), car_b.livery());
    }
}
