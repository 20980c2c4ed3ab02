//! End-to-end race scenarios under a fixed dt.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use race_physics::collision::{CollisionResolver, CollisionTuning};
use race_physics::control::{AiControl, AiTuning, AimList, Control, KeyBindings, PlayerControl};
use race_physics::materials::{GRASS, TARMAC};
use race_physics::math::{Vec2, vec2};
use race_physics::state::Command;
use race_physics::vehicle::{Course, HATCHBACK, HOT_HATCH, HALF_LENGTH, HALF_WIDTH, Vehicle};
use race_physics::{RaceWorld, SimConfig};

const DT: f64 = 1.0 / 60.0;

fn player(name: &str, position: Vec2, velocity: Vec2) -> Vehicle {
    Vehicle::new(
        name,
        Control::Player(PlayerControl::new(KeyBindings::default())),
        HATCHBACK,
        position,
        velocity,
    )
}

fn ai(name: &str, waypoints: &[[f64; 2]], position: Vec2, velocity: Vec2) -> Vehicle {
    let aims = AimList::from_pairs(waypoints).unwrap();
    Vehicle::new(name, Control::Ai(AiControl::new(aims, AiTuning::default())), HATCHBACK, position, velocity)
}

fn empty_world() -> RaceWorld {
    RaceWorld::new(&SimConfig::default(), 0).unwrap()
}

fn hold(world: &mut RaceWorld, vehicle: &str, keys: &[&str]) {
    world
        .apply_command(Command::SetHeld {
            vehicle: vehicle.into(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
        .unwrap();
}

fn ai_indices(v: &Vehicle) -> (usize, usize) {
    match v.control() {
        Control::Ai(ai) => (ai.current_index(), ai.next_index()),
        Control::Player(_) => panic!("{} is not AI", v.name()),
    }
}

#[test]
fn heading_and_steering_stay_in_range_under_random_dt() {
    let mut world = empty_world();
    world.add_vehicle(player("P", vec2(96.0, 54.0), vec2(18.0, 0.0))).unwrap();
    let mut rng = StdRng::seed_from_u64(99);

    for tick in 0..3000 {
        let keys: &[&str] = match (tick / 120) % 3 {
            0 => &["W", "D"],
            1 => &["W", "A"],
            _ => &["W"],
        };
        hold(&mut world, "P", keys);
        world.step(rng.gen_range(0.0..0.05));

        let p = world.vehicle("P").unwrap();
        assert!((0.0..360.0).contains(&p.rotation()), "rotation {}", p.rotation());
        assert!(p.turning_angle().abs() <= HATCHBACK.max_turn_angle + 1e-12);
        assert!(p.position().x.is_finite() && p.position().y.is_finite());
    }
}

#[test]
fn head_on_equal_masses_stop_dead() {
    let resolver = CollisionResolver::new(CollisionTuning::default());
    let course = Course::default();
    let mut cars = vec![
        ai("A", &[[0.0, 0.0]], vec2(50.0, 50.0), vec2(10.0, 0.0)),
        ai("B", &[[0.0, 0.0]], vec2(53.0, 50.0), vec2(-10.0, 0.0)),
    ];

    let impulses = resolver.resolve(&mut cars, &course);

    assert_eq!(impulses.len(), 2);
    for car in &cars {
        assert!(car.velocity().norm() < 1e-12, "{} still moving", car.name());
    }
    // pushed apart
    assert!(cars[1].position().x - cars[0].position().x > 3.0);
}

#[test]
fn unweighted_collision_conserves_momentum() {
    let resolver = CollisionResolver::new(CollisionTuning::default());
    let course = Course::default();
    let a = ai("A", &[[0.0, 0.0]], vec2(50.0, 50.0), vec2(12.0, 3.0));
    let b = Vehicle::new(
        "B",
        Control::Ai(AiControl::new(AimList::from_pairs(&[[0.0, 0.0]]).unwrap(), AiTuning::default())),
        HOT_HATCH,
        vec2(52.0, 51.0),
        vec2(-4.0, 1.0),
    );
    let before = a.velocity() * a.mass() + b.velocity() * b.mass();
    let total = a.mass() + b.mass();

    let mut cars = vec![a, b];
    assert!(!resolver.resolve(&mut cars, &course).is_empty());

    let expected = before / total;
    for car in &cars {
        assert!((car.velocity() - expected).norm() < 1e-9);
    }
}

#[test]
fn corners_match_the_footprint_after_every_tick() {
    let mut world = empty_world();
    world.add_vehicle(player("P", vec2(60.0, 40.0), vec2(15.0, 5.0))).unwrap();
    hold(&mut world, "P", &["W", "A"]);

    for _ in 0..200 {
        world.step(DT);
        let p = world.vehicle("P").unwrap();
        let c = p.corners();

        let length = c[2] - c[0];
        let width = c[0] - c[1];
        assert!((length.norm() - 2.0 * HALF_LENGTH).abs() < 1e-9);
        assert!((width.norm() - 2.0 * HALF_WIDTH).abs() < 1e-9);
        assert!(length.dot(&width).abs() < 1e-9);
        assert!((length.normalize() - p.facing()).norm() < 1e-9);

        let centroid = (c[0] + c[1] + c[2] + c[3]) / 4.0;
        assert!((centroid - p.body_center()).norm() < 1e-9);
    }
}

#[test]
fn wall_stops_the_crossing_axis_only() {
    let mut world = empty_world();
    world
        .add_vehicle(player("P", vec2(1.0, 50.0), vec2(-20.0, 5.0)).with_rotation(180.0))
        .unwrap();

    world.step(0.1);

    let p = world.vehicle("P").unwrap();
    assert_eq!(p.position().x, 0.0);
    assert_eq!(p.velocity().x, 0.0);
    assert!(p.velocity().y > 0.0);
}

#[test]
fn grass_slows_harder_than_tarmac() {
    let mut on_tarmac = player("T", vec2(50.0, 50.0), vec2(20.0, 0.0));
    let mut on_grass = player("G", vec2(50.0, 50.0), vec2(20.0, 0.0));

    for _ in 0..100 {
        on_tarmac.update_velocity(0.01, &TARMAC);
        on_grass.update_velocity(0.01, &GRASS);
    }
    assert!(on_grass.speed() < on_tarmac.speed());
}

#[test]
fn grass_terrain_costs_speed_in_a_world() {
    let tarmac: SimConfig = SimConfig::from_json(r#"{"terrain":{"kind":"uniform","surface":"tarmac"}}"#).unwrap();
    let grass: SimConfig = SimConfig::from_json(r#"{"terrain":{"kind":"uniform","surface":"grass"}}"#).unwrap();

    let mut speeds = Vec::new();
    for config in [&tarmac, &grass] {
        let mut world = RaceWorld::new(config, 0).unwrap();
        world.add_vehicle(player("P", vec2(20.0, 50.0), vec2(20.0, 0.0))).unwrap();
        for _ in 0..60 {
            world.step(DT);
        }
        speeds.push(world.vehicle("P").unwrap().speed());
    }
    assert!(speeds[1] < speeds[0]);
}

#[test]
fn three_waypoints_cycle_in_order() {
    let aims = AimList::from_pairs(&[[20.0, 20.0], [150.0, 20.0], [150.0, 90.0]]).unwrap();
    let mut control = AiControl::new(aims, AiTuning::default());

    let mut visited = vec![control.current_index()];
    for _ in 0..8 {
        let arrived_at = control.current_aim();
        assert!(control.advance_aims(&arrived_at));
        visited.push(control.current_index());
    }
    assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
}

#[test]
fn two_point_route_advances_within_one_tick() {
    let mut world = empty_world();
    let route = [[50.0, 50.0], [60.0, 50.0]];
    world.add_vehicle(ai("Car1", &route, vec2(50.0, 50.0), vec2(100.0, 0.0))).unwrap();
    assert_eq!(ai_indices(world.vehicle("Car1").unwrap()), (0, 1));

    world.step(0.1);

    assert_eq!(ai_indices(world.vehicle("Car1").unwrap()), (1, 0));
}

#[test]
fn ai_on_two_point_route_gets_going_from_rest() {
    let mut world = empty_world();
    world
        .add_vehicle(ai("Car1", &[[50.0, 50.0], [120.0, 50.0]], vec2(50.0, 50.0), Vec2::zeros()))
        .unwrap();

    let mut furthest: f64 = 50.0;
    for _ in 0..600 {
        world.step(DT);
        furthest = furthest.max(world.vehicle("Car1").unwrap().position().x);
    }
    assert!(furthest > 90.0, "only reached x = {furthest}");
}

#[test]
fn ai_laps_the_stock_route_without_leaving_the_course() {
    let mut world = RaceWorld::from_config(&SimConfig::default(), 2024).unwrap();
    let course = *world.course();
    for _ in 0..600 {
        world.step(DT);
    }
    for car in world.vehicles() {
        let p = car.position();
        assert!(p.x >= 0.0 && p.x <= course.max_x());
        assert!(p.y >= 0.0 && p.y <= course.max_y());
    }
    // AI cars accelerate from standstill
    let moving = world.vehicles().iter().filter(|v| !v.is_player() && v.speed() > 1.0).count();
    assert!(moving > 0);
}

#[test]
fn spawned_cars_join_between_ticks() {
    let mut world = RaceWorld::from_config(&SimConfig::default(), 5).unwrap();
    world.apply_command(Command::Spawn).unwrap();
    world.apply_command(Command::Spawn).unwrap();
    assert_eq!(world.vehicles().len(), 7);

    let report = world.step(DT);
    assert_eq!(report.tick, 1);
    assert_eq!(world.vehicles().len(), 9);
    assert!(world.vehicle("Car7").is_some() && world.vehicle("Car8").is_some());
}

#[test]
fn trail_segments_are_staggered_across_the_grid() {
    let mut world = RaceWorld::from_config(&SimConfig::default(), 5).unwrap();
    let mut per_tick = Vec::new();
    for _ in 0..14 {
        per_tick.push(world.step(DT).trails.len());
    }
    // seven cars, seven-frame period, staggered start frames
    assert!(per_tick.iter().all(|&n| n == 1), "{per_tick:?}");
}

#[test]
fn zero_dt_tick_is_harmless() {
    let mut world = RaceWorld::from_config(&SimConfig::default(), 1).unwrap();
    world.step(DT);
    world.step(0.0);
    for car in world.vehicles() {
        assert!(car.velocity().x.is_finite() && car.velocity().y.is_finite());
        assert!(car.rotation().is_finite());
    }
}
