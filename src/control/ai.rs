// ==============================================================================
// ai.rs — WAYPOINT FOLLOWER
// ------------------------------------------------------------------------------
// State: (current, next) indices into a cyclic, non-empty AimList.
//
// Steering:
//   g = aim - position
//   θ = atan2(g × f, g · f)      (f = facing, sign flipped so +θ = steer left)
//   left  if θ >  dead_zone
//   right if θ < -dead_zone
//
// Throttle: on, except when already above coast_speed while the approach to
// `current` points back against the leg that follows it
// (dot(aim - pos, next - aim) < 0). A car below coast_speed always drives,
// so a hairpin can't strand it at rest. Never brakes.
//
// Advance (after each position update):
//   |pos - current| < aim_reach  OR  |pos - next| < next_aim_reach
//   => current = next, next = next + 1 (mod len)
// The second radius lets fast cars cut corners instead of orbiting a point.
// ==============================================================================

use rand::Rng;
use serde::Deserialize;

use super::Intents;
use crate::error::{Result, SimError};
use crate::math::{Vec2, vec2};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    pub aim_reach: f64,      // world units
    pub next_aim_reach: f64, // world units
    pub dead_zone: f64,      // radians
    pub jitter: f64,         // ± world units applied per axis at construction
    pub coast_speed: f64,    // world units / s, hairpin coasting only above this
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            aim_reach: 10.0,
            next_aim_reach: 20.0,
            dead_zone: 0.05,
            jitter: 2.0,
            coast_speed: 10.0,
        }
    }
}

/// Ordered, cyclic, never-empty list of aim points.
#[derive(Debug, Clone, PartialEq)]
pub struct AimList(Vec<Vec2>);

impl AimList {
    pub fn new(points: Vec<Vec2>) -> Result<Self> {
        if points.is_empty() {
            return Err(SimError::EmptyWaypoints);
        }
        if let Some((index, p)) = points
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(SimError::InvalidWaypoint { index, x: p.x, y: p.y });
        }
        Ok(Self(points))
    }

    pub fn from_pairs(pairs: &[[f64; 2]]) -> Result<Self> {
        Self::new(pairs.iter().map(|[x, y]| vec2(*x, *y)).collect())
    }

    /// Copy with each coordinate moved independently by up to `range`.
    pub fn jittered<R: Rng + ?Sized>(&self, range: f64, rng: &mut R) -> Self {
        if range <= 0.0 {
            return self.clone();
        }
        Self(
            self.0
                .iter()
                .map(|p| vec2(p.x + rng.gen_range(-range..=range), p.y + rng.gen_range(-range..=range)))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> &[Vec2] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct AiControl {
    aims: AimList,
    current: usize,
    next: usize,
    tuning: AiTuning,
}

impl AiControl {
    pub fn new(aims: AimList, tuning: AiTuning) -> Self {
        let next = 1 % aims.len();
        Self {
            aims,
            current: 0,
            next,
            tuning,
        }
    }

    pub fn aims(&self) -> &AimList {
        &self.aims
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn current_aim(&self) -> Vec2 {
        self.aims.0[self.current]
    }

    pub fn next_aim(&self) -> Vec2 {
        self.aims.0[self.next]
    }

    /// Bearing to the current aim relative to facing; positive means the
    /// vehicle must steer left (rotation decreasing) to line up.
    pub fn bearing(&self, position: &Vec2, facing: &Vec2) -> f64 {
        let to_goal = self.current_aim() - position;
        let cross = to_goal.x * facing.y - to_goal.y * facing.x;
        cross.atan2(to_goal.dot(facing))
    }

    pub fn intents(&self, position: &Vec2, facing: &Vec2, speed: f64) -> Intents {
        let bearing = self.bearing(position, facing);
        let aim = self.current_aim();
        let approach = aim - position;
        let following_leg = self.next_aim() - aim;
        let hairpin = approach.dot(&following_leg) < 0.0;

        Intents {
            accelerate: !hairpin || speed <= self.tuning.coast_speed,
            brake: false,
            turn_left: bearing > self.tuning.dead_zone,
            turn_right: bearing < -self.tuning.dead_zone,
        }
    }

    /// Returns true when the aim pair moved on.
    pub fn advance_aims(&mut self, position: &Vec2) -> bool {
        let near_current = (position - self.current_aim()).norm() < self.tuning.aim_reach;
        let near_next = (position - self.next_aim()).norm() < self.tuning.next_aim_reach;
        if !(near_current || near_next) {
            return false;
        }
        self.current = self.next;
        self.next = (self.next + 1) % self.aims.len();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn triangle() -> AimList {
        AimList::from_pairs(&[[0.0, 0.0], [100.0, 0.0], [50.0, 80.0]]).unwrap()
    }

    #[test]
    fn empty_or_nan_waypoints_are_rejected() {
        assert!(matches!(AimList::new(vec![]), Err(SimError::EmptyWaypoints)));
        assert!(matches!(
            AimList::from_pairs(&[[1.0, 1.0], [f64::NAN, 2.0]]),
            Err(SimError::InvalidWaypoint { index: 1, .. })
        ));
    }

    #[test]
    fn jitter_stays_in_range() {
        let base = triangle();
        let mut rng = StdRng::seed_from_u64(7);
        let j = base.jittered(2.0, &mut rng);
        assert_eq!(j.len(), base.len());
        for (a, b) in base.points().iter().zip(j.points()) {
            assert!((a.x - b.x).abs() <= 2.0);
            assert!((a.y - b.y).abs() <= 2.0);
        }
        assert_ne!(j, base);
    }

    #[test]
    fn steering_dead_zone() {
        let ai = AiControl::new(triangle(), AiTuning::default());
        let pos = vec2(-50.0, 0.0);

        // dead ahead
        let i = ai.intents(&pos, &vec2(1.0, 0.0), 0.0);
        assert!(!i.turn_left && !i.turn_right);

        // aim is at +y relative to facing +x: rotation has to increase
        let i = ai.intents(&vec2(0.0, -50.0), &vec2(1.0, 0.0), 0.0);
        assert!(i.turn_right && !i.turn_left);

        // aim at -y relative to facing +x: rotation has to decrease
        let i = ai.intents(&vec2(0.0, 50.0), &vec2(1.0, 0.0), 0.0);
        assert!(i.turn_left && !i.turn_right);

        // just inside the dead zone
        let facing = crate::math::rotate(&vec2(1.0, 0.0), 0.04);
        let i = ai.intents(&pos, &facing, 0.0);
        assert!(!i.turn_left && !i.turn_right);
    }

    #[test]
    fn coasts_into_hairpins_only_at_speed() {
        let aims = AimList::from_pairs(&[[100.0, 0.0], [0.0, 5.0]]).unwrap();
        let ai = AiControl::new(aims, AiTuning::default());
        let i = ai.intents(&vec2(0.0, 0.0), &vec2(1.0, 0.0), 25.0);
        assert!(!i.accelerate && !i.brake);
        // at rest the same hairpin still gets throttle
        assert!(ai.intents(&vec2(0.0, 0.0), &vec2(1.0, 0.0), 0.0).accelerate);
        assert!(ai.intents(&vec2(0.0, 0.0), &vec2(1.0, 0.0), 10.0).accelerate);

        let aims = AimList::from_pairs(&[[100.0, 0.0], [200.0, 5.0]]).unwrap();
        let ai = AiControl::new(aims, AiTuning::default());
        assert!(ai.intents(&vec2(0.0, 0.0), &vec2(1.0, 0.0), 25.0).accelerate);
    }

    #[test]
    fn two_point_route_drives_off_from_rest() {
        // every leg of a two-point route doubles back
        let aims = AimList::from_pairs(&[[50.0, 50.0], [120.0, 50.0]]).unwrap();
        let mut ai = AiControl::new(aims, AiTuning::default());
        assert!(ai.advance_aims(&vec2(50.0, 50.0)));
        assert_eq!(ai.current_index(), 1);
        assert!(ai.intents(&vec2(50.0, 50.0), &vec2(1.0, 0.0), 0.0).accelerate);
    }

    #[test]
    fn aims_cycle_in_order() {
        let mut ai = AiControl::new(triangle(), AiTuning::default());
        let mut visited = vec![ai.current_index()];
        for _ in 0..7 {
            let at = ai.current_aim();
            assert!(ai.advance_aims(&at));
            visited.push(ai.current_index());
        }
        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0, 1]);
        assert_eq!(ai.next_index(), 2);
    }

    #[test]
    fn far_away_does_not_advance() {
        let mut ai = AiControl::new(triangle(), AiTuning::default());
        assert!(!ai.advance_aims(&vec2(500.0, 500.0)));
        assert_eq!((ai.current_index(), ai.next_index()), (0, 1));
    }

    #[test]
    fn single_waypoint_loops_on_itself() {
        let aims = AimList::from_pairs(&[[3.0, 4.0]]).unwrap();
        let mut ai = AiControl::new(aims, AiTuning::default());
        assert!(ai.advance_aims(&vec2(3.0, 4.0)));
        assert_eq!((ai.current_index(), ai.next_index()), (0, 0));
    }
}
