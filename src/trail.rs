// ==============================================================================
// trail.rs — SKID MARK SAMPLING
// ------------------------------------------------------------------------------
// Each vehicle owns a TrailRecorder with a frame counter that wraps at
// `capacity` (rounded up to a multiple of `every_n`, so the sampling cadence
// stays regular across the wrap). On every `every_n`-th frame one of the two
// front corners is sampled, strictly alternating between them, and a segment
// is emitted from the last sample taken at that corner to the new one.
//
// segment_id = "{vehicle}/ln{frame}". Because the counter wraps, ids recycle:
// a renderer keyed by id moves old marks instead of growing without bound.
//
// intensity = slip², capped at 1 (slip = wheel-vs-velocity angle, radians).
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrailTuning {
    pub capacity: u32, // frames before the counter wraps
    pub every_n: u32,  // sample period in frames
}

impl Default for TrailTuning {
    fn default() -> Self {
        Self {
            capacity: 1500,
            every_n: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailSegment {
    pub p1: Vec2,
    pub p2: Vec2,
    pub intensity: f64,
    pub segment_id: String,
}

#[derive(Debug, Clone)]
pub struct TrailRecorder {
    tuning: TrailTuning,
    frame: u32,
    next_slot: usize, // front corner for the next sample
    last: [Vec2; 2],
}

impl TrailRecorder {
    /// `start_frame` staggers vehicles so they don't all sample on the same
    /// tick; `origin` seeds the previous sample of both corners.
    pub fn new(tuning: TrailTuning, start_frame: u32, origin: [Vec2; 2]) -> Self {
        let every_n = tuning.every_n.max(1);
        let tuning = TrailTuning {
            capacity: tuning.capacity.max(1).div_ceil(every_n) * every_n,
            every_n,
        };
        let frame = start_frame % tuning.capacity;
        Self {
            frame,
            next_slot: ((frame / every_n + 1) % 2) as usize,
            tuning,
            last: origin,
        }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn tuning(&self) -> TrailTuning {
        self.tuning
    }

    /// Advances one frame; returns a segment on sampling frames only.
    pub fn sample(&mut self, vehicle: &str, front_corners: [Vec2; 2], slip_angle: f64) -> Option<TrailSegment> {
        self.frame = (self.frame + 1) % self.tuning.capacity;
        if self.frame % self.tuning.every_n != 0 {
            return None;
        }

        let slot = self.next_slot;
        self.next_slot = 1 - slot;
        let point = front_corners[slot];
        let previous = std::mem::replace(&mut self.last[slot], point);

        Some(TrailSegment {
            p1: previous,
            p2: point,
            intensity: (slip_angle * slip_angle).min(1.0),
            segment_id: format!("{vehicle}/ln{}", self.frame),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2;

    fn recorder(start: u32) -> TrailRecorder {
        TrailRecorder::new(TrailTuning { capacity: 30, every_n: 5 }, start, [vec2(0.0, 0.0), vec2(0.0, 1.0)])
    }

    #[test]
    fn emits_only_on_every_nth_frame() {
        let mut r = recorder(0);
        let corners = [vec2(1.0, 0.0), vec2(1.0, 1.0)];
        let emitted: Vec<u32> = (0..30)
            .filter_map(|_| r.sample("Car1", corners, 0.0).map(|_| r.frame()))
            .collect();
        assert_eq!(emitted, vec![5, 10, 15, 20, 25, 0]);
    }

    #[test]
    fn alternates_front_corners_and_chains_segments() {
        let mut r = recorder(4);
        let a = [vec2(10.0, 0.0), vec2(10.0, 1.0)];
        let first = r.sample("Car1", a, 0.2).unwrap();
        // first sample after frame 4 -> second corner
        assert_eq!(first.p1, vec2(0.0, 1.0));
        assert_eq!(first.p2, vec2(10.0, 1.0));
        assert_eq!(first.segment_id, "Car1/ln5");
        assert!((first.intensity - 0.04).abs() < 1e-12);

        for _ in 0..4 {
            assert!(r.sample("Car1", a, 0.2).is_none());
        }
        let b = [vec2(20.0, 0.0), vec2(20.0, 1.0)];
        let second = r.sample("Car1", b, 3.0).unwrap();
        // then back to the first corner
        assert_eq!(second.p1, vec2(0.0, 0.0));
        assert_eq!(second.p2, vec2(20.0, 0.0));
        assert_eq!(second.intensity, 1.0);
    }

    #[test]
    fn ids_recycle_after_wrap() {
        let mut r = recorder(0);
        let c = [vec2(0.0, 0.0), vec2(0.0, 0.0)];
        let ids: Vec<String> = (0..60).filter_map(|_| r.sample("X", c, 0.0)).map(|s| s.segment_id).collect();
        assert_eq!(ids.len(), 12);
        assert_eq!(ids[..6], ids[6..]);
    }

    #[test]
    fn degenerate_tuning_is_clamped() {
        let mut r = TrailRecorder::new(TrailTuning { capacity: 0, every_n: 0 }, 3, [Vec2::zeros(); 2]);
        assert!(r.sample("X", [Vec2::zeros(); 2], 0.0).is_some());
    }

    #[test]
    fn even_period_still_alternates_corners() {
        let tuning = TrailTuning { capacity: 1500, every_n: 6 };
        let mut r = TrailRecorder::new(tuning, 0, [vec2(5.0, 0.0), vec2(5.0, 3.0)]);
        let corners = [vec2(5.0, 0.0), vec2(5.0, 3.0)];
        let ends: Vec<Vec2> = (0..60).filter_map(|_| r.sample("Car1", corners, 0.0)).map(|s| s.p2).collect();

        assert_eq!(ends.len(), 10);
        for pair in ends.chunks(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert!(ends.contains(&vec2(5.0, 3.0)));
    }

    #[test]
    fn capacity_rounds_up_to_the_sampling_period() {
        let r = TrailRecorder::new(TrailTuning { capacity: 1500, every_n: 7 }, 0, [Vec2::zeros(); 2]);
        assert_eq!(r.tuning().capacity, 1505);
    }

    #[test]
    fn cadence_and_alternation_survive_the_wrap() {
        let mut r = TrailRecorder::new(TrailTuning { capacity: 20, every_n: 7 }, 0, [vec2(0.0, 0.0), vec2(0.0, 1.0)]);
        let corners = [vec2(0.0, 0.0), vec2(0.0, 1.0)];
        let mut sampled_on = Vec::new();
        let mut slots = Vec::new();
        for tick in 1..=63u32 {
            if let Some(seg) = r.sample("X", corners, 0.0) {
                sampled_on.push(tick);
                slots.push(seg.p2);
            }
        }
        // capacity 21: every 7th tick, no short gap at the wrap
        assert_eq!(sampled_on, vec![7, 14, 21, 28, 35, 42, 49, 56, 63]);
        for pair in slots.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
