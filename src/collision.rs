// ==============================================================================
// collision.rs — VEHICLE vs VEHICLE CONTACT (QUAD/QUAD)
// ==============================================================================
// Runs once per tick after every vehicle has moved.
//
// Broad phase:  |center_a - center_b|² > broad_phase_radius_sq  => skip
// Narrow phase: any corner of one quad inside the other. A quad is split into
//               triangles (0,1,2) and (1,2,3); membership is a barycentric
//               test with a small tolerance on the edges.
//
// Response (perfectly inelastic, player cars weighted heavier):
//   M_a = m_a * w_a,  M_b = m_b * w_b
//   v'  = (M_a v_a + M_b v_b) / (M_a + M_b)        assigned to both
//
// Separation:
//   EdgeProjection: depth = deepest offending corner's distance to the
//                   nearest edge, dir = out through that edge
//   PushApart:      dir = center_b -> center_a, depth = overlap of the two
//                   quads projected on that line (also the fallback when a
//                   corner sits flush on an edge)
//   each car moves correction_fraction * depth * (other mass share)
//   and a residual force ±k * depth * μ  (μ = reduced mass) is returned as a
//   ForceImpulse list for the world to queue on the next velocity update.
// ==============================================================================

use serde::Deserialize;

use crate::math::{self, Vec2};
use crate::vehicle::{Course, Vehicle};

const EDGE_TOLERANCE: f64 = 1e-9;
const MIN_EDGE_DEPTH: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionStrategy {
    /// Push along the line between the two centers.
    PushApart,
    /// Push the offending corner out through the nearest edge.
    #[default]
    EdgeProjection,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    pub broad_phase_radius_sq: f64, // world units²
    pub player_weight: f64,         // mass multiplier for player cars
    pub strategy: CollisionStrategy,
    pub correction_fraction: f64,  // 0..1 of depth removed per tick
    pub separation_stiffness: f64, // 1/s², residual force gain
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            broad_phase_radius_sq: 25.0,
            player_weight: 5.0,
            strategy: CollisionStrategy::EdgeProjection,
            correction_fraction: 0.8,
            separation_stiffness: 60.0,
        }
    }
}

/// Force for the next velocity update of `vehicle` (index into the slice
/// handed to [`CollisionResolver::resolve`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceImpulse {
    pub vehicle: usize,
    pub force: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Penetration depth in world units.
    pub depth: f64,
    /// Unit direction that moves `a` out of `b`.
    pub normal: Vec2,
}

// --------------------------------------------------------------------------
// geometry
// --------------------------------------------------------------------------

/// Barycentric containment; points on an edge count as inside.
pub fn point_in_triangle(p: &Vec2, a: &Vec2, b: &Vec2, c: &Vec2) -> bool {
    let det = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if det.abs() <= EDGE_TOLERANCE {
        return false;
    }
    let u = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / det;
    let v = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / det;
    let w = 1.0 - u - v;
    let inside = |t: f64| (-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&t);
    inside(u) && inside(v) && inside(w)
}

pub fn point_in_quad(p: &Vec2, quad: &[Vec2; 4]) -> bool {
    point_in_triangle(p, &quad[0], &quad[1], &quad[2]) || point_in_triangle(p, &quad[1], &quad[2], &quad[3])
}

/// Perimeter edges of a vehicle quad (corner order 0,1 rear / 2,3 front).
fn quad_edges(quad: &[Vec2; 4]) -> [(Vec2, Vec2); 4] {
    [
        (quad[0], quad[2]),
        (quad[2], quad[3]),
        (quad[3], quad[1]),
        (quad[1], quad[0]),
    ]
}

/// Vector from `p` to the closest point on the quad boundary.
pub fn escape_vector(p: &Vec2, quad: &[Vec2; 4]) -> Vec2 {
    quad_edges(quad)
        .iter()
        .map(|(a, b)| math::closest_point_on_segment(p, a, b) - p)
        .min_by(|x, y| x.norm_squared().total_cmp(&y.norm_squared()))
        .unwrap_or_else(Vec2::zeros)
}

/// Overlap of the two quads' shadows on `axis` (unit). Positive when the
/// shadows intersect.
pub fn projected_overlap(a: &[Vec2; 4], b: &[Vec2; 4], axis: &Vec2) -> f64 {
    let span = |quad: &[Vec2; 4]| {
        quad.iter()
            .map(|p| p.dot(axis))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)))
    };
    let (a_lo, a_hi) = span(a);
    let (b_lo, b_hi) = span(b);
    (a_hi.min(b_hi) - a_lo.max(b_lo)).max(0.0)
}

// --------------------------------------------------------------------------
// resolver
// --------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    tuning: CollisionTuning,
}

impl CollisionResolver {
    pub fn new(tuning: CollisionTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &CollisionTuning {
        &self.tuning
    }

    fn weight(&self, v: &Vehicle) -> f64 {
        if v.is_player() { self.tuning.player_weight } else { 1.0 }
    }

    /// Contact between two vehicles, if their quads overlap.
    pub fn detect(&self, a: &Vehicle, b: &Vehicle) -> Option<Contact> {
        let between = a.body_center() - b.body_center();
        if between.norm_squared() > self.tuning.broad_phase_radius_sq {
            return None;
        }

        // deepest corner of either car inside the other, as (depth, dir for a)
        let mut deepest: Option<(f64, Vec2)> = None;
        let mut consider = |depth: f64, dir: Vec2| {
            if deepest.is_none_or(|(d, _)| depth > d) {
                deepest = Some((depth, dir));
            }
        };
        for corner in b.corners() {
            if point_in_quad(corner, a.corners()) {
                // b's corner leaves a along `escape`; a goes the other way
                let escape = escape_vector(corner, a.corners());
                consider(escape.norm(), -escape);
            }
        }
        for corner in a.corners() {
            if point_in_quad(corner, b.corners()) {
                let escape = escape_vector(corner, b.corners());
                consider(escape.norm(), escape);
            }
        }
        let (edge_depth, edge_dir) = deepest?;

        let center_dir = math::normalize(&between).unwrap_or_else(|_| a.facing());
        let (depth, normal) = match self.tuning.strategy {
            CollisionStrategy::EdgeProjection if edge_depth > MIN_EDGE_DEPTH => {
                (edge_depth, edge_dir / edge_depth)
            }
            // flush contacts (corner on an edge) have no usable edge depth
            _ => (projected_overlap(a.corners(), b.corners(), &center_dir), center_dir),
        };

        Some(Contact { depth, normal })
    }

    /// Resolves one contact in place; returns the residual force on `a`
    /// (`b` receives the negation).
    pub fn resolve_contact(&self, a: &mut Vehicle, b: &mut Vehicle, contact: &Contact, course: &Course) -> Vec2 {
        let ma = a.mass() * self.weight(a);
        let mb = b.mass() * self.weight(b);
        let total = ma + mb;

        let common = (a.velocity() * ma + b.velocity() * mb) / total;
        a.set_velocity(common);
        b.set_velocity(common);

        let correction = contact.depth * self.tuning.correction_fraction;
        a.nudge(contact.normal * (correction * mb / total), course);
        b.nudge(-contact.normal * (correction * ma / total), course);

        let reduced = a.mass() * b.mass() / (a.mass() + b.mass());
        contact.normal * (self.tuning.separation_stiffness * contact.depth * reduced)
    }

    /// Checks every unordered pair once. Velocities and positions are
    /// corrected in place; residual forces are returned, not applied.
    pub fn resolve(&self, vehicles: &mut [Vehicle], course: &Course) -> Vec<ForceImpulse> {
        let mut impulses = Vec::new();

        for j in 1..vehicles.len() {
            let (head, tail) = vehicles.split_at_mut(j);
            let b = &mut tail[0];
            for (i, a) in head.iter_mut().enumerate() {
                let Some(contact) = self.detect(a, b) else { continue };

                tracing::trace!(a = a.name(), b = b.name(), depth = contact.depth, "contact");
                let force = self.resolve_contact(a, b, &contact, course);
                impulses.push(ForceImpulse { vehicle: i, force });
                impulses.push(ForceImpulse { vehicle: j, force: -force });
            }
        }

        impulses
    }
}
