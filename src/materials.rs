// ==============================================================================
// materials.rs — SURFACE FRICTION PROFILES + TERRAIN CLASSIFICATION
// ------------------------------------------------------------------------------
// A SurfaceMaterial is a read-only friction profile:
// - rolling_resistance: coefficient on m*g along -v̂
// - ground_resistance: coefficient on m*g*|1 - cos(slip)| (lateral scrub)
// - air_resistance_mult: scales quadratic drag (grass doubles it as an
//   off-track penalty)
//
// TerrainSource is the seam to whatever classifies the course (a bitmap in
// the desktop build). The core only ever calls surface_at(), which turns a
// failed lookup into GRASS, the lowest-grip material.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceMaterial {
    pub name: &'static str,
    pub rolling_resistance: f64,  // dimensionless
    pub ground_resistance: f64,   // dimensionless
    pub air_resistance_mult: f64, // x drag
}

pub const GRASS: SurfaceMaterial = SurfaceMaterial {
    name: "Grass",
    rolling_resistance: 0.3,
    ground_resistance: 0.8,
    air_resistance_mult: 2.0,
};

pub const TARMAC: SurfaceMaterial = SurfaceMaterial {
    name: "Tarmac",
    rolling_resistance: 0.03,
    ground_resistance: 0.8,
    air_resistance_mult: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    Tarmac,
    Grass,
}

impl SurfaceKind {
    pub fn material(self) -> &'static SurfaceMaterial {
        match self {
            SurfaceKind::Tarmac => &TARMAC,
            SurfaceKind::Grass => &GRASS,
        }
    }

    fn from_cell(c: char) -> Option<Self> {
        match c {
            'T' | 't' | '#' => Some(SurfaceKind::Tarmac),
            'G' | 'g' | '.' => Some(SurfaceKind::Grass),
            _ => None,
        }
    }
}

/// Classifies a world position. `None` means "don't know", not an error.
pub trait TerrainSource: Send + Sync {
    fn classify(&self, position: &Vec2) -> Option<SurfaceKind>;
}

/// Material under `position`, defaulting to grass when the source can't say.
pub fn surface_at(terrain: &dyn TerrainSource, position: &Vec2) -> &'static SurfaceMaterial {
    terrain
        .classify(position)
        .map(SurfaceKind::material)
        .unwrap_or(&GRASS)
}

/// The same surface everywhere.
#[derive(Debug, Clone, Copy)]
pub struct UniformTerrain(pub SurfaceKind);

impl TerrainSource for UniformTerrain {
    fn classify(&self, _position: &Vec2) -> Option<SurfaceKind> {
        Some(self.0)
    }
}

/// Coarse cell grid stretched over the course.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    cols: usize,
    rows: usize,
    cell_w: f64,
    cell_h: f64,
    cells: Vec<SurfaceKind>,
}

impl TerrainGrid {
    /// Builds a grid from text rows (`T`/`#` tarmac, `G`/`.` grass). Every
    /// row must have the same width.
    pub fn from_rows<S: AsRef<str>>(rows: &[S], course_width: f64, course_height: f64) -> Result<Self> {
        let invalid = |message: String| SimError::Config {
            path: "terrain.grid".into(),
            message,
        };

        let cols = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(invalid("grid has no cells".into()));
        }

        let mut cells = Vec::with_capacity(cols * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != cols {
                return Err(invalid(format!("row {y} has {} cells, expected {cols}", row.chars().count())));
            }
            for (x, c) in row.chars().enumerate() {
                let kind = SurfaceKind::from_cell(c)
                    .ok_or_else(|| invalid(format!("unknown cell {c:?} at ({x}, {y})")))?;
                cells.push(kind);
            }
        }

        Ok(Self {
            cols,
            rows: rows.len(),
            cell_w: course_width / cols as f64,
            cell_h: course_height / rows.len() as f64,
            cells,
        })
    }
}

impl TerrainSource for TerrainGrid {
    fn classify(&self, position: &Vec2) -> Option<SurfaceKind> {
        if !(position.x >= 0.0 && position.y >= 0.0) {
            return None;
        }
        let col = (position.x / self.cell_w) as usize;
        let row = (position.y / self.cell_h) as usize;
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells.get(row * self.cols + col).copied()
    }
}
