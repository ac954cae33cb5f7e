//! Triangle setup.
//!
//! Turns each screen-space triangle into everything the bin rasterizer needs:
//! a clamped tile range (or `None` when rejected), edge scan data and the
//! depth plane.
//!
//! Vertices are snapped to a 1/4 pixel grid first, so winding, flat-edge
//! detection and shared edges between neighbouring triangles are exact.
//!
//! # Edges
//!
//! A non-horizontal edge splits each scanline at `x(y)`. A left edge keeps
//! pixel centers at or right of `x(y)`, a right edge keeps centers strictly
//! left of it. A horizontal (flat) edge instead limits which rows are inside.
//! Edges are stored bottom-up so two triangles sharing an edge compute the
//! same intercepts and never both claim a pixel.

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use super::transform::ScreenTriangle;
use crate::constants::{SUB_PIXEL_STEPS, TILE_HEIGHT, TILE_WIDTH};
use crate::depth::DepthPolicy;
use crate::types::{FrontFace, TileGrid, TileRange};

/// Scan data for one non-horizontal edge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeSetup {
  /// Lower endpoint (smaller y).
  pub origin: Vec2,
  /// `dx / dy` along the edge.
  pub inv_slope: f32,
  /// Inside lies to the left of the edge.
  pub is_right: bool,
}

impl EdgeSetup {
  /// Edge x at scanline `y`.
  #[inline]
  pub fn x_at(&self, y: f32) -> f32 {
    self.origin.x + (y - self.origin.y) * self.inv_slope
  }
}

/// A horizontal edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatEdge {
  pub y: f32,
  /// Inside lies above the edge (larger y).
  pub inside_above: bool,
}

impl FlatEdge {
  /// Row membership for a pixel-center y. Centers exactly on the edge belong
  /// to the triangle above it.
  #[inline]
  pub fn contains(&self, y: f32) -> bool {
    if self.inside_above {
      y >= self.y
    } else {
      y < self.y
    }
  }
}

/// Depth plane `z(p) = z0 + dzdx * (p.x - origin.x) + dzdy * (p.y - origin.y)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthPlane {
  pub origin: Vec2,
  pub z0: f32,
  pub dzdx: f32,
  pub dzdy: f32,
}

impl DepthPlane {
  /// Plane through three points, with a zero gradient for degenerate input.
  pub fn from_points(v: &[Vec3; 3]) -> Self {
    let x1 = v[1].x - v[0].x;
    let y1 = v[1].y - v[0].y;
    let z1 = v[1].z - v[0].z;
    let x2 = v[2].x - v[0].x;
    let y2 = v[2].y - v[0].y;
    let z2 = v[2].z - v[0].z;

    let denom = x1 * y2 - y1 * x2;
    let d = if denom == 0.0 { 0.0 } else { 1.0 / denom };

    Self {
      origin: v[0].truncate(),
      z0: v[0].z,
      dzdx: (z1 * y2 - y1 * z2) * d,
      dzdy: (x1 * z2 - z1 * x2) * d,
    }
  }

  #[inline]
  pub fn at(&self, x: f32, y: f32) -> f32 {
    self.z0 + self.dzdx * (x - self.origin.x) + self.dzdy * (y - self.origin.y)
  }
}

/// Per-triangle rasterizer input. `tile_range == None` marks a rejected
/// triangle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TriangleSetup {
  pub tile_range: Option<TileRange>,
  pub edges: [EdgeSetup; 3],
  /// Number of valid entries in `edges` (2 with a flat edge, else 3).
  pub edge_count: u8,
  pub flat: Option<FlatEdge>,
  pub plane: DepthPlane,
  /// Farthest vertex depth, the cap for every sub-tile depth bound.
  pub z_farthest: f32,
}

impl TriangleSetup {
  pub const REJECTED: Self = Self {
    tile_range: None,
    edges: [EdgeSetup {
      origin: Vec2::ZERO,
      inv_slope: 0.0,
      is_right: false,
    }; 3],
    edge_count: 0,
    flat: None,
    plane: DepthPlane {
      origin: Vec2::ZERO,
      z0: 0.0,
      dzdx: 0.0,
      dzdy: 0.0,
    },
    z_farthest: 0.0,
  };

  #[inline]
  pub fn is_rejected(&self) -> bool {
    self.tile_range.is_none()
  }

  #[inline]
  pub fn active_edges(&self) -> &[EdgeSetup] {
    &self.edges[..self.edge_count as usize]
  }
}

#[inline]
fn snap(v: f32) -> f32 {
  (v * SUB_PIXEL_STEPS).round() / SUB_PIXEL_STEPS
}

/// Set up one triangle.
pub fn setup_triangle(
  tri: &ScreenTriangle,
  grid: TileGrid,
  policy: &DepthPolicy,
  front_face: FrontFace,
) -> TriangleSetup {
  // Near/far discard; also catches NaN from vertices behind the eye.
  if !tri.iter().all(|v| policy.in_range(v.z) && v.x.is_finite() && v.y.is_finite()) {
    return TriangleSetup::REJECTED;
  }

  let v = tri.map(|v| Vec3::new(snap(v.x), snap(v.y), v.z));
  let p = v.map(|v| v.truncate());

  let area = (p[1] - p[0]).perp_dot(p[2] - p[0]);
  if !front_face.is_front(area) {
    return TriangleSetup::REJECTED;
  }

  let mut setup = TriangleSetup::REJECTED;
  let mut flat_count = 0;
  for i in 0..3 {
    let a = p[i];
    let b = p[(i + 1) % 3];
    let c = p[(i + 2) % 3];
    let dy = b.y - a.y;
    if dy == 0.0 {
      flat_count += 1;
      setup.flat = Some(FlatEdge {
        y: a.y,
        inside_above: c.y > a.y,
      });
      continue;
    }
    let (lo, hi) = if dy > 0.0 { (a, b) } else { (b, a) };
    setup.edges[setup.edge_count as usize] = EdgeSetup {
      origin: lo,
      inv_slope: (hi.x - lo.x) / (hi.y - lo.y),
      is_right: area * dy > 0.0,
    };
    setup.edge_count += 1;
  }
  if flat_count >= 2 {
    return TriangleSetup::REJECTED;
  }

  let min = p[0].min(p[1]).min(p[2]);
  let max = p[0].max(p[1]).max(p[2]);
  let tile_size = Vec2::new(TILE_WIDTH as f32, TILE_HEIGHT as f32);
  let limit = Vec2::new((grid.cols - 1) as f32, (grid.rows - 1) as f32);
  let tile_min = (min / tile_size).floor();
  let tile_max = (max / tile_size).floor();
  // Off the grid entirely: clamping would smear it onto an edge tile.
  if tile_max.cmplt(Vec2::ZERO).any() || tile_min.cmpgt(limit).any() {
    return TriangleSetup::REJECTED;
  }
  let tile_min = tile_min.clamp(Vec2::ZERO, limit);
  let tile_max = tile_max.clamp(Vec2::ZERO, limit);

  setup.tile_range = Some(TileRange::new(
    tile_min.x as u32,
    tile_min.y as u32,
    tile_max.x as u32,
    tile_max.y as u32,
  ));
  setup.plane = DepthPlane::from_points(&v);
  setup.z_farthest = policy.farthest(policy.farthest(v[0].z, v[1].z), v[2].z);
  setup
}

/// Set up every triangle in parallel. Returns the number rejected.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::setup_triangles"))]
pub fn setup_triangles(
  screen: &[ScreenTriangle],
  grid: TileGrid,
  policy: &DepthPolicy,
  front_face: FrontFace,
  setups: &mut Vec<TriangleSetup>,
) -> usize {
  setups.clear();
  setups.resize(screen.len(), TriangleSetup::REJECTED);
  setups
    .par_iter_mut()
    .zip(screen.par_iter())
    .map(|(setup, tri)| {
      *setup = setup_triangle(tri, grid, policy, front_face);
      setup.is_rejected() as usize
    })
    .sum()
}

#[cfg(test)]
#[path = "setup_test.rs"]
mod setup_test;
