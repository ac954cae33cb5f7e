//! Core data types shared by the culling stages.

use glam::{Mat4, UVec4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::constants::{TILE_HEIGHT, TILE_WIDTH};
use crate::depth::DepthPolicy;

// =============================================================================
// Bounds
// =============================================================================

/// World-space axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  /// Minimum corner (inclusive).
  pub min: Vec3,
  /// Maximum corner (inclusive).
  pub max: Vec3,
}

impl Aabb {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: Vec3, max: Vec3) -> Self {
    debug_assert!(
      min.cmple(max).all(),
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
    Self {
      min: center - half_extents,
      max: center + half_extents,
    }
  }

  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: Vec3::INFINITY,
      max: Vec3::NEG_INFINITY,
    }
  }

  /// Smallest box containing every point. Empty input gives [`Aabb::empty`].
  pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
    let mut aabb = Self::empty();
    for point in points {
      aabb.encapsulate(point);
    }
    aabb
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }

  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  /// Half of [`Aabb::size`].
  #[inline]
  pub fn extents(&self) -> Vec3 {
    (self.max - self.min) * 0.5
  }

  #[inline]
  pub fn size(&self) -> Vec3 {
    self.max - self.min
  }

  /// The eight corners, min corner first, max corner last.
  pub fn corners(&self) -> [Vec3; 8] {
    let (a, b) = (self.min, self.max);
    [
      Vec3::new(a.x, a.y, a.z),
      Vec3::new(b.x, a.y, a.z),
      Vec3::new(a.x, b.y, a.z),
      Vec3::new(b.x, b.y, a.z),
      Vec3::new(a.x, a.y, b.z),
      Vec3::new(b.x, a.y, b.z),
      Vec3::new(a.x, b.y, b.z),
      Vec3::new(b.x, b.y, b.z),
    ]
  }

  /// Bounds of this box after an affine transform.
  pub fn transformed(&self, matrix: &Mat4) -> Self {
    Self::from_points(self.corners().map(|c| matrix.transform_point3(c)))
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

// =============================================================================
// Tiles
// =============================================================================

/// One 32x4 tile: a depth bound and a coverage mask per 8x4 sub-tile.
///
/// A full mask means the sub-tile is covered at depth `z[i]` or nearer. A
/// partial mask means the covered bits lie at `z[i]` or nearer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
  pub z: Vec4,
  pub bitmask: UVec4,
}

impl Tile {
  /// Empty tile: no coverage, far depth.
  #[inline]
  pub fn cleared(policy: &DepthPolicy) -> Self {
    Self {
      z: Vec4::splat(policy.far()),
      bitmask: UVec4::ZERO,
    }
  }

  /// `true` when no sub-tile has coverage.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.bitmask == UVec4::ZERO
  }
}

/// Inclusive rectangle of tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRange {
  pub min_x: u32,
  pub min_y: u32,
  pub max_x: u32,
  pub max_y: u32,
}

impl TileRange {
  pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
    debug_assert!(min_x <= max_x && min_y <= max_y);
    Self {
      min_x,
      min_y,
      max_x,
      max_y,
    }
  }

  /// Overlap of two ranges, `None` when disjoint.
  #[inline]
  pub fn intersect(&self, other: &TileRange) -> Option<TileRange> {
    let min_x = self.min_x.max(other.min_x);
    let min_y = self.min_y.max(other.min_y);
    let max_x = self.max_x.min(other.max_x);
    let max_y = self.max_y.min(other.max_y);
    (min_x <= max_x && min_y <= max_y).then_some(TileRange {
      min_x,
      min_y,
      max_x,
      max_y,
    })
  }

  #[inline]
  pub fn contains(&self, x: u32, y: u32) -> bool {
    x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.max_x - self.min_x + 1
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.max_y - self.min_y + 1
  }

  #[inline]
  pub fn tile_count(&self) -> usize {
    self.width() as usize * self.height() as usize
  }
}

/// Tile grid dimensions for a depth buffer resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
  pub cols: u32,
  pub rows: u32,
}

impl TileGrid {
  pub fn for_resolution(width: u32, height: u32) -> Self {
    Self {
      cols: width / TILE_WIDTH,
      rows: height / TILE_HEIGHT,
    }
  }

  #[inline]
  pub fn tile_count(&self) -> usize {
    self.cols as usize * self.rows as usize
  }

  /// Range covering the whole grid.
  #[inline]
  pub fn full_range(&self) -> TileRange {
    TileRange::new(0, 0, self.cols - 1, self.rows - 1)
  }

  #[inline]
  pub fn pixel_width(&self) -> u32 {
    self.cols * TILE_WIDTH
  }

  #[inline]
  pub fn pixel_height(&self) -> u32 {
    self.rows * TILE_HEIGHT
  }
}

// =============================================================================
// Camera / winding
// =============================================================================

/// Per-frame camera input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
  pub view: Mat4,
  pub projection: Mat4,
}

impl CameraFrame {
  pub fn new(view: Mat4, projection: Mat4) -> Self {
    Self { view, projection }
  }

  #[inline]
  pub fn view_projection(&self) -> Mat4 {
    self.projection * self.view
  }

  /// World-space eye position.
  pub fn eye_position(&self) -> Vec3 {
    self.view.inverse().w_axis.truncate()
  }
}

/// Screen-space winding of front-facing triangles (y up).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontFace {
  #[default]
  CounterClockwise,
  Clockwise,
}

impl FrontFace {
  /// `true` when a triangle with the given signed screen area faces the eye.
  /// Zero area is never front-facing.
  #[inline]
  pub fn is_front(&self, signed_area: f32) -> bool {
    match self {
      FrontFace::CounterClockwise => signed_area > 0.0,
      FrontFace::Clockwise => signed_area < 0.0,
    }
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
