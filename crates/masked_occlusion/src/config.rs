//! MocConfig - per-session culling configuration.
//!
//! Values are fixed for the lifetime of a culling system. Every constructor
//! that consumes a config calls [`MocConfig::validate`] first.
//!
//! # Usage
//!
//! ```ignore
//! let config = MocConfig::load(Path::new("culling.toml"))?;
//! let system = CullingSystem::new(config, occluders, occludee_bounds, None)?;
//! ```
//!
//! Any omitted key falls back to its default:
//!
//! ```toml
//! depth_buffer_width = 1280
//! depth_buffer_height = 720
//! bin_cols = 8
//!
//! [depth]
//! convention = "reversed"
//! clip_range = "zero_to_one"
//!
//! [ray_march]
//! downsample = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{TILE_HEIGHT, TILE_WIDTH};
use crate::depth::DepthPolicy;
use crate::error::{MocError, MocResult};
use crate::types::{FrontFace, TileGrid};

/// Configuration for the masked occlusion culling pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MocConfig {
  /// Depth buffer width in pixels. Multiple of 32.
  pub depth_buffer_width: u32,

  /// Depth buffer height in pixels. Multiple of 4.
  pub depth_buffer_height: u32,

  /// Rasterizer bin columns (parallel tasks across x).
  pub bin_cols: u32,

  /// Rasterizer bin rows (parallel tasks across y).
  pub bin_rows: u32,

  /// Minimum screen coverage `[0, 1]` for an occluder to be rasterized.
  pub coverage_threshold: f32,

  /// Hard cap on triangles rasterized per frame.
  pub max_rasterized_triangles: u32,

  /// Rasterize the current frame in the background while the next frame
  /// tests against it.
  pub async_rasterize: bool,

  /// Winding of front faces in screen space.
  pub front_face: FrontFace,

  /// Depth direction and clip range of the camera projection.
  pub depth: DepthPolicy,

  /// Terrain ray march parameters.
  pub ray_march: RayMarchConfig,
}

/// Terrain ray march step parameters (world units).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayMarchConfig {
  pub start_step: f32,
  pub max_step: f32,
  pub step_increment: f32,
  /// Heightmap downsample factor (min over each block).
  pub downsample: u32,
}

impl Default for RayMarchConfig {
  fn default() -> Self {
    Self {
      start_step: 0.5,
      max_step: 3.0,
      step_increment: 0.5,
      downsample: 3,
    }
  }
}

impl Default for MocConfig {
  fn default() -> Self {
    Self {
      depth_buffer_width: 960,
      depth_buffer_height: 540,
      bin_cols: 4,
      bin_rows: 1,
      coverage_threshold: 0.1,
      max_rasterized_triangles: 6000,
      async_rasterize: false,
      depth: DepthPolicy::default(),
      front_face: FrontFace::default(),
      ray_march: RayMarchConfig::default(),
    }
  }
}

impl MocConfig {
  /// Config with a custom resolution and defaults elsewhere.
  pub fn with_resolution(width: u32, height: u32) -> Self {
    Self {
      depth_buffer_width: width,
      depth_buffer_height: height,
      ..Self::default()
    }
  }

  /// Parse a TOML document and validate it.
  pub fn from_toml_str(content: &str) -> MocResult<Self> {
    let config: MocConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> MocResult<Self> {
    let content = std::fs::read_to_string(path).map_err(|source| MocError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Tile grid covering the depth buffer.
  #[inline]
  pub fn tile_grid(&self) -> TileGrid {
    TileGrid::for_resolution(self.depth_buffer_width, self.depth_buffer_height)
  }

  /// Fail fast on values the per-frame pipeline cannot handle.
  pub fn validate(&self) -> MocResult<()> {
    let (width, height) = (self.depth_buffer_width, self.depth_buffer_height);
    if width == 0 || height == 0 || width % TILE_WIDTH != 0 || height % TILE_HEIGHT != 0 {
      return Err(MocError::InvalidResolution { width, height });
    }

    let grid = self.tile_grid();
    if self.bin_cols == 0
      || self.bin_rows == 0
      || self.bin_cols > grid.cols
      || self.bin_rows > grid.rows
    {
      return Err(MocError::InvalidBinGrid {
        bin_cols: self.bin_cols,
        bin_rows: self.bin_rows,
        tile_cols: grid.cols,
        tile_rows: grid.rows,
      });
    }

    if !(0.0..=1.0).contains(&self.coverage_threshold) {
      return Err(MocError::InvalidCoverageThreshold(self.coverage_threshold));
    }

    if self.max_rasterized_triangles == 0 {
      return Err(MocError::ZeroTriangleBudget);
    }

    self.ray_march.validate()
  }
}

impl RayMarchConfig {
  pub fn validate(&self) -> MocResult<()> {
    if !(self.start_step > 0.0) {
      return Err(MocError::InvalidRayMarch("start_step must be positive"));
    }
    if !(self.max_step >= self.start_step) {
      return Err(MocError::InvalidRayMarch("max_step must be >= start_step"));
    }
    if !(self.step_increment >= 0.0) {
      return Err(MocError::InvalidRayMarch("step_increment must be non-negative"));
    }
    if self.downsample == 0 {
      return Err(MocError::InvalidRayMarch("downsample must be at least 1"));
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
