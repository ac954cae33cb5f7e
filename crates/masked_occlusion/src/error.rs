//! Initialization errors.
//!
//! Per-frame culling never fails; everything that can be wrong with the input
//! is rejected here, when a system is built.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MocError {
  #[error("depth buffer {width}x{height} must be a non-zero multiple of the 32x4 tile size")]
  InvalidResolution { width: u32, height: u32 },

  #[error("bin grid {bin_cols}x{bin_rows} does not fit a {tile_cols}x{tile_rows} tile grid")]
  InvalidBinGrid {
    bin_cols: u32,
    bin_rows: u32,
    tile_cols: u32,
    tile_rows: u32,
  },

  #[error("coverage threshold {0} is outside [0, 1]")]
  InvalidCoverageThreshold(f32),

  #[error("max rasterized triangles per frame must be greater than zero")]
  ZeroTriangleBudget,

  #[error("invalid ray march parameters: {0}")]
  InvalidRayMarch(&'static str),

  #[error("occluder {occluder}: index count {len} is not a multiple of 3")]
  RaggedIndices { occluder: usize, len: usize },

  #[error("occluder {occluder}: index {index} out of range for {vertex_count} vertices")]
  IndexOutOfRange {
    occluder: usize,
    index: u32,
    vertex_count: usize,
  },

  #[error("heightfield resolution {0} is too small, need at least 2 samples per side")]
  HeightfieldResolution(usize),

  #[error("heightfield expects {expected} samples, got {actual}")]
  HeightfieldSize { expected: usize, actual: usize },

  #[error("failed to read config {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),
}

pub type MocResult<T> = Result<T, MocError>;
