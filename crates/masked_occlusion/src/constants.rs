//! Depth buffer layout constants.
//!
//! The coverage buffer is a grid of 32x4 pixel tiles. Each tile is split into
//! four 8x4 sub-tiles, and every sub-tile stores one 32-bit coverage mask and
//! one depth bound.
//!
//! # Tile Layout
//!
//! ```text
//! ┌───────────────────────────── tile (32 x 4) ─────────────────────────────┐
//! │  sub-tile 0     │  sub-tile 1     │  sub-tile 2     │  sub-tile 3       │
//! │  cols 0..8      │  cols 8..16     │  cols 16..24    │  cols 24..32      │
//! └─────────────────┴─────────────────┴─────────────────┴───────────────────┘
//!
//! Sub-tile bit index = row * 8 + column, row 0 = lowest screen y:
//!
//!   row 3 │ 24 25 26 27 28 29 30 31
//!   row 2 │ 16 17 18 19 20 21 22 23
//!   row 1 │  8  9 10 11 12 13 14 15
//!   row 0 │  0  1  2  3  4  5  6  7
//! ```

/// Tile width in pixels.
pub const TILE_WIDTH: u32 = 32;

/// Tile height in pixels.
pub const TILE_HEIGHT: u32 = 4;

/// Sub-tile width in pixels.
pub const SUB_TILE_WIDTH: u32 = 8;

/// Sub-tile height in pixels (one sub-tile row per tile).
pub const SUB_TILE_HEIGHT: u32 = 4;

/// Sub-tiles per tile. Matches the 4 lanes of the tile's depth/mask vectors.
pub const SUB_TILES_PER_TILE: usize = (TILE_WIDTH / SUB_TILE_WIDTH) as usize;

/// Coverage mask with every pixel of a sub-tile set.
pub const FULL_MASK: u32 = u32::MAX;

/// Mask of one sub-tile row (8 pixels).
pub const ROW_MASK: u32 = 0xFF;

/// Fixed-point sub-pixel steps per pixel used when snapping screen vertices.
pub const SUB_PIXEL_STEPS: f32 = 4.0;

/// Ray-march samples per tile column (one sample per 4 pixels).
pub const RAY_SAMPLES_PER_TILE: u32 = TILE_WIDTH / 4;

/// Ray-march bin width in samples.
pub const RAY_BIN_WIDTH: usize = 2;

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
