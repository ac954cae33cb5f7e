//! Occluder rasterization, inline or on the rayon pool.
//!
//! [`rasterize_occluders`] runs the back half of a frame: clear, triangle
//! budget, (terrain || transform + setup), bin rasterization. The buffers it
//! needs live in [`RasterResources`], which the pipelined mode moves into a
//! background task and gets back when the task finishes.
//!
//! # Flow (pipelined)
//!
//! ```text
//! Frame N (main thread)                 Async (rayon)
//! ┌──────────────────────┐
//! │ wait()               │◄──────── tiles for frame N-1
//! │ select occluders     │
//! │ test occludees       │  (against frame N-1 tiles)
//! └──────────┬───────────┘
//!            │ start()
//!            ▼
//!                                      ┌──────────────────────┐
//!                                      │ clear                │
//!                                      │ terrain || transform │
//!                                      │ rasterize bins       │
//!                                      └──────────┬───────────┘
//! Frame N+1                                       │
//! ┌──────────────────────┐                        │
//! │ wait()               │◄───────────────────────┘
//! └──────────────────────┘
//! ```
//!
//! Only one generation is ever in flight: the tile store is either owned by
//! the task (being written) or by the caller (being read).

use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, TryRecvError};
use glam::{Mat4, Vec2};
use web_time::Instant;

use super::budget::{allot_triangles, BudgetStats, TriangleAllotment, TriangleBudget};
use super::raster::rasterize_bins;
use super::selection::OccluderCandidate;
use super::setup::{setup_triangles, TriangleSetup};
use super::transform::{transform_vertices, ScreenTriangle};
use crate::occluder::OccluderSet;
use crate::terrain::TerrainRaymarcher;
use crate::tile_store::TileStore;
use crate::types::{CameraFrame, FrontFace};

/// Everything the rasterizer writes. Reused from frame to frame.
pub struct RasterResources {
  pub tiles: TileStore,
  pub terrain: Option<TerrainRaymarcher>,
  allotments: Vec<TriangleAllotment>,
  screen: Vec<ScreenTriangle>,
  setups: Vec<TriangleSetup>,
}

impl RasterResources {
  pub fn new(tiles: TileStore, terrain: Option<TerrainRaymarcher>) -> Self {
    Self {
      tiles,
      terrain,
      allotments: Vec::new(),
      screen: Vec::new(),
      setups: Vec::new(),
    }
  }
}

/// Statistics from one rasterization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
  pub budget: BudgetStats,
  /// Allotted triangles discarded by setup (backfacing, degenerate, clipped).
  pub rejected_triangles: usize,
  /// Tile merges performed by the bin rasterizer.
  pub tile_writes: usize,
  /// Clear time in microseconds.
  pub clear_us: u64,
  /// Terrain, transform, setup and bin raster time in microseconds.
  pub raster_us: u64,
}

/// Clear the tile store and rasterize the ranked occluders into it.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::rasterize_occluders"))]
pub fn rasterize_occluders(
  occluders: &OccluderSet,
  ranked: &[OccluderCandidate],
  mvps: &[Mat4],
  camera: &CameraFrame,
  budget: TriangleBudget,
  front_face: FrontFace,
  resources: &mut RasterResources,
) -> RasterStats {
  let RasterResources {
    tiles,
    terrain,
    allotments,
    screen,
    setups,
  } = resources;

  let clear_start = Instant::now();
  tiles.clear();
  let clear_us = clear_start.elapsed().as_micros() as u64;

  let raster_start = Instant::now();
  let budget_stats = allot_triangles(ranked, budget, allotments);
  if budget_stats.truncated_occluders > 0 {
    tracing::debug!(
      truncated = budget_stats.truncated_occluders,
      dropped = budget_stats.dropped_triangles,
      cap = budget.max_triangles,
      "triangle budget exhausted"
    );
  }

  let grid = tiles.grid();
  let policy = *tiles.policy();
  let viewport = Vec2::new(grid.pixel_width() as f32, grid.pixel_height() as f32);

  // Terrain owns the tile store until the bins run; transform and setup only
  // touch the triangle buffers.
  let ((), rejected_triangles) = rayon::join(
    || {
      if let Some(terrain) = terrain.as_mut() {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("terrain_stage").entered();
        terrain.march(camera, &policy);
        terrain.write_tiles(tiles);
      }
    },
    || {
      #[cfg(feature = "profiling")]
      let _span = tracing::info_span!("triangle_stage").entered();
      transform_vertices(occluders, allotments, mvps, viewport, &policy, screen);
      setup_triangles(screen, grid, &policy, front_face, setups)
    },
  );

  let tile_writes = rasterize_bins(tiles, setups);
  let raster_us = raster_start.elapsed().as_micros() as u64;

  RasterStats {
    budget: budget_stats,
    rejected_triangles,
    tile_writes,
    clear_us,
    raster_us,
  }
}

/// Owned inputs for one background rasterization.
pub struct RasterRequest {
  pub occluders: Arc<OccluderSet>,
  /// Active occluders, highest coverage first.
  pub ranked: Vec<OccluderCandidate>,
  /// MVP per occluder (indexed by occluder).
  pub mvps: Vec<Mat4>,
  pub camera: CameraFrame,
  pub budget: TriangleBudget,
  pub front_face: FrontFace,
  pub resources: RasterResources,
}

/// Finished generation: the written resources and their stats.
pub struct RasterResult {
  pub resources: RasterResources,
  pub stats: RasterStats,
}

/// Run a request to completion (called on a worker thread).
fn run_request(request: RasterRequest) -> RasterResult {
  let RasterRequest {
    occluders,
    ranked,
    mvps,
    camera,
    budget,
    front_face,
    mut resources,
  } = request;
  let stats = rasterize_occluders(
    &occluders,
    &ranked,
    &mvps,
    &camera,
    budget,
    front_face,
    &mut resources,
  );
  RasterResult { resources, stats }
}

/// Non-blocking rasterization with a single generation in flight.
pub struct AsyncRasterizer {
  receiver: Option<Receiver<RasterResult>>,
}

impl AsyncRasterizer {
  pub fn new() -> Self {
    Self { receiver: None }
  }

  /// Check if a generation is running or finished but not yet collected.
  pub fn is_busy(&self) -> bool {
    self.receiver.is_some()
  }

  /// Start rasterizing on rayon's thread pool.
  ///
  /// Hands the request back if a generation is already in flight.
  pub fn start(&mut self, request: RasterRequest) -> Result<(), Box<RasterRequest>> {
    if self.is_busy() {
      return Err(Box::new(request));
    }

    let (sender, receiver) = channel::bounded(1);
    self.receiver = Some(receiver);

    rayon::spawn(move || {
      let result = run_request(request);
      // Receiver dropped = owner went away
      let _ = sender.send(result);
    });

    Ok(())
  }

  /// Poll for the finished generation (non-blocking).
  pub fn poll(&mut self) -> Option<RasterResult> {
    let receiver = self.receiver.as_ref()?;

    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        Some(result)
      }
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        self.receiver = None;
        None
      }
    }
  }

  /// Block until the in-flight generation finishes.
  ///
  /// Returns `None` when nothing is in flight, or when the task went away
  /// without producing a result.
  pub fn wait(&mut self) -> Option<RasterResult> {
    let receiver = self.receiver.take()?;
    receiver.recv().ok()
  }
}

impl Default for AsyncRasterizer {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
#[path = "async_raster_test.rs"]
mod async_raster_test;
