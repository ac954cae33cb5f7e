//! Masked occlusion culling frame driver.
//!
//! [`MaskedOcclusionCulling`] owns the tile store and per-frame buffers and
//! runs selection, rasterization and the occludee test for one camera.
//!
//! Two modes:
//!
//! - **Synchronous**: select, clear, (terrain || transform + setup),
//!   rasterize, test. Objects are tested against this frame's occluders.
//! - **Pipelined** (`async_rasterize`): wait for the previous generation,
//!   select, test against the previous frame's tiles, then rasterize this
//!   frame in the background. Results lag one frame; the first frame culls
//!   nothing by occlusion.

use std::sync::Arc;

use web_time::Instant;

use crate::config::MocConfig;
use crate::error::MocResult;
use crate::occluder::OccluderSet;
use crate::pipeline::{
  rasterize_occluders, select_occluders, test_occludees, AsyncRasterizer, OccludeeStats,
  OccluderSelection, RasterRequest, RasterResources, RasterStats, TriangleBudget,
};
use crate::terrain::{Heightfield, TerrainRaymarcher};
use crate::tile_store::TileStore;
use crate::types::{Aabb, CameraFrame};

/// Statistics from one [`MaskedOcclusionCulling::cull`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MocFrameStats {
  /// Occluders at or above the coverage threshold this frame.
  pub active_occluders: usize,
  /// Rasterization the occludees were tested against. In pipelined mode this
  /// is the previous frame's generation (all zero on the first frame).
  pub raster: RasterStats,
  pub occludees: OccludeeStats,
  /// Selection time in microseconds.
  pub select_us: u64,
  /// Occludee test time in microseconds.
  pub test_us: u64,
}

pub struct MaskedOcclusionCulling {
  config: MocConfig,
  occluders: Arc<OccluderSet>,
  /// Downsampled terrain, kept to rebuild lost resources.
  terrain: Option<Arc<Heightfield>>,
  selection: OccluderSelection,
  /// `None` while a generation is in flight.
  resources: Option<RasterResources>,
  rasterizer: AsyncRasterizer,
  /// Stats of the generation currently held in `resources`.
  held_raster: Option<RasterStats>,
}

impl MaskedOcclusionCulling {
  /// Validate `config` and allocate the tile store.
  ///
  /// `terrain` is downsampled once here by `config.ray_march.downsample`.
  pub fn new(
    config: MocConfig,
    occluders: Arc<OccluderSet>,
    terrain: Option<&Heightfield>,
  ) -> MocResult<Self> {
    config.validate()?;
    let terrain = terrain.map(|field| Arc::new(field.downsampled(config.ray_march.downsample)));

    let mut moc = Self {
      config,
      occluders,
      terrain,
      selection: OccluderSelection::default(),
      resources: None,
      rasterizer: AsyncRasterizer::new(),
      held_raster: None,
    };
    moc.resources = Some(moc.fresh_resources());

    let grid = moc.config.tile_grid();
    tracing::debug!(
      tile_cols = grid.cols,
      tile_rows = grid.rows,
      bins = moc.config.bin_cols * moc.config.bin_rows,
      occluders = moc.occluders.len(),
      occluder_triangles = moc.occluders.total_triangles(),
      terrain = moc.terrain.is_some(),
      pipelined = moc.config.async_rasterize,
      "created masked occlusion culling"
    );
    Ok(moc)
  }

  fn fresh_resources(&self) -> RasterResources {
    let grid = self.config.tile_grid();
    let tiles = TileStore::new(grid, self.config.bin_cols, self.config.bin_rows, self.config.depth);
    let terrain = self
      .terrain
      .as_ref()
      .map(|field| {
        TerrainRaymarcher::new(field.clone(), self.config.ray_march, grid, &self.config.depth)
      });
    RasterResources::new(tiles, terrain)
  }

  #[inline]
  pub fn config(&self) -> &MocConfig {
    &self.config
  }

  #[inline]
  pub fn occluders(&self) -> &Arc<OccluderSet> {
    &self.occluders
  }

  /// Selection from the most recent frame.
  #[inline]
  pub fn selection(&self) -> &OccluderSelection {
    &self.selection
  }

  /// The current tile store, or `None` while a generation is in flight.
  pub fn tile_store(&self) -> Option<&TileStore> {
    self.resources.as_ref().map(|r| &r.tiles)
  }

  /// `true` while a background generation is running or uncollected.
  pub fn is_rasterizing(&self) -> bool {
    self.rasterizer.is_busy()
  }

  /// Block until the in-flight generation (if any) is finished and take its
  /// tiles back. Returns that generation's stats.
  pub fn sync_prev_frame(&mut self) -> Option<RasterStats> {
    let result = self.rasterizer.wait()?;
    self.resources = Some(result.resources);
    self.held_raster = Some(result.stats);
    Some(result.stats)
  }

  fn budget(&self) -> TriangleBudget {
    TriangleBudget::new(self.config.max_rasterized_triangles as usize)
  }

  /// Cull one frame.
  ///
  /// `bounds` lists occluders first (in [`OccluderSet`] order), then
  /// occludees. `hidden` holds the frustum result on entry and receives the
  /// occlusion result; active occluders are never hidden here.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::cull"))]
  pub fn cull(&mut self, camera: &CameraFrame, bounds: &[Aabb], hidden: &mut [bool]) -> MocFrameStats {
    debug_assert_eq!(bounds.len(), hidden.len());
    debug_assert!(bounds.len() >= self.occluders.len());

    if self.config.async_rasterize {
      self.sync_prev_frame();
    }

    let view_projection = camera.view_projection();
    let occluder_count = self.occluders.len();

    let select_start = Instant::now();
    select_occluders(
      &self.occluders,
      &hidden[..occluder_count],
      &view_projection,
      &self.config.depth,
      self.config.coverage_threshold,
      &mut self.selection,
    );
    let select_us = select_start.elapsed().as_micros() as u64;

    let mut resources = match self.resources.take() {
      Some(resources) => resources,
      None => self.fresh_resources(),
    };

    let mut stats = MocFrameStats {
      active_occluders: self.selection.active_count(),
      select_us,
      ..Default::default()
    };

    if !self.config.async_rasterize {
      let raster = rasterize_occluders(
        &self.occluders,
        &self.selection.ranked,
        &self.selection.mvps,
        camera,
        self.budget(),
        self.config.front_face,
        &mut resources,
      );
      self.held_raster = Some(raster);
    }

    // Pipelined first frame: no finished tiles to test against.
    if let Some(raster) = self.held_raster {
      let selection = &self.selection;
      let test_start = Instant::now();
      stats.occludees = test_occludees(
        bounds,
        hidden,
        |i| i < occluder_count && selection.is_active(i),
        &view_projection,
        &resources.tiles,
      );
      stats.test_us = test_start.elapsed().as_micros() as u64;
      stats.raster = raster;
    }

    if self.config.async_rasterize {
      self.start_generation(camera, resources);
    } else {
      self.resources = Some(resources);
    }
    stats
  }

  fn start_generation(&mut self, camera: &CameraFrame, resources: RasterResources) {
    let request = RasterRequest {
      occluders: self.occluders.clone(),
      ranked: self.selection.ranked.clone(),
      mvps: self.selection.mvps.clone(),
      camera: *camera,
      budget: self.budget(),
      front_face: self.config.front_face,
      resources,
    };
    self.held_raster = None;
    if let Err(request) = self.rasterizer.start(request) {
      // Unreachable after sync_prev_frame; keep the tiles readable.
      self.resources = Some(request.resources);
    }
  }
}

#[cfg(test)]
#[path = "moc_test.rs"]
mod moc_test;
