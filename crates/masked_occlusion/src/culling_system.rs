//! Host-facing culling system.
//!
//! [`CullingSystem`] tracks every object's world bounds, occluders first, and
//! produces one visibility flag per object each frame: frustum culling
//! followed by masked occlusion culling.
//!
//! ```ignore
//! let mut system = CullingSystem::new(config, occluder_meshes, occludee_bounds, None)?;
//! loop {
//!   let stats = system.cull(&CameraFrame::new(view, projection));
//!   for (i, hidden) in system.visibility().iter().enumerate() {
//!     // draw object i unless hidden
//!   }
//! }
//! ```

use std::sync::Arc;

use web_time::Instant;

use crate::config::MocConfig;
use crate::error::MocResult;
use crate::frustum::Frustum;
use crate::moc::MaskedOcclusionCulling;
use crate::occluder::{OccluderMesh, OccluderSet};
use crate::pipeline::RasterStats;
use crate::terrain::Heightfield;
use crate::tile_store::TileStore;
use crate::types::{Aabb, CameraFrame};

/// Per-frame results for a HUD or profiler.
///
/// Durations are in microseconds. In pipelined mode the clear, rasterize and
/// triangle counts describe the generation the occludees were tested against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
  pub frustum_us: u64,
  pub select_us: u64,
  pub clear_us: u64,
  pub rasterize_us: u64,
  pub test_us: u64,
  pub total_us: u64,
  /// Tracked objects, occluders included.
  pub objects: usize,
  pub frustum_culled: usize,
  pub occlusion_culled: usize,
  pub active_occluders: usize,
  /// Triangles that survived setup and reached the bin rasterizer.
  pub rasterized_triangles: usize,
  pub rejected_triangles: usize,
  pub truncated_occluders: usize,
}

impl FrameStats {
  /// Objects left visible after both passes.
  pub fn visible(&self) -> usize {
    self.objects - self.frustum_culled - self.occlusion_culled
  }

  fn with_raster(mut self, raster: &RasterStats) -> Self {
    self.clear_us = raster.clear_us;
    self.rasterize_us = raster.raster_us;
    self.rasterized_triangles = raster
      .budget
      .allotted_triangles
      .saturating_sub(raster.rejected_triangles);
    self.rejected_triangles = raster.rejected_triangles;
    self.truncated_occluders = raster.budget.truncated_occluders;
    self
  }
}

pub struct CullingSystem {
  moc: MaskedOcclusionCulling,
  /// Occluder bounds followed by occludee bounds.
  bounds: Vec<Aabb>,
  occluder_count: usize,
  /// `true` = hidden this frame.
  hidden: Vec<bool>,
}

impl CullingSystem {
  /// Build a system over fixed occluders and occludees.
  ///
  /// Object `i` for `i < occluders.len()` is occluder `i`; the rest follow in
  /// `occludee_bounds` order.
  pub fn new(
    config: MocConfig,
    occluders: Vec<OccluderMesh>,
    occludee_bounds: Vec<Aabb>,
    terrain: Option<&Heightfield>,
  ) -> MocResult<Self> {
    let occluders = Arc::new(OccluderSet::new(occluders)?);
    let occluder_count = occluders.len();

    let mut bounds = Vec::with_capacity(occluder_count + occludee_bounds.len());
    bounds.extend_from_slice(occluders.bounds());
    bounds.extend(occludee_bounds);

    let moc = MaskedOcclusionCulling::new(config, occluders, terrain)?;
    tracing::debug!(
      occluders = occluder_count,
      occludees = bounds.len() - occluder_count,
      "created culling system"
    );

    Ok(Self {
      moc,
      hidden: vec![false; bounds.len()],
      bounds,
      occluder_count,
    })
  }

  /// Cull every tracked object for `camera`.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::frame"))]
  pub fn cull(&mut self, camera: &CameraFrame) -> FrameStats {
    let frame_start = Instant::now();

    let frustum_start = Instant::now();
    let frustum = Frustum::from_view_projection(&camera.view_projection(), &self.moc.config().depth);
    let frustum_culled = frustum.cull(&self.bounds, &mut self.hidden);
    let frustum_us = frustum_start.elapsed().as_micros() as u64;

    let moc = self.moc.cull(camera, &self.bounds, &mut self.hidden);

    let stats = FrameStats {
      frustum_us,
      select_us: moc.select_us,
      test_us: moc.test_us,
      total_us: frame_start.elapsed().as_micros() as u64,
      objects: self.bounds.len(),
      frustum_culled,
      occlusion_culled: moc.occludees.occluded,
      active_occluders: moc.active_occluders,
      ..Default::default()
    }
    .with_raster(&moc.raster);

    tracing::trace!(
      objects = stats.objects,
      frustum_culled = stats.frustum_culled,
      occlusion_culled = stats.occlusion_culled,
      active_occluders = stats.active_occluders,
      rasterized_triangles = stats.rasterized_triangles,
      total_us = stats.total_us,
      "culled frame"
    );
    stats
  }

  /// Hidden flags from the last [`cull`](Self::cull), occluders first.
  #[inline]
  pub fn visibility(&self) -> &[bool] {
    &self.hidden
  }

  #[inline]
  pub fn is_hidden(&self, object: usize) -> bool {
    self.hidden[object]
  }

  #[inline]
  pub fn object_count(&self) -> usize {
    self.bounds.len()
  }

  #[inline]
  pub fn occluder_count(&self) -> usize {
    self.occluder_count
  }

  pub fn bounds(&self) -> &[Aabb] {
    &self.bounds
  }

  /// Tile store for debug views, `None` while a generation is in flight.
  pub fn tile_store(&self) -> Option<&TileStore> {
    self.moc.tile_store()
  }

  /// Wait for the background rasterization, if any.
  pub fn sync_prev_frame(&mut self) -> Option<RasterStats> {
    self.moc.sync_prev_frame()
  }

  pub fn moc(&self) -> &MaskedOcclusionCulling {
    &self.moc
  }
}

#[cfg(test)]
#[path = "culling_system_test.rs"]
mod culling_system_test;
