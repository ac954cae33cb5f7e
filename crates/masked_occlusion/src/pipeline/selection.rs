//! Occluder selection.
//!
//! Every occluder that survived frustum culling gets a screen coverage score
//! from its projected bounds. Occluders at or above the threshold become
//! active: they get an MVP matrix and are ranked by descending coverage so
//! the triangle budget goes to the biggest screen contributors first.

use glam::{Mat4, Vec2};
use rayon::prelude::*;

use crate::depth::DepthPolicy;
use crate::occluder::OccluderSet;
use crate::types::Aabb;

/// An active occluder, as ranked by selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OccluderCandidate {
  pub occluder: usize,
  pub coverage: f32,
  pub triangle_count: usize,
}

/// Per-frame selection output. Buffers are reused across frames.
#[derive(Clone, Debug, Default)]
pub struct OccluderSelection {
  /// Screen coverage per occluder (0 for culled or unsafe projections).
  pub coverage: Vec<f32>,
  /// Active flag per occluder.
  pub active: Vec<bool>,
  /// Model-view-projection per occluder. Only meaningful when active.
  pub mvps: Vec<Mat4>,
  /// Active occluders, highest coverage first.
  pub ranked: Vec<OccluderCandidate>,
}

impl OccluderSelection {
  pub fn active_count(&self) -> usize {
    self.ranked.len()
  }

  #[inline]
  pub fn is_active(&self, occluder: usize) -> bool {
    self.active.get(occluder).copied().unwrap_or(false)
  }
}

/// Approximate screen coverage of a box: `max(half width, half height)` of
/// its NDC rectangle clamped to the screen.
///
/// Returns 0 when any corner is behind the eye or outside the depth range,
/// since the projected rectangle is unreliable there.
pub fn screen_coverage(aabb: &Aabb, view_projection: &Mat4, policy: &DepthPolicy) -> f32 {
  let mut min = Vec2::splat(f32::MAX);
  let mut max = Vec2::splat(f32::MIN);

  for corner in aabb.corners() {
    let clip = *view_projection * corner.extend(1.0);
    if !(clip.w > 0.0) {
      return 0.0;
    }
    let ndc = clip.truncate() / clip.w;
    if !policy.in_range(policy.to_unit_depth(ndc.z)) {
      return 0.0;
    }
    min = min.min(ndc.truncate());
    max = max.max(ndc.truncate());
  }

  let min = min.clamp(Vec2::NEG_ONE, Vec2::ONE);
  let max = max.clamp(Vec2::NEG_ONE, Vec2::ONE);
  let size = max - min;
  size.x.max(size.y) * 0.5
}

/// Score, flag and rank occluders.
///
/// `hidden` holds the frustum result for each occluder (same order as the set).
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::select_occluders"))]
pub fn select_occluders(
  occluders: &OccluderSet,
  hidden: &[bool],
  view_projection: &Mat4,
  policy: &DepthPolicy,
  coverage_threshold: f32,
  selection: &mut OccluderSelection,
) {
  let count = occluders.len();
  debug_assert!(hidden.len() >= count);

  selection.coverage.resize(count, 0.0);
  selection.active.resize(count, false);
  selection.mvps.resize(count, Mat4::IDENTITY);

  let bounds = occluders.bounds();
  selection
    .coverage
    .par_iter_mut()
    .zip(selection.active.par_iter_mut())
    .zip(selection.mvps.par_iter_mut())
    .enumerate()
    .for_each(|(i, ((coverage, active), mvp))| {
      *coverage = if hidden[i] {
        0.0
      } else {
        screen_coverage(&bounds[i], view_projection, policy)
      };
      *active = *coverage > 0.0 && *coverage >= coverage_threshold;
      if *active {
        *mvp = *view_projection * *occluders.model(i);
      }
    });

  selection.ranked.clear();
  selection.ranked.extend(
    (0..count)
      .filter(|&i| selection.active[i])
      .map(|i| OccluderCandidate {
        occluder: i,
        coverage: selection.coverage[i],
        triangle_count: occluders.span(i).triangle_count,
      }),
  );
  // Stable: equal coverage keeps occluder order.
  selection
    .ranked
    .sort_by(|a, b| b.coverage.total_cmp(&a.coverage));
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;
