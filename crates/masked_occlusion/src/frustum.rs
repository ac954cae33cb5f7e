//! View frustum culling.
//!
//! Planes are extracted from the view-projection matrix (Gribb-Hartmann) and
//! every object is tested in parallel. A box is culled only when it lies
//! strictly outside some plane; touching a plane keeps it visible.

use glam::{Mat4, Vec4};
use rayon::prelude::*;

use crate::depth::DepthPolicy;
use crate::types::Aabb;

/// View frustum as 6 planes in Hessian normal form `n . p + d = 0`, with
/// normals pointing inward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
  /// left, right, bottom, top, near, far
  pub planes: [Vec4; 6],
}

impl Frustum {
  /// Extract planes from a view-projection matrix.
  ///
  /// The depth planes bound the clip-space slab `ndc_min * w <= z <= w`,
  /// which covers standard and reversed depth alike.
  pub fn from_view_projection(vp: &Mat4, policy: &DepthPolicy) -> Self {
    let row0 = vp.row(0);
    let row1 = vp.row(1);
    let row2 = vp.row(2);
    let row3 = vp.row(3);

    Self {
      planes: [
        normalize_plane(row3 + row0),
        normalize_plane(row3 - row0),
        normalize_plane(row3 + row1),
        normalize_plane(row3 - row1),
        normalize_plane(row2 - policy.ndc_min() * row3),
        normalize_plane(row3 - row2),
      ],
    }
  }

  pub fn from_planes(planes: [Vec4; 6]) -> Self {
    Self { planes }
  }

  /// `true` when the box is at least partially inside (boundary inclusive).
  #[inline]
  pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
    let center = aabb.center();
    let extents = aabb.extents();
    self.planes.iter().all(|plane| {
      let normal = plane.truncate();
      let distance = normal.dot(center) + plane.w;
      let projected_extent = normal.abs().dot(extents);
      distance + projected_extent >= 0.0
    })
  }

  /// Write `hidden[i] = box i is outside` for every box, in parallel.
  /// Returns the number of hidden boxes.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::frustum_cull"))]
  pub fn cull(&self, bounds: &[Aabb], hidden: &mut [bool]) -> usize {
    debug_assert_eq!(bounds.len(), hidden.len());
    hidden
      .par_iter_mut()
      .zip(bounds.par_iter())
      .map(|(hidden, aabb)| {
        *hidden = !self.intersects_aabb(aabb);
        *hidden as usize
      })
      .sum()
  }
}

#[inline]
fn normalize_plane(plane: Vec4) -> Vec4 {
  let normal_length = plane.truncate().length();
  if normal_length > 0.0001 {
    plane / normal_length
  } else {
    plane
  }
}

#[cfg(test)]
#[path = "frustum_test.rs"]
mod frustum_test;
