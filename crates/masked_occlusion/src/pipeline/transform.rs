//! Vertex transform.
//!
//! Each active occluder writes its allotted triangles into its own
//! pre-computed range of the frame's screen-triangle buffer, so occluders
//! transform in parallel without synchronization.

use glam::{Mat4, Vec2, Vec3, Vec4};
use rayon::prelude::*;

use super::budget::TriangleAllotment;
use crate::depth::DepthPolicy;
use crate::occluder::OccluderSet;

/// Screen-space triangle: pixel x, pixel y, unit depth per vertex.
pub type ScreenTriangle = [Vec3; 3];

/// Project a clip-space position to screen space.
///
/// Positions on or behind the eye plane (`w <= 0`) come back as NaN, which
/// triangle setup rejects.
#[inline]
pub fn clip_to_screen(clip: Vec4, viewport: Vec2, policy: &DepthPolicy) -> Vec3 {
  if !(clip.w > 0.0) {
    return Vec3::NAN;
  }
  let ndc = clip.truncate() / clip.w;
  Vec3::new(
    (ndc.x * 0.5 + 0.5) * viewport.x,
    (ndc.y * 0.5 + 0.5) * viewport.y,
    policy.to_unit_depth(ndc.z),
  )
}

/// Transform every allotted triangle into `screen`.
///
/// `screen` is resized to the total allotted triangle count. Allotments must
/// be contiguous and in offset order, as produced by
/// [`allot_triangles`](super::budget::allot_triangles).
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::transform_vertices"))]
pub fn transform_vertices(
  occluders: &OccluderSet,
  allotments: &[TriangleAllotment],
  mvps: &[Mat4],
  viewport: Vec2,
  policy: &DepthPolicy,
  screen: &mut Vec<ScreenTriangle>,
) {
  let total = allotments.last().map_or(0, |a| a.first_triangle + a.triangle_count);
  screen.clear();
  screen.resize(total, [Vec3::ZERO; 3]);

  let mut jobs = Vec::with_capacity(allotments.len());
  let mut rest: &mut [ScreenTriangle] = screen;
  for allotment in allotments {
    let (head, tail) = std::mem::take(&mut rest).split_at_mut(allotment.triangle_count);
    jobs.push((allotment, head));
    rest = tail;
  }

  jobs.into_par_iter().for_each(|(allotment, out)| {
    let mvp = mvps[allotment.occluder];
    for (t, tri) in out.iter_mut().enumerate() {
      let local = occluders.triangle(allotment.occluder, t);
      *tri = local.map(|v| clip_to_screen(mvp * v.extend(1.0), viewport, policy));
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::occluder::OccluderMesh;

  fn strip(triangles: usize, x: f32) -> OccluderMesh {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for t in 0..triangles {
      let base = vertices.len() as u32;
      let y = t as f32;
      vertices.extend([
        Vec3::new(x, y, -1.0),
        Vec3::new(x + 1.0, y, -1.0),
        Vec3::new(x, y + 1.0, -1.0),
      ]);
      indices.extend([base, base + 1, base + 2]);
    }
    OccluderMesh::new(vertices, indices, Mat4::IDENTITY)
  }

  #[test]
  fn test_clip_to_screen_maps_ndc_corners() {
    let viewport = Vec2::new(64.0, 8.0);
    let policy = DepthPolicy::STANDARD_GL;
    assert_eq!(
      clip_to_screen(Vec4::new(-1.0, -1.0, -1.0, 1.0), viewport, &policy),
      Vec3::new(0.0, 0.0, 0.0)
    );
    assert_eq!(
      clip_to_screen(Vec4::new(2.0, 2.0, 2.0, 2.0), viewport, &policy),
      Vec3::new(64.0, 8.0, 1.0)
    );
  }

  #[test]
  fn test_behind_eye_is_nan() {
    let p = clip_to_screen(
      Vec4::new(0.0, 0.0, 0.0, -1.0),
      Vec2::ONE,
      &DepthPolicy::default(),
    );
    assert!(p.is_nan());
  }

  #[test]
  fn test_writes_each_occluder_to_its_offset() {
    let set = OccluderSet::new(vec![strip(3, 0.0), strip(2, 10.0)]).unwrap();
    let allotments = [
      TriangleAllotment {
        occluder: 1,
        first_triangle: 0,
        triangle_count: 2,
      },
      TriangleAllotment {
        occluder: 0,
        first_triangle: 2,
        triangle_count: 1,
      },
    ];
    // Identity MVP: ndc x maps to pixel (x * 0.5 + 0.5) * 2 on a 2x2 viewport.
    let mvps = [Mat4::IDENTITY, Mat4::IDENTITY];
    let mut screen = Vec::new();
    transform_vertices(
      &set,
      &allotments,
      &mvps,
      Vec2::splat(2.0),
      &DepthPolicy::STANDARD_GL,
      &mut screen,
    );

    assert_eq!(screen.len(), 3);
    // ndc x = 10 -> pixel (10 * 0.5 + 0.5) * 2 = 11
    assert_eq!(screen[0][0].x, 11.0);
    assert_eq!(screen[1][0].y, 2.0);
    // truncated occluder keeps only its first triangle
    assert_eq!(screen[2][0].x, 1.0);
    assert_eq!(screen[2][0].y, 1.0);
  }
}
