//! Scene fixtures shared by unit tests.

use glam::{Mat4, Vec3};

use crate::config::MocConfig;
use crate::occluder::OccluderMesh;
use crate::types::{Aabb, CameraFrame};

/// Orthographic camera at the origin looking down -z, world units = pixels.
///
/// Unit depth is `-z / 100` (standard, `[-1, 1]` clip range).
pub fn pixel_camera(width: u32, height: u32) -> CameraFrame {
  CameraFrame::new(
    Mat4::IDENTITY,
    Mat4::orthographic_rh_gl(0.0, width as f32, 0.0, height as f32, 0.0, 100.0),
  )
}

/// Reversed `[0, 1]` variant of [`pixel_camera`]: unit depth is `1 + z / 100`.
pub fn reversed_pixel_camera(width: u32, height: u32) -> CameraFrame {
  CameraFrame::new(
    Mat4::IDENTITY,
    Mat4::orthographic_rh(0.0, width as f32, 0.0, height as f32, 100.0, 0.0),
  )
}

/// Axis-aligned rectangle in the plane `z`, wound counter-clockwise.
pub fn quad(x0: f32, y0: f32, x1: f32, y1: f32, z: f32) -> OccluderMesh {
  OccluderMesh::new(
    vec![
      Vec3::new(x0, y0, z),
      Vec3::new(x1, y0, z),
      Vec3::new(x1, y1, z),
      Vec3::new(x0, y1, z),
    ],
    vec![0, 1, 2, 0, 2, 3],
    Mat4::IDENTITY,
  )
}

/// Box spanning `[x0, x1] x [y0, y1]` between depths `near_z` and `far_z`
/// (both negative, `near_z > far_z`).
pub fn slab(x0: f32, y0: f32, x1: f32, y1: f32, near_z: f32, far_z: f32) -> Aabb {
  Aabb::new(Vec3::new(x0, y0, far_z), Vec3::new(x1, y1, near_z))
}

/// Config for a small buffer with one bin per tile column pair.
pub fn small_config(width: u32, height: u32) -> MocConfig {
  let mut config = MocConfig::with_resolution(width, height);
  config.bin_cols = (width / 64).max(1);
  config.bin_rows = (height / 8).max(1);
  config
}
