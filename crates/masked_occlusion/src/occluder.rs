//! Occluder geometry.
//!
//! Occluder meshes are supplied once at setup and never change. They are
//! validated up front and flattened into one [`OccluderSet`], which the
//! background rasterizer shares through an `Arc`.

use glam::{Mat4, Vec3};

use crate::error::{MocError, MocResult};
use crate::types::Aabb;

/// One occluder as supplied by the host.
#[derive(Clone, Debug)]
pub struct OccluderMesh {
  /// Local-space vertex positions.
  pub vertices: Vec<Vec3>,
  /// Triangle list indices into `vertices`.
  pub indices: Vec<u32>,
  /// Local-to-world transform.
  pub model: Mat4,
  /// World-space bounds. Computed from the transformed vertices unless
  /// overridden with [`OccluderMesh::with_bounds`].
  pub bounds: Aabb,
}

impl OccluderMesh {
  pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>, model: Mat4) -> Self {
    let bounds = Aabb::from_points(vertices.iter().map(|v| model.transform_point3(*v)));
    Self {
      vertices,
      indices,
      model,
      bounds,
    }
  }

  pub fn with_bounds(mut self, bounds: Aabb) -> Self {
    self.bounds = bounds;
    self
  }

  #[inline]
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Location of one occluder inside the flattened buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OccluderSpan {
  pub first_vertex: usize,
  pub first_index: usize,
  pub triangle_count: usize,
}

/// All occluders flattened into shared vertex and index buffers.
///
/// Indices stay local to their occluder's vertex range.
#[derive(Clone, Debug, Default)]
pub struct OccluderSet {
  vertices: Vec<Vec3>,
  indices: Vec<u32>,
  spans: Vec<OccluderSpan>,
  models: Vec<Mat4>,
  bounds: Vec<Aabb>,
}

impl OccluderSet {
  /// Validate and flatten `meshes`.
  pub fn new(meshes: Vec<OccluderMesh>) -> MocResult<Self> {
    let mut set = Self::default();
    for (occluder, mesh) in meshes.into_iter().enumerate() {
      if mesh.indices.len() % 3 != 0 {
        return Err(MocError::RaggedIndices {
          occluder,
          len: mesh.indices.len(),
        });
      }
      if let Some(&index) = mesh
        .indices
        .iter()
        .find(|&&i| i as usize >= mesh.vertices.len())
      {
        return Err(MocError::IndexOutOfRange {
          occluder,
          index,
          vertex_count: mesh.vertices.len(),
        });
      }

      set.spans.push(OccluderSpan {
        first_vertex: set.vertices.len(),
        first_index: set.indices.len(),
        triangle_count: mesh.triangle_count(),
      });
      set.models.push(mesh.model);
      set.bounds.push(mesh.bounds);
      set.vertices.extend_from_slice(&mesh.vertices);
      set.indices.extend_from_slice(&mesh.indices);
    }
    Ok(set)
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.spans.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }

  #[inline]
  pub fn model(&self, occluder: usize) -> &Mat4 {
    &self.models[occluder]
  }

  #[inline]
  pub fn span(&self, occluder: usize) -> OccluderSpan {
    self.spans[occluder]
  }

  /// World bounds of every occluder, in occluder order.
  #[inline]
  pub fn bounds(&self) -> &[Aabb] {
    &self.bounds
  }

  /// Local-space corners of triangle `triangle` of `occluder`.
  #[inline]
  pub fn triangle(&self, occluder: usize, triangle: usize) -> [Vec3; 3] {
    let span = self.spans[occluder];
    let base = span.first_index + triangle * 3;
    let tri = &self.indices[base..base + 3];
    let verts = &self.vertices[span.first_vertex..];
    [
      verts[tri[0] as usize],
      verts[tri[1] as usize],
      verts[tri[2] as usize],
    ]
  }

  pub fn total_triangles(&self) -> usize {
    self.spans.iter().map(|s| s.triangle_count).sum()
  }
}
