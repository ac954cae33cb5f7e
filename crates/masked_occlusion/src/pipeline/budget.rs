//! Per-frame triangle budget.
//!
//! Active occluders are walked in rank order and each receives a contiguous
//! range of the shared screen-vertex buffer (a prefix sum). Once the frame cap
//! is reached, later occluders are truncated or skipped for the frame.

use super::selection::OccluderCandidate;

/// Triangle cap for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriangleBudget {
  pub max_triangles: usize,
}

impl TriangleBudget {
  pub const DEFAULT: Self = Self { max_triangles: 6000 };

  /// Unlimited budget for testing or special cases.
  pub const UNLIMITED: Self = Self {
    max_triangles: usize::MAX,
  };

  pub const fn new(max_triangles: usize) -> Self {
    Self { max_triangles }
  }

  /// Triangles still available after `allotted` were handed out.
  #[inline]
  pub fn remaining(&self, allotted: usize) -> usize {
    self.max_triangles.saturating_sub(allotted)
  }
}

impl Default for TriangleBudget {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Triangle range assigned to one occluder this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriangleAllotment {
  pub occluder: usize,
  /// Offset of the occluder's first triangle in the frame buffers.
  pub first_triangle: usize,
  /// Triangles to rasterize, starting from the occluder's first.
  pub triangle_count: usize,
}

/// Statistics from budget allotment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BudgetStats {
  /// Triangles handed out.
  pub allotted_triangles: usize,
  /// Occluders that received fewer triangles than they have (incl. zero).
  pub truncated_occluders: usize,
  /// Triangles left out because of the cap.
  pub dropped_triangles: usize,
}

/// Assign fill offsets in rank order, truncating at the cap.
///
/// Occluders that receive no triangles are omitted from `allotments`.
pub fn allot_triangles(
  ranked: &[OccluderCandidate],
  budget: TriangleBudget,
  allotments: &mut Vec<TriangleAllotment>,
) -> BudgetStats {
  allotments.clear();
  let mut stats = BudgetStats::default();

  for candidate in ranked {
    let granted = candidate
      .triangle_count
      .min(budget.remaining(stats.allotted_triangles));
    if granted < candidate.triangle_count {
      stats.truncated_occluders += 1;
      stats.dropped_triangles += candidate.triangle_count - granted;
    }
    if granted == 0 {
      continue;
    }
    allotments.push(TriangleAllotment {
      occluder: candidate.occluder,
      first_triangle: stats.allotted_triangles,
      triangle_count: granted,
    });
    stats.allotted_triangles += granted;
  }

  stats
}
