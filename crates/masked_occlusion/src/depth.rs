//! Depth comparison policy.
//!
//! Every depth decision in the crate (tile merge, triangle depth bounds,
//! occludee tests, terrain hits) goes through a [`DepthPolicy`], so standard
//! and reversed depth share one code path.
//!
//! Unit depth is the `[0, 1]` value stored in tiles. With
//! [`DepthConvention::Standard`] the near plane maps to 0 and far to 1; with
//! [`DepthConvention::Reversed`] near is 1 and far is 0.

use serde::{Deserialize, Serialize};

/// Direction of the depth axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthConvention {
  /// near = 0, far = 1
  #[default]
  Standard,
  /// near = 1, far = 0
  Reversed,
}

/// NDC depth range produced by the projection matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipDepthRange {
  /// OpenGL style `[-1, 1]`, remapped with `z * 0.5 + 0.5`.
  #[default]
  NegativeOneToOne,
  /// Direct3D / wgpu style `[0, 1]`, used as-is.
  ZeroToOne,
}

/// Combined depth convention and clip range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthPolicy {
  pub convention: DepthConvention,
  pub clip_range: ClipDepthRange,
}

impl DepthPolicy {
  pub const STANDARD_GL: Self = Self {
    convention: DepthConvention::Standard,
    clip_range: ClipDepthRange::NegativeOneToOne,
  };

  pub const REVERSED_ZERO_TO_ONE: Self = Self {
    convention: DepthConvention::Reversed,
    clip_range: ClipDepthRange::ZeroToOne,
  };

  pub const fn new(convention: DepthConvention, clip_range: ClipDepthRange) -> Self {
    Self {
      convention,
      clip_range,
    }
  }

  #[inline]
  pub fn is_reversed(&self) -> bool {
    self.convention == DepthConvention::Reversed
  }

  /// Unit depth of an empty (cleared) sub-tile.
  #[inline]
  pub fn far(&self) -> f32 {
    if self.is_reversed() {
      0.0
    } else {
      1.0
    }
  }

  /// Unit depth of the near plane.
  #[inline]
  pub fn near(&self) -> f32 {
    if self.is_reversed() {
      1.0
    } else {
      0.0
    }
  }

  /// `true` when `a` is strictly closer to the eye than `b`.
  #[inline]
  pub fn is_nearer(&self, a: f32, b: f32) -> bool {
    if self.is_reversed() {
      a > b
    } else {
      a < b
    }
  }

  #[inline]
  pub fn nearest(&self, a: f32, b: f32) -> f32 {
    if self.is_nearer(b, a) {
      b
    } else {
      a
    }
  }

  #[inline]
  pub fn farthest(&self, a: f32, b: f32) -> f32 {
    if self.is_nearer(a, b) {
      b
    } else {
      a
    }
  }

  /// Map NDC depth to unit depth.
  #[inline]
  pub fn to_unit_depth(&self, ndc_z: f32) -> f32 {
    match self.clip_range {
      ClipDepthRange::NegativeOneToOne => ndc_z * 0.5 + 0.5,
      ClipDepthRange::ZeroToOne => ndc_z,
    }
  }

  /// Map unit depth back to NDC depth.
  #[inline]
  pub fn to_ndc_depth(&self, unit_depth: f32) -> f32 {
    match self.clip_range {
      ClipDepthRange::NegativeOneToOne => unit_depth * 2.0 - 1.0,
      ClipDepthRange::ZeroToOne => unit_depth,
    }
  }

  /// NDC depth of the near plane.
  #[inline]
  pub fn ndc_near(&self) -> f32 {
    match (self.convention, self.clip_range) {
      (DepthConvention::Reversed, _) => 1.0,
      (DepthConvention::Standard, ClipDepthRange::NegativeOneToOne) => -1.0,
      (DepthConvention::Standard, ClipDepthRange::ZeroToOne) => 0.0,
    }
  }

  /// Lower bound of the NDC depth range.
  #[inline]
  pub fn ndc_min(&self) -> f32 {
    match self.clip_range {
      ClipDepthRange::NegativeOneToOne => -1.0,
      ClipDepthRange::ZeroToOne => 0.0,
    }
  }

  /// `true` for unit depths between the near and far planes (inclusive).
  /// NaN is never in range.
  #[inline]
  pub fn in_range(&self, unit_depth: f32) -> bool {
    (0.0..=1.0).contains(&unit_depth)
  }

  /// `true` when `unit_depth` is the far value (within float noise).
  #[inline]
  pub fn is_far(&self, unit_depth: f32) -> bool {
    (unit_depth - self.far()).abs() <= 1e-6
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_standard_ordering() {
    let p = DepthPolicy::STANDARD_GL;
    assert!(p.is_nearer(0.2, 0.5));
    assert!(!p.is_nearer(0.5, 0.5));
    assert_eq!(p.nearest(0.2, 0.5), 0.2);
    assert_eq!(p.farthest(0.2, 0.5), 0.5);
    assert_eq!(p.far(), 1.0);
    assert_eq!(p.to_unit_depth(-1.0), 0.0);
    assert_eq!(p.to_unit_depth(1.0), 1.0);
  }

  #[test]
  fn test_reversed_ordering() {
    let p = DepthPolicy::REVERSED_ZERO_TO_ONE;
    assert!(p.is_nearer(0.5, 0.2));
    assert_eq!(p.nearest(0.2, 0.5), 0.5);
    assert_eq!(p.farthest(0.2, 0.5), 0.2);
    assert_eq!(p.far(), 0.0);
    assert_eq!(p.ndc_near(), 1.0);
    assert_eq!(p.to_unit_depth(0.25), 0.25);
  }

  #[test]
  fn test_ndc_depth_inverts_unit_depth() {
    let gl = DepthPolicy::STANDARD_GL;
    assert_eq!(gl.to_ndc_depth(0.0), -1.0);
    assert_eq!(gl.to_ndc_depth(gl.to_unit_depth(0.5)), 0.5);
    let rz = DepthPolicy::REVERSED_ZERO_TO_ONE;
    assert_eq!(rz.to_ndc_depth(rz.near()), rz.ndc_near());
  }

  #[test]
  fn test_nan_is_out_of_range() {
    let p = DepthPolicy::default();
    assert!(!p.in_range(f32::NAN));
    assert!(p.in_range(0.0));
    assert!(p.in_range(1.0));
    assert!(!p.in_range(1.0001));
  }
}
