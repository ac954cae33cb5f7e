//! Engine-agnostic metrics collection for culling statistics.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//! The culling core never records anything itself; hosts feed the
//! [`FrameStats`] returned by [`CullingSystem::cull`](crate::CullingSystem::cull).
//!
//! # Usage
//!
//! ```ignore
//! use masked_occlusion::metrics::{CullingMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let stats = system.cull(&camera);
//! metrics.record_frame(&stats);
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use crate::culling_system::FrameStats;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }

  /// Backing storage, for histogram rendering.
  pub fn as_slice(&self) -> &VecDeque<T> {
    &self.buffer
  }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
  pub fn sum(&self) -> T {
    self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
  }
}

impl RollingWindow<u64> {
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = *self.buffer.iter().min()?;
    let max = *self.buffer.iter().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128) // ~2 seconds at 60fps
  }
}

/// Culling statistics aggregated over recent frames.
#[derive(Debug, Clone, Default)]
pub struct CullingMetrics {
  // Timing (microseconds)
  pub frame_timings: RollingWindow<u64>,
  pub frustum_timings: RollingWindow<u64>,
  /// Clear plus rasterization of the generation tested against.
  pub raster_timings: RollingWindow<u64>,
  pub test_timings: RollingWindow<u64>,

  // Culling rates
  /// Occlusion-culled objects per frame.
  pub occluded_counts: RollingWindow<u64>,
  /// Triangles reaching the bin rasterizer per frame.
  pub triangle_counts: RollingWindow<u64>,

  /// Snapshot of the last recorded frame (for UI).
  pub last: FrameStats,

  // Cumulative, survive `reset`
  pub total_frames: u64,
  pub total_frustum_culled: u64,
  pub total_occlusion_culled: u64,
  /// Frames in which the triangle budget dropped at least one occluder.
  pub truncated_frames: u64,
}

impl CullingMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clear the rolling windows and snapshot.
  pub fn reset(&mut self) {
    self.frame_timings.clear();
    self.frustum_timings.clear();
    self.raster_timings.clear();
    self.test_timings.clear();
    self.occluded_counts.clear();
    self.triangle_counts.clear();
    self.last = FrameStats::default();
  }

  pub fn record_frame(&mut self, stats: &FrameStats) {
    if !is_enabled() {
      return;
    }

    self.frame_timings.push(stats.total_us);
    self.frustum_timings.push(stats.frustum_us);
    self.raster_timings.push(stats.clear_us + stats.rasterize_us);
    self.test_timings.push(stats.test_us);
    self.occluded_counts.push(stats.occlusion_culled as u64);
    self.triangle_counts.push(stats.rasterized_triangles as u64);
    self.last = *stats;

    self.total_frames += 1;
    self.total_frustum_culled += stats.frustum_culled as u64;
    self.total_occlusion_culled += stats.occlusion_culled as u64;
    if stats.truncated_occluders > 0 {
      self.truncated_frames += 1;
    }
  }

  pub fn avg_frame_us(&self) -> f64 {
    self.frame_timings.average()
  }

  pub fn avg_raster_us(&self) -> f64 {
    self.raster_timings.average()
  }

  pub fn avg_test_us(&self) -> f64 {
    self.test_timings.average()
  }

  /// Fraction of the last frame's objects removed by either pass.
  pub fn culled_ratio(&self) -> f64 {
    if self.last.objects == 0 {
      0.0
    } else {
      (self.last.frustum_culled + self.last.occlusion_culled) as f64 / self.last.objects as f64
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rolling_window() {
    let mut window = RollingWindow::new(3);
    assert!(window.is_empty());
    assert!(window.min_max().is_none());

    window.push(10u64);
    window.push(20);
    window.push(30);
    assert_eq!(window.len(), 3);
    assert_eq!(window.sum(), 60);
    assert_eq!(window.average(), 20.0);

    // Push one more, oldest should be evicted
    window.push(40);
    assert_eq!(window.len(), 3);
    assert_eq!(window.sum(), 90);
    assert_eq!(window.average(), 30.0);
    assert_eq!(window.min_max(), Some((20, 40)));
    assert_eq!(window.last(), Some(&40));
  }

  #[cfg(feature = "metrics")]
  fn frame(total_us: u64, occluded: usize, truncated: usize) -> FrameStats {
    FrameStats {
      total_us,
      clear_us: 10,
      rasterize_us: 90,
      objects: 10,
      frustum_culled: 2,
      occlusion_culled: occluded,
      truncated_occluders: truncated,
      ..Default::default()
    }
  }

  #[cfg(feature = "metrics")]
  #[test]
  fn test_record_frames() {
    let mut metrics = CullingMetrics::new();
    metrics.record_frame(&frame(1000, 3, 0));
    metrics.record_frame(&frame(3000, 5, 1));

    assert_eq!(metrics.frame_timings.len(), 2);
    assert_eq!(metrics.avg_frame_us(), 2000.0);
    assert_eq!(metrics.avg_raster_us(), 100.0);
    assert_eq!(metrics.total_frames, 2);
    assert_eq!(metrics.total_frustum_culled, 4);
    assert_eq!(metrics.total_occlusion_culled, 8);
    assert_eq!(metrics.truncated_frames, 1);
    assert_eq!(metrics.last.occlusion_culled, 5);
    assert!((metrics.culled_ratio() - 0.7).abs() < 1e-9);
  }

  #[cfg(feature = "metrics")]
  #[test]
  fn test_reset_keeps_totals() {
    let mut metrics = CullingMetrics::new();
    metrics.record_frame(&frame(1000, 3, 0));
    metrics.reset();

    assert!(metrics.frame_timings.is_empty());
    assert_eq!(metrics.last, FrameStats::default());
    assert_eq!(metrics.total_frames, 1);
  }

  #[cfg(not(feature = "metrics"))]
  #[test]
  fn test_record_is_noop_without_feature() {
    let mut metrics = CullingMetrics::new();
    metrics.record_frame(&FrameStats {
      total_us: 1000,
      ..Default::default()
    });
    assert!(metrics.frame_timings.is_empty());
    assert_eq!(metrics.total_frames, 0);
  }
}
