use super::*;
use crate::depth::{ClipDepthRange, DepthConvention};

#[test]
fn test_default_is_valid() {
  let config = MocConfig::default();
  assert!(config.validate().is_ok());
  assert_eq!(config.tile_grid(), TileGrid { cols: 30, rows: 135 });
  assert!(!config.async_rasterize);
  assert_eq!(config.max_rasterized_triangles, 6000);
}

#[test]
fn test_zero_resolution_rejected() {
  let config = MocConfig::with_resolution(0, 540);
  assert!(matches!(
    config.validate(),
    Err(MocError::InvalidResolution { width: 0, .. })
  ));
}

#[test]
fn test_non_tile_multiple_rejected() {
  let config = MocConfig::with_resolution(100, 64);
  assert!(matches!(config.validate(), Err(MocError::InvalidResolution { .. })));

  let config = MocConfig::with_resolution(128, 6);
  assert!(matches!(config.validate(), Err(MocError::InvalidResolution { .. })));
}

#[test]
fn test_bin_grid_must_fit() {
  let mut config = MocConfig::with_resolution(64, 8);
  config.bin_cols = 3;
  assert!(matches!(config.validate(), Err(MocError::InvalidBinGrid { .. })));

  config.bin_cols = 2;
  config.bin_rows = 2;
  assert!(config.validate().is_ok());

  config.bin_rows = 0;
  assert!(matches!(config.validate(), Err(MocError::InvalidBinGrid { .. })));
}

#[test]
fn test_coverage_threshold_range() {
  let mut config = MocConfig::default();
  config.coverage_threshold = 1.5;
  assert!(matches!(
    config.validate(),
    Err(MocError::InvalidCoverageThreshold(_))
  ));
  config.coverage_threshold = f32::NAN;
  assert!(config.validate().is_err());
}

#[test]
fn test_zero_budget_rejected() {
  let mut config = MocConfig::default();
  config.max_rasterized_triangles = 0;
  assert!(matches!(config.validate(), Err(MocError::ZeroTriangleBudget)));
}

#[test]
fn test_ray_march_validation() {
  let mut config = MocConfig::default();
  config.ray_march.start_step = 0.0;
  assert!(matches!(config.validate(), Err(MocError::InvalidRayMarch(_))));

  let mut config = MocConfig::default();
  config.ray_march.max_step = 0.25;
  assert!(config.validate().is_err());

  let mut config = MocConfig::default();
  config.ray_march.downsample = 0;
  assert!(config.validate().is_err());
}

#[test]
fn test_partial_toml_uses_defaults() {
  let config = MocConfig::from_toml_str(
    r#"
      depth_buffer_width = 1280
      depth_buffer_height = 720
      async_rasterize = true

      [depth]
      convention = "reversed"
      clip_range = "zero_to_one"

      [ray_march]
      downsample = 2
    "#,
  )
  .unwrap();

  assert_eq!(config.depth_buffer_width, 1280);
  assert!(config.async_rasterize);
  assert_eq!(config.depth.convention, DepthConvention::Reversed);
  assert_eq!(config.depth.clip_range, ClipDepthRange::ZeroToOne);
  assert_eq!(config.ray_march.downsample, 2);
  assert_eq!(config.ray_march.start_step, 0.5);
  assert_eq!(config.bin_cols, 4);
  assert_eq!(config.coverage_threshold, 0.1);
}

#[test]
fn test_toml_validation_runs() {
  let err = MocConfig::from_toml_str("depth_buffer_width = 33").unwrap_err();
  assert!(matches!(err, MocError::InvalidResolution { width: 33, .. }));
}

#[test]
fn test_toml_syntax_error() {
  let err = MocConfig::from_toml_str("depth_buffer_width = ").unwrap_err();
  assert!(matches!(err, MocError::Parse(_)));
}

#[test]
fn test_load_missing_file() {
  let err = MocConfig::load(Path::new("/nonexistent/culling.toml")).unwrap_err();
  assert!(matches!(err, MocError::Io { .. }));
}

#[test]
fn test_toml_roundtrip_through_serialize() {
  let mut config = MocConfig::default();
  config.front_face = FrontFace::Clockwise;
  let text = toml::to_string(&config).unwrap();
  assert_eq!(MocConfig::from_toml_str(&text).unwrap(), config);
}
