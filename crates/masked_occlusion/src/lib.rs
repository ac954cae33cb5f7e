//! masked_occlusion - Framework/engine independent CPU occlusion culling
//!
//! Decides, every frame, which objects are hidden behind others. A small set
//! of occluder meshes is software-rasterized into a low-resolution coverage
//! buffer of 32x4 pixel tiles, each storing per-sub-tile coverage masks and a
//! conservative depth bound. Object bounds are then tested against it.
//!
//! # Features
//!
//! - **Frustum culling**: Gribb-Hartmann planes, parallel box test
//! - **Occluder selection**: screen-coverage ranking with a per-frame
//!   triangle budget
//! - **Binned rasterization**: bins own disjoint tiles and run in parallel
//!   without locks
//! - **Pipelined mode**: rasterize the next frame in the background while
//!   the host tests against the previous one
//! - **Terrain**: optional heightfield ray-march contributor
//! - **Depth conventions**: standard or reversed, `[-1, 1]` or `[0, 1]` clip
//!   depth
//!
//! Cargo features: `metrics` compiles in [`metrics::CullingMetrics`]
//! collection, `profiling` adds per-stage `tracing` spans.
//!
//! # Example
//!
//! ```ignore
//! use masked_occlusion::{Aabb, CameraFrame, CullingSystem, MocConfig, OccluderMesh};
//!
//! let config = MocConfig::with_resolution(512, 256);
//! let walls = vec![OccluderMesh::new(vertices, indices, model)];
//! let props: Vec<Aabb> = load_bounds();
//!
//! let mut system = CullingSystem::new(config, walls, props, None)?;
//! let stats = system.cull(&CameraFrame::new(view, projection));
//!
//! println!("{} of {} objects visible", stats.visible(), stats.objects);
//! ```

pub mod config;
pub mod constants;
pub mod depth;
pub mod error;
pub mod types;

pub use config::{MocConfig, RayMarchConfig};
pub use depth::{ClipDepthRange, DepthConvention, DepthPolicy};
pub use error::{MocError, MocResult};
pub use types::{Aabb, CameraFrame, FrontFace, Tile, TileGrid, TileRange};

// Coverage buffer
pub mod tile_store;
pub use tile_store::TileStore;

pub mod frustum;
pub use frustum::Frustum;

pub mod occluder;
pub use occluder::{OccluderMesh, OccluderSet};

// Per-frame stages
pub mod pipeline;

// Heightfield ray-march contributor
pub mod terrain;
pub use terrain::Heightfield;

// Frame drivers
pub mod moc;
pub use moc::{MaskedOcclusionCulling, MocFrameStats};

pub mod culling_system;
pub use culling_system::{CullingSystem, FrameStats};

pub mod metrics;

#[cfg(test)]
pub mod test_utils;
