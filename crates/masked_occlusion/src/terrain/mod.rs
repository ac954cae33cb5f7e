//! Terrain occluder.
//!
//! Heightfield terrain is too dense to rasterize as triangles, so it is ray
//! marched at quarter resolution and written straight into the tile store
//! before occluder triangles are merged on top.
//!
//! The result is interpolated from a checkerboard of rays and is therefore
//! approximate. Terrain is opt-in.

pub mod heightfield;
pub mod ray_march;

pub use heightfield::Heightfield;
pub use ray_march::{RayHit, TerrainRaymarcher};
