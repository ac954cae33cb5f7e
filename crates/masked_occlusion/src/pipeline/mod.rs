//! Occlusion Culling Pipeline
//!
//! Per-frame stages, each a pure function over reusable buffers with
//! parallel execution via rayon.
//!
//! ```text
//! ┌───────────┐     ┌────────┐     ┌───────────┐     ┌───────┐     ┌────────┐     ┌──────────┐
//! │ Selection ├────►│ Budget ├────►│ Transform ├────►│ Setup ├────►│ Raster ├────►│ Occludee │
//! └───────────┘     └────────┘     └───────────┘     └───────┘     └────────┘     └──────────┘
//!       │                │               │               │              │               │
//!  ranked + MVPs    allotments     screen tris    edge/plane data   tile store    hidden flags
//! ```
//!
//! # Stage boundaries
//!
//! 1. **Selection**: coverage score per occluder, active flag, rank order
//! 2. **Budget**: single-threaded prefix sum assigning each active occluder a
//!    disjoint slice of the triangle buffers
//! 3. **Transform**: parallel over occluders, each writing only its slice
//! 4. **Setup**: parallel over triangles
//! 5. **Raster**: parallel over bins, which own disjoint tiles
//! 6. **Occludee**: parallel over objects, tile store read-only
//!
//! Stages 2-5 (plus terrain) are bundled in [`rasterize_occluders`] and can
//! run in the background with [`AsyncRasterizer`].

pub mod async_raster;
pub mod budget;
pub mod occludee;
pub mod raster;
pub mod selection;
pub mod setup;
pub mod transform;

pub use async_raster::{
  rasterize_occluders, AsyncRasterizer, RasterRequest, RasterResources, RasterResult, RasterStats,
};
pub use budget::{allot_triangles, BudgetStats, TriangleAllotment, TriangleBudget};
pub use occludee::{is_occluded, project_bounds, test_occludees, OccludeeStats, ScreenRect};
pub use raster::{rasterize_bin, rasterize_bins};
pub use selection::{screen_coverage, select_occluders, OccluderCandidate, OccluderSelection};
pub use setup::{setup_triangle, setup_triangles, TriangleSetup};
pub use transform::{transform_vertices, ScreenTriangle};
