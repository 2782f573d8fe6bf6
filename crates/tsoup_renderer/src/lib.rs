//! tsoup renderer - acceleration structures and ray casting over a
//! triangle soup.
//!
//! - [`Bvh`]: binned-SAH hierarchy in a dense, in-order node arena
//! - stack-based nearest-hit and any-hit traversal
//! - [`Ropes`]: per-octant hit/miss links for stackless traversal
//! - [`SceneShaderData`]: row-padded flat arrays for a shading consumer
//! - tile-parallel rendering to an [`ImageBuffer`]

mod bucket;
mod bvh;
mod camera;
mod packer;
mod renderer;
mod rope;
mod traversal;
mod triangle;
mod world;

pub use bucket::{generate_buckets, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{BuildError, BuildStats, Bvh, BvhNode, BvhResult, NodeKind, LEAF_HISTOGRAM_BUCKETS, SENTINEL};
pub use camera::Camera;
pub use packer::{SceneShaderData, DEFAULT_ROW_WIDTH};
pub use renderer::{
    color_to_rgba, ray_color, render, render_bucket, render_with_camera, Color, ImageBuffer, RenderConfig,
    RenderError, RenderResult,
};
pub use rope::{RopeLink, Ropes};
pub use traversal::TraversalStats;
pub use triangle::{hit_triangle, intersect, SurfaceHit};
pub use world::World;

/// Re-export math types from tsoup_math
pub use tsoup_math::{Aabb, Interval, Octant, Ray, Vec3};
