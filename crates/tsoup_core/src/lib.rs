//! tsoup core - triangle-soup geometry, configuration and loaders.
//!
//! This crate provides:
//!
//! - **Geometry types**: `Vertex`, `Triangle`, `IndexedTriangle`
//! - **TriangleSet**: deduplicated vertex pool plus the triangle array the
//!   BVH builder partitions in place
//! - **Configuration**: `BuildConfig` (SAH constants, depth and leaf limits)
//!   and `LoadOptions`
//! - **Loaders**: the trisrc text format and Wavefront OBJ
//!
//! # Example
//!
//! ```ignore
//! use tsoup_core::{load_triangles, LoadOptions};
//!
//! let triangles = load_triangles("scene.tri", &LoadOptions::from_env()?)?;
//! println!("Loaded {} triangles", triangles.len());
//! ```

pub mod config;
pub mod geometry;
pub mod loader;
pub mod triangle_set;

// Re-export commonly used types
pub use config::{BuildConfig, ConfigError, ConfigResult, LoadOptions};
pub use geometry::{IndexedTriangle, Triangle, Vertex};
pub use loader::{load_obj, load_triangles, load_trisrc, parse_trisrc, LoadError, LoadResult};
pub use triangle_set::{GeometryError, GeometryResult, TriangleSet};
