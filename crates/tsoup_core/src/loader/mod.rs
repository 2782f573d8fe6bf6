//! Loaders that populate a [`TriangleSet`] from mesh files.
//!
//! ## Supported formats
//!
//! - trisrc: a whitespace-separated text format with one record per
//!   triangle (`.tri`, `.trisrc`, and anything not recognized as OBJ)
//! - Wavefront OBJ (`.obj`), read through `tobj`
//!
//! Loading is all-or-nothing: a malformed record or an empty file is a
//! [`LoadError`] and no partially filled set is returned. Every set returned
//! from here has been [`finish`](TriangleSet::finish)ed.

mod obj;
mod trisrc;

use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use crate::config::LoadOptions;
use crate::triangle_set::{GeometryError, TriangleSet};

pub use obj::load_obj;
pub use trisrc::{load_trisrc, parse_trisrc};

/// Errors that can occur while loading geometry.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("Parse error in record {record}: {message}")]
    Parse { record: usize, message: String },

    #[error("Invalid face index {index} (vertex count {vertex_count})")]
    InvalidIndex { index: usize, vertex_count: usize },

    #[error("No triangles found in input")]
    NoGeometry,

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Load a triangle set, choosing the format from the file extension.
pub fn load_triangles<P: AsRef<Path>>(path: P, options: &LoadOptions) -> LoadResult<TriangleSet> {
    let path = path.as_ref();
    let is_obj = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"));

    let start = Instant::now();
    let triangles = if is_obj {
        load_obj(path, options)?
    } else {
        load_trisrc(path, options)?
    };

    log::info!("Parsing: {:.3} seconds", start.elapsed().as_secs_f32());
    Ok(triangles)
}

/// Shared tail of every loader: reject empty input, report, seal the set.
fn finish_loading(mut triangles: TriangleSet) -> LoadResult<TriangleSet> {
    if triangles.is_empty() {
        return Err(LoadError::NoGeometry);
    }

    let triangle_count = triangles.len();
    let vertex_count = triangles.vertices().len();
    log::info!("{} triangles.", triangle_count);
    log::info!("{} independent vertices.", vertex_count);
    log::info!(
        "{:.2} vertices per triangle.",
        vertex_count as f32 / triangle_count as f32
    );

    triangles.finish();
    Ok(triangles)
}
