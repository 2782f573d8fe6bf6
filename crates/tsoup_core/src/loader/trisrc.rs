//! trisrc text format.
//!
//! Each record is
//!
//! ```text
//! "texture" tag  sr sg sb sa shininess
//!   x y z  nx ny nz  r g b a  u v     (three times)
//! ```
//!
//! The texture name is quoted (`"*"` means none). Material fields and
//! texture coordinates are read and validated but not used.

use std::path::Path;

use tsoup_math::Vec3;

use super::{finish_loading, LoadError, LoadResult};
use crate::config::LoadOptions;
use crate::geometry::Vertex;
use crate::triangle_set::TriangleSet;

/// Exponent applied to gamma-encoded file colors.
const SCREEN_GAMMA: f32 = 2.63;

/// Numbers per vertex: position, normal, RGBA color, UV.
const VERTEX_FIELDS: usize = 12;

/// Read and parse a trisrc file.
pub fn load_trisrc<P: AsRef<Path>>(path: P, options: &LoadOptions) -> LoadResult<TriangleSet> {
    let content = std::fs::read_to_string(path)?;
    parse_trisrc(&content, options)
}

/// Parse trisrc content already in memory.
pub fn parse_trisrc(content: &str, options: &LoadOptions) -> LoadResult<TriangleSet> {
    let mut scanner = Scanner::new(content);
    let mut triangles = TriangleSet::new();
    let mut record = 0;
    let mut non_finite = 0;

    while !scanner.at_end() {
        record += 1;
        let vertices = scanner.record(record, options)?;
        if vertices.iter().any(|v| !v.position.is_finite()) {
            if non_finite == 0 {
                log::warn!("record {} has a non-finite vertex position", record);
            }
            non_finite += 1;
        }
        let [v0, v1, v2] = vertices;
        triangles.add(v0, v1, v2)?;
    }

    if non_finite > 1 {
        log::warn!("{} records have non-finite vertex positions", non_finite);
    }
    finish_loading(triangles)
}

/// Token scanner over the whole file.
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(content: &'a str) -> Self {
        Self { rest: content }
    }

    fn at_end(&mut self) -> bool {
        self.rest = self.rest.trim_start();
        self.rest.is_empty()
    }

    fn record(&mut self, record: usize, options: &LoadOptions) -> LoadResult<[Vertex; 3]> {
        let error = |message: String| LoadError::Parse { record, message };

        self.quoted().ok_or_else(|| error("couldn't read texture name".into()))?;
        self.token().ok_or_else(|| error("couldn't read tag name".into()))?;

        let mut specular = [0.0; 5];
        self.numbers(&mut specular)
            .map_err(|e| error(format!("couldn't read specular properties: {e}")))?;

        let mut vertices = [Vertex::new(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO); 3];
        for (i, vertex) in vertices.iter_mut().enumerate() {
            let mut fields = [0.0; VERTEX_FIELDS];
            self.numbers(&mut fields)
                .map_err(|e| error(format!("couldn't read vertex {i}: {e}")))?;
            *vertex = to_vertex(&fields, options);
        }

        Ok(vertices)
    }

    /// A `"..."` string; the contents may contain spaces.
    fn quoted(&mut self) -> Option<&'a str> {
        let body = self.rest.trim_start().strip_prefix('"')?;
        let end = body.find('"')?;
        self.rest = &body[end + 1..];
        Some(&body[..end])
    }

    fn token(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        let end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        if end == 0 {
            return None;
        }
        self.rest = &trimmed[end..];
        Some(&trimmed[..end])
    }

    fn numbers(&mut self, out: &mut [f32]) -> Result<(), String> {
        for slot in out.iter_mut() {
            let token = self.token().ok_or("unexpected end of input")?;
            *slot = token
                .parse()
                .map_err(|_| format!("invalid number {token:?}"))?;
        }
        Ok(())
    }
}

fn to_vertex(fields: &[f32; VERTEX_FIELDS], options: &LoadOptions) -> Vertex {
    let position = Vec3::new(fields[0], fields[1], fields[2]) * options.geometry_scale;
    let normal = Vec3::new(fields[3], fields[4], fields[5]).normalize_or_zero();
    let color = Vec3::new(fields[6], fields[7], fields[8]);
    let color = if options.colors_are_linear {
        color
    } else {
        color.powf(SCREEN_GAMMA)
    };

    Vertex::new(position, normal, color)
}
