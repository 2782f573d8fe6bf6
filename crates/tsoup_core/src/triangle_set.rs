//! Deduplicated vertex storage plus the triangle array the BVH is built over.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use thiserror::Error;
use tsoup_math::{Aabb, Vec3};

use crate::geometry::{IndexedTriangle, Triangle, Vertex};

/// Errors raised while populating a [`TriangleSet`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Triangle set is finished; no further triangles can be added")]
    Finished,

    #[error("Vertex pool exceeds {} entries", u32::MAX)]
    TooManyVertices,

    #[error("Triangle count exceeds {} entries", u32::MAX)]
    TooManyTriangles,
}

pub type GeometryResult<T> = Result<T, GeometryError>;

/// Exact-value key for vertex deduplication.
///
/// Orders lexicographically over position, normal, then color. Signed zeros
/// are folded together so `-0.0` and `0.0` dedupe to one vertex.
#[derive(Clone, Copy, Debug)]
struct VertexKey([f32; 9]);

impl VertexKey {
    fn new(v: &Vertex) -> Self {
        let p = v.position + Vec3::ZERO;
        let n = v.normal + Vec3::ZERO;
        let c = v.color + Vec3::ZERO;
        Self([p.x, p.y, p.z, n.x, n.y, n.z, c.x, c.y, c.z])
    }
}

impl PartialEq for VertexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VertexKey {}

impl PartialOrd for VertexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VertexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// An indexed triangle soup.
///
/// Vertices are kept in insertion order and deduplicated by exact value.
/// Triangle order is not stable: the BVH builder permutes it in place via
/// [`TriangleSet::swap`], and leaves refer to contiguous ranges of the
/// permuted array afterwards.
#[derive(Debug, Clone)]
pub struct TriangleSet {
    vertices: Vec<Vertex>,
    triangles: Vec<IndexedTriangle>,
    bounds: Aabb,
    /// Only present while loading; dropped by `finish`.
    vertex_lookup: Option<BTreeMap<VertexKey, u32>>,
}

impl TriangleSet {
    /// Create an empty set that accepts triangles.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            bounds: Aabb::EMPTY,
            vertex_lookup: Some(BTreeMap::new()),
        }
    }

    /// Add a triangle and return its index in the triangle array.
    ///
    /// Each vertex is matched against previously added ones by exact value,
    /// not by spatial tolerance.
    pub fn add(&mut self, v0: Vertex, v1: Vertex, v2: Vertex) -> GeometryResult<usize> {
        if self.triangles.len() >= u32::MAX as usize {
            return Err(GeometryError::TooManyTriangles);
        }

        let i0 = self.find_vertex(v0)?;
        let i1 = self.find_vertex(v1)?;
        let i2 = self.find_vertex(v2)?;

        let triangle = IndexedTriangle::new([i0, i1, i2], &v0, &v1, &v2);
        self.bounds.add_box(&triangle.bounds);
        self.triangles.push(triangle);

        Ok(self.triangles.len() - 1)
    }

    fn find_vertex(&mut self, vertex: Vertex) -> GeometryResult<u32> {
        let lookup = self.vertex_lookup.as_mut().ok_or(GeometryError::Finished)?;
        let key = VertexKey::new(&vertex);

        if let Some(&index) = lookup.get(&key) {
            return Ok(index);
        }

        let index = u32::try_from(self.vertices.len()).map_err(|_| GeometryError::TooManyVertices)?;
        self.vertices.push(vertex);
        lookup.insert(key, index);
        Ok(index)
    }

    /// Materialize triangle `i` with its three full vertices.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn get(&self, i: usize) -> Triangle {
        let [i0, i1, i2] = self.triangles[i].indices;
        Triangle::from_vertices(
            &self.vertices[i0 as usize],
            &self.vertices[i1 as usize],
            &self.vertices[i2 as usize],
        )
    }

    /// The stored (indexed) form of triangle `i`.
    pub fn indexed(&self, i: usize) -> &IndexedTriangle {
        &self.triangles[i]
    }

    /// Exchange two triangle slots. Used by the BVH partition step.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.triangles.swap(i, j);
    }

    /// Drop the dedup lookup. Loading is complete after this.
    pub fn finish(&mut self) {
        self.vertex_lookup = None;
    }

    pub fn is_finished(&self) -> bool {
        self.vertex_lookup.is_none()
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[IndexedTriangle] {
        &self.triangles
    }

    /// Box around every triangle added so far.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Center of the aggregate box.
    pub fn center(&self) -> Vec3 {
        self.bounds.center()
    }

    /// Twice the largest distance from [`center`](Self::center) to any
    /// referenced vertex.
    pub fn extent(&self) -> f32 {
        let center = self.center();
        let max_distance_squared = self
            .triangles
            .iter()
            .flat_map(|t| t.indices)
            .map(|i| self.vertices[i as usize].position.distance_squared(center))
            .fold(0.0_f32, f32::max);

        max_distance_squared.sqrt() * 2.0
    }
}

impl Default for TriangleSet {
    fn default() -> Self {
        Self::new()
    }
}
