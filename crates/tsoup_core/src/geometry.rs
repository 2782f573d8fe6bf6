//! Vertex and triangle types shared by the loaders, the BVH and the renderer.

use tsoup_math::{Aabb, Vec3};

/// A mesh vertex: position, shading normal and linear RGB color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, color: Vec3) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }
}

/// A triangle with its three vertices materialized, as handed to
/// intersection and shading code.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub positions: [Vec3; 3],
    pub normals: [Vec3; 3],
    pub colors: [Vec3; 3],
}

impl Triangle {
    pub fn from_vertices(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Self {
        Self {
            positions: [v0.position, v1.position, v2.position],
            normals: [v0.normal, v1.normal, v2.normal],
            colors: [v0.color, v1.color, v2.color],
        }
    }

    /// Normal interpolated with barycentric weights `(w0, w1, w2)`.
    pub fn interpolate_normal(&self, weights: [f32; 3]) -> Vec3 {
        self.normals[0] * weights[0] + self.normals[1] * weights[1] + self.normals[2] * weights[2]
    }

    /// Color interpolated with barycentric weights `(w0, w1, w2)`.
    pub fn interpolate_color(&self, weights: [f32; 3]) -> Vec3 {
        self.colors[0] * weights[0] + self.colors[1] * weights[1] + self.colors[2] * weights[2]
    }

    /// Unnormalized geometric normal, `(p1 - p0) x (p2 - p0)`.
    pub fn face_normal(&self) -> Vec3 {
        (self.positions[1] - self.positions[0]).cross(self.positions[2] - self.positions[0])
    }
}

/// A triangle stored as three indices into a vertex pool, with the bounding
/// box and centroid the BVH builder bins and partitions on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexedTriangle {
    pub indices: [u32; 3],
    /// Padded box around the three positions.
    pub bounds: Aabb,
    /// Arithmetic mean of the three positions.
    pub centroid: Vec3,
}

impl IndexedTriangle {
    pub fn new(indices: [u32; 3], v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Self {
        Self {
            indices,
            bounds: Aabb::from_triangle(v0.position, v1.position, v2.position),
            centroid: (v0.position + v1.position + v2.position) / 3.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::new(Vec3::new(x, y, z), Vec3::Z, Vec3::ONE)
    }

    #[test]
    fn test_indexed_triangle_centroid_and_bounds() {
        let v0 = vertex(0.0, 0.0, 0.0);
        let v1 = vertex(3.0, 0.0, 0.0);
        let v2 = vertex(0.0, 3.0, 0.0);

        let tri = IndexedTriangle::new([0, 1, 2], &v0, &v1, &v2);

        assert_eq!(tri.centroid, Vec3::new(1.0, 1.0, 0.0));
        assert!(tri.bounds.min.x < 0.0 && tri.bounds.max.x > 3.0);
        // Flat in Z but still has positive depth thanks to padding.
        assert!(tri.bounds.dim().z > 0.0);
    }

    #[test]
    fn test_triangle_interpolation() {
        let mut v0 = vertex(0.0, 0.0, 0.0);
        let mut v1 = vertex(1.0, 0.0, 0.0);
        let v2 = vertex(0.0, 1.0, 0.0);
        v0.color = Vec3::X;
        v1.color = Vec3::Y;

        let tri = Triangle::from_vertices(&v0, &v1, &v2);
        let color = tri.interpolate_color([0.5, 0.5, 0.0]);

        assert!((color - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
        assert!((tri.interpolate_normal([0.2, 0.3, 0.5]) - Vec3::Z).length() < 1e-6);
        assert!((tri.face_normal().normalize() - Vec3::Z).length() < 1e-6);
    }
}
