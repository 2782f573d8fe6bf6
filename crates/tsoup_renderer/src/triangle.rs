//! Ray/triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm. Triangles are two-sided: no
//! backface culling is applied.

use tsoup_core::TriangleSet;
use tsoup_math::{Interval, Ray, Vec3};

/// Determinant magnitude below which a ray counts as parallel.
pub const PARALLEL_EPSILON: f32 = 1e-7;

/// A ray/triangle intersection with interpolated surface attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Ray parameter of the hit.
    pub t: f32,
    /// Weights of the three vertices, `(1 - u - v, u, v)`.
    pub barycentric: [f32; 3],
    pub point: Vec3,
    /// Interpolated vertex normal, unit length. Falls back to the
    /// geometric normal when the vertex normals cancel out.
    pub normal: Vec3,
    /// Interpolated vertex color.
    pub color: Vec3,
    /// Index of the triangle in the (post-build) triangle array.
    pub triangle: usize,
}

/// Intersect `ray` with three positions. Returns `(t, u, v)`.
#[inline]
pub fn intersect(positions: &[Vec3; 3], ray: &Ray) -> Option<(f32, f32, f32)> {
    let [v0, v1, v2] = *positions;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < PARALLEL_EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    Some((f * edge2.dot(q), u, v))
}

/// Intersect triangle `index` of `triangles`, accepting `t` inside `valid`.
pub fn hit_triangle(triangles: &TriangleSet, index: usize, ray: &Ray, valid: Interval) -> Option<SurfaceHit> {
    let triangle = triangles.get(index);
    let (t, u, v) = intersect(&triangle.positions, ray)?;
    if !valid.contains(t) {
        return None;
    }

    let barycentric = [1.0 - u - v, u, v];
    let normal = triangle
        .interpolate_normal(barycentric)
        .try_normalize()
        .unwrap_or_else(|| triangle.face_normal().normalize_or_zero());

    Some(SurfaceHit {
        t,
        barycentric,
        point: ray.at(t),
        normal,
        color: triangle.interpolate_color(barycentric),
        triangle: index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsoup_core::Vertex;

    fn unit_positions() -> [Vec3; 3] {
        [Vec3::ZERO, Vec3::X, Vec3::Y]
    }

    #[test]
    fn test_hit_from_either_side() {
        let positions = unit_positions();
        let front = Ray::new(Vec3::new(0.25, 0.25, 2.0), Vec3::NEG_Z);
        let back = Ray::new(Vec3::new(0.25, 0.25, -3.0), Vec3::Z);

        let (t, u, v) = intersect(&positions, &front).unwrap();
        assert!((t - 2.0).abs() < 1e-6);
        assert!((u - 0.25).abs() < 1e-6 && (v - 0.25).abs() < 1e-6);
        assert!((intersect(&positions, &back).unwrap().0 - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_miss_outside_and_parallel() {
        let positions = unit_positions();
        let outside = Ray::new(Vec3::new(0.8, 0.8, 1.0), Vec3::NEG_Z);
        let parallel = Ray::new(Vec3::new(-1.0, 0.25, 0.0), Vec3::X);

        assert!(intersect(&positions, &outside).is_none());
        assert!(intersect(&positions, &parallel).is_none());
    }

    #[test]
    fn test_hit_triangle_interpolates() {
        let mut set = TriangleSet::new();
        set.add(
            Vertex::new(Vec3::ZERO, Vec3::Z, Vec3::X),
            Vertex::new(Vec3::X, Vec3::Z, Vec3::Y),
            Vertex::new(Vec3::Y, Vec3::Z, Vec3::Z),
        )
        .unwrap();

        let ray = Ray::new(Vec3::new(0.5, 0.25, 1.0), Vec3::NEG_Z);
        let hit = hit_triangle(&set, 0, &ray, Interval::FORWARD).unwrap();

        assert_eq!(hit.triangle, 0);
        assert!((hit.barycentric[0] - 0.25).abs() < 1e-6);
        assert!((hit.color - Vec3::new(0.25, 0.5, 0.25)).length() < 1e-5);
        assert!((hit.point - Vec3::new(0.5, 0.25, 0.0)).length() < 1e-6);
        assert_eq!(hit.normal, Vec3::Z);

        // Behind the valid range
        assert!(hit_triangle(&set, 0, &ray, Interval::new(0.0, 0.5)).is_none());
    }

    #[test]
    fn test_zero_normals_fall_back_to_face_normal() {
        let mut set = TriangleSet::new();
        let v = |p: Vec3| Vertex::new(p, Vec3::ZERO, Vec3::ONE);
        set.add(v(Vec3::ZERO), v(Vec3::X), v(Vec3::Y)).unwrap();

        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::NEG_Z);
        let hit = hit_triangle(&set, 0, &ray, Interval::FORWARD).unwrap();
        assert!((hit.normal - Vec3::Z).length() < 1e-6);
    }
}
