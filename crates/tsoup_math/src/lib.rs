// Re-export glam for convenience
pub use glam::*;

// tsoup math types
mod aabb;
mod interval;
mod octant;
mod ray;

pub use aabb::{Aabb, POINT_PADDING};
pub use interval::Interval;
pub use octant::{Axis, Octant};
pub use ray::Ray;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_reexport() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
    }
}
