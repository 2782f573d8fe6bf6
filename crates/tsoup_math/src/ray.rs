use crate::{Octant, Vec3};

/// A ray in 3D space: `origin + t * direction`.
///
/// The direction is not required to be normalized; hit distances are
/// expressed in units of its length.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Octant of the direction, selecting which rope table applies.
    #[inline]
    pub fn octant(&self) -> Octant {
        Octant::from_direction(self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_octant() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(-1.0, 2.0, -3.0));
        assert_eq!(ray.octant(), Octant::from_code(0x2));
    }
}
