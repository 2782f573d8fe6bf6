use crate::{Axis, Interval, Ray, Vec3};

/// Padding applied around every point added to a box, so that boxes of
/// flat or point-like geometry keep a non-zero extent on every axis.
pub const POINT_PADDING: f32 = 1e-5;

const RELATIVE_PADDING: f32 = 4.0 * f32::EPSILON;

/// Axis-Aligned Bounding Box stored as its two corners.
///
/// The empty box has inverted sentinel extrema (`min = +MAX`, `max = -MAX`),
/// so the first point or box added replaces both corners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box containing nothing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
    };

    /// Create a box from two corners, taken as given.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an empty AABB (contains nothing).
    pub fn empty() -> Self {
        Self::EMPTY
    }

    /// Padded box around the three corners of a triangle.
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let mut aabb = Self::EMPTY;
        aabb.add_point(v0);
        aabb.add_point(v1);
        aabb.add_point(v2);
        aabb
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Grow to include `point`, padded by [`POINT_PADDING`] on every side.
    ///
    /// Large coordinates get a few ulps instead, so the padding never
    /// rounds away.
    pub fn add_point(&mut self, point: Vec3) {
        let padding = (point.abs() * RELATIVE_PADDING).max(Vec3::splat(POINT_PADDING));
        self.min = self.min.min(point - padding);
        self.max = self.max.max(point + padding);
    }

    /// Grow to include `point` exactly, without padding.
    pub fn add_exact_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow to include another box.
    pub fn add_box(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// True until something has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extent per axis; axes where `min > max` report zero.
    pub fn dim(&self) -> Vec3 {
        (self.max - self.min).max(Vec3::ZERO)
    }

    /// Total surface area, `2(dx·dy + dx·dz + dy·dz)`.
    pub fn surface_area(&self) -> f32 {
        let d = self.dim();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Lower bound along one axis.
    pub fn lower(&self, axis: Axis) -> f32 {
        self.min[axis.index()]
    }

    /// Upper bound along one axis.
    pub fn upper(&self, axis: Axis) -> f32 {
        self.max[axis.index()]
    }

    /// Returns the axis with the longest extent.
    ///
    /// X wins only when strictly longer than both Y and Z, then Y when
    /// strictly longer than Z, otherwise Z.
    pub fn longest_axis(&self) -> Axis {
        let d = self.dim();

        if d.x > d.y && d.x > d.z {
            Axis::X
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// True if `other` lies inside this box, allowing `tolerance` slack.
    pub fn contains_box(&self, other: &Aabb, tolerance: f32) -> bool {
        let slack = Vec3::splat(tolerance);
        (other.min + slack).cmpge(self.min).all() && (other.max - slack).cmple(self.max).all()
    }

    /// True if both boxes agree corner for corner within `tolerance`.
    pub fn approx_eq(&self, other: &Aabb, tolerance: f32) -> bool {
        self.min.abs_diff_eq(other.min, tolerance) && self.max.abs_diff_eq(other.max, tolerance)
    }

    /// Parameter range over which `ray` is inside the box (slab method).
    ///
    /// The result is invalid (see [`Interval::is_valid`]) when the ray
    /// misses. A zero direction component leaves that slab unconstrained
    /// if the origin lies between its planes and empties the range otherwise.
    pub fn ray_range(&self, ray: &Ray) -> Interval {
        let mut range = Interval::UNIVERSE;

        for axis in Axis::ALL {
            let i = axis.index();
            let t0 = (self.min[i] - ray.origin[i]) / ray.direction[i];
            let t1 = (self.max[i] - ray.origin[i]) / ray.direction[i];
            range = range.intersect(&Interval::new(t0.min(t1), t0.max(t1)));
        }

        range
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
