/// A closed range of ray parameters `[min, max]`.
///
/// Used both as the caller-supplied valid range of a query and as the
/// entry/exit range of a ray through a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Returns true if the interval is non-empty (`min <= max`).
    ///
    /// A single point counts, so a ray grazing a flat box enters it. A NaN
    /// bound makes the interval invalid.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Intersection of two intervals. May be invalid if they do not overlap.
    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval::new(self.min.max(other.min), self.max.min(other.max))
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// Every non-negative ray parameter.
    pub const FORWARD: Interval = Interval {
        min: 0.0,
        max: f32::MAX,
    };

    /// A universe interval (contains everything).
    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_contains_is_inclusive() {
        let interval = Interval::new(0.0, 10.0);

        assert!(interval.contains(0.0));
        assert!(interval.contains(10.0));
        assert!(interval.contains(5.0));
        assert!(!interval.contains(-0.1));
        assert!(!interval.contains(10.1));
    }

    #[test]
    fn test_interval_intersect() {
        let a = Interval::new(0.0, 5.0);
        let b = Interval::new(3.0, 8.0);
        let c = a.intersect(&b);

        assert_eq!(c, Interval::new(3.0, 5.0));
        assert!(c.is_valid());

        let disjoint = a.intersect(&Interval::new(6.0, 7.0));
        assert!(!disjoint.is_valid());
    }

    #[test]
    fn test_interval_single_point_is_valid() {
        assert!(Interval::new(1.0, 1.0).is_valid());
        assert!(!Interval::new(1.0, 0.999).is_valid());
        assert!(!Interval::new(f32::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_interval_empty_and_universe() {
        assert!(!Interval::EMPTY.is_valid());
        assert!(!Interval::EMPTY.contains(0.0));
        assert!(Interval::UNIVERSE.contains(1e10));
        assert!(Interval::FORWARD.contains(0.0));
        assert!(!Interval::FORWARD.contains(-1e-3));
    }
}
