use crate::Vec3;

/// One of the three coordinate axes. Split planes are always normal to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (0=X, 1=Y, 2=Z).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector along the axis.
    #[inline]
    pub fn normal(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Ray-direction octant: one sign bit per axis.
///
/// Bit 0 is set when x is non-negative, bit 1 for y, bit 2 for z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Octant(u8);

impl Octant {
    pub const COUNT: usize = 8;

    const X_POSITIVE: u8 = 0x1;
    const Y_POSITIVE: u8 = 0x2;
    const Z_POSITIVE: u8 = 0x4;

    /// Octant from a raw code; only the low three bits are kept.
    pub fn from_code(code: u8) -> Self {
        Self(code & 0x7)
    }

    /// Octant containing `direction`. Zero components count as positive.
    pub fn from_direction(direction: Vec3) -> Self {
        let mut code = 0;
        if direction.x >= 0.0 {
            code |= Self::X_POSITIVE;
        }
        if direction.y >= 0.0 {
            code |= Self::Y_POSITIVE;
        }
        if direction.z >= 0.0 {
            code |= Self::Z_POSITIVE;
        }
        Self(code)
    }

    /// All eight octants in code order.
    pub fn all() -> impl Iterator<Item = Octant> {
        (0..Self::COUNT as u8).map(Octant)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Representative direction with a ±1 component per axis.
    pub fn direction(self) -> Vec3 {
        let sign = |bit: u8| if self.0 & bit != 0 { 1.0 } else { -1.0 };
        Vec3::new(
            sign(Self::X_POSITIVE),
            sign(Self::Y_POSITIVE),
            sign(Self::Z_POSITIVE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_normal() {
        for axis in Axis::ALL {
            assert_eq!(axis.normal()[axis.index()], 1.0);
            assert_eq!(axis.normal().length(), 1.0);
        }
    }

    #[test]
    fn test_octant_from_direction() {
        assert_eq!(Octant::from_direction(Vec3::new(1.0, 1.0, 1.0)).index(), 7);
        assert_eq!(Octant::from_direction(Vec3::new(-1.0, -1.0, -1.0)).index(), 0);
        assert_eq!(Octant::from_direction(Vec3::new(1.0, -2.0, -3.0)).index(), 1);
        assert_eq!(Octant::from_direction(Vec3::new(-1.0, 0.0, 5.0)).index(), 6);
    }

    #[test]
    fn test_octant_direction_round_trips_code() {
        for octant in Octant::all() {
            assert_eq!(Octant::from_direction(octant.direction()), octant);
        }
        assert_eq!(Octant::all().count(), 8);
    }
}
