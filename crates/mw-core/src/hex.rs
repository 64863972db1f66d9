//! Axial hex coordinates (flat-topped layout).
//!
//! Cell bodies are built from hexes. Each hex is addressed by its axial
//! `(q, r)` pair; the implied third cube coordinate is `-q - r`.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Distance from a hex centre to any of its corners, in world units.
pub const HEX_SIZE: f32 = 0.75;

const SQRT_3: f32 = 1.732_050_8;

/// A hex in axial coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hex {
    /// Column.
    pub q: i32,
    /// Row.
    pub r: i32,
}

impl Hex {
    /// The origin hex.
    pub const ZERO: Self = Self { q: 0, r: 0 };

    /// Offsets to the six neighbours, clockwise starting from "north".
    pub const NEIGHBOUR_OFFSETS: [Self; 6] = [
        Self { q: 0, r: -1 },
        Self { q: 1, r: -1 },
        Self { q: 1, r: 0 },
        Self { q: 0, r: 1 },
        Self { q: -1, r: 1 },
        Self { q: -1, r: 0 },
    ];

    /// Hex at axial coordinates `(q, r)`.
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The six hexes sharing an edge with this one.
    pub fn neighbours(self) -> impl Iterator<Item = Self> {
        Self::NEIGHBOUR_OFFSETS.into_iter().map(move |o| self + o)
    }

    /// Number of steps between two hexes.
    pub fn distance(self, other: Self) -> u32 {
        let d = self - other;
        (d.q.unsigned_abs() + d.r.unsigned_abs() + (d.q + d.r).unsigned_abs()) / 2
    }

    /// Rotate around the origin by `steps` sixths of a turn, clockwise.
    pub fn rotated(self, steps: u32) -> Self {
        let mut hex = self;
        for _ in 0..steps % 6 {
            hex = Self::new(-hex.r, hex.q + hex.r);
        }
        hex
    }

    /// Centre of this hex on the x/z plane.
    pub fn to_cartesian(self) -> Vec3 {
        let q = self.q as f32;
        let r = self.r as f32;
        Vec3::new(
            q * HEX_SIZE * 1.5,
            0.0,
            r * HEX_SIZE * SQRT_3 + q * HEX_SIZE * SQRT_3 / 2.0,
        )
    }

    /// The hex containing a point on the x/z plane.
    pub fn from_cartesian(point: Vec3) -> Self {
        let q = point.x * (2.0 / 3.0) / HEX_SIZE;
        let r = (point.z * SQRT_3 / 3.0 - point.x / 3.0) / HEX_SIZE;
        Self::cube_round(q, r)
    }

    /// Round fractional axial coordinates to the nearest hex.
    fn cube_round(q: f32, r: f32) -> Self {
        let s = -q - r;
        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let dq = (rq - q).abs();
        let dr = (rr - r).abs();
        let ds = (rs - s).abs();

        if dq > dr && dq > ds {
            rq = -rr - rs;
        } else if dr > ds {
            rr = -rq - rs;
        }
        Self::new(rq as i32, rr as i32)
    }
}

impl Add for Hex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl Sub for Hex {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl Neg for Hex {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.q, -self.r)
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn neighbours_are_at_distance_one() {
        let centre = Hex::new(3, -2);
        for n in centre.neighbours() {
            assert_eq!(centre.distance(n), 1);
        }
    }

    #[test]
    fn six_rotations_visit_every_neighbour() {
        let mut seen: Vec<Hex> = (0..6).map(|s| Hex::new(1, 0).rotated(s)).collect();
        seen.sort();
        let mut expected = Hex::NEIGHBOUR_OFFSETS.to_vec();
        expected.sort();
        assert_eq!(seen, expected);
        assert_eq!(Hex::new(2, -1).rotated(6), Hex::new(2, -1));
    }

    #[test]
    fn origin_maps_to_origin() {
        assert_eq!(Hex::ZERO.to_cartesian(), Vec3::ZERO);
        assert_eq!(Hex::from_cartesian(Vec3::ZERO), Hex::ZERO);
    }

    proptest! {
        #[test]
        fn cartesian_roundtrip(q in -50i32..50, r in -50i32..50) {
            let hex = Hex::new(q, r);
            prop_assert_eq!(Hex::from_cartesian(hex.to_cartesian()), hex);
        }

        #[test]
        fn rotation_preserves_distance_to_origin(q in -20i32..20, r in -20i32..20, steps in 0u32..12) {
            let hex = Hex::new(q, r);
            prop_assert_eq!(hex.rotated(steps).distance(Hex::ZERO), hex.distance(Hex::ZERO));
        }
    }
}
