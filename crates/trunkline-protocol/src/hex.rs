use serde::{Deserialize, Serialize};

/// Axial coordinates for a hex grid (q, r). The implicit cube coordinate is `s = -q - r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

impl Hex {
    pub const DIRECTIONS: [Hex; 6] = [
        Hex { q: 1, r: 0 },  // East
        Hex { q: 1, r: -1 }, // Northeast
        Hex { q: 0, r: -1 }, // Northwest
        Hex { q: -1, r: 0 }, // West
        Hex { q: -1, r: 1 }, // Southwest
        Hex { q: 0, r: 1 },  // Southeast
    ];

    #[inline]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    pub fn neighbor(self, side: Side) -> Hex {
        self + Self::DIRECTIONS[side.0 as usize]
    }

    pub fn neighbors(self) -> impl Iterator<Item = Hex> {
        Self::DIRECTIONS.into_iter().map(move |d| self + d)
    }

    #[inline]
    pub fn distance(self, other: Hex) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s() - other.s()).abs()) / 2
    }
}

impl std::ops::Add for Hex {
    type Output = Hex;

    fn add(self, other: Hex) -> Hex {
        Hex {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

/// One of the six edges of a hex, numbered 0..6 counter-clockwise from East.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Side(pub u8);

impl Side {
    pub const ALL: [Side; 6] = [Side(0), Side(1), Side(2), Side(3), Side(4), Side(5)];

    /// The side as seen after rotating the tile by `orientation`.
    #[inline]
    pub fn rotated(self, orientation: Orientation) -> Side {
        Side((self.0 + orientation.0) % 6)
    }

    /// The matching side on the adjacent hex.
    #[inline]
    pub fn opposite(self) -> Side {
        Side((self.0 + 3) % 6)
    }
}

/// Tile rotation in sixths of a full turn (0..6).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Orientation(pub u8);

impl Orientation {
    pub const ALL: [Orientation; 6] = [
        Orientation(0),
        Orientation(1),
        Orientation(2),
        Orientation(3),
        Orientation(4),
        Orientation(5),
    ];
}

/// Compact set of hex sides, one bit per side.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SideSet(pub u8);

impl SideSet {
    pub const EMPTY: SideSet = SideSet(0);

    #[inline]
    pub fn insert(&mut self, side: Side) {
        self.0 |= 1 << side.0;
    }

    #[inline]
    pub fn contains(self, side: Side) -> bool {
        self.0 & (1 << side.0) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn intersects(self, other: SideSet) -> bool {
        self.0 & other.0 != 0
    }

    /// True when every side in `self` is also in `other`.
    #[inline]
    pub fn is_subset_of(self, other: SideSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Side> {
        Side::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Side> for SideSet {
    fn from_iter<I: IntoIterator<Item = Side>>(iter: I) -> Self {
        let mut set = SideSet::EMPTY;
        for side in iter {
            set.insert(side);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_distance_matches_expected() {
        let a = Hex { q: 0, r: 0 };
        let b = Hex { q: 3, r: -1 };
        assert_eq!(a.distance(b), 3);
    }

    #[test]
    fn hex_neighbors_has_six_adjacent() {
        let center = Hex { q: 0, r: 0 };
        let neighbors: Vec<_> = center.neighbors().collect();
        assert_eq!(neighbors.len(), 6);
        assert!(neighbors.iter().all(|n| center.distance(*n) == 1));
    }

    #[test]
    fn side_rotation_wraps() {
        assert_eq!(Side(5).rotated(Orientation(2)), Side(1));
        assert_eq!(Side(1).opposite(), Side(4));
    }

    #[test]
    fn side_set_subset_and_intersection() {
        let a: SideSet = [Side(0), Side(3)].into_iter().collect();
        let b: SideSet = [Side(0), Side(3), Side(5)].into_iter().collect();
        assert!(a.is_subset_of(b));
        assert!(!b.is_subset_of(a));
        assert!(a.intersects(b));
        assert!(!a.intersects([Side(1)].into_iter().collect()));
    }
}
