use serde::{Deserialize, Serialize};

use crate::{Orientation, Side, SideSet};

/// Tile colours in upgrade order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TileColour {
    Yellow,
    Green,
    Brown,
    Grey,
}

/// One endpoint of a track segment: a hex edge or an on-tile station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackEnd {
    Side(Side),
    /// Station index within the tile's station list.
    Station(u8),
}

/// A piece of track printed on a tile, joining two endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackSegment {
    pub a: TrackEnd,
    pub b: TrackEnd,
}

impl TrackSegment {
    /// The segment's endpoints after the tile is rotated by `orientation`.
    pub fn oriented(self, orientation: Orientation) -> TrackSegment {
        let rotate = |end: TrackEnd| match end {
            TrackEnd::Side(s) => TrackEnd::Side(s.rotated(orientation)),
            TrackEnd::Station(n) => TrackEnd::Station(n),
        };
        TrackSegment {
            a: rotate(self.a),
            b: rotate(self.b),
        }
    }

    /// Board-facing sides this segment touches at `orientation`.
    pub fn sides(self, orientation: Orientation) -> SideSet {
        let oriented = self.oriented(orientation);
        [oriented.a, oriented.b]
            .into_iter()
            .filter_map(|end| match end {
                TrackEnd::Side(s) => Some(s),
                TrackEnd::Station(_) => None,
            })
            .collect()
    }
}

/// A station printed on a tile: token slots plus the revenue it pays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSpec {
    pub slots: u8,
    pub value: u32,
}
