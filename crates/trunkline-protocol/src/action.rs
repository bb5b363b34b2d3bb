use serde::{Deserialize, Serialize};

use crate::{CompanyId, HexId, Orientation, StopId, TileTypeId};

/// Where a relayed token ends up after a tile upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayTarget {
    /// Station index on the replacement tile.
    Station(u8),
    /// No connected station had a free slot; the token goes back to the charter.
    Returned,
}

/// One token moved (or returned) as part of a tile upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAssignment {
    pub company: CompanyId,
    pub from: StopId,
    pub to: RelayTarget,
}

/// How run revenue is distributed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutSplit {
    Full,
    Half,
    Withhold,
}

/// A fully-specified action ready for the authoritative engine.
/// Every id refers to the board arena, never to live board objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FinalizedAction {
    LayTile {
        company: CompanyId,
        hex: HexId,
        tile: TileTypeId,
        orientation: Orientation,
        relays: Vec<RelayAssignment>,
    },
    PlaceToken {
        company: CompanyId,
        hex: HexId,
        stop: StopId,
        station: u8,
    },
    SetRevenue {
        company: CompanyId,
        amount: u32,
    },
    SelectPayout {
        company: CompanyId,
        split: PayoutSplit,
    },
}

/// Engine response to a submitted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineVerdict {
    Accepted,
    Rejected { reason: Option<String> },
}
