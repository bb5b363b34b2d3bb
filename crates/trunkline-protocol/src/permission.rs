use serde::{Deserialize, Serialize};

use crate::{CompanyId, HexId, PropertyId, TileColour, TrainTypeId};

/// Remaining lay allowance for a generic tile permission, e.g. "1 yellow".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourQuota {
    pub colour: TileColour,
    pub remaining: u8,
}

/// An engine-issued grant allowing a company to act at the current decision
/// point. Fully serializable; the engine remains authoritative over what is
/// ultimately legal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Permission {
    // Tile lays
    LayTileGeneric {
        company: CompanyId,
        quota: ColourQuota,
    },
    LayTileLocationSpecific {
        company: CompanyId,
        hexes: Vec<HexId>,
    },
    LayTileSpecialProperty {
        company: CompanyId,
        property: PropertyId,
        hexes: Vec<HexId>,
    },

    // Token lays
    LayTokenGeneric {
        company: CompanyId,
    },
    LayTokenLocationSpecific {
        company: CompanyId,
        hexes: Vec<HexId>,
    },
    LayTokenHomeCity {
        company: CompanyId,
    },
    LayTokenSpecialProperty {
        company: CompanyId,
        property: PropertyId,
        hexes: Vec<HexId>,
    },

    // Revenue phase
    SetRevenue {
        company: CompanyId,
        trains: Vec<TrainTypeId>,
    },
    SelectPayout {
        company: CompanyId,
        revenue: u32,
    },
}

impl Permission {
    pub fn company(&self) -> CompanyId {
        match self {
            Permission::LayTileGeneric { company, .. }
            | Permission::LayTileLocationSpecific { company, .. }
            | Permission::LayTileSpecialProperty { company, .. }
            | Permission::LayTokenGeneric { company }
            | Permission::LayTokenLocationSpecific { company, .. }
            | Permission::LayTokenHomeCity { company }
            | Permission::LayTokenSpecialProperty { company, .. }
            | Permission::SetRevenue { company, .. }
            | Permission::SelectPayout { company, .. } => *company,
        }
    }

    pub fn is_tile_lay(&self) -> bool {
        matches!(
            self,
            Permission::LayTileGeneric { .. }
                | Permission::LayTileLocationSpecific { .. }
                | Permission::LayTileSpecialProperty { .. }
        )
    }

    pub fn is_token_lay(&self) -> bool {
        matches!(
            self,
            Permission::LayTokenGeneric { .. }
                | Permission::LayTokenLocationSpecific { .. }
                | Permission::LayTokenHomeCity { .. }
                | Permission::LayTokenSpecialProperty { .. }
        )
    }
}
