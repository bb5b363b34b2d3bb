use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Data IDs are strings used in YAML files (human-readable, stable across versions)
pub type DataId = String;

/// Runtime IDs are integers compiled at catalog-load (fast, deterministic)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeId<T> {
    pub raw: u16,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> RuntimeId<T> {
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

// Type-safe runtime IDs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StopTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileTypeTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrainTypeTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyTag;

/// Stable arena key for a board hex. Never a live reference to mutable
/// board state, so candidate indexes can be value-compared and cloned.
pub type HexId = RuntimeId<HexTag>;
/// Stable arena key for a token-placement point within a hex.
pub type StopId = RuntimeId<StopTag>;
pub type TileTypeId = RuntimeId<TileTypeTag>;
pub type TrainTypeId = RuntimeId<TrainTypeTag>;
/// A special-property grant (private charter ability) referenced by a permission.
pub type PropertyId = RuntimeId<PropertyTag>;

/// Company ID is a simple index (max 16 charters per game)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub u8);
