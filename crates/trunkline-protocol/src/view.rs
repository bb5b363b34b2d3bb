//! Rendering-facing view state.
//!
//! The widget layer is an out-of-scope collaborator; these structs are the
//! whole surface it consumes. Everything is plain data so a renderer (or a
//! test) can snapshot and diff it.

use serde::{Deserialize, Serialize};

use crate::{HexId, Orientation, StopId, TileTypeId};

/// Per-hex highlighting flag. A hex is selectable iff at least one enabled
/// candidate exists for it in the current index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexHighlight {
    pub hex: HexId,
    pub selectable: bool,
}

/// The tile the user is currently previewing, before confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalTile {
    pub hex: HexId,
    pub tile: TileTypeId,
    pub orientation: Orientation,
}

/// Best route found so far by the advisory computation. Never authoritative.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryOverlay {
    pub value: u32,
    pub stops: Vec<StopId>,
}

/// Message-bar content: which step the user is in plus a short instruction
/// or rejection text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLine {
    pub step: String,
    pub message: String,
}
