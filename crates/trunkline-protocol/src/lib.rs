//! Shared vocabulary for the Trunkline operating-round client.
//!
//! Typed ids, hex geometry, tile/track descriptions, engine permissions and
//! finalized actions, plus the view structs the rendering layer consumes.
//! Everything here is serializable and free of behavior that touches the
//! board or the engine.

mod action;
mod hex;
mod ids;
mod permission;
mod tile;
mod view;

pub use crate::action::*;
pub use crate::hex::*;
pub use crate::ids::*;
pub use crate::permission::*;
pub use crate::tile::*;
pub use crate::view::*;
