//! Trunkline core: board model, tile catalog, upgrade-candidate index,
//! local decision state machine and action packager.
//!
//! The authoritative game engine and the network-reachability oracle are
//! external collaborators, consumed through the traits in [`oracle`].

mod board;
mod catalog;
pub mod geometry;
mod index;
mod oracle;
mod package;
mod relay;
mod steps;

pub use crate::board::{BoardError, BoardState, Company, HexState, StopState};
pub use crate::catalog::{
    load_catalog, CatalogError, CatalogSource, PhaseRules, PhaseSchedule, TileCatalog, TileType,
    TrainRoster,
};
pub use crate::index::{
    CandidateIndex, RejectionReason, TileCandidate, TokenCandidate, UpgradeCandidate, Verdict,
};
pub use crate::oracle::{GameEngine, ReachabilityOracle};
pub use crate::package::{package_tile, package_token, resume_tile, Packaged};
pub use crate::relay::{RelayPlanner, RelayStep};
pub use crate::steps::{DecisionState, StepContext, StepController, StepEffect, StepEvent};
