//! The action packager: turns a chosen candidate plus user disambiguation
//! into a `FinalizedAction`, or reports that a relay choice is still needed.

use trunkline_protocol::{CompanyId, FinalizedAction, HexId, Orientation, StopId, TileTypeId};

use crate::board::BoardState;
use crate::catalog::TileCatalog;
use crate::index::TokenCandidate;
use crate::relay::{RelayPlanner, RelayStep};

/// Result of packaging a tile lay.
#[derive(Clone, Debug)]
pub enum Packaged {
    Ready(FinalizedAction),
    /// A relay choice could not be resolved automatically. The planner is
    /// parked here until the dialog answer arrives.
    NeedsChoice {
        planner: RelayPlanner,
        stop: StopId,
        company: CompanyId,
        options: Vec<u8>,
    },
}

/// Package a confirmed tile lay, running relay disambiguation for any tokens
/// on the outgoing tile.
pub fn package_tile(
    company: CompanyId,
    hex: HexId,
    tile: TileTypeId,
    orientation: Orientation,
    board: &BoardState,
    catalog: &TileCatalog,
) -> Packaged {
    let mut planner = RelayPlanner::new(board, catalog, hex, tile, orientation);
    match planner.step(board, catalog) {
        RelayStep::Finished(relays) => Packaged::Ready(FinalizedAction::LayTile {
            company,
            hex,
            tile,
            orientation,
            relays,
        }),
        RelayStep::Choice {
            stop,
            company: token_company,
            options,
        } => Packaged::NeedsChoice {
            planner,
            stop,
            company: token_company,
            options,
        },
    }
}

/// Continue a paused tile packaging with the user's station choice.
pub fn resume_tile(
    company: CompanyId,
    hex: HexId,
    tile: TileTypeId,
    orientation: Orientation,
    mut planner: RelayPlanner,
    station: u8,
    board: &BoardState,
    catalog: &TileCatalog,
) -> Packaged {
    match planner.resolve(station, board, catalog) {
        RelayStep::Finished(relays) => Packaged::Ready(FinalizedAction::LayTile {
            company,
            hex,
            tile,
            orientation,
            relays,
        }),
        RelayStep::Choice {
            stop,
            company: token_company,
            options,
        } => Packaged::NeedsChoice {
            planner,
            stop,
            company: token_company,
            options,
        },
    }
}

/// Package a confirmed token placement.
pub fn package_token(candidate: &TokenCandidate, board: &BoardState) -> FinalizedAction {
    let stop = board.stop(candidate.stop);
    FinalizedAction::PlaceToken {
        company: candidate.company,
        hex: candidate.hex,
        stop: candidate.stop,
        station: stop.station,
    }
}
