//! Token relay on tile upgrade.
//!
//! When the replaced tile carries tokens, each one must be reassigned to a
//! station on the replacement. Home-company stops are processed first; a stop
//! counts as home if any token on it belongs to a company whose home hex is
//! the one being upgraded. A token with exactly one qualifying station is
//! assigned automatically; several qualifying stations pause the plan for an
//! explicit user choice; none returns the token to its charter.

use trunkline_protocol::{
    CompanyId, HexId, Orientation, RelayAssignment, RelayTarget, StopId, TileTypeId,
};

use crate::board::BoardState;
use crate::catalog::TileCatalog;
use crate::geometry;

/// What the planner needs next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayStep {
    /// All tokens placed (or returned); the assignments are final.
    Finished(Vec<RelayAssignment>),
    /// More than one station qualifies for this token; ask the user.
    Choice {
        stop: StopId,
        company: CompanyId,
        options: Vec<u8>,
    },
}

/// Resumable relay plan for one tile upgrade. Survives a modal dialog: the
/// controller pauses on `Choice`, then calls `resolve` with the answer.
#[derive(Clone, Debug)]
pub struct RelayPlanner {
    new_tile: TileTypeId,
    orientation: Orientation,
    /// (stop, company) per token still to place, in processing order.
    queue: Vec<(StopId, CompanyId)>,
    next: usize,
    assignments: Vec<RelayAssignment>,
    /// Free slots per station on the replacement tile.
    free_slots: Vec<u8>,
}

impl RelayPlanner {
    pub fn new(
        board: &BoardState,
        catalog: &TileCatalog,
        hex: HexId,
        new_tile: TileTypeId,
        orientation: Orientation,
    ) -> Self {
        let mut occupied = board.occupied_stops(hex);
        // Home-company stops first; order is otherwise the stable station order.
        occupied.sort_by_key(|s| !board.is_home_stop(*s));

        let mut queue = Vec::new();
        for stop in occupied {
            for company in &board.stop(stop).tokens {
                queue.push((stop, *company));
            }
        }

        let free_slots = catalog
            .tile(new_tile)
            .stations
            .iter()
            .map(|s| s.slots)
            .collect();

        Self {
            new_tile,
            orientation,
            queue,
            next: 0,
            assignments: Vec::new(),
            free_slots,
        }
    }

    /// Advance as far as possible without user input.
    pub fn step(&mut self, board: &BoardState, catalog: &TileCatalog) -> RelayStep {
        while self.next < self.queue.len() {
            let (stop, company) = self.queue[self.next];
            let options = self.qualifying_stations(board, catalog, stop);
            match options.len() {
                0 => {
                    self.assignments.push(RelayAssignment {
                        company,
                        from: stop,
                        to: RelayTarget::Returned,
                    });
                    self.next += 1;
                }
                1 => {
                    self.assign(stop, company, options[0]);
                }
                _ => {
                    return RelayStep::Choice {
                        stop,
                        company,
                        options,
                    };
                }
            }
        }
        RelayStep::Finished(self.assignments.clone())
    }

    /// Apply the user's station choice for the pending token, then continue.
    pub fn resolve(
        &mut self,
        station: u8,
        board: &BoardState,
        catalog: &TileCatalog,
    ) -> RelayStep {
        if self.next < self.queue.len() {
            let (stop, company) = self.queue[self.next];
            self.assign(stop, company, station);
        }
        self.step(board, catalog)
    }

    fn assign(&mut self, stop: StopId, company: CompanyId, station: u8) {
        self.assignments.push(RelayAssignment {
            company,
            from: stop,
            to: RelayTarget::Station(station),
        });
        if let Some(free) = self.free_slots.get_mut(station as usize) {
            *free = free.saturating_sub(1);
        }
        self.next += 1;
    }

    /// Stations on the replacement with a free slot and track shared with the
    /// old stop's geometry. An old stop with no printed track (preprinted
    /// base city) qualifies against every free station.
    fn qualifying_stations(
        &self,
        board: &BoardState,
        catalog: &TileCatalog,
        stop: StopId,
    ) -> Vec<u8> {
        let old = board.stop(stop);
        let old_hex = board.hex(old.hex);
        let old_sides =
            geometry::station_sides(catalog.tile(old_hex.tile), old_hex.orientation, old.station);
        let new_spec = catalog.tile(self.new_tile);

        (0..new_spec.stations.len() as u8)
            .filter(|station| {
                if self.free_slots[*station as usize] == 0 {
                    return false;
                }
                if old_sides.is_empty() {
                    return true;
                }
                geometry::station_sides(new_spec, self.orientation, *station)
                    .intersects(old_sides)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{load_catalog, CatalogSource};
    use trunkline_protocol::{FinalizedAction, Hex};

    fn twin_board() -> (BoardState, TileCatalog, HexId, CompanyId, CompanyId) {
        let (catalog, _) = load_catalog(CatalogSource::Embedded).unwrap();
        let mut board = BoardState::new();
        let twin = catalog.lookup("twin").unwrap();
        let hex = board
            .add_hex(Hex { q: 0, r: 0 }, twin, Orientation(0), &catalog)
            .unwrap();
        let home = board.add_company("HOME", vec![hex], 3);
        let guest = board.add_company("GUEST", vec![], 3);

        // home tokens station 1, guest tokens station 0
        let stops = board.hex(hex).stops.clone();
        for (company, station) in [(home, 1u8), (guest, 0u8)] {
            board
                .apply_accepted(
                    &FinalizedAction::PlaceToken {
                        company,
                        hex,
                        stop: stops[station as usize],
                        station,
                    },
                    &catalog,
                )
                .unwrap();
        }
        (board, catalog, hex, home, guest)
    }

    #[test]
    fn split_upgrade_assigns_automatically_home_first() {
        let (board, catalog, hex, home, guest) = twin_board();
        let split = catalog.lookup("twin_split").unwrap();
        let mut planner = RelayPlanner::new(&board, &catalog, hex, split, Orientation(0));

        let step = planner.step(&board, &catalog);
        let assignments = match step {
            RelayStep::Finished(a) => a,
            other => panic!("expected automatic completion, got {other:?}"),
        };
        assert_eq!(assignments.len(), 2);
        // Home company's stop (station 1, side 3) is processed first.
        assert_eq!(assignments[0].company, home);
        assert_eq!(assignments[0].to, RelayTarget::Station(1));
        assert_eq!(assignments[1].company, guest);
        assert_eq!(assignments[1].to, RelayTarget::Station(0));
    }

    #[test]
    fn ambiguous_upgrade_pauses_for_choice_then_decrements_slot() {
        let (board, catalog, hex, home, guest) = twin_board();
        let cross = catalog.lookup("twin_cross").unwrap();
        let mut planner = RelayPlanner::new(&board, &catalog, hex, cross, Orientation(0));

        // Both twin_cross stations touch sides 0 and 3, so the home token
        // sees two options.
        let step = planner.step(&board, &catalog);
        let options = match step {
            RelayStep::Choice {
                company, options, ..
            } => {
                assert_eq!(company, home);
                options
            }
            other => panic!("expected a choice, got {other:?}"),
        };
        assert_eq!(options, vec![0, 1]);

        // Choosing station 1 leaves only station 0 free for the guest token,
        // which then auto-assigns.
        let step = planner.resolve(1, &board, &catalog);
        let assignments = match step {
            RelayStep::Finished(a) => a,
            other => panic!("expected completion, got {other:?}"),
        };
        assert_eq!(assignments[0].to, RelayTarget::Station(1));
        assert_eq!(assignments[1].company, guest);
        assert_eq!(assignments[1].to, RelayTarget::Station(0));
    }

    #[test]
    fn no_qualifying_station_returns_token() {
        let (catalog, _) = load_catalog(CatalogSource::Embedded).unwrap();
        let mut board = BoardState::new();
        let city = catalog.lookup("city").unwrap();
        let hex = board
            .add_hex(Hex { q: 0, r: 0 }, city, Orientation(0), &catalog)
            .unwrap();
        let company = board.add_company("PRR", vec![hex], 3);
        let stop = board.hex(hex).stops[0];
        board
            .apply_accepted(
                &FinalizedAction::PlaceToken {
                    company,
                    hex,
                    stop,
                    station: 0,
                },
                &catalog,
            )
            .unwrap();

        // Upgrading to plain track leaves nowhere to stand.
        let tile7 = catalog.lookup("7").unwrap();
        let mut planner = RelayPlanner::new(&board, &catalog, hex, tile7, Orientation(0));
        let step = planner.step(&board, &catalog);
        assert_eq!(
            step,
            RelayStep::Finished(vec![RelayAssignment {
                company,
                from: stop,
                to: RelayTarget::Returned,
            }])
        );
    }
}
