//! Client-side board model.
//!
//! Hexes and stops live in append-only arenas keyed by stable integer ids,
//! so candidates and finalized actions can reference them by value without
//! aliasing live board objects. The decision subsystem treats this model as
//! read-only; `apply_accepted` is the single mutation entry point and runs
//! only after the authoritative engine has accepted an action.

use std::collections::BTreeMap;

use thiserror::Error;
use trunkline_protocol::{
    CompanyId, DataId, FinalizedAction, Hex, HexId, Orientation, RelayTarget, StopId, TileTypeId,
};

use crate::catalog::TileCatalog;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("duplicate hex at {0:?}")]
    DuplicateHex(Hex),
    #[error("station {station} does not exist on tile '{tile}'")]
    UnknownStation { tile: DataId, station: u8 },
    #[error("no free slot at station {station} of hex {hex}")]
    StationFull { hex: u16, station: u8 },
}

/// One board hex: its coordinate, the tile currently on it, and its stops.
#[derive(Clone, Debug)]
pub struct HexState {
    pub coord: Hex,
    pub tile: TileTypeId,
    pub orientation: Orientation,
    /// Stops for the current tile, indexed by station number.
    pub stops: Vec<StopId>,
}

/// A token-placement point. Stops are never deleted; upgrading a tile
/// appends fresh stops and reroutes the hex to them, keeping old ids stable
/// (though orphaned) for anything still holding them.
#[derive(Clone, Debug)]
pub struct StopState {
    pub hex: HexId,
    pub station: u8,
    pub slots: u8,
    pub tokens: Vec<CompanyId>,
}

impl StopState {
    pub fn has_free_slot(&self) -> bool {
        (self.tokens.len() as u8) < self.slots
    }
}

/// A charter: display id, home hexes, tokens still on the charter.
#[derive(Clone, Debug)]
pub struct Company {
    pub data_id: DataId,
    pub home: Vec<HexId>,
    pub tokens_remaining: u8,
}

/// The whole client-side board.
#[derive(Clone, Debug, Default)]
pub struct BoardState {
    hexes: Vec<HexState>,
    stops: Vec<StopState>,
    companies: Vec<Company>,
    by_coord: BTreeMap<Hex, HexId>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a hex with an initial (preprinted) tile. Creates one stop per
    /// station on the tile.
    pub fn add_hex(
        &mut self,
        coord: Hex,
        tile: TileTypeId,
        orientation: Orientation,
        catalog: &TileCatalog,
    ) -> Result<HexId, BoardError> {
        if self.by_coord.contains_key(&coord) {
            return Err(BoardError::DuplicateHex(coord));
        }
        let id = HexId::new(self.hexes.len() as u16);
        let stops = self.make_stops(id, tile, catalog);
        self.hexes.push(HexState {
            coord,
            tile,
            orientation,
            stops,
        });
        self.by_coord.insert(coord, id);
        Ok(id)
    }

    pub fn add_company(&mut self, data_id: impl Into<DataId>, home: Vec<HexId>, tokens: u8) -> CompanyId {
        let id = CompanyId(self.companies.len() as u8);
        self.companies.push(Company {
            data_id: data_id.into(),
            home,
            tokens_remaining: tokens,
        });
        id
    }

    pub fn hex(&self, id: HexId) -> &HexState {
        &self.hexes[id.index()]
    }

    pub fn stop(&self, id: StopId) -> &StopState {
        &self.stops[id.index()]
    }

    pub fn company(&self, id: CompanyId) -> &Company {
        &self.companies[id.0 as usize]
    }

    pub fn hex_at(&self, coord: Hex) -> Option<HexId> {
        self.by_coord.get(&coord).copied()
    }

    pub fn hex_ids(&self) -> impl Iterator<Item = HexId> {
        (0..self.hexes.len()).map(|i| HexId::new(i as u16))
    }

    pub fn company_ids(&self) -> impl Iterator<Item = CompanyId> {
        (0..self.companies.len()).map(|i| CompanyId(i as u8))
    }

    /// Stops on `hex` that currently hold at least one token.
    pub fn occupied_stops(&self, hex: HexId) -> Vec<StopId> {
        self.hex(hex)
            .stops
            .iter()
            .copied()
            .filter(|s| !self.stop(*s).tokens.is_empty())
            .collect()
    }

    /// True when `company` already has a token somewhere on `hex`.
    pub fn company_tokened(&self, hex: HexId, company: CompanyId) -> bool {
        self.hex(hex)
            .stops
            .iter()
            .any(|s| self.stop(*s).tokens.contains(&company))
    }

    pub fn is_home_hex(&self, company: CompanyId, hex: HexId) -> bool {
        self.company(company).home.contains(&hex)
    }

    /// True when any token on `stop` belongs to a company whose home is the
    /// stop's hex. Used for relay ordering.
    pub fn is_home_stop(&self, stop: StopId) -> bool {
        let state = self.stop(stop);
        state
            .tokens
            .iter()
            .any(|c| self.is_home_hex(*c, state.hex))
    }

    /// Apply an engine-accepted action to the board. Tile lays swap the tile,
    /// rebuild the hex's stops and execute relays; returned tokens go back to
    /// their charter.
    pub fn apply_accepted(
        &mut self,
        action: &FinalizedAction,
        catalog: &TileCatalog,
    ) -> Result<(), BoardError> {
        match action {
            FinalizedAction::LayTile {
                hex,
                tile,
                orientation,
                relays,
                ..
            } => {
                let new_stops = self.make_stops(*hex, *tile, catalog);
                for relay in relays {
                    match relay.to {
                        RelayTarget::Station(station) => {
                            let stop_id = *new_stops
                                .get(station as usize)
                                .ok_or(BoardError::UnknownStation {
                                    tile: catalog.tile(*tile).data_id.clone(),
                                    station,
                                })?;
                            let stop = &mut self.stops[stop_id.index()];
                            if (stop.tokens.len() as u8) >= stop.slots {
                                return Err(BoardError::StationFull {
                                    hex: hex.raw,
                                    station,
                                });
                            }
                            stop.tokens.push(relay.company);
                        }
                        RelayTarget::Returned => {
                            self.companies[relay.company.0 as usize].tokens_remaining += 1;
                        }
                    }
                }
                let state = &mut self.hexes[hex.index()];
                state.tile = *tile;
                state.orientation = *orientation;
                state.stops = new_stops;
            }
            FinalizedAction::PlaceToken {
                company,
                hex,
                station,
                ..
            } => {
                let stop_id = *self
                    .hex(*hex)
                    .stops
                    .get(*station as usize)
                    .ok_or(BoardError::UnknownStation {
                        tile: catalog.tile(self.hex(*hex).tile).data_id.clone(),
                        station: *station,
                    })?;
                let stop = &mut self.stops[stop_id.index()];
                if (stop.tokens.len() as u8) >= stop.slots {
                    return Err(BoardError::StationFull {
                        hex: hex.raw,
                        station: *station,
                    });
                }
                stop.tokens.push(*company);
                let charter = &mut self.companies[company.0 as usize];
                charter.tokens_remaining = charter.tokens_remaining.saturating_sub(1);
            }
            // Revenue actions never touch the map.
            FinalizedAction::SetRevenue { .. } | FinalizedAction::SelectPayout { .. } => {}
        }
        Ok(())
    }

    fn make_stops(&mut self, hex: HexId, tile: TileTypeId, catalog: &TileCatalog) -> Vec<StopId> {
        let spec = catalog.tile(tile);
        let mut stops = Vec::with_capacity(spec.stations.len());
        for (station, station_spec) in spec.stations.iter().enumerate() {
            let id = StopId::new(self.stops.len() as u16);
            self.stops.push(StopState {
                hex,
                station: station as u8,
                slots: station_spec.slots,
                tokens: Vec::new(),
            });
            stops.push(id);
        }
        stops
    }
}
