//! Tile catalog and phase schedule, compiled from YAML.
//!
//! Data files use string ids; loading compiles them to dense runtime ids in
//! key order and validates every cross-reference, so downstream code can
//! index by `TileTypeId` without further checking.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;
use trunkline_protocol::{DataId, StationSpec, TileColour, TileTypeId, TrackSegment};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("unknown upgrade target '{target}' on tile '{tile}'")]
    UnknownUpgradeTarget { tile: DataId, target: DataId },
    #[error("tile '{tile}' track references station {station} but only {stations} defined")]
    BadStationRef {
        tile: DataId,
        station: u8,
        stations: usize,
    },
    #[error("unknown phase '{0}'")]
    UnknownPhase(DataId),
}

#[derive(Debug, Deserialize)]
struct RawTile {
    colour: TileColour,
    #[serde(default)]
    segments: Vec<TrackSegment>,
    #[serde(default)]
    stations: Vec<StationSpec>,
    #[serde(default)]
    upgrades_to: Vec<DataId>,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    colours: Vec<TileColour>,
}

/// A tile specification compiled for runtime use.
#[derive(Clone, Debug)]
pub struct TileType {
    pub data_id: DataId,
    pub colour: TileColour,
    pub segments: Vec<TrackSegment>,
    pub stations: Vec<StationSpec>,
    pub upgrades_to: Vec<TileTypeId>,
}

/// All tile specifications for one game variant.
#[derive(Clone, Debug)]
pub struct TileCatalog {
    tiles: Vec<TileType>,
    by_data_id: BTreeMap<DataId, TileTypeId>,
}

impl TileCatalog {
    pub fn tile(&self, id: TileTypeId) -> &TileType {
        &self.tiles[id.index()]
    }

    pub fn lookup(&self, data_id: &str) -> Option<TileTypeId> {
        self.by_data_id.get(data_id).copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileTypeId, &TileType)> {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, t)| (TileTypeId::new(i as u16), t))
    }
}

/// Tile colours currently allowed by the game phase.
#[derive(Clone, Debug)]
pub struct PhaseRules {
    allowed: Vec<TileColour>,
}

impl PhaseRules {
    pub fn new(allowed: Vec<TileColour>) -> Self {
        Self { allowed }
    }

    pub fn colour_allowed(&self, colour: TileColour) -> bool {
        self.allowed.contains(&colour)
    }
}

/// Full phase schedule as loaded from data.
#[derive(Clone, Debug)]
pub struct PhaseSchedule {
    phases: BTreeMap<DataId, Vec<TileColour>>,
}

impl PhaseSchedule {
    pub fn rules_for(&self, phase: &str) -> Result<PhaseRules, CatalogError> {
        self.phases
            .get(phase)
            .map(|colours| PhaseRules::new(colours.clone()))
            .ok_or_else(|| CatalogError::UnknownPhase(phase.to_string()))
    }
}

/// Trains owned in the current game, indexed by `TrainTypeId`. The capacity
/// is how many stops a train of that type may count on a run.
#[derive(Clone, Debug, Default)]
pub struct TrainRoster {
    capacities: Vec<u8>,
}

impl TrainRoster {
    pub fn new(capacities: Vec<u8>) -> Self {
        Self { capacities }
    }

    pub fn capacity(&self, train: trunkline_protocol::TrainTypeId) -> u8 {
        self.capacities.get(train.index()).copied().unwrap_or(0)
    }

    pub fn ids(&self) -> impl Iterator<Item = trunkline_protocol::TrainTypeId> + '_ {
        (0..self.capacities.len()).map(|i| trunkline_protocol::TrainTypeId::new(i as u16))
    }
}

/// Where catalog data comes from.
pub enum CatalogSource<'a> {
    Embedded,
    Path(String),
    Bytes { tiles: &'a [u8], phases: &'a [u8] },
}

pub fn load_catalog(source: CatalogSource<'_>) -> Result<(TileCatalog, PhaseSchedule), CatalogError> {
    let (tiles_yaml, phases_yaml) = match source {
        CatalogSource::Embedded => (
            include_str!("../data/tiles.yaml").to_string(),
            include_str!("../data/phases.yaml").to_string(),
        ),
        CatalogSource::Path(path) => (
            std::fs::read_to_string(format!("{path}/tiles.yaml"))?,
            std::fs::read_to_string(format!("{path}/phases.yaml"))?,
        ),
        CatalogSource::Bytes { tiles, phases } => (
            std::str::from_utf8(tiles)?.to_string(),
            std::str::from_utf8(phases)?.to_string(),
        ),
    };

    let raw_tiles: BTreeMap<DataId, RawTile> = serde_yaml::from_str(&tiles_yaml)?;
    let raw_phases: BTreeMap<DataId, RawPhase> = serde_yaml::from_str(&phases_yaml)?;

    let catalog = compile_tiles(raw_tiles)?;
    let schedule = PhaseSchedule {
        phases: raw_phases
            .into_iter()
            .map(|(id, p)| (id, p.colours))
            .collect(),
    };
    Ok((catalog, schedule))
}

fn compile_tiles(raw: BTreeMap<DataId, RawTile>) -> Result<TileCatalog, CatalogError> {
    // First pass: assign dense ids in key order (deterministic).
    let by_data_id: BTreeMap<DataId, TileTypeId> = raw
        .keys()
        .enumerate()
        .map(|(i, id)| (id.clone(), TileTypeId::new(i as u16)))
        .collect();

    let mut tiles = Vec::with_capacity(raw.len());
    for (data_id, tile) in raw {
        for seg in &tile.segments {
            for end in [seg.a, seg.b] {
                if let trunkline_protocol::TrackEnd::Station(n) = end {
                    if n as usize >= tile.stations.len() {
                        return Err(CatalogError::BadStationRef {
                            tile: data_id,
                            station: n,
                            stations: tile.stations.len(),
                        });
                    }
                }
            }
        }

        let upgrades_to = tile
            .upgrades_to
            .iter()
            .map(|target| {
                by_data_id
                    .get(target)
                    .copied()
                    .ok_or_else(|| CatalogError::UnknownUpgradeTarget {
                        tile: data_id.clone(),
                        target: target.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tiles.push(TileType {
            data_id,
            colour: tile.colour,
            segments: tile.segments,
            stations: tile.stations,
            upgrades_to,
        });
    }

    Ok(TileCatalog { tiles, by_data_id })
}
