//! The upgrade-candidate index.
//!
//! Expands the engine's permission set, through the reachability oracle,
//! into a per-hex map of concrete upgrade candidates. Built fresh on every
//! feed change, never mutated incrementally. Building is pure: identical
//! inputs produce an identical (value-comparable) index, and nothing here
//! calls the engine.

use std::collections::{BTreeMap, BTreeSet};

use trunkline_protocol::{
    CompanyId, HexHighlight, HexId, Orientation, Permission, StopId, TileTypeId,
};

use crate::board::BoardState;
use crate::catalog::{PhaseRules, TileCatalog};
use crate::geometry;
use crate::oracle::ReachabilityOracle;

/// Why a candidate is disabled. Disabled candidates are kept in the index so
/// the user can see why a hex is blocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    ColourNotInPhase,
    ColourNotInQuota,
    QuotaExhausted,
    BreaksConnection,
    NotConnectedToNetwork,
    NoStationSlot,
    AlreadyTokened,
    NoTokensLeft,
}

impl RejectionReason {
    pub fn describe(self) -> &'static str {
        match self {
            RejectionReason::ColourNotInPhase => "tile colour not available this phase",
            RejectionReason::ColourNotInQuota => "tile colour not covered by the lay allowance",
            RejectionReason::QuotaExhausted => "no tile lays remaining",
            RejectionReason::BreaksConnection => "every rotation would sever existing track",
            RejectionReason::NotConnectedToNetwork => "no rotation connects to your network",
            RejectionReason::NoStationSlot => "no free station slot",
            RejectionReason::AlreadyTokened => "company already has a token here",
            RejectionReason::NoTokensLeft => "no tokens left on the charter",
        }
    }
}

/// Validity verdict, computed once at index-build time and immutable after.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Rejected(Vec<RejectionReason>),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// A concrete "lay this tile here" option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileCandidate {
    pub hex: HexId,
    pub tile: TileTypeId,
    /// Orientations that keep existing connections alive, in ascending
    /// order. May be non-empty even when the verdict is rejected for an
    /// unrelated reason (phase, quota).
    pub orientations: Vec<Orientation>,
    pub verdict: Verdict,
    /// Index of the originating permission in the feed.
    pub permission: usize,
}

/// A concrete "token this stop" option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenCandidate {
    pub hex: HexId,
    pub stop: StopId,
    pub company: CompanyId,
    pub verdict: Verdict,
    pub permission: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeCandidate {
    Tile(TileCandidate),
    Token(TokenCandidate),
}

impl UpgradeCandidate {
    pub fn verdict(&self) -> &Verdict {
        match self {
            UpgradeCandidate::Tile(c) => &c.verdict,
            UpgradeCandidate::Token(c) => &c.verdict,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.verdict().is_valid()
    }
}

/// Mapping hex -> candidates for one decision point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateIndex {
    by_hex: BTreeMap<HexId, Vec<UpgradeCandidate>>,
}

impl CandidateIndex {
    /// Expand `permissions` into concrete candidates. Pure with respect to
    /// the engine; the oracle and board are only read.
    pub fn build(
        permissions: &[Permission],
        board: &BoardState,
        catalog: &TileCatalog,
        phase: &PhaseRules,
        oracle: &dyn ReachabilityOracle,
    ) -> CandidateIndex {
        let mut index = CandidateIndex::default();

        for (perm_idx, perm) in permissions.iter().enumerate() {
            match perm {
                Permission::LayTileGeneric { company, quota } => {
                    let mut hexes = oracle.reachable_hexes(*company);
                    for stop in oracle.reachable_stops(*company) {
                        hexes.insert(board.stop(stop).hex);
                    }
                    for hex in hexes {
                        index.add_tile_candidates(
                            hex,
                            perm_idx,
                            board,
                            catalog,
                            phase,
                            Some(*quota),
                            Some(oracle.network_sides(*company, hex)),
                        );
                    }
                }
                Permission::LayTileLocationSpecific { hexes, .. }
                | Permission::LayTileSpecialProperty { hexes, .. } => {
                    for hex in hexes {
                        index.add_tile_candidates(
                            *hex, perm_idx, board, catalog, phase, None, None,
                        );
                    }
                }
                Permission::LayTokenGeneric { company } => {
                    let stops: BTreeSet<StopId> = oracle.reachable_stops(*company);
                    for stop in stops {
                        index.add_token_candidate(stop, *company, perm_idx, board);
                    }
                }
                Permission::LayTokenHomeCity { company } => {
                    // Home lays bypass reachability entirely.
                    for hex in board.company(*company).home.clone() {
                        for stop in board.hex(hex).stops.clone() {
                            index.add_token_candidate(stop, *company, perm_idx, board);
                        }
                    }
                }
                Permission::LayTokenLocationSpecific { company, hexes }
                | Permission::LayTokenSpecialProperty { company, hexes, .. } => {
                    for hex in hexes {
                        for stop in board.hex(*hex).stops.clone() {
                            index.add_token_candidate(stop, *company, perm_idx, board);
                        }
                    }
                }
                // Revenue permissions carry no map candidates.
                Permission::SetRevenue { .. } | Permission::SelectPayout { .. } => {}
            }
        }

        index
    }

    fn add_tile_candidates(
        &mut self,
        hex: HexId,
        perm_idx: usize,
        board: &BoardState,
        catalog: &TileCatalog,
        phase: &PhaseRules,
        quota: Option<trunkline_protocol::ColourQuota>,
        network: Option<trunkline_protocol::SideSet>,
    ) {
        let state = board.hex(hex);
        let current = catalog.tile(state.tile);
        let existing = geometry::connected_sides(current, state.orientation);

        for target_id in &current.upgrades_to {
            let target = catalog.tile(*target_id);
            let mut reasons = Vec::new();

            if !phase.colour_allowed(target.colour) {
                reasons.push(RejectionReason::ColourNotInPhase);
            }
            if let Some(quota) = quota {
                if target.colour != quota.colour {
                    reasons.push(RejectionReason::ColourNotInQuota);
                } else if quota.remaining == 0 {
                    reasons.push(RejectionReason::QuotaExhausted);
                }
            }

            let mut orientations = geometry::valid_orientations(existing, target);
            if orientations.is_empty() {
                reasons.push(RejectionReason::BreaksConnection);
            } else if let Some(network) = network {
                // A generic lay must extend the company's own network. An
                // empty network answer leaves the orientations unconstrained:
                // a tokened stop on a preprinted city may carry no printed
                // track at all, and a lay there is still legal.
                if !network.is_empty() {
                    orientations.retain(|o| {
                        geometry::connected_sides(target, *o).intersects(network)
                    });
                    if orientations.is_empty() {
                        reasons.push(RejectionReason::NotConnectedToNetwork);
                    }
                }
            }

            let verdict = if reasons.is_empty() {
                Verdict::Valid
            } else {
                Verdict::Rejected(reasons)
            };
            self.by_hex
                .entry(hex)
                .or_default()
                .push(UpgradeCandidate::Tile(TileCandidate {
                    hex,
                    tile: *target_id,
                    orientations,
                    verdict,
                    permission: perm_idx,
                }));
        }
    }

    fn add_token_candidate(
        &mut self,
        stop: StopId,
        company: CompanyId,
        perm_idx: usize,
        board: &BoardState,
    ) {
        let state = board.stop(stop);
        let mut reasons = Vec::new();
        if !state.has_free_slot() {
            reasons.push(RejectionReason::NoStationSlot);
        }
        if board.company_tokened(state.hex, company) {
            reasons.push(RejectionReason::AlreadyTokened);
        }
        if board.company(company).tokens_remaining == 0 {
            reasons.push(RejectionReason::NoTokensLeft);
        }

        let verdict = if reasons.is_empty() {
            Verdict::Valid
        } else {
            Verdict::Rejected(reasons)
        };
        self.by_hex
            .entry(state.hex)
            .or_default()
            .push(UpgradeCandidate::Token(TokenCandidate {
                hex: state.hex,
                stop,
                company,
                verdict,
                permission: perm_idx,
            }));
    }

    pub fn is_empty(&self) -> bool {
        self.by_hex.is_empty()
    }

    pub fn hexes(&self) -> impl Iterator<Item = HexId> + '_ {
        self.by_hex.keys().copied()
    }

    pub fn candidates(&self, hex: HexId) -> &[UpgradeCandidate] {
        self.by_hex.get(&hex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A hex is selectable iff it has at least one enabled candidate.
    pub fn is_selectable(&self, hex: HexId) -> bool {
        self.candidates(hex).iter().any(UpgradeCandidate::is_enabled)
    }

    pub fn enabled_tile_candidates(&self, hex: HexId) -> Vec<&TileCandidate> {
        self.candidates(hex)
            .iter()
            .filter_map(|c| match c {
                UpgradeCandidate::Tile(t) if t.verdict.is_valid() => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn enabled_token_candidates_at(&self, stop: StopId) -> Vec<&TokenCandidate> {
        self.by_hex
            .values()
            .flatten()
            .filter_map(|c| match c {
                UpgradeCandidate::Token(t) if t.stop == stop && t.verdict.is_valid() => Some(t),
                _ => None,
            })
            .collect()
    }

    /// One-line explanation for why a hex cannot be selected.
    pub fn rejection_summary(&self, hex: HexId) -> String {
        let mut reasons: Vec<&'static str> = Vec::new();
        for candidate in self.candidates(hex) {
            if let Verdict::Rejected(list) = candidate.verdict() {
                for reason in list {
                    let text = reason.describe();
                    if !reasons.contains(&text) {
                        reasons.push(text);
                    }
                }
            }
        }
        if reasons.is_empty() {
            "no legal placement here".to_string()
        } else {
            reasons.join("; ")
        }
    }

    pub fn highlights(&self) -> Vec<HexHighlight> {
        self.by_hex
            .keys()
            .map(|hex| HexHighlight {
                hex: *hex,
                selectable: self.is_selectable(*hex),
            })
            .collect()
    }
}
