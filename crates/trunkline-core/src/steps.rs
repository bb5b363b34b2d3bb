//! The local decision state machine.
//!
//! Drives the user through hex selection, upgrade choice and confirmation
//! for one decision point. The state is a single value owned here and only
//! changed by `handle`; nothing outside this module mutates it. Selections
//! are cleared whenever the permission feed changes, so a gesture queued
//! against an old index can never package stale candidate ids.
//!
//! Dispatch is not performed here: `handle` emits a `Dispatch` effect and the
//! runtime feeds the engine's verdict back as `EngineAccepted` /
//! `EngineRejected`, which keeps the machine free of engine coupling and
//! makes the rollback path explicit.

use trunkline_protocol::{
    FinalizedAction, HexId, Permission, PayoutSplit, ProvisionalTile, StatusLine, StopId,
};

use crate::board::BoardState;
use crate::catalog::{PhaseRules, TileCatalog};
use crate::index::{CandidateIndex, TileCandidate, TokenCandidate};
use crate::oracle::ReachabilityOracle;
use crate::package::{self, Packaged};
use crate::relay::RelayPlanner;

/// Exactly one of these is active per decision point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DecisionState {
    #[default]
    Inactive,
    SelectLocationForTile,
    SelectTile,
    RotateTile,
    SelectLocationForToken,
    SelectToken,
    ConfirmToken,
    SetRevenue,
    SelectPayout,
}

impl DecisionState {
    pub fn label(self) -> &'static str {
        match self {
            DecisionState::Inactive => "inactive",
            DecisionState::SelectLocationForTile => "select a hex for a tile",
            DecisionState::SelectTile => "select a tile",
            DecisionState::RotateTile => "rotate and confirm",
            DecisionState::SelectLocationForToken => "select a station for a token",
            DecisionState::SelectToken => "select a token option",
            DecisionState::ConfirmToken => "confirm token",
            DecisionState::SetRevenue => "set revenue",
            DecisionState::SelectPayout => "select payout",
        }
    }
}

/// Inputs to the machine: user gestures, feed updates, dialog answers and
/// engine verdicts, all delivered on the controller's event loop.
#[derive(Clone, Debug)]
pub enum StepEvent {
    FeedUpdated(Vec<Permission>),
    SelectHex(HexId),
    SelectStop(StopId),
    /// Pick the n-th enabled candidate for the current hex/stop.
    PickCandidate(usize),
    Deselect,
    Confirm,
    Cancel,
    /// Answer to a station-choice dialog.
    ChoiceResolved(u8),
    ChoiceAbandoned,
    EngineAccepted,
    EngineRejected(Option<String>),
    RevenueEntered(u32),
    PayoutChosen(PayoutSplit),
    /// Advisory computation suggests a revenue value.
    AdvisorySuggests(u32),
}

/// Outputs: what the runtime should do after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum StepEffect {
    Dispatch(FinalizedAction),
    ShowMessage(String),
    HighlightsChanged,
    ClearHighlights,
    AskStationChoice {
        stop: StopId,
        options: Vec<u8>,
    },
}

/// Read-only context the machine needs for index rebuilds and packaging.
pub struct StepContext<'a> {
    pub board: &'a BoardState,
    pub catalog: &'a TileCatalog,
    pub phase: &'a PhaseRules,
    pub oracle: &'a dyn ReachabilityOracle,
}

#[derive(Clone, Debug, Default)]
struct Selection {
    hex: Option<HexId>,
    stop: Option<StopId>,
    tile: Option<TileCandidate>,
    orientation_pos: usize,
    token: Option<TokenCandidate>,
}

#[derive(Clone, Debug)]
struct PendingRelay {
    planner: RelayPlanner,
    action_seed: (HexId, trunkline_protocol::TileTypeId, trunkline_protocol::Orientation),
    company: trunkline_protocol::CompanyId,
}

/// Owns the decision state, the candidate index and the selection context
/// for the current decision point.
#[derive(Default)]
pub struct StepController {
    state: DecisionState,
    index: CandidateIndex,
    permissions: Vec<Permission>,
    selection: Selection,
    pending_relay: Option<PendingRelay>,
    suggested_revenue: Option<u32>,
    message: String,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DecisionState {
        self.state
    }

    pub fn index(&self) -> &CandidateIndex {
        &self.index
    }

    pub fn suggested_revenue(&self) -> Option<u32> {
        self.suggested_revenue
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// The company acting at this decision point, if any permission is live.
    pub fn acting_company(&self) -> Option<trunkline_protocol::CompanyId> {
        self.permissions.first().map(Permission::company)
    }

    /// The tile currently previewed at the selected hex, if any.
    pub fn provisional(&self) -> Option<ProvisionalTile> {
        let hex = self.selection.hex?;
        let candidate = self.selection.tile.as_ref()?;
        let orientation = *candidate.orientations.get(self.selection.orientation_pos)?;
        Some(ProvisionalTile {
            hex,
            tile: candidate.tile,
            orientation,
        })
    }

    pub fn status_line(&self) -> StatusLine {
        StatusLine {
            step: self.state.label().to_string(),
            message: self.message.clone(),
        }
    }

    /// Process one event. Returns the effects the runtime must carry out.
    pub fn handle(&mut self, event: StepEvent, ctx: &StepContext<'_>) -> Vec<StepEffect> {
        // While a station-choice dialog is outstanding the flow is paused in
        // place: board gestures neither move the state nor touch the parked
        // plan. Only the dialog answer (or dismissal), a feed change or an
        // engine verdict get through.
        if self.pending_relay.is_some() && Self::is_board_gesture(&event) {
            return vec![StepEffect::ShowMessage(self.message.clone())];
        }
        match event {
            StepEvent::FeedUpdated(permissions) => self.on_feed(permissions, ctx),
            StepEvent::SelectHex(hex) => self.on_select_hex(hex, ctx),
            StepEvent::SelectStop(stop) => self.on_select_stop(stop),
            StepEvent::PickCandidate(n) => self.on_pick(n),
            StepEvent::Deselect | StepEvent::Cancel => self.on_cancel(),
            StepEvent::Confirm => self.on_confirm(ctx),
            StepEvent::ChoiceResolved(station) => self.on_choice_resolved(station, ctx),
            StepEvent::ChoiceAbandoned => self.on_choice_abandoned(),
            StepEvent::EngineAccepted => self.on_engine_accepted(),
            StepEvent::EngineRejected(reason) => self.on_engine_rejected(reason),
            StepEvent::RevenueEntered(amount) => self.on_revenue(amount),
            StepEvent::PayoutChosen(split) => self.on_payout(split),
            StepEvent::AdvisorySuggests(value) => self.on_advisory(value),
        }
    }

    fn is_board_gesture(event: &StepEvent) -> bool {
        matches!(
            event,
            StepEvent::SelectHex(_)
                | StepEvent::SelectStop(_)
                | StepEvent::PickCandidate(_)
                | StepEvent::Deselect
                | StepEvent::Confirm
                | StepEvent::Cancel
                | StepEvent::RevenueEntered(_)
                | StepEvent::PayoutChosen(_)
        )
    }

    // ------------------------------------------------------------------
    // feed

    fn on_feed(&mut self, permissions: Vec<Permission>, ctx: &StepContext<'_>) -> Vec<StepEffect> {
        self.selection = Selection::default();
        self.pending_relay = None;
        self.suggested_revenue = None;
        self.permissions = permissions;

        let has_tile = self.permissions.iter().any(Permission::is_tile_lay);
        let has_token = self.permissions.iter().any(Permission::is_token_lay);
        let has_revenue = self
            .permissions
            .iter()
            .any(|p| matches!(p, Permission::SetRevenue { .. }));
        let has_payout = self
            .permissions
            .iter()
            .any(|p| matches!(p, Permission::SelectPayout { .. }));

        if has_tile || has_token {
            self.index = CandidateIndex::build(
                &self.permissions,
                ctx.board,
                ctx.catalog,
                ctx.phase,
                ctx.oracle,
            );
            if self.index.is_empty()
                || !self.index.hexes().any(|h| self.index.is_selectable(h))
            {
                // Permissions are moot: nothing placeable anywhere.
                self.message = "no legal placement".to_string();
                self.state = if has_tile {
                    DecisionState::SelectLocationForTile
                } else {
                    DecisionState::SelectLocationForToken
                };
                return vec![
                    StepEffect::HighlightsChanged,
                    StepEffect::ShowMessage(self.message.clone()),
                ];
            }
            self.state = if has_tile {
                self.message = "select a highlighted hex to upgrade".to_string();
                DecisionState::SelectLocationForTile
            } else {
                self.message = "select a station to token".to_string();
                DecisionState::SelectLocationForToken
            };
            return vec![StepEffect::HighlightsChanged];
        }

        self.index = CandidateIndex::default();
        if has_revenue {
            self.state = DecisionState::SetRevenue;
            self.message = "enter the revenue for this run".to_string();
            return vec![StepEffect::ClearHighlights];
        }
        if has_payout {
            self.state = DecisionState::SelectPayout;
            self.message = "pay out or withhold".to_string();
            return vec![StepEffect::ClearHighlights];
        }

        self.state = DecisionState::Inactive;
        self.message.clear();
        vec![StepEffect::ClearHighlights]
    }

    // ------------------------------------------------------------------
    // hex / stop selection

    fn on_select_hex(&mut self, hex: HexId, ctx: &StepContext<'_>) -> Vec<StepEffect> {
        match self.state {
            DecisionState::SelectLocationForTile => {
                let enabled = self.index.enabled_tile_candidates(hex);
                if enabled.is_empty() {
                    let reason = self.index.rejection_summary(hex);
                    self.message = reason.clone();
                    return vec![StepEffect::ShowMessage(reason)];
                }
                self.selection.hex = Some(hex);
                self.message = format!("{} upgrade(s) available", enabled.len());
                self.state = DecisionState::SelectTile;
                vec![StepEffect::ShowMessage(self.message.clone())]
            }
            DecisionState::SelectTile => {
                if self.selection.hex == Some(hex) {
                    return Vec::new();
                }
                // Click elsewhere: drop the selection, then try the new hex.
                self.selection = Selection::default();
                self.state = DecisionState::SelectLocationForTile;
                self.on_select_hex(hex, ctx)
            }
            DecisionState::RotateTile => {
                if self.selection.hex == Some(hex) {
                    // Re-activating the same hex advances the rotation.
                    if let Some(candidate) = &self.selection.tile {
                        let len = candidate.orientations.len();
                        self.selection.orientation_pos =
                            (self.selection.orientation_pos + 1) % len;
                    }
                    return Vec::new();
                }
                self.selection = Selection::default();
                self.state = DecisionState::SelectLocationForTile;
                self.on_select_hex(hex, ctx)
            }
            DecisionState::SelectLocationForToken
            | DecisionState::SelectToken
            | DecisionState::ConfirmToken => {
                self.message = "select a station, not a hex".to_string();
                vec![StepEffect::ShowMessage(self.message.clone())]
            }
            _ => Vec::new(),
        }
    }

    fn on_select_stop(&mut self, stop: StopId) -> Vec<StepEffect> {
        if !matches!(
            self.state,
            DecisionState::SelectLocationForToken | DecisionState::SelectToken
        ) {
            return Vec::new();
        }

        let enabled: Vec<TokenCandidate> = self
            .index
            .enabled_token_candidates_at(stop)
            .into_iter()
            .cloned()
            .collect();
        if enabled.is_empty() {
            // Explicit rejection, never a silent no-op.
            let hex = self
                .index
                .hexes()
                .find(|h| {
                    self.index.candidates(*h).iter().any(|c| {
                        matches!(c, crate::index::UpgradeCandidate::Token(t) if t.stop == stop)
                    })
                });
            let reason = match hex {
                Some(hex) => self.index.rejection_summary(hex),
                None => "no token may be placed here".to_string(),
            };
            self.message = reason.clone();
            return vec![StepEffect::ShowMessage(reason)];
        }

        self.selection.stop = Some(stop);
        self.selection.hex = Some(enabled[0].hex);
        if enabled.len() == 1 {
            // Single candidate: skip the pick step entirely.
            self.selection.token = Some(enabled[0].clone());
            self.state = DecisionState::ConfirmToken;
            self.message = "confirm token placement".to_string();
        } else {
            self.selection.token = None;
            self.state = DecisionState::SelectToken;
            self.message = format!("{} token options; pick one", enabled.len());
        }
        vec![StepEffect::ShowMessage(self.message.clone())]
    }

    fn on_pick(&mut self, n: usize) -> Vec<StepEffect> {
        match self.state {
            DecisionState::SelectTile => {
                let Some(hex) = self.selection.hex else {
                    return Vec::new();
                };
                let enabled = self.index.enabled_tile_candidates(hex);
                let Some(candidate) = enabled.get(n) else {
                    self.message = "no such tile option".to_string();
                    return vec![StepEffect::ShowMessage(self.message.clone())];
                };
                self.selection.tile = Some((*candidate).clone());
                self.selection.orientation_pos = 0;
                self.state = DecisionState::RotateTile;
                self.message = "rotate by re-selecting the hex, then confirm".to_string();
                vec![StepEffect::ShowMessage(self.message.clone())]
            }
            DecisionState::SelectToken => {
                let Some(stop) = self.selection.stop else {
                    return Vec::new();
                };
                let enabled = self.index.enabled_token_candidates_at(stop);
                let Some(candidate) = enabled.get(n) else {
                    self.message = "no such token option".to_string();
                    return vec![StepEffect::ShowMessage(self.message.clone())];
                };
                self.selection.token = Some((*candidate).clone());
                self.state = DecisionState::ConfirmToken;
                self.message = "confirm token placement".to_string();
                vec![StepEffect::ShowMessage(self.message.clone())]
            }
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // confirm / cancel

    fn on_cancel(&mut self) -> Vec<StepEffect> {
        match self.state {
            DecisionState::SelectTile | DecisionState::RotateTile => {
                self.selection = Selection::default();
                self.state = DecisionState::SelectLocationForTile;
                self.message = "select a highlighted hex to upgrade".to_string();
                vec![StepEffect::ShowMessage(self.message.clone())]
            }
            DecisionState::SelectToken | DecisionState::ConfirmToken => {
                self.selection = Selection::default();
                self.state = DecisionState::SelectLocationForToken;
                self.message = "select a station to token".to_string();
                vec![StepEffect::ShowMessage(self.message.clone())]
            }
            _ => Vec::new(),
        }
    }

    fn on_confirm(&mut self, ctx: &StepContext<'_>) -> Vec<StepEffect> {
        match self.state {
            DecisionState::RotateTile => {
                let Some(provisional) = self.provisional() else {
                    return Vec::new();
                };
                let Some(candidate) = self.selection.tile.as_ref() else {
                    return Vec::new();
                };
                let company = self.permissions[candidate.permission].company();
                let packaged = package::package_tile(
                    company,
                    provisional.hex,
                    provisional.tile,
                    provisional.orientation,
                    ctx.board,
                    ctx.catalog,
                );
                self.after_packaging(packaged, company)
            }
            DecisionState::ConfirmToken => {
                let Some(candidate) = self.selection.token.as_ref() else {
                    return Vec::new();
                };
                let action = package::package_token(candidate, ctx.board);
                vec![StepEffect::Dispatch(action)]
            }
            _ => Vec::new(),
        }
    }

    fn after_packaging(
        &mut self,
        packaged: Packaged,
        company: trunkline_protocol::CompanyId,
    ) -> Vec<StepEffect> {
        match packaged {
            Packaged::Ready(action) => {
                self.pending_relay = None;
                vec![StepEffect::Dispatch(action)]
            }
            Packaged::NeedsChoice {
                planner,
                stop,
                options,
                ..
            } => {
                let provisional = match self.provisional() {
                    Some(p) => p,
                    None => return Vec::new(),
                };
                self.pending_relay = Some(PendingRelay {
                    planner,
                    action_seed: (provisional.hex, provisional.tile, provisional.orientation),
                    company,
                });
                self.message = "choose a station for the displaced token".to_string();
                vec![StepEffect::AskStationChoice { stop, options }]
            }
        }
    }

    fn on_choice_resolved(&mut self, station: u8, ctx: &StepContext<'_>) -> Vec<StepEffect> {
        let Some(pending) = self.pending_relay.take() else {
            return Vec::new();
        };
        let (hex, tile, orientation) = pending.action_seed;
        let packaged = package::resume_tile(
            pending.company,
            hex,
            tile,
            orientation,
            pending.planner,
            station,
            ctx.board,
            ctx.catalog,
        );
        self.after_packaging(packaged, pending.company)
    }

    fn on_choice_abandoned(&mut self) -> Vec<StepEffect> {
        // Abandoning the dialog aborts the whole placement; the user must
        // restart from a fresh permission.
        self.pending_relay = None;
        self.selection = Selection::default();
        self.state = DecisionState::Inactive;
        self.message = "placement abandoned".to_string();
        vec![
            StepEffect::ClearHighlights,
            StepEffect::ShowMessage(self.message.clone()),
        ]
    }

    // ------------------------------------------------------------------
    // engine verdicts

    fn on_engine_accepted(&mut self) -> Vec<StepEffect> {
        match self.state {
            DecisionState::RotateTile
            | DecisionState::ConfirmToken
            | DecisionState::SetRevenue
            | DecisionState::SelectPayout => {
                self.selection = Selection::default();
                self.pending_relay = None;
                self.state = DecisionState::Inactive;
                self.message.clear();
                vec![StepEffect::ClearHighlights]
            }
            _ => Vec::new(),
        }
    }

    fn on_engine_rejected(&mut self, reason: Option<String>) -> Vec<StepEffect> {
        let text = reason.unwrap_or_else(|| "the engine rejected the action".to_string());
        match self.state {
            DecisionState::RotateTile => {
                // Index stays as built; only the provisional state is lost.
                self.selection = Selection::default();
                self.pending_relay = None;
                self.state = DecisionState::SelectLocationForTile;
                self.message = text.clone();
                vec![StepEffect::ShowMessage(text)]
            }
            DecisionState::ConfirmToken => {
                self.selection = Selection::default();
                self.state = DecisionState::SelectLocationForToken;
                self.message = text.clone();
                vec![StepEffect::ShowMessage(text)]
            }
            DecisionState::SetRevenue | DecisionState::SelectPayout => {
                self.message = text.clone();
                vec![StepEffect::ShowMessage(text)]
            }
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // revenue

    fn on_revenue(&mut self, amount: u32) -> Vec<StepEffect> {
        if self.state != DecisionState::SetRevenue {
            return Vec::new();
        }
        let Some(company) = self.permissions.iter().find_map(|p| match p {
            Permission::SetRevenue { company, .. } => Some(*company),
            _ => None,
        }) else {
            return Vec::new();
        };
        vec![StepEffect::Dispatch(FinalizedAction::SetRevenue {
            company,
            amount,
        })]
    }

    fn on_payout(&mut self, split: PayoutSplit) -> Vec<StepEffect> {
        if self.state != DecisionState::SelectPayout {
            return Vec::new();
        }
        let Some(company) = self.permissions.iter().find_map(|p| match p {
            Permission::SelectPayout { company, .. } => Some(*company),
            _ => None,
        }) else {
            return Vec::new();
        };
        vec![StepEffect::Dispatch(FinalizedAction::SelectPayout {
            company,
            split,
        })]
    }

    fn on_advisory(&mut self, value: u32) -> Vec<StepEffect> {
        // Advisory input is never an error and never blocks the flow; it only
        // pre-fills the suggested value while setting revenue.
        if self.state == DecisionState::SetRevenue {
            self.suggested_revenue = Some(value);
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardState;
    use crate::catalog::{load_catalog, CatalogSource, TileCatalog};
    use std::collections::BTreeSet;
    use trunkline_protocol::{
        ColourQuota, CompanyId, Hex, Orientation, Side, SideSet, TileColour,
    };

    struct FixedOracle {
        hexes: BTreeSet<HexId>,
        stops: BTreeSet<StopId>,
        sides: SideSet,
    }

    impl ReachabilityOracle for FixedOracle {
        fn reachable_hexes(&self, _company: CompanyId) -> BTreeSet<HexId> {
            self.hexes.clone()
        }
        fn reachable_stops(&self, _company: CompanyId) -> BTreeSet<StopId> {
            self.stops.clone()
        }
        fn network_sides(&self, _company: CompanyId, _hex: HexId) -> SideSet {
            self.sides
        }
    }

    struct Fixture {
        board: BoardState,
        catalog: TileCatalog,
        phase: crate::catalog::PhaseRules,
        oracle: FixedOracle,
        hex: HexId,
        company: CompanyId,
    }

    impl Fixture {
        fn ctx(&self) -> StepContext<'_> {
            StepContext {
                board: &self.board,
                catalog: &self.catalog,
                phase: &self.phase,
                oracle: &self.oracle,
            }
        }

        fn tile_feed(&self) -> Vec<Permission> {
            vec![Permission::LayTileGeneric {
                company: self.company,
                quota: ColourQuota {
                    colour: TileColour::Yellow,
                    remaining: 1,
                },
            }]
        }
    }

    fn fixture() -> Fixture {
        let (catalog, schedule) = load_catalog(CatalogSource::Embedded).unwrap();
        let phase = schedule.rules_for("2").unwrap();
        let mut board = BoardState::new();
        let plain = catalog.lookup("plain").unwrap();
        let hex = board
            .add_hex(Hex { q: 0, r: 0 }, plain, Orientation(0), &catalog)
            .unwrap();
        let company = board.add_company("PRR", vec![hex], 2);
        let oracle = FixedOracle {
            hexes: [hex].into_iter().collect(),
            stops: BTreeSet::new(),
            sides: [Side(0)].into_iter().collect(),
        };
        Fixture {
            board,
            catalog,
            phase,
            oracle,
            hex,
            company,
        }
    }

    #[test]
    fn feed_with_tile_permissions_activates_tile_flow() {
        let fx = fixture();
        let mut steps = StepController::new();
        let effects = steps.handle(StepEvent::FeedUpdated(fx.tile_feed()), &fx.ctx());
        assert_eq!(steps.state(), DecisionState::SelectLocationForTile);
        assert!(effects.contains(&StepEffect::HighlightsChanged));
    }

    #[test]
    fn select_pick_confirm_dispatches_lay_tile() {
        let fx = fixture();
        let mut steps = StepController::new();
        steps.handle(StepEvent::FeedUpdated(fx.tile_feed()), &fx.ctx());
        steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        assert_eq!(steps.state(), DecisionState::SelectTile);

        steps.handle(StepEvent::PickCandidate(0), &fx.ctx());
        assert_eq!(steps.state(), DecisionState::RotateTile);
        let provisional = steps.provisional().unwrap();
        assert_eq!(provisional.hex, fx.hex);

        let effects = steps.handle(StepEvent::Confirm, &fx.ctx());
        assert!(matches!(
            effects.as_slice(),
            [StepEffect::Dispatch(FinalizedAction::LayTile { .. })]
        ));
    }

    #[test]
    fn reactivating_hex_cycles_orientation() {
        let fx = fixture();
        let mut steps = StepController::new();
        steps.handle(StepEvent::FeedUpdated(fx.tile_feed()), &fx.ctx());
        steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        steps.handle(StepEvent::PickCandidate(0), &fx.ctx());

        let first = steps.provisional().unwrap().orientation;
        steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        let second = steps.provisional().unwrap().orientation;
        assert_ne!(first, second);

        // Cycling all the way round comes back to the first orientation.
        let count = steps.selection.tile.as_ref().unwrap().orientations.len();
        for _ in 1..count {
            steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        }
        assert_eq!(steps.provisional().unwrap().orientation, first);
    }

    #[test]
    fn select_deselect_reselect_is_idempotent() {
        let fx = fixture();
        let mut steps = StepController::new();
        steps.handle(StepEvent::FeedUpdated(fx.tile_feed()), &fx.ctx());

        steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        steps.handle(StepEvent::PickCandidate(0), &fx.ctx());
        let direct = steps.provisional().unwrap();

        steps.handle(StepEvent::Deselect, &fx.ctx());
        assert_eq!(steps.state(), DecisionState::SelectLocationForTile);
        assert!(steps.provisional().is_none());

        steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        steps.handle(StepEvent::PickCandidate(0), &fx.ctx());
        assert_eq!(steps.provisional().unwrap(), direct);
    }

    #[test]
    fn engine_rejection_rolls_back_without_losing_index() {
        let fx = fixture();
        let mut steps = StepController::new();
        steps.handle(StepEvent::FeedUpdated(fx.tile_feed()), &fx.ctx());
        let index_before = steps.index().clone();

        steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        steps.handle(StepEvent::PickCandidate(0), &fx.ctx());
        steps.handle(StepEvent::Confirm, &fx.ctx());
        let effects = steps.handle(
            StepEvent::EngineRejected(Some("route blocked".into())),
            &fx.ctx(),
        );

        assert_eq!(steps.state(), DecisionState::SelectLocationForTile);
        assert!(steps.provisional().is_none());
        assert_eq!(steps.index(), &index_before);
        assert!(effects
            .iter()
            .any(|e| matches!(e, StepEffect::ShowMessage(m) if m.contains("route blocked"))));
    }

    #[test]
    fn feed_without_relevant_permissions_deactivates() {
        let fx = fixture();
        let mut steps = StepController::new();
        steps.handle(StepEvent::FeedUpdated(fx.tile_feed()), &fx.ctx());
        assert_eq!(steps.state(), DecisionState::SelectLocationForTile);

        let effects = steps.handle(StepEvent::FeedUpdated(Vec::new()), &fx.ctx());
        assert_eq!(steps.state(), DecisionState::Inactive);
        assert!(effects.contains(&StepEffect::ClearHighlights));
        assert!(steps.index().is_empty());
    }

    #[test]
    fn advisory_prefills_revenue_only_in_set_revenue() {
        let fx = fixture();
        let mut steps = StepController::new();

        steps.handle(StepEvent::AdvisorySuggests(120), &fx.ctx());
        assert_eq!(steps.suggested_revenue(), None);

        steps.handle(
            StepEvent::FeedUpdated(vec![Permission::SetRevenue {
                company: fx.company,
                trains: Vec::new(),
            }]),
            &fx.ctx(),
        );
        assert_eq!(steps.state(), DecisionState::SetRevenue);
        steps.handle(StepEvent::AdvisorySuggests(120), &fx.ctx());
        assert_eq!(steps.suggested_revenue(), Some(120));

        let effects = steps.handle(StepEvent::RevenueEntered(120), &fx.ctx());
        assert!(matches!(
            effects.as_slice(),
            [StepEffect::Dispatch(FinalizedAction::SetRevenue {
                amount: 120,
                ..
            })]
        ));
    }

    #[test]
    fn token_flow_auto_advances_on_single_candidate() {
        let (catalog, schedule) = load_catalog(CatalogSource::Embedded).unwrap();
        let phase = schedule.rules_for("2").unwrap();
        let mut board = BoardState::new();
        let city = catalog.lookup("city").unwrap();
        let hex = board
            .add_hex(Hex { q: 0, r: 0 }, city, Orientation(0), &catalog)
            .unwrap();
        let company = board.add_company("NYC", vec![hex], 2);
        let stop = board.hex(hex).stops[0];
        let oracle = FixedOracle {
            hexes: BTreeSet::new(),
            stops: [stop].into_iter().collect(),
            sides: SideSet::EMPTY,
        };
        let ctx = StepContext {
            board: &board,
            catalog: &catalog,
            phase: &phase,
            oracle: &oracle,
        };

        let mut steps = StepController::new();
        steps.handle(
            StepEvent::FeedUpdated(vec![Permission::LayTokenGeneric { company }]),
            &ctx,
        );
        assert_eq!(steps.state(), DecisionState::SelectLocationForToken);

        // Exactly one candidate: jumps straight past SelectToken.
        steps.handle(StepEvent::SelectStop(stop), &ctx);
        assert_eq!(steps.state(), DecisionState::ConfirmToken);

        let effects = steps.handle(StepEvent::Confirm, &ctx);
        assert!(matches!(
            effects.as_slice(),
            [StepEffect::Dispatch(FinalizedAction::PlaceToken { .. })]
        ));
    }

    /// A tokened twin hex in phase 3; upgrading to `twin_cross` leaves two
    /// qualifying stations, so confirming pauses on a station choice.
    fn relay_fixture() -> Fixture {
        let (catalog, schedule) = load_catalog(CatalogSource::Embedded).unwrap();
        let phase = schedule.rules_for("3").unwrap();
        let mut board = BoardState::new();
        let twin = catalog.lookup("twin").unwrap();
        let hex = board
            .add_hex(Hex { q: 0, r: 0 }, twin, Orientation(0), &catalog)
            .unwrap();
        let company = board.add_company("PRR", vec![hex], 2);
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
        let oracle = FixedOracle {
            hexes: [hex].into_iter().collect(),
            stops: BTreeSet::new(),
            sides: [Side(0)].into_iter().collect(),
        };
        Fixture {
            board,
            catalog,
            phase,
            oracle,
            hex,
            company,
        }
    }

    /// Drives the relay fixture to the outstanding station choice.
    fn paused_on_choice(fx: &Fixture) -> StepController {
        let mut steps = StepController::new();
        steps.handle(
            StepEvent::FeedUpdated(vec![Permission::LayTileGeneric {
                company: fx.company,
                quota: ColourQuota {
                    colour: TileColour::Green,
                    remaining: 1,
                },
            }]),
            &fx.ctx(),
        );
        steps.handle(StepEvent::SelectHex(fx.hex), &fx.ctx());
        // twin_cross is the second upgrade target.
        steps.handle(StepEvent::PickCandidate(1), &fx.ctx());
        let effects = steps.handle(StepEvent::Confirm, &fx.ctx());
        assert!(matches!(
            effects.as_slice(),
            [StepEffect::AskStationChoice { options, .. }] if options == &vec![0, 1]
        ));
        steps
    }

    #[test]
    fn board_gestures_pause_while_choice_outstanding() {
        let fx = relay_fixture();
        let mut steps = paused_on_choice(&fx);

        // Cancelling or re-selecting the hex moves nothing and dispatches
        // nothing while the dialog is up.
        for event in [StepEvent::Cancel, StepEvent::SelectHex(fx.hex), StepEvent::Confirm] {
            let effects = steps.handle(event, &fx.ctx());
            assert!(!effects.iter().any(|e| matches!(
                e,
                StepEffect::Dispatch(_) | StepEffect::AskStationChoice { .. }
            )));
            assert_eq!(steps.state(), DecisionState::RotateTile);
        }

        // The dialog answer still resolves to exactly the confirmed lay.
        let effects = steps.handle(StepEvent::ChoiceResolved(1), &fx.ctx());
        match effects.as_slice() {
            [StepEffect::Dispatch(FinalizedAction::LayTile { relays, .. })] => {
                assert_eq!(relays.len(), 1);
                assert_eq!(
                    relays[0].to,
                    trunkline_protocol::RelayTarget::Station(1)
                );
            }
            other => panic!("expected a single dispatch, got {other:?}"),
        }
    }

    #[test]
    fn abandoning_choice_aborts_the_placement() {
        let fx = relay_fixture();
        let mut steps = paused_on_choice(&fx);

        let effects = steps.handle(StepEvent::ChoiceAbandoned, &fx.ctx());
        assert_eq!(steps.state(), DecisionState::Inactive);
        assert!(effects.contains(&StepEffect::ClearHighlights));

        // A late dialog answer has nothing to resume.
        let effects = steps.handle(StepEvent::ChoiceResolved(0), &fx.ctx());
        assert!(effects.is_empty());
    }
}
