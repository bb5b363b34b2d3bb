//! The single-threaded decision controller.
//!
//! Owns the board, the step machine and the advisory worker handle, and is
//! the only writer of decision state. User gestures, feed updates, dialog
//! answers and advisory notes all pass through here in arrival order; a feed
//! update always rebuilds the candidate index before any later gesture is
//! processed, so stale candidate references can never reach the engine.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use trunkline_core::{
    BoardState, CatalogError, DecisionState, GameEngine, PhaseRules, ReachabilityOracle,
    StepContext, StepController, StepEffect, StepEvent, TileCatalog, TrainRoster,
};
use trunkline_protocol::{
    AdvisoryOverlay, EngineVerdict, HexHighlight, HexId, PayoutSplit, Permission, ProvisionalTile,
    StatusLine, StopId,
};

use crate::advisory::{AdvisoryHandle, AdvisoryNote};
use crate::config::ControllerConfig;
use crate::registry::GameData;
use crate::search::{GreedyRouteSearch, RouteRequest, RouteSearch};

/// A user gesture forwarded by the widget layer.
#[derive(Clone, Debug)]
pub enum Gesture {
    SelectHex(HexId),
    SelectStop(StopId),
    PickCandidate(usize),
    Deselect,
    Confirm,
    Cancel,
    /// Answer from the station-choice dialog.
    StationChosen(u8),
    /// The dialog was closed without an answer.
    DialogCancelled,
    RevenueEntered(u32),
    PayoutChosen(PayoutSplit),
}

/// An outstanding modal station choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StationChoice {
    pub stop: StopId,
    pub options: Vec<u8>,
}

/// Everything the rendering collaborator needs to draw the current moment.
#[derive(Clone, Debug)]
pub struct ViewState {
    pub highlights: Vec<HexHighlight>,
    pub status: StatusLine,
    pub provisional: Option<ProvisionalTile>,
    pub overlay: Option<AdvisoryOverlay>,
    pub pending_choice: Option<StationChoice>,
    pub suggested_revenue: Option<u32>,
}

pub struct Controller<E: GameEngine, O: ReachabilityOracle> {
    engine: E,
    oracle: O,
    board: BoardState,
    catalog: TileCatalog,
    phase: PhaseRules,
    trains: TrainRoster,
    config: ControllerConfig,
    steps: StepController,
    search: Arc<dyn RouteSearch>,

    advisory: Option<AdvisoryHandle>,
    generation: u64,
    overlay: Option<AdvisoryOverlay>,
    pending_choice: Option<StationChoice>,
    highlights: Vec<HexHighlight>,
}

impl<E: GameEngine, O: ReachabilityOracle> Controller<E, O> {
    pub fn new(
        engine: E,
        oracle: O,
        board: BoardState,
        data: GameData,
        config: ControllerConfig,
    ) -> Result<Self, CatalogError> {
        let phase = data.schedule.rules_for(&config.phase)?;
        let search: Arc<dyn RouteSearch> =
            Arc::new(GreedyRouteSearch::new(config.advisory.restarts));
        Ok(Self {
            engine,
            oracle,
            board,
            catalog: data.catalog,
            phase,
            trains: data.trains,
            config,
            steps: StepController::new(),
            search,
            advisory: None,
            generation: 0,
            overlay: None,
            pending_choice: None,
            highlights: Vec::new(),
        })
    }

    /// Swap the route search implementation (tests, game-specific engines).
    pub fn with_search(mut self, search: Arc<dyn RouteSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn state(&self) -> DecisionState {
        self.steps.state()
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            highlights: self.highlights.clone(),
            status: self.steps.status_line(),
            provisional: self.steps.provisional(),
            overlay: self.overlay.clone(),
            pending_choice: self.pending_choice.clone(),
            suggested_revenue: self.steps.suggested_revenue(),
        }
    }

    /// Poll the engine for the current permission set and (re)start the
    /// decision point. Called at startup and after every accepted action.
    pub fn begin_decision_point(&mut self) {
        let feed = self.engine.possible_actions();
        info!("decision point begins with {} permission(s)", feed.len());
        self.run_events(StepEvent::FeedUpdated(feed));
    }

    /// Forward one user gesture.
    pub fn on_gesture(&mut self, gesture: Gesture) {
        // Advisory notes queued before the gesture are applied first.
        self.drain_advisory();

        let event = match gesture {
            Gesture::SelectHex(hex) => StepEvent::SelectHex(hex),
            Gesture::SelectStop(stop) => StepEvent::SelectStop(stop),
            Gesture::PickCandidate(n) => StepEvent::PickCandidate(n),
            Gesture::Deselect => StepEvent::Deselect,
            Gesture::Confirm => StepEvent::Confirm,
            Gesture::Cancel => StepEvent::Cancel,
            Gesture::StationChosen(station) => {
                self.pending_choice = None;
                StepEvent::ChoiceResolved(station)
            }
            Gesture::DialogCancelled => {
                self.pending_choice = None;
                StepEvent::ChoiceAbandoned
            }
            Gesture::RevenueEntered(amount) => StepEvent::RevenueEntered(amount),
            Gesture::PayoutChosen(split) => StepEvent::PayoutChosen(split),
        };
        self.run_events(event);
    }

    /// Drain pending advisory notes into the controller. Stale generations
    /// (superseded or cancelled workers) are ignored.
    pub fn drain_advisory(&mut self) {
        let mut notes = Vec::new();
        let mut finished = false;
        if let Some(handle) = &self.advisory {
            while let Some(note) = handle.try_recv() {
                if note.generation() != self.generation {
                    debug!("ignoring stale advisory note");
                    continue;
                }
                if matches!(note, AdvisoryNote::Finished { .. }) {
                    finished = true;
                }
                notes.push(note);
            }
        }

        for note in notes {
            if let AdvisoryNote::BestSoFar { estimate, .. } = note {
                let value = estimate.value;
                self.overlay = Some(AdvisoryOverlay {
                    value,
                    stops: estimate.stops,
                });
                let ctx = StepContext {
                    board: &self.board,
                    catalog: &self.catalog,
                    phase: &self.phase,
                    oracle: &self.oracle,
                };
                self.steps.handle(StepEvent::AdvisorySuggests(value), &ctx);
            }
        }

        if finished {
            self.advisory = None;
        }
    }

    // ------------------------------------------------------------------

    fn run_events(&mut self, initial: StepEvent) {
        let mut queue = VecDeque::from([initial]);
        let mut refresh_feed = false;

        while let Some(event) = queue.pop_front() {
            let ctx = StepContext {
                board: &self.board,
                catalog: &self.catalog,
                phase: &self.phase,
                oracle: &self.oracle,
            };
            let effects = self.steps.handle(event, &ctx);

            for effect in effects {
                match effect {
                    StepEffect::Dispatch(action) => {
                        match self.engine.process(action.clone()) {
                            EngineVerdict::Accepted => {
                                if let Err(e) = self.board.apply_accepted(&action, &self.catalog) {
                                    // An engine-accepted action the board cannot
                                    // replay means the feed is inconsistent;
                                    // abort this decision point.
                                    warn!("board out of sync after accept: {}", e);
                                    queue.push_back(StepEvent::FeedUpdated(Vec::new()));
                                    continue;
                                }
                                queue.push_back(StepEvent::EngineAccepted);
                                refresh_feed = true;
                            }
                            EngineVerdict::Rejected { reason } => {
                                info!("engine rejected action: {:?}", reason);
                                queue.push_back(StepEvent::EngineRejected(reason));
                            }
                        }
                    }
                    StepEffect::ShowMessage(message) => {
                        debug!("status: {}", message);
                    }
                    StepEffect::HighlightsChanged => {
                        self.highlights = self.steps.index().highlights();
                    }
                    StepEffect::ClearHighlights => {
                        self.highlights.clear();
                        self.overlay = None;
                    }
                    StepEffect::AskStationChoice { stop, options } => {
                        self.pending_choice = Some(StationChoice { stop, options });
                    }
                }
            }
        }

        self.sync_advisory();

        if refresh_feed {
            self.begin_decision_point();
        }
    }

    /// Start or stop the advisory worker to match the current state.
    fn sync_advisory(&mut self) {
        let wants = self.config.advisory.enabled
            && matches!(
                self.steps.state(),
                DecisionState::SelectTile
                    | DecisionState::SetRevenue
                    | DecisionState::SelectPayout
            );

        if wants && self.advisory.is_none() {
            if let Some(request) = self.advisory_request() {
                self.generation += 1;
                self.advisory = Some(AdvisoryHandle::spawn(
                    self.generation,
                    request,
                    Arc::clone(&self.search),
                    &self.config.advisory,
                ));
                debug!("advisory worker {} started", self.generation);
            }
        } else if !wants {
            if let Some(handle) = self.advisory.take() {
                handle.cancel();
                // Bump the generation so in-flight notes become stale.
                self.generation += 1;
                self.overlay = None;
                debug!("advisory worker cancelled");
            }
        }
    }

    fn advisory_request(&self) -> Option<RouteRequest> {
        let company = self.steps.acting_company()?;

        let stop_values = self
            .oracle
            .reachable_stops(company)
            .into_iter()
            .map(|stop| {
                let state = self.board.stop(stop);
                let hex = self.board.hex(state.hex);
                let value = self
                    .catalog
                    .tile(hex.tile)
                    .stations
                    .get(state.station as usize)
                    .map(|s| s.value)
                    .unwrap_or(0);
                (stop, value)
            })
            .collect();

        // Simulate the trains named by the revenue permission when present,
        // otherwise the whole roster.
        let trains: Vec<_> = self
            .steps
            .permissions()
            .iter()
            .find_map(|p| match p {
                Permission::SetRevenue { trains, .. } => Some(trains.clone()),
                _ => None,
            })
            .unwrap_or_else(|| self.trains.ids().collect());
        let train_capacities = trains.iter().map(|t| self.trains.capacity(*t)).collect();

        Some(RouteRequest {
            company,
            stop_values,
            train_capacities,
        })
    }
}
