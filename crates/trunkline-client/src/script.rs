//! Deterministic engine and oracle stand-ins.
//!
//! Used by the walkthrough binary and the integration tests to drive the
//! controller through whole decision points without a real server.

use std::collections::BTreeSet;

use trunkline_core::{GameEngine, ReachabilityOracle};
use trunkline_protocol::{
    CompanyId, EngineVerdict, FinalizedAction, HexId, Permission, SideSet, StopId,
};

/// Serves permission sets from a script, in order, and accepts or rejects
/// submitted actions per a matching verdict script (accept-all once the
/// script runs out).
pub struct ScriptedEngine {
    feeds: Vec<Vec<Permission>>,
    next_feed: usize,
    verdicts: Vec<EngineVerdict>,
    next_verdict: usize,
    pub processed: Vec<FinalizedAction>,
}

impl ScriptedEngine {
    pub fn new(feeds: Vec<Vec<Permission>>) -> Self {
        Self {
            feeds,
            next_feed: 0,
            verdicts: Vec::new(),
            next_verdict: 0,
            processed: Vec::new(),
        }
    }

    pub fn with_verdicts(mut self, verdicts: Vec<EngineVerdict>) -> Self {
        self.verdicts = verdicts;
        self
    }
}

impl GameEngine for ScriptedEngine {
    fn possible_actions(&mut self) -> Vec<Permission> {
        let feed = self.feeds.get(self.next_feed).cloned().unwrap_or_default();
        self.next_feed = (self.next_feed + 1).min(self.feeds.len());
        feed
    }

    fn process(&mut self, action: FinalizedAction) -> EngineVerdict {
        self.processed.push(action);
        let verdict = self
            .verdicts
            .get(self.next_verdict)
            .cloned()
            .unwrap_or(EngineVerdict::Accepted);
        self.next_verdict += 1;
        verdict
    }
}

/// Fixed reachability answers, independent of company.
#[derive(Clone, Debug, Default)]
pub struct StaticOracle {
    pub hexes: BTreeSet<HexId>,
    pub stops: BTreeSet<StopId>,
    pub sides: SideSet,
}

impl ReachabilityOracle for StaticOracle {
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
