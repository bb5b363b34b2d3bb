//! Seams to the external collaborators: the network-reachability oracle and
//! the authoritative game engine. Both are consumed as black boxes.

use std::collections::BTreeSet;

use trunkline_protocol::{CompanyId, EngineVerdict, FinalizedAction, HexId, Permission, SideSet, StopId};

/// Answers "what can this company's network currently reach". The graph
/// algorithm behind it is out of scope; an empty answer is a normal outcome
/// (the permission is moot), never an error.
pub trait ReachabilityOracle {
    /// Hexes on the company's network where a tile lay could extend it.
    fn reachable_hexes(&self, company: CompanyId) -> BTreeSet<HexId>;

    /// Stops the company could currently token.
    fn reachable_stops(&self, company: CompanyId) -> BTreeSet<StopId>;

    /// Which sides of `hex` the company's network arrives on. Generic tile
    /// lays must connect new track to at least one of these.
    fn network_sides(&self, company: CompanyId, hex: HexId) -> SideSet;
}

/// The authoritative engine: issues permissions, validates and executes
/// finalized actions. A rejection returns the client to the last stable
/// step rather than ending the decision point.
pub trait GameEngine {
    fn possible_actions(&mut self) -> Vec<Permission>;
    fn process(&mut self, action: FinalizedAction) -> EngineVerdict;
}
