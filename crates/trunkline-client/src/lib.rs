//! Trunkline client: the decision controller, advisory route search and
//! variant registry that sit between the core decision machinery and a
//! rendering front end.

pub mod advisory;
pub mod config;
pub mod controller;
pub mod registry;
pub mod script;
pub mod search;

pub use crate::advisory::{AdvisoryHandle, AdvisoryNote};
pub use crate::config::{AdvisoryConfig, ControllerConfig};
pub use crate::controller::{Controller, Gesture, StationChoice, ViewState};
pub use crate::registry::{GameData, RegistryError, VariantRegistry};
pub use crate::script::{ScriptedEngine, StaticOracle};
pub use crate::search::{GreedyRouteSearch, RouteEstimate, RouteRequest, RouteSearch};
