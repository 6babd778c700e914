//! Label-correcting Dijkstra search over a frozen `street_graph::StreetLayer`.
//!
//! [`StreetRouter`] runs the search itself; [`RoutingRequest`] carries the
//! per-query configuration (mode, dominance variable, drive side, LTS
//! threshold); [`turn_cost::car_turn_cost_seconds`] is the car costing
//! function's turn-angle table. This crate never mutates the graph it
//! searches — a `StreetLayer` (baseline or scenario) is borrowed read-only
//! for the lifetime of one `StreetRouter`.

pub mod error;
pub mod request;
pub mod router;
pub mod state;
pub mod turn_cost;

pub use error::RouterError;
pub use request::{CostField, DominanceVariable, DriveSide, RoutingRequest, SpeedFactor};
pub use router::StreetRouter;
pub use state::{edge_key, EdgeKey, State, TurnRestrictionProgress};
pub use turn_cost::car_turn_cost_seconds;
