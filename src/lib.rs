//! Fleet EV charging optimizer
//!
//! Plans per-vehicle charging setpoints over a look-ahead horizon for a fleet
//! sharing one grid connection with on-site PV, by formulating and solving a
//! mixed-integer linear program.

pub mod config;
pub mod domain;
pub mod error;
pub mod optimizer;
pub mod telemetry;

pub use domain::{ChargingPlan, ConnectionState, PlanRequest, Vehicle};
pub use error::{ConfigError, PlannerError};
pub use optimizer::{compute_actions, ChargePlanner};
