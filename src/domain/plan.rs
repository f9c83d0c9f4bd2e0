use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{Horizon, Vehicle};
use crate::error::ConfigError;

/// Inputs of one planning invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub number_of_evs: usize,

    /// Look-ahead horizon (steps of one hour)
    pub control_horizon: usize,

    /// Power exchange limit with the grid (kW)
    pub grid_capacity_kw: f64,

    /// Hour of day at which the horizon starts
    pub current_time: i64,

    /// PV production forecast (kW), at least `control_horizon` long
    pub forecast_pv: Vec<f64>,

    /// Import price (currency/kWh), at least `control_horizon` long
    pub import_price: Vec<f64>,

    /// Export price (currency/kWh), at least `control_horizon` long
    pub export_price: Vec<f64>,

    pub vehicles: Vec<Vehicle>,

    /// SoC of each vehicle at the previous time step, keyed by vehicle index.
    /// Accepted for callers that thread it through; the formulation re-derives
    /// every trajectory from `arrival_soc`.
    #[serde(default)]
    pub previous_soc: BTreeMap<usize, f64>,
}

/// A request whose shapes and values have been checked
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub horizon: Horizon,
    pub vehicles: Vec<Vehicle>,
    pub grid_capacity_kw: f64,
    pub current_time: i64,
}

impl ValidatedRequest {
    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }
}

impl PlanRequest {
    /// Parse a request from JSON; missing or mistyped fields are configuration errors
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::MalformedRequest(e.to_string()))
    }

    /// Check every input before a model is built
    pub fn validate(&self) -> Result<ValidatedRequest, ConfigError> {
        if self.vehicles.len() != self.number_of_evs {
            return Err(ConfigError::VehicleCountMismatch {
                declared: self.number_of_evs,
                provided: self.vehicles.len(),
            });
        }

        if !self.grid_capacity_kw.is_finite() || self.grid_capacity_kw < 0.0 {
            return Err(ConfigError::InvalidGridCapacity(self.grid_capacity_kw));
        }

        for (index, vehicle) in self.vehicles.iter().enumerate() {
            vehicle.validate(index)?;
        }

        let horizon = Horizon::from_series(
            self.control_horizon,
            &self.forecast_pv,
            &self.import_price,
            &self.export_price,
        )?;

        if !self.previous_soc.is_empty() {
            debug!(
                entries = self.previous_soc.len(),
                "previous_soc provided; trajectories are derived from arrival_soc"
            );
        }

        Ok(ValidatedRequest {
            horizon,
            vehicles: self.vehicles.clone(),
            grid_capacity_kw: self.grid_capacity_kw,
            current_time: self.current_time,
        })
    }
}

/// What the caller consumes after a successful solve
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargingPlan {
    /// Per-vehicle charging setpoint per step, as a fraction of the
    /// vehicle's maximum charging power
    pub charge_fractions: BTreeMap<usize, Vec<f64>>,

    /// PV power consumed on site per step (kW)
    pub pv_used_kw: Vec<f64>,
}

impl ChargingPlan {
    pub fn horizon_len(&self) -> usize {
        self.pv_used_kw.len()
    }

    /// Setpoint of `vehicle` at step `t`
    pub fn fraction(&self, vehicle: usize, t: usize) -> Option<f64> {
        self.charge_fractions.get(&vehicle)?.get(t).copied()
    }
}
