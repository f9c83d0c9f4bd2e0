use std::collections::BTreeMap;
use tracing::{info, info_span};

use super::diagnostics::DiagnosticsSink;
use super::extract::extract_plan;
use super::{BuiltModel, ModelBuilder, ModelParameters, SolvedProgram, SolverAdapter};
use crate::config::Config;
use crate::domain::{ChargingPlan, PlanRequest, Vehicle};
use crate::error::{ConfigError, PlannerError};

/// Everything produced by one successful invocation
#[derive(Debug, Clone)]
pub struct PlanDetails {
    pub model: BuiltModel,
    pub solved: SolvedProgram,
    pub plan: ChargingPlan,
}

/// Fleet charging planner: validate, build, solve, extract
pub struct ChargePlanner {
    params: ModelParameters,
    solver: SolverAdapter,
}

impl ChargePlanner {
    pub fn new(params: ModelParameters, solver: SolverAdapter) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params, solver })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let solver = SolverAdapter::new(
            cfg.solver.settings()?,
            DiagnosticsSink::from_config(&cfg.diagnostics),
        )?;
        Self::new(cfg.model.clone(), solver)
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Compute the charging setpoints for one horizon
    pub fn plan(&self, request: &PlanRequest) -> Result<ChargingPlan, PlannerError> {
        self.plan_with_details(request).map(|details| details.plan)
    }

    /// Like [`ChargePlanner::plan`], also returning the model and raw solution
    pub fn plan_with_details(&self, request: &PlanRequest) -> Result<PlanDetails, PlannerError> {
        let span = info_span!(
            "plan",
            horizon = request.control_horizon,
            vehicles = request.number_of_evs,
            current_time = request.current_time
        );
        let _enter = span.enter();

        let validated = request.validate()?;
        let model = ModelBuilder::new(&self.params).build(&validated);
        let solved = self.solver.solve_or_dump(&model.program)?;
        let plan = extract_plan(&model, &solved, &validated.vehicles)?;

        info!(objective = solved.objective(), "charging plan ready");
        Ok(PlanDetails { model, solved, plan })
    }
}

impl Default for ChargePlanner {
    /// Default parameters on the always-available backend, dumping failures
    /// to the working directory
    fn default() -> Self {
        Self {
            params: ModelParameters::default(),
            solver: SolverAdapter::microlp(DiagnosticsSink::from_config(&Default::default())),
        }
    }
}

/// Flat entry operation: charging fraction per vehicle and step, plus PV used
#[allow(clippy::too_many_arguments)]
pub fn compute_actions(
    number_of_evs: usize,
    control_horizon: usize,
    grid_capacity_kw: f64,
    current_time: i64,
    forecast_pv: &[f64],
    import_price: &[f64],
    export_price: &[f64],
    vehicles: &[Vehicle],
    previous_soc: &BTreeMap<usize, f64>,
) -> Result<ChargingPlan, PlannerError> {
    let request = PlanRequest {
        number_of_evs,
        control_horizon,
        grid_capacity_kw,
        current_time,
        forecast_pv: forecast_pv.to_vec(),
        import_price: import_price.to_vec(),
        export_price: export_price.to_vec(),
        vehicles: vehicles.to_vec(),
        previous_soc: previous_soc.clone(),
    };
    ChargePlanner::default().plan(&request)
}
