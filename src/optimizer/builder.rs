//! Model Builder
//!
//! Assembles the fleet charging MILP for one horizon:
//! - Energy balance per step: import + PV used = export + Σ charge power
//! - PV split: PV exported = forecast PV − PV used
//! - Import/export exclusivity via one binary per step, with the grid
//!   capacity as the big-M bound
//! - Per-vehicle SoC recurrence keyed by arrival/departure offsets
//! - Departure deviation split into positive/negative parts and a weighted
//!   service penalty
//! - Charging power limited by each vehicle's maximum
//!
//! Objective: Σ_t (import_price·import − export_price·export)·Δt + K·Σ_v penalty

use tracing::debug;

use super::program::{ConstraintSense, LinearExpr, LinearProgram, VarDef, VarId};
use super::ModelParameters;
use crate::domain::{ValidatedRequest, Vehicle, TIME_STEP_HOURS};

/// Arena of the decision variables, indexed by vehicle and step
#[derive(Debug, Clone)]
pub struct ModelVariables {
    num_vehicles: usize,
    horizon: usize,
    charge_power: Vec<VarId>,
    soc: Vec<VarId>,
    pv_used: Vec<VarId>,
    pv_exported: Vec<VarId>,
    import_qty: Vec<VarId>,
    export_qty: Vec<VarId>,
    grid_direction: Vec<VarId>,
    deviation_pos: Vec<VarId>,
    deviation_neg: Vec<VarId>,
    penalty: Vec<VarId>,
}

impl ModelVariables {
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn charge_power(&self, v: usize, t: usize) -> VarId {
        self.charge_power[v * self.horizon + t]
    }

    pub fn soc(&self, v: usize, t: usize) -> VarId {
        self.soc[v * self.horizon + t]
    }

    pub fn pv_used(&self, t: usize) -> VarId {
        self.pv_used[t]
    }

    pub fn pv_exported(&self, t: usize) -> VarId {
        self.pv_exported[t]
    }

    pub fn import_qty(&self, t: usize) -> VarId {
        self.import_qty[t]
    }

    pub fn export_qty(&self, t: usize) -> VarId {
        self.export_qty[t]
    }

    pub fn grid_direction(&self, t: usize) -> VarId {
        self.grid_direction[t]
    }

    pub fn deviation_pos(&self, v: usize) -> VarId {
        self.deviation_pos[v]
    }

    pub fn deviation_neg(&self, v: usize) -> VarId {
        self.deviation_neg[v]
    }

    pub fn penalty(&self, v: usize) -> VarId {
        self.penalty[v]
    }
}

/// The assembled program together with its variable index
#[derive(Debug, Clone)]
pub struct BuiltModel {
    pub program: LinearProgram,
    pub vars: ModelVariables,
}

/// How `soc[v, i]` relates to the previous step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocTransition {
    /// `soc = arrival_soc (+ this step's charge when `charge` is set)`
    Anchor { charge: bool },
    /// `soc = previous soc` (not yet arrived, or already departed)
    Hold,
    /// `soc = previous soc + this step's charge`
    Accumulate,
}

/// Pick the SoC transition for step `i` given the arrival offset `a` and
/// departure offset `d` relative to the horizon start.
pub fn soc_transition(i: i64, a: i64, d: i64, connected: bool) -> SocTransition {
    if i == 0 {
        SocTransition::Anchor { charge: connected }
    } else if i < a {
        SocTransition::Hold
    } else if i == a {
        SocTransition::Anchor { charge: true }
    } else if i <= d {
        SocTransition::Accumulate
    } else {
        SocTransition::Hold
    }
}

pub struct ModelBuilder<'a> {
    params: &'a ModelParameters,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(params: &'a ModelParameters) -> Self {
        Self { params }
    }

    pub fn build(&self, request: &ValidatedRequest) -> BuiltModel {
        let mut program = LinearProgram::new("fleet_charging");
        let vars = self.add_variables(&mut program, request);

        self.set_objective(&mut program, &vars, request);
        self.add_grid_constraints(&mut program, &vars, request);
        for (v, vehicle) in request.vehicles.iter().enumerate() {
            self.add_vehicle_constraints(&mut program, &vars, request, v, vehicle);
        }

        debug!(
            variables = program.variables.len(),
            binaries = program.num_binaries(),
            constraints = program.constraints.len(),
            "charging model assembled"
        );

        BuiltModel { program, vars }
    }

    fn add_variables(
        &self,
        program: &mut LinearProgram,
        request: &ValidatedRequest,
    ) -> ModelVariables {
        let n = request.num_vehicles();
        let h = request.horizon.len();

        let mut charge_power = Vec::with_capacity(n * h);
        let mut soc = Vec::with_capacity(n * h);
        for v in 0..n {
            for t in 0..h {
                let def = VarDef::non_negative(format!("charge_power[{v},{t}]"));
                charge_power.push(program.add_variable(def));
            }
            for t in 0..h {
                let def = VarDef::non_negative(format!("soc[{v},{t}]"));
                let def = match self.params.max_soc {
                    Some(max) => def.with_upper(max),
                    None => def,
                };
                soc.push(program.add_variable(def));
            }
        }

        let mut per_step = |name: &str, make: fn(String) -> VarDef| -> Vec<VarId> {
            (0..h)
                .map(|t| program.add_variable(make(format!("{name}[{t}]"))))
                .collect()
        };
        let pv_used = per_step("pv_used", |name| VarDef::non_negative(name));
        let pv_exported = per_step("pv_exported", |name| VarDef::non_negative(name));
        let import_qty = per_step("import_qty", |name| VarDef::non_negative(name));
        let export_qty = per_step("export_qty", |name| VarDef::non_negative(name));
        let grid_direction = per_step("grid_direction", |name| VarDef::binary(name));

        let mut per_vehicle = |name: &str, make: fn(String) -> VarDef| -> Vec<VarId> {
            (0..n)
                .map(|v| program.add_variable(make(format!("{name}[{v}]"))))
                .collect()
        };
        let deviation_pos = per_vehicle("deviation_pos", |name| VarDef::non_negative(name));
        let deviation_neg = per_vehicle("deviation_neg", |name| VarDef::non_negative(name));
        let penalty = per_vehicle("penalty", |name| VarDef::free(name));

        ModelVariables {
            num_vehicles: n,
            horizon: h,
            charge_power,
            soc,
            pv_used,
            pv_exported,
            import_qty,
            export_qty,
            grid_direction,
            deviation_pos,
            deviation_neg,
            penalty,
        }
    }

    fn set_objective(
        &self,
        program: &mut LinearProgram,
        vars: &ModelVariables,
        request: &ValidatedRequest,
    ) {
        let mut objective = LinearExpr::new();
        for (t, step) in request.horizon.steps().iter().enumerate() {
            objective.push(vars.import_qty(t), step.import_price * TIME_STEP_HOURS);
            objective.push(vars.export_qty(t), -step.export_price * TIME_STEP_HOURS);
        }
        for v in 0..vars.num_vehicles() {
            objective.push(vars.penalty(v), self.params.trade_off_coefficient);
        }
        program.objective = objective;
    }

    fn add_grid_constraints(
        &self,
        program: &mut LinearProgram,
        vars: &ModelVariables,
        request: &ValidatedRequest,
    ) {
        let grid_capacity = request.grid_capacity_kw;

        for (t, step) in request.horizon.steps().iter().enumerate() {
            // import + pv_used - export - Σ charge = 0
            let mut balance = LinearExpr::term(vars.import_qty(t), 1.0)
                .add_term(vars.pv_used(t), 1.0)
                .add_term(vars.export_qty(t), -1.0);
            for v in 0..vars.num_vehicles() {
                balance.push(vars.charge_power(v, t), -1.0);
            }
            program.add_constraint(
                format!("energy_balance[{t}]"),
                balance,
                ConstraintSense::Eq,
                0.0,
            );

            program.add_constraint(
                format!("pv_split[{t}]"),
                LinearExpr::term(vars.pv_exported(t), 1.0).add_term(vars.pv_used(t), 1.0),
                ConstraintSense::Eq,
                step.pv_forecast_kw,
            );

            // import <= cap·dir
            program.add_constraint(
                format!("import_limit[{t}]"),
                LinearExpr::term(vars.import_qty(t), 1.0)
                    .add_term(vars.grid_direction(t), -grid_capacity),
                ConstraintSense::Le,
                0.0,
            );

            // export <= cap·(1 - dir)
            program.add_constraint(
                format!("export_limit[{t}]"),
                LinearExpr::term(vars.export_qty(t), 1.0)
                    .add_term(vars.grid_direction(t), grid_capacity),
                ConstraintSense::Le,
                grid_capacity,
            );
        }
    }

    fn add_vehicle_constraints(
        &self,
        program: &mut LinearProgram,
        vars: &ModelVariables,
        request: &ValidatedRequest,
        v: usize,
        vehicle: &Vehicle,
    ) {
        let h = vars.horizon();
        let a = vehicle.arrival_offset(request.current_time);
        let d = vehicle.departure_offset(request.current_time);
        let soc_per_kw = self.params.efficiency * TIME_STEP_HOURS / vehicle.capacity_kwh;

        for t in 0..h {
            program.add_constraint(
                format!("power_limit[{v},{t}]"),
                LinearExpr::term(vars.charge_power(v, t), 1.0),
                ConstraintSense::Le,
                vehicle.max_charging_power_kw,
            );
        }

        for i in 0..h {
            let soc = vars.soc(v, i);
            let name = format!("soc_dynamics[{v},{i}]");
            match soc_transition(i as i64, a, d, vehicle.is_connected()) {
                SocTransition::Anchor { charge } => {
                    let mut expr = LinearExpr::term(soc, 1.0);
                    if charge {
                        expr.push(vars.charge_power(v, i), -soc_per_kw);
                    }
                    program.add_constraint(name, expr, ConstraintSense::Eq, vehicle.arrival_soc);
                }
                SocTransition::Hold => {
                    program.add_constraint(
                        name,
                        LinearExpr::term(soc, 1.0).add_term(vars.soc(v, i - 1), -1.0),
                        ConstraintSense::Eq,
                        0.0,
                    );
                }
                SocTransition::Accumulate => {
                    program.add_constraint(
                        name,
                        LinearExpr::term(soc, 1.0)
                            .add_term(vars.soc(v, i - 1), -1.0)
                            .add_term(vars.charge_power(v, i), -soc_per_kw),
                        ConstraintSense::Eq,
                        0.0,
                    );
                }
            }
        }

        let pos = vars.deviation_pos(v);
        let neg = vars.deviation_neg(v);
        let departs_in_horizon = d >= 0 && (d as usize) < h;
        if departs_in_horizon {
            // pos - neg = soc[v,d] - departure_soc
            program.add_constraint(
                format!("departure_deviation[{v}]"),
                LinearExpr::term(pos, 1.0)
                    .add_term(neg, -1.0)
                    .add_term(vars.soc(v, d as usize), -1.0),
                ConstraintSense::Eq,
                -vehicle.departure_soc,
            );
            if self.params.enforce_departure_target {
                program.add_constraint(
                    format!("departure_target[{v}]"),
                    LinearExpr::term(neg, 1.0),
                    ConstraintSense::Eq,
                    0.0,
                );
            }
        } else {
            program.add_constraint(
                format!("departure_deviation[{v}]"),
                LinearExpr::term(pos, 1.0).add_term(neg, 1.0),
                ConstraintSense::Eq,
                0.0,
            );
        }

        let coefficient = vehicle.penalty_coefficient();
        program.add_constraint(
            format!("penalty_link[{v}]"),
            LinearExpr::term(vars.penalty(v), 1.0)
                .add_term(pos, -coefficient)
                .add_term(neg, -coefficient),
            ConstraintSense::Eq,
            0.0,
        );
    }
}
