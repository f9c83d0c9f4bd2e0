//! Shared fixtures and solution checks for integration tests.
#![allow(dead_code)]

use fleet_charge_optimizer::config::DiagnosticsConfig;
use fleet_charge_optimizer::optimizer::{
    ChargePlanner, DiagnosticsSink, ModelParameters, PlanDetails, SolverAdapter,
};
use fleet_charge_optimizer::{ConnectionState, PlanRequest, Vehicle};
use std::collections::BTreeMap;
use std::path::Path;

/// Solver tolerance used when comparing solved values
pub const TOL: f64 = 1e-5;

/// 40 kWh / 10 kW vehicle, 20% -> 80%, connected
pub fn vehicle(arrival_time: i64, departure_time: i64) -> Vehicle {
    Vehicle {
        capacity_kwh: 40.0,
        max_charging_power_kw: 10.0,
        price: 1.0,
        arrival_time,
        arrival_soc: 0.2,
        departure_time,
        departure_soc: 0.8,
        state: ConnectionState::Connected,
    }
}

/// Request with flat prices and no PV starting at hour 8
pub fn request(vehicles: Vec<Vehicle>, horizon: usize) -> PlanRequest {
    PlanRequest {
        number_of_evs: vehicles.len(),
        control_horizon: horizon,
        grid_capacity_kw: 50.0,
        current_time: 8,
        forecast_pv: vec![0.0; horizon],
        import_price: vec![0.2; horizon],
        export_price: vec![0.2; horizon],
        vehicles,
        previous_soc: BTreeMap::new(),
    }
}

/// Planner on the default backend that never writes dumps
pub fn planner(params: ModelParameters) -> ChargePlanner {
    ChargePlanner::new(params, SolverAdapter::microlp(DiagnosticsSink::disabled()))
        .expect("valid parameters")
}

/// Planner writing fixed-name dumps into `dir`
pub fn planner_dumping_to(params: ModelParameters, dir: &Path) -> ChargePlanner {
    let diagnostics = DiagnosticsSink::from_config(&DiagnosticsConfig {
        dir: dir.to_path_buf(),
        ..DiagnosticsConfig::default()
    });
    ChargePlanner::new(params, SolverAdapter::microlp(diagnostics)).expect("valid parameters")
}

/// Assert the physical invariants every accepted solution must satisfy
pub fn assert_solution_invariants(details: &PlanDetails, request: &PlanRequest) {
    let vars = &details.model.vars;
    let solved = &details.solved;
    let h = vars.horizon();

    for row in &details.model.program.constraints {
        assert!(
            row.is_satisfied(solved.values(), TOL),
            "constraint {} violated",
            row.name
        );
    }

    for t in 0..h {
        let import = solved.value(vars.import_qty(t));
        let export = solved.value(vars.export_qty(t));
        let pv_used = solved.value(vars.pv_used(t));
        let charging: f64 = (0..vars.num_vehicles())
            .map(|v| solved.value(vars.charge_power(v, t)))
            .sum();

        assert!(
            (import + pv_used - export - charging).abs() < TOL,
            "energy balance broken at step {t}"
        );
        assert!(
            import < 1e-4 || export < 1e-4,
            "simultaneous import {import} and export {export} at step {t}"
        );
        assert!(
            (solved.value(vars.pv_exported(t)) - (request.forecast_pv[t] - pv_used)).abs() < TOL,
            "PV split broken at step {t}"
        );
    }

    for (v, vehicle) in request.vehicles.iter().enumerate() {
        for t in 0..h {
            let power = solved.value(vars.charge_power(v, t));
            assert!(power >= -TOL && power <= vehicle.max_charging_power_kw + TOL);
        }

        let a = vehicle.arrival_offset(request.current_time);
        for i in 1..h {
            if (i as i64) < a {
                assert!(
                    (solved.value(vars.soc(v, i)) - solved.value(vars.soc(v, i - 1))).abs() < TOL,
                    "SoC of vehicle {v} moved before arrival at step {i}"
                );
            }
        }

        let penalty = solved.value(vars.penalty(v));
        let deviation = solved.value(vars.deviation_pos(v)) + solved.value(vars.deviation_neg(v));
        assert!((penalty - vehicle.penalty_coefficient() * deviation).abs() < TOL);
    }

    for (v, fractions) in &details.plan.charge_fractions {
        assert_eq!(fractions.len(), h);
        assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)), "vehicle {v}");
    }
    assert_eq!(details.plan.pv_used_kw.len(), h);
}
