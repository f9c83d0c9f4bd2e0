//! Result Extractor: solved values -> charging setpoints and PV usage

use std::collections::BTreeMap;
use tracing::error;

use super::builder::BuiltModel;
use super::solver::SolvedProgram;
use crate::domain::{ChargingPlan, Vehicle};
use crate::error::PlannerError;

/// Slack accepted around [0, 1] before a fraction counts as a model defect
pub const FRACTION_TOLERANCE: f64 = 1e-6;

/// Normalise a solved charge power by the vehicle maximum.
///
/// Values within [`FRACTION_TOLERANCE`] of the unit interval are clamped
/// into it; anything farther out means the power limit was not enforced.
pub fn charge_fraction(power_kw: f64, max_power_kw: f64) -> Option<f64> {
    let fraction = power_kw / max_power_kw;
    if !fraction.is_finite()
        || fraction < -FRACTION_TOLERANCE
        || fraction > 1.0 + FRACTION_TOLERANCE
    {
        return None;
    }
    Some(fraction.clamp(0.0, 1.0))
}

/// PV power used on site, clamped at zero within [`FRACTION_TOLERANCE`]
pub fn pv_usage(pv_used_kw: f64) -> Option<f64> {
    if !pv_used_kw.is_finite() || pv_used_kw < -FRACTION_TOLERANCE {
        return None;
    }
    Some(pv_used_kw.max(0.0))
}

/// Build the caller-facing plan from an optimal solve
pub fn extract_plan(
    model: &BuiltModel,
    solved: &SolvedProgram,
    vehicles: &[Vehicle],
) -> Result<ChargingPlan, PlannerError> {
    let vars = &model.vars;
    let h = vars.horizon();

    let mut charge_fractions = BTreeMap::new();
    for (v, vehicle) in vehicles.iter().enumerate() {
        let mut fractions = Vec::with_capacity(h);
        for t in 0..h {
            let power = solved.value(vars.charge_power(v, t));
            let fraction = charge_fraction(power, vehicle.max_charging_power_kw).ok_or_else(|| {
                error!(
                    vehicle = v,
                    step = t,
                    power_kw = power,
                    max_kw = vehicle.max_charging_power_kw,
                    "charging power outside the vehicle limit"
                );
                PlannerError::Extraction(format!(
                    "vehicle {v} step {t}: charge power {power} kW outside [0, {}] kW",
                    vehicle.max_charging_power_kw
                ))
            })?;
            fractions.push(fraction);
        }
        charge_fractions.insert(v, fractions);
    }

    let pv_used_kw = (0..h)
        .map(|t| {
            let used = solved.value(vars.pv_used(t));
            pv_usage(used).ok_or_else(|| {
                error!(step = t, pv_used_kw = used, "negative PV usage in solution");
                PlannerError::Extraction(format!("step {t}: PV used {used} kW is negative"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChargingPlan {
        charge_fractions,
        pv_used_kw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionState, Horizon, ValidatedRequest};
    use crate::optimizer::{ModelBuilder, ModelParameters};

    fn fixture() -> (BuiltModel, Vec<Vehicle>) {
        let vehicles = vec![Vehicle {
            capacity_kwh: 40.0,
            max_charging_power_kw: 10.0,
            price: 1.0,
            arrival_time: 0,
            arrival_soc: 0.2,
            departure_time: 1,
            departure_soc: 0.8,
            state: ConnectionState::Connected,
        }];
        let request = ValidatedRequest {
            horizon: Horizon::from_series(2, &[3.0, 4.0], &[0.2; 2], &[0.1; 2]).unwrap(),
            vehicles: vehicles.clone(),
            grid_capacity_kw: 20.0,
            current_time: 0,
        };
        let params = ModelParameters::default();
        (ModelBuilder::new(&params).build(&request), vehicles)
    }

    fn solved_with(model: &BuiltModel, assign: &[(crate::optimizer::VarId, f64)]) -> SolvedProgram {
        let mut values = vec![0.0; model.program.variables.len()];
        for (id, value) in assign {
            values[id.0] = *value;
        }
        SolvedProgram::new(values, 0.0)
    }

    #[test]
    fn test_charge_fraction_clamps_noise() {
        assert_eq!(charge_fraction(10.0 + 1e-9, 10.0), Some(1.0));
        assert_eq!(charge_fraction(-1e-9, 10.0), Some(0.0));
        assert_eq!(charge_fraction(5.0, 10.0), Some(0.5));
        assert_eq!(charge_fraction(10.5, 10.0), None);
        assert_eq!(charge_fraction(1.0, 0.0), None);
    }

    #[test]
    fn test_extracts_fractions_and_pv() {
        let (model, vehicles) = fixture();
        let solved = solved_with(
            &model,
            &[
                (model.vars.charge_power(0, 0), 10.0),
                (model.vars.charge_power(0, 1), 2.5),
                (model.vars.pv_used(0), 3.0),
                (model.vars.pv_used(1), 2.5),
            ],
        );

        let plan = extract_plan(&model, &solved, &vehicles).unwrap();
        assert_eq!(plan.charge_fractions[&0], vec![1.0, 0.25]);
        assert_eq!(plan.fraction(0, 1), Some(0.25));
        assert_eq!(plan.fraction(0, 2), None);
        assert_eq!(plan.fraction(1, 0), None);
        assert_eq!(plan.pv_used_kw, vec![3.0, 2.5]);
        assert_eq!(plan.horizon_len(), 2);

        // Pure function of the solved state
        assert_eq!(extract_plan(&model, &solved, &vehicles).unwrap(), plan);
    }

    #[test]
    fn test_pv_usage_tolerance() {
        assert_eq!(pv_usage(-1e-9), Some(0.0));
        assert_eq!(pv_usage(4.5), Some(4.5));
        assert_eq!(pv_usage(-0.5), None);
        assert_eq!(pv_usage(f64::NAN), None);
    }

    #[test]
    fn test_negative_pv_usage_is_an_error() {
        let (model, vehicles) = fixture();
        let solved = solved_with(&model, &[(model.vars.pv_used(1), -2.0)]);

        assert!(matches!(
            extract_plan(&model, &solved, &vehicles),
            Err(PlannerError::Extraction(msg)) if msg.contains("step 1")
        ));
    }

    #[test]
    fn test_out_of_range_power_is_an_error() {
        let (model, vehicles) = fixture();
        let solved = solved_with(&model, &[(model.vars.charge_power(0, 1), 12.0)]);

        assert!(matches!(
            extract_plan(&model, &solved, &vehicles),
            Err(PlannerError::Extraction(_))
        ));
    }
}
