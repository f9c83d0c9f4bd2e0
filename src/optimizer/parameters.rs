use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables of the charging formulation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelParameters {
    /// Fixed charging efficiency applied to every kWh drawn
    pub efficiency: f64,

    /// Weight of the service penalty against energy cost in the objective
    pub trade_off_coefficient: f64,

    /// Upper bound on every SoC variable (`None` leaves SoC unbounded above)
    pub max_soc: Option<f64>,

    /// Forbid any shortfall at departure instead of penalising it.
    /// Makes the program infeasible when a target cannot be reached.
    pub enforce_departure_target: bool,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            efficiency: 0.9275,
            trade_off_coefficient: 500.0,
            max_soc: None,
            enforce_departure_target: false,
        }
    }
}

impl ModelParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(ConfigError::InvalidParameter(format!(
                "efficiency must be in (0, 1], got {}",
                self.efficiency
            )));
        }
        if !self.trade_off_coefficient.is_finite() || self.trade_off_coefficient < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "trade_off_coefficient must be finite and non-negative, got {}",
                self.trade_off_coefficient
            )));
        }
        if let Some(max_soc) = self.max_soc {
            if !max_soc.is_finite() || max_soc <= 0.0 {
                return Err(ConfigError::InvalidParameter(format!(
                    "max_soc must be positive, got {max_soc}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = ModelParameters::default();
        assert_eq!(params.efficiency, 0.9275);
        assert_eq!(params.trade_off_coefficient, 500.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_efficiency() {
        let params = ModelParameters {
            efficiency: 1.2,
            ..ModelParameters::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter(_))
        ));
    }
}
