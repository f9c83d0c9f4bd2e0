use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Duration of one horizon step (hours)
pub const TIME_STEP_HOURS: f64 = 1.0;

/// Driving values of a single horizon step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HorizonStep {
    /// Import tariff (currency/kWh)
    pub import_price: f64,
    /// Export tariff (currency/kWh)
    pub export_price: f64,
    /// Forecast PV production (kW)
    pub pv_forecast_kw: f64,
}

/// The fixed-length look-ahead window of one solve
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Horizon {
    steps: Vec<HorizonStep>,
}

impl Horizon {
    /// Build a horizon of `len` steps from the raw forecast series.
    ///
    /// Each series must cover at least `len` steps; entries past the horizon
    /// are not part of this solve.
    pub fn from_series(
        len: usize,
        pv_forecast: &[f64],
        import_price: &[f64],
        export_price: &[f64],
    ) -> Result<Self, ConfigError> {
        if len == 0 {
            return Err(ConfigError::HorizonEmpty);
        }

        for (series, values) in [
            ("forecast_pv", pv_forecast),
            ("import_price", import_price),
            ("export_price", export_price),
        ] {
            if values.len() < len {
                return Err(ConfigError::SeriesTooShort {
                    series,
                    len: values.len(),
                    horizon: len,
                });
            }
            if values.len() > len {
                debug!(
                    series,
                    provided = values.len(),
                    horizon = len,
                    "series extends past the control horizon; trailing values not used"
                );
            }
            if let Some(index) = values[..len].iter().position(|v| !v.is_finite()) {
                return Err(ConfigError::NonFiniteValue { series, index });
            }
        }

        if let Some(index) = pv_forecast[..len].iter().position(|&pv| pv < 0.0) {
            return Err(ConfigError::NegativePv { index });
        }

        let steps = (0..len)
            .map(|t| HorizonStep {
                import_price: import_price[t],
                export_price: export_price[t],
                pv_forecast_kw: pv_forecast[t],
            })
            .collect();

        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, t: usize) -> &HorizonStep {
        &self.steps[t]
    }

    pub fn steps(&self) -> &[HorizonStep] {
        &self.steps
    }
}
