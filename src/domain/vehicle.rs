use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Whether the vehicle is plugged in at the start of the horizon
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

/// One EV of the fleet as seen by the planner.
///
/// Times are absolute integer hours on the same clock as the planner's
/// `current_time`; a departure on the next day is expressed as `hour + 24`.
/// SoC values are fractions of capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    /// Usable battery capacity (kWh)
    pub capacity_kwh: f64,

    /// Maximum charging power the vehicle accepts (kW)
    pub max_charging_power_kw: f64,

    /// Urgency / price coefficient weighting this vehicle's service penalty
    pub price: f64,

    /// Hour the vehicle arrives (or arrived)
    pub arrival_time: i64,

    /// SoC on arrival
    pub arrival_soc: f64,

    /// Hour the vehicle leaves
    pub departure_time: i64,

    /// SoC the driver expects at departure
    pub departure_soc: f64,

    /// Plug state at the start of the horizon; an absent field means unplugged
    #[serde(default = "state_when_absent")]
    pub state: ConnectionState,
}

fn state_when_absent() -> ConnectionState {
    debug!("vehicle record has no state; treating it as disconnected");
    ConnectionState::default()
}

impl Vehicle {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Offset of the arrival step inside a horizon starting at `current_time`
    pub fn arrival_offset(&self, current_time: i64) -> i64 {
        self.arrival_time - current_time
    }

    /// Offset of the departure step inside a horizon starting at `current_time`
    pub fn departure_offset(&self, current_time: i64) -> i64 {
        self.departure_time - current_time
    }

    pub fn dwell_hours(&self) -> f64 {
        (self.departure_time - self.arrival_time) as f64
    }

    /// Weight applied to the absolute SoC deviation at departure:
    /// dwell time divided by capacity, times the vehicle's price.
    pub fn penalty_coefficient(&self) -> f64 {
        self.dwell_hours() / self.capacity_kwh * self.price
    }

    /// Validate the record for sanity before it reaches the model
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidVehicle {
            index,
            reason: reason.to_string(),
        };

        let numeric = [
            ("capacity_kwh", self.capacity_kwh),
            ("max_charging_power_kw", self.max_charging_power_kw),
            ("price", self.price),
            ("arrival_soc", self.arrival_soc),
            ("departure_soc", self.departure_soc),
        ];
        if let Some((field, _)) = numeric.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(&format!("{field} must be finite")));
        }

        if self.capacity_kwh <= 0.0 {
            return Err(invalid("capacity_kwh must be positive"));
        }
        if self.max_charging_power_kw <= 0.0 {
            return Err(invalid("max_charging_power_kw must be positive"));
        }
        if self.price < 0.0 {
            return Err(invalid("price cannot be negative"));
        }
        if self.arrival_soc < 0.0 || self.departure_soc < 0.0 {
            return Err(invalid("state of charge cannot be negative"));
        }
        if self.departure_time < self.arrival_time {
            return Err(invalid("departure_time precedes arrival_time"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> Vehicle {
        Vehicle {
            capacity_kwh: 40.0,
            max_charging_power_kw: 10.0,
            price: 1.0,
            arrival_time: 8,
            arrival_soc: 0.2,
            departure_time: 11,
            departure_soc: 0.8,
            state: ConnectionState::Connected,
        }
    }

    #[test]
    fn test_offsets_relative_to_current_time() {
        let ev = vehicle();
        assert_eq!(ev.arrival_offset(8), 0);
        assert_eq!(ev.departure_offset(8), 3);
        assert_eq!(ev.arrival_offset(10), -2);
        assert_eq!(ev.departure_offset(12), -1);
    }

    #[test]
    fn test_penalty_coefficient() {
        // 3h dwell / 40kWh * 1.0
        assert!((vehicle().penalty_coefficient() - 0.075).abs() < 1e-12);
    }

    #[test]
    fn test_validation() {
        assert!(vehicle().validate(0).is_ok());

        let mut ev = vehicle();
        ev.capacity_kwh = 0.0;
        assert!(matches!(
            ev.validate(3),
            Err(ConfigError::InvalidVehicle { index: 3, .. })
        ));

        let mut ev = vehicle();
        ev.departure_time = 7;
        assert!(ev.validate(0).is_err());

        let mut ev = vehicle();
        ev.arrival_soc = f64::NAN;
        assert!(ev.validate(0).is_err());
    }

    #[test]
    fn test_state_defaults_to_disconnected() {
        let mut json = serde_json::json!({
            "capacity_kwh": 60.0,
            "max_charging_power_kw": 11.0,
            "price": 0.5,
            "arrival_time": 18,
            "arrival_soc": 0.3,
            "departure_time": 31,
            "departure_soc": 0.9
        });
        let ev: Vehicle = serde_json::from_value(json.clone()).unwrap();
        assert!(!ev.is_connected());
        assert_eq!(ev.state, state_when_absent());

        json["state"] = "connected".into();
        let ev: Vehicle = serde_json::from_value(json.clone()).unwrap();
        assert!(ev.is_connected());

        // Every other field stays mandatory
        json.as_object_mut().unwrap().remove("arrival_soc");
        assert!(serde_json::from_value::<Vehicle>(json).is_err());
    }
}
