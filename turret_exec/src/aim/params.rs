//! Parameters for the ballistic solver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical parameters of the water jet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallisticParams {
    /// Speed of the water leaving the nozzle.
    ///
    /// Units: meters/second
    pub launch_speed_ms: f64,

    /// Constant horizontal deceleration of the water due to air resistance.
    ///
    /// Units: meters/second^2
    #[serde(default)]
    pub drag_decel_ms2: f64,

    /// Units: meters/second^2
    #[serde(default = "default_gravity")]
    pub gravity_ms2: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BallisticParams {
    /// Check the parameters describe a physical jet.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.launch_speed_ms > 0.0) {
            return Err(format!(
                "launch_speed_ms must be positive, found {}",
                self.launch_speed_ms
            ));
        }
        if !(self.drag_decel_ms2 >= 0.0) {
            return Err(format!(
                "drag_decel_ms2 must not be negative, found {}",
                self.drag_decel_ms2
            ));
        }
        if !(self.gravity_ms2 > 0.0) {
            return Err(format!(
                "gravity_ms2 must be positive, found {}",
                self.gravity_ms2
            ));
        }

        Ok(())
    }
}

fn default_gravity() -> f64 {
    9.81
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p: BallisticParams = util::params::from_str("launch_speed_ms = 12.0").unwrap();
        assert_eq!(p.gravity_ms2, 9.81);
        assert_eq!(p.drag_decel_ms2, 0.0);
        assert!(p.validate().is_ok());

        let p = BallisticParams {
            launch_speed_ms: 0.0,
            ..p
        };
        assert!(p.validate().is_err());
    }
}
