//! Parameters for target selection

use serde::{Deserialize, Serialize};

/// Weights and references used to score candidate targets.
///
/// Each score term lies in `[-1, 1]` before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectorParams {
    /// Weight of the yaw term, which favours targets near the centre of the
    /// field of view.
    pub yaw_weight: f64,

    /// Weight of the distance term, which favours closer targets.
    pub distance_weight: f64,

    /// Weight of the closing speed term, which favours approaching targets.
    pub closing_speed_weight: f64,

    /// Closing speed which scores the maximum for the closing speed term.
    ///
    /// Units: meters/second
    pub ref_closing_speed_ms: f64,

    /// Added to the score of the target engaged in the previous planning
    /// cycle.
    #[serde(default)]
    pub continuity_bonus: f64,
}

impl SelectorParams {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.ref_closing_speed_ms > 0.0) {
            return Err(format!(
                "ref_closing_speed_ms must be positive, found {}",
                self.ref_closing_speed_ms
            ));
        }

        Ok(())
    }
}
