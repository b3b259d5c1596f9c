//! Single constant-rate movements of the turret
//!
//! A movement plan is a time contiguous sequence of [`SingleMovement`]s. Within
//! a movement the yaw axis turns at a constant rate and the pitch axis moves
//! towards a single end position.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

use serde::Serialize;

use util::time::signed_secs_between;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One constant-rate segment of a movement plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleMovement {
    /// When the segment started executing, `None` if it hasn't started yet.
    pub start: Option<Instant>,

    /// Planned (or, once completed, actual) length of the segment. `None`
    /// for the unbounded search segment.
    pub duration: Option<Duration>,

    /// Units: radians/second
    pub yaw_rate_rads: f64,

    /// Pitch to reach by the end of the segment.
    ///
    /// Units: radians
    pub ending_pitch_rad: f64,

    /// Whether the turret is expected to be aimed at the target by the end of
    /// the segment, in which case the valve is opened.
    pub on_target: bool,
}

/// Serialisable form of a [`SingleMovement`], with times given relative to an
/// epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovementRecord {
    /// Units: seconds since epoch
    pub start_s: Option<f64>,

    /// Units: seconds
    pub duration_s: Option<f64>,

    /// Units: radians/second
    pub yaw_rate_rads: f64,

    /// Units: radians
    pub ending_pitch_rad: f64,

    pub on_target: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SingleMovement {
    /// A planned segment which hasn't started yet.
    pub fn planned(
        duration: Duration,
        yaw_rate_rads: f64,
        ending_pitch_rad: f64,
        on_target: bool,
    ) -> Self {
        Self {
            start: None,
            duration: Some(duration),
            yaw_rate_rads,
            ending_pitch_rad,
            on_target,
        }
    }

    /// An unbounded segment turning at the search rate with the gun level.
    pub fn search(yaw_rate_rads: f64) -> Self {
        Self {
            start: None,
            duration: None,
            yaw_rate_rads,
            ending_pitch_rad: 0.0,
            on_target: false,
        }
    }

    /// Time at which the segment will end, if it has started and is bounded.
    pub fn end(&self) -> Option<Instant> {
        match (self.start, self.duration) {
            (Some(s), Some(d)) => s.checked_add(d),
            _ => None,
        }
    }

    /// Convert into a record relative to `epoch`.
    pub fn to_record(&self, epoch: Instant) -> MovementRecord {
        MovementRecord {
            start_s: self.start.map(|s| signed_secs_between(epoch, s)),
            duration_s: self.duration.map(|d| d.as_secs_f64()),
            yaw_rate_rads: self.yaw_rate_rads,
            ending_pitch_rad: self.ending_pitch_rad,
            on_target: self.on_target,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_end_and_record() {
        let epoch = Instant::now();
        let mut m = SingleMovement::planned(Duration::from_millis(50), 0.5, 0.1, true);

        assert_eq!(m.end(), None);

        m.start = Some(epoch + Duration::from_secs(1));
        assert_eq!(m.end(), Some(epoch + Duration::from_millis(1050)));

        let r = m.to_record(epoch);
        assert_eq!(r.start_s, Some(1.0));
        assert_eq!(r.duration_s, Some(0.05));
        assert!(r.on_target);

        let s = SingleMovement::search(-0.3);
        assert_eq!(s.end(), None);
        assert_eq!(s.to_record(epoch).duration_s, None);
    }
}
