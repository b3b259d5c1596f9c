//! Stepper driver helpers
//!
//! Stepper motors become rough when the step frequency drops too low, so
//! drivers increase the microstep resolution at low speeds. Microstep numbers
//! are exponents: microstep `m` divides each whole step into `2^m` pulses.

/// Choose the microstep number for a given angular velocity.
///
/// The smallest available microstep number keeping the step frequency at or
/// above `min_step_freq_hz` is returned. If none is fine enough the largest
/// available number is used. Returns `None` if `available` is empty.
///
/// Units: `step_size_rad` in radians per whole step, `velocity_rads` in
/// radians/second.
pub fn choose_microstep(
    step_size_rad: f64,
    min_step_freq_hz: f64,
    velocity_rads: f64,
    available: &[u8],
) -> Option<u8> {
    let largest = available.iter().copied().max()?;

    if available.len() == 1 {
        return Some(largest);
    }

    // Stationary axes can't reach the minimum frequency at any resolution
    if velocity_rads == 0.0 {
        return Some(largest);
    }

    let desired = ((step_size_rad * min_step_freq_hz) / velocity_rads.abs())
        .log2()
        .ceil();

    Some(
        available
            .iter()
            .copied()
            .filter(|&m| f64::from(m) >= desired)
            .min()
            .unwrap_or(largest),
    )
}

/// Pulse frequency needed to drive at `velocity_rads` with microstep
/// `microstep`.
///
/// Units: hertz
pub fn step_frequency(step_size_rad: f64, microstep: u8, velocity_rads: f64) -> f64 {
    velocity_rads.abs() * f64::from(1u32 << microstep.min(31)) / step_size_rad
}

#[cfg(test)]
mod test {
    use super::*;

    const STEP: f64 = std::f64::consts::PI / 100.0;

    #[test]
    fn test_choose_microstep() {
        let all = [0, 1, 2, 3, 4, 5];

        // Fast enough for whole steps
        assert_eq!(choose_microstep(STEP, 100.0, 4.0, &all), Some(0));

        // Needs 2^3 = 8 microsteps: STEP * 100 / 0.5 = 6.28
        assert_eq!(choose_microstep(STEP, 100.0, 0.5, &all), Some(3));
        assert!(step_frequency(STEP, 3, 0.5) >= 100.0);
        assert!(step_frequency(STEP, 2, 0.5) < 100.0);

        // Direction doesn't matter
        assert_eq!(choose_microstep(STEP, 100.0, -0.5, &all), Some(3));

        // Too slow for any resolution
        assert_eq!(choose_microstep(STEP, 100.0, 1e-6, &all), Some(5));
        assert_eq!(choose_microstep(STEP, 100.0, 0.0, &all), Some(5));
    }

    #[test]
    fn test_restricted_microsteps() {
        // Only even numbers wired up
        let even = [0, 2, 4];
        assert_eq!(choose_microstep(STEP, 100.0, 0.5, &even), Some(4));
        assert_eq!(choose_microstep(STEP, 100.0, 1.0, &even), Some(2));

        assert_eq!(choose_microstep(STEP, 100.0, 0.5, &[1]), Some(1));
        assert_eq!(choose_microstep(STEP, 100.0, 0.5, &[]), None);
    }
}
