//! The live movement plan
//!
//! The plan is a time contiguous sequence of movements split by a cursor into
//! completed history, the single executing movement, and pending movements
//! terminated by an unbounded search movement. It has two mutation entry
//! points: the planning side replaces the pending suffix with
//! [`MovementPlan::submit`], and the execution side moves the cursor with
//! [`MovementPlan::advance`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::movement::{MovementRecord, SingleMovement};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MovementPlan {
    segments: VecDeque<SingleMovement>,

    /// Index of the executing movement.
    cursor: usize,

    /// Incremented on every submit.
    generation: u64,

    /// Incremented on every advance, identifies the executing movement.
    advances: u64,

    /// Start of the first movement ever executed.
    epoch: Instant,

    /// Total duration of completed movements removed from history.
    trimmed: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MovementPlan {
    /// Create a plan which starts searching at `epoch`.
    pub fn new(epoch: Instant, search_speed_rads: f64) -> Self {
        let mut search = SingleMovement::search(search_speed_rads);
        search.start = Some(epoch);

        let mut segments = VecDeque::new();
        segments.push_back(search);

        Self {
            segments,
            cursor: 0,
            generation: 0,
            advances: 0,
            epoch,
            trimmed: Duration::from_secs(0),
        }
    }

    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of times the cursor has moved.
    ///
    /// Unchanged for as long as the same movement is executing, so a plan
    /// computed against [`MovementPlan::current`] is only valid to submit
    /// while this value is the same as when the movement was copied.
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// The executing movement.
    pub fn current(&self) -> &SingleMovement {
        &self.segments[self.cursor]
    }

    /// Time at which the executing movement is due to end, if bounded.
    pub fn current_deadline(&self) -> Option<Instant> {
        self.current().end()
    }

    /// True if the executing movement is the last in the plan.
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.segments.len()
    }

    pub fn completed(&self) -> impl Iterator<Item = &SingleMovement> {
        self.segments.iter().take(self.cursor)
    }

    pub fn pending(&self) -> impl Iterator<Item = &SingleMovement> {
        self.segments.iter().skip(self.cursor + 1)
    }

    /// Total duration of all completed movements, including trimmed ones.
    pub fn completed_duration(&self) -> Duration {
        self.completed()
            .filter_map(|m| m.duration)
            .fold(self.trimmed, |acc, d| acc + d)
    }

    /// Replace the pending movements with `future`, followed by a search
    /// movement continuing in the direction of the last movement.
    pub fn submit(&mut self, future: Vec<SingleMovement>, search_speed_rads: f64) {
        self.segments.truncate(self.cursor + 1);
        self.segments.extend(future.into_iter().map(|mut m| {
            m.start = None;
            m
        }));

        let heading = self
            .segments
            .back()
            .map(|m| m.yaw_rate_rads)
            .unwrap_or(search_speed_rads);
        self.segments
            .push_back(SingleMovement::search(search_speed_rads.copysign(heading)));

        self.generation += 1;
    }

    /// Complete the executing movement at `now` and start the next one.
    ///
    /// The completed movement's duration is set to the time it actually
    /// executed for. Returns the completed movement, or `None` if there is
    /// no movement to advance to.
    pub fn advance(&mut self, now: Instant) -> Option<SingleMovement> {
        if self.is_last() {
            return None;
        }

        let current = &mut self.segments[self.cursor];
        let start = current.start.unwrap_or(now);
        let now = now.max(start);
        current.duration = Some(now - start);
        let completed = *current;

        self.cursor += 1;
        self.advances += 1;
        self.segments[self.cursor].start = Some(now);

        Some(completed)
    }

    /// Point a pending search movement in the direction of the movement
    /// before it.
    ///
    /// Returns `true` if the search movement was updated. An executing search
    /// movement is left alone.
    pub fn refresh_search(&mut self, search_speed_rads: f64) -> bool {
        if self.is_last() {
            return false;
        }

        let n = self.segments.len();
        let heading = self.segments[n - 2].yaw_rate_rads;
        let last = &mut self.segments[n - 1];
        let rate = search_speed_rads.copysign(heading);

        if last.yaw_rate_rads == rate && last.duration.is_none() {
            return false;
        }

        *last = SingleMovement::search(rate);
        true
    }

    /// Remove completed movements which ended before `before`.
    ///
    /// Returns the number of movements removed.
    pub fn trim_history(&mut self, before: Instant) -> usize {
        let mut removed = 0;

        while self.cursor > 0 {
            match self.segments.front().and_then(|m| m.end().map(|e| (e, m.duration))) {
                Some((end, Some(d))) if end <= before => {
                    self.trimmed += d;
                    self.segments.pop_front();
                    self.cursor -= 1;
                    removed += 1;
                }
                _ => break,
            }
        }

        removed
    }

    /// Yaw the turret turned through between two instants.
    ///
    /// The executing movement is assumed to continue indefinitely, pending
    /// movements haven't happened yet, and trimmed history contributes
    /// nothing.
    ///
    /// Units: radians
    pub fn yaw_travelled(&self, early: Instant, late: Instant) -> f64 {
        if late <= early {
            return 0.0;
        }

        self.segments
            .iter()
            .take(self.cursor + 1)
            .enumerate()
            .filter_map(|(i, m)| {
                let start = m.start?;
                let end = if i < self.cursor { m.end() } else { None };

                let lo = early.max(start);
                let hi = match end {
                    Some(e) => late.min(e),
                    None => late,
                };

                if hi > lo {
                    Some(m.yaw_rate_rads * (hi - lo).as_secs_f64())
                } else {
                    None
                }
            })
            .sum()
    }

    /// Serialisable view of every movement in the plan.
    pub fn records(&self) -> Vec<MovementRecord> {
        self.segments
            .iter()
            .map(|m| m.to_record(self.epoch))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const P: Duration = Duration::from_millis(50);

    fn planned(rate: f64) -> SingleMovement {
        SingleMovement::planned(P, rate, 0.2, false)
    }

    #[test]
    fn test_initial_plan() {
        let epoch = Instant::now();
        let plan = MovementPlan::new(epoch, 0.3);

        assert_eq!(plan.current().start, Some(epoch));
        assert_eq!(plan.current().duration, None);
        assert_eq!(plan.current().yaw_rate_rads, 0.3);
        assert!(plan.is_last());
        assert_eq!(plan.generation(), 0);
        assert_eq!(plan.current_deadline(), None);
    }

    #[test]
    fn test_submit_and_advance() {
        let epoch = Instant::now();
        let mut plan = MovementPlan::new(epoch, 0.3);

        // Nothing to advance to yet
        assert!(plan.advance(epoch + P).is_none());
        assert_eq!(plan.advances(), 0);

        plan.submit(vec![planned(0.5), planned(-0.2)], 0.3);
        assert_eq!(plan.generation(), 1);
        assert_eq!(plan.pending().count(), 3);

        // Search follows the last heading
        let last = plan.pending().last().unwrap();
        assert_eq!(last.yaw_rate_rads, -0.3);
        assert_eq!(last.duration, None);

        // Early cut of the initial search movement
        let t1 = epoch + Duration::from_millis(120);
        let done = plan.advance(t1).unwrap();
        assert_eq!(plan.advances(), 1);
        assert_eq!(done.duration, Some(Duration::from_millis(120)));
        assert_eq!(plan.current().start, Some(t1));
        assert_eq!(plan.current().yaw_rate_rads, 0.5);
        assert_eq!(plan.current_deadline(), Some(t1 + P));

        // Replacing the pending suffix keeps history and the executing movement
        plan.submit(vec![planned(0.6)], 0.3);
        assert_eq!(plan.generation(), 2);
        assert_eq!(plan.advances(), 1);
        assert_eq!(plan.completed().count(), 1);
        assert_eq!(plan.current().yaw_rate_rads, 0.5);
        assert_eq!(plan.current().start, Some(t1));
        let pending: Vec<f64> = plan.pending().map(|m| m.yaw_rate_rads).collect();
        assert_eq!(pending, vec![0.6, 0.3]);
    }

    #[test]
    fn test_refresh_search() {
        let epoch = Instant::now();
        let mut plan = MovementPlan::new(epoch, 0.3);

        // Executing search movements aren't touched
        assert!(!plan.refresh_search(0.3));

        plan.submit(vec![planned(-0.5)], 0.3);
        assert!(!plan.refresh_search(0.3));

        // A different speed updates the pending search movement
        assert!(plan.refresh_search(0.1));
        assert_eq!(plan.pending().last().unwrap().yaw_rate_rads, -0.1);
    }

    #[test]
    fn test_elapsed_time_invariant() {
        let mut rng = StdRng::seed_from_u64(11);
        let epoch = Instant::now();
        let mut plan = MovementPlan::new(epoch, 0.3);
        let mut now = epoch;

        for _ in 0..500 {
            now += Duration::from_micros(rng.gen_range(0..80_000));

            if rng.gen_bool(0.3) {
                let n = rng.gen_range(0..5);
                plan.submit((0..n).map(|_| planned(rng.gen_range(-1.0..1.0))).collect(), 0.3);
            } else {
                plan.advance(now);
            }

            if rng.gen_bool(0.1) {
                plan.trim_history(now - Duration::from_millis(200));
            }

            let start = plan.current().start.unwrap();
            assert_eq!(plan.completed_duration() + (now - start), now - epoch);

            // History is contiguous
            let mut expected = epoch + plan.trimmed;
            for m in plan.completed() {
                assert_eq!(m.start, Some(expected));
                expected = m.end().unwrap();
            }
            assert_eq!(plan.current().start, Some(expected));
        }
    }

    #[test]
    fn test_trim_history() {
        let epoch = Instant::now();
        let mut plan = MovementPlan::new(epoch, 0.3);

        plan.submit(vec![planned(0.1), planned(0.2), planned(0.3)], 0.3);
        plan.advance(epoch + P);
        plan.advance(epoch + 2 * P);
        plan.advance(epoch + 3 * P);
        assert_eq!(plan.completed().count(), 3);

        assert_eq!(plan.trim_history(epoch + 2 * P), 2);
        assert_eq!(plan.advances(), 3);
        assert_eq!(plan.completed().count(), 1);
        assert_eq!(plan.current().yaw_rate_rads, 0.3);
        assert_eq!(plan.completed_duration(), 3 * P);

        // Trimmed history contributes no yaw
        assert_abs_diff_eq!(
            plan.yaw_travelled(epoch, epoch + 3 * P),
            0.2 * 0.05,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_yaw_travelled() {
        let epoch = Instant::now();
        let mut plan = MovementPlan::new(epoch, 0.0);

        plan.submit(vec![planned(1.0), planned(-0.5)], 0.3);
        plan.advance(epoch + P);
        plan.advance(epoch + 2 * P);

        // Whole of the first planned movement
        assert_abs_diff_eq!(plan.yaw_travelled(epoch, epoch + 2 * P), 0.05, epsilon = 1e-12);

        // Half of it
        assert_abs_diff_eq!(
            plan.yaw_travelled(epoch + P + P / 2, epoch + 2 * P),
            0.025,
            epsilon = 1e-12
        );

        // The executing movement extends past its planned end
        assert_abs_diff_eq!(
            plan.yaw_travelled(epoch + 2 * P, epoch + 6 * P),
            -0.5 * 0.2,
            epsilon = 1e-12
        );

        // Empty and reversed intervals
        assert_eq!(plan.yaw_travelled(epoch + P, epoch + P), 0.0);
        assert_eq!(plan.yaw_travelled(epoch + 2 * P, epoch + P), 0.0);
    }
}
