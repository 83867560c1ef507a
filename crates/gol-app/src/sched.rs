//! Periodic compute scheduler.
//!
//! Drives the automaton at a fixed period against absolute deadlines. Each
//! cycle waits for either the reset signal or the remaining time to the
//! deadline; the generation itself is computed into a private buffer with no
//! lock held, and only the commit copy is serialized with readers.

use gol_core::{Grid, ResetSignal, SharedBoard};
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::console::Console;
use crate::cprintln;

/// Advances an absolute deadline by one period.
///
/// Deadlines are derived from the previous target, not from `now`, so cycle
/// jitter does not accumulate as drift. An overrun clamps the next deadline
/// to `now` instead of going negative: the next cycle fires immediately and
/// no attempt is made to catch up multiple missed periods.
pub fn next_deadline(previous: Instant, period: Duration, now: Instant) -> Instant {
    let target = previous + period;
    if target < now { now } else { target }
}

/// The compute task. Owns the private working buffers and the RNG used for
/// reseeding; shares the board, reset signal, and console with other tasks.
pub struct Scheduler {
    board: Arc<SharedBoard>,
    reset: Arc<ResetSignal>,
    console: Arc<Console>,
    rng: SmallRng,
    period: Duration,
    current: Grid,
    working: Grid,
}

impl Scheduler {
    pub fn new(
        board: Arc<SharedBoard>,
        reset: Arc<ResetSignal>,
        console: Arc<Console>,
        rng: SmallRng,
        period: Duration,
    ) -> Self {
        let current = board.new_scratch();
        let working = board.new_scratch();
        Self {
            board,
            reset,
            console,
            rng,
            period,
            current,
            working,
        }
    }

    /// One computation cycle: next generation into the private buffer, then
    /// commit — unless a reset arrived first, in which case the computed
    /// generation is discarded and the reset wins. Returns whether a commit
    /// happened.
    pub fn step_once(&mut self) -> bool {
        self.board.snapshot_into(&mut self.current);
        self.current.step_into(&mut self.working);
        if self.reset.take() {
            self.apply_reset();
            return false;
        }
        self.board.commit(&self.working);
        true
    }

    fn apply_reset(&mut self) {
        let alive = self.board.reset(&mut self.rng);
        debug!(alive, generation = self.board.generation(), "board reseeded");
        cprintln!(self.console, "Game restarted: {alive} cells alive");
    }

    /// Runs until `running` clears. A missed deadline only lowers the
    /// effective rate; it is never an error.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            period_ms = self.period.as_millis() as u64,
            "compute task started"
        );
        let mut deadline = Instant::now() + self.period;
        while running.load(Ordering::Relaxed) {
            let wait = deadline.saturating_duration_since(Instant::now());
            if self.reset.wait_timeout(wait) {
                // Reset consumes the cycle; no generation is computed.
                self.apply_reset();
            } else {
                self.step_once();
            }
            deadline = next_deadline(deadline, self.period, Instant::now());
        }
        info!("compute task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(100);

    #[test]
    fn deadline_advances_from_previous_target() {
        let base = Instant::now();
        let next = next_deadline(base, PERIOD, base + Duration::from_millis(30));
        assert_eq!(next, base + PERIOD);
    }

    #[test]
    fn overrun_clamps_deadline_to_now() {
        let base = Instant::now();
        let late = base + Duration::from_millis(250);
        let next = next_deadline(base, PERIOD, late);
        // Fires immediately rather than scheduling into the past.
        assert_eq!(next, late);
        assert_eq!(next.saturating_duration_since(late), Duration::ZERO);
    }

    #[test]
    fn on_time_cycles_do_not_drift() {
        let base = Instant::now();
        let mut deadline = base;
        for _ in 0..5 {
            deadline = next_deadline(deadline, PERIOD, deadline + Duration::from_millis(1));
        }
        assert_eq!(deadline, base + PERIOD * 5);
    }
}
