//! Monotonically advancing simulation state, stepped on a time cadence.
//!
//! The stream computes at most one step ahead and never recomputes a produced
//! step: [`StateStream::drive`] advances at most once per call, no matter how
//! many step indices the elapsed time skipped over, and repeated calls with
//! the same elapsed time are no-ops.

use std::sync::Arc;

/// Explicit record replacing a thunk-based lazy infinite list: the realized
/// "now" value, the pure successor function, and the last forced step index.
pub struct StateStream<S> {
    current: S,
    step: Arc<dyn Fn(&S) -> S>,
    last_index: u64,
}

impl<S> StateStream<S> {
    pub fn new(initial: S, step: Arc<dyn Fn(&S) -> S>) -> Self {
        Self::starting_at(initial, step, 0)
    }

    /// A fresh stream whose cadence bookkeeping resumes at `index`. Used
    /// when a reseed policy rebuilds the stream mid-run: the replacement must
    /// not advance again on the next `drive` call for the same index.
    pub fn starting_at(initial: S, step: Arc<dyn Fn(&S) -> S>, index: u64) -> Self {
        Self {
            current: initial,
            step,
            last_index: index,
        }
    }

    pub fn current(&self) -> &S {
        &self.current
    }

    pub fn last_index(&self) -> u64 {
        self.last_index
    }

    /// Applies the step fn exactly once, replacing the current state.
    pub fn advance_once(&mut self) {
        self.current = (self.step)(&self.current);
    }

    /// Advances the stream if `elapsed_secs` has crossed into a new step.
    ///
    /// `step_index = floor(elapsed_secs / step_duration)`; a non-finite or
    /// negative elapsed time (the very first scheduled callback may deliver
    /// one) indexes as 0 instead of propagating an error. When the index
    /// differs from the last recorded one the stream advances exactly once;
    /// skipped intermediate states are never backfilled. Returns the index.
    pub fn drive(&mut self, elapsed_secs: f64, step_duration: f64) -> u64 {
        let index = step_index(elapsed_secs, step_duration);
        if index != self.last_index {
            self.advance_once();
            self.last_index = index;
        }
        index
    }
}

pub fn step_index(elapsed_secs: f64, step_duration: f64) -> u64 {
    if !elapsed_secs.is_finite() || elapsed_secs < 0.0 || step_duration <= 0.0 {
        return 0;
    }
    (elapsed_secs / step_duration).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_stream(counter: Arc<AtomicUsize>) -> StateStream<u64> {
        StateStream::new(
            0,
            Arc::new(move |n| {
                counter.fetch_add(1, Ordering::SeqCst);
                n + 1
            }),
        )
    }

    #[test]
    fn advance_applies_step_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = counting_stream(calls.clone());
        stream.advance_once();
        assert_eq!(*stream.current(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cadence_holds_within_a_step_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = counting_stream(calls.clone());
        for elapsed in [0.0, 1.0, 2.0, 3.0, 4.0] {
            assert_eq!(stream.drive(elapsed, 5.0), 0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(stream.drive(5.0, 5.0), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_drive_at_same_index_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = counting_stream(calls.clone());
        stream.drive(7.0, 5.0);
        let state_after_first = *stream.current();
        stream.drive(7.0, 5.0);
        assert_eq!(*stream.current(), state_after_first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn skipped_indices_are_not_backfilled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = counting_stream(calls.clone());
        // Jump straight to step 10; one advance, not ten.
        assert_eq!(stream.drive(50.0, 5.0), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*stream.current(), 1);
    }

    #[test]
    fn invalid_elapsed_defaults_to_index_zero() {
        assert_eq!(step_index(f64::NAN, 5.0), 0);
        assert_eq!(step_index(f64::INFINITY, 5.0), 0);
        assert_eq!(step_index(-3.0, 5.0), 0);
        assert_eq!(step_index(0.35, 0.1), 3);
    }
}
