//! Quick poll: re-fetch results on a fixed cadence for a short window
//!
//! Right after an analysis request the backend usually needs a few seconds.
//! The quick poll fetches once immediately, then once per `interval` until
//! `window` has elapsed since it started. Elapsed time is checked after each
//! fetch+sleep cycle, so a slow backend stretches the cadence rather than
//! overlapping requests.
//!
//! Every sleep is a [`CancellationToken::wait_timeout`], so a poll can be
//! stopped mid-wait. [`Poller`] runs polls in the background and cancels the
//! previous one whenever a new one starts.

use crate::cancel::{CancellationSource, CancellationToken};
use crate::config::PollSchedule;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// What a finished poll did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Fetches issued
    pub cycles: u32,
    /// Fetches that failed
    pub failures: u32,
    pub cancelled: bool,
    /// The poll thread panicked before returning its counts
    pub panicked: bool,
    pub elapsed: Duration,
}

impl PollReport {
    /// At least one fetch ran and none of them succeeded
    pub fn all_failed(&self) -> bool {
        self.cycles > 0 && self.failures == self.cycles
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuickPoll {
    schedule: PollSchedule,
}

impl QuickPoll {
    pub fn new(schedule: PollSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> PollSchedule {
        self.schedule
    }

    /// Run in the calling thread. `fetch` returns `false` on a failed cycle;
    /// failures do not stop the poll.
    pub fn run<F>(&self, token: &CancellationToken, mut fetch: F) -> PollReport
    where
        F: FnMut() -> bool,
    {
        let start = Instant::now();
        let mut report = PollReport::default();
        info!(
            window_ms = self.schedule.window.as_millis() as u64,
            interval_ms = self.schedule.interval.as_millis() as u64,
            "quick poll started"
        );

        loop {
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }

            report.cycles += 1;
            if !fetch() {
                report.failures += 1;
            }

            if token.wait_timeout(self.schedule.interval) {
                report.cancelled = true;
                break;
            }
            if start.elapsed() >= self.schedule.window {
                break;
            }
        }

        report.elapsed = start.elapsed();
        info!(
            cycles = report.cycles,
            failures = report.failures,
            cancelled = report.cancelled,
            "quick poll finished"
        );
        report
    }

    /// Run on a background thread
    pub fn spawn<F>(&self, fetch: F) -> PollHandle
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let source = CancellationSource::new();
        let token = source.token();
        let poll = *self;
        let join = std::thread::spawn(move || poll.run(&token, fetch));
        PollHandle {
            source,
            join: Some(join),
        }
    }
}

/// A poll running on a background thread. Dropping the handle cancels it.
pub struct PollHandle {
    source: CancellationSource,
    join: Option<JoinHandle<PollReport>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.source.cancel();
    }

    /// Source that cancels this poll, for handing to another thread
    pub fn canceller(&self) -> CancellationSource {
        self.source.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Wait for the poll to end
    pub fn join(mut self) -> PollReport {
        match self.join.take().map(JoinHandle::join) {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                error!("quick poll thread panicked");
                PollReport {
                    panicked: true,
                    ..PollReport::default()
                }
            }
            None => PollReport::default(),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.source.cancel();
        }
    }
}

/// Keeps at most one background poll alive
#[derive(Default)]
pub struct Poller {
    poll: QuickPoll,
    current: Option<PollHandle>,
}

impl Poller {
    pub fn new(schedule: PollSchedule) -> Self {
        Self {
            poll: QuickPoll::new(schedule),
            current: None,
        }
    }

    /// Start a poll, cancelling the one in flight if any.
    ///
    /// The previous poll is joined first: a fetch it already issued finishes
    /// before the new poll's first fetch, never after.
    pub fn start<F>(&mut self, fetch: F) -> &PollHandle
    where
        F: FnMut() -> bool + Send + 'static,
    {
        if let Some(previous) = self.current.take() {
            if !previous.is_finished() {
                debug!("superseding running quick poll");
            }
            previous.cancel();
            let report = previous.join();
            debug!(cycles = report.cycles, "superseded poll stopped");
        }
        self.current.insert(self.poll.spawn(fetch))
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = &self.current {
            handle.cancel();
        }
    }

    /// Take ownership of the current poll, e.g. to join it
    pub fn take(&mut self) -> Option<PollHandle> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn fast() -> PollSchedule {
        PollSchedule {
            window: Duration::from_millis(120),
            interval: Duration::from_millis(40),
        }
    }

    // ==========================================================================
    // FOREGROUND POLL TESTS
    // ==========================================================================

    #[test]
    fn test_fetches_immediately_then_repeats() {
        let mut calls = 0;
        let report = QuickPoll::new(fast()).run(&CancellationSource::new().token(), || {
            calls += 1;
            true
        });

        assert_eq!(report.cycles, calls);
        assert!(report.cycles >= 2, "expected repeats, got {}", report.cycles);
        assert!(report.cycles <= 4, "too many cycles: {}", report.cycles);
        assert!(!report.cancelled);
        assert!(report.elapsed >= fast().window);
    }

    #[test]
    fn test_zero_window_still_fetches_once() {
        let schedule = PollSchedule { window: Duration::ZERO, interval: Duration::from_millis(5) };
        let report = QuickPoll::new(schedule).run(&CancellationSource::new().token(), || true);
        assert_eq!(report.cycles, 1);
    }

    #[test]
    fn test_failures_do_not_stop_poll() {
        let report = QuickPoll::new(fast()).run(&CancellationSource::new().token(), || false);
        assert!(report.cycles >= 2);
        assert_eq!(report.failures, report.cycles);
    }

    #[test]
    fn test_slow_fetch_bounds_total_time() {
        // Each fetch takes longer than the interval; the loop must not overlap
        // and must still end shortly after the window
        let schedule = PollSchedule { window: Duration::from_millis(150), interval: Duration::from_millis(20) };
        let report = QuickPoll::new(schedule).run(&CancellationSource::new().token(), || {
            std::thread::sleep(Duration::from_millis(60));
            true
        });
        assert!(report.cycles <= 3);
        assert!(report.elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_precancelled_token_skips_fetch() {
        let source = CancellationSource::new();
        source.cancel();
        let report = QuickPoll::new(fast()).run(&source.token(), || true);
        assert_eq!(report.cycles, 0);
        assert!(report.cancelled);
    }

    // ==========================================================================
    // BACKGROUND POLL TESTS
    // ==========================================================================

    #[test]
    fn test_spawned_poll_cancels_mid_sleep() {
        let schedule = PollSchedule { window: Duration::from_secs(30), interval: Duration::from_secs(10) };
        let handle = QuickPoll::new(schedule).spawn(|| true);
        std::thread::sleep(Duration::from_millis(50));
        handle.cancel();

        let report = handle.join();
        assert!(report.cancelled);
        assert_eq!(report.cycles, 1);
        assert!(report.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_poller_supersedes_previous() {
        let schedule = PollSchedule { window: Duration::from_secs(30), interval: Duration::from_secs(10) };
        let mut poller = Poller::new(schedule);

        let first_calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&first_calls);
        let first = poller
            .start(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })
            .canceller();

        std::thread::sleep(Duration::from_millis(30));
        poller.start(|| true);
        assert!(first.is_cancelled(), "starting a new poll must cancel the old one");

        poller.cancel();
        let second = poller.take().unwrap().join();
        assert!(second.cancelled);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_superseded_fetch_lands_before_new_poll() {
        let schedule = PollSchedule { window: Duration::from_secs(30), interval: Duration::from_secs(10) };
        let mut poller = Poller::new(schedule);
        let renders = Arc::new(Mutex::new(Vec::new()));

        let old = Arc::clone(&renders);
        poller.start(move || {
            std::thread::sleep(Duration::from_millis(300));
            old.lock().unwrap().push("old");
            true
        });
        std::thread::sleep(Duration::from_millis(50));

        let new = Arc::clone(&renders);
        poller.start(move || {
            new.lock().unwrap().push("new");
            true
        });
        std::thread::sleep(Duration::from_millis(50));
        poller.cancel();
        poller.take().unwrap().join();

        assert_eq!(*renders.lock().unwrap(), vec!["old", "new"]);
    }

    #[test]
    fn test_join_reports_panicked_poll() {
        let handle = QuickPoll::new(fast()).spawn(|| panic!("fetch blew up"));
        let report = handle.join();
        assert!(report.panicked);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_all_failed() {
        let failed = PollReport { cycles: 3, failures: 3, ..PollReport::default() };
        let partial = PollReport { cycles: 3, failures: 2, ..PollReport::default() };
        assert!(failed.all_failed());
        assert!(!partial.all_failed());
        assert!(!PollReport::default().all_failed());
    }
}
