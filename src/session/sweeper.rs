use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::SessionStore;

enum Command {
    SweepNow(Sender<usize>),
    Stop,
}

/// Handle to the background thread evicting expired sessions.
///
/// The thread wakes every `interval`, independent of the store TTL and of
/// [`SweeperHandle::sweep_now`] requests. Dropping the handle stops the
/// thread.
pub struct SweeperHandle {
    tx: Sender<Command>,
    thread: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl SweeperHandle {
    /// Start sweeping `store` every `interval`.
    pub fn spawn(store: Arc<SessionStore>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Command>();
        let ticks = Arc::new(AtomicU64::new(0));
        let tick_count = Arc::clone(&ticks);
        let thread = thread::Builder::new()
            .name("hiweb-session-sweeper".into())
            .spawn(move || {
                info!(interval_secs = interval.as_secs(), "session sweeper started");
                let mut deadline = Instant::now() + interval;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            store.sweep();
                            tick_count.fetch_add(1, Ordering::Relaxed);
                            deadline += interval;
                            // Skip ticks missed while a sweep overran.
                            let now = Instant::now();
                            if deadline < now {
                                deadline = now + interval;
                            }
                        }
                        Ok(Command::SweepNow(ack)) => {
                            let evicted = store.sweep();
                            let _ = ack.send(evicted);
                        }
                        Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("session sweeper stopped");
            });
        let thread = match thread {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(error = %e, "failed to spawn session sweeper");
                None
            }
        };
        Self { tx, thread, ticks }
    }

    /// Sweeps run by the interval timer so far, excluding
    /// [`sweep_now`](Self::sweep_now) requests.
    #[must_use]
    pub fn periodic_sweeps(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run exactly one sweep on the sweeper thread and wait for it.
    ///
    /// Returns the number of evicted records, or `None` if the sweeper is gone.
    pub fn sweep_now(&self) -> Option<usize> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.tx.send(Command::SweepNow(ack_tx)).ok()?;
        ack_rx.recv().ok()
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.tx.send(Command::Stop);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Claims, ManualClock};

    #[test]
    fn test_sweep_now_and_stop() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(SessionStore::with_clock(
            Duration::from_secs(5),
            clock.clone(),
        ));
        let sid = store.create(Claims::new());
        let sweeper = SweeperHandle::spawn(Arc::clone(&store), Duration::from_secs(3600));

        assert_eq!(sweeper.sweep_now(), Some(0));
        clock.advance(Duration::from_secs(6));
        assert_eq!(sweeper.sweep_now(), Some(1));
        assert!(store.get(&sid).is_none());
        sweeper.stop();
    }

    #[test]
    fn test_interval_wakes_sweeper() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(SessionStore::with_clock(Duration::ZERO, clock.clone()));
        store.create(Claims::new());
        clock.advance(Duration::from_secs(1));
        let _sweeper = SweeperHandle::spawn(Arc::clone(&store), Duration::from_millis(10));
        for _ in 0..200 {
            if store.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_now_does_not_postpone_interval() {
        let store = Arc::new(SessionStore::new(Duration::from_secs(3600)));
        let sweeper = SweeperHandle::spawn(Arc::clone(&store), Duration::from_millis(100));
        let started = Instant::now();

        // Requests arrive far more often than the interval.
        while started.elapsed() < Duration::from_millis(550) {
            assert_eq!(sweeper.sweep_now(), Some(0));
            thread::sleep(Duration::from_millis(10));
        }
        assert!(sweeper.periodic_sweeps() >= 2, "ticks: {}", sweeper.periodic_sweeps());
        sweeper.stop();
    }
}
