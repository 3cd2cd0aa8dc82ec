//! Joining worker threads with a deadline.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Join `handle` if its thread finishes within `timeout`.
///
/// A thread still running at the deadline (typically stuck in a handler) is
/// detached and `false` is returned.
pub(crate) fn join_within(handle: JoinHandle<()>, timeout: Duration, label: &str) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        let now = Instant::now();
        if now >= deadline {
            warn!("{} thread still busy after {:?}, detaching it", label, timeout);
            return false;
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
    if handle.join().is_err() {
        warn!("{} thread terminated with a panic", label);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn finished_thread_is_joined() {
        let handle = std::thread::spawn(|| {});
        assert!(join_within(handle, Duration::from_secs(5), "test"));
    }

    #[test]
    fn panicked_thread_still_counts_as_joined() {
        let handle = std::thread::spawn(|| panic!("worker bug"));
        assert!(join_within(handle, Duration::from_secs(5), "test"));
    }

    #[test]
    fn busy_thread_is_detached_at_the_deadline() {
        let (release_tx, release_rx) = bounded::<()>(1);
        let handle = std::thread::spawn(move || {
            let _ = release_rx.recv();
        });
        let started = Instant::now();
        assert!(!join_within(handle, Duration::from_millis(30), "test"));
        assert!(started.elapsed() < Duration::from_secs(2));
        release_tx.send(()).unwrap();
    }
}
