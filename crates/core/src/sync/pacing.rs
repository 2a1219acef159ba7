//! Frame pacing
//!
//! The host's frame source blocks until the peer signals execution so both
//! sides advance in lockstep. Execute signals carry a monotonically
//! increasing sequence number; waiters hand in the last sequence they saw so
//! a signal that lands before the wait is never lost.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Outcome of a pacing wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceEvent {
    /// The peer executed; carries the new sequence number
    Executed(u64),
    /// The peer went away, waiters must stop blocking
    Disconnected,
}

#[derive(Debug, Default)]
struct PacerState {
    disconnected: bool,
    execute_seq: u64,
}

/// Condition-variable gate between the peer's execute signal and the host's
/// frame step
#[derive(Debug, Default)]
pub struct FramePacer {
    state: Mutex<PacerState>,
    cv: Condvar,
}

impl FramePacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until an execute newer than `last_seen` arrives or the peer
    /// disconnects.
    pub fn wait_for_execute(&self, last_seen: u64) -> PaceEvent {
        let mut state = self.state.lock();
        loop {
            if state.disconnected {
                return PaceEvent::Disconnected;
            }
            if state.execute_seq > last_seen {
                return PaceEvent::Executed(state.execute_seq);
            }
            self.cv.wait(&mut state);
        }
    }

    /// Like [`wait_for_execute`] but gives up after `timeout`.
    ///
    /// [`wait_for_execute`]: FramePacer::wait_for_execute
    pub fn wait_for_execute_timeout(&self, last_seen: u64, timeout: Duration) -> Option<PaceEvent> {
        let mut state = self.state.lock();
        loop {
            if state.disconnected {
                return Some(PaceEvent::Disconnected);
            }
            if state.execute_seq > last_seen {
                return Some(PaceEvent::Executed(state.execute_seq));
            }
            if self.cv.wait_for(&mut state, timeout).timed_out() {
                return None;
            }
        }
    }

    pub fn notify_execute(&self) {
        let mut state = self.state.lock();
        state.execute_seq += 1;
        drop(state);
        self.cv.notify_all();
    }

    pub fn notify_disconnect(&self) {
        let mut state = self.state.lock();
        state.disconnected = true;
        drop(state);
        self.cv.notify_all();
    }

    /// Re-arm after a reconnect
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.disconnected = false;
        drop(state);
        self.cv.notify_all();
    }

    pub fn execute_seq(&self) -> u64 {
        self.state.lock().execute_seq
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_execute_before_wait_is_not_lost() {
        let pacer = FramePacer::new();
        pacer.notify_execute();
        assert_eq!(
            pacer.wait_for_execute_timeout(0, Duration::from_millis(10)),
            Some(PaceEvent::Executed(1))
        );
    }

    #[test]
    fn test_wait_sees_cross_thread_execute() {
        let pacer = Arc::new(FramePacer::new());
        let signaller = pacer.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            signaller.notify_execute();
        });
        assert_eq!(pacer.wait_for_execute(0), PaceEvent::Executed(1));
        handle.join().unwrap();
    }

    #[test]
    fn test_disconnect_releases_waiters() {
        let pacer = Arc::new(FramePacer::new());
        let signaller = pacer.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            signaller.notify_disconnect();
        });
        assert_eq!(pacer.wait_for_execute(0), PaceEvent::Disconnected);
        // once disconnected, waits return immediately
        assert_eq!(pacer.wait_for_execute(99), PaceEvent::Disconnected);
        handle.join().unwrap();

        pacer.reset();
        assert_eq!(
            pacer.wait_for_execute_timeout(99, Duration::from_millis(5)),
            None
        );
    }

    #[test]
    fn test_stale_sequence_waits() {
        let pacer = FramePacer::new();
        pacer.notify_execute();
        pacer.notify_execute();
        // already seen both executes, nothing new to wait on
        assert_eq!(
            pacer.wait_for_execute_timeout(2, Duration::from_millis(5)),
            None
        );
    }
}
