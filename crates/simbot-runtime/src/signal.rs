//! [`Signal`] – a binary event flag shared between threads.
//!
//! A signal is either *set* or *clear*.  Threads can block until it becomes
//! set, optionally with a timeout, which makes it usable both as a pause
//! gate ("wait until resumed") and as an interruptible sleep ("sleep unless
//! stopped").

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Thread-safe binary flag with blocking waits.
#[derive(Debug, Default)]
pub struct Signal {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    /// Create a signal in the given initial state.
    pub fn new(set: bool) -> Self {
        Self {
            flag: Mutex::new(set),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the flag and wake every waiter.
    pub fn set(&self) {
        *self.lock() = true;
        self.cond.notify_all();
    }

    pub fn clear(&self) {
        *self.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Block until the flag is set.  Returns immediately if it already is.
    pub fn wait(&self) {
        let guard = self.lock();
        let _guard = self
            .cond
            .wait_while(guard, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until the flag is set or `timeout` elapses.
    ///
    /// Returns the state of the flag on wake-up: `true` means the signal was
    /// observed set, `false` means the timeout expired first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn initial_state_is_respected() {
        assert!(Signal::new(true).is_set());
        assert!(!Signal::new(false).is_set());
        assert!(!Signal::default().is_set());
    }

    #[test]
    fn set_and_clear_toggle_the_flag() {
        let signal = Signal::new(false);
        signal.set();
        assert!(signal.is_set());
        signal.clear();
        assert!(!signal.is_set());
    }

    #[test]
    fn wait_returns_immediately_when_set() {
        let signal = Signal::new(true);
        signal.wait();
        assert!(signal.wait_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn wait_timeout_expires_when_clear() {
        let signal = Signal::new(false);
        let started = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn set_wakes_blocked_waiter() {
        let signal = Arc::new(Signal::new(false));
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait_timeout(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.set();
        assert!(waiter.join().expect("waiter thread panicked"));
    }

    #[test]
    fn set_releases_plain_wait() {
        let signal = Arc::new(Signal::new(false));
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait())
        };
        thread::sleep(Duration::from_millis(20));
        signal.set();
        waiter.join().expect("waiter thread panicked");
    }
}
