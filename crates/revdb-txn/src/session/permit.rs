//! Counting permits for transaction admission.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct PoolState {
    available: u32,
    closed: bool,
}

/// Fixed number of permits; a permit is returned when its guard drops.
#[derive(Debug)]
pub struct PermitPool {
    capacity: u32,
    state: Mutex<PoolState>,
    released: Condvar,
}

/// Why a permit was not granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermitError {
    /// Every permit is taken.
    Exhausted,
    /// No permit was released before the deadline.
    TimedOut,
    /// The pool was closed.
    Closed,
}

impl PermitPool {
    /// Creates a pool of `capacity` permits.
    pub fn new(capacity: u32) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            state: Mutex::new(PoolState {
                available: capacity,
                closed: false,
            }),
            released: Condvar::new(),
        })
    }

    /// Total number of permits.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Permits currently held.
    pub fn in_use(&self) -> u32 {
        self.capacity - self.state.lock().available
    }

    /// Takes a permit without waiting.
    pub fn try_acquire(self: &Arc<Self>) -> Result<Permit, PermitError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PermitError::Closed);
        }
        if state.available == 0 {
            return Err(PermitError::Exhausted);
        }
        state.available -= 1;
        Ok(Permit {
            pool: Arc::clone(self),
        })
    }

    /// Takes a permit, waiting up to `timeout` or forever if `None`.
    pub fn acquire(self: &Arc<Self>, timeout: Option<Duration>) -> Result<Permit, PermitError> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PermitError::Closed);
            }
            if state.available > 0 {
                state.available -= 1;
                return Ok(Permit {
                    pool: Arc::clone(self),
                });
            }
            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut state, deadline).timed_out() {
                        return Err(PermitError::TimedOut);
                    }
                }
                None => self.released.wait(&mut state),
            }
        }
    }

    /// Refuses further permits and wakes every waiter.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.released.notify_all();
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.available = (state.available + 1).min(self.capacity);
        drop(state);
        self.released.notify_one();
    }
}

/// A held permit.
#[derive(Debug)]
pub struct Permit {
    pool: Arc<PermitPool>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.pool.release();
    }
}
