#[cfg(not(feature = "loom"))]
use std::hint;
#[cfg(not(feature = "loom"))]
use std::thread;

/// Adaptive backoff for busy-waiting on another thread's progress.
///
/// Escalates from `2^step` processor pause hints to `yield_now`. It never
/// parks the thread or touches a lock, so a waiter stays runnable and the
/// ring keeps its lock-free liveness contract.
#[derive(Debug, Default)]
pub struct Backoff {
    step: u32,
    rounds: u64,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 pauses per round before yielding

    #[inline]
    pub fn new() -> Self {
        Self { step: 0, rounds: 0 }
    }

    /// Waits one round: pause hints while young, a scheduler yield afterwards.
    #[inline]
    pub fn snooze(&mut self) {
        self.rounds += 1;
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..1u32 << self.step {
                pause();
            }
            self.step += 1;
        } else {
            yield_now();
        }
    }

    /// Returns `true` once pause hints alone have not been enough.
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step > Self::SPIN_LIMIT
    }

    /// Number of `snooze` rounds since creation or the last `reset`.
    #[inline]
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
        self.rounds = 0;
    }
}

// loom never preempts a spinning thread on its own; every hint must hand
// control back to the model scheduler.
#[cfg(feature = "loom")]
#[inline]
fn pause() {
    loom::thread::yield_now();
}

#[cfg(not(feature = "loom"))]
#[inline]
fn pause() {
    hint::spin_loop();
}

#[cfg(feature = "loom")]
#[inline]
fn yield_now() {
    loom::thread::yield_now();
}

#[cfg(not(feature = "loom"))]
#[inline]
fn yield_now() {
    thread::yield_now();
}
