//! Optional counters for monitoring ring activity.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated with relaxed atomics.
///
/// Producer-side and consumer-side counters sit on separate cache lines so
/// enabling metrics does not add false sharing between the two roles.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    producer: CachePadded<SideCounters>,
    consumer: CachePadded<SideCounters>,
}

#[derive(Debug, Default)]
struct SideCounters {
    completed: AtomicU64,
    rejected: AtomicU64,
    cas_retries: AtomicU64,
    tail_waits: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_enqueued(&self) {
        bump(&self.producer.completed, 1);
    }

    #[inline]
    pub(crate) fn add_enqueue_full(&self) {
        bump(&self.producer.rejected, 1);
    }

    #[inline]
    pub(crate) fn add_dequeued(&self) {
        bump(&self.consumer.completed, 1);
    }

    #[inline]
    pub(crate) fn add_dequeue_empty(&self) {
        bump(&self.consumer.rejected, 1);
    }

    #[inline]
    pub(crate) fn add_cas_retries(&self, producer: bool, n: u64) {
        if n > 0 {
            bump(&self.side(producer).cas_retries, n);
        }
    }

    #[inline]
    pub(crate) fn add_tail_waits(&self, producer: bool, n: u64) {
        if n > 0 {
            bump(&self.side(producer).tail_waits, n);
        }
    }

    #[inline]
    fn side(&self, producer: bool) -> &SideCounters {
        if producer {
            &self.producer
        } else {
            &self.consumer
        }
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let p = &self.producer;
        let c = &self.consumer;
        MetricsSnapshot {
            enqueued: p.completed.load(Ordering::Relaxed),
            dequeued: c.completed.load(Ordering::Relaxed),
            enqueue_full: p.rejected.load(Ordering::Relaxed),
            dequeue_empty: c.rejected.load(Ordering::Relaxed),
            cas_retries: p.cas_retries.load(Ordering::Relaxed)
                + c.cas_retries.load(Ordering::Relaxed),
            tail_wait_spins: p.tail_waits.load(Ordering::Relaxed)
                + c.tail_waits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a ring's counters.
///
/// All zeros when the ring was created without `enable_metrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Values accepted by enqueue.
    pub enqueued: u64,
    /// Values handed out by dequeue.
    pub dequeued: u64,
    /// Enqueue calls that found the ring full.
    pub enqueue_full: u64,
    /// Dequeue calls that found the ring empty.
    pub dequeue_empty: u64,
    /// Failed head compare-and-swap attempts (multi-party paths only).
    pub cas_retries: u64,
    /// Backoff rounds spent waiting for an earlier reservation to publish.
    pub tail_wait_spins: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_aggregates_both_sides() {
        let m = Metrics::new();
        m.add_enqueued();
        m.add_enqueued();
        m.add_enqueue_full();
        m.add_dequeued();
        m.add_dequeue_empty();
        m.add_cas_retries(true, 3);
        m.add_cas_retries(false, 2);
        m.add_tail_waits(true, 5);
        m.add_tail_waits(false, 0);

        let snap = m.snapshot();
        assert_eq!(snap.enqueued, 2);
        assert_eq!(snap.dequeued, 1);
        assert_eq!(snap.enqueue_full, 1);
        assert_eq!(snap.dequeue_empty, 1);
        assert_eq!(snap.cas_retries, 5);
        assert_eq!(snap.tail_wait_spins, 5);
    }

    #[test]
    fn test_default_snapshot_is_zero() {
        assert_eq!(Metrics::new().snapshot(), MetricsSnapshot::default());
    }
}
