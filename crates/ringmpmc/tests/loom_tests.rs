//! Loom-based concurrency tests for ringmpmc-rs.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! With the `loom` feature the ring's index atomics, slot cells and spin hints
//! come from loom, so these tests drive the real enqueue/dequeue paths through
//! every interleaving loom can reach. A slot read that is not ordered after
//! its write (or a write not ordered after the previous read) fails the model
//! with a causality violation.

#![cfg(feature = "loom")]

use loom::sync::Arc;
use loom::thread;
use ringmpmc_rs::{Ring, RingFlags};

/// Tries a bounded number of times, yielding to the model between attempts.
fn try_dequeue(ring: &Ring<u64>, attempts: usize) -> Option<u64> {
    for _ in 0..attempts {
        if let Some(v) = ring.dequeue() {
            return Some(v);
        }
        thread::yield_now();
    }
    None
}

fn bounded_model<F>(f: F)
where
    F: Fn() + Sync + Send + 'static,
{
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(f);
}

/// SPSC: values arrive in order and nothing is invented.
#[test]
fn loom_spsc_fifo() {
    loom::model(|| {
        let ring = Arc::new(Ring::<u64>::new(4, RingFlags::SPSC).unwrap());
        let producer_ring = Arc::clone(&ring);

        let producer = thread::spawn(move || {
            assert!(producer_ring.push(42));
            assert!(producer_ring.push(43));
        });

        let mut received = Vec::new();
        while let Some(v) = try_dequeue(&ring, 3) {
            received.push(v);
        }

        producer.join().unwrap();
        received.extend(ring.drain());
        assert_eq!(received, [42, 43]);
    });
}

/// SPSC on a ring with a single usable slot: the consumer's publish frees it.
#[test]
fn loom_spsc_full_ring_handoff() {
    loom::model(|| {
        let ring = Arc::new(Ring::<u64>::new(2, RingFlags::SPSC).unwrap());
        assert!(ring.push(1));
        assert!(!ring.push(2));

        let consumer_ring = Arc::clone(&ring);
        let consumer = thread::spawn(move || consumer_ring.dequeue());

        let value = consumer.join().unwrap();
        assert_eq!(value, Some(1));
        assert!(ring.push(2));
        assert_eq!(ring.dequeue(), Some(2));
    });
}

/// MPSC: two producers race for slots while the consumer reads. The consumer
/// must never see an unpublished slot, and the tails must publish in
/// reservation order.
#[test]
fn loom_mpsc_tail_publish_order() {
    bounded_model(|| {
        let ring = Arc::new(Ring::<u64>::new(4, RingFlags::MPSC).unwrap());

        let producers: Vec<_> = [1u64, 2]
            .into_iter()
            .map(|value| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || assert!(ring.push(value)))
            })
            .collect();

        let mut received = Vec::new();
        if let Some(v) = try_dequeue(&ring, 2) {
            received.push(v);
        }

        for producer in producers {
            producer.join().unwrap();
        }
        received.extend(ring.drain());

        received.sort_unstable();
        assert_eq!(received, [1, 2]);
        assert!(ring.is_empty());
    });
}

/// One usable slot: the second enqueue overwrites the slot the consumer is
/// reading, so the consumer's tail publish must order its read before the
/// producer's overwrite.
#[test]
fn loom_slot_reuse_after_consumer_publish() {
    bounded_model(|| {
        let ring = Arc::new(Ring::<u64>::new(2, RingFlags::MPSC).unwrap());
        assert!(ring.push(1));

        let producer_ring = Arc::clone(&ring);
        let producer = thread::spawn(move || {
            for _ in 0..3 {
                if producer_ring.push(2) {
                    return true;
                }
                thread::yield_now();
            }
            false
        });

        let first = try_dequeue(&ring, 2);
        let pushed = producer.join().unwrap();

        let mut received: Vec<u64> = first.into_iter().collect();
        received.extend(ring.drain());
        if pushed {
            assert_eq!(received, [1, 2]);
        } else {
            assert_eq!(received, [1]);
        }
    });
}

/// MPMC: one value, two racing consumers. Exactly one of them gets it.
#[test]
fn loom_mpmc_single_delivery() {
    bounded_model(|| {
        let ring = Arc::new(Ring::<u64>::new(4, RingFlags::MPMC).unwrap());

        let producer_ring = Arc::clone(&ring);
        let producer = thread::spawn(move || assert!(producer_ring.push(7)));

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || ring.dequeue())
            })
            .collect();

        producer.join().unwrap();
        let mut delivered: Vec<u64> = consumers
            .into_iter()
            .filter_map(|c| c.join().unwrap())
            .collect();
        delivered.extend(ring.drain());

        assert_eq!(delivered, [7]);
    });
}

/// Queries observed after all threads join reflect every completed operation.
#[test]
fn loom_count_after_join() {
    bounded_model(|| {
        let ring = Arc::new(Ring::<u64>::new(8, RingFlags::MPSC).unwrap());

        let producers: Vec<_> = (0..2u64)
            .map(|id| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    assert!(ring.push(id));
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(ring.count(), 2);
        assert_eq!(ring.free_slots(), 5);
        assert!(!ring.is_empty());
    });
}
