use crate::invariants::{debug_assert_bounded_count, debug_assert_tail_trails_head};
use crate::loom_exports::cell::UnsafeCell;
use crate::loom_exports::sync::atomic::{AtomicU32, Ordering};
use crate::metrics::Metrics;
use crate::{Backoff, Config, MetricsSnapshot, RingError, RingFlags};
use crossbeam_utils::CachePadded;
use std::fmt;
use std::mem::{self, MaybeUninit};

// =============================================================================
// INDEX PROTOCOL & MEMORY ORDERING
// =============================================================================
//
// Each side (producer, consumer) owns a `head` and a `tail`:
// - `head` reserves slots. Only that side's callers move it.
// - `tail` publishes slots to the opposite side. It trails `head` by the
//   number of reservations still being filled (producer) or read (consumer).
//
// Indices are free-running `u32` counters. Slot selection is always
// `index & mask`, and only wrapping differences are ever compared, so the
// counters may wrap past `u32::MAX` at any time.
//
// One slot stays empty: `prod.tail - cons.tail` never exceeds `capacity - 1`,
// which lets two indices tell "full" from "empty".
//
// ## Enqueue
//
// 1. Load `prod.head` (Acquire) and `cons.tail` (Acquire). The Acquire on
//    `cons.tail` pairs with the consumer's Release publish, so a consumer's
//    read of a slot happens-before we overwrite it.
// 2. free = mask + cons.tail - prod.head. Zero means full: return, no state
//    changed.
// 3. Reserve `prod.head`: a plain store for a single producer, a CAS
//    (AcqRel) for multiple producers. A failed CAS means another producer
//    made progress; re-read and retry.
// 4. Write the slot.
// 5. Multi-producer only: wait until `prod.tail` equals our reserved index
//    (Acquire), so tails are published in reservation order and consumers
//    never see a gap.
// 6. Store `prod.tail = reserved + 1` (Release). This is the barrier between
//    the slot write and its visibility.
//
// Dequeue mirrors this with `cons.head`, `cons.tail` and `prod.tail`, using
// entries = prod.tail - cons.head.
//
// ## Why the head loads are Acquire
//
// A multi-party caller that observes a head value written by another
// caller's CAS must also observe at least the opposite tail that caller
// checked. Otherwise a stale opposite tail makes the wrapping subtraction
// underflow into a huge "available" count.
//
// =============================================================================

/// One side's reservation and publication indices.
struct HeadTail {
    head: AtomicU32,
    tail: AtomicU32,
}

impl HeadTail {
    fn new(start: u32) -> Self {
        Self {
            head: AtomicU32::new(start),
            tail: AtomicU32::new(start),
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Producer,
    Consumer,
}

impl Side {
    const fn name(self) -> &'static str {
        match self {
            Side::Producer => "producer",
            Side::Consumer => "consumer",
        }
    }
}

type Slot<T> = UnsafeCell<MaybeUninit<T>>;

/// Fixed-capacity lock-free FIFO ring buffer.
///
/// The producer and consumer sides each run either a single-party algorithm
/// (wait-free, no CAS) or a multi-party algorithm (CAS reservation plus an
/// in-order tail publish), chosen once by the [`RingFlags`] given at creation.
///
/// Capacity is a power of two and one slot is always kept empty, so a ring
/// of capacity `N` holds at most `N - 1` values.
///
/// # Example
///
/// ```
/// use ringmpmc_rs::{Ring, RingFlags};
///
/// let ring = Ring::<u64>::new(8, RingFlags::MPMC).unwrap();
/// assert!(ring.push(1));
/// assert!(ring.push(2));
/// assert_eq!(ring.count(), 2);
/// assert_eq!(ring.dequeue(), Some(1));
/// assert_eq!(ring.dequeue(), Some(2));
/// assert_eq!(ring.dequeue(), None);
/// ```
pub struct Ring<T> {
    // === PRODUCER HOT ===
    prod: CachePadded<HeadTail>,

    // === CONSUMER HOT ===
    cons: CachePadded<HeadTail>,

    // === CONFIG (read-only after creation) ===
    mask: u32,
    flags: RingFlags,
    enable_metrics: bool,
    metrics: Metrics,

    // === DATA BUFFER ===
    /// Fixed-size slot storage; a slot is initialized exactly when its index
    /// lies in `[cons.tail, prod.tail)` or is held by an in-flight reservation.
    slots: Box<[Slot<T>]>,
}

// Safety: values are moved between threads, never shared, so `T: Send` is
// enough. Exclusive slot access is guaranteed by the head reservation.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Largest capacity whose mask and one-slot sentinel fit the `u32` index domain.
    pub const MAX_CAPACITY: usize = 1 << 31;

    /// Creates a ring with `capacity` slots and the given producer/consumer mode.
    ///
    /// Fails with [`RingError::InvalidCapacity`] unless `capacity` is a
    /// non-zero power of two no larger than [`Ring::MAX_CAPACITY`], and with
    /// [`RingError::AllocationFailure`] if the slots cannot be allocated.
    pub fn new(capacity: usize, flags: RingFlags) -> Result<Self, RingError> {
        Self::with_config(Config::new(capacity, flags, false))
    }

    /// Creates a ring from a [`Config`].
    pub fn with_config(config: Config) -> Result<Self, RingError> {
        Self::with_start_index(config, 0)
    }

    /// Builds a ring whose four indices all start at `start`.
    ///
    /// Any start value is observationally equivalent to zero; tests use
    /// values near `u32::MAX` to drive the counters across the wrap.
    pub(crate) fn with_start_index(config: Config, start: u32) -> Result<Self, RingError> {
        let capacity = config.capacity;
        if capacity == 0 || !capacity.is_power_of_two() || capacity > Self::MAX_CAPACITY {
            tracing::warn!(capacity, "rejected ring capacity");
            return Err(RingError::InvalidCapacity { capacity });
        }

        let slots = allocate_slots(capacity).map_err(|err| {
            tracing::warn!(capacity, %err, "ring slot allocation failed");
            err
        })?;

        tracing::debug!(capacity, flags = ?config.flags, metrics = config.enable_metrics, "ring created");

        Ok(Self {
            prod: CachePadded::new(HeadTail::new(start)),
            cons: CachePadded::new(HeadTail::new(start)),
            mask: (capacity - 1) as u32,
            flags: config.flags,
            enable_metrics: config.enable_metrics,
            metrics: Metrics::new(),
            slots,
        })
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the number of slots, including the one that always stays empty.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask as usize + 1
    }

    /// Returns the producer/consumer mode fixed at creation.
    #[inline]
    pub fn flags(&self) -> RingFlags {
        self.flags
    }

    /// Returns true if enqueue runs the wait-free single-producer path.
    #[inline]
    pub fn is_single_producer(&self) -> bool {
        self.flags.is_single_producer()
    }

    /// Returns true if dequeue runs the wait-free single-consumer path.
    #[inline]
    pub fn is_single_consumer(&self) -> bool {
        self.flags.is_single_consumer()
    }

    /// Number of visible values: `(prod.tail - cons.tail) & mask`.
    ///
    /// A snapshot only. Under concurrent use the result may be stale by the
    /// time it is returned; it is never a synchronization point.
    #[inline]
    pub fn count(&self) -> u32 {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        prod_tail.wrapping_sub(cons_tail) & self.mask
    }

    /// Number of values that can still be enqueued: `(cons.tail - prod.tail - 1) & mask`.
    ///
    /// Advisory, like [`count`](Self::count).
    #[inline]
    pub fn free_slots(&self) -> u32 {
        let prod_tail = self.prod.tail.load(Ordering::Relaxed);
        let cons_tail = self.cons.tail.load(Ordering::Relaxed);
        cons_tail.wrapping_sub(prod_tail).wrapping_sub(1) & self.mask
    }

    /// Returns true if no free slot remains. Advisory.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// Returns true if no value is visible. Advisory.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prod.tail.load(Ordering::Relaxed) == self.cons.tail.load(Ordering::Relaxed)
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Enqueues `value`, handing it back as `Err(value)` if the ring is full.
    ///
    /// Wait-free with [`RingFlags::SINGLE_PRODUCER`]; otherwise lock-free, with
    /// a CAS retry only when another producer won the same slot.
    pub fn enqueue(&self, value: T) -> Result<(), T> {
        let Some(reserved) = self.reserve_slot(Side::Producer) else {
            if self.enable_metrics {
                self.metrics.add_enqueue_full();
            }
            return Err(value);
        };

        // SAFETY: the reservation gives this call exclusive access to the slot.
        // The Acquire load of `cons.tail` in `reserve_slot` ordered the last
        // consumer read of this slot before this write.
        unsafe {
            self.slot(reserved).with_mut(|slot| {
                (*slot).write(value);
            });
        }

        self.publish(Side::Producer, reserved);

        if self.enable_metrics {
            self.metrics.add_enqueued();
        }
        Ok(())
    }

    /// Enqueues `value`, returning `false` if the ring is full.
    ///
    /// A rejected value is dropped; use [`enqueue`](Self::enqueue) to get it back.
    #[inline]
    pub fn push(&self, value: T) -> bool {
        self.enqueue(value).is_ok()
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Dequeues the oldest visible value, or `None` if the ring is empty.
    ///
    /// An empty result changes no state.
    pub fn dequeue(&self) -> Option<T> {
        let Some(reserved) = self.reserve_slot(Side::Consumer) else {
            if self.enable_metrics {
                self.metrics.add_dequeue_empty();
            }
            return None;
        };

        // SAFETY: the slot was written and published by a producer; the Acquire
        // load of `prod.tail` in `reserve_slot` synchronizes with that publish.
        // The reservation makes this the only reader, and the value is moved
        // out exactly once before `cons.tail` releases the slot.
        let value = unsafe { self.slot(reserved).with(|slot| (*slot).assume_init_read()) };

        self.publish(Side::Consumer, reserved);

        if self.enable_metrics {
            self.metrics.add_dequeued();
        }
        Some(value)
    }

    /// Returns an iterator that dequeues until the ring is observed empty.
    pub fn drain(&self) -> Drain<'_, T> {
        Drain { ring: self }
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Tears the ring down, optionally handing every remaining value to `release`.
    ///
    /// Values reach `release` in FIFO order, once each, before the storage is
    /// freed. Without a callback the remaining values are dropped in place.
    /// Taking `self` by value guarantees no other thread can still be using
    /// the ring. Returns the number of values passed to `release`.
    ///
    /// ```
    /// use ringmpmc_rs::{Ring, RingFlags};
    ///
    /// let ring = Ring::<u32>::new(4, RingFlags::SPSC).unwrap();
    /// ring.push(7);
    /// ring.push(8);
    ///
    /// let mut released = Vec::new();
    /// assert_eq!(ring.destroy(Some(|v: u32| released.push(v))), 2);
    /// assert_eq!(released, [7, 8]);
    /// ```
    pub fn destroy<F>(self, release: Option<F>) -> usize
    where
        F: FnMut(T),
    {
        let mut released = 0;
        if let Some(mut release) = release {
            for value in self.drain() {
                release(value);
                released += 1;
            }
        }
        tracing::debug!(
            capacity = self.capacity(),
            released,
            dropped = self.count(),
            "ring destroyed"
        );
        released
    }

    // ---------------------------------------------------------------------
    // INTERNALS
    // ---------------------------------------------------------------------

    #[inline]
    fn side(&self, side: Side) -> (&HeadTail, &HeadTail, bool) {
        match side {
            Side::Producer => (&*self.prod, &*self.cons, self.flags.is_single_producer()),
            Side::Consumer => (&*self.cons, &*self.prod, self.flags.is_single_consumer()),
        }
    }

    #[inline]
    fn slot(&self, index: u32) -> &Slot<T> {
        &self.slots[(index & self.mask) as usize]
    }

    /// Reserves one slot on `side`, returning its index, or `None` when the
    /// ring is full (producer) or empty (consumer).
    #[inline]
    fn reserve_slot(&self, side: Side) -> Option<u32> {
        let (own, other, single) = self.side(side);
        let mut retries = 0u64;

        let reserved = loop {
            let head = own.head.load(Ordering::Acquire);
            let other_tail = other.tail.load(Ordering::Acquire);

            let available = match side {
                Side::Producer => self.mask.wrapping_add(other_tail).wrapping_sub(head),
                Side::Consumer => other_tail.wrapping_sub(head),
            };
            if available < 1 {
                if self.enable_metrics {
                    self.metrics.add_cas_retries(matches!(side, Side::Producer), retries);
                }
                return None;
            }

            let next = head.wrapping_add(1);
            if single {
                // A lone caller's own head is never stale, so the wrapping
                // difference is exact here.
                debug_assert_bounded_count!(available, self.mask);
                own.head.store(next, Ordering::Relaxed);
                break head;
            }
            // A stale `other_tail` can only make `available` look smaller, or
            // (when `head` is already stale) garbage; the CAS rejects the latter.
            match own
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break head,
                Err(_) => retries += 1,
            }
        };

        if self.enable_metrics {
            self.metrics.add_cas_retries(matches!(side, Side::Producer), retries);
        }
        Some(reserved)
    }

    /// Publishes the slot at `reserved` by moving `side`'s tail past it.
    ///
    /// Multi-party callers first wait for every earlier reservation on the same
    /// side to publish, so the tail only ever advances in reservation order.
    #[inline]
    fn publish(&self, side: Side, reserved: u32) {
        let (own, _, single) = self.side(side);
        let next = reserved.wrapping_add(1);

        if !single {
            let mut backoff = Backoff::new();
            // Acquire: the earlier publisher's slot work must be visible before
            // our Release store extends its publication.
            while own.tail.load(Ordering::Acquire) != reserved {
                backoff.snooze();
            }
            if self.enable_metrics {
                self.metrics
                    .add_tail_waits(matches!(side, Side::Producer), backoff.rounds());
            }
        }

        debug_assert_tail_trails_head!(
            side.name(),
            next,
            own.head.load(Ordering::Relaxed),
            self.capacity() as u32
        );
        own.tail.store(next, Ordering::Release);
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        if mem::needs_drop::<T>() {
            for value in self.drain() {
                drop(value);
            }
        }
    }
}

impl<T> fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("capacity", &self.capacity())
            .field("flags", &self.flags)
            .field("prod_head", &self.prod.head.load(Ordering::Relaxed))
            .field("prod_tail", &self.prod.tail.load(Ordering::Relaxed))
            .field("cons_head", &self.cons.head.load(Ordering::Relaxed))
            .field("cons_tail", &self.cons.tail.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`Ring::drain`].
///
/// Ends at the first empty observation; values enqueued afterwards are left
/// for the next call.
#[derive(Debug)]
pub struct Drain<'a, T> {
    ring: &'a Ring<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.ring.dequeue()
    }
}

/// Allocates `capacity` uninitialized slots, reporting failure instead of aborting.
fn allocate_slots<T>(capacity: usize) -> Result<Box<[Slot<T>]>, RingError> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| RingError::AllocationFailure { capacity })?;
    slots.resize_with(capacity, || UnsafeCell::new(MaybeUninit::uninit()));
    Ok(slots.into_boxed_slice())
}
