//! RingMPMC - Fixed-Capacity Lock-Free Ring Buffer
//!
//! An array-backed FIFO queue for handing values between threads without
//! locks or per-operation allocation. Each ring picks, at creation time, a
//! single- or multi-party algorithm for its producer side and for its
//! consumer side:
//!
//! - **Single producer / single consumer**: wait-free, one Acquire load, one
//!   slot access and one Release store per operation.
//! - **Multiple producers / consumers**: lock-free CAS reservation of the
//!   head, then an in-order tail publish so the opposite side never observes
//!   a gap.
//!
//! # Key Features
//!
//! - Power-of-two capacity, one slot kept empty to tell full from empty
//! - Wrapping `u32` indices; only differences matter
//! - Producer and consumer indices on separate cache lines
//! - Full/empty are ordinary return values, never errors
//! - Optional relaxed-atomic metrics
//!
//! # Example
//!
//! ```
//! use ringmpmc_rs::{Ring, RingFlags};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let ring = Arc::new(Ring::<u64>::new(1 << 10, RingFlags::SINGLE_CONSUMER).unwrap());
//!
//! let producers: Vec<_> = (0..4u64)
//!     .map(|id| {
//!         let ring = Arc::clone(&ring);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 while ring.enqueue(id * 1_000 + i).is_err() {
//!                     std::hint::spin_loop();
//!                 }
//!             }
//!         })
//!     })
//!     .collect();
//! for p in producers {
//!     p.join().unwrap();
//! }
//!
//! assert_eq!(ring.count(), 400);
//! assert_eq!(ring.drain().count(), 400);
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod loom_exports;
mod metrics;
mod ring;

pub use backoff::Backoff;
pub use config::{Config, RingFlags, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::RingError;
pub use metrics::MetricsSnapshot;
pub use ring::{Drain, Ring};
