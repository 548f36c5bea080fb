//! Creation-time configuration: capacity, producer/consumer mode and metrics.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Selects the enqueue/dequeue algorithm variants of a ring.
///
/// Fixed at creation. Setting `SINGLE_PRODUCER` (or `SINGLE_CONSUMER`) is a
/// promise that at most one thread calls enqueue (or dequeue) at a time;
/// breaking that promise silently loses or duplicates slots.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RingFlags(u32);

impl RingFlags {
    /// Multi-producer, multi-consumer.
    pub const MULTI: Self = Self(0);
    /// Only one thread ever enqueues.
    pub const SINGLE_PRODUCER: Self = Self(0x01);
    /// Only one thread ever dequeues.
    pub const SINGLE_CONSUMER: Self = Self(0x02);

    pub const SPSC: Self = Self(Self::SINGLE_PRODUCER.0 | Self::SINGLE_CONSUMER.0);
    pub const MPSC: Self = Self::SINGLE_CONSUMER;
    pub const SPMC: Self = Self::SINGLE_PRODUCER;
    pub const MPMC: Self = Self::MULTI;

    const ALL: u32 = Self::SINGLE_PRODUCER.0 | Self::SINGLE_CONSUMER.0;

    /// Builds flags from raw bits, ignoring unknown bits.
    #[inline]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    /// Returns the raw bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_single_producer(self) -> bool {
        self.contains(Self::SINGLE_PRODUCER)
    }

    #[inline]
    pub const fn is_single_consumer(self) -> bool {
        self.contains(Self::SINGLE_CONSUMER)
    }
}

impl BitOr for RingFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RingFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for RingFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let producer = if self.is_single_producer() { "SP" } else { "MP" };
        let consumer = if self.is_single_consumer() { "SC" } else { "MC" };
        write!(f, "RingFlags({producer}{consumer})")
    }
}

/// Configuration for a [`Ring`](crate::Ring).
///
/// `Config` is plain data; capacity is validated by
/// [`Ring::with_config`](crate::Ring::with_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of slots. Must be a non-zero power of two; one slot always stays empty.
    pub capacity: usize,
    /// Producer/consumer mode.
    pub flags: RingFlags,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, flags: RingFlags, enable_metrics: bool) -> Self {
        Self {
            capacity,
            flags,
            enable_metrics,
        }
    }

    /// Returns a copy with the given flags.
    pub const fn with_flags(mut self, flags: RingFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns a copy with metrics switched on or off.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity.wrapping_sub(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            flags: RingFlags::MPMC,
            enable_metrics: false,
        }
    }
}

/// Low latency configuration (4K slots, single producer and consumer)
pub const LOW_LATENCY_CONFIG: Config = Config::new(1 << 12, RingFlags::SPSC, false);

/// High throughput configuration (1M slots, many producers feeding one consumer)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(1 << 20, RingFlags::MPSC, false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_combinations() {
        let both = RingFlags::SINGLE_PRODUCER | RingFlags::SINGLE_CONSUMER;
        assert_eq!(both, RingFlags::SPSC);
        assert!(both.is_single_producer());
        assert!(both.is_single_consumer());

        assert!(!RingFlags::MPMC.is_single_producer());
        assert!(!RingFlags::MPMC.is_single_consumer());
        assert!(RingFlags::MPSC.is_single_consumer());
        assert!(!RingFlags::MPSC.is_single_producer());

        let mut flags = RingFlags::MULTI;
        flags |= RingFlags::SINGLE_PRODUCER;
        assert_eq!(flags, RingFlags::SPMC);
    }

    #[test]
    fn test_flags_from_bits() {
        assert_eq!(RingFlags::from_bits_truncate(0x01), RingFlags::SINGLE_PRODUCER);
        assert_eq!(RingFlags::from_bits_truncate(0xff), RingFlags::SPSC);
        assert_eq!(RingFlags::SPSC.bits(), 0x03);
        assert_eq!(format!("{:?}", RingFlags::MPSC), "RingFlags(MPSC)");
    }

    #[test]
    fn test_config_presets() {
        assert_eq!(Config::default().capacity, 1024);
        assert_eq!(Config::default().mask(), 1023);
        assert_eq!(HIGH_THROUGHPUT_CONFIG.capacity, 1 << 20);
        assert_eq!(HIGH_THROUGHPUT_CONFIG.flags, RingFlags::MPSC);
        assert_eq!(LOW_LATENCY_CONFIG.flags, RingFlags::SPSC);

        let cfg = Config::default()
            .with_flags(RingFlags::SPMC)
            .with_metrics(true);
        assert_eq!(cfg.flags, RingFlags::SPMC);
        assert!(cfg.enable_metrics);
    }
}
