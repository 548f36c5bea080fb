//! Error types for ring construction.

use thiserror::Error;

/// Errors that can occur while creating a [`Ring`](crate::Ring).
///
/// Steady-state operations never fail with a `RingError`: a full ring on
/// enqueue or an empty ring on dequeue is ordinary control flow and is
/// reported through the operation's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// Capacity is zero, not a power of two, or too large for the index domain.
    #[error("capacity {capacity} is not a non-zero power of two within the 32-bit index range")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// Backing storage for the slots could not be obtained.
    #[error("failed to allocate storage for {capacity} slots")]
    AllocationFailure {
        /// The capacity that was requested.
        capacity: usize,
    },
}

impl RingError {
    /// Returns `true` if the caller passed an unusable capacity.
    #[inline]
    pub fn is_capacity_error(&self) -> bool {
        matches!(self, Self::InvalidCapacity { .. })
    }
}
