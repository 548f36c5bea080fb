//! Debug assertion macros for ring index invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds. All index arithmetic is wrapping `u32`.

/// Assert that an availability count leaves the sentinel slot free.
///
/// **Invariant**: free entries (producer) or visible entries (consumer)
/// never exceed `capacity - 1`, computed without masking.
///
/// Used in: `Ring::reserve_slot()` on the single-party paths
macro_rules! debug_assert_bounded_count {
    ($count:expr, $mask:expr) => {
        debug_assert!(
            $count <= $mask,
            "bounded count violated: {} entries with only {} usable slots",
            $count,
            $mask
        )
    };
}

/// Assert that a published tail never runs ahead of its reservation head.
///
/// **Invariant**: `0 ≤ head - tail ≤ capacity` (wrapping), i.e. the tail trails
/// the head by the number of in-flight reservations.
///
/// Used in: `Ring::publish()` before advancing a tail
macro_rules! debug_assert_tail_trails_head {
    ($side:expr, $new_tail:expr, $head:expr, $capacity:expr) => {
        debug_assert!(
            ($head).wrapping_sub($new_tail) <= $capacity,
            "{} tail {} ran ahead of head {}",
            $side,
            $new_tail,
            $head
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_tail_trails_head;
