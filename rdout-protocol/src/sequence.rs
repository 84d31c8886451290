//! Sequence Number Handling
//!
//! RDoUT numbers every outbound payload with a signed 32-bit sequence number,
//! starting at 0 for each send session. The value `-1` is reserved: it never
//! labels a data packet and only appears in acknowledgments, where it means
//! "nothing has been accepted yet".

use std::fmt;
use std::ops::{Add, Sub};

/// Raw value of the "nothing accepted yet" sentinel
pub const NONE_ACCEPTED: i32 = -1;

/// Signed packet sequence number
///
/// Unlike stream protocols there is no wraparound: a session numbers its
/// payloads `0..N` and `N` is bounded by `i32::MAX`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SeqNumber(i32);

impl SeqNumber {
    /// The sentinel carried by an acknowledgment before any packet was accepted
    pub const NONE: SeqNumber = SeqNumber(NONE_ACCEPTED);

    /// The first sequence number of every session
    pub const ZERO: SeqNumber = SeqNumber(0);

    /// Create a sequence number from its raw wire value
    #[inline]
    pub const fn new(value: i32) -> Self {
        SeqNumber(value)
    }

    /// Sequence number for the payload at `index` in a send session
    ///
    /// # Panics
    /// Panics if `index` does not fit the signed 32-bit wire field
    pub fn from_index(index: usize) -> Self {
        let value = i32::try_from(index)
            .unwrap_or_else(|_| panic!("Sequence index {} exceeds {}", index, i32::MAX));
        SeqNumber(value)
    }

    /// Get the raw sequence number value
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Position of this sequence number in the session's packet list
    ///
    /// Returns `None` for the sentinel.
    #[inline]
    pub fn as_index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// `true` for the "nothing accepted yet" sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == NONE_ACCEPTED
    }

    /// Get the next sequence number
    #[inline]
    pub const fn next(self) -> Self {
        SeqNumber(self.0 + 1)
    }

    /// Get the previous sequence number
    ///
    /// `SeqNumber::ZERO.prev()` is the sentinel.
    #[inline]
    pub const fn prev(self) -> Self {
        SeqNumber(self.0 - 1)
    }

    /// Number of sequence numbers from `self` up to (excluding) `other`
    ///
    /// Returns 0 when `other` is not ahead of `self`.
    #[inline]
    pub fn distance_to(self, other: SeqNumber) -> usize {
        usize::try_from(other.0 as i64 - self.0 as i64).unwrap_or(0)
    }
}

impl Default for SeqNumber {
    fn default() -> Self {
        SeqNumber::ZERO
    }
}

impl fmt::Debug for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqNumber({})", self.0)
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SeqNumber {
    fn from(value: i32) -> Self {
        SeqNumber(value)
    }
}

impl From<SeqNumber> for i32 {
    fn from(seq: SeqNumber) -> i32 {
        seq.0
    }
}

impl Add<usize> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: usize) -> SeqNumber {
        let rhs = i32::try_from(rhs).unwrap_or(i32::MAX);
        SeqNumber(self.0.saturating_add(rhs))
    }
}

impl Sub<usize> for SeqNumber {
    type Output = SeqNumber;

    fn sub(self, rhs: usize) -> SeqNumber {
        let rhs = i32::try_from(rhs).unwrap_or(i32::MAX);
        SeqNumber(self.0.saturating_sub(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert!(SeqNumber::NONE.is_none());
        assert!(!SeqNumber::ZERO.is_none());
        assert_eq!(SeqNumber::ZERO.prev(), SeqNumber::NONE);
        assert_eq!(SeqNumber::NONE.next(), SeqNumber::ZERO);
        assert_eq!(SeqNumber::NONE.as_index(), None);
    }

    #[test]
    fn test_ordering() {
        assert!(SeqNumber::NONE < SeqNumber::ZERO);
        assert!(SeqNumber::new(3) < SeqNumber::new(4));
        assert_eq!(SeqNumber::new(7).as_index(), Some(7));
    }

    #[test]
    fn test_distance() {
        assert_eq!(SeqNumber::new(2).distance_to(SeqNumber::new(6)), 4);
        assert_eq!(SeqNumber::new(6).distance_to(SeqNumber::new(2)), 0);
        assert_eq!(SeqNumber::NONE.distance_to(SeqNumber::ZERO), 1);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(SeqNumber::new(2) + 4, SeqNumber::new(6));
        assert_eq!(SeqNumber::new(6) - 4, SeqNumber::new(2));
        assert_eq!(SeqNumber::new(i32::MAX) + 1, SeqNumber::new(i32::MAX));
    }

    #[test]
    fn test_from_index() {
        assert_eq!(SeqNumber::from_index(0), SeqNumber::ZERO);
        assert_eq!(SeqNumber::from_index(41).as_raw(), 41);
    }

    #[test]
    #[should_panic]
    fn test_from_index_overflow() {
        SeqNumber::from_index(i32::MAX as usize + 1);
    }

    proptest::proptest! {
        #[test]
        fn prop_next_prev_inverse(raw in -1i32..i32::MAX) {
            let seq = SeqNumber::new(raw);
            proptest::prop_assert_eq!(seq.next().prev(), seq);
            proptest::prop_assert_eq!(seq.distance_to(seq.next()), 1);
            proptest::prop_assert!(seq < seq.next());
        }
    }
}
