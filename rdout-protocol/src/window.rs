//! Go-Back-N send window
//!
//! [`SendWindow`] tracks which packets of a send session are in flight. It is
//! a pure state machine: the caller owns the socket, the timer and the lock,
//! and applies the returned decisions.
//!
//! ```text
//!        base              next_seq          base + window_size
//!          │                   │                   │
//!  ────────┼───────────────────┼───────────────────┼──────────▶ seq
//!   acked  │ <── in flight ──▶ │ <── admissible ─▶ │
//! ```
//!
//! Invariant: `base <= next_seq <= min(base + window_size, total)`.

use crate::sequence::SeqNumber;
use std::ops::Range;

/// Result of admitting a packet into the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Sequence number that must now be transmitted
    pub seq: SeqNumber,
    /// The window was empty before this admission: arm the timer
    pub arm_timer: bool,
}

/// Result of processing a cumulative acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The ack moved nothing (duplicate, sentinel or empty window)
    Stale,
    /// `base` moved forward
    Advanced {
        /// Number of packets newly acknowledged
        acked: usize,
        /// No packet remains in flight: cancel the timer, otherwise rearm it
        window_empty: bool,
    },
}

/// Send-side sliding window over `total` packets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendWindow {
    base: SeqNumber,
    next_seq: SeqNumber,
    window_size: usize,
    total: usize,
}

impl SendWindow {
    /// Create a window for a session of `total` packets
    ///
    /// # Panics
    /// Panics if `window_size` is zero or `total` does not fit the sequence space
    pub fn new(total: usize, window_size: usize) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        assert!(
            total <= i32::MAX as usize,
            "session of {} packets exceeds the sequence space",
            total
        );
        SendWindow {
            base: SeqNumber::ZERO,
            next_seq: SeqNumber::ZERO,
            window_size,
            total,
        }
    }

    /// Smallest sequence number not yet acknowledged
    #[inline]
    pub fn base(&self) -> SeqNumber {
        self.base
    }

    /// Next sequence number eligible to be sent
    #[inline]
    pub fn next_seq(&self) -> SeqNumber {
        self.next_seq
    }

    /// Configured window size
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of packets in the session
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of packets awaiting acknowledgment
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.base.distance_to(self.next_seq)
    }

    /// `true` when at least one packet is awaiting acknowledgment
    ///
    /// The retransmission timer must be armed exactly when this holds.
    #[inline]
    pub fn has_unacked(&self) -> bool {
        self.base < self.next_seq
    }

    /// `true` once every packet of the session is acknowledged
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.base.as_index() == Some(self.total)
    }

    /// Sequence numbers currently in flight, oldest first
    pub fn in_flight_range(&self) -> Range<usize> {
        let start = self.base.as_index().unwrap_or(0);
        let end = self.next_seq.as_index().unwrap_or(0);
        start..end
    }

    fn can_admit(&self) -> bool {
        self.in_flight() < self.window_size && self.next_seq.as_index() < Some(self.total)
    }

    /// Admit the next packet into flight, if the window and session allow it
    pub fn admit(&mut self) -> Option<Admission> {
        if !self.can_admit() {
            return None;
        }
        let admission = Admission {
            seq: self.next_seq,
            arm_timer: !self.has_unacked(),
        };
        self.next_seq = self.next_seq.next();
        Some(admission)
    }

    /// Process a cumulative acknowledgment for `ack_seq`
    ///
    /// Any ack at or above `base` moves `base` to `ack_seq + 1`, capped at
    /// `next_seq`. A receiver left over from an earlier session answers with
    /// acks beyond anything sent; those acknowledge the whole window.
    pub fn on_ack(&mut self, ack_seq: SeqNumber) -> AckOutcome {
        if ack_seq < self.base {
            return AckOutcome::Stale;
        }

        let new_base = ack_seq.next().min(self.next_seq);
        if new_base == self.base {
            return AckOutcome::Stale;
        }
        let acked = self.base.distance_to(new_base);
        self.base = new_base;

        AckOutcome::Advanced {
            acked,
            window_empty: !self.has_unacked(),
        }
    }

    /// Check the window invariant
    pub fn invariant_holds(&self) -> bool {
        let bound = self.base + self.window_size;
        self.base <= self.next_seq
            && self.next_seq <= bound
            && self.next_seq.as_index().is_some_and(|next| next <= self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admit_all(window: &mut SendWindow) -> Vec<Admission> {
        std::iter::from_fn(|| window.admit()).collect()
    }

    #[test]
    fn initial_state() {
        let w = SendWindow::new(9, 4);
        assert_eq!(w.base(), SeqNumber::ZERO);
        assert_eq!(w.next_seq(), SeqNumber::ZERO);
        assert!(!w.has_unacked());
        assert!(!w.is_complete());
        assert!(w.invariant_holds());
    }

    #[test]
    fn empty_session_is_complete() {
        let mut w = SendWindow::new(0, 4);
        assert!(w.is_complete());
        assert_eq!(w.admit(), None);
    }

    #[test]
    fn admission_fills_window() {
        let mut w = SendWindow::new(9, 4);
        let admitted = admit_all(&mut w);

        assert_eq!(admitted.len(), 4);
        assert!(admitted[0].arm_timer);
        assert!(admitted[1..].iter().all(|a| !a.arm_timer));
        assert_eq!(admitted[3].seq, SeqNumber::new(3));
        assert_eq!(w.in_flight(), 4);
        assert!(w.invariant_holds());
    }

    #[test]
    fn admission_stops_at_total() {
        let mut w = SendWindow::new(2, 4);
        assert_eq!(admit_all(&mut w).len(), 2);
        assert_eq!(w.next_seq(), SeqNumber::new(2));
    }

    #[test]
    fn cumulative_ack_empties_window() {
        let mut w = SendWindow::new(9, 4);
        admit_all(&mut w);
        assert_eq!(w.on_ack(SeqNumber::new(1)), AckOutcome::Advanced { acked: 2, window_empty: false });
        admit_all(&mut w);
        assert_eq!(w.next_seq(), SeqNumber::new(6));

        // base = 2, next_seq = 6: ack 5 acknowledges everything in flight
        let outcome = w.on_ack(SeqNumber::new(5));
        assert_eq!(outcome, AckOutcome::Advanced { acked: 4, window_empty: true });
        assert_eq!(w.base(), SeqNumber::new(6));
        assert!(!w.has_unacked());
    }

    #[test]
    fn stale_and_sentinel_acks_ignored() {
        let mut w = SendWindow::new(9, 4);
        admit_all(&mut w);
        w.on_ack(SeqNumber::new(1));

        assert_eq!(w.on_ack(SeqNumber::new(0)), AckOutcome::Stale);
        assert_eq!(w.on_ack(SeqNumber::NONE), AckOutcome::Stale);
        assert_eq!(w.base(), SeqNumber::new(2));
    }

    #[test]
    fn ack_beyond_next_seq_capped() {
        let mut w = SendWindow::new(9, 4);
        admit_all(&mut w);

        assert_eq!(w.on_ack(SeqNumber::new(8)), AckOutcome::Advanced { acked: 4, window_empty: true });
        assert_eq!(w.base(), SeqNumber::new(4));
        assert_eq!(w.next_seq(), SeqNumber::new(4));
        assert!(w.invariant_holds());

        // Window reopens; the next far ack takes the rest one window at a time
        assert_eq!(admit_all(&mut w).len(), 4);
        assert_eq!(w.on_ack(SeqNumber::new(100)), AckOutcome::Advanced { acked: 4, window_empty: true });
        assert_eq!(admit_all(&mut w).len(), 1);
        w.on_ack(SeqNumber::new(100));
        assert!(w.is_complete());
        assert!(w.invariant_holds());
    }

    #[test]
    fn rearm_after_window_drains() {
        let mut w = SendWindow::new(5, 2);
        admit_all(&mut w);
        w.on_ack(SeqNumber::new(1));

        let next = w.admit().unwrap();
        assert_eq!(next.seq, SeqNumber::new(2));
        assert!(next.arm_timer);
    }

    #[test]
    fn in_flight_range_for_go_back_n() {
        let mut w = SendWindow::new(9, 4);
        admit_all(&mut w);
        w.on_ack(SeqNumber::new(1));
        admit_all(&mut w);

        assert_eq!(w.in_flight_range(), 2..6);
    }

    #[test]
    fn completes_after_last_ack() {
        let mut w = SendWindow::new(3, 4);
        admit_all(&mut w);
        w.on_ack(SeqNumber::new(2));
        assert!(w.is_complete());
        assert_eq!(w.admit(), None);
    }
}
