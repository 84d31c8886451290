//! ARQ source
//!
//! [`Sender::send_all`] pushes an ordered list of payloads through a
//! go-back-N sliding window. Three threads cooperate on one session:
//!
//! - the caller's thread runs the transmit loop, admitting packets into the
//!   window every `poll_interval`;
//! - an ack listener receives cumulative acknowledgments;
//! - the retransmission timer resends the whole window when it expires.
//!
//! All window and timer state lives in one [`Mutex`]; every transition
//! (admit, ack, timeout) happens inside a single critical section. The timer
//! handle is stored next to the window and tagged with a generation number,
//! so a timer that fires after being replaced or cancelled is recognised as
//! stale and does nothing.

use crate::error::{ArqError, Result};
use crate::stats::{SendReport, SenderStats};
use bytes::Bytes;
use parking_lot::Mutex;
use rdout_io::{FaultConfig, FaultyChannel, TimerHandle, Transport};
use rdout_protocol::{AckOutcome, ArqConfig, Packet, PacketError, SendWindow, SeqNumber};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Pause after a failed receive, so a broken transport does not spin
const MIN_ERROR_BACKOFF: Duration = Duration::from_millis(1);

/// Mutable state of one send session, guarded by a single lock
#[derive(Debug)]
struct WindowState {
    window: SendWindow,
    /// Armed exactly when `window.has_unacked()`
    timer: Option<TimerHandle>,
    timer_generation: u64,
    consecutive_timeouts: u32,
    stats: SenderStats,
    failure: Option<ArqError>,
}

impl WindowState {
    fn check_invariants(&self) {
        debug_assert!(self.window.invariant_holds(), "window invariant broken: {:?}", self.window);
        debug_assert!(
            self.failure.is_some() || self.timer.is_some() == self.window.has_unacked(),
            "timer armed={} with {} packets in flight",
            self.timer.is_some(),
            self.window.in_flight()
        );
    }
}

struct Session<T: Transport> {
    state: Mutex<WindowState>,
    /// Encoded data packets, indexed by sequence number
    packets: Vec<Bytes>,
    channel: Arc<FaultyChannel<T>>,
    peer: SocketAddr,
    config: ArqConfig,
    running: AtomicBool,
}

impl<T: Transport> Session<T> {
    fn new(
        packets: Vec<Bytes>,
        channel: Arc<FaultyChannel<T>>,
        peer: SocketAddr,
        config: ArqConfig,
        stats: SenderStats,
    ) -> Self {
        Session {
            state: Mutex::new(WindowState {
                window: SendWindow::new(packets.len(), config.window_size),
                timer: None,
                timer_generation: 0,
                consecutive_timeouts: 0,
                stats,
                failure: None,
            }),
            packets,
            channel,
            peer,
            config,
            running: AtomicBool::new(true),
        }
    }

    /// Admit as many packets as the window allows and transmit each once
    fn admit(self: &Arc<Self>, state: &mut WindowState) {
        while let Some(admission) = state.window.admit() {
            let Some(index) = admission.seq.as_index() else {
                break;
            };
            tracing::debug!(
                "Sending seq={} (window {}..{})",
                admission.seq,
                state.window.base(),
                state.window.base() + state.window.window_size()
            );
            self.channel.send(self.packets[index].clone(), self.peer);
            state.stats.packets_sent += 1;

            if admission.arm_timer {
                self.arm_timer(state);
            }
        }
        state.check_invariants();
    }

    /// Replace any armed timer with a fresh one for the current base
    fn arm_timer(self: &Arc<Self>, state: &mut WindowState) {
        // Dropping the previous handle cancels it
        state.timer = None;
        state.timer_generation += 1;

        let session: Weak<Self> = Arc::downgrade(self);
        let started = TimerHandle::start(
            self.config.retransmit_timeout,
            state.timer_generation,
            move |generation| {
                if let Some(session) = session.upgrade() {
                    session.on_timeout(generation);
                }
            },
        );

        match started {
            Ok(handle) => state.timer = Some(handle),
            Err(e) => {
                tracing::warn!("Failed to arm retransmission timer: {}", e);
                state.failure = Some(ArqError::Spawn(e));
            }
        }
    }

    fn cancel_timer(state: &mut WindowState) {
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
    }

    /// Process a valid acknowledgment
    fn on_ack(self: &Arc<Self>, ack_seq: SeqNumber) {
        let mut state = self.state.lock();

        match state.window.on_ack(ack_seq) {
            AckOutcome::Advanced {
                acked,
                window_empty,
            } => {
                tracing::debug!(
                    "ACK {} acknowledged {} packet(s), base={}",
                    ack_seq,
                    acked,
                    state.window.base()
                );
                state.stats.acks_accepted += 1;
                state.consecutive_timeouts = 0;
                if window_empty {
                    Self::cancel_timer(&mut state);
                } else {
                    self.arm_timer(&mut state);
                }
            }
            AckOutcome::Stale => {
                tracing::trace!(
                    "Ignoring ACK {}, base={} next_seq={}",
                    ack_seq,
                    state.window.base(),
                    state.window.next_seq()
                );
                state.stats.acks_ignored += 1;
            }
        }
        state.check_invariants();
    }

    /// Retransmission timer expiry: resend every packet in flight
    fn on_timeout(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();

        if state.timer.as_ref().map(TimerHandle::generation) != Some(generation) {
            tracing::trace!("Stale timer #{} ignored", generation);
            return;
        }
        if state.window.is_complete() || state.failure.is_some() {
            Self::cancel_timer(&mut state);
            return;
        }

        state.consecutive_timeouts += 1;
        if let Some(max) = self.config.max_retransmissions {
            if state.consecutive_timeouts > max {
                tracing::warn!(
                    "Giving up after {} timeouts at seq={}",
                    max,
                    state.window.base()
                );
                state.failure = Some(ArqError::RetriesExhausted {
                    base: state.window.base(),
                    timeouts: max,
                });
                Self::cancel_timer(&mut state);
                return;
            }
        }

        let range = state.window.in_flight_range();
        tracing::debug!(
            "Timeout, resending from seq={} ({} packet(s))",
            state.window.base(),
            range.len()
        );
        state.stats.timeouts += 1;
        state.stats.packets_retransmitted += range.len() as u64;

        self.arm_timer(&mut state);
        for index in range {
            self.channel.send(self.packets[index].clone(), self.peer);
        }
        state.check_invariants();
    }

    /// Handle one datagram from the ack path
    fn on_datagram(self: &Arc<Self>, datagram: &[u8], from: SocketAddr) {
        let packet = match Packet::from_bytes(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::trace!("Discarding malformed datagram from {}: {}", from, e);
                self.state.lock().stats.datagrams_discarded += 1;
                return;
            }
        };

        if !packet.is_ack() || !packet.is_valid() {
            tracing::trace!("Discarding {} from {} (valid={})", packet, from, packet.is_valid());
            self.state.lock().stats.datagrams_discarded += 1;
            return;
        }

        self.on_ack(packet.seq_number());
    }

    /// Ack listener: runs until the transmit loop clears `running`
    fn ack_loop(self: Arc<Self>) {
        let transport = Arc::clone(self.channel.transport());
        let mut buf = vec![0u8; self.config.max_datagram_size];

        while self.running.load(Ordering::Acquire) {
            match transport.recv_timeout(&mut buf, self.config.recv_timeout) {
                Ok(Some((n, from))) => self.on_datagram(&buf[..n], from),
                Ok(None) => continue,
                Err(e) => {
                    tracing::trace!("Ack receive failed: {}", e);
                    thread::sleep(self.config.poll_interval.max(MIN_ERROR_BACKOFF));
                }
            }
        }
    }
}

/// Sliding-window ARQ sender
pub struct Sender<T: Transport> {
    channel: Arc<FaultyChannel<T>>,
    peer: SocketAddr,
    config: ArqConfig,
}

impl<T: Transport> Sender<T> {
    /// Create a sender towards `peer`, injecting faults per `faults`
    pub fn new(
        transport: Arc<T>,
        peer: SocketAddr,
        config: ArqConfig,
        faults: FaultConfig,
    ) -> Result<Self> {
        Sender::with_channel(Arc::new(FaultyChannel::new(transport, faults)), peer, config)
    }

    /// Create a sender over an existing fault-injecting channel
    pub fn with_channel(
        channel: Arc<FaultyChannel<T>>,
        peer: SocketAddr,
        config: ArqConfig,
    ) -> Result<Self> {
        config.validate()?;
        channel.config().validate()?;
        Ok(Sender {
            channel,
            peer,
            config,
        })
    }

    /// The channel data packets are sent through
    pub fn channel(&self) -> &Arc<FaultyChannel<T>> {
        &self.channel
    }

    /// Destination of data packets
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Active protocol configuration
    pub fn config(&self) -> &ArqConfig {
        &self.config
    }

    /// Reliably deliver `payloads`, in order, to the peer
    ///
    /// Blocks until every payload is cumulatively acknowledged. With the
    /// default configuration there is no retry limit: if the link never
    /// delivers, neither does this call return.
    ///
    /// # Panics
    /// Panics if there are more payloads than signed 32-bit sequence numbers
    pub fn send_all<I, B>(&self, payloads: I) -> Result<SendReport>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let payloads: Vec<Bytes> = payloads.into_iter().map(Into::into).collect();

        let max = self.config.max_payload_size();
        if let Some(oversized) = payloads.iter().find(|p| p.len() > max) {
            return Err(PacketError::PayloadTooLarge {
                size: oversized.len(),
                max,
            }
            .into());
        }

        let stats = SenderStats {
            packets_total: payloads.len() as u64,
            bytes_total: payloads.iter().map(|p| p.len() as u64).sum(),
            ..SenderStats::default()
        };
        let start = Instant::now();

        if payloads.is_empty() {
            return Ok(SendReport {
                stats,
                elapsed: start.elapsed(),
            });
        }

        let packets: Vec<Bytes> = payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| {
                Packet::data(SeqNumber::from_index(index), payload)
                    .to_bytes()
                    .freeze()
            })
            .collect();

        tracing::info!(
            "Sending {} packets to {} (window={})",
            packets.len(),
            self.peer,
            self.config.window_size
        );

        let session = Arc::new(Session::new(
            packets,
            Arc::clone(&self.channel),
            self.peer,
            self.config.clone(),
            stats,
        ));

        // Listen for acks before anything is transmitted
        let listener = {
            let session = Arc::clone(&session);
            thread::Builder::new()
                .name("rdout-ack".into())
                .spawn(move || session.ack_loop())?
        };

        let outcome = loop {
            {
                let mut state = session.state.lock();
                if let Some(err) = state.failure.take() {
                    break Err(err);
                }
                if state.window.is_complete() {
                    break Ok(());
                }
                session.admit(&mut state);
            }
            thread::sleep(self.config.poll_interval);
        };

        session.running.store(false, Ordering::Release);
        let stats = {
            let mut state = session.state.lock();
            Session::<T>::cancel_timer(&mut state);
            state.stats.clone()
        };
        if listener.join().is_err() {
            tracing::warn!("Ack listener panicked");
        }

        outcome?;
        let elapsed = start.elapsed();
        tracing::info!(
            "All {} packets acknowledged in {:?} ({} retransmitted)",
            stats.packets_total,
            elapsed,
            stats.packets_retransmitted
        );
        Ok(SendReport { stats, elapsed })
    }
}
