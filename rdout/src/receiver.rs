//! ARQ sink
//!
//! [`Receiver::run`] accepts only the next expected packet, hands its payload
//! to the application and acknowledges it. Anything else that arrives intact
//! is answered with the last cumulative ack so the sender goes back to the
//! first missing packet. Acks travel through the same fault-injecting channel
//! as data, so they may be lost too; the sender's timer covers that.

use crate::error::Result;
use crate::stats::ReceiverStats;
use bytes::Bytes;
use rdout_io::{FaultConfig, FaultyChannel, Transport};
use rdout_protocol::{ArqConfig, Packet, ReceiveDecision, ReceiveState, SeqNumber};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const MIN_ERROR_BACKOFF: Duration = Duration::from_millis(1);

/// A payload accepted in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Sequence number of the packet that carried it
    pub seq: SeqNumber,
    /// Application data
    pub payload: Bytes,
    /// Address the packet came from
    pub from: SocketAddr,
}

/// Sliding-window ARQ receiver
///
/// `expected_seq` lives as long as the receiver: a second sender session
/// that starts again at sequence 0 is treated as a stream of duplicates.
pub struct Receiver<T: Transport> {
    channel: Arc<FaultyChannel<T>>,
    state: ReceiveState,
    config: ArqConfig,
    stats: ReceiverStats,
    shutdown: Arc<AtomicBool>,
}

impl<T: Transport> Receiver<T> {
    /// Create a receiver; acks are sent through a channel with `faults`
    pub fn new(transport: Arc<T>, config: ArqConfig, faults: FaultConfig) -> Result<Self> {
        Receiver::with_channel(Arc::new(FaultyChannel::new(transport, faults)), config)
    }

    /// Create a receiver over an existing fault-injecting channel
    pub fn with_channel(channel: Arc<FaultyChannel<T>>, config: ArqConfig) -> Result<Self> {
        config.validate()?;
        channel.config().validate()?;
        Ok(Receiver {
            channel,
            state: ReceiveState::new(),
            config,
            stats: ReceiverStats::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops [`Receiver::run`] at its next receive poll
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Next sequence number that will be accepted
    pub fn expected_seq(&self) -> SeqNumber {
        self.state.expected_seq()
    }

    /// Counters so far
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// The channel acks are sent through
    pub fn channel(&self) -> &Arc<FaultyChannel<T>> {
        &self.channel
    }

    /// Process one datagram: deliver it if it is the expected one, then ack
    ///
    /// Returns the acknowledgment handed to the channel, if any.
    pub fn handle_datagram<F>(
        &mut self,
        datagram: &[u8],
        from: SocketAddr,
        on_deliver: &mut F,
    ) -> Option<SeqNumber>
    where
        F: FnMut(Delivery),
    {
        let packet = match Packet::from_bytes(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::trace!("Discarding malformed datagram from {}: {}", from, e);
                self.stats.datagrams_discarded += 1;
                return None;
            }
        };

        let decision = self.state.on_packet(&packet);
        match &decision {
            ReceiveDecision::Deliver { ack } => {
                tracing::debug!("Accepted {} from {}", packet, from);
                self.stats.packets_delivered += 1;
                self.stats.bytes_delivered += packet.payload.len() as u64;
                on_deliver(Delivery {
                    seq: *ack,
                    payload: packet.payload,
                    from,
                });
            }
            ReceiveDecision::Reject { ack } => {
                tracing::debug!(
                    "Out of order {} from {}, expected {}, re-acking {}",
                    packet,
                    from,
                    self.state.expected_seq(),
                    ack
                );
                self.stats.out_of_order += 1;
            }
            ReceiveDecision::Discard => {
                tracing::trace!("Discarding {} from {} (corrupt or not data)", packet, from);
                self.stats.datagrams_discarded += 1;
            }
        }

        let ack = decision.ack()?;
        let bytes = Packet::ack(ack).to_bytes().freeze();
        self.channel.send(bytes, from);
        self.stats.acks_sent += 1;
        Some(ack)
    }

    /// Receive, deliver and acknowledge until shutdown is requested
    ///
    /// Payloads reach `on_deliver` strictly in sequence order, each exactly
    /// once. Without a shutdown request this never returns.
    pub fn run<F>(&mut self, mut on_deliver: F) -> ReceiverStats
    where
        F: FnMut(Delivery),
    {
        let transport = Arc::clone(self.channel.transport());
        let mut buf = vec![0u8; self.config.max_datagram_size];

        match transport.local_addr() {
            Ok(addr) => tracing::info!("Receiver listening on {}", addr),
            Err(e) => tracing::info!("Receiver listening (address unknown: {})", e),
        }

        while !self.shutdown.load(Ordering::Acquire) {
            match transport.recv_timeout(&mut buf, self.config.recv_timeout) {
                Ok(Some((n, from))) => {
                    self.handle_datagram(&buf[..n], from, &mut on_deliver);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::trace!("Receive failed: {}", e);
                    thread::sleep(self.config.poll_interval.max(MIN_ERROR_BACKOFF));
                }
            }
        }

        tracing::info!(
            "Receiver stopped after delivering {} packets",
            self.stats.packets_delivered
        );
        self.stats.clone()
    }
}
