//! Fault-injecting channel
//!
//! Real networks drop, corrupt, delay and reorder datagrams. To exercise the
//! reliability mechanisms without depending on actual network conditions,
//! [`FaultyChannel`] sits between the protocol and a [`Transport`] and applies
//! a configurable fault model to every outbound datagram:
//!
//! | Fault      | Description                                                |
//! |------------|------------------------------------------------------------|
//! | Loss       | Drop the datagram with probability `loss_rate`.            |
//! | Corruption | Zero the last byte with probability `corrupt_rate`.        |
//! | Delay      | Deliver after a uniform delay in `[min_delay, max_delay]`. |
//!
//! Delayed datagrams are handed to detached threads, so concurrent sends may
//! overtake each other. Sends never report failure to the caller: a dropped
//! datagram and a failed delivery look the same as a slow one.

use crate::transport::Transport;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdout_protocol::ConfigError;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Configuration for the fault-injection model
///
/// Probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    /// Probability that a datagram is silently dropped
    pub loss_rate: f64,
    /// Probability that a datagram's last byte is zeroed
    pub corrupt_rate: f64,
    /// Lower bound of the delivery delay
    pub min_delay: Duration,
    /// Upper bound of the delivery delay
    pub max_delay: Duration,
    /// Seed for reproducible fault decisions (`None` seeds from the OS)
    pub seed: Option<u64>,
}

impl Default for FaultConfig {
    fn default() -> Self {
        // No faults by default: the channel is a transparent pass-through
        FaultConfig {
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            seed: None,
        }
    }
}

impl FaultConfig {
    /// 20% loss, 10% corruption, 100-500 ms delay
    pub fn lossy() -> Self {
        FaultConfig {
            loss_rate: 0.2,
            corrupt_rate: 0.1,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            seed: None,
        }
    }

    /// Same model with a fixed seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check probabilities and delay bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("loss_rate", self.loss_rate), ("corrupt_rate", self.corrupt_rate)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvalidDelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

/// Fault injection counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Datagrams handed to the channel
    pub sends: u64,
    /// Datagrams dropped on purpose
    pub dropped: u64,
    /// Datagrams corrupted on purpose
    pub corrupted: u64,
    /// Datagrams delivered from a delay thread
    pub delayed: u64,
    /// Deliveries the transport refused (swallowed)
    pub delivery_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sends: AtomicU64,
    dropped: AtomicU64,
    corrupted: AtomicU64,
    delayed: AtomicU64,
    delivery_failures: AtomicU64,
}

/// What the fault model decided for one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Drop,
    Deliver { corrupt: bool, delay: Duration },
}

/// A fault-injecting wrapper around a [`Transport`]
pub struct FaultyChannel<T: Transport> {
    transport: Arc<T>,
    config: FaultConfig,
    rng: Mutex<StdRng>,
    forced_drops: Mutex<BTreeSet<u64>>,
    counters: Arc<Counters>,
}

impl<T: Transport> FaultyChannel<T> {
    /// Wrap `transport` with the given fault model
    pub fn new(transport: Arc<T>, config: FaultConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        FaultyChannel {
            transport,
            config,
            rng: Mutex::new(rng),
            forced_drops: Mutex::new(BTreeSet::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// A channel that never injects faults
    pub fn passthrough(transport: Arc<T>) -> Self {
        FaultyChannel::new(transport, FaultConfig::default())
    }

    /// The wrapped transport
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// The active fault model
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Drop the `index`-th datagram (0-based) sent through this channel
    pub fn force_drop(&self, index: u64) {
        self.forced_drops.lock().insert(index);
    }

    /// Snapshot of the fault counters
    pub fn stats(&self) -> ChannelStats {
        let c = &self.counters;
        ChannelStats {
            sends: c.sends.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            corrupted: c.corrupted.load(Ordering::Relaxed),
            delayed: c.delayed.load(Ordering::Relaxed),
            delivery_failures: c.delivery_failures.load(Ordering::Relaxed),
        }
    }

    fn decide(&self, index: u64) -> Fate {
        if self.forced_drops.lock().remove(&index) {
            return Fate::Drop;
        }

        let mut rng = self.rng.lock();
        if rng.gen_bool(self.config.loss_rate.clamp(0.0, 1.0)) {
            return Fate::Drop;
        }
        let corrupt = rng.gen_bool(self.config.corrupt_rate.clamp(0.0, 1.0));
        let delay = if self.config.max_delay > self.config.min_delay {
            rng.gen_range(self.config.min_delay..=self.config.max_delay)
        } else {
            self.config.min_delay
        };
        Fate::Deliver { corrupt, delay }
    }

    /// Send `datagram` to `target` through the fault model
    ///
    /// Never blocks on the delay and never reports a failure.
    pub fn send(&self, datagram: Bytes, target: SocketAddr) {
        let index = self.counters.sends.fetch_add(1, Ordering::Relaxed);

        let (corrupt, delay) = match self.decide(index) {
            Fate::Drop => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Channel dropped datagram #{} to {}", index, target);
                return;
            }
            Fate::Deliver { corrupt, delay } => (corrupt, delay),
        };

        let datagram = if corrupt && !datagram.is_empty() {
            self.counters.corrupted.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Channel corrupted datagram #{} to {}", index, target);
            corrupt_last_byte(datagram)
        } else {
            datagram
        };

        if delay.is_zero() {
            deliver(&*self.transport, &self.counters, &datagram, target);
            return;
        }

        self.counters.delayed.fetch_add(1, Ordering::Relaxed);
        let transport = Arc::clone(&self.transport);
        let counters = Arc::clone(&self.counters);
        let spawned = thread::Builder::new()
            .name("rdout-delay".into())
            .spawn(move || {
                thread::sleep(delay);
                deliver(&*transport, &counters, &datagram, target);
            });

        if let Err(e) = spawned {
            // Without a worker the datagram is simply lost, like any other drop
            self.counters.delivery_failures.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Channel could not spawn delay worker: {}", e);
        }
    }
}

fn corrupt_last_byte(datagram: Bytes) -> Bytes {
    let mut bytes = BytesMut::from(&datagram[..]);
    if let Some(last) = bytes.last_mut() {
        *last = 0;
    }
    bytes.freeze()
}

fn deliver<T: Transport>(transport: &T, counters: &Counters, datagram: &[u8], target: SocketAddr) {
    if let Err(e) = transport.send_to(datagram, target) {
        counters.delivery_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Channel delivery to {} failed: {}", target, e);
    }
}
