//! Cancellable one-shot timers
//!
//! A [`TimerHandle`] owns a parked thread that runs a callback once its
//! duration elapses. Cancelling the handle, or simply dropping it, wakes the
//! thread and guarantees the callback is not started afterwards. A callback
//! that already started keeps running; callers that need to tell such a late
//! firing apart use the handle's generation number.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::io;
use std::thread;
use std::time::Duration;

/// Handle to an armed timer
#[derive(Debug)]
pub struct TimerHandle {
    cancel: Option<Sender<()>>,
    generation: u64,
}

impl TimerHandle {
    /// Arm a timer that calls `on_fire(generation)` after `duration`
    pub fn start<F>(duration: Duration, generation: u64, on_fire: F) -> io::Result<Self>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        // A zero-capacity channel never carries a message; disconnection is the signal
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);

        thread::Builder::new()
            .name(format!("rdout-timer-{}", generation))
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(duration) {
                    on_fire(generation);
                }
            })?;

        Ok(TimerHandle {
            cancel: Some(cancel_tx),
            generation,
        })
    }

    /// Generation number this timer was armed with
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Disarm the timer
    pub fn cancel(mut self) {
        self.cancel.take();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the timer thread
        self.cancel.take();
    }
}
