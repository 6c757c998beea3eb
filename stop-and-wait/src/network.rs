//! Simulated one-directional network path.
//!
//! Real networks drop, delay, and damage frames.  To exercise the
//! reliability mechanisms without a real link, a [`NetworkPath`] sits
//! between the two protocol ends and applies a configurable fault model to
//! every frame it carries:
//!
//! | Fault       | Description                                          |
//! |-------------|------------------------------------------------------|
//! | Loss        | Drop the frame with probability `loss_probability`.  |
//! | Delay       | Hold a surviving frame for a uniform random interval |
//! |             | in `[min_delay, max_delay]`.                         |
//! | Corruption  | Flip one random bit with `corruption_probability`.   |
//! | Scripted    | Drop the next `n` frames regardless of probability.  |
//!
//! Each path owns a single-slot mailbox.  A frame that survives is placed in
//! the slot, and the far end takes it out with [`NetworkPath::recv`].  With a
//! window of one there is never more than one frame in flight per direction,
//! so frames cannot be reordered.
//!
//! Fates are drawn independently on every call, and the two directions use
//! separate paths with separate RNGs.  Seed a path with
//! [`NetworkPath::seeded`] to make a run reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, Duration};

use crate::config::NetworkConfig;
use crate::frame::Frame;

/// What happened to a frame handed to [`NetworkPath::transmit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    /// Placed in the mailbox unchanged.
    Delivered,
    /// Placed in the mailbox with one bit flipped.
    Corrupted,
    /// Never reaches the far end.
    Lost,
}

/// A lossy, delaying link carrying frames of type `F` in one direction.
#[derive(Debug)]
pub struct NetworkPath<F> {
    /// Used as the log prefix, e.g. `"data"` or `"ack"`.
    name: &'static str,
    config: NetworkConfig,
    rng: StdRng,
    /// Frames still to be dropped by [`NetworkPath::drop_next`].
    scripted_drops: usize,
    slot_tx: mpsc::Sender<F>,
    slot_rx: mpsc::Receiver<F>,
}

impl<F: Frame> NetworkPath<F> {
    /// Create a path whose RNG is seeded from the operating system.
    pub fn new(name: &'static str, config: NetworkConfig) -> Self {
        Self::with_rng(name, config, StdRng::from_os_rng())
    }

    /// Create a path with a reproducible RNG.
    pub fn seeded(name: &'static str, config: NetworkConfig, seed: u64) -> Self {
        Self::with_rng(name, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: &'static str, config: NetworkConfig, rng: StdRng) -> Self {
        let (slot_tx, slot_rx) = mpsc::channel(1);
        Self {
            name,
            config,
            rng,
            scripted_drops: 0,
            slot_tx,
            slot_rx,
        }
    }

    /// Drop the next `count` frames handed to this path, on top of the
    /// random loss model.
    pub fn drop_next(&mut self, count: usize) {
        self.scripted_drops += count;
    }

    /// Carry `frame` across the path.
    ///
    /// Loss is decided first, so a dropped frame costs no delay.  A
    /// surviving frame is held for the sampled delay before landing in the
    /// mailbox.  A frame arriving while the slot is still occupied is
    /// dropped.
    pub async fn transmit(&mut self, mut frame: F) -> Transmission {
        if self.scripted_drops > 0 {
            self.scripted_drops -= 1;
            log::debug!("[net:{}] scripted drop of {:?} #{}", self.name, F::KIND, frame.number());
            return Transmission::Lost;
        }

        let roll: f64 = self.rng.random();
        if roll < self.config.loss_probability() {
            log::debug!(
                "[net:{}] lost {:?} #{} (p={:.2}, r={roll:.3})",
                self.name,
                F::KIND,
                frame.number(),
                self.config.loss_probability()
            );
            return Transmission::Lost;
        }

        let delay = self.sample_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let mut outcome = Transmission::Delivered;
        let p_corrupt = self.config.corruption_probability();
        if p_corrupt > 0.0 && self.rng.random::<f64>() < p_corrupt && frame.bit_len() > 0 {
            let bit = self.rng.random_range(0..frame.bit_len());
            frame.flip_bit(bit);
            outcome = Transmission::Corrupted;
            log::debug!("[net:{}] corrupted {:?} (bit {bit})", self.name, F::KIND);
        }

        match self.slot_tx.try_send(frame) {
            Ok(()) => {
                log::trace!("[net:{}] delivered after {} ms", self.name, delay.as_millis());
                outcome
            }
            Err(TrySendError::Full(frame)) | Err(TrySendError::Closed(frame)) => {
                log::warn!(
                    "[net:{}] slot occupied; dropping {:?} #{}",
                    self.name,
                    F::KIND,
                    frame.number()
                );
                Transmission::Lost
            }
        }
    }

    /// Wait for the next frame to arrive in the mailbox.
    ///
    /// Never returns `None`: the path holds both ends of its slot.
    pub async fn recv(&mut self) -> Option<F> {
        self.slot_rx.recv().await
    }

    /// Take the in-flight frame, if one has arrived.
    pub fn try_recv(&mut self) -> Option<F> {
        self.slot_rx.try_recv().ok()
    }

    /// Discard whatever is sitting in the mailbox.
    pub fn clear(&mut self) {
        while self.slot_rx.try_recv().is_ok() {}
    }

    fn sample_delay(&mut self) -> Duration {
        let (min_ms, max_ms) = self.config.delay_range_ms();
        Duration::from_millis(self.rng.random_range(min_ms..=max_ms))
    }
}
