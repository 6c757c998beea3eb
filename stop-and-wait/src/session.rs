//! Transmission orchestrator: drives one message end-to-end.
//!
//! # Architecture
//!
//! ```text
//!            submit                 data path                on_data
//!  ┌────────┐ ───▶ ┌──────────────────────────────────┐ ───▶ ┌──────────┐
//!  │ Sender │      │ loss · delay · corruption · slot │      │ Receiver │
//!  └────────┘ ◀─── └──────────────────────────────────┘ ◀─── └──────────┘
//!            on_ack                  ack path                  ack
//! ```
//!
//! A [`Session`] owns both protocol ends and both network paths, and runs
//! a single cooperative loop over three event sources:
//!
//! 1. a data frame arriving in the data path's slot → [`Receiver::on_data`],
//!    whose ack (if any) goes out on the ack path;
//! 2. an ack arriving in the ack path's slot → [`Sender::on_ack`];
//! 3. the sender's retransmission deadline → [`Sender::on_timeout`].
//!
//! The loop ends when the sender accepts an ack or gives up.  The
//! [`Statistics`] passed in is updated from the outcomes each component
//! reports; nothing else writes to it.
//!
//! Two entry points:
//!
//! **One-shot** — fresh sender and receiver for every call:
//! ```ignore
//! let mut stats = Statistics::new();
//! transmit_message(b"ABC", NetworkConfig::ideal(), &mut stats).await?;
//! ```
//!
//! **Session** — sequence numbers carry over between messages:
//! ```ignore
//! let mut session = Session::new(NetworkConfig::normal(), ProtocolConfig::default())?;
//! session.transmit(b"first", &mut stats).await?;
//! session.transmit(b"second", &mut stats).await?;
//! ```

use thiserror::Error;

use crate::config::{ConfigError, NetworkConfig, ProtocolConfig};
use crate::frame::{AckFrame, DataFrame, SeqNum};
use crate::network::{NetworkPath, Transmission};
use crate::receiver::{ReceiveOutcome, Receiver};
use crate::sender::{AckOutcome, Sender, SubmitError, TimeoutAction};
use crate::stats::Statistics;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Successful delivery of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Sequence number the message travelled under.
    pub seq: SeqNum,
    /// Retransmissions it took.
    pub retransmissions: u32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransmitError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message of {len} bytes exceeds the {max}-byte limit")]
    MessageTooLarge { len: usize, max: usize },
    /// No matching ack after the whole retry budget.  The caller decides
    /// whether to send the message again.
    #[error("no acknowledgment after {retransmissions} retransmissions")]
    PermanentFailure { retransmissions: u32 },
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Sender, receiver and the two network paths between them.
#[derive(Debug)]
pub struct Session {
    protocol: ProtocolConfig,
    sender: Sender,
    receiver: Receiver,
    data_path: NetworkPath<DataFrame>,
    ack_path: NetworkPath<AckFrame>,
}

impl Session {
    /// Both directions use `network`, each with its own OS-seeded RNG.
    pub fn new(network: NetworkConfig, protocol: ProtocolConfig) -> Result<Self, ConfigError> {
        Self::with_paths(
            protocol,
            NetworkPath::new("data", network),
            NetworkPath::new("ack", network),
        )
    }

    /// Reproducible session: the paths are seeded from `seed`.
    pub fn seeded(
        network: NetworkConfig,
        protocol: ProtocolConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::with_paths(
            protocol,
            NetworkPath::seeded("data", network, seed),
            NetworkPath::seeded("ack", network, seed.wrapping_add(1)),
        )
    }

    /// Use separately configured paths, e.g. a lossy data direction and a
    /// clean ack direction.
    pub fn with_paths(
        protocol: ProtocolConfig,
        data_path: NetworkPath<DataFrame>,
        ack_path: NetworkPath<AckFrame>,
    ) -> Result<Self, ConfigError> {
        protocol.validate()?;
        Ok(Self {
            sender: Sender::new(protocol.timeout, protocol.max_retries),
            receiver: Receiver::new(protocol.duplicate_policy),
            protocol,
            data_path,
            ack_path,
        })
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn data_path_mut(&mut self) -> &mut NetworkPath<DataFrame> {
        &mut self.data_path
    }

    pub fn ack_path_mut(&mut self) -> &mut NetworkPath<AckFrame> {
        &mut self.ack_path
    }

    /// Next payload the receiver accepted, in delivery order.
    pub fn receive(&mut self) -> Option<Vec<u8>> {
        self.receiver.read()
    }

    /// Put both ends back to sequence number 0, drop undelivered payloads
    /// and empty both paths.
    pub fn reset(&mut self) {
        self.sender.reset();
        self.receiver.reset();
        self.data_path.clear();
        self.ack_path.clear();
    }

    /// Reliably deliver `payload` to the receiver.
    ///
    /// Messages must be `1..max_data_size` bytes long; anything else is
    /// rejected before a frame is built.  Returns
    /// [`TransmitError::PermanentFailure`] once the retry budget is spent.
    /// The receiver may still have accepted the message in that case, since
    /// only its acks were lost; either way the session stays usable and the
    /// next message is carried under the sequence number both ends expect.
    /// `stats` is updated either way.
    pub async fn transmit(
        &mut self,
        payload: &[u8],
        stats: &mut Statistics,
    ) -> Result<Delivery, TransmitError> {
        if payload.is_empty() {
            return Err(TransmitError::EmptyMessage);
        }
        if payload.len() >= self.protocol.max_data_size {
            return Err(TransmitError::MessageTooLarge {
                len: payload.len(),
                max: self.protocol.max_data_size - 1,
            });
        }

        let Self {
            sender,
            receiver,
            data_path,
            ack_path,
            ..
        } = self;

        stats.mark_started();
        let frame = sender.submit(payload)?;
        log::info!("[session] sending {} bytes as seq={}", payload.len(), frame.seq);
        send_data(sender, data_path, frame, stats).await;

        loop {
            tokio::select! {
                biased;

                Some(frame) = data_path.recv() => {
                    stats.frames_received += 1;
                    match receiver.on_data(&frame) {
                        ReceiveOutcome::Accepted { ack } => send_ack(ack_path, ack, stats).await,
                        ReceiveOutcome::Duplicate { ack } => {
                            stats.duplicate_frames += 1;
                            if let Some(ack) = ack {
                                send_ack(ack_path, ack, stats).await;
                            }
                        }
                        ReceiveOutcome::Corrupted => stats.frames_corrupted += 1,
                    }
                }

                Some(ack) = ack_path.recv() => {
                    stats.acks_received += 1;
                    match sender.on_ack(&ack) {
                        AckOutcome::Accepted { seq, retries } => {
                            stats.mark_finished();
                            log::info!(
                                "[session] seq={seq} delivered after {retries} retransmission(s)"
                            );
                            return Ok(Delivery {
                                seq,
                                retransmissions: retries,
                            });
                        }
                        AckOutcome::Corrupted => stats.frames_corrupted += 1,
                        AckOutcome::Unexpected { .. } | AckOutcome::NotAwaiting => {}
                    }
                }

                () = sender.timer().expired() => {
                    match sender.on_timeout() {
                        Some(TimeoutAction::Retransmit(frame)) => {
                            stats.retransmissions += 1;
                            send_data(sender, data_path, frame, stats).await;
                        }
                        Some(TimeoutAction::GiveUp { retries }) => {
                            stats.mark_finished();
                            log::warn!("[session] giving up after {retries} retransmission(s)");
                            // The receiver may already have accepted this seq.
                            receiver.resync(sender.seq());
                            data_path.clear();
                            ack_path.clear();
                            return Err(TransmitError::PermanentFailure {
                                retransmissions: retries,
                            });
                        }
                        // The timer is only armed while a frame is in flight.
                        None => {}
                    }
                }
            }
        }
    }
}

/// Run one message through a fresh session with the default protocol.
///
/// Mirrors a single stand-alone transfer: sequence numbers start at 0 on
/// every call.  Only `stats` carries over between calls.
pub async fn transmit_message(
    payload: &[u8],
    network: NetworkConfig,
    stats: &mut Statistics,
) -> Result<Delivery, TransmitError> {
    let mut session = Session::new(network, ProtocolConfig::default())?;
    session.transmit(payload, stats).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn send_data(
    sender: &mut Sender,
    path: &mut NetworkPath<DataFrame>,
    frame: DataFrame,
    stats: &mut Statistics,
) {
    stats.frames_sent += 1;
    if path.transmit(frame).await == Transmission::Lost {
        stats.frames_lost += 1;
    }
    sender.on_transmitted();
}

async fn send_ack(path: &mut NetworkPath<AckFrame>, ack: AckFrame, stats: &mut Statistics) {
    stats.acks_sent += 1;
    if path.transmit(ack).await == Transmission::Lost {
        stats.frames_lost += 1;
    }
}
