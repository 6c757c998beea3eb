//! Outbound state for stop-and-wait reliability.
//!
//! [`Sender`] tracks the alternating sequence number, the single in-flight
//! frame, its retry budget and the retransmission timer.  It does **not**
//! touch the network; [`crate::session::Session`] calls these methods and
//! owns the actual send/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** frame is in flight at any moment (`in_flight`).
//! - A new frame may only be submitted once the sender is [`SenderState::Idle`].
//! - On a valid ack for the current sequence number: flip the sequence
//!   number, clear `in_flight`, go idle.
//! - On timeout: resend the same frame unchanged until `max_retries`
//!   retransmissions have been spent, then give up.

use std::time::Duration;

use thiserror::Error;

use crate::frame::{AckFrame, DataFrame, Frame, FrameError, SeqNum};
use crate::timer::RetransmitTimer;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// Waiting for the next message to send.
    #[default]
    Idle,
    /// A frame is in flight and unacknowledged.
    AwaitingAck,
}

/// The frame that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub frame: DataFrame,
    /// Retransmissions spent on this frame so far (0 = only the first send).
    pub retry_count: u32,
}

/// Result of handing an ack to [`Sender::on_ack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The in-flight frame is acknowledged; the sender is idle again.
    Accepted { seq: SeqNum, retries: u32 },
    /// The ack failed verification and was discarded.
    Corrupted,
    /// A valid ack for the other sequence number; discarded.
    Unexpected { got: SeqNum, expected: SeqNum },
    /// Nothing was in flight.
    NotAwaiting,
}

/// What the caller must do after the timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutAction {
    /// Send this frame again and restart the timer.
    Retransmit(DataFrame),
    /// Retry budget exhausted; the message is abandoned.
    GiveUp { retries: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a frame is already awaiting acknowledgment")]
    Busy,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Stop-and-wait send-side state.
#[derive(Debug)]
pub struct Sender {
    state: SenderState,
    /// Sequence number of the next frame, or of the one in flight.
    ///
    /// Flips only when an ack is accepted.
    seq: SeqNum,
    max_retries: u32,
    in_flight: Option<InFlight>,
    timer: RetransmitTimer,
}

impl Sender {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            state: SenderState::Idle,
            seq: SeqNum::ZERO,
            max_retries,
            in_flight: None,
            timer: RetransmitTimer::new(timeout),
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn seq(&self) -> SeqNum {
        self.seq
    }

    /// Retransmissions spent on the in-flight frame, `0` when idle.
    pub fn retry_count(&self) -> u32 {
        self.in_flight.as_ref().map_or(0, |entry| entry.retry_count)
    }

    pub fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    pub fn timer(&self) -> &RetransmitTimer {
        &self.timer
    }

    /// Build the data frame for `payload` and move to
    /// [`SenderState::AwaitingAck`].
    ///
    /// The returned copy is for the network; call [`Sender::on_transmitted`]
    /// once it has been handed over to start the timer.
    pub fn submit(&mut self, payload: &[u8]) -> Result<DataFrame, SubmitError> {
        if self.state != SenderState::Idle {
            return Err(SubmitError::Busy);
        }
        let frame = DataFrame::new(self.seq, payload)?;
        log::debug!("[sender] → DATA seq={} len={}", frame.seq, frame.payload_len());
        self.in_flight = Some(InFlight {
            frame: frame.clone(),
            retry_count: 0,
        });
        self.state = SenderState::AwaitingAck;
        Ok(frame)
    }

    /// (Re)start the retransmission timer after a send.
    pub fn on_transmitted(&mut self) {
        if self.state == SenderState::AwaitingAck {
            self.timer.arm();
        }
    }

    /// Process an inbound ack.
    pub fn on_ack(&mut self, ack: &AckFrame) -> AckOutcome {
        if self.state != SenderState::AwaitingAck {
            return AckOutcome::NotAwaiting;
        }
        if !ack.verify() {
            log::debug!("[sender] ← ACK failed checksum; ignoring");
            return AckOutcome::Corrupted;
        }
        if ack.ack != self.seq {
            log::debug!("[sender] ← ACK ack={} (expected {}); ignoring", ack.ack, self.seq);
            return AckOutcome::Unexpected {
                got: ack.ack,
                expected: self.seq,
            };
        }

        let retries = self.retry_count();
        let seq = self.seq;
        self.finish();
        self.seq = seq.next();
        log::debug!("[sender] ← ACK ack={seq}; next seq={}", self.seq);
        AckOutcome::Accepted { seq, retries }
    }

    /// Apply the retry policy after the timer fires.
    ///
    /// Returns `None` when nothing is in flight.
    pub fn on_timeout(&mut self) -> Option<TimeoutAction> {
        let max_retries = self.max_retries;
        let entry = self.in_flight.as_mut()?;

        if entry.retry_count < max_retries {
            entry.retry_count += 1;
            log::debug!(
                "[sender] timeout — retransmitting seq={} ({}/{})",
                entry.frame.seq,
                entry.retry_count,
                max_retries
            );
            return Some(TimeoutAction::Retransmit(entry.frame.clone()));
        }

        let retries = entry.retry_count;
        log::warn!("[sender] seq={} unacknowledged after {retries} retransmissions", self.seq);
        self.finish();
        Some(TimeoutAction::GiveUp { retries })
    }

    /// Return to the initial state, sequence number included.
    pub fn reset(&mut self) {
        self.finish();
        self.seq = SeqNum::ZERO;
    }

    fn finish(&mut self) {
        self.state = SenderState::Idle;
        self.in_flight = None;
        self.timer.cancel();
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
