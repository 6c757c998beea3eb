//! Inbound state for stop-and-wait reliability.
//!
//! The [`Receiver`] sits in a single steady state, waiting for data.  For
//! every arriving [`DataFrame`] it:
//! - Verifies the checksum; a damaged frame is dropped without an ack and
//!   the sender's timeout recovers it.
//! - Accepts an in-order frame (`seq == expected`), queues its payload for
//!   the application and produces the ack.
//! - Discards a duplicate (`seq != expected`), re-acknowledging it or not
//!   according to [`DuplicatePolicy`].
//!
//! Like [`crate::sender::Sender`], the receiver never touches the network;
//! it returns the ack for the session to send.

use std::collections::VecDeque;

use crate::config::DuplicatePolicy;
use crate::frame::{AckFrame, DataFrame, Frame, SeqNum};

/// Result of handing a data frame to [`Receiver::on_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// New payload accepted; send `ack`.
    Accepted { ack: AckFrame },
    /// Already-accepted frame; send `ack` if the policy re-acks.
    Duplicate { ack: Option<AckFrame> },
    /// Failed verification; dropped silently.
    Corrupted,
}

/// Stop-and-wait receive-side state.
#[derive(Debug)]
pub struct Receiver {
    /// Sequence number of the next new frame.
    expected: SeqNum,
    policy: DuplicatePolicy,
    /// Accepted payloads not yet read by the application.
    delivered: VecDeque<Vec<u8>>,
}

impl Receiver {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            expected: SeqNum::ZERO,
            policy,
            delivered: VecDeque::new(),
        }
    }

    pub fn expected_seq(&self) -> SeqNum {
        self.expected
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn on_data(&mut self, frame: &DataFrame) -> ReceiveOutcome {
        if !frame.verify() {
            log::debug!("[receiver] ← DATA failed checksum; dropping");
            return ReceiveOutcome::Corrupted;
        }

        if frame.seq != self.expected {
            let ack = match self.policy {
                DuplicatePolicy::Reack => Some(AckFrame::new(frame.seq)),
                DuplicatePolicy::Discard => None,
            };
            log::debug!(
                "[receiver] ← DATA seq={} duplicate (expected {}); re-ack={}",
                frame.seq,
                self.expected,
                ack.is_some()
            );
            return ReceiveOutcome::Duplicate { ack };
        }

        self.delivered.push_back(frame.payload.clone());
        self.expected = self.expected.next();
        log::debug!(
            "[receiver] ← DATA seq={} len={} accepted; → ACK",
            frame.seq,
            frame.payload_len()
        );
        ReceiveOutcome::Accepted {
            ack: AckFrame::new(frame.seq),
        }
    }

    /// Pop the oldest accepted payload.
    pub fn read(&mut self) -> Option<Vec<u8>> {
        self.delivered.pop_front()
    }

    /// Number of accepted payloads waiting to be read.
    pub fn pending(&self) -> usize {
        self.delivered.len()
    }

    /// Expect `seq` next, keeping payloads already accepted.
    ///
    /// Used after the sender gives up: it retries the next message under
    /// the same sequence number, which the receiver may have consumed.
    pub fn resync(&mut self, seq: SeqNum) {
        if self.expected != seq {
            log::debug!("[receiver] resync: expected {} -> {seq}", self.expected);
        }
        self.expected = seq;
    }

    /// Forget all state, expecting sequence number 0 next.
    pub fn reset(&mut self) {
        self.expected = SeqNum::ZERO;
        self.delivered.clear();
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
