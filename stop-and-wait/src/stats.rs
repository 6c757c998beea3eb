//! Transmission counters.
//!
//! A [`Statistics`] value is owned by the caller and threaded through
//! successive transmissions; the session is its only writer.  Counters only
//! ever grow.  Formatting is left to the caller.

use std::time::Duration;

use tokio::time::Instant;

/// Cumulative counters for one or more transmissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Data frames handed to the network, retransmissions included.
    pub(crate) frames_sent: u64,
    /// Data frames that reached the receiver, damaged or not.
    pub(crate) frames_received: u64,
    pub(crate) acks_sent: u64,
    pub(crate) acks_received: u64,
    pub(crate) retransmissions: u64,
    /// Frames of either kind dropped by the network.
    pub(crate) frames_lost: u64,
    /// Frames of either kind that arrived but failed verification.
    pub(crate) frames_corrupted: u64,
    /// Valid data frames the receiver had already accepted.
    pub(crate) duplicate_frames: u64,
    pub(crate) start_time: Option<Instant>,
    pub(crate) end_time: Option<Instant>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn acks_sent(&self) -> u64 {
        self.acks_sent
    }

    pub fn acks_received(&self) -> u64 {
        self.acks_received
    }

    pub fn retransmissions(&self) -> u64 {
        self.retransmissions
    }

    pub fn frames_lost(&self) -> u64 {
        self.frames_lost
    }

    pub fn frames_corrupted(&self) -> u64 {
        self.frames_corrupted
    }

    pub fn duplicate_frames(&self) -> u64 {
        self.duplicate_frames
    }

    /// When the first transmission began.
    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// When the most recent transmission finished, successfully or not.
    pub fn end_time(&self) -> Option<Instant> {
        self.end_time
    }

    /// Time from the first transmission to the end of the latest one.
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }

    /// Fraction of sent frames that were not dropped,
    /// `(frames_sent - frames_lost) / frames_sent`.
    ///
    /// Lost acks count against the rate too.  `None` before anything is sent.
    pub fn delivery_rate(&self) -> Option<f64> {
        (self.frames_sent > 0).then(|| {
            self.frames_sent.saturating_sub(self.frames_lost) as f64 / self.frames_sent as f64
        })
    }

    /// `retransmissions / frames_sent`, `None` before anything is sent.
    pub fn retransmission_rate(&self) -> Option<f64> {
        (self.frames_sent > 0).then(|| self.retransmissions as f64 / self.frames_sent as f64)
    }

    pub(crate) fn mark_started(&mut self) {
        self.start_time.get_or_insert_with(Instant::now);
    }

    pub(crate) fn mark_finished(&mut self) {
        self.end_time = Some(Instant::now());
    }
}
