//! `stop-and-wait` — a stop-and-wait ARQ engine over a simulated network.
//!
//! One message at a time is carried reliably across a link that loses,
//! delays and (optionally) damages frames.  The sender keeps exactly one
//! frame outstanding, tags it with an alternating 0/1 sequence number and
//! retransmits it on timeout until it is acknowledged or the retry budget
//! runs out.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐   data frames   ┌──────────┐
//!  │  Sender  │────────────────▶│ Receiver │
//!  └────┬─────┘                 └─────┬────┘
//!       │          ACKs               │
//!       │◀────────────────────────────┘
//!       │
//!  ┌────▼───────────────────────────────┐
//!  │              Session               │
//!  │ (owns both ends, both paths, loop) │
//!  └────┬───────────────────────────────┘
//!       │ frames
//!  ┌────▼────────┐
//!  │ NetworkPath │  (loss · delay · corruption · one-slot mailbox)
//!  └─────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`frame`]    — frame layouts, checksum, encode / decode
//! - [`config`]   — network impairment and protocol parameters
//! - [`network`]  — simulated one-directional lossy path
//! - [`timer`]    — retransmission deadline
//! - [`sender`]   — stop-and-wait outbound state machine
//! - [`receiver`] — stop-and-wait inbound state machine
//! - [`session`]  — drives a message end-to-end
//! - [`stats`]    — transmission counters
//!
//! The library never prints; progress is reported through the [`log`]
//! facade and results come back as values.

pub mod config;
pub mod frame;
pub mod network;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod stats;
pub mod timer;

pub use config::{
    ConfigError, DuplicatePolicy, NetworkConfig, ProtocolConfig, MAX_RETRIES, TIMEOUT_MS,
};
pub use frame::{compute_checksum, AckFrame, DataFrame, Frame, FrameError, SeqNum, MAX_DATA_SIZE};
pub use session::{transmit_message, Delivery, Session, TransmitError};
pub use stats::Statistics;
