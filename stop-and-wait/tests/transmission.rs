//! End-to-end tests for message transmission over the simulated network.
//!
//! Every test runs with tokio's clock paused: network delays and
//! retransmission timeouts advance virtual time, so a run that waits out
//! four one-second timeouts still finishes instantly.

use std::time::Duration;

use stop_and_wait::network::NetworkPath;
use stop_and_wait::sender::SenderState;
use stop_and_wait::{
    transmit_message, DuplicatePolicy, NetworkConfig, ProtocolConfig, SeqNum, Session, Statistics,
    TransmitError, MAX_DATA_SIZE, MAX_RETRIES,
};

fn network(loss: f64, min_ms: u64, max_ms: u64) -> NetworkConfig {
    NetworkConfig::new(loss, min_ms, max_ms).expect("valid network config")
}

fn session_with(data: NetworkConfig, ack: NetworkConfig, protocol: ProtocolConfig) -> Session {
    Session::with_paths(
        protocol,
        NetworkPath::seeded("data", data, 17),
        NetworkPath::seeded("ack", ack, 18),
    )
    .expect("valid protocol config")
}

// ---------------------------------------------------------------------------
// Clean network
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn abc_over_clean_network() {
    let mut stats = Statistics::new();
    let delivery = transmit_message(b"ABC", network(0.0, 1, 5), &mut stats)
        .await
        .expect("delivery");

    assert_eq!(delivery.seq, SeqNum::ZERO);
    assert_eq!(delivery.retransmissions, 0);
    assert_eq!(stats.frames_sent(), 1);
    assert_eq!(stats.frames_received(), 1);
    assert_eq!(stats.acks_sent(), 1);
    assert_eq!(stats.acks_received(), 1);
    assert_eq!(stats.retransmissions(), 0);
    assert_eq!(stats.frames_lost(), 0);

    // One data delay plus one ack delay, each 1-5 ms.
    let elapsed = stats.elapsed().expect("finished");
    assert!(elapsed >= Duration::from_millis(2), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(10), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn every_valid_length_succeeds_without_retransmission() {
    for len in [1, 2, 64, 512, MAX_DATA_SIZE - 1] {
        let payload = vec![0xa5u8; len];
        let mut stats = Statistics::new();
        let result = transmit_message(&payload, NetworkConfig::perfect(), &mut stats).await;

        assert!(result.is_ok(), "length {len}: {result:?}");
        assert_eq!(stats.frames_lost(), 0, "length {len}");
        assert_eq!(stats.retransmissions(), 0, "length {len}");
    }
}

#[tokio::test(start_paused = true)]
async fn payload_arrives_intact() {
    let mut session = session_with(
        NetworkConfig::ideal(),
        NetworkConfig::ideal(),
        ProtocolConfig::default(),
    );
    let mut stats = Statistics::new();
    session
        .transmit(b"stop-and-wait test message", &mut stats)
        .await
        .expect("delivery");

    assert_eq!(session.receive(), Some(b"stop-and-wait test message".to_vec()));
    assert_eq!(session.receive(), None);
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn empty_and_oversized_messages_rejected_before_any_frame() {
    let mut stats = Statistics::new();

    assert_eq!(
        transmit_message(b"", NetworkConfig::perfect(), &mut stats).await,
        Err(TransmitError::EmptyMessage)
    );

    let too_large = vec![b'A'; MAX_DATA_SIZE];
    assert_eq!(
        transmit_message(&too_large, NetworkConfig::perfect(), &mut stats).await,
        Err(TransmitError::MessageTooLarge {
            len: MAX_DATA_SIZE,
            max: MAX_DATA_SIZE - 1
        })
    );

    let way_too_large = vec![b'A'; MAX_DATA_SIZE + 50];
    assert!(matches!(
        transmit_message(&way_too_large, NetworkConfig::perfect(), &mut stats).await,
        Err(TransmitError::MessageTooLarge { .. })
    ));

    assert_eq!(stats.frames_sent(), 0);
    assert_eq!(stats.start_time(), None);
}

// ---------------------------------------------------------------------------
// Loss and retry budget
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn total_loss_fails_after_exactly_max_retries() {
    let mut session = session_with(
        network(1.0, 0, 0),
        network(1.0, 0, 0),
        ProtocolConfig::default(),
    );
    let mut stats = Statistics::new();

    let result = session.transmit(b"ABC", &mut stats).await;

    assert_eq!(
        result,
        Err(TransmitError::PermanentFailure {
            retransmissions: MAX_RETRIES
        })
    );
    assert_eq!(stats.retransmissions(), u64::from(MAX_RETRIES));
    assert_eq!(stats.frames_sent(), u64::from(MAX_RETRIES) + 1);
    assert_eq!(stats.frames_lost(), u64::from(MAX_RETRIES) + 1);
    assert_eq!(stats.frames_received(), 0);
    assert_eq!(stats.acks_received(), 0);
    assert_eq!(session.sender().state(), SenderState::Idle);

    // First send plus three retransmissions, each waited out in full.
    assert_eq!(stats.elapsed(), Some(Duration::from_secs(4)));
}

#[tokio::test(start_paused = true)]
async fn data_path_loss_alone_exhausts_retries() {
    let mut stats = Statistics::new();
    let mut session = session_with(
        network(1.0, 0, 0),
        NetworkConfig::perfect(),
        ProtocolConfig::default(),
    );

    let result = session.transmit(b"ABC", &mut stats).await;

    assert!(matches!(result, Err(TransmitError::PermanentFailure { retransmissions: 3 })));
    assert_eq!(stats.acks_sent(), 0);
    assert_eq!(session.receiver().pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn single_data_loss_recovered_by_one_retransmission() {
    let mut session = session_with(
        NetworkConfig::perfect(),
        NetworkConfig::perfect(),
        ProtocolConfig::default(),
    );
    session.data_path_mut().drop_next(1);
    let mut stats = Statistics::new();

    let delivery = session.transmit(b"ABC", &mut stats).await.expect("delivery");

    assert_eq!(delivery.retransmissions, 1);
    assert_eq!(stats.frames_sent(), 2);
    assert_eq!(stats.frames_lost(), 1);
    assert_eq!(stats.duplicate_frames(), 0);
    assert_eq!(stats.elapsed(), Some(Duration::from_secs(1)));
}

#[tokio::test(start_paused = true)]
async fn custom_retry_budget_is_honoured() {
    let protocol = ProtocolConfig {
        max_retries: 7,
        timeout: Duration::from_millis(200),
        ..ProtocolConfig::default()
    };
    let mut session = session_with(network(1.0, 0, 0), network(1.0, 0, 0), protocol);
    let mut stats = Statistics::new();

    let result = session.transmit(b"x", &mut stats).await;

    assert_eq!(result, Err(TransmitError::PermanentFailure { retransmissions: 7 }));
    assert_eq!(stats.elapsed(), Some(Duration::from_millis(8 * 200)));
}

// ---------------------------------------------------------------------------
// Ack loss and duplicates
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn lost_ack_causes_one_duplicate_then_success() {
    let mut session = session_with(
        NetworkConfig::perfect(),
        NetworkConfig::perfect(),
        ProtocolConfig::default(),
    );
    session.ack_path_mut().drop_next(1);
    let mut stats = Statistics::new();

    let delivery = session.transmit(b"ABC", &mut stats).await.expect("delivery");

    assert_eq!(delivery.seq, SeqNum::ZERO);
    assert_eq!(delivery.retransmissions, 1);
    assert_eq!(stats.retransmissions(), 1);
    assert_eq!(stats.frames_received(), 2);
    assert_eq!(stats.duplicate_frames(), 1);
    assert_eq!(stats.acks_sent(), 2);
    assert_eq!(stats.acks_received(), 1);

    // The duplicate is not delivered twice.
    assert_eq!(session.receive(), Some(b"ABC".to_vec()));
    assert_eq!(session.receive(), None);
}

#[tokio::test(start_paused = true)]
async fn lost_ack_without_reack_exhausts_retries() {
    let protocol = ProtocolConfig {
        duplicate_policy: DuplicatePolicy::Discard,
        ..ProtocolConfig::default()
    };
    let mut session = session_with(NetworkConfig::perfect(), NetworkConfig::perfect(), protocol);
    session.ack_path_mut().drop_next(1);
    let mut stats = Statistics::new();

    let result = session.transmit(b"ABC", &mut stats).await;

    assert_eq!(
        result,
        Err(TransmitError::PermanentFailure {
            retransmissions: MAX_RETRIES
        })
    );
    assert_eq!(stats.duplicate_frames(), u64::from(MAX_RETRIES));
    assert_eq!(stats.acks_sent(), 1);
    // The receiver did get the message; only the sender never learned it.
    assert_eq!(session.receiver().pending(), 1);
}

#[tokio::test(start_paused = true)]
async fn message_after_failure_with_lost_acks_is_really_delivered() {
    let mut session = session_with(
        NetworkConfig::perfect(),
        NetworkConfig::perfect(),
        ProtocolConfig::default(),
    );
    // Every ack for the first message goes missing.
    session.ack_path_mut().drop_next(MAX_RETRIES as usize + 1);
    let mut stats = Statistics::new();

    let first = session.transmit(b"one", &mut stats).await;
    assert_eq!(
        first,
        Err(TransmitError::PermanentFailure {
            retransmissions: MAX_RETRIES
        })
    );
    assert_eq!(session.receiver().expected_seq(), session.sender().seq());

    let second = session.transmit(b"two", &mut stats).await.expect("second");
    assert_eq!(second.retransmissions, 0);

    assert_eq!(session.receive(), Some(b"one".to_vec()));
    assert_eq!(session.receive(), Some(b"two".to_vec()));
    assert_eq!(session.receive(), None);
}

#[tokio::test(start_paused = true)]
async fn failure_on_sequence_one_keeps_ends_in_step() {
    let mut session = session_with(
        NetworkConfig::perfect(),
        NetworkConfig::perfect(),
        ProtocolConfig::default(),
    );
    let mut stats = Statistics::new();
    session.transmit(b"warm-up", &mut stats).await.expect("warm-up");

    session.ack_path_mut().drop_next(MAX_RETRIES as usize + 1);
    assert!(session.transmit(b"one", &mut stats).await.is_err());
    assert_eq!(session.sender().seq(), SeqNum::ONE);
    assert_eq!(session.receiver().expected_seq(), SeqNum::ONE);

    let delivery = session.transmit(b"two", &mut stats).await.expect("two");
    assert_eq!(delivery.seq, SeqNum::ONE);

    assert_eq!(session.receive(), Some(b"warm-up".to_vec()));
    assert_eq!(session.receive(), Some(b"one".to_vec()));
    assert_eq!(session.receive(), Some(b"two".to_vec()));
    assert_eq!(session.receive(), None);
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn corrupted_data_is_never_accepted() {
    let damaging = NetworkConfig::perfect().with_corruption(1.0).expect("valid");
    let mut session = session_with(damaging, NetworkConfig::perfect(), ProtocolConfig::default());
    let mut stats = Statistics::new();

    let result = session.transmit(b"ABC", &mut stats).await;

    assert!(matches!(result, Err(TransmitError::PermanentFailure { .. })));
    assert_eq!(stats.frames_received(), 4);
    assert_eq!(stats.frames_corrupted(), 4);
    assert_eq!(stats.frames_lost(), 0);
    assert_eq!(stats.acks_sent(), 0);
    assert_eq!(session.receiver().pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn corrupted_acks_are_ignored() {
    let damaging = NetworkConfig::perfect().with_corruption(1.0).expect("valid");
    let mut session = session_with(NetworkConfig::perfect(), damaging, ProtocolConfig::default());
    let mut stats = Statistics::new();

    let result = session.transmit(b"ABC", &mut stats).await;

    assert!(matches!(result, Err(TransmitError::PermanentFailure { .. })));
    assert_eq!(stats.acks_received(), 4);
    assert_eq!(stats.frames_corrupted(), 4);
    assert_eq!(stats.duplicate_frames(), 3);
}

// ---------------------------------------------------------------------------
// Multi-message sessions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn consecutive_messages_alternate_sequence_numbers() {
    let mut session = session_with(
        NetworkConfig::perfect(),
        NetworkConfig::perfect(),
        ProtocolConfig::default(),
    );
    let mut stats = Statistics::new();
    assert_eq!(session.sender().seq(), SeqNum::ZERO);

    let first = session.transmit(b"first", &mut stats).await.expect("first");
    assert_eq!(first.seq, SeqNum::ZERO);
    assert_eq!(session.sender().seq(), SeqNum::ONE);

    let second = session.transmit(b"second", &mut stats).await.expect("second");
    assert_eq!(second.seq, SeqNum::ONE);
    assert_eq!(session.sender().seq(), SeqNum::ZERO);
    assert_eq!(session.receiver().expected_seq(), SeqNum::ZERO);

    assert_eq!(stats.frames_sent(), 2);
    assert_eq!(stats.acks_received(), 2);
}

#[tokio::test(start_paused = true)]
async fn statistics_accumulate_across_calls() {
    let mut stats = Statistics::new();
    transmit_message(b"one", NetworkConfig::perfect(), &mut stats)
        .await
        .expect("one");
    let started = stats.start_time();

    transmit_message(b"two", NetworkConfig::perfect(), &mut stats)
        .await
        .expect("two");

    assert_eq!(stats.frames_sent(), 2);
    assert_eq!(stats.acks_received(), 2);
    assert_eq!(stats.start_time(), started);
}

#[tokio::test(start_paused = true)]
async fn lossy_network_delivers_every_message_in_order() {
    const MSG_COUNT: usize = 10;

    let protocol = ProtocolConfig {
        max_retries: 20,
        ..ProtocolConfig::default()
    };
    let mut session = Session::seeded(NetworkConfig::normal(), protocol, 2024).expect("session");
    let mut stats = Statistics::new();

    for i in 0..MSG_COUNT {
        let msg = format!("msg-{i:02}");
        session
            .transmit(msg.as_bytes(), &mut stats)
            .await
            .unwrap_or_else(|e| panic!("message {i}: {e}"));
    }

    for i in 0..MSG_COUNT {
        let expected = format!("msg-{i:02}");
        assert_eq!(session.receive(), Some(expected.into_bytes()), "message {i}");
    }
    assert_eq!(session.receive(), None);
    assert_eq!(
        stats.frames_sent(),
        MSG_COUNT as u64 + stats.retransmissions()
    );
}
