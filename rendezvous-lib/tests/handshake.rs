//! End-to-end channel tests over the in-memory rendezvous server.
//!
//! ```bash
//! cargo test -p rendezvous-lib --test handshake
//! ```

use std::time::Duration;

use rendezvous_lib::test_utils::{
    assert_channel_established, assert_code_format, assert_not_ready, ChannelFixture,
    MemoryRendezvousTransport, MockRendezvousServer, RequestMethod, TestFixtures,
};
use rendezvous_lib::{
    ChannelPhase, RendezvousAlgorithm, RendezvousError, RendezvousInvite, RendezvousMessage,
    RendezvousService, RendezvousTransport, TransportError,
};

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_round_trip_v2() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let (_, creator_code, joiner_code) = fixture.establish().await.unwrap();

    assert_channel_established(&fixture.creator, &fixture.joiner, &creator_code, &joiner_code);
}

#[tokio::test(start_paused = true)]
async fn test_round_trip_v1() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V1);
    let (details, creator_code, joiner_code) = fixture.establish().await.unwrap();

    assert_channel_established(&fixture.creator, &fixture.joiner, &creator_code, &joiner_code);
    assert!(details.key.unwrap().ends_with('='));
}

#[tokio::test(start_paused = true)]
async fn test_independent_handshakes_differ() {
    let mut first = ChannelFixture::new(RendezvousAlgorithm::V2);
    let mut second = ChannelFixture::new(RendezvousAlgorithm::V2);
    first.establish().await.unwrap();
    second.establish().await.unwrap();

    assert_ne!(first.creator.symmetric_key(), second.creator.symmetric_key());
    assert_ne!(first.creator.public_key(), second.creator.public_key());
}

#[tokio::test(start_paused = true)]
async fn test_joiner_accepts_unpadded_and_padded_keys() {
    for algorithm in [RendezvousAlgorithm::V1, RendezvousAlgorithm::V2] {
        let mut fixture = ChannelFixture::new(algorithm);
        let details = fixture.creator.create_rendezvous().await.unwrap();
        fixture.point_joiner_at(&details);

        let key = details.key.clone().unwrap();
        let reencoded = if key.ends_with('=') {
            key.trim_end_matches('=').to_string()
        } else {
            format!("{key}=")
        };

        let joiner_code = fixture.joiner.join_rendezvous(&reencoded).await.unwrap();
        let creator_code = fixture.creator.wait_for_interlocutor().await.unwrap();
        assert_eq!(creator_code, joiner_code);
    }
}

#[tokio::test(start_paused = true)]
async fn test_scenario_over_invite() {
    let server = MockRendezvousServer::new();
    let mut creator = RendezvousService::new(
        MemoryRendezvousTransport::new(server.clone()),
        RendezvousAlgorithm::V2,
    );

    let details = creator.create_rendezvous().await.unwrap();
    let transport = details.transport.clone().unwrap();
    assert_eq!(transport.uri, "https://x/1234");

    // The invite travels out-of-band as JSON
    let invite = RendezvousInvite::new(details, "@alice:example.org");
    let scanned: RendezvousInvite =
        serde_json::from_str(&serde_json::to_string(&invite).unwrap()).unwrap();
    assert_eq!(scanned.rendezvous.algorithm(), Some(RendezvousAlgorithm::V2));

    let mut joiner = RendezvousService::new(
        MemoryRendezvousTransport::with_rendezvous_url(
            server.clone(),
            scanned.rendezvous.transport.unwrap().uri,
        ),
        RendezvousAlgorithm::V2,
    );
    let joiner_code = joiner
        .join_rendezvous(&scanned.rendezvous.key.unwrap())
        .await
        .unwrap();
    let creator_code = creator.wait_for_interlocutor().await.unwrap();
    assert_eq!(creator_code, joiner_code);
    assert_code_format(&creator_code);

    creator.send(b"hello").await.unwrap();
    assert_eq!(joiner.receive().await.unwrap(), b"hello");

    joiner.send(b"world").await.unwrap();
    assert_eq!(creator.receive().await.unwrap(), b"world");

    creator.tear_down().await.unwrap();
    assert_eq!(creator.phase(), ChannelPhase::TornDown);
    assert_eq!(server.resource_count(), 0);
}

// ============================================================================
// Messaging
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_payloads_both_directions() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    fixture.establish().await.unwrap();

    for payload in TestFixtures::SAMPLE_PAYLOADS {
        fixture.creator.send(payload).await.unwrap();
        assert_eq!(&fixture.joiner.receive().await.unwrap(), payload);

        fixture.joiner.send(payload).await.unwrap();
        assert_eq!(&fixture.creator.receive().await.unwrap(), payload);
    }
}

#[tokio::test(start_paused = true)]
async fn test_wire_payload_is_sealed() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let (details, _, _) = fixture.establish().await.unwrap();
    let uri = details.transport.unwrap().uri;

    fixture.creator.send(b"top secret").await.unwrap();

    let raw = fixture.server.payload(&uri).unwrap();
    let message: RendezvousMessage = serde_json::from_slice(&raw).unwrap();
    assert!(!message.iv.is_empty());
    assert!(!String::from_utf8_lossy(&raw).contains("top secret"));
}

#[tokio::test(start_paused = true)]
async fn test_receive_waits_for_new_payload() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let (details, _, _) = fixture.establish().await.unwrap();
    let uri = details.transport.unwrap().uri;
    let etag = fixture.joiner.transport().current_etag().map(str::to_string);

    // Nothing new: the receive keeps polling without touching the ETag
    let pending = tokio::time::timeout(Duration::from_secs(10), fixture.joiner.receive()).await;
    assert!(pending.is_err());
    assert_eq!(fixture.joiner.transport().current_etag().map(str::to_string), etag);
    let polls = fixture
        .server
        .requests_by(RequestMethod::Get)
        .iter()
        .filter(|r| r.status == 304)
        .count();
    assert!(polls >= 2);

    fixture.creator.send(b"late").await.unwrap();
    assert_eq!(fixture.joiner.receive().await.unwrap(), b"late");
    assert_eq!(
        fixture.joiner.transport().current_etag(),
        fixture.server.etag(&uri).as_deref()
    );
}

#[tokio::test(start_paused = true)]
async fn test_receive_wakes_on_delayed_send() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    fixture.establish().await.unwrap();

    let ChannelFixture {
        mut creator,
        mut joiner,
        ..
    } = fixture;

    let sender = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        creator.send(b"eventually").await.unwrap();
    });

    assert_eq!(joiner.receive().await.unwrap(), b"eventually");
    sender.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_tampered_payload_is_rejected() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let (details, _, _) = fixture.establish().await.unwrap();
    let uri = details.transport.unwrap().uri;

    fixture.creator.send(b"genuine").await.unwrap();
    let raw = fixture.server.payload(&uri).unwrap();
    let mut message: RendezvousMessage = serde_json::from_slice(&raw).unwrap();
    message.iv = rendezvous_lib::crypto::encoding::encode(RendezvousAlgorithm::V2, [7u8; 32]);
    fixture
        .server
        .put(&uri, &serde_json::to_vec(&message).unwrap());

    assert!(matches!(
        fixture.joiner.receive().await,
        Err(RendezvousError::Decoding(_))
    ));
    assert_eq!(fixture.joiner.phase(), ChannelPhase::Established);
}

// ============================================================================
// Fail-closed behaviour
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_messaging_before_handshake_fails_closed() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);

    assert_not_ready(&fixture.creator.send(b"too early").await);
    assert_not_ready(&fixture.creator.receive().await);
    assert_eq!(fixture.server.request_count(), 0);

    fixture.creator.create_rendezvous().await.unwrap();
    assert_not_ready(&fixture.creator.send(b"still early").await);
    assert_not_ready(&fixture.creator.receive().await);
    assert_eq!(fixture.server.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_keys_rejected_before_network() {
    for key in TestFixtures::WRONG_LENGTH_KEYS
        .iter()
        .chain(TestFixtures::NOT_BASE64)
    {
        let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
        assert_eq!(
            fixture.joiner.join_rendezvous(key).await.unwrap_err(),
            RendezvousError::InvalidInterlocutorKey,
            "{key:?}"
        );
        assert_eq!(fixture.server.request_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_failure_leaves_service_idle() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    fixture.server.fail_next_request(500);

    let err = fixture.creator.create_rendezvous().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(fixture.creator.phase(), ChannelPhase::Idle);
    assert!(fixture.creator.public_key().is_none());

    // A retry goes through
    fixture.creator.create_rendezvous().await.unwrap();
    assert_eq!(fixture.creator.phase(), ChannelPhase::AwaitingPeer);
}

#[tokio::test(start_paused = true)]
async fn test_join_publish_failure_leaves_service_idle() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let details = fixture.creator.create_rendezvous().await.unwrap();
    fixture.point_joiner_at(&details);
    fixture.server.fail_next_request(502);

    assert!(fixture
        .joiner
        .join_rendezvous(details.key.as_deref().unwrap())
        .await
        .is_err());
    assert_eq!(fixture.joiner.phase(), ChannelPhase::Idle);
    assert!(fixture.joiner.symmetric_key().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_second_interlocutor_wait_is_not_ready() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    fixture.establish().await.unwrap();

    assert_not_ready(&fixture.creator.wait_for_interlocutor().await);
}

#[tokio::test(start_paused = true)]
async fn test_join_on_established_channel_is_not_ready() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let (details, _, _) = fixture.establish().await.unwrap();
    let key_before = fixture.joiner.symmetric_key().copied();
    let requests_before = fixture.server.request_count();

    assert_not_ready(
        &fixture
            .joiner
            .join_rendezvous(details.key.as_deref().unwrap())
            .await,
    );
    assert_eq!(fixture.joiner.phase(), ChannelPhase::Established);
    assert_eq!(fixture.joiner.symmetric_key().copied(), key_before);
    assert_eq!(fixture.server.request_count(), requests_before);

    // The creator can still talk to the joiner
    fixture.creator.send(b"still here").await.unwrap();
    assert_eq!(fixture.joiner.receive().await.unwrap(), b"still here");
}

#[tokio::test(start_paused = true)]
async fn test_create_outside_idle_is_not_ready() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    fixture.creator.create_rendezvous().await.unwrap();

    assert_not_ready(&fixture.creator.create_rendezvous().await);
    assert_eq!(fixture.creator.phase(), ChannelPhase::AwaitingPeer);
    assert_eq!(fixture.server.resource_count(), 1);

    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    fixture.establish().await.unwrap();
    let key_before = fixture.creator.symmetric_key().copied();

    assert_not_ready(&fixture.creator.create_rendezvous().await);
    assert_eq!(fixture.creator.phase(), ChannelPhase::Established);
    assert_eq!(fixture.creator.symmetric_key().copied(), key_before);
    assert_eq!(fixture.server.resource_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_torn_down_service_does_not_restart() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let (details, _, _) = fixture.establish().await.unwrap();
    fixture.creator.tear_down().await.unwrap();

    assert_not_ready(&fixture.creator.create_rendezvous().await);
    assert_not_ready(
        &fixture
            .creator
            .join_rendezvous(details.key.as_deref().unwrap())
            .await,
    );
    assert_eq!(fixture.creator.phase(), ChannelPhase::TornDown);
    assert_eq!(fixture.server.resource_count(), 0);
}

// ============================================================================
// Cancellation and teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_server_cancellation_surfaces() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let details = fixture.creator.create_rendezvous().await.unwrap();
    let uri = details.transport.unwrap().uri;

    assert!(fixture.server.cancel(&uri));
    let err = fixture.creator.wait_for_interlocutor().await.unwrap_err();
    assert_eq!(
        err,
        RendezvousError::Transport(TransportError::RendezvousCancelled)
    );
    assert!(err.is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_messaging() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let (details, _, _) = fixture.establish().await.unwrap();
    fixture.server.cancel(&details.transport.unwrap().uri);

    assert_eq!(
        fixture.joiner.receive().await.unwrap_err(),
        RendezvousError::Transport(TransportError::RendezvousCancelled)
    );
    assert_eq!(
        fixture.creator.send(b"gone").await.unwrap_err(),
        RendezvousError::Transport(TransportError::RendezvousCancelled)
    );
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_wait_can_be_retried() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    let details = fixture.creator.create_rendezvous().await.unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_secs(5),
        fixture.creator.wait_for_interlocutor(),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(fixture.creator.phase(), ChannelPhase::AwaitingPeer);

    fixture.point_joiner_at(&details);
    let joiner_code = fixture
        .joiner
        .join_rendezvous(details.key.as_deref().unwrap())
        .await
        .unwrap();
    let creator_code = fixture.creator.wait_for_interlocutor().await.unwrap();
    assert_eq!(creator_code, joiner_code);
}

#[tokio::test(start_paused = true)]
async fn test_tear_down_clears_everything() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V2);
    fixture.establish().await.unwrap();

    fixture.creator.tear_down().await.unwrap();

    assert_eq!(fixture.creator.phase(), ChannelPhase::TornDown);
    assert!(fixture.creator.symmetric_key().is_none());
    assert!(fixture.creator.public_key().is_none());
    assert!(fixture.creator.transport().rendezvous_url().is_none());
    assert!(fixture.creator.transport().current_etag().is_none());
    assert_not_ready(&fixture.creator.send(b"after").await);
    assert_not_ready(&fixture.creator.receive().await);
    assert_not_ready(&fixture.creator.wait_for_interlocutor().await);

    // The joiner now sees the resource as gone
    assert_eq!(
        fixture.joiner.receive().await.unwrap_err(),
        RendezvousError::Transport(TransportError::RendezvousCancelled)
    );
}

#[tokio::test(start_paused = true)]
async fn test_tear_down_requests_are_recorded() {
    let mut fixture = ChannelFixture::new(RendezvousAlgorithm::V1);
    let (details, _, _) = fixture.establish().await.unwrap();

    fixture.joiner.tear_down().await.unwrap();

    let deletes = fixture.server.requests_by(RequestMethod::Delete);
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].url, details.transport.unwrap().uri);
    assert_eq!(deletes[0].status, 204);

    let posts = fixture.server.requests_by(RequestMethod::Post);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].status, 201);
}
