//! Steps driven in sequence, rolled back in reverse on failure

use bytes::Bytes;
use hivesync::dht::PeerBehavior;
use hivesync::messaging::IgnoreResponse;
use hivesync::process::{MessageStep, ProcessStep, PutStep};
use hivesync::{
    DataManager, LoopbackTransport, MemoryDht, Message, MessageCorrelator, PeerId, RecipientKey,
    WriteConfig, WriteRequest,
};
use std::sync::Arc;
use std::time::Duration;

/// Execute steps in order; on the first failure roll back the executed ones
async fn run(steps: &mut [Box<dyn ProcessStep>]) -> hivesync::Result<()> {
    for i in 0..steps.len() {
        let outcome = steps[i].execute().await;
        if let Err(e) = outcome {
            for step in steps[..=i].iter_mut().rev() {
                step.rollback().await?;
            }
            return Err(e);
        }
    }
    Ok(())
}

fn correlator(transport: &LoopbackTransport) -> MessageCorrelator {
    MessageCorrelator::new(
        Arc::new(transport.clone()),
        Arc::new(IgnoreResponse),
        Duration::from_millis(500),
    )
}

#[tokio::test]
async fn test_put_then_notify() {
    let dht = MemoryDht::new(5, 3);
    let manager = DataManager::new(Arc::new(dht.clone()), &WriteConfig::default());
    let transport = LoopbackTransport::new();
    transport.add_responder(PeerId::new("b"), Duration::from_millis(5), |_| {
        Some(Bytes::from_static(b"ack"))
    });

    let request = WriteRequest::new("user-a", "meta-file", &b"meta"[..]).with_version(1);
    let notify =
        Message::direct(PeerId::new("a"), PeerId::new("b"), &b"new-file"[..]).expecting_response();
    let mut steps: Vec<Box<dyn ProcessStep>> = vec![
        Box::new(PutStep::new(manager, request.clone())),
        Box::new(MessageStep::new(
            correlator(&transport),
            notify,
            RecipientKey::new(&b"b-key"[..]),
        )),
    ];

    run(&mut steps).await.unwrap();
    assert_eq!(dht.replica_count(&request.version_key()), 3);
    assert_eq!(dht.remove_count(), 0);
}

#[tokio::test]
async fn test_failed_notification_rolls_back_the_put() {
    let dht = MemoryDht::new(5, 3);
    let manager = DataManager::new(Arc::new(dht.clone()), &WriteConfig::default());
    let transport = LoopbackTransport::new();
    transport.add_peer(PeerId::new("b"));
    transport.reject_sends(true);

    let request = WriteRequest::new("user-a", "meta-file", &b"meta"[..]).with_version(1);
    let notify = Message::direct(PeerId::new("a"), PeerId::new("b"), &b"new-file"[..]);
    let mut steps: Vec<Box<dyn ProcessStep>> = vec![
        Box::new(PutStep::new(manager, request.clone())),
        Box::new(MessageStep::new(
            correlator(&transport),
            notify,
            RecipientKey::new(&b"b-key"[..]),
        )),
    ];

    assert!(run(&mut steps).await.is_err());
    assert_eq!(dht.replica_count(&request.version_key()), 0);
    assert_eq!(dht.remove_count(), 1);
}

#[tokio::test]
async fn test_exhausted_put_stops_the_process() {
    let dht = MemoryDht::new(3, 3);
    for peer in dht.peers() {
        dht.set_behavior(&peer, PeerBehavior::Deny);
    }
    let config = WriteConfig { max_put_retries: 2 };
    let manager = DataManager::new(Arc::new(dht.clone()), &config);
    let transport = LoopbackTransport::new();
    transport.add_peer(PeerId::new("b"));

    let request = WriteRequest::new("user-a", "meta-file", &b"meta"[..]);
    let notify = Message::direct(PeerId::new("a"), PeerId::new("b"), &b"new-file"[..]);
    let mut steps: Vec<Box<dyn ProcessStep>> = vec![
        Box::new(PutStep::new(manager, request)),
        Box::new(MessageStep::new(
            correlator(&transport),
            notify,
            RecipientKey::new(&b"b-key"[..]),
        )),
    ];

    let err = run(&mut steps).await.unwrap_err();
    assert!(matches!(err, hivesync::Error::PutFailed(_)));
    assert!(transport.delivered().is_empty());
    // three compensations during the write plus one from the rollback
    assert_eq!(dht.remove_count(), 4);
}
