//! End-to-end tests for announce, listen_for and query

mod common;

use common::{group, service, transport, within, SETTLE};
use disco_discovery::{announcer, watch, DiscoveryError, DiscoveryMessage, MessageKind};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn test_announce_is_heard_by_subscriber() {
    let transport = transport();
    let group = group(47501);

    let mut sub = transport.subscribe(&group).await.unwrap();
    let _announcer = announcer::announce(&transport, &group, "192.168.0.1", "service_name")
        .await
        .unwrap();

    let datagram = within(sub.recv()).await.unwrap().unwrap();
    let message = DiscoveryMessage::decode(&datagram.message).unwrap();
    assert_eq!(message.kind, MessageKind::Announce);
    assert_eq!(message.name, "service_name");
    assert_eq!(message.source_address, "192.168.0.1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_announce_empty_name_sends_nothing() {
    let transport = transport();
    let group = group(47502);

    let mut sub = transport.subscribe(&group).await.unwrap();

    let result = announcer::announce(&transport, &group, "192.168.0.1", "").await;
    assert!(matches!(result, Err(DiscoveryError::InvalidArgument(_))));

    let nothing = tokio::time::timeout(Duration::from_millis(300), sub.recv()).await;
    assert!(nothing.is_err(), "no datagram should have been sent");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listen_then_announce() {
    let service = service(47503);

    let mut watch = service.listen_for(["svcA"]).await.unwrap();
    let _announcer = service.announce("10.0.0.1:9000", "svcA").await.unwrap();

    assert_eq!(within(watch.recv()).await.unwrap().unwrap(), "svcA");
    assert!(within(watch.recv()).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_closes_after_every_name_in_any_order() {
    let transport = transport();
    let group = group(47504);

    let mut watch = watch::listen_for(&transport, &group, ["a", "b", "a"])
        .await
        .unwrap();

    let announcer_transport = transport.clone();
    let target = group.clone();
    tokio::spawn(async move {
        tokio::time::sleep(SETTLE).await;
        for name in ["unrelated", "b", "other", "a"] {
            announcer::announce(&announcer_transport, &target, "192.168.0.1:1234", name)
                .await
                .unwrap()
                .stop();
        }
    });

    let mut seen = vec![
        within(watch.recv()).await.unwrap().unwrap(),
        within(watch.recv()).await.unwrap().unwrap(),
    ];
    seen.sort();

    assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
    assert!(within(watch.recv()).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_query_elicits_exactly_one_response() {
    let transport = transport();
    let group = group(47505);

    let announcer = announcer::announce(&transport, &group, "10.0.0.1:9000", "svcA")
        .await
        .unwrap();

    let mut sub = transport.subscribe(&group).await.unwrap();
    let query = DiscoveryMessage::query("10.0.0.2:9000", "svcA").encode();
    transport.broadcast(&group, &query).await.unwrap();

    let mut responses = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_millis(700);
    while let Ok(Some(next)) = tokio::time::timeout_at(deadline, sub.recv()).await {
        let datagram = next.unwrap();
        if let Ok(message) = DiscoveryMessage::decode(&datagram.message) {
            if message.kind == MessageKind::Response {
                responses.push(message);
            }
        }
    }

    assert_eq!(
        responses,
        vec![DiscoveryMessage::response("10.0.0.1:9000", "svcA")]
    );

    announcer.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_query_resolves_owner() {
    let service = service(47506);

    let _announcer = service.announce("10.0.0.1:9000", "svcA").await.unwrap();
    let owner = service.query("10.0.0.2:9000", "svcA").await.unwrap();

    assert_eq!(owner, "10.0.0.1:9000");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stopped_announcer_no_longer_responds() {
    let service = service(47507);

    let announcer = service.announce("10.0.0.1:9000", "svcA").await.unwrap();
    assert!(announcer.is_running());
    announcer.shutdown().await;

    let result = disco_discovery::resolver::query(
        service.transport(),
        service.group(),
        "10.0.0.2:9000",
        "svcA",
        Duration::from_millis(300),
    )
    .await;

    assert!(matches!(result, Err(DiscoveryError::Timeout { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_watch_closes_without_traffic() {
    let service = service(47508);

    let names: Vec<String> = Vec::new();
    let mut watch = service.listen_for(names).await.unwrap();

    assert!(within(watch.recv()).await.is_none());
}
