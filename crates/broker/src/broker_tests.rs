use std::time::Duration;

use async_trait::async_trait;
use reasonchip_core::Cookie;
use reasonchip_transport::TransportError;
use reasonchip_wire::ResultCode;
use tokio::sync::mpsc;

use super::*;

/// A [`ServerTransport`] double. Test code injects [`ServerEvent`]s on
/// `inject` as if they came from an accept loop, and observes outbound
/// `send()` calls on `sent`.
struct MockServerTransport {
    injector_rx: Option<mpsc::UnboundedReceiver<ServerEvent>>,
    sent_tx: mpsc::UnboundedSender<(ConnectionId, Packet)>,
}

fn mock_pair() -> (MockServerTransport, mpsc::UnboundedSender<ServerEvent>, mpsc::UnboundedReceiver<(ConnectionId, Packet)>) {
    let (inject_tx, inject_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    (MockServerTransport { injector_rx: Some(inject_rx), sent_tx }, inject_tx, sent_rx)
}

#[async_trait]
impl ServerTransport for MockServerTransport {
    async fn start(&mut self, events: mpsc::Sender<ServerEvent>) -> Result<(), TransportError> {
        let mut injector_rx = self.injector_rx.take().expect("start called once");
        tokio::spawn(async move {
            while let Some(event) = injector_rx.recv().await {
                if events.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn send(&self, id: ConnectionId, packet: Packet) -> Result<(), TransportError> {
        self.sent_tx.send((id, packet)).map_err(|_| TransportError::Closed)
    }

    async fn close(&self, _id: ConnectionId) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct Harness {
    broker: Arc<Broker>,
    worker_inject: mpsc::UnboundedSender<ServerEvent>,
    worker_sent: mpsc::UnboundedReceiver<(ConnectionId, Packet)>,
    client_inject: mpsc::UnboundedSender<ServerEvent>,
    client_sent: mpsc::UnboundedReceiver<(ConnectionId, Packet)>,
}

async fn harness() -> Harness {
    let (worker_transport, worker_inject, worker_sent) = mock_pair();
    let (client_transport, client_inject, client_sent) = mock_pair();
    let broker = Broker::new(Box::new(worker_transport), Box::new(client_transport));
    broker.start().await.unwrap();
    Harness { broker, worker_inject, worker_sent, client_inject, client_sent }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn register_records_worker_capacity() {
    let mut h = harness().await;
    let worker = ConnectionId::new();

    h.worker_inject.send(ServerEvent::Connected(worker)).unwrap();
    h.worker_inject.send(ServerEvent::Packet(worker, Packet::register(2))).unwrap();
    settle().await;

    assert_eq!(h.broker.worker_count(), 1);
}

#[tokio::test]
async fn a_run_is_forwarded_to_the_registered_worker() {
    let mut h = harness().await;
    let worker = ConnectionId::new();
    let client = ConnectionId::new();

    h.worker_inject.send(ServerEvent::Packet(worker, Packet::register(2))).unwrap();
    settle().await;

    let cookie = Cookie::new();
    h.client_inject.send(ServerEvent::Packet(client, Packet::run(cookie, "pkg.hello", None))).unwrap();

    let (sent_to, packet) = h.worker_sent.recv().await.unwrap();
    assert_eq!(sent_to, worker);
    assert_eq!(packet.cookie, Some(cookie));
}

#[tokio::test]
async fn workers_are_picked_round_robin() {
    let mut h = harness().await;
    let w1 = ConnectionId::new();
    let w2 = ConnectionId::new();
    let client = ConnectionId::new();

    h.worker_inject.send(ServerEvent::Packet(w1, Packet::register(1))).unwrap();
    h.worker_inject.send(ServerEvent::Packet(w2, Packet::register(1))).unwrap();
    settle().await;

    h.client_inject
        .send(ServerEvent::Packet(client, Packet::run(Cookie::new(), "pkg.a", None)))
        .unwrap();
    h.client_inject
        .send(ServerEvent::Packet(client, Packet::run(Cookie::new(), "pkg.b", None)))
        .unwrap();

    let (first, _) = h.worker_sent.recv().await.unwrap();
    let (second, _) = h.worker_sent.recv().await.unwrap();
    assert_ne!(first, second);
    assert!((first == w1 && second == w2) || (first == w2 && second == w1));
}

#[tokio::test]
async fn a_run_with_no_available_worker_gets_no_capacity() {
    let mut h = harness().await;
    let client = ConnectionId::new();
    let cookie = Cookie::new();

    h.client_inject.send(ServerEvent::Packet(client, Packet::run(cookie, "pkg.a", None))).unwrap();

    let (sent_to, packet) = h.client_sent.recv().await.unwrap();
    assert_eq!(sent_to, client);
    assert_eq!(packet.rc, Some(ResultCode::NoCapacity));
    assert_eq!(packet.cookie, Some(cookie));
}

#[tokio::test]
async fn a_cookie_collision_is_rejected_without_forwarding() {
    let mut h = harness().await;
    let worker = ConnectionId::new();
    let client = ConnectionId::new();
    let cookie = Cookie::new();

    h.worker_inject.send(ServerEvent::Packet(worker, Packet::register(4))).unwrap();
    settle().await;

    h.client_inject.send(ServerEvent::Packet(client, Packet::run(cookie, "pkg.a", None))).unwrap();
    let _first = h.worker_sent.recv().await.unwrap();

    h.client_inject.send(ServerEvent::Packet(client, Packet::run(cookie, "pkg.b", None))).unwrap();
    let (sent_to, packet) = h.client_sent.recv().await.unwrap();
    assert_eq!(sent_to, client);
    assert_eq!(packet.rc, Some(ResultCode::CookieCollision));

    assert!(h.worker_sent.try_recv().is_err());
}

#[tokio::test]
async fn a_worker_result_is_routed_back_to_the_originating_client() {
    let mut h = harness().await;
    let worker = ConnectionId::new();
    let client = ConnectionId::new();
    let cookie = Cookie::new();

    h.worker_inject.send(ServerEvent::Packet(worker, Packet::register(4))).unwrap();
    settle().await;
    h.client_inject.send(ServerEvent::Packet(client, Packet::run(cookie, "pkg.a", None))).unwrap();
    let _ = h.worker_sent.recv().await.unwrap();

    h.worker_inject
        .send(ServerEvent::Packet(worker, Packet::result_ok(cookie, "42".to_string())))
        .unwrap();

    let (sent_to, packet) = h.client_sent.recv().await.unwrap();
    assert_eq!(sent_to, client);
    assert_eq!(packet.rc, Some(ResultCode::Ok));
    assert_eq!(packet.cookie, Some(cookie));
}

// A worker disconnecting synthesizes WORKER_WENT_AWAY for
// every cookie it had in flight.
#[tokio::test]
async fn worker_disconnect_synthesizes_worker_went_away_for_every_in_flight_cookie() {
    let mut h = harness().await;
    let worker = ConnectionId::new();
    let client = ConnectionId::new();

    h.worker_inject.send(ServerEvent::Packet(worker, Packet::register(4))).unwrap();
    settle().await;

    let c1 = Cookie::new();
    let c2 = Cookie::new();
    h.client_inject.send(ServerEvent::Packet(client, Packet::run(c1, "pkg.a", None))).unwrap();
    h.client_inject.send(ServerEvent::Packet(client, Packet::run(c2, "pkg.b", None))).unwrap();
    let _ = h.worker_sent.recv().await.unwrap();
    let _ = h.worker_sent.recv().await.unwrap();

    h.worker_inject.send(ServerEvent::Disconnected(worker)).unwrap();

    let mut seen = std::collections::HashSet::new();
    for _ in 0..2 {
        let (sent_to, packet) = h.client_sent.recv().await.unwrap();
        assert_eq!(sent_to, client);
        assert_eq!(packet.rc, Some(ResultCode::WorkerWentAway));
        seen.insert(packet.cookie.unwrap());
    }
    assert_eq!(seen, [c1, c2].into_iter().collect());
    assert_eq!(h.broker.worker_count(), 0);
}

// Client disconnect forwards a CANCEL to whichever worker holds its
// outstanding cookie.
#[tokio::test]
async fn client_disconnect_cancels_its_outstanding_cookie() {
    let mut h = harness().await;
    let worker = ConnectionId::new();
    let client = ConnectionId::new();
    let cookie = Cookie::new();

    h.worker_inject.send(ServerEvent::Packet(worker, Packet::register(4))).unwrap();
    settle().await;
    h.client_inject.send(ServerEvent::Packet(client, Packet::run(cookie, "pkg.a", None))).unwrap();
    let _ = h.worker_sent.recv().await.unwrap();

    h.client_inject.send(ServerEvent::Disconnected(client)).unwrap();

    let (sent_to, packet) = h.worker_sent.recv().await.unwrap();
    assert_eq!(sent_to, worker);
    assert_eq!(packet.packet_type, PacketType::Cancel);
    assert_eq!(packet.cookie, Some(cookie));
}

// A CANCEL for a cookie the broker doesn't know about is dropped silently.
#[tokio::test]
async fn cancel_for_an_unknown_cookie_is_dropped() {
    let mut h = harness().await;
    let client = ConnectionId::new();

    h.client_inject.send(ServerEvent::Packet(client, Packet::cancel(Cookie::new()))).unwrap();
    settle().await;

    assert!(h.worker_sent.try_recv().is_err());
    assert!(h.client_sent.try_recv().is_err());
}
