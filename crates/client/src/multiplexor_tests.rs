use std::time::Duration;

use async_trait::async_trait;
use reasonchip_transport::TransportError;
use tokio::sync::mpsc;

use super::*;

/// An in-memory transport double: outbound `send`s are observable on
/// `sent_rx`, inbound `recv`s are fed from `deliver_tx`, and dropping
/// (or explicitly closing) `deliver_tx` simulates the peer going away.
struct MockTransport {
    sent_tx: mpsc::UnboundedSender<Packet>,
    deliver_rx: mpsc::UnboundedReceiver<Packet>,
}

fn mock_pair() -> (MockTransport, mpsc::UnboundedSender<Packet>, mpsc::UnboundedReceiver<Packet>) {
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let (deliver_tx, deliver_rx) = mpsc::unbounded_channel();
    (MockTransport { sent_tx, deliver_rx }, deliver_tx, sent_rx)
}

#[async_trait]
impl ClientTransport for MockTransport {
    async fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        self.sent_tx.send(packet).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Packet, TransportError> {
        self.deliver_rx.recv().await.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[tokio::test]
async fn send_records_the_cookie_against_the_originating_connection() {
    let (transport, _deliver_tx, mut sent_rx) = mock_pair();
    let mux = Multiplexor::new(Box::new(transport));
    mux.start().await.unwrap();

    let client = mux.register();
    let cookie = client.send(Packet::run(Cookie::new(), "pkg.hello", None)).await.unwrap();

    let sent = sent_rx.recv().await.unwrap();
    assert_eq!(sent.cookie, Some(cookie));

    let info = mux.connection_info(client.connection_id()).unwrap();
    assert_eq!(info.cookies, vec![cookie]);
}

#[tokio::test]
async fn a_result_packet_is_routed_to_the_client_that_owns_its_cookie() {
    let (transport, deliver_tx, _sent_rx) = mock_pair();
    let mux = Multiplexor::new(Box::new(transport));
    mux.start().await.unwrap();

    let mut client = mux.register();
    let cookie = client.send(Packet::run(Cookie::new(), "pkg.hello", None)).await.unwrap();

    deliver_tx.send(Packet::result_ok(cookie, "42".to_string())).unwrap();

    let reply = client.receive(Some(Duration::from_secs(1))).await.unwrap();
    assert_eq!(reply.cookie, Some(cookie));
    assert_eq!(reply.rc, Some(ResultCode::Ok));

    // The RESULT terminates the cookie's lifetime: bookkeeping is gone.
    assert!(mux.connection_info(client.connection_id()).unwrap().cookies.is_empty());
}

// A packet for a cookie that isn't known to any connection is
// dropped, never delivered to some other client.
#[tokio::test]
async fn a_packet_for_an_unknown_cookie_is_dropped() {
    let (transport, deliver_tx, _sent_rx) = mock_pair();
    let mux = Multiplexor::new(Box::new(transport));
    mux.start().await.unwrap();

    let mut client = mux.register();
    deliver_tx.send(Packet::result_ok(Cookie::new(), "orphan".to_string())).unwrap();

    let reply = client.receive(Some(Duration::from_millis(50))).await;
    assert!(reply.is_none());
}

// Broker death synthesizes exactly one terminal RESULT per
// outstanding cookie.
#[tokio::test]
async fn transport_death_synthesizes_broker_went_away_for_every_outstanding_cookie() {
    let (transport, deliver_tx, _sent_rx) = mock_pair();
    let mux = Multiplexor::new(Box::new(transport));
    mux.start().await.unwrap();

    let mut client = mux.register();
    let c1 = client.send(Packet::run(Cookie::new(), "pkg.a", None)).await.unwrap();
    let c2 = client.send(Packet::run(Cookie::new(), "pkg.b", None)).await.unwrap();

    drop(deliver_tx);
    mux.wait_dead().await;

    let mut seen = std::collections::HashSet::new();
    for _ in 0..2 {
        let packet = client.receive(Some(Duration::from_secs(1))).await.expect("a terminal result");
        assert_eq!(packet.rc, Some(ResultCode::BrokerWentAway));
        seen.insert(packet.cookie.unwrap());
    }
    assert_eq!(seen, [c1, c2].into_iter().collect());

    // Nothing further is ever delivered.
    assert!(client.receive(Some(Duration::from_millis(20))).await.is_none());
}

#[tokio::test]
async fn release_drops_the_connections_cookie_bookkeeping() {
    let (transport, _deliver_tx, _sent_rx) = mock_pair();
    let mux = Multiplexor::new(Box::new(transport));
    mux.start().await.unwrap();

    let client = mux.register();
    let id = client.connection_id();
    client.send(Packet::run(Cookie::new(), "pkg.a", None)).await.unwrap();
    drop(client);

    assert!(mux.connection_info(id).is_none());
}

#[tokio::test]
async fn sending_without_a_cookie_is_stamped_automatically() {
    let (transport, _deliver_tx, mut sent_rx) = mock_pair();
    let mux = Multiplexor::new(Box::new(transport));
    mux.start().await.unwrap();

    let client = mux.register();
    let mut bare = Packet::run(Cookie::new(), "pkg.a", None);
    bare.cookie = None;
    assert!(matches!(mux.send(client.connection_id(), bare).await, Err(ClientError::MissingCookie)));
    let _ = sent_rx.try_recv();
}
