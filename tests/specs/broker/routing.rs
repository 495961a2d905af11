//! Broker routing behavior (capacity gating, broker death),
//! exercised with real unix-socket transports rather than mocks, since
//! no single crate's own tests wire a live `Broker` to a live
//! `Multiplexor`.

use std::time::Duration;

use reasonchip_broker::Broker;
use reasonchip_client::Multiplexor;
use reasonchip_core::Cookie;
use reasonchip_transport::{Endpoint, Role};
use reasonchip_wire::{Packet, PacketType, ResultCode};

async fn connect(path: &std::path::Path, role: Role) -> Box<dyn reasonchip_transport::ClientTransport> {
    let endpoint = Endpoint::parse(&format!("socket://{}", path.display()), role).expect("parse endpoint");
    reasonchip_transport::connect_client(&endpoint, None).await.expect("connect")
}

async fn bind(path: &std::path::Path, role: Role) -> Box<dyn reasonchip_transport::ServerTransport> {
    let endpoint = Endpoint::parse(&format!("socket://{}", path.display()), role).expect("parse endpoint");
    reasonchip_transport::bind_server(&endpoint, None).await.expect("bind")
}

// A client waiting on a RESULT observes BROKER_WENT_AWAY exactly
// once when the broker disappears, rather than hanging forever.
#[tokio::test]
async fn a_client_sees_broker_went_away_when_the_broker_stops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let worker_sock = dir.path().join("worker.sock");
    let client_sock = dir.path().join("client.sock");

    let worker_transport = bind(&worker_sock, Role::Worker).await;
    let client_transport = bind(&client_sock, Role::Client).await;
    let broker = Broker::new(worker_transport, client_transport);
    broker.start().await.expect("start broker");

    let client_side = connect(&client_sock, Role::Client).await;
    let multiplexor = Multiplexor::new(client_side);
    multiplexor.start().await.expect("start multiplexor");

    let mut client = multiplexor.register();
    let cookie = Cookie::new();
    client
        .send_with_cookie(Packet::run(cookie, "demo.hello", Some("{}".to_string())))
        .await
        .expect("send RUN");

    // No worker is registered, so the RUN never gets routed anywhere;
    // killing the broker is what should unblock this wait.
    broker.stop().await;

    let reply = client.receive(Some(Duration::from_secs(5))).await.expect("a terminal reply");
    assert_eq!(reply.packet_type, PacketType::Result);
    assert_eq!(reply.rc, Some(ResultCode::BrokerWentAway));
}

// At the broker layer, a RUN with no registered worker capacity is
// rejected with NO_CAPACITY rather than queued indefinitely.
#[tokio::test]
async fn a_run_with_no_worker_capacity_is_rejected_immediately() {
    let dir = tempfile::tempdir().expect("tempdir");
    let worker_sock = dir.path().join("worker.sock");
    let client_sock = dir.path().join("client.sock");

    let worker_transport = bind(&worker_sock, Role::Worker).await;
    let client_transport = bind(&client_sock, Role::Client).await;
    let broker = Broker::new(worker_transport, client_transport);
    broker.start().await.expect("start broker");

    let client_side = connect(&client_sock, Role::Client).await;
    let multiplexor = Multiplexor::new(client_side);
    multiplexor.start().await.expect("start multiplexor");

    let mut client = multiplexor.register();
    let cookie = Cookie::new();
    client
        .send_with_cookie(Packet::run(cookie, "demo.hello", Some("{}".to_string())))
        .await
        .expect("send RUN");

    let reply = client
        .receive(Some(Duration::from_secs(5)))
        .await
        .expect("an immediate NO_CAPACITY reply");
    assert_eq!(reply.rc, Some(ResultCode::NoCapacity));

    broker.stop().await;
}
