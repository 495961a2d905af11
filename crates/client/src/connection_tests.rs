use async_trait::async_trait;
use reasonchip_transport::{ClientTransport, TransportError};
use tokio::sync::mpsc;

use super::*;
use crate::multiplexor::Multiplexor;

struct NullTransport;

#[async_trait]
impl ClientTransport for NullTransport {
    async fn send(&mut self, _packet: Packet) -> Result<(), TransportError> {
        Ok(())
    }
    async fn recv(&mut self) -> Result<Packet, TransportError> {
        std::future::pending().await
    }
    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[tokio::test]
async fn send_with_cookie_rejects_a_bare_packet() {
    let mux = Multiplexor::new(Box::new(NullTransport));
    mux.start().await.unwrap();
    let client = mux.register();

    let mut packet = Packet::run(Cookie::new(), "pkg.a", None);
    packet.cookie = None;
    assert!(matches!(client.send_with_cookie(packet).await, Err(ClientError::MissingCookie)));
}

#[tokio::test]
async fn connection_ids_display_without_panicking() {
    let mux = Multiplexor::new(Box::new(NullTransport));
    mux.start().await.unwrap();
    let client = mux.register();
    assert!(!client.connection_id().to_string().is_empty());

    let (_tx, rx) = mpsc::unbounded_channel();
    drop(rx);
}
