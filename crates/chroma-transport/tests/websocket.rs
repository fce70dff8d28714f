//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and drive it with
//! a `tokio-tungstenite` client, checking that frames flow both ways.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use chroma_transport::{
        Connection, Handshake, Transport, WebSocketConnection, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0, connects one client, and returns both ends.
    async fn pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server_handle = tokio::spawn(async move {
            let handshake = transport.accept().await.expect("should accept");
            handshake.complete().await.expect("handshake should succeed")
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let server = server_handle.await.expect("task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_websocket_send_is_text_frame() {
        let (server, mut client) = pair().await;
        assert!(server.id().into_inner() > 0);

        server
            .send(r#"{"method":"connect"}"#)
            .await
            .expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "server frames must be text");
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"method":"connect"}"#);
    }

    #[tokio::test]
    async fn test_websocket_recv_accepts_text_and_binary() {
        let (server, mut client) = pair().await;

        client.send(Message::text("hello")).await.unwrap();
        client
            .send(Message::Binary(b"world".to_vec().into()))
            .await
            .unwrap();

        let first = server.recv().await.unwrap().expect("data");
        let second = server.recv().await.unwrap().expect("data");
        assert_eq!(first, b"hello");
        assert_eq!(second, b"world");

        server.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server, mut client) = pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = server.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_not_blocked_by_pending_recv() {
        let (server, mut client) = pair().await;
        let server = Arc::new(server);

        // Park a reader first; it holds the stream half until data arrives.
        let reader = Arc::clone(&server);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(2), server.send("tick"))
            .await
            .expect("send must not wait for recv")
            .expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "tick");

        client.send(Message::text("bye")).await.unwrap();
        let got = pending.await.unwrap().unwrap();
        assert_eq!(got.as_deref(), Some(&b"bye"[..]));
    }

    #[tokio::test]
    async fn test_websocket_accept_returns_before_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        // A peer that connects but never sends the upgrade request.
        let idle = tokio::net::TcpStream::connect(addr).await.unwrap();

        let handshake = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept must not wait for the handshake")
            .expect("should accept");
        assert_eq!(handshake.peer_addr(), idle.local_addr().unwrap());

        let stalled = tokio::time::timeout(Duration::from_millis(100), handshake.complete()).await;
        assert!(stalled.is_err(), "handshake waits for the upgrade request");
    }

    #[tokio::test]
    async fn test_websocket_handshake_rejects_non_websocket_peer() {
        use tokio::io::AsyncWriteExt;

        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let mut peer = tokio::net::TcpStream::connect(addr).await.unwrap();
        peer.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();

        let handshake = transport.accept().await.expect("should accept");
        let result = handshake.complete().await;
        assert!(matches!(result, Err(chroma_transport::TransportError::HandshakeFailed(_))));
    }
}
