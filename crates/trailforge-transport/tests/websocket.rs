//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a real client so the upgrade
//! handshake, the query capture, and both frame directions are exercised
//! over the network.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;
    use trailforge_protocol::RoomId;
    use trailforge_transport::{
        Connection, Transport, WebSocketConnection, WebSocketTransport,
    };

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-chosen port, connects one client with `query`, and
    /// returns both ends.
    async fn connect_pair(query: &str) -> (WebSocketConnection, Client) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let url = format!("ws://{addr}/{query}");
        let (client, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_captures_connect_query() {
        let (conn, _client) =
            connect_pair("?name=Ada%20Lovelace&room=k3x9qa&password=oxen").await;

        let req = conn.request();
        assert_eq!(req.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(req.room, Some(RoomId::from("k3x9qa")));
        assert_eq!(req.password.as_deref(), Some("oxen"));
        assert_eq!(req.session, None);
    }

    #[tokio::test]
    async fn test_websocket_without_query_has_empty_request() {
        let (conn, _client) = connect_pair("").await;

        assert_eq!(conn.request().name, None);
        assert!(conn.id().into_inner() > 0);
    }

    #[tokio::test]
    async fn test_websocket_send_uses_text_frames() {
        let (conn, mut client) = connect_pair("?name=Bo").await;

        conn.send(br#"{"type":"closed","reason":"bye"}"#)
            .await
            .expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON should travel as a text frame");
        assert_eq!(
            msg.into_text().unwrap().as_str(),
            r#"{"type":"closed","reason":"bye"}"#
        );
    }

    #[tokio::test]
    async fn test_websocket_receives_text_and_binary() {
        let (conn, mut client) = connect_pair("?name=Cy").await;

        client
            .send(Message::Text(r#"{"type":"fort_leave"}"#.into()))
            .await
            .unwrap();
        client
            .send(Message::Binary(b"raw".to_vec().into()))
            .await
            .unwrap();

        let first = conn.recv().await.unwrap().expect("text frame");
        let second = conn.recv().await.unwrap().expect("binary frame");
        assert_eq!(first, br#"{"type":"fort_leave"}"#);
        assert_eq!(second, b"raw");
    }

    #[tokio::test]
    async fn test_websocket_send_while_another_task_receives() {
        let (conn, mut client) = connect_pair("?name=Di").await;
        let conn = std::sync::Arc::new(conn);

        // Park a reader on the connection; sending must not wait for it.
        let reader = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        conn.send(b"ping").await.expect("send should not block on recv");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        client.send(Message::Close(None)).await.unwrap();
        let received = reader.await.unwrap().expect("recv should not error");
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = connect_pair("?name=Ed").await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }
}
