//! Per-room fan-out of encoded server messages.
//!
//! Each connection owns a bounded outbound queue drained by its own
//! writer task. The hub only ever `try_send`s into those queues, so a slow
//! client can't stall a broadcast: when a queue is full the subscriber is
//! dropped from its room and its handler is told to hang up.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, info};
use trailforge_protocol::{ConnectionId, PlayerId, RoomId};

/// An encoded message, shared by every queue it is pushed into.
pub(crate) type Frame = Arc<Vec<u8>>;

/// What a connection's writer task receives.
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(Frame),
    /// Send nothing more and close the socket.
    Close,
}

/// One connection's way in: its queue and its hang-up signal.
#[derive(Debug, Clone)]
pub(crate) struct Peer {
    pub(crate) connection: ConnectionId,
    pub(crate) player: PlayerId,
    tx: mpsc::Sender<Outbound>,
    hang_up: Arc<Notify>,
}

impl Peer {
    pub(crate) fn new(
        connection: ConnectionId,
        player: PlayerId,
        tx: mpsc::Sender<Outbound>,
        hang_up: Arc<Notify>,
    ) -> Self {
        Self {
            connection,
            player,
            tx,
            hang_up,
        }
    }

    /// Queues a frame without waiting. Returns `false` if the queue is
    /// full or the writer is gone.
    pub(crate) fn push(&self, frame: Frame) -> bool {
        self.tx.try_send(Outbound::Frame(frame)).is_ok()
    }

    /// Queues `farewell` if there is room, then a close, and tells the
    /// handler to stop reading. The writer still flushes what is queued.
    fn dismiss(&self, farewell: Option<Frame>) {
        if let Some(frame) = farewell {
            let _ = self.tx.try_send(Outbound::Frame(frame));
        }
        let _ = self.tx.try_send(Outbound::Close);
        self.hang_up.notify_one();
    }
}

/// Subscribers by room.
#[derive(Debug, Default)]
pub(crate) struct Hub {
    rooms: Mutex<HashMap<RoomId, Vec<Peer>>>,
}

impl Hub {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn subscribe(&self, room_id: &RoomId, peer: Peer) {
        let mut rooms = self.rooms.lock().await;
        let peers = rooms.entry(room_id.clone()).or_default();
        peers.retain(|p| p.connection != peer.connection);
        debug!(room_id = %room_id, connection = %peer.connection, player_id = %peer.player, "subscribed");
        peers.push(peer);
    }

    pub(crate) async fn unsubscribe(&self, room_id: &RoomId, connection: ConnectionId) {
        let mut rooms = self.rooms.lock().await;
        if let Some(peers) = rooms.get_mut(room_id) {
            peers.retain(|p| p.connection != connection);
            if peers.is_empty() {
                rooms.remove(room_id);
            }
        }
    }

    /// Pushes `frame` to every subscriber of the room. Subscribers whose
    /// queue is full are removed and hung up on.
    pub(crate) async fn broadcast(&self, room_id: &RoomId, frame: Frame) {
        let mut rooms = self.rooms.lock().await;
        let Some(peers) = rooms.get_mut(room_id) else {
            return;
        };
        peers.retain(|peer| {
            if peer.push(frame.clone()) {
                return true;
            }
            info!(room_id = %room_id, connection = %peer.connection, player_id = %peer.player, "dropping slow subscriber");
            peer.hang_up.notify_one();
            false
        });
    }

    /// Removes one subscriber, optionally sending it a last message, and
    /// closes its connection. Returns `false` if it wasn't subscribed.
    pub(crate) async fn dismiss(
        &self,
        room_id: &RoomId,
        connection: ConnectionId,
        farewell: Option<Frame>,
    ) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(peers) = rooms.get_mut(room_id) else {
            return false;
        };
        let Some(idx) = peers.iter().position(|p| p.connection == connection) else {
            return false;
        };
        let peer = peers.remove(idx);
        peer.dismiss(farewell);
        true
    }

    /// Dismisses every subscriber of a room that no longer exists.
    pub(crate) async fn close_room(&self, room_id: &RoomId, farewell: Option<Frame>) -> usize {
        let peers = self.rooms.lock().await.remove(room_id).unwrap_or_default();
        for peer in &peers {
            peer.dismiss(farewell.clone());
        }
        peers.len()
    }

    pub(crate) async fn subscriber_count(&self, room_id: &RoomId) -> usize {
        self.rooms.lock().await.get(room_id).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: u64, capacity: usize) -> (Peer, mpsc::Receiver<Outbound>, Arc<Notify>) {
        let (tx, rx) = mpsc::channel(capacity);
        let hang_up = Arc::new(Notify::new());
        let peer = Peer::new(ConnectionId::new(id), PlayerId(id), tx, hang_up.clone());
        (peer, rx, hang_up)
    }

    fn frame(text: &str) -> Frame {
        Arc::new(text.as_bytes().to_vec())
    }

    fn room() -> RoomId {
        RoomId::from("abc123")
    }

    // =========================================================================
    // Broadcast
    // =========================================================================

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let hub = Hub::new();
        let (a, mut rx_a, _) = peer(1, 4);
        let (b, mut rx_b, _) = peer(2, 4);
        hub.subscribe(&room(), a).await;
        hub.subscribe(&room(), b).await;

        hub.broadcast(&room(), frame("state")).await;

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.recv().await {
                Some(Outbound::Frame(f)) => assert_eq!(f.as_slice(), b"state"),
                other => panic!("expected a frame, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_broadcast_only_reaches_its_room() {
        let hub = Hub::new();
        let (a, mut rx_a, _) = peer(1, 4);
        hub.subscribe(&RoomId::continuous(), a).await;

        hub.broadcast(&room(), frame("elsewhere")).await;

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_drops_full_subscriber_and_hangs_up() {
        let hub = Hub::new();
        let (slow, _rx_slow, hang_up) = peer(1, 1);
        let (fast, mut rx_fast, _) = peer(2, 8);
        hub.subscribe(&room(), slow).await;
        hub.subscribe(&room(), fast).await;

        hub.broadcast(&room(), frame("one")).await;
        hub.broadcast(&room(), frame("two")).await;

        assert_eq!(hub.subscriber_count(&room()).await, 1);
        // The stored permit makes this return at once.
        hang_up.notified().await;
        assert!(matches!(rx_fast.recv().await, Some(Outbound::Frame(_))));
        assert!(matches!(rx_fast.recv().await, Some(Outbound::Frame(_))));
    }

    // =========================================================================
    // Membership
    // =========================================================================

    #[tokio::test]
    async fn test_resubscribe_same_connection_replaces_entry() {
        let hub = Hub::new();
        let (a, _rx1, _) = peer(1, 4);
        let (a_again, _rx2, _) = peer(1, 4);

        hub.subscribe(&room(), a).await;
        hub.subscribe(&room(), a_again).await;

        assert_eq!(hub.subscriber_count(&room()).await, 1);
    }

    #[tokio::test]
    async fn test_dismiss_sends_farewell_then_close() {
        let hub = Hub::new();
        let (a, mut rx, _) = peer(7, 4);
        hub.subscribe(&room(), a).await;

        assert!(hub.dismiss(&room(), ConnectionId::new(7), Some(frame("kicked"))).await);

        assert!(matches!(rx.recv().await, Some(Outbound::Frame(f)) if f.as_slice() == b"kicked"));
        assert!(matches!(rx.recv().await, Some(Outbound::Close)));
        assert_eq!(hub.subscriber_count(&room()).await, 0);
        assert!(!hub.dismiss(&room(), ConnectionId::new(7), None).await);
    }

    #[tokio::test]
    async fn test_close_room_dismisses_everyone() {
        let hub = Hub::new();
        let (a, mut rx_a, _) = peer(1, 4);
        let (b, mut rx_b, _) = peer(2, 4);
        hub.subscribe(&room(), a).await;
        hub.subscribe(&room(), b).await;

        assert_eq!(hub.close_room(&room(), None).await, 2);

        assert!(matches!(rx_a.recv().await, Some(Outbound::Close)));
        assert!(matches!(rx_b.recv().await, Some(Outbound::Close)));
    }

    #[tokio::test]
    async fn test_unsubscribe_forgets_connection() {
        let hub = Hub::new();
        let (a, _rx, _) = peer(1, 4);
        hub.subscribe(&room(), a).await;

        hub.unsubscribe(&room(), ConnectionId::new(1)).await;

        assert_eq!(hub.subscriber_count(&room()).await, 0);
    }
}
