//! Unified error type for the Trailforge server.

use trailforge_protocol::ProtocolError;
use trailforge_room::{PersistError, RoomError};
use trailforge_session::SessionError;
use trailforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TrailforgeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad connect request).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An unknown or logged-out session token.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room refused the request.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The leaderboard or the trail save file could not be opened.
    #[error(transparent)]
    Persist(#[from] PersistError),
}
