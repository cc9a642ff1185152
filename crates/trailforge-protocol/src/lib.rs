//! Wire protocol for Trailforge.
//!
//! This crate defines the "language" that clients and the server speak,
//! plus the small value types every other crate shares:
//!
//! - **Types** ([`PlayerId`], [`RoomId`], [`Resources`], [`TurnPhase`], ...):
//!   identifiers and the journey's resource ledger.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): what travels on
//!   the wire after the WebSocket upgrade.
//! - **Snapshots** ([`RoomSnapshot`]): the versioned, per-mode view of a
//!   room that is broadcast after every change.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, typed values out.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (turn engine)
//!                                                  ↓
//! Transport (bytes) ← Protocol (ServerMessage) ← Hub (snapshot + event)
//! ```

mod codec;
mod error;
mod message;
mod snapshot;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{ActionKind, ClientMessage, RejectCode, ServerMessage};
pub use snapshot::{
    EncounterView, FortOffer, JourneyView, LobbyEntry, LootSiteView,
    MemberView, PartyMemberView, PerPlayerSnapshot, PlayerJourney,
    PlayerView, RoomHeader, RoomSnapshot, SharedSnapshot, SNAPSHOT_VERSION,
};
pub use types::{
    ConnectionId, EatingTier, FortItem, PlayerId, PlayerKind, Resource, Resources, RoomId,
    RoomMode, RoomStatus, Tactic, TurnPhase,
};
