//! Per-connection handler: seating, message routing, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Resolve who is connecting (session token, or a display name)
//!   2. Reserve the room and join it
//!   3. Send `welcome`, subscribe to the room, broadcast the new state
//!   4. Loop: receive client messages → room calls → publish outcomes
//!   5. On exit: detach the session, leave the room, drop an empty room
//!
//! Replies meant only for this client go through its own outbound queue;
//! everything else is published to the room through the hub.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use trailforge_protocol::{
    ClientMessage, Codec, PlayerId, ProtocolError, RejectCode, RoomId, ServerMessage,
};
use trailforge_room::{JoinRequest, Joined, Outcome, Room, RoomCommand, RoomError};
use trailforge_transport::{Connection, WebSocketConnection};

use crate::hub::{Outbound, Peer};
use crate::server::ServerState;
use crate::TrailforgeError;

/// Display names are cut to this many characters.
pub const MAX_NAME_CHARS: usize = 20;

/// Chat messages are cut to this many characters.
pub const MAX_CHAT_CHARS: usize = 200;

/// How long a closing connection gets to flush its queue.
const FLUSH_GRACE: Duration = Duration::from_secs(2);

/// Who a connection speaks for, once seated.
struct Seat {
    player_id: PlayerId,
    name: String,
    token: String,
    /// The session came back by token or by name.
    resumed: bool,
    room: Arc<Room>,
    joined: Joined,
}

/// What the message loop should do after a message.
enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TrailforgeError> {
    let conn_id = conn.id();
    debug!(%conn_id, "handling new connection");

    let seat = match seat(&conn, &state).await {
        Ok(seat) => seat,
        Err((code, message)) => {
            debug!(%conn_id, %message, "connection refused");
            if let Some(frame) = state.encode(&ServerMessage::Rejected {
                code: code.as_u16(),
                message: message.clone(),
            }) {
                let _ = conn.send(&frame).await;
            }
            let _ = conn.close().await;
            return Err(ProtocolError::InvalidMessage(message).into());
        }
    };
    let room_id = seat.room.id().clone();
    info!(%conn_id, player_id = %seat.player_id, name = %seat.name, room_id = %room_id, "player joined");

    let conn = Arc::new(conn);
    let (tx, rx) = mpsc::channel(state.outbound_queue);
    let hang_up = Arc::new(Notify::new());
    let writer = tokio::spawn(write_loop(conn.clone(), rx));
    let peer = Peer::new(conn_id, seat.player_id, tx, hang_up.clone());

    reply(
        &state,
        &peer,
        &ServerMessage::Welcome {
            player_id: seat.player_id,
            session_token: seat.token.clone(),
            resumed: seat.resumed,
            name: seat.name.clone(),
            room_id: room_id.clone(),
        },
    );
    if let Some(old) = seat.joined.replaced {
        let farewell = state.encode(&ServerMessage::Closed {
            reason: "You signed in from somewhere else.".to_string(),
        });
        state.hub.dismiss(&room_id, old, farewell).await;
    }
    state.hub.subscribe(&room_id, peer.clone()).await;

    let narrative = if seat.joined.returning {
        format!("{} is back with the wagon train.", seat.name)
    } else {
        format!("{} joined the wagon train.", seat.name)
    };
    let arrival = Outcome {
        actor: seat.name.clone(),
        action: "join".to_string(),
        narrative,
        ..Outcome::default()
    };
    state.publish(&seat.room, arrival).await;

    let result = message_loop(&conn, &state, &seat, &peer, &hang_up).await;

    // Cleanup
    state.hub.unsubscribe(&room_id, conn_id).await;
    state.sessions.lock().await.detach(conn_id);
    if let Some(departure) = seat.room.leave(seat.player_id, conn_id).await {
        let now_empty = departure.now_empty;
        state.publish(&seat.room, departure.outcome).await;
        if now_empty {
            state.rooms.remove_if_empty(&room_id).await;
        }
    }

    drop(peer);
    finish_writer(writer).await;
    let _ = conn.close().await;
    info!(%conn_id, player_id = %seat.player_id, room_id = %room_id, "connection closed");
    result
}

/// Resolves the player and joins their room. On failure returns the
/// rejection to send before hanging up.
async fn seat<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
) -> Result<Seat, (RejectCode, String)> {
    let conn_id = conn.id();
    let request = conn.request();

    let by_token = match &request.session {
        Some(token) => state.sessions.lock().await.resume(token, conn_id).ok(),
        None => None,
    };
    let (session, resumed, password_checked) = match by_token {
        Some(session) => (session, true, true),
        None => {
            let name = clean_name(request.name.as_deref()).ok_or_else(|| {
                (RejectCode::BadRequest, "A display name is required.".to_string())
            })?;
            let room_id = request.room.clone().unwrap_or_else(RoomId::continuous);
            let refresh = state
                .sessions
                .lock()
                .await
                .create_or_refresh(&name, conn_id, &room_id);
            (refresh.session, refresh.resumed, false)
        }
    };
    let room_id = session.room_id.clone().unwrap_or_else(RoomId::continuous);

    let joined = match state.rooms.reserve(&room_id).await {
        Ok(reservation) => {
            let room = reservation.room().clone();
            room.join(JoinRequest {
                player_id: session.player_id,
                name: session.name.clone(),
                connection: conn_id,
                password: request.password.clone(),
                resumed: password_checked,
            })
            .await
            .map(|joined| (room, joined))
        }
        Err(e) => Err(e),
    };

    match joined {
        Ok((room, joined)) => Ok(Seat {
            player_id: session.player_id,
            name: session.name,
            token: session.token,
            resumed,
            room,
            joined,
        }),
        Err(e) => {
            state.sessions.lock().await.detach(conn_id);
            Err((e.reject_code(), e.to_string()))
        }
    }
}

/// Reads and handles client messages until the client goes away, asks to
/// leave, or the server hangs up on it.
async fn message_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    seat: &Seat,
    peer: &Peer,
    hang_up: &Notify,
) -> Result<(), TrailforgeError> {
    loop {
        let data = tokio::select! {
            received = conn.recv() => match received {
                Ok(Some(data)) => data,
                Ok(None) => {
                    debug!(player_id = %seat.player_id, "connection closed cleanly");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            },
            _ = hang_up.notified() => {
                debug!(player_id = %seat.player_id, "server hung up");
                return Ok(());
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(player_id = %seat.player_id, error = %e, "failed to decode client message");
                reply(
                    state,
                    peer,
                    &ServerMessage::Rejected {
                        code: RejectCode::BadRequest.as_u16(),
                        message: format!("invalid message: {e}"),
                    },
                );
                continue;
            }
        };

        if let Flow::Close = dispatch(state, seat, peer, msg).await {
            return Ok(());
        }
    }
}

async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    seat: &Seat,
    peer: &Peer,
    msg: ClientMessage,
) -> Flow {
    let room = &seat.room;
    match msg {
        ClientMessage::Action { action, eating } => {
            play(state, seat, peer, RoomCommand::Action { action, eating }).await;
        }
        ClientMessage::HuntShoot { time } => {
            play(state, seat, peer, RoomCommand::HuntShot { reaction_ms: time }).await;
        }
        ClientMessage::RiderTactic { tactic } => {
            play(state, seat, peer, RoomCommand::RiderTactic { code: tactic }).await;
        }
        ClientMessage::FortEnter => play(state, seat, peer, RoomCommand::FortEnter).await,
        ClientMessage::FortBuy { item, qty } => {
            play(state, seat, peer, RoomCommand::FortBuy { item, qty }).await;
        }
        ClientMessage::FortSell { item, qty } => {
            play(state, seat, peer, RoomCommand::FortSell { item, qty }).await;
        }
        ClientMessage::FortLeave => play(state, seat, peer, RoomCommand::FortLeave).await,
        ClientMessage::LootClaim { loot_site_id } => {
            play(state, seat, peer, RoomCommand::ClaimLoot { site_id: loot_site_id }).await;
        }

        ClientMessage::Reset => match room.reset(seat.player_id).await {
            Ok(outcome) => state.publish(room, outcome).await,
            Err(e) => refuse(state, seat, peer, "reset", &e),
        },

        ClientMessage::Kick { target_id } => match room.kick(seat.player_id, target_id).await {
            Ok(departure) => {
                if let Some(connection) = departure.connection {
                    let farewell = state.encode(&ServerMessage::Kicked {
                        reason: format!("{} sent you packing.", seat.name),
                    });
                    state.hub.dismiss(room.id(), connection, farewell).await;
                }
                state.publish(room, departure.outcome).await;
            }
            Err(e) => refuse(state, seat, peer, "kick", &e),
        },

        ClientMessage::Logout => {
            match room.logout(seat.player_id).await {
                Ok(departure) => {
                    let now_empty = departure.now_empty;
                    state.publish(room, departure.outcome).await;
                    if now_empty {
                        state.rooms.remove_if_empty(room.id()).await;
                    }
                }
                Err(e) => debug!(player_id = %seat.player_id, error = %e, "logout from outside the room"),
            }
            state.sessions.lock().await.invalidate(&seat.token);
            reply(
                state,
                peer,
                &ServerMessage::Closed {
                    reason: "You have left the trail.".to_string(),
                },
            );
            return Flow::Close;
        }

        ClientMessage::Chat { message } => {
            if let Some(message) = clip_chat(&message) {
                let chat = ServerMessage::Chat {
                    player: seat.name.clone(),
                    message,
                };
                state.broadcast(room.id(), &chat).await;
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.rooms.list_lobbies().await;
            reply(state, peer, &ServerMessage::RoomList { rooms });
        }

        ClientMessage::CreateRoom {
            name,
            password,
            max_players,
        } => {
            let created = state.rooms.create_room(&name, password, max_players).await;
            reply(
                state,
                peer,
                &ServerMessage::RoomCreated {
                    room_id: created.id().clone(),
                },
            );
        }
    }
    Flow::Continue
}

/// Runs a gameplay command and publishes the result, or tells only the
/// sender why it was refused.
async fn play<C: Codec>(state: &ServerState<C>, seat: &Seat, peer: &Peer, command: RoomCommand) {
    let label = command.label();
    match seat.room.apply(seat.player_id, command).await {
        Ok(outcome) => state.publish(&seat.room, outcome).await,
        Err(e) => refuse(state, seat, peer, label, &e),
    }
}

fn refuse<C: Codec>(state: &ServerState<C>, seat: &Seat, peer: &Peer, action: &str, err: &RoomError) {
    debug!(
        player_id = %seat.player_id,
        room_id = %seat.room.id(),
        action,
        error = %err,
        "request rejected"
    );
    reply(
        state,
        peer,
        &ServerMessage::Rejected {
            code: err.reject_code().as_u16(),
            message: err.to_string(),
        },
    );
}

/// Queues a message for this client only.
fn reply<C: Codec>(state: &ServerState<C>, peer: &Peer, msg: &ServerMessage) {
    if let Some(frame) = state.encode(msg) {
        if !peer.push(frame) {
            debug!(connection = %peer.connection, "reply dropped; queue full");
        }
    }
}

/// Drains one connection's outbound queue onto its socket.
async fn write_loop(conn: Arc<WebSocketConnection>, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(out) = rx.recv().await {
        match out {
            Outbound::Frame(frame) => {
                if let Err(e) = conn.send(&frame).await {
                    debug!(conn_id = %conn.id(), error = %e, "send failed; writer stopping");
                    break;
                }
            }
            Outbound::Close => {
                let _ = conn.close().await;
                break;
            }
        }
    }
}

/// Lets the writer drain what is queued, but not forever.
async fn finish_writer(mut writer: JoinHandle<()>) {
    if tokio::time::timeout(FLUSH_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
}

/// Strips control characters, trims, and caps the length. `None` if
/// nothing is left.
fn clean_name(raw: Option<&str>) -> Option<String> {
    let visible: String = raw?.chars().filter(|c| !c.is_control()).collect();
    let capped: String = visible.trim().chars().take(MAX_NAME_CHARS).collect();
    let name = capped.trim_end();
    (!name.is_empty()).then(|| name.to_string())
}

/// Caps a chat line. `None` for blank messages.
fn clip_chat(message: &str) -> Option<String> {
    let trimmed = message.trim();
    (!trimmed.is_empty()).then(|| trimmed.chars().take(MAX_CHAT_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // clean_name
    // =========================================================================

    #[test]
    fn test_clean_name_trims_whitespace() {
        assert_eq!(clean_name(Some("  Ada  ")).as_deref(), Some("Ada"));
    }

    #[test]
    fn test_clean_name_strips_control_characters() {
        assert_eq!(clean_name(Some("Bo\u{7}\nb\t")).as_deref(), Some("Bob"));
    }

    #[test]
    fn test_clean_name_caps_length() {
        let name = clean_name(Some("Bartholomew Fitzgerald Jr")).unwrap();
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
        assert_eq!(name, "Bartholomew Fitzgera");
    }

    #[test]
    fn test_clean_name_counts_characters_not_bytes() {
        let name = clean_name(Some("ÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉÉ")).unwrap();
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_clean_name_empty_or_missing_is_none() {
        assert_eq!(clean_name(None), None);
        assert_eq!(clean_name(Some("   ")), None);
        assert_eq!(clean_name(Some("\u{1b}\r\n")), None);
    }

    // =========================================================================
    // clip_chat
    // =========================================================================

    #[test]
    fn test_clip_chat_truncates_long_messages() {
        let long = "a".repeat(MAX_CHAT_CHARS + 50);
        assert_eq!(clip_chat(&long).unwrap().len(), MAX_CHAT_CHARS);
    }

    #[test]
    fn test_clip_chat_blank_is_none() {
        assert_eq!(clip_chat("   "), None);
        assert_eq!(clip_chat(" ford it! ").as_deref(), Some("ford it!"));
    }
}
