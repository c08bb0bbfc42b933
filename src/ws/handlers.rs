//! Real-time event dispatch
//!
//! Each connection carries an explicit [`ConnectionCtx`] threaded through
//! every call; there is no ambient per-session state. The coordinator
//! operations do the mutating, the groups do the telling.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::protocol::{ClientEvent, GroupMessage, ServerEvent};
use crate::state::AppState;
use crate::types::{LobbyId, ParticipantInfo, SessionToken};

/// Per-connection context, created at upgrade time.
#[derive(Debug, Clone)]
pub struct ConnectionCtx {
    pub session_token: SessionToken,
    pub display_name: Option<String>,
    /// The lobby this connection last joined, if any.
    pub lobby_id: Option<LobbyId>,
}

impl ConnectionCtx {
    pub fn new(session_token: SessionToken) -> Self {
        Self {
            session_token,
            display_name: None,
            lobby_id: None,
        }
    }

    /// The connection's participant identity, once a display name is known.
    pub fn participant(&self) -> Option<ParticipantInfo> {
        Some(ParticipantInfo {
            display_name: self.display_name.clone()?,
            session_token: self.session_token.clone(),
        })
    }
}

/// What the socket loop should do after dispatching one client event.
pub enum EventOutcome {
    None,
    /// Direct reply to this connection only.
    Reply(ServerEvent),
    /// The connection entered a lobby; install this group receiver.
    Joined(broadcast::Receiver<GroupMessage>),
    /// The connection left the named lobby; drop the group receiver.
    Left(LobbyId),
}

pub async fn handle_event(
    event: ClientEvent,
    ctx: &mut ConnectionCtx,
    state: &Arc<AppState>,
) -> EventOutcome {
    match event {
        ClientEvent::JoinLobby {
            lobby_id,
            display_name,
        } => handle_join(lobby_id, display_name, ctx, state).await,

        ClientEvent::LeaveLobby => handle_leave(ctx, state).await,

        ClientEvent::CategoryChanged => relay(ctx, state, ServerEvent::CategoryUpdate).await,
        ClientEvent::PreferencesChanged => relay(ctx, state, ServerEvent::PreferencesUpdate).await,
        ClientEvent::BusinessesReady => relay(ctx, state, ServerEvent::BusinessesReceived).await,
        ClientEvent::SwipingFinished => relay(ctx, state, ServerEvent::SwipingFinished).await,
        ClientEvent::VoteUpdate => relay(ctx, state, ServerEvent::VoteUpdate).await,
        ClientEvent::NavigationUpdate { path, message } => {
            relay(ctx, state, ServerEvent::NavigationUpdate { path, message }).await
        }
    }
}

async fn handle_join(
    lobby_id: String,
    display_name: String,
    ctx: &mut ConnectionCtx,
    state: &Arc<AppState>,
) -> EventOutcome {
    let participant = ParticipantInfo {
        display_name: display_name.clone(),
        session_token: ctx.session_token.clone(),
    };

    if let Err(e) = state
        .add_participant_session(&lobby_id, participant.clone())
        .await
    {
        return EventOutcome::Reply(ServerEvent::Error {
            code: "JOIN_FAILED".to_string(),
            msg: e.to_string(),
        });
    }

    // Subscribe before announcing so the new member hears its own join
    let receiver = state.groups.join(&lobby_id).await;
    ctx.display_name = Some(display_name);
    ctx.lobby_id = Some(lobby_id.clone());

    state
        .groups
        .publish(&lobby_id, None, ServerEvent::JoinAccepted { participant })
        .await;

    EventOutcome::Joined(receiver)
}

async fn handle_leave(ctx: &mut ConnectionCtx, state: &Arc<AppState>) -> EventOutcome {
    let (Some(lobby_id), Some(participant)) = (ctx.lobby_id.clone(), ctx.participant()) else {
        return EventOutcome::Reply(not_in_lobby());
    };

    if let Err(e) = state
        .remove_participant_session(&lobby_id, &participant)
        .await
    {
        // The lobby may already be gone; the connection still leaves
        tracing::debug!("leave cleanup for {}: {}", lobby_id, e);
    }

    state
        .groups
        .publish(
            &lobby_id,
            Some(ctx.session_token.clone()),
            ServerEvent::LeaveAccepted { participant },
        )
        .await;

    ctx.lobby_id = None;
    EventOutcome::Left(lobby_id)
}

async fn relay(ctx: &ConnectionCtx, state: &Arc<AppState>, event: ServerEvent) -> EventOutcome {
    let Some(lobby_id) = &ctx.lobby_id else {
        return EventOutcome::Reply(not_in_lobby());
    };

    state
        .groups
        .publish(lobby_id, Some(ctx.session_token.clone()), event)
        .await;
    EventOutcome::None
}

/// Fired by the socket loop when a connection drops without an explicit
/// leave. A vanished host orphans the lobby: nobody new may join and the
/// host field is cleared.
pub async fn handle_disconnect(ctx: &ConnectionCtx, state: &Arc<AppState>) {
    let (Some(lobby_id), Some(participant)) = (ctx.lobby_id.as_deref(), ctx.participant()) else {
        return;
    };

    if let Err(e) = state
        .remove_participant_session(lobby_id, &participant)
        .await
    {
        tracing::debug!("disconnect cleanup for {}: {}", lobby_id, e);
    }

    match state.get_host(lobby_id).await {
        Ok(host) if host == ctx.session_token => {
            if let Err(e) = state.update_joinable(lobby_id, false).await {
                tracing::warn!("failed to close lobby {}: {}", lobby_id, e);
            }
            if let Err(e) = state.update_host(lobby_id, "").await {
                tracing::warn!("failed to clear host of {}: {}", lobby_id, e);
            }
            state
                .groups
                .publish(
                    lobby_id,
                    Some(ctx.session_token.clone()),
                    ServerEvent::RoomClosedEarly,
                )
                .await;
        }
        Ok(_) => {
            state
                .groups
                .publish(
                    lobby_id,
                    Some(ctx.session_token.clone()),
                    ServerEvent::LeaveAccepted { participant },
                )
                .await;
        }
        Err(e) => tracing::debug!("disconnect host lookup for {}: {}", lobby_id, e),
    }

    state.groups.remove_if_empty(lobby_id).await;
}

fn not_in_lobby() -> ServerEvent {
    ServerEvent::Error {
        code: "NOT_IN_LOBBY".to_string(),
        msg: "join a lobby first".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLobbyStore;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(MemoryLobbyStore::new())))
    }

    async fn join(
        state: &Arc<AppState>,
        lobby_id: &str,
        token: &str,
        name: &str,
    ) -> (ConnectionCtx, broadcast::Receiver<GroupMessage>) {
        let mut ctx = ConnectionCtx::new(token.to_string());
        let outcome = handle_event(
            ClientEvent::JoinLobby {
                lobby_id: lobby_id.to_string(),
                display_name: name.to_string(),
            },
            &mut ctx,
            state,
        )
        .await;

        match outcome {
            EventOutcome::Joined(rx) => (ctx, rx),
            _ => panic!("expected Joined outcome"),
        }
    }

    #[tokio::test]
    async fn join_subscribes_and_announces_to_everyone() {
        let state = state();
        let lobby_id = state.create_lobby("host-tok").await.unwrap();

        let (_host_ctx, mut host_rx) = join(&state, &lobby_id, "host-tok", "Hana").await;
        let (_, mut guest_rx) = join(&state, &lobby_id, "guest-tok", "Gil").await;

        // The host hears both joins, the guest hears its own
        let first = host_rx.recv().await.unwrap();
        assert!(matches!(first.event, ServerEvent::JoinAccepted { .. }));
        let second = host_rx.recv().await.unwrap();
        match second.event {
            ServerEvent::JoinAccepted { participant } => {
                assert_eq!(participant.display_name, "Gil");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let own = guest_rx.recv().await.unwrap();
        assert!(own.from.is_none(), "join goes to the new member too");
        assert!(matches!(own.event, ServerEvent::JoinAccepted { .. }));

        let participants = state.get_participants(&lobby_id).await.unwrap();
        assert_eq!(participants.len(), 2);
    }

    #[tokio::test]
    async fn join_of_a_missing_lobby_replies_with_an_error() {
        let state = state();
        let mut ctx = ConnectionCtx::new("tok".to_string());

        let outcome = handle_event(
            ClientEvent::JoinLobby {
                lobby_id: "zzzz".to_string(),
                display_name: "Nadia".to_string(),
            },
            &mut ctx,
            &state,
        )
        .await;

        match outcome {
            EventOutcome::Reply(ServerEvent::Error { code, .. }) => {
                assert_eq!(code, "JOIN_FAILED");
            }
            _ => panic!("expected error reply"),
        }
        assert!(ctx.lobby_id.is_none());
    }

    #[tokio::test]
    async fn explicit_leave_removes_membership_and_notifies_the_rest() {
        let state = state();
        let lobby_id = state.create_lobby("host-tok").await.unwrap();

        let (_host_ctx, mut host_rx) = join(&state, &lobby_id, "host-tok", "Hana").await;
        let (mut guest_ctx, _guest_rx) = join(&state, &lobby_id, "guest-tok", "Gil").await;

        let outcome = handle_event(ClientEvent::LeaveLobby, &mut guest_ctx, &state).await;
        match outcome {
            EventOutcome::Left(left) => assert_eq!(left, lobby_id),
            _ => panic!("expected Left outcome"),
        }
        assert!(guest_ctx.lobby_id.is_none());

        // Skip the two join events, then find the leave
        host_rx.recv().await.unwrap();
        host_rx.recv().await.unwrap();
        let msg = host_rx.recv().await.unwrap();
        assert_eq!(msg.from.as_deref(), Some("guest-tok"));
        match msg.event {
            ServerEvent::LeaveAccepted { participant } => {
                assert_eq!(participant.display_name, "Gil");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let participants = state.get_participants(&lobby_id).await.unwrap();
        assert_eq!(participants.len(), 1);
    }

    #[tokio::test]
    async fn relays_carry_the_sender_token_for_exclusion() {
        let state = state();
        let lobby_id = state.create_lobby("host-tok").await.unwrap();

        let (mut host_ctx, _host_rx) = join(&state, &lobby_id, "host-tok", "Hana").await;
        let (_, mut guest_rx) = join(&state, &lobby_id, "guest-tok", "Gil").await;

        handle_event(ClientEvent::CategoryChanged, &mut host_ctx, &state).await;
        handle_event(
            ClientEvent::NavigationUpdate {
                path: "/swiping".to_string(),
                message: "moving on".to_string(),
            },
            &mut host_ctx,
            &state,
        )
        .await;

        guest_rx.recv().await.unwrap(); // own join

        let msg = guest_rx.recv().await.unwrap();
        assert_eq!(msg.from.as_deref(), Some("host-tok"));
        assert_eq!(msg.event, ServerEvent::CategoryUpdate);

        let msg = guest_rx.recv().await.unwrap();
        match msg.event {
            ServerEvent::NavigationUpdate { path, message } => {
                assert_eq!(path, "/swiping");
                assert_eq!(message, "moving on");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn relay_without_a_lobby_is_an_error_reply() {
        let state = state();
        let mut ctx = ConnectionCtx::new("tok".to_string());

        let outcome = handle_event(ClientEvent::CategoryChanged, &mut ctx, &state).await;
        match outcome {
            EventOutcome::Reply(ServerEvent::Error { code, .. }) => {
                assert_eq!(code, "NOT_IN_LOBBY");
            }
            _ => panic!("expected error reply"),
        }
    }

    #[tokio::test]
    async fn host_disconnect_orphans_and_closes_the_lobby() {
        let state = state();
        let lobby_id = state.create_lobby("host-tok").await.unwrap();

        let (host_ctx, host_rx) = join(&state, &lobby_id, "host-tok", "Hana").await;
        let (_, mut guest_rx) = join(&state, &lobby_id, "guest-tok", "Gil").await;

        drop(host_rx);
        handle_disconnect(&host_ctx, &state).await;

        assert!(!state.get_joinable(&lobby_id).await.unwrap());
        assert_eq!(state.get_host(&lobby_id).await.unwrap(), "");
        let participants = state.get_participants(&lobby_id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].participant.display_name, "Gil");

        guest_rx.recv().await.unwrap(); // own join
        let msg = guest_rx.recv().await.unwrap();
        assert_eq!(msg.event, ServerEvent::RoomClosedEarly);
    }

    #[tokio::test]
    async fn guest_disconnect_leaves_host_and_joinable_alone() {
        let state = state();
        let lobby_id = state.create_lobby("host-tok").await.unwrap();

        let (_host_ctx, mut host_rx) = join(&state, &lobby_id, "host-tok", "Hana").await;
        let (guest_ctx, guest_rx) = join(&state, &lobby_id, "guest-tok", "Gil").await;

        drop(guest_rx);
        handle_disconnect(&guest_ctx, &state).await;

        assert!(state.get_joinable(&lobby_id).await.unwrap());
        assert_eq!(state.get_host(&lobby_id).await.unwrap(), "host-tok");
        assert_eq!(state.get_participants(&lobby_id).await.unwrap().len(), 1);

        host_rx.recv().await.unwrap(); // own join
        host_rx.recv().await.unwrap(); // guest join
        let msg = host_rx.recv().await.unwrap();
        assert!(matches!(msg.event, ServerEvent::LeaveAccepted { .. }));
    }

    #[tokio::test]
    async fn disconnect_before_joining_anything_is_a_noop() {
        let state = state();
        let ctx = ConnectionCtx::new("tok".to_string());
        handle_disconnect(&ctx, &state).await;
    }
}
