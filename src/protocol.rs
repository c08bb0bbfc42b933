use serde::{Deserialize, Serialize};

use crate::types::{ParticipantInfo, SessionToken};

/// Events a connection can send over the real-time channel. Everything that
/// mutates lobby state goes through the HTTP routes; these either manage the
/// connection's group membership or nudge the rest of the group to re-fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Subscribe to a lobby's broadcast group under a display name.
    JoinLobby {
        lobby_id: String,
        display_name: String,
    },
    /// Explicitly leave the current lobby.
    LeaveLobby,
    // Stateless relays, forwarded to every other member of the group.
    CategoryChanged,
    PreferencesChanged,
    BusinessesReady,
    SwipingFinished,
    VoteUpdate,
    NavigationUpdate { path: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First message on every connection: the token that identifies it.
    Connected { session_token: SessionToken },
    JoinAccepted { participant: ParticipantInfo },
    LeaveAccepted { participant: ParticipantInfo },
    /// The host dropped without a successor; the lobby no longer accepts
    /// joins and has no host.
    RoomClosedEarly,
    CategoryUpdate,
    PreferencesUpdate,
    BusinessesReceived,
    SwipingFinished,
    VoteUpdate,
    NavigationUpdate { path: String, message: String },
    Error { code: String, msg: String },
}

/// Internal fan-out envelope for one lobby group. `from` is the publishing
/// connection's token; each socket skips messages whose `from` matches its
/// own token, which is how sender-excluded relays work. `None` means the
/// event is for everybody, the publisher included.
#[derive(Debug, Clone)]
pub struct GroupMessage {
    pub from: Option<SessionToken>,
    pub event: ServerEvent,
}
