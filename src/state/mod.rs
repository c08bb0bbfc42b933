mod category;
mod lobby;
mod participant;
mod vote;

pub use lobby::is_expired;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::LobbyError;
use crate::search::SearchClient;
use crate::store::LobbyStore;
use crate::types::{Lobby, LobbyId};
use crate::ws::groups::LobbyGroups;

/// Shared application state: the lobby coordinator plus the real-time
/// broadcast groups. The store is the single source of truth; broadcasts are
/// only hints for clients to re-fetch.
pub struct AppState {
    pub store: Arc<dyn LobbyStore>,
    pub groups: LobbyGroups,
    /// Business search client, when an API key is configured.
    pub search: Option<SearchClient>,
    /// Per-lobby operation locks. Read-modify-write operations for one lobby
    /// run strictly one at a time; different lobbies proceed in parallel.
    op_locks: Mutex<HashMap<LobbyId, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn LobbyStore>) -> Self {
        Self {
            store,
            groups: LobbyGroups::default(),
            search: None,
            op_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_with_search(store: Arc<dyn LobbyStore>, search: Option<SearchClient>) -> Self {
        Self {
            search,
            ..Self::new(store)
        }
    }

    /// Handle serializing mutations for one lobby id.
    pub(crate) async fn lobby_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.op_locks.lock().await;
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub(crate) async fn drop_lobby_lock(&self, id: &str) {
        self.op_locks.lock().await.remove(id);
    }

    /// Fetch a lobby or fail with `NotFound`.
    pub(crate) async fn require_lobby(&self, id: &str) -> Result<Lobby, LobbyError> {
        self.store
            .get(id)
            .await?
            .ok_or(LobbyError::NotFound("lobby"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLobbyStore;
    use crate::types::{LobbyPhase, LOBBY_ID_ALPHABET, LOBBY_ID_LENGTH};

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryLobbyStore::new()))
    }

    #[tokio::test]
    async fn create_lobby_returns_a_well_formed_id() {
        let state = state();
        let id = state.create_lobby("host-token").await.unwrap();

        assert_eq!(id.len(), LOBBY_ID_LENGTH);
        assert!(id.bytes().all(|b| LOBBY_ID_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn created_lobby_starts_joinable_in_setup() {
        let state = state();
        let id = state.create_lobby("host-token").await.unwrap();

        let lobby = state.require_lobby(&id).await.unwrap();
        assert!(lobby.joinable);
        assert_eq!(lobby.phase, LobbyPhase::Setup);
        assert_eq!(lobby.host, "host-token");
        assert!(lobby.participants.is_empty());
        assert!(lobby.categories.is_empty());
        assert!(lobby.votes.is_empty());
    }

    #[tokio::test]
    async fn join_lobby_checks_existence_and_joinable() {
        let state = state();
        assert_eq!(
            state.join_lobby("zzzz").await,
            Err(LobbyError::NotFound("lobby"))
        );

        let id = state.create_lobby("host-token").await.unwrap();
        assert!(state.join_lobby(&id).await.is_ok());

        state.update_joinable(&id, false).await.unwrap();
        assert_eq!(state.join_lobby(&id).await, Err(LobbyError::Conflict));
    }

    #[tokio::test]
    async fn delete_lobby_errors_when_absent() {
        let state = state();
        assert_eq!(
            state.delete_lobby("zzzz").await,
            Err(LobbyError::NotFound("lobby"))
        );

        let id = state.create_lobby("host-token").await.unwrap();
        state.delete_lobby(&id).await.unwrap();
        assert_eq!(
            state.join_lobby(&id).await,
            Err(LobbyError::NotFound("lobby"))
        );
    }

    #[tokio::test]
    async fn accessors_mirror_every_field() {
        let state = state();
        let id = state.create_lobby("host-token").await.unwrap();

        assert_eq!(state.get_host(&id).await.unwrap(), "host-token");
        assert!(state.get_joinable(&id).await.unwrap());
        assert_eq!(state.get_phase(&id).await.unwrap(), LobbyPhase::Setup);
        assert!(state.get_participants(&id).await.unwrap().is_empty());
        assert!(state.get_categories(&id).await.unwrap().is_empty());
        assert!(state.get_businesses(&id).await.unwrap().is_empty());
        assert!(state.get_votes(&id).await.unwrap().is_empty());
        assert!(!state.get_timestamp(&id).await.unwrap().is_empty());

        let prefs = state.get_preferences(&id).await.unwrap();
        assert_eq!(prefs.coordinates.latitude.as_str(), "91");
    }
}
