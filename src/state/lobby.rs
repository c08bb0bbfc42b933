use rand::Rng;

use super::AppState;
use crate::error::LobbyError;
use crate::types::*;

/// Generate a random candidate lobby id.
fn generate_lobby_id() -> LobbyId {
    let mut rng = rand::rng();
    (0..LOBBY_ID_LENGTH)
        .map(|_| LOBBY_ID_ALPHABET[rng.random_range(0..LOBBY_ID_ALPHABET.len())] as char)
        .collect()
}

/// True once `timestamp` is at least [`MAX_LOBBY_AGE_SECS`] old. An
/// unparseable timestamp counts as expired so a corrupt record can be
/// reclaimed at collision time instead of squatting on its id forever.
pub fn is_expired(timestamp: &str) -> bool {
    let Ok(start) = chrono::NaiveDateTime::parse_from_str(timestamp, TIME_FORMAT) else {
        return true;
    };
    let age = chrono::Utc::now() - start.and_utc();
    age.num_seconds() >= MAX_LOBBY_AGE_SECS
}

impl AppState {
    /// Create a lobby for `host` and hand back its id. A candidate id that
    /// collides with a live record is re-rolled; a collision with an expired
    /// record overwrites it. Ten consecutive live collisions end in
    /// `CreationTimeout`.
    pub async fn create_lobby(&self, host: &str) -> Result<LobbyId, LobbyError> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let id = generate_lobby_id();
            let lock = self.lobby_lock(&id).await;
            let _guard = lock.lock().await;

            if let Some(existing) = self.store.get(&id).await? {
                if !is_expired(&existing.timestamp) {
                    continue;
                }
            }

            self.store
                .put(Lobby::new(id.clone(), host.to_string()))
                .await?;
            return Ok(id);
        }

        Err(LobbyError::CreationTimeout(MAX_CREATE_ATTEMPTS))
    }

    pub async fn join_lobby(&self, id: &str) -> Result<(), LobbyError> {
        let lobby = self.require_lobby(id).await?;
        if !lobby.joinable {
            return Err(LobbyError::Conflict);
        }
        Ok(())
    }

    pub async fn delete_lobby(&self, id: &str) -> Result<(), LobbyError> {
        let lock = self.lobby_lock(id).await;
        let guard = lock.lock().await;

        self.require_lobby(id).await?;
        self.store.delete(id).await?;

        drop(guard);
        self.drop_lobby_lock(id).await;
        Ok(())
    }

    /// Reaper entry point: re-checks expiry under the lobby lock so a lobby
    /// refreshed between the sweep's scan and this call survives.
    pub async fn delete_lobby_if_expired(&self, id: &str) -> Result<bool, LobbyError> {
        let lock = self.lobby_lock(id).await;
        let guard = lock.lock().await;

        let Some(lobby) = self.store.get(id).await? else {
            return Ok(false);
        };
        if !is_expired(&lobby.timestamp) {
            return Ok(false);
        }
        self.store.delete(id).await?;

        drop(guard);
        self.drop_lobby_lock(id).await;
        Ok(true)
    }

    pub async fn update_host(&self, id: &str, host: &str) -> Result<(), LobbyError> {
        self.require_lobby(id).await?;
        self.store.update_host(id, host).await
    }

    /// Keep-alive: refresh the lobby's timestamp to now.
    pub async fn refresh_timestamp(&self, id: &str) -> Result<(), LobbyError> {
        self.require_lobby(id).await?;
        self.store.update_timestamp(id, &utc_now_string()).await
    }

    pub async fn update_joinable(&self, id: &str, joinable: bool) -> Result<(), LobbyError> {
        self.require_lobby(id).await?;
        self.store.update_joinable(id, joinable).await
    }

    /// Phases only move forward. Repeating the current phase is accepted as a
    /// no-op so client retries stay harmless. Entering swiping closes the
    /// lobby to new joins for good.
    pub async fn update_phase(&self, id: &str, phase: LobbyPhase) -> Result<(), LobbyError> {
        let lock = self.lobby_lock(id).await;
        let _guard = lock.lock().await;

        let lobby = self.require_lobby(id).await?;
        if phase < lobby.phase {
            return Err(LobbyError::BadRequest(format!(
                "phase cannot move backward from {:?} to {:?}",
                lobby.phase, phase
            )));
        }
        if phase == lobby.phase {
            return Ok(());
        }

        self.store.update_phase(id, phase).await?;
        if phase == LobbyPhase::Swiping {
            self.store.update_joinable(id, false).await?;
        }
        Ok(())
    }

    pub async fn update_preferences(
        &self,
        id: &str,
        preferences: Preferences,
    ) -> Result<(), LobbyError> {
        self.require_lobby(id).await?;
        self.store.update_preferences(id, preferences).await
    }

    pub async fn update_businesses(
        &self,
        id: &str,
        businesses: Vec<serde_json::Value>,
    ) -> Result<(), LobbyError> {
        self.require_lobby(id).await?;
        self.store.update_businesses(id, businesses).await
    }

    // Read accessors, one per field

    pub async fn get_host(&self, id: &str) -> Result<SessionToken, LobbyError> {
        Ok(self.require_lobby(id).await?.host)
    }

    pub async fn get_timestamp(&self, id: &str) -> Result<String, LobbyError> {
        Ok(self.require_lobby(id).await?.timestamp)
    }

    pub async fn get_joinable(&self, id: &str) -> Result<bool, LobbyError> {
        Ok(self.require_lobby(id).await?.joinable)
    }

    pub async fn get_phase(&self, id: &str) -> Result<LobbyPhase, LobbyError> {
        Ok(self.require_lobby(id).await?.phase)
    }

    pub async fn get_participants(
        &self,
        id: &str,
    ) -> Result<Vec<ParticipantSession>, LobbyError> {
        Ok(self.require_lobby(id).await?.participants)
    }

    pub async fn get_preferences(&self, id: &str) -> Result<Preferences, LobbyError> {
        Ok(self.require_lobby(id).await?.preferences)
    }

    pub async fn get_categories(&self, id: &str) -> Result<Vec<CategoryEntry>, LobbyError> {
        Ok(self.require_lobby(id).await?.categories)
    }

    pub async fn get_businesses(&self, id: &str) -> Result<Vec<serde_json::Value>, LobbyError> {
        Ok(self.require_lobby(id).await?.businesses)
    }

    pub async fn get_votes(&self, id: &str) -> Result<Vec<u32>, LobbyError> {
        Ok(self.require_lobby(id).await?.votes)
    }
}
