use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::LobbyStore;
use crate::error::LobbyError;
use crate::types::{CategoryEntry, Lobby, LobbyPhase, ParticipantInfo, Preferences};

/// In-memory [`LobbyStore`]. Every operation runs under a single lock
/// acquisition, which is what makes the field- and element-scoped updates
/// atomic with respect to each other.
#[derive(Default)]
pub struct MemoryLobbyStore {
    lobbies: RwLock<HashMap<String, Lobby>>,
}

impl MemoryLobbyStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<R, F>(&self, id: &str, f: F) -> Result<R, LobbyError>
    where
        F: FnOnce(&mut Lobby) -> Result<R, LobbyError> + Send,
    {
        let mut lobbies = self.lobbies.write().await;
        let lobby = lobbies.get_mut(id).ok_or(LobbyError::NotFound("lobby"))?;
        f(lobby)
    }
}

#[async_trait]
impl LobbyStore for MemoryLobbyStore {
    async fn get(&self, id: &str) -> Result<Option<Lobby>, LobbyError> {
        Ok(self.lobbies.read().await.get(id).cloned())
    }

    async fn put(&self, lobby: Lobby) -> Result<(), LobbyError> {
        self.lobbies.write().await.insert(lobby.id.clone(), lobby);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), LobbyError> {
        self.lobbies.write().await.remove(id);
        Ok(())
    }

    async fn scan_timestamps(&self) -> Result<Vec<(String, String)>, LobbyError> {
        Ok(self
            .lobbies
            .read()
            .await
            .values()
            .map(|l| (l.id.clone(), l.timestamp.clone()))
            .collect())
    }

    async fn update_host(&self, id: &str, host: &str) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.host = host.to_string();
            Ok(())
        })
        .await
    }

    async fn update_timestamp(&self, id: &str, timestamp: &str) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.timestamp = timestamp.to_string();
            Ok(())
        })
        .await
    }

    async fn update_joinable(&self, id: &str, joinable: bool) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.joinable = joinable;
            Ok(())
        })
        .await
    }

    async fn update_phase(&self, id: &str, phase: LobbyPhase) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.phase = phase;
            Ok(())
        })
        .await
    }

    async fn update_preferences(
        &self,
        id: &str,
        preferences: Preferences,
    ) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.preferences = preferences;
            Ok(())
        })
        .await
    }

    async fn update_businesses(
        &self,
        id: &str,
        businesses: Vec<serde_json::Value>,
    ) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.businesses = businesses;
            Ok(())
        })
        .await
    }

    async fn update_categories(
        &self,
        id: &str,
        categories: Vec<CategoryEntry>,
    ) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.categories = categories;
            Ok(())
        })
        .await
    }

    async fn add_participant(
        &self,
        id: &str,
        participant: ParticipantInfo,
    ) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            if !lobby
                .participants
                .iter()
                .any(|p| p.participant == participant)
            {
                lobby.participants.push(crate::types::ParticipantSession {
                    participant,
                    finished_swiping: false,
                });
            }
            Ok(())
        })
        .await
    }

    async fn remove_participant(
        &self,
        id: &str,
        participant: &ParticipantInfo,
    ) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            lobby.participants.retain(|p| p.participant != *participant);
            Ok(())
        })
        .await
    }

    async fn set_participant_finished(
        &self,
        id: &str,
        participant: &ParticipantInfo,
    ) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            let entry = lobby
                .participants
                .iter_mut()
                .find(|p| p.participant == *participant)
                .ok_or(LobbyError::NotFound("participant"))?;
            entry.finished_swiping = true;
            Ok(())
        })
        .await
    }

    async fn add_votes(&self, id: &str, deltas: &[u32]) -> Result<(), LobbyError> {
        self.mutate(id, |lobby| {
            if lobby.votes.len() < deltas.len() {
                lobby.votes.resize(deltas.len(), 0);
            }
            for (tally, delta) in lobby.votes.iter_mut().zip(deltas) {
                *tally += delta;
            }
            Ok(())
        })
        .await
    }
}
