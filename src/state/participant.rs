use super::AppState;
use crate::error::LobbyError;
use crate::types::ParticipantInfo;

impl AppState {
    /// Add a participant to the lobby. Idempotent by identity: joining twice
    /// keeps a single entry and does not reset the finished flag.
    pub async fn add_participant_session(
        &self,
        id: &str,
        participant: ParticipantInfo,
    ) -> Result<(), LobbyError> {
        let lock = self.lobby_lock(id).await;
        let _guard = lock.lock().await;

        self.require_lobby(id).await?;
        self.store.add_participant(id, participant).await
    }

    /// Remove a participant by identity; no-op when they are not a member.
    pub async fn remove_participant_session(
        &self,
        id: &str,
        participant: &ParticipantInfo,
    ) -> Result<(), LobbyError> {
        let lock = self.lobby_lock(id).await;
        let _guard = lock.lock().await;

        self.require_lobby(id).await?;
        self.store.remove_participant(id, participant).await
    }

    /// Mark a participant done swiping and answer whether the whole lobby is
    /// now done. The AND over the membership is evaluated after the write, so
    /// the caller's own completion counts.
    pub async fn mark_participant_finished(
        &self,
        id: &str,
        participant: &ParticipantInfo,
    ) -> Result<bool, LobbyError> {
        let lock = self.lobby_lock(id).await;
        let _guard = lock.lock().await;

        let lobby = self.require_lobby(id).await?;
        if !lobby
            .participants
            .iter()
            .any(|p| p.participant == *participant)
        {
            return Err(LobbyError::NotFound("participant"));
        }

        self.store.set_participant_finished(id, participant).await?;

        let lobby = self.require_lobby(id).await?;
        Ok(lobby.participants.iter().all(|p| p.finished_swiping))
    }
}
