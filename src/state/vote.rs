use super::AppState;
use crate::error::LobbyError;

impl AppState {
    /// Merge a batch of per-business vote increments into the lobby's
    /// tallies. Additive and commutative, so concurrent batches from
    /// different swipers land in any order with the same result.
    pub async fn add_votes(&self, id: &str, deltas: &[u32]) -> Result<(), LobbyError> {
        self.require_lobby(id).await?;
        self.store.add_votes(id, deltas).await
    }
}
