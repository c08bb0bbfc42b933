use super::AppState;
use crate::error::LobbyError;
use crate::types::{CategoryEntry, ParticipantInfo};

impl AppState {
    /// Record that `participant` wants `name`. Returns true when the category
    /// entry was newly created. Selecting a category twice is a no-op.
    /// Lookup is a linear scan by design: a lobby carries a few dozen
    /// categories at most.
    pub async fn add_category(
        &self,
        id: &str,
        participant: ParticipantInfo,
        name: &str,
    ) -> Result<bool, LobbyError> {
        let lock = self.lobby_lock(id).await;
        let _guard = lock.lock().await;

        let lobby = self.require_lobby(id).await?;
        let mut categories = lobby.categories;

        match categories.iter_mut().find(|c| c.name == name) {
            Some(entry) => {
                if entry.is_selected_by(&participant) {
                    return Ok(false);
                }
                entry.selectors.push(participant);
                self.store.update_categories(id, categories).await?;
                Ok(false)
            }
            None => {
                categories.push(CategoryEntry {
                    name: name.to_string(),
                    selectors: vec![participant],
                });
                self.store.update_categories(id, categories).await?;
                Ok(true)
            }
        }
    }

    /// Withdraw `participant`'s selection of `name`. `expected_index` is the
    /// position the client last saw; when it no longer matches, the category
    /// is re-resolved by scanning. Returns true when the entry lost its last
    /// selector and was removed entirely.
    pub async fn remove_category(
        &self,
        id: &str,
        participant: &ParticipantInfo,
        name: &str,
        expected_index: usize,
    ) -> Result<bool, LobbyError> {
        let lock = self.lobby_lock(id).await;
        let _guard = lock.lock().await;

        let lobby = self.require_lobby(id).await?;
        let mut categories = lobby.categories;

        let index = match categories.get(expected_index) {
            Some(entry) if entry.name == name => expected_index,
            _ => categories
                .iter()
                .position(|c| c.name == name)
                .ok_or(LobbyError::NotFound("category"))?,
        };

        let entry = &mut categories[index];
        if !entry.is_selected_by(participant) {
            return Err(LobbyError::NotFound("participant selection"));
        }
        entry.selectors.retain(|s| s != participant);

        let unused = entry.selectors.is_empty();
        if unused {
            categories.remove(index);
        }
        self.store.update_categories(id, categories).await?;
        Ok(unused)
    }
}
