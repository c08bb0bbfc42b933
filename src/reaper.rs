use std::sync::Arc;
use std::time::Duration;

use crate::state::{is_expired, AppState};

/// Spawn a background task that sweeps expired lobbies out of the store.
/// Collision-time reclamation still applies during creation; the sweep is
/// what keeps abandoned lobbies from accumulating forever.
pub fn spawn_lobby_reaper(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let stamps = match state.store.scan_timestamps().await {
                Ok(stamps) => stamps,
                Err(e) => {
                    tracing::warn!("reaper scan failed: {}", e);
                    continue;
                }
            };

            for (id, timestamp) in stamps {
                if !is_expired(&timestamp) {
                    continue;
                }
                // Expiry is re-checked under the lobby lock, so a keep-alive
                // racing the sweep wins
                match state.delete_lobby_if_expired(&id).await {
                    Ok(true) => {
                        state.groups.remove(&id).await;
                        tracing::info!("reaped expired lobby {}", id);
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!("failed to reap lobby {}: {}", id, e),
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLobbyStore;
    use crate::types::{utc_now_string, Lobby, MAX_LOBBY_AGE_SECS, TIME_FORMAT};

    #[tokio::test]
    async fn sweep_removes_only_expired_lobbies() {
        let state = Arc::new(AppState::new(Arc::new(MemoryLobbyStore::new())));

        let mut stale = Lobby::new("dead".to_string(), String::new());
        stale.timestamp = (chrono::Utc::now()
            - chrono::Duration::seconds(MAX_LOBBY_AGE_SECS + 60))
        .format(TIME_FORMAT)
        .to_string();
        state.store.put(stale).await.unwrap();

        let mut live = Lobby::new("live".to_string(), String::new());
        live.timestamp = utc_now_string();
        state.store.put(live).await.unwrap();

        // One sweep iteration, inlined
        for (id, timestamp) in state.store.scan_timestamps().await.unwrap() {
            if is_expired(&timestamp) {
                state.delete_lobby_if_expired(&id).await.unwrap();
            }
        }

        assert!(state.store.get("dead").await.unwrap().is_none());
        assert!(state.store.get("live").await.unwrap().is_some());
    }
}
