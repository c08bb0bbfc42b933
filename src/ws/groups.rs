//! Per-lobby broadcast groups.
//!
//! One `tokio::sync::broadcast` channel per lobby id. A single channel per
//! group means every subscriber sees that group's messages in publish order;
//! nothing is guaranteed across different groups. Delivery is fire-and-forget:
//! receivers that fall behind drop messages (`RecvError::Lagged`), and a
//! disconnected subscriber simply misses events until it re-subscribes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::protocol::{GroupMessage, ServerEvent};
use crate::types::{LobbyId, SessionToken};

const GROUP_CAPACITY: usize = 64;

#[derive(Clone, Default)]
pub struct LobbyGroups {
    inner: Arc<RwLock<HashMap<LobbyId, broadcast::Sender<GroupMessage>>>>,
}

impl LobbyGroups {
    /// Subscribe a connection to a lobby's group, creating the group on
    /// first join.
    pub async fn join(&self, lobby_id: &str) -> broadcast::Receiver<GroupMessage> {
        let mut groups = self.inner.write().await;
        groups
            .entry(lobby_id.to_string())
            .or_insert_with(|| broadcast::channel(GROUP_CAPACITY).0)
            .subscribe()
    }

    /// Publish to everyone subscribed to the lobby. `from` marks the sending
    /// connection so its own socket can skip the message; `None` addresses
    /// the whole group, publisher included.
    pub async fn publish(&self, lobby_id: &str, from: Option<SessionToken>, event: ServerEvent) {
        let groups = self.inner.read().await;
        if let Some(sender) = groups.get(lobby_id) {
            // send() errs when nobody is subscribed, which is fine
            let _ = sender.send(GroupMessage { from, event });
        }
    }

    /// Drop the group once its last receiver is gone.
    pub async fn remove_if_empty(&self, lobby_id: &str) {
        let mut groups = self.inner.write().await;
        if groups
            .get(lobby_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            groups.remove(lobby_id);
        }
    }

    /// Tear the group down unconditionally (lobby reaped). Live receivers
    /// observe the channel closing.
    pub async fn remove(&self, lobby_id: &str) {
        self.inner.write().await.remove(lobby_id);
    }
}
