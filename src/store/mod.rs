//! Durable keyed storage for lobby records.
//!
//! The coordinator only ever talks to the [`LobbyStore`] trait. Mutations are
//! field- or element-scoped on purpose: concurrent requests touch different
//! fields of the same record, and a whole-record overwrite would clobber them.

mod memory;

pub use memory::MemoryLobbyStore;

use async_trait::async_trait;

use crate::error::LobbyError;
use crate::types::{CategoryEntry, Lobby, LobbyPhase, ParticipantInfo, Preferences};

#[async_trait]
pub trait LobbyStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Lobby>, LobbyError>;

    /// Full insert of a fresh record. Overwrites an existing record with the
    /// same id; the caller decides when that is allowed (expired collisions).
    async fn put(&self, lobby: Lobby) -> Result<(), LobbyError>;

    async fn delete(&self, id: &str) -> Result<(), LobbyError>;

    /// Every (id, timestamp) pair in the store, for the expiry sweep.
    async fn scan_timestamps(&self) -> Result<Vec<(String, String)>, LobbyError>;

    // Targeted single-field writes

    async fn update_host(&self, id: &str, host: &str) -> Result<(), LobbyError>;
    async fn update_timestamp(&self, id: &str, timestamp: &str) -> Result<(), LobbyError>;
    async fn update_joinable(&self, id: &str, joinable: bool) -> Result<(), LobbyError>;
    async fn update_phase(&self, id: &str, phase: LobbyPhase) -> Result<(), LobbyError>;
    async fn update_preferences(
        &self,
        id: &str,
        preferences: Preferences,
    ) -> Result<(), LobbyError>;
    async fn update_businesses(
        &self,
        id: &str,
        businesses: Vec<serde_json::Value>,
    ) -> Result<(), LobbyError>;
    async fn update_categories(
        &self,
        id: &str,
        categories: Vec<CategoryEntry>,
    ) -> Result<(), LobbyError>;

    // Element-scoped participant operations

    /// Insert `{participant, finished_swiping: false}` if not already present.
    async fn add_participant(
        &self,
        id: &str,
        participant: ParticipantInfo,
    ) -> Result<(), LobbyError>;

    /// Remove the matching entry; no-op when absent.
    async fn remove_participant(
        &self,
        id: &str,
        participant: &ParticipantInfo,
    ) -> Result<(), LobbyError>;

    async fn set_participant_finished(
        &self,
        id: &str,
        participant: &ParticipantInfo,
    ) -> Result<(), LobbyError>;

    /// Per-index additive merge: each tally is initialized to zero when the
    /// index does not exist yet, then incremented. Atomic per call, so
    /// concurrent swipe batches never lose updates.
    async fn add_votes(&self, id: &str, deltas: &[u32]) -> Result<(), LobbyError>;
}
