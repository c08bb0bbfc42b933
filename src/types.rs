use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type LobbyId = String;
pub type SessionToken = String;

/// Alphabet for lobby IDs. Excludes 0/1/i/l/o/I/O to avoid confusion when
/// codes are read aloud or typed from another screen.
pub const LOBBY_ID_ALPHABET: &[u8] =
    b"23456789abcdefghjkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";
pub const LOBBY_ID_LENGTH: usize = 4;

/// ID generation gives up after this many consecutive collisions.
pub const MAX_CREATE_ATTEMPTS: u32 = 10;

/// A lobby is expired once its timestamp is at least this old.
pub const MAX_LOBBY_AGE_SECS: i64 = 1800;

/// JavaScript-style UTC timestamp format, shared with the stored records.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Current UTC time in the lobby timestamp format.
pub fn utc_now_string() -> String {
    chrono::Utc::now().format(TIME_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LobbyPhase {
    Setup,
    Categories,
    Swiping,
    Results,
}

/// Identity of one connected user: the display name they picked plus the
/// session token assigned to their connection. Both parts together are the
/// identity; the token alone distinguishes two users with the same name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ParticipantInfo {
    pub display_name: String,
    pub session_token: SessionToken,
}

/// A participant's membership entry in a lobby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantSession {
    pub participant: ParticipantInfo,
    pub finished_swiping: bool,
}

/// One selectable search category and the participants who chose it.
/// The entry exists only while at least one selector remains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryEntry {
    pub name: String,
    pub selectors: Vec<ParticipantInfo>,
}

impl CategoryEntry {
    pub fn is_selected_by(&self, participant: &ParticipantInfo) -> bool {
        self.selectors.iter().any(|s| s == participant)
    }
}

/// A coordinate kept as exact decimal text. Accepts a JSON number or string
/// on input and stores the decimal representation, so the persisted value
/// formats back to what the client sent with no float drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "String")]
pub struct Decimal(String);

impl Decimal {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<serde_json::Value> for Decimal {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(n) => Ok(Decimal(n.to_string())),
            serde_json::Value::String(s) => {
                let text = s.trim().to_string();
                match text.parse::<f64>() {
                    Ok(parsed) if parsed.is_finite() => Ok(Decimal(text)),
                    _ => Err(format!("not a decimal number: {:?}", s)),
                }
            }
            other => Err(format!("expected number or string, got {}", other)),
        }
    }
}

impl From<Decimal> for String {
    fn from(d: Decimal) -> Self {
        d.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
    #[serde(default)]
    pub label: String,
}

fn default_num_results() -> String {
    "10".to_string()
}

fn default_drive_radius() -> String {
    "5".to_string()
}

fn default_price_range() -> String {
    "$".to_string()
}

/// Search parameters shared by the whole lobby. The default coordinates are
/// deliberately out of range (lat 91, lon 181) and mean "not set yet".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    pub coordinates: Coordinates,
    #[serde(default = "default_num_results")]
    pub num_results: String,
    #[serde(default = "default_drive_radius")]
    pub drive_radius: String,
    #[serde(default = "default_price_range")]
    pub price_range: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            coordinates: Coordinates {
                latitude: Decimal("91".to_string()),
                longitude: Decimal("181".to_string()),
                label: String::new(),
            },
            num_results: default_num_results(),
            drive_radius: default_drive_radius(),
            price_range: default_price_range(),
        }
    }
}

/// One lobby record: the single source of truth for a group's
/// restaurant-selection round. Keyed by `id` in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lobby {
    pub id: LobbyId,
    /// Session token of the current host. Empty means the lobby is orphaned.
    pub host: SessionToken,
    /// Created-or-refreshed timestamp; see [`MAX_LOBBY_AGE_SECS`].
    pub timestamp: String,
    pub joinable: bool,
    pub phase: LobbyPhase,
    pub participants: Vec<ParticipantSession>,
    pub preferences: Preferences,
    pub categories: Vec<CategoryEntry>,
    /// Search results, opaque to the coordinator.
    pub businesses: Vec<serde_json::Value>,
    /// Per-business affirmative swipe tallies, index-aligned with
    /// `businesses`. Absent indices count as zero.
    pub votes: Vec<u32>,
}

impl Lobby {
    pub fn new(id: LobbyId, host: SessionToken) -> Self {
        Self {
            id,
            host,
            timestamp: utc_now_string(),
            joinable: true,
            phase: LobbyPhase::Setup,
            participants: Vec::new(),
            preferences: Preferences::default(),
            categories: Vec::new(),
            businesses: Vec::new(),
            votes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decimal_keeps_string_input_verbatim() {
        let prefs: Preferences = serde_json::from_value(json!({
            "coordinates": { "latitude": "34.01", "longitude": "-118.29" }
        }))
        .unwrap();

        assert_eq!(prefs.coordinates.latitude.as_str(), "34.01");
        assert_eq!(prefs.coordinates.longitude.as_str(), "-118.29");

        // Serializing back yields the same text
        let value = serde_json::to_value(&prefs).unwrap();
        assert_eq!(value["coordinates"]["latitude"], json!("34.01"));
        assert_eq!(value["coordinates"]["longitude"], json!("-118.29"));
    }

    #[test]
    fn decimal_accepts_json_numbers() {
        let d: Decimal = serde_json::from_value(json!(34.01)).unwrap();
        assert_eq!(d.as_str(), "34.01");

        let d: Decimal = serde_json::from_value(json!(-118)).unwrap();
        assert_eq!(d.as_str(), "-118");
    }

    #[test]
    fn decimal_rejects_garbage() {
        assert!(serde_json::from_value::<Decimal>(json!("north-ish")).is_err());
        assert!(serde_json::from_value::<Decimal>(json!(true)).is_err());
        assert!(serde_json::from_value::<Decimal>(json!(null)).is_err());
    }

    #[test]
    fn preferences_default_uses_unset_sentinels() {
        let prefs = Preferences::default();
        assert_eq!(prefs.coordinates.latitude.as_str(), "91");
        assert_eq!(prefs.coordinates.longitude.as_str(), "181");
        assert_eq!(prefs.coordinates.label, "");
        assert_eq!(prefs.num_results, "10");
        assert_eq!(prefs.drive_radius, "5");
        assert_eq!(prefs.price_range, "$");
    }

    #[test]
    fn preferences_requires_both_coordinates() {
        let missing_longitude = json!({
            "coordinates": { "latitude": "34.01" }
        });
        assert!(serde_json::from_value::<Preferences>(missing_longitude).is_err());

        let missing_coordinates = json!({ "num_results": "20" });
        assert!(serde_json::from_value::<Preferences>(missing_coordinates).is_err());
    }

    #[test]
    fn phases_are_ordered_forward() {
        assert!(LobbyPhase::Setup < LobbyPhase::Categories);
        assert!(LobbyPhase::Categories < LobbyPhase::Swiping);
        assert!(LobbyPhase::Swiping < LobbyPhase::Results);
    }
}
