//! HTTP endpoints for lobby state management and business search.
//!
//! Every mutation validates through the coordinator and answers with a small
//! typed body. Clients learn about each other's mutations over the real-time
//! channel and re-fetch through the accessors here.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::LobbyError;
use crate::search::Business;
use crate::state::AppState;
use crate::types::{
    CategoryEntry, Coordinates, LobbyPhase, ParticipantInfo, ParticipantSession, Preferences,
};

/// Result counts the search proxy will accept.
const VALID_NUM_RESULTS: &[u32] = &[10, 20, 30];

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lobby/create-lobby", post(create_lobby))
        .route("/lobby/join-lobby", post(join_lobby))
        .route("/lobby/delete-lobby", post(delete_lobby))
        .route("/lobby/get-lobby-host", get(get_lobby_host))
        .route("/lobby/get-lobby-timestamp", get(get_lobby_timestamp))
        .route("/lobby/get-lobby-joinable", get(get_lobby_joinable))
        .route("/lobby/get-lobby-phase", get(get_lobby_phase))
        .route("/lobby/get-lobby-participants", get(get_lobby_participants))
        .route("/lobby/get-lobby-preferences", get(get_lobby_preferences))
        .route("/lobby/get-lobby-categories", get(get_lobby_categories))
        .route("/lobby/get-lobby-businesses", get(get_lobby_businesses))
        .route("/lobby/get-lobby-votes", get(get_lobby_votes))
        .route("/lobby/update-lobby-host", post(update_lobby_host))
        .route("/lobby/update-lobby-timestamp", post(update_lobby_timestamp))
        .route("/lobby/update-lobby-joinable", post(update_lobby_joinable))
        .route("/lobby/update-lobby-phase", post(update_lobby_phase))
        .route(
            "/lobby/update-lobby-preferences",
            post(update_lobby_preferences),
        )
        .route(
            "/lobby/update-lobby-businesses",
            post(update_lobby_businesses),
        )
        .route("/lobby/update-lobby-votes", post(update_lobby_votes))
        .route("/lobby/add-lobby-category", post(add_lobby_category))
        .route("/lobby/remove-lobby-category", post(remove_lobby_category))
        .route("/lobby/finished-swiping", post(finished_swiping))
        .route("/selection/get-businesses", post(get_businesses))
}

#[derive(Debug, Deserialize)]
pub struct LobbyQuery {
    pub lobby_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateLobbyRequest {
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct CreateLobbyResponse {
    pub lobby_id: String,
}

async fn create_lobby(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLobbyRequest>,
) -> Result<Json<CreateLobbyResponse>, LobbyError> {
    let lobby_id = state.create_lobby(&req.session_token).await?;
    Ok(Json(CreateLobbyResponse { lobby_id }))
}

#[derive(Debug, Deserialize)]
pub struct LobbyIdRequest {
    pub lobby_id: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

fn ok() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

async fn join_lobby(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LobbyIdRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state.join_lobby(&req.lobby_id).await?;
    Ok(ok())
}

async fn delete_lobby(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LobbyIdRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state.delete_lobby(&req.lobby_id).await?;
    Ok(ok())
}

#[derive(Debug, Serialize)]
pub struct HostResponse {
    pub host: String,
}

async fn get_lobby_host(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<HostResponse>, LobbyError> {
    let host = state.get_host(&query.lobby_id).await?;
    Ok(Json(HostResponse { host }))
}

#[derive(Debug, Serialize)]
pub struct TimestampResponse {
    pub timestamp: String,
}

async fn get_lobby_timestamp(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<TimestampResponse>, LobbyError> {
    let timestamp = state.get_timestamp(&query.lobby_id).await?;
    Ok(Json(TimestampResponse { timestamp }))
}

#[derive(Debug, Serialize)]
pub struct JoinableResponse {
    pub joinable: bool,
}

async fn get_lobby_joinable(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<JoinableResponse>, LobbyError> {
    let joinable = state.get_joinable(&query.lobby_id).await?;
    Ok(Json(JoinableResponse { joinable }))
}

#[derive(Debug, Serialize)]
pub struct PhaseResponse {
    pub phase: LobbyPhase,
}

async fn get_lobby_phase(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<PhaseResponse>, LobbyError> {
    let phase = state.get_phase(&query.lobby_id).await?;
    Ok(Json(PhaseResponse { phase }))
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<ParticipantSession>,
}

async fn get_lobby_participants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<ParticipantsResponse>, LobbyError> {
    let participants = state.get_participants(&query.lobby_id).await?;
    Ok(Json(ParticipantsResponse { participants }))
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub preferences: Preferences,
}

async fn get_lobby_preferences(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<PreferencesResponse>, LobbyError> {
    let preferences = state.get_preferences(&query.lobby_id).await?;
    Ok(Json(PreferencesResponse { preferences }))
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryEntry>,
}

async fn get_lobby_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<CategoriesResponse>, LobbyError> {
    let categories = state.get_categories(&query.lobby_id).await?;
    Ok(Json(CategoriesResponse { categories }))
}

#[derive(Debug, Serialize)]
pub struct BusinessesResponse {
    pub businesses: Vec<serde_json::Value>,
}

async fn get_lobby_businesses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<BusinessesResponse>, LobbyError> {
    let businesses = state.get_businesses(&query.lobby_id).await?;
    Ok(Json(BusinessesResponse { businesses }))
}

#[derive(Debug, Serialize)]
pub struct VotesResponse {
    pub votes: Vec<u32>,
}

async fn get_lobby_votes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LobbyQuery>,
) -> Result<Json<VotesResponse>, LobbyError> {
    let votes = state.get_votes(&query.lobby_id).await?;
    Ok(Json(VotesResponse { votes }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateHostRequest {
    pub lobby_id: String,
    pub host: String,
}

async fn update_lobby_host(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateHostRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state.update_host(&req.lobby_id, &req.host).await?;
    Ok(ok())
}

async fn update_lobby_timestamp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LobbyIdRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state.refresh_timestamp(&req.lobby_id).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct UpdateJoinableRequest {
    pub lobby_id: String,
    pub joinable: bool,
}

async fn update_lobby_joinable(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateJoinableRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state.update_joinable(&req.lobby_id, req.joinable).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhaseRequest {
    pub lobby_id: String,
    pub phase: LobbyPhase,
}

async fn update_lobby_phase(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePhaseRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state.update_phase(&req.lobby_id, req.phase).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub lobby_id: String,
    /// Raw on purpose: the shape check and decimal coercion happen here at
    /// the boundary, before the coordinator sees anything.
    pub preferences: serde_json::Value,
}

async fn update_lobby_preferences(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    let preferences: Preferences = serde_json::from_value(req.preferences)
        .map_err(|e| LobbyError::BadRequest(format!("preferences not formatted correctly: {e}")))?;
    state
        .update_preferences(&req.lobby_id, preferences)
        .await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct UpdateBusinessesRequest {
    pub lobby_id: String,
    pub businesses: Vec<serde_json::Value>,
}

async fn update_lobby_businesses(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateBusinessesRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state
        .update_businesses(&req.lobby_id, req.businesses)
        .await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct UpdateVotesRequest {
    pub lobby_id: String,
    pub votes: Vec<u32>,
}

async fn update_lobby_votes(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateVotesRequest>,
) -> Result<Json<OkResponse>, LobbyError> {
    state.add_votes(&req.lobby_id, &req.votes).await?;
    Ok(ok())
}

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub lobby_id: String,
    pub participant: ParticipantInfo,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct AddCategoryResponse {
    pub is_new: bool,
}

async fn add_lobby_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddCategoryRequest>,
) -> Result<Json<AddCategoryResponse>, LobbyError> {
    let is_new = state
        .add_category(&req.lobby_id, req.participant, &req.category)
        .await?;
    Ok(Json(AddCategoryResponse { is_new }))
}

#[derive(Debug, Deserialize)]
pub struct RemoveCategoryRequest {
    pub lobby_id: String,
    pub participant: ParticipantInfo,
    pub category: String,
    /// The index the client last saw this category at.
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct RemoveCategoryResponse {
    pub unused: bool,
}

async fn remove_lobby_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveCategoryRequest>,
) -> Result<Json<RemoveCategoryResponse>, LobbyError> {
    let unused = state
        .remove_category(&req.lobby_id, &req.participant, &req.category, req.index)
        .await?;
    Ok(Json(RemoveCategoryResponse { unused }))
}

#[derive(Debug, Deserialize)]
pub struct FinishedSwipingRequest {
    pub lobby_id: String,
    pub participant: ParticipantInfo,
}

#[derive(Debug, Serialize)]
pub struct FinishedSwipingResponse {
    pub lobby_finished: bool,
}

async fn finished_swiping(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FinishedSwipingRequest>,
) -> Result<Json<FinishedSwipingResponse>, LobbyError> {
    let lobby_finished = state
        .mark_participant_finished(&req.lobby_id, &req.participant)
        .await?;
    Ok(Json(FinishedSwipingResponse { lobby_finished }))
}

#[derive(Debug, Deserialize)]
pub struct GetBusinessesRequest {
    pub coordinates: Coordinates,
    pub categories: Vec<String>,
    pub num_results: u32,
    #[serde(default = "default_price_range")]
    pub price_range: String,
    #[serde(default = "default_drive_radius")]
    pub drive_radius: f64,
}

fn default_price_range() -> String {
    "$".to_string()
}

fn default_drive_radius() -> f64 {
    5.0
}

#[derive(Debug, Serialize)]
pub struct GetBusinessesResponse {
    pub businesses: Vec<Business>,
}

/// Strip punctuation and collapse whitespace runs to `+`, the shape the
/// search API expects in its term parameter.
pub fn scrub_category(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("+")
}

async fn get_businesses(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetBusinessesRequest>,
) -> Result<Json<GetBusinessesResponse>, LobbyError> {
    let latitude: f64 = req
        .coordinates
        .latitude
        .as_str()
        .parse()
        .map_err(|_| LobbyError::BadRequest("invalid geolocation coordinates".to_string()))?;
    let longitude: f64 = req
        .coordinates
        .longitude
        .as_str()
        .parse()
        .map_err(|_| LobbyError::BadRequest("invalid geolocation coordinates".to_string()))?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(LobbyError::BadRequest(
            "invalid geolocation coordinates".to_string(),
        ));
    }

    if !VALID_NUM_RESULTS.contains(&req.num_results) {
        return Err(LobbyError::BadRequest(format!(
            "num_results must be one of {:?}",
            VALID_NUM_RESULTS
        )));
    }

    let search = state.search.as_ref().ok_or_else(|| {
        LobbyError::StorageUnavailable("business search is not configured".to_string())
    })?;

    let categories: Vec<String> = req
        .categories
        .iter()
        .map(|c| scrub_category(c))
        .filter(|c| !c.is_empty())
        .collect();

    let businesses = search
        .search(
            &req.coordinates,
            &categories,
            &req.price_range,
            req.drive_radius,
            req.num_results,
        )
        .await
        .map_err(|e| LobbyError::StorageUnavailable(e.to_string()))?;

    Ok(Json(GetBusinessesResponse { businesses }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrub_strips_punctuation_and_joins_words() {
        assert_eq!(scrub_category("sushi"), "sushi");
        assert_eq!(scrub_category("fast food"), "fast+food");
        assert_eq!(scrub_category("  ice   cream!  "), "ice+cream");
        assert_eq!(scrub_category("mom's diner"), "moms+diner");
        assert_eq!(scrub_category("!!!"), "");
    }
}
