use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Coordinator error taxonomy. These are plain return values; mapping to a
/// user-visible response happens at the transport layer only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    /// The named thing (lobby, category, participant, ...) does not exist.
    #[error("{0} does not exist")]
    NotFound(&'static str),

    #[error("lobby already started")]
    Conflict,

    #[error("{0}")]
    BadRequest(String),

    #[error("lobby ID generation failed after {0} collisions")]
    CreationTimeout(u32),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl IntoResponse for LobbyError {
    fn into_response(self) -> Response {
        let status = match self {
            LobbyError::NotFound(_) => StatusCode::NOT_FOUND,
            LobbyError::Conflict => StatusCode::FORBIDDEN,
            LobbyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LobbyError::CreationTimeout(_) => StatusCode::CONFLICT,
            LobbyError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_the_taxonomy() {
        assert_eq!(
            LobbyError::NotFound("lobby").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LobbyError::Conflict.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LobbyError::BadRequest("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LobbyError::CreationTimeout(10).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LobbyError::StorageUnavailable("down".into())
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
