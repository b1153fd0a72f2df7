use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledbridge_common::ErrorBody;
use tracing::warn;

use crate::{broker::BrokerError, store::StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown led: {0}")]
    LedNotFound(String),

    #[error("unknown action: {0}")]
    ActionNotFound(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("missing or invalid api key")]
    Forbidden,

    #[error("api key is not configured")]
    MissingApiKey,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("command broker is not configured")]
    BrokerDisabled,

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::LedNotFound(_) | Self::ActionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCommand(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MissingApiKey | Self::Broker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) | Self::BrokerDisabled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::LedNotFound(_) => "LED no encontrado".to_string(),
            Self::ActionNotFound(_) => "Acción no encontrada".to_string(),
            Self::InvalidCommand(reason) => format!("Comando inválido: {reason}"),
            Self::Forbidden => "API key inválida o ausente".to_string(),
            Self::MissingApiKey => "API key no configurada en el servidor".to_string(),
            Self::Store(err) => format!("Almacén no disponible: {err}"),
            Self::BrokerDisabled => "Broker MQTT no configurado".to_string(),
            Self::Broker(err) => format!("Error publicando comando: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), "request failed: {}", self);
        }
        error_response(status, &self.public_message())
    }
}

pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            ApiError::LedNotFound("3".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InvalidCommand("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::MissingApiKey.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Store(StoreError::Timeout).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Broker(BrokerError::Timeout).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
