pub mod plan_commands;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{error, warn};

use crate::error::{AiErrorCode, AppError, AppResult};
use crate::services::ai_service::AiService;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    ai_service: Arc<AiService>,
}

impl AppState {
    pub fn new(ai_service: AiService) -> Self {
        Self {
            ai_service: Arc::new(ai_service),
        }
    }

    pub fn from_env() -> AppResult<Self> {
        Ok(Self::new(AiService::from_env()?))
    }

    pub fn ai(&self) -> Arc<AiService> {
        Arc::clone(&self.ai_service)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
    #[serde(skip)]
    pub status: StatusCode,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

fn ai_status_code(code: AiErrorCode) -> StatusCode {
    match code {
        AiErrorCode::HttpTimeout => StatusCode::GATEWAY_TIMEOUT,
        AiErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        AiErrorCode::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
        AiErrorCode::InvalidResponse
        | AiErrorCode::ProviderUnavailable
        | AiErrorCode::Forbidden
        | AiErrorCode::InvalidRequest
        | AiErrorCode::Unknown => StatusCode::BAD_GATEWAY,
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details)
                .with_status(StatusCode::BAD_REQUEST),
            AppError::Ai {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => {
                            for (key, value) in map {
                                merged.insert(key, value);
                            }
                        }
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                CommandError::new(code.as_str(), message, detail_value)
                    .with_status(ai_status_code(code))
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "filesystem access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(
                target: "app::http",
                status = self.status.as_u16(),
                code = %self.code,
                "request failed"
            );
        }
        (self.status, Json(self)).into_response()
    }
}
