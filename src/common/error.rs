use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

pub type FieldErrors = HashMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    #[error("Período inválido: {0}")]
    InvalidPeriod(String),

    #[error("Sessão ausente")]
    NotAuthenticated,

    // A API remota recusou a credencial (401)
    #[error("Sessão expirada")]
    SessionExpired,

    #[error("Requisição substituída")]
    Superseded,

    #[error("Registro não encontrado")]
    NotFound,

    #[error("Promissória {0} não está em aberto")]
    NoteClosed(i64),

    #[error("Upload inválido: {0}")]
    InvalidUpload(String),

    // Resposta de erro da API remota, com a mensagem e os erros por campo dela
    #[error("API remota respondeu {status}")]
    Upstream {
        status: u16,
        message: Option<String>,
        errors: FieldErrors,
    },

    #[error("Falha de comunicação com a API remota: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Erro de validação de um único campo, no mesmo formato do `validator`.
    pub fn field(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, ValidationError::new(code).with_message(message.into().into()));
        AppError::ValidationError(errors)
    }

    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let t = |key: &str| i18n.translate(&locale.0, key);

        match self {
            AppError::ValidationError(errors) => {
                let mut details = FieldErrors::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError::new(StatusCode::BAD_REQUEST, t("validation")).with_details(details)
            }
            AppError::InvalidPeriod(_) => ApiError::new(StatusCode::BAD_REQUEST, t("invalid_period")),
            AppError::NotAuthenticated => ApiError::new(StatusCode::UNAUTHORIZED, t("not_authenticated")),
            AppError::SessionExpired => ApiError::new(StatusCode::UNAUTHORIZED, t("session_expired")),
            AppError::Superseded => ApiError::new(StatusCode::CONFLICT, t("superseded")),
            AppError::NotFound => ApiError::new(StatusCode::NOT_FOUND, t("not_found")),
            AppError::NoteClosed(_) => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, t("note_closed")),
            AppError::InvalidUpload(_) => ApiError::new(StatusCode::BAD_REQUEST, t("invalid_upload")),
            AppError::Upstream { status, message, errors } => {
                let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                // 5xx da API remota vira 502 aqui; 4xx passa adiante com a mensagem dela
                if code.is_server_error() {
                    tracing::error!("API remota respondeu {}: {:?}", status, message);
                    return ApiError::new(StatusCode::BAD_GATEWAY, t("upstream"));
                }
                let message = message.clone().unwrap_or_else(|| t("upstream"));
                let api_error = ApiError::new(code, message);
                if errors.is_empty() {
                    api_error
                } else {
                    api_error.with_details(errors.clone())
                }
            }
            AppError::Transport(e) => {
                tracing::error!("Falha de comunicação com a API remota: {}", e);
                let status = if e.is_timeout() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                ApiError::new(status, t("upstream_unavailable"))
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Erro Interno do Servidor: {:#}", e);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, t("internal"))
            }
        }
    }
}

// Sem contexto de idioma (ex.: middleware), responde em português.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::new()).into_response()
    }
}

/// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: FieldErrors) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn field_error_keeps_message() {
        let err = AppError::field("valor", "positive", "Informe um valor maior que zero.");
        let api = err.to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert_eq!(details["valor"], vec!["Informe um valor maior que zero.".to_string()]);
    }

    #[test]
    fn upstream_client_error_passes_message_through() {
        let mut errors = FieldErrors::new();
        errors.insert("cpf".to_string(), vec!["CPF já cadastrado.".to_string()]);
        let err = AppError::Upstream { status: 422, message: Some("Dados inválidos.".to_string()), errors };
        let api = err.to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.message, "Dados inválidos.");
        assert!(api.details.unwrap().contains_key("cpf"));
    }

    #[test]
    fn upstream_server_error_becomes_bad_gateway() {
        let err = AppError::Upstream { status: 500, message: None, errors: FieldErrors::new() };
        let api = err.to_api_error(&Locale("en".to_string()), &I18nStore::new());
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.message, "Error communicating with the server.");
    }

    #[test]
    fn superseded_is_conflict() {
        let api = AppError::Superseded.to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::CONFLICT);
    }
}
