// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::tolerant;

// Usuário como a API remota devolve no login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    #[serde(default, deserialize_with = "tolerant::id")]
    pub id: Option<i64>,
    #[serde(default)]
    #[schema(example = "Administrador")]
    pub name: Option<String>,
    #[serde(default)]
    #[schema(example = "admin@exemplo.com")]
    pub email: Option<String>,
}

/// Credencial + usuário em cache. É o que fica no `SessionStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "admin@exemplo.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Informe a senha."))]
    pub password: String,
}

// Resposta do POST /login da API remota
#[derive(Debug, Deserialize)]
pub struct RemoteLoginResponse {
    pub token: String,
    pub user: SessionUser,
}
