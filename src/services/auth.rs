// src/services/auth.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    models::auth::SessionUser,
    services::{
        api_client::ConsoleApi,
        session::{EndReason, SessionStore},
    },
};

#[derive(Clone)]
pub struct AuthService {
    api: Arc<dyn ConsoleApi>,
    session: SessionStore,
}

impl AuthService {
    pub fn new(api: Arc<dyn ConsoleApi>, session: SessionStore) -> Self {
        Self { api, session }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, AppError> {
        let session = self.api.login(email, password).await?;
        let user = session.user.clone();
        self.session.start(session);
        Ok(user)
    }

    /// Encerra a sessão mesmo que a API remota falhe (token já inválido etc.).
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::debug!("Logout remoto falhou, encerrando localmente: {}", e);
        }
        self.session.end(EndReason::Logout);
    }
}
