// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    common::i18n::I18nStore,
    services::{
        api_client::{ConsoleApi, HttpConsoleApi},
        auth::AuthService,
        dashboard_service::DashboardService,
        inflight::RequestSlots,
        session::{self, SessionStore},
    },
};

/// Configuração lida do ambiente. O `.env` é carregado no `main`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub bind_addr: String,
    pub request_timeout_secs: u64,
    pub search_debounce_ms: u64,
    pub per_page: u32,
    pub session_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", 15)?,
            search_debounce_ms: parse_var("SEARCH_DEBOUNCE_MS", 300)?,
            per_page: parse_var("PER_PAGE", 15)?,
            session_file: env::var("SESSION_FILE").ok().filter(|p| !p.is_empty()).map(PathBuf::from),
        })
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 15,
            search_debounce_ms: 300,
            per_page: 15,
            session_file: None,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} inválida: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub session: SessionStore,
    pub api: Arc<dyn ConsoleApi>,
    pub slots: RequestSlots,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;

        let session = match &settings.session_file {
            Some(path) => {
                let store = SessionStore::load(path).await;
                session::spawn_persistence(&store, path.clone());
                store
            }
            None => SessionStore::new(),
        };
        session::spawn_audit(&session);

        let api = HttpConsoleApi::new(&settings, session.clone())
            .context("Falha ao criar o cliente HTTP da API remota")?;
        tracing::info!("✅ API remota configurada em {}", settings.api_url);

        Ok(Self::with_api(settings, session, Arc::new(api)))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_api(settings: Settings, session: SessionStore, api: Arc<dyn ConsoleApi>) -> Self {
        let auth_service = AuthService::new(api.clone(), session.clone());
        let dashboard_service = DashboardService::new(api.clone(), settings.per_page);

        Self {
            settings: Arc::new(settings),
            session,
            api,
            slots: RequestSlots::new(),
            i18n_store: I18nStore::new(),
            auth_service,
            dashboard_service,
        }
    }
}
