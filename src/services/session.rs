// src/services/session.rs

//! Sessão do operador: credencial da API remota + usuário em cache.
//!
//! Um único `SessionStore` por processo, injetado pelo `AppState`. Quem
//! precisa reagir a login/logout assina com `subscribe()` e é notificado a
//! cada transição (inclusive quando a API remota recusa a credencial).

use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use tokio::{sync::watch, task::JoinHandle};

use crate::models::auth::{Session, SessionUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Logout,
    // A API remota respondeu 401
    CredentialRejected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Active(Session),
    Ended(EndReason),
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self { state: Arc::new(state) }
    }

    /// Carrega a sessão salva em disco. Arquivo corrompido é descartado.
    pub async fn load(path: &PathBuf) -> Self {
        let store = Self::new();
        match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => {
                    tracing::info!("🔑 Sessão restaurada de {}", path.display());
                    store.state.send_replace(SessionState::Active(session));
                }
                Err(e) => {
                    tracing::warn!("Sessão salva inválida ({}), descartando {}", e, path.display());
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        tracing::warn!("Não foi possível remover {}: {}", path.display(), e);
                    }
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Não foi possível ler {}: {}", path.display(), e),
        }
        store
    }

    pub fn start(&self, session: Session) {
        self.state.send_replace(SessionState::Active(session));
    }

    /// Encerra a sessão ativa. Retorna `false` se não havia sessão.
    pub fn end(&self, reason: EndReason) -> bool {
        self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Active(_)) {
                *state = SessionState::Ended(reason);
                true
            } else {
                false
            }
        })
    }

    /// Como `end`, mas só se a sessão ativa ainda usa `token`. Uma
    /// resposta atrasada não derruba o login feito depois dela.
    pub fn end_if_token(&self, token: &str, reason: EndReason) -> bool {
        self.state.send_if_modified(|state| match state {
            SessionState::Active(session) if session.token == token => {
                *state = SessionState::Ended(reason);
                true
            }
            _ => false,
        })
    }

    pub fn token(&self) -> Option<String> {
        match &*self.state.borrow() {
            SessionState::Active(session) => Some(session.token.clone()),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<SessionUser> {
        match &*self.state.borrow() {
            SessionState::Active(session) => Some(session.user.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.state.borrow(), SessionState::Active(_))
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Observador que grava a sessão no disco ao iniciar e apaga ao encerrar.
pub fn spawn_persistence(store: &SessionStore, path: PathBuf) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();
            let result = match state {
                SessionState::Active(session) => write_atomically(&path, &session).await,
                SessionState::Anonymous | SessionState::Ended(_) => {
                    match tokio::fs::remove_file(&path).await {
                        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                        other => other,
                    }
                }
            };
            if let Err(e) = result {
                tracing::error!("Falha ao persistir a sessão em {}: {}", path.display(), e);
            }
        }
    })
}

// Grava num temporário e renomeia: quem lê nunca vê arquivo pela metade
async fn write_atomically(path: &PathBuf, session: &Session) -> std::io::Result<()> {
    let bytes = serde_json::to_vec(session).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

/// Observador que só registra as transições no log.
pub fn spawn_audit(store: &SessionStore) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            match &*changes.borrow_and_update() {
                SessionState::Active(session) => {
                    tracing::info!("🔓 Sessão iniciada para {:?}", session.user.email)
                }
                SessionState::Ended(EndReason::Logout) => tracing::info!("🔒 Sessão encerrada (logout)"),
                SessionState::Ended(EndReason::CredentialRejected) => {
                    tracing::warn!("🔒 Sessão encerrada: credencial recusada pela API")
                }
                SessionState::Anonymous => {}
            }
        }
    })
}
