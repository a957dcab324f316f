// src/services/inflight.rs

// Cancelamento cooperativo das listagens. Cada "slot" tem no máximo uma
// requisição valendo: quando outra começa no mesmo slot, a anterior é
// abandonada (o future é descartado) e responde `AppError::Superseded`.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::watch;

use crate::common::error::AppError;

pub const CUSTOMERS_SLOT: &str = "clientes.lista";
pub const NOTES_SLOT: &str = "promissorias.lista";
pub const DASHBOARD_SLOT: &str = "dashboard";

#[derive(Debug, Clone, Default)]
pub struct RequestSlots {
    generations: Arc<Mutex<HashMap<&'static str, watch::Sender<u64>>>>,
}

impl RequestSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executa `request` no slot, depois de esperar `debounce`. Se outra
    /// requisição entrar no mesmo slot antes de terminar, esta desiste.
    pub async fn run_latest<T, F>(
        &self,
        slot: &'static str,
        debounce: Duration,
        request: F,
    ) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let (generation, mut changes) = self.claim(slot);

        let superseded = async {
            // Só falha se o sender sumir, o que não acontece com o mapa vivo
            let _ = changes.wait_for(|current| *current != generation).await;
        };

        let work = async {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            request.await
        };

        tokio::select! {
            biased;
            _ = superseded => {
                tracing::debug!("Requisição em '{}' substituída (geração {})", slot, generation);
                Err(AppError::Superseded)
            }
            result = work => result,
        }
    }

    fn claim(&self, slot: &'static str) -> (u64, watch::Receiver<u64>) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let sender = generations
            .entry(slot)
            .or_insert_with(|| watch::channel(0).0);

        let generation = *sender.borrow() + 1;
        sender.send_replace(generation);
        (generation, sender.subscribe())
    }
}
