// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_LANG: &str = "pt";

// (chave, português, inglês)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("invalid_period", "Período inválido.", "Invalid period."),
    ("not_authenticated", "Faça login para continuar.", "Please log in to continue."),
    ("session_expired", "Sua sessão expirou. Faça login novamente.", "Your session has expired. Please log in again."),
    ("superseded", "Requisição substituída por uma mais recente.", "Request superseded by a newer one."),
    ("not_found", "Registro não encontrado.", "Record not found."),
    ("upstream", "Erro ao comunicar com o servidor.", "Error communicating with the server."),
    ("upstream_unavailable", "Servidor indisponível. Tente novamente.", "Server unavailable. Please try again."),
    ("invalid_upload", "Envie uma imagem válida.", "Please send a valid image."),
    ("note_closed", "A promissória não está em aberto.", "The note is not open."),
    ("internal", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

/// Mensagens de erro traduzidas, indexadas por idioma e chave.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: Arc<HashMap<(&'static str, &'static str), &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::with_capacity(MESSAGES.len() * 2);
        for (key, pt, en) in MESSAGES {
            messages.insert(("pt", *key), *pt);
            messages.insert(("en", *key), *en);
        }
        Self { messages: Arc::new(messages) }
    }

    /// Busca a mensagem no idioma pedido, caindo para o português.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(&(lang_key(lang), key))
            .or_else(|| self.messages.get(&(DEFAULT_LANG, key)))
            .map(|m| m.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lang_key(lang: &str) -> &'static str {
    match lang {
        "en" => "en",
        _ => DEFAULT_LANG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_portuguese() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "not_found"), "Record not found.");
        assert_eq!(store.translate("fr", "not_found"), "Registro não encontrado.");
        assert_eq!(store.translate("pt", "sem_chave"), "sem_chave");
    }
}
