// src/services/api_client.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    multipart::{Form, Part},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    common::error::{AppError, FieldErrors},
    config::Settings,
    models::{
        auth::{RemoteLoginResponse, Session},
        customer::{Customer, CustomerUpsert},
        import::{ImageUpload, ImportOutcome, RawExtraction},
        note::{Cancellation, Note, NoteDetail, NoteFilters, NoteUpsert, PartialPayment, RawNote},
        pagination::{Envelope, Page},
    },
    services::session::{EndReason, SessionStore},
};

/// Tudo o que o console consome da API remota de promissórias.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Session, AppError>;
    async fn logout(&self) -> Result<(), AppError>;

    async fn list_notes(&self, filters: &NoteFilters, page: u32, per_page: u32) -> Result<Page<Note>, AppError>;
    async fn get_note(&self, id: i64) -> Result<NoteDetail, AppError>;
    async fn create_note(&self, body: &NoteUpsert) -> Result<Note, AppError>;
    async fn update_note(&self, id: i64, body: &NoteUpsert) -> Result<Note, AppError>;
    async fn delete_note(&self, id: i64) -> Result<(), AppError>;
    async fn mark_paid(&self, id: i64) -> Result<Note, AppError>;
    async fn register_partial_payment(&self, id: i64, body: &PartialPayment) -> Result<Note, AppError>;
    async fn cancel_note(&self, id: i64, body: &Cancellation) -> Result<Note, AppError>;
    async fn import_image(&self, image: ImageUpload, cliente_id: Option<i64>) -> Result<ImportOutcome, AppError>;
    async fn extract_image(&self, image: ImageUpload) -> Result<RawExtraction, AppError>;

    async fn list_customers(&self, search: Option<&str>, page: u32, per_page: u32) -> Result<Page<Customer>, AppError>;
    async fn get_customer(&self, id: i64) -> Result<Customer, AppError>;
    async fn create_customer(&self, body: &CustomerUpsert) -> Result<Customer, AppError>;
    async fn update_customer(&self, id: i64, body: &CustomerUpsert) -> Result<Customer, AppError>;
    async fn delete_customer(&self, id: i64) -> Result<(), AppError>;

    /// Busca a página 1, lê `last_page` e busca as demais em sequência.
    async fn list_all_notes(&self, filters: &NoteFilters, per_page: u32) -> Result<Vec<Note>, AppError> {
        let first = self.list_notes(filters, 1, per_page).await?;
        let last_page = first.meta.last_page;
        let mut notes = first.data;

        for page in 2..=last_page {
            let next = self.list_notes(filters, page, per_page).await?;
            notes.extend(next.data);
        }

        tracing::debug!("{} promissórias carregadas em {} página(s)", notes.len(), last_page.max(1));
        Ok(notes)
    }
}

/// Implementação sobre HTTP (`reqwest`), com a credencial da sessão.
pub struct HttpConsoleApi {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl HttpConsoleApi {
    pub fn new(settings: &Settings, session: SessionStore) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // Anexa a credencial e trata o 401: derruba a sessão do processo inteiro,
    // desde que ainda seja a mesma credencial que foi enviada.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let sent_token = self.session.token();
        let request = match &sent_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("API remota recusou a credencial ({})", response.url().path());
            if let Some(token) = &sent_token {
                if !self.session.end_if_token(token, EndReason::CredentialRejected) {
                    tracing::debug!("401 de uma credencial antiga; sessão atual mantida");
                }
            }
            return Err(AppError::SessionExpired);
        }
        Ok(response)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, AppError> {
        let response = self.execute(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(upstream_error(response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_note(&self, request: RequestBuilder) -> Result<Note, AppError> {
        let envelope: Envelope<RawNote> = self.send_json(request).await?;
        Ok(Note::from(envelope.data))
    }

    async fn send_customer(&self, request: RequestBuilder) -> Result<Customer, AppError> {
        let envelope: Envelope<Customer> = self.send_json(request).await?;
        Ok(envelope.data.with_display_fields())
    }
}

fn image_form(image: ImageUpload) -> Result<Form, AppError> {
    let mut part = Part::bytes(image.bytes).file_name(image.file_name);
    if let Some(content_type) = image.content_type.as_deref() {
        part = part.mime_str(content_type)?;
    }
    Ok(Form::new().part("imagem", part))
}

// Converte `{ message, errors: { campo: [msg] } }` da API remota.
async fn upstream_error(response: Response) -> AppError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return AppError::NotFound;
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let (message, errors) = parse_error_body(&body);
    AppError::Upstream { status: status.as_u16(), message, errors }
}

pub(crate) fn parse_error_body(body: &Value) -> (Option<String>, FieldErrors) {
    let message = body.get("message").and_then(Value::as_str).map(str::to_string);

    let mut errors = FieldErrors::new();
    if let Some(fields) = body.get("errors").and_then(Value::as_object) {
        for (field, value) in fields {
            let messages: Vec<String> = match value {
                Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                Value::String(single) => vec![single.clone()],
                _ => Vec::new(),
            };
            // O formulário só mostra a primeira mensagem de cada campo
            if let Some(first) = messages.into_iter().next() {
                errors.insert(field.clone(), vec![first]);
            }
        }
    }
    (message, errors)
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        // Sem passar por `execute`: 401 aqui é senha errada, não sessão expirada
        let response = self
            .http
            .post(self.url("login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body: RemoteLoginResponse = response.json().await?;
        Ok(Session { token: body.token, user: body.user })
    }

    async fn logout(&self) -> Result<(), AppError> {
        self.send(self.http.post(self.url("logout"))).await?;
        Ok(())
    }

    async fn list_notes(&self, filters: &NoteFilters, page: u32, per_page: u32) -> Result<Page<Note>, AppError> {
        let mut query = filters.to_query();
        query.push(("page", page.to_string()));
        query.push(("per_page", per_page.to_string()));

        let page: Page<RawNote> = self
            .send_json(self.http.get(self.url("promissorias")).query(&query))
            .await?;
        Ok(page.map(Note::from))
    }

    async fn get_note(&self, id: i64) -> Result<NoteDetail, AppError> {
        let envelope: Envelope<RawNote> = self
            .send_json(self.http.get(self.url(&format!("promissorias/{id}"))))
            .await?;
        Ok(NoteDetail::from(envelope.data))
    }

    async fn create_note(&self, body: &NoteUpsert) -> Result<Note, AppError> {
        self.send_note(self.http.post(self.url("promissorias")).json(body)).await
    }

    async fn update_note(&self, id: i64, body: &NoteUpsert) -> Result<Note, AppError> {
        self.send_note(self.http.put(self.url(&format!("promissorias/{id}"))).json(body))
            .await
    }

    async fn delete_note(&self, id: i64) -> Result<(), AppError> {
        self.send(self.http.delete(self.url(&format!("promissorias/{id}")))).await?;
        Ok(())
    }

    async fn mark_paid(&self, id: i64) -> Result<Note, AppError> {
        self.send_note(self.http.post(self.url(&format!("promissorias/{id}/marcar-como-paga"))))
            .await
    }

    async fn register_partial_payment(&self, id: i64, body: &PartialPayment) -> Result<Note, AppError> {
        self.send_note(
            self.http
                .post(self.url(&format!("promissorias/{id}/pagamento-parcial")))
                .json(body),
        )
        .await
    }

    async fn cancel_note(&self, id: i64, body: &Cancellation) -> Result<Note, AppError> {
        self.send_note(
            self.http
                .post(self.url(&format!("promissorias/{id}/cancelar")))
                .json(body),
        )
        .await
    }

    async fn import_image(&self, image: ImageUpload, cliente_id: Option<i64>) -> Result<ImportOutcome, AppError> {
        let mut form = image_form(image)?;
        if let Some(cliente_id) = cliente_id {
            form = form.text("cliente_id", cliente_id.to_string());
        }

        let response = self
            .execute(self.http.post(self.url("promissorias/importar-imagem")).multipart(form))
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().await?;
            let promissoria = body
                .get("data")
                .cloned()
                .and_then(|data| serde_json::from_value::<RawNote>(data).ok())
                .map(Note::from);
            return Ok(ImportOutcome::Importada { promissoria });
        }

        // 422 com `data`: extraiu, mas não achou o cliente sozinha
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            if let Some(data) = body.get("data").filter(|d| d.is_object()) {
                let extraction: RawExtraction =
                    serde_json::from_value(data.clone()).unwrap_or_default();
                return Ok(ImportOutcome::SelecionarCliente {
                    dados_extraidos: extraction.dados_extraidos,
                    candidatos: extraction.clientes_candidatos,
                });
            }
        }

        let (message, errors) = parse_error_body(&body);
        Err(AppError::Upstream { status: status.as_u16(), message, errors })
    }

    async fn extract_image(&self, image: ImageUpload) -> Result<RawExtraction, AppError> {
        let form = image_form(image)?;
        let envelope: Envelope<RawExtraction> = self
            .send_json(self.http.post(self.url("promissorias/extrair-imagem")).multipart(form))
            .await?;
        Ok(envelope.data)
    }

    async fn list_customers(&self, search: Option<&str>, page: u32, per_page: u32) -> Result<Page<Customer>, AppError> {
        let mut query = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }

        let page: Page<Customer> = self
            .send_json(self.http.get(self.url("clientes")).query(&query))
            .await?;
        Ok(page.map(Customer::with_display_fields))
    }

    async fn get_customer(&self, id: i64) -> Result<Customer, AppError> {
        self.send_customer(self.http.get(self.url(&format!("clientes/{id}")))).await
    }

    async fn create_customer(&self, body: &CustomerUpsert) -> Result<Customer, AppError> {
        self.send_customer(self.http.post(self.url("clientes")).json(body)).await
    }

    async fn update_customer(&self, id: i64, body: &CustomerUpsert) -> Result<Customer, AppError> {
        self.send_customer(self.http.put(self.url(&format!("clientes/{id}"))).json(body))
            .await
    }

    async fn delete_customer(&self, id: i64) -> Result<(), AppError> {
        self.send(self.http.delete(self.url(&format!("clientes/{id}")))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::SessionUser;
    use axum::{extract::State, routing::get, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    fn session(token: &str) -> Session {
        Session {
            token: token.to_string(),
            user: SessionUser { id: Some(1), name: Some("Operador".into()), email: None },
        }
    }

    // API remota que sempre responde 401. Com `relogin`, um novo login
    // acontece enquanto a requisição ainda está em andamento.
    async fn rejecting_api(store: SessionStore, relogin: bool) -> HttpConsoleApi {
        let app = Router::new()
            .route(
                "/api/clientes/{id}",
                get(|State((remote_store, relogin)): State<(SessionStore, bool)>| async move {
                    if relogin {
                        remote_store.start(session("novo"));
                    }
                    axum::http::StatusCode::UNAUTHORIZED
                }),
            )
            .with_state((store.clone(), relogin));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let settings = Settings { api_url: format!("http://{addr}/api"), ..Settings::default() };
        HttpConsoleApi::new(&settings, store).unwrap()
    }

    #[tokio::test]
    async fn rejected_credential_ends_session() {
        let store = SessionStore::new();
        store.start(session("antigo"));
        let api = rejecting_api(store.clone(), false).await;

        let result = api.get_customer(1).await;
        assert!(matches!(result, Err(AppError::SessionExpired)));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn late_rejection_keeps_newer_login() {
        let store = SessionStore::new();
        store.start(session("antigo"));
        let api = rejecting_api(store.clone(), true).await;

        let result = api.get_customer(1).await;
        assert!(matches!(result, Err(AppError::SessionExpired)));
        assert_eq!(store.token().as_deref(), Some("novo"));
    }

    #[test]
    fn error_body_keeps_first_message_per_field() {
        let body = json!({
            "message": "Os dados fornecidos são inválidos.",
            "errors": {
                "cpf": ["O CPF já está em uso.", "CPF inválido."],
                "email": "E-mail inválido."
            }
        });

        let (message, errors) = parse_error_body(&body);
        assert_eq!(message.as_deref(), Some("Os dados fornecidos são inválidos."));
        assert_eq!(errors["cpf"], vec!["O CPF já está em uso.".to_string()]);
        assert_eq!(errors["email"], vec!["E-mail inválido.".to_string()]);
    }

    #[test]
    fn error_body_tolerates_garbage() {
        let (message, errors) = parse_error_body(&json!("erro"));
        assert!(message.is_none());
        assert!(errors.is_empty());
    }
}
