// src/handlers/test_support.rs

// API remota falsa + roteador completo para testar handlers com `oneshot`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{
    common::error::AppError,
    config::{AppState, Settings},
    models::{
        auth::{Session, SessionUser},
        customer::{Customer, CustomerUpsert},
        import::{CandidateCustomer, ExtractedData, ImageUpload, ImportOutcome, RawExtraction},
        note::{Cancellation, Note, NoteDetail, NoteFilters, NoteStatus, NoteUpsert, PartialPayment, RawNote},
        pagination::{Page, PageMeta},
    },
    routes,
    services::{api_client::ConsoleApi, session::SessionStore},
};

pub fn note(value: Value) -> Note {
    Note::from(serde_json::from_value::<RawNote>(value).unwrap())
}

#[derive(Default)]
pub struct FakeApi {
    pub notes: Vec<Note>,
    pub customers: Vec<Customer>,
    pub fail_logout: bool,
    log: Mutex<Vec<(String, Value)>>,
}

impl FakeApi {
    pub fn with_notes() -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            notes: vec![
                note(json!({
                    "id": 1, "cliente_id": 3, "cliente": { "id": 3, "nome": "Ana" },
                    "valor": "1000.00", "data_vencimento": "2024-06-30", "status": "pendente"
                })),
                note(json!({
                    "id": 2, "cliente_id": 4, "valor": "500.00", "data_vencimento": "2024-05-01",
                    "status": "paga", "data_pagamento": format!("{today} 10:00:00")
                })),
                note(json!({
                    "id": 3, "cliente_id": 3, "valor": "250.00", "data_vencimento": "2024-04-01",
                    "status": "vencida"
                })),
            ],
            ..Self::with_customers()
        }
    }

    pub fn failing_logout() -> Self {
        Self { fail_logout: true, ..Self::default() }
    }

    pub fn with_customers() -> Self {
        let customer = |id: i64, nome: &str| Customer {
            id: Some(id),
            nome: nome.to_string(),
            email: Some(format!("{}@exemplo.com", nome.to_lowercase())),
            telefone: Some("11987654321".to_string()),
            cpf: None,
            endereco: None,
            telefone_formatado: String::new(),
        };
        Self { customers: vec![customer(3, "Ana"), customer(4, "Bruno")], ..Self::default() }
    }

    fn record(&self, call: &str, body: Value) {
        self.log.lock().unwrap().push((call.to_string(), body));
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(call, _)| call.clone()).collect()
    }

    pub fn last_body(&self, call: &str) -> Option<Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == call)
            .map(|(_, body)| body.clone())
    }

    fn find_note(&self, id: i64) -> Result<Note, AppError> {
        self.notes.iter().find(|n| n.id == id).cloned().ok_or(AppError::NotFound)
    }

    fn echo_note(id: i64, body: &NoteUpsert) -> Note {
        note(json!({
            "id": id,
            "cliente_id": body.cliente_id,
            "valor": body.valor.to_string(),
            "data_vencimento": body.data_vencimento.to_string(),
            "status": "pendente",
            "observacoes": body.observacoes,
        }))
    }

    fn echo_customer(id: i64, body: &CustomerUpsert) -> Customer {
        Customer {
            id: Some(id),
            nome: body.nome.clone(),
            email: Some(body.email.clone()),
            telefone: body.telefone.clone(),
            cpf: Some(body.cpf.clone()),
            endereco: body.endereco.clone().flatten(),
            telefone_formatado: String::new(),
        }
    }
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn login(&self, email: &str, _password: &str) -> Result<Session, AppError> {
        self.record("login", json!({ "email": email }));
        Ok(Session {
            token: "token-de-teste".to_string(),
            user: SessionUser {
                id: Some(1),
                name: Some("Operador".to_string()),
                email: Some(email.to_string()),
            },
        })
    }

    async fn logout(&self) -> Result<(), AppError> {
        self.record("logout", Value::Null);
        if self.fail_logout {
            return Err(AppError::Upstream { status: 500, message: None, errors: Default::default() });
        }
        Ok(())
    }

    async fn list_notes(&self, filters: &NoteFilters, page: u32, per_page: u32) -> Result<Page<Note>, AppError> {
        self.record("list_notes", json!({ "query": filters.to_query(), "page": page }));
        Ok(Page {
            data: self.notes.clone(),
            meta: PageMeta { current_page: page, last_page: 1, per_page, total: self.notes.len() as u64 },
        })
    }

    async fn get_note(&self, id: i64) -> Result<NoteDetail, AppError> {
        self.record("get_note", json!(id));
        Ok(NoteDetail { note: self.find_note(id)?, historico_pagamentos: Vec::new() })
    }

    async fn create_note(&self, body: &NoteUpsert) -> Result<Note, AppError> {
        self.record("create_note", serde_json::to_value(body).unwrap());
        Ok(Self::echo_note(99, body))
    }

    async fn update_note(&self, id: i64, body: &NoteUpsert) -> Result<Note, AppError> {
        self.record("update_note", serde_json::to_value(body).unwrap());
        Ok(Self::echo_note(id, body))
    }

    async fn delete_note(&self, id: i64) -> Result<(), AppError> {
        self.record("delete_note", json!(id));
        Ok(())
    }

    async fn mark_paid(&self, id: i64) -> Result<Note, AppError> {
        self.record("mark_paid", json!(id));
        let mut note = self.find_note(id)?;
        note.status = NoteStatus::Paga;
        Ok(note)
    }

    async fn register_partial_payment(&self, id: i64, body: &PartialPayment) -> Result<Note, AppError> {
        self.record("register_partial_payment", serde_json::to_value(body).unwrap());
        self.find_note(id)
    }

    async fn cancel_note(&self, id: i64, body: &Cancellation) -> Result<Note, AppError> {
        self.record("cancel_note", serde_json::to_value(body).unwrap());
        let mut note = self.find_note(id)?;
        note.status = NoteStatus::Cancelada;
        Ok(note)
    }

    async fn import_image(&self, image: ImageUpload, cliente_id: Option<i64>) -> Result<ImportOutcome, AppError> {
        self.record("import_image", json!({ "file": image.file_name, "cliente_id": cliente_id }));
        Ok(match cliente_id {
            Some(_) => ImportOutcome::Importada { promissoria: None },
            None => ImportOutcome::SelecionarCliente {
                dados_extraidos: ExtractedData::default(),
                candidatos: vec![CandidateCustomer { id: Some(3), nome: Some("Ana".to_string()), cpf: None }],
            },
        })
    }

    async fn extract_image(&self, image: ImageUpload) -> Result<RawExtraction, AppError> {
        self.record("extract_image", json!({ "file": image.file_name }));
        Ok(serde_json::from_value(json!({
            "dados_extraidos": { "nome_cliente": "Ana", "valor": "1500.50", "data_vencimento": "2024-12-31" },
            "clientes_candidatos": [{ "id": 3, "nome": "Ana" }]
        }))
        .unwrap())
    }

    async fn list_customers(&self, search: Option<&str>, page: u32, per_page: u32) -> Result<Page<Customer>, AppError> {
        self.record("list_customers", json!({ "search": search, "page": page }));
        Ok(Page {
            data: self.customers.clone(),
            meta: PageMeta { current_page: page, last_page: 1, per_page, total: self.customers.len() as u64 },
        })
    }

    async fn get_customer(&self, id: i64) -> Result<Customer, AppError> {
        self.record("get_customer", json!(id));
        self.customers.iter().find(|c| c.id == Some(id)).cloned().ok_or(AppError::NotFound)
    }

    async fn create_customer(&self, body: &CustomerUpsert) -> Result<Customer, AppError> {
        self.record("create_customer", serde_json::to_value(body).unwrap());
        Ok(Self::echo_customer(10, body))
    }

    async fn update_customer(&self, id: i64, body: &CustomerUpsert) -> Result<Customer, AppError> {
        self.record("update_customer", serde_json::to_value(body).unwrap());
        Ok(Self::echo_customer(id, body))
    }

    async fn delete_customer(&self, id: i64) -> Result<(), AppError> {
        self.record("delete_customer", json!(id));
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub api: Arc<FakeApi>,
    router: Router,
}

impl TestApp {
    pub fn anonymous(api: FakeApi) -> Self {
        Self::build(api, SessionStore::new())
    }

    pub fn authenticated(api: FakeApi) -> Self {
        let session = SessionStore::new();
        session.start(Session {
            token: "token-de-teste".to_string(),
            user: SessionUser {
                id: Some(1),
                name: Some("Operador".to_string()),
                email: Some("admin@exemplo.com".to_string()),
            },
        });
        Self::build(api, session)
    }

    fn build(api: FakeApi, session: SessionStore) -> Self {
        let api = Arc::new(api);
        let settings = Settings { search_debounce_ms: 0, ..Settings::default() };
        let state = AppState::with_api(settings, session, api.clone());
        let router = routes::router(state.clone());
        Self { state, api, router }
    }
}

async fn dispatch(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    dispatch(app, request).await
}

pub async fn send_with_lang(app: &TestApp, method: &str, uri: &str, lang: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT_LANGUAGE, lang)
        .body(Body::empty())
        .unwrap();
    dispatch(app, request).await
}

/// `image`: (nome do arquivo, content-type).
pub async fn send_multipart(
    app: &TestApp,
    uri: &str,
    image: Option<(&str, &str)>,
    cliente_id: Option<i64>,
) -> (StatusCode, Value) {
    const BOUNDARY: &str = "limite-de-teste";

    let mut body = String::new();
    if let Some((file_name, content_type)) = image {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"imagem\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\nconteudo-da-imagem\r\n"
        ));
    }
    if let Some(id) = cliente_id {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cliente_id\"\r\n\r\n{id}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"observacoes\"\r\n\r\n\r\n--{BOUNDARY}--\r\n"
    ));

    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    dispatch(app, request).await
}
