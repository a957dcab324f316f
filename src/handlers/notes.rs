// src/handlers/notes.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        masks::unmask_money,
        tolerant::parse_date,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        import::{ExtractionPrefill, ImageUpload, ImportOutcome},
        note::{Cancellation, Note, NoteDetail, NoteFilters, NoteFormPrefill, NoteUpsert, PartialPayment},
        pagination::Page,
    },
    services::inflight::NOTES_SLOT,
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct NoteListQuery {
    /// `pendente`, `vencida`, `paga` ou `cancelada`
    pub status: Option<String>,
    pub cliente_id: Option<i64>,
    #[serde(default)]
    pub vencidas: bool,
    #[serde(default)]
    pub proximas_vencimento: bool,
    /// Janela de "próximas do vencimento", em dias
    pub dias: Option<u32>,
    pub page: Option<u32>,
}

impl NoteListQuery {
    fn filters(&self) -> NoteFilters {
        NoteFilters {
            status: self.status.clone(),
            cliente_id: self.cliente_id,
            vencidas: self.vencidas,
            proximas_vencimento: self.proximas_vencimento,
            dias: self.dias,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NotePayload {
    #[validate(required(message = "Selecione o cliente."))]
    #[schema(example = 3)]
    pub cliente_id: Option<i64>,

    /// Valor como digitado no campo mascarado
    #[schema(example = "R$ 1.500,00")]
    pub valor: String,

    #[validate(length(min = 1, message = "Informe a data de vencimento."))]
    #[schema(example = "2024-12-31")]
    pub data_vencimento: String,

    #[serde(default)]
    pub observacoes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PartialPaymentPayload {
    #[schema(example = "R$ 200,00")]
    pub valor_pago: String,

    #[validate(length(min = 1, message = "Informe a data do pagamento."))]
    #[schema(example = "2024-06-10")]
    pub data_pagamento: String,

    #[serde(default)]
    pub observacoes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelPayload {
    #[serde(default)]
    pub observacoes: Option<String>,
}

/// Formulário multipart de importação de foto. Existe só para o OpenAPI:
/// os campos são lidos um a um em `read_image_form`, nunca neste struct.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageForm {
    #[schema(value_type = String, format = Binary)]
    pub imagem: Vec<u8>,
    /// Cliente escolhido depois de uma importação ambígua
    pub cliente_id: Option<i64>,
}

fn positive_amount(field: &'static str, masked: &str) -> Result<Decimal, AppError> {
    let amount = unmask_money(masked);
    if amount <= Decimal::ZERO {
        return Err(AppError::field(field, "positive", "Informe um valor maior que zero."));
    }
    Ok(amount)
}

fn required_date(field: &'static str, raw: &str) -> Result<NaiveDate, AppError> {
    parse_date(raw).ok_or_else(|| AppError::field(field, "date", "Data inválida."))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl NotePayload {
    fn into_upsert(self) -> Result<NoteUpsert, AppError> {
        self.validate()?;
        Ok(NoteUpsert {
            cliente_id: self.cliente_id.unwrap_or_default(),
            valor: positive_amount("valor", &self.valor)?,
            data_vencimento: required_date("data_vencimento", &self.data_vencimento)?,
            observacoes: blank_to_none(self.observacoes),
        })
    }
}

impl PartialPaymentPayload {
    fn into_payment(self) -> Result<PartialPayment, AppError> {
        self.validate()?;
        Ok(PartialPayment {
            valor_pago: positive_amount("valor_pago", &self.valor_pago)?,
            data_pagamento: required_date("data_pagamento", &self.data_pagamento)?,
            observacoes: blank_to_none(self.observacoes),
        })
    }
}

// Ações de baixa/cancelamento só valem para promissória em aberto
async fn ensure_open(app_state: &AppState, id: i64) -> Result<(), AppError> {
    let detail = app_state.api.get_note(id).await?;
    if !detail.note.is_open() {
        return Err(AppError::NoteClosed(id));
    }
    Ok(())
}

async fn read_image_form(mut multipart: Multipart) -> Result<(ImageUpload, Option<i64>), AppError> {
    let mut image = None;
    let mut cliente_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("imagem") => {
                let file_name = field.file_name().unwrap_or("promissoria.jpg").to_string();
                let content_type = field.content_type().map(str::to_string);
                if !content_type.as_deref().is_some_and(|ct| ct.starts_with("image/")) {
                    return Err(AppError::InvalidUpload(format!("tipo {content_type:?}")));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidUpload(e.to_string()))?;
                image = Some(ImageUpload { file_name, content_type, bytes: bytes.to_vec() });
            }
            Some("cliente_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidUpload(e.to_string()))?;
                cliente_id = text.trim().parse::<i64>().ok();
            }
            _ => {}
        }
    }

    let image = image
        .filter(|img| !img.bytes.is_empty())
        .ok_or_else(|| AppError::InvalidUpload("campo `imagem` ausente".to_string()))?;
    Ok((image, cliente_id))
}

// =============================================================================
//  LISTAGEM E DETALHE
// =============================================================================

// GET /api/promissorias
#[utoipa::path(
    get,
    path = "/api/promissorias",
    tag = "Promissórias",
    params(NoteListQuery),
    responses(
        (status = 200, description = "Página de promissórias", body = Page<Note>),
        (status = 409, description = "Substituída por uma listagem mais recente")
    )
)]
pub async fn list_notes(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<NoteListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filters = query.filters();
    let page = query.page.unwrap_or(1).max(1);

    let notes = app_state
        .slots
        .run_latest(
            NOTES_SLOT,
            std::time::Duration::ZERO,
            app_state.api.list_notes(&filters, page, app_state.settings.per_page),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(notes)))
}

// GET /api/promissorias/{id}
#[utoipa::path(
    get,
    path = "/api/promissorias/{id}",
    tag = "Promissórias",
    params(("id" = i64, Path, description = "ID da promissória")),
    responses(
        (status = 200, description = "Promissória com histórico de pagamentos", body = NoteDetail),
        (status = 404, description = "Não encontrada")
    )
)]
pub async fn get_note(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .api
        .get_note(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// GET /api/promissorias/{id}/formulario
#[utoipa::path(
    get,
    path = "/api/promissorias/{id}/formulario",
    tag = "Promissórias",
    params(("id" = i64, Path, description = "ID da promissória")),
    responses((status = 200, description = "Valores iniciais do formulário de edição", body = NoteFormPrefill))
)]
pub async fn get_note_form(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .api
        .get_note(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(NoteFormPrefill::from(&detail.note))))
}

// =============================================================================
//  CADASTRO
// =============================================================================

// POST /api/promissorias
#[utoipa::path(
    post,
    path = "/api/promissorias",
    tag = "Promissórias",
    request_body = NotePayload,
    responses(
        (status = 201, description = "Promissória criada", body = Note),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn create_note(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<NotePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let body = payload
        .into_upsert()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let note = app_state
        .api
        .create_note(&body)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(note)))
}

// PUT /api/promissorias/{id}
#[utoipa::path(
    put,
    path = "/api/promissorias/{id}",
    tag = "Promissórias",
    request_body = NotePayload,
    params(("id" = i64, Path, description = "ID da promissória")),
    responses(
        (status = 200, description = "Promissória atualizada", body = Note),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn update_note(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<NotePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let body = payload
        .into_upsert()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let note = app_state
        .api
        .update_note(id, &body)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(note)))
}

// DELETE /api/promissorias/{id}
#[utoipa::path(
    delete,
    path = "/api/promissorias/{id}",
    tag = "Promissórias",
    params(("id" = i64, Path, description = "ID da promissória")),
    responses((status = 204, description = "Promissória excluída"))
)]
pub async fn delete_note(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .api
        .delete_note(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  BAIXA E CANCELAMENTO
// =============================================================================

// POST /api/promissorias/{id}/marcar-como-paga
#[utoipa::path(
    post,
    path = "/api/promissorias/{id}/marcar-como-paga",
    tag = "Promissórias",
    params(("id" = i64, Path, description = "ID da promissória")),
    responses(
        (status = 200, description = "Promissória quitada", body = Note),
        (status = 422, description = "Promissória não está em aberto")
    )
)]
pub async fn mark_paid(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_open(&app_state, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let note = app_state
        .api
        .mark_paid(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!("Promissória {} marcada como paga", id);
    Ok((StatusCode::OK, Json(note)))
}

// POST /api/promissorias/{id}/pagamento-parcial
#[utoipa::path(
    post,
    path = "/api/promissorias/{id}/pagamento-parcial",
    tag = "Promissórias",
    request_body = PartialPaymentPayload,
    params(("id" = i64, Path, description = "ID da promissória")),
    responses(
        (status = 200, description = "Pagamento registrado", body = Note),
        (status = 400, description = "Dados inválidos"),
        (status = 422, description = "Promissória não está em aberto")
    )
)]
pub async fn register_partial_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<PartialPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let body = payload
        .into_payment()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    ensure_open(&app_state, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let note = app_state
        .api
        .register_partial_payment(id, &body)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(note)))
}

// POST /api/promissorias/{id}/cancelar
#[utoipa::path(
    post,
    path = "/api/promissorias/{id}/cancelar",
    tag = "Promissórias",
    request_body = CancelPayload,
    params(("id" = i64, Path, description = "ID da promissória")),
    responses(
        (status = 200, description = "Promissória cancelada", body = Note),
        (status = 422, description = "Promissória não está em aberto")
    )
)]
pub async fn cancel_note(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<CancelPayload>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_open(&app_state, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = Cancellation { observacoes: blank_to_none(payload.observacoes) };
    let note = app_state
        .api
        .cancel_note(id, &body)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!("Promissória {} cancelada", id);
    Ok((StatusCode::OK, Json(note)))
}

// =============================================================================
//  IMPORTAÇÃO POR FOTO
// =============================================================================

// POST /api/promissorias/importar-imagem
#[utoipa::path(
    post,
    path = "/api/promissorias/importar-imagem",
    tag = "Promissórias",
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Importada, ou candidatos para escolher o cliente", body = ImportOutcome),
        (status = 400, description = "Imagem ausente ou inválida")
    )
)]
pub async fn import_image(
    State(app_state): State<AppState>,
    locale: Locale,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (image, cliente_id) = read_image_form(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = app_state
        .api
        .import_image(image, cliente_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(outcome)))
}

// POST /api/promissorias/extrair-imagem
#[utoipa::path(
    post,
    path = "/api/promissorias/extrair-imagem",
    tag = "Promissórias",
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Dados extraídos, prontos para o formulário", body = ExtractionPrefill),
        (status = 400, description = "Imagem ausente ou inválida")
    )
)]
pub async fn extract_image(
    State(app_state): State<AppState>,
    locale: Locale,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (image, _) = read_image_form(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let extraction = app_state
        .api
        .extract_image(image)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ExtractionPrefill::from(extraction))))
}
