// src/handlers/customers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        masks::unmask_phone,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        customer::{Address, Customer, CustomerUpsert},
        pagination::Page,
    },
    services::inflight::CUSTOMERS_SLOT,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct CustomerListQuery {
    /// Busca por nome, CPF ou e-mail
    pub search: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[validate(length(min = 1, message = "Informe o nome."))]
    #[schema(example = "Maria da Silva")]
    pub nome: String,

    // Aceita qualquer pontuação: "123.456.789-00"
    #[validate(length(min = 1, message = "Informe o CPF."))]
    #[schema(example = "123.456.789-00")]
    pub cpf: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria@exemplo.com")]
    pub email: String,

    // Pode vir mascarado: "(11) 98765-4321"
    #[serde(default)]
    #[schema(example = "(11) 98765-4321")]
    pub telefone: Option<String>,

    #[serde(default)]
    pub endereco: Option<Address>,

    /// Só na edição: apaga o endereço cadastrado.
    #[serde(default)]
    pub remover_endereco: bool,
}

impl CustomerPayload {
    fn into_upsert(self, is_edit: bool) -> CustomerUpsert {
        let telefone = self
            .telefone
            .map(|t| unmask_phone(&t))
            .filter(|digits| !digits.is_empty());

        let endereco = match (self.remover_endereco && is_edit, self.endereco) {
            (true, _) => Some(None),
            (false, Some(address)) => Some(Some(address.blank_to_none())),
            (false, None) => None,
        };

        CustomerUpsert {
            nome: self.nome.trim().to_string(),
            cpf: self.cpf.chars().filter(|c| c.is_ascii_digit()).collect(),
            email: self.email.trim().to_string(),
            telefone,
            endereco,
        }
    }
}

// GET /api/clientes
#[utoipa::path(
    get,
    path = "/api/clientes",
    tag = "Clientes",
    params(CustomerListQuery),
    responses(
        (status = 200, description = "Página de clientes", body = Page<Customer>),
        (status = 409, description = "Substituída por uma busca mais recente")
    )
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<CustomerListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let page = query.page.unwrap_or(1).max(1);

    // Debounce só quando há texto digitado
    let debounce = if search.is_some() {
        app_state.settings.search_debounce()
    } else {
        std::time::Duration::ZERO
    };

    let customers = app_state
        .slots
        .run_latest(
            CUSTOMERS_SLOT,
            debounce,
            app_state.api.list_customers(search, page, app_state.settings.per_page),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customers.map(Customer::with_display_fields))))
}

// GET /api/clientes/{id}
#[utoipa::path(
    get,
    path = "/api/clientes/{id}",
    tag = "Clientes",
    params(("id" = i64, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .api
        .get_customer(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer.with_display_fields())))
}

// POST /api/clientes
#[utoipa::path(
    post,
    path = "/api/clientes",
    tag = "Clientes",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Customer),
        (status = 400, description = "Dados inválidos"),
        (status = 422, description = "Recusado pela API (ex.: CPF duplicado)")
    )
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .api
        .create_customer(&payload.into_upsert(false))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer.with_display_fields())))
}

// PUT /api/clientes/{id}
#[utoipa::path(
    put,
    path = "/api/clientes/{id}",
    tag = "Clientes",
    request_body = CustomerPayload,
    params(("id" = i64, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente atualizado", body = Customer),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .api
        .update_customer(id, &payload.into_upsert(true))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer.with_display_fields())))
}

// DELETE /api/clientes/{id}
#[utoipa::path(
    delete,
    path = "/api/clientes/{id}",
    tag = "Clientes",
    params(("id" = i64, Path, description = "ID do cliente")),
    responses((status = 204, description = "Cliente excluído"))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .api
        .delete_customer(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
