// src/handlers/masks.rs

//! Máscaras aplicadas a cada tecla pelo front-end: devolvem o texto
//! mascarado e o valor "cru" que seria enviado à API.

use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::common::masks::{mask_money, mask_phone, unmask_money, unmask_phone};

#[derive(Debug, Deserialize, IntoParams)]
pub struct MaskQuery {
    /// Texto como está no campo
    #[serde(default)]
    pub valor: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MaskResponse {
    #[schema(example = "(11) 98765-4321")]
    pub mascarado: String,
    /// Dígitos do telefone, ou o valor em reais
    #[schema(value_type = Object)]
    pub valor: Value,
}

// GET /api/mascaras/telefone
#[utoipa::path(
    get,
    path = "/api/mascaras/telefone",
    tag = "Máscaras",
    params(MaskQuery),
    responses((status = 200, description = "Telefone mascarado", body = MaskResponse))
)]
pub async fn phone(Query(query): Query<MaskQuery>) -> Json<MaskResponse> {
    Json(MaskResponse {
        mascarado: mask_phone(&query.valor),
        valor: Value::String(unmask_phone(&query.valor)),
    })
}

// GET /api/mascaras/dinheiro
#[utoipa::path(
    get,
    path = "/api/mascaras/dinheiro",
    tag = "Máscaras",
    params(MaskQuery),
    responses((status = 200, description = "Valor mascarado", body = MaskResponse))
)]
pub async fn money(Query(query): Query<MaskQuery>) -> Json<MaskResponse> {
    let reais = unmask_money(&query.valor);
    Json(MaskResponse {
        mascarado: mask_money(query.valor.as_str()),
        valor: serde_json::to_value(reais).unwrap_or(Value::Null),
    })
}
