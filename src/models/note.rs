// src/models/note.rs

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use crate::common::{
    masks::{mask_money, money_to_input},
    tolerant,
};

// --- Status ---

/// Situação da promissória. As transições são decididas pela API remota;
/// aqui só lemos.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteStatus {
    Pendente,
    Vencida,
    Paga,
    Cancelada,
    // Qualquer valor que a API mandar e não conhecemos
    Other(String),
}

impl NoteStatus {
    pub const KNOWN: [NoteStatus; 4] = [
        NoteStatus::Pendente,
        NoteStatus::Vencida,
        NoteStatus::Paga,
        NoteStatus::Cancelada,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            NoteStatus::Pendente => "pendente",
            NoteStatus::Vencida => "vencida",
            NoteStatus::Paga => "paga",
            NoteStatus::Cancelada => "cancelada",
            NoteStatus::Other(raw) => raw,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, NoteStatus::Pendente | NoteStatus::Vencida)
    }
}

impl From<&str> for NoteStatus {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "pendente" => NoteStatus::Pendente,
            "vencida" => NoteStatus::Vencida,
            "paga" => NoteStatus::Paga,
            "cancelada" => NoteStatus::Cancelada,
            other => NoteStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NoteStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NoteStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(NoteStatus::from).unwrap_or(NoteStatus::Other(String::new())))
    }
}

// --- Registro cru da API remota ---

/// Cliente embutido na promissória (quando a API faz o join).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerRef {
    #[serde(default, deserialize_with = "tolerant::id")]
    pub id: Option<i64>,
    #[serde(default)]
    #[schema(example = "Maria da Silva")]
    pub nome: Option<String>,
}

/// Formato da promissória como a API remota entrega. O nome dos campos
/// muda conforme a versão da API; `Note::from` resolve isso uma vez só.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNote {
    #[serde(default, deserialize_with = "tolerant::id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "tolerant::id")]
    pub cliente_id: Option<i64>,
    #[serde(default)]
    pub cliente: Option<CustomerRef>,

    #[serde(default, deserialize_with = "tolerant::decimal")]
    pub valor_original_total: Option<Decimal>,
    #[serde(default, deserialize_with = "tolerant::decimal")]
    pub valor: Option<Decimal>,

    #[serde(default, deserialize_with = "tolerant::date")]
    pub data_vencimento: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<NoteStatus>,

    #[serde(default, deserialize_with = "tolerant::decimal")]
    pub valor_total_pago: Option<Decimal>,
    #[serde(default, deserialize_with = "tolerant::decimal")]
    pub saldo_restante: Option<Decimal>,

    #[serde(default, deserialize_with = "tolerant::datetime")]
    pub data_pagamento: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "tolerant::datetime")]
    pub data_pago: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "tolerant::datetime")]
    pub updated_at: Option<NaiveDateTime>,

    #[serde(default)]
    pub observacoes: Option<String>,
    #[serde(default)]
    pub historico_pagamentos: Vec<RawPayment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayment {
    #[serde(default, deserialize_with = "tolerant::id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "tolerant::decimal")]
    pub valor_pago: Option<Decimal>,
    #[serde(default, deserialize_with = "tolerant::date")]
    pub data_pagamento: Option<NaiveDate>,
    #[serde(default)]
    pub observacoes: Option<String>,
}

// --- Formato canônico ---

/// Promissória normalizada, a única forma usada fora do cliente HTTP.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub cliente_id: Option<i64>,
    pub cliente: Option<CustomerRef>,

    #[schema(value_type = f64, example = 1500.00)]
    pub valor_original_total: Decimal,

    #[schema(value_type = Option<String>, format = Date, example = "2024-12-31")]
    pub data_vencimento: Option<NaiveDate>,

    #[schema(value_type = String, example = "pendente")]
    pub status: NoteStatus,

    #[schema(value_type = Option<f64>)]
    pub valor_total_pago: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub saldo_restante: Option<Decimal>,

    // Quando foi quitada: data_pagamento, senão data_pago, senão updated_at
    #[schema(value_type = Option<String>, format = DateTime)]
    pub data_quitacao: Option<NaiveDateTime>,

    pub observacoes: Option<String>,
}

impl Note {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Saldo devedor. Paga ou cancelada nunca deve nada, mesmo que a API
    /// mande saldo.
    pub fn outstanding(&self) -> Decimal {
        match self.status {
            NoteStatus::Paga | NoteStatus::Cancelada => Decimal::ZERO,
            _ => self.saldo_restante.unwrap_or(self.valor_original_total),
        }
    }

    /// Quanto entrou quando a promissória foi quitada.
    pub fn amount_received(&self) -> Decimal {
        self.valor_total_pago.unwrap_or(self.valor_original_total)
    }

    pub fn customer_name(&self) -> String {
        self.cliente
            .as_ref()
            .and_then(|c| c.nome.clone())
            .filter(|nome| !nome.trim().is_empty())
            .unwrap_or_else(|| match self.cliente_id {
                Some(id) => format!("Cliente #{id}"),
                None => "Cliente".to_string(),
            })
    }
}

impl From<RawNote> for Note {
    fn from(raw: RawNote) -> Self {
        let cliente_id = raw.cliente_id.or_else(|| raw.cliente.as_ref().and_then(|c| c.id));

        Note {
            id: raw.id.unwrap_or_default(),
            cliente_id,
            cliente: raw.cliente,
            valor_original_total: raw
                .valor_original_total
                .or(raw.valor)
                .unwrap_or(Decimal::ZERO),
            data_vencimento: raw.data_vencimento,
            status: raw.status.unwrap_or(NoteStatus::Other(String::new())),
            valor_total_pago: raw.valor_total_pago,
            saldo_restante: raw.saldo_restante,
            data_quitacao: raw.data_pagamento.or(raw.data_pago).or(raw.updated_at),
            observacoes: raw.observacoes,
        }
    }
}

/// Lançamento do histórico de pagamentos.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Option<i64>,
    #[schema(value_type = f64)]
    pub valor_pago: Decimal,
    #[schema(value_type = Option<String>, format = Date)]
    pub data_pagamento: Option<NaiveDate>,
    pub observacoes: Option<String>,
}

impl From<RawPayment> for Payment {
    fn from(raw: RawPayment) -> Self {
        Payment {
            id: raw.id,
            valor_pago: raw.valor_pago.unwrap_or(Decimal::ZERO),
            data_pagamento: raw.data_pagamento,
            observacoes: raw.observacoes,
        }
    }
}

/// Promissória com o histórico, para a tela de detalhe.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteDetail {
    #[serde(flatten)]
    pub note: Note,
    pub historico_pagamentos: Vec<Payment>,
}

impl From<RawNote> for NoteDetail {
    fn from(mut raw: RawNote) -> Self {
        let historico = std::mem::take(&mut raw.historico_pagamentos);
        NoteDetail {
            note: Note::from(raw),
            historico_pagamentos: historico.into_iter().map(Payment::from).collect(),
        }
    }
}

/// Valores iniciais do formulário de edição.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteFormPrefill {
    pub cliente_id: Option<i64>,
    #[schema(example = "R$ 1.500,00")]
    pub valor: String,
    #[schema(example = "2024-12-31")]
    pub data_vencimento: String,
    pub observacoes: String,
}

impl From<&Note> for NoteFormPrefill {
    fn from(note: &Note) -> Self {
        NoteFormPrefill {
            cliente_id: note.cliente_id,
            valor: mask_money(money_to_input(Some(note.valor_original_total)).as_str()),
            data_vencimento: note.data_vencimento.map(|d| d.to_string()).unwrap_or_default(),
            observacoes: note.observacoes.clone().unwrap_or_default(),
        }
    }
}

// --- Filtros e corpos enviados à API remota ---

/// Filtros da listagem de promissórias.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NoteFilters {
    pub status: Option<String>,
    pub cliente_id: Option<i64>,
    #[serde(default)]
    pub vencidas: bool,
    #[serde(default)]
    pub proximas_vencimento: bool,
    pub dias: Option<u32>,
}

impl NoteFilters {
    /// Parâmetros de query no formato da API remota.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            params.push(("status", status.to_string()));
        }
        if let Some(cliente_id) = self.cliente_id {
            params.push(("cliente_id", cliente_id.to_string()));
        }
        if self.vencidas {
            params.push(("vencidas", "1".to_string()));
        }
        if self.proximas_vencimento {
            params.push(("proximas_vencimento", "1".to_string()));
            if let Some(dias) = self.dias {
                params.push(("dias", dias.to_string()));
            }
        }
        params
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteUpsert {
    pub cliente_id: i64,
    pub valor: Decimal,
    pub data_vencimento: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartialPayment {
    pub valor_pago: Decimal,
    pub data_pagamento: NaiveDate,
    pub observacoes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cancellation {
    pub observacoes: Option<String>,
}
