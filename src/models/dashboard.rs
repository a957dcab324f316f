// src/models/dashboard.rs

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{common::error::AppError, models::note::Note};

// --- Período ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum PeriodKey {
    #[serde(rename = "hoje")]
    Today,
    #[serde(rename = "7")]
    SevenDays,
    #[default]
    #[serde(rename = "30")]
    ThirtyDays,
    #[serde(rename = "personalizado")]
    Custom,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// `hoje`, `7`, `30` (padrão) ou `personalizado`
    #[serde(default)]
    pub periodo: PeriodKey,
    /// Obrigatória quando `periodo=personalizado`
    #[param(value_type = Option<String>, format = Date)]
    pub data_inicio: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub data_fim: Option<NaiveDate>,
}

/// Intervalo fechado `[inicio, fim]` em horário local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Window {
    #[schema(value_type = String, format = DateTime)]
    pub inicio: NaiveDateTime,
    #[schema(value_type = String, format = DateTime)]
    pub fim: NaiveDateTime,
}

impl Window {
    /// Dias inteiros: do começo de `first` ao último milissegundo de `last`.
    /// `None` se `last` for o último dia representável.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Option<Self> {
        Some(Window { inicio: start_of_day(first), fim: end_of_day(last)? })
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.inicio <= at && at <= self.fim
    }
}

fn start_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn end_of_day(day: NaiveDate) -> Option<NaiveDateTime> {
    start_of_day(day.succ_opt()?).checked_sub_signed(Duration::milliseconds(1))
}

fn out_of_range() -> AppError {
    AppError::InvalidPeriod("data fora do intervalo suportado".to_string())
}

/// Janela atual e a janela anterior usada na variação de recebimentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindows {
    pub current: Window,
    pub previous: Window,
}

impl PeriodWindows {
    pub fn resolve(query: &DashboardQuery, today: NaiveDate) -> Result<Self, AppError> {
        match query.periodo {
            PeriodKey::Today => {
                let yesterday = today.pred_opt().ok_or_else(out_of_range)?;
                Ok(PeriodWindows {
                    current: Window::days(today, today).ok_or_else(out_of_range)?,
                    previous: Window::days(yesterday, yesterday).ok_or_else(out_of_range)?,
                })
            }
            PeriodKey::SevenDays => Self::trailing(today, 7),
            PeriodKey::ThirtyDays => Self::trailing(today, 30),
            PeriodKey::Custom => {
                let (Some(first), Some(last)) = (query.data_inicio, query.data_fim) else {
                    return Err(AppError::InvalidPeriod(
                        "data_inicio e data_fim são obrigatórias".to_string(),
                    ));
                };
                if last < first {
                    return Err(AppError::InvalidPeriod(format!(
                        "data_fim ({last}) anterior a data_inicio ({first})"
                    )));
                }
                Self::spanning(first, last)
            }
        }
    }

    fn trailing(today: NaiveDate, days: i64) -> Result<Self, AppError> {
        let first = today.checked_sub_signed(Duration::days(days)).ok_or_else(out_of_range)?;
        Self::spanning(first, today)
    }

    // A janela anterior tem o mesmo tamanho, mas termina dois dias antes do
    // início da atual: o dia imediatamente anterior não entra em nenhuma.
    // Datas nos extremos do calendário viram `InvalidPeriod`, nunca pânico.
    fn spanning(first: NaiveDate, last: NaiveDate) -> Result<Self, AppError> {
        let span = last.signed_duration_since(first);
        let previous_last = first.checked_sub_signed(Duration::days(2)).ok_or_else(out_of_range)?;
        let previous_first = previous_last.checked_sub_signed(span).ok_or_else(out_of_range)?;
        Ok(PeriodWindows {
            current: Window::days(first, last).ok_or_else(out_of_range)?,
            previous: Window::days(previous_first, previous_last).ok_or_else(out_of_range)?,
        })
    }
}

// --- View model ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    #[schema(value_type = f64)]
    pub total_a_receber: Decimal,
    #[schema(value_type = f64)]
    pub total_vencidas: Decimal,
    #[schema(value_type = f64)]
    pub recebimentos_no_periodo: Decimal,
    pub clientes_ativos: u64,
    pub total_clientes: u64,
    /// Em %. Com período anterior zerado: 100 se houve recebimento, senão 0.
    #[schema(value_type = f64)]
    pub variacao_recebimentos: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeriesPoint {
    /// `YYYY-MM-DD` no horário local
    #[schema(example = "2024-05-01")]
    pub data: String,
    #[schema(value_type = f64)]
    pub valor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDebt {
    pub cliente_id: i64,
    pub nome: String,
    #[schema(value_type = f64)]
    pub valor: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub periodo: Window,
    pub kpis: Kpis,
    pub recebimentos_serie: Vec<SeriesPoint>,
    pub por_status: BTreeMap<String, usize>,
    pub distribuicao_cliente: Vec<CustomerDebt>,
    pub proximos_vencimentos: Vec<Note>,
    pub maiores_dividas: Vec<Note>,
    pub ultimos_pagamentos: Vec<Note>,
}
