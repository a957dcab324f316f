// src/services/dashboard_service.rs

use std::{
    cmp::Reverse,
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        dashboard::{CustomerDebt, DashboardQuery, DashboardView, Kpis, PeriodWindows, SeriesPoint, Window},
        note::{Note, NoteFilters, NoteStatus},
    },
    services::api_client::ConsoleApi,
};

const TOP_N: usize = 10;

#[derive(Clone)]
pub struct DashboardService {
    api: Arc<dyn ConsoleApi>,
    per_page: u32,
}

impl DashboardService {
    pub fn new(api: Arc<dyn ConsoleApi>, per_page: u32) -> Self {
        Self { api, per_page }
    }

    /// Carrega todas as promissórias e o total de clientes e monta o painel.
    pub async fn get_dashboard(&self, query: &DashboardQuery, now: NaiveDateTime) -> Result<DashboardView, AppError> {
        // Período inválido nem chega a consultar a API
        let windows = PeriodWindows::resolve(query, now.date())?;

        let notes = self.api.list_all_notes(&NoteFilters::default(), self.per_page).await?;
        let total_clientes = self.api.list_customers(None, 1, 1).await?.meta.total;

        tracing::debug!(
            "Painel {:?}: {} promissórias, {} clientes",
            query.periodo,
            notes.len(),
            total_clientes
        );

        Ok(build_dashboard(&notes, total_clientes, &windows))
    }
}

/// Monta o painel a partir das promissórias. Função pura: não falha, e
/// registros malformados simplesmente contam menos.
pub fn build_dashboard(notes: &[Note], total_clientes: u64, windows: &PeriodWindows) -> DashboardView {
    let open: Vec<&Note> = notes.iter().filter(|n| n.is_open()).collect();
    let paid: Vec<&Note> = notes.iter().filter(|n| n.status == NoteStatus::Paga).collect();

    let total_a_receber = sum_money(open.iter().map(|n| n.outstanding()));
    let total_vencidas = sum_money(
        open.iter()
            .filter(|n| n.status == NoteStatus::Vencida)
            .map(|n| n.outstanding()),
    );

    let paid_in = |window: &Window| -> Vec<(&Note, NaiveDateTime)> {
        paid.iter()
            .filter_map(|n| n.data_quitacao.map(|at| (*n, at)))
            .filter(|(_, at)| window.contains(*at))
            .collect()
    };
    let current = paid_in(&windows.current);
    let previous = paid_in(&windows.previous);

    let recebimentos_no_periodo = sum_money(current.iter().map(|(n, _)| n.amount_received()));
    let recebimentos_anterior = sum_money(previous.iter().map(|(n, _)| n.amount_received()));

    let clientes_ativos = if total_clientes == 0 {
        total_clientes
    } else {
        open.iter().filter_map(|n| n.cliente_id).collect::<HashSet<_>>().len() as u64
    };

    DashboardView {
        periodo: windows.current,
        kpis: Kpis {
            total_a_receber: total_a_receber.round_dp(2),
            total_vencidas: total_vencidas.round_dp(2),
            recebimentos_no_periodo: recebimentos_no_periodo.round_dp(2),
            clientes_ativos,
            total_clientes,
            variacao_recebimentos: percent_change(recebimentos_no_periodo, recebimentos_anterior),
        },
        recebimentos_serie: daily_series(&current),
        por_status: count_by_status(notes),
        distribuicao_cliente: debt_by_customer(&open),
        proximos_vencimentos: upcoming_due(&open),
        maiores_dividas: largest_debts(&open),
        ultimos_pagamentos: latest_payments(&paid),
    }
}

/// Variação percentual. Com o anterior zerado não há base: 100 se entrou
/// algo agora, 0 caso contrário. Uma razão grande demais satura em
/// `Decimal::MAX`.
pub fn percent_change(current: Decimal, previous: Decimal) -> Decimal {
    if previous > Decimal::ZERO {
        current
            .checked_sub(previous)
            .and_then(|delta| delta.checked_div(previous))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
            .round_dp(2)
    } else if current > Decimal::ZERO {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

// Soma que estoura fica com o total anterior: o registro absurdo
// simplesmente deixa de contar.
fn add_money(total: Decimal, value: Decimal) -> Decimal {
    total.checked_add(value).unwrap_or(total)
}

fn sum_money(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, add_money)
}

// Chave "YYYY-MM-DD" local; a ordem lexical é a cronológica
fn daily_series(paid: &[(&Note, NaiveDateTime)]) -> Vec<SeriesPoint> {
    let mut by_day: BTreeMap<String, Decimal> = BTreeMap::new();
    for (note, at) in paid {
        let total = by_day.entry(at.format("%Y-%m-%d").to_string()).or_default();
        *total = add_money(*total, note.amount_received());
    }

    by_day
        .into_iter()
        .map(|(data, valor)| SeriesPoint { data, valor: valor.round_dp(2) })
        .collect()
}

fn count_by_status(notes: &[Note]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = NoteStatus::KNOWN
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();

    for note in notes {
        *counts.entry(note.status.as_str().to_string()).or_default() += 1;
    }
    counts
}

fn debt_by_customer(open: &[&Note]) -> Vec<CustomerDebt> {
    let mut ranking: Vec<CustomerDebt> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for note in open {
        let Some(cliente_id) = note.cliente_id else { continue };
        let position = *index.entry(cliente_id).or_insert_with(|| {
            ranking.push(CustomerDebt {
                cliente_id,
                nome: note.customer_name(),
                valor: Decimal::ZERO,
            });
            ranking.len() - 1
        });
        ranking[position].valor = add_money(ranking[position].valor, note.outstanding());
    }

    for debt in &mut ranking {
        debt.valor = debt.valor.round_dp(2);
    }
    ranking.sort_by(|a, b| b.valor.cmp(&a.valor));
    ranking.truncate(TOP_N);
    ranking
}

fn upcoming_due(open: &[&Note]) -> Vec<Note> {
    let mut due: Vec<&Note> = open.iter().copied().filter(|n| n.data_vencimento.is_some()).collect();
    due.sort_by_key(|n| n.data_vencimento);
    due.into_iter().take(TOP_N).cloned().collect()
}

fn largest_debts(open: &[&Note]) -> Vec<Note> {
    let mut debts: Vec<&Note> = open.to_vec();
    debts.sort_by_key(|n| Reverse(n.outstanding()));
    debts.into_iter().take(TOP_N).cloned().collect()
}

fn latest_payments(paid: &[&Note]) -> Vec<Note> {
    let mut settled: Vec<&Note> = paid.iter().copied().filter(|n| n.data_quitacao.is_some()).collect();
    settled.sort_by_key(|n| Reverse(n.data_quitacao));
    settled.into_iter().take(TOP_N).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        dashboard::PeriodKey,
        note::{CustomerRef, RawNote},
    };
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
    }

    fn windows(periodo: PeriodKey) -> PeriodWindows {
        PeriodWindows::resolve(&DashboardQuery { periodo, ..Default::default() }, today()).unwrap()
    }

    fn note(id: i64, status: NoteStatus, valor: Decimal) -> Note {
        Note {
            id,
            cliente_id: Some(id),
            cliente: None,
            valor_original_total: valor,
            data_vencimento: None,
            status,
            valor_total_pago: None,
            saldo_restante: None,
            data_quitacao: None,
            observacoes: None,
        }
    }

    fn paid_on(id: i64, valor: Decimal, days_ago: i64) -> Note {
        let mut n = note(id, NoteStatus::Paga, valor);
        n.data_quitacao = (today() - Duration::days(days_ago)).and_hms_opt(10, 0, 0);
        n
    }

    #[test]
    fn status_counts_cover_every_note() {
        let notes = vec![
            note(1, NoteStatus::Pendente, dec!(10)),
            note(2, NoteStatus::Cancelada, dec!(10)),
            note(3, NoteStatus::Other("renegociada".into()), dec!(10)),
        ];
        let view = build_dashboard(&notes, 3, &windows(PeriodKey::ThirtyDays));

        assert_eq!(view.por_status["pendente"], 1);
        assert_eq!(view.por_status["vencida"], 0);
        assert_eq!(view.por_status["paga"], 0);
        assert_eq!(view.por_status["cancelada"], 1);
        assert_eq!(view.por_status.values().sum::<usize>(), notes.len());
    }

    #[test]
    fn overdue_total_ignores_paid_notes() {
        let mut overdue = note(1, NoteStatus::Vencida, dec!(300));
        overdue.saldo_restante = Some(dec!(100));
        let mut paid = note(2, NoteStatus::Paga, dec!(500));
        paid.saldo_restante = Some(dec!(500));

        let view = build_dashboard(&[overdue, paid], 2, &windows(PeriodKey::ThirtyDays));
        assert_eq!(view.kpis.total_vencidas, dec!(100));
        assert_eq!(view.kpis.total_a_receber, dec!(100));
    }

    #[test]
    fn no_payments_means_zero_variation() {
        let view = build_dashboard(&[note(1, NoteStatus::Pendente, dec!(50))], 1, &windows(PeriodKey::ThirtyDays));
        assert_eq!(view.kpis.recebimentos_no_periodo, Decimal::ZERO);
        assert_eq!(view.kpis.variacao_recebimentos, Decimal::ZERO);
        assert!(view.recebimentos_serie.is_empty());
    }

    #[test]
    fn variation_against_previous_window() {
        let mut receipt = paid_on(1, dec!(150), 1);
        receipt.valor_total_pago = Some(dec!(150));
        // 7 dias: atual 24..31, dia 23 fica de fora, anterior 15..22
        let older = paid_on(2, dec!(100), 10);
        let in_gap = paid_on(3, dec!(999), 8);

        let view = build_dashboard(&[receipt, older, in_gap], 3, &windows(PeriodKey::SevenDays));
        assert_eq!(view.kpis.recebimentos_no_periodo, dec!(150));
        assert_eq!(view.kpis.variacao_recebimentos, dec!(50));
    }

    #[test]
    fn zero_previous_with_receipts_is_hundred_percent() {
        assert_eq!(percent_change(dec!(10), Decimal::ZERO), dec!(100));
        assert_eq!(percent_change(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_change(dec!(50), dec!(200)), dec!(-75));
        assert_eq!(percent_change(dec!(1), dec!(3)), dec!(-66.67));
    }

    #[test]
    fn received_amount_prefers_total_paid() {
        let mut partial_then_paid = paid_on(1, dec!(200), 0);
        partial_then_paid.valor_total_pago = Some(dec!(180.10));
        let full = paid_on(2, dec!(0.2), 0);
        let other_day = paid_on(3, dec!(0.1), 2);

        let view = build_dashboard(&[partial_then_paid, full, other_day], 3, &windows(PeriodKey::Today));
        assert_eq!(view.kpis.recebimentos_no_periodo, dec!(180.30));
        assert_eq!(
            view.recebimentos_serie,
            vec![SeriesPoint { data: "2024-05-31".into(), valor: dec!(180.30) }]
        );
    }

    #[test]
    fn series_is_grouped_by_day_in_order() {
        let notes = vec![paid_on(1, dec!(10), 2), paid_on(2, dec!(5), 5), paid_on(3, dec!(7), 2)];
        let view = build_dashboard(&notes, 3, &windows(PeriodKey::ThirtyDays));

        let days: Vec<&str> = view.recebimentos_serie.iter().map(|p| p.data.as_str()).collect();
        assert_eq!(days, vec!["2024-05-26", "2024-05-29"]);
        assert_eq!(view.recebimentos_serie[1].valor, dec!(17));
    }

    #[test]
    fn paid_notes_without_date_stay_out_of_period_totals() {
        let undated = note(1, NoteStatus::Paga, dec!(80));
        let view = build_dashboard(&[undated], 1, &windows(PeriodKey::ThirtyDays));
        assert_eq!(view.kpis.recebimentos_no_periodo, Decimal::ZERO);
        assert!(view.ultimos_pagamentos.is_empty());
    }

    #[test]
    fn active_customers_count_distinct_open_debtors() {
        let mut a1 = note(1, NoteStatus::Pendente, dec!(10));
        a1.cliente_id = Some(7);
        let mut a2 = note(2, NoteStatus::Vencida, dec!(10));
        a2.cliente_id = Some(7);
        let b = note(3, NoteStatus::Pendente, dec!(10));
        let closed = note(4, NoteStatus::Paga, dec!(10));

        let notes = vec![a1, a2, b, closed];
        assert_eq!(build_dashboard(&notes, 20, &windows(PeriodKey::ThirtyDays)).kpis.clientes_ativos, 2);
        assert_eq!(build_dashboard(&notes, 0, &windows(PeriodKey::ThirtyDays)).kpis.clientes_ativos, 0);
    }

    #[test]
    fn distribution_sums_open_balances_per_customer() {
        let mut a1 = note(1, NoteStatus::Pendente, dec!(100));
        a1.cliente_id = Some(1);
        a1.cliente = Some(CustomerRef { id: Some(1), nome: Some("Ana".into()) });
        let mut a2 = note(2, NoteStatus::Vencida, dec!(100));
        a2.cliente_id = Some(1);
        a2.saldo_restante = Some(dec!(40));
        let mut b = note(3, NoteStatus::Pendente, dec!(300));
        b.cliente_id = Some(2);
        let mut only_closed = note(4, NoteStatus::Paga, dec!(1000));
        only_closed.cliente_id = Some(3);
        let mut cancelled = note(5, NoteStatus::Cancelada, dec!(1000));
        cancelled.cliente_id = Some(3);

        let view = build_dashboard(&[a1, a2, b, only_closed, cancelled], 3, &windows(PeriodKey::ThirtyDays));
        assert_eq!(
            view.distribuicao_cliente,
            vec![
                CustomerDebt { cliente_id: 2, nome: "Cliente #2".into(), valor: dec!(300) },
                CustomerDebt { cliente_id: 1, nome: "Ana".into(), valor: dec!(140) },
            ]
        );
    }

    #[test]
    fn upcoming_due_keeps_ten_earliest() {
        let notes: Vec<Note> = (0..12)
            .rev()
            .map(|i| {
                let mut n = note(i, NoteStatus::Pendente, dec!(10));
                n.data_vencimento = Some(today() + Duration::days(i));
                n
            })
            .collect();

        let view = build_dashboard(&notes, 12, &windows(PeriodKey::ThirtyDays));
        let ids: Vec<i64> = view.proximos_vencimentos.iter().map(|n| n.id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn largest_debts_sorted_and_capped() {
        let notes: Vec<Note> = (1..=15).map(|i| note(i, NoteStatus::Vencida, Decimal::from(i * 10))).collect();
        let view = build_dashboard(&notes, 15, &windows(PeriodKey::ThirtyDays));

        assert_eq!(view.maiores_dividas.len(), 10);
        assert_eq!(view.maiores_dividas[0].id, 15);
        assert!(view
            .maiores_dividas
            .windows(2)
            .all(|w| w[0].outstanding() >= w[1].outstanding()));
    }

    #[test]
    fn latest_payments_most_recent_first() {
        let notes: Vec<Note> = (1..=12).map(|i| paid_on(i, dec!(10), i * 40)).collect();
        let view = build_dashboard(&notes, 12, &windows(PeriodKey::SevenDays));

        let ids: Vec<i64> = view.ultimos_pagamentos.iter().map(|n| n.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn huge_amounts_are_undercounted_instead_of_overflowing() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        let mut first = note(1, NoteStatus::Pendente, huge);
        let mut second = note(2, NoteStatus::Pendente, huge);
        first.cliente_id = Some(7);
        second.cliente_id = Some(7);
        let notes = vec![first, second, paid_on(3, huge, 1), paid_on(4, huge, 2)];

        let view = build_dashboard(&notes, 4, &windows(PeriodKey::SevenDays));
        assert_eq!(view.kpis.total_a_receber, huge);
        assert_eq!(view.kpis.recebimentos_no_periodo, huge);
        assert_eq!(view.distribuicao_cliente[0].valor, huge);
        assert_eq!(view.recebimentos_serie.len(), 2);
        assert_eq!(view.por_status.values().sum::<usize>(), notes.len());
    }

    #[test]
    fn percent_change_saturates_on_overflow() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        assert_eq!(percent_change(huge, dec!(0.01)), Decimal::MAX);
        assert_eq!(percent_change(dec!(150), dec!(100)), dec!(50));
    }

    #[test]
    fn non_numeric_values_from_api_count_as_zero() {
        let raw: RawNote = serde_json::from_value(serde_json::json!({
            "id": 9, "cliente_id": 9, "valor": "abc", "saldo_restante": "n/a", "status": "pendente"
        }))
        .unwrap();
        let notes = vec![Note::from(raw), note(1, NoteStatus::Pendente, dec!(40))];

        let view = build_dashboard(&notes, 2, &windows(PeriodKey::ThirtyDays));
        assert_eq!(view.kpis.total_a_receber, dec!(40));
        assert_eq!(view.kpis.clientes_ativos, 2);
        assert_eq!(view.por_status["pendente"], 2);
    }
}
