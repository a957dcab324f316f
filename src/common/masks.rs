// src/common/masks.rs

//! Máscaras dos campos de formulário do console.
//!
//! Telefone: `(DD) NNNNN-NNNN`. Dinheiro: `R$ 1.234,56`, sempre tratado como
//! um fluxo de dígitos em centavos. Nenhuma função aqui falha: entrada
//! inválida vira string vazia (máscara) ou zero (remoção de máscara).

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

const PHONE_MAX_DIGITS: usize = 11;

fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Aplica a máscara de telefone progressivamente, conforme o usuário digita.
///
/// Com 10 dígitos (fixo) o corte continua sendo 5+4, igual ao celular.
pub fn mask_phone(value: &str) -> String {
    let digits: String = only_digits(value).chars().take(PHONE_MAX_DIGITS).collect();

    match digits.len() {
        0 => String::new(),
        // Um dígito só ainda não forma o DDD: volta cru
        1 => digits,
        2 => format!("({digits}) "),
        3..=7 => format!("({}) {}", &digits[..2], &digits[2..]),
        _ => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
    }
}

/// Remove a máscara de telefone (apenas dígitos, sem validar tamanho).
pub fn unmask_phone(value: &str) -> String {
    only_digits(value)
}

/// O que pode chegar no campo de valor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoneyInput<'a> {
    /// Texto digitado: os dígitos já são centavos.
    Digits(&'a str),
    /// Valor em reais vindo da API.
    Reais(Decimal),
}

impl<'a> From<&'a str> for MoneyInput<'a> {
    fn from(value: &'a str) -> Self {
        MoneyInput::Digits(value)
    }
}

impl<'a> From<&'a String> for MoneyInput<'a> {
    fn from(value: &'a String) -> Self {
        MoneyInput::Digits(value.as_str())
    }
}

impl From<Decimal> for MoneyInput<'_> {
    fn from(value: Decimal) -> Self {
        MoneyInput::Reais(value)
    }
}

/// Aplica a máscara `R$ X.XXX,XX`.
///
/// Zero numérico vira `R$ 0,00`; texto sem dígitos vira string vazia.
pub fn mask_money<'a>(value: impl Into<MoneyInput<'a>>) -> String {
    let digits = match value.into() {
        MoneyInput::Digits(text) => only_digits(text),
        MoneyInput::Reais(reais) => money_to_input(Some(reais.abs())),
    };

    if digits.is_empty() {
        return String::new();
    }

    // Os dígitos são tratados como texto para não estourar com entradas longas
    let significant = digits.trim_start_matches('0');
    let padded = format!("{significant:0>3}");
    let (integer, cents) = padded.split_at(padded.len() - 2);

    format!("R$ {},{}", group_thousands(integer), cents)
}

/// Remove a máscara de dinheiro e devolve o valor em reais.
pub fn unmask_money(value: &str) -> Decimal {
    let digits = only_digits(value);
    if digits.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(&digits)
        .ok()
        .and_then(|cents| cents.checked_div(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Converte um valor em reais (da API) para a string de centavos que
/// alimenta o campo mascarado ao editar um registro.
pub fn money_to_input(value: Option<Decimal>) -> String {
    let Some(reais) = value else {
        return String::new();
    };

    reais
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| {
            cents
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .normalize()
                .to_string()
        })
        .unwrap_or_default()
}

// Separador de milhar pt-BR: "1234567" -> "1.234.567"
fn group_thousands(integer: &str) -> String {
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    grouped
}
