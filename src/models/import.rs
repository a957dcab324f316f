// src/models/import.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    common::{
        masks::{mask_money, money_to_input},
        tolerant,
    },
    models::note::Note,
};

/// Dados que o serviço de extração leu da foto da promissória.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct ExtractedData {
    #[serde(default)]
    pub nome_cliente: Option<String>,
    #[serde(default, deserialize_with = "tolerant::date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub data_vencimento: Option<NaiveDate>,
    #[serde(default, deserialize_with = "tolerant::decimal")]
    #[schema(value_type = Option<f64>)]
    pub valor: Option<Decimal>,
    #[serde(default)]
    pub cpf: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CandidateCustomer {
    #[serde(default, deserialize_with = "tolerant::id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
}

// `data` das respostas de importar/extrair
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExtraction {
    #[serde(default)]
    pub dados_extraidos: ExtractedData,
    #[serde(default)]
    pub clientes_candidatos: Vec<CandidateCustomer>,
}

/// Arquivo de imagem recebido do navegador, repassado como está.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Resultado de "importar foto".
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// A promissória foi criada.
    Importada { promissoria: Option<Note> },
    /// A API não soube a qual cliente associar: o operador escolhe entre os
    /// candidatos (ou cadastra um novo quando a lista vem vazia).
    SelecionarCliente {
        #[serde(rename = "dadosExtraidos")]
        dados_extraidos: ExtractedData,
        candidatos: Vec<CandidateCustomer>,
    },
}

/// Resultado de "extrair e revisar": pré-preenche o formulário.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionPrefill {
    pub dados_extraidos: ExtractedData,
    // Primeiro candidato, se houver
    pub cliente_id: Option<i64>,
    // Já mascarado para o campo de valor ("R$ 1.500,00")
    #[schema(example = "R$ 1.500,00")]
    pub valor: String,
    #[schema(example = "2024-12-31")]
    pub data_vencimento: String,
    pub observacoes: String,
    pub candidatos: Vec<CandidateCustomer>,
}

impl From<RawExtraction> for ExtractionPrefill {
    fn from(raw: RawExtraction) -> Self {
        let dados = raw.dados_extraidos;

        let valor = match dados.valor {
            Some(valor) => mask_money(money_to_input(Some(valor)).as_str()),
            None => String::new(),
        };
        let observacoes = dados
            .nome_cliente
            .as_deref()
            .map(str::trim)
            .filter(|nome| !nome.is_empty())
            .map(|nome| format!("Importado de imagem - Cliente: {nome}"))
            .unwrap_or_default();

        ExtractionPrefill {
            cliente_id: raw.clientes_candidatos.first().and_then(|c| c.id),
            valor,
            data_vencimento: dados.data_vencimento.map(|d| d.to_string()).unwrap_or_default(),
            observacoes,
            candidatos: raw.clientes_candidatos,
            dados_extraidos: dados,
        }
    }
}
