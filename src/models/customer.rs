// src/models/customer.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::{masks::mask_phone, tolerant};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    #[schema(example = "Rua das Flores")]
    pub rua: Option<String>,
    #[schema(example = "123")]
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    #[schema(example = "SP")]
    pub estado: Option<String>,
    pub complemento: Option<String>,
}

impl Address {
    /// Campos em branco viram `null`, como o formulário sempre fez.
    pub fn blank_to_none(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Address {
            rua: clean(self.rua),
            numero: clean(self.numero),
            bairro: clean(self.bairro),
            cidade: clean(self.cidade),
            estado: clean(self.estado),
            complemento: clean(self.complemento),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Address::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default, deserialize_with = "tolerant::id")]
    pub id: Option<i64>,
    #[serde(default)]
    #[schema(example = "Maria da Silva")]
    pub nome: String,
    #[serde(default)]
    pub email: Option<String>,

    // Só dígitos
    #[serde(default)]
    #[schema(example = "11987654321")]
    pub telefone: Option<String>,
    #[serde(default)]
    #[schema(example = "12345678900")]
    pub cpf: Option<String>,

    #[serde(default)]
    pub endereco: Option<Address>,

    #[serde(default, skip_deserializing)]
    #[schema(example = "(11) 98765-4321")]
    pub telefone_formatado: String,
}

impl Customer {
    pub fn with_display_fields(mut self) -> Self {
        self.telefone_formatado = mask_phone(self.telefone.as_deref().unwrap_or_default());
        // A API às vezes manda `endereco: {}`
        self.endereco = self
            .endereco
            .map(Address::blank_to_none)
            .filter(|address| !address.is_empty());
        self
    }
}

/// Corpo de criação/edição enviado à API remota.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerUpsert {
    pub nome: String,
    pub cpf: String,
    pub email: String,
    pub telefone: Option<String>,

    // Ausente: não mexe. `Some(None)`: remove. `Some(Some(..))`: grava.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endereco: Option<Option<Address>>,
}
