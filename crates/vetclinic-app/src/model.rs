// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenKind {
    CreateClient,
    CreatePet,
    CreateHistory,
    QueryHistory,
}

impl ScreenKind {
    pub const ALL: [Self; 4] = [
        Self::CreateClient,
        Self::CreatePet,
        Self::CreateHistory,
        Self::QueryHistory,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateClient => "create-client",
            Self::CreatePet => "create-pet",
            Self::CreateHistory => "create-history",
            Self::QueryHistory => "query-history",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create-client" => Some(Self::CreateClient),
            "create-pet" => Some(Self::CreatePet),
            "create-history" => Some(Self::CreateHistory),
            "query-history" => Some(Self::QueryHistory),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CreateClient => "Crear Cliente",
            Self::CreatePet => "Crear Mascota",
            Self::CreateHistory => "Crear Historia Clínica",
            Self::QueryHistory => "Consultar Historia Clínica",
        }
    }
}

// Text columns come back from the service as strings, numbers, or null.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawText>::deserialize(deserializer)?;
    Ok(match raw {
        None => String::new(),
        Some(RawText::Text(text)) => text,
        Some(RawText::Int(value)) => value.to_string(),
        Some(RawText::Float(value)) => value.to_string(),
        Some(RawText::Bool(value)) => value.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    pub id: ClientId,
    #[serde(deserialize_with = "lenient_text")]
    pub type_document: String,
    #[serde(deserialize_with = "lenient_text")]
    pub number_document: String,
    #[serde(deserialize_with = "lenient_text")]
    pub date_birth: String,
    #[serde(deserialize_with = "lenient_text")]
    pub first_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub second_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub first_last_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub second_last_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub location_residence: String,
    #[serde(deserialize_with = "lenient_text")]
    pub address_residence: String,
    #[serde(deserialize_with = "lenient_text")]
    pub phone_movil: String,
}

impl Client {
    pub fn full_name(&self) -> String {
        [
            self.first_name.as_str(),
            self.second_name.as_str(),
            self.first_last_name.as_str(),
            self.second_last_name.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pet {
    pub id: PetId,
    #[serde(deserialize_with = "lenient_text")]
    pub nombre: String,
    #[serde(deserialize_with = "lenient_text")]
    pub especie: String,
    #[serde(deserialize_with = "lenient_text")]
    pub sexo: String,
    #[serde(deserialize_with = "lenient_text")]
    pub fecha_nacimiento: String,
    #[serde(deserialize_with = "lenient_text")]
    pub raza: String,
    #[serde(deserialize_with = "lenient_text")]
    pub codigo_collar: String,
    /// Owner reference, when the service echoes it back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliente: Option<EntityRef<ClientId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicalHistoryRecord {
    pub id: HistoryId,
    #[serde(deserialize_with = "lenient_text")]
    pub motivo_consulta: String,
    #[serde(deserialize_with = "lenient_text")]
    pub diagnostico: String,
    #[serde(deserialize_with = "lenient_text")]
    pub procedimiento: String,
    #[serde(deserialize_with = "lenient_text")]
    pub tratamiento: String,
    #[serde(deserialize_with = "lenient_text")]
    pub observacion: String,
    #[serde(deserialize_with = "lenient_text")]
    pub formula: String,
    #[serde(deserialize_with = "lenient_text")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mascota: Option<EntityRef<PetId>>,
}

/// Parent reference embedded in create/update bodies; carries only the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef<T> {
    pub id: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub type_document: String,
    pub number_document: String,
    pub date_birth: String,
    pub first_name: String,
    pub second_name: String,
    pub first_last_name: String,
    pub second_last_name: String,
    pub location_residence: String,
    pub address_residence: String,
    pub phone_movil: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PetId>,
    pub nombre: String,
    pub especie: String,
    pub sexo: String,
    pub fecha_nacimiento: String,
    pub raza: String,
    pub codigo_collar: String,
    pub cliente: EntityRef<ClientId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClinicalHistory {
    pub motivo_consulta: String,
    pub diagnostico: String,
    pub procedimiento: String,
    pub tratamiento: String,
    pub observacion: String,
    pub formula: String,
    pub mascota: EntityRef<PetId>,
}
