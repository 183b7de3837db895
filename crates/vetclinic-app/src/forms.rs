// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::marker::PhantomData;

use crate::{
    ClientId, EntityRef, FieldPolicy, KeyOutcome, NewClient, NewClinicalHistory, PHONE_DIGITS,
    Pet, PetId, PetPayload, Prompt, picker_value_from_service, to_transmission_date,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub label: &'static str,
    pub policy: FieldPolicy,
    pub required: bool,
}

const fn field(label: &'static str, policy: FieldPolicy, required: bool) -> FieldSpec {
    FieldSpec {
        label,
        policy,
        required,
    }
}

/// A form's field identifiers, declared in display order.
pub trait FieldKey: Copy + Eq + std::fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn spec(self) -> FieldSpec;

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|key| *key == self)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientField {
    DocumentType,
    DocumentNumber,
    BirthDate,
    FirstName,
    SecondName,
    FirstLastName,
    SecondLastName,
    Residence,
    Address,
    Phone,
}

impl FieldKey for ClientField {
    const ALL: &'static [Self] = &[
        Self::DocumentType,
        Self::DocumentNumber,
        Self::BirthDate,
        Self::FirstName,
        Self::SecondName,
        Self::FirstLastName,
        Self::SecondLastName,
        Self::Residence,
        Self::Address,
        Self::Phone,
    ];

    fn spec(self) -> FieldSpec {
        match self {
            Self::DocumentType => field("Tipo Documento", FieldPolicy::UpperLetters, true),
            Self::DocumentNumber => field("Numero Documento", FieldPolicy::DigitKeys, true),
            Self::BirthDate => field("Fecha Nacimiento", FieldPolicy::Date, true),
            Self::FirstName => field("Primer Nombre", FieldPolicy::UpperWords, true),
            Self::SecondName => field("Segundo Nombre", FieldPolicy::UpperWords, false),
            Self::FirstLastName => field("Primer Apellido", FieldPolicy::UpperWords, true),
            Self::SecondLastName => field("Segundo Apellido", FieldPolicy::UpperWords, false),
            Self::Residence => field("Lugar Residencia", FieldPolicy::UpperWords, true),
            Self::Address => field("Direccion", FieldPolicy::Upper, true),
            Self::Phone => field(
                "Telefono",
                FieldPolicy::Digits {
                    max: Some(PHONE_DIGITS),
                },
                true,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetField {
    Name,
    Species,
    Sex,
    BirthDate,
    Breed,
    CollarCode,
}

impl FieldKey for PetField {
    const ALL: &'static [Self] = &[
        Self::Name,
        Self::Species,
        Self::Sex,
        Self::BirthDate,
        Self::Breed,
        Self::CollarCode,
    ];

    fn spec(self) -> FieldSpec {
        match self {
            Self::Name => field("Nombre Mascota", FieldPolicy::UpperWords, true),
            Self::Species => field("Especie de la Mascota", FieldPolicy::UpperWords, true),
            Self::Sex => field("Sexo de la Mascota", FieldPolicy::UpperWords, true),
            Self::BirthDate => field("Fecha de Nacimiento", FieldPolicy::Date, false),
            Self::Breed => field("Raza de la Mascota", FieldPolicy::UpperWords, true),
            Self::CollarCode => field("Codigo Collar", FieldPolicy::UpperAlnumWords, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryField {
    Reason,
    Diagnosis,
    Procedure,
    Treatment,
    Observation,
    Formula,
}

impl FieldKey for HistoryField {
    const ALL: &'static [Self] = &[
        Self::Reason,
        Self::Diagnosis,
        Self::Procedure,
        Self::Treatment,
        Self::Observation,
        Self::Formula,
    ];

    fn spec(self) -> FieldSpec {
        match self {
            Self::Reason => field("Motivo de Consulta", FieldPolicy::UpperWords, true),
            Self::Diagnosis => field("Diagnóstico", FieldPolicy::UpperWords, true),
            Self::Procedure => field("Procedimiento", FieldPolicy::UpperWords, true),
            Self::Treatment => field("Tratamiento", FieldPolicy::UpperWords, true),
            Self::Observation => field("Observación", FieldPolicy::UpperWords, true),
            Self::Formula => field("Fórmula", FieldPolicy::UpperWords, true),
        }
    }
}

/// Editable values for one form, normalized on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet<K: FieldKey> {
    values: Vec<String>,
    _keys: PhantomData<K>,
}

impl<K: FieldKey> Default for FieldSet<K> {
    fn default() -> Self {
        Self {
            values: vec![String::new(); K::ALL.len()],
            _keys: PhantomData,
        }
    }
}

impl<K: FieldKey> FieldSet<K> {
    pub fn get(&self, key: K) -> &str {
        self.values
            .get(key.index())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Replaces a value wholesale (paste, picker, pre-fill), through the policy.
    pub fn set(&mut self, key: K, raw: &str) {
        let normalized = key.spec().policy.apply(raw);
        if let Some(value) = self.values.get_mut(key.index()) {
            *value = normalized;
        }
    }

    pub fn push_key(&mut self, key: K, ch: char) -> KeyOutcome {
        let policy = key.spec().policy;
        match self.values.get_mut(key.index()) {
            Some(value) => policy.push_key(value, ch),
            None => KeyOutcome::Rejected,
        }
    }

    pub fn backspace(&mut self, key: K) {
        if let Some(value) = self.values.get_mut(key.index()) {
            value.pop();
        }
    }

    pub fn clear(&mut self) {
        for value in &mut self.values {
            value.clear();
        }
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|value| value.trim().is_empty())
    }

    pub fn first_missing_required(&self) -> Option<K> {
        K::ALL
            .iter()
            .copied()
            .find(|key| key.spec().required && self.get(*key).trim().is_empty())
    }

    /// Required-field check run before any request is built.
    pub fn check_required(&self) -> Result<(), Prompt> {
        match self.first_missing_required() {
            Some(key) => Err(Prompt::new(format!(
                "El campo {} es obligatorio.",
                key.spec().label
            ))),
            None => Ok(()),
        }
    }

    fn text(&self, key: K) -> String {
        self.get(key).trim().to_owned()
    }

    fn date(&self, key: K) -> Result<String, Prompt> {
        to_transmission_date(self.get(key)).map_err(|_| {
            Prompt::new(format!(
                "La fecha del campo {} no es válida.",
                key.spec().label
            ))
        })
    }
}

pub type ClientForm = FieldSet<ClientField>;
pub type PetForm = FieldSet<PetField>;
pub type HistoryForm = FieldSet<HistoryField>;

impl FieldSet<ClientField> {
    pub fn to_payload(&self) -> Result<NewClient, Prompt> {
        self.check_required()?;
        Ok(NewClient {
            type_document: self.text(ClientField::DocumentType),
            number_document: self.text(ClientField::DocumentNumber),
            date_birth: self.date(ClientField::BirthDate)?,
            first_name: self.text(ClientField::FirstName),
            second_name: self.text(ClientField::SecondName),
            first_last_name: self.text(ClientField::FirstLastName),
            second_last_name: self.text(ClientField::SecondLastName),
            location_residence: self.text(ClientField::Residence),
            address_residence: self.text(ClientField::Address),
            phone_movil: self.text(ClientField::Phone),
        })
    }
}

impl FieldSet<PetField> {
    pub fn load(&mut self, pet: &Pet) {
        self.set(PetField::Name, &pet.nombre);
        self.set(PetField::Species, &pet.especie);
        self.set(PetField::Sex, &pet.sexo);
        self.set(
            PetField::BirthDate,
            &picker_value_from_service(&pet.fecha_nacimiento),
        );
        self.set(PetField::Breed, &pet.raza);
        self.set(PetField::CollarCode, &pet.codigo_collar);
    }

    pub fn to_payload(
        &self,
        pet_id: Option<PetId>,
        client_id: ClientId,
    ) -> Result<PetPayload, Prompt> {
        self.check_required()?;
        Ok(PetPayload {
            id: pet_id,
            nombre: self.text(PetField::Name),
            especie: self.text(PetField::Species),
            sexo: self.text(PetField::Sex),
            fecha_nacimiento: self.date(PetField::BirthDate)?,
            raza: self.text(PetField::Breed),
            codigo_collar: self.text(PetField::CollarCode),
            cliente: EntityRef { id: client_id },
        })
    }
}

impl FieldSet<HistoryField> {
    pub fn to_payload(&self, pet_id: PetId) -> Result<NewClinicalHistory, Prompt> {
        self.check_required()?;
        Ok(NewClinicalHistory {
            motivo_consulta: self.text(HistoryField::Reason),
            diagnostico: self.text(HistoryField::Diagnosis),
            procedimiento: self.text(HistoryField::Procedure),
            tratamiento: self.text(HistoryField::Treatment),
            observacion: self.text(HistoryField::Observation),
            formula: self.text(HistoryField::Formula),
            mascota: EntityRef { id: pet_id },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientField, ClientForm, FieldKey, HistoryField, HistoryForm, PetField, PetForm};
    use crate::{ClientId, KeyOutcome, Pet, PetId};

    fn filled_client_form() -> ClientForm {
        let mut form = ClientForm::default();
        form.set(ClientField::DocumentType, "cc");
        form.set(ClientField::DocumentNumber, "123456789");
        form.set(ClientField::BirthDate, "1990-07-21");
        form.set(ClientField::FirstName, "ana");
        form.set(ClientField::FirstLastName, "perez");
        form.set(ClientField::Residence, "bogota");
        form.set(ClientField::Address, "calle 1 # 2-3");
        form.set(ClientField::Phone, "3001234567");
        form
    }

    #[test]
    fn field_keys_index_in_declaration_order() {
        for (position, key) in ClientField::ALL.iter().enumerate() {
            assert_eq!(key.index(), position);
        }
        assert_eq!(PetField::CollarCode.index(), 5);
    }

    #[test]
    fn client_payload_normalizes_and_reformats_date() {
        let payload = filled_client_form().to_payload().expect("complete form");
        assert_eq!(payload.type_document, "CC");
        assert_eq!(payload.first_name, "ANA");
        assert_eq!(payload.date_birth, "21/07/1990");
        assert_eq!(payload.address_residence, "CALLE 1 # 2-3");
        assert_eq!(payload.second_name, "");
    }

    #[test]
    fn missing_required_field_is_named_in_prompt() {
        let mut form = filled_client_form();
        form.set(ClientField::FirstName, "");
        let prompt = form.to_payload().expect_err("first name is required");
        assert!(prompt.text().contains("Primer Nombre"));
    }

    #[test]
    fn typing_goes_through_the_field_policy() {
        let mut form = ClientForm::default();
        for ch in "abc12345678901".chars() {
            let _ = form.push_key(ClientField::Phone, ch);
        }
        assert_eq!(form.get(ClientField::Phone), "1234567890");
        assert_eq!(
            form.push_key(ClientField::DocumentNumber, 'x'),
            KeyOutcome::Rejected
        );
        form.backspace(ClientField::Phone);
        assert_eq!(form.get(ClientField::Phone), "123456789");
    }

    #[test]
    fn pet_form_loads_existing_pet() {
        let mut form = PetForm::default();
        form.load(&Pet {
            id: PetId::new("p1"),
            nombre: "LUNA".to_owned(),
            especie: "CANINO".to_owned(),
            sexo: "HEMBRA".to_owned(),
            fecha_nacimiento: "05/03/2024".to_owned(),
            raza: "MESTIZO".to_owned(),
            codigo_collar: "AB 12".to_owned(),
            cliente: None,
        });
        assert_eq!(form.get(PetField::BirthDate), "2024-03-05");

        let payload = form
            .to_payload(Some(PetId::new("p1")), ClientId::new("c1"))
            .expect("complete pet form");
        assert_eq!(payload.fecha_nacimiento, "05/03/2024");
        assert_eq!(payload.cliente.id, ClientId::new("c1"));
        assert_eq!(payload.id, Some(PetId::new("p1")));
    }

    #[test]
    fn history_form_clears_every_field() {
        let mut form = HistoryForm::default();
        form.set(HistoryField::Reason, "vacuna");
        assert!(!form.is_blank());
        form.clear();
        assert!(form.is_blank());
    }
}
