// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, Month, OffsetDateTime, Time};
use vetclinic_app::{
    Client, ClientId, ClinicDirectory, ClinicalHistoryRecord, DirectoryError, DirectoryRequest,
    HistoryId, NewClient, NewClinicalHistory, Pet, PetId, PetPayload, format_transmitted_date,
};

const FIRST_NAMES: [&str; 14] = [
    "ANA", "LUIS", "CAMILA", "ANDRES", "VALENTINA", "JORGE", "SOFIA", "DIEGO", "PAULA", "MATEO",
    "LAURA", "SANTIAGO", "DANIELA", "FELIPE",
];
const SECOND_NAMES: [&str; 8] = [
    "", "MARIA", "JOSE", "ISABEL", "ALBERTO", "", "LUCIA", "",
];
const LAST_NAMES: [&str; 14] = [
    "PEREZ", "GOMEZ", "RODRIGUEZ", "MARTINEZ", "LOPEZ", "GARCIA", "HERNANDEZ", "TORRES",
    "RAMIREZ", "DIAZ", "MORENO", "ROJAS", "VARGAS", "CASTRO",
];
const CITIES: [&str; 8] = [
    "BOGOTA",
    "MEDELLIN",
    "CALI",
    "BARRANQUILLA",
    "BUCARAMANGA",
    "PEREIRA",
    "MANIZALES",
    "PASTO",
];
const STREET_KINDS: [&str; 4] = ["CALLE", "CARRERA", "AVENIDA", "DIAGONAL"];

const PET_NAMES: [&str; 14] = [
    "LUNA", "MAX", "ROCKY", "KIRA", "TOBY", "MIA", "SIMBA", "NALA", "COCO", "BRUNO", "LOLA",
    "THOR", "CANELA", "ZEUS",
];
const SPECIES_BREEDS: [(&str, &[&str]); 3] = [
    (
        "CANINO",
        &["LABRADOR", "CRIOLLO", "BULLDOG", "BEAGLE", "PASTOR ALEMAN"],
    ),
    ("FELINO", &["SIAMES", "PERSA", "CRIOLLO", "BENGALI"]),
    ("AVE", &["CANARIO", "PERICO"]),
];
const SEXES: [&str; 2] = ["MACHO", "HEMBRA"];

const REASONS: [&str; 8] = [
    "VACUNACION ANUAL",
    "CONTROL GENERAL",
    "VOMITO Y DIARREA",
    "COJERA PATA TRASERA",
    "OTITIS",
    "DESPARASITACION",
    "CAIDA DE PELO",
    "ESTERILIZACION",
];
const DIAGNOSES: [&str; 6] = [
    "PACIENTE SANO",
    "GASTROENTERITIS",
    "DERMATITIS ALERGICA",
    "ESGUINCE LEVE",
    "OTITIS EXTERNA",
    "PARASITOS INTESTINALES",
];
const PROCEDURES: [&str; 5] = [
    "EXAMEN FISICO",
    "APLICACION DE VACUNA",
    "LIMPIEZA DE OIDOS",
    "RADIOGRAFIA",
    "TOMA DE MUESTRAS",
];
const TREATMENTS: [&str; 5] = [
    "REPOSO",
    "ANTIBIOTICO SIETE DIAS",
    "DIETA BLANDA",
    "ANTIINFLAMATORIO",
    "NINGUNO",
];
const FORMULAS: [&str; 4] = [
    "AMOXICILINA CADA DOCE HORAS",
    "MELOXICAM UNA VEZ AL DIA",
    "NO REQUIERE",
    "OMEPRAZOL EN AYUNAS",
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic generator for demo clients, pets, and consultations.
#[derive(Debug, Clone)]
pub struct ClinicFaker {
    rng: DeterministicRng,
}

impl ClinicFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn client(&mut self) -> NewClient {
        let birth = self.date_between(1950, 2005);
        NewClient {
            type_document: "CC".to_owned(),
            number_document: format!("{}", self.int_range(10_000_000, 1_999_999_999)),
            date_birth: format_transmitted_date(birth),
            first_name: self.pick(&FIRST_NAMES).to_owned(),
            second_name: self.pick(&SECOND_NAMES).to_owned(),
            first_last_name: self.pick(&LAST_NAMES).to_owned(),
            second_last_name: self.pick(&LAST_NAMES).to_owned(),
            location_residence: self.pick(&CITIES).to_owned(),
            address_residence: format!(
                "{} {} # {}-{}",
                self.pick(&STREET_KINDS),
                self.int_range(1, 180),
                self.int_range(1, 99),
                self.int_range(1, 99),
            ),
            phone_movil: format!("3{:09}", self.int_range(0, 999_999_999)),
        }
    }

    pub fn pet(&mut self, client_id: ClientId) -> PetPayload {
        let (species, breeds) = SPECIES_BREEDS[self.rng.int_n(SPECIES_BREEDS.len())];
        let birth = self.date_between(2012, REFERENCE_YEAR - 1);
        PetPayload {
            id: None,
            nombre: self.pick(&PET_NAMES).to_owned(),
            especie: species.to_owned(),
            sexo: self.pick(&SEXES).to_owned(),
            fecha_nacimiento: format_transmitted_date(birth),
            raza: self.pick(breeds).to_owned(),
            codigo_collar: format!("COL {:04}", self.int_range(0, 9999)),
            cliente: vetclinic_app::EntityRef { id: client_id },
        }
    }

    pub fn history(&mut self, pet_id: PetId) -> NewClinicalHistory {
        NewClinicalHistory {
            motivo_consulta: self.pick(&REASONS).to_owned(),
            diagnostico: self.pick(&DIAGNOSES).to_owned(),
            procedimiento: self.pick(&PROCEDURES).to_owned(),
            tratamiento: self.pick(&TREATMENTS).to_owned(),
            observacion: "PACIENTE ESTABLE".to_owned(),
            formula: self.pick(&FORMULAS).to_owned(),
            mascota: vetclinic_app::EntityRef { id: pet_id },
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + self.rng.next_u64() % (max - min + 1)
    }

    fn date_between(&mut self, first_year: i32, last_year: i32) -> Date {
        let start = midnight_utc(first_year, Month::January, 1);
        let end = midnight_utc(last_year, Month::December, 31);
        let span_days = (end - start).whole_days().max(0) as u64;
        let offset = self.int_range(0, span_days) as i64;
        (start + Duration::days(offset)).date()
    }
}

/// In-memory directory used by tests and `--demo`. Every call is logged, and
/// queued failures are returned before touching the data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    clients: Vec<Client>,
    pets: Vec<(ClientId, Pet)>,
    histories: Vec<(PetId, ClinicalHistoryRecord)>,
    calls: Vec<DirectoryRequest>,
    failures: VecDeque<DirectoryError>,
    next_id: u64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory with `clients` demo owners, each with one to three pets and
    /// a few consultations per pet.
    pub fn seeded(seed: u64, clients: usize) -> Self {
        let mut faker = ClinicFaker::new(seed);
        let mut directory = Self::new();
        for _ in 0..clients {
            let client_id = directory.insert_client(faker.client()).id;
            let pet_count = 1 + faker.rng.int_n(3);
            for _ in 0..pet_count {
                let pet_id = directory.insert_pet(faker.pet(client_id.clone())).id;
                let history_count = faker.rng.int_n(4);
                for day in 0..history_count {
                    let created_at = fixture_created_at(day as i64 * 30);
                    directory.insert_history(faker.history(pet_id.clone()), &created_at);
                }
            }
        }
        directory
    }

    pub fn insert_client(&mut self, client: NewClient) -> Client {
        let stored = Client {
            id: ClientId::new(self.allocate("c")),
            type_document: client.type_document,
            number_document: client.number_document,
            date_birth: client.date_birth,
            first_name: client.first_name,
            second_name: client.second_name,
            first_last_name: client.first_last_name,
            second_last_name: client.second_last_name,
            location_residence: client.location_residence,
            address_residence: client.address_residence,
            phone_movil: client.phone_movil,
        };
        self.clients.push(stored.clone());
        stored
    }

    pub fn insert_pet(&mut self, pet: PetPayload) -> Pet {
        let stored = Pet {
            id: PetId::new(self.allocate("p")),
            ..pet_from_payload(&pet)
        };
        self.pets.push((pet.cliente.id, stored.clone()));
        stored
    }

    pub fn insert_history(
        &mut self,
        history: NewClinicalHistory,
        created_at: &str,
    ) -> ClinicalHistoryRecord {
        let stored = ClinicalHistoryRecord {
            id: HistoryId::new(self.allocate("h")),
            motivo_consulta: history.motivo_consulta,
            diagnostico: history.diagnostico,
            procedimiento: history.procedimiento,
            tratamiento: history.tratamiento,
            observacion: history.observacion,
            formula: history.formula,
            created_at: created_at.to_owned(),
            mascota: Some(history.mascota.clone()),
        };
        self.histories.push((history.mascota.id, stored.clone()));
        stored
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn pets_of(&self, client_id: &ClientId) -> Vec<Pet> {
        self.pets
            .iter()
            .filter(|(owner, _)| owner == client_id)
            .map(|(_, pet)| pet.clone())
            .collect()
    }

    pub fn histories_of(&self, pet_id: &PetId) -> Vec<ClinicalHistoryRecord> {
        self.histories
            .iter()
            .filter(|(pet, _)| pet == pet_id)
            .map(|(_, history)| history.clone())
            .collect()
    }

    /// Every request received, in order.
    pub fn calls(&self) -> &[DirectoryRequest] {
        &self.calls
    }

    pub fn calls_labeled(&self, label: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| call.label() == label)
            .count()
    }

    /// The next call fails with `error` instead of touching the data.
    pub fn fail_next(&mut self, error: DirectoryError) {
        self.failures.push_back(error);
    }

    fn allocate(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn record(&mut self, request: DirectoryRequest) -> Result<(), DirectoryError> {
        self.calls.push(request);
        match self.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl ClinicDirectory for MemoryDirectory {
    fn find_client(&mut self, document_number: &str) -> Result<Option<Client>, DirectoryError> {
        self.record(DirectoryRequest::FindClient {
            document_number: document_number.to_owned(),
        })?;
        Ok(self
            .clients
            .iter()
            .find(|client| client.number_document == document_number)
            .cloned())
    }

    fn create_client(&mut self, client: &NewClient) -> Result<Option<Client>, DirectoryError> {
        self.record(DirectoryRequest::CreateClient(client.clone()))?;
        Ok(Some(self.insert_client(client.clone())))
    }

    fn list_pets(&mut self, client_id: &ClientId) -> Result<Vec<Pet>, DirectoryError> {
        self.record(DirectoryRequest::ListPets {
            client_id: client_id.clone(),
        })?;
        Ok(self.pets_of(client_id))
    }

    fn create_pet(&mut self, pet: &PetPayload) -> Result<(), DirectoryError> {
        self.record(DirectoryRequest::CreatePet(pet.clone()))?;
        self.insert_pet(pet.clone());
        Ok(())
    }

    fn update_pet(&mut self, pet_id: &PetId, pet: &PetPayload) -> Result<(), DirectoryError> {
        self.record(DirectoryRequest::UpdatePet {
            pet_id: pet_id.clone(),
            payload: pet.clone(),
        })?;
        let Some(slot) = self.pets.iter_mut().find(|(_, stored)| &stored.id == pet_id) else {
            return Err(DirectoryError::Rejected {
                status: 404,
                message: "Mascota no encontrada".to_owned(),
            });
        };
        *slot = (
            pet.cliente.id.clone(),
            Pet {
                id: pet_id.clone(),
                ..pet_from_payload(pet)
            },
        );
        Ok(())
    }

    fn delete_pet(&mut self, pet_id: &PetId) -> Result<(), DirectoryError> {
        self.record(DirectoryRequest::DeletePet {
            pet_id: pet_id.clone(),
        })?;
        self.pets.retain(|(_, stored)| &stored.id != pet_id);
        self.histories.retain(|(pet, _)| pet != pet_id);
        Ok(())
    }

    fn list_histories(
        &mut self,
        pet_id: &PetId,
    ) -> Result<Vec<ClinicalHistoryRecord>, DirectoryError> {
        self.record(DirectoryRequest::ListHistories {
            pet_id: pet_id.clone(),
        })?;
        Ok(self.histories_of(pet_id))
    }

    fn create_history(&mut self, history: &NewClinicalHistory) -> Result<(), DirectoryError> {
        self.record(DirectoryRequest::CreateHistory(history.clone()))?;
        self.insert_history(history.clone(), fixture_datetime());
        Ok(())
    }
}

fn pet_from_payload(pet: &PetPayload) -> Pet {
    Pet {
        id: pet.id.clone().unwrap_or_default(),
        nombre: pet.nombre.clone(),
        especie: pet.especie.clone(),
        sexo: pet.sexo.clone(),
        fecha_nacimiento: pet.fecha_nacimiento.clone(),
        raza: pet.raza.clone(),
        codigo_collar: pet.codigo_collar.clone(),
        cliente: Some(pet.cliente.clone()),
    }
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let config_path = dir.path().join("config.toml");
    Ok((dir, config_path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

fn fixture_created_at(days_before: i64) -> String {
    let at = midnight_utc(REFERENCE_YEAR, Month::February, 19) - Duration::days(days_before);
    at.format(&Rfc3339)
        .unwrap_or_else(|_| fixture_datetime().to_owned())
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    let date = Date::from_calendar_date(year, month, day).unwrap_or(Date::MIN);
    date.with_time(Time::MIDNIGHT).assume_utc()
}

#[cfg(test)]
mod tests {
    use super::{ClinicFaker, MemoryDirectory};
    use vetclinic_app::{ClientId, ClinicDirectory, DirectoryError, PetId};

    #[test]
    fn faker_is_deterministic() {
        let mut left = ClinicFaker::new(42);
        let mut right = ClinicFaker::new(42);
        assert_eq!(left.client(), right.client());
    }

    #[test]
    fn faker_values_pass_field_rules() {
        let mut faker = ClinicFaker::new(7);
        for _ in 0..20 {
            let client = faker.client();
            assert_eq!(client.phone_movil.len(), 10);
            assert!(client.number_document.chars().all(|ch| ch.is_ascii_digit()));
            assert_eq!(client.date_birth.len(), 10);
            let pet = faker.pet(ClientId::new("c1"));
            assert!(!pet.nombre.is_empty());
            assert!(!pet.raza.is_empty());
        }
    }

    #[test]
    fn seeded_directory_links_pets_and_histories() {
        let directory = MemoryDirectory::seeded(3, 4);
        assert_eq!(directory.clients().len(), 4);
        for client in directory.clients() {
            let pets = directory.pets_of(&client.id);
            assert!((1..=3).contains(&pets.len()));
        }
        assert!(directory.calls().is_empty());
    }

    #[test]
    fn lookup_matches_document_number() {
        let mut directory = MemoryDirectory::seeded(5, 2);
        let document = directory.clients()[1].number_document.clone();
        let found = directory.find_client(&document).expect("lookup");
        assert_eq!(found.map(|client| client.number_document), Some(document));
        assert_eq!(directory.find_client("000").expect("lookup"), None);
        assert_eq!(directory.calls_labeled("find client"), 2);
    }

    #[test]
    fn queued_failure_is_returned_once() {
        let mut directory = MemoryDirectory::new();
        directory.fail_next(DirectoryError::Transport("down".to_owned()));
        assert!(directory.list_pets(&ClientId::new("c1")).is_err());
        assert!(directory.list_pets(&ClientId::new("c1")).is_ok());
        assert_eq!(directory.calls().len(), 2);
    }

    #[test]
    fn delete_drops_pet_and_its_histories() {
        let mut directory = MemoryDirectory::seeded(9, 1);
        let client_id = directory.clients()[0].id.clone();
        let pet_id: PetId = directory.pets_of(&client_id)[0].id.clone();
        directory.delete_pet(&pet_id).expect("delete");
        assert!(directory.histories_of(&pet_id).is_empty());
        assert!(directory.pets_of(&client_id).iter().all(|pet| pet.id != pet_id));
    }
}
