// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Client -> pets -> histories lookup shared by the pet and history screens.

use tracing::{debug, warn};

use crate::{
    Client, ClientId, ClinicalHistoryRecord, DirectoryError, DirectoryOutcome, DirectoryRequest,
    DirectoryResponse, FieldPolicy, KeyOutcome, Pet, PetId, Prompt, ScreenMessage,
};

pub const CLIENT_NOT_FOUND: &str = "Cliente no encontrado.";
pub const DOCUMENT_REQUIRED: &str = "Por favor, ingrese la cédula del cliente.";
pub const NO_HISTORIES: &str = "No se encontraron historias clínicas para esta mascota.";

/// What selecting a pet triggers on the owning screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetSelectionEffect {
    FetchHistories,
    LoadEditForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupCascade {
    effect: PetSelectionEffect,
    document_number: String,
    active_client: Option<Client>,
    pets: Vec<Pet>,
    selected_pet: Option<PetId>,
    histories: Vec<ClinicalHistoryRecord>,
    histories_loaded: bool,
    pub message: Option<ScreenMessage>,
}

impl LookupCascade {
    pub fn new(effect: PetSelectionEffect) -> Self {
        Self {
            effect,
            document_number: String::new(),
            active_client: None,
            pets: Vec::new(),
            selected_pet: None,
            histories: Vec::new(),
            histories_loaded: false,
            message: None,
        }
    }

    pub fn effect(&self) -> PetSelectionEffect {
        self.effect
    }

    pub fn document_number(&self) -> &str {
        &self.document_number
    }

    pub fn push_document_key(&mut self, ch: char) -> KeyOutcome {
        FieldPolicy::DigitKeys.push_key(&mut self.document_number, ch)
    }

    pub fn backspace_document(&mut self) {
        self.document_number.pop();
    }

    pub fn set_document_number(&mut self, raw: &str) {
        self.document_number = FieldPolicy::DigitKeys.apply(raw);
    }

    pub fn active_client(&self) -> Option<&Client> {
        self.active_client.as_ref()
    }

    pub fn pets(&self) -> &[Pet] {
        &self.pets
    }

    pub fn selected_pet_id(&self) -> Option<&PetId> {
        self.selected_pet.as_ref()
    }

    pub fn selected_pet(&self) -> Option<&Pet> {
        let selected = self.selected_pet.as_ref()?;
        self.pets.iter().find(|pet| &pet.id == selected)
    }

    pub fn is_selected(&self, pet_id: &PetId) -> bool {
        self.selected_pet.as_ref() == Some(pet_id)
    }

    pub fn histories(&self) -> &[ClinicalHistoryRecord] {
        &self.histories
    }

    pub fn histories_loaded(&self) -> bool {
        self.histories_loaded
    }

    pub fn client_heading(&self) -> Option<String> {
        self.active_client
            .as_ref()
            .map(|client| format!("Cliente: {}", client.full_name()))
    }

    /// Builds the lookup for the typed document number.
    pub fn lookup_request(&self) -> Result<DirectoryRequest, Prompt> {
        let document_number = self.document_number.trim();
        if document_number.is_empty() {
            return Err(Prompt::new(DOCUMENT_REQUIRED));
        }
        Ok(DirectoryRequest::FindClient {
            document_number: document_number.to_owned(),
        })
    }

    pub fn apply_lookup(&mut self, outcome: DirectoryOutcome) -> Vec<DirectoryRequest> {
        match outcome {
            Ok(DirectoryResponse::Client(Some(client))) if client.id.is_assigned() => {
                self.message = None;
                self.set_active_client(Some(client))
            }
            Ok(DirectoryResponse::Client(_)) => {
                self.set_active_client(None);
                self.message = Some(ScreenMessage::error(CLIENT_NOT_FOUND));
                Vec::new()
            }
            Err(error) if error.is_not_found() => {
                self.set_active_client(None);
                self.message = Some(ScreenMessage::error(CLIENT_NOT_FOUND));
                Vec::new()
            }
            Err(error) => {
                self.set_active_client(None);
                self.message = Some(ScreenMessage::error(lookup_failure_text(&error)));
                Vec::new()
            }
            Ok(other) => {
                warn!(?other, "unexpected response to client lookup");
                Vec::new()
            }
        }
    }

    /// Changing the active client always drops the pet selection and every
    /// dependent list, then fetches the new client's pets.
    pub fn set_active_client(&mut self, client: Option<Client>) -> Vec<DirectoryRequest> {
        self.active_client = client;
        self.pets.clear();
        self.clear_selection();
        match &self.active_client {
            Some(client) => {
                debug!(client_id = %client.id, "active client changed");
                vec![DirectoryRequest::ListPets {
                    client_id: client.id.clone(),
                }]
            }
            None => Vec::new(),
        }
    }

    pub fn refresh_pets(&self) -> Option<DirectoryRequest> {
        self.active_client
            .as_ref()
            .map(|client| DirectoryRequest::ListPets {
                client_id: client.id.clone(),
            })
    }

    pub fn apply_pets(&mut self, client_id: &ClientId, outcome: DirectoryOutcome) {
        if self.active_client.as_ref().map(|client| &client.id) != Some(client_id) {
            warn!(%client_id, "discarding pets for a client that is no longer active");
            return;
        }
        match outcome {
            Ok(DirectoryResponse::Pets(pets)) => {
                self.pets = pets;
                if let Some(selected) = &self.selected_pet
                    && !self.pets.iter().any(|pet| &pet.id == selected)
                {
                    self.clear_selection();
                }
            }
            Ok(other) => warn!(?other, "unexpected response to pet listing"),
            Err(error) => {
                self.pets.clear();
                self.clear_selection();
                self.message = Some(ScreenMessage::error(dependent_failure_text(
                    "Error al obtener las mascotas.",
                    &error,
                )));
            }
        }
    }

    /// Radio selection; returns the history fetch when this cascade shows
    /// histories.
    pub fn select_pet(&mut self, pet_id: &PetId) -> Vec<DirectoryRequest> {
        if !self.pets.iter().any(|pet| &pet.id == pet_id) {
            return Vec::new();
        }
        if self.is_selected(pet_id) && self.effect == PetSelectionEffect::FetchHistories {
            return Vec::new();
        }
        self.selected_pet = Some(pet_id.clone());
        self.histories.clear();
        self.histories_loaded = false;
        debug!(%pet_id, "pet selected");
        match self.effect {
            PetSelectionEffect::FetchHistories => vec![DirectoryRequest::ListHistories {
                pet_id: pet_id.clone(),
            }],
            PetSelectionEffect::LoadEditForm => Vec::new(),
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_pet = None;
        self.histories.clear();
        self.histories_loaded = false;
    }

    pub fn refresh_histories(&self) -> Option<DirectoryRequest> {
        if self.effect != PetSelectionEffect::FetchHistories {
            return None;
        }
        self.selected_pet
            .as_ref()
            .map(|pet_id| DirectoryRequest::ListHistories {
                pet_id: pet_id.clone(),
            })
    }

    pub fn apply_histories(&mut self, pet_id: &PetId, outcome: DirectoryOutcome) {
        if self.selected_pet.as_ref() != Some(pet_id) {
            warn!(%pet_id, "discarding histories for a pet that is no longer selected");
            return;
        }
        match outcome {
            Ok(DirectoryResponse::Histories(histories)) => {
                self.histories = histories;
                self.histories_loaded = true;
            }
            Ok(other) => warn!(?other, "unexpected response to history listing"),
            Err(error) => {
                self.histories.clear();
                self.histories_loaded = false;
                self.message = Some(ScreenMessage::error(dependent_failure_text(
                    "Error al obtener las historias clínicas.",
                    &error,
                )));
            }
        }
    }

    /// Drops a deleted pet locally, without refetching the list.
    pub fn remove_pet(&mut self, pet_id: &PetId) {
        self.pets.retain(|pet| &pet.id != pet_id);
        if self.is_selected(pet_id) {
            self.clear_selection();
        }
    }
}

fn lookup_failure_text(error: &DirectoryError) -> String {
    match error {
        DirectoryError::Rejected { message, .. } if !message.is_empty() => {
            format!("Error al buscar el cliente: {message}")
        }
        _ => "Error al buscar el cliente.".to_owned(),
    }
}

fn dependent_failure_text(base: &str, error: &DirectoryError) -> String {
    match error {
        DirectoryError::Rejected { message, .. } if !message.is_empty() => {
            format!("{} {message}", base)
        }
        _ => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{CLIENT_NOT_FOUND, DOCUMENT_REQUIRED, LookupCascade, PetSelectionEffect};
    use crate::{
        Client, ClientId, DirectoryError, DirectoryRequest, DirectoryResponse, KeyOutcome, Pet,
        PetId,
    };

    fn client(id: &str, first_name: &str) -> Client {
        Client {
            id: ClientId::new(id),
            first_name: first_name.to_owned(),
            ..Client::default()
        }
    }

    fn pet(id: &str, name: &str) -> Pet {
        Pet {
            id: PetId::new(id),
            nombre: name.to_owned(),
            ..Pet::default()
        }
    }

    fn cascade_with_pets(effect: PetSelectionEffect) -> LookupCascade {
        let mut cascade = LookupCascade::new(effect);
        cascade.set_active_client(Some(client("c1", "ANA")));
        cascade.apply_pets(
            &ClientId::new("c1"),
            Ok(DirectoryResponse::Pets(vec![pet("p1", "LUNA"), pet("p2", "SOL")])),
        );
        cascade
    }

    #[test]
    fn empty_document_number_prompts_without_request() {
        let cascade = LookupCascade::new(PetSelectionEffect::FetchHistories);
        let prompt = cascade.lookup_request().expect_err("blank lookup");
        assert_eq!(prompt.text(), DOCUMENT_REQUIRED);
    }

    #[test]
    fn document_field_rejects_letters() {
        let mut cascade = LookupCascade::new(PetSelectionEffect::FetchHistories);
        assert_eq!(cascade.push_document_key('1'), KeyOutcome::Accepted);
        assert_eq!(cascade.push_document_key('a'), KeyOutcome::Rejected);
        assert_eq!(cascade.document_number(), "1");
    }

    #[test]
    fn found_client_triggers_pet_fetch() {
        let mut cascade = LookupCascade::new(PetSelectionEffect::FetchHistories);
        let follow_up =
            cascade.apply_lookup(Ok(DirectoryResponse::Client(Some(client("c1", "ANA")))));
        assert_eq!(
            follow_up,
            vec![DirectoryRequest::ListPets {
                client_id: ClientId::new("c1")
            }]
        );
        assert_eq!(cascade.client_heading().as_deref(), Some("Cliente: ANA"));
        assert!(cascade.message.is_none());
    }

    #[test]
    fn client_without_id_counts_as_not_found() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::FetchHistories);
        let _ = cascade.select_pet(&PetId::new("p1"));

        let follow_up = cascade.apply_lookup(Ok(DirectoryResponse::Client(Some(client("", "X")))));
        assert!(follow_up.is_empty());
        assert!(cascade.active_client().is_none());
        assert!(cascade.pets().is_empty());
        assert!(cascade.selected_pet_id().is_none());
        assert_eq!(
            cascade.message.as_ref().map(|message| message.text.as_str()),
            Some(CLIENT_NOT_FOUND)
        );
    }

    #[test]
    fn transport_failure_clears_client_with_connection_message() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::FetchHistories);
        let _ = cascade.apply_lookup(Err(DirectoryError::Transport("refused".to_owned())));
        assert!(cascade.active_client().is_none());
        assert!(cascade.pets().is_empty());
        assert_eq!(
            cascade.message.as_ref().map(|message| message.text.as_str()),
            Some("Error al buscar el cliente.")
        );
    }

    #[test]
    fn selecting_a_pet_replaces_the_previous_selection() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::FetchHistories);

        let first = cascade.select_pet(&PetId::new("p1"));
        assert_eq!(
            first,
            vec![DirectoryRequest::ListHistories {
                pet_id: PetId::new("p1")
            }]
        );
        let _ = cascade.select_pet(&PetId::new("p2"));
        assert!(cascade.is_selected(&PetId::new("p2")));
        assert!(!cascade.is_selected(&PetId::new("p1")));
    }

    #[test]
    fn edit_effect_does_not_fetch_histories() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::LoadEditForm);
        assert!(cascade.select_pet(&PetId::new("p1")).is_empty());
        assert_eq!(
            cascade.selected_pet().map(|pet| pet.nombre.as_str()),
            Some("LUNA")
        );
    }

    #[test]
    fn unknown_pet_cannot_be_selected() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::FetchHistories);
        assert!(cascade.select_pet(&PetId::new("p9")).is_empty());
        assert!(cascade.selected_pet_id().is_none());
    }

    #[test]
    fn stale_pet_list_is_discarded() {
        let mut cascade = LookupCascade::new(PetSelectionEffect::FetchHistories);
        let _ = cascade.set_active_client(Some(client("c1", "ANA")));
        let _ = cascade.set_active_client(Some(client("c2", "LUIS")));

        cascade.apply_pets(
            &ClientId::new("c1"),
            Ok(DirectoryResponse::Pets(vec![pet("p1", "LUNA")])),
        );
        assert!(cascade.pets().is_empty());

        cascade.apply_pets(
            &ClientId::new("c2"),
            Ok(DirectoryResponse::Pets(vec![pet("p5", "MAX")])),
        );
        assert_eq!(cascade.pets().len(), 1);
    }

    #[test]
    fn stale_histories_are_discarded() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::FetchHistories);
        let _ = cascade.select_pet(&PetId::new("p1"));
        let _ = cascade.select_pet(&PetId::new("p2"));

        cascade.apply_histories(
            &PetId::new("p1"),
            Ok(DirectoryResponse::Histories(vec![Default::default()])),
        );
        assert!(cascade.histories().is_empty());
        assert!(!cascade.histories_loaded());
    }

    #[test]
    fn history_failure_clears_list_and_sets_message() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::FetchHistories);
        let _ = cascade.select_pet(&PetId::new("p1"));
        cascade.apply_histories(
            &PetId::new("p1"),
            Err(DirectoryError::Transport("reset".to_owned())),
        );
        assert!(cascade.histories().is_empty());
        assert_eq!(
            cascade.message.as_ref().map(|message| message.text.as_str()),
            Some("Error al obtener las historias clínicas.")
        );
    }

    #[test]
    fn removing_selected_pet_clears_selection() {
        let mut cascade = cascade_with_pets(PetSelectionEffect::LoadEditForm);
        let _ = cascade.select_pet(&PetId::new("p1"));
        cascade.remove_pet(&PetId::new("p1"));
        assert_eq!(cascade.pets().len(), 1);
        assert!(cascade.selected_pet_id().is_none());
    }
}
