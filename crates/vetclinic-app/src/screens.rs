// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::{
    ClientForm, ClientField, ClinicDirectory, DirectoryError, DirectoryOutcome, DirectoryRequest,
    DirectoryResponse, HistoryForm, LookupCascade, PetForm, PetId, PetSelectionEffect, Prompt,
    ScreenKind, ScreenMessage, SubmissionState, execute, phone_length_warning,
};

pub const CLIENT_REQUIRED: &str = "Primero debes buscar y seleccionar un cliente.";
pub const PET_REQUIRED: &str = "Debe seleccionar una mascota.";
pub const PET_DELETE_FAILED: &str = "Error al eliminar la mascota.";

/// A screen controller: user commands hand back the requests to run, and
/// each outcome is fed back through `complete`, which may ask for more.
pub trait Screen {
    fn kind(&self) -> ScreenKind;
    fn is_busy(&self) -> bool;
    fn message(&self) -> Option<&ScreenMessage>;
    fn complete(
        &mut self,
        request: &DirectoryRequest,
        outcome: DirectoryOutcome,
    ) -> Vec<DirectoryRequest>;
}

/// Runs requests and their follow-ups in FIFO order until the screen stops
/// asking. Returns how many requests were executed.
pub fn run_to_idle<S, D>(screen: &mut S, directory: &mut D, requests: Vec<DirectoryRequest>) -> usize
where
    S: Screen + ?Sized,
    D: ClinicDirectory + ?Sized,
{
    let mut queue: VecDeque<DirectoryRequest> = requests.into();
    let mut executed = 0;
    while let Some(request) = queue.pop_front() {
        let outcome = execute(directory, &request);
        executed += 1;
        queue.extend(screen.complete(&request, outcome));
    }
    executed
}

fn save_failure_text(entity: &str, error: &DirectoryError) -> String {
    match error {
        DirectoryError::Rejected { message, .. } if !message.is_empty() => {
            format!("Error al guardar {entity}: {message}")
        }
        DirectoryError::Rejected { status, .. } => {
            format!("Error al guardar {entity}: HTTP {status}")
        }
        DirectoryError::Transport(_) | DirectoryError::Decode(_) => {
            format!("Error de conexión al guardar {entity}.")
        }
    }
}

fn begin_lookup(
    cascade: &LookupCascade,
    busy: &mut SubmissionState,
) -> Result<Vec<DirectoryRequest>, Prompt> {
    let request = cascade.lookup_request()?;
    if !busy.begin() {
        debug!("lookup ignored while a request is in flight");
        return Ok(Vec::new());
    }
    Ok(vec![request])
}

fn complete_cascade(
    cascade: &mut LookupCascade,
    busy: &mut SubmissionState,
    request: &DirectoryRequest,
    outcome: DirectoryOutcome,
) -> Vec<DirectoryRequest> {
    match request {
        DirectoryRequest::FindClient { .. } => {
            busy.finish();
            cascade.apply_lookup(outcome)
        }
        DirectoryRequest::ListPets { client_id } => {
            cascade.apply_pets(client_id, outcome);
            Vec::new()
        }
        DirectoryRequest::ListHistories { pet_id } => {
            cascade.apply_histories(pet_id, outcome);
            Vec::new()
        }
        other => {
            debug!(request = other.label(), "completion not handled by this screen");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateClientScreen {
    pub form: ClientForm,
    busy: SubmissionState,
    message: Option<ScreenMessage>,
}

impl CreateClientScreen {
    pub fn phone_warning(&self) -> Option<&'static str> {
        phone_length_warning(self.form.get(ClientField::Phone))
    }

    /// Every press sends a request; duplicates are the service's concern.
    pub fn submit(&mut self) -> Result<Vec<DirectoryRequest>, Prompt> {
        let payload = self.form.to_payload()?;
        if !self.busy.begin() {
            debug!("client submission ignored while another is in flight");
            return Ok(Vec::new());
        }
        Ok(vec![DirectoryRequest::CreateClient(payload)])
    }
}

impl Screen for CreateClientScreen {
    fn kind(&self) -> ScreenKind {
        ScreenKind::CreateClient
    }

    fn is_busy(&self) -> bool {
        self.busy.is_submitting()
    }

    fn message(&self) -> Option<&ScreenMessage> {
        self.message.as_ref()
    }

    fn complete(
        &mut self,
        request: &DirectoryRequest,
        outcome: DirectoryOutcome,
    ) -> Vec<DirectoryRequest> {
        if !matches!(request, DirectoryRequest::CreateClient(_)) {
            return Vec::new();
        }
        self.busy.finish();
        match outcome {
            Ok(_) => {
                info!("client saved");
                self.form.clear();
                self.message = Some(ScreenMessage::info("Cliente guardado exitosamente."));
            }
            Err(error) => {
                self.message = Some(ScreenMessage::error(save_failure_text("cliente", &error)));
            }
        }
        Vec::new()
    }
}

#[derive(Debug, Clone)]
pub struct PetScreen {
    pub cascade: LookupCascade,
    pub form: PetForm,
    edit_target: Option<PetId>,
    busy: SubmissionState,
}

impl Default for PetScreen {
    fn default() -> Self {
        Self {
            cascade: LookupCascade::new(PetSelectionEffect::LoadEditForm),
            form: PetForm::default(),
            edit_target: None,
            busy: SubmissionState::default(),
        }
    }
}

impl PetScreen {
    pub fn edit_target(&self) -> Option<&PetId> {
        self.edit_target.as_ref()
    }

    pub fn lookup(&mut self) -> Result<Vec<DirectoryRequest>, Prompt> {
        begin_lookup(&self.cascade, &mut self.busy)
    }

    /// Selecting a pet here loads it into the form for editing.
    pub fn select_pet(&mut self, pet_id: &PetId) -> Vec<DirectoryRequest> {
        let follow_up = self.cascade.select_pet(pet_id);
        if self.cascade.is_selected(pet_id) {
            self.load_for_edit(pet_id);
        }
        follow_up
    }

    pub fn load_for_edit(&mut self, pet_id: &PetId) {
        let Some(pet) = self.cascade.pets().iter().find(|pet| &pet.id == pet_id) else {
            return;
        };
        self.form.load(pet);
        self.edit_target = Some(pet_id.clone());
    }

    pub fn cancel_edit(&mut self) {
        self.edit_target = None;
        self.form.clear();
        self.cascade.clear_selection();
    }

    pub fn submit(&mut self) -> Result<Vec<DirectoryRequest>, Prompt> {
        let Some(client) = self.cascade.active_client() else {
            return Err(Prompt::new(CLIENT_REQUIRED));
        };
        let payload = self
            .form
            .to_payload(self.edit_target.clone(), client.id.clone())?;
        if !self.busy.begin() {
            debug!("pet submission ignored while another is in flight");
            return Ok(Vec::new());
        }
        let request = match &self.edit_target {
            Some(pet_id) => DirectoryRequest::UpdatePet {
                pet_id: pet_id.clone(),
                payload,
            },
            None => DirectoryRequest::CreatePet(payload),
        };
        Ok(vec![request])
    }

    pub fn delete(&mut self, pet_id: &PetId) -> Vec<DirectoryRequest> {
        if !self.busy.begin() {
            debug!(%pet_id, "delete ignored while a request is in flight");
            return Vec::new();
        }
        vec![DirectoryRequest::DeletePet {
            pet_id: pet_id.clone(),
        }]
    }

    fn complete_save(&mut self, updated: bool, outcome: DirectoryOutcome) -> Vec<DirectoryRequest> {
        self.busy.finish();
        match outcome {
            Ok(_) => {
                let text = if updated {
                    "Mascota actualizada exitosamente."
                } else {
                    "Mascota guardada exitosamente."
                };
                info!(updated, "pet saved");
                self.cascade.message = Some(ScreenMessage::info(text));
                self.cancel_edit();
                self.cascade.refresh_pets().into_iter().collect()
            }
            Err(error) => {
                self.cascade.message =
                    Some(ScreenMessage::error(save_failure_text("mascota", &error)));
                Vec::new()
            }
        }
    }

    fn complete_delete(&mut self, pet_id: &PetId, outcome: DirectoryOutcome) {
        self.busy.finish();
        match outcome {
            Ok(_) => {
                info!(%pet_id, "pet deleted");
                self.cascade.remove_pet(pet_id);
                if self.edit_target.as_ref() == Some(pet_id) {
                    self.edit_target = None;
                    self.form.clear();
                }
                self.cascade.message = Some(ScreenMessage::info("Mascota eliminada con éxito."));
            }
            Err(error) => {
                warn!(%pet_id, %error, "pet delete failed");
                self.cascade.message = Some(ScreenMessage::error(PET_DELETE_FAILED));
            }
        }
    }
}

impl Screen for PetScreen {
    fn kind(&self) -> ScreenKind {
        ScreenKind::CreatePet
    }

    fn is_busy(&self) -> bool {
        self.busy.is_submitting()
    }

    fn message(&self) -> Option<&ScreenMessage> {
        self.cascade.message.as_ref()
    }

    fn complete(
        &mut self,
        request: &DirectoryRequest,
        outcome: DirectoryOutcome,
    ) -> Vec<DirectoryRequest> {
        match request {
            DirectoryRequest::CreatePet(_) => self.complete_save(false, outcome),
            DirectoryRequest::UpdatePet { .. } => self.complete_save(true, outcome),
            DirectoryRequest::DeletePet { pet_id } => {
                self.complete_delete(pet_id, outcome);
                Vec::new()
            }
            DirectoryRequest::FindClient { .. } => {
                // Any lookup result, hit or miss, drops the pet being edited.
                self.cancel_edit();
                complete_cascade(&mut self.cascade, &mut self.busy, request, outcome)
            }
            _ => {
                let follow_up =
                    complete_cascade(&mut self.cascade, &mut self.busy, request, outcome);
                if let Some(target) = &self.edit_target
                    && !self.cascade.pets().iter().any(|pet| &pet.id == target)
                {
                    self.edit_target = None;
                }
                follow_up
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntryScreen {
    pub cascade: LookupCascade,
    pub form: HistoryForm,
    busy: SubmissionState,
}

impl Default for HistoryEntryScreen {
    fn default() -> Self {
        Self {
            cascade: LookupCascade::new(PetSelectionEffect::FetchHistories),
            form: HistoryForm::default(),
            busy: SubmissionState::default(),
        }
    }
}

impl HistoryEntryScreen {
    pub fn lookup(&mut self) -> Result<Vec<DirectoryRequest>, Prompt> {
        begin_lookup(&self.cascade, &mut self.busy)
    }

    pub fn select_pet(&mut self, pet_id: &PetId) -> Vec<DirectoryRequest> {
        self.cascade.select_pet(pet_id)
    }

    /// A missing client or pet is reported inline rather than as a prompt.
    pub fn submit(&mut self) -> Result<Vec<DirectoryRequest>, Prompt> {
        let Some(pet_id) = self.cascade.selected_pet_id().cloned() else {
            self.cascade.message = Some(ScreenMessage::error(PET_REQUIRED));
            return Ok(Vec::new());
        };
        let payload = self.form.to_payload(pet_id)?;
        if !self.busy.begin() {
            debug!("history submission ignored while another is in flight");
            return Ok(Vec::new());
        }
        Ok(vec![DirectoryRequest::CreateHistory(payload)])
    }
}

impl Screen for HistoryEntryScreen {
    fn kind(&self) -> ScreenKind {
        ScreenKind::CreateHistory
    }

    fn is_busy(&self) -> bool {
        self.busy.is_submitting()
    }

    fn message(&self) -> Option<&ScreenMessage> {
        self.cascade.message.as_ref()
    }

    fn complete(
        &mut self,
        request: &DirectoryRequest,
        outcome: DirectoryOutcome,
    ) -> Vec<DirectoryRequest> {
        let DirectoryRequest::CreateHistory(_) = request else {
            return complete_cascade(&mut self.cascade, &mut self.busy, request, outcome);
        };
        self.busy.finish();
        match outcome {
            Ok(_) => {
                info!("clinical history saved");
                self.form.clear();
                self.cascade.message = Some(ScreenMessage::info(
                    "Historia clínica guardada exitosamente.",
                ));
                self.cascade.refresh_histories().into_iter().collect()
            }
            Err(error) => {
                self.cascade.message = Some(ScreenMessage::error(save_failure_text(
                    "historia clínica",
                    &error,
                )));
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryQueryScreen {
    pub cascade: LookupCascade,
    busy: SubmissionState,
}

impl Default for HistoryQueryScreen {
    fn default() -> Self {
        Self {
            cascade: LookupCascade::new(PetSelectionEffect::FetchHistories),
            busy: SubmissionState::default(),
        }
    }
}

impl HistoryQueryScreen {
    pub fn lookup(&mut self) -> Result<Vec<DirectoryRequest>, Prompt> {
        begin_lookup(&self.cascade, &mut self.busy)
    }

    pub fn select_pet(&mut self, pet_id: &PetId) -> Vec<DirectoryRequest> {
        self.cascade.select_pet(pet_id)
    }
}

impl Screen for HistoryQueryScreen {
    fn kind(&self) -> ScreenKind {
        ScreenKind::QueryHistory
    }

    fn is_busy(&self) -> bool {
        self.busy.is_submitting()
    }

    fn message(&self) -> Option<&ScreenMessage> {
        self.cascade.message.as_ref()
    }

    fn complete(
        &mut self,
        request: &DirectoryRequest,
        outcome: DirectoryOutcome,
    ) -> Vec<DirectoryRequest> {
        complete_cascade(&mut self.cascade, &mut self.busy, request, outcome)
    }
}

/// All four screens; each keeps its own state while hidden.
#[derive(Debug, Clone, Default)]
pub struct Screens {
    pub create_client: CreateClientScreen,
    pub create_pet: PetScreen,
    pub create_history: HistoryEntryScreen,
    pub query_history: HistoryQueryScreen,
}

impl Screens {
    pub fn get(&self, kind: ScreenKind) -> &dyn Screen {
        match kind {
            ScreenKind::CreateClient => &self.create_client,
            ScreenKind::CreatePet => &self.create_pet,
            ScreenKind::CreateHistory => &self.create_history,
            ScreenKind::QueryHistory => &self.query_history,
        }
    }

    pub fn get_mut(&mut self, kind: ScreenKind) -> &mut dyn Screen {
        match kind {
            ScreenKind::CreateClient => &mut self.create_client,
            ScreenKind::CreatePet => &mut self.create_pet,
            ScreenKind::CreateHistory => &mut self.create_history,
            ScreenKind::QueryHistory => &mut self.query_history,
        }
    }

    /// The lookup cascade of a screen that has one.
    pub fn cascade(&self, kind: ScreenKind) -> Option<&LookupCascade> {
        match kind {
            ScreenKind::CreateClient => None,
            ScreenKind::CreatePet => Some(&self.create_pet.cascade),
            ScreenKind::CreateHistory => Some(&self.create_history.cascade),
            ScreenKind::QueryHistory => Some(&self.query_history.cascade),
        }
    }

    pub fn cascade_mut(&mut self, kind: ScreenKind) -> Option<&mut LookupCascade> {
        match kind {
            ScreenKind::CreateClient => None,
            ScreenKind::CreatePet => Some(&mut self.create_pet.cascade),
            ScreenKind::CreateHistory => Some(&mut self.create_history.cascade),
            ScreenKind::QueryHistory => Some(&mut self.query_history.cascade),
        }
    }

    pub fn lookup(&mut self, kind: ScreenKind) -> Result<Vec<DirectoryRequest>, Prompt> {
        match kind {
            ScreenKind::CreateClient => Ok(Vec::new()),
            ScreenKind::CreatePet => self.create_pet.lookup(),
            ScreenKind::CreateHistory => self.create_history.lookup(),
            ScreenKind::QueryHistory => self.query_history.lookup(),
        }
    }

    pub fn select_pet(&mut self, kind: ScreenKind, pet_id: &PetId) -> Vec<DirectoryRequest> {
        match kind {
            ScreenKind::CreateClient => Vec::new(),
            ScreenKind::CreatePet => self.create_pet.select_pet(pet_id),
            ScreenKind::CreateHistory => self.create_history.select_pet(pet_id),
            ScreenKind::QueryHistory => self.query_history.select_pet(pet_id),
        }
    }

    pub fn submit(&mut self, kind: ScreenKind) -> Result<Vec<DirectoryRequest>, Prompt> {
        match kind {
            ScreenKind::CreateClient => self.create_client.submit(),
            ScreenKind::CreatePet => self.create_pet.submit(),
            ScreenKind::CreateHistory => self.create_history.submit(),
            ScreenKind::QueryHistory => Ok(Vec::new()),
        }
    }
}
