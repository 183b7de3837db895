// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    Client, ClientId, ClinicalHistoryRecord, NewClient, NewClinicalHistory, Pet, PetId, PetPayload,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("cannot reach the clinic directory: {0}")]
    Transport(String),
    #[error("clinic directory rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unreadable clinic directory response: {0}")]
    Decode(String),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }

    /// Service-provided detail for rejections; the raw cause otherwise.
    pub fn detail(&self) -> &str {
        match self {
            Self::Transport(detail) | Self::Decode(detail) => detail,
            Self::Rejected { message, .. } => message,
        }
    }
}

/// The remote clinic directory: clients, pets, and clinical histories.
pub trait ClinicDirectory {
    /// `Ok(None)` when the service answers without a usable client.
    fn find_client(&mut self, document_number: &str) -> Result<Option<Client>, DirectoryError>;
    fn create_client(&mut self, client: &NewClient) -> Result<Option<Client>, DirectoryError>;
    fn list_pets(&mut self, client_id: &ClientId) -> Result<Vec<Pet>, DirectoryError>;
    fn create_pet(&mut self, pet: &PetPayload) -> Result<(), DirectoryError>;
    fn update_pet(&mut self, pet_id: &PetId, pet: &PetPayload) -> Result<(), DirectoryError>;
    fn delete_pet(&mut self, pet_id: &PetId) -> Result<(), DirectoryError>;
    fn list_histories(&mut self, pet_id: &PetId)
    -> Result<Vec<ClinicalHistoryRecord>, DirectoryError>;
    fn create_history(&mut self, history: &NewClinicalHistory) -> Result<(), DirectoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryRequest {
    FindClient { document_number: String },
    ListPets { client_id: ClientId },
    ListHistories { pet_id: PetId },
    CreateClient(NewClient),
    CreatePet(PetPayload),
    UpdatePet { pet_id: PetId, payload: PetPayload },
    DeletePet { pet_id: PetId },
    CreateHistory(NewClinicalHistory),
}

impl DirectoryRequest {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::FindClient { .. } => "find client",
            Self::ListPets { .. } => "list pets",
            Self::ListHistories { .. } => "list histories",
            Self::CreateClient(_) => "create client",
            Self::CreatePet(_) => "create pet",
            Self::UpdatePet { .. } => "update pet",
            Self::DeletePet { .. } => "delete pet",
            Self::CreateHistory(_) => "create history",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryResponse {
    Client(Option<Client>),
    Pets(Vec<Pet>),
    Histories(Vec<ClinicalHistoryRecord>),
    ClientCreated(Option<Client>),
    Saved,
    Deleted,
}

pub type DirectoryOutcome = Result<DirectoryResponse, DirectoryError>;

pub fn execute<D: ClinicDirectory + ?Sized>(
    directory: &mut D,
    request: &DirectoryRequest,
) -> DirectoryOutcome {
    info!(request = request.label(), "directory request");
    let outcome = match request {
        DirectoryRequest::FindClient { document_number } => directory
            .find_client(document_number)
            .map(DirectoryResponse::Client),
        DirectoryRequest::ListPets { client_id } => {
            directory.list_pets(client_id).map(DirectoryResponse::Pets)
        }
        DirectoryRequest::ListHistories { pet_id } => directory
            .list_histories(pet_id)
            .map(DirectoryResponse::Histories),
        DirectoryRequest::CreateClient(client) => directory
            .create_client(client)
            .map(DirectoryResponse::ClientCreated),
        DirectoryRequest::CreatePet(pet) => directory
            .create_pet(pet)
            .map(|()| DirectoryResponse::Saved),
        DirectoryRequest::UpdatePet { pet_id, payload } => directory
            .update_pet(pet_id, payload)
            .map(|()| DirectoryResponse::Saved),
        DirectoryRequest::DeletePet { pet_id } => directory
            .delete_pet(pet_id)
            .map(|()| DirectoryResponse::Deleted),
        DirectoryRequest::CreateHistory(history) => directory
            .create_history(history)
            .map(|()| DirectoryResponse::Saved),
    };
    if let Err(error) = &outcome {
        warn!(request = request.label(), %error, "directory request failed");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::DirectoryError;

    #[test]
    fn not_found_is_a_404_rejection() {
        let missing = DirectoryError::Rejected {
            status: 404,
            message: "no existe".to_owned(),
        };
        assert!(missing.is_not_found());
        assert_eq!(missing.detail(), "no existe");
        assert!(!DirectoryError::Transport("refused".to_owned()).is_not_found());
    }
}
