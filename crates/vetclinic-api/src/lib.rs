// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;
use vetclinic_app::{
    Client, ClientId, ClinicDirectory, ClinicalHistoryRecord, DirectoryError, NewClient,
    NewClinicalHistory, Pet, PetId, PetPayload,
};

const API_ROOT: [&str; 3] = ["v1", "api", "veterinaria"];

/// Blocking HTTP client for the clinic directory service.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    base_url: String,
    root: Url,
    timeout: Duration,
    http: HttpClient,
}

impl DirectoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let mut root =
            Url::parse(trimmed).with_context(|| format!("parse api.base_url {trimmed:?}"))?;
        if !matches!(root.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {:?}",
                root.scheme()
            );
        }
        match root.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().extend(API_ROOT);
            }
            Err(()) => bail!("api.base_url {trimmed:?} cannot carry a path"),
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url: trimmed.to_owned(),
            root,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Appends each segment percent-encoded, so ids never alter the path shape.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    pub fn find_client(&self, document_number: &str) -> Result<Option<Client>, DirectoryError> {
        let url = self.endpoint(&["cliente", "get-cliente", document_number]);
        let client: Option<Client> = self.fetch_data(self.http.get(url.clone()), &url)?;
        Ok(client.filter(|client| client.id.is_assigned()))
    }

    pub fn create_client(&self, client: &NewClient) -> Result<Option<Client>, DirectoryError> {
        let url = self.endpoint(&["cliente"]);
        self.fetch_data(self.http.post(url.clone()).json(client), &url)
    }

    pub fn list_pets(&self, client_id: &ClientId) -> Result<Vec<Pet>, DirectoryError> {
        let url = self.endpoint(&["mascota", "get-mascota-cliente", client_id.as_str()]);
        let pets: Option<Vec<Pet>> = self.fetch_data(self.http.get(url.clone()), &url)?;
        Ok(pets.unwrap_or_default())
    }

    pub fn create_pet(&self, pet: &PetPayload) -> Result<(), DirectoryError> {
        let url = self.endpoint(&["mascota"]);
        self.send(self.http.post(url.clone()).json(pet), &url)
            .map(drop)
    }

    pub fn update_pet(&self, pet_id: &PetId, pet: &PetPayload) -> Result<(), DirectoryError> {
        let url = self.endpoint(&["mascota", pet_id.as_str()]);
        self.send(self.http.put(url.clone()).json(pet), &url)
            .map(drop)
    }

    pub fn delete_pet(&self, pet_id: &PetId) -> Result<(), DirectoryError> {
        let url = self.endpoint(&["mascota", pet_id.as_str()]);
        self.send(self.http.delete(url.clone()), &url).map(drop)
    }

    pub fn list_histories(
        &self,
        pet_id: &PetId,
    ) -> Result<Vec<ClinicalHistoryRecord>, DirectoryError> {
        let url = self.endpoint(&[
            "historia-clinica",
            "get-historia-clinica-mascota",
            pet_id.as_str(),
        ]);
        let histories: Option<Vec<ClinicalHistoryRecord>> =
            self.fetch_data(self.http.get(url.clone()), &url)?;
        Ok(histories.unwrap_or_default())
    }

    pub fn create_history(&self, history: &NewClinicalHistory) -> Result<(), DirectoryError> {
        let url = self.endpoint(&["historia-clinica"]);
        self.send(self.http.post(url.clone()).json(history), &url)
            .map(drop)
    }

    fn send(&self, request: RequestBuilder, url: &Url) -> Result<String, DirectoryError> {
        debug!(%url, "directory call");
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        response
            .text()
            .map_err(|error| DirectoryError::Decode(format!("read response from {url}: {error}")))
    }

    fn fetch_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<Option<T>, DirectoryError> {
        let body = self.send(request, url)?;
        decode_data(&body)
            .map_err(|error| DirectoryError::Decode(format!("decode response from {url}: {error}")))
    }
}

impl ClinicDirectory for DirectoryClient {
    fn find_client(&mut self, document_number: &str) -> Result<Option<Client>, DirectoryError> {
        DirectoryClient::find_client(self, document_number)
    }

    fn create_client(&mut self, client: &NewClient) -> Result<Option<Client>, DirectoryError> {
        DirectoryClient::create_client(self, client)
    }

    fn list_pets(&mut self, client_id: &ClientId) -> Result<Vec<Pet>, DirectoryError> {
        DirectoryClient::list_pets(self, client_id)
    }

    fn create_pet(&mut self, pet: &PetPayload) -> Result<(), DirectoryError> {
        DirectoryClient::create_pet(self, pet)
    }

    fn update_pet(&mut self, pet_id: &PetId, pet: &PetPayload) -> Result<(), DirectoryError> {
        DirectoryClient::update_pet(self, pet_id, pet)
    }

    fn delete_pet(&mut self, pet_id: &PetId) -> Result<(), DirectoryError> {
        DirectoryClient::delete_pet(self, pet_id)
    }

    fn list_histories(
        &mut self,
        pet_id: &PetId,
    ) -> Result<Vec<ClinicalHistoryRecord>, DirectoryError> {
        DirectoryClient::list_histories(self, pet_id)
    }

    fn create_history(&mut self, history: &NewClinicalHistory) -> Result<(), DirectoryError> {
        DirectoryClient::create_history(self, history)
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Success bodies wrap their payload in `data`; empty bodies carry nothing.
fn decode_data<T: DeserializeOwned>(body: &str) -> Result<Option<T>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let envelope: DataEnvelope<T> = serde_json::from_str(body)?;
    Ok(envelope.data)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> DirectoryError {
    DirectoryError::Transport(format!("cannot reach {base_url} ({error})"))
}

fn clean_error_response(status: StatusCode, body: &str) -> DirectoryError {
    let status = status.as_u16();
    if let Ok(parsed) = serde_json::from_str::<MessageEnvelope>(body) {
        if let Some(message) = parsed.message.filter(|message| !message.trim().is_empty()) {
            return DirectoryError::Rejected { status, message };
        }
        if let Some(error) = parsed.error.filter(|error| !error.trim().is_empty()) {
            return DirectoryError::Rejected {
                status,
                message: error,
            };
        }
    }

    let trimmed = body.trim();
    if trimmed.len() < 100 && !trimmed.contains('{') {
        return DirectoryError::Rejected {
            status,
            message: trimmed.to_owned(),
        };
    }

    DirectoryError::Rejected {
        status,
        message: String::new(),
    }
}
