//! Stateless request builder and response parser for the journal API.
//!
//! # Design
//! `JournalCodec` holds only a `base_url`. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. `JournalClient` runs the round-trip and
//! the retry policy in between; the codec itself is deterministic and
//! performs no I/O.

use serde::Serialize;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::schema;
use crate::types::{Entry, EntryDraft, ProfileUpdate};

#[derive(Debug, Clone)]
pub struct JournalCodec {
    base_url: String,
}

impl JournalCodec {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_entries(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.collection_url(), token, None)
    }

    pub fn build_get_entry(&self, token: &str, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.entry_url(id), token, None)
    }

    pub fn build_create_entry(&self, token: &str, draft: &EntryDraft) -> Result<HttpRequest, ApiError> {
        let body = to_json(draft)?;
        Ok(self.request(HttpMethod::Post, self.collection_url(), token, Some(body)))
    }

    pub fn build_update_entry(
        &self,
        token: &str,
        id: &str,
        draft: &EntryDraft,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(draft)?;
        Ok(self.request(HttpMethod::Put, self.entry_url(id), token, Some(body)))
    }

    pub fn build_delete_entry(&self, token: &str, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.entry_url(id), token, None)
    }

    pub fn build_get_greeting(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.user_url(), token, None)
    }

    pub fn build_update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(update)?;
        Ok(self.request(HttpMethod::Put, self.user_url(), token, Some(body)))
    }

    pub fn build_delete_account(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.user_url(), token, None)
    }

    /// A `null` or empty body is an empty list.
    pub fn parse_list_entries(&self, response: HttpResponse) -> Result<Vec<Entry>, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value = parse_json(&response.body)?;
        schema::normalize_entries(&value)
    }

    pub fn parse_get_entry(&self, response: HttpResponse) -> Result<Entry, ApiError> {
        check_status(&response)?;
        let value = parse_json(&response.body)?;
        schema::normalize_entry(&value)
    }

    /// Create, update, delete and the profile writes carry no required body;
    /// any 2xx status is success.
    pub fn parse_ack(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_greeting(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(response.body)
    }

    fn collection_url(&self) -> String {
        format!("{}/journal", self.base_url)
    }

    fn entry_url(&self, id: &str) -> String {
        format!("{}/journal/id/{}", self.base_url, urlencoding::encode(id))
    }

    fn user_url(&self) -> String {
        format!("{}/user", self.base_url)
    }

    fn request(
        &self,
        method: HttpMethod,
        path: String,
        token: &str,
        body: Option<String>,
    ) -> HttpRequest {
        let mut headers = Vec::new();
        if !token.is_empty() {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            path,
            headers,
            body,
        }
    }
}

/// Map non-2xx status codes to `ApiError::Http`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn parse_json(body: &str) -> Result<serde_json::Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Validation(format!("malformed JSON: {e}")))
}

fn to_json<T: Serialize>(payload: &T) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))
}
