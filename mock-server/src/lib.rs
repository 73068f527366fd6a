use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Deserialize)]
pub struct EntryInput {
    pub title: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct ProfileInput {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "Password", default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Fail(StatusCode),
    Stall(Duration),
}

/// One user's data. Entries are stored as raw JSON so tests can seed
/// records the real service might send (integer ids, `null` fields).
struct Account {
    user_name: String,
    entries: Vec<Value>,
}

impl Account {
    fn new(token: &str) -> Self {
        Self {
            user_name: token.to_string(),
            entries: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Inner {
    accounts: RwLock<HashMap<String, Account>>,
    next_id: AtomicU64,
    faults: Mutex<VecDeque<Fault>>,
    requests: AtomicU64,
}

/// Shared server state. Every distinct bearer token is its own user.
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Inner>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw record to `token`'s journal.
    pub async fn seed(&self, token: &str, record: Value) {
        let mut accounts = self.inner.accounts.write().await;
        accounts
            .entry(token.to_string())
            .or_insert_with(|| Account::new(token))
            .entries
            .push(record);
    }

    /// Answer the next `count` requests with `status`, before auth.
    /// Codes outside the valid range become 500.
    pub fn fail_next(&self, count: usize, status: u16) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.push_faults(count, Fault::Fail(status));
    }

    /// Hold the next `count` requests for `delay` before handling them.
    pub fn stall_next(&self, count: usize, delay: Duration) {
        self.push_faults(count, Fault::Stall(delay));
    }

    /// Requests received so far, including failed and stalled ones.
    pub fn request_count(&self) -> u64 {
        self.inner.requests.load(Ordering::SeqCst)
    }

    fn push_faults(&self, count: usize, fault: Fault) {
        let mut faults = self.inner.faults.lock().unwrap_or_else(PoisonError::into_inner);
        faults.extend(std::iter::repeat(fault).take(count));
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply any queued fault, then resolve the caller's bearer token.
    async fn admit(&self, headers: &HeaderMap) -> Result<String, StatusCode> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        let fault = self
            .inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match fault {
            Some(Fault::Fail(status)) => {
                debug!(%status, "injected failure");
                return Err(status);
            }
            Some(Fault::Stall(delay)) => {
                debug!(?delay, "injected stall");
                tokio::time::sleep(delay).await;
            }
            None => {}
        }
        bearer_token(headers).ok_or(StatusCode::UNAUTHORIZED)
    }
}

pub fn app() -> Router {
    app_with_state(MockState::new())
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/journal", get(list_entries).post(create_entry))
        .route(
            "/journal/id/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/user", get(greeting).put(update_profile).delete(delete_account))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, MockState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn list_entries(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Value>>, StatusCode> {
    let token = state.admit(&headers).await?;
    let accounts = state.inner.accounts.read().await;
    let entries = accounts
        .get(&token)
        .map(|account| account.entries.clone())
        .unwrap_or_default();
    Ok(Json(entries))
}

async fn create_entry(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<EntryInput>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let token = state.admit(&headers).await?;
    let (title, content) = validated(&input)?;
    let record = json!({
        "id": state.next_id(),
        "title": title,
        "content": content,
        "date": now(),
        "sentiment": null,
    });
    let mut accounts = state.inner.accounts.write().await;
    accounts
        .entry(token.clone())
        .or_insert_with(|| Account::new(&token))
        .entries
        .push(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_entry(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let token = state.admit(&headers).await?;
    let accounts = state.inner.accounts.read().await;
    accounts
        .get(&token)
        .and_then(|account| account.entries.iter().find(|record| id_matches(record, &id)))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_entry(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<EntryInput>,
) -> Result<Json<Value>, StatusCode> {
    let token = state.admit(&headers).await?;
    let (title, content) = validated(&input)?;
    let mut accounts = state.inner.accounts.write().await;
    let record = accounts
        .get_mut(&token)
        .and_then(|account| account.entries.iter_mut().find(|record| id_matches(record, &id)))
        .ok_or(StatusCode::NOT_FOUND)?;
    record["title"] = json!(title);
    record["content"] = json!(content);
    record["date"] = json!(now());
    Ok(Json(record.clone()))
}

async fn delete_entry(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let token = state.admit(&headers).await?;
    let mut accounts = state.inner.accounts.write().await;
    let account = accounts.get_mut(&token).ok_or(StatusCode::NOT_FOUND)?;
    let index = account
        .entries
        .iter()
        .position(|record| id_matches(record, &id))
        .ok_or(StatusCode::NOT_FOUND)?;
    account.entries.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

async fn greeting(State(state): State<MockState>, headers: HeaderMap) -> Result<String, StatusCode> {
    let token = state.admit(&headers).await?;
    let accounts = state.inner.accounts.read().await;
    let name = accounts
        .get(&token)
        .map(|account| account.user_name.as_str())
        .unwrap_or(token.as_str());
    Ok(format!("Hello {name}, how are you feeling today?"))
}

async fn update_profile(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<ProfileInput>,
) -> Result<StatusCode, StatusCode> {
    let token = state.admit(&headers).await?;
    let user_name = input.user_name.trim();
    if user_name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if input.password.as_deref().is_some_and(|p| p.chars().count() < 6) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut accounts = state.inner.accounts.write().await;
    accounts
        .entry(token.clone())
        .or_insert_with(|| Account::new(&token))
        .user_name = user_name.to_string();
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_account(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    let token = state.admit(&headers).await?;
    state.inner.accounts.write().await.remove(&token);
    Ok(StatusCode::NO_CONTENT)
}

fn validated(input: &EntryInput) -> Result<(&str, &str), StatusCode> {
    let title = input.title.trim();
    let content = input.content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok((title, content))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Seeded records may carry string or integer ids.
fn id_matches(record: &Value, id: &str) -> bool {
    match record.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc".to_string()));
        assert_eq!(bearer_token(&headers_with("Bearer   ")), None);
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn id_matches_string_and_integer_ids() {
        assert!(id_matches(&json!({ "id": 42 }), "42"));
        assert!(id_matches(&json!({ "id": "abc" }), "abc"));
        assert!(!id_matches(&json!({ "id": 42 }), "43"));
        assert!(!id_matches(&json!({ "title": "no id" }), "1"));
    }

    #[test]
    fn entry_input_rejects_missing_content() {
        let result: Result<EntryInput, _> = serde_json::from_str(r#"{"title":"t"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn profile_input_uses_wire_names() {
        let input: ProfileInput = serde_json::from_str(r#"{"userName":"alice"}"#).unwrap();
        assert_eq!(input.user_name, "alice");
        assert!(input.password.is_none());
        let input: ProfileInput =
            serde_json::from_str(r#"{"userName":"bob","Password":"secret1"}"#).unwrap();
        assert_eq!(input.password.as_deref(), Some("secret1"));
    }

    #[test]
    fn validated_trims_and_rejects_blank() {
        let input = EntryInput {
            title: "  hi ".to_string(),
            content: " there".to_string(),
        };
        assert_eq!(validated(&input), Ok(("hi", "there")));
        let blank = EntryInput {
            title: " ".to_string(),
            content: "x".to_string(),
        };
        assert_eq!(validated(&blank), Err(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn faults_are_consumed_in_order() {
        let state = MockState::new();
        state.fail_next(1, 503);
        let headers = headers_with("Bearer tok");
        assert_eq!(state.admit(&headers).await, Err(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(state.admit(&headers).await, Ok("tok".to_string()));
        assert_eq!(state.request_count(), 2);
    }
}
