//! Resilient API client core for the journal service.
//!
//! # Overview
//! `JournalClient` issues authenticated requests against the journal API,
//! retries transient failures with capped exponential backoff, bounds every
//! attempt with a timeout, and normalizes response bodies into `Entry`
//! values before handing them back.
//!
//! # Design
//! - `JournalCodec` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network.
//! - `Transport` executes a single round-trip; `ReqwestTransport` is the
//!   production implementation and tests plug in scripted ones.
//! - `JournalClient` owns the retry loop and nothing else; it is immutable
//!   after construction.
//! - `schema` is the only path from raw JSON to `Entry`, so entry invariants
//!   hold everywhere downstream (`dashboard`, callers).
//! - `Session` carries the signed-in user and token; it is passed to the
//!   client per call, never stored in it.

pub mod client;
pub mod codec;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod retry;
pub mod schema;
pub mod session;
pub mod transport;
pub mod types;

pub use client::JournalClient;
pub use codec::JournalCodec;
pub use config::{ClientConfig, ConfigError};
pub use dashboard::{fetch_dashboard, Dashboard, EntryQuery, SentimentStats, SortBy};
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use retry::RetryPolicy;
pub use session::{Session, Theme, UnknownTheme};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{DraftError, Entry, EntryDraft, Mood, ProfileError, ProfileUpdate};
