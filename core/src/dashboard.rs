//! Search, filter, sort and summary helpers over a fetched entry list, plus
//! the composite dashboard fetch.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::debug;

use crate::client::JournalClient;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{Entry, Mood};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Newest first.
    #[default]
    Date,
    /// Case-insensitive A to Z.
    Title,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub search: String,
    pub mood: Option<Mood>,
    pub sort: SortBy,
}

impl EntryQuery {
    pub fn matches(&self, entry: &Entry) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty()
            || entry.title.to_lowercase().contains(&needle)
            || entry.content.to_lowercase().contains(&needle);
        let matches_mood = self.mood.map_or(true, |mood| entry.mood() == Some(mood));
        matches_search && matches_mood
    }

    pub fn apply(&self, entries: &[Entry]) -> Vec<Entry> {
        let mut selected: Vec<Entry> = entries.iter().filter(|e| self.matches(e)).cloned().collect();
        match self.sort {
            SortBy::Date => selected.sort_by_key(|e| Reverse(e.timestamp())),
            SortBy::Title => selected.sort_by_cached_key(|e| e.title.to_lowercase()),
        }
        selected
    }
}

/// Entry counts per mood; entries without a recognized mood count as neutral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentStats {
    pub moods: BTreeMap<Mood, usize>,
    pub neutral: usize,
}

impl SentimentStats {
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            match entry.mood() {
                Some(mood) => *stats.moods.entry(mood).or_default() += 1,
                None => stats.neutral += 1,
            }
        }
        stats
    }

    pub fn count(&self, mood: Mood) -> usize {
        self.moods.get(&mood).copied().unwrap_or(0)
    }
}

/// Entries dated in the same calendar month and year as `now` (UTC).
pub fn entries_in_month(entries: &[Entry], now: DateTime<Utc>) -> usize {
    entries
        .iter()
        .map(Entry::timestamp)
        .filter(|ts| ts.year() == now.year() && ts.month() == now.month())
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub entries: Vec<Entry>,
    /// `None` when the greeting could not be fetched.
    pub greeting: Option<String>,
}

impl Dashboard {
    pub fn stats(&self) -> SentimentStats {
        SentimentStats::from_entries(&self.entries)
    }
}

/// Upper bound for the greeting request inside `fetch_dashboard`.
pub const GREETING_TIMEOUT: Duration = Duration::from_secs(2);

/// Fetch entries and the greeting concurrently. Only the entry list is
/// required: it gets the full retry policy, while the greeting gets one
/// attempt bounded by `GREETING_TIMEOUT` and is left empty on failure.
pub async fn fetch_dashboard<T: Transport>(
    client: &JournalClient<T>,
    token: &str,
) -> Result<Dashboard, ApiError> {
    let greeting_limit = client.policy().timeout.min(GREETING_TIMEOUT);
    let (entries, greeting) = tokio::join!(
        client.list_entries(token),
        client.get_greeting_once(token, greeting_limit),
    );
    let greeting = match greeting {
        Ok(greeting) => Some(greeting),
        Err(err) => {
            debug!(error = %err, "could not fetch greeting");
            None
        }
    };
    Ok(Dashboard {
        entries: entries?,
        greeting,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::schema::parse_timestamp;
    use crate::transport::TransportError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn entry(id: &str, title: &str, content: &str, date: &str, sentiment: Option<&str>) -> Entry {
        Entry {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            date: date.to_string(),
            sentiment: sentiment.map(str::to_string),
        }
    }

    fn sample() -> Vec<Entry> {
        vec![
            entry("1", "Morning walk", "Sunny park", "2024-01-15T08:30:00Z", Some("Happy")),
            entry("2", "", "", "2024-03-02T10:00:00Z", None),
            entry("3", "argument", "Work was rough", "2024-02-10T18:00:00Z", Some("angry")),
            entry("4", "Budget", "Anxious about rent", "2024-03-20T09:00:00Z", Some("ANXIOUS")),
        ]
    }

    fn ids(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn default_query_sorts_newest_first() {
        let result = EntryQuery::default().apply(&sample());
        assert_eq!(ids(&result), vec!["4", "2", "3", "1"]);
    }

    #[test]
    fn title_sort_is_case_insensitive_and_tolerates_empty_titles() {
        let query = EntryQuery {
            sort: SortBy::Title,
            ..Default::default()
        };
        let result = query.apply(&sample());
        assert_eq!(ids(&result), vec!["2", "3", "4", "1"]);
    }

    #[test]
    fn search_matches_title_or_content_ignoring_case() {
        let query = EntryQuery {
            search: "PARK".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&sample())), vec!["1"]);

        let query = EntryQuery {
            search: "budget".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&sample())), vec!["4"]);
    }

    #[test]
    fn mood_filter_excludes_untagged_entries() {
        let query = EntryQuery {
            mood: Some(Mood::Anxious),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&sample())), vec!["4"]);
    }

    #[test]
    fn stats_count_neutral_entries() {
        let stats = SentimentStats::from_entries(&sample());
        assert_eq!(stats.count(Mood::Happy), 1);
        assert_eq!(stats.count(Mood::Angry), 1);
        assert_eq!(stats.count(Mood::Anxious), 1);
        assert_eq!(stats.count(Mood::Sad), 0);
        assert_eq!(stats.neutral, 1);
    }

    /// Serves an empty entry list; `/user` either fails or never answers.
    #[derive(Clone, Default)]
    struct GreetingDown {
        hang: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Transport for GreetingDown {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.path.ends_with("/journal") {
                return Ok(HttpResponse::new(200, "[]"));
            }
            if self.hang {
                std::future::pending::<()>().await;
            }
            Ok(HttpResponse::new(500, "greeting unavailable"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_greeting_is_requested_once() {
        let transport = GreetingDown::default();
        let client = JournalClient::with_transport(&ClientConfig::default(), transport.clone()).unwrap();
        let started = Instant::now();
        let dashboard = fetch_dashboard(&client, "tok").await.unwrap();

        assert!(dashboard.entries.is_empty());
        assert_eq!(dashboard.greeting, None);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_greeting_is_cut_off() {
        let transport = GreetingDown {
            hang: true,
            ..Default::default()
        };
        let client = JournalClient::with_transport(&ClientConfig::default(), transport.clone()).unwrap();
        let started = Instant::now();
        let dashboard = fetch_dashboard(&client, "tok").await.unwrap();

        assert!(dashboard.entries.is_empty());
        assert_eq!(dashboard.greeting, None);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() <= GREETING_TIMEOUT + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn greeting_limit_follows_shorter_client_timeout() {
        let transport = GreetingDown {
            hang: true,
            ..Default::default()
        };
        let config = ClientConfig::default().with_timeout_ms(500);
        let client = JournalClient::with_transport(&config, transport).unwrap();
        let started = Instant::now();
        fetch_dashboard(&client, "tok").await.unwrap();
        assert!(started.elapsed() <= Duration::from_millis(505));
    }

    #[test]
    fn month_count_uses_year_and_month() {
        let now = parse_timestamp("2024-03-31T23:59:59Z").unwrap();
        assert_eq!(entries_in_month(&sample(), now), 2);
        let next_year = parse_timestamp("2025-03-01T00:00:00Z").unwrap();
        assert_eq!(entries_in_month(&sample(), next_year), 0);
    }
}
