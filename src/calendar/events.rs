//! Client side cache of upcoming calendar events.
//!
//! The store only ever holds the result of the most recent fetch. A
//! failed fetch empties it rather than keeping stale events around.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Error, Result};
use tokio::sync::watch;

use super::public::{CalendarEvent, EventsResponse, events_on};
use crate::core::AppConfig;

#[derive(Clone, Debug)]
pub struct EventStoreConfig {
    pub api_base_url: String,
    pub limit: usize,
    pub timeout: Duration,
}

impl From<&AppConfig> for EventStoreConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_base_url: config.calendar_api_url.clone(),
            limit: config.event_limit,
            timeout: config.request_timeout(),
        }
    }
}

struct Inner {
    client: reqwest::Client,
    config: EventStoreConfig,
    events: watch::Sender<Vec<CalendarEvent>>,
    // Bumped at the start of every refresh so a slow response can't
    // overwrite the result of a newer one
    generation: AtomicU64,
}

/// Cheap to clone, all clones share the same events.
#[derive(Clone)]
pub struct EventStore {
    inner: Arc<Inner>,
}

impl EventStore {
    pub fn new(config: EventStoreConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: EventStoreConfig) -> Self {
        let (events, _rx) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                client,
                config,
                events,
                generation: AtomicU64::new(0),
            }),
        }
    }

    async fn fetch(&self) -> Result<Vec<CalendarEvent>, Error> {
        let EventStoreConfig {
            api_base_url,
            limit,
            timeout,
        } = &self.inner.config;

        let mut url = reqwest::Url::parse(&format!(
            "{}/calendar/events",
            api_base_url.trim_end_matches('/')
        ))
        .with_context(|| format!("Invalid calendar url {}", api_base_url))?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());

        tracing::debug!("Fetching calendar events from {}", url);

        let resp: EventsResponse = self
            .inner
            .client
            .get(url)
            .timeout(*timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| "Attempted to parse calendar events from json")?;

        Ok(resp.events)
    }

    /// Replace the held events with a fresh fetch. Failures are logged
    /// and leave the store empty. Returns how many events are held
    /// afterwards.
    pub async fn refresh(&self) -> usize {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let events = match self.fetch().await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Failed to refresh calendar events: {:#}", e);
                Vec::new()
            }
        };

        if self.inner.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Discarding calendar events from a superseded refresh");
            return self.inner.events.borrow().len();
        }

        let count = events.len();
        self.inner.events.send_replace(events);
        count
    }

    /// Load events for the first time when a session starts.
    pub async fn initialize(&self) -> usize {
        self.refresh().await
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.inner.events.borrow().clone()
    }

    pub fn events_on(&self, iso_date: &str) -> Vec<CalendarEvent> {
        let events = self.inner.events.borrow();
        events_on(&events, iso_date).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receives the full event list every time a refresh commits.
    pub fn subscribe(&self) -> watch::Receiver<Vec<CalendarEvent>> {
        self.inner.events.subscribe()
    }
}
