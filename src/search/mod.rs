//! Symptom search — incremental suggestion lookup and the selected set.
//!
//! Keystrokes are normalized (trimmed, lower-cased) and looked up in a
//! session-long cache first. Misses wait out a debounce interval before a
//! single request is dispatched. Responses are always cached but only shown
//! if the patient is still looking at the same query.
//!
//! The selected set lives in `SessionState::symptoms`; this component only
//! edits it.

pub mod debounce;

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::session::SessionState;

pub use debounce::Debouncer;

pub const LOADING_MESSAGE: &str = "Finding matching symptoms...";
pub const EMPTY_MESSAGE: &str = "No matching symptoms found";
pub const FAILED_MESSAGE: &str = "Unable to load suggestions. Please try again.";

/// Deferred work the search hands back to its owner.
#[derive(Debug)]
pub enum SearchEvent {
    /// The debounce interval for `query` passed without another keystroke.
    DebounceElapsed { ticket: u64, query: String },
    /// A suggestion request for `query` finished.
    SuggestionsLoaded {
        query: String,
        result: Result<Vec<String>, BackendError>,
    },
}

/// What the suggestion panel shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SuggestionPanel {
    #[default]
    Hidden,
    Loading,
    Empty,
    List(Vec<String>),
    Failed,
}

impl SuggestionPanel {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }

    /// Notice text for the non-list states.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Loading => Some(LOADING_MESSAGE),
            Self::Empty => Some(EMPTY_MESSAGE),
            Self::Failed => Some(FAILED_MESSAGE),
            Self::Hidden | Self::List(_) => None,
        }
    }

    pub fn items(&self) -> &[String] {
        match self {
            Self::List(items) => items,
            _ => &[],
        }
    }
}

/// Normalized query → suggestions. Grows for the whole session, never evicts.
#[derive(Debug, Default)]
pub struct SuggestionCache {
    entries: HashMap<String, Vec<String>>,
}

impl SuggestionCache {
    pub fn get(&self, query: &str) -> Option<&Vec<String>> {
        self.entries.get(query)
    }

    pub fn insert(&mut self, query: String, suggestions: Vec<String>) {
        self.entries.insert(query, suggestions);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trim and lower-case a raw query.
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub struct SymptomSearch {
    min_query_len: usize,
    input: String,
    /// Normalized form of `input` when it is long enough to search.
    current_query: Option<String>,
    last_dispatched: Option<String>,
    cache: SuggestionCache,
    panel: SuggestionPanel,
    debouncer: Debouncer,
    in_flight: usize,
}

impl SymptomSearch {
    pub fn new(debounce: Duration, min_query_len: usize) -> Self {
        Self {
            min_query_len,
            input: String::new(),
            current_query: None,
            last_dispatched: None,
            cache: SuggestionCache::default(),
            panel: SuggestionPanel::Hidden,
            debouncer: Debouncer::new(debounce),
            in_flight: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn panel(&self) -> &SuggestionPanel {
        &self.panel
    }

    /// Currently displayed suggestions.
    pub fn suggestions(&self) -> &[String] {
        self.panel.items()
    }

    pub fn cache(&self) -> &SuggestionCache {
        &self.cache
    }

    /// No timer pending and no request outstanding.
    pub fn is_idle(&self) -> bool {
        !self.debouncer.is_pending() && self.in_flight == 0
    }

    /// Handle a change to the search field.
    pub fn on_input<E>(&mut self, raw: &str, session: &SessionState, tx: &UnboundedSender<E>)
    where
        E: From<SearchEvent> + Send + 'static,
    {
        self.input = raw.to_string();
        let query = normalize_query(raw);

        if query.chars().count() < self.min_query_len {
            self.current_query = None;
            self.panel = SuggestionPanel::Hidden;
            return;
        }
        self.current_query = Some(query.clone());

        if let Some(cached) = self.cache.get(&query) {
            debug!(query = %query, "Suggestion cache hit");
            let cached = cached.clone();
            self.show(&cached, session);
            return;
        }

        if self.last_dispatched.as_deref() != Some(query.as_str()) {
            self.panel = SuggestionPanel::Loading;
        }

        self.debouncer.schedule(tx, |ticket| {
            E::from(SearchEvent::DebounceElapsed { ticket, query })
        });
    }

    /// A debounce timer fired. Returns the query to request, if any.
    pub fn on_debounce_elapsed(&mut self, ticket: u64, query: String) -> Option<String> {
        if !self.debouncer.fire(ticket) {
            debug!(ticket, "Ignoring superseded debounce timer");
            return None;
        }
        if self.last_dispatched.as_deref() == Some(query.as_str()) {
            return None;
        }
        self.last_dispatched = Some(query.clone());
        self.in_flight += 1;
        Some(query)
    }

    /// A suggestion request finished.
    pub fn on_suggestions_loaded(
        &mut self,
        query: String,
        result: Result<Vec<String>, BackendError>,
        session: &SessionState,
    ) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let current = self.current_query.as_deref() == Some(query.as_str());

        match result {
            Ok(suggestions) => {
                debug!(query = %query, count = suggestions.len(), "Suggestions loaded");
                if current {
                    self.show(&suggestions, session);
                } else {
                    debug!(query = %query, "Suggestions arrived for an abandoned query");
                }
                self.cache.insert(query, suggestions);
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Suggestion lookup failed");
                // Allow the same query to be retried.
                if self.last_dispatched.as_deref() == Some(query.as_str()) {
                    self.last_dispatched = None;
                }
                if current {
                    self.panel = SuggestionPanel::Failed;
                }
            }
        }
    }

    /// Select a symptom. Clears the field and hides the panel either way.
    pub fn add_symptom(&mut self, name: &str, session: &mut SessionState) -> bool {
        let added = session.add_symptom(name);
        self.input.clear();
        self.current_query = None;
        self.panel = SuggestionPanel::Hidden;
        added
    }

    pub fn remove_symptom(&mut self, name: &str, session: &mut SessionState) -> bool {
        session.remove_symptom(name)
    }

    /// Hide the panel without touching the query.
    pub fn dismiss(&mut self) {
        self.panel = SuggestionPanel::Hidden;
    }

    fn show(&mut self, suggestions: &[String], session: &SessionState) {
        let visible: Vec<String> = suggestions
            .iter()
            .filter(|s| !session.has_symptom(s))
            .cloned()
            .collect();
        self.panel = if visible.is_empty() {
            SuggestionPanel::Empty
        } else {
            SuggestionPanel::List(visible)
        };
    }
}
