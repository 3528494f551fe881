use serde::{Deserialize, Serialize};

/// A single address completion from the suggestion provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub title: String,
    pub subtitle: String,
}

impl SuggestionItem {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    /// The text sent to the geocoder when this suggestion is picked
    pub fn full_query(&self) -> String {
        format!("{} {}", self.title, self.subtitle)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Where the search bar is in its lifecycle
pub enum SearchPhase {
    /// Nothing typed, nothing suggested
    #[default]
    Idle,
    /// Query sent to the suggestion provider, waiting on completions
    Querying,
    /// Completions are being displayed
    Suggested,
    /// The user picked a suggestion or submitted the query
    Resolved,
}

/// Search bar text and the suggestions being shown for it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    query: String,
    suggestions: Vec<SuggestionItem>,
    phase: SearchPhase,
    /// The provider hasn't answered (or failed) for the latest query yet
    awaiting_completions: bool,
}

impl SearchState {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[SuggestionItem] {
        &self.suggestions
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn awaiting_completions(&self) -> bool {
        self.awaiting_completions
    }

    /// The user edited the search bar
    pub fn update_query(&mut self, text: &str) {
        self.query = text.to_string();
        self.awaiting_completions = !text.is_empty();

        if text.is_empty() {
            self.suggestions.clear();
            self.phase = SearchPhase::Idle;
        } else if self.suggestions.is_empty() {
            self.phase = SearchPhase::Querying;
        } else {
            // Keep showing the old list until the provider replaces it
            self.phase = SearchPhase::Suggested;
        }
    }

    /// Replace the displayed suggestions with a fresh provider update.
    ///
    /// Returns false if the update was dropped because no query is in progress.
    pub fn apply_suggestions(&mut self, items: Vec<SuggestionItem>) -> bool {
        match self.phase {
            SearchPhase::Idle | SearchPhase::Resolved => false,
            SearchPhase::Querying | SearchPhase::Suggested => {
                self.phase = if items.is_empty() {
                    SearchPhase::Querying
                } else {
                    SearchPhase::Suggested
                };
                self.suggestions = items;
                self.awaiting_completions = false;
                true
            }
        }
    }

    /// The provider failed to complete the current query, whatever is showing stays up.
    ///
    /// Returns false if no query was in progress.
    pub fn completions_failed(&mut self) -> bool {
        match self.phase {
            SearchPhase::Idle | SearchPhase::Resolved => false,
            SearchPhase::Querying | SearchPhase::Suggested => {
                self.awaiting_completions = false;
                true
            }
        }
    }

    /// Pick the suggestion at `index`, returns the query to geocode
    pub fn select(&mut self, index: usize) -> Option<String> {
        let query = self.suggestions.get(index)?.full_query();
        self.resolve(query.clone());
        Some(query)
    }

    /// Finalize free text typed by the user, returns the query to geocode
    pub fn submit(&mut self, text: &str) -> Option<String> {
        let query = text.trim();
        if query.is_empty() {
            return None;
        }
        self.resolve(query.to_string());
        Some(query.to_string())
    }

    fn resolve(&mut self, query: String) {
        self.query = query;
        self.suggestions.clear();
        self.phase = SearchPhase::Resolved;
        self.awaiting_completions = false;
    }
}
