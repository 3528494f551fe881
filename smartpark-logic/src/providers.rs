use std::sync::Arc;

use crate::{location::Location, prelude::*, search::SuggestionItem};

/// Receives values pushed by a provider
pub trait UpdateHandler<T>: Send + Sync {
    /// A new value is available, replaces any previous one
    fn on_update(&self, value: T);
    /// The provider failed to produce a value
    fn on_error(&self, error: anyhow::Error);
}

pub type Handler<T> = Arc<dyn UpdateHandler<T>>;

/// The device's positioning service
pub trait LocationService: Send + Sync {
    /// Ask the user for permission to use their location
    fn request_permission(&self) -> Result {
        Ok(())
    }
    /// Begin pushing the latest known location to `handler` whenever it changes
    fn start_updates(&self, handler: Handler<Location>) -> Result;
}

/// Address completion service.
///
/// Debouncing and dropping superseded fragments is up to the implementation, the
/// caller just forwards every keystroke.
pub trait SuggestionService: Send + Sync {
    /// Register where completions for future fragments are pushed
    fn subscribe(&self, handler: Handler<Vec<SuggestionItem>>);
    /// The search text changed
    fn set_query_fragment(&self, fragment: &str);
}

/// Turns free text into a single coordinate
pub trait Geocoder: Send + Sync + 'static {
    /// Resolve `query` to its first match, `None` if nothing matched
    fn resolve(&self, query: &str) -> impl Future<Output = Result<Option<Location>>> + Send;
}
