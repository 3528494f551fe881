use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    catalog::{Catalog, LotId, ParkingLot},
    handoff::{AppAvailability, NavigationApp},
    location::Location,
    prelude::*,
    providers::{Geocoder, LocationService, SuggestionService, UpdateHandler},
    search::SuggestionItem,
    settings::FinderSettings,
    view_state::{FinderUiState, ViewState},
};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

pub trait StateUpdateSender {
    fn send_update(&self);
}

/// Something a provider pushed, waiting to be applied to the [ViewState]
#[derive(Debug)]
enum FinderEvent {
    /// New device location
    Location(Location),
    /// The location service failed
    LocationError(anyhow::Error),
    /// New list of completions for the search bar
    Suggestions(Vec<SuggestionItem>),
    /// The suggestion service failed
    SuggestionError(anyhow::Error),
    /// A geocode request finished
    Geocoded {
        query: String,
        result: Result<Option<Location>>,
    },
}

type EventTx = mpsc::UnboundedSender<FinderEvent>;
type EventRx = mpsc::UnboundedReceiver<FinderEvent>;

const EVENT_BATCH: usize = 20;

/// Forwards provider callbacks into the finder's event queue
struct EventForwarder<T> {
    tx: EventTx,
    update: fn(T) -> FinderEvent,
    error: fn(anyhow::Error) -> FinderEvent,
}

impl<T> UpdateHandler<T> for EventForwarder<T> {
    fn on_update(&self, value: T) {
        self.tx.send((self.update)(value)).ok();
    }

    fn on_error(&self, error: anyhow::Error) {
        self.tx.send((self.error)(error)).ok();
    }
}

/// Coordinates the parking lot finder: owns the [ViewState], receives locations
/// from a [LocationService], completions from a [SuggestionService] and search
/// results from a [Geocoder], and notifies the UI through a [StateUpdateSender].
///
/// Every provider result is queued and applied by [Finder::main_loop], so all
/// changes to state go through one place.
pub struct Finder<L: LocationService, C: SuggestionService, G: Geocoder, S: StateUpdateSender> {
    state: RwLock<ViewState>,
    location: L,
    completer: C,
    geocoder: Arc<G>,
    state_update_sender: S,
    events: (EventTx, Mutex<EventRx>),
    cancel: CancellationToken,
}

impl<L: LocationService, C: SuggestionService, G: Geocoder, S: StateUpdateSender>
    Finder<L, C, G, S>
{
    pub fn new(
        catalog: Arc<Catalog>,
        settings: &FinderSettings,
        location: L,
        completer: C,
        geocoder: G,
        state_update_sender: S,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        completer.subscribe(Arc::new(EventForwarder {
            tx: tx.clone(),
            update: FinderEvent::Suggestions,
            error: FinderEvent::SuggestionError,
        }));

        Self {
            state: RwLock::new(ViewState::new(catalog, settings, Utc::now())),
            location,
            completer,
            geocoder: Arc::new(geocoder),
            state_update_sender,
            events: (tx, Mutex::new(rx)),
            cancel: CancellationToken::new(),
        }
    }

    /// Ask for location permission and start receiving location updates
    pub fn start(&self) -> Result {
        self.location
            .request_permission()
            .context("Location permission was not granted")?;
        self.location
            .start_updates(Arc::new(EventForwarder {
                tx: self.events.0.clone(),
                update: FinderEvent::Location,
                error: FinderEvent::LocationError,
            }))
            .context("Failed to start location updates")
    }

    pub async fn get_ui_state(&self) -> FinderUiState {
        self.state.read().await.as_ui_state()
    }

    pub async fn nearby_lots(&self) -> Vec<ParkingLot> {
        self.state.read().await.nearby_lots().cloned().collect()
    }

    /// The search bar text changed
    pub async fn update_query(&self, text: &str) {
        self.state.write().await.update_query(text);
        self.completer.set_query_fragment(text);
        self.state_update_sender.send_update();
    }

    /// Pick the suggestion at `index` and geocode it.
    ///
    /// Returns false if there's no suggestion at that index.
    pub async fn select_suggestion(&self, index: usize) -> bool {
        let query = self.state.write().await.select_suggestion(index);
        self.begin_geocode(query)
    }

    /// Geocode typed text without going through a suggestion
    pub async fn submit_query(&self, text: &str) -> bool {
        let query = self.state.write().await.submit_query(text);
        self.begin_geocode(query)
    }

    fn begin_geocode(&self, query: Option<String>) -> bool {
        let Some(query) = query else {
            return false;
        };

        debug!("Geocoding \"{query}\"");

        // Not cancelled if another search starts, whichever response lands last wins
        let geocoder = self.geocoder.clone();
        let tx = self.events.0.clone();
        tokio::spawn(async move {
            let result = geocoder.resolve(&query).await;
            tx.send(FinderEvent::Geocoded { query, result }).ok();
        });

        self.state_update_sender.send_update();
        true
    }

    /// The map was panned to `center`
    pub async fn move_map(&self, center: Location) {
        if self.state.write().await.move_map(center) {
            self.state_update_sender.send_update();
        } else {
            warn!("Ignoring invalid map center {center:?}");
        }
    }

    /// Go back to filtering around the map center
    pub async fn clear_destination(&self) {
        self.state.write().await.clear_destination();
        self.state_update_sender.send_update();
    }

    /// Select a lot to show its details, returns false if the lot isn't in the catalog
    pub async fn select_lot(&self, id: LotId) -> bool {
        let selected = self.state.write().await.select_lot(id);
        if selected {
            self.state_update_sender.send_update();
        }
        selected
    }

    pub async fn dismiss_lot(&self) {
        self.state.write().await.dismiss_lot();
        self.state_update_sender.send_update();
    }

    pub async fn select_nav_app(&self, app: NavigationApp) {
        self.state.write().await.set_nav_app(app);
        self.state_update_sender.send_update();
    }

    pub async fn set_arrival(&self, arrival: UtcDT) {
        self.state.write().await.set_arrival(arrival);
        self.state_update_sender.send_update();
    }

    /// Hand-off URL for the selected lot, `None` if nothing is selected
    pub async fn directions_url(&self, apps: &impl AppAvailability) -> Option<String> {
        self.state.read().await.directions_url(apps)
    }

    fn consume_event(&self, state: &mut ViewState, event: FinderEvent) {
        match event {
            FinderEvent::Location(location) => {
                if !state.set_user_location(location) {
                    warn!("Location service sent an invalid location {location:?}");
                }
            }
            FinderEvent::LocationError(why) => {
                warn!("Location update failed: {why:?}");
            }
            FinderEvent::Suggestions(items) => {
                let count = items.len();
                if state.apply_suggestions(items) {
                    debug!("Got {count} suggestions");
                } else {
                    debug!("Dropping {count} suggestions, no query in progress");
                }
            }
            FinderEvent::SuggestionError(why) => {
                warn!("Autocomplete error: {why:?}");
                state.completions_failed();
            }
            FinderEvent::Geocoded { query, result } => {
                let location = match result {
                    Ok(Some(location)) => Some(location),
                    Ok(None) => {
                        warn!("No results for \"{query}\"");
                        None
                    }
                    Err(why) => {
                        warn!("Search for \"{query}\" failed: {why:?}");
                        None
                    }
                };

                if state.apply_geocode(location) {
                    let nearby = state.nearby_lots().count();
                    info!("Searched \"{query}\", {nearby} lots nearby");
                } else if let Some(location) = location {
                    warn!("Search for \"{query}\" returned an invalid coordinate {location:?}");
                }
            }
        }
    }

    async fn receive_events(rx: &mut EventRx) -> Vec<FinderEvent> {
        let mut buf = Vec::with_capacity(EVENT_BATCH);
        rx.recv_many(&mut buf, EVENT_BATCH).await;
        buf
    }

    async fn apply_events(&self, events: Vec<FinderEvent>) {
        let mut state = self.state.write().await;
        for event in events {
            self.consume_event(&mut state, event);
        }
        drop(state);
        self.state_update_sender.send_update();
    }

    /// Apply whatever is queued right now without waiting, returns how many events were applied
    #[cfg(test)]
    pub async fn process_pending(&self) -> usize {
        let mut rx = self.events.1.lock().await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        drop(rx);

        let count = events.len();
        if count > 0 {
            self.apply_events(events).await;
        }
        count
    }

    pub fn quit(&self) {
        self.cancel.cancel();
    }

    /// Main loop of the finder, applies provider events as they arrive until [Finder::quit]
    /// is called.
    pub async fn main_loop(&self) -> Result {
        let mut rx = self.events.1.lock().await;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                events = Self::receive_events(&mut rx) => {
                    if events.is_empty() {
                        // Every sender is gone, nothing more can arrive
                        break;
                    }
                    self.apply_events(events).await;
                }
            }
        }

        Ok(())
    }
}
