use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{Catalog, LotId, ParkingLot},
    handoff::{AppAvailability, NavigationApp, directions_url},
    location::{Location, LocationComponent, MapRegion},
    proximity::filter_nearby,
    search::{SearchPhase, SearchState, SuggestionItem},
    settings::FinderSettings,
};

/// Text shown for a lot's price
pub fn format_rate(hourly_rate: f64) -> String {
    format!("${hourly_rate:.2}/hr")
}

/// Text shown for how far the user is from `to`
pub fn describe_distance(from: Option<Location>, to: &Location) -> String {
    let Some(from) = from else {
        return "Location unknown".to_string();
    };

    let distance = from.distance_to(to);
    if distance > 1000.0 {
        format!("{:.1} km away", distance / 1000.0)
    } else {
        format!("{distance:.0} m away")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// A nearby parking lot
    Lot(LotId),
    /// Result of the last search
    Destination,
    /// The device's location
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A pin on the map
pub struct Annotation {
    pub kind: AnnotationKind,
    pub label: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Everything the detail sheet for a selected lot displays
pub struct LotDetail {
    pub lot: ParkingLot,
    pub rate_text: String,
    pub distance_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Snapshot of [ViewState] for the UI to render
pub struct FinderUiState {
    pub query: String,
    pub suggestions: Vec<SuggestionItem>,
    pub search_phase: SearchPhase,
    /// Completions for the current query haven't arrived yet
    pub awaiting_suggestions: bool,
    /// A geocode request is still out
    pub searching: bool,
    pub reference: Location,
    pub destination: Option<Location>,
    pub region: MapRegion,
    pub user_location: Option<Location>,
    pub nearby: Vec<ParkingLot>,
    pub annotations: Vec<Annotation>,
    pub selected: Option<LotDetail>,
    pub nav_app: NavigationApp,
    pub arrival: DateTime<Utc>,
}

/// All mutable state of the finder.
///
/// Only changed through the transition methods below, each of which keeps the
/// nearby lot list in sync with the reference point.
#[derive(Debug, Clone)]
pub struct ViewState {
    catalog: Arc<Catalog>,
    radius_meters: f64,
    map_span: LocationComponent,
    search: SearchState,
    destination: Option<Location>,
    geocodes_in_flight: usize,
    region: MapRegion,
    user_location: Option<Location>,
    nearby: Vec<LotId>,
    selected_lot: Option<LotId>,
    nav_app: NavigationApp,
    arrival: DateTime<Utc>,
}

impl ViewState {
    pub fn new(catalog: Arc<Catalog>, settings: &FinderSettings, arrival: DateTime<Utc>) -> Self {
        let mut state = Self {
            catalog,
            radius_meters: settings.radius_meters,
            map_span: settings.map_span_degrees,
            search: SearchState::default(),
            destination: None,
            geocodes_in_flight: 0,
            region: settings.initial_region(),
            user_location: None,
            nearby: Vec::new(),
            selected_lot: None,
            nav_app: NavigationApp::default(),
            arrival,
        };
        state.refresh_nearby();
        state
    }

    /// The searched destination if there is one, otherwise the center of the map
    pub fn reference_location(&self) -> Location {
        self.destination.unwrap_or(self.region.center)
    }

    fn refresh_nearby(&mut self) {
        let reference = self.reference_location();
        self.nearby = filter_nearby(self.catalog.lots(), &reference, self.radius_meters)
            .into_iter()
            .map(ParkingLot::id)
            .collect();
    }

    pub fn nearby_lots(&self) -> impl Iterator<Item = &ParkingLot> {
        self.nearby.iter().filter_map(|id| self.catalog.get(*id))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn destination(&self) -> Option<Location> {
        self.destination
    }

    pub fn region(&self) -> MapRegion {
        self.region
    }

    pub fn user_location(&self) -> Option<Location> {
        self.user_location
    }

    pub fn nav_app(&self) -> NavigationApp {
        self.nav_app
    }

    pub fn arrival(&self) -> DateTime<Utc> {
        self.arrival
    }

    pub fn searching(&self) -> bool {
        self.geocodes_in_flight > 0
    }

    pub fn update_query(&mut self, text: &str) {
        self.search.update_query(text);
    }

    pub fn apply_suggestions(&mut self, items: Vec<SuggestionItem>) -> bool {
        self.search.apply_suggestions(items)
    }

    pub fn completions_failed(&mut self) -> bool {
        self.search.completions_failed()
    }

    /// Pick a suggestion, returns the query that should be geocoded
    pub fn select_suggestion(&mut self, index: usize) -> Option<String> {
        let query = self.search.select(index)?;
        self.geocodes_in_flight += 1;
        Some(query)
    }

    /// Submit typed text as-is, returns the query that should be geocoded
    pub fn submit_query(&mut self, text: &str) -> Option<String> {
        let query = self.search.submit(text)?;
        self.geocodes_in_flight += 1;
        Some(query)
    }

    /// A geocode request finished, `None` if it failed or found nothing.
    ///
    /// Returns whether the destination changed. Failures and out-of-range results
    /// leave the previous reference point in place.
    pub fn apply_geocode(&mut self, result: Option<Location>) -> bool {
        self.geocodes_in_flight = self.geocodes_in_flight.saturating_sub(1);

        match result {
            Some(location) if location.is_valid() => {
                self.destination = Some(location);
                self.region = MapRegion::around(location, self.map_span);
                self.refresh_nearby();
                true
            }
            _ => false,
        }
    }

    /// Forget the searched destination, the map center becomes the reference again
    pub fn clear_destination(&mut self) {
        if self.destination.take().is_some() {
            self.refresh_nearby();
        }
    }

    /// The user panned the map
    pub fn move_map(&mut self, center: Location) -> bool {
        if !center.is_valid() {
            return false;
        }
        self.region.center = center;
        self.refresh_nearby();
        true
    }

    pub fn set_user_location(&mut self, location: Location) -> bool {
        if !location.is_valid() {
            return false;
        }
        self.user_location = Some(location);
        true
    }

    /// Select a lot from the catalog, replaces any current selection
    pub fn select_lot(&mut self, id: LotId) -> bool {
        if self.catalog.get(id).is_some() {
            self.selected_lot = Some(id);
            true
        } else {
            false
        }
    }

    pub fn dismiss_lot(&mut self) {
        self.selected_lot = None;
    }

    pub fn selected_lot(&self) -> Option<&ParkingLot> {
        self.selected_lot.and_then(|id| self.catalog.get(id))
    }

    pub fn set_nav_app(&mut self, app: NavigationApp) {
        self.nav_app = app;
    }

    pub fn set_arrival(&mut self, arrival: DateTime<Utc>) {
        self.arrival = arrival;
    }

    pub fn lot_detail(&self) -> Option<LotDetail> {
        self.selected_lot().map(|lot| LotDetail {
            lot: lot.clone(),
            rate_text: format_rate(lot.hourly_rate()),
            distance_text: describe_distance(self.user_location, &lot.location()),
        })
    }

    /// Hand-off URL to the selected lot with the chosen app
    pub fn directions_url(&self, apps: &impl AppAvailability) -> Option<String> {
        self.selected_lot()
            .map(|lot| directions_url(self.nav_app, &lot.location(), apps))
    }

    fn annotations(&self) -> Vec<Annotation> {
        let lots = self.nearby_lots().map(|lot| Annotation {
            kind: AnnotationKind::Lot(lot.id()),
            label: lot.name().to_string(),
            location: lot.location(),
        });

        let destination = self.destination.map(|location| Annotation {
            kind: AnnotationKind::Destination,
            label: "Destination".to_string(),
            location,
        });

        let user = self.user_location.map(|location| Annotation {
            kind: AnnotationKind::User,
            label: "You".to_string(),
            location,
        });

        lots.chain(destination).chain(user).collect()
    }

    pub fn as_ui_state(&self) -> FinderUiState {
        FinderUiState {
            query: self.search.query().to_string(),
            suggestions: self.search.suggestions().to_vec(),
            search_phase: self.search.phase(),
            awaiting_suggestions: self.search.awaiting_completions(),
            searching: self.searching(),
            reference: self.reference_location(),
            destination: self.destination,
            region: self.region,
            user_location: self.user_location,
            nearby: self.nearby_lots().cloned().collect(),
            annotations: self.annotations(),
            selected: self.lot_detail(),
            nav_app: self.nav_app,
            arrival: self.arrival,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    const DOWNTOWN: Location = Location::new(42.2808, -83.7430);
    const NORTH_CAMPUS: Location = Location::new(42.2922, -83.7175);

    fn mk_lot(name: &str, location: Location, rate: f64) -> ParkingLot {
        ParkingLot::new(Uuid::new_v4(), name, format!("{name} St"), location, rate)
            .expect("Invalid test lot")
    }

    fn mk_state() -> (ViewState, Vec<LotId>) {
        let lots = vec![
            mk_lot("Downtown", Location::new(42.2793, -83.7405), 2.4),
            mk_lot("North", Location::new(42.2925, -83.7170), 1.0),
            mk_lot("Far", Location::new(42.30, -83.70), 0.5),
        ];
        let ids = lots.iter().map(ParkingLot::id).collect();
        let catalog = Arc::new(Catalog::new(lots).expect("Bad catalog"));
        let arrival = Utc.with_ymd_and_hms(2025, 5, 24, 12, 0, 0).unwrap();
        (
            ViewState::new(catalog, &FinderSettings::default(), arrival),
            ids,
        )
    }

    fn nearby_names(state: &ViewState) -> Vec<&str> {
        state.nearby_lots().map(ParkingLot::name).collect()
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(2.4), "$2.40/hr");
        assert_eq!(format_rate(0.0), "$0.00/hr");
    }

    #[test]
    fn test_describe_distance() {
        assert_eq!(describe_distance(None, &DOWNTOWN), "Location unknown");
        assert_eq!(describe_distance(Some(DOWNTOWN), &DOWNTOWN), "0 m away");
        // Roughly 111 m per thousandth of a degree of latitude
        let short = Location::new(DOWNTOWN.lat + 0.003, DOWNTOWN.long);
        assert_eq!(describe_distance(Some(DOWNTOWN), &short), "334 m away");
        let long = Location::new(DOWNTOWN.lat + 0.02, DOWNTOWN.long);
        assert_eq!(describe_distance(Some(DOWNTOWN), &long), "2.2 km away");
    }

    #[test]
    fn test_initial_reference_is_map_center() {
        let (state, _) = mk_state();
        assert_eq!(state.reference_location(), DOWNTOWN);
        assert_eq!(nearby_names(&state), vec!["Downtown"]);
        assert!(!state.searching());
    }

    #[test]
    fn test_move_map() {
        let (mut state, _) = mk_state();
        assert!(state.move_map(NORTH_CAMPUS));
        assert_eq!(nearby_names(&state), vec!["North"]);

        assert!(!state.move_map(Location::new(f64::NAN, 0.0)));
        assert!(!state.move_map(Location::new(200.0, -83.7430)));
        assert_eq!(state.region().center, NORTH_CAMPUS);
    }

    #[test]
    fn test_destination_overrides_map() {
        let (mut state, _) = mk_state();
        state.update_query("north");
        state.apply_suggestions(vec![SuggestionItem::new("North Campus", "Ann Arbor, MI")]);
        let query = state.select_suggestion(0).expect("No query");
        assert_eq!(query, "North Campus Ann Arbor, MI");
        assert!(state.searching());
        assert!(state.search().suggestions().is_empty());

        assert!(state.apply_geocode(Some(NORTH_CAMPUS)));
        assert!(!state.searching());
        assert_eq!(state.reference_location(), NORTH_CAMPUS);
        assert_eq!(state.region(), MapRegion::around(NORTH_CAMPUS, 0.01));
        assert_eq!(nearby_names(&state), vec!["North"]);

        // Panning doesn't matter while a destination is set
        state.move_map(DOWNTOWN);
        assert_eq!(nearby_names(&state), vec!["North"]);

        state.clear_destination();
        assert_eq!(state.reference_location(), DOWNTOWN);
        assert_eq!(nearby_names(&state), vec!["Downtown"]);
    }

    #[test]
    fn test_failed_geocode_keeps_reference() {
        let (mut state, _) = mk_state();

        state.submit_query("somewhere");
        assert!(!state.apply_geocode(Some(Location::new(f64::INFINITY, 1.0))));
        assert_eq!(state.reference_location(), DOWNTOWN);

        state.submit_query("north campus");
        assert!(state.apply_geocode(Some(NORTH_CAMPUS)));

        state.submit_query("nowhere");
        assert!(!state.apply_geocode(None));
        state.submit_query("nowhere else");
        assert!(!state.apply_geocode(Some(Location::new(f64::NAN, f64::NAN))));
        state.submit_query("off the map");
        assert!(!state.apply_geocode(Some(Location::new(42.2808, -200.0))));
        assert_eq!(state.reference_location(), NORTH_CAMPUS);
        assert!(!state.searching());
    }

    #[test]
    fn test_select_lot() {
        let (mut state, ids) = mk_state();
        assert!(state.selected_lot().is_none());
        assert!(state.select_lot(ids[0]));
        assert!(state.select_lot(ids[2]));
        assert_eq!(state.selected_lot().map(ParkingLot::name), Some("Far"));

        assert!(!state.select_lot(Uuid::new_v4()));
        assert_eq!(state.selected_lot().map(ParkingLot::name), Some("Far"));

        state.dismiss_lot();
        assert!(state.selected_lot().is_none());
        assert!(state.lot_detail().is_none());
    }

    #[test]
    fn test_lot_detail() {
        let (mut state, ids) = mk_state();
        state.select_lot(ids[0]);
        let detail = state.lot_detail().expect("No detail");
        assert_eq!(detail.rate_text, "$2.40/hr");
        assert_eq!(detail.distance_text, "Location unknown");

        state.set_user_location(detail.lot.location());
        let detail = state.lot_detail().expect("No detail");
        assert_eq!(detail.distance_text, "0 m away");

        assert!(!state.set_user_location(Location::new(f64::NAN, 0.0)));
        assert_eq!(state.user_location(), Some(detail.lot.location()));
    }

    #[test]
    fn test_directions() {
        let (mut state, ids) = mk_state();
        let missing = |_: &str| false;
        assert_eq!(state.directions_url(&missing), None);

        state.select_lot(ids[0]);
        assert_eq!(
            state.directions_url(&missing).as_deref(),
            Some("http://maps.apple.com/?daddr=42.2793,-83.7405")
        );

        state.set_nav_app(NavigationApp::GoogleMaps);
        assert_eq!(
            state.directions_url(&missing).as_deref(),
            Some("https://www.google.com/maps/dir/?api=1&destination=42.2793,-83.7405")
        );
        assert_eq!(
            state.directions_url(&|_: &str| true).as_deref(),
            Some("comgooglemaps://?daddr=42.2793,-83.7405&directionsmode=driving")
        );
    }

    #[test]
    fn test_ui_state() {
        let (mut state, ids) = mk_state();
        state.set_user_location(DOWNTOWN);
        state.submit_query("north");
        state.apply_geocode(Some(NORTH_CAMPUS));
        state.select_lot(ids[1]);
        let arrival = Utc.with_ymd_and_hms(2025, 5, 25, 9, 30, 0).unwrap();
        state.set_arrival(arrival);

        let ui = state.as_ui_state();
        assert_eq!(ui.query, "north");
        assert_eq!(ui.search_phase, SearchPhase::Resolved);
        assert!(!ui.awaiting_suggestions);
        assert!(!ui.searching);
        assert_eq!(ui.reference, NORTH_CAMPUS);
        assert_eq!(ui.destination, Some(NORTH_CAMPUS));
        assert_eq!(ui.nearby.len(), 1);
        assert_eq!(ui.arrival, arrival);
        assert_eq!(ui.nav_app, NavigationApp::AppleMaps);
        assert_eq!(
            ui.annotations.iter().map(|a| a.kind).collect::<Vec<_>>(),
            vec![
                AnnotationKind::Lot(ids[1]),
                AnnotationKind::Destination,
                AnnotationKind::User
            ]
        );
        assert_eq!(ui.selected.map(|d| d.lot.id()), Some(ids[1]));
    }
}
