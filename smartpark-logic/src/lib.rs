mod catalog;
mod finder;
mod handoff;
mod location;
mod providers;
mod proximity;
mod search;
mod settings;
mod view_state;

pub use catalog::{Catalog, LotId, ParkingLot};
pub use finder::{Finder, StateUpdateSender, UtcDT};
pub use handoff::{AppAvailability, GOOGLE_MAPS_SCHEME, NavigationApp, directions_url};
pub use location::{EARTH_RADIUS_METERS, Location, LocationComponent, MapRegion};
pub use providers::{Geocoder, Handler, LocationService, SuggestionService, UpdateHandler};
pub use proximity::{DEFAULT_RADIUS_METERS, filter_nearby, is_nearby};
pub use search::{SearchPhase, SearchState, SuggestionItem};
pub use settings::FinderSettings;
pub use view_state::{
    Annotation, AnnotationKind, FinderUiState, LotDetail, ViewState, describe_distance, format_rate,
};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
