mod location;
mod nominatim;

pub use location::FixedLocation;
pub use nominatim::{NominatimClient, NominatimGeocoder, NominatimPlace, NominatimSuggestions};
