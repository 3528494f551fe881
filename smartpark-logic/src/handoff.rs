use serde::{Deserialize, Serialize};

use crate::location::Location;

/// URL checked to see if the Google Maps app is installed
pub const GOOGLE_MAPS_SCHEME: &str = "comgooglemaps://";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// External app that gets handed the directions
pub enum NavigationApp {
    #[default]
    AppleMaps,
    GoogleMaps,
}

impl NavigationApp {
    pub const ALL: [Self; 2] = [Self::AppleMaps, Self::GoogleMaps];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AppleMaps => "Apple Maps",
            Self::GoogleMaps => "Google Maps",
        }
    }
}

/// Asks the platform whether a URL can be opened by some installed app
pub trait AppAvailability {
    fn can_open(&self, url: &str) -> bool;
}

impl<F: Fn(&str) -> bool> AppAvailability for F {
    fn can_open(&self, url: &str) -> bool {
        self(url)
    }
}

/// Build the URL that opens `app` with driving directions to `destination`.
///
/// Google Maps prefers the native app and falls back to the website when the
/// app's scheme can't be opened.
pub fn directions_url(
    app: NavigationApp,
    destination: &Location,
    apps: &impl AppAvailability,
) -> String {
    let Location { lat, long } = destination;
    match app {
        NavigationApp::AppleMaps => format!("http://maps.apple.com/?daddr={lat},{long}"),
        NavigationApp::GoogleMaps => {
            if apps.can_open(GOOGLE_MAPS_SCHEME) {
                format!("comgooglemaps://?daddr={lat},{long}&directionsmode=driving")
            } else {
                format!("https://www.google.com/maps/dir/?api=1&destination={lat},{long}")
            }
        }
    }
}
