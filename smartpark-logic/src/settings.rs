use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    location::{Location, LocationComponent, MapRegion},
    prelude::*,
    proximity::DEFAULT_RADIUS_METERS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Settings for the finder, all fields are optional when read from a file
pub struct FinderSettings {
    /// Lots further than this from the reference point are hidden
    pub radius_meters: f64,
    /// Where the map starts out, used as the reference point until a search completes
    pub initial_center: Location,
    /// Zoom of the map in degrees, the map is reset to this after every search
    pub map_span_degrees: LocationComponent,
    /// Read the catalog from here instead of the bundled dataset
    pub catalog_path: Option<PathBuf>,
}

impl FinderSettings {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&raw).context("Malformed settings")
    }

    pub fn initial_region(&self) -> MapRegion {
        MapRegion::around(self.initial_center, self.map_span_degrees)
    }
}

impl Default for FinderSettings {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_RADIUS_METERS,
            // Downtown Ann Arbor
            initial_center: Location::new(42.2808, -83.743),
            map_span_degrees: 0.01,
            catalog_path: None,
        }
    }
}
