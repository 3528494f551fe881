use std::{collections::HashSet, path::Path};

use anyhow::{anyhow, bail, ensure};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{location::Location, prelude::*};

pub type LotId = Uuid;

const BUNDLED_CATALOG: &str = include_str!("../data/static_parking_data.json");

/// A record as it appears in the catalog resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotRecord {
    id: LotId,
    name: String,
    address: String,
    latitude: f64,
    longitude: f64,
    hourly_rate: f64,
}

/// A parking lot from the catalog, never changes after being loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LotRecord", into = "LotRecord")]
pub struct ParkingLot {
    id: LotId,
    name: String,
    address: String,
    location: Location,
    hourly_rate: f64,
}

impl ParkingLot {
    pub fn new(
        id: LotId,
        name: impl Into<String>,
        address: impl Into<String>,
        location: Location,
        hourly_rate: f64,
    ) -> Result<Self> {
        ensure!(
            location.is_valid(),
            "Lot {id} has an invalid coordinate ({}, {})",
            location.lat,
            location.long
        );
        ensure!(
            hourly_rate.is_finite() && hourly_rate >= 0.0,
            "Lot {id} has an invalid hourly rate ({hourly_rate})"
        );

        Ok(Self {
            id,
            name: name.into(),
            address: address.into(),
            location,
            hourly_rate,
        })
    }

    pub fn id(&self) -> LotId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Cost per hour in dollars
    pub fn hourly_rate(&self) -> f64 {
        self.hourly_rate
    }
}

impl TryFrom<LotRecord> for ParkingLot {
    type Error = anyhow::Error;

    fn try_from(record: LotRecord) -> Result<Self> {
        Self::new(
            record.id,
            record.name,
            record.address,
            Location::new(record.latitude, record.longitude),
            record.hourly_rate,
        )
    }
}

impl From<ParkingLot> for LotRecord {
    fn from(lot: ParkingLot) -> Self {
        Self {
            id: lot.id,
            name: lot.name,
            address: lot.address,
            latitude: lot.location.lat,
            longitude: lot.location.long,
            hourly_rate: lot.hourly_rate,
        }
    }
}

/// The full set of parking lots known to the app.
///
/// Loaded once at startup and shared read-only afterwards. The fail-soft loaders
/// ([Catalog::bundled], [Catalog::load_file], [Catalog::load]) never error, a catalog
/// that can't be read or contains any bad record comes back empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    lots: Vec<ParkingLot>,
}

impl Catalog {
    pub fn new(lots: Vec<ParkingLot>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(lots.len());
        for lot in lots.iter() {
            if !seen.insert(lot.id) {
                bail!("Duplicate lot id {}", lot.id);
            }
        }
        Ok(Self { lots })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Strictly parse a catalog, any malformed record fails the whole thing
    pub fn from_json(raw: &str) -> Result<Self> {
        let lots = serde_json::from_str::<Vec<ParkingLot>>(raw).context("Malformed catalog")?;
        Self::new(lots)
    }

    fn or_empty(res: Result<Self>, source: &str) -> Self {
        match res {
            Ok(catalog) => {
                info!("Loaded {} parking lots from {source}", catalog.len());
                catalog
            }
            Err(why) => {
                warn!("Failed to load parking lots from {source}, continuing with none: {why:?}");
                Self::empty()
            }
        }
    }

    /// The dataset shipped with the app
    pub fn bundled() -> Self {
        Self::or_empty(Self::from_json(BUNDLED_CATALOG), "bundled dataset")
    }

    pub fn load_file(path: &Path) -> Self {
        let res = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|raw| Self::from_json(&raw));
        Self::or_empty(res, &path.display().to_string())
    }

    /// Load from `path` if given, the bundled dataset otherwise
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_file(path),
            None => Self::bundled(),
        }
    }

    pub fn lots(&self) -> &[ParkingLot] {
        &self.lots
    }

    pub fn get(&self, id: LotId) -> Option<&ParkingLot> {
        self.lots.iter().find(|lot| lot.id == id)
    }

    pub fn find(&self, id: LotId) -> Result<&ParkingLot> {
        self.get(id)
            .ok_or_else(|| anyhow!("No parking lot with id {id}"))
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}
