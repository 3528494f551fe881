use log::debug;
use smartpark_logic::{Handler, Location, LocationService, prelude::*};

/// A location service for devices without a GPS, always reports the same spot
pub struct FixedLocation(Option<Location>);

impl FixedLocation {
    pub fn new(location: Option<Location>) -> Self {
        Self(location)
    }
}

impl LocationService for FixedLocation {
    fn start_updates(&self, handler: Handler<Location>) -> Result {
        match self.0 {
            Some(location) => handler.on_update(location),
            None => debug!("No fixed location set, location updates will never arrive"),
        }
        Ok(())
    }
}
