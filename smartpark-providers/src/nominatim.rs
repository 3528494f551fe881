use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::debug;
use reqwest::Url;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use smartpark_logic::{
    Geocoder, Handler, Location, SuggestionItem, SuggestionService, prelude::*,
};

const fn nominatim_host() -> &'static str {
    if let Some(host) = option_env!("NOMINATIM_HOST") {
        host
    } else {
        "nominatim.openstreetmap.org"
    }
}

const fn nominatim_secure() -> bool {
    if let Some(secure) = option_env!("NOMINATIM_SECURE") {
        const_str::eq_ignore_ascii_case!(secure, "true") || const_str::equal!(secure, "1")
    } else {
        true
    }
}

const fn nominatim_proto() -> &'static str {
    if nominatim_secure() { "https" } else { "http" }
}

const NOMINATIM_HOST: &str = nominatim_host();
const NOMINATIM_PROTO: &str = nominatim_proto();

const SEARCH_URL: &str = const_str::concat!(NOMINATIM_PROTO, "://", NOMINATIM_HOST, "/search");
const USER_AGENT: &str = const_str::concat!("smartpark/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a fragment has to sit unchanged before it's sent off
const DEBOUNCE: Duration = Duration::from_millis(300);
const SUGGESTION_LIMIT: usize = 5;

/// A single search result
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub name: Option<String>,
    pub display_name: String,
}

impl NominatimPlace {
    pub fn location(&self) -> Result<Location> {
        let lat = self
            .lat
            .parse()
            .with_context(|| format!("Bad latitude \"{}\"", self.lat))?;
        let long = self
            .lon
            .parse()
            .with_context(|| format!("Bad longitude \"{}\"", self.lon))?;
        Ok(Location::new(lat, long))
    }

    /// Split into a short title and the rest of the address
    pub fn suggestion(&self) -> SuggestionItem {
        let title = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self
                .display_name
                .split(',')
                .next()
                .unwrap_or_default()
                .trim(),
        };

        let subtitle = self
            .display_name
            .strip_prefix(title)
            .map(|rest| rest.trim_start_matches(',').trim())
            .unwrap_or(self.display_name.as_str());

        SuggestionItem::new(title, subtitle)
    }
}

fn search_url(query: &str, limit: usize) -> Result<Url> {
    let limit = limit.to_string();
    Url::parse_with_params(
        SEARCH_URL,
        &[
            ("q", query),
            ("format", "jsonv2"),
            ("limit", limit.as_str()),
        ],
    )
    .context("Failed to build search URL")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parse_places(body: &str) -> Result<Vec<NominatimPlace>> {
    serde_json::from_str(body).context("Malformed search response")
}

/// HTTP client for a Nominatim server
#[derive(Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<NominatimPlace>> {
        let url = search_url(query, limit)?;
        let body = self
            .client
            .get(url)
            .send()
            .await
            .context("Could not send request")?
            .error_for_status()
            .context("Server returned error")?
            .text()
            .await
            .context("Failed to read response")?;
        parse_places(&body)
    }
}

/// Geocoder backed by Nominatim's free text search
#[derive(Clone)]
pub struct NominatimGeocoder {
    client: NominatimClient,
}

impl NominatimGeocoder {
    pub fn new(client: NominatimClient) -> Self {
        Self { client }
    }
}

impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, query: &str) -> Result<Option<Location>> {
        let places = self.client.search(query, 1).await?;
        places.first().map(NominatimPlace::location).transpose()
    }
}

/// Address completion backed by Nominatim.
///
/// Each new fragment cancels the request for the previous one, and requests only go
/// out once the fragment has settled for a short while.
pub struct NominatimSuggestions {
    client: NominatimClient,
    handler: Mutex<Option<Handler<Vec<SuggestionItem>>>>,
    in_flight: Mutex<CancellationToken>,
}

impl NominatimSuggestions {
    pub fn new(client: NominatimClient) -> Self {
        Self {
            client,
            handler: Mutex::new(None),
            in_flight: Mutex::new(CancellationToken::new()),
        }
    }

    async fn complete(client: &NominatimClient, fragment: &str) -> Result<Vec<SuggestionItem>> {
        tokio::time::sleep(DEBOUNCE).await;
        let places = client.search(fragment, SUGGESTION_LIMIT).await?;
        Ok(places.iter().map(NominatimPlace::suggestion).collect())
    }
}

impl SuggestionService for NominatimSuggestions {
    fn subscribe(&self, handler: Handler<Vec<SuggestionItem>>) {
        *lock(&self.handler) = Some(handler);
    }

    fn set_query_fragment(&self, fragment: &str) {
        let cancel = CancellationToken::new();
        let previous = std::mem::replace(&mut *lock(&self.in_flight), cancel.clone());
        previous.cancel();

        let Some(handler) = lock(&self.handler).clone() else {
            debug!("Dropping fragment, nothing subscribed");
            return;
        };

        let fragment = fragment.trim().to_string();
        if fragment.is_empty() {
            handler.on_update(Vec::new());
            return;
        }

        let client = self.client.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Superseded before completing \"{fragment}\"");
                }
                res = Self::complete(&client, &fragment) => match res {
                    Ok(items) => handler.on_update(items),
                    Err(why) => handler.on_error(why),
                }
            }
        });
    }
}
