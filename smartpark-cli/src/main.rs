use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::warn;
use smartpark_logic::{
    Catalog, Finder, FinderSettings, FinderUiState, Location, LotId, NavigationApp, ParkingLot,
    StateUpdateSender, describe_distance, format_rate, prelude::Result,
};
use smartpark_providers::{FixedLocation, NominatimClient, NominatimGeocoder, NominatimSuggestions};
use tokio::sync::mpsc;

const WAIT_TIMEOUT: Duration = Duration::from_secs(15);

struct UpdateSender(mpsc::UnboundedSender<()>);

impl StateUpdateSender for UpdateSender {
    fn send_update(&self) {
        self.0.send(()).ok();
    }
}

type CliFinder = Finder<FixedLocation, NominatimSuggestions, NominatimGeocoder, UpdateSender>;

fn parse_location(raw: &str) -> Result<Location, String> {
    let (lat, long) = raw
        .split_once(',')
        .ok_or_else(|| format!("Expected LAT,LONG but got \"{raw}\""))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Bad latitude: {e}"))?;
    let long = long
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("Bad longitude: {e}"))?;
    let location = Location::new(lat, long);
    if location.is_valid() {
        Ok(location)
    } else {
        Err(format!("{lat},{long} is not a valid coordinate"))
    }
}

#[derive(Parser)]
/// Find parking lots near where you're going
struct Cli {
    /// JSON file with finder settings
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Catalog to read instead of the bundled one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Only show lots within this many meters
    #[arg(long)]
    radius: Option<f64>,

    /// Your current position as LAT,LONG
    #[arg(long, value_parser = parse_location, allow_hyphen_values = true)]
    position: Option<Location>,

    /// When you plan to arrive, as an RFC 3339 timestamp
    #[arg(long)]
    arrive: Option<DateTime<Utc>>,

    /// Print the full finder state as JSON instead of a summary
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NavigationAppValue {
    Apple,
    Google,
}

impl From<NavigationAppValue> for NavigationApp {
    fn from(value: NavigationAppValue) -> Self {
        match value {
            NavigationAppValue::Apple => NavigationApp::AppleMaps,
            NavigationAppValue::Google => NavigationApp::GoogleMaps,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List every lot in the catalog
    List,
    /// List lots near a point on the map
    Nearby {
        /// Map center as LAT,LONG, defaults to the configured starting point
        #[arg(value_parser = parse_location, allow_hyphen_values = true)]
        center: Option<Location>,
    },
    /// Show address completions for a partial search
    Suggest {
        /// What's been typed so far
        fragment: String,
    },
    /// Search for a destination and list lots near it
    Search {
        /// Destination to search for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Use the nth address completion instead of searching the raw text
        #[arg(long)]
        pick: Option<usize>,
    },
    /// Get a link that opens directions to a lot
    Directions {
        /// ID of the lot
        lot: LotId,
        /// App to open
        #[arg(long, value_enum, default_value_t = NavigationAppValue::Apple)]
        app: NavigationAppValue,
        /// Whether the Google Maps app is installed
        #[arg(long)]
        google_maps_installed: bool,
    },
}

fn print_lot(lot: &ParkingLot, position: Option<Location>) {
    println!("{} ({})", lot.name(), lot.id());
    println!("    {}", lot.address());
    println!(
        "    {}, {}",
        format_rate(lot.hourly_rate()),
        describe_distance(position, &lot.location())
    );
}

fn print_state(ui: &FinderUiState, json: bool) -> Result {
    if json {
        let raw = serde_json::to_string_pretty(ui).context("Failed to serialize state")?;
        println!("{raw}");
        return Ok(());
    }

    if let Some(destination) = ui.destination {
        println!("Destination: {},{}", destination.lat, destination.long);
    }

    if ui.nearby.is_empty() {
        println!("No parking nearby");
    }
    for lot in ui.nearby.iter() {
        print_lot(lot, ui.user_location);
    }
    Ok(())
}

/// Wait until `done` holds for the finder's state, `None` on timeout
async fn wait_for(
    finder: &CliFinder,
    updates: &mut mpsc::UnboundedReceiver<()>,
    done: impl Fn(&FinderUiState) -> bool,
) -> Option<FinderUiState> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let ui = finder.get_ui_state().await;
            if done(&ui) || updates.recv().await.is_none() {
                break ui;
            }
        }
    })
    .await
    .ok()
}

async fn run(
    cli: Cli,
    finder: &CliFinder,
    catalog: &Catalog,
    updates: &mut mpsc::UnboundedReceiver<()>,
) -> Result {
    let has_position = cli.position.is_some();
    wait_for(finder, updates, |ui| {
        !has_position || ui.user_location.is_some()
    })
    .await;

    if let Some(arrival) = cli.arrive {
        finder.set_arrival(arrival).await;
    }

    match cli.command {
        Commands::List => {
            for lot in catalog.lots() {
                print_lot(lot, cli.position);
            }
        }
        Commands::Nearby { center } => {
            if let Some(center) = center {
                finder.move_map(center).await;
            }
            print_state(&finder.get_ui_state().await, cli.json)?;
        }
        Commands::Suggest { fragment } => {
            finder.update_query(&fragment).await;
            let ui = wait_for(finder, updates, |ui| !ui.awaiting_suggestions)
                .await
                .context("Timed out waiting for suggestions")?;
            if cli.json {
                print_state(&ui, true)?;
            } else if ui.suggestions.is_empty() {
                println!("No suggestions for \"{fragment}\"");
            } else {
                for (i, item) in ui.suggestions.iter().enumerate() {
                    println!("[{i}] {}", item.title);
                    println!("    {}", item.subtitle);
                }
            }
        }
        Commands::Search { query, pick } => {
            let query = query.join(" ");
            let started = if let Some(index) = pick {
                finder.update_query(&query).await;
                let ui = wait_for(finder, updates, |ui| !ui.awaiting_suggestions)
                    .await
                    .context("Timed out waiting for suggestions")?;
                if ui.suggestions.len() <= index {
                    bail!("No suggestion at position {index}");
                }
                finder.select_suggestion(index).await
            } else {
                finder.submit_query(&query).await
            };

            if !started {
                bail!("Nothing to search for");
            }

            let ui = wait_for(finder, updates, |ui| !ui.searching)
                .await
                .context("Search timed out")?;
            if ui.destination.is_none() {
                println!("Couldn't find \"{}\"", ui.query);
            }
            print_state(&ui, cli.json)?;
        }
        Commands::Directions {
            lot,
            app,
            google_maps_installed,
        } => {
            catalog.find(lot)?;
            finder.select_lot(lot).await;
            finder.select_nav_app(app.into()).await;

            let ui = finder.get_ui_state().await;
            if cli.json {
                print_state(&ui, true)?;
            } else if let Some(detail) = ui.selected {
                println!("{}", detail.lot.name());
                println!("    {}", detail.lot.address());
                println!("    {}, {}", detail.rate_text, detail.distance_text);
                let arrival = ui.arrival.with_timezone(&Local);
                println!("    Arriving {}", arrival.format("%a %b %-d, %-I:%M %p"));
            }

            let url = finder
                .directions_url(&|_: &str| google_maps_installed)
                .await
                .context("No lot selected")?;
            println!("{url}");
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    let mut settings = match cli.settings.as_deref() {
        Some(path) => FinderSettings::from_json_file(path)?,
        None => FinderSettings::default(),
    };
    if let Some(catalog) = cli.catalog.clone() {
        settings.catalog_path = Some(catalog);
    }
    if let Some(radius) = cli.radius {
        settings.radius_meters = radius;
    }

    let catalog = Arc::new(Catalog::load(settings.catalog_path.as_deref()));

    let client = NominatimClient::new()?;
    let (tx, mut updates) = mpsc::unbounded_channel();
    let finder = Arc::new(CliFinder::new(
        catalog.clone(),
        &settings,
        FixedLocation::new(cli.position),
        NominatimSuggestions::new(client.clone()),
        NominatimGeocoder::new(client),
        UpdateSender(tx),
    ));

    if let Err(why) = finder.start() {
        warn!("Continuing without location: {why:?}");
    }

    let main_loop = tokio::spawn({
        let finder = finder.clone();
        async move { finder.main_loop().await }
    });

    let res = run(cli, &finder, &catalog, &mut updates).await;

    finder.quit();
    main_loop.await.context("Finder loop panicked")??;

    res
}
