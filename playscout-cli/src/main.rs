//! PlayScout command-line interface.
//!
//! Resolves one viewport against the public Overpass mirrors (and
//! optionally the local points backend) and prints the merged results.

use clap::Parser;
use tracing::info;

use playscout::{
    FetchConfig, FilterSet, GeoPoint, PlaygroundService, PointRecord, ReqwestClient, Source,
    Viewport,
};

#[derive(Parser, Debug)]
#[command(name = "playscout", version, about = "Find playgrounds around a map position")]
struct Args {
    /// Center latitude in degrees.
    #[arg(long)]
    lat: f64,

    /// Center longitude in degrees.
    #[arg(long)]
    lon: f64,

    /// Map zoom level (mutually exclusive with --radius).
    #[arg(long, default_value_t = 15, conflicts_with = "radius")]
    zoom: u8,

    /// Explicit search radius in meters.
    #[arg(long)]
    radius: Option<f64>,

    /// Feature tag filter, e.g. `playground:slide` (repeatable).
    #[arg(long = "feature")]
    features: Vec<String>,

    /// Require a surface value, e.g. `sand`.
    #[arg(long)]
    surface: Option<String>,

    /// Require a minimum rating (1-5).
    #[arg(long)]
    min_rating: Option<f64>,

    /// Local points backend base URL.
    #[arg(long)]
    backend: Option<String>,

    /// Override the mirror list (repeatable, priority order).
    #[arg(long = "mirror")]
    mirrors: Vec<String>,

    /// Print records as JSON lines instead of a table.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    playscout::telemetry::init_logging();
    let args = Args::parse();

    let center = GeoPoint::new(args.lat, args.lon)?;
    let viewport = match args.radius {
        Some(radius) => Viewport::with_radius(center, radius)?,
        None => Viewport::at_zoom(center, args.zoom),
    };

    let mut filters = FilterSet::default();
    for feature in &args.features {
        filters.set_feature(feature.clone(), "yes");
    }
    if let Some(surface) = &args.surface {
        filters.set_surface(surface.clone());
    }
    if let Some(rating) = args.min_rating {
        filters.set_min_rating(rating);
    }

    let mut config = FetchConfig::default();
    if !args.mirrors.is_empty() {
        config = config.with_mirrors(args.mirrors.clone());
    }

    let mut service = PlaygroundService::new(ReqwestClient::new()?, config);
    if let Some(backend) = &args.backend {
        service = service.with_backend(backend.clone());
    }

    let batch = service.resolve_merged(viewport, &filters).await;
    info!(count = batch.items.len(), "resolution complete");

    if args.json {
        for record in &batch.items {
            println!("{}", record_json(record));
        }
    } else {
        print_table(&batch.items);
    }

    let snapshot = service.fetcher().metrics().snapshot();
    if snapshot.mirror_failures > 0 {
        info!(
            attempts = snapshot.mirror_attempts,
            failures = snapshot.mirror_failures,
            subdivisions = snapshot.subdivisions,
            "upstream degraded during fetch"
        );
    }
    Ok(())
}

fn record_json(record: &PointRecord) -> String {
    serde_json::json!({
        "source": match record.source {
            Source::Osm => "osm",
            Source::Backend => "backend",
        },
        "id": record.id,
        "name": record.name,
        "lat": record.lat,
        "lon": record.lon,
        "rating": record.rating,
        "tags": record.tags,
    })
    .to_string()
}

fn print_table(records: &[PointRecord]) {
    if records.is_empty() {
        println!("No playgrounds found in this area.");
        return;
    }
    for record in records {
        let source = match record.source {
            Source::Osm => "osm",
            Source::Backend => "backend",
        };
        let name = record.name.as_deref().unwrap_or("(unnamed)");
        let rating = record
            .rating
            .map(|r| format!(" [{r:.1}]"))
            .unwrap_or_default();
        println!(
            "{source:>7}  {:>9.5} {:>10.5}  {name}{rating}",
            record.lat, record.lon
        );
    }
    println!("{} result(s)", records.len());
}
