use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use geocity::types::utc_offset_str;
use geocity::{output, CoordinateInput, Geocoder, OutputMode, PopulationOrder, QueryOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geocity")]
#[command(about = "Find the nearest populated places for coordinates", long_about = None)]
struct Args {
    /// Gazetteer file: a GeoNames export (.csv) or a snapshot written by build-database
    #[arg(long, env = "GEOCITY_DATA", default_value = "places.bin")]
    data: PathBuf,

    /// Number of nearest places to return per coordinate
    #[arg(short, long, default_value_t = 1)]
    k: usize,

    /// Re-sort each coordinate's places by population (true: ascending, false: descending)
    #[arg(long)]
    ascending: Option<bool>,

    /// JSON output shape: rows or columns
    #[arg(long, default_value = "rows")]
    output: OutputMode,

    /// Print a human-readable summary instead of JSON
    #[arg(long)]
    text: bool,

    /// Coordinates as JSON: '[lat, lon]' or '[[lat, lon], [lat, lon], ...]'
    coordinates: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let geocoder = Geocoder::open(&args.data)?;
    let input = CoordinateInput::from_json(&args.coordinates)?;
    let options = QueryOptions {
        k: args.k,
        population_order: PopulationOrder::from_ascending(args.ascending),
    };
    let results = geocoder.query(&input, &options)?;

    if !args.text {
        let rendered = output::render(&results, args.output);
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    let now = Utc::now();
    for record in &results {
        let place = &record.place;
        match record.coord_index {
            Some(idx) => println!("[{}] {}", idx, place.name),
            None => println!("{}", place.name),
        }
        println!("  Country: {} ({})", place.country_name, place.country_code);
        println!("  Population: {}", place.population);
        match place.utc_offset_at(now) {
            Some(offset) => println!("  Timezone: {} ({})", place.timezone, utc_offset_str(offset)),
            None => println!("  Timezone: {}", place.timezone),
        }
        println!("  Coords: {}, {}", place.latitude, place.longitude);
        println!("  Distance: {:.5}", record.distance);
    }

    Ok(())
}
