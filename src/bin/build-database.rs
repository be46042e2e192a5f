#[cfg(feature = "builder")]
#[path = "../../build/builder.rs"]
mod builder;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "build-database")]
#[command(about = "Download a GeoNames cities dump and write a geocity snapshot", long_about = None)]
struct Args {
    /// Snapshot file to write
    #[arg(default_value = "places.bin")]
    output: String,

    /// GeoNames dump to use: cities500, cities1000, cities5000 or cities15000
    #[arg(long, default_value = "cities1000")]
    dataset: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    #[cfg(not(feature = "builder"))]
    {
        let _ = args;
        eprintln!("Error: This binary requires the 'builder' feature.");
        eprintln!("Build with: cargo run --release --bin build-database --features builder");
        std::process::exit(1);
    }

    #[cfg(feature = "builder")]
    {
        use builder::Builder;

        Builder::new(&args.dataset).build(&args.output)?;
        println!("Database written to {}", args.output);
        Ok(())
    }
}
