use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use cleanair_service::breakpoints::{dominant_pollutant, overall_index, to_subindex};
use cleanair_service::category::{band_progress, classify};
use cleanair_service::config::{Config, DEFAULT_CONFIG_PATH};
use cleanair_service::dataset::{load_reference_csv, ReferencePointSet};
use cleanair_service::ingest::openaq::{latest_subindices, OpenAqClient};
use cleanair_service::logging::{self, init_logger, DataSource};
use cleanair_service::model::{Coordinate, Pollutant};
use cleanair_service::predict::SubIndexPredictor;
use cleanair_service::server::{self, AppState};

#[derive(Parser)]
#[command(name = "cleanair", version, about = "AQI sub-indices, categories and nearest reference cities")]
struct Cli {
    /// TOML configuration file; missing means defaults
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Convert one concentration into a sub-index and category
    Subindex {
        /// pm25, o3, no2 or co
        pollutant: Pollutant,
        /// Concentration in the pollutant's table unit
        #[arg(allow_negative_numbers = true)]
        concentration: f64,
    },
    /// Find the reference city closest to a coordinate
    Nearest {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
    },
    /// Fetch live OpenAQ measurements near a coordinate
    Live {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );
    logging::debug(
        DataSource::System,
        None,
        &format!("configuration loaded from {}", cli.config.display()),
    );

    match cli.command {
        Command::Serve => run_server(&config),
        Command::Subindex {
            pollutant,
            concentration,
        } => {
            print_subindex(pollutant, concentration);
            Ok(())
        }
        Command::Nearest { lat, lng } => print_nearest(&config, Coordinate::new(lat, lng)),
        Command::Live { lat, lng } => print_live(&config, Coordinate::new(lat, lng)),
    }
}

fn run_server(config: &Config) -> anyhow::Result<()> {
    // The API stays up without a dataset; /nearest-city then answers 503.
    let points = load_reference_csv(&config.dataset.path).unwrap_or_else(|e| {
        logging::error(DataSource::Dataset, None, &e.to_string());
        ReferencePointSet::default()
    });

    let state = AppState::new(points, Arc::new(SubIndexPredictor));
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime
        .block_on(server::serve(state, &config.server.bind))
        .with_context(|| format!("serving on {}", config.server.bind))
}

fn print_subindex(pollutant: Pollutant, concentration: f64) {
    print!("{}", subindex_report(pollutant, concentration));
}

fn subindex_report(pollutant: Pollutant, concentration: f64) -> String {
    let subindex = to_subindex(Some(concentration), pollutant);
    let category = classify(subindex);

    let mut out = match subindex {
        Some(value) => format!(
            "{} {} {} ({} average) -> AQI {} ({})\n",
            pollutant,
            concentration,
            pollutant.unit(),
            pollutant.averaging_window(),
            value,
            category
        ),
        None => format!(
            "{} {} {} is outside the supported range ({})\n",
            pollutant,
            concentration,
            pollutant.unit(),
            category
        ),
    };
    out.push_str(&format!("   {}\n", category.advisory()));

    if let Some(progress) = subindex.and_then(|v| band_progress(category, f64::from(v))) {
        out.push_str(&format!(
            "   {:.0} AQI points from {} ({:.0}% through the band)\n",
            progress.remaining, progress.next, progress.percent
        ));
    }
    out
}

fn print_nearest(config: &Config, at: Coordinate) -> anyhow::Result<()> {
    let points = load_reference_csv(&config.dataset.path)
        .with_context(|| format!("loading reference dataset {}", config.dataset.path.display()))?;
    let found = points.nearest(at)?;

    let aqi = found
        .point
        .aqi_value
        .map_or_else(|| "n/a".to_string(), |v| v.to_string());
    println!(
        "{}, {}: AQI {} ({}), {:.1} km away",
        found.point.city,
        found.point.country,
        aqi,
        found.point.category_label,
        found.distance_km
    );
    Ok(())
}

fn print_live(config: &Config, at: Coordinate) -> anyhow::Result<()> {
    let client = OpenAqClient::new(config.openaq.clone()).context("building HTTP client")?;
    let fetch = client.fetch_nearby(at);

    let Some(radius_m) = fetch.radius_used_m else {
        println!("No live measurements near {}", at);
        return Ok(());
    };
    println!(
        "{} measurements within {} km of {}",
        fetch.measurements.len(),
        radius_m / 1000,
        at
    );

    let subs = latest_subindices(&fetch.measurements);
    for (kind, value) in subs.iter() {
        match value {
            Some(v) => println!("   {:<5} AQI {:>3} ({})", kind.code(), v, classify(Some(v))),
            None => println!("   {:<5} n/a", kind.code()),
        }
    }

    let overall = overall_index(&subs);
    match (overall, dominant_pollutant(&subs)) {
        (Some(v), Some(kind)) => println!("Overall AQI {} ({}), driven by {}", v, classify(Some(v)), kind),
        _ => println!("Overall AQI unavailable"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cleanair").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_subindex_accepts_negative_concentration() {
        match parse(&["subindex", "pm25", "-5"]).command {
            Command::Subindex {
                pollutant,
                concentration,
            } => {
                assert_eq!(pollutant, Pollutant::Pm25);
                assert_eq!(concentration, -5.0);
            }
            _ => panic!("expected subindex"),
        }
    }

    #[test]
    fn test_negative_concentration_reports_unknown() {
        let report = subindex_report(Pollutant::Pm25, -5.0);
        assert!(report.starts_with("pm25 -5 µg/m³ is outside the supported range (Unknown)"), "{}", report);
        assert!(report.contains("Check local guidance."));
    }

    #[test]
    fn test_in_range_report_shows_window_and_progress() {
        let report = subindex_report(Pollutant::Pm25, 12.0);
        assert!(report.starts_with("pm25 12 µg/m³ (24h average) -> AQI 50 (Good)"), "{}", report);
        assert!(report.contains("1 AQI points from Moderate"), "{}", report);
    }

    #[test]
    fn test_subindex_rejects_unknown_pollutant() {
        let args = ["cleanair", "subindex", "so2", "3"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_nearest_and_live_accept_negative_coordinates() {
        match parse(&["nearest", "-33.87", "-70.65"]).command {
            Command::Nearest { lat, lng } => assert_eq!((lat, lng), (-33.87, -70.65)),
            _ => panic!("expected nearest"),
        }
        match parse(&["live", "-22.9", "-43.2"]).command {
            Command::Live { lat, lng } => assert_eq!((lat, lng), (-22.9, -43.2)),
            _ => panic!("expected live"),
        }
    }

    #[test]
    fn test_config_flag_defaults_and_overrides() {
        let cli = parse(&["serve"]);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(matches!(cli.command, Command::Serve));

        let cli = parse(&["--config", "/etc/cleanair.toml", "serve"]);
        assert_eq!(cli.config, PathBuf::from("/etc/cleanair.toml"));
    }
}
