//! CLI interface for fare-lookup

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fare_lookup::{
    encode, estimate_fare, parse_duration, parse_journey_date, AdditionalInfo, AdditionalInfoFlag,
    Airline, DestinationCity, FormLimits, FormSession, PriceTable, Selections, SourceCity, Stops,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fare-lookup")]
#[command(about = "Flight fare estimates from a precomputed price table")]
#[command(version)]
pub struct Cli {
    /// Precomputed price table (CSV)
    #[arg(
        long,
        global = true,
        env = "FARE_TABLE_PATH",
        default_value = "predicted_flight_prices.csv"
    )]
    pub table: PathBuf,

    /// Directory for rolling log files
    #[arg(long, global = true, env = "FARE_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Log filter directive (e.g. info, fare_lookup=debug)
    #[arg(long, global = true, env = "FARE_LOG_LEVEL", default_value = "fare_lookup=info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill in the prediction form interactively
    Form,
    /// Look up a single fare from command-line selections
    Predict {
        #[command(flatten)]
        selections: SelectionArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the encoded feature record for the given selections
    Encode {
        #[command(flatten)]
        selections: SelectionArgs,
    },
    /// Summarize the price table
    Inspect,
}

#[derive(Args)]
pub struct SelectionArgs {
    /// Airline (e.g. "Air Asia", IndiGo)
    #[arg(short, long)]
    pub airline: String,
    /// Source city (Banglore, Chennai, Delhi, Kolkata, Mumbai)
    #[arg(short, long)]
    pub from: String,
    /// Destination city (Banglore, Cochin, Delhi, Hyderabad, Kolkata, "New Delhi")
    #[arg(short, long)]
    pub to: String,
    /// Number of stops ("Non-stop", "1 stop", ... or 0-4)
    #[arg(short, long, default_value = "Non-stop")]
    pub stops: String,
    /// Duration in minutes or as "2h 30m"
    #[arg(long, default_value = "300")]
    pub duration: String,
    /// Journey date (YYYY-MM-DD)
    #[arg(short, long, default_value = "2024-01-01")]
    pub date: String,
    /// Additional info flags (repeatable, e.g. --info red_eye_flight)
    #[arg(long = "info")]
    pub info: Vec<String>,
}

impl SelectionArgs {
    fn to_selections(&self, limits: &FormLimits) -> Result<Selections> {
        let additional_info = self
            .info
            .iter()
            .map(|flag| flag.parse::<AdditionalInfoFlag>())
            .collect::<Result<AdditionalInfo, _>>()?;

        Ok(Selections {
            airline: self.airline.parse::<Airline>()?,
            source: self.from.parse::<SourceCity>()?,
            destination: self.to.parse::<DestinationCity>()?,
            stops: self.stops.parse::<Stops>()?,
            duration_min: limits.check_duration(parse_duration(&self.duration)?)?,
            additional_info,
            journey_date: parse_journey_date(&self.date, limits)?,
        })
    }
}

/// Initialize logging to file so stdout stays free for the form
fn init_logging(log_dir: &Path, directive: &str) -> Result<()> {
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "fare-lookup.log");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json(),
        )
        .try_init()?;

    info!(log_dir = %log_dir.display(), "Logging initialized");
    Ok(())
}

fn load_table(path: &Path) -> Result<PriceTable> {
    PriceTable::load(path)
        .inspect_err(|e| error!(path = %path.display(), error = %e, "Failed to load price table"))
        .with_context(|| format!("cannot start without the price table at {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_dir, &cli.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        // Continue without logging rather than failing
    }

    let limits = FormLimits::default();

    match cli.command {
        Commands::Form => {
            let table = load_table(&cli.table)?;
            let stdin = io::stdin();
            let mut session = FormSession::with_limits(stdin.lock(), io::stdout(), limits);
            let submitted = session.run(&table)?;
            info!(submitted, "Form closed");
        }
        Commands::Predict { selections, json, output } => {
            let table = load_table(&cli.table)?;
            let selections = selections.to_selections(&limits)?;
            let estimate = estimate_fare(&table, &selections);

            if json || output.is_some() {
                let json = serde_json::to_string_pretty(&serde_json::json!({
                    "selections": selections,
                    "estimate": estimate,
                }))?;

                if let Some(output_file) = output {
                    fs::write(&output_file, &json)?;
                    println!("Results saved to {}", output_file);
                } else {
                    println!("{}", json);
                }
            }

            if !json {
                println!("{}", estimate);
            }
        }
        Commands::Encode { selections } => {
            let table = load_table(&cli.table)?;
            let selections = selections.to_selections(&limits)?;
            let record = encode(&selections, table.calendar());

            for (name, value) in record.features() {
                println!("{}={}", name, value);
            }
        }
        Commands::Inspect => {
            let table = load_table(&cli.table)?;
            let summary = table.summary();

            println!("Rows: {}", summary.rows);
            println!("Columns: {}", summary.columns);
            match (summary.min_price, summary.max_price) {
                (Some(min), Some(max)) => println!("Price range: ₹{:.2} - ₹{:.2}", min, max),
                _ => println!("Price range: n/a"),
            }
            println!("Months encoded: {:?}", summary.months);
            println!("Days encoded: {:?}", summary.days);
        }
    }

    Ok(())
}
