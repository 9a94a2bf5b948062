//! # Fare Lookup Library
//!
//! Flight fare estimates served from a precomputed price table. The form's
//! selections are one-hot encoded into the feature record the table was
//! built from, and the price of the first row with the same airline, route,
//! stop count and duration is returned.

pub mod categories;
pub mod encoder;
pub mod form;
pub mod lookup;
pub mod table;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

// Re-export main types for convenience
pub use categories::{AdditionalInfoFlag, Airline, DestinationCity, SourceCity, Stops};
pub use encoder::{encode, CalendarSchema, FeatureRecord};
pub use form::{parse_duration, parse_journey_date, FormLimits, FormSession};
pub use lookup::{Estimate, IndicatorMask, MatchKey};
pub use table::{PriceTable, TableRow, TableSummary};

/// Error types for the fare lookup library
#[derive(Error, Debug)]
pub enum FareError {
    #[error("Failed to open price table {path}: {source}")]
    TableIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV decoding failed: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Price table is missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column {column} on line {line}")]
    InvalidCell { line: u64, column: String, value: String },

    #[error("Unknown {kind}: {value}")]
    UnknownCategory { kind: &'static str, value: String },

    #[error("Invalid date format: {0}")]
    DateParseError(String),

    #[error("Journey date {date} is outside {earliest}..={latest}")]
    DateOutOfRange {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    #[error("Invalid duration format: {0}")]
    DurationParseError(String),

    #[error("Duration {minutes} min is outside {min}..={max}")]
    DurationOutOfRange { minutes: u32, min: u32, max: u32 },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Additional-info checkboxes, one bit per flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdditionalInfo {
    flags: [bool; AdditionalInfoFlag::COUNT],
}

impl AdditionalInfo {
    pub fn with(mut self, flag: AdditionalInfoFlag) -> Self {
        self.set(flag, true);
        self
    }

    pub fn set(&mut self, flag: AdditionalInfoFlag, value: bool) {
        self.flags[flag.index()] = value;
    }

    pub fn is_set(&self, flag: AdditionalInfoFlag) -> bool {
        self.flags[flag.index()]
    }

    /// Flags currently checked, in column order
    pub fn enabled(&self) -> impl Iterator<Item = AdditionalInfoFlag> + '_ {
        AdditionalInfoFlag::ALL.iter().copied().filter(|flag| self.is_set(*flag))
    }
}

impl FromIterator<AdditionalInfoFlag> for AdditionalInfo {
    fn from_iter<I: IntoIterator<Item = AdditionalInfoFlag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), Self::with)
    }
}

/// Everything the user picks on the form for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    pub airline: Airline,
    pub source: SourceCity,
    pub destination: DestinationCity,
    pub stops: Stops,
    pub duration_min: u32,
    pub additional_info: AdditionalInfo,
    pub journey_date: NaiveDate,
}

impl Selections {
    /// Selections with every additional-info checkbox cleared
    pub fn new(
        airline: Airline,
        source: SourceCity,
        destination: DestinationCity,
        stops: Stops,
        duration_min: u32,
        journey_date: NaiveDate,
    ) -> Self {
        Self {
            airline,
            source,
            destination,
            stops,
            duration_min,
            additional_info: AdditionalInfo::default(),
            journey_date,
        }
    }
}

/// Encode the selections against the table's calendar and look up a price
#[instrument(level = "info", skip(table, selections))]
pub fn estimate_fare(table: &PriceTable, selections: &Selections) -> Estimate {
    let record = encode(selections, table.calendar());
    table.lookup(&record)
}
