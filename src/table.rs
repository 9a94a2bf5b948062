//! Precomputed price table
//!
//! The table is a CSV written by the offline training notebook: a header of
//! feature names followed by one row per known itinerary, with the model's
//! output in `Predicted_Price`. It is loaded once at startup and never
//! mutated afterwards; callers share it by reference.

use crate::categories::{Airline, DestinationCity, SourceCity};
use crate::encoder::{CalendarSchema, DURATION_COLUMN, TOTAL_STOPS_COLUMN};
use crate::lookup::{IndicatorMask, MatchKey};
use crate::FareError;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, instrument};

pub const PRICE_COLUMN: &str = "Predicted_Price";

/// A single precomputed itinerary
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub key: MatchKey,
    pub price: f64,
}

/// Read-only collection of precomputed prices
#[derive(Debug, Clone)]
pub struct PriceTable {
    rows: Vec<TableRow>,
    columns: Vec<String>,
    calendar: CalendarSchema,
}

/// Overview printed by `fare-lookup inspect`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: usize,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub months: Vec<u32>,
    pub days: Vec<u32>,
}

/// Column positions of the match-relevant dimensions
struct ColumnLayout {
    airline: Vec<usize>,
    source: Vec<usize>,
    destination: Vec<usize>,
    total_stops: usize,
    duration: usize,
    price: usize,
}

impl ColumnLayout {
    fn resolve(headers: &[String]) -> Result<Self, FareError> {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let require = |name: &str| -> Result<usize, FareError> {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| FareError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            airline: Airline::ALL.iter().map(|a| require(&a.column())).collect::<Result<_, _>>()?,
            source: SourceCity::ALL.iter().map(|s| require(&s.column())).collect::<Result<_, _>>()?,
            destination: DestinationCity::ALL
                .iter()
                .map(|d| require(&d.column()))
                .collect::<Result<_, _>>()?,
            total_stops: require(TOTAL_STOPS_COLUMN)?,
            duration: require(DURATION_COLUMN)?,
            price: require(PRICE_COLUMN)?,
        })
    }
}

/// Accessor for the cells of one CSV record, reporting the failing cell.
struct RowCells<'a> {
    record: &'a csv::StringRecord,
    headers: &'a [String],
    line: u64,
}

impl RowCells<'_> {
    fn invalid(&self, column: usize, value: &str) -> FareError {
        FareError::InvalidCell {
            line: self.line,
            column: self.headers[column].clone(),
            value: value.to_string(),
        }
    }

    fn raw(&self, column: usize) -> &str {
        self.record.get(column).unwrap_or("").trim()
    }

    fn number(&self, column: usize) -> Result<f64, FareError> {
        let value = self.raw(column);
        value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| self.invalid(column, value))
    }

    fn indicator(&self, column: usize) -> Result<bool, FareError> {
        let value = self.raw(column);
        match value {
            "1" | "1.0" | "True" | "true" | "TRUE" => Ok(true),
            "0" | "0.0" | "False" | "false" | "FALSE" => Ok(false),
            _ => Err(self.invalid(column, value)),
        }
    }

    fn mask(&self, columns: &[usize]) -> Result<IndicatorMask, FareError> {
        let indicators = columns
            .iter()
            .map(|&column| self.indicator(column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndicatorMask::from_indicators(indicators))
    }
}

impl PriceTable {
    /// Load the table from a CSV file on disk
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FareError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FareError::TableIo {
            path: path.display().to_string(),
            source,
        })?;

        let start_time = std::time::Instant::now();
        let table = Self::from_reader(BufReader::new(file))?;
        info!(
            rows = table.len(),
            columns = table.columns.len(),
            duration_ms = start_time.elapsed().as_millis(),
            "Price table loaded"
        );

        Ok(table)
    }

    /// Decode a table from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FareError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        let layout = ColumnLayout::resolve(&columns)?;
        let calendar = CalendarSchema::from_columns(columns.iter().map(String::as_str));
        debug!(columns = columns.len(), "Resolved price table columns");

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cells = RowCells {
                record: &record,
                headers: &columns,
                line: record.position().map_or(0, |p| p.line()),
            };

            rows.push(TableRow {
                key: MatchKey {
                    airline: cells.mask(&layout.airline)?,
                    source: cells.mask(&layout.source)?,
                    destination: cells.mask(&layout.destination)?,
                    total_stops: cells.number(layout.total_stops)?,
                    duration_min: cells.number(layout.duration)?,
                },
                price: cells.number(layout.price)?,
            });
        }

        Ok(Self { rows, columns, calendar })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Months and days the table carries indicator columns for
    pub fn calendar(&self) -> &CalendarSchema {
        &self.calendar
    }

    pub fn summary(&self) -> TableSummary {
        let prices = self.rows.iter().map(|row| row.price);
        TableSummary {
            rows: self.rows.len(),
            columns: self.columns.len(),
            min_price: prices.clone().reduce(f64::min),
            max_price: prices.reduce(f64::max),
            months: self.calendar.months().collect(),
            days: self.calendar.days().collect(),
        }
    }
}
