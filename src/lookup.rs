//! Exact-match price lookup against the precomputed table

use crate::encoder::FeatureRecord;
use crate::table::PriceTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

/// Set bits of a one-hot indicator group, bit `i` for column `i`.
///
/// Table rows are decoded into masks without assuming they are well formed,
/// so a row with no indicator set (or several) simply never equals a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndicatorMask(u32);

impl IndicatorMask {
    pub fn single(index: usize) -> Self {
        Self(1 << index)
    }

    pub fn from_indicators(indicators: impl IntoIterator<Item = bool>) -> Self {
        let bits = indicators
            .into_iter()
            .enumerate()
            .filter(|(_, set)| *set)
            .fold(0u32, |acc, (i, _)| acc | (1 << i));
        Self(bits)
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_set(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }
}

/// Dimensions a table row is matched on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchKey {
    pub airline: IndicatorMask,
    pub source: IndicatorMask,
    pub destination: IndicatorMask,
    pub total_stops: f64,
    pub duration_min: f64,
}

impl From<&FeatureRecord> for MatchKey {
    fn from(record: &FeatureRecord) -> Self {
        Self {
            airline: record.airline_mask(),
            source: record.source_mask(),
            destination: record.destination_mask(),
            total_stops: f64::from(record.total_stops),
            duration_min: f64::from(record.duration_min),
        }
    }
}

/// Outcome of a single lookup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Estimate {
    Found { price: f64 },
    NotFound,
}

impl Estimate {
    pub fn price(&self) -> Option<f64> {
        match self {
            Estimate::Found { price } => Some(*price),
            Estimate::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Estimate::Found { .. })
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimate::Found { price } => write!(f, "Predicted Flight Price: ₹{:.2}", price),
            Estimate::NotFound => f.write_str("No matching flight details found."),
        }
    }
}

impl PriceTable {
    /// Find the price of the first row whose airline, source and destination
    /// indicator groups, `Total_Stops` and `Duration_min` equal the record's.
    ///
    /// Whole indicator groups are compared. Earlier versions of the form only
    /// compared the `Airline_Air Asia`, `Source_Banglore` and
    /// `Destination_Banglore` columns whatever the selection was, which let a
    /// query match rows for a different airline or route. Month, day,
    /// additional-info and `Len_Route` columns are not part of the key.
    #[instrument(level = "info", skip(self, record), fields(rows = self.len()))]
    pub fn lookup(&self, record: &FeatureRecord) -> Estimate {
        let key = MatchKey::from(record);
        debug!(
            airline = %record.airline,
            source = %record.source,
            destination = %record.destination,
            total_stops = record.total_stops,
            duration_min = record.duration_min,
            "Searching price table"
        );

        match self.rows().iter().position(|row| row.key == key) {
            Some(index) => {
                let price = self.rows()[index].price;
                info!(row = index, price, "Matched price table row");
                Estimate::Found { price }
            }
            None => {
                info!("No price table row matched");
                Estimate::NotFound
            }
        }
    }
}
