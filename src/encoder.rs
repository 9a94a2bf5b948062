//! Feature encoding for fare lookups
//!
//! Maps a set of form selections onto the named feature record the price
//! table was built from: one indicator column per airline, source city,
//! destination city, additional-info flag, month and day-of-month, plus the
//! ordinal and numeric columns (`Total_Stops`, `Duration_min`, `Len_Route`).

use crate::categories::{AdditionalInfoFlag, Airline, DestinationCity, SourceCity};
use crate::lookup::IndicatorMask;
use crate::{AdditionalInfo, Selections};
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

pub const TOTAL_STOPS_COLUMN: &str = "Total_Stops";
pub const DURATION_COLUMN: &str = "Duration_min";
pub const LEN_ROUTE_COLUMN: &str = "Len_Route";
pub const MONTH_PREFIX: &str = "month";
pub const DAY_PREFIX: &str = "day";

/// Months and days-of-month that have an indicator column in the table,
/// keyed by value and holding the column name as spelled in the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSchema {
    months: BTreeMap<u32, String>,
    days: BTreeMap<u32, String>,
}

impl Default for CalendarSchema {
    fn default() -> Self {
        Self::new(1..=12, 1..=31)
    }
}

impl CalendarSchema {
    pub fn new(
        months: impl IntoIterator<Item = u32>,
        days: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            months: canonical_columns(MONTH_PREFIX, months),
            days: canonical_columns(DAY_PREFIX, days),
        }
    }

    /// Derive the schema from `month_<m>` / `day_<d>` header columns.
    ///
    /// A group with no columns at all falls back to the full calendar range.
    /// When a value appears under two spellings (`month_3`, `month_03`) the
    /// first header column wins.
    pub fn from_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut months = BTreeMap::new();
        let mut days = BTreeMap::new();

        for column in columns {
            let month = parse_calendar_column(column, MONTH_PREFIX)
                .filter(|m| (1..=12).contains(m));
            let day = parse_calendar_column(column, DAY_PREFIX)
                .filter(|d| (1..=31).contains(d));

            if let Some(month) = month {
                months.entry(month).or_insert_with(|| column.to_string());
            } else if let Some(day) = day {
                days.entry(day).or_insert_with(|| column.to_string());
            }
        }

        let full = Self::default();
        Self {
            months: if months.is_empty() { full.months } else { months },
            days: if days.is_empty() { full.days } else { days },
        }
    }

    pub fn months(&self) -> impl Iterator<Item = u32> + '_ {
        self.months.keys().copied()
    }

    pub fn days(&self) -> impl Iterator<Item = u32> + '_ {
        self.days.keys().copied()
    }

    pub fn has_month(&self, month: u32) -> bool {
        self.months.contains_key(&month)
    }

    pub fn has_day(&self, day: u32) -> bool {
        self.days.contains_key(&day)
    }
}

fn canonical_columns(
    prefix: &str,
    values: impl IntoIterator<Item = u32>,
) -> BTreeMap<u32, String> {
    values
        .into_iter()
        .map(|value| (value, format!("{}_{}", prefix, value)))
        .collect()
}

fn parse_calendar_column(column: &str, prefix: &str) -> Option<u32> {
    column
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .parse()
        .ok()
}

/// One-hot group over a calendar component (month or day-of-month).
///
/// `hot` is `None` when the journey date falls outside the slots the table
/// was built with; every indicator in the group is then zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarIndicator {
    slots: Vec<(u32, String)>,
    hot: Option<u32>,
}

impl CalendarIndicator {
    fn new(slots: &BTreeMap<u32, String>, value: u32) -> Self {
        let hot = slots.contains_key(&value).then_some(value);
        let slots = slots
            .iter()
            .map(|(slot, column)| (*slot, column.clone()))
            .collect();
        Self { slots, hot }
    }

    pub fn hot(&self) -> Option<u32> {
        self.hot
    }

    pub fn columns(&self) -> impl Iterator<Item = (String, u8)> + '_ {
        self.slots
            .iter()
            .map(move |(slot, column)| (column.clone(), u8::from(self.hot == Some(*slot))))
    }

    pub fn sum(&self) -> u32 {
        u32::from(self.hot.is_some())
    }
}

/// Named feature record for a single query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRecord {
    pub airline: Airline,
    pub source: SourceCity,
    pub destination: DestinationCity,
    pub total_stops: u8,
    pub duration_min: u32,
    pub len_route: usize,
    pub additional_info: AdditionalInfo,
    pub month: CalendarIndicator,
    pub day: CalendarIndicator,
}

/// Encode form selections into a feature record.
///
/// Total over the selection domain: month/day values missing from `calendar`
/// produce an all-zero indicator group rather than an error.
#[instrument(level = "debug", skip(selections, calendar), fields(airline = %selections.airline))]
pub fn encode(selections: &Selections, calendar: &CalendarSchema) -> FeatureRecord {
    let date = selections.journey_date;
    let month = CalendarIndicator::new(&calendar.months, date.month());
    let day = CalendarIndicator::new(&calendar.days, date.day());

    if month.hot().is_none() || day.hot().is_none() {
        debug!(
            journey_date = %date,
            month_encoded = month.hot().is_some(),
            day_encoded = day.hot().is_some(),
            "Journey date outside the table's calendar columns"
        );
    }

    FeatureRecord {
        airline: selections.airline,
        source: selections.source,
        destination: selections.destination,
        total_stops: selections.stops.rank(),
        duration_min: selections.duration_min,
        len_route: route_length(selections.source, selections.destination),
        additional_info: selections.additional_info,
        month,
        day,
    }
}

/// Character count of the concatenated source and destination names
pub fn route_length(source: SourceCity, destination: DestinationCity) -> usize {
    source.label().chars().count() + destination.label().chars().count()
}

fn one_hot<T: Copy + PartialEq + 'static>(
    all: &'static [T],
    selected: T,
    column: fn(T) -> String,
) -> impl Iterator<Item = (String, u8)> {
    all.iter()
        .map(move |value| (column(*value), u8::from(*value == selected)))
}

fn as_values(group: impl Iterator<Item = (String, u8)>) -> impl Iterator<Item = (String, f64)> {
    group.map(|(name, value)| (name, f64::from(value)))
}

impl FeatureRecord {
    pub fn airline_indicators(&self) -> Vec<u8> {
        one_hot(Airline::ALL, self.airline, Airline::column).map(|(_, v)| v).collect()
    }

    pub fn source_indicators(&self) -> Vec<u8> {
        one_hot(SourceCity::ALL, self.source, SourceCity::column).map(|(_, v)| v).collect()
    }

    pub fn destination_indicators(&self) -> Vec<u8> {
        one_hot(DestinationCity::ALL, self.destination, DestinationCity::column)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn airline_mask(&self) -> IndicatorMask {
        IndicatorMask::single(self.airline.index())
    }

    pub fn source_mask(&self) -> IndicatorMask {
        IndicatorMask::single(self.source.index())
    }

    pub fn destination_mask(&self) -> IndicatorMask {
        IndicatorMask::single(self.destination.index())
    }

    /// Every dimension in table column order
    pub fn features(&self) -> Vec<(String, f64)> {
        let mut features: Vec<(String, f64)> = Vec::new();
        features.extend(as_values(one_hot(Airline::ALL, self.airline, Airline::column)));
        features.extend(as_values(one_hot(SourceCity::ALL, self.source, SourceCity::column)));
        features.extend(as_values(one_hot(
            DestinationCity::ALL,
            self.destination,
            DestinationCity::column,
        )));

        features.push((TOTAL_STOPS_COLUMN.to_string(), f64::from(self.total_stops)));
        features.push((DURATION_COLUMN.to_string(), f64::from(self.duration_min)));
        features.push((LEN_ROUTE_COLUMN.to_string(), self.len_route as f64));

        features.extend(AdditionalInfoFlag::ALL.iter().map(|flag| {
            let value = u8::from(self.additional_info.is_set(*flag));
            (flag.column(), f64::from(value))
        }));
        features.extend(as_values(self.month.columns()));
        features.extend(as_values(self.day.columns()));

        features
    }

    /// Value of a single named dimension
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features()
            .into_iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::Stops;
    use chrono::NaiveDate;

    fn sample_selections() -> Selections {
        Selections::new(
            Airline::AirAsia,
            SourceCity::Delhi,
            DestinationCity::Cochin,
            Stops::One,
            150,
            NaiveDate::from_ymd_opt(2024, 3, 24).unwrap(),
        )
    }

    #[test]
    fn test_reference_example() {
        let record = encode(&sample_selections(), &CalendarSchema::default());

        assert_eq!(record.get("Airline_Air Asia"), Some(1.0));
        assert_eq!(record.get("Airline_IndiGo"), Some(0.0));
        assert_eq!(record.get("Source_Delhi"), Some(1.0));
        assert_eq!(record.get("Destination_Cochin"), Some(1.0));
        assert_eq!(record.get("Total_Stops"), Some(1.0));
        assert_eq!(record.get("Duration_min"), Some(150.0));
        assert_eq!(record.get("Len_Route"), Some(11.0));
        assert_eq!(record.get("month_3"), Some(1.0));
        assert_eq!(record.get("day_24"), Some(1.0));
        assert_eq!(record.get("day_1"), Some(0.0));
        assert_eq!(record.get("Predicted_Price"), None);
    }

    #[test]
    fn test_one_hot_groups_sum_to_one() {
        let record = encode(&sample_selections(), &CalendarSchema::default());

        assert_eq!(record.airline_indicators().iter().map(|v| u32::from(*v)).sum::<u32>(), 1);
        assert_eq!(record.source_indicators().iter().map(|v| u32::from(*v)).sum::<u32>(), 1);
        assert_eq!(record.destination_indicators().iter().map(|v| u32::from(*v)).sum::<u32>(), 1);
        assert_eq!(record.month.sum(), 1);
        assert_eq!(record.day.sum(), 1);
    }

    #[test]
    fn test_feature_layout() {
        let record = encode(&sample_selections(), &CalendarSchema::default());
        let features = record.features();

        // 12 + 5 + 6 + 3 + 7 + 12 + 31
        assert_eq!(features.len(), 76);
        assert_eq!(features[0].0, "Airline_Air Asia");
        assert_eq!(features[23].0, "Total_Stops");
        assert_eq!(features[26].0, "Additional_Info_Long_layover");
        assert_eq!(features.last().map(|(name, _)| name.as_str()), Some("day_31"));
    }

    #[test]
    fn test_additional_info_flags_are_encoded() {
        let mut selections = sample_selections();
        selections.additional_info.set(AdditionalInfoFlag::RedEyeFlight, true);
        selections.additional_info.set(AdditionalInfoFlag::BusinessClass, true);

        let record = encode(&selections, &CalendarSchema::default());
        assert_eq!(record.get("Additional_Info_Red_eye_flight"), Some(1.0));
        assert_eq!(record.get("Additional_Info_Business_class"), Some(1.0));
        assert_eq!(record.get("Additional_Info_Long_layover"), Some(0.0));
    }

    #[test]
    fn test_date_outside_calendar_schema_zeroes_group() {
        let calendar = CalendarSchema::new([3, 4, 5, 6], [1, 3, 6, 9, 12, 15, 18, 21, 24, 27]);
        let mut selections = sample_selections();
        selections.journey_date = NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();

        let record = encode(&selections, &calendar);
        assert_eq!(record.month.hot(), None);
        assert_eq!(record.day.hot(), None);
        assert_eq!(record.month.sum(), 0);
        assert!(record.day.columns().all(|(_, v)| v == 0));
        assert_eq!(record.get("month_11"), None);
        // The match-relevant dimensions are unaffected
        assert_eq!(record.get("Duration_min"), Some(150.0));
    }

    #[test]
    fn test_calendar_schema_from_columns() {
        let columns = [
            "Airline_GoAir",
            "month_3",
            "month_12",
            "day_1",
            "day_27",
            "day_x",
            "month_13",
            "Duration_min",
        ];
        let calendar = CalendarSchema::from_columns(columns);

        assert_eq!(calendar.months().collect::<Vec<_>>(), vec![3, 12]);
        assert_eq!(calendar.days().collect::<Vec<_>>(), vec![1, 27]);
        assert!(!calendar.has_month(13));
    }

    #[test]
    fn test_calendar_columns_keep_header_spelling() {
        let calendar = CalendarSchema::from_columns(["month_03", "month_4", "day_09", "day_24"]);
        let mut selections = sample_selections();
        selections.journey_date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let record = encode(&selections, &calendar);
        assert_eq!(record.get("month_03"), Some(1.0));
        assert_eq!(record.get("month_3"), None);
        assert_eq!(record.get("month_4"), Some(0.0));
        assert_eq!(record.get("day_09"), Some(1.0));
        assert_eq!(record.get("day_9"), None);
        assert_eq!(record.get("day_24"), Some(0.0));
    }

    #[test]
    fn test_calendar_schema_keeps_first_spelling_of_a_value() {
        let calendar = CalendarSchema::from_columns(["month_3", "month_03"]);
        let record = encode(&sample_selections(), &calendar);

        assert_eq!(calendar.months().collect::<Vec<_>>(), vec![3]);
        assert_eq!(record.get("month_3"), Some(1.0));
        assert_eq!(record.get("month_03"), None);
    }

    #[test]
    fn test_calendar_schema_falls_back_to_full_range() {
        let calendar = CalendarSchema::from_columns(["Airline_GoAir", "Duration_min"]);
        assert_eq!(calendar, CalendarSchema::default());
    }

    #[test]
    fn test_route_length() {
        assert_eq!(route_length(SourceCity::Delhi, DestinationCity::Cochin), 11);
        assert_eq!(route_length(SourceCity::Kolkata, DestinationCity::NewDelhi), 16);
    }
}
