//! Closed category labels offered by the fare form
//!
//! Every selector on the form maps onto one of these enums. The label strings
//! double as the suffix of the one-hot column names in the price table
//! (`Airline_IndiGo`, `Source_Delhi`, ...), so they must match the table
//! header byte for byte, misspellings included.

use crate::FareError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Case, space, hyphen and underscore insensitive comparison key for labels.
fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

macro_rules! category {
    (
        $(#[$meta:meta])*
        $name:ident, kind = $kind:literal, prefix = $prefix:literal {
            $( $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// All values in table column order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const COUNT: usize = Self::ALL.len();
            pub const COLUMN_PREFIX: &'static str = $prefix;

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Position inside the one-hot group
            pub fn index(self) -> usize {
                self as usize
            }

            /// Name of the indicator column in the price table
            pub fn column(self) -> String {
                format!("{}_{}", Self::COLUMN_PREFIX, self.label())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = FareError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_label(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|value| normalize_label(value.label()) == wanted)
                    .ok_or_else(|| FareError::UnknownCategory {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

category! {
    /// Operating airline
    Airline, kind = "airline", prefix = "Airline" {
        AirAsia => "Air Asia",
        AirIndia => "Air India",
        GoAir => "GoAir",
        IndiGo => "IndiGo",
        JetAirways => "Jet Airways",
        JetAirwaysBusiness => "Jet Airways Business",
        MultipleCarriers => "Multiple carriers",
        MultipleCarriersPremiumEconomy => "Multiple carriers Premium economy",
        SpiceJet => "SpiceJet",
        Trujet => "Trujet",
        Vistara => "Vistara",
        VistaraPremiumEconomy => "Vistara Premium economy",
    }
}

category! {
    /// Departure city. "Banglore" is spelled as in the source dataset.
    SourceCity, kind = "source city", prefix = "Source" {
        Banglore => "Banglore",
        Chennai => "Chennai",
        Delhi => "Delhi",
        Kolkata => "Kolkata",
        Mumbai => "Mumbai",
    }
}

category! {
    /// Arrival city
    DestinationCity, kind = "destination city", prefix = "Destination" {
        Banglore => "Banglore",
        Cochin => "Cochin",
        Delhi => "Delhi",
        Hyderabad => "Hyderabad",
        Kolkata => "Kolkata",
        NewDelhi => "New Delhi",
    }
}

category! {
    /// Free-text "Additional_Info" values of the dataset, one indicator each
    AdditionalInfoFlag, kind = "additional info flag", prefix = "Additional_Info" {
        LongLayover => "Long_layover",
        ShortLayover => "Short_layover",
        BusinessClass => "Business_class",
        ChangeAirports => "Change_airports",
        InFlightMealNotIncluded => "In-flight_meal_not_included",
        NoCheckInBaggageIncluded => "No_check_in_baggage_included",
        RedEyeFlight => "Red_eye_flight",
    }
}

impl AdditionalInfoFlag {
    /// Checkbox caption shown on the form
    pub fn description(self) -> &'static str {
        match self {
            AdditionalInfoFlag::LongLayover => "Long layover",
            AdditionalInfoFlag::ShortLayover => "Short layover",
            AdditionalInfoFlag::BusinessClass => "Business class",
            AdditionalInfoFlag::ChangeAirports => "Change airports",
            AdditionalInfoFlag::InFlightMealNotIncluded => "In-flight meal not included",
            AdditionalInfoFlag::NoCheckInBaggageIncluded => "No check-in baggage included",
            AdditionalInfoFlag::RedEyeFlight => "Red-eye flight",
        }
    }
}

/// Number of stops, encoded by rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stops {
    #[serde(rename = "Non-stop")]
    NonStop,
    #[serde(rename = "1 stop")]
    One,
    #[serde(rename = "2 stops")]
    Two,
    #[serde(rename = "3 stops")]
    Three,
    #[serde(rename = "4 stops")]
    Four,
}

impl Stops {
    pub const ALL: &'static [Stops] =
        &[Stops::NonStop, Stops::One, Stops::Two, Stops::Three, Stops::Four];

    pub fn label(self) -> &'static str {
        match self {
            Stops::NonStop => "Non-stop",
            Stops::One => "1 stop",
            Stops::Two => "2 stops",
            Stops::Three => "3 stops",
            Stops::Four => "4 stops",
        }
    }

    /// Ordinal value stored in the `Total_Stops` column
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(usize::from(rank)).copied()
    }
}

impl fmt::Display for Stops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stops {
    type Err = FareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        match wanted.as_str() {
            "non_stop" | "nonstop" | "0" => return Ok(Stops::NonStop),
            _ => {}
        }

        let by_label = Self::ALL
            .iter()
            .copied()
            .find(|stops| normalize_label(stops.label()) == wanted);
        let by_rank = || wanted.parse::<u8>().ok().and_then(Self::from_rank);

        by_label.or_else(by_rank).ok_or_else(|| FareError::UnknownCategory {
            kind: "stop count",
            value: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airline_parsing() {
        assert_eq!("Air Asia".parse::<Airline>().unwrap(), Airline::AirAsia);
        assert_eq!("jet airways business".parse::<Airline>().unwrap(), Airline::JetAirwaysBusiness);
        assert_eq!(
            "Vistara_Premium_economy".parse::<Airline>().unwrap(),
            Airline::VistaraPremiumEconomy
        );
        assert!("Lufthansa".parse::<Airline>().is_err());
    }

    #[test]
    fn test_city_parsing_keeps_dataset_spelling() {
        assert_eq!("Banglore".parse::<SourceCity>().unwrap(), SourceCity::Banglore);
        assert!("Bangalore".parse::<SourceCity>().is_err());
        assert_eq!("new delhi".parse::<DestinationCity>().unwrap(), DestinationCity::NewDelhi);
        assert!("Cochin".parse::<SourceCity>().is_err());
    }

    #[test]
    fn test_group_sizes() {
        assert_eq!(Airline::COUNT, 12);
        assert_eq!(SourceCity::COUNT, 5);
        assert_eq!(DestinationCity::COUNT, 6);
        assert_eq!(AdditionalInfoFlag::COUNT, 7);
    }

    #[test]
    fn test_index_follows_declaration_order() {
        for (i, airline) in Airline::ALL.iter().enumerate() {
            assert_eq!(airline.index(), i);
        }
        assert_eq!(DestinationCity::NewDelhi.index(), 5);
    }

    #[test]
    fn test_column_names() {
        assert_eq!(Airline::AirAsia.column(), "Airline_Air Asia");
        assert_eq!(SourceCity::Delhi.column(), "Source_Delhi");
        assert_eq!(DestinationCity::NewDelhi.column(), "Destination_New Delhi");
        assert_eq!(
            AdditionalInfoFlag::InFlightMealNotIncluded.column(),
            "Additional_Info_In-flight_meal_not_included"
        );
    }

    #[test]
    fn test_additional_info_flag_parsing() {
        assert_eq!(
            "in-flight meal not included".parse::<AdditionalInfoFlag>().unwrap(),
            AdditionalInfoFlag::InFlightMealNotIncluded
        );
        assert_eq!(
            "red_eye_flight".parse::<AdditionalInfoFlag>().unwrap(),
            AdditionalInfoFlag::RedEyeFlight
        );
        assert!("wifi".parse::<AdditionalInfoFlag>().is_err());
    }

    #[test]
    fn test_stops_rank_is_monotonic() {
        assert_eq!(Stops::NonStop.rank(), 0);
        assert_eq!(Stops::One.rank(), 1);
        assert_eq!(Stops::Two.rank(), 2);
        assert_eq!(Stops::Three.rank(), 3);
        assert_eq!(Stops::Four.rank(), 4);
        assert!(Stops::ALL.windows(2).all(|w| w[0].rank() < w[1].rank()));
    }

    #[test]
    fn test_stops_parsing() {
        assert_eq!("Non-stop".parse::<Stops>().unwrap(), Stops::NonStop);
        assert_eq!("nonstop".parse::<Stops>().unwrap(), Stops::NonStop);
        assert_eq!("1 stop".parse::<Stops>().unwrap(), Stops::One);
        assert_eq!("4 stops".parse::<Stops>().unwrap(), Stops::Four);
        assert_eq!("3".parse::<Stops>().unwrap(), Stops::Three);
        assert!("5 stops".parse::<Stops>().is_err());
        assert!("5".parse::<Stops>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Airline::MultipleCarriers).unwrap();
        assert_eq!(json, r#""Multiple carriers""#);
        let stops: Stops = serde_json::from_str(r#""2 stops""#).unwrap();
        assert_eq!(stops, Stops::Two);
    }
}
