//! Interactive fare form
//!
//! A line-oriented rendition of the prediction form: numbered selectors for
//! the categorical fields, a bounded duration input, yes/no checkboxes for the
//! additional-info flags and a journey date restricted to one calendar year.
//! Out-of-domain answers are rejected here and re-prompted, so the encoder
//! only ever sees valid selections.

use crate::categories::{AdditionalInfoFlag, Airline, DestinationCity, SourceCity, Stops};
use crate::{estimate_fare, AdditionalInfo, FareError, PriceTable, Selections};
use chrono::NaiveDate;
use regex::Regex;
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Domain bounds of the form inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLimits {
    pub min_duration: u32,
    pub max_duration: u32,
    pub default_duration: u32,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
}

impl Default for FormLimits {
    fn default() -> Self {
        Self {
            min_duration: 0,
            max_duration: 1000,
            default_duration: 300,
            earliest_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            latest_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }
}

impl FormLimits {
    pub fn check_duration(&self, minutes: u32) -> Result<u32, FareError> {
        if minutes < self.min_duration || minutes > self.max_duration {
            return Err(FareError::DurationOutOfRange {
                minutes,
                min: self.min_duration,
                max: self.max_duration,
            });
        }
        Ok(minutes)
    }

    pub fn check_date(&self, date: NaiveDate) -> Result<NaiveDate, FareError> {
        if date < self.earliest_date || date > self.latest_date {
            return Err(FareError::DateOutOfRange {
                date,
                earliest: self.earliest_date,
                latest: self.latest_date,
            });
        }
        Ok(date)
    }
}

/// Parse a duration given in minutes (`150`) or hours and minutes (`2h 30m`, `3h`, `45m`)
pub fn parse_duration(input: &str) -> Result<u32, FareError> {
    let input = input.trim();
    if let Ok(minutes) = input.parse::<u32>() {
        return Ok(minutes);
    }

    let re = Regex::new(r"^(?:(\d+)\s*h)?\s*(?:(\d+)\s*m)?$")
        .map_err(|e| FareError::DurationParseError(e.to_string()))?;
    let captures = re
        .captures(input)
        .filter(|c| c.get(1).is_some() || c.get(2).is_some())
        .ok_or_else(|| FareError::DurationParseError(input.to_string()))?;

    let component = |index: usize| -> Result<u32, FareError> {
        captures
            .get(index)
            .map_or(Ok(0), |m| m.as_str().parse::<u32>())
            .map_err(|_| FareError::DurationParseError(input.to_string()))
    };

    component(1)?
        .checked_mul(60)
        .and_then(|hours| hours.checked_add(component(2).ok()?))
        .ok_or_else(|| FareError::DurationParseError(input.to_string()))
}

/// Parse a `YYYY-MM-DD` journey date and check it against the form's calendar year
pub fn parse_journey_date(input: &str, limits: &FormLimits) -> Result<NaiveDate, FareError> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| FareError::DateParseError(format!("{}: {}", input.trim(), e)))?;
    limits.check_date(date)
}

/// Prompt session over any line-based input and output
pub struct FormSession<R, W> {
    input: R,
    output: W,
    limits: FormLimits,
}

impl<R: BufRead, W: Write> FormSession<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self::with_limits(input, output, FormLimits::default())
    }

    pub fn with_limits(input: R, output: W, limits: FormLimits) -> Self {
        Self { input, output, limits }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run submissions until the user declines another or input ends.
    ///
    /// Returns how many fares were looked up.
    pub fn run(&mut self, table: &PriceTable) -> Result<usize, FareError> {
        writeln!(self.output, "Flight Price Prediction")?;
        writeln!(self.output, "Select the flight details to get the predicted price.")?;

        let mut submitted = 0;
        loop {
            let Some(selections) = self.prompt_selections()? else {
                break;
            };

            debug!(?selections, "Form submitted");
            let estimate = estimate_fare(table, &selections);
            writeln!(self.output, "\n{}\n", estimate)?;
            submitted += 1;

            if !self.confirm("Predict another fare")?.unwrap_or(false) {
                break;
            }
        }

        info!(submitted, "Form session finished");
        Ok(submitted)
    }

    /// Walk through every field once. `None` when input ends part way.
    pub fn prompt_selections(&mut self) -> Result<Option<Selections>, FareError> {
        let Some(airline) = self.select("Select Airline", Airline::ALL, Airline::label)? else {
            return Ok(None);
        };
        let Some(source) =
            self.select("Select Source City", SourceCity::ALL, SourceCity::label)?
        else {
            return Ok(None);
        };
        let Some(destination) = self.select(
            "Select Destination City",
            DestinationCity::ALL,
            DestinationCity::label,
        )?
        else {
            return Ok(None);
        };
        let Some(stops) = self.select_stops()? else {
            return Ok(None);
        };

        let limits = self.limits.clone();
        let duration_prompt = format!(
            "Select Duration (in minutes) [{}-{}, default {}]: ",
            limits.min_duration, limits.max_duration, limits.default_duration
        );
        let Some(duration_min) = self.prompt_value(&duration_prompt, |answer| {
            if answer.is_empty() {
                return Ok(limits.default_duration);
            }
            limits.check_duration(parse_duration(answer)?)
        })?
        else {
            return Ok(None);
        };

        let mut additional_info = AdditionalInfo::default();
        for flag in AdditionalInfoFlag::ALL {
            let Some(checked) = self.confirm(flag.description())? else {
                return Ok(None);
            };
            additional_info.set(*flag, checked);
        }

        let date_prompt = format!(
            "Select Date of Journey (YYYY-MM-DD) [{} to {}, default {}]: ",
            limits.earliest_date, limits.latest_date, limits.earliest_date
        );
        let Some(journey_date) = self.prompt_value(&date_prompt, |answer| {
            if answer.is_empty() {
                return Ok(limits.earliest_date);
            }
            parse_journey_date(answer, &limits)
        })?
        else {
            return Ok(None);
        };

        Ok(Some(Selections {
            airline,
            source,
            destination,
            stops,
            duration_min,
            additional_info,
            journey_date,
        }))
    }

    fn read_answer(&mut self) -> Result<Option<String>, FareError> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn select<T: Copy>(
        &mut self,
        title: &str,
        options: &[T],
        label: fn(T) -> &'static str,
    ) -> Result<Option<T>, FareError> {
        writeln!(self.output, "{}:", title)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, label(*option))?;
        }

        let prompt = format!("Choice [1-{}, default 1]: ", options.len());
        self.prompt_value(&prompt, |answer| {
            if answer.is_empty() {
                return options.first().copied().ok_or_else(|| invalid_choice(answer));
            }
            if let Ok(position) = answer.parse::<usize>() {
                return position
                    .checked_sub(1)
                    .and_then(|i| options.get(i))
                    .copied()
                    .ok_or_else(|| invalid_choice(answer));
            }
            options
                .iter()
                .copied()
                .find(|option| label(*option).eq_ignore_ascii_case(answer))
                .ok_or_else(|| invalid_choice(answer))
        })
    }

    /// Stops are numbered and answered by rank, as `Stops::from_str` reads them
    fn select_stops(&mut self) -> Result<Option<Stops>, FareError> {
        writeln!(self.output, "Select Number of Stops:")?;
        for stops in Stops::ALL {
            writeln!(self.output, "  {}) {}", stops.rank(), stops.label())?;
        }

        let prompt = format!("Choice [0-{}, default 0]: ", Stops::ALL.len() - 1);
        self.prompt_value(&prompt, |answer| {
            if answer.is_empty() {
                return Ok(Stops::NonStop);
            }
            answer.parse::<Stops>()
        })
    }

    /// Yes/no checkbox, unchecked by default
    fn confirm(&mut self, question: &str) -> Result<Option<bool>, FareError> {
        let prompt = format!("{}? [y/N]: ", question);
        self.prompt_value(&prompt, |answer| match answer.to_ascii_lowercase().as_str() {
            "" | "n" | "no" => Ok(false),
            "y" | "yes" => Ok(true),
            _ => Err(invalid_choice(answer)),
        })
    }

    fn prompt_value<T>(
        &mut self,
        prompt: &str,
        parse: impl Fn(&str) -> Result<T, FareError>,
    ) -> Result<Option<T>, FareError> {
        loop {
            write!(self.output, "{}", prompt)?;
            let Some(answer) = self.read_answer()? else {
                return Ok(None);
            };

            match parse(&answer) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    debug!(answer = %answer, error = %e, "Rejected form input");
                    writeln!(self.output, "  {}", e)?;
                }
            }
        }
    }
}

fn invalid_choice(answer: &str) -> FareError {
    FareError::UnknownCategory {
        kind: "choice",
        value: answer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("150").unwrap(), 150);
        assert_eq!(parse_duration("2h 30m").unwrap(), 150);
        assert_eq!(parse_duration("2h30m").unwrap(), 150);
        assert_eq!(parse_duration("3h").unwrap(), 180);
        assert_eq!(parse_duration(" 45m ").unwrap(), 45);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("2x").is_err());
        assert!(parse_duration("-5").is_err());
    }

    #[test]
    fn test_duration_limits() {
        let limits = FormLimits::default();
        assert_eq!(limits.check_duration(0).unwrap(), 0);
        assert_eq!(limits.check_duration(1000).unwrap(), 1000);
        assert!(matches!(
            limits.check_duration(1001),
            Err(FareError::DurationOutOfRange { minutes: 1001, .. })
        ));
    }

    #[test]
    fn test_parse_journey_date() {
        let limits = FormLimits::default();
        assert_eq!(
            parse_journey_date("2024-02-29", &limits).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(matches!(
            parse_journey_date("2025-01-01", &limits),
            Err(FareError::DateOutOfRange { .. })
        ));
        assert!(matches!(
            parse_journey_date("24/03/2024", &limits),
            Err(FareError::DateParseError(_))
        ));
    }

    #[test]
    fn test_prompt_selections_with_defaults() {
        // airline, source, destination, stops, duration, 7 flags, date
        let answers = "\n\n\n\n\n\n\n\n\n\n\n\n\n";
        let mut session = FormSession::new(Cursor::new(answers), Vec::new());

        let selections = session.prompt_selections().unwrap().unwrap();
        assert_eq!(selections.airline, Airline::AirAsia);
        assert_eq!(selections.source, SourceCity::Banglore);
        assert_eq!(selections.destination, DestinationCity::Banglore);
        assert_eq!(selections.stops, Stops::NonStop);
        assert_eq!(selections.duration_min, 300);
        assert_eq!(selections.additional_info, AdditionalInfo::default());
        assert_eq!(selections.journey_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_prompt_selections_reprompts_invalid_answers() {
        let answers = [
            "13",        // out of range, re-prompted
            "indigo",    // by label
            "3",         // Delhi
            "Cochin",
            "7",         // no such stop count, re-prompted
            "1",         // 1 stop
            "1200",      // too long, re-prompted
            "2h 30m",
            "y", "n", "maybe", "n", "n", "n", "n", "y",
            "2025-06-01", // outside the calendar year, re-prompted
            "2024-03-24",
        ]
        .join("\n");
        let mut session = FormSession::new(Cursor::new(answers), Vec::new());

        let selections = session.prompt_selections().unwrap().unwrap();
        assert_eq!(selections.airline, Airline::IndiGo);
        assert_eq!(selections.source, SourceCity::Delhi);
        assert_eq!(selections.destination, DestinationCity::Cochin);
        assert_eq!(selections.stops, Stops::One);
        assert_eq!(selections.duration_min, 150);
        assert!(selections.additional_info.is_set(AdditionalInfoFlag::LongLayover));
        assert!(selections.additional_info.is_set(AdditionalInfoFlag::RedEyeFlight));
        assert_eq!(selections.additional_info.enabled().count(), 2);
        assert_eq!(selections.journey_date, NaiveDate::from_ymd_opt(2024, 3, 24).unwrap());

        let output = String::from_utf8(session.into_output()).unwrap();
        assert!(output.contains("Unknown choice: 13"));
        assert!(output.contains("Duration 1200 min is outside 0..=1000"));
        assert!(output.contains("Unknown stop count: 7"));
        assert!(output.contains("Unknown choice: maybe"));
        assert!(output.contains("Journey date 2025-06-01 is outside"));
    }

    #[test]
    fn test_stops_answer_matches_command_line_parsing() {
        for answer in ["0", "1", "2", "3", "4", "Non-stop", "2 stops"] {
            let answers = format!("1\n3\n2\n{}\n150\n\n\n\n\n\n\n\n\n", answer);
            let mut session = FormSession::new(Cursor::new(answers), Vec::new());

            let selections = session.prompt_selections().unwrap().unwrap();
            assert_eq!(selections.stops, answer.parse::<Stops>().unwrap());
        }

        let answers = "1\n3\n2\n1\n150\n\n\n\n\n\n\n\n\n";
        let mut session = FormSession::new(Cursor::new(answers), Vec::new());
        let selections = session.prompt_selections().unwrap().unwrap();
        assert_eq!(selections.stops, Stops::One);

        let output = String::from_utf8(session.into_output()).unwrap();
        assert!(output.contains("  0) Non-stop"));
        assert!(output.contains("  4) 4 stops"));
    }

    #[test]
    fn test_prompt_selections_stops_at_end_of_input() {
        let mut session = FormSession::new(Cursor::new("4\n2\n"), Vec::new());
        assert_eq!(session.prompt_selections().unwrap(), None);
    }
}
