//! Anime season naming and date-based season defaults
//!
//! Two month-to-season tables exist on purpose:
//! - [`fetch_default`] is the fetcher's table, where December already
//!   belongs to the winter season of the following year.
//! - [`current_season`] is the plain quarterly table used for session
//!   defaults (Jan-Mar winter, Apr-Jun spring, Jul-Sep summer, Oct-Dec fall).
//!
//! They disagree for December and for the first month of each quarter.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Broadcast season of the anime year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Lowercase name, as used in catalog URLs and saved filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }

    /// Capitalized name, as used in feed paths and rule names
    pub fn capitalized(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "winter" => Ok(Season::Winter),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" | "autumn" => Ok(Season::Fall),
            other => Err(anyhow!("Unknown season '{}'", other)),
        }
    }
}

/// Season the fetcher uses when none is requested
///
/// December maps to winter of the next year; January and February are
/// winter, March-May spring, June-August summer, the rest fall.
pub fn fetch_default<D: Datelike>(date: &D) -> (Season, i32) {
    let year = date.year();
    match date.month() {
        12 => (Season::Winter, year + 1),
        1 | 2 => (Season::Winter, year),
        3..=5 => (Season::Spring, year),
        6..=8 => (Season::Summer, year),
        _ => (Season::Fall, year),
    }
}

/// Quarterly season for the given date
pub fn current_season<D: Datelike>(date: &D) -> (Season, i32) {
    let season = match date.month() {
        1..=3 => Season::Winter,
        4..=6 => Season::Spring,
        7..=9 => Season::Summer,
        _ => Season::Fall,
    };
    (season, date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 15).unwrap()
    }

    #[test]
    fn test_fetch_default_december_rolls_over() {
        assert_eq!(fetch_default(&date(2024, 12)), (Season::Winter, 2025));
    }

    #[test]
    fn test_fetch_default_table() {
        assert_eq!(fetch_default(&date(2025, 1)), (Season::Winter, 2025));
        assert_eq!(fetch_default(&date(2025, 2)), (Season::Winter, 2025));
        assert_eq!(fetch_default(&date(2025, 3)), (Season::Spring, 2025));
        assert_eq!(fetch_default(&date(2025, 5)), (Season::Spring, 2025));
        assert_eq!(fetch_default(&date(2025, 6)), (Season::Summer, 2025));
        assert_eq!(fetch_default(&date(2025, 8)), (Season::Summer, 2025));
        assert_eq!(fetch_default(&date(2025, 9)), (Season::Fall, 2025));
        assert_eq!(fetch_default(&date(2025, 11)), (Season::Fall, 2025));
    }

    #[test]
    fn test_current_season_quarters() {
        assert_eq!(current_season(&date(2025, 3)), (Season::Winter, 2025));
        assert_eq!(current_season(&date(2025, 4)), (Season::Spring, 2025));
        assert_eq!(current_season(&date(2025, 9)), (Season::Summer, 2025));
        assert_eq!(current_season(&date(2025, 12)), (Season::Fall, 2025));
    }

    #[test]
    fn test_tables_disagree_in_december() {
        let december = date(2025, 12);
        assert_ne!(fetch_default(&december), current_season(&december));
    }

    #[test]
    fn test_parse_season() {
        assert_eq!("Winter".parse::<Season>().unwrap(), Season::Winter);
        assert_eq!(" summer ".parse::<Season>().unwrap(), Season::Summer);
        assert_eq!("autumn".parse::<Season>().unwrap(), Season::Fall);
        assert!("monsoon".parse::<Season>().is_err());
    }

    #[test]
    fn test_season_names() {
        assert_eq!(Season::Fall.to_string(), "fall");
        assert_eq!(Season::Spring.capitalized(), "Spring");
    }
}
