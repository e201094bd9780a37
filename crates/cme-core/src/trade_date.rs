//! Trade date labels such as `"Friday, 08 Mar 2024"`.

use crate::error::{CoreError, CoreResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Month abbreviations as printed by the exchange.
pub(crate) const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Look up a three-letter month abbreviation (case-insensitive).
pub(crate) fn month_number(abbreviation: &str) -> Option<u32> {
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbreviation))
        .map(|i| i as u32 + 1)
}

/// Calendar date a table was published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeDate(NaiveDate);

impl TradeDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse `"<Weekday>, <DD> <Mon> <YYYY>"`.
    ///
    /// The weekday is not cross-checked against the date.
    pub fn from_string(label: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidDateFormat(label.to_string());
        let trimmed = label.trim();

        let (weekday, rest) = trimmed.split_once(", ").ok_or_else(invalid)?;
        if weekday.is_empty() || !weekday.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid());
        }

        let parts: Vec<&str> = rest.split(' ').collect();
        let [day, month, year] = parts.as_slice() else {
            return Err(invalid());
        };
        if day.len() != 2 || month.len() != 3 || year.len() != 4 {
            return Err(invalid());
        }
        if !day.chars().chain(year.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let month = month_number(month).ok_or_else(invalid)?;
        let day: u32 = day.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Parse the canonical `YYYY-MM-DD` form used in storage.
    pub fn parse_iso(value: &str) -> CoreResult<Self> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| CoreError::InvalidDateFormat(value.to_string()))
    }

    pub fn to_date(&self) -> NaiveDate {
        self.0
    }

    /// Render with a chrono format string.
    ///
    /// Returns an error instead of panicking when the format string is invalid.
    pub fn format(&self, fmt: &str) -> CoreResult<String> {
        let mut out = String::new();
        write!(out, "{}", self.0.format(fmt))
            .map_err(|_| CoreError::InvalidDateFormat(fmt.to_string()))?;
        Ok(out)
    }

    /// Label in the exchange's own notation, e.g. `"Friday, 08 Mar 2024"`.
    pub fn to_label(&self) -> String {
        format!(
            "{}, {:02} {} {}",
            self.0.format("%A"),
            self.0.day(),
            MONTH_ABBREVIATIONS[self.0.month0() as usize],
            self.0.year()
        )
    }
}

impl From<NaiveDate> for TradeDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for TradeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
