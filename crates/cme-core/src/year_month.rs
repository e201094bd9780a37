//! Contract month labels such as `"APR 24"` or `"DEC 2025"`.

use crate::error::{CoreError, CoreResult};
use crate::trade_date::month_number;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Known misspellings published by the exchange, applied before matching.
const MONTH_TYPOS: [(&str, &str); 1] = [("JLY", "JUL")];

/// Contract month of a futures row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> CoreResult<Self> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(CoreError::InvalidMonthFormat(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// Parse `"<MON> <YY|YYYY>"`, case-insensitively.
    ///
    /// Two-digit years pivot like `strptime`'s `%y`: 69-99 map to the 1900s,
    /// 00-68 to the 2000s.
    pub fn from_string(label: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidMonthFormat(label.to_string());

        let mut normalized = label.trim().to_ascii_uppercase();
        for (typo, fix) in MONTH_TYPOS {
            normalized = normalized.replace(typo, fix);
        }

        let parts: Vec<&str> = normalized.split_whitespace().collect();
        let [month, year] = parts.as_slice() else {
            return Err(invalid());
        };
        if month.len() != 3 || !month.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        if !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let month = month_number(month).ok_or_else(invalid)?;
        let year: i32 = match year.len() {
            4 => year.parse().map_err(|_| invalid())?,
            2 => {
                let yy: i32 = year.parse().map_err(|_| invalid())?;
                if yy >= 69 {
                    1900 + yy
                } else {
                    2000 + yy
                }
            }
            _ => return Err(invalid()),
        };

        Ok(Self { year, month })
    }

    /// Parse the canonical `YYYY-MM` storage form.
    pub fn from_db_format(value: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidMonthFormat(value.to_string());
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    pub fn to_db_format(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the contract month.
    pub fn first_day(&self) -> NaiveDate {
        // year/month are range-checked at construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string() {
        let ym = YearMonth::from_string("APR 24").unwrap();
        assert_eq!(ym, YearMonth::new(2024, 4).unwrap());
        assert_eq!(ym.to_db_format(), "2024-04");
    }

    #[test]
    fn test_typo_correction() {
        assert_eq!(
            YearMonth::from_string("JLY 24").unwrap(),
            YearMonth::new(2024, 7).unwrap()
        );
        assert_eq!(
            YearMonth::from_string("jly 2026").unwrap(),
            YearMonth::new(2026, 7).unwrap()
        );
    }

    #[test]
    fn test_case_and_full_year() {
        assert_eq!(
            YearMonth::from_string(" dec 2025 ").unwrap().to_db_format(),
            "2025-12"
        );
    }

    #[test]
    fn test_two_digit_pivot() {
        assert_eq!(YearMonth::from_string("JAN 68").unwrap().year(), 2068);
        assert_eq!(YearMonth::from_string("JAN 69").unwrap().year(), 1969);
    }

    #[test]
    fn test_db_format() {
        let ym = YearMonth::from_db_format("2024-09").unwrap();
        assert_eq!(ym.month(), 9);
        assert_eq!(ym.first_day(), NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        assert!(YearMonth::from_db_format("2024-13").is_err());
        assert!(YearMonth::from_db_format("24-09").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["APR", "APR 2024 X", "APRIL 24", "XYZ 24", "APR 024", "APR2024", ""] {
            assert_eq!(
                YearMonth::from_string(bad),
                Err(CoreError::InvalidMonthFormat(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_ordering_follows_calendar() {
        let a = YearMonth::from_string("DEC 24").unwrap();
        let b = YearMonth::from_string("MAR 25").unwrap();
        assert!(a < b);
    }
}
