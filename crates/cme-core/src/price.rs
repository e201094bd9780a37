//! Exchange price notation.
//!
//! Prices on the settlement pages are quoted in a mix of notations:
//!
//! | Literal    | Meaning                          | Value        |
//! |------------|----------------------------------|--------------|
//! | `1,234`    | comma-grouped handle             | `1234`       |
//! | `100A`     | handle with ask/bid suffix       | `100`        |
//! | `-'27`     | fraction-only, 27/32 negative    | `-0.84375`   |
//! | `+5'010`   | handle plus `0.010` / 32         | `5.0003125`  |
//! | `-.27`     | plain decimal                    | `-0.27`      |
//! | `-`        | no value                         | null         |
//!
//! Both [`validate_price`] and [`parse_price`] run the same scanner, so any
//! literal that parses also validates.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel the exchange prints for an empty cell.
pub const NULL_SENTINEL: &str = "-";

const THIRTY_SECONDS: Decimal = Decimal::from_parts(32, 0, 0, false, 0);

/// Scanned components of a price literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Notation<'a> {
    signed: bool,
    negative: bool,
    /// Handle digits, possibly comma-grouped.
    handle: &'a str,
    /// Digits after the apostrophe (32nds).
    fraction: Option<&'a str>,
    /// Digits after the decimal point.
    decimals: Option<&'a str>,
}

impl Notation<'_> {
    fn handle_digits(&self) -> String {
        self.handle.chars().filter(|c| *c != ',').collect()
    }
}

fn take_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn valid_grouping(handle: &str) -> bool {
    if !handle.contains(',') {
        return true;
    }
    let mut groups = handle.split(',');
    let first_ok = groups
        .next()
        .map(|g| (1..=3).contains(&g.len()))
        .unwrap_or(false);
    first_ok && groups.all(|g| g.len() == 3)
}

/// Recognise the notation grammar. Returns `None` for anything outside it.
fn scan(literal: &str) -> Option<Notation<'_>> {
    let body = literal
        .strip_suffix('A')
        .or_else(|| literal.strip_suffix('B'))
        .unwrap_or(literal);

    let (signed, negative, rest) = match body.as_bytes().first() {
        Some(b'-') => (true, true, &body[1..]),
        Some(b'+') => (true, false, &body[1..]),
        _ => (false, false, body),
    };

    let handle_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ','))
        .unwrap_or(rest.len());
    let (handle, mut rest) = rest.split_at(handle_end);
    if !valid_grouping(handle) {
        return None;
    }

    let mut fraction = None;
    if let Some(after) = rest.strip_prefix('\'') {
        let (digits, tail) = take_digits(after);
        if digits.is_empty() || digits.len() > 3 {
            return None;
        }
        fraction = Some(digits);
        rest = tail;
    }

    let mut decimals = None;
    if let Some(after) = rest.strip_prefix('.') {
        let (digits, tail) = take_digits(after);
        if digits.is_empty() {
            return None;
        }
        decimals = Some(digits);
        rest = tail;
    }

    if !rest.is_empty() {
        return None;
    }

    Some(Notation {
        signed,
        negative,
        handle,
        fraction,
        decimals,
    })
}

/// Check a literal against the price grammar without computing its value.
///
/// The null sentinel and the empty string are accepted. Purely alphabetic
/// literals are rejected even though a lone suffix letter would scan.
pub fn validate_price(literal: &str) -> CoreResult<()> {
    let trimmed = literal.trim();
    let alphabetic = !trimmed.is_empty() && trimmed.chars().all(char::is_alphabetic);
    if alphabetic || scan(trimmed).is_none() {
        return Err(CoreError::InvalidPriceFormat(literal.to_string()));
    }
    Ok(())
}

fn decimal(repr: &str, literal: &str) -> CoreResult<Decimal> {
    Decimal::from_str(repr).map_err(|_| CoreError::InvalidPriceFormat(literal.to_string()))
}

/// Parse a price literal into an exact decimal.
///
/// `None`, the empty string and `"-"` yield `Ok(None)`.
pub fn parse_price(literal: Option<&str>) -> CoreResult<Option<Decimal>> {
    let Some(raw) = literal else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NULL_SENTINEL {
        return Ok(None);
    }

    let invalid = || CoreError::InvalidPriceFormat(raw.to_string());
    let notation = scan(trimmed).ok_or_else(invalid)?;
    let handle = notation.handle_digits();

    let magnitude = match notation.fraction {
        Some(fraction) => {
            // A leading zero marks a decimal fraction of a 32nd ("010" -> 0.010).
            let thirty_seconds = match (fraction.starts_with('0'), notation.decimals) {
                (true, None) => decimal(&format!("0.{fraction}"), raw)?,
                (true, Some(_)) => return Err(invalid()),
                (false, Some(decimals)) => decimal(&format!("{fraction}.{decimals}"), raw)?,
                (false, None) => decimal(fraction, raw)?,
            };
            let fraction_value = thirty_seconds / THIRTY_SECONDS;
            if handle.is_empty() {
                if !notation.signed {
                    return Err(invalid());
                }
                fraction_value
            } else {
                decimal(&handle, raw)?
                    .checked_add(fraction_value)
                    .ok_or_else(invalid)?
            }
        }
        None => match (handle.is_empty(), notation.decimals) {
            (true, None) => return Err(invalid()),
            (true, Some(decimals)) => decimal(&format!("0.{decimals}"), raw)?,
            (false, Some(decimals)) => decimal(&format!("{handle}.{decimals}"), raw)?,
            (false, None) => decimal(&handle, raw)?,
        },
    };

    Ok(Some(if notation.negative {
        -magnitude
    } else {
        magnitude
    }))
}

/// Parse a comma-grouped, optionally signed integer cell.
///
/// Grouping follows the same rule as price handles. `None`, the empty string
/// and `"-"` yield `Ok(None)`.
pub fn parse_grouped_int(literal: Option<&str>) -> CoreResult<Option<i64>> {
    let Some(raw) = literal else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NULL_SENTINEL {
        return Ok(None);
    }

    let invalid = || CoreError::InvalidIntegerFormat(raw.to_string());
    let (negative, digits) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit() || c == ',')
        || !valid_grouping(digits)
    {
        return Err(invalid());
    }

    let value: i64 = digits
        .chars()
        .filter(|c| *c != ',')
        .collect::<String>()
        .parse()
        .map_err(|_| invalid())?;
    Ok(Some(if negative { -value } else { value }))
}

/// A price literal that has passed [`validate_price`].
///
/// The scraped text is kept verbatim; [`PriceLiteral::value`] gives the
/// numeric reading when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PriceLiteral(String);

impl PriceLiteral {
    /// Validate a cell. The null sentinel and blank cells map to `None`.
    pub fn from_cell(cell: Option<&str>) -> CoreResult<Option<Self>> {
        match cell.map(str::trim) {
            None | Some("") | Some(NULL_SENTINEL) => Ok(None),
            Some(text) => {
                validate_price(text)?;
                Ok(Some(Self(text.to_string())))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, or `None` when the literal has no numeric reading
    /// (for example a bare sign).
    pub fn value(&self) -> Option<Decimal> {
        parse_price(Some(&self.0)).ok().flatten()
    }
}

impl TryFrom<String> for PriceLiteral {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        validate_price(&value)?;
        Ok(Self(value))
    }
}

impl From<PriceLiteral> for String {
    fn from(value: PriceLiteral) -> Self {
        value.0
    }
}

impl fmt::Display for PriceLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
