//! Cell-to-field conversions shared by the entity factories.

use crate::error::{CoreError, CoreResult};
use crate::price::{parse_grouped_int, PriceLiteral};
use crate::schema::{RawRow, TableKind};

pub(crate) fn expect_kind(row: &RawRow, kind: TableKind) -> CoreResult<()> {
    if row.kind() != kind {
        return Err(CoreError::validation(
            "row",
            format!("expected a {kind} row, got {}", row.kind()),
        ));
    }
    Ok(())
}

pub(crate) fn price(field: &'static str, cell: Option<&str>) -> CoreResult<Option<PriceLiteral>> {
    PriceLiteral::from_cell(cell).map_err(|e| CoreError::validation(field, e.to_string()))
}

pub(crate) fn required_price(field: &'static str, cell: Option<&str>) -> CoreResult<PriceLiteral> {
    price(field, cell)?.ok_or_else(|| CoreError::validation(field, "value is required"))
}

pub(crate) fn int(field: &'static str, cell: Option<&str>) -> CoreResult<Option<i64>> {
    parse_grouped_int(cell).map_err(|e| CoreError::validation(field, e.to_string()))
}

pub(crate) fn required_count(field: &'static str, cell: Option<&str>) -> CoreResult<u64> {
    let value = int(field, cell)?.ok_or_else(|| CoreError::validation(field, "value is required"))?;
    non_negative(field, value)
}

pub(crate) fn non_negative(field: &'static str, value: i64) -> CoreResult<u64> {
    u64::try_from(value).map_err(|_| CoreError::validation(field, format!("{value} is negative")))
}
