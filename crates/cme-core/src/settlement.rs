//! Settlement entity.

use crate::asset::AssetId;
use crate::error::{CoreError, CoreResult};
use crate::fields;
use crate::price::PriceLiteral;
use crate::schema::{RawRow, TableKind};
use crate::timestamp::{from_millis, truncate_to_millis};
use crate::trade_date::TradeDate;
use crate::year_month::YearMonth;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Daily settlement of one contract month.
///
/// Only built through [`Settlement::from_scrape`] or
/// [`Settlement::from_store`]; a revision is a new value passed to the
/// repository's `update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    asset_id: AssetId,
    trade_date: TradeDate,
    month: YearMonth,
    open: Option<PriceLiteral>,
    high: Option<PriceLiteral>,
    low: Option<PriceLiteral>,
    last: Option<PriceLiteral>,
    change: Option<PriceLiteral>,
    settle: PriceLiteral,
    est_volume: u64,
    prior_day_oi: u64,
    last_updated: DateTime<Utc>,
}

/// Flat storage form of a settlement row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub asset_id: i64,
    /// `YYYY-MM-DD`
    pub trade_date: String,
    /// `YYYY-MM`
    pub month: String,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub last: Option<String>,
    pub change: Option<String>,
    pub settle: String,
    pub est_volume: i64,
    pub prior_day_oi: i64,
    /// UTC epoch milliseconds.
    pub last_updated_ms: i64,
}

impl Settlement {
    /// Build from an extracted settlements row.
    pub fn from_scrape(
        asset_id: AssetId,
        trade_date: TradeDate,
        row: &RawRow,
        last_updated: DateTime<Utc>,
    ) -> CoreResult<Self> {
        fields::expect_kind(row, TableKind::Settlements)?;
        let month = YearMonth::from_string(row.get("month").unwrap_or_default())?;

        Ok(Self {
            asset_id,
            trade_date,
            month,
            open: fields::price("open", row.get("open"))?,
            high: fields::price("high", row.get("high"))?,
            low: fields::price("low", row.get("low"))?,
            last: fields::price("last", row.get("last"))?,
            change: fields::price("change", row.get("change"))?,
            settle: fields::required_price("settle", row.get("settle"))?,
            est_volume: fields::required_count("est_volume", row.get("est_volume"))?,
            prior_day_oi: fields::required_count("prior_day_oi", row.get("prior_day_oi"))?,
            last_updated: truncate_to_millis(last_updated),
        })
    }

    /// Rebuild from a stored row, re-checking every invariant.
    pub fn from_store(record: SettlementRecord) -> CoreResult<Self> {
        let price = |field, value: &Option<String>| fields::price(field, value.as_deref());

        Ok(Self {
            asset_id: AssetId(record.asset_id),
            trade_date: TradeDate::parse_iso(&record.trade_date)?,
            month: YearMonth::from_db_format(&record.month)?,
            open: price("open", &record.open)?,
            high: price("high", &record.high)?,
            low: price("low", &record.low)?,
            last: price("last", &record.last)?,
            change: price("change", &record.change)?,
            settle: fields::required_price("settle", Some(&record.settle))?,
            est_volume: fields::non_negative("est_volume", record.est_volume)?,
            prior_day_oi: fields::non_negative("prior_day_oi", record.prior_day_oi)?,
            last_updated: from_millis(record.last_updated_ms)?,
        })
    }

    /// Flatten for storage.
    pub fn to_record(&self) -> CoreResult<SettlementRecord> {
        let text = |p: &Option<PriceLiteral>| p.as_ref().map(|p| p.as_str().to_string());
        let count = |field, v: u64| {
            i64::try_from(v).map_err(|_| CoreError::validation(field, format!("{v} overflows")))
        };

        Ok(SettlementRecord {
            asset_id: self.asset_id.0,
            trade_date: self.trade_date.to_string(),
            month: self.month.to_db_format(),
            open: text(&self.open),
            high: text(&self.high),
            low: text(&self.low),
            last: text(&self.last),
            change: text(&self.change),
            settle: self.settle.as_str().to_string(),
            est_volume: count("est_volume", self.est_volume)?,
            prior_day_oi: count("prior_day_oi", self.prior_day_oi)?,
            last_updated_ms: self.last_updated.timestamp_millis(),
        })
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    pub fn trade_date(&self) -> TradeDate {
        self.trade_date
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn open(&self) -> Option<&PriceLiteral> {
        self.open.as_ref()
    }

    pub fn high(&self) -> Option<&PriceLiteral> {
        self.high.as_ref()
    }

    pub fn low(&self) -> Option<&PriceLiteral> {
        self.low.as_ref()
    }

    pub fn last(&self) -> Option<&PriceLiteral> {
        self.last.as_ref()
    }

    pub fn change(&self) -> Option<&PriceLiteral> {
        self.change.as_ref()
    }

    pub fn settle(&self) -> &PriceLiteral {
        &self.settle
    }

    pub fn est_volume(&self) -> u64 {
        self.est_volume
    }

    pub fn prior_day_oi(&self) -> u64 {
        self.prior_day_oi
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}
