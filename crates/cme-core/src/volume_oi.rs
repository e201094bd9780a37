//! Volume and open interest entity.

use crate::asset::AssetId;
use crate::error::{CoreError, CoreResult};
use crate::fields;
use crate::schema::{RawRow, TableKind};
use crate::trade_date::TradeDate;
use crate::year_month::YearMonth;
use serde::{Deserialize, Serialize};

/// Daily volume and open interest of one contract month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeOi {
    asset_id: AssetId,
    trade_date: TradeDate,
    month: YearMonth,
    globex: Option<i64>,
    open_outcry: Option<i64>,
    clear_port: Option<i64>,
    total_volume: u64,
    block_trades: Option<i64>,
    efp: Option<i64>,
    efr: Option<i64>,
    tas: Option<i64>,
    deliveries: Option<i64>,
    at_close: u64,
    change: Option<i64>,
    is_final: bool,
}

/// Flat storage form of a volume/OI row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeOiRecord {
    pub asset_id: i64,
    pub trade_date: String,
    pub month: String,
    pub globex: Option<i64>,
    pub open_outcry: Option<i64>,
    pub clear_port: Option<i64>,
    pub total_volume: i64,
    pub block_trades: Option<i64>,
    pub efp: Option<i64>,
    pub efr: Option<i64>,
    pub tas: Option<i64>,
    pub deliveries: Option<i64>,
    pub at_close: i64,
    pub change: Option<i64>,
    pub is_final: bool,
}

impl VolumeOi {
    /// Build from an extracted volume/OI row and the page's finality label.
    pub fn from_scrape(
        asset_id: AssetId,
        trade_date: TradeDate,
        row: &RawRow,
        is_final: bool,
    ) -> CoreResult<Self> {
        fields::expect_kind(row, TableKind::VolumeAndOpenInterest)?;
        let month = YearMonth::from_string(row.get("month").unwrap_or_default())?;
        let int = |field: &'static str| fields::int(field, row.get(field));

        Ok(Self {
            asset_id,
            trade_date,
            month,
            globex: int("globex")?,
            open_outcry: int("open_outcry")?,
            clear_port: int("clear_port")?,
            total_volume: fields::required_count("total_volume", row.get("total_volume"))?,
            block_trades: int("block_trades")?,
            efp: int("efp")?,
            efr: int("efr")?,
            tas: int("tas")?,
            deliveries: int("deliveries")?,
            at_close: fields::required_count("at_close", row.get("at_close"))?,
            change: int("change")?,
            is_final,
        })
    }

    /// Rebuild from a stored row, re-checking every invariant.
    pub fn from_store(record: VolumeOiRecord) -> CoreResult<Self> {
        Ok(Self {
            asset_id: AssetId(record.asset_id),
            trade_date: TradeDate::parse_iso(&record.trade_date)?,
            month: YearMonth::from_db_format(&record.month)?,
            globex: record.globex,
            open_outcry: record.open_outcry,
            clear_port: record.clear_port,
            total_volume: fields::non_negative("total_volume", record.total_volume)?,
            block_trades: record.block_trades,
            efp: record.efp,
            efr: record.efr,
            tas: record.tas,
            deliveries: record.deliveries,
            at_close: fields::non_negative("at_close", record.at_close)?,
            change: record.change,
            is_final: record.is_final,
        })
    }

    /// Flatten for storage.
    pub fn to_record(&self) -> CoreResult<VolumeOiRecord> {
        let count = |field, v: u64| {
            i64::try_from(v).map_err(|_| CoreError::validation(field, format!("{v} overflows")))
        };

        Ok(VolumeOiRecord {
            asset_id: self.asset_id.0,
            trade_date: self.trade_date.to_string(),
            month: self.month.to_db_format(),
            globex: self.globex,
            open_outcry: self.open_outcry,
            clear_port: self.clear_port,
            total_volume: count("total_volume", self.total_volume)?,
            block_trades: self.block_trades,
            efp: self.efp,
            efr: self.efr,
            tas: self.tas,
            deliveries: self.deliveries,
            at_close: count("at_close", self.at_close)?,
            change: self.change,
            is_final: self.is_final,
        })
    }

    /// Same row marked final.
    pub fn finalized(&self) -> Self {
        Self {
            is_final: true,
            ..self.clone()
        }
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

    pub fn globex(&self) -> Option<i64> {
        self.globex
    }

    pub fn open_outcry(&self) -> Option<i64> {
        self.open_outcry
    }

    pub fn clear_port(&self) -> Option<i64> {
        self.clear_port
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    pub fn block_trades(&self) -> Option<i64> {
        self.block_trades
    }

    pub fn efp(&self) -> Option<i64> {
        self.efp
    }

    pub fn efr(&self) -> Option<i64> {
        self.efr
    }

    pub fn tas(&self) -> Option<i64> {
        self.tas
    }

    pub fn deliveries(&self) -> Option<i64> {
        self.deliveries
    }

    pub fn at_close(&self) -> u64 {
        self.at_close
    }

    pub fn change(&self) -> Option<i64> {
        self.change
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }
}
