//! Read-side views over stored market data.
//!
//! [`FuturesDataService`] joins the two tables of one trade date on the
//! contract month; [`TradeDateService`] lists the dates for which such a
//! join has rows.

use crate::error::{QueryError, QueryResult};
use cme_core::{AssetId, AssetName, PriceLiteral, TradeDate, YearMonth};
use cme_persistence::{
    AssetDirectory, SettlementRepository, TradeDateQuery, TradeDateRepository, VolumeOiRepository,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Settle price, volume and open interest of one contract month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuturesDataPoint {
    pub month: YearMonth,
    pub settle: PriceLiteral,
    /// `total_volume` of the volume/OI row.
    pub volume: u64,
    /// `at_close` of the volume/OI row.
    pub open_interest: u64,
}

/// A [`FuturesDataPoint`] with the settle difference to the previous month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadPoint {
    #[serde(flatten)]
    pub point: FuturesDataPoint,
    /// Zero for the nearest month. `None` when either settle has no
    /// numeric reading.
    pub settle_spread: Option<Decimal>,
}

fn asset_name(name: &str) -> QueryResult<AssetName> {
    AssetName::new(name).map_err(|e| QueryError::InvalidInput(e.to_string()))
}

fn resolve<S: AssetDirectory + ?Sized>(store: &S, name: &str) -> QueryResult<Option<AssetId>> {
    let name = asset_name(name)?;
    let id = store.asset_id(&name)?;
    if id.is_none() {
        debug!(asset = %name, "Unknown asset, nothing stored");
    }
    Ok(id)
}

pub struct FuturesDataService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> FuturesDataService<'a, S>
where
    S: AssetDirectory + SettlementRepository + VolumeOiRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Months with both a settlement and a volume/OI row, ordered by month.
    /// An unknown asset yields no points.
    pub fn futures_data(
        &self,
        asset: &str,
        trade_date: TradeDate,
    ) -> QueryResult<Vec<FuturesDataPoint>> {
        let Some(asset_id) = resolve(self.store, asset)? else {
            return Ok(Vec::new());
        };

        let mut by_month: BTreeMap<YearMonth, (u64, u64)> = self
            .store
            .volume_oi(asset_id, trade_date)?
            .into_iter()
            .map(|r| (r.entity.month(), (r.entity.total_volume(), r.entity.at_close())))
            .collect();

        Ok(self
            .store
            .settlements(asset_id, trade_date)?
            .into_iter()
            .filter_map(|r| {
                let (volume, open_interest) = by_month.remove(&r.entity.month())?;
                Some(FuturesDataPoint {
                    month: r.entity.month(),
                    settle: r.entity.settle().clone(),
                    volume,
                    open_interest,
                })
            })
            .collect())
    }

    /// [`Self::futures_data`] with month-over-month settle spreads.
    pub fn futures_curve(&self, asset: &str, trade_date: TradeDate) -> QueryResult<Vec<SpreadPoint>> {
        add_settlement_spread(self.futures_data(asset, trade_date)?)
    }
}

/// Attach each month's settle minus the previous month's. Points are sorted
/// by month first. Fails on an empty curve.
pub fn add_settlement_spread(mut points: Vec<FuturesDataPoint>) -> QueryResult<Vec<SpreadPoint>> {
    if points.is_empty() {
        return Err(QueryError::EmptyCurve);
    }
    points.sort_by_key(|p| p.month);

    let mut previous: Option<Option<Decimal>> = None;
    Ok(points
        .into_iter()
        .map(|point| {
            let settle = point.settle.value();
            let settle_spread = match previous {
                None => Some(Decimal::ZERO),
                Some(prev) => settle.zip(prev).map(|(cur, prev)| cur - prev),
            };
            previous = Some(settle);
            SpreadPoint {
                point,
                settle_spread,
            }
        })
        .collect())
}

pub struct TradeDateService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> TradeDateService<'a, S>
where
    S: AssetDirectory + TradeDateRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Trade dates of `asset` with joined data, ascending.
    pub fn fetch_trade_dates(
        &self,
        asset: &str,
        query: &TradeDateQuery,
    ) -> QueryResult<Vec<TradeDate>> {
        if let (Some(start), Some(end)) = (query.start, query.end) {
            if start > end {
                return Err(QueryError::InvalidInput(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        if query.limit == 0 {
            return Err(QueryError::InvalidInput("limit must be at least 1".to_string()));
        }
        let Some(asset_id) = resolve(self.store, asset)? else {
            return Ok(Vec::new());
        };
        Ok(self.store.trade_dates(asset_id, query)?)
    }
}
