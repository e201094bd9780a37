//! Decides whether an observed table supersedes what is stored.

use cme_core::{AssetId, FreshnessAction, FreshnessSignal, FreshnessState, TradeDate};
use cme_persistence::{MarketDataRepository, PersistenceResult};
use tracing::debug;

/// Compares a page's freshness signal with the store.
pub struct FreshnessReconciler<'a, S: MarketDataRepository + ?Sized> {
    store: &'a S,
}

impl<'a, S: MarketDataRepository + ?Sized> FreshnessReconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Classify the stored rows of `(asset_id, trade_date)` against `signal`.
    pub fn state(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
        signal: FreshnessSignal,
    ) -> PersistenceResult<FreshnessState> {
        let state = match signal {
            FreshnessSignal::LastUpdated(observed) => {
                let stored = self.store.settlement_last_updated(asset_id, trade_date)?;
                FreshnessState::for_settlement(stored, observed)
            }
            FreshnessSignal::Finality(observed) => {
                let stored = self.store.volume_oi_is_final(asset_id, trade_date)?;
                FreshnessState::for_volume_oi(stored, observed)
            }
        };
        debug!(%asset_id, %trade_date, %signal, ?state, "Reconciled freshness");
        Ok(state)
    }

    pub fn decide(
        &self,
        asset_id: AssetId,
        trade_date: TradeDate,
        signal: FreshnessSignal,
    ) -> PersistenceResult<FreshnessAction> {
        Ok(self.state(asset_id, trade_date, signal)?.action())
    }
}
