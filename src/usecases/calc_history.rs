//! Calculator history, newest first and capped at [`CALC_HISTORY_LIMIT`].

use crate::domain::calc::{CalcEntry, CALC_HISTORY_LIMIT};

use super::{
    contracts::{StoreError, SyncBackend},
    dual_store::{DualStore, Routed},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcHistoryError {
    #[error("calculation is empty")]
    EmptyCalculation,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn record<R, L>(
    store: &DualStore<R, L>,
    user_id: &str,
    calculation: &str,
    now_ms: i64,
) -> Result<Routed<CalcEntry>, CalcHistoryError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    let calculation = calculation.trim();
    if calculation.is_empty() {
        return Err(CalcHistoryError::EmptyCalculation);
    }

    let entry = CalcEntry::new(calculation, now_ms);
    let routed = store.insert_calculation(user_id, &entry)?;
    Ok(routed.map(|()| entry))
}

pub fn list<R, L>(store: &DualStore<R, L>, user_id: &str) -> Result<Routed<Vec<CalcEntry>>, StoreError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    store.list_calculations(user_id, CALC_HISTORY_LIMIT)
}

pub fn clear<R, L>(store: &DualStore<R, L>, user_id: &str) -> Result<Routed<()>, StoreError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    store.clear_calculations(user_id)
}
