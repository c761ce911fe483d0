//! In-process store used by tests and the default command runner

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shared::{EntryAggregate, PurchaseRate, SampleEntry};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChildWrite, EntryStore, ExpectedState};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct State {
    entries: HashMap<Uuid, EntryAggregate>,
    lots: HashMap<Uuid, Uuid>,
    rates: HashMap<Uuid, PurchaseRate>,
}

/// Aggregates held behind one lock; a transaction builds the new aggregate
/// on a copy and swaps it in only when every write applied.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_next_save: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save_transaction` fail as if the backend went away
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn insert_entry(&self, entry: &SampleEntry) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.entries.contains_key(&entry.id) {
            return Err(AppError::Conflict(format!("Sample entry {} already exists", entry.id)));
        }
        state
            .entries
            .insert(entry.id, EntryAggregate::new(entry.clone()));
        Ok(())
    }

    async fn load(&self, entry_id: Uuid) -> AppResult<Option<EntryAggregate>> {
        Ok(self.state.read().await.entries.get(&entry_id).cloned())
    }

    async fn find_lot(&self, lot_id: Uuid) -> AppResult<Option<Uuid>> {
        Ok(self.state.read().await.lots.get(&lot_id).copied())
    }

    async fn save_transaction(
        &self,
        expected: ExpectedState,
        entry: &SampleEntry,
        writes: &[ChildWrite],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(AppError::PersistenceFailure(
                "memory store: injected failure".to_string(),
            ));
        }

        let current = state
            .entries
            .get(&entry.id)
            .ok_or_else(|| AppError::NotFound(format!("Sample entry {}", entry.id)))?;
        if ExpectedState::of(&current.entry) != expected {
            return Err(AppError::Conflict(format!(
                "Sample entry {} changed: expected {} v{}, found {} v{}",
                entry.id,
                expected.status,
                expected.version,
                current.entry.workflow_status,
                current.entry.version
            )));
        }

        let mut next = current.clone();
        next.entry = entry.clone();
        for write in writes {
            if let Some(lot_id) = write.lot_id() {
                state.lots.insert(lot_id, entry.id);
            }
            write.clone().apply_to(&mut next);
        }
        state.entries.insert(entry.id, next);
        Ok(())
    }

    async fn load_purchase_rate(&self, rate_id: Uuid) -> AppResult<Option<PurchaseRate>> {
        Ok(self.state.read().await.rates.get(&rate_id).cloned())
    }

    async fn find_purchase_rate_by_arrival(&self, arrival_id: Uuid) -> AppResult<Option<PurchaseRate>> {
        Ok(self
            .state
            .read()
            .await
            .rates
            .values()
            .find(|r| r.arrival_id == arrival_id)
            .cloned())
    }

    async fn save_purchase_rate(&self, rate: &PurchaseRate, expected_version: Option<i64>) -> AppResult<()> {
        let mut state = self.state.write().await;
        let stored = state.rates.get(&rate.id).map(|r| r.version);
        match (stored, expected_version) {
            (None, None) => {
                if let Some(existing) = state.rates.values().find(|r| r.arrival_id == rate.arrival_id) {
                    return Err(AppError::Conflict(format!(
                        "Arrival {} already has purchase rate {}",
                        rate.arrival_id, existing.id
                    )));
                }
            }
            (Some(found), Some(expected)) if found == expected => {}
            (Some(_), None) => {
                return Err(AppError::Conflict(format!("Purchase rate {} already exists", rate.id)))
            }
            (None, Some(_)) => return Err(AppError::NotFound(format!("Purchase rate {}", rate.id))),
            (Some(found), Some(expected)) => {
                return Err(AppError::Conflict(format!(
                    "Purchase rate {} changed: expected v{}, found v{}",
                    rate.id, expected, found
                )))
            }
        }
        state.rates.insert(rate.id, rate.clone());
        Ok(())
    }
}
