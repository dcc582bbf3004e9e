//! Record store: the locally held copy of the server's record collection.
//!
//! Loads resolve latest-issued-wins: each `load()` takes a ticket when issued
//! and only the newest ticket may replace the held set. Confirmed deletes leave
//! a tombstone so an older load still in flight cannot bring the name back.

use crate::client::AnalysisApi;
use crate::error::{DashboardError, Operation, Result};
use crate::record::Record;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// What a completed `load()` did to the held set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Replaced { count: usize },
    /// A newer load was issued before this one resolved; its result was dropped.
    Superseded,
}

/// Point-in-time copy of the held set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub generation: u64,
    pub records: Vec<Record>,
}

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<Record>,
    generation: u64,
    issued: u64,
    /// Deleted name -> newest load ticket issued when the delete was confirmed.
    tombstones: HashMap<String, u64>,
}

pub struct RecordStore<C> {
    client: C,
    state: Mutex<StoreState>,
}

impl<C: AnalysisApi> RecordStore<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Replace the held set with the server's current collection.
    ///
    /// On failure the previous set is kept. A set with duplicate names is
    /// rejected as a decode error.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let ticket = {
            let mut state = self.lock();
            state.issued += 1;
            state.issued
        };

        let result = self.client.fetch_records().await;

        let mut state = self.lock();
        if ticket != state.issued {
            debug!(ticket, newest = state.issued, "Discarding superseded record load");
            return Ok(LoadOutcome::Superseded);
        }

        let records = result?;
        check_unique_names(&records)?;

        let mut records = records;
        if !state.tombstones.is_empty() {
            let tombstones = std::mem::take(&mut state.tombstones);
            records.retain(|record| {
                tombstones
                    .get(&record.name)
                    .map_or(true, |deleted_at| ticket > *deleted_at)
            });
        }

        let count = records.len();
        state.records = records;
        state.generation += 1;
        info!(count, generation = state.generation, "Loaded records");
        Ok(LoadOutcome::Replaced { count })
    }

    /// Delete a record on the server, then drop it from the held set.
    pub async fn delete(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DashboardError::validation(
                Operation::DeleteRecord,
                "record name must not be empty",
            )
            .with_record(name));
        }

        self.client.delete_record(name).await.map_err(|err| {
            if err.context.record.is_some() {
                err
            } else {
                err.with_record(name)
            }
        })?;

        let mut state = self.lock();
        let before = state.records.len();
        state.records.retain(|record| record.name != name);
        if state.records.len() != before {
            state.generation += 1;
        }
        let issued = state.issued;
        state.tombstones.insert(name.to_string(), issued);
        info!(record = name, generation = state.generation, "Deleted record");
        Ok(())
    }

    /// Counter bumped on every change to the held set.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.lock();
        StoreSnapshot {
            generation: state.generation,
            records: state.records.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().records.iter().any(|record| record.name == name)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn check_unique_names(records: &[Record]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.name.as_str()) {
            return Err(DashboardError::decode(
                Operation::FetchRecords,
                format!("server returned more than one record named '{}'", record.name),
            ));
        }
    }
    Ok(())
}
