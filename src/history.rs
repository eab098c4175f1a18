//! Usage history: every schedule a signed-in submitter computes is kept with
//! the parameters that produced it.
//!
//! The core never touches this module. The HTTP layer stores a record after a
//! schedule has been computed and lists them back newest first.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{LoanParameters, ScheduleResult};

pub type UserId = u64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("usage store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUsageRecord {
    pub user_id: UserId,
    pub parameters: LoanParameters,
    pub result: ScheduleResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: u64,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub parameters: LoanParameters,
    pub result: ScheduleResult,
}

pub trait UsageStore: Send + Sync {
    fn store_usage_record(&self, record: NewUsageRecord) -> StoreResult<UsageRecord>;

    /// Records for `user_id`, newest first.
    fn list_usage_records(&self, user_id: UserId) -> StoreResult<Vec<UsageRecord>>;
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    records: Vec<UsageRecord>,
}

/// Process-local store; records are never evicted, so it is not meant for
/// production use.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    inner: RwLock<Inner>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_at(
        &self,
        record: NewUsageRecord,
        created_at: DateTime<Utc>,
    ) -> StoreResult<UsageRecord> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.next_id += 1;
        let stored = UsageRecord {
            id: inner.next_id,
            user_id: record.user_id,
            created_at,
            parameters: record.parameters,
            result: record.result,
        };
        inner.records.push(stored.clone());
        Ok(stored)
    }
}

impl UsageStore for InMemoryUsageStore {
    fn store_usage_record(&self, record: NewUsageRecord) -> StoreResult<UsageRecord> {
        self.insert_at(record, Utc::now())
    }

    fn list_usage_records(&self, user_id: UserId) -> StoreResult<Vec<UsageRecord>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut records: Vec<UsageRecord> = inner
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }
}
