use std::sync::{Arc, Mutex};

use serde::Serialize;
use shared::constants::{BIG_REWARD_THRESHOLD, HISTORY_CAP, HISTORY_KEY};
use shared::shared_wheel_game::{SpinRecord, SpinResult};
use tracing::warn;
use uuid::Uuid;

use crate::storage::{KeyValueStore, StorageError};

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HistoryStats {
    pub total_spins: usize,
    pub big_rewards: usize,
}

/// Most-recent-first spin log, capped at `HISTORY_CAP` entries.
#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn list(&self) -> Result<Vec<SpinRecord>, StorageError> {
        match self.store.get(HISTORY_KEY)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(records) => Ok(records),
                Err(e) => {
                    warn!("Stored history is unreadable, starting empty: {}", e);
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    pub fn append(&self, record: SpinRecord) -> Result<Vec<SpinRecord>, StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut records = self.list()?;
        records.insert(0, record);
        records.truncate(HISTORY_CAP);
        self.store.set(HISTORY_KEY, &serde_json::to_string(&records)?)?;
        Ok(records)
    }

    pub fn record_result(&self, result: &SpinResult) -> Result<SpinRecord, StorageError> {
        let record = SpinRecord::from_result(Uuid::new_v4().to_string(), result);
        self.append(record.clone())?;
        Ok(record)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        self.store.remove(HISTORY_KEY)
    }

    pub fn stats(&self) -> Result<HistoryStats, StorageError> {
        let records = self.list()?;
        Ok(HistoryStats {
            total_spins: records.len(),
            big_rewards: records.iter().filter(|r| r.reward >= BIG_REWARD_THRESHOLD).count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn record(n: usize, reward: u64) -> SpinRecord {
        SpinRecord {
            id: format!("r{}", n),
            slice_id: "1".to_string(),
            label: format!("Prize {}", n),
            reward,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_cap_keeps_most_recent_first() {
        let service = HistoryService::new(Arc::new(MemoryStore::new()));
        for n in 0..51 {
            service.append(record(n, 10)).unwrap();
        }
        let records = service.list().unwrap();
        assert_eq!(records.len(), 50);
        assert_eq!(records[0].id, "r50");
        assert_eq!(records[49].id, "r1");
    }

    #[test]
    fn test_clear_and_stats() {
        let service = HistoryService::new(Arc::new(MemoryStore::new()));
        service.append(record(0, 2500)).unwrap();
        service.append(record(1, 7400)).unwrap();
        service.append(record(2, 75000)).unwrap();
        assert_eq!(
            service.stats().unwrap(),
            HistoryStats { total_spins: 3, big_rewards: 2 }
        );
        service.clear().unwrap();
        assert!(service.list().unwrap().is_empty());
    }
}
