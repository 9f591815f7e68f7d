use std::sync::Arc;

use shared::constants::SLICES_KEY;
use shared::shared_wheel_game::{default_slices, Slice};
use tracing::{info, warn};

use crate::storage::{KeyValueStore, StorageError};

/// Reward configuration backed by the key-value store.
#[derive(Clone)]
pub struct SliceService {
    store: Arc<dyn KeyValueStore>,
}

impl SliceService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved slices in their saved order, or the defaults when nothing is saved.
    pub fn get_slices(&self) -> Result<Vec<Slice>, StorageError> {
        match self.store.get(SLICES_KEY)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(slices) => Ok(slices),
                Err(e) => {
                    warn!("Stored slices are unreadable, using defaults: {}", e);
                    Ok(default_slices())
                }
            },
            None => Ok(default_slices()),
        }
    }

    pub fn set_slices(&self, slices: &[Slice]) -> Result<(), StorageError> {
        self.store.set(SLICES_KEY, &serde_json::to_string(slices)?)?;
        info!("Saved {} wheel slices", slices.len());
        Ok(())
    }

    pub fn reset(&self) -> Result<Vec<Slice>, StorageError> {
        let slices = default_slices();
        self.set_slices(&slices)?;
        Ok(slices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_until_saved() {
        let service = SliceService::new(Arc::new(MemoryStore::new()));
        assert_eq!(service.get_slices().unwrap(), default_slices());
    }

    #[test]
    fn test_saved_order_and_fields_are_kept() {
        let store = Arc::new(MemoryStore::new());
        let service = SliceService::new(store.clone());
        let mut slices = default_slices();
        slices.reverse();
        slices[0].reward = 0;
        slices[0].weight = 0.5;
        service.set_slices(&slices).unwrap();
        assert_eq!(service.get_slices().unwrap(), slices);

        assert_eq!(service.reset().unwrap(), default_slices());
        assert_eq!(service.get_slices().unwrap(), default_slices());
    }

    #[test]
    fn test_unreadable_value_falls_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(SLICES_KEY, "{broken").unwrap();
        let service = SliceService::new(store);
        assert_eq!(service.get_slices().unwrap(), default_slices());
    }
}
