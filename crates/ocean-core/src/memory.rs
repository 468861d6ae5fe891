use crate::{Error, KeyValueStore};
use std::cell::RefCell;
use std::collections::HashMap;

/// In-process key-value storage, optionally capped like a browser's quota.
///
/// Usage counts the bytes of every key and value. A write that would push the
/// total over the quota is rejected and leaves the previous value in place.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: RefCell::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Bytes currently held (keys plus values).
    pub fn usage(&self) -> usize {
        self.items
            .borrow()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        if let Some(quota) = self.quota {
            let existing = self
                .items
                .borrow()
                .get(key)
                .map(|v| key.len() + v.len())
                .unwrap_or(0);
            let needed = self.usage() - existing + key.len() + value.len();
            if needed > quota {
                return Err(Error::QuotaExceeded { needed, quota });
            }
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Error> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}
