use std::collections::{HashMap, HashSet};

/// Address to user fid mappings resolved so far in a run.
///
/// Entries are only ever added. Addresses that resolved to no user are not
/// remembered and will be queried again by later batches.
#[derive(Debug, Default, Clone)]
pub struct AddressCache {
    entries: HashMap<String, i64>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<i64> {
        self.entries.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Addresses of `addresses` without a cached mapping.
    pub fn missing(&self, addresses: &HashSet<String>) -> HashSet<String> {
        addresses.iter().filter(|address| !self.entries.contains_key(*address)).cloned().collect()
    }

    pub fn extend(&mut self, resolved: HashMap<String, i64>) {
        self.entries.extend(resolved);
    }
}
