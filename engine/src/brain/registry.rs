//! Protocol Registry
//!
//! Holds every known protocol by name together with its enabled flag.
//! Listing preserves registration order; re-registering a name replaces the
//! protocol in place.

use super::protocols;
use sdk::{Protocol, ProtocolCategory};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

struct RegistryEntry {
    protocol: Arc<dyn Protocol>,
    enabled: AtomicBool,
}

/// Name-indexed store of protocols
#[derive(Default)]
pub struct ProtocolRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

impl ProtocolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the built-in protocols
    pub fn with_builtin_protocols() -> Self {
        let mut registry = Self::new();
        for protocol in protocols::builtin_protocols() {
            registry.register(protocol);
        }
        registry
    }

    /// Insert or overwrite a protocol by name.
    ///
    /// The new entry is enabled. On overwrite the registration position is
    /// kept and the replaced protocol is returned.
    pub fn register(&mut self, protocol: Arc<dyn Protocol>) -> Option<Arc<dyn Protocol>> {
        let name = protocol.name().to_string();
        let entry = RegistryEntry {
            protocol,
            enabled: AtomicBool::new(true),
        };

        match self.index.get(&name) {
            Some(&position) => {
                warn!("Protocol '{}' registered twice, replacing previous entry", name);
                let old = std::mem::replace(&mut self.entries[position], entry);
                Some(old.protocol)
            }
            None => {
                debug!("Registered protocol '{}'", name);
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<Arc<dyn Protocol>> {
        self.entry(name).map(|e| Arc::clone(&e.protocol))
    }

    /// Enabled flag for a name, `None` when the name is unknown
    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.entry(name).map(|e| e.enabled.load(Ordering::SeqCst))
    }

    /// Flip the enabled flag. Returns false for unknown names.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.entry(name) {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Names in the given category, in registration order
    pub fn list_by_category(&self, category: ProtocolCategory) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.protocol.category() == category)
            .map(|e| e.protocol.name().to_string())
            .collect()
    }

    /// All names in registration order
    pub fn list_all(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.protocol.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&RegistryEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }
}
