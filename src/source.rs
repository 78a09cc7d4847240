// src/source.rs - Event sources (tags, equipment) that conditions attach to
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Static description of a source as registered at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: u32,
    /// Fully-qualified name, unique within the event space
    pub name: String,
    /// Process areas this source belongs to
    pub areas: Vec<String>,
}

/// A registered source plus the set of conditions attached to it
///
/// The attached set is written only by the registration path; the runtime
/// paths (event validation, refresh, area filtering) read the static fields.
#[derive(Debug)]
pub struct Source {
    pub id: u32,
    pub name: String,
    pub areas: Vec<String>,
    attached: RwLock<BTreeSet<u32>>,
}

impl Source {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            id: config.id,
            name: config.name,
            areas: config.areas,
            attached: RwLock::new(BTreeSet::new()),
        }
    }

    /// Record a condition as attached; returns false if it already was
    pub fn attach_condition(&self, condition_id: u32) -> bool {
        self.attached.write().insert(condition_id)
    }

    /// Ids of the conditions attached to this source
    pub fn condition_ids(&self) -> Vec<u32> {
        self.attached.read().iter().copied().collect()
    }
}
