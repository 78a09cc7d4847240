// src/category.rs - Event categories and their attribute registries
use crate::error::{AeError, Result};
use crate::value::ValueType;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reserved attribute id: the operator comment supplied with an
/// acknowledgement. Implicitly present on every category.
pub const ATTR_ID_ACK_COMMENT: u32 = 0xFFFF_FFFE;

/// Reserved attribute id: the process areas of the event's source.
/// Implicitly present on every category.
pub const ATTR_ID_AREAS: u32 = 0xFFFF_FFFF;

/// The three kinds of events an A&E server distributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Stateless informational event
    Simple,
    /// Operator/equipment action audit event, carries an actor id
    Tracking,
    /// Alarm state transition event, carries a condition snapshot
    Condition,
}

/// Declaration of one piece of data events of a category carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAttribute {
    pub id: u32,
    pub description: String,
    pub value_type: ValueType,
}

/// A category of events, with its declared attribute set
///
/// The attribute set is mutable only during server setup: creating the first
/// condition under a category freezes it for the rest of the process
/// lifetime.
#[derive(Debug)]
pub struct EventCategory {
    pub id: u32,
    pub description: String,
    pub kind: EventKind,
    attributes: RwLock<BTreeMap<u32, EventAttribute>>,
    frozen: AtomicBool,
}

impl EventCategory {
    pub fn new(id: u32, description: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id,
            description: description.into(),
            kind,
            attributes: RwLock::new(BTreeMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    /// Declare an attribute on this category
    ///
    /// Fails with `AlreadyExists` on a duplicate id, `InvalidArgument` for
    /// the reserved ids or once the category is frozen.
    pub fn add_attribute(&self, attribute: EventAttribute) -> Result<()> {
        if attribute.id == ATTR_ID_ACK_COMMENT || attribute.id == ATTR_ID_AREAS {
            return Err(AeError::InvalidArgument(format!(
                "attribute id {:#x} is reserved",
                attribute.id
            )));
        }
        if self.frozen.load(Ordering::Acquire) {
            return Err(AeError::InvalidArgument(format!(
                "category {} is frozen, attributes can no longer be added",
                self.id
            )));
        }
        let mut attributes = self.attributes.write();
        if attributes.contains_key(&attribute.id) {
            return Err(AeError::already_exists("attribute", attribute.id));
        }
        attributes.insert(attribute.id, attribute);
        Ok(())
    }

    /// Whether an attribute id is valid on this category, reserved ids
    /// included
    pub fn has_attribute(&self, id: u32) -> bool {
        id == ATTR_ID_ACK_COMMENT || id == ATTR_ID_AREAS || self.attributes.read().contains_key(&id)
    }

    /// Declared attributes in id order, without the implicit reserved pair
    pub fn attributes(&self) -> Vec<EventAttribute> {
        self.attributes.read().values().cloned().collect()
    }

    /// Make the attribute set immutable. Called when the first condition is
    /// created under this category.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(id: u32) -> EventAttribute {
        EventAttribute {
            id,
            description: format!("attr {}", id),
            value_type: ValueType::Float,
        }
    }

    #[test]
    fn test_add_and_lookup_attributes() {
        let cat = EventCategory::new(10, "Level", EventKind::Condition);
        cat.add_attribute(attr(100)).unwrap();
        assert!(cat.has_attribute(100));
        assert!(!cat.has_attribute(101));
        assert_eq!(cat.attributes().len(), 1);
    }

    #[test]
    fn test_reserved_attributes_always_present() {
        let cat = EventCategory::new(10, "Level", EventKind::Condition);
        assert!(cat.has_attribute(ATTR_ID_ACK_COMMENT));
        assert!(cat.has_attribute(ATTR_ID_AREAS));
        assert!(matches!(
            cat.add_attribute(attr(ATTR_ID_AREAS)),
            Err(AeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let cat = EventCategory::new(10, "Level", EventKind::Condition);
        cat.add_attribute(attr(100)).unwrap();
        assert!(matches!(
            cat.add_attribute(attr(100)),
            Err(AeError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_freeze_blocks_mutation() {
        let cat = EventCategory::new(10, "Level", EventKind::Condition);
        cat.add_attribute(attr(100)).unwrap();
        cat.freeze();
        assert!(cat.is_frozen());
        assert!(matches!(
            cat.add_attribute(attr(101)),
            Err(AeError::InvalidArgument(_))
        ));
        // Existing declarations stay visible
        assert!(cat.has_attribute(100));
    }
}
