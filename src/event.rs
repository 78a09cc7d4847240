// src/event.rs - Immutable event records
use crate::category::EventKind;
use crate::error::Result;
use crate::value::{Quality, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Condition state flags carried on a condition event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionStateFlags {
    pub active: bool,
    pub enabled: bool,
    pub acked: bool,
}

/// Snapshot of a condition's state at event creation time
///
/// Decoupled from the live condition: later mutation never changes an
/// already-fired event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSnapshot {
    /// Condition cookie, resolves back to the condition for acknowledgement
    pub condition_id: u32,
    pub condition_name: String,
    pub sub_condition_name: String,
    pub state: ConditionStateFlags,
    pub ack_required: bool,
    pub quality: Quality,
    /// Time of the activation this event belongs to; the value an
    /// acknowledgement must echo back
    pub active_time: DateTime<Utc>,
}

/// An immutable record of one observable occurrence
///
/// Created by the event space for every simple/tracking report and every
/// effective condition transition, then shared by reference with all
/// subscription buffers ([`Arc<Event>`]); never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub category_id: u32,
    pub source_name: String,
    /// Copy of the source's process areas at creation time, used by area
    /// filters and the reserved AREAS attribute
    pub source_areas: Vec<String>,
    pub message: String,
    pub severity: u16,
    pub timestamp: DateTime<Utc>,
    /// Tracking events only: who performed the audited action
    pub actor_id: Option<String>,
    /// Condition events only
    pub condition: Option<ConditionSnapshot>,
    /// Independent copy of attribute values at creation time
    pub attributes: HashMap<u32, Value>,
}

impl Event {
    /// Build a simple event
    pub fn simple(
        category_id: u32,
        source_name: impl Into<String>,
        source_areas: Vec<String>,
        message: impl Into<String>,
        severity: u16,
        timestamp: DateTime<Utc>,
        attributes: HashMap<u32, Value>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind: EventKind::Simple,
            category_id,
            source_name: source_name.into(),
            source_areas,
            message: message.into(),
            severity,
            timestamp,
            actor_id: None,
            condition: None,
            attributes,
        })
    }

    /// Build a tracking event carrying the acting operator/equipment id
    #[allow(clippy::too_many_arguments)]
    pub fn tracking(
        category_id: u32,
        source_name: impl Into<String>,
        source_areas: Vec<String>,
        message: impl Into<String>,
        severity: u16,
        actor_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        attributes: HashMap<u32, Value>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind: EventKind::Tracking,
            category_id,
            source_name: source_name.into(),
            source_areas,
            message: message.into(),
            severity,
            timestamp,
            actor_id: Some(actor_id.into()),
            condition: None,
            attributes,
        })
    }

    /// Whether this is a condition event
    pub fn is_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// Serialize this event as a JSON document, the export form for audit
    /// trails and downstream log pipelines
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_event_shape() {
        let event = Event::simple(
            1,
            "Plant.Tank1",
            vec!["TankFarm".into()],
            "pump started",
            100,
            Utc::now(),
            HashMap::new(),
        );
        assert_eq!(event.kind, EventKind::Simple);
        assert!(event.actor_id.is_none());
        assert!(!event.is_condition());
    }

    #[test]
    fn test_tracking_event_carries_actor() {
        let event = Event::tracking(
            2,
            "Plant.Valve7",
            vec![],
            "setpoint changed",
            300,
            "operator-17",
            Utc::now(),
            HashMap::new(),
        );
        assert_eq!(event.kind, EventKind::Tracking);
        assert_eq!(event.actor_id.as_deref(), Some("operator-17"));
    }

    #[test]
    fn test_event_json_round_trip() {
        let event = Event::simple(
            1,
            "Plant.Tank1",
            vec!["TankFarm".into()],
            "hello",
            800,
            Utc::now(),
            HashMap::from([(100, Value::Float(12.5))]),
        );
        let json = event.to_json().unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.severity, 800);
        assert_eq!(back.attributes.get(&100), Some(&Value::Float(12.5)));
    }
}
