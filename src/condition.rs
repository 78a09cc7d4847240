// src/condition.rs - Runtime alarm instances and their state machine
use crate::category::{EventKind, ATTR_ID_ACK_COMMENT, ATTR_ID_AREAS};
use crate::definition::ConditionDefinition;
use crate::error::{AeError, Result};
use crate::event::{ConditionSnapshot, ConditionStateFlags, Event};
use crate::value::{Quality, Value};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Which observable fields a state change actually touched
///
/// An all-zero mask means the reported change was a no-op and no event is
/// emitted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeMask(u8);

impl ChangeMask {
    pub const ACTIVE: ChangeMask = ChangeMask(0x01);
    pub const ENABLED: ChangeMask = ChangeMask(0x02);
    pub const ACKED: ChangeMask = ChangeMask(0x04);
    pub const SUB_CONDITION: ChangeMask = ChangeMask(0x08);
    pub const SEVERITY: ChangeMask = ChangeMask(0x10);
    pub const MESSAGE: ChangeMask = ChangeMask(0x20);
    pub const QUALITY: ChangeMask = ChangeMask(0x40);
    pub const ATTRIBUTES: ChangeMask = ChangeMask(0x80);

    pub fn set(&mut self, bit: ChangeMask) {
        self.0 |= bit.0;
    }

    pub fn contains(&self, bit: ChangeMask) -> bool {
        self.0 & bit.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// One reported state change for a condition
///
/// `None` fields mean "unchanged". `sub_condition` selects a level of a
/// multi-state definition by name; leaving it out keeps the current level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionUpdate {
    pub active: bool,
    pub sub_condition: Option<String>,
    pub severity: Option<u16>,
    pub message: Option<String>,
    pub quality: Option<Quality>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Per-update override of the level's ack-required flag
    pub ack_required: Option<bool>,
    /// Replacement values for declared attributes
    #[serde(default)]
    pub attributes: HashMap<u32, Value>,
}

/// Mutable state owned by a [`Condition`], guarded by its lock
#[derive(Debug, Clone)]
struct ConditionState {
    active: bool,
    enabled: bool,
    acked: bool,
    active_sub: usize,
    severity: u16,
    message: String,
    quality: Quality,
    ack_required: bool,
    attributes: HashMap<u32, Value>,
    /// Time of the most recent inactive-to-active transition; the value an
    /// acknowledgement must echo back
    active_time: DateTime<Utc>,
    last_active: Option<DateTime<Utc>>,
    last_inactive: Option<DateTime<Utc>>,
    last_ack: Option<DateTime<Utc>>,
    acknowledger: Option<String>,
    ack_comment: Option<String>,
}

/// A runtime alarm instance binding one definition to one source
///
/// All mutation goes through the operations below; the per-condition lock
/// makes concurrent `change_state`/`acknowledge` calls on the same condition
/// safe regardless of how callers obtained their reference.
#[derive(Debug)]
pub struct Condition {
    pub id: u32,
    pub definition: Arc<ConditionDefinition>,
    pub source_name: String,
    pub source_areas: Vec<String>,
    state: Mutex<ConditionState>,
}

impl Condition {
    /// Create a condition in its initial state: inactive, enabled,
    /// acknowledged (no alarm outstanding), sitting on the default level.
    pub fn new(
        id: u32,
        definition: Arc<ConditionDefinition>,
        source_name: impl Into<String>,
        source_areas: Vec<String>,
    ) -> Self {
        let default = definition.default_sub_condition();
        let state = ConditionState {
            active: false,
            enabled: true,
            acked: true,
            active_sub: 0,
            severity: default.severity,
            message: default.description.clone(),
            quality: Quality::good(),
            ack_required: default.ack_required,
            attributes: HashMap::new(),
            active_time: Utc::now(),
            last_active: None,
            last_inactive: None,
            last_ack: None,
            acknowledger: None,
            ack_comment: None,
        };
        Self {
            id,
            definition,
            source_name: source_name.into(),
            source_areas,
            state: Mutex::new(state),
        }
    }

    /// Set the Enabled bit
    ///
    /// Disabling an active, unacknowledged condition leaves Active/Acked
    /// untouched: only the Enabled bit changes. Returns `None` when the bit
    /// already had the requested value.
    pub fn set_enabled(&self, enabled: bool) -> Option<Arc<Event>> {
        let mut state = self.state.lock();
        if state.enabled == enabled {
            return None;
        }
        state.enabled = enabled;
        debug!(
            condition = self.id,
            source = %self.source_name,
            enabled,
            "condition enable changed"
        );
        Some(self.build_event(&state, Utc::now(), None))
    }

    /// Apply one reported state change
    ///
    /// Computes the change mask first; a report that alters nothing
    /// observable yields `Ok(None)` and no event. An inactive-to-active
    /// transition clears Acked and stamps the activation time; the reverse
    /// transition stamps the last-inactive time.
    pub fn change_state(
        &self,
        update: &ConditionUpdate,
        use_current_time: bool,
    ) -> Result<Option<Arc<Event>>> {
        // Resolve the target level before taking the lock; an unknown name
        // must not perturb state.
        let target_sub = match &update.sub_condition {
            Some(name) => Some(self.definition.sub_condition_index(name)?),
            None => None,
        };

        let timestamp = if use_current_time {
            Utc::now()
        } else {
            update.timestamp.unwrap_or_else(Utc::now)
        };

        let mut state = self.state.lock();
        let mut mask = ChangeMask::default();

        if update.active != state.active {
            mask.set(ChangeMask::ACTIVE);
        }
        if let Some(sub) = target_sub {
            if sub != state.active_sub {
                mask.set(ChangeMask::SUB_CONDITION);
            }
        }
        let new_severity = update.severity.unwrap_or_else(|| match target_sub {
            Some(sub) => self.definition.sub_conditions()[sub].severity,
            None => state.severity,
        });
        if new_severity != state.severity {
            mask.set(ChangeMask::SEVERITY);
        }
        if let Some(message) = &update.message {
            if *message != state.message {
                mask.set(ChangeMask::MESSAGE);
            }
        }
        if let Some(quality) = update.quality {
            if quality != state.quality {
                mask.set(ChangeMask::QUALITY);
            }
        }
        if !update.attributes.is_empty() {
            mask.set(ChangeMask::ATTRIBUTES);
        }

        if mask.is_empty() {
            return Ok(None);
        }

        if let Some(sub) = target_sub {
            state.active_sub = sub;
            state.ack_required = self.definition.sub_conditions()[sub].ack_required;
        }
        if let Some(override_ack) = update.ack_required {
            state.ack_required = override_ack;
        }
        state.severity = new_severity;
        if let Some(message) = &update.message {
            state.message = message.clone();
        }
        if let Some(quality) = update.quality {
            state.quality = quality;
        }
        for (id, value) in &update.attributes {
            state.attributes.insert(*id, value.clone());
        }

        if mask.contains(ChangeMask::ACTIVE) {
            if update.active {
                // A new activation invalidates any previous acknowledgement
                state.active = true;
                state.acked = false;
                state.active_time = timestamp;
                state.last_active = Some(timestamp);
            } else {
                state.active = false;
                state.last_inactive = Some(timestamp);
            }
        }

        debug!(
            condition = self.id,
            source = %self.source_name,
            active = state.active,
            severity = state.severity,
            "condition state changed"
        );
        Ok(Some(self.build_event(&state, timestamp, None)))
    }

    /// Commit an acknowledgement
    ///
    /// Succeeds iff `active_time` equals the current activation time;
    /// anything else means the operator is acknowledging an occurrence that
    /// has already cleared and re-triggered, which fails with
    /// `StaleCondition` and leaves state untouched. A matching-time ack of an
    /// already-acknowledged condition is an idempotent no-op: `Ok(None)`, no
    /// mutation, no duplicate event. Acknowledge-accepted hook invocation
    /// happens in the event space before this is called; the time check here
    /// re-validates after that callback returned.
    pub fn acknowledge(
        &self,
        acknowledger: &str,
        comment: &str,
        active_time: DateTime<Utc>,
        use_current_time: bool,
    ) -> Result<Option<Arc<Event>>> {
        let mut state = self.state.lock();
        if active_time != state.active_time {
            return Err(AeError::StaleCondition {
                supplied: active_time,
                current: state.active_time,
            });
        }
        if state.acked {
            return Ok(None);
        }

        let timestamp = if use_current_time {
            Utc::now()
        } else {
            active_time
        };
        state.acked = true;
        state.last_ack = Some(timestamp);
        state.acknowledger = Some(acknowledger.to_string());
        state.ack_comment = Some(comment.to_string());
        debug!(
            condition = self.id,
            source = %self.source_name,
            acknowledger,
            "condition acknowledged"
        );
        Ok(Some(self.build_event(&state, timestamp, Some(comment))))
    }

    /// Snapshot the current state into an event without mutating anything.
    /// Used by the refresh scan.
    pub fn snapshot_event(&self) -> Arc<Event> {
        let state = self.state.lock();
        self.build_event(&state, state.active_time, None)
    }

    /// Current Active bit
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Current Enabled bit
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Current Acked bit
    pub fn is_acked(&self) -> bool {
        self.state.lock().acked
    }

    /// Activation time an acknowledgement must echo back
    pub fn active_time(&self) -> DateTime<Utc> {
        self.state.lock().active_time
    }

    fn build_event(
        &self,
        state: &ConditionState,
        timestamp: DateTime<Utc>,
        ack_comment: Option<&str>,
    ) -> Arc<Event> {
        let mut attributes = state.attributes.clone();
        attributes.insert(
            ATTR_ID_AREAS,
            Value::Array(
                self.source_areas
                    .iter()
                    .map(|a| Value::String(a.clone()))
                    .collect(),
            ),
        );
        if let Some(comment) = ack_comment {
            attributes.insert(ATTR_ID_ACK_COMMENT, Value::String(comment.to_string()));
        }

        Arc::new(Event {
            kind: EventKind::Condition,
            category_id: self.definition.category_id,
            source_name: self.source_name.clone(),
            source_areas: self.source_areas.clone(),
            message: state.message.clone(),
            severity: state.severity,
            timestamp,
            actor_id: None,
            condition: Some(ConditionSnapshot {
                condition_id: self.id,
                condition_name: self.definition.name.clone(),
                sub_condition_name: self.definition.sub_conditions()[state.active_sub]
                    .name
                    .clone(),
                state: ConditionStateFlags {
                    active: state.active,
                    enabled: state.enabled,
                    acked: state.acked,
                },
                ack_required: state.ack_required,
                quality: state.quality,
                active_time: state.active_time,
            }),
            attributes,
        })
    }
}
