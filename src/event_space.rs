// src/event_space.rs - The single authority over categories, sources,
// definitions, conditions and event fan-out
use crate::category::{EventCategory, EventAttribute, EventKind, ATTR_ID_AREAS};
use crate::condition::{Condition, ConditionUpdate};
use crate::config::ServerConfig;
use crate::definition::{ConditionDefinition, SubConditionDefinition};
use crate::error::{AeError, Result};
use crate::event::Event;
use crate::source::{Source, SourceConfig};
use crate::subscription::{EventConsumer, SubscriptionManager};
use crate::value::Value;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// External hook consulted before an acknowledgement is committed
///
/// Invoked with no event-space or condition lock held; it may be slow. A
/// returned error rejects the whole acknowledgement and nothing is mutated
/// or fired.
#[async_trait::async_trait]
pub trait AckHandler: Send + Sync {
    async fn accept(
        &self,
        source_name: &str,
        condition_name: &str,
        acknowledger: &str,
        comment: &str,
    ) -> Result<()>;
}

/// Scope selector for [`EventSpace::enable_conditions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableScope {
    /// Names are fully-qualified source names
    BySource,
    /// Names are wildcard area patterns
    ByArea,
}

/// One item of a [`EventSpace::process_condition_state_changes`] batch
#[derive(Debug, Clone)]
pub struct ConditionStateChange {
    pub source_name: String,
    pub condition_name: String,
    pub update: ConditionUpdate,
}

/// One item of a batch acknowledgement
#[derive(Debug, Clone)]
pub struct AckRequest {
    pub source_name: String,
    pub condition_name: String,
    pub acknowledger: String,
    pub comment: String,
    pub active_time: DateTime<Utc>,
}

/// The event space: owner of all registries, the only place that mutates
/// condition state and the only fan-out point for events
///
/// Each registry is an independent concurrent map so unrelated lookups never
/// contend; the subscriber list is copy-on-read so delivery never blocks
/// subscription churn.
pub struct EventSpace {
    config: ServerConfig,
    categories: DashMap<u32, Arc<EventCategory>>,
    definitions: DashMap<u32, Arc<ConditionDefinition>>,
    sources: DashMap<String, Arc<Source>>,
    source_ids: DashMap<u32, String>,
    conditions: DashMap<u32, Arc<Condition>>,
    /// (source name, condition name) -> condition id, for acknowledgement
    /// and reporting by name
    condition_index: DashMap<(String, String), u32>,
    subscriptions: RwLock<Vec<Arc<SubscriptionManager>>>,
    ack_handler: RwLock<Option<Arc<dyn AckHandler>>>,
    next_condition_id: AtomicU32,
}

impl EventSpace {
    pub fn new(config: ServerConfig) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(Self {
            config,
            categories: DashMap::new(),
            definitions: DashMap::new(),
            sources: DashMap::new(),
            source_ids: DashMap::new(),
            conditions: DashMap::new(),
            condition_index: DashMap::new(),
            subscriptions: RwLock::new(Vec::new()),
            ack_handler: RwLock::new(None),
            next_condition_id: AtomicU32::new(1),
        }))
    }

    /// Install the acknowledge-accepted hook
    pub fn set_ack_handler(&self, handler: Arc<dyn AckHandler>) {
        *self.ack_handler.write() = Some(handler);
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Registration (startup path, errors are fatal to server startup)
    // ------------------------------------------------------------------

    pub fn add_category(
        &self,
        id: u32,
        description: impl Into<String>,
        kind: EventKind,
    ) -> Result<Arc<EventCategory>> {
        let category = Arc::new(EventCategory::new(id, description, kind));
        match self.categories.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(AeError::already_exists("category", id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&category));
                info!(category = id, "category registered");
                Ok(category)
            }
        }
    }

    pub fn add_attribute(&self, category_id: u32, attribute: EventAttribute) -> Result<()> {
        self.category(category_id)?.add_attribute(attribute)
    }

    pub fn add_single_state_condition_def(
        &self,
        id: u32,
        name: impl Into<String>,
        category_id: u32,
        sub: SubConditionDefinition,
    ) -> Result<()> {
        let category = self.category(category_id)?;
        Self::require_condition_category(&category)?;
        let def = ConditionDefinition::single_state(id, name, category_id, sub, &self.config)?;
        self.insert_definition(def)
    }

    pub fn add_multi_state_condition_def(
        &self,
        id: u32,
        name: impl Into<String>,
        category_id: u32,
        subs: Vec<SubConditionDefinition>,
    ) -> Result<()> {
        let category = self.category(category_id)?;
        Self::require_condition_category(&category)?;
        let mut def = ConditionDefinition::multi_state(id, name, category_id);
        for sub in subs {
            def.add_sub_condition(sub, &self.config)?;
        }
        self.insert_definition(def)
    }

    /// Append a level to an already-registered multi-state definition.
    /// Rejected once a condition instantiates the definition.
    pub fn add_sub_condition_def(
        &self,
        definition_id: u32,
        sub: SubConditionDefinition,
    ) -> Result<()> {
        let current = self.definition(definition_id)?;
        let in_use = self
            .conditions
            .iter()
            .any(|c| c.definition.id == definition_id);
        if in_use {
            return Err(AeError::InvalidArgument(format!(
                "condition definition '{}' is already instantiated",
                current.name
            )));
        }
        let mut updated = (*current).clone();
        updated.add_sub_condition(sub, &self.config)?;
        self.definitions.insert(definition_id, Arc::new(updated));
        Ok(())
    }

    pub fn add_source(&self, config: SourceConfig) -> Result<Arc<Source>> {
        if self.source_ids.contains_key(&config.id) {
            return Err(AeError::already_exists("source", config.id));
        }
        let name = config.name.clone();
        let source = Arc::new(Source::new(config));
        match self.sources.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(AeError::already_exists("source", name))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                self.source_ids.insert(source.id, name);
                slot.insert(Arc::clone(&source));
                Ok(source)
            }
        }
    }

    /// Bind a definition to a source, creating the runtime condition
    ///
    /// Freezes the owning category's attribute set. At most one condition may
    /// exist per (source, definition) pair.
    pub fn add_condition(&self, source_name: &str, definition_id: u32) -> Result<u32> {
        let source = self.source(source_name)?;
        let definition = self.definition(definition_id)?;
        definition.validate()?;
        let category = self.category(definition.category_id)?;

        let key = (source.name.clone(), definition.name.clone());
        if self.condition_index.contains_key(&key) {
            return Err(AeError::already_exists(
                "condition",
                format!("{}/{}", source.name, definition.name),
            ));
        }

        category.freeze();
        let id = self.next_condition_id.fetch_add(1, Ordering::Relaxed);
        let condition = Arc::new(Condition::new(
            id,
            definition,
            source.name.clone(),
            source.areas.clone(),
        ));
        self.conditions.insert(id, condition);
        self.condition_index.insert(key, id);
        source.attach_condition(id);
        info!(condition = id, source = source_name, "condition created");
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Registry lookups
    // ------------------------------------------------------------------

    pub fn category(&self, id: u32) -> Result<Arc<EventCategory>> {
        self.categories
            .get(&id)
            .map(|c| Arc::clone(&c))
            .ok_or_else(|| AeError::not_found("category", id))
    }

    pub fn definition(&self, id: u32) -> Result<Arc<ConditionDefinition>> {
        self.definitions
            .get(&id)
            .map(|d| Arc::clone(&d))
            .ok_or_else(|| AeError::not_found("condition definition", id))
    }

    pub fn source(&self, name: &str) -> Result<Arc<Source>> {
        self.sources
            .get(name)
            .map(|s| Arc::clone(&s))
            .ok_or_else(|| AeError::not_found("source", name))
    }

    pub fn condition(&self, id: u32) -> Result<Arc<Condition>> {
        self.conditions
            .get(&id)
            .map(|c| Arc::clone(&c))
            .ok_or_else(|| AeError::not_found("condition", id))
    }

    /// Resolve a (source, condition name) pair to the condition instance
    pub fn condition_by_name(&self, source_name: &str, condition_name: &str) -> Result<Arc<Condition>> {
        let key = (source_name.to_string(), condition_name.to_string());
        let id = self
            .condition_index
            .get(&key)
            .map(|id| *id)
            .ok_or_else(|| {
                AeError::not_found("condition", format!("{}/{}", source_name, condition_name))
            })?;
        self.condition(id)
    }

    // ------------------------------------------------------------------
    // Reporting entry points
    // ------------------------------------------------------------------

    /// Report a stateless informational event
    pub fn process_simple_event(
        &self,
        category_id: u32,
        source_name: &str,
        message: &str,
        severity: u16,
        attributes: HashMap<u32, Value>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Arc<Event>> {
        let (category, source) =
            self.validate_report(category_id, EventKind::Simple, source_name, severity)?;
        let attributes = self.stamp_attributes(&category, &source, attributes)?;
        let event = Event::simple(
            category_id,
            &source.name,
            source.areas.clone(),
            message,
            severity,
            timestamp.unwrap_or_else(Utc::now),
            attributes,
        );
        self.fire_events(std::slice::from_ref(&event));
        Ok(event)
    }

    /// Report an audited operator/equipment action
    #[allow(clippy::too_many_arguments)]
    pub fn process_tracking_event(
        &self,
        category_id: u32,
        source_name: &str,
        message: &str,
        severity: u16,
        actor_id: &str,
        attributes: HashMap<u32, Value>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Arc<Event>> {
        let (category, source) =
            self.validate_report(category_id, EventKind::Tracking, source_name, severity)?;
        let attributes = self.stamp_attributes(&category, &source, attributes)?;
        let event = Event::tracking(
            category_id,
            &source.name,
            source.areas.clone(),
            message,
            severity,
            actor_id,
            timestamp.unwrap_or_else(Utc::now),
            attributes,
        );
        self.fire_events(std::slice::from_ref(&event));
        Ok(event)
    }

    /// Apply a batch of condition state changes
    ///
    /// Returns one result per item; a malformed item never aborts the rest.
    /// Events from the successful items are fired as a single batch.
    pub fn process_condition_state_changes(
        &self,
        batch: &[ConditionStateChange],
        use_current_time: bool,
    ) -> Vec<Result<()>> {
        let mut events = Vec::new();
        let results = batch
            .iter()
            .map(|item| {
                let condition =
                    self.condition_by_name(&item.source_name, &item.condition_name)?;
                if let Some(event) = condition.change_state(&item.update, use_current_time)? {
                    events.push(event);
                }
                Ok(())
            })
            .collect();
        if !events.is_empty() {
            self.fire_events(&events);
        }
        results
    }

    /// Acknowledge one condition by (source, condition name)
    ///
    /// The acknowledge-accepted hook runs with no locks held; the condition
    /// is re-validated afterwards, since its state may have moved while the
    /// hook was out.
    pub async fn ack_condition(
        &self,
        source_name: &str,
        condition_name: &str,
        acknowledger: &str,
        comment: &str,
        active_time: DateTime<Utc>,
        use_current_time: bool,
    ) -> Result<()> {
        let condition = self.condition_by_name(source_name, condition_name)?;
        self.ack_with_hook(condition, acknowledger, comment, active_time, use_current_time)
            .await
    }

    /// Acknowledge one condition by its cookie
    pub async fn ack_condition_by_id(
        &self,
        condition_id: u32,
        acknowledger: &str,
        comment: &str,
        active_time: DateTime<Utc>,
        use_current_time: bool,
    ) -> Result<()> {
        let condition = self.condition(condition_id)?;
        self.ack_with_hook(condition, acknowledger, comment, active_time, use_current_time)
            .await
    }

    /// Batch acknowledgement; one result per request
    pub async fn ack_conditions(
        &self,
        requests: &[AckRequest],
        use_current_time: bool,
    ) -> Vec<Result<()>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(
                self.ack_condition(
                    &request.source_name,
                    &request.condition_name,
                    &request.acknowledger,
                    &request.comment,
                    request.active_time,
                    use_current_time,
                )
                .await,
            );
        }
        results
    }

    async fn ack_with_hook(
        &self,
        condition: Arc<Condition>,
        acknowledger: &str,
        comment: &str,
        active_time: DateTime<Utc>,
        use_current_time: bool,
    ) -> Result<()> {
        let handler = self.ack_handler.read().clone();
        if let Some(handler) = handler {
            handler
                .accept(
                    &condition.source_name,
                    &condition.definition.name,
                    acknowledger,
                    comment,
                )
                .await
                .map_err(|e| match e {
                    rejected @ AeError::Rejected(_) => rejected,
                    other => AeError::Rejected(other.to_string()),
                })?;
        }
        // All-or-nothing: only a still-matching active time commits. A
        // repeated ack of the same occurrence is a no-op with no event.
        match condition.acknowledge(acknowledger, comment, active_time, use_current_time) {
            Ok(Some(event)) => {
                self.fire_events(std::slice::from_ref(&event));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(
                    condition = condition.id,
                    source = %condition.source_name,
                    error = %e,
                    "acknowledgement rejected"
                );
                Err(e)
            }
        }
    }

    /// Enable or disable every condition in the given scope
    ///
    /// With `BySource`, each name must be a registered source; with `ByArea`,
    /// names are wildcard patterns over source areas. One event is emitted
    /// per condition whose Enabled bit actually changed.
    pub fn enable_conditions(
        &self,
        enabled: bool,
        scope: EnableScope,
        names: &[String],
    ) -> Result<usize> {
        let mut targets: Vec<Arc<Condition>> = Vec::new();
        match scope {
            EnableScope::BySource => {
                for name in names {
                    let source = self.source(name)?;
                    for id in source.condition_ids() {
                        targets.push(self.condition(id)?);
                    }
                }
            }
            EnableScope::ByArea => {
                let patterns = names
                    .iter()
                    .map(|n| crate::filter::Pattern::new(n))
                    .collect::<Result<Vec<_>>>()?;
                for condition in self.conditions.iter() {
                    let hit = condition
                        .source_areas
                        .iter()
                        .any(|area| patterns.iter().any(|p| p.matches(area)));
                    if hit {
                        targets.push(Arc::clone(&condition));
                    }
                }
            }
        }

        let mut events = Vec::new();
        for condition in &targets {
            if let Some(event) = condition.set_enabled(enabled) {
                events.push(event);
            }
        }
        let changed = events.len();
        if !events.is_empty() {
            self.fire_events(&events);
        }
        debug!(enabled, changed, "enable_conditions applied");
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Fan-out and subscriptions
    // ------------------------------------------------------------------

    /// Deliver a batch to every attached subscription
    ///
    /// The subscriber list is cloned under the read lock so delivery never
    /// blocks attach/detach; per-subscriber work is a bounded buffer append.
    pub fn fire_events(&self, events: &[Arc<Event>]) {
        let subscribers: Vec<Arc<SubscriptionManager>> = self.subscriptions.read().clone();
        for event in events {
            for subscriber in &subscribers {
                subscriber.offer(event);
            }
        }
    }

    /// Open a subscription delivering to the given consumer
    pub fn create_subscription(
        self: &Arc<Self>,
        consumer: Arc<dyn EventConsumer>,
    ) -> Arc<SubscriptionManager> {
        let subscription =
            SubscriptionManager::new(consumer, Arc::downgrade(self), self.config.clone());
        self.subscriptions.write().push(Arc::clone(&subscription));
        subscription
    }

    /// Close a subscription, stopping its notification task and any
    /// in-flight refresh
    pub fn drop_subscription(&self, id: Uuid) -> Result<()> {
        let mut subscriptions = self.subscriptions.write();
        let index = subscriptions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| AeError::not_found("subscription", id))?;
        let subscription = subscriptions.swap_remove(index);
        drop(subscriptions);
        subscription.close();
        Ok(())
    }

    /// Broadcast a shutdown notice to every attached subscription
    ///
    /// Fire-and-forget: each notice runs on its own task so a slow client
    /// cannot block teardown.
    pub fn fire_shutdown_request(&self, reason: &str) {
        let subscribers: Vec<Arc<SubscriptionManager>> = self.subscriptions.read().clone();
        info!(reason, subscribers = subscribers.len(), "shutdown requested");
        for subscriber in subscribers {
            subscriber.notify_shutdown(reason);
        }
    }

    /// Point-in-time snapshot of alarm state, used by the refresh protocol
    ///
    /// Includes every active condition, plus enabled-but-inactive ones when
    /// requested. Interleaving with concurrent live events is best-effort:
    /// the snapshot reflects at least the state as of scan time.
    pub fn condition_snapshot(&self, include_inactive: bool) -> Vec<Arc<Event>> {
        self.conditions
            .iter()
            .filter(|c| c.is_active() || (include_inactive && c.is_enabled()))
            .map(|c| c.snapshot_event())
            .collect()
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn require_condition_category(category: &EventCategory) -> Result<()> {
        if category.kind != EventKind::Condition {
            return Err(AeError::InvalidArgument(format!(
                "category {} is not a condition category",
                category.id
            )));
        }
        Ok(())
    }

    fn insert_definition(&self, def: ConditionDefinition) -> Result<()> {
        match self.definitions.entry(def.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(AeError::already_exists("condition definition", def.id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(definition = def.id, name = %def.name, "condition definition registered");
                slot.insert(Arc::new(def));
                Ok(())
            }
        }
    }

    fn validate_report(
        &self,
        category_id: u32,
        expected_kind: EventKind,
        source_name: &str,
        severity: u16,
    ) -> Result<(Arc<EventCategory>, Arc<Source>)> {
        let category = self.category(category_id)?;
        if category.kind != expected_kind {
            return Err(AeError::InvalidArgument(format!(
                "category {} is not a {:?} category",
                category_id, expected_kind
            )));
        }
        if !self.config.severity_in_range(severity) {
            return Err(AeError::InvalidArgument(format!(
                "severity {} outside valid range [{}, {}]",
                severity,
                self.config.min_severity,
                crate::config::MAX_SEVERITY
            )));
        }
        let source = self.source(source_name)?;
        Ok((category, source))
    }

    /// Validate attribute ids against the category and stamp the reserved
    /// AREAS attribute
    fn stamp_attributes(
        &self,
        category: &EventCategory,
        source: &Source,
        mut attributes: HashMap<u32, Value>,
    ) -> Result<HashMap<u32, Value>> {
        for id in attributes.keys() {
            if !category.has_attribute(*id) {
                return Err(AeError::not_found("attribute", *id));
            }
        }
        attributes.insert(
            ATTR_ID_AREAS,
            Value::Array(
                source
                    .areas
                    .iter()
                    .map(|a| Value::String(a.clone()))
                    .collect(),
            ),
        );
        Ok(attributes)
    }
}

impl std::fmt::Debug for EventSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSpace")
            .field("categories", &self.categories.len())
            .field("definitions", &self.definitions.len())
            .field("sources", &self.sources.len())
            .field("conditions", &self.conditions.len())
            .field("subscriptions", &self.subscriptions.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn sub(name: &str, severity: u16) -> SubConditionDefinition {
        SubConditionDefinition {
            name: name.to_string(),
            definition: format!("LEVEL > {}", severity),
            severity,
            description: String::new(),
            ack_required: true,
        }
    }

    fn space_with_tank() -> Arc<EventSpace> {
        let space = EventSpace::new(ServerConfig::default()).unwrap();
        space
            .add_category(10, "Level", EventKind::Condition)
            .unwrap();
        space
            .add_category(20, "System", EventKind::Simple)
            .unwrap();
        space
            .add_attribute(
                20,
                EventAttribute {
                    id: 100,
                    description: "process value".into(),
                    value_type: ValueType::Float,
                },
            )
            .unwrap();
        space
            .add_single_state_condition_def(1, "HIGH_HIGH", 10, sub("HIGH_HIGH", 800))
            .unwrap();
        space
            .add_source(SourceConfig {
                id: 1,
                name: "Plant.Tank1".into(),
                areas: vec!["TankFarm".into()],
            })
            .unwrap();
        space.add_condition("Plant.Tank1", 1).unwrap();
        space
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let space = space_with_tank();
        assert!(matches!(
            space.add_category(10, "again", EventKind::Simple),
            Err(AeError::AlreadyExists { .. })
        ));
        assert!(matches!(
            space.add_single_state_condition_def(1, "X", 10, sub("X", 1)),
            Err(AeError::AlreadyExists { .. })
        ));
        assert!(matches!(
            space.add_source(SourceConfig {
                id: 1,
                name: "Other".into(),
                areas: vec![],
            }),
            Err(AeError::AlreadyExists { .. })
        ));
        // One condition per (source, definition) pair
        assert!(matches!(
            space.add_condition("Plant.Tank1", 1),
            Err(AeError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_condition_creation_freezes_category() {
        let space = space_with_tank();
        let category = space.category(10).unwrap();
        assert!(category.is_frozen());
        assert!(space
            .add_attribute(
                10,
                EventAttribute {
                    id: 101,
                    description: "late".into(),
                    value_type: ValueType::Float,
                },
            )
            .is_err());
    }

    #[tokio::test]
    async fn test_simple_event_validation() {
        let space = space_with_tank();
        // Condition category refuses simple events
        assert!(matches!(
            space.process_simple_event(10, "Plant.Tank1", "msg", 500, HashMap::new(), None),
            Err(AeError::InvalidArgument(_))
        ));
        // Unknown source
        assert!(matches!(
            space.process_simple_event(20, "Nope", "msg", 500, HashMap::new(), None),
            Err(AeError::NotFound { .. })
        ));
        // Unknown attribute id
        assert!(matches!(
            space.process_simple_event(
                20,
                "Plant.Tank1",
                "msg",
                500,
                HashMap::from([(999, Value::Float(1.0))]),
                None
            ),
            Err(AeError::NotFound { .. })
        ));
        // Valid report stamps the reserved AREAS attribute
        let event = space
            .process_simple_event(
                20,
                "Plant.Tank1",
                "msg",
                500,
                HashMap::from([(100, Value::Float(12.5))]),
                None,
            )
            .unwrap();
        assert!(event.attributes.contains_key(&ATTR_ID_AREAS));
    }

    #[tokio::test]
    async fn test_batch_partial_failure() {
        let space = space_with_tank();
        let batch = vec![
            ConditionStateChange {
                source_name: "Plant.Tank1".into(),
                condition_name: "HIGH_HIGH".into(),
                update: ConditionUpdate {
                    active: true,
                    ..Default::default()
                },
            },
            ConditionStateChange {
                source_name: "Plant.Tank1".into(),
                condition_name: "NO_SUCH".into(),
                update: ConditionUpdate::default(),
            },
        ];
        let results = space.process_condition_state_changes(&batch, true);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(AeError::NotFound { .. })));
        let condition = space.condition_by_name("Plant.Tank1", "HIGH_HIGH").unwrap();
        assert!(condition.is_active());
    }

    #[tokio::test]
    async fn test_ack_by_cookie_and_by_name() {
        let space = space_with_tank();
        let condition = space.condition_by_name("Plant.Tank1", "HIGH_HIGH").unwrap();
        condition
            .change_state(
                &ConditionUpdate {
                    active: true,
                    ..Default::default()
                },
                true,
            )
            .unwrap();
        let t0 = condition.active_time();
        space
            .ack_condition_by_id(condition.id, "op", "seen", t0, true)
            .await
            .unwrap();
        assert!(condition.is_acked());
    }

    #[tokio::test]
    async fn test_repeat_ack_matching_time_succeeds_without_event() {
        let space = space_with_tank();
        let condition = space.condition_by_name("Plant.Tank1", "HIGH_HIGH").unwrap();
        condition
            .change_state(
                &ConditionUpdate {
                    active: true,
                    ..Default::default()
                },
                true,
            )
            .unwrap();
        let t0 = condition.active_time();
        space
            .ack_condition("Plant.Tank1", "HIGH_HIGH", "op", "seen", t0, true)
            .await
            .unwrap();
        // The time still matches, so repeating the call succeeds
        space
            .ack_condition("Plant.Tank1", "HIGH_HIGH", "op", "again", t0, true)
            .await
            .unwrap();
        assert!(condition.is_acked());
        // A mismatched time is stale even though the condition is acked
        let err = space
            .ack_condition(
                "Plant.Tank1",
                "HIGH_HIGH",
                "op",
                "late",
                t0 - chrono::Duration::seconds(1),
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AeError::StaleCondition { .. }));
    }

    struct RefusingHandler;

    #[async_trait::async_trait]
    impl AckHandler for RefusingHandler {
        async fn accept(&self, _: &str, _: &str, _: &str, _: &str) -> Result<()> {
            Err(AeError::Rejected("not allowed".into()))
        }
    }

    #[tokio::test]
    async fn test_ack_handler_rejection_is_all_or_nothing() {
        let space = space_with_tank();
        space.set_ack_handler(Arc::new(RefusingHandler));
        let condition = space.condition_by_name("Plant.Tank1", "HIGH_HIGH").unwrap();
        condition
            .change_state(
                &ConditionUpdate {
                    active: true,
                    ..Default::default()
                },
                true,
            )
            .unwrap();
        let t0 = condition.active_time();
        let err = space
            .ack_condition("Plant.Tank1", "HIGH_HIGH", "op", "seen", t0, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AeError::Rejected(_)));
        assert!(!condition.is_acked());
    }

    #[tokio::test]
    async fn test_enable_conditions_by_area_pattern() {
        let space = space_with_tank();
        let changed = space
            .enable_conditions(false, EnableScope::ByArea, &["tank*".to_string()])
            .unwrap();
        assert_eq!(changed, 1);
        // Second pass is a no-op
        let changed = space
            .enable_conditions(false, EnableScope::ByArea, &["tank*".to_string()])
            .unwrap();
        assert_eq!(changed, 0);
        let condition = space.condition_by_name("Plant.Tank1", "HIGH_HIGH").unwrap();
        assert!(!condition.is_enabled());
    }

    #[tokio::test]
    async fn test_enable_conditions_unknown_source() {
        let space = space_with_tank();
        assert!(matches!(
            space.enable_conditions(true, EnableScope::BySource, &["Nope".to_string()]),
            Err(AeError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_condition_snapshot_policy() {
        let space = space_with_tank();
        assert!(space.condition_snapshot(false).is_empty());
        // Enabled-but-inactive conditions appear only when asked for
        assert_eq!(space.condition_snapshot(true).len(), 1);
        let condition = space.condition_by_name("Plant.Tank1", "HIGH_HIGH").unwrap();
        condition
            .change_state(
                &ConditionUpdate {
                    active: true,
                    ..Default::default()
                },
                true,
            )
            .unwrap();
        assert_eq!(space.condition_snapshot(false).len(), 1);
    }

    #[tokio::test]
    async fn test_add_sub_condition_def_locked_after_instantiation() {
        let space = EventSpace::new(ServerConfig::default()).unwrap();
        space
            .add_category(10, "Level", EventKind::Condition)
            .unwrap();
        space
            .add_multi_state_condition_def(2, "LEVEL", 10, vec![sub("HIGH", 500)])
            .unwrap();
        space
            .add_sub_condition_def(2, sub("HIGH_HIGH", 900))
            .unwrap();
        space
            .add_source(SourceConfig {
                id: 1,
                name: "Tank".into(),
                areas: vec![],
            })
            .unwrap();
        space.add_condition("Tank", 2).unwrap();
        assert!(matches!(
            space.add_sub_condition_def(2, sub("HIGH_HIGH_HIGH", 950)),
            Err(AeError::InvalidArgument(_))
        ));
    }
}
