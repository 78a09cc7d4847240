// src/subscription.rs - Per-client subscriptions: filter, buffer, notify, refresh
use crate::category::EventKind;
use crate::config::{ServerConfig, MAX_SEVERITY};
use crate::error::{AeError, Result};
use crate::event::Event;
use crate::event_space::EventSpace;
use crate::filter::Pattern;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Bit mask selecting which event kinds a subscription receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeMask(u8);

impl EventTypeMask {
    pub const SIMPLE: EventTypeMask = EventTypeMask(0x01);
    pub const TRACKING: EventTypeMask = EventTypeMask(0x02);
    pub const CONDITION: EventTypeMask = EventTypeMask(0x04);
    pub const ALL: EventTypeMask = EventTypeMask(0x07);

    pub fn accepts(&self, kind: EventKind) -> bool {
        let bit = match kind {
            EventKind::Simple => Self::SIMPLE,
            EventKind::Tracking => Self::TRACKING,
            EventKind::Condition => Self::CONDITION,
        };
        self.0 & bit.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for EventTypeMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Client-facing filter settings
///
/// An empty category set or pattern list means "no restriction", not
/// "matches nothing".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub event_types: EventTypeMask,
    pub category_ids: HashSet<u32>,
    pub low_severity: u16,
    pub high_severity: u16,
    /// Wildcard patterns matched against the event source's areas
    pub areas: Vec<String>,
    /// Wildcard patterns matched against the event source's name
    pub sources: Vec<String>,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self {
            event_types: EventTypeMask::ALL,
            category_ids: HashSet::new(),
            low_severity: 1,
            high_severity: MAX_SEVERITY,
            areas: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// A filter snapshot with its wildcard patterns compiled
///
/// Compiled once per `set_filter` call so per-event evaluation never touches
/// the regex engine's builder.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    spec: SubscriptionFilter,
    areas: Vec<Pattern>,
    sources: Vec<Pattern>,
}

impl CompiledFilter {
    pub fn compile(spec: SubscriptionFilter, config: &ServerConfig) -> Result<Self> {
        if spec.event_types.is_empty() {
            return Err(AeError::InvalidArgument(
                "filter event-type mask selects nothing".into(),
            ));
        }
        if spec.low_severity > spec.high_severity {
            return Err(AeError::InvalidArgument(format!(
                "filter severity range [{}, {}] is inverted",
                spec.low_severity, spec.high_severity
            )));
        }
        if !config.severity_in_range(spec.low_severity)
            || !config.severity_in_range(spec.high_severity)
        {
            return Err(AeError::InvalidArgument(format!(
                "filter severity range [{}, {}] outside [{}, {}]",
                spec.low_severity, spec.high_severity, config.min_severity, MAX_SEVERITY
            )));
        }
        let areas = spec
            .areas
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        let sources = spec
            .sources
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            spec,
            areas,
            sources,
        })
    }

    pub fn spec(&self) -> &SubscriptionFilter {
        &self.spec
    }
}

/// Pure filter evaluation: the same (event, filter) pair always yields the
/// same answer
pub fn is_event_passing_filters(event: &Event, filter: &CompiledFilter) -> bool {
    if !filter.spec.event_types.accepts(event.kind) {
        return false;
    }
    if event.kind == EventKind::Condition
        && !filter.spec.category_ids.is_empty()
        && !filter.spec.category_ids.contains(&event.category_id)
    {
        return false;
    }
    if event.severity < filter.spec.low_severity || event.severity > filter.spec.high_severity {
        return false;
    }
    if !filter.areas.is_empty()
        && !event
            .source_areas
            .iter()
            .any(|area| filter.areas.iter().any(|p| p.matches(area)))
    {
        return false;
    }
    if !filter.sources.is_empty() && !filter.sources.iter().any(|p| p.matches(&event.source_name)) {
        return false;
    }
    true
}

/// The single callback contract a client/transport collaborator implements
///
/// `deliver` receives each flushed batch; refresh batches are flagged and the
/// final one additionally carries `is_last_refresh`. `shutdown_request` is a
/// fire-and-forget notice broadcast before the event space tears down.
#[async_trait::async_trait]
pub trait EventConsumer: Send + Sync {
    async fn deliver(&self, events: Vec<Event>, is_refresh: bool, is_last_refresh: bool);

    async fn shutdown_request(&self, _reason: &str) {}
}

/// Client-adjustable delivery state
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubscriptionState {
    /// Inactive subscriptions drop incoming live events
    pub active: bool,
    /// Batching window in milliseconds; zero flushes on every event
    pub buffer_time_ms: u64,
    /// Flush immediately once this many events are buffered
    pub max_batch: usize,
}

const REFRESH_IDLE: u8 = 0;
const REFRESH_RUNNING: u8 = 1;

/// One queue entry. `event: None` is a refresh marker that contributes an
/// empty batch carrying just the flags (used for the cancellation
/// acknowledgement and for refreshes that matched nothing).
struct QueueEntry {
    event: Option<Arc<Event>>,
    refresh: bool,
    last_refresh: bool,
}

struct EventQueue {
    entries: VecDeque<QueueEntry>,
    /// Arrival instant of the oldest unflushed entry, the base of the
    /// buffer-time deadline
    oldest_at: Option<Instant>,
}

/// One connected client subscription
///
/// Owns the filter snapshot, the bounded event buffer and the long-lived
/// notification task; a refresh task exists only while a refresh is in
/// flight. Filters and buffer/state are independently lockable so a filter
/// change never blocks an in-flight delivery.
pub struct SubscriptionManager {
    pub id: Uuid,
    consumer: Arc<dyn EventConsumer>,
    space: Weak<EventSpace>,
    config: ServerConfig,
    filter: RwLock<CompiledFilter>,
    selected_attributes: RwLock<HashMap<u32, Vec<u32>>>,
    state: RwLock<SubscriptionState>,
    queue: Mutex<EventQueue>,
    flush: Notify,
    terminate: Notify,
    refresh_state: AtomicU8,
    refresh_cancel: AtomicBool,
    dropped: AtomicU64,
}

impl SubscriptionManager {
    pub(crate) fn new(
        consumer: Arc<dyn EventConsumer>,
        space: Weak<EventSpace>,
        config: ServerConfig,
    ) -> Arc<Self> {
        // The initial filter admits everything the configured severity
        // bounds allow; it has no patterns, so no compilation can fail.
        let filter = CompiledFilter {
            spec: SubscriptionFilter {
                low_severity: config.min_severity,
                ..Default::default()
            },
            areas: Vec::new(),
            sources: Vec::new(),
        };

        let state = SubscriptionState {
            active: true,
            buffer_time_ms: config.default_buffer_time_ms,
            max_batch: config.default_max_batch,
        };

        let sub = Arc::new(Self {
            id: Uuid::new_v4(),
            consumer,
            space,
            config,
            filter: RwLock::new(filter),
            selected_attributes: RwLock::new(HashMap::new()),
            state: RwLock::new(state),
            queue: Mutex::new(EventQueue {
                entries: VecDeque::new(),
                oldest_at: None,
            }),
            flush: Notify::new(),
            terminate: Notify::new(),
            refresh_state: AtomicU8::new(REFRESH_IDLE),
            refresh_cancel: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });

        let task = Arc::clone(&sub);
        tokio::spawn(async move {
            task.notify_loop().await;
        });
        info!(subscription = %sub.id, "subscription created");
        sub
    }

    // ------------------------------------------------------------------
    // Client-facing configuration
    // ------------------------------------------------------------------

    /// Replace the filter; validated and compiled before it takes effect
    pub fn set_filter(&self, filter: SubscriptionFilter) -> Result<()> {
        let compiled = CompiledFilter::compile(filter, &self.config)?;
        *self.filter.write() = compiled;
        Ok(())
    }

    /// Current filter settings
    pub fn get_filter(&self) -> SubscriptionFilter {
        self.filter.read().spec.clone()
    }

    /// Choose which attributes events of a category report to this client
    ///
    /// Until called for a category, events of that category carry no
    /// attributes.
    pub fn select_returned_attributes(&self, category_id: u32, attribute_ids: &[u32]) -> Result<()> {
        let space = self
            .space
            .upgrade()
            .ok_or_else(|| AeError::not_found("event space", "dropped"))?;
        let category = space.category(category_id)?;
        for id in attribute_ids {
            if !category.has_attribute(*id) {
                return Err(AeError::not_found("attribute", *id));
            }
        }
        self.selected_attributes
            .write()
            .insert(category_id, attribute_ids.to_vec());
        Ok(())
    }

    /// Attribute ids currently selected for a category
    pub fn get_returned_attributes(&self, category_id: u32) -> Vec<u32> {
        self.selected_attributes
            .read()
            .get(&category_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Adjust delivery state; `None` fields are left unchanged
    pub fn set_state(
        &self,
        active: Option<bool>,
        buffer_time_ms: Option<u64>,
        max_batch: Option<usize>,
    ) -> Result<()> {
        if let Some(max) = max_batch {
            if max == 0 {
                return Err(AeError::InvalidArgument("max_batch must be at least 1".into()));
            }
            if max > self.config.max_queue_len {
                return Err(AeError::InvalidArgument(format!(
                    "max_batch ({}) exceeds queue capacity ({})",
                    max, self.config.max_queue_len
                )));
            }
        }
        {
            let mut state = self.state.write();
            if let Some(active) = active {
                state.active = active;
            }
            if let Some(buffer_time_ms) = buffer_time_ms {
                state.buffer_time_ms = buffer_time_ms;
            }
            if let Some(max_batch) = max_batch {
                state.max_batch = max_batch;
            }
        }
        // Wake the notifier so it re-evaluates its deadline
        self.flush.notify_one();
        Ok(())
    }

    /// Current delivery state
    pub fn get_state(&self) -> SubscriptionState {
        *self.state.read()
    }

    /// Events discarded by the drop-oldest overflow policy
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Live delivery path
    // ------------------------------------------------------------------

    /// Offer a live event; filtered and buffered if it passes
    pub(crate) fn offer(&self, event: &Arc<Event>) {
        if !self.state.read().active {
            return;
        }
        if !is_event_passing_filters(event, &self.filter.read()) {
            trace!(subscription = %self.id, "event rejected by filter");
            return;
        }
        self.enqueue(QueueEntry {
            event: Some(Arc::clone(event)),
            refresh: false,
            last_refresh: false,
        });
    }

    fn enqueue(&self, entry: QueueEntry) {
        {
            let mut queue = self.queue.lock();
            queue.entries.push_back(entry);
            if queue.oldest_at.is_none() {
                queue.oldest_at = Some(Instant::now());
            }
            if queue.entries.len() > self.config.max_queue_len {
                queue.entries.pop_front();
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    subscription = %self.id,
                    dropped,
                    "subscription buffer full, dropping oldest event"
                );
            }
        }
        self.flush.notify_one();
    }

    /// Long-lived notification loop: waits on flush/terminate signals or the
    /// buffer-time deadline, drains under the lock, delivers outside it
    async fn notify_loop(&self) {
        loop {
            let (deadline, due_now) = self.next_deadline();
            if due_now {
                self.flush_pending().await;
                continue;
            }
            tokio::select! {
                _ = self.terminate.notified() => {
                    // Final drain so nothing already accepted is lost
                    self.flush_pending().await;
                    debug!(subscription = %self.id, "notification task stopped");
                    return;
                }
                _ = self.flush.notified() => {
                    if self.should_flush_now() {
                        self.flush_pending().await;
                    }
                    // Otherwise loop back and re-arm the deadline
                }
                _ = sleep_until_or_forever(deadline) => {
                    self.flush_pending().await;
                }
            }
        }
    }

    fn next_deadline(&self) -> (Option<Instant>, bool) {
        let buffer_time_ms = self.state.read().buffer_time_ms;
        let queue = self.queue.lock();
        match queue.oldest_at {
            Some(oldest) => {
                let deadline = oldest + std::time::Duration::from_millis(buffer_time_ms);
                (Some(deadline), deadline <= Instant::now())
            }
            None => (None, false),
        }
    }

    fn should_flush_now(&self) -> bool {
        let state = self.state.read();
        let queue = self.queue.lock();
        !queue.entries.is_empty()
            && (state.buffer_time_ms == 0 || queue.entries.len() >= state.max_batch)
    }

    async fn flush_pending(&self) {
        let entries: Vec<QueueEntry> = {
            let mut queue = self.queue.lock();
            queue.oldest_at = None;
            queue.entries.drain(..).collect()
        };
        if entries.is_empty() {
            return;
        }

        // Deliver runs of same-kind entries so one callback never mixes live
        // and refresh events
        let mut run: Vec<Event> = Vec::new();
        let mut run_refresh = entries[0].refresh;
        let mut run_last = false;
        for entry in entries {
            if entry.refresh != run_refresh {
                self.consumer
                    .deliver(std::mem::take(&mut run), run_refresh, run_last)
                    .await;
                run_refresh = entry.refresh;
                run_last = false;
            }
            run_last |= entry.last_refresh;
            if let Some(event) = entry.event {
                run.push(self.project(&event));
            }
        }
        if !run.is_empty() || run_last {
            self.consumer.deliver(run, run_refresh, run_last).await;
        }
    }

    /// Copy an event with only the attributes this client selected for its
    /// category
    fn project(&self, event: &Arc<Event>) -> Event {
        let selected = self.selected_attributes.read();
        let mut projected = Event::clone(event);
        match selected.get(&event.category_id) {
            Some(ids) => projected.attributes.retain(|id, _| ids.contains(id)),
            None => projected.attributes.clear(),
        }
        projected
    }

    // ------------------------------------------------------------------
    // Refresh protocol
    // ------------------------------------------------------------------

    /// Start a snapshot-and-replay of current alarm state
    ///
    /// The snapshot is taken point-in-time across the whole event space,
    /// filtered with the current filter snapshot and pushed through the same
    /// buffering pipeline as live events. Rejected with `AlreadyRefreshing`
    /// while one is running.
    pub fn refresh(self: &Arc<Self>) -> Result<()> {
        let space = self
            .space
            .upgrade()
            .ok_or_else(|| AeError::not_found("event space", "dropped"))?;
        self.refresh_state
            .compare_exchange(
                REFRESH_IDLE,
                REFRESH_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| AeError::AlreadyRefreshing)?;
        self.refresh_cancel.store(false, Ordering::Release);

        let snapshot = space.condition_snapshot(self.config.refresh_include_inactive);
        debug!(
            subscription = %self.id,
            conditions = snapshot.len(),
            "refresh started"
        );
        let sub = Arc::clone(self);
        tokio::spawn(async move {
            sub.run_refresh(snapshot);
        });
        Ok(())
    }

    /// Request cooperative cancellation of the running refresh
    ///
    /// Best-effort: the final batch may already be queued, so a last-refresh
    /// marker can still arrive after this returns.
    pub fn cancel_refresh(&self) -> Result<()> {
        if self.refresh_state.load(Ordering::Acquire) != REFRESH_RUNNING {
            return Err(AeError::NotRefreshing);
        }
        self.refresh_cancel.store(true, Ordering::Release);
        Ok(())
    }

    fn run_refresh(&self, snapshot: Vec<Arc<Event>>) {
        let passing: Vec<Arc<Event>> = {
            let filter = self.filter.read();
            snapshot
                .into_iter()
                .filter(|event| is_event_passing_filters(event, &filter))
                .collect()
        };

        let total = passing.len();
        for (index, event) in passing.into_iter().enumerate() {
            // Cancellation is polled between items so the task always
            // terminates cleanly
            if self.refresh_cancel.load(Ordering::Acquire) {
                self.enqueue(QueueEntry {
                    event: None,
                    refresh: true,
                    last_refresh: true,
                });
                self.refresh_state.store(REFRESH_IDLE, Ordering::Release);
                debug!(subscription = %self.id, delivered = index, "refresh cancelled");
                return;
            }
            self.enqueue(QueueEntry {
                event: Some(event),
                refresh: true,
                last_refresh: index + 1 == total,
            });
        }
        if total == 0 {
            // Nothing matched; the client still needs the completion marker
            self.enqueue(QueueEntry {
                event: None,
                refresh: true,
                last_refresh: true,
            });
        }
        self.refresh_state.store(REFRESH_IDLE, Ordering::Release);
        debug!(subscription = %self.id, delivered = total, "refresh completed");
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Broadcast entry point for [`EventSpace::fire_shutdown_request`]
    pub(crate) fn notify_shutdown(&self, reason: &str) {
        let consumer = Arc::clone(&self.consumer);
        let reason = reason.to_string();
        tokio::spawn(async move {
            consumer.shutdown_request(&reason).await;
        });
    }

    /// Stop the notification task and any in-flight refresh. Idempotent.
    pub(crate) fn close(&self) {
        self.refresh_cancel.store(true, Ordering::Release);
        self.state.write().active = false;
        self.terminate.notify_one();
        info!(subscription = %self.id, "subscription closed");
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("id", &self.id)
            .field("state", &*self.state.read())
            .finish()
    }
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ATTR_ID_AREAS;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn event(severity: u16, source: &str, areas: &[&str], kind: EventKind) -> Event {
        Event {
            kind,
            category_id: 10,
            source_name: source.to_string(),
            source_areas: areas.iter().map(|a| a.to_string()).collect(),
            message: "test".into(),
            severity,
            timestamp: Utc::now(),
            actor_id: None,
            condition: None,
            attributes: HashMap::new(),
        }
    }

    fn compile(spec: SubscriptionFilter) -> CompiledFilter {
        CompiledFilter::compile(spec, &ServerConfig::default()).unwrap()
    }

    #[test]
    fn test_severity_range_inclusive() {
        let filter = compile(SubscriptionFilter {
            low_severity: 500,
            high_severity: 1000,
            ..Default::default()
        });
        assert!(is_event_passing_filters(
            &event(500, "Tank1", &[], EventKind::Simple),
            &filter
        ));
        assert!(is_event_passing_filters(
            &event(1000, "Tank1", &[], EventKind::Simple),
            &filter
        ));
        assert!(!is_event_passing_filters(
            &event(499, "Tank1", &[], EventKind::Simple),
            &filter
        ));
    }

    #[test]
    fn test_empty_lists_mean_no_restriction() {
        let filter = compile(SubscriptionFilter::default());
        assert!(is_event_passing_filters(
            &event(1, "Anything", &["Anywhere"], EventKind::Tracking),
            &filter
        ));
    }

    #[test]
    fn test_event_type_mask() {
        let filter = compile(SubscriptionFilter {
            event_types: EventTypeMask::CONDITION,
            ..Default::default()
        });
        assert!(!is_event_passing_filters(
            &event(500, "Tank1", &[], EventKind::Simple),
            &filter
        ));
        assert!(is_event_passing_filters(
            &event(500, "Tank1", &[], EventKind::Condition),
            &filter
        ));
    }

    #[test]
    fn test_category_set_applies_to_condition_events() {
        let filter = compile(SubscriptionFilter {
            category_ids: HashSet::from([99]),
            ..Default::default()
        });
        // Condition event of category 10 rejected
        assert!(!is_event_passing_filters(
            &event(500, "Tank1", &[], EventKind::Condition),
            &filter
        ));
        // Simple events are not subject to the category set
        assert!(is_event_passing_filters(
            &event(500, "Tank1", &[], EventKind::Simple),
            &filter
        ));
    }

    #[test]
    fn test_area_wildcards_case_insensitive() {
        let filter = compile(SubscriptionFilter {
            areas: vec!["tank*".into()],
            ..Default::default()
        });
        assert!(is_event_passing_filters(
            &event(500, "X", &["TankFarm"], EventKind::Simple),
            &filter
        ));
        assert!(!is_event_passing_filters(
            &event(500, "X", &["Boilers"], EventKind::Simple),
            &filter
        ));
        // No area on the source at all: an area-restricted filter rejects it
        assert!(!is_event_passing_filters(
            &event(500, "X", &[], EventKind::Simple),
            &filter
        ));
    }

    #[test]
    fn test_source_wildcards() {
        let filter = compile(SubscriptionFilter {
            sources: vec!["Plant.Tank?".into(), "Plant.Pump*".into()],
            ..Default::default()
        });
        assert!(is_event_passing_filters(
            &event(500, "Plant.Tank3", &[], EventKind::Simple),
            &filter
        ));
        assert!(is_event_passing_filters(
            &event(500, "Plant.Pump12", &[], EventKind::Simple),
            &filter
        ));
        assert!(!is_event_passing_filters(
            &event(500, "Plant.Valve1", &[], EventKind::Simple),
            &filter
        ));
    }

    #[test]
    fn test_filter_validation() {
        let config = ServerConfig::default();
        assert!(CompiledFilter::compile(
            SubscriptionFilter {
                low_severity: 800,
                high_severity: 200,
                ..Default::default()
            },
            &config
        )
        .is_err());
        assert!(CompiledFilter::compile(
            SubscriptionFilter {
                low_severity: 0,
                ..Default::default()
            },
            &config
        )
        .is_err());

        let zero_based = ServerConfig {
            min_severity: 0,
            ..Default::default()
        };
        assert!(CompiledFilter::compile(
            SubscriptionFilter {
                low_severity: 0,
                ..Default::default()
            },
            &zero_based
        )
        .is_ok());
    }

    proptest! {
        /// Replaying the same (event, filter) pair always yields the same
        /// answer, and evaluation never mutates either side
        #[test]
        fn prop_filter_is_pure(
            severity in 1u16..=1000,
            low in 1u16..=1000,
            span in 0u16..=999,
            source in "[A-Za-z][A-Za-z0-9.]{0,12}",
            area in "[A-Za-z][A-Za-z0-9]{0,8}",
        ) {
            let high = low.saturating_add(span).min(1000);
            let filter = compile(SubscriptionFilter {
                low_severity: low,
                high_severity: high,
                areas: vec!["Tank*".into()],
                sources: vec![source.clone()],
                ..Default::default()
            });
            let ev = event(severity, &source, &[&area], EventKind::Simple);
            let first = is_event_passing_filters(&ev, &filter);
            for _ in 0..3 {
                prop_assert_eq!(is_event_passing_filters(&ev, &filter), first);
            }
            // In-range severity and a matching area imply acceptance
            let expected = severity >= low
                && severity <= high
                && area.to_ascii_lowercase().starts_with("tank");
            prop_assert_eq!(first, expected);
        }
    }

    #[test]
    fn test_projection_defaults_to_no_attributes() {
        // project() itself is private; the integration tests cover it via
        // delivered batches. Here we sanity-check the reserved-id retention
        // logic on a raw map.
        let mut attrs = HashMap::from([
            (100u32, crate::value::Value::Float(1.0)),
            (ATTR_ID_AREAS, crate::value::Value::Array(vec![])),
        ]);
        let selected: Vec<u32> = vec![ATTR_ID_AREAS];
        attrs.retain(|id, _| selected.contains(id));
        assert_eq!(attrs.len(), 1);
        assert!(attrs.contains_key(&ATTR_ID_AREAS));
    }
}
