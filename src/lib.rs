//! AERA - Alarms & Events Runtime for Automation
//!
//! An industrial Alarms & Events server core: a hierarchy of event
//! categories, condition definitions, sources and live condition instances,
//! with event distribution to independently-filtered client subscriptions
//! over buffered, cancellable delivery.
//!
//! The [`EventSpace`] is the single authority over all registries and the
//! only fan-out point for events; each [`SubscriptionManager`] owns its
//! filters, a bounded event buffer, a notification task and an independently
//! cancellable refresh task.
//!
//! # Examples
//!
//! ```rust,no_run
//! use aera::{EventSpace, ServerConfig, EventKind, SubConditionDefinition};
//!
//! # async fn demo() -> aera::Result<()> {
//! aera::init()?;
//!
//! let space = EventSpace::new(ServerConfig::default())?;
//! space.add_category(10, "Level", EventKind::Condition)?;
//! space.add_single_state_condition_def(
//!     1,
//!     "HIGH_HIGH",
//!     10,
//!     SubConditionDefinition {
//!         name: "HIGH_HIGH".into(),
//!         definition: "LEVEL > 90%".into(),
//!         severity: 800,
//!         description: "Tank level critically high".into(),
//!         ack_required: true,
//!     },
//! )?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// ============================================================================
// CORE MODULES
// ============================================================================

/// Crate error handling with structured error types
pub mod error;

/// Typed attribute values and quality codes
pub mod value;

/// Server configuration with YAML support and validation
pub mod config;

/// Event categories and their attribute registries
pub mod category;

/// Condition and sub-condition templates
pub mod definition;

/// Event sources and their process areas
pub mod source;

/// Immutable event records
pub mod event;

/// Runtime alarm instances and their state machine
pub mod condition;

/// Wildcard pattern matching for area/source filters
pub mod filter;

/// Per-client subscriptions: filter, buffer, notify, refresh
pub mod subscription;

/// Registries, event dispatch, acknowledgement and shutdown broadcast
pub mod event_space;

// ============================================================================
// PUBLIC RE-EXPORTS
// ============================================================================

pub use category::{EventAttribute, EventCategory, EventKind, ATTR_ID_ACK_COMMENT, ATTR_ID_AREAS};
pub use condition::{ChangeMask, Condition, ConditionUpdate};
pub use config::{ServerConfig, MAX_SEVERITY};
pub use definition::{ConditionDefinition, SubConditionDefinition};
pub use error::{AeError, Result};
pub use event::{ConditionSnapshot, ConditionStateFlags, Event};
pub use event_space::{
    AckHandler, AckRequest, ConditionStateChange, EnableScope, EventSpace,
};
pub use filter::Pattern;
pub use source::{Source, SourceConfig};
pub use subscription::{
    is_event_passing_filters, CompiledFilter, EventConsumer, EventTypeMask, SubscriptionFilter,
    SubscriptionManager, SubscriptionState,
};
pub use value::{Quality, QualityCode, Value, ValueType};

/// AERA version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Initialize the AERA runtime
///
/// Sets up the tracing subscriber (honouring `RUST_LOG`) if no global
/// subscriber is installed yet. Safe to call more than once.
pub fn init() -> Result<()> {
    #[cfg(not(test))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_target(false));

        if subscriber.try_init().is_err() {
            // Already initialized, ignore error
        }
    }

    tracing::info!("AERA {} initialized", VERSION);
    Ok(())
}
