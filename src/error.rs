use thiserror::Error;

/// Application level error type used throughout the crate.
#[derive(Error, Debug)]
pub enum AeError {
    /// I/O related failure
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error while parsing YAML configuration files
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error while serializing an event record to JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A category, source, condition or attribute id was not registered
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A registration id collided with an existing entry
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// Bad sub-condition id, out-of-range severity, malformed filter, ...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Acknowledgement carried an active-time that no longer matches the
    /// condition's current activation
    #[error("Stale condition: active time {supplied} does not match {current}")]
    StaleCondition {
        supplied: chrono::DateTime<chrono::Utc>,
        current: chrono::DateTime<chrono::Utc>,
    },

    /// Refresh requested while one is already running
    #[error("Refresh already in progress")]
    AlreadyRefreshing,

    /// Cancel requested with no refresh running
    #[error("No refresh in progress")]
    NotRefreshing,

    /// The external acknowledge-accepted hook declined the acknowledgement
    #[error("Acknowledgement rejected: {0}")]
    Rejected(String),
}

/// Convenient alias over [`Result`] using [`AeError`]
pub type Result<T> = std::result::Result<T, AeError>;

impl AeError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AeError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(kind: &'static str, id: impl ToString) -> Self {
        AeError::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }
}
