//! Heimdall error types
//!
//! Request-level failures are [`GatewayError`]s with a stable [`ErrorCode`]
//! and message. Collaborator failures arrive as [`BackendError`] or
//! [`PublishError`] and are classified exactly once, by the component that
//! talks to the collaborator; they never reach a caller unclassified.

/// Transport-neutral status code carried by every [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Canceled,
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    NotFound,
    Internal,
    ResourceExhausted,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Canceled => "Canceled",
            ErrorCode::Unauthenticated => "Unauthenticated",
            ErrorCode::PermissionDenied => "PermissionDenied",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::Internal => "Internal",
            ErrorCode::ResourceExhausted => "ResourceExhausted",
        }
    }
}

/// Heimdall request errors.
///
/// `Clone` because one coalesced backing failure is handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway: context canceled")]
    Canceled,

    // Credential errors
    #[error("gateway: missing APIKey")]
    MissingApiKey,

    #[error("gateway: invalid APIKey")]
    InvalidApiKey,

    #[error("gateway: disabled APIKey")]
    DisabledApiKey,

    #[error("gateway: bad role")]
    BadRole,

    // Request validation
    /// A required request field is absent, e.g. `Required("user id")`.
    #[error("gateway: {0} is required")]
    Required(&'static str),

    #[error("gateway: missing events")]
    MissingEvents,

    /// Batch-fatal: one event in a RegisterEvents call has no id.
    #[error("gateway: missing event id")]
    MissingEventId,

    #[error("gateway: invalid timestamp")]
    InvalidTimestamp,

    #[error("gateway: {0}")]
    InvalidArgument(String),

    // Lookups
    #[error("gateway: feature not found")]
    FeatureNotFound,

    #[error("gateway: evaluation not found")]
    EvaluationNotFound,

    #[error("gateway: internal")]
    Internal,

    /// The gateway was assembled without a required collaborator.
    #[error("gateway: configuration error: {0}")]
    Configuration(String),

    /// Admission control: the instance is busy, try again later.
    #[error("gateway: {0}")]
    ResourceExhausted(String),
}

impl GatewayError {
    /// Stable code for transport mapping.
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::Canceled => ErrorCode::Canceled,
            GatewayError::MissingApiKey => ErrorCode::Unauthenticated,
            GatewayError::InvalidApiKey | GatewayError::DisabledApiKey | GatewayError::BadRole => {
                ErrorCode::PermissionDenied
            }
            GatewayError::Required(_)
            | GatewayError::MissingEvents
            | GatewayError::MissingEventId
            | GatewayError::InvalidTimestamp
            | GatewayError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            GatewayError::FeatureNotFound | GatewayError::EvaluationNotFound => {
                ErrorCode::NotFound
            }
            GatewayError::Internal | GatewayError::Configuration(_) => ErrorCode::Internal,
            GatewayError::ResourceExhausted(_) => ErrorCode::ResourceExhausted,
        }
    }
}

/// Failure reported by a backing collaborator (account service, feature
/// service, batch runner).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("backend error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            BackendError::Unavailable(err.to_string())
        } else {
            BackendError::Other(err.to_string())
        }
    }
}

/// Failure reported by the pub/sub publisher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The message can never be published; resending will not help.
    #[error("bad message")]
    BadMessage,

    #[error("publish failed: {0}")]
    Failed(String),
}

impl PublishError {
    pub fn is_retriable(&self) -> bool {
        !matches!(self, PublishError::BadMessage)
    }
}

/// Per-event ingestion failure. Reported in the RegisterEvents result map,
/// never as a request error. All variants are non-retriable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("gateway: invalid event id format")]
    InvalidIdFormat,

    #[error("gateway: failed to unmarshal event")]
    UnmarshalFailed,

    /// A required field of the decoded event is empty, e.g. `EmptyField("goal_id")`.
    #[error("gateway: {0} is empty")]
    EmptyField(&'static str),

    #[error("gateway: reason is nil")]
    NilReason,

    #[error("gateway: invalid event timestamp")]
    InvalidTimestamp,

    #[error("Invalid message type")]
    InvalidType,
}

impl EventError {
    /// `code` label of the register-events counter.
    pub fn metric_code(&self) -> &'static str {
        match self {
            EventError::InvalidIdFormat => "InvalidID",
            EventError::UnmarshalFailed => "UnmarshalFailed",
            EventError::EmptyField(_) | EventError::NilReason => "EmptyField",
            EventError::InvalidTimestamp => "InvalidTimestamp",
            EventError::InvalidType => "InvalidType",
        }
    }
}

/// Failure of the external (shared) cache tier. Always non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache codec error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Codec(err.to_string())
    }
}

/// Result type alias for Heimdall operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_map_to_auth_codes() {
        assert_eq!(GatewayError::MissingApiKey.code(), ErrorCode::Unauthenticated);
        assert_eq!(GatewayError::InvalidApiKey.code(), ErrorCode::PermissionDenied);
        assert_eq!(GatewayError::DisabledApiKey.code(), ErrorCode::PermissionDenied);
        assert_eq!(GatewayError::BadRole.code(), ErrorCode::PermissionDenied);
    }

    #[test]
    fn required_field_message() {
        let err = GatewayError::Required("user id");
        assert_eq!(err.to_string(), "gateway: user id is required");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn event_errors_keep_wire_messages() {
        assert_eq!(
            EventError::EmptyField("goal_id").to_string(),
            "gateway: goal_id is empty"
        );
        assert_eq!(EventError::InvalidType.to_string(), "Invalid message type");
        assert_eq!(EventError::NilReason.metric_code(), "EmptyField");
    }

    #[test]
    fn bad_message_is_not_retriable() {
        assert!(!PublishError::BadMessage.is_retriable());
        assert!(PublishError::Failed("timeout".into()).is_retriable());
    }
}
