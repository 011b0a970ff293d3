use thiserror::Error;

// ============================================================================
// Main Error Enum
// ============================================================================

/// Error enum shared by every keeper component
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutopayError {
    // ========================================================================
    // Collaborator Errors
    // ========================================================================

    /// A remote capability (batch call, price source) failed or is unreachable
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable { collaborator: String, reason: String },

    /// A strict batched round failed as a whole
    #[error("Aggregation failed in {round}: {reason}")]
    AggregationFailed { round: String, reason: String },

    /// Remote data could not be interpreted
    #[error("Failed to decode {what}: {reason}")]
    DecodeFailure { what: String, reason: String },

    // ========================================================================
    // Validation Errors
    // ========================================================================

    /// Invalid parameter
    #[error("Invalid parameter '{parameter}': got '{value}', expected '{expected}'")]
    InvalidParameter { parameter: String, value: String, expected: String },

    /// Query not present in the catalog
    #[error("Unknown query: {query}")]
    UnknownQuery { query: String },

    // ========================================================================
    // Configuration Errors
    // ========================================================================

    /// Invalid configuration
    #[error("Invalid configuration for '{component}': {reason}")]
    InvalidConfiguration { component: String, reason: String },

    /// Missing configuration
    #[error("Missing configuration for '{component}': {reason}")]
    MissingConfiguration { component: String, reason: String },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Generic error with optional context
    #[error("Error: {message}")]
    Generic { message: String, context: Option<String> },
}

impl AutopayError {
    /// Create a collaborator unavailable error
    pub fn collaborator_unavailable(collaborator: &str, reason: &str) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: collaborator.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an aggregation failure for a batched round
    pub fn aggregation_failed(round: &str, reason: &str) -> Self {
        Self::AggregationFailed {
            round: round.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a decode failure
    pub fn decode_failure(what: &str, reason: &str) -> Self {
        Self::DecodeFailure {
            what: what.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, value: &str, expected: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create an unknown query error
    pub fn unknown_query(query: &str) -> Self {
        Self::UnknownQuery { query: query.to_string() }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(component: &str, reason: &str) -> Self {
        Self::InvalidConfiguration {
            component: component.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a missing configuration error
    pub fn missing_configuration(component: &str, reason: &str) -> Self {
        Self::MissingConfiguration {
            component: component.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a generic error
    pub fn generic(message: &str) -> Self {
        Self::Generic {
            message: message.to_string(),
            context: None,
        }
    }

    /// Create a generic error with context
    pub fn generic_with_context(message: &str, context: &str) -> Self {
        Self::Generic {
            message: message.to_string(),
            context: Some(context.to_string()),
        }
    }

    /// Whether a later attempt may succeed; configuration and parameter
    /// errors never recover on their own
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorUnavailable { .. } | Self::AggregationFailed { .. } | Self::DecodeFailure { .. }
        )
    }
}

/// Result type alias using the shared error type
pub type AutopayResult<T> = std::result::Result<T, AutopayError>;
