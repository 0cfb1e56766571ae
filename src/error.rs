//! Error types for nutri-bot.

use std::time::Duration;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("No channel named {0} is registered")]
    UnknownChannel(String),
}

/// Plan generator errors.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} returned an empty plan")]
    EmptyPlan { provider: String },
}

/// Failures of a single `ConversationEngine` turn.
///
/// Input validation never ends up here: it is an ordinary transition
/// outcome. These are the collaborator failures plus the "not registered"
/// case for commands that need a stored profile.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Storage unavailable: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Plan generator unavailable: {0}")]
    Generator(#[from] PlanError),

    #[error("User {user_id} has no stored profile")]
    NotRegistered { user_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_wraps_collaborators() {
        let storage = EngineError::from(DatabaseError::Query("boom".into()));
        assert!(matches!(storage, EngineError::Storage(_)));

        let plan = EngineError::from(PlanError::EmptyPlan {
            provider: "anthropic".into(),
        });
        assert!(matches!(plan, EngineError::Generator(_)));

        let missing = EngineError::NotRegistered { user_id: 7 };
        assert_eq!(missing.to_string(), "User 7 has no stored profile");
    }

    #[test]
    fn top_level_wraps_sub_errors() {
        let err: Error = ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()).into();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err: Error = DatabaseError::Migration("V1 failed".into()).into();
        assert!(err.to_string().starts_with("Database error"));

        let err: Error = ConfigError::InvalidValue {
            key: "NUTRI_BOT_HTTP_PORT".into(),
            message: "not a number".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration value for NUTRI_BOT_HTTP_PORT: not a number"
        );
    }
}
