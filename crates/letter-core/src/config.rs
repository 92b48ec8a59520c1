//! Engine configuration.

use crate::engine::{ProtectionSpan, TimeoutPolicy};
use crate::error::{GameError, Result};
use crate::secrecy::RevealPolicy;
use chrono::Duration;

/// Timing and default policies shared by every room of a registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a pending action waits for its target
    pub response_timeout: Duration,
    /// How long a turn holder may sit on a turn
    pub turn_timeout: Duration,
    pub default_reveal_policy: RevealPolicy,
    pub default_timeout_policy: TimeoutPolicy,
    pub default_protection: ProtectionSpan,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::seconds(30),
            turn_timeout: Duration::seconds(120),
            default_reveal_policy: RevealPolicy::CommitReveal,
            default_timeout_policy: TimeoutPolicy::ForfeitTarget,
            default_protection: ProtectionSpan::Round,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `LETTER_RESPONSE_TIMEOUT_SECS`,
    /// `LETTER_TURN_TIMEOUT_SECS`, `LETTER_REVEAL_POLICY`,
    /// `LETTER_TIMEOUT_POLICY` and `LETTER_PROTECTION`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = lookup("LETTER_RESPONSE_TIMEOUT_SECS") {
            config.response_timeout = parse_secs("LETTER_RESPONSE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("LETTER_TURN_TIMEOUT_SECS") {
            config.turn_timeout = parse_secs("LETTER_TURN_TIMEOUT_SECS", &secs)?;
        }
        if let Some(policy) = lookup("LETTER_REVEAL_POLICY") {
            config.default_reveal_policy = policy.parse().map_err(GameError::InvalidSettings)?;
        }
        if let Some(policy) = lookup("LETTER_TIMEOUT_POLICY") {
            config.default_timeout_policy = policy.parse().map_err(GameError::InvalidSettings)?;
        }
        if let Some(span) = lookup("LETTER_PROTECTION") {
            config.default_protection = span.parse().map_err(GameError::InvalidSettings)?;
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    match value.parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(Duration::seconds(secs)),
        _ => Err(GameError::InvalidSettings(format!(
            "{} must be a positive number of seconds, got {:?}",
            key, value
        ))),
    }
}
