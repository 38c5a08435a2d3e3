//! Registration policies.
//!
//! # Example
//!
//! ```no_run
//! use reducktion_core::config::{ConflictPolicy, RegistryConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads REDUCKTION_CONFLICT_POLICY / REDUCKTION_CYCLE_POLICY (both optional)
//! let config = RegistryConfig::from_env()?;
//!
//! // Or build explicitly
//! let strict = RegistryConfig::default().with_conflict_policy(ConflictPolicy::Reject);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the [`ConflictPolicy`]
pub const CONFLICT_POLICY_ENV: &str = "REDUCKTION_CONFLICT_POLICY";

/// Environment variable selecting the [`CyclePolicy`]
pub const CYCLE_POLICY_ENV: &str = "REDUCKTION_CYCLE_POLICY";

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A policy value could not be parsed
    #[error("Invalid value '{value}' for {key}, expected one of: {expected}")]
    InvalidValue {
        /// Setting being parsed
        key: &'static str,
        /// Rejected value
        value: String,
        /// Accepted values
        expected: &'static str,
    },

    /// An environment variable holds non-unicode data
    #[error("Environment variable {0} is not valid unicode")]
    NotUnicode(&'static str),
}

/// What to do when a reaction and an own handler share an action type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// The reaction replaces the own handler (a warning is logged)
    #[default]
    ReactionWins,
    /// Registration fails
    Reject,
}

impl FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reaction-wins" | "reaction_wins" => Ok(Self::ReactionWins),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidValue {
                key: CONFLICT_POLICY_ENV,
                value: s.to_string(),
                expected: "reaction-wins, reject",
            }),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReactionWins => write!(f, "reaction-wins"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// What to do when modules inject each other in a cycle
///
/// Dependency handles only expose types, actions and selectors, which are
/// complete before any dependency is resolved, so cycles are safe to allow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CyclePolicy {
    /// Cycles are accepted (logged at debug level)
    #[default]
    Allow,
    /// Registration fails with the offending cycle
    Reject,
}

impl FromStr for CyclePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidValue {
                key: CYCLE_POLICY_ENV,
                value: s.to_string(),
                expected: "allow, reject",
            }),
        }
    }
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Policies applied by [`ModuleRegistry`](crate::registry::ModuleRegistry)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Reaction vs own handler clashes
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Injection cycles
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
}

impl RegistryConfig {
    /// Load from the environment, falling back to defaults for unset variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = read_env(CONFLICT_POLICY_ENV)? {
            config.conflict_policy = value.parse()?;
        }
        if let Some(value) = read_env(CYCLE_POLICY_ENV)? {
            config.cycle_policy = value.parse()?;
        }
        Ok(config)
    }

    /// Set the conflict policy
    #[must_use]
    pub const fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Set the cycle policy
    #[must_use]
    pub const fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }
}

fn read_env(key: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policies() {
        assert_eq!("reject".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Reject));
        assert_eq!(" Reaction-Wins ".parse::<ConflictPolicy>(), Ok(ConflictPolicy::ReactionWins));
        assert_eq!("allow".parse::<CyclePolicy>(), Ok(CyclePolicy::Allow));
        assert!(matches!(
            "sometimes".parse::<CyclePolicy>(),
            Err(ConfigError::InvalidValue { key: CYCLE_POLICY_ENV, .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.conflict_policy, ConflictPolicy::ReactionWins);
        assert_eq!(config.cycle_policy, CyclePolicy::Allow);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for policy in [ConflictPolicy::ReactionWins, ConflictPolicy::Reject] {
            assert_eq!(policy.to_string().parse::<ConflictPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: Result<RegistryConfig, _> = serde_json::from_str(r#"{ "cycle_policy": "reject" }"#);
        assert_eq!(
            config.ok(),
            Some(RegistryConfig::default().with_cycle_policy(CyclePolicy::Reject))
        );
    }
}
