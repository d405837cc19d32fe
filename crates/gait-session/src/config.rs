// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lock tuning: a typed config with a profile default, permissive
//! environment overrides, and collected validation warnings.

use std::env;
use std::time::Duration;

/// How severe a [`ConfigWarning`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational note, not necessarily a problem.
    Info,
    /// Likely unintended but not fatal.
    Warning,
    /// Invalid configuration that will cause problems.
    Error,
}

/// A single configuration problem found while loading or validating a
/// [`SessionLockConfig`].
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// Dot-delimited path to the problematic field, e.g. `"timeout_ms"`.
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: WarningSeverity,
}

/// Lock tuning profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockProfile {
    /// Low concurrency: longer stale window, fsync every append.
    Standard,
    /// High concurrency: shorter retry, no per-append fsync.
    Swarm,
}

/// Tunable parameters of the two-level session lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLockConfig {
    /// How long to retry before giving up on an exclusively-held lock.
    pub timeout_ms: u64,
    /// Delay between retry attempts.
    pub retry_ms: u64,
    /// A lock file older than this is considered abandoned and removed.
    pub stale_after_ms: u64,
    /// Whether to `fsync` the journal after every append.
    pub fsync_every_append: bool,
}

impl SessionLockConfig {
    /// The `standard` profile: timeout 2s, retry 50ms, stale_after 5m, fsync every append.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            timeout_ms: 2_000,
            retry_ms: 50,
            stale_after_ms: 5 * 60 * 1_000,
            fsync_every_append: true,
        }
    }

    /// The `swarm` profile: timeout 10s, retry 20ms, stale_after 10m, no per-append fsync.
    #[must_use]
    pub fn swarm() -> Self {
        Self {
            timeout_ms: 10_000,
            retry_ms: 20,
            stale_after_ms: 10 * 60 * 1_000,
            fsync_every_append: false,
        }
    }

    /// Builds the config for a named profile.
    #[must_use]
    pub fn for_profile(profile: LockProfile) -> Self {
        match profile {
            LockProfile::Standard => Self::standard(),
            LockProfile::Swarm => Self::swarm(),
        }
    }

    /// Selects a base profile from `GAIT_SESSION_LOCK_PROFILE` (`standard`
    /// or `swarm`), then overrides individual fields from
    /// `GAIT_SESSION_LOCK_TIMEOUT`, `GAIT_SESSION_LOCK_RETRY`, and
    /// `GAIT_SESSION_LOCK_STALE_AFTER`, in that order. An unparseable or
    /// unknown value is left at its current setting and reported as a
    /// warning; it never aborts loading the rest.
    #[must_use]
    pub fn apply_env_overrides(mut self) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        if let Ok(raw) = env::var("GAIT_SESSION_LOCK_PROFILE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "standard" => self = Self::standard(),
                "swarm" => self = Self::swarm(),
                _ => warnings.push(ConfigWarning {
                    field: "profile".to_string(),
                    message: format!("unknown lock profile in GAIT_SESSION_LOCK_PROFILE: {raw}"),
                    severity: WarningSeverity::Warning,
                }),
            }
        }

        self.apply_u64_override("GAIT_SESSION_LOCK_TIMEOUT", &mut warnings, |c, v| c.timeout_ms = v);
        self.apply_u64_override("GAIT_SESSION_LOCK_RETRY", &mut warnings, |c, v| c.retry_ms = v);
        self.apply_u64_override("GAIT_SESSION_LOCK_STALE_AFTER", &mut warnings, |c, v| {
            c.stale_after_ms = v;
        });

        (self, warnings)
    }

    fn apply_u64_override(
        &mut self,
        var: &str,
        warnings: &mut Vec<ConfigWarning>,
        set: impl FnOnce(&mut Self, u64),
    ) {
        let Ok(raw) = env::var(var) else { return };
        match raw.trim().parse::<u64>() {
            Ok(value) => set(self, value),
            Err(_) => warnings.push(ConfigWarning {
                field: var.to_ascii_lowercase(),
                message: format!("unparseable integer in {var}: {raw}"),
                severity: WarningSeverity::Warning,
            }),
        }
    }

    /// Returns every problem found, rather than stopping at the first.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.timeout_ms == 0 {
            warnings.push(ConfigWarning {
                field: "timeout_ms".to_string(),
                message: "timeout_ms must be greater than 0".to_string(),
                severity: WarningSeverity::Error,
            });
        }
        if self.retry_ms == 0 {
            warnings.push(ConfigWarning {
                field: "retry_ms".to_string(),
                message: "retry_ms must be greater than 0".to_string(),
                severity: WarningSeverity::Error,
            });
        }
        if self.timeout_ms < self.retry_ms {
            warnings.push(ConfigWarning {
                field: "timeout_ms".to_string(),
                message: "timeout_ms is smaller than retry_ms; the lock would never get a second attempt"
                    .to_string(),
                severity: WarningSeverity::Error,
            });
        }
        if self.stale_after_ms < self.timeout_ms {
            warnings.push(ConfigWarning {
                field: "stale_after_ms".to_string(),
                message: "stale_after_ms is smaller than timeout_ms; a slow holder could be evicted mid-operation"
                    .to_string(),
                severity: WarningSeverity::Warning,
            });
        }
        warnings
    }

    /// [`Self::timeout_ms`] as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// [`Self::retry_ms`] as a [`Duration`].
    #[must_use]
    pub fn retry(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    /// [`Self::stale_after_ms`] as a [`Duration`].
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

impl Default for SessionLockConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn standard_and_swarm_profiles_differ() {
        assert!(SessionLockConfig::standard().fsync_every_append);
        assert!(!SessionLockConfig::swarm().fsync_every_append);
    }

    #[test]
    fn profile_env_var_selects_swarm_before_numeric_overrides_apply() {
        unsafe { env::set_var("GAIT_SESSION_LOCK_PROFILE", "swarm"); }
        unsafe { env::set_var("GAIT_SESSION_LOCK_RETRY", "5"); }
        let (config, warnings) = SessionLockConfig::standard().apply_env_overrides();
        assert!(warnings.is_empty());
        assert_eq!(config.timeout_ms, SessionLockConfig::swarm().timeout_ms);
        assert_eq!(config.retry_ms, 5);
        unsafe { env::remove_var("GAIT_SESSION_LOCK_PROFILE"); }
        unsafe { env::remove_var("GAIT_SESSION_LOCK_RETRY"); }
    }

    #[test]
    fn unknown_profile_env_var_warns_and_keeps_current_config() {
        unsafe { env::set_var("GAIT_SESSION_LOCK_PROFILE", "turbo"); }
        let (config, warnings) = SessionLockConfig::standard().apply_env_overrides();
        assert_eq!(config.timeout_ms, SessionLockConfig::standard().timeout_ms);
        assert!(warnings.iter().any(|w| w.field == "profile"));
        unsafe { env::remove_var("GAIT_SESSION_LOCK_PROFILE"); }
    }

    #[test]
    fn validate_reports_timeout_smaller_than_retry() {
        let config = SessionLockConfig {
            timeout_ms: 10,
            retry_ms: 50,
            stale_after_ms: 1_000,
            fsync_every_append: true,
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.field == "timeout_ms"));
    }
}
