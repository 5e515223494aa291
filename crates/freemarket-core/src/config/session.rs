//! Session admission configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session admission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a session's TTL marker in minutes.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
    /// Interval between reconciliation sweeps in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Limit used when the store holds no `session_limit` value yet.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// How `register` enforces the cap.
    #[serde(default)]
    pub admission_mode: AdmissionMode,
}

impl SessionConfig {
    /// TTL marker lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes * 60)
    }

    /// Sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            sweep_interval_seconds: default_sweep_interval(),
            default_limit: default_limit(),
            admission_mode: AdmissionMode::default(),
        }
    }
}

/// Strategy used to enforce the session cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Limit read, size check and insert run as one store-side operation.
    /// The cap holds under concurrent registration.
    #[default]
    Atomic,
    /// Limit read, size read and insert are separate store calls.
    /// Concurrent registrations can overshoot the cap.
    CheckThenAct,
}

impl std::fmt::Display for AdmissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionMode::Atomic => write!(f, "atomic"),
            AdmissionMode::CheckThenAct => write!(f, "check_then_act"),
        }
    }
}

fn default_ttl_minutes() -> u64 {
    30
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_limit() -> u32 {
    100
}
