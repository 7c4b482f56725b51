//! Engine configuration types.
//!
//! `EngineConfig` represents the `config.toml` that bounds the memory held by
//! the session reconciler: how long idle or old sessions may linger before
//! the eviction hook reports them, and how many TTS events a session buffers.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the reconstruction engine.
///
/// All fields have sensible defaults, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum pending TTS events buffered per session. Oldest are dropped first.
    #[serde(default = "default_max_pending_tts")]
    pub max_pending_tts: usize,

    #[serde(default)]
    pub eviction: EvictionPolicy,
}

fn default_max_pending_tts() -> usize {
    512
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pending_tts: default_max_pending_tts(),
            eviction: EvictionPolicy::default(),
        }
    }
}

/// When a session accumulator becomes eligible for eviction.
///
/// A value of `0` disables that limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionPolicy {
    /// Seconds since the last observed line for the session.
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,
    /// Seconds since the first observed line for the session.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_max_idle_secs() -> u64 {
    300
}

fn default_max_age_secs() -> u64 {
    3600
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            max_idle_secs: default_max_idle_secs(),
            max_age_secs: default_max_age_secs(),
        }
    }
}
