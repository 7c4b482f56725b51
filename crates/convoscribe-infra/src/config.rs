//! Engine configuration loader.
//!
//! Reads a TOML file and deserializes it into [`EngineConfig`]. Falls back to
//! sensible defaults when the file is missing or malformed.

use std::path::Path;

use convoscribe_types::config::{EngineConfig, EvictionPolicy};

/// Smallest pending-TTS bound honored when one is configured.
const MIN_PENDING_TTS: usize = 8;

/// Load engine configuration from `path`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config with floors applied.
pub async fn load_engine_config(path: &Path) -> EngineConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => EngineConfig {
            max_pending_tts: resolve_max_pending_tts(config.max_pending_tts),
            eviction: resolve_eviction_policy(config.eviction),
        },
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            EngineConfig::default()
        }
    }
}

/// Apply the pending-TTS floor. `0` (unbounded) passes through.
pub fn resolve_max_pending_tts(configured: usize) -> usize {
    if configured == 0 {
        0
    } else {
        configured.max(MIN_PENDING_TTS)
    }
}

/// Normalize an eviction policy.
///
/// An idle limit longer than the age limit can never fire first, so it is
/// clamped to the age limit. Zero (disabled) limits pass through.
pub fn resolve_eviction_policy(policy: EvictionPolicy) -> EvictionPolicy {
    let max_idle_secs = match (policy.max_idle_secs, policy.max_age_secs) {
        (idle, age) if idle > 0 && age > 0 => idle.min(age),
        (idle, _) => idle,
    };
    EvictionPolicy {
        max_idle_secs,
        max_age_secs: policy.max_age_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_engine_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_engine_config(&tmp.path().join("config.toml")).await;
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn test_load_engine_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
max_pending_tts = 128

[eviction]
max_idle_secs = 120
max_age_secs = 1800
"#,
        )
        .await
        .unwrap();

        let config = load_engine_config(&config_path).await;
        assert_eq!(config.max_pending_tts, 128);
        assert_eq!(config.eviction.max_idle_secs, 120);
        assert_eq!(config.eviction.max_age_secs, 1800);
    }

    #[tokio::test]
    async fn test_load_engine_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_engine_config(&config_path).await;
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn test_load_engine_config_applies_floors() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            "max_pending_tts = 2\n[eviction]\nmax_idle_secs = 9000\nmax_age_secs = 600\n",
        )
        .await
        .unwrap();

        let config = load_engine_config(&config_path).await;
        assert_eq!(config.max_pending_tts, MIN_PENDING_TTS);
        assert_eq!(config.eviction.max_idle_secs, 600);
    }

    #[test]
    fn test_resolve_max_pending_tts_keeps_unbounded() {
        assert_eq!(resolve_max_pending_tts(0), 0);
        assert_eq!(resolve_max_pending_tts(1), MIN_PENDING_TTS);
        assert_eq!(resolve_max_pending_tts(1000), 1000);
    }

    #[test]
    fn test_resolve_eviction_policy_passes_disabled_limits() {
        let policy = EvictionPolicy {
            max_idle_secs: 500,
            max_age_secs: 0,
        };
        assert_eq!(resolve_eviction_policy(policy), policy);

        let idle_disabled = EvictionPolicy {
            max_idle_secs: 0,
            max_age_secs: 60,
        };
        assert_eq!(resolve_eviction_policy(idle_disabled), idle_disabled);
    }
}
