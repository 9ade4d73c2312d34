//! Configuration loader for Rampart.
//!
//! Reads `rampart.toml` from the given directory and deserializes it into
//! [`RampartConfig`]. Falls back to defaults when the file is missing or
//! malformed, so a bare deployment still comes up with the stock policies.

use std::path::Path;

use rampart_types::config::RampartConfig;

/// Load configuration from `{dir}/rampart.toml`.
///
/// - Missing file: returns [`RampartConfig::default()`].
/// - Unreadable or unparseable file: logs a warning, returns the default.
pub async fn load_config(dir: &Path) -> RampartConfig {
    let config_path = dir.join("rampart.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No rampart.toml at {}, using defaults", config_path.display());
            return RampartConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RampartConfig::default();
        }
    };

    match toml::from_str::<RampartConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RampartConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_types::chaos::ChaosLevel;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.escalation.cluster_size, 3);
        assert_eq!(config.monitor.tick_secs, 30);
        assert_eq!(config.chaos.level, ChaosLevel::Safe);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("rampart.toml"),
            r#"
pause_resume_secs = 120

[monitor]
tick_secs = 10

[chaos]
level = "aggressive"

[[gateway.providers]]
name = "openai"
model = "gpt-4o"
priority = 0
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.pause_resume_secs, 120);
        assert_eq!(config.monitor.tick_secs, 10);
        assert_eq!(config.chaos.level, ChaosLevel::Aggressive);
        assert_eq!(config.gateway.providers.len(), 1);
        // Untouched sections keep their defaults
        assert_eq!(config.escalation.cluster_window_secs, 300);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("rampart.toml"), "not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.chaos.kill_switch_threshold, 5);
        assert_eq!(config.pause_resume_secs, 300);
    }
}
