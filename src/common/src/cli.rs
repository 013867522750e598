use clap::Args;
use std::path::PathBuf;

/// Arguments shared by every binary that loads settings and logs.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, help = "Settings file path (defaults to ./backup-pruner.toml)")]
    pub settings: Option<PathBuf>,

    #[arg(long, help = "Log level: DEBUG, INFO, WARNING, ERROR")]
    pub log_level: Option<String>,

    #[arg(long, help = "Also write log lines to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Print the effective configuration as JSON and exit")]
    pub print_config: bool,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use std::fs::OpenOptions;
    use std::path::Path;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    /// Map `WARNING`/`CRITICAL` style level names onto `EnvFilter` directives.
    pub fn normalize_level(level: &str) -> String {
        match level.trim().to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    }

    /// Install the global subscriber: stdout always, plus `file` when given.
    pub fn init_logging(level: &str, file: Option<&Path>) -> Result<()> {
        let directive = normalize_level(level);
        let filter = EnvFilter::try_new(&directive)
            .with_context(|| format!("Invalid log level '{level}'"))?;

        let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);

        let file_layer = match file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?;
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(false),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init()
            .context("Failed to install log subscriber")?;

        Ok(())
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(settings_path: Option<&PathBuf>) -> Result<Configuration> {
        match settings_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Settings file not found: {}", path.display());
                }
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Apply the logging flags on top of the loaded configuration.
    pub fn apply_overrides(config: &mut Configuration, args: &CommonArgs) {
        if let Some(level) = &args.log_level {
            config.logging.level = level.clone();
        }
        if let Some(file) = &args.log_file {
            config.logging.file = Some(file.clone());
        }
    }

    pub fn display_config(config: &Configuration) -> Result<()> {
        let json = serde_json::to_string_pretty(config)
            .context("Failed to serialize configuration to JSON")?;
        println!("{json}");
        Ok(())
    }

    /// Standard version line for a binary, logged at startup.
    pub fn version_info(package: &str, version: &str) -> String {
        format!(
            "{package} {version} (rust {})",
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    #[test]
    fn test_normalize_level_accepts_uppercase_names() {
        assert_eq!(utils::normalize_level("INFO"), "info");
        assert_eq!(utils::normalize_level("WARNING"), "warn");
        assert_eq!(utils::normalize_level("CRITICAL"), "error");
        assert_eq!(utils::normalize_level(" debug "), "debug");
    }

    #[test]
    fn test_overrides_replace_logging_settings() {
        let mut config = Configuration::default();
        let args = CommonArgs {
            log_level: Some("DEBUG".to_string()),
            log_file: Some(PathBuf::from("/tmp/pruner.log")),
            ..Default::default()
        };

        utils::apply_overrides(&mut config, &args);

        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/pruner.log")));
    }

    #[test]
    fn test_missing_explicit_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        let err = utils::load_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Settings file not found"));
    }

    #[test]
    fn test_explicit_settings_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[cleanup]\nworkers = 9\ndry_run = true\n").unwrap();

        let config = utils::load_config(Some(&path)).unwrap();
        assert_eq!(config.cleanup.workers, 9);
        assert!(config.cleanup.dry_run);
    }

    #[test]
    fn test_version_info() {
        let version = utils::version_info("backup-pruner", "1.2.3");
        assert!(version.starts_with("backup-pruner 1.2.3 (rust "));
    }
}
