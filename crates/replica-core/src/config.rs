//! Configuration management for replica.
//!
//! Settings are stored as TOML and every section falls back to defaults, so a
//! config file only needs the keys it overrides.
//!
//! ## Lookup Order
//!
//! 1. `REPLICA_CONFIG` (explicit file path)
//! 2. Platform config directory (`<config_dir>/replica/config.toml`)
//! 3. Built-in defaults
//!
//! After loading, `REPLICA_GENERATION_TIMEOUT_SECS` and `REPLICA_MODEL` override
//! the matching generation settings.
//!
//! ## Example Configuration File
//!
//! ```toml
//! [generation]
//! timeout_secs = 90
//! model = "gemini-1.5-pro"
//!
//! [budget]
//! max_css_chars = 8000
//!
//! [extraction]
//! breakpoint_tolerance = 32.0
//! ```
//!
//! ```rust
//! use replica_core::Config;
//!
//! let config: Config = toml::from_str("[budget]\nmax_css_sources = 3\n")?;
//! assert_eq!(config.budget.max_css_sources, 3);
//! assert_eq!(config.budget.html_threshold, 20_000);
//! # Ok::<(), toml::de::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "REPLICA_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page fetching settings.
    pub fetch: FetchConfig,
    /// Generative service settings.
    pub generation: GenerationConfig,
    /// Payload budget limits.
    pub budget: BudgetConfig,
    /// Feature extraction heuristics.
    pub extraction: ExtractionConfig,
}

/// Settings for the HTTP page fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent sent with page requests.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("replica/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the generative content service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound on a single generation call. Exceeding it fails the job.
    pub timeout_secs: u64,
    /// Model identifier passed to the service.
    pub model: String,
    /// Base URL of the service.
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token ceiling.
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            model: "gemini-1.5-pro".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            temperature: 0.1,
            max_output_tokens: 100_000,
        }
    }
}

impl GenerationConfig {
    /// Generation bound as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Limits applied by the payload budgeter.
///
/// All character counts are Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Entries kept per asset category.
    pub max_assets_per_category: usize,
    /// HTML longer than this is elided in the middle.
    pub html_threshold: usize,
    /// Leading characters kept from oversized HTML.
    pub html_head_chars: usize,
    /// Trailing characters kept from oversized HTML.
    pub html_tail_chars: usize,
    /// Stylesheet sources kept.
    pub max_css_sources: usize,
    /// Script sources kept.
    pub max_js_sources: usize,
    /// Ceiling on the combined CSS text embedded in the prompt.
    pub max_css_chars: usize,
    /// Hard ceiling on the whole prompt.
    pub max_prompt_chars: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_assets_per_category: 10,
            html_threshold: 20_000,
            html_head_chars: 10_000,
            html_tail_chars: 10_000,
            max_css_sources: 5,
            max_js_sources: 2,
            max_css_chars: 10_000,
            max_prompt_chars: 250_000,
        }
    }
}

/// Area thresholds (px²) separating image size categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeThresholds {
    /// Upper bound for `icon` (32×32).
    pub icon: u64,
    /// Upper bound for `thumbnail` (~200×200).
    pub thumbnail: u64,
    /// Upper bound for `medium` (~500×500).
    pub medium: u64,
    /// Upper bound for `large` (~1000×1000); anything above is `extra_large`.
    pub large: u64,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            icon: 1_024,
            thumbnail: 40_000,
            medium: 250_000,
            large: 1_000_000,
        }
    }
}

/// Tunable constants for the feature extractors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Breakpoints closer than this to the previous cluster member are merged.
    pub breakpoint_tolerance: f64,
    /// Image size category thresholds.
    pub size_thresholds: SizeThresholds,
    /// Images with both explicit dimensions at or below this are icons.
    pub icon_max_dimension: u32,
    /// Text elements sampled by the serif/sans-serif fallback heuristic.
    pub serif_sample_size: usize,
    /// Entries kept in the element frequency table.
    pub top_element_count: usize,
    /// Repeating structures reported.
    pub max_repeating_structures: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            breakpoint_tolerance: 20.0,
            size_thresholds: SizeThresholds::default(),
            icon_max_dimension: 64,
            serif_sample_size: 20,
            top_element_count: 20,
            max_repeating_structures: 5,
        }
    }
}

impl Config {
    /// Load configuration from `REPLICA_CONFIG`, the platform config directory,
    /// or defaults, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(explicit) => Some(PathBuf::from(explicit)),
            None => Self::default_path().ok(),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config: {e}")))
    }

    /// Platform config file location.
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("dev", "replica", "replica")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Apply `REPLICA_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("REPLICA_GENERATION_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.generation.timeout_secs = secs,
                _ => tracing::warn!("Ignoring invalid REPLICA_GENERATION_TIMEOUT_SECS={raw}"),
            }
        }
        if let Some(model) = lookup("REPLICA_MODEL") {
            let model = model.trim();
            if !model.is_empty() {
                self.generation.model = model.to_string();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_values() {
        // Given: Default configuration is requested
        let config = Config::default();

        // Then: Defaults match the documented budget and heuristics
        assert_eq!(config.generation.timeout_secs, 60);
        assert_eq!(config.budget.max_assets_per_category, 10);
        assert_eq!(config.budget.html_threshold, 20_000);
        assert_eq!(config.budget.html_head_chars, 10_000);
        assert_eq!(config.budget.html_tail_chars, 10_000);
        assert_eq!(config.budget.max_css_sources, 5);
        assert_eq!(config.budget.max_js_sources, 2);
        assert_eq!(config.budget.max_css_chars, 10_000);
        assert_eq!(config.extraction.breakpoint_tolerance, 20.0);
        assert_eq!(config.extraction.size_thresholds.large, 1_000_000);
        assert_eq!(config.extraction.icon_max_dimension, 64);
    }

    #[test]
    fn test_partial_toml_uses_defaults() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            [generation]
            timeout_secs = 5

            [extraction.size_thresholds]
            icon = 2048
            "#,
        )?;

        assert_eq!(config.generation.timeout_secs, 5);
        assert_eq!(config.generation.model, "gemini-1.5-pro");
        assert_eq!(config.extraction.size_thresholds.icon, 2048);
        assert_eq!(config.extraction.size_thresholds.thumbnail, 40_000);
        Ok(())
    }

    #[test]
    fn test_config_save_and_load_roundtrip() -> Result<()> {
        // Given: A temporary directory and a modified configuration
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut original = Config::default();
        original.budget.max_prompt_chars = 42_000;
        original.extraction.breakpoint_tolerance = 12.5;

        // When: Saving then loading
        original.save_to(&path)?;
        let loaded = Config::load_from(&path)?;

        // Then: Nothing is lost
        assert_eq!(loaded, original);
        Ok(())
    }

    #[test]
    fn test_config_load_missing_file() {
        let result = Config::load_from(Path::new("/definitely/does/not/exist/config.toml"));
        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("Failed to read config")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_config_parse_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        match Config::load_from(&path) {
            Err(Error::Config(msg)) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("REPLICA_GENERATION_TIMEOUT_SECS", "15"),
            ("REPLICA_MODEL", " gemini-2.0-flash "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.generation.timeout_secs, 15);
        assert_eq!(config.generation.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_env_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| {
            (key == "REPLICA_GENERATION_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.generation.timeout_secs, 60);
    }

    proptest! {
        #[test]
        fn test_budget_roundtrip(
            threshold in 1usize..=1_000_000,
            css in 0usize..=50,
            prompt in 1usize..=10_000_000,
        ) {
            let mut config = Config::default();
            config.budget.html_threshold = threshold;
            config.budget.max_css_sources = css;
            config.budget.max_prompt_chars = prompt;

            let serialized = toml::to_string_pretty(&config).unwrap();
            let parsed: Config = toml::from_str(&serialized).unwrap();
            prop_assert_eq!(parsed.budget, config.budget);
        }
    }
}
