//! Dashboard configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. the built-in `config/default.toml`, embedded at compile time;
//! 2. an optional TOML file, merged key by key over the defaults;
//! 3. environment variables selecting the alert source
//!    ([`FIXTURES_ENV`], [`SUPABASE_URL_ENV`], [`SUPABASE_KEY_ENV`]).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reach_alert::TransformConfig;
use reach_geometry::LngLat;
use reach_map::{HighlightStyle, RetryPolicy};
use reach_source::fixtures::FixtureSource;
use reach_source::supabase::SupabaseSource;
use reach_source::{AlertSource, SourceError};
use serde::{Deserialize, Serialize};

/// Path to a fixture JSON file; selects the fixture source.
pub const FIXTURES_ENV: &str = "REACH_FIXTURES";
/// Supabase project URL; selects the Supabase source.
pub const SUPABASE_URL_ENV: &str = "REACH_SUPABASE_URL";
/// Supabase API key.
pub const SUPABASE_KEY_ENV: &str = "REACH_SUPABASE_KEY";

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML or has wrongly typed keys.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required environment variable is not set.
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    /// The configured alert source could not be created.
    #[error("Alert source error: {0}")]
    Source(#[from] SourceError),
}

/// Full dashboard configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Initial camera and selection zoom.
    #[serde(default)]
    pub map: MapConfig,
    /// View model settings.
    #[serde(default)]
    pub transform: TransformConfig,
    /// Polygon highlight settings.
    #[serde(default)]
    pub highlight: HighlightConfig,
    /// Where alerts come from.
    #[serde(default)]
    pub source: SourceConfig,
}

/// Camera settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial camera center.
    pub center: LngLat,
    /// Initial zoom.
    pub zoom: f64,
    /// Zoom used when flying to a selected alert.
    pub select_zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: LngLat::new(85.324, 27.7172),
            zoom: 7.0,
            select_zoom: 12.0,
        }
    }
}

/// Highlight retry and paint settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Retry policy for failed layer additions.
    pub retry: RetryPolicy,
    /// Layer paint.
    pub style: HighlightStyle,
}

/// Alert source selection, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// JSON fixtures: a file, or the built-in sample set when no path is
    /// given.
    Fixtures {
        /// Fixture file path.
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// A Supabase project.
    Supabase {
        /// Project URL.
        url: String,
        /// API key. Usually supplied through [`SUPABASE_KEY_ENV`] rather
        /// than written to a file.
        #[serde(default)]
        api_key: Option<String>,
        /// Alerts table name.
        #[serde(default = "default_table")]
        table: String,
    },
}

fn default_table() -> String {
    "alerts".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Fixtures { path: None }
    }
}

impl SourceConfig {
    /// Creates the configured alert source.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::MissingEnv`] if Supabase is selected without an
    ///   API key
    /// * [`ConfigError::Source`] if the fixture file cannot be loaded
    pub fn build(&self) -> Result<Arc<dyn AlertSource>, ConfigError> {
        match self {
            Self::Fixtures { path: None } => Ok(Arc::new(FixtureSource::sample()?)),
            Self::Fixtures { path: Some(path) } => Ok(Arc::new(FixtureSource::from_path(path)?)),
            Self::Supabase {
                url,
                api_key,
                table,
            } => {
                let api_key = api_key
                    .as_deref()
                    .ok_or(ConfigError::MissingEnv(SUPABASE_KEY_ENV))?;
                Ok(Arc::new(
                    SupabaseSource::new(url.as_str(), api_key).with_table(table.as_str()),
                ))
            }
        }
    }
}

impl DashboardConfig {
    /// Loads the defaults, the optional file at `path`, and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Io`] if the file cannot be read
    /// * [`ConfigError::Toml`] if it does not parse
    /// * [`ConfigError::MissingEnv`] if the environment selects Supabase
    ///   without a key
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let overrides = path.map(std::fs::read_to_string).transpose()?;
        if let Some(path) = path {
            log::debug!("Loaded config overrides from {}", path.display());
        }

        let mut config = Self::parse(overrides.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parses the built-in defaults with `overrides` merged on top.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if either document is invalid.
    pub fn parse(overrides: Option<&str>) -> Result<Self, ConfigError> {
        let mut table: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        if let Some(text) = overrides {
            merge_tables(&mut table, toml::from_str(text)?);
        }
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Applies source-selecting environment variables read through
    /// `lookup`. A fixture path takes precedence over a Supabase URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if a Supabase URL is given
    /// without a key from either the environment or the config.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let env_key = non_empty(SUPABASE_KEY_ENV);

        if let Some(path) = non_empty(FIXTURES_ENV) {
            log::info!("Using fixture alerts from {path} ({FIXTURES_ENV})");
            self.source = SourceConfig::Fixtures {
                path: Some(PathBuf::from(path)),
            };
        } else if let Some(url) = non_empty(SUPABASE_URL_ENV) {
            let (api_key, table) = match &self.source {
                SourceConfig::Supabase { api_key, table, .. } => (api_key.clone(), table.clone()),
                SourceConfig::Fixtures { .. } => (None, default_table()),
            };
            let api_key = env_key
                .or(api_key)
                .ok_or(ConfigError::MissingEnv(SUPABASE_KEY_ENV))?;

            log::info!("Using Supabase alerts from {url} ({SUPABASE_URL_ENV})");
            self.source = SourceConfig::Supabase {
                url,
                api_key: Some(api_key),
                table,
            };
        } else if let (Some(key), SourceConfig::Supabase { api_key, .. }) =
            (env_key, &mut self.source)
        {
            *api_key = Some(key);
        }

        Ok(())
    }
}

/// Recursively merges `overlay` into `base`; nested tables merge, any
/// other value replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}
