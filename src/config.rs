use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding project config, the default store and the journal
pub const APP_DIR: &str = ".tutorbook";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Where records live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    Path::new(APP_DIR).join("store.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Demo accounts written on first run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeedConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Sessions never expire when unset
    #[serde(default)]
    pub ttl_minutes: Option<u64>,
}

impl SessionConfig {
    pub fn ttl(&self) -> Option<chrono::Duration> {
        self.ttl_minutes
            .and_then(|m| i64::try_from(m).ok())
            .map(chrono::Duration::minutes)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingsConfig {
    /// Let a teacher hold several bookings for the same date and time
    #[serde(default = "default_true")]
    pub allow_double_booking: bool,
}

impl Default for BookingsConfig {
    fn default() -> Self {
        Self {
            allow_double_booking: default_true(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_journal_dir")]
    pub dir: PathBuf,
}

fn default_journal_dir() -> PathBuf {
    Path::new(APP_DIR).join("journal")
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            dir: default_journal_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub bookings: BookingsConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.tutorbook/config.local.toml) > project (.tutorbook/config.toml)
    /// > user (~/.tutorbook/config.toml) > built-in defaults
    pub fn load(root: &Path) -> Result<Self> {
        let mut layers = Vec::new();

        if let Some(home) = dirs::home_dir() {
            layers.push(home.join(APP_DIR).join("config.toml"));
        }
        layers.push(root.join(APP_DIR).join("config.toml"));
        layers.push(root.join(APP_DIR).join("config.local.toml"));

        let mut merged = toml::Table::new();
        for path in layers.iter().filter(|p| p.exists()) {
            let content = std::fs::read_to_string(path)?;
            let layer: toml::Table = toml::from_str(&content)?;
            merge_tables(&mut merged, layer);
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.store.backend == StoreBackend::File && self.store.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "store.path".to_string(),
                message: "Path required for file backend".to_string(),
            });
        }

        if self.session.ttl_minutes == Some(0) {
            errors.push(ValidationError {
                field: "session.ttl_minutes".to_string(),
                message: "Must be greater than 0 (omit it to disable expiry)".to_string(),
            });
        }

        if self.journal.enabled && self.journal.dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "journal.dir".to_string(),
                message: "Directory required when the journal is enabled".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Merge `overlay` into `base`; nested tables merge key by key and
/// everything else in `overlay` replaces what `base` had
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.path, Path::new(".tutorbook/store.json"));
        assert!(config.seed.enabled);
        assert!(config.bookings.allow_double_booking);
        assert!(config.session.ttl().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[bookings]\nallow_double_booking = false\n[session]\nttl_minutes = 45\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.bookings.allow_double_booking);
        assert_eq!(config.session.ttl(), Some(chrono::Duration::minutes(45)));
        assert!(config.journal.enabled);
    }

    #[test]
    fn test_local_layer_overrides_project_layer() {
        let dir = TempDir::new().unwrap();
        let app_dir = dir.path().join(APP_DIR);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(
            app_dir.join("config.toml"),
            "[store]\nbackend = \"file\"\npath = \"shared.json\"\n[seed]\nenabled = false\n",
        )
        .unwrap();
        std::fs::write(
            app_dir.join("config.local.toml"),
            "[store]\npath = \"mine.json\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.store.path, Path::new("mine.json"));
        assert_eq!(config.store.backend, StoreBackend::File);
        assert!(!config.seed.enabled);
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.session.ttl_minutes = Some(0);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("ttl_minutes"));
    }

    #[test]
    fn test_validate_empty_paths() {
        let mut config = Config::default();
        config.store.path = PathBuf::new();
        config.journal.dir = PathBuf::new();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);

        config.store.backend = StoreBackend::Memory;
        config.journal.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_tables_keeps_sibling_keys() {
        let mut base: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Table = toml::from_str("[a]\ny = 3\n").unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
    }
}
