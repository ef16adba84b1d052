//! Store configuration for user-configurable cache capacity, data location,
//! and write-behind behavior.
//!
//! Configuration can be loaded from a file, environment variables, or created
//! programmatically.

use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the page store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Maximum number of serialized pages kept in the in-memory cache.
    /// Zero disables the cache.
    pub cache_pages: usize,
    /// Directory for the on-disk backing store.
    pub data_dir: PathBuf,
    /// Defer backing-store writes to the background flusher.
    pub write_behind: bool,
    /// Pending-write queue capacity when write-behind is enabled.
    pub write_queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_pages: 40,
            data_dir: Self::default_data_dir(),
            write_behind: false,
            write_queue_capacity: 100,
        }
    }
}

impl StoreConfig {
    /// Sets the cache capacity in pages.
    pub fn with_cache_pages(mut self, pages: usize) -> Self {
        self.cache_pages = pages;
        self
    }

    /// Sets the backing-store directory.
    pub fn with_data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Enables or disables write-behind storage.
    pub fn with_write_behind(mut self, enabled: bool) -> Self {
        self.write_behind = enabled;
        self
    }

    /// Sets the pending-write queue capacity.
    pub fn with_write_queue_capacity(mut self, capacity: usize) -> Self {
        self.write_queue_capacity = capacity;
        self
    }

    /// Returns the default data directory for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/pagevault/pages
    /// - Linux: ~/.local/share/pagevault/pages
    /// - Windows: %LOCALAPPDATA%\pagevault\pages
    pub fn default_data_dir() -> PathBuf {
        if let Some(data_dir) = dirs::data_local_dir() {
            data_dir.join("pagevault").join("pages")
        } else {
            // Fallback to a relative directory if no platform dir is known
            PathBuf::from("pagevault/pages")
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PAGEVAULT_CACHE_PAGES`: cache capacity in pages (default: 40)
    /// - `PAGEVAULT_DATA_DIR`: backing-store directory path
    /// - `PAGEVAULT_WRITE_BEHIND`: `true`/`false` (default: false)
    /// - `PAGEVAULT_WRITE_QUEUE`: pending-write queue capacity (default: 100)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PAGEVAULT_CACHE_PAGES") {
            config.cache_pages = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("PAGEVAULT_CACHE_PAGES".to_string()))?;
        }

        if let Ok(val) = std::env::var("PAGEVAULT_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("PAGEVAULT_WRITE_BEHIND") {
            config.write_behind = parse_bool(&val)
                .ok_or_else(|| ConfigError::InvalidValue("PAGEVAULT_WRITE_BEHIND".to_string()))?;
        }

        if let Ok(val) = std::env::var("PAGEVAULT_WRITE_QUEUE") {
            config.write_queue_capacity = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("PAGEVAULT_WRITE_QUEUE".to_string()))?;
        }

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format:
    /// ```toml
    /// cache_pages = 40
    /// data_dir = "/var/lib/pagevault/pages"
    /// write_behind = false
    /// write_queue = 100
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in toml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "cache_pages" => {
                        config.cache_pages = value
                            .parse::<usize>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                    }
                    "data_dir" => {
                        config.data_dir = PathBuf::from(value);
                    }
                    "write_behind" => {
                        config.write_behind = parse_bool(value)
                            .ok_or_else(|| ConfigError::InvalidValue(key.to_string()))?;
                    }
                    "write_queue" => {
                        config.write_queue_capacity = value
                            .parse::<usize>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                    }
                    _ => {} // Ignore unknown keys
                }
            }
        }

        Ok(config)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml())?;
        Ok(())
    }

    /// Converts configuration to TOML format.
    fn to_toml(&self) -> String {
        format!(
            "# Pagevault Store Configuration\n\
             cache_pages = {}\n\
             data_dir = \"{}\"\n\
             write_behind = {}\n\
             write_queue = {}\n",
            self.cache_pages,
            self.data_dir.display(),
            self.write_behind,
            self.write_queue_capacity
        )
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    /// I/O error reading or writing the configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.cache_pages, 40);
        assert!(!config.write_behind);
        assert_eq!(config.write_queue_capacity, 100);
    }

    #[test]
    fn test_builder_methods() {
        let config = StoreConfig::default()
            .with_cache_pages(16)
            .with_data_dir("/custom/path")
            .with_write_behind(true)
            .with_write_queue_capacity(50);

        assert_eq!(config.cache_pages, 16);
        assert_eq!(config.data_dir, PathBuf::from("/custom/path"));
        assert!(config.write_behind);
        assert_eq!(config.write_queue_capacity, 50);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&[
            "PAGEVAULT_CACHE_PAGES",
            "PAGEVAULT_DATA_DIR",
            "PAGEVAULT_WRITE_BEHIND",
            "PAGEVAULT_WRITE_QUEUE",
        ]);

        env::set_var("PAGEVAULT_CACHE_PAGES", "8");
        env::set_var("PAGEVAULT_DATA_DIR", "/tmp/pagevault-test");
        env::set_var("PAGEVAULT_WRITE_BEHIND", "true");
        env::set_var("PAGEVAULT_WRITE_QUEUE", "25");

        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.cache_pages, 8);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pagevault-test"));
        assert!(config.write_behind);
        assert_eq!(config.write_queue_capacity, 25);
    }

    #[test]
    #[serial]
    fn test_from_env_partial() {
        let _guard = EnvGuard::new(&[
            "PAGEVAULT_CACHE_PAGES",
            "PAGEVAULT_DATA_DIR",
            "PAGEVAULT_WRITE_BEHIND",
            "PAGEVAULT_WRITE_QUEUE",
        ]);

        env::remove_var("PAGEVAULT_DATA_DIR");
        env::remove_var("PAGEVAULT_WRITE_BEHIND");
        env::remove_var("PAGEVAULT_WRITE_QUEUE");
        env::set_var("PAGEVAULT_CACHE_PAGES", "8");

        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.cache_pages, 8);
        assert!(!config.write_behind); // default
        assert_eq!(config.write_queue_capacity, 100); // default
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(&["PAGEVAULT_CACHE_PAGES"]);

        env::set_var("PAGEVAULT_CACHE_PAGES", "not_a_number");
        assert!(StoreConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_bool() {
        let _guard = EnvGuard::new(&["PAGEVAULT_WRITE_BEHIND"]);

        env::set_var("PAGEVAULT_WRITE_BEHIND", "maybe");
        assert!(StoreConfig::from_env().is_err());
    }

    // Helper to save and restore environment variables
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = StoreConfig::default()
            .with_cache_pages(12)
            .with_data_dir("/tmp/pages")
            .with_write_behind(true)
            .with_write_queue_capacity(64);

        let parsed = StoreConfig::from_toml(&config.to_toml()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            # Test configuration
            cache_pages = 12
            data_dir = "/tmp/pages"
            write_behind = true
            write_queue = 64
        "#;

        let config = StoreConfig::from_toml(toml).unwrap();
        assert_eq!(config.cache_pages, 12);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pages"));
        assert!(config.write_behind);
        assert_eq!(config.write_queue_capacity, 64);
    }

    #[test]
    fn test_from_toml_partial_and_unknown_keys() {
        let toml = r#"
            cache_pages = 12
            something_else = "ignored"
        "#;

        let config = StoreConfig::from_toml(toml).unwrap();
        assert_eq!(config.cache_pages, 12);
        assert!(!config.write_behind); // default
    }

    #[test]
    fn test_from_toml_invalid_value() {
        assert!(StoreConfig::from_toml("cache_pages = lots").is_err());
    }

    #[test]
    fn test_file_save_and_load() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let config_path = temp.path().join("pagevault.toml");

        let config = StoreConfig::default()
            .with_cache_pages(6)
            .with_data_dir("/tmp/pages");
        config.save_to_file(&config_path).unwrap();

        let loaded = StoreConfig::from_file(&config_path).unwrap();
        assert_eq!(config, loaded);
    }
}
