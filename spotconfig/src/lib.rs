//! # SpotSocket Configuration Module
//!
//! This module provides configuration management for SpotSocket, including:
//! - Loading configuration from an optional YAML file
//! - Merging with the embedded default configuration
//! - Environment variable overrides
//! - Typed getters for the values the relay needs
//!
//! ## Usage
//!
//! ```no_run
//! use spotconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let port = config.get_http_port();
//! let interval = config.get_poll_interval()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! The configuration file is only read; setters change the in-memory tree.

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::info;

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("spotsocket.yaml");

const ENV_CONFIG_DIR: &str = "SPOTSOCKET_CONFIG";
const ENV_PREFIX: &str = "SPOTSOCKET_CONFIG__";
const ENV_PORT: &str = "PORT";
const CONFIG_DIR_NAME: &str = ".spotsocket";
const CONFIG_FILE_NAME: &str = "config.yaml";

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration manager for SpotSocket
///
/// Values are addressed by key paths such as `&["host", "http_port"]`.
/// All keys are stored lower-cased, so lookups are case-insensitive.
#[derive(Debug)]
pub struct Config {
    path: Option<PathBuf>,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.lock().clone();
        Self {
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> Option<PathBuf> {
        // 1. Try provided directory
        if !directory.is_empty() {
            return Some(PathBuf::from(directory));
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return Some(PathBuf::from(env_path));
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).is_dir() {
            return Some(PathBuf::from(CONFIG_DIR_NAME));
        }

        // 4. Try home directory
        home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .filter(|p| p.is_dir())
    }

    /// Loads the configuration
    ///
    /// This method:
    /// 1. Loads the default embedded configuration
    /// 2. Merges it with `config.yaml` from the config directory, if present
    /// 3. Applies `SPOTSOCKET_CONFIG__*` environment variable overrides
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `SPOTSOCKET_CONFIG` environment variable
    /// 3. `.spotsocket` in the current directory
    /// 4. `.spotsocket` in the user's home directory
    ///
    /// A missing directory or file is not an error; defaults apply.
    pub fn load_config(directory: &str) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let path = Self::find_config_dir(directory).map(|dir| dir.join(CONFIG_FILE_NAME));
        match &path {
            Some(file) if file.is_file() => {
                let data = fs::read(file)?;
                let external: Value = serde_yaml::from_slice(&data)
                    .map_err(|e| anyhow!("Invalid config file {}: {}", file.display(), e))?;
                merge_yaml(&mut value, &external);
                info!(config_file = %file.display(), "Loaded config file");
            }
            Some(file) => {
                info!(config_file = %file.display(), "Config file not found, using embedded defaults");
            }
            None => info!("No config directory found, using embedded defaults"),
        }

        let mut value = Self::lower_keys_value(value);
        Self::apply_env_overrides(&mut value, env::vars());

        Ok(Self {
            path,
            data: Mutex::new(value),
        })
    }

    /// Builds a configuration from a YAML document merged over the defaults
    ///
    /// No file or environment lookup takes place.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if !yaml.trim().is_empty() {
            let external: Value = serde_yaml::from_str(yaml)?;
            merge_yaml(&mut value, &external);
        }
        Ok(Self {
            path: None,
            data: Mutex::new(Self::lower_keys_value(value)),
        })
    }

    /// Path of the config file that was looked up, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a configuration value at the specified path (in memory only)
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.lock();
        Self::set_value_internal(&mut data, path, value)
    }

    fn set_value_internal<S: AsRef<str>>(data: &mut Value, path: &[S], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].as_ref().to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                if !entry.is_mapping() {
                    *entry = Value::Mapping(Mapping::new());
                }
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    /// Returns a string value, or `None` when absent, null or blank
    pub fn get_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s),
            Ok(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn apply_env_overrides<I>(config: &mut Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path: Vec<&str> = stripped.split("__").collect();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path[..], yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        match serde_yaml::from_str::<Value>(value) {
            Ok(parsed) if !parsed.is_mapping() && !parsed.is_sequence() => parsed,
            _ => Value::String(value.to_string()),
        }
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let new_key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(new_key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Gets the HTTP port the relay listens on
    ///
    /// The `PORT` environment variable wins over the configuration tree.
    pub fn get_http_port(&self) -> u16 {
        if let Some(port) = env::var(ENV_PORT).ok().and_then(|p| p.trim().parse().ok()) {
            return port;
        }
        self.get_configured_http_port()
    }

    fn get_configured_http_port(&self) -> u16 {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_HTTP_PORT),
            _ => DEFAULT_HTTP_PORT,
        }
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    /// Interval between two upstream polls
    pub fn get_poll_interval(&self) -> Result<Duration> {
        let secs = match self.get_value(&["relay", "poll_interval_secs"]) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            _ => DEFAULT_POLL_INTERVAL_SECS,
        };
        if secs == 0 {
            return Err(anyhow!("relay.poll_interval_secs must be greater than zero"));
        }
        Ok(Duration::from_secs(secs))
    }

    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        self.set_value(
            &["relay", "poll_interval_secs"],
            Value::Number(Number::from(interval.as_secs())),
        )
    }

    impl_usize_config!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Minimum log level (`ERROR`, `WARN`, `INFO`, `DEBUG` or `TRACE`)
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.get_configured_http_port(), 8080);
        assert_eq!(config.get_poll_interval().unwrap(), Duration::from_secs(10));
        assert_eq!(config.get_log_cache_size().unwrap(), 1000);
        assert!(config.get_log_enable_console().unwrap());
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = Config::from_yaml(
            "host:\n  HTTP_PORT: 9000\nrelay:\n  poll_interval_secs: 3\n",
        )
        .unwrap();
        assert_eq!(config.get_configured_http_port(), 9000);
        assert_eq!(config.get_poll_interval().unwrap(), Duration::from_secs(3));
        // untouched siblings survive the merge
        assert_eq!(config.get_log_cache_size().unwrap(), 1000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = Config::from_yaml("relay:\n  poll_interval_secs: 0\n").unwrap();
        assert!(config.get_poll_interval().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut value = Config::lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG).unwrap());
        let vars = vec![
            ("SPOTSOCKET_CONFIG__HOST__HTTP_PORT".to_string(), "7000".to_string()),
            (
                "SPOTSOCKET_CONFIG__ACCOUNTS__SPOTIFY__CLIENT_ID".to_string(),
                "abc".to_string(),
            ),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        Config::apply_env_overrides(&mut value, vars);
        let config = Config {
            path: None,
            data: Mutex::new(value),
        };
        assert_eq!(config.get_configured_http_port(), 7000);
        assert_eq!(
            config.get_string(&["accounts", "spotify", "client_id"]),
            Some("abc".to_string())
        );
        assert!(config.get_value(&["unrelated"]).is_err());
    }

    #[test]
    fn test_get_string_ignores_blank() {
        let config = Config::from_yaml("accounts:\n  spotify:\n    client_id: '  '\n").unwrap();
        assert_eq!(config.get_string(&["accounts", "spotify", "client_id"]), None);
        assert_eq!(config.get_string(&["accounts", "missing"]), None);
    }

    #[test]
    fn test_set_and_get_value() {
        let config = Config::from_yaml("").unwrap();
        config
            .set_value(&["a", "b", "c"], Value::String("d".into()))
            .unwrap();
        assert_eq!(
            config.get_value(&["A", "B", "C"]).unwrap(),
            Value::String("d".into())
        );
    }

    #[test]
    fn test_load_config_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "relay:\n  poll_interval_secs: 42\n",
        )
        .unwrap();

        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.get_poll_interval().unwrap(), Duration::from_secs(42));
        assert_eq!(config.path(), Some(dir.path().join(CONFIG_FILE_NAME).as_path()));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    }

    #[test]
    fn test_merge_yaml_replaces_scalars() {
        let mut base: Value = serde_yaml::from_str("a: 1\nb:\n  c: 2\n").unwrap();
        let ext: Value = serde_yaml::from_str("b:\n  c: 3\n  d: 4\n").unwrap();
        merge_yaml(&mut base, &ext);
        let expected: Value = serde_yaml::from_str("a: 1\nb:\n  c: 3\n  d: 4\n").unwrap();
        assert_eq!(base, expected);
    }
}
