use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures loading the config file. A missing file is not an error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    /// A field parsed but holds a value the engine cannot run with, such as
    /// a zero chunk size. `field` is the dotted TOML key.
    #[error("Invalid value for {field} in {config_path}: {reason}")]
    InvalidValue {
        config_path: PathBuf,
        field: &'static str,
        reason: String,
    },
}

/// Timing and size limits of the mutation coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub quiet_period_ms: u64,
    pub max_parked_nodes: usize,
    pub chunk_size: usize,
    pub max_scan_elements: usize,
    pub watch_character_data: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 500,
            max_parked_nodes: 150,
            chunk_size: 40,
            max_scan_elements: 2000,
            watch_character_data: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconsConfig {
    pub image_url: String,
    pub print_stylesheet_href: String,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            image_url: "img/clicktodial.png".to_string(),
            print_stylesheet_href: "css/print.css".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Built-in number grammars to enable, in priority order.
    pub locales: Vec<String>,
    pub observer: ObserverConfig,
    pub icons: IconsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locales: vec!["nl".to_string()],
            observer: ObserverConfig::default(),
            icons: IconsConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.validate(config_path)?;

        // Expand shell variables and tilde in asset locations
        config.icons.image_url = Self::expand(&config.icons.image_url);
        config.icons.print_stylesheet_href = Self::expand(&config.icons.print_stylesheet_href);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/click-to-dial");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn validate(&self, config_path: &Path) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| ConfigError::InvalidValue {
            config_path: config_path.to_path_buf(),
            field,
            reason: reason.to_string(),
        };
        if self.observer.chunk_size == 0 {
            return Err(invalid("observer.chunk_size", "must be at least 1"));
        }
        if self.observer.max_parked_nodes == 0 {
            return Err(invalid("observer.max_parked_nodes", "must be at least 1"));
        }
        Ok(())
    }

    fn expand(value: &str) -> String {
        match shellexpand::full(value) {
            Ok(expanded) => expanded.into_owned(),
            Err(_) => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/click-to-dial/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
locales = ["nl", "de"]

[observer]
quiet_period_ms = 250
watch_character_data = true
"#,
        )
        .unwrap();

        assert_eq!(config.locales, vec!["nl", "de"]);
        assert_eq!(config.observer.quiet_period_ms, 250);
        assert!(config.observer.watch_character_data);
        assert_eq!(config.observer.chunk_size, 40);
        assert_eq!(config.icons, IconsConfig::default());
    }

    #[test]
    fn test_expand_with_env_var() {
        unsafe {
            env::set_var("CTD_ASSETS", "/srv/assets");
        }

        assert_eq!(Config::expand("$CTD_ASSETS/icon.png"), "/srv/assets/icon.png");

        unsafe {
            env::remove_var("CTD_ASSETS");
        }
    }

    #[test]
    fn test_expand_leaves_urls_alone() {
        assert_eq!(
            Config::expand("https://example.com/icon.png"),
            "https://example.com/icon.png"
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::default();
        test_config.observer.max_parked_nodes = 75;
        test_config.icons.image_url = "/opt/ctd/icon.png".to_string();

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_load_expands_tilde_in_icon_url() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[icons]\nimage_url = \"~/icons/dial.png\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert!(!config.icons.image_url.starts_with('~'));
        assert!(config.icons.image_url.ends_with("icons/dial.png"));
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[observer\nchunk_size = 4").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[observer]\nchunk_size = 0\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "observer.chunk_size",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_value_names_the_field() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[observer]\nmax_parked_nodes = 0\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert_eq!(
            err.to_string(),
            format!(
                "Invalid value for observer.max_parked_nodes in {}: must be at least 1",
                config_file.display()
            )
        );
    }
}
