use crate::domain::{config::BridgeConfig, error::{BridgeError, BridgeResult}};
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

const CONFIG_DIR: &str = ".combridge";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
///
/// Layers the global file under the project file; keys set in the project
/// file win, everything else falls back to the global file and then to the
/// built-in defaults.
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> Self {
        Self {
            global_config_path: Self::get_global_config_path(),
            project_config_path: Self::find_project_config_path(),
        }
    }

    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_config_path: global,
            project_config_path: project,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> BridgeResult<BridgeConfig> {
        let mut merged = Table::new();

        for path in [&self.global_config_path, &self.project_config_path]
            .into_iter()
            .flatten()
        {
            if path.exists() {
                merge_tables(&mut merged, Self::read_table(path)?);
            }
        }

        Value::Table(merged)
            .try_into()
            .map_err(|e| BridgeError::Config {
                message: format!("Failed to apply configuration: {}", e),
            })
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> BridgeResult<BridgeConfig> {
        let content = fs::read_to_string(path).map_err(|e| BridgeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| BridgeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &BridgeConfig) -> BridgeResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| BridgeError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| BridgeError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration under `dir`, returning its path
    pub fn init_project_config(&self, dir: &Path) -> BridgeResult<PathBuf> {
        let config_dir = dir.join(CONFIG_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(BridgeError::Config {
                message: format!(
                    "Project configuration already exists at {}",
                    config_file.display()
                ),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| BridgeError::Config {
            message: format!("Failed to create {} directory: {}", CONFIG_DIR, e),
        })?;

        self.save_config_to_path(&config_file, &BridgeConfig::default())?;
        Ok(config_file)
    }

    fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("combridge").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    fn read_table(path: &Path) -> BridgeResult<Table> {
        let content = fs::read_to_string(path).map_err(|e| BridgeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        content.parse::<Table>().map_err(|e| BridgeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `overlay` into `base`; nested tables merge key by key.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            Value::Table(incoming) => match base.get_mut(&key) {
                Some(Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ParityConfig;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let manager = ConfigManager::with_paths(None, None);
        let config = manager.load_config().unwrap();

        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.serial.baud_rate, 921_600);
    }

    #[test]
    fn test_project_overrides_global_key_by_key() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");

        fs::write(
            &global,
            "[serial]\nbaud_rate = 115200\nparity = \"odd\"\n\n[global]\necho = false\n",
        )
        .unwrap();
        fs::write(&project, "[serial]\nbaud_rate = 57600\n\n[first]\nname = \"host\"\nport = \"/dev/ttyS0\"\n").unwrap();

        let manager = ConfigManager::with_paths(Some(global), Some(project));
        let config = manager.load_config().unwrap();

        assert_eq!(config.serial.baud_rate, 57_600);
        assert_eq!(config.serial.parity, ParityConfig::Odd);
        assert!(!config.global.echo);
        assert_eq!(config.first.name, "host");
        assert_eq!(config.second.name, "stm32");
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(
            Some(temp_dir.path().join("nope.toml")),
            Some(temp_dir.path().join("also-nope.toml")),
        );
        assert_eq!(manager.load_config().unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "[serial\nbaud_rate = ").unwrap();

        let manager = ConfigManager::with_paths(Some(path.clone()), None);
        assert!(matches!(manager.load_config(), Err(BridgeError::Config { .. })));
        assert!(manager.load_config_from_path(&path).is_err());
    }

    #[test]
    fn test_init_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_paths(None, None);

        let config_file = manager.init_project_config(temp_dir.path()).unwrap();
        assert_eq!(config_file, temp_dir.path().join(".combridge").join("config.toml"));

        let config = manager.load_config_from_path(&config_file).unwrap();
        assert_eq!(config, BridgeConfig::default());

        assert!(manager.init_project_config(temp_dir.path()).is_err());
    }
}
