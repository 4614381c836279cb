//! Bake configuration with defaults matching the reference tables and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE: &str = "bake.ron";

const APP_NAME: &str = "aether";

/// Platform config directory for the baker, e.g. `~/.config/aether` on Linux.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Top-level bake configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Scattering orders and threading.
    pub bake: BakeConfig,
    /// Extents of the baked tables.
    pub layout: LayoutConfig,
    /// Files written after the bake.
    pub output: OutputConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Scattering orders and threading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BakeConfig {
    /// Highest scattering order to compute (1 = single scattering only).
    pub max_scattering_order: u32,
    /// Worker threads; 0 picks a count from the number of CPU cores.
    pub worker_threads: usize,
    /// Run stages on worker threads instead of the main thread.
    pub parallel: bool,
}

/// Extents of the baked tables.
///
/// The packed scattering texture is `(nu * mu_s) x mu x r` texels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub transmittance_width: u32,
    pub transmittance_height: u32,
    pub scattering_r_size: u32,
    /// Must be even: half the rows hold rays hitting the ground.
    pub scattering_mu_size: u32,
    pub scattering_mu_s_size: u32,
    pub scattering_nu_size: u32,
    pub irradiance_width: u32,
    pub irradiance_height: u32,
}

/// Files written after the bake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, relative to the working directory.
    pub directory: PathBuf,
    /// Raw little-endian `f32` tables.
    pub write_raw_textures: bool,
    /// Radiance `.hdr` previews of every table.
    pub write_debug_hdr: bool,
    /// RON metadata describing the tables.
    pub write_metadata: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            max_scattering_order: 4,
            worker_threads: 0,
            parallel: true,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            transmittance_width: 256,
            transmittance_height: 64,
            scattering_r_size: 32,
            scattering_mu_size: 128,
            scattering_mu_s_size: 32,
            scattering_nu_size: 8,
            irradiance_width: 64,
            irradiance_height: 16,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("sky"),
            write_raw_textures: true,
            write_debug_hdr: false,
            write_metadata: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl LayoutConfig {
    /// `([width, height], [r, mu, mu_s, nu], [width, height])` of the
    /// transmittance, scattering and irradiance tables.
    pub fn extents(&self) -> ([u32; 2], [u32; 4], [u32; 2]) {
        (
            [self.transmittance_width, self.transmittance_height],
            [
                self.scattering_r_size,
                self.scattering_mu_size,
                self.scattering_mu_s_size,
                self.scattering_nu_size,
            ],
            [self.irradiance_width, self.irradiance_height],
        )
    }
}

// --- Validation ---

impl Config {
    /// Check the settings the baker cannot clamp on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bake.max_scattering_order == 0 {
            return Err(ConfigError::Invalid {
                field: "bake.max_scattering_order",
                reason: "must be at least 1".to_string(),
            });
        }
        let layout = &self.layout;
        let extents = [
            ("layout.transmittance_width", layout.transmittance_width),
            ("layout.transmittance_height", layout.transmittance_height),
            ("layout.scattering_r_size", layout.scattering_r_size),
            ("layout.scattering_mu_size", layout.scattering_mu_size),
            ("layout.scattering_mu_s_size", layout.scattering_mu_s_size),
            ("layout.scattering_nu_size", layout.scattering_nu_size),
            ("layout.irradiance_width", layout.irradiance_width),
            ("layout.irradiance_height", layout.irradiance_height),
        ];
        for (field, value) in extents {
            if value < 2 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be at least 2, got {value}"),
                });
            }
        }
        if layout.scattering_mu_size % 2 != 0 {
            return Err(ConfigError::Invalid {
                field: "layout.scattering_mu_size",
                reason: format!("must be even, got {}", layout.scattering_mu_size),
            });
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded bake config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default bake config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `bake.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Re-read the file: returns `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;
        if &new_config != self {
            log::info!("Bake config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(ConfigError::ParseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("max_scattering_order: 4"));
        assert!(ron_str.contains("scattering_mu_size: 128"));
    }

    #[test]
    fn test_default_layout_extents() {
        let (transmittance, scattering, irradiance) = LayoutConfig::default().extents();
        assert_eq!(transmittance, [256, 64]);
        assert_eq!(scattering, [32, 128, 32, 8]);
        assert_eq!(irradiance, [64, 16]);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(bake: (max_scattering_order: 2), output: (write_debug_hdr: true))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.bake.max_scattering_order, 2);
        assert!(config.bake.parallel);
        assert!(config.output.write_debug_hdr);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.bake.worker_threads = 6;
        config.layout.scattering_nu_size = 4;
        config.output.directory = PathBuf::from("out/sky");

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.bake.max_scattering_order = 6;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.bake.max_scattering_order), Some(6));
        assert!(modified.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.bake.max_scattering_order = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "bake.max_scattering_order", .. })
        ));

        let mut config = Config::default();
        config.layout.scattering_mu_size = 63;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "layout.scattering_mu_size", .. })
        ));

        let mut config = Config::default();
        config.layout.irradiance_height = 1;
        assert!(config.validate().is_err());
    }
}
