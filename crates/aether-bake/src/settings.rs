//! Translation from the persisted bake config to the baker's runtime types.

use std::path::{Path, PathBuf};

use aether_atmosphere::{BakeExecutor, ExportOptions, TextureLayout};
use aether_config::{BakeConfig, CONFIG_FILE, Config, ConfigError, LayoutConfig, OutputConfig};
use tracing::{info, warn};

/// Where the bake config came from, reported once logging is up.
#[derive(Debug)]
pub enum ConfigOrigin {
    Loaded(PathBuf),
    Created(PathBuf),
    /// The file could not be used; built-in defaults apply.
    Defaults(ConfigError),
}

impl ConfigOrigin {
    pub fn report(&self) {
        match self {
            ConfigOrigin::Loaded(path) => info!(path = %path.display(), "loaded bake config"),
            ConfigOrigin::Created(path) => {
                info!(path = %path.display(), "created default bake config")
            }
            ConfigOrigin::Defaults(error) => {
                warn!(error = %error, "failed to load bake config, using defaults")
            }
        }
    }
}

/// Load `bake.ron` from `config_dir`, creating it if missing, or fall back to defaults.
pub fn load_config(config_dir: &Path) -> (Config, ConfigOrigin) {
    let path = config_dir.join(CONFIG_FILE);
    let existed = path.exists();
    match Config::load_or_create(config_dir) {
        Ok(config) if existed => (config, ConfigOrigin::Loaded(path)),
        Ok(config) => (config, ConfigOrigin::Created(path)),
        Err(error) => (Config::default(), ConfigOrigin::Defaults(error)),
    }
}

pub fn texture_layout(config: &LayoutConfig) -> TextureLayout {
    let (transmittance, scattering, irradiance) = config.extents();
    TextureLayout::new(transmittance, scattering, irradiance)
}

pub fn executor(config: &BakeConfig) -> BakeExecutor {
    match (config.parallel, config.worker_threads) {
        (false, _) => BakeExecutor::serial(),
        (true, 0) => BakeExecutor::with_defaults(),
        (true, threads) => BakeExecutor::new(threads),
    }
}

pub fn export_options(config: &OutputConfig) -> ExportOptions {
    ExportOptions {
        raw_textures: config.write_raw_textures,
        debug_hdr: config.write_debug_hdr,
        metadata: config.write_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_matches_library_default() {
        let layout = texture_layout(&Config::default().layout);
        assert_eq!(layout, TextureLayout::default());
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_executor_selection() {
        let mut bake = BakeConfig::default();
        assert!(executor(&bake).is_parallel());

        bake.worker_threads = 3;
        assert_eq!(executor(&bake).thread_count(), 3);

        bake.parallel = false;
        assert!(!executor(&bake).is_parallel());
    }

    #[test]
    fn test_export_options_follow_output_config() {
        let output = OutputConfig {
            write_raw_textures: false,
            write_debug_hdr: true,
            ..OutputConfig::default()
        };
        let options = export_options(&output);
        assert!(!options.raw_textures);
        assert!(options.debug_hdr);
        assert!(options.metadata);
    }

    #[test]
    fn test_load_config_reports_origin() {
        let dir = tempfile::tempdir().unwrap();
        let (config, origin) = load_config(dir.path());
        assert_eq!(config, Config::default());
        assert!(matches!(origin, ConfigOrigin::Created(ref p) if p.ends_with(CONFIG_FILE)));

        let (_, origin) = load_config(dir.path());
        assert!(matches!(origin, ConfigOrigin::Loaded(_)));

        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        let (config, origin) = load_config(dir.path());
        assert_eq!(config, Config::default());
        assert!(matches!(origin, ConfigOrigin::Defaults(ConfigError::ParseError(_))));
    }
}
