//! Exporter configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`GX3D_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

use gx3d_core::{BakeResolutions, ConstantsLanguage, IblBaker, DEFAULT_FIRST_ID};

/// Main exporter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Container output and companion constants
    #[serde(default)]
    pub output: OutputConfig,
    /// Id allocation
    #[serde(default)]
    pub ids: IdsConfig,
    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl ExportConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`GX3D_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // GX3D_OUTPUT__CONSTANTS=rust -> output.constants = "rust"
        figment = figment.merge(Env::prefixed("GX3D_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }

    /// Baker for equirectangular skyboxes, if one is configured
    pub fn ibl_baker(&self) -> Option<IblBaker> {
        self.tools
            .ibl_baker
            .as_ref()
            .map(|program| IblBaker::new(program, self.tools.resolutions))
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Companion constants language (cpp, rust, none)
    pub constants: ConstantsLanguage,
    /// Container path used when the command line gives none
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            constants: ConstantsLanguage::Cpp,
            path: None,
        }
    }
}

/// Id allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    /// First id handed out; lower ids are left to the engine
    pub first_id: u64,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            first_id: DEFAULT_FIRST_ID,
        }
    }
}

/// External tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Image-based-lighting baker executable
    pub ibl_baker: Option<PathBuf>,
    /// Baker output resolutions
    #[serde(default)]
    pub resolutions: BakeResolutions,
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.ids.first_id, 1024);
        assert_eq!(config.output.constants, ConstantsLanguage::Cpp);
        assert_eq!(config.tools.resolutions.irradiance, 128);
        assert!(config.ibl_baker().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = ExportConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("first_id"));
        assert!(toml.contains("constants = \"cpp\""));
        assert!(toml.contains("log_level"));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: ExportConfig = toml::from_str("[output]\nconstants = \"rust\"\n").unwrap();
        assert_eq!(config.output.constants, ConstantsLanguage::Rust);
        assert_eq!(config.ids.first_id, 1024);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_ibl_baker_from_tools() {
        let config: ExportConfig = toml::from_str(
            "[tools]\nibl_baker = \"/opt/bin/ibl-baker\"\n[tools.resolutions]\nradiance = 256\n",
        )
        .unwrap();
        let baker = config.ibl_baker().unwrap();
        assert_eq!(baker.program, PathBuf::from("/opt/bin/ibl-baker"));
        assert_eq!(baker.resolutions.radiance, 256);
        assert_eq!(baker.resolutions.baked_cube, 1024);
    }
}
