//! Configuration file loading for prompt-alchemy
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ALCHEMY_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./alchemy.toml` or `./.alchemy.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/prompt-alchemy/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileFeaturesConfig, FileLearningConfig, FileLoggingConfig,
    FilePhaseConfig, FilePipelineConfig, FileProviderConfig, FileProvidersConfig,
    FileRankingConfig, FileStorageConfig, FileTemplatesConfig, ProviderKind,
};
pub use loader::ConfigLoader;
