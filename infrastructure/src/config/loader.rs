//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "prompt-alchemy";
const PROJECT_FILES: [&str; 2] = ["alchemy.toml", ".alchemy.toml"];
const ENV_PREFIX: &str = "ALCHEMY_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `ALCHEMY_*` environment variables (nested keys split on `__`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./alchemy.toml` or `./.alchemy.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/prompt-alchemy/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(Self::global_config_path(), Self::project_config_path(), config_path)
            .extract()
            .map_err(Box::new)
    }

    fn figment(
        global: Option<PathBuf>,
        project: Option<PathBuf>,
        explicit: Option<&PathBuf>,
    ) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = project {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load a single file on top of the defaults, ignoring other sources
    pub fn load_file(path: &Path) -> Result<FileConfig, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(FileConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/prompt-alchemy/config.toml if set,
    /// otherwise the platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources() {
        println!("Configuration sources (in priority order):");
        println!("  [ENV  ] Environment: {}*", ENV_PREFIX);

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./alchemy.toml or ./.alchemy.toml");
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                println!("  [FOUND] Global:  {}", path.display());
            } else {
                println!("  [     ] Global:  {}", path.display());
            }
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.pipeline.count, 3);
        assert!(config.features.parallel_phases);
        assert_eq!(config.phase.len(), 3);
    }

    #[test]
    fn test_global_config_path_returns_some() {
        // Should return a path (even if file doesn't exist)
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("prompt-alchemy"));
    }

    #[test]
    fn test_load_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alchemy.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[pipeline]
count = 7

[providers.openai]
kind = "openai"
base_url = "https://api.openai.com"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_file(&path).unwrap();
        assert_eq!(config.pipeline.count, 7);
        assert_eq!(config.pipeline.deadline_seconds, 120);
        // provider tables merge by key
        assert!(config.providers.contains_key("ollama"));
        assert!(config.providers.contains_key("openai"));
    }

    #[test]
    fn test_later_sources_win() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project.toml");
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(&project, "[pipeline]\ncount = 4\ndeadline_seconds = 40\n").unwrap();
        std::fs::write(&explicit, "[pipeline]\ncount = 9\n").unwrap();

        let config: FileConfig =
            ConfigLoader::figment(None, Some(project), Some(&explicit))
                .extract()
                .unwrap();
        assert_eq!(config.pipeline.count, 9);
        assert_eq!(config.pipeline.deadline_seconds, 40);
    }

    #[test]
    fn test_env_overrides_files() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("explicit.toml", "[pipeline]\ncount = 9\n")?;
            jail.set_env("ALCHEMY_PIPELINE__COUNT", "11");
            jail.set_env("ALCHEMY_FEATURES__CACHING", "true");

            let explicit = PathBuf::from("explicit.toml");
            let config: FileConfig = ConfigLoader::figment(None, None, Some(&explicit)).extract()?;
            assert_eq!(config.pipeline.count, 11);
            assert!(config.features.caching);
            Ok(())
        });
    }
}
