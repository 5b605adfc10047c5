//! Configuration file discovery and merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::PathBuf;

/// Discovers config files and merges them over the built-in defaults
pub struct ConfigLoader;

impl ConfigLoader {
    /// Merge configuration from every known source, later sources winning:
    /// built-in defaults, then the user-level file under the platform config
    /// directory, then a project-local `agora.toml` (or `.agora.toml`), then
    /// the path given on the command line.
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        for path in Self::user_config_path()
            .filter(|p| p.exists())
            .into_iter()
            .chain(Self::project_config_path())
            .chain(config_path.cloned())
        {
            figment = figment.merge(Toml::file(&path));
        }

        figment.extract().map_err(Box::new)
    }

    /// Built-in defaults only, skipping all file discovery (`--no-config`).
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// The user-level config file: `<platform config dir>/agora/config.toml`.
    /// `None` when the platform reports no config directory.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("agora").join("config.toml"))
    }

    /// The project-local config file, if one exists in the working directory.
    pub fn project_config_path() -> Option<PathBuf> {
        ["agora.toml", ".agora.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print where configuration would be read from, lowest priority first.
    pub fn print_config_sources() {
        println!("defaults   built-in");
        match Self::user_config_path() {
            Some(path) if path.exists() => println!("user       {}", path.display()),
            Some(path) => println!("user       {} (absent)", path.display()),
            None => println!("user       (no platform config directory)"),
        }
        match Self::project_config_path() {
            Some(path) => println!("project    {}", path.display()),
            None => println!("project    ./agora.toml or ./.agora.toml (absent)"),
        }
        println!("explicit   --config <path>");
    }
}
