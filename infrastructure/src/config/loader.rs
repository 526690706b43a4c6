//! Configuration file loader with multi-source merging

use super::file_config::{APP_DIR, FileConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level file names, checked in order.
pub const PROJECT_FILES: [&str; 2] = ["mesh.toml", ".mesh.toml"];

/// Prefix for environment overrides. Nested keys use `__`, as in
/// `MESH_RETRIEVAL__K=8`.
pub const ENV_PREFIX: &str = "MESH_";

/// One place configuration may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub label: &'static str,
    pub path: PathBuf,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `MESH_*` environment variables
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./mesh.toml` or `./.mesh.toml`
    /// 4. Global: `~/.config/reasoning-mesh/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        let global = Self::global_config_path();
        let project = Self::project_config_path();
        Self::figment(global.as_deref(), project.as_deref(), config_path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// File layers without the environment. Missing global and project
    /// files are skipped; a missing explicit file is an error at extract.
    pub fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        for path in [global, project].into_iter().flatten() {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Every file location consulted, highest priority first.
    pub fn sources(config_path: Option<&Path>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                label: "Explicit",
                path: path.to_path_buf(),
                found: path.exists(),
            });
        }

        let project = Self::project_config_path();
        sources.push(ConfigSource {
            label: "Project",
            found: project.is_some(),
            path: project.unwrap_or_else(|| PathBuf::from(PROJECT_FILES[0])),
        });

        if let Some(path) = Self::global_config_path() {
            sources.push(ConfigSource {
                label: "Global",
                found: path.exists(),
                path,
            });
        }

        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.retrieval.k, 5);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_global_config_path_uses_app_dir() {
        if let Some(path) = ConfigLoader::global_config_path() {
            assert!(path.ends_with("reasoning-mesh/config.toml"));
        }
    }

    #[test]
    fn test_later_layers_override_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(dir.path(), "global.toml", "[retrieval]\nk = 7\nmin_relevance = 0.4\n");
        let project = write(dir.path(), "mesh.toml", "[retrieval]\nk = 9\n");
        let explicit = write(dir.path(), "explicit.toml", "[bus]\nmax_concurrent_hops = 1\n");

        let config: FileConfig = ConfigLoader::figment(Some(&global), Some(&project), Some(&explicit))
            .extract()
            .unwrap();

        assert_eq!(config.retrieval.k, 9);
        assert_eq!(config.retrieval.min_relevance, 0.4);
        assert_eq!(config.bus.max_concurrent_hops, 1);
        assert_eq!(config.bus.chars_per_token, 4);
    }

    #[test]
    fn test_missing_optional_layers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config: FileConfig = ConfigLoader::figment(
            Some(&dir.path().join("nope.toml")),
            Some(&dir.path().join("mesh.toml")),
            None,
        )
        .extract()
        .unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<FileConfig, _> =
            ConfigLoader::figment(None, None, Some(&dir.path().join("missing.toml"))).extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_value_type_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "bad.toml", "[retrieval]\nk = \"many\"\n");
        let result: Result<FileConfig, _> =
            ConfigLoader::figment(None, None, Some(&explicit)).extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_sources_list_explicit_first() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write(dir.path(), "x.toml", "");
        let sources = ConfigLoader::sources(Some(&explicit));
        assert_eq!(sources[0].label, "Explicit");
        assert!(sources[0].found);
        assert!(sources.iter().any(|s| s.label == "Project"));
    }
}
