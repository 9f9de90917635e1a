//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Application directory name under the user config dir
const APP_DIR: &str = "devops-agent";

/// Project-level config file names, checked in order
const PROJECT_FILES: &[&str] = &["devops-agent.toml", ".devops-agent.toml"];

/// Environment variable prefix; `__` separates nested keys
/// (`DEVOPS_AGENT_OLLAMA__BASE_URL` sets `ollama.base_url`)
pub const ENV_PREFIX: &str = "DEVOPS_AGENT_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `DEVOPS_AGENT_*` environment variables
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./devops-agent.toml` or `./.devops-agent.toml`
    /// 4. Global: `~/.config/devops-agent/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// The merged provider chain behind [`ConfigLoader::load`]
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(project_path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(project_path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
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

    /// Describe the config file locations being used, one line each
    pub fn describe_sources(config_path: Option<&Path>) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(path) = config_path {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            lines.push(format!("[{:<7}] Explicit: {}", mark, path.display()));
        }

        match Self::project_config_path() {
            Some(path) => lines.push(format!("[{:<7}] Project:  {}", "FOUND", path.display())),
            None => lines.push(format!("[{:<7}] Project:  ./{}", "", PROJECT_FILES[0])),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "" };
            lines.push(format!("[{:<7}] Global:   {}", mark, path.display()));
        }

        lines.push(format!("[{:<7}] Env:      {}*", "", ENV_PREFIX));
        lines.push(format!("[{:<7}] Default:  built-in defaults", ""));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.agent.model, "qwen2.5:7b");
        assert!(config.agent.auto_execute_safe);
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_global_config_path_returns_some() {
        // Should return a path (even if file doesn't exist)
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("devops-agent"));
    }

    #[test]
    fn test_explicit_file_merges_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[agent]\nmodel = \"llama3.1:8b\"\ntemperature = 0.2\n\n[ollama]\ntimeout_secs = 30"
        )
        .unwrap();

        let config = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(config.agent.model, "llama3.1:8b");
        assert_eq!(config.agent.temperature, 0.2);
        // untouched keys keep their defaults
        assert_eq!(config.agent.max_tokens, 4096);
        assert_eq!(config.ollama.timeout_secs, 30);
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_temperature_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\ntemperature = 7.0").unwrap();

        let config = ConfigLoader::load(Some(file.path())).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ollama]\ntimeout_secs = \"soon\"").unwrap();

        assert!(ConfigLoader::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_describe_sources_mentions_explicit_path() {
        let lines = ConfigLoader::describe_sources(Some(Path::new("/nonexistent/agent.toml")));
        assert!(lines[0].contains("MISSING"));
        assert!(lines[0].contains("/nonexistent/agent.toml"));
        assert!(lines.iter().any(|l| l.contains(ENV_PREFIX)));
    }
}
