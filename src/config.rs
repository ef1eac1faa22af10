use std::path::PathBuf;

use anyhow::{Context, Result};
use dotenv::dotenv;

/// Environment-sourced settings. Both are required; without them there is
/// nothing to display, so startup fails instead of opening an empty window.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub default_city: String,
}

impl Config {
    /// Reads settings from the process environment. Call [`load_env_file`]
    /// first so a `.env` file can provide them.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENWEATHERMAP_API_KEY")
            .context("OPENWEATHERMAP_API_KEY is not set")?;
        let default_city =
            std::env::var("DEFAULT_CITY").context("DEFAULT_CITY is not set")?;

        Ok(Self {
            api_key,
            default_city,
        })
    }
}

/// Looks for a `.env` file in the locations a packaged binary may run from:
/// the working directory, next to the executable, and the home directory.
/// The first one that loads wins.
pub fn load_env_file() {
    let mut env_paths = vec![PathBuf::from(".env")];

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            env_paths.push(exe_dir.join(".env"));
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        env_paths.push(PathBuf::from(home).join(".env"));
    }

    for path in &env_paths {
        if !path.exists() {
            continue;
        }
        match dotenv::from_path(path) {
            Ok(()) => {
                log::debug!("loaded environment from {}", path.display());
                return;
            }
            Err(e) => log::debug!("could not load {}: {e}", path.display()),
        }
    }

    // Fall back to dotenv's own lookup, which walks up from the current
    // directory.
    dotenv().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test covers both outcomes; from_env reads process-global state and
    // parallel tests would race on it.
    #[test]
    fn from_env_requires_both_settings() {
        std::env::set_var("OPENWEATHERMAP_API_KEY", "test-key");
        std::env::set_var("DEFAULT_CITY", "Paris");

        let config = Config::from_env().expect("both variables are set");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.default_city, "Paris");

        std::env::remove_var("DEFAULT_CITY");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DEFAULT_CITY"));

        std::env::remove_var("OPENWEATHERMAP_API_KEY");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("OPENWEATHERMAP_API_KEY"));
    }
}
