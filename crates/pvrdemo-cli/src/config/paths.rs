//! Config file location.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Environment variable naming the config file directly.
pub const CONFIG_ENV: &str = "PVRDEMO_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "pvrdemo";

/// Resolves the config file path from the process environment.
///
/// See [`resolve_config_path_with`] for the lookup order.
///
/// # Errors
///
/// Returns an error if no candidate location can be determined.
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    resolve_config_path_with(dir, |key| std::env::var(key).ok())
}

/// Resolves the config file path, reading variables through `lookup`.
///
/// First match wins:
/// 1. `{dir}/config.toml` when `dir` is given
/// 2. `$PVRDEMO_CONFIG`, used as the file path itself
/// 3. `$XDG_CONFIG_HOME/pvrdemo/config.toml`
/// 4. `$HOME/.config/pvrdemo/config.toml`
///
/// Empty variables count as unset.
///
/// # Errors
///
/// Returns an error if `dir` is `None` and neither `XDG_CONFIG_HOME` nor
/// `HOME` is set.
pub fn resolve_config_path_with<F>(dir: Option<&PathBuf>, lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(d) = dir {
        return Ok(d.join(CONFIG_FILE_NAME));
    }

    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(file) = var(CONFIG_ENV) {
        return Ok(PathBuf::from(file));
    }
    if let Some(xdg) = var("XDG_CONFIG_HOME") {
        return Ok(app_config_file(Path::new(&xdg)));
    }
    if let Some(home) = var("HOME") {
        return Ok(app_config_file(&Path::new(&home).join(".config")));
    }
    bail!("cannot locate config file: set {CONFIG_ENV}, XDG_CONFIG_HOME or HOME, or pass --dir")
}

fn app_config_file(config_home: &Path) -> PathBuf {
    config_home.join(APP_DIR_NAME).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (String::from(*k), String::from(*v)))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_resolve_with_dir() {
        // Arrange
        let dir = PathBuf::from("/tmp/pvrdemo");

        // Act
        let path =
            resolve_config_path_with(Some(&dir), env(&[(CONFIG_ENV, "/etc/other.toml")])).unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/tmp/pvrdemo/config.toml"));
    }

    #[test]
    fn test_resolve_env_override() {
        // Arrange
        let lookup = env(&[(CONFIG_ENV, "/etc/pvrdemo.toml"), ("HOME", "/home/u")]);

        // Act
        let path = resolve_config_path_with(None, lookup).unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/etc/pvrdemo.toml"));
    }

    #[test]
    fn test_resolve_xdg_before_home() {
        // Arrange
        let lookup = env(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")]);

        // Act
        let path = resolve_config_path_with(None, lookup).unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/xdg/pvrdemo/config.toml"));
    }

    #[test]
    fn test_resolve_home_fallback_ignores_empty_vars() {
        // Arrange
        let lookup = env(&[(CONFIG_ENV, ""), ("XDG_CONFIG_HOME", ""), ("HOME", "/home/u")]);

        // Act
        let path = resolve_config_path_with(None, lookup).unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/home/u/.config/pvrdemo/config.toml"));
    }

    #[test]
    fn test_resolve_without_any_location() {
        // Arrange & Act
        let result = resolve_config_path_with(None, env(&[]));

        // Assert
        let message = result.unwrap_err().to_string();
        assert!(message.contains(CONFIG_ENV));
    }
}
