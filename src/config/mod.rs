mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./reelgate.toml",
        "~/.config/reelgate/config.toml",
        "/etc/reelgate/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    // Validate server config
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    // Auth needs at least one credential to be usable
    let auth = &config.server.auth;
    if auth.enabled
        && auth.api_key.is_none()
        && (auth.username.is_none() || auth.password_hash.is_none())
    {
        anyhow::bail!(
            "Auth is enabled but neither an API key nor username/password_hash is configured"
        );
    }

    // Warn about library paths that do not exist yet
    for path in config.storage.allowed_roots() {
        if !path.exists() {
            tracing::warn!("Library path does not exist: {:?}", path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_port_zero() {
        let toml = "[server]\nport = 0\n";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_auth_without_credentials() {
        let toml = "[server.auth]\nenabled = true\n";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn accepts_auth_with_api_key() {
        let toml = "[server.auth]\nenabled = true\napi_key = \"secret\"\n";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9999\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn missing_custom_path_is_an_error() {
        let result = load_config(Path::new("/nonexistent/reelgate.toml"));
        assert!(result.is_err());
    }
}
