use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use secrecy::SecretString;
use thiserror::Error;

mod schema;

pub use schema::{AuthConfig, CURRENT_CONFIG_VERSION, Config};

const JWT_SECRET_ENV: &str = "JWT_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &PathBuf) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found, creating one");
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &PathBuf) -> Result<(), ConfigError> {
    let normalized = config.clone().normalized();
    let raw_config = serde_json::to_string_pretty(&normalized)?;
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}

/// Picks the token signing secret: `JWT_SECRET` first, then the config file.
/// When neither has one, a random secret is generated and stored in `config`;
/// the returned flag tells the caller to persist it.
pub fn resolve_jwt_secret(config: &mut Config) -> (SecretString, bool) {
    if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
        let secret = secret.trim();
        if !secret.is_empty() {
            return (SecretString::from(secret.to_string()), false);
        }
    }

    if let Some(secret) = config.auth.secret() {
        return (secret, false);
    }

    let bytes: [u8; 32] = rand::random();
    let generated = URL_SAFE_NO_PAD.encode(bytes);
    config.auth.jwt_secret = Some(generated.clone());
    tracing::info!("Generated a new token signing secret");
    (SecretString::from(generated), true)
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn save_then_load_keeps_auth_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.auth.jwt_secret = Some("stored-secret".to_string());
        config.auth.access_token_ttl_minutes = 15;
        save_config_to_file(&config, &path).await.unwrap();

        let loaded = load_config_from_file(&path).await;
        assert_eq!(loaded.auth.jwt_secret.as_deref(), Some("stored-secret"));
        assert_eq!(loaded.auth.access_token_ttl_minutes, 15);
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from_file(&dir.path().join("absent.json")).await;
        assert_eq!(loaded.config_version, CURRENT_CONFIG_VERSION);
    }

    #[test]
    fn configured_secret_is_used_or_generated_once() {
        if std::env::var(JWT_SECRET_ENV).is_ok() {
            return;
        }

        let mut config = Config::default();
        let (generated, changed) = resolve_jwt_secret(&mut config);
        assert!(changed);
        assert!(!generated.expose_secret().is_empty());

        let (again, changed) = resolve_jwt_secret(&mut config);
        assert!(!changed);
        assert_eq!(again.expose_secret(), generated.expose_secret());
    }
}
