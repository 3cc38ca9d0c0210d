use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const CURRENT_CONFIG_VERSION: &str = "v1";

/// One week.
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;
/// One year.
pub const MAX_REFRESH_TOKEN_TTL_HOURS: i64 = 365 * 24;

fn default_access_token_ttl_minutes() -> i64 {
    60
}

fn default_refresh_token_ttl_hours() -> i64 {
    24
}

#[derive(Clone, Debug, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Generated on first start when absent.
    #[serde(alias = "jwtSecret")]
    pub jwt_secret: Option<String>,
    #[serde(alias = "accessTokenTtlMinutes")]
    pub access_token_ttl_minutes: i64,
    #[serde(alias = "refreshTokenTtlHours")]
    pub refresh_token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_ttl_minutes: default_access_token_ttl_minutes(),
            refresh_token_ttl_hours: default_refresh_token_ttl_hours(),
        }
    }
}

impl AuthConfig {
    pub fn secret(&self) -> Option<SecretString> {
        self.jwt_secret
            .as_deref()
            .map(|secret| SecretString::from(secret.to_string()))
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.access_token_ttl_minutes.clamp(1, MAX_ACCESS_TOKEN_TTL_MINUTES),
        )
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_token_ttl_hours.clamp(1, MAX_REFRESH_TOKEN_TTL_HOURS))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "configVersion")]
    pub config_version: String,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        if matches!(
            self.auth.jwt_secret.as_deref(),
            Some(secret) if secret.trim().is_empty()
        ) {
            self.auth.jwt_secret = None;
        }

        if self.auth.access_token_ttl_minutes <= 0 {
            tracing::warn!(
                "Invalid access token lifetime {}, resetting to default",
                self.auth.access_token_ttl_minutes
            );
            self.auth.access_token_ttl_minutes = default_access_token_ttl_minutes();
        } else if self.auth.access_token_ttl_minutes > MAX_ACCESS_TOKEN_TTL_MINUTES {
            tracing::warn!(
                "Access token lifetime {} exceeds the maximum, capping at {}",
                self.auth.access_token_ttl_minutes,
                MAX_ACCESS_TOKEN_TTL_MINUTES
            );
            self.auth.access_token_ttl_minutes = MAX_ACCESS_TOKEN_TTL_MINUTES;
        }

        if self.auth.refresh_token_ttl_hours <= 0 {
            tracing::warn!(
                "Invalid refresh token lifetime {}, resetting to default",
                self.auth.refresh_token_ttl_hours
            );
            self.auth.refresh_token_ttl_hours = default_refresh_token_ttl_hours();
        } else if self.auth.refresh_token_ttl_hours > MAX_REFRESH_TOKEN_TTL_HOURS {
            tracing::warn!(
                "Refresh token lifetime {} exceeds the maximum, capping at {}",
                self.auth.refresh_token_ttl_hours,
                MAX_REFRESH_TOKEN_TTL_HOURS
            );
            self.auth.refresh_token_ttl_hours = MAX_REFRESH_TOKEN_TTL_HOURS;
        }

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            auth: AuthConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = Config::from_raw("{}");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.auth.access_token_ttl_minutes, 60);
        assert_eq!(config.auth.refresh_token_ttl_hours, 24);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn invalid_json_falls_back_to_default() {
        let config = Config::from_raw("{invalid json");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.auth.access_token_ttl_minutes, 60);
    }

    #[test]
    fn aliases_and_normalization_are_applied() {
        let raw = r#"{
            "configVersion": "v0",
            "auth": { "jwtSecret": "  ", "accessTokenTtlMinutes": 5, "refreshTokenTtlHours": -1 }
        }"#;

        let config = Config::from_raw(raw);

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.auth.access_token_ttl_minutes, 5);
        assert_eq!(config.auth.refresh_token_ttl_hours, 24);
    }

    #[test]
    fn oversized_lifetimes_are_capped() {
        let raw = format!(
            r#"{{"auth": {{"access_token_ttl_minutes": {max}, "refresh_token_ttl_hours": {max}}}}}"#,
            max = i64::MAX
        );

        let config = Config::from_raw(&raw);

        assert_eq!(config.auth.access_token_ttl_minutes, MAX_ACCESS_TOKEN_TTL_MINUTES);
        assert_eq!(config.auth.refresh_token_ttl_hours, MAX_REFRESH_TOKEN_TTL_HOURS);
        assert_eq!(config.auth.access_token_ttl(), chrono::Duration::days(7));
    }

    #[test]
    fn lifetimes_set_without_normalizing_still_convert() {
        let auth = AuthConfig {
            access_token_ttl_minutes: i64::MAX,
            refresh_token_ttl_hours: i64::MIN,
            ..AuthConfig::default()
        };

        assert_eq!(auth.access_token_ttl(), chrono::Duration::days(7));
        assert_eq!(auth.refresh_token_ttl(), chrono::Duration::hours(1));
    }
}
