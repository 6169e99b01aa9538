//! Process configuration, read once at startup.
//!
//! | variable | default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8000` |
//! | `DATABASE_URL` | unset (in-memory stores) |
//! | `JWT_ALGORITHM` | `HS256` (or `RS256`) |
//! | `JWT_SECRET` | insecure dev secret (HS256) |
//! | `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY` | required for RS256, base64 PEM |
//! | `ACCESS_TOKEN_EXPIRES_IN` | `15` minutes |
//! | `REFRESH_TOKEN_EXPIRES_IN` | `60` minutes |
//! | `FILE_EXTENSIONS` | `jpg,jpeg,png` |
//! | `UPLOAD_DIR` | `upload/images` |
//! | `CLIENT_ORIGIN` | unset (no CORS origin allowed) |
//! | `BCRYPT_COST` | `12` |

use std::fmt;
use std::path::PathBuf;

use axum::http::HeaderValue;
use thiserror::Error;

use bookstore_auth::{KeyError, SigningKeys, TokenSettings};

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BCRYPT_COST: u32 = 12;
/// One year.
const MAX_TOKEN_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is required")]
    Missing { key: &'static str },

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid signing keys: {0}")]
    Keys(#[from] KeyError),
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum JwtKeyConfig {
    Hs256 { secret: String },
    Rs256 { private_key_b64: String, public_key_b64: String },
}

impl fmt::Debug for JwtKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwtKeyConfig::Hs256 { .. } => f.write_str("Hs256 { .. }"),
            JwtKeyConfig::Rs256 { .. } => f.write_str("Rs256 { .. }"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub jwt: JwtKeyConfig,
    pub access_token_minutes: i64,
    pub refresh_token_minutes: i64,
    /// Lower-cased, without leading dots.
    pub file_extensions: Vec<String>,
    pub upload_dir: PathBuf,
    pub client_origin: Option<String>,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    /// Read the process environment. The binary loads `.env` into it first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt = match get("JWT_ALGORITHM").as_deref().map(str::to_ascii_uppercase).as_deref() {
            None | Some("HS256") => {
                let secret = get("JWT_SECRET").unwrap_or_else(|| {
                    tracing::warn!("JWT_SECRET not set; using insecure dev default");
                    DEV_JWT_SECRET.to_string()
                });
                JwtKeyConfig::Hs256 { secret }
            }
            Some("RS256") => JwtKeyConfig::Rs256 {
                private_key_b64: get("JWT_PRIVATE_KEY").ok_or(ConfigError::Missing { key: "JWT_PRIVATE_KEY" })?,
                public_key_b64: get("JWT_PUBLIC_KEY").ok_or(ConfigError::Missing { key: "JWT_PUBLIC_KEY" })?,
            },
            Some(other) => {
                return Err(ConfigError::invalid("JWT_ALGORITHM", other, "expected HS256 or RS256"));
            }
        };

        let access_token_minutes = positive_minutes("ACCESS_TOKEN_EXPIRES_IN", get("ACCESS_TOKEN_EXPIRES_IN"), 15)?;
        let refresh_token_minutes = positive_minutes("REFRESH_TOKEN_EXPIRES_IN", get("REFRESH_TOKEN_EXPIRES_IN"), 60)?;

        let file_extensions = match get("FILE_EXTENSIONS") {
            Some(raw) => {
                let parsed: Vec<String> = raw
                    .split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect();
                if parsed.is_empty() {
                    return Err(ConfigError::invalid("FILE_EXTENSIONS", &raw, "no extensions listed"));
                }
                parsed
            }
            None => vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        };

        let client_origin = get("CLIENT_ORIGIN");
        if let Some(origin) = &client_origin {
            HeaderValue::from_str(origin)
                .map_err(|e| ConfigError::invalid("CLIENT_ORIGIN", origin, e.to_string()))?;
        }

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => return Err(ConfigError::invalid("BCRYPT_COST", &raw, "expected an integer in 4..=31")),
            },
            None => DEFAULT_BCRYPT_COST,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            database_url: get("DATABASE_URL"),
            jwt,
            access_token_minutes,
            refresh_token_minutes,
            file_extensions,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("upload/images")),
            client_origin,
            bcrypt_cost,
        })
    }

    pub fn signing_keys(&self) -> Result<SigningKeys, ConfigError> {
        let keys = match &self.jwt {
            JwtKeyConfig::Hs256 { secret } => SigningKeys::hs256(secret.as_bytes())?,
            JwtKeyConfig::Rs256 {
                private_key_b64,
                public_key_b64,
            } => SigningKeys::rs256_base64(private_key_b64, public_key_b64)?,
        };
        Ok(keys)
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings::from_minutes(self.access_token_minutes, self.refresh_token_minutes)
    }
}

fn positive_minutes(key: &'static str, raw: Option<String>, default: i64) -> Result<i64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(minutes) if (1..=MAX_TOKEN_MINUTES).contains(&minutes) => Ok(minutes),
            _ => Err(ConfigError::invalid(
                key,
                &raw,
                format!("expected a number of minutes in 1..={MAX_TOKEN_MINUTES}"),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.database_url, None);
        assert_eq!(config.access_token_minutes, 15);
        assert_eq!(config.refresh_token_minutes, 60);
        assert_eq!(config.file_extensions, vec!["jpg", "jpeg", "png"]);
        assert_eq!(config.upload_dir, PathBuf::from("upload/images"));
        assert_eq!(config.bcrypt_cost, 12);
        assert!(config.signing_keys().is_ok());
    }

    #[test]
    fn extensions_are_normalized() {
        let config = load(&[("FILE_EXTENSIONS", " .PNG, gif ,,")]).unwrap();
        assert_eq!(config.file_extensions, vec!["png", "gif"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("ACCESS_TOKEN_EXPIRES_IN", "soon")]),
            Err(ConfigError::Invalid { key: "ACCESS_TOKEN_EXPIRES_IN", .. })
        ));
        assert!(matches!(
            load(&[("REFRESH_TOKEN_EXPIRES_IN", "0")]),
            Err(ConfigError::Invalid { key: "REFRESH_TOKEN_EXPIRES_IN", .. })
        ));
        assert!(matches!(
            load(&[("JWT_ALGORITHM", "ES256")]),
            Err(ConfigError::Invalid { key: "JWT_ALGORITHM", .. })
        ));
        assert!(matches!(
            load(&[("BCRYPT_COST", "2")]),
            Err(ConfigError::Invalid { key: "BCRYPT_COST", .. })
        ));
    }

    #[test]
    fn token_lifetimes_are_capped() {
        assert!(matches!(
            load(&[("ACCESS_TOKEN_EXPIRES_IN", "200000000000")]),
            Err(ConfigError::Invalid { key: "ACCESS_TOKEN_EXPIRES_IN", .. })
        ));
        assert!(matches!(
            load(&[("REFRESH_TOKEN_EXPIRES_IN", "9223372036854775807")]),
            Err(ConfigError::Invalid { key: "REFRESH_TOKEN_EXPIRES_IN", .. })
        ));

        let config = load(&[("JWT_SECRET", "s"), ("REFRESH_TOKEN_EXPIRES_IN", "525600")]).unwrap();
        assert_eq!(config.token_settings().refresh_ttl, chrono::Duration::days(365));
    }

    #[test]
    fn rs256_requires_both_keys() {
        let err = load(&[("JWT_ALGORITHM", "rs256"), ("JWT_PRIVATE_KEY", "abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "JWT_PUBLIC_KEY" }));
    }

    #[test]
    fn rs256_with_garbage_keys_fails_at_key_construction() {
        let config = load(&[
            ("JWT_ALGORITHM", "RS256"),
            ("JWT_PRIVATE_KEY", "not base64!"),
            ("JWT_PUBLIC_KEY", "not base64!"),
        ])
        .unwrap();
        assert!(matches!(config.signing_keys(), Err(ConfigError::Keys(_))));
    }
}
