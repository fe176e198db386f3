//! Configuration management for the ingest server

use std::env;
use std::path::PathBuf;

use crate::upload::{MediaType, UploadCategory, DEFAULT_MAX_FILE_SIZE};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root of the category directories
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub resume: CategoryRules,
    pub profile: CategoryRules,
}

/// Content contract for one upload category
#[derive(Debug, Clone)]
pub struct CategoryRules {
    pub allowed_types: Vec<MediaType>,
    pub max_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Require a bearer token on upload routes
    pub required: bool,
    /// HS256 secret shared with the portal's auth service
    pub jwt_secret: Option<String>,
}

/// Configuration problems. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} names unsupported media type {value:?}")]
    UnsupportedMediaType { key: &'static str, value: String },

    #[error("{0} must allow at least one media type")]
    EmptyAllowList(&'static str),

    #[error("AUTH_REQUIRED is set but JWT_SECRET is missing")]
    MissingJwtSecret,

    #[error("storage directory {path} is not usable: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadConfig {
    pub fn for_category(&self, category: UploadCategory) -> &CategoryRules {
        match category {
            UploadCategory::Resume => &self.resume,
            UploadCategory::Profile => &self.profile,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            resume: CategoryRules {
                allowed_types: vec![MediaType::Pdf],
                max_bytes: DEFAULT_MAX_FILE_SIZE,
            },
            profile: CategoryRules {
                allowed_types: vec![MediaType::Jpeg, MediaType::Png],
                max_bytes: DEFAULT_MAX_FILE_SIZE,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4444,
            },
            storage: StorageConfig {
                base_dir: PathBuf::from("./public"),
            },
            uploads: UploadConfig::default(),
            auth: AuthConfig {
                required: true,
                jwt_secret: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or("SERVER_PORT", var("SERVER_PORT"), defaults.server.port)?,
            },
            storage: StorageConfig {
                base_dir: var("UPLOAD_BASE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.base_dir),
            },
            uploads: UploadConfig {
                resume: CategoryRules {
                    allowed_types: media_types_or(
                        "RESUME_ALLOWED_TYPES",
                        var("RESUME_ALLOWED_TYPES"),
                        defaults.uploads.resume.allowed_types,
                    )?,
                    max_bytes: parse_or(
                        "RESUME_MAX_BYTES",
                        var("RESUME_MAX_BYTES"),
                        defaults.uploads.resume.max_bytes,
                    )?,
                },
                profile: CategoryRules {
                    allowed_types: media_types_or(
                        "PROFILE_ALLOWED_TYPES",
                        var("PROFILE_ALLOWED_TYPES"),
                        defaults.uploads.profile.allowed_types,
                    )?,
                    max_bytes: parse_or(
                        "PROFILE_MAX_BYTES",
                        var("PROFILE_MAX_BYTES"),
                        defaults.uploads.profile.max_bytes,
                    )?,
                },
            },
            auth: AuthConfig {
                required: parse_bool_or("AUTH_REQUIRED", var("AUTH_REQUIRED"), defaults.auth.required)?,
                jwt_secret: var("JWT_SECRET"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.required && self.auth.jwt_secret.is_none() {
            return Err(ConfigError::MissingJwtSecret);
        }
        for (key, rules) in [
            ("RESUME_MAX_BYTES", &self.uploads.resume),
            ("PROFILE_MAX_BYTES", &self.uploads.profile),
        ] {
            if rules.max_bytes == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: "0".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn parse_bool_or(key: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue {
            key,
            value: value.unwrap_or_default(),
        }),
    }
}

/// Comma separated media types, each of which must be known
fn media_types_or(
    key: &'static str,
    value: Option<String>,
    default: Vec<MediaType>,
) -> Result<Vec<MediaType>, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };

    let mut allowed = Vec::new();
    for item in value.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        let media_type = MediaType::parse(item).ok_or_else(|| ConfigError::UnsupportedMediaType {
            key,
            value: item.to_string(),
        })?;
        if !allowed.contains(&media_type) {
            allowed.push(media_type);
        }
    }

    if allowed.is_empty() {
        return Err(ConfigError::EmptyAllowList(key));
    }
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_need_a_secret() {
        let result = Config::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(ConfigError::MissingJwtSecret)));
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.server.port, 4444);
        assert_eq!(config.storage.base_dir, PathBuf::from("./public"));
        assert_eq!(config.uploads.resume.allowed_types, vec![MediaType::Pdf]);
        assert_eq!(
            config.uploads.profile.allowed_types,
            vec![MediaType::Jpeg, MediaType::Png]
        );
        assert_eq!(config.uploads.resume.max_bytes, 5 * 1024 * 1024);
        assert!(config.auth.required);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "8080"),
            ("UPLOAD_BASE_DIR", "/var/lib/portal"),
            ("PROFILE_ALLOWED_TYPES", "image/png, image/webp,image/png"),
            ("PROFILE_MAX_BYTES", "1048576"),
            ("AUTH_REQUIRED", "false"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.base_dir, PathBuf::from("/var/lib/portal"));
        assert_eq!(
            config.uploads.profile.allowed_types,
            vec![MediaType::Png, MediaType::Webp]
        );
        assert_eq!(config.uploads.profile.max_bytes, 1024 * 1024);
        assert!(!config.auth.required);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let bad_port = Config::from_lookup(lookup(&[("AUTH_REQUIRED", "no"), ("SERVER_PORT", "http")]));
        assert!(matches!(
            bad_port,
            Err(ConfigError::InvalidValue { key: "SERVER_PORT", .. })
        ));

        let bad_type = Config::from_lookup(lookup(&[
            ("AUTH_REQUIRED", "no"),
            ("RESUME_ALLOWED_TYPES", "application/zip"),
        ]));
        assert!(matches!(
            bad_type,
            Err(ConfigError::UnsupportedMediaType { key: "RESUME_ALLOWED_TYPES", .. })
        ));

        let empty = Config::from_lookup(lookup(&[
            ("AUTH_REQUIRED", "no"),
            ("RESUME_ALLOWED_TYPES", " , "),
        ]));
        assert!(matches!(empty, Err(ConfigError::EmptyAllowList(_))));

        let zero = Config::from_lookup(lookup(&[("AUTH_REQUIRED", "no"), ("RESUME_MAX_BYTES", "0")]));
        assert!(matches!(zero, Err(ConfigError::InvalidValue { .. })));

        let bad_bool = Config::from_lookup(lookup(&[("AUTH_REQUIRED", "maybe")]));
        assert!(matches!(bad_bool, Err(ConfigError::InvalidValue { key: "AUTH_REQUIRED", .. })));
    }
}
