//! Process settings read from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SCHEMA: &str = "faceplay";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub bind: String,
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    /// Schema holding one table per collection.
    pub schema: String,
    pub max_connections: u32,
    pub body_limit: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let bind = get("FACEPLAY_BIND").unwrap_or_else(|| format!("0.0.0.0:{}", port));

        let database_url = get("DATABASE_URL");
        let backend = match get("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            Some(ref b) if b == "memory" => StoreBackend::Memory,
            Some(ref b) if b == "postgres" => StoreBackend::Postgres,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    value: other,
                })
            }
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let schema = get("FACEPLAY_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        if !is_plain_identifier(&schema) {
            return Err(ConfigError::Invalid {
                var: "FACEPLAY_SCHEMA",
                value: schema,
            });
        }

        Ok(Settings {
            bind,
            backend,
            database_url,
            schema,
            max_connections: parse_or(get("FACEPLAY_MAX_CONNECTIONS"), "FACEPLAY_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            body_limit: parse_or(get("FACEPLAY_BODY_LIMIT"), "FACEPLAY_BODY_LIMIT", DEFAULT_BODY_LIMIT)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_to_memory() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.backend, StoreBackend::Memory);
        assert_eq!(s.bind, "0.0.0.0:3000");
        assert_eq!(s.schema, "faceplay");
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.body_limit, 1024 * 1024);
    }

    #[test]
    fn database_url_selects_postgres() {
        let s = settings(&[("DATABASE_URL", "postgres://localhost/faceplay"), ("PORT", "8080")]).unwrap();
        assert_eq!(s.backend, StoreBackend::Postgres);
        assert_eq!(s.bind, "0.0.0.0:8080");
        let s = settings(&[("DATABASE_URL", "postgres://localhost/x"), ("STORE_BACKEND", "memory")]).unwrap();
        assert_eq!(s.backend, StoreBackend::Memory);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(settings(&[("STORE_BACKEND", "postgres")]), Err(ConfigError::Missing("DATABASE_URL"))));
        assert!(matches!(settings(&[("STORE_BACKEND", "mongo")]), Err(ConfigError::Invalid { var: "STORE_BACKEND", .. })));
        assert!(matches!(settings(&[("PORT", "http")]), Err(ConfigError::Invalid { var: "PORT", .. })));
        assert!(matches!(settings(&[("FACEPLAY_SCHEMA", "a; drop")]), Err(ConfigError::Invalid { var: "FACEPLAY_SCHEMA", .. })));
    }
}
