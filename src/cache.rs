//! Cache file codec.
//!
//! A cache file is a JSON object with exactly two fields:
//!
//! ```json
//! { "config": { ... }, "environment": { "NAME": "value" } }
//! ```
//!
//! `environment` may be `null` or empty, in which case the snapshot carries
//! no cached variables. Deferred values cannot be written; a tree holding one
//! fails to encode with the offending path.

use std::path::Path;

use tracing::info;

use crate::env::ConfigEnv;
use crate::environment::Environment;
use crate::error::{ConfigError, Result};
use crate::value::{self, Table, Value};

const CONFIG_FIELD: &str = "config";
const ENVIRONMENT_FIELD: &str = "environment";

/// Contents of a decoded cache file.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedConfig {
    pub data: Table,
    pub environment: Environment,
}

/// Serialize a tree and its environment.
pub fn encode(data: &Table, environment: &Environment) -> Result<Vec<u8>> {
    let mut config = serde_json::Map::new();
    for (key, value) in data {
        let json = value::to_json(value, key).map_err(|e| ConfigError::CacheEncode {
            path: e.path,
            reason: e.reason,
        })?;
        config.insert(key.clone(), json);
    }

    let vars: serde_json::Map<String, serde_json::Value> = environment
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();

    let mut root = serde_json::Map::new();
    root.insert(CONFIG_FIELD.to_string(), serde_json::Value::Object(config));
    root.insert(ENVIRONMENT_FIELD.to_string(), serde_json::Value::Object(vars));

    serde_json::to_vec_pretty(&serde_json::Value::Object(root)).map_err(|e| {
        ConfigError::CacheEncode {
            path: String::new(),
            reason: e.to_string(),
        }
    })
}

/// Parse cache bytes. `location` names the cache in error messages.
pub fn decode(bytes: &[u8], location: &str) -> Result<CachedConfig> {
    let error = |message: String| ConfigError::CacheDecode {
        location: location.to_string(),
        message,
    };

    let root: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| error(e.to_string()))?;
    let serde_json::Value::Object(mut root) = root else {
        return Err(error("expected an object at the root".to_string()));
    };

    if let Some(extra) = root
        .keys()
        .find(|k| *k != CONFIG_FIELD && *k != ENVIRONMENT_FIELD)
    {
        return Err(error(format!("unexpected field '{}'", extra)));
    }

    let data = match root.remove(CONFIG_FIELD) {
        Some(serde_json::Value::Object(config)) => config
            .into_iter()
            .map(|(k, v)| (k, value::from_json(v)))
            .collect(),
        Some(other) => {
            return Err(error(format!(
                "'{}' must be an object, found {}",
                CONFIG_FIELD,
                value::from_json(other).type_name()
            )))
        }
        None => return Err(error(format!("missing '{}' field", CONFIG_FIELD))),
    };

    let environment = match root.remove(ENVIRONMENT_FIELD) {
        None => return Err(error(format!("missing '{}' field", ENVIRONMENT_FIELD))),
        Some(serde_json::Value::Null) => Environment::empty(),
        Some(serde_json::Value::Object(vars)) => vars
            .into_iter()
            .map(|(name, v)| env_string(&name, v).map(|v| (name, v)))
            .collect::<std::result::Result<Environment, String>>()
            .map_err(error)?,
        Some(other) => {
            return Err(error(format!(
                "'{}' must be an object or null, found {}",
                ENVIRONMENT_FIELD,
                value::from_json(other).type_name()
            )))
        }
    };

    Ok(CachedConfig { data, environment })
}

/// Scalars are stored as their string form; anything else is rejected.
fn env_string(name: &str, value: serde_json::Value) -> std::result::Result<String, String> {
    match value::from_json(value) {
        Value::String(s) => Ok(s),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!(
            "environment variable '{}' must be a scalar, found {}",
            name,
            other.type_name()
        )),
    }
}

/// Read and decode the cache file at `path`.
///
/// A missing or unreadable file is a decode error like any other.
pub fn load(env: &dyn ConfigEnv, path: &Path) -> Result<CachedConfig> {
    let location = path.display().to_string();
    let content = env
        .read_file(path)
        .map_err(|e| ConfigError::CacheDecode {
            location: location.clone(),
            message: e.to_string(),
        })?;
    decode(content.as_bytes(), &location)
}

/// Encode and write a cache file.
pub fn store(
    env: &dyn ConfigEnv,
    path: &Path,
    data: &Table,
    environment: &Environment,
) -> Result<()> {
    let bytes = encode(data, environment)?;
    env.write_file(path, &bytes)
        .map_err(|e| ConfigError::CacheWrite {
            location: path.display().to_string(),
            message: e.to_string(),
        })?;
    info!(
        path = %path.display(),
        keys = data.len(),
        variables = environment.len(),
        "configuration cache written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MockEnv;
    use crate::table;

    fn environment() -> Environment {
        [("DB_PASSWORD", "secret"), ("MODE", "prod")].into_iter().collect()
    }

    #[test]
    fn test_round_trip() {
        let data = table! {
            "db" => table! { "host" => "localhost", "port" => 5432, "ratio" => 0.75 },
            "features" => vec!["a", "b"],
            "flag" => true,
            "nothing" => Value::Null,
            "whole" => 2.0,
        };
        let bytes = encode(&data, &environment()).unwrap();
        let decoded = decode(&bytes, "cache.json").unwrap();

        assert_eq!(decoded.data, data);
        assert_eq!(decoded.environment, environment());
        assert_eq!(decoded.data.get("whole"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn test_encode_rejects_deferred_value() {
        let data = table! {
            "ok" => 1,
            "services" => table! { "db" => Value::deferred(|_| Value::Null) },
        };
        let err = encode(&data, &Environment::empty()).unwrap_err();
        match err {
            ConfigError::CacheEncode { path, .. } => assert_eq!(path, "services.db"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_rejects_non_finite_float() {
        let data = table! { "ratio" => f64::INFINITY };
        assert!(matches!(
            encode(&data, &Environment::empty()),
            Err(ConfigError::CacheEncode { .. })
        ));
    }

    #[test]
    fn test_decode_null_environment() {
        let decoded = decode(br#"{"config": {"a": 1}, "environment": null}"#, "c").unwrap();
        assert!(decoded.environment.is_empty());
        assert_eq!(decoded.data, table! { "a" => 1 });
    }

    #[test]
    fn test_decode_stringifies_scalar_environment() {
        let decoded = decode(
            br#"{"config": {}, "environment": {"PORT": 8080, "DEBUG": true}}"#,
            "c",
        )
        .unwrap();
        assert_eq!(decoded.environment.get("PORT"), Some("8080"));
        assert_eq!(decoded.environment.get("DEBUG"), Some("true"));
    }

    #[test]
    fn test_decode_rejects_malformed_structure() {
        let cases: &[&[u8]] = &[
            b"not json",
            b"[]",
            br#"{"config": {}}"#,
            br#"{"environment": {}}"#,
            br#"{"config": [], "environment": {}}"#,
            br#"{"config": {}, "environment": []}"#,
            br#"{"config": {}, "environment": {"A": [1]}}"#,
            br#"{"config": {}, "environment": {}, "extra": 1}"#,
        ];
        for bytes in cases {
            let err = decode(bytes, "cache.json").unwrap_err();
            assert!(
                matches!(err, ConfigError::CacheDecode { .. }),
                "expected decode error for {:?}",
                String::from_utf8_lossy(bytes)
            );
        }
    }

    #[test]
    fn test_load_missing_file_is_decode_error() {
        let env = MockEnv::new();
        let err = load(&env, Path::new("cache/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::CacheDecode { .. }));
    }

    #[test]
    fn test_store_then_load() {
        let env = MockEnv::new();
        let data = table! { "a" => table! { "b" => "c" } };
        store(&env, Path::new("cache/config.json"), &data, &environment()).unwrap();

        let cached = load(&env, Path::new("cache/config.json")).unwrap();
        assert_eq!(cached.data, data);
        assert_eq!(cached.environment.get("MODE"), Some("prod"));
    }

    #[test]
    fn test_store_write_failure() {
        let env = MockEnv::new().with_unreadable_file("locked.json");
        let err = store(&env, Path::new("locked.json"), &Table::new(), &Environment::empty())
            .unwrap_err();
        assert!(matches!(err, ConfigError::CacheWrite { .. }));
    }
}
