use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    // Bounds and the extension pattern are enforced by the schema; it cannot
    // express case-insensitive uniqueness.
    let mut seen = std::collections::HashSet::new();
    for ext in &config.accepted_extensions {
        if !seen.insert(ext.to_ascii_lowercase()) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate accepted extension '{}'", ext),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.upload_directory, "/tmp/uploads");
        assert_eq!(config.work_directory, "/tmp/m2m");
        assert!(config.database_path.is_none());
        assert!(config.max_concurrent_jobs >= 1);
        assert_eq!(config.accepted_extensions, vec!["mp3", "wav"]);
        assert_eq!(config.transcriber.program, "transkun");
        assert_eq!(config.renderer.program, "fluidsynth");
        assert_eq!(
            config.renderer.soundbank,
            "/usr/share/sounds/sf2/FluidR3_GM.sf2"
        );
        assert_eq!(config.renderer.sample_rate, 44100);
        assert_eq!(config.renderer.eta_seconds, 15);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.server.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_zero_upload_limit_rejected() {
        let result = load_config_from_str(r#"{ "server": { "max_upload_bytes": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "upload_directory": "/srv/m2m/uploads",
            "work_directory": "/srv/m2m/work",
            "database_path": "/srv/m2m/jobs.db",
            "max_concurrent_jobs": 2,
            "accepted_extensions": ["mp3", "wav", "flac"],
            "transcriber": { "program": "/opt/bin/transkun" },
            "renderer": {
                "program": "/opt/bin/fluidsynth",
                "soundbank": "/opt/sf2/piano.sf2",
                "sample_rate": 48000,
                "eta_seconds": 30
            },
            "server": { "addr": "127.0.0.1", "port": 9000, "max_upload_bytes": 1048576 },
            "logging": { "filter": "m2m=debug", "format": "json" }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.database_path.as_deref(), Some("/srv/m2m/jobs.db"));
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.accepted_extensions.len(), 3);
        assert_eq!(config.renderer.sample_rate, 48000);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_upload_bytes, 1_048_576);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_unknown_field_rejected_by_schema() {
        let result = load_config_from_str(r#"{ "workers": 4 }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let result = load_config_from_str(r#"{ "renderer": { "sample_rate": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_empty_extension_list_rejected() {
        let result = load_config_from_str(r#"{ "accepted_extensions": [] }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let result = load_config_from_str(r#"{ "accepted_extensions": [".wav"] }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let result = load_config_from_str(r#"{ "accepted_extensions": ["wav", "WAV"] }"#);
        match result {
            Err(ConfigError::Validation { message }) => assert!(message.contains("WAV")),
            other => panic!("expected duplicate extension error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_malformed_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/m2m.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m2m.json");
        std::fs::write(&path, r#"{ "max_concurrent_jobs": 3 }"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.max_concurrent_jobs, 3);
    }
}
