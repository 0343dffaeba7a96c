//! Configuration validation.

use std::collections::HashSet;

use super::{Config, Credential, JobConfig, WriteMode};
use crate::drivers::SslMode;
use crate::error::{LoadError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.jobs.is_empty() {
        return Err(LoadError::Config("at least one job is required".into()));
    }

    let mut seen = HashSet::new();
    for job in &config.jobs {
        if job.name.trim().is_empty() {
            return Err(LoadError::Config("job name is required".into()));
        }
        // Disabled jobs may be half-written; they are never run.
        if job.enabled {
            validate_job(job)?;
        }
        if !seen.insert(job.name.as_str()) {
            return Err(LoadError::Config(format!(
                "job name '{}' is defined more than once",
                job.name
            )));
        }
    }

    let settings = &config.settings;
    if settings.workers == 0 {
        return Err(LoadError::Config(
            "settings.workers must be at least 1".into(),
        ));
    }
    if settings.channel_capacity == 0 {
        return Err(LoadError::Config(
            "settings.channel_capacity must be at least 1".into(),
        ));
    }
    if settings.operation_timeout_secs == 0 {
        return Err(LoadError::Config(
            "settings.operation_timeout_secs must be at least 1".into(),
        ));
    }
    if settings.connect_timeout_secs == 0 {
        return Err(LoadError::Config(
            "settings.connect_timeout_secs must be at least 1".into(),
        ));
    }

    Ok(())
}

/// Validate a single job.
pub fn validate_job(job: &JobConfig) -> Result<()> {
    if job.name.trim().is_empty() {
        return Err(LoadError::Config("job name is required".into()));
    }
    if WriteMode::resolve(job.write_operation.as_deref()).is_none() {
        return Err(LoadError::InvalidWriteMode {
            job: job.name.clone(),
            operation: job.write_operation.clone().unwrap_or_default(),
        });
    }
    if job.source_type.trim().is_empty() {
        return Err(LoadError::Config(format!(
            "jobs.{}.source_type is required",
            job.name
        )));
    }
    validate_credential(&job.name, "source", &job.source)?;
    validate_credential(&job.name, "destination", &job.destination)?;

    if let Some(columns) = &job.source.columns {
        if columns.is_empty() || columns.iter().any(|c| c.trim().is_empty()) {
            return Err(LoadError::Config(format!(
                "jobs.{}.source.columns must list non-empty column names",
                job.name
            )));
        }
    }

    Ok(())
}

fn validate_credential(job: &str, side: &str, cred: &Credential) -> Result<()> {
    if cred.host.is_empty() {
        return Err(LoadError::Config(format!("jobs.{job}.{side}.host is required")));
    }
    if cred.database.is_empty() {
        return Err(LoadError::Config(format!(
            "jobs.{job}.{side}.database is required"
        )));
    }
    if cred.table.is_empty() {
        return Err(LoadError::Config(format!("jobs.{job}.{side}.table is required")));
    }
    cred.text_encoding()?;
    SslMode::parse(&cred.ssl_mode)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn credential(table: &str) -> Credential {
        Credential {
            name: String::new(),
            host: "localhost".to_string(),
            port: None,
            username: "loader".to_string(),
            password: "password".to_string(),
            database: "app".to_string(),
            table: table.to_string(),
            columns: None,
            encoding: None,
            ssl_mode: "disable".to_string(),
        }
    }

    fn valid_config() -> Config {
        Config {
            jobs: vec![JobConfig {
                name: "users".to_string(),
                description: "Copy users".to_string(),
                condition: None,
                enabled: true,
                write_operation: Some("upsert".to_string()),
                source_type: "mysql".to_string(),
                source: credential("users"),
                destination: credential("users"),
            }],
            settings: Settings::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_no_jobs() {
        let mut config = valid_config();
        config.jobs.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_job_names() {
        let mut config = valid_config();
        let dup = config.jobs[0].clone();
        config.jobs.push(dup);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_write_mode() {
        let mut config = valid_config();
        config.jobs[0].write_operation = Some("merge".to_string());
        assert!(matches!(
            validate(&config),
            Err(LoadError::InvalidWriteMode { .. })
        ));
    }

    #[test]
    fn test_empty_write_mode_is_valid() {
        let mut config = valid_config();
        config.jobs[0].write_operation = Some(String::new());
        assert!(validate(&config).is_ok());
        config.jobs[0].write_operation = None;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_disabled_job_is_not_checked() {
        let mut config = valid_config();
        config.jobs[0].enabled = false;
        config.jobs[0].write_operation = Some("merge".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_destination_table() {
        let mut config = valid_config();
        config.jobs[0].destination.table = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.jobs[0].source.host = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_encoding() {
        let mut config = valid_config();
        config.jobs[0].source.encoding = Some("klingon".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_ssl_mode() {
        let mut config = valid_config();
        config.jobs[0].source.ssl_mode = "sometimes".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_column_projection() {
        let mut config = valid_config();
        config.jobs[0].source.columns = Some(vec![]);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_workers() {
        let mut config = valid_config();
        config.settings.workers = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let mut config = valid_config();
        config.jobs[0].source.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.jobs[0].source);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }
}
