//! Configuration file loading and parsing.

use crate::env::{vars, EnvError, Environment, Lookup};
use crate::types::{TimestampUnit, TracelyConfig, TracelySettings};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Configuration loader.
pub struct ConfigLoader {
    config_path: PathBuf,
    required: bool,
}

impl ConfigLoader {
    /// Create a loader for `.tracely/config.yaml` under the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            config_path: project_dir.as_ref().join(".tracely/config.yaml"),
            required: false,
        }
    }

    /// Create a loader for an explicit file, which must exist.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    /// Path the loader reads from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration, apply environment overrides and validate.
    pub fn load(&self) -> Result<TracelySettings, ConfigError> {
        let mut settings = if self.config_path.exists() {
            let contents = std::fs::read_to_string(&self.config_path)?;
            let expanded = expand_env_vars(&contents)?;

            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        } else if self.required {
            return Err(ConfigError::NotFound {
                path: self.config_path.clone(),
            });
        } else {
            TracelySettings::default()
        };

        apply_env_overrides(&mut settings)?;
        validate(&settings)?;
        Ok(settings)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
        .map_err(|e| ConfigError::invalid(e.to_string()))?;
    let mut result = content.to_string();

    for cap in re.captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match (Environment::get(var_name), default) {
            (Some(v), _) => v,
            (None, Some(d)) => d.to_string(),
            (None, None) => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                })
            }
        };

        result = result.replace(full_match, &value);
    }

    Ok(result)
}

/// Overlay `TRACELY_*` environment variables onto loaded settings.
pub fn apply_env_overrides(settings: &mut TracelySettings) -> Result<(), ConfigError> {
    apply_overrides_from(&Environment::process, settings)
}

/// Overlay `TRACELY_*` variables read through `lookup`.
pub fn apply_overrides_from(lookup: Lookup<'_>, settings: &mut TracelySettings) -> Result<(), ConfigError> {
    let get = |var: &str| Environment::get_in(lookup, var);

    if let Some(app_id) = get(vars::TRACELY_APP_ID) {
        settings.sdk.app_id = app_id;
    }
    if let Some(secret) = get(vars::TRACELY_APP_SECRET) {
        settings.sdk.app_secret = secret.into();
    }
    if let Some(host) = get(vars::TRACELY_HOST) {
        settings.sdk.host = host;
    }
    if let Some(unit) = get(vars::TRACELY_TIMESTAMP_UNIT) {
        settings.sdk.timestamp_unit = TimestampUnit::parse(&unit).ok_or_else(|| {
            ConfigError::invalid(format!(
                "{} must be 'millis' or 'seconds', got '{}'",
                vars::TRACELY_TIMESTAMP_UNIT,
                unit
            ))
        })?;
    }
    if let Some(timeout_ms) = Environment::get_int_in(lookup, vars::TRACELY_TIMEOUT_MS)? {
        settings.transport.timeout_ms = timeout_ms;
    }
    if let Some(capture_panics) = Environment::get_bool_in(lookup, vars::TRACELY_CAPTURE_PANICS) {
        settings.capture.capture_panics = capture_panics;
    }
    if let Some(url) = get(vars::TRACELY_DASHBOARD_URL) {
        settings.dashboard.base_url = url;
    }
    if let Some(dir) = get(vars::TRACELY_DATA_DIR) {
        settings.dashboard.data_dir = Some(PathBuf::from(dir));
    }
    Ok(())
}

/// Validate structural settings. Credentials are checked separately by
/// [`validate_sdk`] since dashboard-only use does not need them.
pub fn validate(settings: &TracelySettings) -> Result<(), ConfigError> {
    if !settings.sdk.host.is_empty() {
        validate_http_url("sdk.host", &settings.sdk.host)?;
    }
    validate_http_url("dashboard.base_url", &settings.dashboard.base_url)?;

    if settings.transport.queue_capacity == 0 {
        return Err(ConfigError::invalid(
            "transport.queue_capacity must be greater than 0",
        ));
    }
    if settings.transport.max_attempts == 0 {
        return Err(ConfigError::invalid(
            "transport.max_attempts must be greater than 0",
        ));
    }
    if settings.transport.timeout_ms == 0 {
        return Err(ConfigError::invalid(
            "transport.timeout_ms must be greater than 0",
        ));
    }
    if settings.capture.throttle_window_ms == 0 {
        return Err(ConfigError::invalid(
            "capture.throttle_window_ms must be greater than 0",
        ));
    }
    if settings.capture.fingerprint_max_chars == 0 {
        return Err(ConfigError::invalid(
            "capture.fingerprint_max_chars must be greater than 0",
        ));
    }
    Ok(())
}

/// Validate the reporting credentials.
pub fn validate_sdk(config: &TracelyConfig) -> Result<(), ConfigError> {
    if config.app_id.trim().is_empty() {
        return Err(ConfigError::invalid("sdk.app_id must be set"));
    }
    if config.app_secret.is_empty() {
        return Err(ConfigError::invalid("sdk.app_secret must be set"));
    }
    if config.host.trim().is_empty() {
        return Err(ConfigError::invalid("sdk.host must be set"));
    }
    validate_http_url("sdk.host", &config.host)
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::invalid(format!(
            "{field} must use http or https, got '{}'",
            url.scheme()
        ))),
        Err(e) => Err(ConfigError::invalid(format!(
            "{field} is not a valid URL: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &Path, content: &str) {
        let tracely_dir = dir.join(".tracely");
        fs::create_dir_all(&tracely_dir).unwrap();
        fs::write(tracely_dir.join("config.yaml"), content).unwrap();
    }

    #[test]
    fn test_load_defaults_when_no_file() {
        let dir = tempdir().unwrap();
        let settings = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(settings.transport.queue_capacity, 100);
        assert_eq!(settings.capture.throttle_window_ms, 60_000);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempdir().unwrap();
        let result = ConfigLoader::from_file(dir.path().join("missing.yaml")).load();
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_config_from_yaml_file() {
        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
sdk:
  app_id: my-app-id
  app_secret: my-app-secret
  host: http://localhost:3001
  timestamp_unit: seconds
transport:
  max_attempts: 3
capture:
  throttle_window_ms: 30000
"#,
        );

        let settings = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(settings.sdk.app_id, "my-app-id");
        assert_eq!(settings.sdk.app_secret.expose(), "my-app-secret");
        assert_eq!(settings.sdk.timestamp_unit, TimestampUnit::Seconds);
        assert_eq!(settings.transport.max_attempts, 3);
        assert_eq!(settings.capture.throttle_window_ms, 30_000);

        // Unspecified values keep defaults
        assert_eq!(settings.transport.timeout_ms, 5_000);
        assert!(settings.capture.capture_panics);
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("TRACELY_TEST_EXPAND", "test_value");
        let result = expand_env_vars("key: ${TRACELY_TEST_EXPAND}").unwrap();
        assert_eq!(result, "key: test_value");
        std::env::remove_var("TRACELY_TEST_EXPAND");
    }

    #[test]
    fn test_env_var_default() {
        let result = expand_env_vars("key: ${TRACELY_TEST_NONEXISTENT:-default}").unwrap();
        assert_eq!(result, "key: default");
    }

    #[test]
    fn test_env_var_missing_error() {
        match expand_env_vars("key: ${TRACELY_TEST_MISSING_VAR}") {
            Err(ConfigError::EnvVarNotFound { var }) => {
                assert_eq!(var, "TRACELY_TEST_MISSING_VAR")
            }
            other => panic!("Expected EnvVarNotFound error, got {:?}", other),
        }
    }

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |var| {
            pairs
                .iter()
                .find(|(name, _)| *name == var)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_env_overrides_numeric_and_bool() {
        let mut settings = TracelySettings::default();
        apply_overrides_from(
            &lookup(&[(vars::TRACELY_TIMEOUT_MS, "250"), (vars::TRACELY_CAPTURE_PANICS, "false")]),
            &mut settings,
        )
        .unwrap();

        assert_eq!(settings.transport.timeout_ms, 250);
        assert!(!settings.capture.capture_panics);
    }

    #[test]
    fn test_env_overrides_credentials_and_unit() {
        let mut settings = TracelySettings::default();
        apply_overrides_from(
            &lookup(&[
                (vars::TRACELY_APP_ID, "a1"),
                (vars::TRACELY_APP_SECRET, "s1"),
                (vars::TRACELY_HOST, "http://collector:3001"),
                (vars::TRACELY_TIMESTAMP_UNIT, "seconds"),
                (vars::TRACELY_DATA_DIR, ""),
            ]),
            &mut settings,
        )
        .unwrap();

        assert_eq!(settings.sdk.app_id, "a1");
        assert_eq!(settings.sdk.app_secret.expose(), "s1");
        assert_eq!(settings.sdk.host, "http://collector:3001");
        assert_eq!(settings.sdk.timestamp_unit, TimestampUnit::Seconds);
        assert_eq!(settings.dashboard.data_dir, None);
    }

    #[test]
    fn test_env_override_rejects_bad_values() {
        let mut settings = TracelySettings::default();
        let result = apply_overrides_from(&lookup(&[(vars::TRACELY_TIMEOUT_MS, "soon")]), &mut settings);
        assert!(matches!(result, Err(ConfigError::Env(EnvError::InvalidValue { .. }))));

        let result = apply_overrides_from(&lookup(&[(vars::TRACELY_TIMESTAMP_UNIT, "hours")]), &mut settings);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_validation_rejects_zero_queue() {
        let mut settings = TracelySettings::default();
        settings.transport.queue_capacity = 0;
        match validate(&settings) {
            Err(ConfigError::ValidationError { message }) => {
                assert!(message.contains("queue_capacity"))
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_non_http_host() {
        let mut settings = TracelySettings::default();
        settings.sdk.host = "ftp://collector".to_string();
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_validate_sdk_requires_credentials() {
        let config = TracelyConfig::new("a1", "", "http://h");
        assert!(validate_sdk(&config).is_err());

        let config = TracelyConfig::new("a1", "s1", "http://h");
        assert!(validate_sdk(&config).is_ok());
    }

    #[test]
    fn test_parse_error_with_line_number() {
        let dir = tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
sdk:
  app_id: a1
  invalid_yaml: [unclosed
"#,
        );

        match ConfigLoader::new(dir.path()).load() {
            Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
            other => panic!("Expected ParseError with line number, got {:?}", other),
        }
    }
}
