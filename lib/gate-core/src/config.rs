//! Gate configuration, loaded once at startup

use crate::{GateError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable holding the expected client certificate CN.
pub const EXPECTED_CN_ENV: &str = "GATEWAY_EXPECTED_CN";
/// Environment variable toggling client certificate enforcement.
pub const CERT_CHECK_ENABLED_ENV: &str = "GATEWAY_CERT_CHECK_ENABLED";

/// Immutable, process-wide configuration for the client-certificate gate.
///
/// Loaded once at startup and shared read-only by all concurrent gate
/// invocations, so no locking is needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Common name the client certificate subject must carry.
    pub expected_common_name: String,
    /// Whether certificate enforcement is active at all. When false,
    /// every request is admitted without inspecting any certificate.
    pub certificate_check_enabled: bool,
}

impl ValidationConfig {
    /// Create a new validation configuration.
    pub fn new(expected_common_name: impl Into<String>, certificate_check_enabled: bool) -> Self {
        Self {
            expected_common_name: expected_common_name.into(),
            certificate_check_enabled,
        }
    }

    /// Load the gate configuration from environment variables.
    ///
    /// `GATEWAY_CERT_CHECK_ENABLED` accepts `true`/`false`/`1`/`0`
    /// (case-insensitive) and defaults to disabled when unset. An
    /// enabled gate requires a non-empty `GATEWAY_EXPECTED_CN`.
    pub fn from_env() -> Result<Self> {
        Self::from_raw(
            std::env::var(CERT_CHECK_ENABLED_ENV).ok().as_deref(),
            std::env::var(EXPECTED_CN_ENV).ok().as_deref(),
        )
    }

    /// Build the configuration from raw (unparsed) variable values.
    fn from_raw(enabled_raw: Option<&str>, expected_cn_raw: Option<&str>) -> Result<Self> {
        let enabled = match enabled_raw {
            Some(value) => parse_bool(value).ok_or_else(|| {
                GateError::InvalidConfiguration(format!(
                    "{} must be true/false/1/0, got '{}'",
                    CERT_CHECK_ENABLED_ENV, value
                ))
            })?,
            None => false,
        };

        let expected_common_name = expected_cn_raw.unwrap_or_default().to_string();

        if enabled && expected_common_name.is_empty() {
            return Err(GateError::InvalidConfiguration(format!(
                "{} must be set when {} is enabled",
                EXPECTED_CN_ENV, CERT_CHECK_ENABLED_ENV
            )));
        }

        debug!(
            "Gate configuration loaded (enabled: {}, expected CN: '{}')",
            enabled, expected_common_name
        );

        Ok(Self {
            expected_common_name,
            certificate_check_enabled: enabled,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = ValidationConfig::new("gateway-1", true);
        assert_eq!(config.expected_common_name, "gateway-1");
        assert!(config.certificate_check_enabled);
    }

    #[test]
    fn test_config_disabled() {
        let config = ValidationConfig::new("", false);
        assert!(!config.certificate_check_enabled);
    }

    #[test]
    fn test_parse_bool_accepted_forms() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(" no "), Some(false));
        assert_eq!(parse_bool("enabled"), None);
    }

    #[test]
    fn test_from_raw_enabled_with_cn() {
        let config = ValidationConfig::from_raw(Some("true"), Some("gateway-1")).unwrap();
        assert!(config.certificate_check_enabled);
        assert_eq!(config.expected_common_name, "gateway-1");
    }

    #[test]
    fn test_from_raw_defaults_to_disabled() {
        let config = ValidationConfig::from_raw(None, None).unwrap();
        assert!(!config.certificate_check_enabled);
        assert_eq!(config.expected_common_name, "");
    }

    #[test]
    fn test_from_raw_rejects_invalid_toggle() {
        let err = ValidationConfig::from_raw(Some("enabled"), Some("gateway-1")).unwrap_err();
        assert!(matches!(err, GateError::InvalidConfiguration(_)));
        assert!(err.to_string().contains(CERT_CHECK_ENABLED_ENV));
    }

    #[test]
    fn test_from_raw_enabled_requires_common_name() {
        let err = ValidationConfig::from_raw(Some("true"), None).unwrap_err();
        assert!(matches!(err, GateError::InvalidConfiguration(_)));
        assert!(err.to_string().contains(EXPECTED_CN_ENV));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ValidationConfig::new("gateway-1", true);
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: ValidationConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, config);
    }
}
