//! Application configuration for the calflow server.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `CALFLOW_`:
/// - `CALFLOW_HOST`: Server bind address (default: "0.0.0.0")
/// - `CALFLOW_PORT`: Server port (default: 5544)
/// - `CALFLOW_IDENTITY_API_KEY`: Identity-provider credential (required)
/// - `CALFLOW_IDENTITY_BASE_URL`: Identity-provider endpoint (defaulted)
///
/// The identity credential has no default; without it the process
/// refuses to start.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Identity-provider API key used to verify bearer tokens
    pub identity_api_key: String,

    /// Identity-provider base URL
    #[serde(default = "default_identity_base_url")]
    pub identity_base_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5544
}

fn default_identity_base_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `CALFLOW_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("CALFLOW_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_when_fields_missing() {
        let config: AppConfig =
            serde_json::from_str(r#"{"identity_api_key": "k"}"#).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5544);
        assert_eq!(config.bind_address(), "0.0.0.0:5544");
    }

    #[test]
    fn test_identity_key_required() {
        let result = serde_json::from_str::<AppConfig>("{}");
        assert!(result.is_err());
    }
}
