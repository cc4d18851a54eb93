//! Metalsoft API credentials
//!
//! Credentials are read from the JSON file named by
//! `METALSOFT_CREDENTIALS_FILE_PATH` and, if that fails, from individual
//! environment variables. Both sources go through the same validation and the
//! endpoint is normalised to the developer API path.

use crate::error::MetalsoftError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Environment variable holding the account email
pub const USER_EMAIL_ENV: &str = "METALSOFT_USER_EMAIL";
/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "METALSOFT_API_KEY";
/// Environment variable holding the API endpoint
pub const ENDPOINT_ENV: &str = "METALSOFT_ENDPOINT";
/// Environment variable enabling request logging
pub const LOGGING_ENABLED_ENV: &str = "METALSOFT_LOGGING_ENABLED";
/// Environment variable naming a JSON credentials file
pub const CREDENTIALS_FILE_ENV: &str = "METALSOFT_CREDENTIALS_FILE_PATH";

const DEVELOPER_ENDPOINT_PATH: &str = "/api/developer/developer";
const USER_EMAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$";
const API_KEY_PATTERN: &str = r"^\d+:[0-9a-zA-Z]*$";

/// Validated credentials for the Metalsoft developer API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_email: String,
    pub api_key: String,
    /// Full developer API URL
    pub endpoint: String,
    /// Log request and response bodies
    pub logging: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_email", &self.user_email)
            .field("endpoint", &self.endpoint)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    user_email: String,
    api_key: String,
    endpoint: String,
    #[serde(default)]
    logging: bool,
}

impl Credentials {
    /// Loads credentials from the file named in the environment, falling back
    /// to the individual environment variables.
    pub fn load() -> Result<Self, MetalsoftError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::load`] with an injectable variable lookup.
    pub fn load_with<F>(lookup: F) -> Result<Self, MetalsoftError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_file = lookup(CREDENTIALS_FILE_ENV)
            .ok_or_else(|| MetalsoftError::Credentials(format!("{} is not defined", CREDENTIALS_FILE_ENV)))
            .and_then(|path| Self::from_file(path));

        match from_file {
            Ok(credentials) => {
                info!("Loaded Metalsoft credentials from file");
                Ok(credentials)
            }
            Err(e) => {
                warn!("Error getting credentials from file: {}", e);
                info!("Falling back to environment variables");
                Self::from_env_with(lookup)
            }
        }
    }

    /// Reads and validates a JSON credentials file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetalsoftError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MetalsoftError::Credentials(format!("reading credentials from file {}: {}", path.display(), e))
        })?;
        let file: CredentialsFile = serde_json::from_str(&raw)?;
        Self::validated(file.user_email, file.api_key, &file.endpoint, file.logging)
    }

    /// Reads and validates credentials from environment variables.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, MetalsoftError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| MetalsoftError::Credentials(format!("{} is not defined", key)))
        };

        let user_email = required(USER_EMAIL_ENV)?;
        validate_user_email(&user_email)?;
        let api_key = required(API_KEY_ENV)?;
        validate_api_key(&api_key)?;
        let endpoint = required(ENDPOINT_ENV)?;
        let logging = lookup(LOGGING_ENABLED_ENV).as_deref() == Some("true");

        Self::validated(user_email, api_key, &endpoint, logging)
    }

    fn validated(user_email: String, api_key: String, endpoint: &str, logging: bool) -> Result<Self, MetalsoftError> {
        validate_user_email(&user_email)?;
        validate_api_key(&api_key)?;
        let endpoint = developer_endpoint(endpoint)?;
        Ok(Self {
            user_email,
            api_key,
            endpoint,
            logging,
        })
    }
}

fn matches(pattern: &str, value: &str) -> Result<bool, MetalsoftError> {
    let re = Regex::new(pattern).map_err(|e| MetalsoftError::Credentials(format!("bad pattern {}: {}", pattern, e)))?;
    Ok(re.is_match(value))
}

/// Checks the account email format.
pub fn validate_user_email(user_email: &str) -> Result<(), MetalsoftError> {
    if !matches(USER_EMAIL_PATTERN, user_email)? {
        return Err(MetalsoftError::Credentials("user email is not valid".to_string()));
    }
    Ok(())
}

/// Checks the `<id>:<alphanumerics>` API key format.
pub fn validate_api_key(api_key: &str) -> Result<(), MetalsoftError> {
    if !matches(API_KEY_PATTERN, api_key)? {
        return Err(MetalsoftError::Credentials(
            "API key is not valid, expected <id>:<chars> with a numeric id followed by alphanumeric characters"
                .to_string(),
        ));
    }
    Ok(())
}

/// Reduces an endpoint to `https://<host>` and appends the developer API path.
pub fn developer_endpoint(endpoint: &str) -> Result<String, MetalsoftError> {
    let rest = endpoint
        .strip_prefix("https://")
        .ok_or_else(|| MetalsoftError::Credentials(format!("{} must start with https://", ENDPOINT_ENV)))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(MetalsoftError::Credentials(format!("invalid endpoint {:?}", endpoint)));
    }

    Ok(format!("https://{}{}", host, DEVELOPER_ENDPOINT_PATH))
}
