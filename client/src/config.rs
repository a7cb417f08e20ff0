//! Client configuration read from the environment.

use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SESSION_PATH: &str = ".chorus/voice_chat_user.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// How new rooms get their document key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoomKeys {
    /// The host's custom ID. Opening is refused if another host's room
    /// already holds that key.
    #[default]
    CustomId,
    /// A store-generated key
    Generated,
}

impl RoomKeys {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "custom-id" | "custom_id" | "customid" => Some(RoomKeys::CustomId),
            "generated" => Some(RoomKeys::Generated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Key for the HTTP identity provider
    pub api_key: Option<String>,
    pub auth_endpoint: String,
    /// File holding the saved user between runs
    pub session_path: PathBuf,
    /// Address granted admin rights at sign-up
    pub admin_email: Option<String>,
    pub room_keys: RoomKeys,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
            admin_email: None,
            room_keys: RoomKeys::default(),
        }
    }
}

impl ClientConfig {
    /// Read `CHORUS_*` variables from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name -> value lookup. Unset or empty values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.api_key = get("CHORUS_API_KEY");

        if let Some(endpoint) = get("CHORUS_AUTH_ENDPOINT") {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    var: "CHORUS_AUTH_ENDPOINT",
                    value: endpoint,
                });
            }
            config.auth_endpoint = endpoint;
        }

        if let Some(path) = get("CHORUS_SESSION_PATH") {
            config.session_path = PathBuf::from(path);
        }

        config.admin_email = get("CHORUS_ADMIN_EMAIL").map(|email| email.trim().to_lowercase());

        if let Some(keys) = get("CHORUS_ROOM_KEYS") {
            config.room_keys = RoomKeys::parse(&keys).ok_or(ConfigError::Invalid {
                var: "CHORUS_ROOM_KEYS",
                value: keys,
            })?;
        }

        Ok(config)
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}
