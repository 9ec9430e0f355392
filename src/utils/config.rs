use core::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::Duty;

pub const DEFAULT_PORT: u16 = 9559;
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Connection settings for one replication server.
#[derive(Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub username: String,
    /// Plain text or a secret reference such as `env://CSM_PASSWORD`.
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub call_properties: CallProperties,
    #[serde(default = "default_timeout")]
    pub timeout: DurationString,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CallProperties {
    #[serde(default = "default_language")]
    pub language: String,
    /// Validate the server certificate.
    #[serde(default)]
    pub verify: bool,
    /// Extra PEM root to trust.
    #[serde(default)]
    pub cert: Option<PathBuf>,
}

impl Default for CallProperties {
    fn default() -> Self {
        Self {
            language: default_language(),
            verify: false,
            cert: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_timeout() -> DurationString {
    DurationString::from(Duration::from_secs(60))
}

impl ServerConfig {
    pub fn new(hostname: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            port: DEFAULT_PORT,
            call_properties: CallProperties::default(),
            timeout: default_timeout(),
        }
    }

    /// `https://{hostname}:{port}/CSM/web/`
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("https://{}:{}/CSM/web/", self.hostname, self.port))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.clone().into()
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSM server {}:{}", self.hostname, self.port)
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("call_properties", &self.call_properties)
            .field("timeout", &self.timeout.to_string())
            .finish()
    }
}

/// An ordered list of duties, optionally with the server to run them against.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Playbook {
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub duties: Vec<Duty>,
}

impl Playbook {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read playbook {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("Failed to parse playbook {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let playbook: Playbook = serde_yaml::from_str(contents)?;
        Ok(playbook)
    }
}
