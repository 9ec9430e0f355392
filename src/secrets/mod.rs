pub mod local;

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

use crate::utils::ServerConfig;

pub use local::{EnvSecretResolver, FileSecretResolver};

#[async_trait]
pub trait SecretResolver: Send + Sync {
    fn scheme(&self) -> &str;

    async fn resolve(&self, reference: &str) -> Result<String>;
}

/// Turns credential references such as `env://CSM_PASSWORD` into values.
/// A value without a registered scheme is used as written.
#[derive(Default)]
pub struct SecretManager {
    resolvers: HashMap<String, Box<dyn SecretResolver>>,
}

impl SecretManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_resolvers() -> Self {
        let mut manager = Self::new();
        manager.register_resolver(Box::new(EnvSecretResolver));
        manager.register_resolver(Box::new(FileSecretResolver));
        manager
    }

    /// A later resolver for the same scheme replaces the earlier one.
    pub fn register_resolver(&mut self, resolver: Box<dyn SecretResolver>) {
        self.resolvers.insert(resolver.scheme().to_string(), resolver);
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        schemes.sort();
        schemes
    }

    pub async fn resolve(&self, reference: &str) -> Result<String> {
        let Some((scheme, path)) = reference.split_once("://") else {
            return Ok(reference.to_string());
        };

        let Some(resolver) = self.resolvers.get(scheme) else {
            debug!("No resolver for '{}://'; using the value as written", scheme);
            return Ok(reference.to_string());
        };
        debug!("Resolving {}:// secret", scheme);
        resolver.resolve(path).await
    }

    /// Resolves the login of `config` in place.
    pub async fn resolve_server_credentials(&self, config: &mut ServerConfig) -> Result<()> {
        config.username = self
            .resolve(&config.username)
            .await
            .context("Failed to resolve CSM username")?;
        config.password = self
            .resolve(&config.password)
            .await
            .context("Failed to resolve CSM password")?;
        Ok(())
    }
}
