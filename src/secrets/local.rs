//! Resolvers for secrets kept on the machine running the duties.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::env;

use super::SecretResolver;

/// `env://CSM_PASSWORD`
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretResolver;

/// `file:///run/secrets/csm_password`. Trailing newlines are stripped.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSecretResolver;

fn non_empty(value: String, reference: &str) -> Result<String> {
    if value.is_empty() {
        return Err(anyhow!("Secret '{}' is empty", reference));
    }
    Ok(value)
}

#[async_trait]
impl SecretResolver for EnvSecretResolver {
    fn scheme(&self) -> &str {
        "env"
    }

    async fn resolve(&self, reference: &str) -> Result<String> {
        let value = env::var(reference).map_err(|_| anyhow!("Environment variable '{}' not found", reference))?;
        non_empty(value, reference)
    }
}

#[async_trait]
impl SecretResolver for FileSecretResolver {
    fn scheme(&self) -> &str {
        "file"
    }

    async fn resolve(&self, reference: &str) -> Result<String> {
        let contents = tokio::fs::read_to_string(reference)
            .await
            .with_context(|| format!("Failed to read secret file '{}'", reference))?;
        non_empty(contents.trim_end_matches(['\r', '\n']).to_string(), reference)
    }
}
