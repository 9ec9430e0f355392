use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value as JsonValue};

use crate::utils::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "csmctl")]
#[command(about = "Declarative automation for Copy Services Manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub server: ServerArgs,
}

/// Connection flags. Each overrides the matching field of a playbook's
/// `server` section.
#[derive(Args, Debug, Default, Clone)]
pub struct ServerArgs {
    #[arg(long, global = true, env = "CSM_HOSTNAME")]
    pub hostname: Option<String>,

    #[arg(long, global = true, env = "CSM_USERNAME")]
    pub username: Option<String>,

    #[arg(long, global = true, env = "CSM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, global = true, env = "CSM_PORT")]
    pub port: Option<u16>,

    /// Validate the server certificate.
    #[arg(long, global = true)]
    pub verify: bool,

    /// PEM file with an extra trusted root.
    #[arg(long, global = true)]
    pub cert: Option<PathBuf>,

    #[arg(long, global = true)]
    pub language: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every duty of a playbook in order.
    Apply {
        playbook: PathBuf,

        /// Only validate the duties.
        #[arg(long)]
        check: bool,
    },
    /// Run a single module.
    Run {
        module: String,

        /// Module parameter, repeatable. Values are read as YAML scalars.
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, JsonValue)>,

        /// Parameters as a JSON object, merged under the --param values.
        #[arg(long)]
        params_json: Option<String>,
    },
    /// List available modules.
    Modules,
}

pub fn parse_key_val(s: &str) -> Result<(String, JsonValue)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid KEY=value: no '=' found in '{}'", s))?;
    let value: JsonValue = serde_yaml::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// `--params-json` first, then each `--param` on top.
pub fn build_params(params: &[(String, JsonValue)], params_json: Option<&str>) -> Result<JsonValue> {
    let mut merged: Map<String, JsonValue> = match params_json {
        Some(json) => serde_json::from_str(json).context("--params-json must be a JSON object")?,
        None => Map::new(),
    };

    for (key, value) in params {
        merged.insert(key.clone(), value.clone());
    }

    Ok(JsonValue::Object(merged))
}

impl ServerArgs {
    /// Applies the flags on top of `base`, or builds a config from the flags
    /// alone when there is no base.
    pub fn merge_into(&self, base: Option<ServerConfig>) -> Result<ServerConfig> {
        let mut config = match base {
            Some(config) => config,
            None => ServerConfig::new(
                self.hostname.clone().context("hostname is required (--hostname or CSM_HOSTNAME)")?,
                self.username.clone().context("username is required (--username or CSM_USERNAME)")?,
                self.password.clone().context("password is required (--password or CSM_PASSWORD)")?,
            ),
        };

        if let Some(hostname) = &self.hostname {
            config.hostname = hostname.clone();
        }
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.verify {
            config.call_properties.verify = true;
        }
        if let Some(cert) = &self.cert {
            config.call_properties.cert = Some(cert.clone());
        }
        if let Some(language) = &self.language {
            config.call_properties.language = language.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_val_types() {
        assert_eq!(parse_key_val("id=7").unwrap(), ("id".to_string(), json!(7)));
        assert_eq!(parse_key_val("force=true").unwrap(), ("force".to_string(), json!(true)));
        assert_eq!(
            parse_key_val("command=Start H1->H2").unwrap(),
            ("command".to_string(), json!("Start H1->H2"))
        );
        assert_eq!(
            parse_key_val("role_order=['H1', 'H2']").unwrap(),
            ("role_order".to_string(), json!(["H1", "H2"]))
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn test_build_params_flag_wins() {
        let params = build_params(
            &[("name".to_string(), json!("S2"))],
            Some(r#"{"name": "S1", "type": "MM"}"#),
        )
        .unwrap();
        assert_eq!(params, json!({"name": "S2", "type": "MM"}));
    }

    #[test]
    fn test_merge_requires_credentials_without_base() {
        let args = ServerArgs {
            hostname: Some("csm".to_string()),
            ..Default::default()
        };
        assert!(args.merge_into(None).is_err());
    }

    #[test]
    fn test_merge_overrides_base() {
        let args = ServerArgs {
            port: Some(9443),
            verify: true,
            ..Default::default()
        };
        let config = args.merge_into(Some(ServerConfig::new("csm", "admin", "pw"))).unwrap();
        assert_eq!(config.hostname, "csm");
        assert_eq!(config.port, 9443);
        assert!(config.call_properties.verify);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "csmctl",
            "run",
            "session_manage",
            "--param",
            "name=S1",
            "-p",
            "state=absent",
            "--hostname",
            "csm",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { module, params, .. } => {
                assert_eq!(module, "session_manage");
                assert_eq!(params.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.server.hostname.as_deref(), Some("csm"));
    }
}
