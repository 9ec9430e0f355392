use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use csmctl::cli::{build_params, Cli, Commands, ServerArgs};
use csmctl::controller::{Controller, ModuleRegistry, RunReport};
use csmctl::modules::csm::clients::CsmClients;
use csmctl::secrets::SecretManager;
use csmctl::telemetry;
use csmctl::utils::{Duty, Playbook, ServerConfig};

const EXIT_DUTY_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    if let Err(e) = telemetry::init_telemetry() {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    let cli = Cli::parse();

    let outcome = match &cli.command {
        Commands::Modules => {
            list_modules();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Apply { playbook, check } => {
            let playbook = Playbook::from_file(playbook)?;
            run_command(&cli.server, playbook.server, playbook.duties, *check).await
        }
        Commands::Run {
            module,
            params,
            params_json,
        } => {
            let params = build_params(params, params_json.as_deref())?;
            let duty = Duty::new(module.clone(), module.clone(), params);
            run_command(&cli.server, None, vec![duty], false).await
        }
    };

    telemetry::shutdown_telemetry();
    outcome
}

fn list_modules() {
    for (name, aliases) in ModuleRegistry::with_default_modules().listing() {
        println!("{:<24} {}", name, aliases.join(", "));
    }
}

async fn run_command(
    args: &ServerArgs,
    server: Option<ServerConfig>,
    duties: Vec<Duty>,
    check: bool,
) -> Result<ExitCode> {
    let registry = ModuleRegistry::with_default_modules();
    registry.validate_duties(&duties).await?;
    if check {
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = args.merge_into(server)?;
    SecretManager::with_default_resolvers()
        .resolve_server_credentials(&mut config)
        .await?;

    info!("Connecting to {}", config);
    let clients = CsmClients::connect(&config)
        .await
        .with_context(|| format!("Failed to connect to {}", config))?;

    let controller = Controller::new(clients, registry);

    let report = controller.run_duties(&duties).await;
    print_report(&report)?;

    if report.summary.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_DUTY_FAILED))
    }
}

fn print_report(report: &RunReport) -> Result<()> {
    let rendered = serde_json::to_string_pretty(report).context("Failed to render results")?;
    println!("{}", rendered);
    Ok(())
}
