use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::modules::csm::clients::CsmClients;
use crate::modules::csm::default_modules;
use crate::modules::{AutomationModule, ExecutionResult};
use crate::utils::Duty;

/// The outcome of one duty in a run.
#[derive(Debug, Clone, Serialize)]
pub struct DutyReport {
    pub duty: String,
    pub module: String,
    #[serde(flatten)]
    pub result: ExecutionResult,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ok: usize,
    pub changed: usize,
    pub failed: usize,
    pub ignored: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub duties: Vec<DutyReport>,
    pub summary: RunSummary,
}

/// Modules by name. Selection matches a duty's `module` against each
/// module's supported names.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn AutomationModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_modules() -> Self {
        let mut registry = Self::new();
        for module in default_modules() {
            registry.register_module(module);
        }
        registry
    }

    pub fn register_module(&mut self, module: Arc<dyn AutomationModule>) {
        let name = module.name().to_string();
        self.modules.insert(name, module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered modules with the names they answer to, sorted by name.
    pub fn listing(&self) -> Vec<(String, Vec<String>)> {
        let mut listing: Vec<(String, Vec<String>)> = self
            .modules
            .values()
            .map(|m| {
                (
                    m.name().to_string(),
                    m.supported_duty_types().into_iter().map(str::to_string).collect(),
                )
            })
            .collect();
        listing.sort();
        listing
    }

    pub fn select_module(&self, duty: &Duty) -> Result<Arc<dyn AutomationModule>> {
        for module in self.modules.values() {
            if module.supported_duty_types().contains(&duty.module.as_str()) {
                return Ok(module.clone());
            }
        }

        Err(anyhow!("No module found supporting '{}'", duty.module))
    }

    /// Checks every duty's module and parameters without contacting the
    /// server.
    #[instrument(skip(self, duties))]
    pub async fn validate_duties(&self, duties: &[Duty]) -> Result<()> {
        for duty in duties {
            let module = self.select_module(duty)?;
            module
                .validate(duty)
                .await
                .with_context(|| format!("Duty '{}' is invalid", duty.name))?;
        }
        info!("{} duties are valid", duties.len());
        Ok(())
    }
}

/// Runs duties one after another against a single server.
#[derive(Clone)]
pub struct Controller {
    clients: CsmClients,
    registry: Arc<ModuleRegistry>,
}

impl Controller {
    pub fn new(clients: CsmClients, registry: ModuleRegistry) -> Self {
        Self {
            clients,
            registry: Arc::new(registry),
        }
    }

    pub fn with_default_modules(clients: CsmClients) -> Self {
        Self::new(clients, ModuleRegistry::with_default_modules())
    }

    pub fn register_module(&mut self, module: Arc<dyn AutomationModule>) {
        Arc::make_mut(&mut self.registry).register_module(module);
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Never returns `Err`: module errors become a failed result.
    #[instrument(skip(self, duty), fields(duty_name = %duty.name, module = %duty.module))]
    pub async fn run_duty(&self, duty: &Duty) -> ExecutionResult {
        let module = match self.registry.select_module(duty) {
            Ok(module) => module,
            Err(e) => return ExecutionResult::failure(format!("{:#}", e)),
        };

        info!("Running duty '{}' with module {}", duty.name, module.name());
        match module.apply(&self.clients, duty).await {
            Ok(result) => {
                if result.failed {
                    error!(
                        "Duty '{}' failed: {}",
                        duty.name,
                        result.msg.as_deref().unwrap_or("no message")
                    );
                } else {
                    info!("Duty '{}' finished (changed={})", duty.name, result.changed);
                }
                result
            }
            Err(e) => {
                error!("Duty '{}' failed: {:#}", duty.name, e);
                ExecutionResult::failure(format!("Module failed. Error [{:#}].", e))
            }
        }
    }

    /// Runs duties in order and stops at the first failure that is not
    /// ignored. Duties after the stop are counted as skipped.
    #[instrument(skip(self, duties))]
    pub async fn run_duties(&self, duties: &[Duty]) -> RunReport {
        let mut reports = Vec::with_capacity(duties.len());
        let mut summary = RunSummary::default();

        for (index, duty) in duties.iter().enumerate() {
            let result = self.run_duty(duty).await;

            let ignored = result.failed && duty.ignore_errors;
            if ignored {
                warn!("Ignoring failure of duty '{}'", duty.name);
                summary.ignored += 1;
            } else if result.failed {
                summary.failed += 1;
            } else {
                summary.ok += 1;
                if result.changed {
                    summary.changed += 1;
                }
            }

            let stop = result.failed && !duty.ignore_errors;
            reports.push(DutyReport {
                duty: duty.name.clone(),
                module: duty.module.clone(),
                result,
                ignored,
            });

            if stop {
                summary.skipped = duties.len() - index - 1;
                if summary.skipped > 0 {
                    warn!("Stopping after duty '{}'; {} duties skipped", duty.name, summary.skipped);
                }
                break;
            }
        }

        info!(
            "Run complete: ok={} changed={} failed={} ignored={} skipped={}",
            summary.ok, summary.changed, summary.failed, summary.ignored, summary.skipped
        );

        RunReport {
            duties: reports,
            summary,
        }
    }
}
