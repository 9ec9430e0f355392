pub mod error;
pub mod hardware;
pub mod rest;
pub mod session;
pub mod system;
pub mod traits;

pub use error::ClientError;
pub use traits::*;

use std::sync::Arc;

use crate::utils::config::ServerConfig;
use hardware::HardwareClient;
use rest::RestClient;
use session::SessionClient;
use system::SystemClient;

/// The set of remote capabilities a module may use. Built once per server
/// connection and handed to modules and the reconciler.
#[derive(Clone)]
pub struct CsmClients {
    pub session: Arc<dyn SessionOperations>,
    pub hardware: Arc<dyn HardwareOperations>,
    pub system: Arc<dyn SystemOperations>,
}

impl CsmClients {
    pub fn new(
        session: Arc<dyn SessionOperations>,
        hardware: Arc<dyn HardwareOperations>,
        system: Arc<dyn SystemOperations>,
    ) -> Self {
        Self {
            session,
            hardware,
            system,
        }
    }

    /// Logs in once and shares the token between the three clients.
    pub async fn connect(config: &ServerConfig) -> Result<Self, ClientError> {
        let rest = Arc::new(RestClient::connect(config).await?);

        Ok(Self {
            session: Arc::new(SessionClient::new(rest.clone())),
            hardware: Arc::new(HardwareClient::new(rest.clone())),
            system: Arc::new(SystemClient::new(rest)),
        })
    }
}
