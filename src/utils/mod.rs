pub mod config;
pub mod duty;

pub use config::{CallProperties, Playbook, ServerConfig};
pub use duty::Duty;
