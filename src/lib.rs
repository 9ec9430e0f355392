pub mod cli;
pub mod controller;
pub mod modules;
pub mod reconcile;
pub mod secrets;
pub mod telemetry;
pub mod utils;
