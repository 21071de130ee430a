//! Polisa Client
//!
//! Backend-facing half of the console engine: REST collaborators,
//! payload normalization, configuration and logging setup.

pub mod config;
pub mod error;
pub mod normalize;
pub mod rest;
pub mod telemetry;
pub mod wire;

pub use config::{ConfigError, ConsoleConfig, LoggingConfig};
pub use error::ClientError;
pub use normalize::{FieldMapping, FieldType};
pub use rest::RestClient;
