pub mod config;
pub mod error;
pub mod types;

pub use config::EngageConfig;
pub use error::EngageError;
pub use types::*;
