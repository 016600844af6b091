//! Engine configuration
mod loader;
mod manager;
mod types;

pub use loader::CONFIG_FILE_NAME;
pub use manager::ConfigManager;
pub use types::{
    BackfillConfig,
    ConfigError,
    SyncSettings,
    ValidationError,
};
