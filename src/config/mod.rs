/// Database configuration and connection management
pub mod database;

/// Server settings loaded from environment variables
pub mod server;

/// Store seed configuration loaded from config.toml
pub mod store;
