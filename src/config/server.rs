//! Server settings loaded from environment variables.
//!
//! Secrets (`JWT_SECRET`, `DEVICE_LOCK_KEY`) are read here and nowhere else.
//! Debug builds fall back to generated throwaway secrets with a warning;
//! release builds refuse to start without them.

use crate::errors::{Error, Result};
use ring::rand::{SecureRandom, SystemRandom};

/// Length of the device lock encryption key in bytes (AES-256)
pub const DEVICE_LOCK_KEY_LEN: usize = 32;

/// Settings for issuing and validating access tokens
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC secret, at least 32 bytes
    pub secret: String,
    /// Token lifetime in minutes
    pub expiration_minutes: i64,
    /// `iss` claim
    pub issuer: String,
}

/// Everything the HTTP server needs from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (default `0.0.0.0`)
    pub bind_address: String,
    /// Port to listen on (default 5000)
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Path of the seed configuration file
    pub store_config_path: String,
    /// Token settings
    pub jwt: JwtSettings,
    /// Raw AES-256 key for device lock secrets
    pub device_lock_key: [u8; DEVICE_LOCK_KEY_LEN],
}

impl ServerConfig {
    /// Reads the server configuration from the process environment.
    ///
    /// # Errors
    /// Returns `Error::Config` if a variable is present but malformed, or if a
    /// required secret is missing in a release build.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(value) => value.parse::<u16>().map_err(|e| Error::Config {
                message: format!("PORT must be a port number: {e}"),
            })?,
            Err(_) => 5000,
        };

        let expiration_minutes = match std::env::var("JWT_EXPIRATION_MINUTES") {
            Ok(value) => value.parse::<i64>().map_err(|e| Error::Config {
                message: format!("JWT_EXPIRATION_MINUTES must be an integer: {e}"),
            })?,
            Err(_) => 1440,
        };

        Ok(Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            database_url: super::database::get_database_url(),
            store_config_path: std::env::var("STOREFRONT_CONFIG")
                .unwrap_or_else(|_| "config.toml".to_string()),
            jwt: JwtSettings {
                secret: load_jwt_secret()?,
                expiration_minutes,
                issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront".to_string()),
            },
            device_lock_key: load_device_lock_key()?,
        })
    }
}

fn load_jwt_secret() -> Result<String> {
    match std::env::var("JWT_SECRET") {
        Ok(secret) if secret.len() >= 32 => Ok(secret),
        Ok(_) => Err(Error::Config {
            message: "JWT_SECRET must be at least 32 characters long".to_string(),
        }),
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("JWT_SECRET not set, generating a temporary development secret");
            Ok(hex::encode(random_bytes::<32>()?))
        }
        Err(_) => Err(Error::Config {
            message: "JWT_SECRET environment variable must be set".to_string(),
        }),
    }
}

fn load_device_lock_key() -> Result<[u8; DEVICE_LOCK_KEY_LEN]> {
    match std::env::var("DEVICE_LOCK_KEY") {
        Ok(value) => parse_device_lock_key(&value),
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!(
                "DEVICE_LOCK_KEY not set, device lock secrets will not survive a restart"
            );
            random_bytes::<DEVICE_LOCK_KEY_LEN>()
        }
        Err(_) => Err(Error::Config {
            message: "DEVICE_LOCK_KEY environment variable must be set".to_string(),
        }),
    }
}

/// Parses a hex-encoded 32-byte key.
pub fn parse_device_lock_key(value: &str) -> Result<[u8; DEVICE_LOCK_KEY_LEN]> {
    let bytes = hex::decode(value.trim()).map_err(|e| Error::Config {
        message: format!("DEVICE_LOCK_KEY must be hex: {e}"),
    })?;
    bytes.try_into().map_err(|_| Error::Config {
        message: format!("DEVICE_LOCK_KEY must be {DEVICE_LOCK_KEY_LEN} bytes (64 hex characters)"),
    })
}

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    SystemRandom::new().fill(&mut bytes).map_err(|_| Error::Crypto {
        message: "system random generator failed".to_string(),
    })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_lock_key_accepts_64_hex_chars() {
        let key = parse_device_lock_key(&"ab".repeat(32));
        assert!(matches!(key, Ok(bytes) if bytes == [0xab; 32]));
    }

    #[test]
    fn test_parse_device_lock_key_rejects_short_key() {
        let key = parse_device_lock_key("abcd");
        assert!(matches!(key, Err(Error::Config { .. })));
    }

    #[test]
    fn test_parse_device_lock_key_rejects_non_hex() {
        let key = parse_device_lock_key(&"zz".repeat(32));
        assert!(matches!(key, Err(Error::Config { .. })));
    }
}
