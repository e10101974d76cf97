//! Runtime profile: CLI flags with environment-variable fallbacks.
//!
//! Every flag can also be set through a `USERHUB_*` variable; values from a
//! `.env` file are picked up because `main` loads it before parsing.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;

/// The built-in development signing secret.
pub const DEFAULT_SECRET: &str = "your-secret-key";

#[derive(Debug, Clone, Parser)]
#[command(name = "userhub-server", version, about = "userhub dual-protocol API server")]
pub struct Profile {
    /// Listen address for the shared HTTP/gRPC port.
    #[arg(long, env = "USERHUB_ADDR", default_value = "0.0.0.0")]
    pub addr: String,

    /// Listen port for the shared HTTP/gRPC port.
    #[arg(long, env = "USERHUB_PORT", default_value_t = 8081)]
    pub port: u16,

    /// Storage driver. Only "memory" is built in.
    #[arg(long, env = "USERHUB_DRIVER", default_value = "memory")]
    pub driver: String,

    /// Connection string, used by disk-backed drivers.
    #[arg(long, env = "USERHUB_DSN", default_value = "")]
    pub dsn: String,

    /// Symmetric secret for signing access tokens.
    #[arg(long, env = "USERHUB_SECRET", default_value = DEFAULT_SECRET)]
    pub secret: String,

    /// Demo mode: surfaced in the instance profile and enables verbose
    /// panic logging.
    #[arg(long, env = "USERHUB_DEMO", default_value_t = false)]
    pub demo: bool,

    /// Access-token lifetime in seconds.
    #[arg(long, env = "USERHUB_ACCESS_TOKEN_TTL_SECS", default_value_t = 1800)]
    pub access_token_ttl_secs: u32,

    /// Refresh-token lifetime in seconds.
    #[arg(long, env = "USERHUB_REFRESH_TOKEN_TTL_SECS", default_value_t = 604_800)]
    pub refresh_token_ttl_secs: u32,

    /// Log level when RUST_LOG is not set.
    #[arg(long, env = "USERHUB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("invalid listen address: {value}")]
    InvalidAddr { value: String },

    #[error("unknown storage driver: {value}")]
    UnknownDriver { value: String },

    #[error("token secret must not be empty")]
    EmptySecret,

    #[error("{name} must be greater than zero")]
    ZeroTtl { name: &'static str },
}

impl Profile {
    /// Checks the profile for values that cannot produce a working server.
    pub fn validate(&self) -> Result<(), ProfileError> {
        self.addr
            .parse::<IpAddr>()
            .map_err(|_| ProfileError::InvalidAddr {
                value: self.addr.clone(),
            })?;
        if self.driver != "memory" {
            return Err(ProfileError::UnknownDriver {
                value: self.driver.clone(),
            });
        }
        if self.secret.is_empty() {
            return Err(ProfileError::EmptySecret);
        }
        if self.access_token_ttl_secs == 0 {
            return Err(ProfileError::ZeroTtl {
                name: "access-token-ttl-secs",
            });
        }
        if self.refresh_token_ttl_secs == 0 {
            return Err(ProfileError::ZeroTtl {
                name: "refresh-token-ttl-secs",
            });
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ProfileError> {
        let ip = self
            .addr
            .parse::<IpAddr>()
            .map_err(|_| ProfileError::InvalidAddr {
                value: self.addr.clone(),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let profile = Profile::parse_from(["userhub-server"]);
        assert_eq!(profile.addr, "0.0.0.0");
        assert_eq!(profile.port, 8081);
        assert_eq!(profile.driver, "memory");
        assert_eq!(profile.secret, DEFAULT_SECRET);
        assert!(!profile.demo);
        assert_eq!(profile.access_token_ttl_secs, 1800);
        assert_eq!(profile.refresh_token_ttl_secs, 604_800);
        profile.validate().unwrap();
    }

    #[test]
    fn test_listen_addr() {
        let profile = Profile::parse_from(["userhub-server", "--addr", "127.0.0.1", "--port", "9000"]);
        assert_eq!(
            profile.listen_addr().unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_rejects_bad_addr() {
        let profile = Profile::parse_from(["userhub-server", "--addr", "localhost"]);
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::InvalidAddr { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_driver() {
        let profile = Profile::parse_from(["userhub-server", "--driver", "postgres"]);
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::UnknownDriver { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let profile = Profile::parse_from(["userhub-server", "--access-token-ttl-secs", "0"]);
        assert!(matches!(profile.validate(), Err(ProfileError::ZeroTtl { .. })));
    }
}
