use gazemark_core::FlagMode;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on (default: all interfaces).
    pub bind_addr: IpAddr,
    /// TCP port (default: 5000).
    pub port: u16,
    /// Dataset JSON file, relative to the working directory unless absolute.
    pub dataset_path: PathBuf,
    /// Derive `pupil_*_added` from actually appended points instead of
    /// from the client having sent a value.
    pub strict_pupil_flags: bool,
    /// Maximum accepted request body. One 468-point sample is roughly 20 KiB
    /// of JSON, so batches easily exceed axum's 2 MiB default.
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from `GAZEMARK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_parse("GAZEMARK_BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: env_parse("GAZEMARK_PORT", 5000),
            dataset_path: std::env::var("GAZEMARK_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(gazemark_core::DEFAULT_DATASET_FILE)),
            strict_pupil_flags: std::env::var("GAZEMARK_STRICT_PUPIL_FLAGS")
                .map(|v| v == "1")
                .unwrap_or(false),
            max_body_bytes: env_parse("GAZEMARK_MAX_BODY_BYTES", 64 * 1024 * 1024),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn flag_mode(&self) -> FlagMode {
        if self.strict_pupil_flags {
            FlagMode::Appended
        } else {
            FlagMode::Supplied
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
