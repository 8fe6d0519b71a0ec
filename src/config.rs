//! Client construction options.
use std::time::Duration;

use crate::index::{IndexRegistry, Mode};

pub const DEFAULT_READ_PORT: u16 = 9998;
pub const DEFAULT_WRITE_PORT: u16 = 9999;

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub read_port: u16,
    pub write_port: u16,
    /// Assume opened indexes survive between requests and reopen only when
    /// the server reports otherwise.
    pub persistent: bool,
    pub connect_timeout: Duration,
    /// I/O timeout of the read socket.
    pub read_timeout: Duration,
    /// I/O timeout of the write socket.
    pub write_timeout: Duration,
    /// Accepted for compatibility. A request is retried at most once, after
    /// reopening an index the server reported as closed.
    pub retries: u32,
    pub registry: IndexRegistry,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "localhost".to_string(),
            read_port: DEFAULT_READ_PORT,
            write_port: DEFAULT_WRITE_PORT,
            persistent: false,
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(3),
            retries: 3,
            registry: IndexRegistry::default(),
        }
    }
}

impl ClientConfig {
    pub fn port(&self, mode: Mode) -> u16 {
        match mode {
            Mode::Read => self.read_port,
            Mode::Write => self.write_port,
        }
    }

    pub fn address(&self, mode: Mode) -> String {
        format!("{}:{}", self.host, self.port(mode))
    }

    pub fn io_timeout(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Read => self.read_timeout,
            Mode::Write => self.write_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_mode_settings() {
        let config = ClientConfig {
            host: "hs.local".into(),
            ..Default::default()
        };

        assert_eq!(config.address(Mode::Read), "hs.local:9998");
        assert_eq!(config.address(Mode::Write), "hs.local:9999");
        assert_eq!(config.io_timeout(Mode::Read), Duration::from_secs(2));
        assert_eq!(config.io_timeout(Mode::Write), Duration::from_secs(3));
        assert!(!config.persistent);
    }
}
