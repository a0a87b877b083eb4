use crate::error::CtlError;
use clap::ArgMatches;
use log::LevelFilter;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "50061";
/// Seconds allowed for establishing the agent channel.
pub const DEFAULT_CONN_TIMEOUT: &str = "30";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings of one gpuctl invocation, resolved from flags and their
/// environment overrides before any network activity.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// `None` lets calls and stream receives block indefinitely.
    pub request_timeout: Option<Duration>,
    pub log_level: LevelFilter,
}

impl ClientConfig {
    pub fn new(
        host: String,
        port: &str,
        connect_timeout: &str,
        request_timeout: Option<&str>,
        log_level: &str,
    ) -> Result<Self, CtlError> {
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| CtlError::config("AGA_GRPC_PORT", port))?;
        let connect_timeout = Duration::from_secs(parse_seconds("GRPC_CONN_TIMEOUT", connect_timeout)?);
        let request_timeout = match request_timeout {
            Some(value) => match parse_seconds("GRPC_TIMEOUT", value)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };
        let log_level =
            LevelFilter::from_str(log_level).map_err(|_| CtlError::config("GPUCTL_LOG_LEVEL", log_level))?;

        Ok(Self {
            host,
            port,
            connect_timeout,
            request_timeout,
            log_level,
        })
    }

    pub fn from_matches(m: &ArgMatches) -> Result<Self, CtlError> {
        let host = m
            .get_one::<String>("node-svc-ip")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = m
            .get_one::<String>("node-svc-port")
            .map(String::as_str)
            .unwrap_or(DEFAULT_PORT);
        let connect_timeout = m
            .get_one::<String>("conn-timeout")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONN_TIMEOUT);
        let request_timeout = m.get_one::<String>("timeout").map(String::as_str);
        let log_level = m
            .get_one::<String>("log-level")
            .map(String::as_str)
            .unwrap_or(DEFAULT_LOG_LEVEL);

        Self::new(host, port, connect_timeout, request_timeout, log_level)
    }

    /// `host:port` as shown to the operator.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.address())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 50061,
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
            log_level: LevelFilter::Warn,
        }
    }
}

/// Parses a non-negative whole number of seconds.
pub fn parse_seconds(name: &'static str, value: &str) -> Result<u64, CtlError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| CtlError::config(name, value))
}
