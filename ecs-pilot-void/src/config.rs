//! Healthcheck stub configuration
//!
//! Port and URI come from flags, `PLUGIN_PORT` / `PLUGIN_URI`, or the
//! `ECS_PORT` / `ECS_URI` aliases, in that order.

use anyhow::{Context, Result};
use clap::Parser;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_URI: &str = "healthcheck";

#[derive(Debug, Clone, Parser)]
#[command(name = "ecs-pilot-void")]
#[command(
    about = "Creates HTTP service for ECS container healthcheck on specified URL and port",
    long_about = None
)]
pub struct Args {
    /// TCP port for healthcheck service
    #[arg(long, short = 'p', env = "PLUGIN_PORT")]
    pub port: Option<u16>,

    /// URI for the healthcheck service
    #[arg(long, short = 'u', env = "PLUGIN_URI")]
    pub uri: Option<String>,
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub uri: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::resolve(Args::parse(), |name| std::env::var(name).ok())
    }

    fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match args.port {
            Some(port) => port,
            None => match lookup("ECS_PORT").filter(|v| !v.is_empty()) {
                Some(value) => value
                    .parse()
                    .with_context(|| format!("Invalid ECS_PORT: {}", value))?,
                None => DEFAULT_PORT,
            },
        };

        let uri = args
            .uri
            .filter(|v| !v.is_empty())
            .or_else(|| lookup("ECS_URI").filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_URI.to_string());

        // Braces would be read as path captures by the router
        if let Some(c) = uri
            .chars()
            .find(|c| matches!(c, '{' | '}' | '?' | '#') || c.is_whitespace())
        {
            anyhow::bail!("Invalid healthcheck URI {:?}: '{}' is not allowed", uri, c);
        }

        Ok(Self { port, uri })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(port: Option<u16>, uri: Option<&str>) -> Args {
        Args {
            port,
            uri: uri.map(str::to_string),
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(args(None, None), |_| None).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.uri, "healthcheck");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_ecs_aliases() {
        let lookup = |name: &str| match name {
            "ECS_PORT" => Some("9000".to_string()),
            "ECS_URI" => Some("status".to_string()),
            _ => None,
        };

        let config = Config::resolve(args(None, None), lookup).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.uri, "status");

        // Explicit settings win
        let config = Config::resolve(args(Some(7000), Some("ping")), lookup).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.uri, "ping");
    }

    #[test]
    fn test_uri_with_route_syntax_rejected() {
        for uri in ["health/{id}", "{*rest}", "status?full", "health check"] {
            let err = Config::resolve(args(None, Some(uri)), |_| None).unwrap_err();
            assert!(err.to_string().contains("Invalid healthcheck URI"), "{}", uri);
        }

        let err = Config::resolve(args(None, None), |name| {
            (name == "ECS_URI").then(|| "ping}".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("'}'"));

        let config = Config::resolve(args(None, Some("/api/health")), |_| None).unwrap();
        assert_eq!(config.uri, "/api/health");
    }

    #[test]
    fn test_invalid_alias_port() {
        let err = Config::resolve(args(None, None), |name| {
            (name == "ECS_PORT").then(|| "http".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("Invalid ECS_PORT"));
    }
}
