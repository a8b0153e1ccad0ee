use std::net::SocketAddr;

use anyhow::Context;
use tracing::warn;

use agora_gateway::HubConfig;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub hub: HubConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("AGORA_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "AGORA_PORT", 8080)?;

        let jwt_secret = lookup("AGORA_JWT_SECRET").unwrap_or_else(|| {
            warn!("AGORA_JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.into()
        });

        let defaults = HubConfig::default();
        let hub = HubConfig {
            session_queue: parse_or(&lookup, "AGORA_SESSION_QUEUE", defaults.session_queue)?,
            command_queue: parse_or(&lookup, "AGORA_HUB_QUEUE", defaults.command_queue)?,
        };
        if hub.session_queue == 0 || hub.command_queue == 0 {
            anyhow::bail!("hub queue capacities must be positive");
        }

        Ok(Self {
            host,
            port,
            jwt_secret,
            hub,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value {:?}", key, raw)),
        None => Ok(default),
    }
}
