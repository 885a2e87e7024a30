// Process configuration read from the environment
//
// Every value has a default. When one is used a warning is logged so a
// misspelled variable does not go unnoticed. `from_lookup` takes the
// variable source as a closure so tests never touch the real environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::agent::{short_uuid, AgentId};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings of the supervisor binary
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub supervisor_id: String,
    pub sweep_interval: Option<Duration>,
}

impl SupervisorConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let bind_addr = parsed_or(&lookup, "BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port = parsed_or(&lookup, "PORT", 3000u16)?;
        let supervisor_id = lookup("SUPERVISOR_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| {
                let generated = format!("supervisor-{}", short_uuid());
                tracing::warn!("SUPERVISOR_ID not set, using {}", generated);
                generated
            });
        let sweep_interval = match lookup("SWEEP_INTERVAL_SECS") {
            Some(raw) => match parse::<u64>("SWEEP_INTERVAL_SECS", &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        Ok(Self {
            bind_addr,
            port,
            supervisor_id,
            sweep_interval,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Settings of the agent binary
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub supervisor_url: String,
    pub agent_id: AgentId,
    pub capabilities: Vec<String>,
    pub step_delay: Duration,
    pub reconnect_delay: Duration,
    pub status_interval: Duration,
}

impl AgentConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let supervisor_url = lookup("SUPERVISOR_URL").unwrap_or_else(|| {
            tracing::warn!("SUPERVISOR_URL not set, using default");
            "ws://localhost:3000/ws".to_string()
        });

        let agent_id = match lookup("AGENT_ID") {
            Some(raw) => AgentId::new(raw.clone()).map_err(|reason| ConfigError::InvalidValue {
                name: "AGENT_ID",
                value: raw,
                reason,
            })?,
            None => AgentId::generate(),
        };

        let capabilities = match lookup("CAPABILITIES") {
            Some(raw) => split_list(&raw),
            None => {
                tracing::warn!("CAPABILITIES not set, using default");
                vec!["general".to_string()]
            }
        };

        Ok(Self {
            supervisor_url,
            agent_id,
            capabilities,
            step_delay: Duration::from_millis(parsed_or(&lookup, "STEP_DELAY_MS", 1000u64)?),
            reconnect_delay: Duration::from_millis(parsed_or(
                &lookup,
                "RECONNECT_DELAY_MS",
                2000u64,
            )?),
            status_interval: Duration::from_secs(parsed_or(
                &lookup,
                "STATUS_INTERVAL_SECS",
                60u64,
            )?),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parsed_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> ConfigResult<T>
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => parse(name, &raw),
        None => {
            tracing::warn!("{} not set, using default {}", name, default);
            Ok(default)
        }
    }
}

fn parse<T>(name: &'static str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
        name,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}
