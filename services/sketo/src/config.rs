use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

// Service configuration sourced from environment variables, with an
// optional YAML override file for ops-friendly deployments.
#[derive(Debug, Clone)]
pub struct Config {
    // API listener address.
    pub bind_addr: SocketAddr,
    // Metrics listener address.
    pub metrics_bind: SocketAddr,
    // Directory holding the embedded store; its key layout is the on-disk
    // contract.
    pub storage_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("SKETO_BIND")
            .unwrap_or_else(|_| "0.0.0.0:4466".to_string())
            .parse()
            .with_context(|| "parse SKETO_BIND")?;
        let metrics_bind = std::env::var("SKETO_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9104".to_string())
            .parse()
            .with_context(|| "parse SKETO_METRICS_BIND")?;
        let storage_dir = std::env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage_dir,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("SKETO_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read SKETO_CONFIG: {path}"))?;
            let override_cfg: ConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse sketo config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.storage_dir {
                config.storage_dir = value;
            }
        }
        Ok(config)
    }
}
