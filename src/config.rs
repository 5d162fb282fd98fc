//! Startup configuration: defaults, overridden by an optional TOML file,
//! overridden by command-line flags.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Args;

pub const DEFAULT_PORT: u16 = 3003;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_LOG_PATH: &str = "/tmp/agent-events.jsonl";
pub const DEFAULT_VIEWER_PATH: &str = "factory-floor-visualizer.html";

/// Raw deserialisable shape of the config file
///
/// Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerSection,
    pub log: LogSection,
    pub viewer: ViewerSection,
}

/// `[server]` section
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub bind: Option<String>,
}

/// `[log]` section
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub path: Option<PathBuf>,
}

/// `[viewer]` section
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewerSection {
    pub path: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub log_path: PathBuf,
    pub viewer_path: PathBuf,
}

impl Config {
    /// Resolve settings from CLI flags and the config file they point at
    pub fn resolve(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: &Args, file: FileConfig) -> Result<Self> {
        let bind = args
            .bind
            .clone()
            .or(file.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: IpAddr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;

        Ok(Self {
            bind,
            port: args.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            log_path: args
                .file
                .clone()
                .or(file.log.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            viewer_path: args
                .viewer
                .clone()
                .or(file.viewer.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_VIEWER_PATH)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
