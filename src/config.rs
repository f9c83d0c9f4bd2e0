use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::optimizer::{ModelParameters, SolverKind, SolverSettings};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    pub model: ModelParameters,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Backend identifier: "microlp", "cbc" or "highs"
    pub backend: String,
    pub verbose: bool,
    pub time_limit_seconds: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverKind::default().to_string(),
            verbose: false,
            time_limit_seconds: None,
        }
    }
}

impl SolverConfig {
    pub fn settings(&self) -> Result<SolverSettings, ConfigError> {
        Ok(SolverSettings {
            kind: SolverKind::from_id(&self.backend)?,
            verbose: self.verbose,
            time_limit_seconds: self.time_limit_seconds,
        })
    }
}

/// Where LP dumps of failed solves go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub infeasible_file: String,
    pub failure_file: String,
    /// Suffix each dump with a fresh id so parallel runs never collide
    pub unique_names: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("."),
            infeasible_file: "infeasible.lp".to_string(),
            failure_file: "failure.lp".to_string(),
            unique_names: false,
        }
    }
}

impl Config {
    /// `config/default.toml` overlaid with `FCO__`-prefixed environment variables
    pub fn load() -> Result<Self> {
        Self::load_from("config/default.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(path.as_ref()))
                .merge(Env::prefixed("FCO__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }
}
