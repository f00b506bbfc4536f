use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::{IoResultExt, Result};

/// client configuration stored as toml
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// products the client subscribes to
    pub products: Vec<String>,
    /// capabilities advertised upstream
    pub capabilities: Vec<Capability>,
    /// identity echoed in every request
    pub identity: Identity,
}

impl Config {
    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            products: ["ASM_DD", "ASM", "ASM_FEATURES", "ASM_DATA"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            capabilities: Capability::defaults(),
            identity: Identity::default(),
        }
    }
}

/// who is asking for configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub language: String,
    pub tracer_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// version of the service being configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            language: "rust".to_string(),
            tracer_version: env!("CARGO_PKG_VERSION").to_string(),
            service: None,
            env: None,
            app_version: None,
            tags: vec![],
        }
    }
}
