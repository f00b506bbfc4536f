use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// a config file delivered by the agent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetFile {
    pub path: String,
    pub raw: Vec<u8>,
}

/// decoded agent answer
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    /// root metadata documents, not verified here
    pub roots: Vec<Value>,
    /// signed targets document
    pub targets: Option<Value>,
    pub target_files: Vec<TargetFile>,
    /// exhaustive list of paths that should be applied
    pub client_configs: Vec<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    roots: Vec<String>,
    #[serde(default)]
    targets: Option<String>,
    #[serde(default)]
    target_files: Vec<RawTargetFile>,
    #[serde(default)]
    client_configs: Vec<String>,
}

#[derive(Deserialize)]
struct RawTargetFile {
    path: String,
    raw: String,
}

fn decode(field: &str, s: &str) -> Result<Vec<u8>> {
    BASE64.decode(s).map_err(|source| Error::Base64 {
        field: field.to_string(),
        source,
    })
}

fn decode_json(field: &str, s: &str) -> Result<Value> {
    Ok(serde_json::from_slice(&decode(field, s)?)?)
}

impl Response {
    /// decode a response body; embedded documents and files are base64
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let raw: RawResponse = serde_json::from_slice(body)?;

        let roots = raw
            .roots
            .iter()
            .map(|r| decode_json("roots", r))
            .collect::<Result<Vec<_>>>()?;

        let targets = raw
            .targets
            .as_deref()
            .map(|t| decode_json("targets", t))
            .transpose()?;

        let target_files = raw
            .target_files
            .into_iter()
            .map(|f| {
                let raw = decode(&format!("target_files[{}]", f.path), &f.raw)?;
                Ok(TargetFile { path: f.path, raw })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            roots,
            targets,
            target_files,
            client_configs: raw.client_configs,
        })
    }

    /// the agent had nothing to say; the client keeps what it has
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
            && self.targets.is_none()
            && self.target_files.is_empty()
            && self.client_configs.is_empty()
    }
}
