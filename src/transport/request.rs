use serde::Serialize;

use crate::types::{CachedTargetFile, ConfigState};

/// request document sent upstream on every sync
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub client: ClientPayload,
    pub cached_target_files: Vec<CachedTargetFile>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientPayload {
    pub state: ClientState,
    pub id: String,
    pub products: Vec<String>,
    pub is_tracer: bool,
    pub is_agent: bool,
    pub client_tracer: ClientTracer,
    /// capability mask, base64
    pub capabilities: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientState {
    pub root_version: u64,
    pub targets_version: u64,
    pub config_states: Vec<ConfigState>,
    pub has_error: bool,
    pub error: String,
    pub backend_client_state: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientTracer {
    pub runtime_id: String,
    pub language: String,
    pub tracer_version: String,
    pub service: Option<String>,
    pub env: Option<String>,
    /// service version, omitted when not configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub tags: Vec<String>,
}

impl Payload {
    /// pretty printed request document
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Client, Config};

    #[test]
    fn test_to_json() {
        let client = Client::new(Config::default());
        let json = client.payload().to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["client"]["id"], client.id());
        assert_eq!(value["client"]["capabilities"], "Afw=");
        assert!(json.contains("\n"));
    }
}
