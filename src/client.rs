//! the sync cycle: report state, receive targets, apply, dispatch

use tracing::{info, warn};

use crate::capability;
use crate::config::Config;
use crate::content::ContentList;
use crate::dispatch::{Dispatcher, Receiver};
use crate::error::{Error, Result};
use crate::path::Path;
use crate::repo::Repository;
use crate::target::TargetMap;
use crate::transport::{ClientPayload, ClientState, ClientTracer, Payload, Response, Transport};
use crate::types::ChangeSet;

/// remote config client bound to one repository
///
/// callers serialize sync cycles; `&mut self` keeps a single transaction
/// in flight.
#[derive(Debug)]
pub struct Client {
    id: String,
    runtime_id: String,
    config: Config,
    repository: Repository,
    dispatcher: Dispatcher,
    last_error: Option<String>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self::with_repository(config, Repository::new())
    }

    pub fn with_repository(config: Config, repository: Repository) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            runtime_id: uuid::Uuid::new_v4().to_string(),
            config,
            repository,
            dispatcher: Dispatcher::new(),
            last_error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// for consumers acknowledging content outside of a receiver
    pub fn repository_mut(&mut self) -> &mut Repository {
        &mut self.repository
    }

    pub fn register(&mut self, receiver: Receiver) {
        self.dispatcher.register(receiver);
    }

    /// error of the last failed sync, reported upstream until a sync succeeds
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// request document describing the current state
    pub fn payload(&self) -> Payload {
        let state = self.repository.state();
        let identity = &self.config.identity;

        Payload {
            client: ClientPayload {
                state: ClientState {
                    root_version: state.root_version,
                    targets_version: state.targets_version,
                    config_states: state.config_states,
                    has_error: self.last_error.is_some(),
                    error: self.last_error.clone().unwrap_or_default(),
                    backend_client_state: state.opaque_backend_state,
                },
                id: self.id.clone(),
                products: self.config.products.clone(),
                is_tracer: true,
                is_agent: false,
                client_tracer: ClientTracer {
                    runtime_id: self.runtime_id.clone(),
                    language: identity.language.clone(),
                    tracer_version: identity.tracer_version.clone(),
                    service: identity.service.clone(),
                    env: identity.env.clone(),
                    app_version: identity.app_version.clone(),
                    tags: identity.tags.clone(),
                },
                capabilities: capability::encode(&self.config.capabilities),
            },
            cached_target_files: state.cached_target_files,
        }
    }

    /// run one sync cycle against the transport
    ///
    /// on failure the repository is left as it was and the error is
    /// reported in the next payload.
    pub fn sync<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<ChangeSet> {
        let response = transport.send_config(&self.payload())?;

        match self.apply(&response) {
            Ok(changes) => {
                self.last_error = None;
                info!(
                    changes = changes.len(),
                    targets_version = self.repository.targets_version(),
                    "remote config synced"
                );
                Ok(changes)
            }
            Err(e) => {
                warn!(error = %e, "remote config sync aborted");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// apply a decoded response in one transaction and dispatch the changes
    pub fn apply(&mut self, response: &Response) -> Result<ChangeSet> {
        if response.is_empty() {
            return Ok(ChangeSet::new());
        }

        let paths = response
            .client_configs
            .iter()
            .map(|p| Path::parse(p))
            .collect::<Result<Vec<_>>>()?;

        let targets = match &response.targets {
            Some(raw) => TargetMap::parse(raw)?,
            None => return Err(Error::Sync("response has no targets".to_string())),
        };

        let contents = ContentList::parse(
            response
                .target_files
                .iter()
                .map(|f| (f.path.as_str(), f.raw.as_slice())),
        )?;

        let changes = self.repository.transaction(|current, tx| {
            // stored paths no longer listed upstream
            for path in current.paths() {
                if !paths.contains(&path) {
                    tx.delete(path);
                }
            }

            for path in &paths {
                let target = targets
                    .get(path)
                    .ok_or_else(|| Error::Sync(format!("no target for path '{}'", path)))?;

                let stored = current.contents().contains(path);
                if stored && current.contents().find_content(path, target).is_some() {
                    continue;
                }

                let content = contents.find_content(path, target).ok_or_else(|| {
                    Error::Sync(format!("no valid content for target at path '{}'", path))
                })?;

                if stored {
                    tx.update(path.clone(), target.clone(), content.clone());
                } else {
                    tx.insert(path.clone(), target.clone(), content.clone());
                }
            }

            tx.set_opaque_backend_state(targets.opaque_backend_state().map(str::to_string));
            tx.set_targets_version(targets.version());
            Ok(())
        })?;

        self.dispatcher.dispatch(&changes, &mut self.repository);
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ApplyState;
    use crate::digest::Algorithm;
    use crate::dispatch::Matcher;
    use crate::transport::ReplayTransport;
    use crate::types::ChangeKind;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde_json::{json, Value};

    const EXCLUSIONS_PATH: &str = "datadog/603646/ASM/exclusion_filters/config";
    const RULES_PATH: &str = "employee/ASM_DD/latest/config";
    const EXCLUSIONS: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/exclusion_filters.json"
    ));
    const RULES: &[u8] = b"{\"rules\":[]}";

    fn target(version: u64, data: &[u8]) -> Value {
        json!({
            "custom": {"c": ["client_id"], "v": version},
            "hashes": {"sha256": Algorithm::Sha256.hexdigest_bytes(data)},
            "length": data.len()
        })
    }

    /// body of an agent response listing `files` as (path, version, data)
    fn body(targets_version: u64, files: &[(&str, u64, &[u8])], deliver: bool) -> Vec<u8> {
        let mut targets = serde_json::Map::new();
        for (path, version, data) in files {
            targets.insert(path.to_string(), target(*version, data));
        }
        let signed = json!({
            "signatures": [{"keyid": "hello", "sig": "sig"}],
            "signed": {
                "_type": "targets",
                "custom": {"opaque_backend_state": format!("state-{}", targets_version)},
                "targets": targets,
                "version": targets_version
            }
        });
        let target_files: Vec<Value> = if deliver {
            files
                .iter()
                .map(|(path, _, data)| json!({"path": path, "raw": BASE64.encode(data)}))
                .collect()
        } else {
            vec![]
        };
        let client_configs: Vec<&str> = files.iter().map(|(p, _, _)| *p).collect();

        serde_json::to_vec(&json!({
            "roots": [],
            "targets": BASE64.encode(serde_json::to_vec(&signed).unwrap()),
            "target_files": target_files,
            "client_configs": client_configs
        }))
        .unwrap()
    }

    fn client() -> Client {
        Client::new(Config::default())
    }

    fn sync(client: &mut Client, body: Vec<u8>) -> Result<ChangeSet> {
        let mut transport = ReplayTransport::new();
        transport.push_body(body);
        client.sync(&mut transport)
    }

    fn kinds(changes: &ChangeSet) -> Vec<ChangeKind> {
        changes.iter().map(|c| c.kind()).collect()
    }

    #[test]
    fn test_initial_payload() {
        let c = client();
        let payload = serde_json::to_value(c.payload()).unwrap();

        assert_eq!(payload["client"]["id"], c.id());
        assert_eq!(payload["client"]["is_tracer"], true);
        assert_eq!(payload["client"]["is_agent"], false);
        assert_eq!(payload["client"]["capabilities"], "Afw=");
        assert_eq!(
            payload["client"]["products"],
            json!(["ASM_DD", "ASM", "ASM_FEATURES", "ASM_DATA"])
        );
        assert_eq!(
            payload["client"]["state"],
            json!({
                "root_version": 1,
                "targets_version": 0,
                "config_states": [],
                "has_error": false,
                "error": "",
                "backend_client_state": null
            })
        );
        assert_eq!(payload["client"]["client_tracer"]["language"], "rust");
        assert_eq!(payload["cached_target_files"], json!([]));
    }

    #[test]
    fn test_sync_inserts_and_reports() {
        let mut c = client();
        let changes = sync(&mut c, body(7, &[(EXCLUSIONS_PATH, 21, EXCLUSIONS)], true)).unwrap();

        assert_eq!(kinds(&changes), vec![ChangeKind::Inserted]);
        assert_eq!(c.repository().targets_version(), 7);
        assert_eq!(c.repository().opaque_backend_state(), Some("state-7"));

        let payload = serde_json::to_value(c.payload()).unwrap();
        assert_eq!(payload["client"]["state"]["targets_version"], 7);
        assert_eq!(payload["client"]["state"]["backend_client_state"], "state-7");
        assert_eq!(
            payload["client"]["state"]["config_states"],
            json!([{
                "id": "exclusion_filters",
                "product": "ASM",
                "version": 21,
                "apply_state": 1,
                "apply_error": null
            }])
        );
        assert_eq!(
            payload["cached_target_files"],
            json!([{
                "path": EXCLUSIONS_PATH,
                "length": 645,
                "hashes": [{
                    "algorithm": "sha256",
                    "hash": "c8358ce9038693fb74ad8625e4c6c563bd2afb16b4412b2c8f7dba062e9e88de"
                }]
            }])
        );
    }

    #[test]
    fn test_sync_unchanged_paths_produce_no_changes() {
        let mut c = client();
        let files = [(EXCLUSIONS_PATH, 21, EXCLUSIONS)];
        sync(&mut c, body(7, &files, true)).unwrap();

        // cached files need not be resent
        let changes = sync(&mut c, body(8, &files, false)).unwrap();
        assert!(changes.is_empty());
        assert_eq!(c.repository().targets_version(), 8);
    }

    #[test]
    fn test_sync_update_and_delete() {
        let mut c = client();
        sync(
            &mut c,
            body(1, &[(EXCLUSIONS_PATH, 21, EXCLUSIONS), (RULES_PATH, 3, RULES)], true),
        )
        .unwrap();

        let changes = sync(&mut c, body(2, &[(RULES_PATH, 4, b"{\"rules\":[1]}")], true)).unwrap();

        assert_eq!(kinds(&changes), vec![ChangeKind::Deleted, ChangeKind::Updated]);
        assert_eq!(changes.first().unwrap().path().to_string(), EXCLUSIONS_PATH);

        let state = c.repository().state();
        assert_eq!(state.config_states.len(), 1);
        assert_eq!(state.config_states[0].version, 4);
        assert_eq!(state.cached_target_files[0].length, 13);
    }

    #[test]
    fn test_sync_missing_target_aborts() {
        let mut c = client();
        sync(&mut c, body(1, &[(RULES_PATH, 3, RULES)], true)).unwrap();

        let mut raw: Value =
            serde_json::from_slice(&body(2, &[(RULES_PATH, 3, RULES)], true)).unwrap();
        raw["client_configs"] = json!([RULES_PATH, EXCLUSIONS_PATH]);

        let err = sync(&mut c, serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Sync(ref m) if m.contains("no target")));

        assert_eq!(c.repository().targets_version(), 1);
        assert_eq!(c.repository().contents().len(), 1);
        assert!(c.last_error().unwrap().contains("no target"));

        let payload = serde_json::to_value(c.payload()).unwrap();
        assert_eq!(payload["client"]["state"]["has_error"], true);
    }

    #[test]
    fn test_sync_invalid_content_aborts_then_recovers() {
        let mut c = client();
        let mut raw: Value =
            serde_json::from_slice(&body(1, &[(RULES_PATH, 3, RULES)], true)).unwrap();
        raw["target_files"][0]["raw"] = json!(BASE64.encode(b"tampered"));

        let err = sync(&mut c, serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Sync(ref m) if m.contains("no valid content")));
        assert!(c.repository().contents().is_empty());

        sync(&mut c, body(1, &[(RULES_PATH, 3, RULES)], true)).unwrap();
        assert_eq!(c.last_error(), None);
        assert_eq!(c.repository().contents().len(), 1);
    }

    #[test]
    fn test_sync_invalid_path_aborts() {
        let mut c = client();
        let mut raw: Value =
            serde_json::from_slice(&body(1, &[(RULES_PATH, 3, RULES)], true)).unwrap();
        raw["client_configs"] = json!(["not_a_path"]);

        let err = sync(&mut c, serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(matches!(err, Error::PathParse { .. }));
        assert!(c.repository().contents().is_empty());
    }

    #[test]
    fn test_empty_response_keeps_state() {
        let mut c = client();
        sync(&mut c, body(1, &[(RULES_PATH, 3, RULES)], true)).unwrap();

        let changes = sync(&mut c, b"{}".to_vec()).unwrap();
        assert!(changes.is_empty());
        assert_eq!(c.repository().contents().len(), 1);
        assert_eq!(c.repository().targets_version(), 1);
    }

    #[test]
    fn test_empty_sync_clears_error() {
        let mut c = client();
        let mut raw: Value =
            serde_json::from_slice(&body(1, &[(RULES_PATH, 3, RULES)], true)).unwrap();
        raw["client_configs"] = json!(["not_a_path"]);
        sync(&mut c, serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(c.last_error().is_some());

        sync(&mut c, b"{}".to_vec()).unwrap();
        assert_eq!(c.last_error(), None);

        let payload = c.payload();
        assert!(!payload.client.state.has_error);
        assert_eq!(payload.client.state.error, "");
    }

    #[test]
    fn test_empty_target_file_aborts() {
        let mut c = client();
        sync(&mut c, body(1, &[(EXCLUSIONS_PATH, 21, EXCLUSIONS)], true)).unwrap();
        let before = c.repository().state();

        let mut raw: Value =
            serde_json::from_slice(&body(2, &[(RULES_PATH, 3, RULES)], true)).unwrap();
        raw["target_files"][0]["raw"] = json!("");

        let err = sync(&mut c, serde_json::to_vec(&raw).unwrap()).unwrap_err();
        assert!(matches!(err, Error::ContentRead { ref path, .. } if path == RULES_PATH));
        assert_eq!(c.repository().state(), before);
        assert_eq!(c.repository().targets_version(), 1);
        assert!(c.payload().client.state.has_error);
    }

    #[test]
    fn test_payload_app_version() {
        let c = client();
        let payload = serde_json::to_value(c.payload()).unwrap();
        assert!(payload["client"]["client_tracer"].get("app_version").is_none());

        let mut config = Config::default();
        config.identity.app_version = Some("1.2.3".to_string());
        let c = Client::new(config);
        let payload = serde_json::to_value(c.payload()).unwrap();
        assert_eq!(payload["client"]["client_tracer"]["app_version"], "1.2.3");
    }

    #[test]
    fn test_transport_failure() {
        let mut c = client();
        let mut transport = ReplayTransport::new();
        assert!(matches!(
            c.sync(&mut transport),
            Err(Error::Transport { .. })
        ));
        assert_eq!(c.last_error(), None);
    }

    #[test]
    fn test_receivers_acknowledge_changes() {
        let mut c = client();
        c.register(Receiver::new(Matcher::product(["ASM"]), |repo, changes| {
            for change in changes {
                if let Some(content) = repo.content_mut(change.path()) {
                    content.applied();
                }
            }
        }));
        c.register(Receiver::new(Matcher::product(["ASM_DD"]), |repo, changes| {
            for change in changes {
                if let Some(content) = repo.content_mut(change.path()) {
                    content.errored("unsupported rules version");
                }
            }
        }));

        sync(
            &mut c,
            body(1, &[(EXCLUSIONS_PATH, 21, EXCLUSIONS), (RULES_PATH, 3, RULES)], true),
        )
        .unwrap();

        let state = c.repository().state();
        let by_product = |p: &str| {
            state
                .config_states
                .iter()
                .find(|s| s.product == p)
                .cloned()
                .unwrap()
        };
        assert_eq!(by_product("ASM").apply_state, ApplyState::Acknowledged);
        let rules = by_product("ASM_DD");
        assert_eq!(rules.apply_state, ApplyState::Error);
        assert_eq!(rules.apply_error.as_deref(), Some("unsupported rules version"));
    }

    #[test]
    fn test_payload_sent_reflects_previous_sync() {
        let mut c = client();
        let mut transport = ReplayTransport::new();
        transport.push_body(body(5, &[(RULES_PATH, 3, RULES)], true));
        transport.push_body(b"{}".to_vec());

        c.sync(&mut transport).unwrap();
        c.sync(&mut transport).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].client.state.targets_version, 0);
        assert_eq!(sent[1].client.state.targets_version, 5);
        assert_eq!(sent[1].cached_target_files.len(), 1);
    }
}
