use serde::Serialize;

use crate::content::ApplyState;
use crate::digest::Algorithm;

/// one computed digest of a cached file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CachedHash {
    pub algorithm: Algorithm,
    pub hash: String,
}

/// a stored content as reported upstream
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CachedTargetFile {
    pub path: String,
    /// actual byte length of the stored payload
    pub length: u64,
    /// digests computed so far
    pub hashes: Vec<CachedHash>,
}

/// apply status of one stored config
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigState {
    /// config_id segment of the path
    pub id: String,
    pub product: String,
    /// version of the target last associated with the path
    pub version: u64,
    pub apply_state: ApplyState,
    pub apply_error: Option<String>,
}

/// snapshot of the repository for the upstream request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct State {
    pub root_version: u64,
    pub targets_version: u64,
    pub opaque_backend_state: Option<String>,
    pub config_states: Vec<ConfigState>,
    pub cached_target_files: Vec<CachedTargetFile>,
}

/// the status report part of a state
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub cached_target_files: Vec<CachedTargetFile>,
    pub config_states: Vec<ConfigState>,
}

impl State {
    pub fn report(&self) -> StatusReport {
        StatusReport {
            cached_target_files: self.cached_target_files.clone(),
            config_states: self.config_states.clone(),
        }
    }

    /// any stored config failed to apply
    pub fn has_apply_errors(&self) -> bool {
        self.config_states
            .iter()
            .any(|c| c.apply_state == ApplyState::Error)
    }
}
