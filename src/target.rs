use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::content::Content;
use crate::digest::DigestList;
use crate::error::{Error, Result};
use crate::path::Path;

/// signed metadata describing the expected content at one path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    version: u64,
    digests: DigestList,
    length: u64,
}

#[derive(Deserialize)]
struct RawTarget {
    custom: RawTargetCustom,
    hashes: BTreeMap<String, String>,
    length: u64,
}

#[derive(Deserialize)]
struct RawTargetCustom {
    v: u64,
}

impl Target {
    pub fn new(version: u64, digests: DigestList, length: u64) -> Self {
        Self {
            version,
            digests,
            length,
        }
    }

    /// parse a `{custom: {v}, hashes, length}` document
    pub fn parse(raw: &Value) -> Result<Self> {
        let raw = RawTarget::deserialize(raw)?;
        Ok(Self {
            version: raw.custom.v,
            digests: DigestList::parse(&raw.hashes)?,
            length: raw.length,
        })
    }

    /// backend assigned version
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn digests(&self) -> &DigestList {
        &self.digests
    }

    /// declared length; informational, the stored content length is what gets reported
    pub fn length(&self) -> u64 {
        self.length
    }

    /// does content match every declared digest
    pub fn check(&self, content: &Content) -> bool {
        self.digests.check(content)
    }
}

/// path -> target mapping from the signed targets document
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetMap {
    version: u64,
    opaque_backend_state: Option<String>,
    targets: BTreeMap<Path, Target>,
}

#[derive(Deserialize)]
struct RawSignedTargets {
    signed: RawTargets,
}

#[derive(Deserialize)]
struct RawTargets {
    version: u64,
    #[serde(default)]
    custom: RawTargetsCustom,
    #[serde(default)]
    targets: BTreeMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct RawTargetsCustom {
    #[serde(default)]
    opaque_backend_state: Option<String>,
}

impl TargetMap {
    pub fn new(version: u64, opaque_backend_state: Option<String>) -> Self {
        Self {
            version,
            opaque_backend_state,
            targets: BTreeMap::new(),
        }
    }

    /// parse a `{signed: {version, custom, targets}}` document
    ///
    /// the outer signature envelope is not verified here.
    pub fn parse(raw: &Value) -> Result<Self> {
        let raw = RawSignedTargets::deserialize(raw)
            .map_err(|e| Error::MalformedTargets(e.to_string()))?;

        let mut map = Self::new(raw.signed.version, raw.signed.custom.opaque_backend_state);
        for (key, value) in &raw.signed.targets {
            let path = Path::parse(key)?;
            let target = Target::parse(value).map_err(|e| match e {
                Error::Json(e) => Error::MalformedTargets(format!("target {}: {}", key, e)),
                other => other,
            })?;
            map.insert(path, target);
        }
        Ok(map)
    }

    /// parse from raw json bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: Value = serde_json::from_slice(bytes)?;
        Self::parse(&raw)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// token to echo back upstream, never interpreted
    pub fn opaque_backend_state(&self) -> Option<&str> {
        self.opaque_backend_state.as_deref()
    }

    pub fn get(&self, path: &Path) -> Option<&Target> {
        self.targets.get(path)
    }

    pub fn insert(&mut self, path: Path, target: Target) -> Option<Target> {
        let previous = self.targets.remove(&path);
        self.targets.insert(path, target);
        previous
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.targets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Target)> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
