use std::collections::BTreeMap;

use tracing::debug;

use crate::content::{Content, ContentList};
use crate::error::Result;
use crate::path::Path;
use crate::target::Target;
use crate::types::{CachedHash, CachedTargetFile, Change, ChangeSet, ConfigState, State};

/// root metadata version reported upstream; root rotation is not tracked
const ROOT_VERSION: u64 = 1;

/// authoritative store of applied configuration
///
/// structural changes only happen through [`Repository::transaction`].
/// there is no internal locking: at most one transaction may be open at a
/// time, which `&mut self` enforces.
#[derive(Clone, Debug)]
pub struct Repository {
    root_version: u64,
    targets_version: u64,
    opaque_backend_state: Option<String>,
    contents: ContentList,
    targets: BTreeMap<Path, Target>,
}

impl Default for Repository {
    fn default() -> Self {
        Self {
            root_version: ROOT_VERSION,
            targets_version: 0,
            opaque_backend_state: None,
            contents: ContentList::new(),
            targets: BTreeMap::new(),
        }
    }
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// run `f` against a new transaction and commit it
    ///
    /// `f` sees the repository as it was before the transaction. if `f`
    /// fails nothing is committed and the repository is unchanged.
    pub fn transaction<F>(&mut self, f: F) -> Result<ChangeSet>
    where
        F: FnOnce(&Repository, &mut Transaction) -> Result<()>,
    {
        let mut transaction = Transaction::new();
        f(self, &mut transaction)?;
        Ok(self.commit(transaction))
    }

    fn commit(&mut self, transaction: Transaction) -> ChangeSet {
        let mut changes = ChangeSet::new();

        for op in transaction.operations {
            match op {
                Operation::Insert {
                    path,
                    target,
                    content,
                } => {
                    if self.contents.contains(&path) {
                        continue;
                    }
                    self.store(&path, &target, &content);
                    debug!(path = %path, version = target.version(), "inserted");
                    changes.push(Change::Inserted {
                        path,
                        target,
                        content,
                    });
                }
                Operation::Update {
                    path,
                    target,
                    content,
                } => {
                    if !self.contents.contains(&path) {
                        continue;
                    }
                    self.store(&path, &target, &content);
                    debug!(path = %path, version = target.version(), "updated");
                    changes.push(Change::Updated {
                        path,
                        target,
                        content,
                    });
                }
                Operation::Delete { path } => {
                    let target = self.targets.remove(&path);
                    let content = self.contents.remove(&path);
                    if let (Some(target), Some(content)) = (target, content) {
                        debug!(path = %path, "deleted");
                        changes.push(Change::Deleted {
                            path,
                            target,
                            content,
                        });
                    }
                }
                Operation::SetOpaqueBackendState(state) => {
                    self.opaque_backend_state = state;
                }
                Operation::SetTargetsVersion(version) => {
                    self.targets_version = version;
                }
            }
        }

        debug!(
            changes = changes.len(),
            targets_version = self.targets_version,
            "transaction committed"
        );
        changes
    }

    fn store(&mut self, path: &Path, target: &Target, content: &Content) {
        self.targets.remove(path);
        self.targets.insert(path.clone(), target.clone());
        self.contents.insert(path.clone(), content.clone());
    }

    pub fn root_version(&self) -> u64 {
        self.root_version
    }

    pub fn targets_version(&self) -> u64 {
        self.targets_version
    }

    pub fn opaque_backend_state(&self) -> Option<&str> {
        self.opaque_backend_state.as_deref()
    }

    pub fn contents(&self) -> &ContentList {
        &self.contents
    }

    pub fn paths(&self) -> Vec<Path> {
        self.contents.paths()
    }

    /// target last associated with path
    pub fn target(&self, path: &Path) -> Option<&Target> {
        self.targets.get(path)
    }

    /// stored content for marking it applied or errored
    pub fn content_mut(&mut self, path: &Path) -> Option<&mut Content> {
        self.contents.get_mut(path)
    }

    /// snapshot for the upstream status report
    pub fn state(&self) -> State {
        let mut config_states = Vec::with_capacity(self.contents.len());
        let mut cached_target_files = Vec::with_capacity(self.contents.len());

        for (path, content) in self.contents.iter() {
            let version = self.targets.get(path).map(Target::version).unwrap_or(0);

            config_states.push(ConfigState {
                id: path.config_id().to_string(),
                product: path.product().to_string(),
                version,
                apply_state: content.apply_state(),
                apply_error: content.apply_error().map(str::to_string),
            });

            cached_target_files.push(CachedTargetFile {
                path: path.to_string(),
                length: content.length(),
                hashes: content
                    .hashes()
                    .into_iter()
                    .map(|(algorithm, hash)| CachedHash { algorithm, hash })
                    .collect(),
            });
        }

        State {
            root_version: self.root_version,
            targets_version: self.targets_version,
            opaque_backend_state: self.opaque_backend_state.clone(),
            config_states,
            cached_target_files,
        }
    }
}

#[derive(Debug)]
enum Operation {
    Insert {
        path: Path,
        target: Target,
        content: Content,
    },
    Update {
        path: Path,
        target: Target,
        content: Content,
    },
    Delete {
        path: Path,
    },
    SetOpaqueBackendState(Option<String>),
    SetTargetsVersion(u64),
}

/// operations recorded for one commit, applied in the order issued
#[derive(Debug, Default)]
pub struct Transaction {
    operations: Vec<Operation>,
}

impl Transaction {
    fn new() -> Self {
        Self::default()
    }

    /// store content at path unless the path is already present
    pub fn insert(&mut self, path: Path, target: Target, content: Content) {
        self.operations.push(Operation::Insert {
            path,
            target,
            content,
        });
    }

    /// replace content at path; no effect if the path is absent
    pub fn update(&mut self, path: Path, target: Target, content: Content) {
        self.operations.push(Operation::Update {
            path,
            target,
            content,
        });
    }

    /// remove path; no effect if the path is absent
    pub fn delete(&mut self, path: Path) {
        self.operations.push(Operation::Delete { path });
    }

    pub fn set_opaque_backend_state(&mut self, state: Option<String>) {
        self.operations
            .push(Operation::SetOpaqueBackendState(state));
    }

    pub fn set_targets_version(&mut self, version: u64) {
        self.operations.push(Operation::SetTargetsVersion(version));
    }

    /// number of recorded operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
