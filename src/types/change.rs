use std::fmt;

use crate::content::Content;
use crate::path::Path;
use crate::target::Target;

/// kind of a repository change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Inserted => write!(f, "A"),
            ChangeKind::Updated => write!(f, "M"),
            ChangeKind::Deleted => write!(f, "D"),
        }
    }
}

/// one effective operation of a committed transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Inserted {
        path: Path,
        target: Target,
        content: Content,
    },
    Updated {
        path: Path,
        target: Target,
        content: Content,
    },
    /// carries the target and content that were removed
    Deleted {
        path: Path,
        target: Target,
        content: Content,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Inserted { .. } => ChangeKind::Inserted,
            Change::Updated { .. } => ChangeKind::Updated,
            Change::Deleted { .. } => ChangeKind::Deleted,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Change::Inserted { path, .. }
            | Change::Updated { path, .. }
            | Change::Deleted { path, .. } => path,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            Change::Inserted { target, .. }
            | Change::Updated { target, .. }
            | Change::Deleted { target, .. } => target,
        }
    }

    pub fn content(&self) -> &Content {
        match self {
            Change::Inserted { content, .. }
            | Change::Updated { content, .. }
            | Change::Deleted { content, .. } => content,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.path())
    }
}

/// ordered changes produced by one transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn first(&self) -> Option<&Change> {
        self.changes.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.changes.iter().map(Change::path).collect()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
