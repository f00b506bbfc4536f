mod change;
mod state;

pub use change::{Change, ChangeKind, ChangeSet};
pub use state::{CachedHash, CachedTargetFile, ConfigState, State, StatusReport};
