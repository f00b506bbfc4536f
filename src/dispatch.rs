//! routing of committed changes to configuration consumers

use tracing::debug;

use crate::path::Path;
use crate::repo::Repository;
use crate::types::{Change, ChangeSet};

/// selects which changes a receiver gets
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// changes whose path product is listed
    Product(Vec<String>),
    /// every change
    Any,
}

impl Matcher {
    pub fn product<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Matcher::Product(products.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Matcher::Product(products) => products.iter().any(|p| p == path.product()),
            Matcher::Any => true,
        }
    }
}

type Callback = Box<dyn FnMut(&mut Repository, &[&Change]) + Send>;

/// a consumer of changes
///
/// the callback gets the repository so it can mark the contents it
/// handled as applied or errored.
pub struct Receiver {
    matcher: Matcher,
    callback: Callback,
}

impl Receiver {
    pub fn new<F>(matcher: Matcher, callback: F) -> Self
    where
        F: FnMut(&mut Repository, &[&Change]) + Send + 'static,
    {
        Self {
            matcher,
            callback: Box::new(callback),
        }
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

/// fans a change set out to receivers
#[derive(Debug, Default)]
pub struct Dispatcher {
    receivers: Vec<Receiver>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, receiver: Receiver) {
        self.receivers.push(receiver);
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// call every receiver once with the changes it matches
    ///
    /// receivers matching nothing are not called.
    pub fn dispatch(&mut self, changes: &ChangeSet, repository: &mut Repository) {
        for receiver in &mut self.receivers {
            let matching: Vec<&Change> = changes
                .iter()
                .filter(|c| receiver.matcher.matches(c.path()))
                .collect();
            if matching.is_empty() {
                continue;
            }
            for change in &matching {
                debug!(change = %change, "dispatching remote config change");
            }
            (receiver.callback)(repository, &matching);
        }
    }
}
