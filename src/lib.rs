//! rcsync - remote configuration sync engine
//!
//! receives signed configuration bundles, verifies payloads against the
//! signed target metadata, keeps an authoritative snapshot of what is
//! applied, and produces the status report the backend uses to confirm
//! application or diagnose errors.
//!
//! # Core concepts
//!
//! - **Path**: identifier of a configuration unit
//!   (`datadog/<org_id>/<product>/<config_id>/<name>` or
//!   `employee/<product>/<config_id>/<name>`)
//! - **Target**: signed expectation for a path (version, digests, length)
//! - **Content**: the payload for a path, its cached digests and apply state
//! - **Repository**: path -> content store, changed only through transactions
//!   that yield a **ChangeSet**
//!
//! path identity ignores org_id: paths differing only in org_id share a slot.
//!
//! # Example usage
//!
//! ```no_run
//! use rcsync::{Client, Config, ReplayTransport};
//!
//! let mut client = Client::new(Config::default());
//! let mut transport = ReplayTransport::from_files(["response.json"]);
//! let changes = client.sync(&mut transport).unwrap();
//! for change in &changes {
//!     println!("{}", change);
//! }
//! let report = client.repository().state().report();
//! ```

mod capability;
mod client;
mod config;
mod content;
mod digest;
mod dispatch;
mod error;
mod path;
mod repo;
mod target;

pub mod transport;
pub mod types;

pub use capability::Capability;
pub use client::Client;
pub use config::{Config, Identity};
pub use content::{ApplyState, Content, ContentList};
pub use digest::{hexdigest, hexdigest_named, Algorithm, Digest, DigestList, Hasher};
pub use dispatch::{Dispatcher, Matcher, Receiver};
pub use error::{Error, IoResultExt, Result};
pub use path::{Path, Source};
pub use repo::{Repository, Transaction};
pub use target::{Target, TargetMap};
pub use transport::{Payload, ReplayTransport, Response, Transport};
pub use types::{
    CachedHash, CachedTargetFile, Change, ChangeKind, ChangeSet, ConfigState, State, StatusReport,
};
