use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::{Arc, OnceLock};

use crate::digest::Algorithm;
use crate::error::{Error, Result};
use crate::path::Path;
use crate::target::Target;

/// whether a consumer has applied a content
///
/// serialized as the numeric code reported upstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApplyState {
    #[default]
    Unacknowledged,
    Acknowledged,
    Error,
}

impl ApplyState {
    pub fn code(&self) -> u8 {
        match self {
            ApplyState::Unacknowledged => 1,
            ApplyState::Acknowledged => 2,
            ApplyState::Error => 3,
        }
    }
}

impl Serialize for ApplyState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyState::Unacknowledged => write!(f, "unacknowledged"),
            ApplyState::Acknowledged => write!(f, "acknowledged"),
            ApplyState::Error => write!(f, "error"),
        }
    }
}

/// payload for a path, with lazily computed digests and apply status
///
/// cloning is cheap: the bytes are shared.
#[derive(Clone, Debug)]
pub struct Content {
    path: Path,
    data: Arc<[u8]>,
    digests: [OnceLock<String>; Algorithm::ALL.len()],
    apply_state: ApplyState,
    apply_error: Option<String>,
}

impl Content {
    /// parse a path string and read the payload stream to the end
    ///
    /// a stream that yields no data is a read error.
    pub fn parse<R: Read>(path: &str, mut stream: R) -> Result<Self> {
        let path = Path::parse(path)?;
        let mut data = Vec::new();
        let n = stream
            .read_to_end(&mut data)
            .map_err(|source| Error::ContentRead {
                path: path.to_string(),
                source,
            })?;
        if n == 0 {
            return Err(Error::ContentRead {
                path: path.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream yielded no data",
                ),
            });
        }
        Ok(Self::new(path, data))
    }

    pub fn new(path: Path, data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            path,
            data: Arc::from(data),
            digests: Default::default(),
            apply_state: ApplyState::default(),
            apply_error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// fresh reader over the payload, positioned at the start
    pub fn stream(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.data[..])
    }

    /// actual byte length of the payload
    pub fn length(&self) -> u64 {
        self.data.len() as u64
    }

    /// replace the payload bytes, dropping cached digests
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.data = Arc::from(data);
        self.digests = Default::default();
    }

    /// memoized hex digest; the payload is hashed at most once per algorithm
    pub fn hexdigest(&self, algorithm: Algorithm) -> &str {
        self.digests[algorithm.index()].get_or_init(|| algorithm.hexdigest_bytes(&self.data))
    }

    /// digests computed so far
    pub fn hashes(&self) -> BTreeMap<Algorithm, String> {
        Algorithm::ALL
            .iter()
            .filter_map(|a| self.digests[a.index()].get().map(|h| (*a, h.clone())))
            .collect()
    }

    pub fn apply_state(&self) -> ApplyState {
        self.apply_state
    }

    pub fn apply_error(&self) -> Option<&str> {
        self.apply_error.as_deref()
    }

    /// mark as successfully applied, clearing any earlier error
    pub fn applied(&mut self) {
        self.apply_state = ApplyState::Acknowledged;
        self.apply_error = None;
    }

    /// mark as failed to apply
    pub fn errored(&mut self, message: impl Into<String>) {
        self.apply_state = ApplyState::Error;
        self.apply_error = Some(message.into());
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.data == other.data
            && self.apply_state == other.apply_state
            && self.apply_error == other.apply_error
    }
}

impl Eq for Content {}

/// contents keyed by path, ordered by path
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentList {
    contents: BTreeMap<Path, Content>,
}

impl ContentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// parse (path, stream) pairs as delivered by the transport
    pub fn parse<I, S, R>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, R)>,
        S: AsRef<str>,
        R: Read,
    {
        let mut list = Self::new();
        for (path, stream) in files {
            let content = Content::parse(path.as_ref(), stream)?;
            list.insert(content.path().clone(), content);
        }
        Ok(list)
    }

    /// stored content for path, only if it satisfies the target
    pub fn find_content(&self, path: &Path, target: &Target) -> Option<&Content> {
        self.get(path).filter(|c| target.check(c))
    }

    pub fn get(&self, path: &Path) -> Option<&Content> {
        self.contents.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Content> {
        self.contents.get_mut(path)
    }

    /// store content under path, replacing any previous entry and its key
    pub fn insert(&mut self, path: Path, content: Content) -> Option<Content> {
        let previous = self.contents.remove(&path);
        self.contents.insert(path, content);
        previous
    }

    pub fn remove(&mut self, path: &Path) -> Option<Content> {
        self.contents.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.contents.contains_key(path)
    }

    pub fn paths(&self) -> Vec<Path> {
        self.contents.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Content)> {
        self.contents.iter()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}
