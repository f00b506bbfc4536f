use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::str::FromStr;

use crate::content::Content;
use crate::error::{Error, Result};

/// read size used when hashing streams
const DIGEST_CHUNK: usize = 1024;

/// supported hash algorithms
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Sha256, Algorithm::Sha512];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Algorithm::Sha256 => 0,
            Algorithm::Sha512 => 1,
        }
    }

    /// hex digest of an in-memory buffer
    pub fn hexdigest_bytes(&self, data: &[u8]) -> String {
        let mut hasher = Hasher::new(*self);
        hasher.update(data);
        hasher.finalize_hex()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(Algorithm::Sha256),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(Error::InvalidHashType(other.to_string())),
        }
    }
}

impl Serialize for Algorithm {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Algorithm {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// streaming hasher over any supported algorithm
pub struct Hasher {
    inner: HasherInner,
}

enum HasherInner {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    pub fn new(algorithm: Algorithm) -> Self {
        let inner = match algorithm {
            Algorithm::Sha256 => HasherInner::Sha256(Sha256::new()),
            Algorithm::Sha512 => HasherInner::Sha512(Sha512::new()),
        };
        Self { inner }
    }

    /// feed content bytes
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            HasherInner::Sha256(h) => h.update(data),
            HasherInner::Sha512(h) => h.update(data),
        }
    }

    /// finalize and return lowercase hex
    pub fn finalize_hex(self) -> String {
        match self.inner {
            HasherInner::Sha256(h) => hex::encode(h.finalize()),
            HasherInner::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// hash a whole stream and leave it where the caller had it
///
/// the stream is hashed from its start regardless of the current
/// position; the caller's position is restored afterwards.
pub fn hexdigest<R: Read + Seek>(algorithm: Algorithm, stream: &mut R) -> Result<String> {
    let position = stream.stream_position().map_err(Error::Stream)?;
    stream.seek(SeekFrom::Start(0)).map_err(Error::Stream)?;

    let mut hasher = Hasher::new(algorithm);
    let read = read_into(stream, &mut hasher);

    // restore even when the read failed
    stream.seek(SeekFrom::Start(position)).map_err(Error::Stream)?;
    read.map_err(Error::Stream)?;
    Ok(hasher.finalize_hex())
}

fn read_into<R: Read>(stream: &mut R, hasher: &mut Hasher) -> std::io::Result<()> {
    let mut buf = [0u8; DIGEST_CHUNK];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
}

/// hex digest by algorithm name, for callers holding untyped input
pub fn hexdigest_named<R: Read + Seek>(algorithm: &str, stream: &mut R) -> Result<String> {
    hexdigest(algorithm.parse()?, stream)
}

/// an expected digest of content
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Digest {
    pub algorithm: Algorithm,
    /// expected lowercase hex
    pub hexdigest: String,
}

impl Digest {
    pub fn new(algorithm: Algorithm, hexdigest: impl Into<String>) -> Self {
        Self {
            algorithm,
            hexdigest: hexdigest.into().to_ascii_lowercase(),
        }
    }

    /// does content hash to the expected value
    pub fn check(&self, content: &Content) -> bool {
        content.hexdigest(self.algorithm) == self.hexdigest
    }
}

/// expected digests keyed by algorithm
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestList {
    digests: BTreeMap<Algorithm, Digest>,
}

impl DigestList {
    pub fn new() -> Self {
        Self::default()
    }

    /// parse from an algorithm name -> hex map
    ///
    /// unsupported algorithm names are rejected here rather than at check
    /// time.
    pub fn parse<'a, I>(hashes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut list = Self::new();
        for (name, hex) in hashes {
            list.push(Digest::new(name.parse()?, hex.as_str()));
        }
        Ok(list)
    }

    pub fn push(&mut self, digest: Digest) {
        self.digests.insert(digest.algorithm, digest);
    }

    pub fn get(&self, algorithm: Algorithm) -> Option<&Digest> {
        self.digests.get(&algorithm)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Digest> {
        self.digests.values()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// true only if every digest matches; an empty list never matches
    pub fn check(&self, content: &Content) -> bool {
        !self.digests.is_empty() && self.digests.values().all(|d| d.check(content))
    }
}
