use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// issuer of a configuration unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    /// customer configuration, scoped to an org
    Datadog,
    /// configuration issued by staff, not org scoped
    Employee,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Datadog => "datadog",
            Source::Employee => "employee",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// hierarchical identifier of a configuration unit
///
/// grammar:
///   datadog/<org_id>/<product>/<config_id>/<name>
///   employee/<product>/<config_id>/<name>
///
/// identity (Eq, Hash, Ord) ignores org_id: two paths that differ only in
/// org_id address the same repository slot.
#[derive(Clone, Debug)]
pub struct Path {
    source: Source,
    org_id: Option<u64>,
    product: String,
    config_id: String,
    name: String,
}

impl Path {
    /// build a customer path
    pub fn datadog(
        org_id: u64,
        product: impl Into<String>,
        config_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        Self::build(Source::Datadog, Some(org_id), product, config_id, name)
    }

    /// build an employee path
    pub fn employee(
        product: impl Into<String>,
        config_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        Self::build(Source::Employee, None, product, config_id, name)
    }

    fn build(
        source: Source,
        org_id: Option<u64>,
        product: impl Into<String>,
        config_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let path = Self {
            source,
            org_id,
            product: product.into(),
            config_id: config_id.into(),
            name: name.into(),
        };
        for segment in [&path.product, &path.config_id, &path.name] {
            validate_segment(&path.to_string(), segment)?;
        }
        Ok(path)
    }

    /// parse a path string
    pub fn parse(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.split('/').collect();

        let (source, org_id, rest) = match segments.first().copied() {
            Some("datadog") => {
                if segments.len() == 4 {
                    return Err(Error::path_parse(s, "datadog source requires an org_id"));
                }
                if segments.len() != 5 {
                    return Err(Error::path_parse(s, "wrong number of segments"));
                }
                (Source::Datadog, Some(parse_org_id(s, segments[1])?), &segments[2..])
            }
            Some("employee") => {
                if segments.len() == 5 && is_digits(segments[1]) {
                    return Err(Error::path_parse(s, "employee source does not take an org_id"));
                }
                if segments.len() != 4 {
                    return Err(Error::path_parse(s, "wrong number of segments"));
                }
                (Source::Employee, None, &segments[1..])
            }
            _ => return Err(Error::path_parse(s, "unknown source")),
        };

        for segment in rest {
            validate_segment(s, segment)?;
        }

        Ok(Self {
            source,
            org_id,
            product: rest[0].to_string(),
            config_id: rest[1].to_string(),
            name: rest[2].to_string(),
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// org id, present only for datadog paths
    pub fn org_id(&self) -> Option<u64> {
        self.org_id
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> (Source, &str, &str, &str) {
        (self.source, &self.product, &self.config_id, &self.name)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// org ids must be canonical decimal so that printing reproduces the input
fn parse_org_id(path: &str, s: &str) -> Result<u64> {
    if !is_digits(s) {
        return Err(Error::path_parse(path, "org_id is not an integer"));
    }
    if s.len() > 1 && s.starts_with('0') {
        return Err(Error::path_parse(path, "org_id has leading zeros"));
    }
    s.parse()
        .map_err(|_| Error::path_parse(path, "org_id out of range"))
}

fn validate_segment(path: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::path_parse(path, "empty segment"));
    }
    if segment.contains('/') {
        return Err(Error::path_parse(path, "segment contains '/'"));
    }
    Ok(())
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.org_id {
            Some(org_id) => write!(
                f,
                "{}/{}/{}/{}/{}",
                self.source, org_id, self.product, self.config_id, self.name
            ),
            None => write!(
                f,
                "{}/{}/{}/{}",
                self.source, self.product, self.config_id, self.name
            ),
        }
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
