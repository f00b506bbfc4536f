use std::path::PathBuf;

/// error type for remote config operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid config path '{path}': {reason}")]
    PathParse { path: String, reason: &'static str },

    #[error("invalid hash type: {0}")]
    InvalidHashType(String),

    #[error("failed to read content for {path}: {source}")]
    ContentRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed targets: {0}")]
    MalformedTargets(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 in {field}: {source}")]
    Base64 {
        field: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("sync error: {0}")]
    Sync(String),

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stream error: {0}")]
    Stream(#[source] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("unknown capability: {0}")]
    UnknownCapability(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}

impl Error {
    pub(crate) fn path_parse(path: &str, reason: &'static str) -> Self {
        Error::PathParse {
            path: path.to_string(),
            reason,
        }
    }
}
