//! Settings from `.hunkcommit.toml` merged with command-line overrides.
//!
//! Precedence is command line, then config file, then built-in defaults.

use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, Item};
use tracing::{debug, warn};

use crate::diff::{ChunkLevel, SplitOptions};
use crate::error::ConfigError;
use crate::llm::Provider;

pub const CONFIG_FILE_NAME: &str = ".hunkcommit.toml";
pub const DEFAULT_REMOTE: &str = "origin";

const KNOWN_KEYS: &[&str] = &[
    "chunk_level",
    "parallel",
    "provider",
    "remote",
    "branch",
    "auto_track",
    "split_threshold",
    "max_chunk_bytes",
];

/// Values read from the config file. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub chunk_level: Option<ChunkLevel>,
    pub parallel: Option<usize>,
    pub provider: Option<Provider>,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub auto_track: Option<bool>,
    pub split_threshold: Option<usize>,
    pub max_chunk_bytes: Option<usize>,
}

impl FileConfig {
    /// Load `path`. A missing file yields defaults unless `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!("No config file at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let doc = content
            .parse::<DocumentMut>()
            .map_err(|source| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source,
            })?;

        for (key, _) in doc.iter() {
            if !KNOWN_KEYS.contains(&key) {
                warn!("Unknown key '{key}' in {}", path.display());
            }
        }

        let chunk_level = integer(&doc, "chunk_level")?
            .map(|n| {
                u8::try_from(n)
                    .map_err(|_| format!("chunk level must be 0-3, got {n}"))
                    .and_then(ChunkLevel::try_from)
                    .map_err(|reason| invalid("chunk_level", reason))
            })
            .transpose()?;

        let provider = string(&doc, "provider")?
            .map(|s| s.parse::<Provider>().map_err(|reason| invalid("provider", reason)))
            .transpose()?;

        Ok(Self {
            chunk_level,
            parallel: size(&doc, "parallel")?,
            provider,
            remote: string(&doc, "remote")?,
            branch: string(&doc, "branch")?,
            auto_track: boolean(&doc, "auto_track")?,
            split_threshold: size(&doc, "split_threshold")?,
            max_chunk_bytes: size(&doc, "max_chunk_bytes")?,
        })
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn lookup<'a>(doc: &'a DocumentMut, key: &str) -> Option<&'a Item> {
    doc.get(key).filter(|item| !item.is_none())
}

fn integer(doc: &DocumentMut, key: &str) -> Result<Option<i64>, ConfigError> {
    lookup(doc, key)
        .map(|item| item.as_integer().ok_or_else(|| invalid(key, "expected an integer")))
        .transpose()
}

fn size(doc: &DocumentMut, key: &str) -> Result<Option<usize>, ConfigError> {
    integer(doc, key)?
        .map(|n| usize::try_from(n).map_err(|_| invalid(key, format!("must not be negative, got {n}"))))
        .transpose()
}

fn string(doc: &DocumentMut, key: &str) -> Result<Option<String>, ConfigError> {
    lookup(doc, key)
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(key, "expected a string"))
        })
        .transpose()
}

fn boolean(doc: &DocumentMut, key: &str) -> Result<Option<bool>, ConfigError> {
    lookup(doc, key)
        .map(|item| item.as_bool().ok_or_else(|| invalid(key, "expected true or false")))
        .transpose()
}

/// Values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub chunk_level: Option<ChunkLevel>,
    pub parallel: Option<usize>,
    pub provider: Option<Provider>,
    pub remote: Option<String>,
    pub branch: Option<String>,
    /// Flags can only switch this on.
    pub auto_track: bool,
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub chunk_level: ChunkLevel,
    /// Analysis workers; 0 picks a size from the CPU count.
    pub parallel: usize,
    pub provider: Provider,
    pub remote: String,
    /// Push target; `None` pushes the current branch.
    pub branch: Option<String>,
    pub auto_track: bool,
    pub split: SplitOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_level: ChunkLevel::default(),
            parallel: 0,
            provider: Provider::Claude,
            remote: DEFAULT_REMOTE.to_string(),
            branch: None,
            auto_track: false,
            split: SplitOptions::default(),
        }
    }
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let split = SplitOptions {
            split_threshold: file
                .split_threshold
                .unwrap_or(defaults.split.split_threshold),
            max_chunk_bytes: file
                .max_chunk_bytes
                .unwrap_or(defaults.split.max_chunk_bytes),
        };
        if split.max_chunk_bytes == 0 {
            return Err(invalid("max_chunk_bytes", "must be greater than 0"));
        }

        let remote = overrides
            .remote
            .or(file.remote)
            .unwrap_or(defaults.remote);
        if remote.trim().is_empty() {
            return Err(invalid("remote", "must not be empty"));
        }

        Ok(Self {
            chunk_level: overrides
                .chunk_level
                .or(file.chunk_level)
                .unwrap_or(defaults.chunk_level),
            parallel: overrides.parallel.or(file.parallel).unwrap_or(defaults.parallel),
            provider: overrides
                .provider
                .or(file.provider)
                .unwrap_or(defaults.provider),
            remote,
            branch: overrides.branch.or(file.branch),
            auto_track: overrides.auto_track || file.auto_track.unwrap_or(defaults.auto_track),
            split,
        })
    }
}

/// Config file location: `explicit` when given, else the repository default.
pub fn config_path(repo_root: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| repo_root.join(CONFIG_FILE_NAME))
}
