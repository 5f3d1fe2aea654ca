//! Configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// modgen configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preprocessor configuration
    pub preprocessor: PreprocessorConfig,

    /// Synthesis configuration
    pub synthesis: SynthesisConfig,
}

impl Config {
    /// Load a configuration file (YAML); missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

/// Preprocessor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    /// Run the preprocessor; when off the input is parsed as written
    pub enabled: bool,

    /// C compiler used as preprocessor (auto-detected when unset)
    pub compiler: Option<PathBuf>,

    /// Extra include paths (-I)
    pub include_paths: Vec<PathBuf>,

    /// Extra macro definitions, `NAME` or `NAME=VALUE` (-D)
    pub defines: Vec<String>,

    /// Use the vendored minimal libc headers instead of the host's
    pub use_fake_libc: bool,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compiler: None,
            include_paths: Vec::new(),
            defines: Vec::new(),
            use_fake_libc: true,
        }
    }
}

/// What a generated stub does when called
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StubPolicy {
    /// Return a zero-initialized value of the return type
    #[default]
    Zero,
    /// Call `abort()`
    Abort,
    /// Leave the body empty (non-void functions fall back to `Zero`)
    Empty,
}

impl std::str::FromStr for StubPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "zero" | "default" => Ok(StubPolicy::Zero),
            "abort" => Ok(StubPolicy::Abort),
            "empty" => Ok(StubPolicy::Empty),
            _ => Err(Error::Config(format!("unknown stub policy: {}", s))),
        }
    }
}

/// Synthesis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Body of generated stubs
    pub stub_policy: StubPolicy,

    /// Emit a function-pointer ops table for link-time substitution
    pub emit_ops_table: bool,

    /// File name of the manifest written next to the generated files
    pub manifest_name: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            stub_policy: StubPolicy::Zero,
            emit_ops_table: false,
            manifest_name: "modgen-manifest.json".into(),
        }
    }
}
