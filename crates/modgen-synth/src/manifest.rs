//! Generation manifest
//!
//! Records which files each input produced so later runs can tell their own
//! output apart from hand-written files and from other inputs' output. One
//! output directory may hold the modules of several inputs.

use modgen_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

pub const GENERATOR: &str = "modgen";

/// What one input generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Input file name
    pub input: String,
    /// Generated file names, relative to the output directory
    pub files: Vec<String>,
    /// Functions that received a stub
    pub stubs: Vec<String>,
    /// Functions that received a forwarding declaration
    pub forwards: Vec<String>,
}

impl ModuleRecord {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            files: Vec::new(),
            stubs: Vec::new(),
            forwards: Vec::new(),
        }
    }

    pub fn owns(&self, file_name: &str) -> bool {
        self.files.iter().any(|f| f == file_name)
    }
}

/// Contents of the manifest file of an output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Always `modgen`
    pub generator: String,
    pub version: String,
    /// One record per input, sorted by input name
    pub modules: Vec<ModuleRecord>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            generator: GENERATOR.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            modules: Vec::new(),
        }
    }
}

impl Manifest {
    /// Load the manifest of previous runs, if any.
    ///
    /// A manifest file that cannot be read as ours, or that names files
    /// outside its directory, is itself a foreign file.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };

        let foreign = || Error::OutputConflict {
            path: path.to_path_buf(),
        };

        let manifest: Manifest = serde_json::from_str(&text).map_err(|_| foreign())?;
        if manifest.generator != GENERATOR {
            return Err(foreign());
        }
        let all_plain = manifest
            .modules
            .iter()
            .flat_map(|m| m.files.iter())
            .all(|f| is_plain_file_name(f));
        if !all_plain {
            return Err(foreign());
        }
        Ok(Some(manifest))
    }

    /// Record of the given input
    pub fn module(&self, input: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.input == input)
    }

    /// Record of the input that generated this file
    pub fn owner(&self, file_name: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.owns(file_name))
    }

    /// Replace the record of `record.input`, or add it
    pub fn record(&mut self, record: ModuleRecord) {
        self.modules.retain(|m| m.input != record.input);
        self.modules.push(record);
        self.modules.sort_by(|a, b| a.input.cmp(&b.input));
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("cannot serialize manifest: {}", e)))?;
        json.push('\n');
        Ok(json)
    }
}

/// A bare file name: no directories, no `..`, not absolute
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
