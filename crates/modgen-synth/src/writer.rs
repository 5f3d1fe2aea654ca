//! Output directory writer
//!
//! All conflict checks happen before the first byte is written. Each file is
//! written to a temporary sibling and renamed into place.

use crate::manifest::{is_plain_file_name, Manifest, ModuleRecord};
use modgen_core::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A file to be placed in the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// File name relative to the output directory
    pub name: String,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Writes one input's files into an output directory
pub struct OutputWriter<'a> {
    dir: &'a Path,
    manifest_name: &'a str,
    input: &'a Path,
}

impl<'a> OutputWriter<'a> {
    pub fn new(dir: &'a Path, manifest_name: &'a str, input: &'a Path) -> Self {
        Self {
            dir,
            manifest_name,
            input,
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(self.manifest_name)
    }

    /// Refuse to touch anything this input did not generate: hand-written
    /// files, other inputs' files, and the input itself
    pub fn check_conflicts(
        &self,
        previous: Option<&Manifest>,
        record: &ModuleRecord,
        files: &[GeneratedFile],
    ) -> Result<()> {
        let input = self.input.canonicalize().ok();

        for file in files {
            let path = self.dir.join(&file.name);
            if !is_plain_file_name(&file.name) {
                return Err(Error::OutputConflict { path });
            }

            if let (Some(input), Ok(target)) = (&input, path.canonicalize()) {
                if *input == target {
                    return Err(Error::OutputConflict { path });
                }
            }

            let exists = path.try_exists().map_err(|e| Error::io(&path, e))?;
            let ours = previous
                .and_then(|m| m.owner(&file.name))
                .is_some_and(|owner| owner.input == record.input);
            if exists && !ours {
                return Err(Error::OutputConflict { path });
            }
        }
        Ok(())
    }

    /// Write the files, drop this input's stale files from the previous run,
    /// then record the updated manifest. Other inputs' records are kept.
    pub fn write(
        &self,
        previous: Option<&Manifest>,
        record: &ModuleRecord,
        files: &[GeneratedFile],
    ) -> Result<Manifest> {
        std::fs::create_dir_all(self.dir).map_err(|e| Error::io(self.dir, e))?;

        for file in files {
            let path = self.dir.join(&file.name);
            if is_unchanged(&path, &file.contents) {
                debug!("{} unchanged", path.display());
                continue;
            }
            write_atomic(self.dir, &path, file.contents.as_bytes())?;
            info!("Wrote {}", path.display());
        }

        let mut manifest = previous.cloned().unwrap_or_default();
        let stale: Vec<String> = manifest
            .module(&record.input)
            .map(|old| {
                old.files
                    .iter()
                    .filter(|f| !record.owns(f.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        manifest.record(record.clone());

        for name in stale {
            if manifest.owner(&name).is_some() {
                continue;
            }
            let path = self.dir.join(&name);
            match std::fs::remove_file(&path) {
                Ok(()) => info!("Removed stale {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(&path, e)),
            }
        }

        let path = self.manifest_path();
        let json = manifest.to_json()?;
        if !is_unchanged(&path, &json) {
            write_atomic(self.dir, &path, json.as_bytes())?;
        }
        Ok(manifest)
    }

    /// Load the manifest of previous runs in this directory
    pub fn previous_manifest(&self) -> Result<Option<Manifest>> {
        Manifest::load(&self.manifest_path())
    }
}

fn is_unchanged(path: &Path, contents: &str) -> bool {
    std::fs::read(path)
        .map(|existing| existing == contents.as_bytes())
        .unwrap_or(false)
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| Error::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| Error::io(path, e))?;
    }

    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
