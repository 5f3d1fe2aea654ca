//! Vendored minimal libc headers
//!
//! Every standard header name resolves to a stub that only pulls in a shared
//! set of macros and typedefs, so preprocessing never reads the host's system
//! headers and the extractor never sees real libc declarations.

use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

const FAKE_DEFINES: &str = include_str!("../../fake_libc/_fake_defines.h");
const FAKE_TYPEDEFS: &str = include_str!("../../fake_libc/_fake_typedefs.h");

const STUB_BODY: &str = "#include \"_fake_defines.h\"\n#include \"_fake_typedefs.h\"\n";

/// Standard header names served by the stub set
pub const HEADER_NAMES: &[&str] = &[
    "assert.h",
    "ctype.h",
    "errno.h",
    "fcntl.h",
    "float.h",
    "inttypes.h",
    "limits.h",
    "locale.h",
    "math.h",
    "setjmp.h",
    "signal.h",
    "stdarg.h",
    "stdbool.h",
    "stddef.h",
    "stdint.h",
    "stdio.h",
    "stdlib.h",
    "string.h",
    "strings.h",
    "time.h",
    "unistd.h",
    "wchar.h",
    "sys/stat.h",
    "sys/time.h",
    "sys/types.h",
];

/// A materialized copy of the header set, removed on drop
pub struct FakeLibc {
    dir: TempDir,
}

impl FakeLibc {
    /// Write the header set into a fresh temporary directory
    pub fn materialize() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("modgen-libc").tempdir()?;
        let root = dir.path();

        fs::write(root.join("_fake_defines.h"), FAKE_DEFINES)?;
        fs::write(root.join("_fake_typedefs.h"), FAKE_TYPEDEFS)?;

        for name in HEADER_NAMES {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, STUB_BODY)?;
        }

        debug!("Fake libc materialized at {:?}", root);
        Ok(Self { dir })
    }

    /// Include directory to pass with -I
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize() {
        let libc = FakeLibc::materialize().unwrap();
        for name in HEADER_NAMES {
            assert!(libc.path().join(name).is_file(), "missing {}", name);
        }
        let typedefs = fs::read_to_string(libc.path().join("_fake_typedefs.h")).unwrap();
        assert!(typedefs.contains("typedef _Bool bool;"));
    }

    #[test]
    fn test_removed_on_drop() {
        let libc = FakeLibc::materialize().unwrap();
        let root = libc.path().to_path_buf();
        drop(libc);
        assert!(!root.exists());
    }
}
