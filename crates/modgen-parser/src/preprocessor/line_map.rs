//! Line marker handling
//!
//! `cc -E` interleaves its output with line markers (`# 12 "api.h" 2`).
//! tree-sitter does not understand them, so they are blanked out and their
//! information is kept in a [`LineMap`] that translates rows of the
//! preprocessed text back to original files and lines.

use modgen_core::Location;
use regex::Regex;
use std::sync::OnceLock;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*#\s*(?:line\s+)?(\d+)\s+"((?:[^"\\]|\\.)*)""#)
            .expect("line marker regex is valid")
    })
}

/// Maps preprocessed rows (0-based) to original file and line
#[derive(Debug, Clone, Default)]
pub struct LineMap {
    files: Vec<String>,
    /// (index into `files`, 1-based line), `None` for blanked marker rows
    rows: Vec<Option<(usize, u32)>>,
}

impl LineMap {
    /// Original location of a (row, column) in the preprocessed text
    pub fn location(&self, row: usize, column: usize) -> Location {
        match self.rows.get(row).copied().flatten() {
            Some((file, line)) => Location::new(self.files[file].clone(), line, column as u32),
            None => {
                let file = self.files.first().cloned().unwrap_or_default();
                Location::new(file, row as u32 + 1, column as u32)
            }
        }
    }

    /// Every distinct file that contributed lines, in first-seen order
    pub fn files(&self) -> &[String] {
        &self.files
    }

    fn file_index(&mut self, file: &str) -> usize {
        match self.files.iter().position(|f| f == file) {
            Some(index) => index,
            None => {
                self.files.push(file.to_string());
                self.files.len() - 1
            }
        }
    }
}

/// Blank out line markers and record where each remaining row came from.
///
/// Rows are preserved one-to-one so tree-sitter positions stay valid. Text
/// without markers maps row N to line N+1 of `default_file`.
pub fn strip_line_markers(code: &str, default_file: &str) -> (String, LineMap) {
    let mut map = LineMap::default();
    let mut current = map.file_index(default_file);
    let mut next_line: u32 = 1;
    let mut stripped = String::with_capacity(code.len());

    for line in code.lines() {
        if let Some(caps) = marker_regex().captures(line) {
            let file = unescape(&caps[2]);
            current = map.file_index(&file);
            next_line = caps[1].parse().unwrap_or(1);
            map.rows.push(None);
            stripped.push('\n');
            continue;
        }

        map.rows.push(Some((current, next_line)));
        next_line += 1;
        stripped.push_str(line);
        stripped.push('\n');
    }

    (stripped, map)
}

fn unescape(file: &str) -> String {
    let mut out = String::with_capacity(file.len());
    let mut chars = file.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_preserves_rows() {
        let code = "# 1 \"api.h\"\n# 1 \"<built-in>\" 1\n# 1 \"api.h\"\nint f(void);\n\nint g(void);\n";
        let (stripped, map) = strip_line_markers(code, "api.h");

        assert_eq!(stripped.lines().count(), code.lines().count());
        assert!(!stripped.contains('#'));
        assert_eq!(map.location(3, 0), Location::new("api.h", 1, 0));
        assert_eq!(map.location(5, 4), Location::new("api.h", 3, 4));
    }

    #[test]
    fn test_included_file_locations() {
        let code = r#"# 1 "main.c"
# 1 "/tmp/libc/stdbool.h" 1
typedef _Bool bool;
# 2 "main.c" 2
bool ok(void);
"#;
        let (_, map) = strip_line_markers(code, "main.c");

        assert_eq!(map.location(2, 0), Location::new("/tmp/libc/stdbool.h", 1, 0));
        assert_eq!(map.location(4, 0), Location::new("main.c", 2, 0));
        assert_eq!(map.files(), &["main.c", "/tmp/libc/stdbool.h"]);
    }

    #[test]
    fn test_no_markers() {
        let (stripped, map) = strip_line_markers("int a;\nint b;", "x.c");
        assert_eq!(stripped, "int a;\nint b;\n");
        assert_eq!(map.location(1, 2), Location::new("x.c", 2, 2));
    }

    #[test]
    fn test_escaped_file_name() {
        let (_, map) = strip_line_markers("# 7 \"dir\\\\odd.h\"\nint a;\n", "x.c");
        assert_eq!(map.location(1, 0).file, "dir\\odd.h");
        assert_eq!(map.location(1, 0).line, 7);
    }
}
