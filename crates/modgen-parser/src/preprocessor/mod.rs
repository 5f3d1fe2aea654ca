//! C Preprocessor Integration
//!
//! Runs an external C compiler in preprocess-only mode over the input file,
//! against a vendored minimal libc header set, and hands the result to
//! tree-sitter.

pub mod compiler;
pub mod libc;
pub mod line_map;
pub mod macros;

pub use compiler::{PreprocessError, PreprocessOptions, PreprocessResult, Preprocessor};
pub use libc::FakeLibc;
pub use line_map::{strip_line_markers, LineMap};
pub use macros::MacroDefinition;
