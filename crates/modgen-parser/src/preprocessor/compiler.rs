//! C compiler preprocessor wrapper
//!
//! Wraps `cc -E` (gcc, clang, or whatever `cc` is) for macro expansion and
//! conditional inclusion, with line markers kept so errors can point at the
//! original files.

use modgen_core::config::PreprocessorConfig;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn, Span};

use super::libc::FakeLibc;
use super::line_map::strip_line_markers;
use super::macros::MacroDefinition;
use crate::ast::PreprocessedAst;
use crate::includes::scan_includes;
use crate::PreprocessingAdapter;

/// Errors that can occur during preprocessing
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("No C compiler found (tried {0}). Please install gcc or clang.")]
    CompilerNotFound(String),

    #[error("{compiler} exited with {status}")]
    Failed {
        compiler: String,
        status: String,
        stderr: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid source file: {0}")]
    InvalidSource(String),
}

impl From<PreprocessError> for modgen_core::Error {
    fn from(err: PreprocessError) -> Self {
        let stderr = match &err {
            PreprocessError::Failed { stderr, .. } => stderr.clone(),
            _ => String::new(),
        };
        modgen_core::Error::Preprocess {
            message: err.to_string(),
            stderr,
        }
    }
}

/// Options for preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Macro definitions (-D flags)
    pub defines: Vec<MacroDefinition>,
    /// Include paths (-I flags)
    pub includes: Vec<PathBuf>,
    /// Resolve standard headers against the vendored stub set
    pub use_fake_libc: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            defines: MacroDefinition::gnu_extension_erasers(),
            includes: Vec::new(),
            use_fake_libc: true,
        }
    }
}

impl PreprocessOptions {
    /// Build options from the user configuration
    pub fn from_config(config: &PreprocessorConfig) -> Self {
        let mut options = Self::default();
        options
            .defines
            .extend(config.defines.iter().map(|d| MacroDefinition::parse(d)));
        options.includes = config.include_paths.clone();
        options.use_fake_libc = config.use_fake_libc;
        options
    }
}

/// Result of preprocessing
#[derive(Debug)]
pub struct PreprocessResult {
    /// Preprocessed source code, line markers included
    pub code: String,
    /// Warnings generated during preprocessing
    pub warnings: Vec<String>,
}

/// External C preprocessor
pub struct Preprocessor {
    /// Path to the compiler executable
    compiler: PathBuf,
    options: PreprocessOptions,
    span: Span,
}

const CANDIDATES: &[&str] = &["gcc", "clang", "cc"];

impl Preprocessor {
    /// Create a preprocessor from configuration, auto-detecting the compiler
    /// unless one is configured
    pub fn new(config: &PreprocessorConfig, span: Span) -> Result<Self, PreprocessError> {
        let compiler = match &config.compiler {
            Some(path) => path.clone(),
            None => Self::find_compiler()?,
        };
        debug!(parent: &span, "Using preprocessor {:?}", compiler);
        Ok(Self {
            compiler,
            options: PreprocessOptions::from_config(config),
            span,
        })
    }

    /// Create a preprocessor with a specific compiler path
    pub fn with_compiler(compiler: PathBuf, options: PreprocessOptions, span: Span) -> Self {
        Self {
            compiler,
            options,
            span,
        }
    }

    fn find_compiler() -> Result<PathBuf, PreprocessError> {
        for candidate in CANDIDATES {
            if let Ok(output) = Command::new(candidate).arg("--version").output() {
                if output.status.success() {
                    return Ok(PathBuf::from(candidate));
                }
            }
        }

        Err(PreprocessError::CompilerNotFound(CANDIDATES.join(", ")))
    }

    /// Preprocess a source file
    pub fn preprocess_file(&self, source_path: &Path) -> Result<PreprocessResult, PreprocessError> {
        if !source_path.is_file() {
            return Err(PreprocessError::InvalidSource(format!(
                "File not found: {}",
                source_path.display()
            )));
        }

        // Kept alive until the compiler has exited.
        let fake_libc = if self.options.use_fake_libc {
            Some(FakeLibc::materialize()?)
        } else {
            None
        };

        let args = self.build_args(fake_libc.as_ref().map(|l| l.path()));
        debug!("Preprocessing {:?} with args: {:?}", source_path, args);

        let output = Command::new(&self.compiler)
            .args(&args)
            .arg(source_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    PreprocessError::CompilerNotFound(self.compiler.display().to_string())
                }
                _ => PreprocessError::IoError(e),
            })?;

        if !output.status.success() {
            return Err(PreprocessError::Failed {
                compiler: self.compiler.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(PreprocessResult {
            code: String::from_utf8_lossy(&output.stdout).into_owned(),
            warnings: parse_warnings(&output.stderr),
        })
    }

    /// Build compiler command line arguments
    fn build_args(&self, fake_libc: Option<&Path>) -> Vec<String> {
        let mut args = vec![
            "-E".to_string(), // Preprocess only
            "-x".to_string(),
            "c".to_string(),
        ];

        if let Some(dir) = fake_libc {
            args.push("-nostdinc".to_string());
            args.push(format!("-I{}", dir.display()));
        }

        for include in &self.options.includes {
            args.push(format!("-I{}", include.display()));
        }

        for macro_def in &self.options.defines {
            args.push(macro_def.to_arg());
        }

        args
    }
}

impl PreprocessingAdapter for Preprocessor {
    fn run_preprocessor(&self, input: &Path) -> modgen_core::Result<PreprocessedAst> {
        let _enter = self.span.enter();

        let raw = std::fs::read_to_string(input).map_err(|e| modgen_core::Error::Preprocess {
            message: format!("cannot read {}", input.display()),
            stderr: e.to_string(),
        })?;

        let result = self.preprocess_file(input)?;
        for warning in &result.warnings {
            warn!("{}", warning);
        }

        let (code, line_map) = strip_line_markers(&result.code, &input.to_string_lossy());
        debug!(
            "Preprocessed {:?}: {} lines from {} files",
            input,
            code.lines().count(),
            line_map.files().len()
        );

        PreprocessedAst::parse(input, code, line_map, scan_includes(&raw))
    }

    fn name(&self) -> &str {
        "cc -E"
    }
}

/// Lines of stderr that are warnings
fn parse_warnings(stderr: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .filter(|line| line.contains("warning:"))
        .map(|s| s.to_string())
        .collect()
}
