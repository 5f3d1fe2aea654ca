//! modgen Parser
//!
//! Turns a C header or source file into a [`TranslationUnit`] model.
//!
//! ## Modules
//!
//! - `preprocessor` - external `cc -E` integration with vendored libc headers
//! - `ast` - the preprocessed tree-sitter tree and top-level classification
//! - `extract` - function signature extraction
//! - `includes` - `#include` directive scanning

pub mod ast;
pub mod extract;
pub mod includes;
pub mod preprocessor;

pub use ast::{PreprocessedAst, TopLevel};
pub use extract::SignatureExtractor;
pub use preprocessor::Preprocessor;

use modgen_core::config::PreprocessorConfig;
use modgen_core::{Error, Result, TranslationUnit};
use std::path::Path;
use tracing::Span;

/// Produces a parsed, preprocessed AST for an input file
pub trait PreprocessingAdapter {
    /// Preprocess and parse a file
    fn run_preprocessor(&self, input: &Path) -> Result<PreprocessedAst>;

    /// Get adapter name
    fn name(&self) -> &str;
}

/// Adapter that parses the file as-is, without running a preprocessor.
///
/// Macros stay unexpanded, so this only suits inputs that are already
/// preprocessed or use no macros in function signatures.
pub struct RawSource {
    span: Span,
}

impl RawSource {
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

impl PreprocessingAdapter for RawSource {
    fn run_preprocessor(&self, input: &Path) -> Result<PreprocessedAst> {
        let _enter = self.span.enter();
        let source = std::fs::read_to_string(input).map_err(|e| Error::Preprocess {
            message: format!("cannot read {}", input.display()),
            stderr: e.to_string(),
        })?;
        PreprocessedAst::from_source(input, &source)
    }

    fn name(&self) -> &str {
        "raw"
    }
}

/// Get the adapter selected by the configuration
pub fn get_adapter(
    config: &PreprocessorConfig,
    span: Span,
) -> Result<Box<dyn PreprocessingAdapter>> {
    if config.enabled {
        Ok(Box::new(Preprocessor::new(config, span)?))
    } else {
        Ok(Box::new(RawSource::new(span)))
    }
}

/// Preprocess and extract one file
pub fn parse_file(
    adapter: &dyn PreprocessingAdapter,
    extractor: &SignatureExtractor,
    input: &Path,
) -> Result<TranslationUnit> {
    let ast = adapter.run_preprocessor(input)?;
    extractor.extract(&ast)
}
