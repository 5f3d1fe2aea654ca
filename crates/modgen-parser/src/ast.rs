//! Preprocessed syntax tree and top-level classification

use crate::includes::scan_includes;
use crate::preprocessor::line_map::{strip_line_markers, LineMap};
use modgen_core::{Error, FunctionSignature, IncludeDirective, Location, Result};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser as TSParser, Tree};

/// A preprocessed translation unit parsed by tree-sitter.
///
/// Owns the preprocessed text (line markers blanked), its syntax tree, and
/// the map from preprocessed rows back to original files.
#[derive(Debug)]
pub struct PreprocessedAst {
    source_path: PathBuf,
    code: String,
    tree: Tree,
    line_map: LineMap,
    includes: Vec<IncludeDirective>,
}

impl PreprocessedAst {
    /// Parse preprocessed text whose line markers were already stripped
    pub fn parse(
        source_path: &Path,
        code: String,
        line_map: LineMap,
        includes: Vec<IncludeDirective>,
    ) -> Result<Self> {
        let mut parser = TSParser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .map_err(|e| Error::Preprocess {
                message: "failed to load the C grammar".into(),
                stderr: e.to_string(),
            })?;

        let tree = parser.parse(&code, None).ok_or_else(|| Error::Preprocess {
            message: format!("tree-sitter produced no tree for {}", source_path.display()),
            stderr: String::new(),
        })?;

        Ok(Self {
            source_path: source_path.to_path_buf(),
            code,
            tree,
            line_map,
            includes,
        })
    }

    /// Parse source text without running a preprocessor. Line markers, if
    /// any, are honoured; include directives are scanned from the text.
    pub fn from_source(source_path: &Path, source: &str) -> Result<Self> {
        let (code, line_map) = strip_line_markers(source, &source_path.to_string_lossy());
        Self::parse(source_path, code, line_map, scan_includes(source))
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn includes(&self) -> &[IncludeDirective] {
        &self.includes
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Source text of a node
    pub fn text(&self, node: Node) -> &str {
        node.utf8_text(self.code.as_bytes()).unwrap_or("")
    }

    /// Original location of a node
    pub fn location(&self, node: Node) -> Location {
        let start = node.start_position();
        self.line_map.location(start.row, start.column)
    }
}

/// Classification of one top-level node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopLevel {
    /// Function prototype without a body
    Declaration(FunctionSignature),
    /// Function with a body
    Definition(FunctionSignature),
    /// Anything else (typedefs, structs, variables, ...)
    Other,
}

/// First `ERROR` or `MISSING` node in document order, if any
pub fn first_error(node: Node) -> Option<Node> {
    if !node.has_error() {
        return None;
    }

    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.is_error() || current.is_missing() {
            return Some(current);
        }
        let mut cursor = current.walk();
        let children: Vec<Node> = current
            .children(&mut cursor)
            .filter(|c| c.has_error())
            .collect();
        // Reverse so the leftmost child is visited first.
        stack.extend(children.into_iter().rev());
    }

    None
}
