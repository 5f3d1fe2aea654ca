//! Core type definitions
//!
//! The normalized, language-agnostic model of a C translation unit's
//! functions. Rendering back to C text lives here too because the exact
//! spelling is part of the model's contract: a rendered signature must
//! re-extract to an equal signature.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A base type name plus the number of pointer indirections applied to it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Base type, e.g. `int`, `unsigned char`, `const char`, `struct node`
    pub base: String,
    /// 0 = value, N = N-level pointer chain
    pub pointer_depth: u32,
}

impl TypeDescriptor {
    pub fn new(base: impl Into<String>, pointer_depth: u32) -> Self {
        Self {
            base: base.into(),
            pointer_depth,
        }
    }

    /// A plain value type
    pub fn value(base: impl Into<String>) -> Self {
        Self::new(base, 0)
    }

    pub fn is_void(&self) -> bool {
        self.pointer_depth == 0 && self.base == "void"
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// Render followed by a declarator name, e.g. `char **argv` or `int n`
    pub fn render_with_name(&self, name: &str) -> String {
        if self.is_pointer() {
            format!("{}{}", self, name)
        } else {
            format!("{} {}", self, name)
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pointer_depth == 0 {
            write!(f, "{}", self.base)
        } else {
            write!(f, "{} {}", self.base, "*".repeat(self.pointer_depth as usize))
        }
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, absent for type-only parameters
    pub name: Option<String>,
    /// Parameter type
    pub ty: TypeDescriptor,
}

impl Parameter {
    pub fn named(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn unnamed(ty: TypeDescriptor) -> Self {
        Self { name: None, ty }
    }

    /// The `(void)` marker of an explicitly empty prototype
    pub fn is_void_marker(&self) -> bool {
        self.name.is_none() && self.ty.is_void()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(&self.ty.render_with_name(name)),
            None => write!(f, "{}", self.ty),
        }
    }
}

/// Shared shape of function declarations and definitions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Return type
    pub return_type: TypeDescriptor,
    /// Parameters in declaration order; `()` is empty, `(void)` holds one void marker
    pub parameters: Vec<Parameter>,
}

impl FunctionSignature {
    pub fn new(
        name: impl Into<String>,
        return_type: TypeDescriptor,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters,
        }
    }

    /// Named parameters, skipping the `(void)` marker and unnamed ones
    pub fn named_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().filter_map(|p| p.name.as_deref())
    }

    /// `()` declares a function without a prototype
    pub fn is_unprototyped(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Whether two signatures describe the same C function type.
    ///
    /// Parameter names are irrelevant and an unprototyped `()` list is
    /// compatible with any parameter list.
    pub fn is_compatible_with(&self, other: &FunctionSignature) -> bool {
        if self.return_type != other.return_type {
            return false;
        }
        if self.is_unprototyped() || other.is_unprototyped() {
            return true;
        }
        self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.ty == b.ty)
    }

    /// Render as a function-pointer member: `int (*name)(int a)`
    pub fn render_pointer_member(&self) -> String {
        format!(
            "{} (*{})({})",
            self.return_type,
            self.name,
            self.render_parameters()
        )
    }

    fn render_parameters(&self) -> String {
        self.parameters
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.return_type.render_with_name(&self.name);
        write!(f, "{}({})", head, self.render_parameters())
    }
}

/// An `#include` directive written in the raw input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludeDirective {
    pub path: String,
    /// `<...>` rather than `"..."`
    pub system: bool,
}

impl fmt::Display for IncludeDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.system {
            write!(f, "#include <{}>", self.path)
        } else {
            write!(f, "#include \"{}\"", self.path)
        }
    }
}

/// Parse result for one input file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Input file the unit was produced from
    pub source: PathBuf,
    /// Include directives of the raw input, in order
    pub includes: Vec<IncludeDirective>,
    /// Prototype-only declarations, in source order
    pub declarations: Vec<FunctionSignature>,
    /// Declarations with a body, in source order
    pub definitions: Vec<FunctionSignature>,
}

impl TranslationUnit {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Whether any definition carries this name
    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// File name of the source, used in generated banners and includes
    pub fn source_file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.to_string_lossy().into_owned())
    }

    /// Whether the input is a header rather than a source file
    pub fn is_header(&self) -> bool {
        matches!(
            self.source.extension().and_then(|e| e.to_str()),
            Some("h") | Some("hh") | Some("hpp")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_rendering() {
        assert_eq!(TypeDescriptor::value("int").to_string(), "int");
        assert_eq!(TypeDescriptor::new("char", 1).to_string(), "char *");
        assert_eq!(TypeDescriptor::new("char", 2).to_string(), "char **");
        assert_eq!(
            TypeDescriptor::new("unsigned char", 3).to_string(),
            "unsigned char ***"
        );
    }

    #[test]
    fn test_parameter_rendering() {
        let p = Parameter::named("argv", TypeDescriptor::new("char", 2));
        assert_eq!(p.to_string(), "char **argv");
        let p = Parameter::named("n", TypeDescriptor::value("int"));
        assert_eq!(p.to_string(), "int n");
        let p = Parameter::unnamed(TypeDescriptor::new("double", 1));
        assert_eq!(p.to_string(), "double *");
    }

    #[test]
    fn test_signature_rendering() {
        let sig = FunctionSignature::new(
            "are_strings_equal",
            TypeDescriptor::value("bool"),
            vec![
                Parameter::named("str_a", TypeDescriptor::new("char", 1)),
                Parameter::named("str_b", TypeDescriptor::new("char", 1)),
            ],
        );
        assert_eq!(
            sig.to_string(),
            "bool are_strings_equal(char *str_a, char *str_b)"
        );

        let sig = FunctionSignature::new(
            "get_current_time",
            TypeDescriptor::value("unsigned long"),
            vec![Parameter::unnamed(TypeDescriptor::value("void"))],
        );
        assert_eq!(sig.to_string(), "unsigned long get_current_time(void)");

        let sig = FunctionSignature::new("dup", TypeDescriptor::new("char", 1), vec![]);
        assert_eq!(sig.to_string(), "char *dup()");
        assert_eq!(sig.render_pointer_member(), "char * (*dup)()");
    }

    #[test]
    fn test_void_marker_is_not_empty() {
        let void_list = FunctionSignature::new(
            "f",
            TypeDescriptor::value("int"),
            vec![Parameter::unnamed(TypeDescriptor::value("void"))],
        );
        assert!(void_list.parameters[0].is_void_marker());
        assert!(!void_list.is_unprototyped());
    }

    #[test]
    fn test_compatibility_ignores_names() {
        let a = FunctionSignature::new(
            "f",
            TypeDescriptor::value("int"),
            vec![Parameter::named("x", TypeDescriptor::value("int"))],
        );
        let b = FunctionSignature::new(
            "f",
            TypeDescriptor::value("int"),
            vec![Parameter::unnamed(TypeDescriptor::value("int"))],
        );
        let c = FunctionSignature::new(
            "f",
            TypeDescriptor::value("int"),
            vec![Parameter::unnamed(TypeDescriptor::new("int", 1))],
        );
        let unprototyped = FunctionSignature::new("f", TypeDescriptor::value("int"), vec![]);

        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
        assert!(unprototyped.is_compatible_with(&c));
    }

    #[test]
    fn test_translation_unit_helpers() {
        let mut unit = TranslationUnit::new("include/std_lib_utils.h");
        unit.definitions.push(FunctionSignature::new(
            "a",
            TypeDescriptor::value("void"),
            vec![],
        ));
        assert!(unit.is_defined("a"));
        assert!(!unit.is_defined("b"));
        assert!(unit.is_header());
        assert_eq!(unit.source_file_name(), "std_lib_utils.h");
    }
}
