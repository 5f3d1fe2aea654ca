//! Macro definitions passed to the preprocessor

use std::fmt;

/// A macro definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub value: String,
}

impl MacroDefinition {
    /// Create a macro that is simply defined (value `1`)
    pub fn defined(name: &str) -> Self {
        Self::with_value(name, "1")
    }

    /// Create a macro with a specific value
    pub fn with_value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Parse the command-line spelling `NAME` or `NAME=VALUE`
    pub fn parse(text: &str) -> Self {
        match text.split_once('=') {
            Some((name, value)) => Self::with_value(name.trim(), value),
            None => Self::defined(text.trim()),
        }
    }

    /// Macros that erase GNU extensions tree-sitter cannot make sense of
    pub fn gnu_extension_erasers() -> Vec<Self> {
        vec![
            Self::with_value("__attribute__(x)", ""),
            Self::with_value("__extension__", ""),
            Self::with_value("__asm__(x)", ""),
            Self::with_value("__restrict", ""),
            Self::with_value("__inline", "inline"),
        ]
    }

    /// Convert to a cc -D argument
    pub fn to_arg(&self) -> String {
        format!("-D{}={}", self.name, self.value)
    }
}

impl fmt::Display for MacroDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}
