//! `#include` directive scanning
//!
//! Generated files repeat the input's includes so that the types named in
//! forwarded signatures resolve exactly as they did in the input.

use modgen_core::IncludeDirective;
use regex::Regex;
use std::sync::OnceLock;

fn include_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]*(?:<([^>\n]+)>|"([^"\n]+)")"#)
            .expect("include regex is valid")
    })
}

/// Include directives of raw (unpreprocessed) source text, in order.
/// Duplicates are dropped.
pub fn scan_includes(source: &str) -> Vec<IncludeDirective> {
    let mut includes: Vec<IncludeDirective> = Vec::new();

    for caps in include_regex().captures_iter(source) {
        let directive = match (caps.get(1), caps.get(2)) {
            (Some(path), _) => IncludeDirective {
                path: path.as_str().trim().to_string(),
                system: true,
            },
            (None, Some(path)) => IncludeDirective {
                path: path.as_str().trim().to_string(),
                system: false,
            },
            _ => continue,
        };
        if !includes.contains(&directive) {
            includes.push(directive);
        }
    }

    includes
}
