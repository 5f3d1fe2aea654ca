//! Modularization plan
//!
//! Derived from a translation unit by comparing declarations against
//! definitions. Never stored; recomputed for every synthesis.

use modgen_core::{FunctionSignature, TranslationUnit};
use std::collections::HashSet;

/// Generation obligations for one translation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModularizationPlan<'u> {
    /// Declarations without a definition, first occurrence per name
    pub stubs: Vec<&'u FunctionSignature>,
    /// Definitions, first occurrence per name
    pub forwards: Vec<&'u FunctionSignature>,
}

impl<'u> ModularizationPlan<'u> {
    pub fn from_unit(unit: &'u TranslationUnit) -> Self {
        let stubs = first_per_name(unit.declarations.iter())
            .into_iter()
            .filter(|sig| !unit.is_defined(&sig.name))
            .collect();
        let forwards = first_per_name(unit.definitions.iter());

        Self { stubs, forwards }
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty() && self.forwards.is_empty()
    }
}

fn first_per_name<'u>(
    signatures: impl Iterator<Item = &'u FunctionSignature>,
) -> Vec<&'u FunctionSignature> {
    let mut seen: HashSet<&'u str> = HashSet::new();
    signatures
        .filter(|sig| {
            let sig: &'u FunctionSignature = *sig;
            seen.insert(sig.name.as_str())
        })
        .collect()
}
