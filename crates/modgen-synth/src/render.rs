//! C text rendering
//!
//! Every function here is pure: the same plan, unit and configuration always
//! produce the same bytes.

use crate::plan::ModularizationPlan;
use modgen_core::config::{StubPolicy, SynthesisConfig};
use modgen_core::{FunctionSignature, TranslationUnit};
use std::fmt::Write;

const INDENT: &str = "    ";
const STUB_MARKER: &str = "/* modgen stub: not implemented */";

/// Identifiers derived from the input file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNames {
    /// `std_lib_utils`
    pub module: String,
    /// `StdLibUtils`
    pub camel: String,
}

impl ModuleNames {
    /// Derive names from the input file stem
    pub fn for_unit(unit: &TranslationUnit) -> Self {
        let stem = unit
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        Self::from_stem(&stem)
    }

    /// `module` is lowercase words joined by single underscores and always
    /// starts with a letter, so every name built from it is an ordinary C
    /// identifier (no leading digit, no reserved `_X` or `__` spellings).
    pub fn from_stem(stem: &str) -> Self {
        let lowered: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();

        let mut words: Vec<&str> = lowered.split('_').filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            words.push("module");
        } else if words[0].starts_with(|c: char| c.is_ascii_digit()) {
            words.insert(0, "mod");
        }

        let module = words.join("_");
        let camel = words
            .iter()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();

        Self { module, camel }
    }

    pub fn header_file(&self) -> String {
        format!("{}_api.h", self.module)
    }

    pub fn stubs_file(&self) -> String {
        format!("{}_stubs.c", self.module)
    }

    pub fn ops_file(&self) -> String {
        format!("{}_ops.c", self.module)
    }

    pub fn include_guard(&self) -> String {
        format!("{}_API_H", self.module.to_ascii_uppercase())
    }

    pub fn ops_struct(&self) -> String {
        format!("{}Ops", self.camel)
    }

    pub fn ops_instance(&self) -> String {
        format!("{}_ops", self.module)
    }

    pub fn ops_accessor(&self) -> String {
        format!("get_{}_ops", self.module)
    }
}

fn banner(unit: &TranslationUnit) -> String {
    format!(
        "/*\n * Generated by modgen from {}. Do not edit.\n */\n",
        unit.source_file_name()
    )
}

/// The input's own include directives, plus the input itself when it is a
/// header, so generated code sees the same types
fn include_block(unit: &TranslationUnit, skip: &str) -> String {
    let mut out = String::new();
    for include in &unit.includes {
        if include.path == skip {
            continue;
        }
        let _ = writeln!(out, "{}", include);
    }
    if unit.is_header() {
        let own = unit.source_file_name();
        if !unit.includes.iter().any(|i| !i.system && i.path == own) {
            let _ = writeln!(out, "#include \"{}\"", own);
        }
    }
    out
}

/// Forwarding declarations and, when enabled, the ops table declarations
pub fn render_header(
    unit: &TranslationUnit,
    plan: &ModularizationPlan,
    names: &ModuleNames,
    emit_ops: bool,
) -> String {
    let guard = names.include_guard();
    let mut out = banner(unit);

    let _ = writeln!(out, "#ifndef {}", guard);
    let _ = writeln!(out, "#define {}", guard);
    out.push('\n');

    let includes = include_block(unit, &names.header_file());
    if !includes.is_empty() {
        out.push_str(&includes);
        out.push('\n');
    }

    out.push_str("/* Forwarding declarations */\n");
    for sig in &plan.forwards {
        let _ = writeln!(out, "{};", sig);
    }

    if emit_ops {
        let ops = names.ops_struct();
        out.push_str("\n/* Substitutable ops table */\n");
        let _ = writeln!(out, "struct {} {{", ops);
        for sig in &plan.forwards {
            let _ = writeln!(out, "{}{};", INDENT, sig.render_pointer_member());
        }
        out.push_str("};\n\n");
        let _ = writeln!(out, "extern struct {} {};", ops, names.ops_instance());
        out.push('\n');
        let _ = writeln!(out, "struct {} *{}(void);", ops, names.ops_accessor());
    }

    out.push('\n');
    let _ = writeln!(out, "#endif /* {} */", guard);
    out
}

/// Stub definitions for every planned stub
pub fn render_stubs(
    unit: &TranslationUnit,
    plan: &ModularizationPlan,
    names: &ModuleNames,
    policy: StubPolicy,
) -> String {
    let mut out = banner(unit);
    out.push('\n');

    let mut includes = String::new();
    if policy == StubPolicy::Abort && !plan.stubs.is_empty() {
        includes.push_str("#include <stdlib.h>\n");
    }
    includes.push_str(&include_block(unit, &names.stubs_file()));
    if !includes.is_empty() {
        out.push_str(&includes);
        out.push('\n');
    }

    for (i, sig) in plan.stubs.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&render_stub(sig, policy));
    }
    out
}

/// One stub definition
pub fn render_stub(sig: &FunctionSignature, policy: StubPolicy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", sig);
    out.push_str("{\n");
    let _ = writeln!(out, "{}{}", INDENT, STUB_MARKER);

    let returns_value = !sig.return_type.is_void();
    let policy = match policy {
        StubPolicy::Empty if returns_value => StubPolicy::Zero,
        other => other,
    };

    if policy != StubPolicy::Empty {
        for name in sig.named_parameters() {
            let _ = writeln!(out, "{}(void){};", INDENT, name);
        }
    }

    match policy {
        StubPolicy::Abort => {
            let _ = writeln!(out, "{}abort();", INDENT);
        }
        StubPolicy::Zero if returns_value => {
            let local = result_local(sig);
            let _ = writeln!(
                out,
                "{}{} = {{0}};",
                INDENT,
                sig.return_type.render_with_name(&local)
            );
            let _ = writeln!(out, "{}return {};", INDENT, local);
        }
        _ => {}
    }

    out.push_str("}\n");
    out
}

/// Name of the zero-initialized return value, distinct from every parameter
fn result_local(sig: &FunctionSignature) -> String {
    let mut local = String::from("result");
    while sig.name == local || sig.named_parameters().any(|p| p == local) {
        local.push('_');
    }
    local
}

/// Ops table definition and accessor
pub fn render_ops(
    unit: &TranslationUnit,
    plan: &ModularizationPlan,
    names: &ModuleNames,
) -> String {
    let ops = names.ops_struct();
    let mut out = banner(unit);
    out.push('\n');
    let _ = writeln!(out, "#include \"{}\"", names.header_file());
    out.push('\n');

    let _ = writeln!(out, "struct {} {} = {{", ops, names.ops_instance());
    for sig in &plan.forwards {
        let _ = writeln!(out, "{}.{} = {},", INDENT, sig.name, sig.name);
    }
    out.push_str("};\n\n");

    let _ = writeln!(out, "struct {} *{}(void)", ops, names.ops_accessor());
    out.push_str("{\n");
    let _ = writeln!(out, "{}return &{};", INDENT, names.ops_instance());
    out.push_str("}\n");
    out
}

/// Whether an ops table will be emitted for this plan
pub fn wants_ops(config: &SynthesisConfig, plan: &ModularizationPlan) -> bool {
    config.emit_ops_table && !plan.forwards.is_empty()
}
