//! End-to-end tests: C text -> translation unit -> generated files

use modgen_core::config::{StubPolicy, SynthesisConfig};
use modgen_core::{Error, TranslationUnit};
use modgen_parser::SignatureExtractor;
use modgen_synth::{Manifest, Synthesizer};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tracing::Span;

fn extract(name: &str, source: &str) -> modgen_core::Result<TranslationUnit> {
    SignatureExtractor::new(Span::none()).extract_source(source, Path::new(name))
}

fn synthesizer(config: SynthesisConfig) -> Synthesizer {
    Synthesizer::new(config, Span::none())
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}

fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut entries: Vec<(PathBuf, Vec<u8>)> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            let bytes = std::fs::read(&path).unwrap();
            (path, bytes)
        })
        .collect();
    entries.sort();
    entries
}

const STD_LIB_UTILS: &str = r#"
#include <stdbool.h>
#include <string.h>
#include <time.h>

#include "std_lib_utils.h"

static unsigned long get_current_time(void);
static bool are_strings_equal(char *str_a, char *str_b);

unsigned long get_current_time(void) {
  time_t now = time(NULL);
  if (now == (time_t)(-1))
    return 0;

  return (unsigned long)now;
}

bool are_strings_equal(char *str_a, char *str_b) {
  return strcmp(str_a, str_b) == 0;
}
"#;

#[test]
fn test_std_lib_utils_with_ops_table() {
    let dir = tempfile::tempdir().unwrap();
    let unit = extract("std_lib_utils.c", STD_LIB_UTILS).unwrap();

    let config = SynthesisConfig {
        emit_ops_table: true,
        ..Default::default()
    };
    let manifest = synthesizer(config).synthesize(&unit, dir.path()).unwrap();

    assert_eq!(
        manifest.files,
        vec![
            "std_lib_utils_stubs.c",
            "std_lib_utils_api.h",
            "std_lib_utils_ops.c"
        ]
    );
    assert!(manifest.stubs.is_empty());
    assert_eq!(
        manifest.forwards,
        vec!["get_current_time", "are_strings_equal"]
    );

    let header = read(dir.path(), "std_lib_utils_api.h");
    assert!(header.contains("unsigned long get_current_time(void);\n"));
    assert!(header.contains("    bool (*are_strings_equal)(char *str_a, char *str_b);\n"));
    assert!(header.contains("struct StdLibUtilsOps *get_std_lib_utils_ops(void);\n"));
    assert!(header.contains("#include <stdbool.h>\n"));

    let ops = read(dir.path(), "std_lib_utils_ops.c");
    assert!(ops.contains("    .get_current_time = get_current_time,\n"));
    assert!(ops.contains("return &std_lib_utils_ops;"));

    let loaded = Manifest::load(&dir.path().join("modgen-manifest.json"))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.module("std_lib_utils.c"), Some(&manifest));
}

#[test]
fn test_declaration_without_definition_gets_one_stub() {
    let dir = tempfile::tempdir().unwrap();
    let unit = extract("api.h", "int f(int);\n").unwrap();

    let manifest = synthesizer(SynthesisConfig::default())
        .synthesize(&unit, dir.path())
        .unwrap();
    assert_eq!(manifest.stubs, vec!["f"]);
    assert!(manifest.forwards.is_empty());

    let stubs = read(dir.path(), "api_stubs.c");
    assert_eq!(stubs.matches("int f(int)\n{").count(), 1);
    assert!(stubs.contains("#include \"api.h\"\n"));
}

#[test]
fn test_matching_pair_gets_forward_only() {
    let dir = tempfile::tempdir().unwrap();
    let unit = extract("api.c", "int f(int x);\nint f(int x) { return x; }\n").unwrap();

    let manifest = synthesizer(SynthesisConfig::default())
        .synthesize(&unit, dir.path())
        .unwrap();
    assert!(manifest.stubs.is_empty());
    assert_eq!(manifest.forwards, vec!["f"]);
    assert!(!read(dir.path(), "api_stubs.c").contains("int f("));
    assert_eq!(read(dir.path(), "api_api.h").matches("int f(int x);").count(), 1);
}

#[test]
fn test_forwards_follow_source_order() {
    let dir = tempfile::tempdir().unwrap();
    let unit = extract("order.c", "void b(void) { }\nvoid a(void) { }\n").unwrap();

    synthesizer(SynthesisConfig::default())
        .synthesize(&unit, dir.path())
        .unwrap();

    let header = read(dir.path(), "order_api.h");
    let b = header.find("void b(void);").unwrap();
    let a = header.find("void a(void);").unwrap();
    assert!(b < a);
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let unit = extract(
        "codec.h",
        "int encode(const char *in, char **out);\nvoid reset(void);\n",
    )
    .unwrap();
    let synth = synthesizer(SynthesisConfig {
        stub_policy: StubPolicy::Abort,
        emit_ops_table: true,
        ..Default::default()
    });

    let first_manifest = synth.synthesize(&unit, dir.path()).unwrap();
    let first = snapshot(dir.path());

    let second_manifest = synth.synthesize(&unit, dir.path()).unwrap();
    let second = snapshot(dir.path());

    assert_eq!(first_manifest, second_manifest);
    assert_eq!(first, second);
}

#[test]
fn test_foreign_file_blocks_the_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("codec_api.h"), "/* hand written */\n").unwrap();

    let unit = extract("codec.h", "int encode(int n);\n").unwrap();
    let err = synthesizer(SynthesisConfig::default())
        .synthesize(&unit, dir.path())
        .unwrap_err();

    match err {
        Error::OutputConflict { path } => assert!(path.ends_with("codec_api.h")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("codec_stubs.c").exists());
    assert!(!dir.path().join("modgen-manifest.json").exists());
    assert_eq!(read(dir.path(), "codec_api.h"), "/* hand written */\n");
}

#[test]
fn test_variadic_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("build");

    let result = extract("log.h", "void log_msg(const char *fmt, ...);\n")
        .and_then(|unit| synthesizer(SynthesisConfig::default()).synthesize(&unit, &out));

    assert!(matches!(result, Err(Error::UnsupportedConstruct { .. })));
    assert!(!out.exists());
}

#[test]
fn test_inputs_share_an_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(SynthesisConfig::default());

    let a = extract("a.h", "int a_open(void);\n").unwrap();
    let b = extract("b.h", "int b_open(void);\n").unwrap();
    synth.synthesize(&a, dir.path()).unwrap();
    let a_files = snapshot(dir.path());

    synth.synthesize(&b, dir.path()).unwrap();
    assert!(dir.path().join("a_stubs.c").is_file());
    assert!(dir.path().join("a_api.h").is_file());
    assert!(dir.path().join("b_stubs.c").is_file());

    // Regenerating the first input is still recognized as its own output.
    synth.synthesize(&a, dir.path()).unwrap();
    let manifest = Manifest::load(&dir.path().join("modgen-manifest.json"))
        .unwrap()
        .unwrap();
    let inputs: Vec<&str> = manifest.modules.iter().map(|m| m.input.as_str()).collect();
    assert_eq!(inputs, vec!["a.h", "b.h"]);

    for (path, bytes) in a_files {
        if path.ends_with("modgen-manifest.json") {
            continue;
        }
        assert_eq!(std::fs::read(&path).unwrap(), bytes, "{}", path.display());
    }
}

#[test]
fn test_same_module_name_from_two_inputs_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let synth = synthesizer(SynthesisConfig::default());

    let header = extract("api.h", "int f(int);\n").unwrap();
    let source = extract("api.c", "int g(int x) { return x; }\n").unwrap();
    synth.synthesize(&header, dir.path()).unwrap();

    let err = synth.synthesize(&source, dir.path()).unwrap_err();
    assert!(matches!(err, Error::OutputConflict { .. }));
    assert!(read(dir.path(), "api_stubs.c").contains("int f(int)"));
}

#[test]
fn test_parameter_named_result() {
    let dir = tempfile::tempdir().unwrap();
    let unit = extract("scale.h", "int scale(int result);\n").unwrap();

    synthesizer(SynthesisConfig::default())
        .synthesize(&unit, dir.path())
        .unwrap();

    let stubs = read(dir.path(), "scale_stubs.c");
    assert!(stubs.contains("    (void)result;\n    int result_ = {0};\n    return result_;\n"));
    let regenerated = extract("scale_stubs.c", &stubs).unwrap();
    assert_eq!(regenerated.definitions, unit.declarations);
}

#[test]
fn test_digit_led_file_name_with_ops_table() {
    let dir = tempfile::tempdir().unwrap();
    let source = "double dot(double x, double y) { return x * y; }\n";
    let unit = extract("2d_math.c", source).unwrap();

    let manifest = synthesizer(SynthesisConfig {
        emit_ops_table: true,
        ..Default::default()
    })
    .synthesize(&unit, dir.path())
    .unwrap();

    assert_eq!(
        manifest.files,
        vec!["mod_2d_math_stubs.c", "mod_2d_math_api.h", "mod_2d_math_ops.c"]
    );
    let header = read(dir.path(), "mod_2d_math_api.h");
    assert!(header.contains("#ifndef MOD_2D_MATH_API_H\n"));
    assert!(header.contains("struct Mod2dMathOps {\n"));
    assert!(header.contains("struct Mod2dMathOps *get_mod_2d_math_ops(void);\n"));
}

#[test]
fn test_generated_stub_re_extracts() {
    let dir = tempfile::tempdir().unwrap();
    let source = "unsigned char **table(struct shape *s, int, const char *label);\n";
    let unit = extract("shapes.h", source).unwrap();

    synthesizer(SynthesisConfig::default())
        .synthesize(&unit, dir.path())
        .unwrap();

    let stubs = read(dir.path(), "shapes_stubs.c");
    let regenerated = extract("shapes_stubs.c", &stubs).unwrap();
    assert_eq!(regenerated.definitions, unit.declarations);
}
