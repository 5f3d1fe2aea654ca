//! Function signature extraction
//!
//! Walks the top-level nodes of a tree-sitter C tree once, classifies each as
//! a function declaration, a function definition or something else, and
//! reduces the function ones to [`FunctionSignature`]s.
//!
//! Declarator chains are resolved iteratively: starting at a declarator,
//! every pointer level adds one to the depth until a leaf (a name, a function
//! declarator, or nothing for abstract declarators) is reached.

use crate::ast::{first_error, PreprocessedAst, TopLevel};
use modgen_core::{
    Error, FunctionSignature, Parameter, Result, TranslationUnit, TypeDescriptor,
};
use std::path::Path;
use tracing::{debug, warn, Span};
use tree_sitter::Node;

/// Where a declarator chain ends
#[derive(Debug, Clone, Copy)]
enum Leaf<'t> {
    /// A declared name
    Name(Node<'t>),
    /// A function declarator (`name(params)`)
    Function(Node<'t>),
    /// No name (abstract declarator or no declarator at all)
    Abstract,
    /// Parenthesized or otherwise unmodelled declarator
    Other(Node<'t>),
}

/// A resolved declarator chain
#[derive(Debug, Clone, Copy)]
struct Resolved<'t> {
    pointer_depth: u32,
    leaf: Leaf<'t>,
}

/// Signature extractor
pub struct SignatureExtractor {
    span: Span,
}

impl SignatureExtractor {
    /// Create an extractor logging under the given span
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Extract the translation unit model.
    ///
    /// Fails on the first declaration that cannot be modelled; a partial unit
    /// is never returned.
    pub fn extract(&self, ast: &PreprocessedAst) -> Result<TranslationUnit> {
        let _enter = self.span.enter();
        let mut unit = TranslationUnit::new(ast.source_path());
        unit.includes = ast.includes().to_vec();

        for node in top_level_nodes(ast.root()) {
            for item in self.classify(ast, node)? {
                match item {
                    TopLevel::Declaration(sig) => {
                        debug!("Found declaration: {}", sig);
                        unit.declarations.push(sig);
                    }
                    TopLevel::Definition(sig) => {
                        debug!("Found definition: {}", sig);
                        unit.definitions.push(sig);
                    }
                    TopLevel::Other => {}
                }
            }
        }

        check_conflicts(&unit)?;

        debug!(
            "Extracted {} declarations and {} definitions from {:?}",
            unit.declarations.len(),
            unit.definitions.len(),
            unit.source
        );
        Ok(unit)
    }

    /// Extract from text that is already preprocessed
    pub fn extract_source(&self, source: &str, path: &Path) -> Result<TranslationUnit> {
        let ast = PreprocessedAst::from_source(path, source)?;
        self.extract(&ast)
    }

    /// Classify one top-level node. A declaration may declare several
    /// functions (`int f(void), g(int);`), hence the vector.
    fn classify<'t>(&self, ast: &'t PreprocessedAst, node: Node<'t>) -> Result<Vec<TopLevel>> {
        match node.kind() {
            "function_definition" => {
                reject_errors(ast, node)?;
                Ok(vec![TopLevel::Definition(self.extract_definition(ast, node)?)])
            }
            "declaration" => {
                // A damaged declaration may be hiding a function.
                reject_errors(ast, node)?;
                let functions = function_declarators(ast, node)?;
                if functions.is_empty() {
                    return Ok(vec![TopLevel::Other]);
                }
                functions
                    .into_iter()
                    .map(|(depth, fd)| {
                        self.extract_signature(ast, node, depth, fd)
                            .map(TopLevel::Declaration)
                    })
                    .collect()
            }
            "ERROR" => Err(syntax_error(ast, node)),
            _ => {
                if node.has_error() {
                    warn!(
                        "{}: ignoring unparsable {} node",
                        ast.location(node),
                        node.kind()
                    );
                }
                Ok(vec![TopLevel::Other])
            }
        }
    }

    fn extract_definition(&self, ast: &PreprocessedAst, node: Node) -> Result<FunctionSignature> {
        let declarator = node
            .child_by_field_name("declarator")
            .ok_or_else(|| malformed(ast, node, "function definition without a declarator"))?;

        let resolved = resolve(declarator, false, ast)?;
        match resolved.leaf {
            Leaf::Function(fd) => self.extract_signature(ast, node, resolved.pointer_depth, fd),
            _ => Err(malformed(
                ast,
                node,
                "function body attached to a non-function declarator",
            )),
        }
    }

    /// Build a signature from the declaration/definition node holding the
    /// return type and the function declarator holding name and parameters
    fn extract_signature(
        &self,
        ast: &PreprocessedAst,
        holder: Node,
        return_depth: u32,
        function: Node,
    ) -> Result<FunctionSignature> {
        let name = function_name(ast, function)?;
        let base = base_type(ast, holder)?;
        let parameters = extract_parameters(ast, function, &name)?;

        Ok(FunctionSignature::new(
            name,
            TypeDescriptor::new(base, return_depth),
            parameters,
        ))
    }
}

impl Default for SignatureExtractor {
    /// An extractor logging under the current span
    fn default() -> Self {
        Self::new(Span::current())
    }
}

/// Top-level items in document order, looking through preprocessor
/// conditionals. Input that was not preprocessed keeps its `#if` blocks
/// (include guards at least), and every branch is scanned.
fn top_level_nodes(root: Node) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut stack = named_children_reversed(root);

    while let Some(node) = stack.pop() {
        match node.kind() {
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" => stack.extend(named_children_reversed(node)),
            _ => nodes.push(node),
        }
    }

    nodes
}

fn named_children_reversed(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let mut children: Vec<Node> = node.named_children(&mut cursor).collect();
    children.reverse();
    children
}

/// Follow a declarator chain to its leaf, counting pointer levels.
///
/// Arrays only appear in parameter position, where they decay to pointers.
fn resolve<'t>(
    declarator: Node<'t>,
    decay_arrays: bool,
    ast: &PreprocessedAst,
) -> Result<Resolved<'t>> {
    let mut pointer_depth = 0;
    let mut current = Some(declarator);

    while let Some(node) = current {
        match node.kind() {
            "pointer_declarator" | "abstract_pointer_declarator" => {
                if let Some(qualifier) = named_child_of_kind(node, "type_qualifier") {
                    return Err(unsupported(
                        ast,
                        node,
                        format!("qualified pointer `* {}`", ast.text(qualifier)),
                    ));
                }
                pointer_depth += 1;
                current = node.child_by_field_name("declarator");
            }
            "array_declarator" | "abstract_array_declarator" if decay_arrays => {
                pointer_depth += 1;
                current = node.child_by_field_name("declarator");
            }
            "attributed_declarator" => {
                current = node.named_child(0);
            }
            "identifier" => {
                return Ok(Resolved {
                    pointer_depth,
                    leaf: Leaf::Name(node),
                })
            }
            "function_declarator" | "abstract_function_declarator" => {
                return Ok(Resolved {
                    pointer_depth,
                    leaf: Leaf::Function(node),
                })
            }
            _ => {
                return Ok(Resolved {
                    pointer_depth,
                    leaf: Leaf::Other(node),
                })
            }
        }
    }

    Ok(Resolved {
        pointer_depth,
        leaf: Leaf::Abstract,
    })
}

/// Function declarators declared by a `declaration` node, with the pointer
/// depth of their return types. Variables and initialized declarators are
/// skipped, as are function-pointer variables (`int (*fp)(int);`).
fn function_declarators<'t>(
    ast: &PreprocessedAst,
    node: Node<'t>,
) -> Result<Vec<(u32, Node<'t>)>> {
    let mut functions = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        if declarator.kind() == "init_declarator" {
            continue;
        }
        let resolved = resolve(declarator, false, ast)?;
        if let Leaf::Function(fd) = resolved.leaf {
            if declares_function_pointer(fd, ast)? {
                continue;
            }
            functions.push((resolved.pointer_depth, fd));
        }
    }
    Ok(functions)
}

/// `int (*fp)(int)` declares a variable, `int (*f(void))(int)` a function
/// returning a function pointer.
fn declares_function_pointer(function: Node, ast: &PreprocessedAst) -> Result<bool> {
    let Some(inner) = function.child_by_field_name("declarator") else {
        return Ok(false);
    };
    if inner.kind() != "parenthesized_declarator" {
        return Ok(false);
    }
    let Some(wrapped) = inner.named_child(0) else {
        return Ok(false);
    };
    let resolved = resolve(wrapped, false, ast)?;
    Ok(resolved.pointer_depth > 0 && matches!(resolved.leaf, Leaf::Name(_)))
}

fn function_name(ast: &PreprocessedAst, function: Node) -> Result<String> {
    let declarator = function
        .child_by_field_name("declarator")
        .ok_or_else(|| malformed(ast, function, "function declarator without a name"))?;

    match declarator.kind() {
        "identifier" => Ok(ast.text(declarator).to_string()),
        "parenthesized_declarator" => {
            let inner = declarator
                .named_child(0)
                .map(|n| resolve(n, false, ast))
                .transpose()?;
            match inner.map(|r| r.leaf) {
                Some(Leaf::Function(fd)) => Err(malformed(
                    ast,
                    function,
                    format!(
                        "`{}` returns a function pointer, which has no named base type",
                        function_name(ast, fd).unwrap_or_else(|_| ast.text(fd).to_string())
                    ),
                )),
                _ => Err(malformed(
                    ast,
                    function,
                    format!("parenthesized function name `{}`", ast.text(declarator)),
                )),
            }
        }
        other => Err(malformed(
            ast,
            function,
            format!("unexpected {} as function name", other),
        )),
    }
}

fn extract_parameters(
    ast: &PreprocessedAst,
    function: Node,
    function_name: &str,
) -> Result<Vec<Parameter>> {
    let list = function
        .child_by_field_name("parameters")
        .ok_or_else(|| malformed(ast, function, "function declarator without parameters"))?;

    let mut parameters = Vec::new();
    let mut cursor = list.walk();
    for child in list.named_children(&mut cursor) {
        match child.kind() {
            "parameter_declaration" => parameters.push(extract_parameter(ast, child)?),
            "variadic_parameter" => {
                return Err(unsupported(
                    ast,
                    child,
                    format!("variadic parameter list in `{}`", function_name),
                ))
            }
            "identifier" => {
                return Err(unsupported(
                    ast,
                    child,
                    format!("K&R-style parameter list in `{}`", function_name),
                ))
            }
            "comment" => {}
            other => {
                return Err(malformed(
                    ast,
                    child,
                    format!("unexpected {} in parameters of `{}`", other, function_name),
                ))
            }
        }
    }

    Ok(parameters)
}

fn extract_parameter(ast: &PreprocessedAst, node: Node) -> Result<Parameter> {
    let base = base_type(ast, node)?;

    let resolved = match node.child_by_field_name("declarator") {
        Some(declarator) => resolve(declarator, true, ast)?,
        None => Resolved {
            pointer_depth: 0,
            leaf: Leaf::Abstract,
        },
    };

    let name = match resolved.leaf {
        Leaf::Name(id) => Some(ast.text(id).to_string()),
        Leaf::Abstract => None,
        Leaf::Function(_) => {
            return Err(unsupported(
                ast,
                node,
                format!("function-pointer parameter `{}`", ast.text(node)),
            ))
        }
        Leaf::Other(other) => {
            return Err(malformed(
                ast,
                other,
                format!("unsupported parameter declarator `{}`", ast.text(node)),
            ))
        }
    };

    Ok(Parameter {
        name,
        ty: TypeDescriptor::new(base, resolved.pointer_depth),
    })
}

/// Base type of a declaration, definition or parameter: its leading and
/// trailing type qualifiers followed by the type specifier
fn base_type(ast: &PreprocessedAst, holder: Node) -> Result<String> {
    let specifier = holder
        .child_by_field_name("type")
        .ok_or_else(|| malformed(ast, holder, format!("no base type in `{}`", ast.text(holder))))?;

    let mut parts: Vec<String> = Vec::new();
    let mut cursor = holder.walk();
    for child in holder.children(&mut cursor) {
        if child.kind() == "type_qualifier" {
            parts.push(ast.text(child).to_string());
        }
    }
    parts.push(type_specifier_name(ast, specifier)?);

    Ok(parts.join(" "))
}

fn type_specifier_name(ast: &PreprocessedAst, specifier: Node) -> Result<String> {
    match specifier.kind() {
        "primitive_type" | "type_identifier" | "sized_type_specifier" => {
            Ok(normalize_whitespace(ast.text(specifier)))
        }
        "struct_specifier" | "union_specifier" | "enum_specifier" => {
            let keyword = specifier.kind().trim_end_matches("_specifier");
            match specifier.child_by_field_name("name") {
                Some(name) => Ok(format!("{} {}", keyword, ast.text(name))),
                None => Err(unsupported(
                    ast,
                    specifier,
                    format!("anonymous {} type", keyword),
                )),
            }
        }
        "macro_type_specifier" => Err(unsupported(
            ast,
            specifier,
            format!("unexpanded macro type `{}`", ast.text(specifier)),
        )),
        other => Err(malformed(
            ast,
            specifier,
            format!("unexpected type specifier {} `{}`", other, ast.text(specifier)),
        )),
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// Any two occurrences of a name must describe the same function type
fn check_conflicts(unit: &TranslationUnit) -> Result<()> {
    let all: Vec<&FunctionSignature> = unit
        .declarations
        .iter()
        .chain(unit.definitions.iter())
        .collect();

    for (i, first) in all.iter().enumerate() {
        for second in &all[i + 1..] {
            if first.name == second.name && !first.is_compatible_with(second) {
                return Err(Error::ConflictingDeclaration {
                    name: first.name.clone(),
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn reject_errors(ast: &PreprocessedAst, node: Node) -> Result<()> {
    match first_error(node) {
        Some(err) => Err(syntax_error(ast, err)),
        None => Ok(()),
    }
}

fn syntax_error(ast: &PreprocessedAst, node: Node) -> Error {
    let snippet: String = ast.text(node).chars().take(60).collect();
    Error::Syntax {
        location: ast.location(node),
        snippet: normalize_whitespace(&snippet),
    }
}

fn malformed(ast: &PreprocessedAst, node: Node, reason: impl Into<String>) -> Error {
    Error::MalformedDeclaration {
        location: ast.location(node),
        reason: reason.into(),
    }
}

fn unsupported(ast: &PreprocessedAst, node: Node, construct: impl Into<String>) -> Error {
    Error::UnsupportedConstruct {
        location: ast.location(node),
        construct: construct.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> Result<TranslationUnit> {
        SignatureExtractor::default().extract_source(source, Path::new("test.h"))
    }

    #[test]
    fn test_pointer_depth() {
        let unit = extract("void set_args(char **name);").unwrap();
        let sig = &unit.declarations[0];

        assert_eq!(sig.return_type, TypeDescriptor::value("void"));
        assert_eq!(
            sig.parameters,
            vec![Parameter::named("name", TypeDescriptor::new("char", 2))]
        );
    }

    #[test]
    fn test_deep_pointer_return() {
        let unit = extract("int ***grid(unsigned int rows, unsigned int cols);").unwrap();
        let sig = &unit.declarations[0];

        assert_eq!(sig.name, "grid");
        assert_eq!(sig.return_type, TypeDescriptor::new("int", 3));
        assert_eq!(sig.parameters[0].ty, TypeDescriptor::value("unsigned int"));
    }

    #[test]
    fn test_unnamed_parameters() {
        let unit = extract("int f(int, double);").unwrap();
        let sig = &unit.declarations[0];

        assert_eq!(
            sig.parameters,
            vec![
                Parameter::unnamed(TypeDescriptor::value("int")),
                Parameter::unnamed(TypeDescriptor::value("double")),
            ]
        );
    }

    #[test]
    fn test_void_list_is_kept() {
        let unit = extract("int f(void);\nint g();").unwrap();

        assert_eq!(
            unit.declarations[0].parameters,
            vec![Parameter::unnamed(TypeDescriptor::value("void"))]
        );
        assert!(unit.declarations[1].parameters.is_empty());
    }

    #[test]
    fn test_declaration_and_definition() {
        let unit = extract("int f(int x);\nint f(int x) { return x; }\n").unwrap();

        assert_eq!(unit.declarations.len(), 1);
        assert_eq!(unit.definitions.len(), 1);
        assert_eq!(unit.declarations[0], unit.definitions[0]);
    }

    #[test]
    fn test_variadic_is_unsupported() {
        let err = extract("int log_msg(const char *fmt, ...);").unwrap_err();
        match err {
            Error::UnsupportedConstruct { location, construct } => {
                assert_eq!(location.line, 1);
                assert!(construct.contains("variadic"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_function_pointer_parameter_is_unsupported() {
        let err = extract("void on_event(void (*handler)(int));").unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_function_pointer_return_is_malformed() {
        let err = extract("int (*get_handler(void))(int);").unwrap_err();
        assert!(matches!(err, Error::MalformedDeclaration { .. }));
    }

    #[test]
    fn test_function_pointer_variable_is_ignored() {
        let unit = extract("int (*hook)(int);\nint f(void);").unwrap();
        assert_eq!(unit.declarations.len(), 1);
        assert_eq!(unit.declarations[0].name, "f");
    }

    #[test]
    fn test_conflicting_declarations() {
        let err = extract("int f(int a);\nint f(char *a);").unwrap_err();
        assert!(matches!(err, Error::ConflictingDeclaration { ref name, .. } if name == "f"));
    }

    #[test]
    fn test_compatible_redeclarations_are_preserved() {
        let unit = extract("int f(int a);\nint f(int);\nint f();").unwrap();
        assert_eq!(unit.declarations.len(), 3);
        assert_eq!(unit.declarations[1].parameters[0].name, None);
    }

    #[test]
    fn test_include_guard_is_looked_through() {
        let source = "#ifndef API_H\n#define API_H\nint f(int);\nvoid g(void);\n#endif\n";
        let unit = extract(source).unwrap();
        let names: Vec<&str> = unit.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["f", "g"]);
    }

    #[test]
    fn test_every_conditional_branch_is_scanned() {
        let unit = extract(
            r#"
int first(void);
#if defined(USE_FAST)
int fast(int n);
#elif LEVEL > 2
int medium(int n);
#else
int slow(int n);
#ifdef TRACE
void trace(void) { }
#endif
#endif
int last(void);
"#,
        )
        .unwrap();

        let names: Vec<&str> = unit.declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["first", "fast", "medium", "slow", "last"]);
        assert_eq!(unit.definitions[0].name, "trace");
    }
}
