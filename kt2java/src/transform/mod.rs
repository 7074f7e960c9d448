//! Semantic transformation - Kotlin AST to Java-shaped AST
//!
//! A single walk over each declaration rewrites every Kotlin-only construct
//! (null-safe calls, Elvis, `when`, templates, data classes, default and
//! named arguments, extension functions, companions, top-level members)
//! into nodes the emitter can print directly. Constructs with no faithful
//! Java form become placeholders and are reported as issues; the walk never
//! stops early.
//!
//! Top-level functions and properties move onto a holder class named after
//! the source file. Transforming an already-transformed tree returns it
//! unchanged.

mod declarations;
mod error;
mod expressions;
mod statements;
mod types;

pub use error::TransformError;
pub use types::{map_type, map_type_argument};

use crate::config::compile_time::transform::*;
use crate::config::runtime::TransformPreferences;
use crate::grammar::ast::nodes::*;
use crate::logging::codes;
use crate::utils::Span;
use crate::{log_debug, log_success};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Transformed program plus the issues found on the way
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    pub program: Program,
    pub issues: Vec<TransformError>,
}

impl TransformOutcome {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| !issue.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| !issue.is_warning()).count()
    }
}

/// Name of the class holding a file's top-level members: the sanitized
/// file stem plus `suffix`
pub fn holder_class_name(file_name: &str, suffix: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    // `file_stem` keeps dotfiles such as `.kt` whole
    let stem = match base.strip_suffix(".kt") {
        Some(stem) => stem,
        None => base.rsplit_once('.').map_or(base, |(stem, _)| stem),
    };

    let mut name: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if name.is_empty() {
        name.push_str("Main");
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.push_str(suffix);
    name
}

/// Transform with preferences from the environment
pub fn transform_program(program: Program, holder_name: &str) -> TransformOutcome {
    Transformer::new(holder_name, TransformPreferences::default()).transform(program)
}

#[derive(Debug, Clone)]
struct ParamSig {
    name: Identifier,
    /// Kotlin default expression, substituted at call sites that skip it
    default: Option<Expr>,
}

#[derive(Debug, Clone)]
struct FunctionSignature {
    params: Vec<ParamSig>,
    return_type: Option<TypeRef>,
    extension: bool,
}

#[derive(Debug, Clone, Default)]
struct ClassInfo {
    type_params: Vec<Identifier>,
    fields: HashMap<Identifier, TypeRef>,
    methods: HashMap<Identifier, TypeRef>,
    constructor: Vec<ParamSig>,
    enum_entries: Vec<Identifier>,
}

/// Rewrites one file's AST
pub struct Transformer {
    holder_name: String,
    preferences: TransformPreferences,
    issues: Vec<TransformError>,
    limit_reported: bool,
    depth: usize,
    depth_reported: bool,
    scopes: Vec<HashMap<Identifier, TypeRef>>,
    functions: HashMap<Identifier, FunctionSignature>,
    classes: HashMap<Identifier, ClassInfo>,
    imports: BTreeSet<String>,
    current_class: Option<Identifier>,
    in_extension: bool,
    temp_counter: usize,
}

impl Transformer {
    pub fn new(holder_name: &str, preferences: TransformPreferences) -> Self {
        Self {
            holder_name: holder_name.to_string(),
            preferences,
            issues: Vec::new(),
            limit_reported: false,
            depth: 0,
            depth_reported: false,
            scopes: Vec::new(),
            functions: HashMap::new(),
            classes: HashMap::new(),
            imports: BTreeSet::new(),
            current_class: None,
            in_extension: false,
            temp_counter: 0,
        }
    }

    pub fn transform(mut self, program: Program) -> TransformOutcome {
        log_debug!("Starting transformation",
            "holder" => &self.holder_name,
            "declarations" => program.declarations.len()
        );

        self.collect_declarations(&program.declarations);

        let Program {
            package,
            imports,
            declarations,
            span,
        } = program;

        let mut classes = Vec::new();
        let mut top_level = Vec::new();
        for declaration in declarations {
            match declaration {
                Declaration::Class(class) => classes.push(class),
                member => top_level.push(member),
            }
        }

        let holder = match classes.iter().position(|c| c.name == self.holder_name) {
            Some(index) => Some(classes.remove(index)),
            None if !top_level.is_empty() => Some(self.synthesize_holder(span)),
            None => None,
        };

        let mut declarations = Vec::new();
        if let Some(mut holder) = holder {
            for mut member in top_level {
                match &mut member {
                    Declaration::Function(function) => function.modifiers.is_static = true,
                    Declaration::Variable(variable) => variable.modifiers.is_static = true,
                    Declaration::Class(_) => {}
                }
                holder.members.push(member);
            }
            let mut holder = self.transform_class(holder, false);
            holder.modifiers.visibility = Some(Visibility::Public);
            declarations.push(Declaration::Class(holder));
        }
        for class in classes {
            let mut class = self.transform_class(class, false);
            // Only the holder may be public in a Java file
            class.modifiers.visibility = Some(Visibility::Internal);
            declarations.push(Declaration::Class(class));
        }

        let imports = self.transform_imports(imports, span);

        log_success!(
            codes::success::TRANSFORMATION_COMPLETE,
            "Transformation completed",
            "classes" => declarations.len(),
            "imports" => imports.len(),
            "issues" => self.issues.len()
        );

        TransformOutcome {
            program: Program {
                package,
                imports,
                declarations,
                span,
            },
            issues: self.issues,
        }
    }

    fn synthesize_holder(&self, span: Span) -> ClassDecl {
        ClassDecl {
            kind: ClassKind::Class,
            name: self.holder_name.clone(),
            type_params: Vec::new(),
            modifiers: Modifiers {
                visibility: Some(Visibility::Public),
                ..Modifiers::default()
            },
            constructor_params: Vec::new(),
            supertypes: Vec::new(),
            members: Vec::new(),
            init_blocks: Vec::new(),
            companion: Vec::new(),
            enum_entries: Vec::new(),
            span,
        }
    }

    /// User imports minus the Kotlin standard library, then the Java imports
    /// the rewrites need, sorted
    fn transform_imports(&mut self, imports: Vec<ImportDecl>, span: Span) -> Vec<ImportDecl> {
        let mut java_imports = Vec::new();
        for import in imports {
            if import.path == "kotlin" || import.path.starts_with("kotlin.") {
                continue;
            }
            if import.alias.is_some() {
                self.report(TransformError::unsupported(
                    format!("import alias for '{}'", import.path),
                    import.span,
                ));
                continue;
            }
            java_imports.push(import);
        }

        for path in std::mem::take(&mut self.imports) {
            if java_imports.iter().any(|i| i.path == path && !i.wildcard) {
                continue;
            }
            java_imports.push(ImportDecl {
                path,
                wildcard: false,
                alias: None,
                span,
            });
        }
        java_imports
    }

    // ========================================================================
    // ISSUES
    // ========================================================================

    fn report(&mut self, issue: TransformError) {
        if self.issues.len() >= MAX_DIAGNOSTICS_PER_UNIT {
            if !self.limit_reported {
                self.limit_reported = true;
                self.issues.push(TransformError::DiagnosticLimit {
                    limit: MAX_DIAGNOSTICS_PER_UNIT,
                    span: issue.span(),
                });
            }
            return;
        }
        log_debug!("Transform issue", "code" => issue.error_code(), "message" => &issue);
        self.issues.push(issue);
    }

    fn unsupported_expr(&mut self, construct: &str, span: Span) -> Expr {
        self.report(TransformError::unsupported(construct, span));
        Expr::Placeholder {
            description: construct.to_string(),
            span,
        }
    }

    fn unsupported_stmt(&mut self, construct: &str, span: Span) -> Stmt {
        self.report(TransformError::unsupported(construct, span));
        Stmt::Placeholder {
            description: construct.to_string(),
            span,
        }
    }

    // ========================================================================
    // SCOPES
    // ========================================================================

    fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn declare(&mut self, name: &str, ty: TypeRef) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    fn fresh_name(&mut self, base: &str) -> String {
        let name = match self.temp_counter {
            0 => base.to_string(),
            n => format!("{}{}", base, n),
        };
        self.temp_counter += 1;
        name
    }

    fn in_holder(&self) -> bool {
        self.current_class.as_deref() == Some(self.holder_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;
    use assert_matches::assert_matches;

    pub(super) fn preferences() -> TransformPreferences {
        TransformPreferences {
            holder_class_suffix: String::new(),
            warn_on_type_fallback: false,
        }
    }

    pub(super) fn transform_source(source: &str, holder: &str) -> TransformOutcome {
        let outcome = parse_source(source);
        assert!(outcome.errors.is_empty(), "parse errors: {:?}", outcome.errors);
        let program = outcome.program.expect("program");
        Transformer::new(holder, preferences()).transform(program)
    }

    pub(super) fn class<'a>(program: &'a Program, name: &str) -> &'a ClassDecl {
        program
            .declarations
            .iter()
            .find_map(|d| match d {
                Declaration::Class(c) if c.name == name => Some(c),
                _ => None,
            })
            .expect("class")
    }

    pub(super) fn method<'a>(class: &'a ClassDecl, name: &str) -> &'a FunctionDecl {
        class
            .members
            .iter()
            .find_map(|d| match d {
                Declaration::Function(f) if f.name == name => Some(f),
                _ => None,
            })
            .expect("method")
    }

    #[test]
    fn test_holder_class_name() {
        assert_eq!(holder_class_name("Hello.kt", ""), "Hello");
        assert_eq!(holder_class_name("src/util/string-utils.kt", "Kt"), "string_utilsKt");
        assert_eq!(holder_class_name("1st.kt", ""), "_1st");
        assert_eq!(holder_class_name(".kt", ""), "Main");
        assert_eq!(holder_class_name("app/.kt", "Kt"), "MainKt");
        assert_eq!(holder_class_name("Script.main.kt", ""), "Script_main");
    }

    #[test]
    fn test_top_level_functions_move_to_holder() {
        let outcome = transform_source(
            "fun greet(name: String) = \"Hello, $name\"\nclass Other",
            "Hello",
        );
        assert!(outcome.issues.is_empty());

        let program = &outcome.program;
        assert_eq!(program.declarations.len(), 2);
        let holder = class(program, "Hello");
        assert_eq!(holder.modifiers.visibility, Some(Visibility::Public));
        assert!(holder.modifiers.is_final);

        let greet = method(holder, "greet");
        assert!(greet.modifiers.is_static);
        assert_eq!(greet.modifiers.visibility, Some(Visibility::Public));
        assert_eq!(greet.return_type.as_ref().map(|t| t.to_string()).as_deref(), Some("String"));
        assert_eq!(greet.params[0].type_ref.as_ref().map(|t| t.name.as_str()), Some("String"));

        let FunctionBody::Block(body) = &greet.body else {
            panic!("expected block body");
        };
        assert_matches!(
            body.statements.as_slice(),
            [Stmt::Return {
                value: Some(Expr::Binary { op: BinaryOp::Add, .. }),
                ..
            }]
        );

        let other = class(program, "Other");
        assert_eq!(other.modifiers.visibility, Some(Visibility::Internal));
    }

    #[test]
    fn test_user_class_named_like_file_becomes_holder() {
        let outcome = transform_source("class Util { fun a() = 1 }\nfun b() = 2", "Util");
        assert_eq!(outcome.program.declarations.len(), 1);
        let util = class(&outcome.program, "Util");
        assert!(!method(util, "a").modifiers.is_static);
        assert!(method(util, "b").modifiers.is_static);
    }

    #[test]
    fn test_no_holder_without_top_level_members() {
        let outcome = transform_source("class A\nclass B", "File");
        let names: Vec<_> = outcome.program.declarations.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_imports_filtered_and_synthesized() {
        let outcome = transform_source(
            "import kotlin.math.max\nimport java.io.File\nfun f(xs: List<Int>) = xs.size",
            "F",
        );
        let paths: Vec<_> = outcome.program.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["java.io.File", "java.util.List"]);
    }

    #[test]
    fn test_import_alias_reported() {
        let outcome = transform_source("import java.io.File as F\nfun f() {}", "A");
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].error_code(), codes::transform::UNSUPPORTED_CONSTRUCT);
        assert!(outcome.program.imports.is_empty());
    }

    #[test]
    fn test_transform_is_idempotent() {
        let source = r#"
            package demo

            data class Point(val x: Int, val y: Int = 0)

            interface Shape {
                fun area(): Double
                fun name(): String = "shape"
            }

            class Circle(val r: Double) : Shape {
                override fun area() = 3.14 * r * r
                companion object {
                    fun unit() = Circle(1.0)
                }
            }

            fun String.shout() = uppercase() + "!"

            fun describe(x: Int): String {
                val label = when (x) {
                    1 -> "one"
                    2 -> "two"
                    else -> "many"
                }
                for (i in 0 until x) {
                    println("$i of $label")
                }
                val p: Point? = null
                val px = p?.x ?: -1
                return label + px
            }

            fun main() {
                val names = listOf("a", "b")
                for (n in names) println(n.shout())
                println(describe(2))
            }
        "#;
        let once = transform_source(source, "Demo");
        assert!(once.issues.is_empty(), "issues: {:?}", once.issues);

        let twice = Transformer::new("Demo", preferences()).transform(once.program.clone());
        assert!(twice.issues.is_empty(), "issues: {:?}", twice.issues);
        assert_eq!(once.program, twice.program);
    }

    #[test]
    fn test_boxed_signatures_are_stable() {
        let once = transform_source("fun f(): Double? = null\nfun g(b: Boolean?): Long? = null", "Boxes");
        assert!(once.issues.is_empty(), "issues: {:?}", once.issues);

        let f = method(class(&once.program, "Boxes"), "f");
        assert_eq!(f.return_type.as_ref().map(|t| t.to_string()), Some("Double".to_string()));

        let twice = Transformer::new("Boxes", preferences()).transform(once.program.clone());
        assert_eq!(once.program, twice.program);
    }

    #[test]
    fn test_diagnostic_limit() {
        let mut transformer = Transformer::new("A", preferences());
        for _ in 0..MAX_DIAGNOSTICS_PER_UNIT + 5 {
            transformer.report(TransformError::unsupported("x", Span::dummy()));
        }
        assert_eq!(transformer.issues.len(), MAX_DIAGNOSTICS_PER_UNIT + 1);
        assert_matches!(
            transformer.issues.last(),
            Some(TransformError::DiagnosticLimit { .. })
        );
    }
}
