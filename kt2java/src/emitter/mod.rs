//! Java source rendering
//!
//! The emitter walks a transformed [`Program`] and prints it as Java. It
//! makes no semantic decisions: every construct it meets already has a
//! direct Java spelling, and a Kotlin-only node left in the tree is an
//! [`EmitError::UnrenderableNode`]. Output depends only on the tree, so the
//! same program always renders to the same bytes.

mod error;
mod expressions;

pub use error::EmitError;

use crate::config::compile_time::emitter::*;
use crate::config::runtime::EmitterPreferences;
use crate::grammar::ast::nodes::*;
use crate::logging::codes;
use crate::{log_debug, log_success};
use expressions::{comment_text, render_type, CONDITIONAL, RELATIONAL};

/// Renders with preferences from the environment
pub fn emit_program(program: &Program) -> Result<String, EmitError> {
    JavaEmitter::new(EmitterPreferences::default()).emit(program)
}

pub struct JavaEmitter {
    preferences: EmitterPreferences,
    unit: String,
    indent: usize,
    output: String,
}

impl JavaEmitter {
    pub fn new(preferences: EmitterPreferences) -> Self {
        Self {
            preferences,
            unit: " ".repeat(INDENT_WIDTH),
            indent: 0,
            output: String::new(),
        }
    }

    /// Header, package line, imports, then each class
    pub fn emit(mut self, program: &Program) -> Result<String, EmitError> {
        log_debug!("Starting emission", "declarations" => program.declarations.len());

        if self.preferences.emit_header_comment {
            self.line("// Generated by kt2java. Do not edit.");
            self.blank_line();
        }
        if let Some(package) = &program.package {
            self.line(&format!("package {};", package.path));
            self.blank_line();
        }
        if !program.imports.is_empty() {
            for import in &program.imports {
                let suffix = if import.wildcard { ".*" } else { "" };
                self.line(&format!("import {}{};", import.path, suffix));
            }
            self.blank_line();
        }

        for (index, declaration) in program.declarations.iter().enumerate() {
            if index > 0 {
                self.blank_line();
            }
            match declaration {
                Declaration::Class(class) => self.class(class)?,
                Declaration::Function(function) => {
                    return Err(EmitError::unrenderable(
                        format!("top-level function '{}'", function.name),
                        function.span,
                    ))
                }
                Declaration::Variable(variable) => {
                    return Err(EmitError::unrenderable(
                        format!("top-level property '{}'", variable.name),
                        variable.span,
                    ))
                }
            }
        }

        if self.output.len() > MAX_OUTPUT_SIZE {
            return Err(EmitError::OutputTooLarge {
                size: self.output.len(),
                limit: MAX_OUTPUT_SIZE,
            });
        }

        log_success!(
            codes::success::EMISSION_COMPLETE,
            "Emission completed",
            "bytes" => self.output.len()
        );
        Ok(self.output)
    }

    // ========================================================================
    // OUTPUT BUFFER
    // ========================================================================

    fn indentation(&self) -> String {
        self.unit.repeat(self.indent)
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str(&self.unit);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn blank_line(&mut self) {
        self.output.push('\n');
    }

    fn indented<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.indent += 1;
        let result = f(self);
        self.indent -= 1;
        result
    }

    /// Statements of `block` one level deeper, rendered into a separate string
    fn nested_block(&mut self, block: &Block) -> Result<String, EmitError> {
        let saved = std::mem::take(&mut self.output);
        let result = self.indented(|e| e.statements(&block.statements));
        let body = std::mem::replace(&mut self.output, saved);
        result.map(|_| body)
    }

    // ========================================================================
    // DECLARATIONS
    // ========================================================================

    fn class(&mut self, class: &ClassDecl) -> Result<(), EmitError> {
        let keyword = match class.kind {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Enum => "enum",
            ClassKind::Object => {
                return Err(EmitError::unrenderable(
                    format!("object declaration '{}'", class.name),
                    class.span,
                ))
            }
        };

        let mut header = String::new();
        push_visibility(&mut header, &class.modifiers);
        if class.kind == ClassKind::Class && class.modifiers.is_abstract {
            header.push_str("abstract ");
        }
        if class.modifiers.is_static {
            header.push_str("static ");
        }
        if class.kind == ClassKind::Class && class.modifiers.is_final {
            header.push_str("final ");
        }
        header.push_str(keyword);
        header.push(' ');
        header.push_str(&class.name);
        header.push_str(&type_parameters(&class.type_params));

        let (extends, implements): (Vec<&SuperType>, Vec<&SuperType>) = match class.kind {
            ClassKind::Interface => (class.supertypes.iter().collect(), Vec::new()),
            _ => class
                .supertypes
                .iter()
                .partition(|supertype| supertype.constructor_args.is_some()),
        };
        if !extends.is_empty() {
            header.push_str(" extends ");
            header.push_str(&supertype_list(&extends));
        }
        if !implements.is_empty() {
            header.push_str(" implements ");
            header.push_str(&supertype_list(&implements));
        }
        header.push_str(" {");
        self.line(&header);

        self.indented(|e| e.class_body(class))?;
        self.line("}");
        Ok(())
    }

    fn class_body(&mut self, class: &ClassDecl) -> Result<(), EmitError> {
        if class.kind == ClassKind::Enum {
            let last = class.enum_entries.len().saturating_sub(1);
            for (index, entry) in class.enum_entries.iter().enumerate() {
                let mut text = entry.name.clone();
                if !entry.args.is_empty() {
                    text.push_str(&format!("({})", self.plain_arguments(&entry.args)?));
                }
                let terminator = match (index == last, class.members.is_empty()) {
                    (false, _) => ",",
                    (true, false) => ";",
                    (true, true) => "",
                };
                text.push_str(terminator);
                self.line(&text);
            }
            if class.enum_entries.is_empty() && !class.members.is_empty() {
                self.line(";");
            }
            if !class.members.is_empty() {
                self.blank_line();
            }
        }

        let in_interface = class.kind == ClassKind::Interface;
        let mut previous_was_field = false;
        for (index, member) in class.members.iter().enumerate() {
            let is_field = matches!(member, Declaration::Variable(_));
            if index > 0 && !(is_field && previous_was_field) {
                self.blank_line();
            }
            previous_was_field = is_field;
            match member {
                Declaration::Variable(field) => self.field(field)?,
                Declaration::Function(function) => self.function(function, in_interface)?,
                Declaration::Class(nested) => self.class(nested)?,
            }
        }
        Ok(())
    }

    fn field(&mut self, field: &VariableDecl) -> Result<(), EmitError> {
        let mut text = String::new();
        push_visibility(&mut text, &field.modifiers);
        if field.modifiers.is_static {
            text.push_str("static ");
        }
        if field.modifiers.is_final {
            text.push_str("final ");
        }
        text.push_str(&field.type_ref.as_ref().map_or_else(|| "Object".to_string(), render_type));
        text.push(' ');
        text.push_str(&field.name);
        if let Some(initializer) = &field.initializer {
            text.push_str(" = ");
            text.push_str(&self.expression(initializer)?);
        }
        text.push(';');
        self.line(&text);
        Ok(())
    }

    fn function(&mut self, function: &FunctionDecl, in_interface: bool) -> Result<(), EmitError> {
        if function.receiver.is_some() {
            return Err(EmitError::unrenderable(
                format!("extension receiver on '{}'", function.name),
                function.span,
            ));
        }
        if function.modifiers.is_override {
            self.line("@Override");
        }

        let modifiers = &function.modifiers;
        let mut text = String::new();
        push_visibility(&mut text, modifiers);
        if modifiers.is_abstract && !in_interface {
            text.push_str("abstract ");
        }
        if modifiers.is_static {
            text.push_str("static ");
        }
        if modifiers.is_final {
            text.push_str("final ");
        }
        if modifiers.is_default && in_interface {
            text.push_str("default ");
        }
        let type_params = type_parameters(&function.type_params);
        if !type_params.is_empty() {
            text.push_str(&type_params);
            text.push(' ');
        }
        if function.kind == FunctionKind::Method {
            let return_type = function
                .return_type
                .as_ref()
                .map_or_else(|| "void".to_string(), render_type);
            text.push_str(&return_type);
            text.push(' ');
        }
        text.push_str(&function.name);
        text.push('(');
        text.push_str(&parameters(&function.params));
        text.push(')');

        match &function.body {
            FunctionBody::None => {
                text.push(';');
                self.line(&text);
            }
            FunctionBody::Block(block) => {
                text.push_str(" {");
                self.line(&text);
                self.indented(|e| e.statements(&block.statements))?;
                self.line("}");
            }
            FunctionBody::Expression(expr) => {
                return Err(EmitError::unrenderable("expression-bodied function", expr.span()))
            }
        }
        Ok(())
    }

    /// Arguments outside any expression context (enum entries)
    fn plain_arguments(&mut self, args: &[Argument]) -> Result<String, EmitError> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.expression(&arg.value)?);
        }
        Ok(rendered.join(", "))
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    fn statements(&mut self, statements: &[Stmt]) -> Result<(), EmitError> {
        for statement in statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn braced(&mut self, head: &str, block: &Block) -> Result<(), EmitError> {
        self.line(&format!("{} {{", head));
        self.indented(|e| e.statements(&block.statements))?;
        self.line("}");
        Ok(())
    }

    fn statement(&mut self, statement: &Stmt) -> Result<(), EmitError> {
        match statement {
            Stmt::Variable(variable) => {
                let mut text = String::new();
                if variable.modifiers.is_final {
                    text.push_str("final ");
                }
                text.push_str(&variable.type_ref.as_ref().map_or_else(|| "var".to_string(), render_type));
                text.push(' ');
                text.push_str(&variable.name);
                if let Some(initializer) = &variable.initializer {
                    text.push_str(" = ");
                    text.push_str(&self.expression(initializer)?);
                }
                text.push(';');
                self.line(&text);
            }

            Stmt::Expression(Expr::If(if_expr)) => self.if_statement(if_expr)?,
            Stmt::Expression(expr) => {
                let text = self.expression(expr)?;
                self.line(&format!("{};", text));
            }

            Stmt::Return { value: None, .. } => self.line("return;"),
            Stmt::Return { value: Some(value), .. } => {
                let value = self.expression(value)?;
                self.line(&format!("return {};", value));
            }
            Stmt::Throw { value, .. } => {
                let value = self.expression(value)?;
                self.line(&format!("throw {};", value));
            }
            Stmt::Break { .. } => self.line("break;"),
            Stmt::Continue { .. } => self.line("continue;"),

            Stmt::While { condition, body, .. } => {
                let condition = self.condition(condition)?;
                self.braced(&format!("while ({})", condition), body)?;
            }
            Stmt::DoWhile { body, condition, .. } => {
                self.line("do {");
                self.indented(|e| e.statements(&body.statements))?;
                let condition = self.condition(condition)?;
                self.line(&format!("}} while ({});", condition));
            }
            Stmt::For {
                variable,
                type_ref,
                iterable,
                body,
                ..
            } => {
                let ty = type_ref.as_ref().map_or_else(|| "var".to_string(), render_type);
                let iterable = self.expression(iterable)?;
                self.braced(&format!("for ({} {} : {})", ty, variable, iterable), body)?;
            }
            Stmt::CountedFor {
                variable,
                type_ref,
                start,
                end,
                inclusive,
                descending,
                body,
                ..
            } => {
                let start = self.expression_at(start, CONDITIONAL)?;
                let end = self.expression_at(end, RELATIONAL + 1)?;
                let (compare, step) = match (*descending, *inclusive) {
                    (false, true) => ("<=", "++"),
                    (false, false) => ("<", "++"),
                    (true, true) => (">=", "--"),
                    (true, false) => (">", "--"),
                };
                let head = format!(
                    "for ({} {v} = {}; {v} {} {}; {v}{})",
                    render_type(type_ref),
                    start,
                    compare,
                    end,
                    step,
                    v = variable
                );
                self.braced(&head, body)?;
            }

            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.line("try {");
                self.indented(|e| e.statements(&body.statements))?;
                for catch in catches {
                    self.line(&format!("}} catch ({} {}) {{", render_type(&catch.type_ref), catch.name));
                    self.indented(|e| e.statements(&catch.body.statements))?;
                }
                if let Some(finally) = finally {
                    self.line("} finally {");
                    self.indented(|e| e.statements(&finally.statements))?;
                }
                self.line("}");
            }

            Stmt::Switch {
                subject,
                cases,
                default,
                ..
            } => {
                let subject = self.condition(subject)?;
                self.line(&format!("switch ({}) {{", subject));
                self.indented(|e| {
                    for case in cases {
                        let mut labels = Vec::with_capacity(case.labels.len());
                        for label in &case.labels {
                            labels.push(format!("case {}:", e.expression(label)?));
                        }
                        e.switch_arm(&labels, &case.body, true)?;
                    }
                    if let Some(default) = default {
                        e.switch_arm(&["default:".to_string()], default, false)?;
                    }
                    Ok::<(), EmitError>(())
                })?;
                self.line("}");
            }

            Stmt::Block(block) => {
                self.line("{");
                self.indented(|e| e.statements(&block.statements))?;
                self.line("}");
            }

            Stmt::Placeholder { description, .. } => {
                self.line(&format!("// TODO: {}", comment_text(description)));
            }
        }
        Ok(())
    }

    fn if_statement(&mut self, if_expr: &IfExpr) -> Result<(), EmitError> {
        let condition = self.condition(&if_expr.condition)?;
        self.line(&format!("if ({}) {{", condition));
        self.indented(|e| e.statements(&if_expr.then_branch.statements))?;

        let mut else_branch = if_expr.else_branch.as_ref();
        while let Some(branch) = else_branch {
            match branch {
                ElseBranch::If(next) => {
                    let condition = self.condition(&next.condition)?;
                    self.line(&format!("}} else if ({}) {{", condition));
                    self.indented(|e| e.statements(&next.then_branch.statements))?;
                    else_branch = next.else_branch.as_ref();
                }
                ElseBranch::Block(block) => {
                    self.line("} else {");
                    self.indented(|e| e.statements(&block.statements))?;
                    else_branch = None;
                }
            }
        }
        self.line("}");
        Ok(())
    }

    /// One `case` group; braced when it declares locals so they stay scoped
    /// to the arm
    fn switch_arm(&mut self, labels: &[String], body: &Block, needs_break: bool) -> Result<(), EmitError> {
        let braced = body.statements.iter().any(|s| matches!(s, Stmt::Variable(_)));
        if let Some((last, rest)) = labels.split_last() {
            for label in rest {
                self.line(label);
            }
            if braced {
                self.line(&format!("{} {{", last));
            } else {
                self.line(last);
            }
        }
        self.indented(|e| {
            e.statements(&body.statements)?;
            if needs_break && can_complete_normally(&body.statements) {
                e.line("break;");
            }
            Ok::<(), EmitError>(())
        })?;
        if braced {
            self.line("}");
        }
        Ok(())
    }
}

fn push_visibility(out: &mut String, modifiers: &Modifiers) {
    match modifiers.visibility {
        Some(Visibility::Public) => out.push_str("public "),
        Some(Visibility::Private) => out.push_str("private "),
        Some(Visibility::Protected) => out.push_str("protected "),
        Some(Visibility::Internal) | None => {}
    }
}

fn type_parameters(params: &[Identifier]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("<{}>", params.join(", "))
    }
}

fn supertype_list(supertypes: &[&SuperType]) -> String {
    supertypes
        .iter()
        .map(|supertype| render_type(&supertype.type_ref))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parameters(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|param| {
            let ty = param.type_ref.as_ref().map_or_else(|| "Object".to_string(), render_type);
            if param.vararg {
                format!("{}... {}", ty, param.name)
            } else {
                format!("{} {}", ty, param.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Java reachability: a `break` after a statement list that always jumps
/// would not compile
fn can_complete_normally(statements: &[Stmt]) -> bool {
    match statements.last() {
        None => true,
        Some(Stmt::Return { .. } | Stmt::Throw { .. } | Stmt::Break { .. } | Stmt::Continue { .. }) => false,
        Some(Stmt::Expression(Expr::Jump { .. })) => false,
        Some(Stmt::Block(block)) => can_complete_normally(&block.statements),
        Some(Stmt::Expression(Expr::If(if_expr))) => if_can_complete_normally(if_expr),
        Some(_) => true,
    }
}

fn if_can_complete_normally(if_expr: &IfExpr) -> bool {
    if can_complete_normally(&if_expr.then_branch.statements) {
        return true;
    }
    match &if_expr.else_branch {
        None => true,
        Some(ElseBranch::Block(block)) => can_complete_normally(&block.statements),
        Some(ElseBranch::If(next)) => if_can_complete_normally(next),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::TransformPreferences;
    use crate::syntax::parse_source;
    use crate::transform::Transformer;
    use crate::utils::Span;
    use assert_matches::assert_matches;

    fn quiet() -> EmitterPreferences {
        EmitterPreferences {
            emit_header_comment: false,
        }
    }

    fn transformed(source: &str, holder: &str) -> Program {
        let outcome = parse_source(source);
        assert!(outcome.errors.is_empty(), "parse errors: {:?}", outcome.errors);
        let program = outcome.program.expect("program");
        let preferences = TransformPreferences {
            holder_class_suffix: String::new(),
            warn_on_type_fallback: false,
        };
        let outcome = Transformer::new(holder, preferences).transform(program);
        assert!(!outcome.has_errors(), "transform issues: {:?}", outcome.issues);
        outcome.program
    }

    fn java(source: &str, holder: &str) -> String {
        JavaEmitter::new(quiet())
            .emit(&transformed(source, holder))
            .expect("emitted")
    }

    #[test]
    fn test_hello_end_to_end() {
        let output = java("fun greet(name: String) = \"Hello, $name\"", "Hello");
        assert!(output.starts_with("public final class Hello {\n"), "{}", output);
        assert!(output.contains("    public static String greet(String name) {\n"), "{}", output);
        assert!(output.contains("        return \"Hello, \" + name;\n"), "{}", output);
        assert!(output.ends_with("}\n"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let program = transformed(
            "package demo\n\ndata class Point(val x: Int, val y: Int)\nfun origin() = Point(0, 0)",
            "Shapes",
        );
        let first = JavaEmitter::new(quiet()).emit(&program).unwrap();
        let second = JavaEmitter::new(quiet()).emit(&program).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("package demo;\n\nimport java.util.Objects;\n\n"), "{}", first);
    }

    #[test]
    fn test_header_comment_preference() {
        let program = transformed("fun one() = 1", "One");
        let with_header = JavaEmitter::new(EmitterPreferences {
            emit_header_comment: true,
        })
        .emit(&program)
        .unwrap();
        assert!(with_header.starts_with("// Generated by kt2java"));
    }

    #[test]
    fn test_safe_call_renders_null_guard() {
        let output = java(
            "class Person(val name: String)\nfun nameOf(p: Person?) = p?.name",
            "People",
        );
        assert!(output.contains("return p != null ? p.name : null;"), "{}", output);
        assert!(output.contains("\nfinal class Person {\n"), "{}", output);
        assert!(output.contains("    public final String name;\n"), "{}", output);
        assert!(output.contains("        this.name = name;\n"), "{}", output);
    }

    #[test]
    fn test_when_renders_switch() {
        let output = java(
            "fun describe(x: Int) {\n    when (x) {\n        1 -> println(\"one\")\n        2, 3 -> println(\"few\")\n        else -> println(\"many\")\n    }\n}",
            "Describe",
        );
        let expected = [
            "        switch (x) {",
            "            case 1:",
            "                System.out.println(\"one\");",
            "                break;",
            "            case 2:",
            "            case 3:",
            "                System.out.println(\"few\");",
            "                break;",
            "            default:",
            "                System.out.println(\"many\");",
            "        }",
        ]
        .join("\n");
        assert!(output.contains(&expected), "{}", output);
    }

    #[test]
    fn test_switch_arm_without_break_after_return() {
        let output = java(
            "fun name(x: Int): String {\n    return when (x) {\n        1 -> \"one\"\n        else -> \"other\"\n    }\n}",
            "Names",
        );
        assert!(output.contains("case 1:\n                return \"one\";\n            default:"), "{}", output);
    }

    #[test]
    fn test_data_class_members() {
        let output = java("data class Point(val x: Int, val y: Int)", "Points");
        assert!(output.contains("    @Override\n    public boolean equals(Object o) {"), "{}", output);
        assert!(output.contains("if (!(o instanceof Point)) {"), "{}", output);
        assert!(output.contains("final Point other = (Point) o;"), "{}", output);
        assert!(output.contains("return x == other.x && y == other.y;"), "{}", output);
        assert!(output.contains("public int hashCode()"), "{}", output);
        assert!(output.contains("return Objects.hash(x, y);"), "{}", output);
    }

    #[test]
    fn test_counted_for_and_enum() {
        let output = java(
            "enum class Color(val rgb: Int) { RED(1), GREEN(2) }\nfun count(n: Int) {\n    for (i in 0 until n) println(i)\n    for (j in n downTo 1) println(j)\n}",
            "Counts",
        );
        assert!(output.contains("for (int i = 0; i < n; i++) {"), "{}", output);
        assert!(output.contains("for (int j = n; j >= 1; j--) {"), "{}", output);
        assert!(output.contains("enum Color {\n    RED(1),\n    GREEN(2);\n"), "{}", output);
        assert!(output.contains("private Color(int rgb) {"), "{}", output);
    }

    #[test]
    fn test_interface_methods() {
        let output = java(
            "interface Named {\n    fun name(): String\n    fun greet() = \"Hi \" + name()\n}",
            "Naming",
        );
        assert!(output.contains("interface Named {"), "{}", output);
        assert!(output.contains("public String name();"), "{}", output);
        assert!(output.contains("public default String greet() {"), "{}", output);
    }

    #[test]
    fn test_kotlin_only_node_is_an_error() {
        let span = Span::dummy();
        let body = Block::new(
            vec![Stmt::Return {
                value: Some(Expr::Elvis {
                    value: Box::new(Expr::identifier("a", span)),
                    default: Box::new(Expr::identifier("b", span)),
                    span,
                }),
                span,
            }],
            span,
        );
        let function = FunctionDecl {
            kind: FunctionKind::Method,
            name: "pick".into(),
            type_params: Vec::new(),
            modifiers: Modifiers::default(),
            receiver: None,
            params: Vec::new(),
            return_type: Some(TypeRef::simple("String", span)),
            body: FunctionBody::Block(body),
            span,
        };
        let program = Program {
            package: None,
            imports: Vec::new(),
            declarations: vec![Declaration::Class(ClassDecl {
                kind: ClassKind::Class,
                name: "Pick".into(),
                type_params: Vec::new(),
                modifiers: Modifiers::default(),
                constructor_params: Vec::new(),
                supertypes: Vec::new(),
                members: vec![Declaration::Function(function)],
                init_blocks: Vec::new(),
                companion: Vec::new(),
                enum_entries: Vec::new(),
                span,
            })],
            span,
        };
        let result = JavaEmitter::new(quiet()).emit(&program);
        assert_matches!(result, Err(EmitError::UnrenderableNode { .. }));
    }

    #[test]
    fn test_placeholder_statement() {
        let span = Span::dummy();
        let mut emitter = JavaEmitter::new(quiet());
        emitter
            .statement(&Stmt::Placeholder {
                description: "scope function\n'apply'".into(),
                span,
            })
            .unwrap();
        assert_eq!(emitter.output, "// TODO: scope function 'apply'\n");
    }

    #[test]
    fn test_reachability() {
        let span = Span::dummy();
        let ret = Stmt::Return { value: None, span };
        assert!(!can_complete_normally(&[ret.clone()]));
        let guarded = Stmt::Expression(Expr::If(IfExpr {
            condition: Box::new(Expr::identifier("c", span)),
            then_branch: Block::new(vec![ret.clone()], span),
            else_branch: None,
            span,
        }));
        assert!(can_complete_normally(&[guarded]));
        let both = Stmt::Expression(Expr::If(IfExpr {
            condition: Box::new(Expr::identifier("c", span)),
            then_branch: Block::new(vec![ret.clone()], span),
            else_branch: Some(ElseBranch::Block(Block::new(vec![ret], span))),
            span,
        }));
        assert!(!can_complete_normally(&[both]));
    }
}
