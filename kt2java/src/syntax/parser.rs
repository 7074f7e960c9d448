//! Kotlin parser
//!
//! Recursive descent for declarations and statements, precedence climbing
//! for expressions. Binding strength from lowest to highest:
//!
//! assignment (right-assoc) < `?:` < `||` < `&&` < `== != === !==`
//! < `< > <= >= in !in is !is` < infix calls < `..` < `+ -` < `* / %`
//! < `as` < prefix `! - + ++ --` < postfix (call, index, `?.`, `.`, `!!`)
//!
//! A malformed statement records one error and parsing resumes after the
//! next `;`, statement-starting newline or closing `}`. Unbalanced blocks
//! are fatal.

use crate::config::compile_time::syntax::*;
use crate::grammar::ast::nodes::*;
use crate::grammar::keywords::{self, Keyword};
use crate::lexical::Lexer;
use crate::log_debug;
use crate::syntax::error::{SyntaxError, SyntaxResult};
use crate::tokens::{LiteralKind, StreamToken, Token, TokenKind, TokenStream};
use crate::utils::{Position, Span};

/// Items that may appear in a class body
enum Member {
    Decl(Declaration),
    Init(Block),
    Companion(Vec<Declaration>),
}

#[derive(Default)]
struct ClassBody {
    members: Vec<Declaration>,
    init_blocks: Vec<Block>,
    companion: Vec<Declaration>,
    enum_entries: Vec<EnumEntry>,
}

pub struct KotlinParser<'a> {
    tokens: TokenStream<'a>,
    errors: Vec<SyntaxError>,
    context_stack: Vec<String>,
    depth: usize,
}

impl<'a> KotlinParser<'a> {
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = Token>,
        I::IntoIter: 'a,
    {
        Self::with_depth(tokens, 0)
    }

    fn with_depth<I>(tokens: I, depth: usize) -> Self
    where
        I: IntoIterator<Item = Token>,
        I::IntoIter: 'a,
    {
        Self {
            tokens: TokenStream::new(tokens),
            errors: Vec::new(),
            context_stack: Vec::new(),
            depth,
        }
    }

    /// Recovered (non-fatal) errors recorded so far
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<SyntaxError> {
        self.errors
    }

    // ========================================================================
    // TOKEN HELPERS
    // ========================================================================

    fn current(&mut self) -> &Token {
        self.tokens.current_token()
    }

    fn span_here(&mut self) -> Span {
        self.tokens.current_span()
    }

    /// Span from `start` through the last consumed token
    fn span_from(&mut self, start: Span) -> Span {
        start.merge(self.tokens.previous_span())
    }

    fn check_kw(&mut self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    fn eat_kw(&mut self, keyword: Keyword) -> bool {
        self.tokens.advance_if(|t| t.is_keyword(keyword)).is_some()
    }

    fn check_punct(&mut self, text: &str) -> bool {
        self.tokens.check_punct(text)
    }

    fn eat_punct(&mut self, text: &str) -> bool {
        self.tokens.eat_punct(text)
    }

    /// Same-line operator check, for operators that must not start a line
    fn check_punct_inline(&mut self, text: &str) -> bool {
        !self.tokens.at_line_start() && self.check_punct(text)
    }

    fn check_soft(&mut self, word: &str) -> bool {
        self.current().is_identifier_with_name(word)
    }

    fn peek(&mut self) -> Token {
        self.tokens.peek().token.clone()
    }

    fn error_here(&mut self, expected: &str) -> SyntaxError {
        let span = self.span_here();
        let token = self.current().clone();
        match token.kind {
            TokenKind::Eof => SyntaxError::unexpected_end_of_input(expected, span),
            TokenKind::Error => SyntaxError::LexicalErrorToken {
                text: token.text,
                span,
            },
            _ => SyntaxError::unexpected_token(expected, &token.describe(), span),
        }
    }

    fn expect_punct(&mut self, text: &str) -> SyntaxResult<Span> {
        if self.eat_punct(text) {
            Ok(self.tokens.previous_span())
        } else {
            Err(self.error_here(&format!("'{}'", text)))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> SyntaxResult<(Identifier, Span)> {
        if self.current().is_identifier() {
            let token = self.tokens.advance();
            Ok((identifier_text(&token.token.text), token.span()))
        } else {
            Err(self.error_here(what))
        }
    }

    fn expect_soft(&mut self, word: &str) -> SyntaxResult<()> {
        if self.check_soft(word) {
            self.tokens.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("'{}'", word)))
        }
    }

    // ========================================================================
    // DEPTH, CONTEXT AND RECOVERY
    // ========================================================================

    /// Run `f` one nesting level deeper, failing past the depth limit
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> SyntaxResult<T>) -> SyntaxResult<T> {
        if self.depth >= MAX_PARSE_DEPTH {
            let span = self.span_here();
            return Err(SyntaxError::max_recursion_depth(span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn with_context<T>(
        &mut self,
        context: String,
        f: impl FnOnce(&mut Self) -> SyntaxResult<T>,
    ) -> SyntaxResult<T> {
        let pushed = self.context_stack.len() < MAX_CONTEXT_STACK_DEPTH;
        if pushed {
            self.context_stack.push(context);
        }
        let result = f(self);
        if pushed {
            self.context_stack.pop();
        }
        result
    }

    fn current_context(&self) -> String {
        if self.context_stack.is_empty() {
            "top level".to_string()
        } else {
            self.context_stack.join(" > ")
        }
    }

    /// Record a recoverable error and skip to the next statement boundary
    fn recover(&mut self, error: SyntaxError, start_position: usize) -> SyntaxResult<()> {
        if error.is_fatal() {
            return Err(error);
        }

        log_debug!("Recovering from syntax error",
            "code" => error.error_code(),
            "context" => self.current_context(),
            "position" => error.span().start()
        );

        self.record(error)?;
        self.synchronize(start_position);
        Ok(())
    }

    /// Record an error without skipping any input
    fn record(&mut self, error: SyntaxError) -> SyntaxResult<()> {
        self.errors.push(error);
        if self.errors.len() >= MAX_ERROR_HISTORY {
            let span = self.span_here();
            return Err(SyntaxError::TooManyErrors {
                count: self.errors.len(),
                span,
            });
        }
        Ok(())
    }

    /// Skip to `;` (consumed), a newline-led token or `}` at bracket depth 0
    fn synchronize(&mut self, start_position: usize) {
        // Always make progress when the failing statement consumed nothing
        if self.tokens.position() == start_position && !self.check_punct("}") {
            self.tokens.advance();
        }

        let mut depth = 0usize;
        for _ in 0..MAX_RECOVERY_SCAN_TOKENS {
            let current = self.tokens.current().clone();
            let token = &current.token;
            if token.kind.is_terminal() {
                return;
            }
            if depth == 0 {
                if token.is_delimiter(";") {
                    self.tokens.advance();
                    return;
                }
                if token.is_delimiter("}") || current.newline_before {
                    return;
                }
            }
            match token.text.as_str() {
                "{" | "(" | "[" if token.kind == TokenKind::Delimiter => depth += 1,
                "}" | ")" | "]" if token.kind == TokenKind::Delimiter => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.tokens.advance();
        }
    }

    /// A statement must end at `;`, a line break, `}` or end of input
    fn expect_statement_end(&mut self) -> SyntaxResult<()> {
        if self.check_punct(";")
            || self.check_punct("}")
            || self.tokens.at_line_start()
            || self.tokens.is_at_end()
        {
            Ok(())
        } else {
            Err(self.error_here("end of statement"))
        }
    }

    fn unterminated_block(&mut self, open: Span) -> SyntaxError {
        if self.current().is_error() {
            self.error_here("'}'")
        } else {
            SyntaxError::unmatched_delimiter("{", open)
        }
    }

    // ========================================================================
    // PROGRAM
    // ========================================================================

    /// Parse a whole file; recoverable errors are available via [`Self::errors`]
    pub fn parse_program(&mut self) -> SyntaxResult<Program> {
        let start = self.span_here();

        let package = if self.check_kw(Keyword::Package) {
            let before = self.tokens.position();
            match self.parse_package().and_then(|p| self.expect_statement_end().map(|_| p)) {
                Ok(package) => Some(package),
                Err(error) => {
                    self.recover(error, before)?;
                    None
                }
            }
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.check_soft("import") && self.peek().is_identifier() {
            let before = self.tokens.position();
            match self.parse_import().and_then(|i| self.expect_statement_end().map(|_| i)) {
                Ok(import) => imports.push(import),
                Err(error) => self.recover(error, before)?,
            }
            while self.eat_punct(";") {}
        }

        let mut declarations = Vec::new();
        loop {
            while self.eat_punct(";") {}
            if self.current().is_error() {
                return Err(self.error_here("declaration"));
            }
            if self.tokens.is_at_end() {
                break;
            }
            if self.check_punct("}") {
                let span = self.span_here();
                return Err(SyntaxError::unmatched_delimiter("}", span));
            }

            let before = self.tokens.position();
            let result = self
                .parse_member(false)
                .and_then(|member| self.expect_statement_end().map(|_| member));
            match result {
                Ok(Member::Decl(declaration)) => declarations.push(declaration),
                Ok(Member::Init(block)) => {
                    let error = SyntaxError::grammar_violation("init block outside of a class", block.span);
                    self.record(error)?;
                }
                Ok(Member::Companion(_)) => {
                    let span = self.tokens.previous_span();
                    let error = SyntaxError::grammar_violation("companion object outside of a class", span);
                    self.record(error)?;
                }
                Err(error) => self.recover(error, before)?,
            }
        }

        let span = self.span_from(start);
        Ok(Program {
            package,
            imports,
            declarations,
            span,
        })
    }

    fn parse_qualified_name(&mut self, what: &str) -> SyntaxResult<String> {
        let (mut path, _) = self.expect_identifier(what)?;
        while self.check_punct(".") && self.peek().is_identifier() {
            self.tokens.advance();
            let (segment, _) = self.expect_identifier(what)?;
            path.push('.');
            path.push_str(&segment);
        }
        Ok(path)
    }

    fn parse_package(&mut self) -> SyntaxResult<PackageDecl> {
        let start = self.span_here();
        self.eat_kw(Keyword::Package);
        let path = self.parse_qualified_name("package name")?;
        Ok(PackageDecl {
            path,
            span: self.span_from(start),
        })
    }

    fn parse_import(&mut self) -> SyntaxResult<ImportDecl> {
        let start = self.span_here();
        self.expect_soft("import")?;
        let path = self.parse_qualified_name("import path")?;

        let wildcard = if self.check_punct(".") && self.peek().is_operator("*") {
            self.tokens.advance();
            self.tokens.advance();
            true
        } else {
            false
        };

        let alias = if !wildcard && self.check_soft("as") {
            self.tokens.advance();
            Some(self.expect_identifier("import alias")?.0)
        } else {
            None
        };

        Ok(ImportDecl {
            path,
            wildcard,
            alias,
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // DECLARATIONS
    // ========================================================================

    fn parse_member(&mut self, in_class: bool) -> SyntaxResult<Member> {
        let start = self.span_here();

        if in_class && self.check_soft("init") && self.peek().is_delimiter("{") {
            self.tokens.advance();
            return self.parse_block().map(Member::Init);
        }

        let modifiers = self.parse_modifiers();

        if self.check_soft("companion") && self.peek().is_identifier_with_name("object") {
            self.tokens.advance();
            self.tokens.advance();
            if self.current().is_identifier() && !self.check_soft("object") {
                self.tokens.advance();
            }
            let body = self.parse_class_body(ClassKind::Object)?;
            if let Some(init) = body.init_blocks.first() {
                return Err(SyntaxError::grammar_violation(
                    "init blocks in companion objects are not supported",
                    init.span,
                ));
            }
            return Ok(Member::Companion(body.members));
        }

        if self.check_soft("constructor") {
            let span = self.span_here();
            return Err(SyntaxError::grammar_violation(
                "secondary constructors are not supported",
                span,
            ));
        }

        let token = self.current().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::Fun) => self
                .parse_function(modifiers, start)
                .map(|f| Member::Decl(Declaration::Function(f))),
            TokenKind::Keyword(Keyword::Val) | TokenKind::Keyword(Keyword::Var) => self
                .parse_variable(modifiers)
                .map(|v| Member::Decl(Declaration::Variable(v))),
            TokenKind::Keyword(Keyword::Class) | TokenKind::Keyword(Keyword::Interface) => self
                .parse_class(modifiers, start)
                .map(|c| Member::Decl(Declaration::Class(c))),
            TokenKind::Identifier if token.text == "object" && self.peek().is_identifier() => self
                .parse_class(modifiers, start)
                .map(|c| Member::Decl(Declaration::Class(c))),
            _ => Err(self.error_here("declaration")),
        }
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();

        loop {
            let token = self.current().clone();
            if !token.is_identifier() || !keywords::is_modifier(&token.text) {
                break;
            }

            // A modifier is only a modifier when a declaration follows it
            let next = self.peek();
            let declaration_follows = match next.kind {
                TokenKind::Keyword(kw) => matches!(
                    kw,
                    Keyword::Fun | Keyword::Val | Keyword::Var | Keyword::Class | Keyword::Interface
                ),
                TokenKind::Identifier => {
                    keywords::is_modifier(&next.text)
                        || matches!(next.text.as_str(), "object" | "companion" | "constructor")
                }
                _ => false,
            };
            if !declaration_follows {
                break;
            }

            self.tokens.advance();
            match token.text.as_str() {
                "open" => modifiers.is_open = true,
                "abstract" | "sealed" => modifiers.is_abstract = true,
                "final" => modifiers.is_final = true,
                "override" => modifiers.is_override = true,
                "data" => modifiers.is_data = true,
                "enum" => modifiers.is_enum = true,
                word => {
                    if let Some(visibility) = Visibility::parse(word) {
                        modifiers.visibility = Some(visibility);
                    }
                }
            }
        }

        modifiers
    }

    fn parse_function(&mut self, modifiers: Modifiers, start: Span) -> SyntaxResult<FunctionDecl> {
        self.eat_kw(Keyword::Fun);
        let type_params = self.parse_type_params()?;
        let (receiver, name) = self.parse_function_name()?;

        self.with_context(format!("function '{}'", name), |p| {
            let params = p.parse_params()?;

            let return_type = if p.eat_punct(":") {
                Some(p.parse_type()?)
            } else {
                None
            };

            let body = if p.check_punct("{") {
                FunctionBody::Block(p.parse_block()?)
            } else if p.eat_punct("=") {
                FunctionBody::Expression(p.parse_expression()?)
            } else {
                FunctionBody::None
            };

            Ok(FunctionDecl {
                kind: FunctionKind::Method,
                name,
                type_params,
                modifiers,
                receiver,
                params,
                return_type,
                body,
                span: p.span_from(start),
            })
        })
    }

    /// `name`, or `Receiver.name` for extension functions
    fn parse_function_name(&mut self) -> SyntaxResult<(Option<TypeRef>, Identifier)> {
        if self.current().is_identifier() && self.peek().is_delimiter("(") {
            return Ok((None, self.expect_identifier("function name")?.0));
        }

        let mut ty = self.parse_type()?;

        // `String?.name` lexes `?.` as one operator
        if self.check_punct("?.") {
            self.tokens.advance();
            ty.nullable = true;
            return Ok((Some(ty), self.expect_identifier("function name")?.0));
        }

        if self.eat_punct(".") {
            return Ok((Some(ty), self.expect_identifier("function name")?.0));
        }

        if ty.arguments.is_empty() && !ty.nullable {
            if let Some((receiver, name)) = ty.name.rsplit_once('.') {
                let receiver = TypeRef::simple(receiver, ty.span);
                return Ok((Some(receiver), name.to_string()));
            }
            return Ok((None, ty.name));
        }

        Err(self.error_here("function name"))
    }

    fn parse_params(&mut self) -> SyntaxResult<Vec<Parameter>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();

        while !self.check_punct(")") {
            let start = self.span_here();
            let _ = self.parse_modifiers();

            let vararg = if self.check_soft("vararg") && self.peek().is_identifier() {
                self.tokens.advance();
                true
            } else {
                false
            };

            let property = if self.eat_kw(Keyword::Val) {
                Some(Mutability::Immutable)
            } else if self.eat_kw(Keyword::Var) {
                Some(Mutability::Mutable)
            } else {
                None
            };

            let (name, _) = self.expect_identifier("parameter name")?;
            let type_ref = if self.eat_punct(":") {
                Some(self.parse_type()?)
            } else {
                None
            };
            let default = if self.eat_punct("=") {
                Some(self.parse_expression()?)
            } else {
                None
            };

            params.push(Parameter {
                name,
                type_ref,
                default,
                property,
                vararg,
                span: self.span_from(start),
            });

            if !self.eat_punct(",") {
                break;
            }
        }

        self.expect_punct(")")?;
        Ok(params)
    }

    /// Declaration type parameters `<T, R : Any>`; bounds are dropped
    fn parse_type_params(&mut self) -> SyntaxResult<Vec<Identifier>> {
        let mut names = Vec::new();
        if !self.eat_punct("<") {
            return Ok(names);
        }
        loop {
            while self.check_soft("reified") || self.check_soft("out") || self.check_kw(Keyword::In) {
                if !self.peek().is_identifier() {
                    break;
                }
                self.tokens.advance();
            }
            names.push(self.expect_identifier("type parameter")?.0);
            if self.eat_punct(":") {
                self.parse_type()?;
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(">")?;
        Ok(names)
    }

    fn parse_variable(&mut self, modifiers: Modifiers) -> SyntaxResult<VariableDecl> {
        let start = self.span_here();
        let mutability = if self.eat_kw(Keyword::Val) {
            Mutability::Immutable
        } else if self.eat_kw(Keyword::Var) {
            Mutability::Mutable
        } else {
            return Err(self.error_here("'val' or 'var'"));
        };

        if self.check_punct("(") {
            let span = self.span_here();
            return Err(SyntaxError::grammar_violation(
                "destructuring declarations are not supported",
                span,
            ));
        }

        let (name, _) = self.expect_identifier("variable name")?;
        let type_ref = if self.eat_punct(":") {
            Some(self.parse_type()?)
        } else {
            None
        };
        let initializer = if self.eat_punct("=") {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(VariableDecl {
            name,
            mutability,
            modifiers,
            type_ref,
            initializer,
            span: self.span_from(start),
        })
    }

    fn parse_class(&mut self, mut modifiers: Modifiers, start: Span) -> SyntaxResult<ClassDecl> {
        let kind = if self.eat_kw(Keyword::Interface) {
            ClassKind::Interface
        } else if self.eat_kw(Keyword::Class) {
            if modifiers.is_enum {
                ClassKind::Enum
            } else {
                ClassKind::Class
            }
        } else {
            self.expect_soft("object")?;
            ClassKind::Object
        };
        modifiers.is_enum = false;

        let (name, _) = self.expect_identifier("class name")?;
        self.with_context(format!("class '{}'", name), |p| {
            let type_params = p.parse_type_params()?;

            // `class A private constructor(...)`
            let checkpoint = p.tokens.checkpoint();
            let _ = p.parse_modifiers();
            if p.check_soft("constructor") {
                p.tokens.advance();
            } else {
                p.tokens.restore(checkpoint);
            }
            let constructor_params = if p.check_punct_inline("(") {
                p.parse_params()?
            } else {
                Vec::new()
            };

            let mut supertypes = Vec::new();
            if p.eat_punct(":") {
                loop {
                    let super_start = p.span_here();
                    let type_ref = p.parse_type()?;
                    let constructor_args = if p.check_punct_inline("(") {
                        Some(p.parse_arguments()?)
                    } else {
                        None
                    };
                    supertypes.push(SuperType {
                        type_ref,
                        constructor_args,
                        span: p.span_from(super_start),
                    });
                    if !p.eat_punct(",") {
                        break;
                    }
                }
            }

            let body = if p.check_punct("{") {
                p.parse_class_body(kind)?
            } else {
                ClassBody::default()
            };

            Ok(ClassDecl {
                kind,
                name,
                type_params,
                modifiers,
                constructor_params,
                supertypes,
                members: body.members,
                init_blocks: body.init_blocks,
                companion: body.companion,
                enum_entries: body.enum_entries,
                span: p.span_from(start),
            })
        })
    }

    fn parse_class_body(&mut self, kind: ClassKind) -> SyntaxResult<ClassBody> {
        let open = self.span_here();
        self.expect_punct("{")?;
        let mut body = ClassBody::default();

        if kind == ClassKind::Enum {
            body.enum_entries = self.parse_enum_entries()?;
        }

        self.nested(|p| {
            loop {
                while p.eat_punct(";") {}
                if p.eat_punct("}") {
                    return Ok(());
                }
                if p.tokens.is_at_end() {
                    return Err(p.unterminated_block(open));
                }

                let before = p.tokens.position();
                let result = p
                    .parse_member(true)
                    .and_then(|member| p.expect_statement_end().map(|_| member));
                match result {
                    Ok(Member::Decl(declaration)) => body.members.push(declaration),
                    Ok(Member::Init(block)) => body.init_blocks.push(block),
                    Ok(Member::Companion(members)) => body.companion.extend(members),
                    Err(error) => p.recover(error, before)?,
                }
            }
        })?;

        Ok(body)
    }

    fn parse_enum_entries(&mut self) -> SyntaxResult<Vec<EnumEntry>> {
        let mut entries = Vec::new();
        loop {
            let is_entry = self.current().is_identifier() && {
                let next = self.peek();
                next.is_punct(",") || next.is_punct(";") || next.is_punct("}") || next.is_punct("(")
            };
            if !is_entry {
                break;
            }
            let start = self.span_here();
            let (name, _) = self.expect_identifier("enum entry")?;
            let args = if self.check_punct_inline("(") {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            entries.push(EnumEntry {
                name,
                args,
                span: self.span_from(start),
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_punct(";");
        Ok(entries)
    }

    // ========================================================================
    // TYPES
    // ========================================================================

    fn parse_type(&mut self) -> SyntaxResult<TypeRef> {
        self.nested(|p| {
            let start = p.span_here();
            if p.check_punct("(") {
                return Err(SyntaxError::grammar_violation(
                    "function types are not supported",
                    start,
                ));
            }

            let mut name = p.expect_identifier("type name")?.0;
            while p.check_punct(".") && p.peek().is_identifier() {
                p.tokens.advance();
                name.push('.');
                name.push_str(&p.expect_identifier("type name")?.0);
            }

            let arguments = if p.check_punct("<") {
                p.parse_type_arguments()?
            } else {
                Vec::new()
            };

            let nullable = p.eat_punct("?");

            Ok(TypeRef {
                name,
                arguments,
                nullable,
                array_dims: 0,
                resolved: false,
                span: p.span_from(start),
            })
        })
    }

    /// `<A, out B, *>`; variance annotations are dropped
    fn parse_type_arguments(&mut self) -> SyntaxResult<Vec<TypeRef>> {
        self.expect_punct("<")?;
        let mut arguments = Vec::new();
        loop {
            if self.check_punct("*") {
                let span = self.span_here();
                self.tokens.advance();
                arguments.push(TypeRef::simple("*", span));
            } else {
                if (self.check_soft("out") || self.check_kw(Keyword::In)) && self.peek().is_identifier() {
                    self.tokens.advance();
                }
                arguments.push(self.parse_type()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(">")?;
        Ok(arguments)
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    pub fn parse_block(&mut self) -> SyntaxResult<Block> {
        let open = self.span_here();
        self.expect_punct("{")?;
        let statements = self.nested(|p| p.parse_statements_until_brace(open))?;
        Ok(Block::new(statements, self.span_from(open)))
    }

    /// Statements up to and including the `}` matching `open`
    fn parse_statements_until_brace(&mut self, open: Span) -> SyntaxResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            while self.eat_punct(";") {}
            if self.eat_punct("}") {
                return Ok(statements);
            }
            if self.tokens.is_at_end() {
                return Err(self.unterminated_block(open));
            }

            let before = self.tokens.position();
            match self.parse_statement() {
                Ok(statement) => {
                    statements.push(statement);
                    if let Err(error) = self.expect_statement_end() {
                        self.recover(error, before)?;
                    }
                }
                Err(error) => self.recover(error, before)?,
            }
        }
    }

    pub fn parse_statement(&mut self) -> SyntaxResult<Stmt> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> SyntaxResult<Stmt> {
        let start = self.span_here();
        let token = self.current().clone();

        match token.kind {
            TokenKind::Keyword(Keyword::Val) | TokenKind::Keyword(Keyword::Var) => {
                Ok(Stmt::Variable(self.parse_variable(Modifiers::default())?))
            }
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => {
                self.tokens.advance();
                let condition = self.parse_parenthesized()?;
                let body = self.parse_control_body()?;
                Ok(Stmt::While {
                    condition,
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.tokens.advance();
                let body = self.parse_control_body()?;
                if !self.eat_kw(Keyword::While) {
                    return Err(self.error_here("'while'"));
                }
                let condition = self.parse_parenthesized()?;
                Ok(Stmt::DoWhile {
                    body,
                    condition,
                    span: self.span_from(start),
                })
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.tokens.advance();
                let value = if self.can_start_value() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Stmt::Return {
                    value,
                    span: self.span_from(start),
                })
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.tokens.advance();
                let value = self.parse_expression()?;
                Ok(Stmt::Throw {
                    value,
                    span: self.span_from(start),
                })
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.tokens.advance();
                Ok(Stmt::Break { span: start })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.tokens.advance();
                Ok(Stmt::Continue { span: start })
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Fun)
            | TokenKind::Keyword(Keyword::Class)
            | TokenKind::Keyword(Keyword::Interface) => Err(SyntaxError::grammar_violation(
                "local declarations are not supported",
                start,
            )),
            _ => Ok(Stmt::Expression(self.parse_expression()?)),
        }
    }

    /// A value may follow `return` on the same line
    fn can_start_value(&mut self) -> bool {
        !(self.tokens.at_line_start()
            || self.tokens.is_at_end()
            || self.check_punct(";")
            || self.check_punct("}")
            || self.check_punct(")")
            || self.check_punct(",")
            || self.check_kw(Keyword::Else))
    }

    fn parse_parenthesized(&mut self) -> SyntaxResult<Expr> {
        self.expect_punct("(")?;
        let expr = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    /// `{ block }` or a single statement wrapped in a block
    fn parse_control_body(&mut self) -> SyntaxResult<Block> {
        if self.check_punct("{") {
            self.parse_block()
        } else {
            let statement = self.parse_statement()?;
            let span = statement.span();
            Ok(Block::new(vec![statement], span))
        }
    }

    fn parse_for(&mut self) -> SyntaxResult<Stmt> {
        let start = self.span_here();
        self.eat_kw(Keyword::For);
        self.expect_punct("(")?;

        if self.check_punct("(") {
            let span = self.span_here();
            return Err(SyntaxError::grammar_violation(
                "destructuring in for loops is not supported",
                span,
            ));
        }

        let (variable, _) = self.expect_identifier("loop variable")?;
        let type_ref = if self.eat_punct(":") {
            Some(self.parse_type()?)
        } else {
            None
        };
        if !self.eat_kw(Keyword::In) {
            return Err(self.error_here("'in'"));
        }
        let iterable = self.parse_expression()?;
        self.expect_punct(")")?;
        let body = self.parse_control_body()?;

        Ok(Stmt::For {
            variable,
            type_ref,
            iterable,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_try(&mut self) -> SyntaxResult<Stmt> {
        let start = self.span_here();
        self.eat_kw(Keyword::Try);
        let body = self.parse_block()?;

        let mut catches = Vec::new();
        while self.check_soft("catch") {
            let catch_start = self.span_here();
            self.tokens.advance();
            self.expect_punct("(")?;
            let (name, _) = self.expect_identifier("exception name")?;
            self.expect_punct(":")?;
            let type_ref = self.parse_type()?;
            self.expect_punct(")")?;
            let catch_body = self.parse_block()?;
            catches.push(CatchClause {
                name,
                type_ref,
                body: catch_body,
                span: self.span_from(catch_start),
            });
        }

        let finally = if self.check_soft("finally") {
            self.tokens.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if catches.is_empty() && finally.is_none() {
            return Err(self.error_here("'catch' or 'finally'"));
        }

        Ok(Stmt::Try {
            body,
            catches,
            finally,
            span: self.span_from(start),
        })
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    pub fn parse_expression(&mut self) -> SyntaxResult<Expr> {
        self.nested(|p| p.parse_assignment())
    }

    fn parse_assignment(&mut self) -> SyntaxResult<Expr> {
        let target = self.parse_elvis()?;

        let op = {
            let token = self.current();
            if token.kind == TokenKind::Operator {
                AssignOp::from_operator(&token.text)
            } else {
                None
            }
        };

        let Some(op) = op else {
            return Ok(target);
        };

        if !matches!(
            target,
            Expr::Identifier { .. } | Expr::FieldAccess { .. } | Expr::Index { .. }
        ) {
            let span = self.span_here();
            return Err(SyntaxError::grammar_violation("invalid assignment target", span));
        }

        self.tokens.advance();
        let value = self.parse_expression()?;
        let span = target.span().merge(value.span());
        Ok(Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value),
            span,
        })
    }

    fn parse_elvis(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_or()?;
        while self.check_punct("?:") {
            self.tokens.advance();
            let right = self.parse_or()?;
            let span = left.span().merge(right.span());
            left = Expr::Elvis {
                value: Box::new(left),
                default: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    /// Left-associative binary level over `operators`
    fn parse_binary_level(
        &mut self,
        operators: &[(&str, BinaryOp)],
        inline_only: bool,
        next: fn(&mut Self) -> SyntaxResult<Expr>,
    ) -> SyntaxResult<Expr> {
        let mut left = next(self)?;
        loop {
            if inline_only && self.tokens.at_line_start() {
                break;
            }
            let op = {
                let token = self.current();
                if token.kind != TokenKind::Operator {
                    None
                } else {
                    operators
                        .iter()
                        .find(|(text, _)| token.text == *text)
                        .map(|(_, op)| *op)
                }
            };
            let Some(op) = op else { break };
            self.tokens.advance();
            let right = next(self)?;
            let span = left.span().merge(right.span());
            left = Expr::binary(op, left, right, span);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary_level(&[("||", BinaryOp::Or)], false, Self::parse_and)
    }

    fn parse_and(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary_level(&[("&&", BinaryOp::And)], false, Self::parse_equality)
    }

    fn parse_equality(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary_level(
            &[
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::NotEq),
                ("===", BinaryOp::RefEq),
                ("!==", BinaryOp::RefNotEq),
            ],
            false,
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_infix_call()?;
        loop {
            let inline = !self.tokens.at_line_start();
            let token = self.current().clone();

            let comparison = match token.text.as_str() {
                "<" => Some(BinaryOp::Lt),
                ">" => Some(BinaryOp::Gt),
                "<=" => Some(BinaryOp::LtEq),
                ">=" => Some(BinaryOp::GtEq),
                _ => None,
            };

            if let (Some(op), TokenKind::Operator) = (comparison, token.kind) {
                self.tokens.advance();
                let right = self.parse_infix_call()?;
                let span = left.span().merge(right.span());
                left = Expr::binary(op, left, right, span);
                continue;
            }

            if !inline {
                break;
            }

            // `!in` / `!is` arrive as `!` followed by the word
            let negated = token.is_operator("!")
                && (self.peek().is_keyword(Keyword::In) || self.peek().is_identifier_with_name("is"));
            if negated {
                self.tokens.advance();
            }

            if self.check_kw(Keyword::In) {
                self.tokens.advance();
                let right = self.parse_infix_call()?;
                let span = left.span().merge(right.span());
                let op = if negated { BinaryOp::NotIn } else { BinaryOp::In };
                left = Expr::binary(op, left, right, span);
            } else if self.check_soft("is") {
                self.tokens.advance();
                let type_ref = self.parse_type()?;
                let span = left.span().merge(type_ref.span);
                left = Expr::TypeCheck {
                    value: Box::new(left),
                    type_ref,
                    negated,
                    span,
                };
            } else {
                break;
            }
        }
        Ok(left)
    }

    /// `a to b`, `0 until n`: identifiers between operands on one line
    fn parse_infix_call(&mut self) -> SyntaxResult<Expr> {
        let mut left = self.parse_range()?;
        loop {
            let token = self.current().clone();
            if !token.is_identifier()
                || self.tokens.at_line_start()
                || matches!(token.text.as_str(), "is" | "as")
            {
                break;
            }
            let name_span = self.span_here();
            self.tokens.advance();
            let right = self.parse_range()?;
            let span = left.span().merge(right.span());
            let callee = Expr::field(left, identifier_text(&token.text), name_span);
            left = Expr::call(callee, vec![right], span);
        }
        Ok(left)
    }

    fn parse_range(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary_level(&[("..", BinaryOp::RangeTo)], false, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> SyntaxResult<Expr> {
        // `+`/`-` at line start begin a new statement
        self.parse_binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            true,
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> SyntaxResult<Expr> {
        self.parse_binary_level(
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
            false,
            Self::parse_as,
        )
    }

    fn parse_as(&mut self) -> SyntaxResult<Expr> {
        let mut value = self.parse_unary()?;
        while self.check_soft("as") && !self.tokens.at_line_start() {
            self.tokens.advance();
            let safe = self.eat_punct("?");
            let type_ref = self.parse_type()?;
            let span = value.span().merge(type_ref.span);
            value = Expr::Cast {
                value: Box::new(value),
                type_ref,
                safe,
                span,
            };
        }
        Ok(value)
    }

    fn parse_unary(&mut self) -> SyntaxResult<Expr> {
        let token = self.current().clone();
        let op = if token.kind == TokenKind::Operator {
            match token.text.as_str() {
                "!" => Some(UnaryOp::Not),
                "-" => Some(UnaryOp::Negate),
                "+" => Some(UnaryOp::Plus),
                "++" => Some(UnaryOp::PreIncrement),
                "--" => Some(UnaryOp::PreDecrement),
                "!!" => {
                    // Double negation lexes as one token
                    let start = self.span_here();
                    self.tokens.advance();
                    let operand = self.nested(|p| p.parse_unary())?;
                    let span = start.merge(operand.span());
                    let inner = Expr::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                        span,
                    };
                    return Ok(Expr::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(inner),
                        span,
                    });
                }
                _ => None,
            }
        } else {
            None
        };

        let Some(op) = op else {
            return self.parse_postfix();
        };

        let start = self.span_here();
        self.tokens.advance();
        let operand = self.nested(|p| p.parse_unary())?;
        let span = start.merge(operand.span());
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_postfix(&mut self) -> SyntaxResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check_punct_inline("(") {
                let args = self.parse_arguments()?;
                let mut span = self.span_from(expr.span());
                let mut args = args;
                if self.check_punct_inline("{") {
                    let lambda = self.parse_lambda()?;
                    span = span.merge(lambda.span());
                    args.push(Argument::positional(lambda));
                }
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span,
                };
            } else if self.check_punct_inline("{") && accepts_trailing_lambda(&expr) {
                let lambda = self.parse_lambda()?;
                let span = expr.span().merge(lambda.span());
                expr = match expr {
                    Expr::SafeCall {
                        target,
                        name,
                        args,
                        ..
                    } => {
                        let mut args = args.unwrap_or_default();
                        args.push(Argument::positional(lambda));
                        Expr::SafeCall {
                            target,
                            name,
                            args: Some(args),
                            span,
                        }
                    }
                    callee => Expr::Call {
                        callee: Box::new(callee),
                        args: vec![Argument::positional(lambda)],
                        span,
                    },
                };
            } else if self.check_punct_inline("[") {
                self.tokens.advance();
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                let span = self.span_from(expr.span());
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
            } else if self.check_punct(".") {
                self.tokens.advance();
                let (name, _) = self.expect_identifier("member name")?;
                let span = self.span_from(expr.span());
                expr = Expr::field(expr, name, span);
            } else if self.check_punct("?.") {
                self.tokens.advance();
                let (name, _) = self.expect_identifier("member name")?;
                let args = if self.check_punct_inline("(") {
                    let mut args = self.parse_arguments()?;
                    if self.check_punct_inline("{") {
                        args.push(Argument::positional(self.parse_lambda()?));
                    }
                    Some(args)
                } else {
                    None
                };
                let span = self.span_from(expr.span());
                expr = Expr::SafeCall {
                    target: Box::new(expr),
                    name,
                    args,
                    span,
                };
            } else if self.check_punct_inline("!!") {
                self.tokens.advance();
                let span = self.span_from(expr.span());
                expr = Expr::Unary {
                    op: UnaryOp::NotNullAssert,
                    operand: Box::new(expr),
                    span,
                };
            } else if self.check_punct_inline("++") || self.check_punct_inline("--") {
                let op = if self.check_punct("++") {
                    UnaryOp::PostIncrement
                } else {
                    UnaryOp::PostDecrement
                };
                self.tokens.advance();
                let span = self.span_from(expr.span());
                expr = Expr::Unary {
                    op,
                    operand: Box::new(expr),
                    span,
                };
            } else if self.check_punct_inline("<")
                && matches!(expr, Expr::Identifier { .. } | Expr::FieldAccess { .. })
            {
                // Explicit call type arguments `listOf<Int>()` are dropped
                let checkpoint = self.tokens.checkpoint();
                let is_call_type_args =
                    self.parse_type_arguments().is_ok() && self.check_punct_inline("(");
                if !is_call_type_args {
                    self.tokens.restore(checkpoint);
                    break;
                }
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> SyntaxResult<Vec<Argument>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();

        while !self.check_punct(")") {
            let start = self.span_here();
            let name = if self.current().is_identifier() && self.peek().is_operator("=") {
                let (name, _) = self.expect_identifier("argument name")?;
                self.tokens.advance();
                Some(name)
            } else {
                None
            };

            if self.check_punct("*") {
                return Err(SyntaxError::grammar_violation(
                    "spread arguments are not supported",
                    start,
                ));
            }

            let value = self.parse_expression()?;
            args.push(Argument {
                name,
                value,
                span: self.span_from(start),
            });

            if !self.eat_punct(",") {
                break;
            }
        }

        self.expect_punct(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> SyntaxResult<Expr> {
        let current = self.tokens.current().clone();
        let token = &current.token;
        let span = current.span();

        match token.kind {
            TokenKind::Literal(kind) => {
                self.tokens.advance();
                let value = match kind {
                    LiteralKind::Integer => LiteralValue::Integer(token.text.clone()),
                    LiteralKind::Float => LiteralValue::Float(token.text.clone()),
                    LiteralKind::Boolean => LiteralValue::Boolean(token.text == "true"),
                    LiteralKind::Null => LiteralValue::Null,
                    LiteralKind::Char => LiteralValue::Char(decode_char_literal(&token.text)),
                    LiteralKind::String => return self.parse_string_literal(&current),
                };
                Ok(Expr::literal(value, span))
            }
            TokenKind::Identifier => {
                if token.text == "when"
                    && (self.peek().is_delimiter("(") || self.peek().is_delimiter("{"))
                {
                    return self.nested(|p| p.parse_when()).map(Expr::When);
                }
                if token.text == "object" && (self.peek().is_punct(":") || self.peek().is_delimiter("{")) {
                    return Err(SyntaxError::grammar_violation(
                        "object expressions are not supported",
                        span,
                    ));
                }
                self.tokens.advance();
                Ok(Expr::identifier(identifier_text(&token.text), span))
            }
            TokenKind::Keyword(Keyword::If) => self.nested(|p| p.parse_if()).map(Expr::If),
            TokenKind::Keyword(Keyword::Super) => {
                self.tokens.advance();
                Ok(Expr::Super { span })
            }
            TokenKind::Keyword(keyword @ (Keyword::Return | Keyword::Throw | Keyword::Break | Keyword::Continue)) => {
                self.tokens.advance();
                let kind = match keyword {
                    Keyword::Return => JumpKind::Return,
                    Keyword::Throw => JumpKind::Throw,
                    Keyword::Break => JumpKind::Break,
                    _ => JumpKind::Continue,
                };
                let value = if matches!(kind, JumpKind::Return | JumpKind::Throw) && self.can_start_value() {
                    Some(Box::new(self.parse_expression()?))
                } else {
                    None
                };
                Ok(Expr::Jump {
                    kind,
                    value,
                    span: self.span_from(span),
                })
            }
            TokenKind::Keyword(Keyword::Try) => Err(SyntaxError::grammar_violation(
                "try expressions are not supported",
                span,
            )),
            TokenKind::Keyword(Keyword::Typeof) => Err(SyntaxError::grammar_violation(
                "'typeof' is reserved",
                span,
            )),
            TokenKind::Delimiter if token.text == "(" => {
                self.tokens.advance();
                let inner = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span: self.span_from(span),
                })
            }
            TokenKind::Delimiter if token.text == "{" => self.parse_lambda(),
            _ => Err(self.error_here("expression")),
        }
    }

    fn parse_if(&mut self) -> SyntaxResult<IfExpr> {
        let start = self.span_here();
        self.eat_kw(Keyword::If);
        let condition = self.parse_parenthesized()?;
        let then_branch = self.parse_control_body()?;

        // `else` may sit after a `;` on the same line
        let checkpoint = self.tokens.checkpoint();
        self.eat_punct(";");
        let else_branch = if self.eat_kw(Keyword::Else) {
            if self.check_kw(Keyword::If) {
                Some(ElseBranch::If(Box::new(self.nested(|p| p.parse_if())?)))
            } else {
                Some(ElseBranch::Block(self.parse_control_body()?))
            }
        } else {
            self.tokens.restore(checkpoint);
            None
        };

        Ok(IfExpr {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            span: self.span_from(start),
        })
    }

    fn parse_when(&mut self) -> SyntaxResult<WhenExpr> {
        let start = self.span_here();
        self.expect_soft("when")?;

        let subject = if self.check_punct("(") {
            self.tokens.advance();
            if self.check_kw(Keyword::Val) {
                let span = self.span_here();
                return Err(SyntaxError::grammar_violation(
                    "when subject declarations are not supported",
                    span,
                ));
            }
            let subject = self.parse_expression()?;
            self.expect_punct(")")?;
            Some(Box::new(subject))
        } else {
            None
        };

        let open = self.span_here();
        self.expect_punct("{")?;

        let mut branches = Vec::new();
        let mut else_branch = None;

        loop {
            while self.eat_punct(";") {}
            if self.eat_punct("}") {
                break;
            }
            if self.tokens.is_at_end() {
                return Err(self.unterminated_block(open));
            }

            let branch_start = self.span_here();
            if self.eat_kw(Keyword::Else) {
                self.expect_punct("->")?;
                let body = self.parse_control_body()?;
                if else_branch.is_some() {
                    return Err(SyntaxError::grammar_violation(
                        "duplicate else branch in when",
                        branch_start,
                    ));
                }
                else_branch = Some(body);
                continue;
            }

            let mut conditions = Vec::new();
            loop {
                conditions.push(self.parse_when_condition()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("->")?;
            let body = self.parse_control_body()?;
            branches.push(WhenBranch {
                conditions,
                body,
                span: self.span_from(branch_start),
            });
        }

        Ok(WhenExpr {
            subject,
            branches,
            else_branch,
            span: self.span_from(start),
        })
    }

    fn parse_when_condition(&mut self) -> SyntaxResult<WhenCondition> {
        let negated = self.check_punct("!")
            && (self.peek().is_keyword(Keyword::In) || self.peek().is_identifier_with_name("is"));
        if negated {
            self.tokens.advance();
        }

        if self.check_soft("is") {
            self.tokens.advance();
            let type_ref = self.parse_type()?;
            return Ok(WhenCondition::Is { type_ref, negated });
        }
        if self.eat_kw(Keyword::In) {
            let range = self.parse_expression()?;
            return Ok(WhenCondition::In { range, negated });
        }
        Ok(WhenCondition::Value(self.parse_expression()?))
    }

    fn parse_lambda(&mut self) -> SyntaxResult<Expr> {
        self.nested(|p| {
            let open = p.span_here();
            p.expect_punct("{")?;

            let checkpoint = p.tokens.checkpoint();
            let params = match p.try_parse_lambda_params() {
                Some(params) => params,
                None => {
                    p.tokens.restore(checkpoint);
                    Vec::new()
                }
            };

            let statements = p.parse_statements_until_brace(open)?;
            let span = p.span_from(open);
            Ok(Expr::Lambda(LambdaExpr {
                params,
                body: Block::new(statements, span),
                span,
            }))
        })
    }

    /// `a, b: Int ->`; `None` when the lambda has no parameter list
    fn try_parse_lambda_params(&mut self) -> Option<Vec<Parameter>> {
        let mut params = Vec::new();
        loop {
            if !self.current().is_identifier() {
                return None;
            }
            let (name, span) = self.expect_identifier("parameter").ok()?;
            let type_ref = if self.eat_punct(":") {
                Some(self.parse_type().ok()?)
            } else {
                None
            };
            params.push(Parameter {
                name,
                type_ref,
                default: None,
                property: None,
                vararg: false,
                span,
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        if self.eat_punct("->") {
            Some(params)
        } else {
            None
        }
    }

    // ========================================================================
    // STRING TEMPLATES
    // ========================================================================

    /// Split a string literal token into text and `$name` / `${expr}` parts
    fn parse_string_literal(&mut self, token: &StreamToken) -> SyntaxResult<Expr> {
        let span = token.span();
        let text = token.token.text.as_str();
        let raw = text.starts_with("\"\"\"") && text.len() >= 6;
        let quote_len = if raw { 3 } else { 1 };
        let content = text
            .get(quote_len..text.len().saturating_sub(quote_len))
            .unwrap_or_default();
        let content_start = span.start().advance_str(&text[..quote_len.min(text.len())]);

        let mut parts = Vec::new();
        let mut buffer = String::new();
        let mut index = 0;

        while let Some(ch) = content[index..].chars().next() {
            match ch {
                '\\' if !raw => {
                    let (decoded, consumed) = decode_escape(&content[index..]);
                    buffer.push(decoded);
                    index += consumed;
                }
                '$' if content[index + 1..].starts_with('{') => {
                    let expr_start = index + 2;
                    let Some(expr_end) = find_template_end(content, expr_start) else {
                        return Err(SyntaxError::internal_parser_error(
                            "unterminated template expression",
                            span,
                        ));
                    };
                    let origin = content_start.advance_str(&content[..expr_start]);
                    let expr = self.parse_template_expression(&content[expr_start..expr_end], origin)?;
                    if !buffer.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut buffer)));
                    }
                    parts.push(TemplatePart::Expr(expr));
                    index = expr_end + 1;
                }
                '$' if content[index + 1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphabetic() || c == '_') =>
                {
                    let name: String = content[index + 1..]
                        .chars()
                        .take_while(|c| c.is_alphanumeric() || *c == '_')
                        .collect();
                    let start = content_start.advance_str(&content[..index]);
                    let end = start.advance_str(&content[index..index + 1 + name.len()]);
                    if !buffer.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut buffer)));
                    }
                    index += 1 + name.len();
                    parts.push(TemplatePart::Expr(Expr::identifier(name, Span::new(start, end))));
                }
                _ => {
                    buffer.push(ch);
                    index += ch.len_utf8();
                }
            }
        }

        if parts.is_empty() {
            return Ok(Expr::string(buffer, span));
        }
        if !buffer.is_empty() {
            parts.push(TemplatePart::Text(buffer));
        }
        Ok(Expr::StringTemplate { parts, span })
    }

    fn parse_template_expression(&mut self, fragment: &str, origin: Position) -> SyntaxResult<Expr> {
        let mut sub_parser = KotlinParser::with_depth(Lexer::with_origin(fragment, origin), self.depth + 1);
        let expr = sub_parser.parse_expression()?;
        if sub_parser.current().is_error() || !sub_parser.tokens.is_at_end() {
            return Err(sub_parser.error_here("'}' closing the template expression"));
        }
        Ok(expr)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Identifier text without Kotlin backticks
fn identifier_text(text: &str) -> String {
    text.trim_matches('`').to_string()
}

fn accepts_trailing_lambda(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Identifier { .. } | Expr::FieldAccess { .. } | Expr::SafeCall { .. }
    )
}

/// Decode the escape at the start of `text`; returns the char and bytes used
fn decode_escape(text: &str) -> (char, usize) {
    let mut chars = text.chars();
    chars.next();
    match chars.next() {
        Some('n') => ('\n', 2),
        Some('t') => ('\t', 2),
        Some('r') => ('\r', 2),
        Some('b') => ('\u{8}', 2),
        Some('u') => {
            let hex = text.get(2..6).unwrap_or_default();
            let decoded = u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or('\u{FFFD}');
            (decoded, 2 + hex.len())
        }
        Some(other) => (other, 1 + other.len_utf8()),
        None => ('\\', 1),
    }
}

fn decode_char_literal(text: &str) -> char {
    let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
    if inner.starts_with('\\') {
        decode_escape(inner).0
    } else {
        inner.chars().next().unwrap_or('\0')
    }
}

/// Index of the `}` closing a template expression that starts at `start`
fn find_template_end(content: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut index = start;
    while let Some(ch) = content[index..].chars().next() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            '"' => {
                index = skip_nested_string(content, index)?;
                continue;
            }
            '\'' => {
                index = skip_nested_char(content, index)?;
                continue;
            }
            _ => {}
        }
        index += ch.len_utf8();
    }
    None
}

/// Byte index just past the string literal starting at `start`
fn skip_nested_string(content: &str, start: usize) -> Option<usize> {
    let mut index = start + 1;
    while let Some(ch) = content[index..].chars().next() {
        match ch {
            '\\' => {
                index += 1;
                index += content[index..].chars().next()?.len_utf8();
                continue;
            }
            '"' => return Some(index + 1),
            '$' if content[index + 1..].starts_with('{') => {
                index = find_template_end(content, index + 2)? + 1;
                continue;
            }
            _ => {}
        }
        index += ch.len_utf8();
    }
    None
}

fn skip_nested_char(content: &str, start: usize) -> Option<usize> {
    let rest = &content[start + 1..];
    let close = if rest.starts_with('\\') {
        rest.get(2..)?.find('\'')? + 2
    } else {
        rest.find('\'')?
    };
    Some(start + 1 + close + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> (SyntaxResult<Program>, Vec<SyntaxError>) {
        let mut parser = KotlinParser::new(tokenize(source));
        let result = parser.parse_program();
        (result, parser.into_errors())
    }

    fn parse_ok(source: &str) -> Program {
        let (result, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        result.unwrap()
    }

    fn parse_expr(source: &str) -> Expr {
        let mut parser = KotlinParser::new(tokenize(source));
        parser.parse_expression().unwrap()
    }

    fn function_body(program: &Program, index: usize) -> &Block {
        match &program.declarations[index] {
            Declaration::Function(FunctionDecl {
                body: FunctionBody::Block(block),
                ..
            }) => block,
            other => panic!("expected function with block body, got {:?}", other),
        }
    }

    #[test]
    fn test_minimal_program() {
        let program = parse_ok("fun main() { val x = 1 }");
        assert_eq!(program.declarations.len(), 1);
        let Declaration::Function(function) = &program.declarations[0] else {
            panic!("expected function");
        };
        assert_eq!(function.name, "main");
        let body = function_body(&program, 0);
        assert_eq!(body.statements.len(), 1);
        assert_matches!(
            &body.statements[0],
            Stmt::Variable(VariableDecl {
                name,
                mutability: Mutability::Immutable,
                initializer: Some(Expr::Literal(Literal { value: LiteralValue::Integer(digits), .. })),
                ..
            }) if name == "x" && digits == "1"
        );
    }

    #[test]
    fn test_error_containment() {
        let (result, errors) = parse("fun main() { val x = ; val y = 2 }");
        assert_eq!(errors.len(), 1);
        assert_matches!(errors[0], SyntaxError::UnexpectedToken { .. });

        let program = result.unwrap();
        let body = function_body(&program, 0);
        assert_eq!(body.statements.len(), 1);
        assert_matches!(
            &body.statements[0],
            Stmt::Variable(VariableDecl {
                name,
                initializer: Some(Expr::Literal(Literal { value: LiteralValue::Integer(digits), .. })),
                ..
            }) if name == "y" && digits == "2"
        );
    }

    #[test]
    fn test_newline_recovery_reports_one_error_per_statement() {
        let source = "fun main() {\n    val a = )\n    val b = 1\n    val c = *\n    val d = 2\n}";
        let (result, errors) = parse(source);
        assert_eq!(errors.len(), 2);
        let program = result.unwrap();
        let names: Vec<_> = function_body(&program, 0)
            .statements
            .iter()
            .filter_map(|s| match s {
                Stmt::Variable(v) => Some(v.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["b", "d"]);
    }

    #[test]
    fn test_unbalanced_braces_are_fatal() {
        let (result, _) = parse("fun main() { val x = 1");
        assert_matches!(result, Err(SyntaxError::UnmatchedBlockDelimiter { .. }));

        let (result, _) = parse("fun main() { }\n}");
        assert_matches!(result, Err(SyntaxError::UnmatchedBlockDelimiter { ref delimiter, .. }) if delimiter == "}");
    }

    #[test]
    fn test_precedence_and_associativity() {
        let expr = parse_expr("a - b - c * d");
        let Expr::Binary { op: BinaryOp::Sub, left, right, .. } = expr else {
            panic!("expected subtraction");
        };
        assert_matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. });
        assert_matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. });

        let expr = parse_expr("a ?: b || c && d == e");
        let Expr::Elvis { default, .. } = expr else {
            panic!("expected elvis at the root");
        };
        let Expr::Binary { op: BinaryOp::Or, right, .. } = *default else {
            panic!("expected ||");
        };
        let Expr::Binary { op: BinaryOp::And, right, .. } = *right else {
            panic!("expected &&");
        };
        assert_matches!(*right, Expr::Binary { op: BinaryOp::Eq, .. });
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b = 3");
        let Expr::Assign { target, value, .. } = expr else {
            panic!("expected assignment");
        };
        assert_eq!(target.as_identifier(), Some("a"));
        assert_matches!(*value, Expr::Assign { .. });
    }

    #[test]
    fn test_unary_and_postfix() {
        assert_matches!(parse_expr("-x"), Expr::Unary { op: UnaryOp::Negate, .. });
        assert_matches!(parse_expr("!done"), Expr::Unary { op: UnaryOp::Not, .. });
        assert_matches!(parse_expr("x!!"), Expr::Unary { op: UnaryOp::NotNullAssert, .. });
        assert_matches!(parse_expr("a[1]"), Expr::Index { .. });
        assert_matches!(parse_expr("a?.b"), Expr::SafeCall { args: None, .. });
        assert_matches!(parse_expr("a?.b(1)"), Expr::SafeCall { args: Some(_), .. });
        assert_matches!(parse_expr("a.b.c(1, 2)"), Expr::Call { .. });
        assert_matches!(parse_expr("listOf<Int>(1)"), Expr::Call { .. });
    }

    #[test]
    fn test_safe_call_chain_nests_left() {
        let expr = parse_expr("a?.b?.c");
        let Expr::SafeCall { target, name, .. } = expr else {
            panic!("expected safe call");
        };
        assert_eq!(name, "c");
        assert_matches!(*target, Expr::SafeCall { ref name, .. } if name == "b");
    }

    #[test]
    fn test_string_template_parts() {
        let expr = parse_expr(r#""Hello, $name! ${a + 1} \$x""#);
        let Expr::StringTemplate { parts, .. } = expr else {
            panic!("expected template");
        };
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], TemplatePart::Text("Hello, ".to_string()));
        assert_matches!(&parts[1], TemplatePart::Expr(Expr::Identifier { name, .. }) if name == "name");
        assert_eq!(parts[2], TemplatePart::Text("! ".to_string()));
        assert_matches!(&parts[3], TemplatePart::Expr(Expr::Binary { op: BinaryOp::Add, .. }));
        assert_eq!(parts[4], TemplatePart::Text(" $x".to_string()));
    }

    #[test]
    fn test_template_expression_positions_are_file_relative() {
        let expr = parse_expr("\"ab${cd}\"");
        let Expr::StringTemplate { parts, .. } = expr else {
            panic!("expected template");
        };
        let TemplatePart::Expr(inner) = &parts[1] else {
            panic!("expected expression part");
        };
        assert_eq!(inner.span().start().offset, 5);
    }

    #[test]
    fn test_plain_string_decodes_escapes() {
        let expr = parse_expr(r#""a\tbA""#);
        assert_eq!(expr.as_literal(), Some(&LiteralValue::String("a\tbA".to_string())));
    }

    #[test]
    fn test_when_with_subject() {
        let expr = parse_expr("when (x) {\n 1, 2 -> \"low\"\n is String -> \"text\"\n in 3..9 -> \"mid\"\n else -> \"high\"\n}");
        let Expr::When(when) = expr else {
            panic!("expected when");
        };
        assert!(when.subject.is_some());
        assert_eq!(when.branches.len(), 3);
        assert_eq!(when.branches[0].conditions.len(), 2);
        assert_matches!(when.branches[1].conditions[0], WhenCondition::Is { negated: false, .. });
        assert_matches!(when.branches[2].conditions[0], WhenCondition::In { negated: false, .. });
        assert!(when.else_branch.is_some());
    }

    #[test]
    fn test_if_else_chain() {
        let expr = parse_expr("if (a) 1 else if (b) 2 else 3");
        let Expr::If(if_expr) = expr else {
            panic!("expected if");
        };
        let Some(ElseBranch::If(nested)) = if_expr.else_branch else {
            panic!("expected else-if");
        };
        assert_matches!(nested.else_branch, Some(ElseBranch::Block(_)));
    }

    #[test]
    fn test_lambda_parameters() {
        let expr = parse_expr("{ a, b -> a + b }");
        assert_matches!(expr, Expr::Lambda(LambdaExpr { ref params, .. }) if params.len() == 2);

        let expr = parse_expr("items.forEach { println(it) }");
        let Expr::Call { args, .. } = expr else {
            panic!("expected trailing lambda call");
        };
        assert_matches!(&args[0].value, Expr::Lambda(LambdaExpr { params, .. }) if params.is_empty());
    }

    #[test]
    fn test_infix_and_range() {
        let expr = parse_expr("0 until n");
        assert_matches!(expr, Expr::Call { .. });
        assert_matches!(parse_expr("1..10"), Expr::Binary { op: BinaryOp::RangeTo, .. });
        assert_matches!(parse_expr("x !in xs"), Expr::Binary { op: BinaryOp::NotIn, .. });
        assert_matches!(parse_expr("x is String"), Expr::TypeCheck { negated: false, .. });
        assert_matches!(parse_expr("x as? String"), Expr::Cast { safe: true, .. });
    }

    #[test]
    fn test_declarations() {
        let program = parse_ok(
            "package demo.app\n\
             import java.util.List\n\
             import kotlin.math.*\n\
             data class Point(val x: Int, var y: Int = 0) : Shape(), Named {\n\
                 init { println(x) }\n\
                 override fun area(): Double = 0.0\n\
                 companion object { fun origin() = Point(0, 0) }\n\
             }\n\
             interface Named { fun name(): String }\n\
             fun String.shout(): String = uppercase()\n\
             private val limit: Long = 10L\n",
        );

        assert_eq!(program.package.as_ref().map(|p| p.path.as_str()), Some("demo.app"));
        assert_eq!(program.imports.len(), 2);
        assert!(program.imports[1].wildcard);
        assert_eq!(program.declarations.len(), 4);

        let Declaration::Class(point) = &program.declarations[0] else {
            panic!("expected class");
        };
        assert!(point.modifiers.is_data);
        assert_eq!(point.constructor_params.len(), 2);
        assert_eq!(point.constructor_params[1].property, Some(Mutability::Mutable));
        assert!(point.constructor_params[1].default.is_some());
        assert_eq!(point.supertypes.len(), 2);
        assert!(point.supertypes[0].constructor_args.is_some());
        assert!(point.supertypes[1].constructor_args.is_none());
        assert_eq!(point.init_blocks.len(), 1);
        assert_eq!(point.members.len(), 1);
        assert_eq!(point.companion.len(), 1);

        let Declaration::Function(shout) = &program.declarations[2] else {
            panic!("expected extension function");
        };
        assert_eq!(shout.name, "shout");
        assert_eq!(shout.receiver.as_ref().map(|r| r.name.as_str()), Some("String"));
        assert_matches!(shout.body, FunctionBody::Expression(_));

        let Declaration::Variable(limit) = &program.declarations[3] else {
            panic!("expected property");
        };
        assert_eq!(limit.modifiers.visibility, Some(Visibility::Private));
    }

    #[test]
    fn test_enum_class() {
        let program = parse_ok("enum class Color(val rgb: Int) { RED(1), GREEN(2); fun hex() = rgb }");
        let Declaration::Class(color) = &program.declarations[0] else {
            panic!("expected enum");
        };
        assert_eq!(color.kind, ClassKind::Enum);
        assert_eq!(color.enum_entries.len(), 2);
        assert_eq!(color.members.len(), 1);
    }

    #[test]
    fn test_statements() {
        let program = parse_ok(
            "fun f(xs: List<Int>) {\n\
                 for (x in xs) { if (x > 1) break else continue }\n\
                 var i = 0\n\
                 while (i < 3) i += 1\n\
                 do { i-- } while (i > 0)\n\
                 try { risky() } catch (e: Exception) { throw e } finally { done() }\n\
                 return\n\
             }",
        );
        let statements = &function_body(&program, 0).statements;
        assert_matches!(statements[0], Stmt::For { .. });
        assert_matches!(statements[1], Stmt::Variable(_));
        assert_matches!(statements[2], Stmt::While { .. });
        assert_matches!(statements[3], Stmt::DoWhile { .. });
        assert_matches!(&statements[4], Stmt::Try { catches, finally: Some(_), .. } if catches.len() == 1);
        assert_matches!(statements[5], Stmt::Return { value: None, .. });
    }

    #[test]
    fn test_newline_ends_expression_before_unary_minus() {
        let program = parse_ok("fun f() {\n val a = 1\n -2\n}");
        assert_eq!(function_body(&program, 0).statements.len(), 2);
    }

    #[test]
    fn test_depth_limit_is_fatal() {
        // Debug frames are large; give the parser room to reach the limit
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let depth = MAX_PARSE_DEPTH + 8;
                let source = format!("val x = {}1{}", "(".repeat(depth), ")".repeat(depth));
                let (result, _) = parse(&source);
                assert_matches!(result, Err(SyntaxError::MaxRecursionDepth { .. }));
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_lexical_error_token_is_fatal() {
        let (result, _) = parse("fun main() { val x = # }");
        assert_matches!(result, Err(SyntaxError::LexicalErrorToken { .. }));
    }
}
