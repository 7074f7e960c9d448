//! AST node definitions
//!
//! One tree type serves both sides of the transpiler: the parser builds it
//! from Kotlin and the transformer rewrites it in place into nodes the
//! emitter can print as Java. Nodes own their children (`Box`/`Vec`), child
//! lists keep source order, and every node carries the span it came from.
//! Synthesized nodes reuse the span of the construct they replace.

use crate::tokens::LiteralKind;
use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Identifier = String;

// === TYPES ===

/// A type reference such as `Int`, `String?` or `List<Int>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Dotted name as written (`kotlin.String`, `Map.Entry`)
    pub name: String,
    pub arguments: Vec<TypeRef>,
    pub nullable: bool,
    /// Java array suffix count, only produced by the transformer
    pub array_dims: usize,
    /// Set on types the transformer produced; their name is already Java
    #[serde(default)]
    pub resolved: bool,
    pub span: Span,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            nullable: false,
            array_dims: 0,
            resolved: false,
            span,
        }
    }

    /// A type already spelled the Java way
    pub fn java(name: impl Into<String>, span: Span) -> Self {
        Self {
            resolved: true,
            ..Self::simple(name, span)
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<TypeRef>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn array_of(mut self) -> Self {
        self.array_dims += 1;
        self
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        for _ in 0..self.array_dims {
            write!(f, "[]")?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

// === MODIFIERS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
    Protected,
    /// Kotlin `internal`; Java package-private
    Internal,
}

impl Visibility {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "protected" => Some(Self::Protected),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    /// `None` until the transformer applies the Kotlin default
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_open: bool,
    pub is_override: bool,
    pub is_data: bool,
    /// Interface method with a body
    pub is_default: bool,
    /// `enum class`; consumed by the parser into [`ClassKind::Enum`]
    pub is_enum: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutability {
    /// `val`
    Immutable,
    /// `var`
    Mutable,
}

// === PROGRAM STRUCTURE ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDecl {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: String,
    pub wildcard: bool,
    pub alias: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    Class(ClassDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
}

impl Declaration {
    pub fn span(&self) -> Span {
        match self {
            Self::Class(c) => c.span,
            Self::Function(f) => f.span,
            Self::Variable(v) => v.span,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Class(c) => &c.name,
            Self::Function(f) => &f.name,
            Self::Variable(v) => &v.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
    /// Kotlin `object` singleton
    Object,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub name: Identifier,
    pub type_params: Vec<Identifier>,
    pub modifiers: Modifiers,
    /// Primary constructor parameters; `val`/`var` ones declare properties
    pub constructor_params: Vec<Parameter>,
    pub supertypes: Vec<SuperType>,
    pub members: Vec<Declaration>,
    /// `init { }` blocks in source order
    pub init_blocks: Vec<Block>,
    /// Members of the `companion object`, if any
    pub companion: Vec<Declaration>,
    pub enum_entries: Vec<EnumEntry>,
    pub span: Span,
}

/// `RED` or `RED(0xff0000)` in an enum class body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub name: Identifier,
    pub args: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperType {
    pub type_ref: TypeRef,
    /// Constructor call arguments, present only for a superclass
    pub constructor_args: Option<Vec<Argument>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub kind: FunctionKind,
    pub name: Identifier,
    pub type_params: Vec<Identifier>,
    pub modifiers: Modifiers,
    /// Receiver type of an extension function
    pub receiver: Option<TypeRef>,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeRef>,
    pub body: FunctionBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Block(Block),
    /// `fun f() = expr`
    Expression(Expr),
    /// Abstract or interface method
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Identifier,
    pub type_ref: Option<TypeRef>,
    pub default: Option<Expr>,
    /// `val`/`var` on a primary constructor parameter
    pub property: Option<Mutability>,
    pub vararg: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: Identifier,
    pub mutability: Mutability,
    pub modifiers: Modifiers,
    pub type_ref: Option<TypeRef>,
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Stmt>, span: Span) -> Self {
        Self { statements, span }
    }

    /// The value of an expression-bodied block: its single expression statement
    pub fn as_single_expression(&self) -> Option<&Expr> {
        match self.statements.as_slice() {
            [Stmt::Expression(expr)] => Some(expr),
            _ => None,
        }
    }
}

// === STATEMENTS ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
        }
    }

    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "=" => Some(Self::Assign),
            "+=" => Some(Self::AddAssign),
            "-=" => Some(Self::SubAssign),
            "*=" => Some(Self::MulAssign),
            "/=" => Some(Self::DivAssign),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JumpKind {
    Return,
    Throw,
    Break,
    Continue,
}

impl JumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Return => "return",
            Self::Throw => "throw",
            Self::Break => "break",
            Self::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub name: Identifier,
    pub type_ref: TypeRef,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub labels: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Variable(VariableDecl),
    Expression(Expr),
    Return {
        value: Option<Expr>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Block,
        span: Span,
    },
    DoWhile {
        body: Block,
        condition: Expr,
        span: Span,
    },
    /// `for (x in iterable)`; Java enhanced for
    For {
        variable: Identifier,
        type_ref: Option<TypeRef>,
        iterable: Expr,
        body: Block,
        span: Span,
    },
    Throw {
        value: Expr,
        span: Span,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
        span: Span,
    },

    // === JAVA-ONLY STATEMENTS (produced by the transformer) ===
    /// Java `switch` over constant labels
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Block>,
        span: Span,
    },
    /// `for (int x = start; x <= end; x++)` from a Kotlin range loop
    CountedFor {
        variable: Identifier,
        type_ref: TypeRef,
        start: Expr,
        end: Expr,
        inclusive: bool,
        descending: bool,
        body: Block,
        span: Span,
    },
    /// Nested block emitted as `{ ... }`
    Block(Block),
    /// Construct with no Java equivalent, emitted as a TODO comment
    Placeholder {
        description: String,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Self::Variable(v) => v.span,
            Self::Expression(e) => e.span(),
            Self::Block(b) => b.span,
            Self::Return { span, .. }
            | Self::While { span, .. }
            | Self::DoWhile { span, .. }
            | Self::For { span, .. }
            | Self::Throw { span, .. }
            | Self::Break { span }
            | Self::Continue { span }
            | Self::Try { span, .. }
            | Self::Switch { span, .. }
            | Self::CountedFor { span, .. }
            | Self::Placeholder { span, .. } => *span,
        }
    }
}

// === EXPRESSIONS ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    /// Source digits, keeping any `L` suffix or radix prefix
    Integer(String),
    /// Source digits, keeping any `f` suffix
    Float(String),
    Boolean(bool),
    /// Decoded character
    Char(char),
    /// Decoded string content
    String(String),
    Null,
}

impl LiteralValue {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Self::Integer(_) => LiteralKind::Integer,
            Self::Float(_) => LiteralKind::Float,
            Self::Boolean(_) => LiteralKind::Boolean,
            Self::Char(_) => LiteralKind::Char,
            Self::String(_) => LiteralKind::String,
            Self::Null => LiteralKind::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    /// `===`
    RefEq,
    /// `!==`
    RefNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    /// `a..b`
    RangeTo,
    /// `x in c`
    In,
    /// `x !in c`
    NotIn,
}

impl BinaryOp {
    /// Java spelling of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq | Self::RefEq => "==",
            Self::NotEq | Self::RefNotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::RangeTo => "..",
            Self::In => "in",
            Self::NotIn => "!in",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::NotEq
                | Self::RefEq
                | Self::RefNotEq
                | Self::Lt
                | Self::Gt
                | Self::LtEq
                | Self::GtEq
                | Self::In
                | Self::NotIn
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Rem)
    }

    /// Operators with no Java counterpart that the transformer must rewrite
    pub fn is_kotlin_only(&self) -> bool {
        matches!(self, Self::RangeTo | Self::In | Self::NotIn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    /// `x!!`
    NotNullAssert,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Negate => "-",
            Self::Plus => "+",
            Self::PreIncrement | Self::PostIncrement => "++",
            Self::PreDecrement | Self::PostDecrement => "--",
            Self::NotNullAssert => "!!",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(
            self,
            Self::PostIncrement | Self::PostDecrement | Self::NotNullAssert
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Named argument label (`f(x = 1)`)
    pub name: Option<Identifier>,
    pub value: Expr,
    pub span: Span,
}

impl Argument {
    pub fn positional(value: Expr) -> Self {
        let span = value.span();
        Self {
            name: None,
            value,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    /// Decoded literal text
    Text(String),
    /// `$name` or `${expr}`
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WhenCondition {
    /// Equality against the subject, or a boolean condition without subject
    Value(Expr),
    /// `is T` / `!is T`
    Is { type_ref: TypeRef, negated: bool },
    /// `in range` / `!in range`
    In { range: Expr, negated: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenBranch {
    pub conditions: Vec<WhenCondition>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenExpr {
    pub subject: Option<Box<Expr>>,
    pub branches: Vec<WhenBranch>,
    pub else_branch: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfExpr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub then_branch: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<Parameter>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Identifier {
        name: Identifier,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        span: Span,
    },
    FieldAccess {
        target: Box<Expr>,
        name: Identifier,
        span: Span,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// `target?.name` or `target?.name(args)`
    SafeCall {
        target: Box<Expr>,
        name: Identifier,
        args: Option<Vec<Argument>>,
        span: Span,
    },
    /// `value ?: default`
    Elvis {
        value: Box<Expr>,
        default: Box<Expr>,
        span: Span,
    },
    When(WhenExpr),
    If(IfExpr),
    Lambda(LambdaExpr),
    StringTemplate {
        parts: Vec<TemplatePart>,
        span: Span,
    },
    /// `x is T` / `x !is T`
    TypeCheck {
        value: Box<Expr>,
        type_ref: TypeRef,
        negated: bool,
        span: Span,
    },
    /// `x as T`, or `x as? T` when `safe`
    Cast {
        value: Box<Expr>,
        type_ref: TypeRef,
        safe: bool,
        span: Span,
    },
    Super {
        span: Span,
    },
    /// `target = value` and compound assignments; right-associative
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
        span: Span,
    },
    /// `return`/`throw`/`break`/`continue` used as a value (`x ?: return`)
    Jump {
        kind: JumpKind,
        value: Option<Box<Expr>>,
        span: Span,
    },
    /// Parenthesized expression, kept so printing preserves grouping
    Paren {
        inner: Box<Expr>,
        span: Span,
    },

    // === JAVA-ONLY EXPRESSIONS (produced by the transformer) ===
    /// `condition ? then_value : else_value`
    Conditional {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
        span: Span,
    },
    /// `new T(args)`
    New {
        type_ref: TypeRef,
        args: Vec<Argument>,
        span: Span,
    },
    /// Construct with no Java equivalent, emitted as a TODO comment and `null`
    Placeholder {
        description: String,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(lit) => lit.span,
            Self::When(when) => when.span,
            Self::If(if_expr) => if_expr.span,
            Self::Lambda(lambda) => lambda.span,
            Self::Identifier { span, .. }
            | Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::Call { span, .. }
            | Self::FieldAccess { span, .. }
            | Self::Index { span, .. }
            | Self::SafeCall { span, .. }
            | Self::Elvis { span, .. }
            | Self::StringTemplate { span, .. }
            | Self::TypeCheck { span, .. }
            | Self::Cast { span, .. }
            | Self::Super { span }
            | Self::Assign { span, .. }
            | Self::Jump { span, .. }
            | Self::Paren { span, .. }
            | Self::Conditional { span, .. }
            | Self::New { span, .. }
            | Self::Placeholder { span, .. } => *span,
        }
    }

    pub fn identifier(name: impl Into<String>, span: Span) -> Self {
        Self::Identifier {
            name: name.into(),
            span,
        }
    }

    pub fn literal(value: LiteralValue, span: Span) -> Self {
        Self::Literal(Literal { value, span })
    }

    pub fn null(span: Span) -> Self {
        Self::literal(LiteralValue::Null, span)
    }

    pub fn string(value: impl Into<String>, span: Span) -> Self {
        Self::literal(LiteralValue::String(value.into()), span)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr, span: Span) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span,
        }
    }

    pub fn field(target: Expr, name: impl Into<String>, span: Span) -> Self {
        Self::FieldAccess {
            target: Box::new(target),
            name: name.into(),
            span,
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>, span: Span) -> Self {
        Self::Call {
            callee: Box::new(callee),
            args: args.into_iter().map(Argument::positional).collect(),
            span,
        }
    }

    /// Call `Path.to.method(args)` given as a dotted string
    pub fn static_call(path: &str, args: Vec<Expr>, span: Span) -> Self {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let callee = segments.fold(Self::identifier(first, span), |target, segment| {
            Self::field(target, segment, span)
        });
        Self::call(callee, args, span)
    }

    pub fn conditional(condition: Expr, then_value: Expr, else_value: Expr, span: Span) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
            span,
        }
    }

    pub fn paren(inner: Expr) -> Self {
        let span = inner.span();
        match inner {
            Self::Paren { .. } | Self::Identifier { .. } | Self::Literal(_) => inner,
            _ => Self::Paren {
                inner: Box::new(inner),
                span,
            },
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Self::Literal(lit) => Some(&lit.value),
            _ => None,
        }
    }

    /// Literal constant usable as a Java switch label
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Literal(lit) => !matches!(lit.value, LiteralValue::Null | LiteralValue::Float(_)),
            Self::Unary {
                op: UnaryOp::Negate,
                operand,
                ..
            } => matches!(operand.as_literal(), Some(LiteralValue::Integer(_))),
            Self::Paren { inner, .. } => inner.is_constant(),
            _ => false,
        }
    }

    /// Evaluating the expression twice has no extra effect
    pub fn is_pure_reference(&self) -> bool {
        match self {
            Self::Identifier { .. } | Self::Literal(_) | Self::Super { .. } => true,
            Self::FieldAccess { target, .. } => target.is_pure_reference(),
            Self::Paren { inner, .. } => inner.is_pure_reference(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        let span = Span::dummy();
        let ty = TypeRef::simple("Map", span).with_arguments(vec![
            TypeRef::simple("String", span),
            TypeRef {
                nullable: true,
                ..TypeRef::simple("Int", span)
            },
        ]);
        assert_eq!(ty.to_string(), "Map<String, Int?>");
        assert_eq!(TypeRef::simple("String", span).array_of().to_string(), "String[]");
    }

    #[test]
    fn test_static_call_builds_field_chain() {
        let span = Span::dummy();
        let call = Expr::static_call("java.util.Objects.hash", vec![], span);
        let Expr::Call { callee, .. } = call else {
            panic!("expected call");
        };
        let Expr::FieldAccess { target, name, .. } = *callee else {
            panic!("expected field access");
        };
        assert_eq!(name, "hash");
        assert!(matches!(*target, Expr::FieldAccess { ref name, .. } if name == "Objects"));
    }

    #[test]
    fn test_constant_detection() {
        let span = Span::dummy();
        assert!(Expr::literal(LiteralValue::Integer("1".into()), span).is_constant());
        assert!(Expr::string("a", span).is_constant());
        assert!(!Expr::null(span).is_constant());
        assert!(!Expr::identifier("x", span).is_constant());
        let negative = Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(Expr::literal(LiteralValue::Integer("2".into()), span)),
            span,
        };
        assert!(negative.is_constant());
    }

    #[test]
    fn test_paren_skips_atoms() {
        let span = Span::dummy();
        assert_eq!(Expr::paren(Expr::identifier("a", span)), Expr::identifier("a", span));
        let sum = Expr::binary(
            BinaryOp::Add,
            Expr::identifier("a", span),
            Expr::identifier("b", span),
            span,
        );
        assert!(matches!(Expr::paren(sum), Expr::Paren { .. }));
    }
}
