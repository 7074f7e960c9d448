//! Expression rendering
//!
//! Every expression renders to a string together with its Java binding
//! strength; an operand weaker than its position requires is parenthesized.

use super::error::EmitError;
use super::JavaEmitter;
use crate::grammar::ast::nodes::*;

pub(super) const LAMBDA: u8 = 0;
pub(super) const ASSIGNMENT: u8 = 1;
pub(super) const CONDITIONAL: u8 = 2;
const LOGICAL_OR: u8 = 3;
const LOGICAL_AND: u8 = 4;
const EQUALITY: u8 = 8;
pub(super) const RELATIONAL: u8 = 9;
const ADDITIVE: u8 = 11;
const MULTIPLICATIVE: u8 = 12;
const UNARY: u8 = 13;
const POSTFIX: u8 = 14;
const PRIMARY: u8 = 15;

fn binary_precedence(op: BinaryOp) -> Option<u8> {
    match op {
        BinaryOp::Or => Some(LOGICAL_OR),
        BinaryOp::And => Some(LOGICAL_AND),
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::RefEq | BinaryOp::RefNotEq => Some(EQUALITY),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => Some(RELATIONAL),
        BinaryOp::Add | BinaryOp::Sub => Some(ADDITIVE),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => Some(MULTIPLICATIVE),
        BinaryOp::RangeTo | BinaryOp::In | BinaryOp::NotIn => None,
    }
}

impl JavaEmitter {
    pub(super) fn expression(&mut self, expr: &Expr) -> Result<String, EmitError> {
        self.expression_at(expr, LAMBDA)
    }

    /// Renders `expr`, parenthesized when it binds looser than `min`
    pub(super) fn expression_at(&mut self, expr: &Expr, min: u8) -> Result<String, EmitError> {
        let (text, precedence) = self.render(expr)?;
        if precedence < min {
            Ok(format!("({})", text))
        } else {
            Ok(text)
        }
    }

    /// Condition of `if`/`while`, without doubled parentheses
    pub(super) fn condition(&mut self, expr: &Expr) -> Result<String, EmitError> {
        match expr {
            Expr::Paren { inner, .. } => self.condition(inner),
            _ => self.expression(expr),
        }
    }

    fn render(&mut self, expr: &Expr) -> Result<(String, u8), EmitError> {
        match expr {
            Expr::Literal(literal) => Ok((render_literal(&literal.value), PRIMARY)),
            Expr::Identifier { name, .. } => Ok((name.clone(), PRIMARY)),
            Expr::Super { .. } => Ok(("super".to_string(), PRIMARY)),

            Expr::Paren { inner, .. } => {
                let inner = self.expression(inner)?;
                Ok((format!("({})", inner), PRIMARY))
            }

            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let precedence = binary_precedence(*op)
                    .ok_or_else(|| EmitError::unrenderable(format!("operator '{}'", op.as_str()), *span))?;
                let left = self.expression_at(left, precedence)?;
                let right = self.expression_at(right, precedence + 1)?;
                Ok((format!("{} {} {}", left, op.as_str(), right), precedence))
            }

            Expr::Unary { op, operand, span } => match op {
                UnaryOp::NotNullAssert => Err(EmitError::unrenderable("not-null assertion '!!'", *span)),
                UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                    let operand = self.expression_at(operand, POSTFIX)?;
                    Ok((format!("{}{}", operand, op.as_str()), POSTFIX))
                }
                _ => {
                    let mut operand = self.expression_at(operand, UNARY)?;
                    // `- -x` and `+ +x` would lex as `--`/`++`
                    if operand.starts_with(['-', '+']) {
                        operand = format!("({})", operand);
                    }
                    Ok((format!("{}{}", op.as_str(), operand), UNARY))
                }
            },

            Expr::Assign {
                target, op, value, ..
            } => {
                let target = self.expression_at(target, POSTFIX)?;
                let value = self.expression_at(value, ASSIGNMENT)?;
                Ok((format!("{} {} {}", target, op.as_str(), value), ASSIGNMENT))
            }

            Expr::Call { callee, args, .. } => {
                let callee = self.expression_at(callee, POSTFIX)?;
                let args = self.arguments(args)?;
                Ok((format!("{}({})", callee, args), POSTFIX))
            }

            Expr::FieldAccess { target, name, .. } => {
                let target = self.expression_at(target, POSTFIX)?;
                Ok((format!("{}.{}", target, name), POSTFIX))
            }

            Expr::Index { target, index, .. } => {
                let target = self.expression_at(target, POSTFIX)?;
                let index = self.expression(index)?;
                Ok((format!("{}[{}]", target, index), POSTFIX))
            }

            Expr::TypeCheck {
                value,
                type_ref,
                negated,
                ..
            } => {
                let value = self.expression_at(value, RELATIONAL)?;
                let check = format!("{} instanceof {}", value, render_type(type_ref));
                if *negated {
                    Ok((format!("!({})", check), UNARY))
                } else {
                    Ok((check, RELATIONAL))
                }
            }

            Expr::Cast {
                value,
                type_ref,
                safe,
                span,
            } => {
                if *safe {
                    return Err(EmitError::unrenderable("safe cast 'as?'", *span));
                }
                let value = self.expression_at(value, UNARY)?;
                Ok((format!("({}) {}", render_type(type_ref), value), UNARY))
            }

            Expr::Conditional {
                condition,
                then_value,
                else_value,
                ..
            } => {
                let condition = self.expression_at(condition, LOGICAL_OR)?;
                let then_value = self.expression(then_value)?;
                let else_value = self.expression_at(else_value, CONDITIONAL)?;
                Ok((format!("{} ? {} : {}", condition, then_value, else_value), CONDITIONAL))
            }

            Expr::New { type_ref, args, .. } => {
                let args = self.arguments(args)?;
                Ok((format!("new {}({})", render_type(type_ref), args), PRIMARY))
            }

            Expr::Lambda(lambda) => Ok((self.lambda(lambda)?, LAMBDA)),

            Expr::Placeholder { description, .. } => Ok((
                format!("null /* TODO: {} */", comment_text(description).replace("*/", "* /")),
                PRIMARY,
            )),

            Expr::SafeCall { span, .. } => Err(EmitError::unrenderable("safe call '?.'", *span)),
            Expr::Elvis { span, .. } => Err(EmitError::unrenderable("elvis operator '?:'", *span)),
            Expr::When(when) => Err(EmitError::unrenderable("when expression", when.span)),
            Expr::If(if_expr) => Err(EmitError::unrenderable("if expression", if_expr.span)),
            Expr::StringTemplate { span, .. } => Err(EmitError::unrenderable("string template", *span)),
            Expr::Jump { kind, span, .. } => {
                Err(EmitError::unrenderable(format!("'{}' in expression position", kind.as_str()), *span))
            }
        }
    }

    fn arguments(&mut self, args: &[Argument]) -> Result<String, EmitError> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            if let Some(name) = &arg.name {
                return Err(EmitError::unrenderable(format!("named argument '{}'", name), arg.span));
            }
            rendered.push(self.expression(&arg.value)?);
        }
        Ok(rendered.join(", "))
    }

    fn lambda(&mut self, lambda: &LambdaExpr) -> Result<String, EmitError> {
        let all_typed = lambda.params.iter().all(|p| p.type_ref.is_some());
        let params = match lambda.params.as_slice() {
            [single] if single.type_ref.is_none() => single.name.clone(),
            params => {
                let rendered: Vec<String> = params
                    .iter()
                    .map(|param| match (&param.type_ref, all_typed) {
                        (Some(ty), true) => format!("{} {}", render_type(ty), param.name),
                        _ => param.name.clone(),
                    })
                    .collect();
                format!("({})", rendered.join(", "))
            }
        };

        if let Some(body) = lambda.body.as_single_expression() {
            if !matches!(body, Expr::If(_)) {
                let body = self.expression_at(body, ASSIGNMENT)?;
                return Ok(format!("{} -> {}", params, body));
            }
        }
        let body = self.nested_block(&lambda.body)?;
        Ok(format!("{} -> {{\n{}{}}}", params, body, self.indentation()))
    }
}

/// Java spelling of a type; an argument with an empty name is a diamond
pub(super) fn render_type(type_ref: &TypeRef) -> String {
    let mut out = type_ref.name.clone();
    match type_ref.arguments.as_slice() {
        [] => {}
        [diamond] if diamond.name.is_empty() => out.push_str("<>"),
        arguments => {
            let arguments: Vec<String> = arguments.iter().map(render_type).collect();
            out.push('<');
            out.push_str(&arguments.join(", "));
            out.push('>');
        }
    }
    for _ in 0..type_ref.array_dims {
        out.push_str("[]");
    }
    out
}

fn render_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Integer(digits) | LiteralValue::Float(digits) => digits.clone(),
        LiteralValue::Boolean(value) => value.to_string(),
        LiteralValue::Char(c) => format!("'{}'", escape_java(&c.to_string(), '\'')),
        LiteralValue::String(s) => format!("\"{}\"", escape_java(s, '"')),
        LiteralValue::Null => "null".to_string(),
    }
}

/// Escapes `s` for a Java literal delimited by `quote`
pub(super) fn escape_java(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Single-line comment body
pub(super) fn comment_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::EmitterPreferences;
    use crate::utils::Span;

    fn emitter() -> JavaEmitter {
        JavaEmitter::new(EmitterPreferences {
            emit_header_comment: false,
        })
    }

    fn id(name: &str) -> Expr {
        Expr::identifier(name, Span::dummy())
    }

    fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::binary(op, left, right, Span::dummy())
    }

    #[test]
    fn test_parenthesizes_by_precedence() {
        let mut emitter = emitter();
        let sum_times = bin(BinaryOp::Mul, bin(BinaryOp::Add, id("a"), id("b")), id("c"));
        assert_eq!(emitter.expression(&sum_times).unwrap(), "(a + b) * c");

        let left_nested = bin(BinaryOp::Sub, bin(BinaryOp::Sub, id("a"), id("b")), id("c"));
        assert_eq!(emitter.expression(&left_nested).unwrap(), "a - b - c");

        let right_nested = bin(BinaryOp::Sub, id("a"), bin(BinaryOp::Sub, id("b"), id("c")));
        assert_eq!(emitter.expression(&right_nested).unwrap(), "a - (b - c)");

        let logic = bin(BinaryOp::And, bin(BinaryOp::Or, id("a"), id("b")), id("c"));
        assert_eq!(emitter.expression(&logic).unwrap(), "(a || b) && c");
    }

    #[test]
    fn test_conditional_and_field_access() {
        let span = Span::dummy();
        let mut emitter = emitter();
        let guard = bin(BinaryOp::RefNotEq, id("a"), Expr::null(span));
        let conditional = Expr::conditional(guard, Expr::field(id("a"), "b", span), Expr::null(span), span);
        assert_eq!(emitter.expression(&conditional).unwrap(), "a != null ? a.b : null");

        let length = Expr::call(Expr::field(conditional, "length", span), vec![], span);
        assert_eq!(
            emitter.expression(&length).unwrap(),
            "(a != null ? a.b : null).length()"
        );
    }

    #[test]
    fn test_unary_and_casts() {
        let span = Span::dummy();
        let mut emitter = emitter();
        let negate_twice = Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(id("x")),
                span,
            }),
            span,
        };
        assert_eq!(emitter.expression(&negate_twice).unwrap(), "-(-x)");

        let cast = Expr::Cast {
            value: Box::new(bin(BinaryOp::Add, id("a"), id("b"))),
            type_ref: TypeRef::simple("long", span),
            safe: false,
            span,
        };
        assert_eq!(emitter.expression(&cast).unwrap(), "(long) (a + b)");

        let not_string = Expr::TypeCheck {
            value: Box::new(id("o")),
            type_ref: TypeRef::simple("String", span),
            negated: true,
            span,
        };
        assert_eq!(emitter.expression(&not_string).unwrap(), "!(o instanceof String)");
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(render_literal(&LiteralValue::String("say \"hi\"\n".into())), "\"say \\\"hi\\\"\\n\"");
        assert_eq!(render_literal(&LiteralValue::Char('\'')), "'\\''");
        assert_eq!(render_literal(&LiteralValue::Char('"')), "'\"'");
        assert_eq!(render_literal(&LiteralValue::Integer("10L".into())), "10L");
        assert_eq!(escape_java("\u{1}", '"'), "\\u0001");
    }

    #[test]
    fn test_types_and_diamond() {
        let span = Span::dummy();
        let map = TypeRef::simple("Map", span)
            .with_arguments(vec![TypeRef::simple("String", span), TypeRef::simple("Integer", span)]);
        assert_eq!(render_type(&map), "Map<String, Integer>");
        let diamond = TypeRef::simple("ArrayList", span).with_arguments(vec![TypeRef::simple("", span)]);
        assert_eq!(render_type(&diamond), "ArrayList<>");
        let nullable = TypeRef {
            nullable: true,
            ..TypeRef::simple("String", span).array_of()
        };
        assert_eq!(render_type(&nullable), "String[]");
    }

    #[test]
    fn test_lambdas() {
        let span = Span::dummy();
        let mut emitter = emitter();
        let param = |name: &str, ty: Option<&str>| Parameter {
            name: name.to_string(),
            type_ref: ty.map(|t| TypeRef::simple(t, span)),
            default: None,
            property: None,
            vararg: false,
            span,
        };
        let single = Expr::Lambda(LambdaExpr {
            params: vec![param("it", None)],
            body: Block::new(vec![Stmt::Expression(bin(BinaryOp::Mul, id("it"), id("it")))], span),
            span,
        });
        assert_eq!(emitter.expression(&single).unwrap(), "it -> it * it");

        let typed = Expr::Lambda(LambdaExpr {
            params: vec![param("a", Some("int")), param("b", Some("int"))],
            body: Block::new(
                vec![Stmt::Return {
                    value: Some(bin(BinaryOp::Add, id("a"), id("b"))),
                    span,
                }],
                span,
            ),
            span,
        });
        assert_eq!(
            emitter.expression(&typed).unwrap(),
            "(int a, int b) -> {\n    return a + b;\n}"
        );
    }

    #[test]
    fn test_kotlin_only_nodes_are_rejected() {
        let span = Span::dummy();
        let mut emitter = emitter();
        let elvis = Expr::Elvis {
            value: Box::new(id("a")),
            default: Box::new(id("b")),
            span,
        };
        let error = emitter.expression(&elvis).unwrap_err();
        assert_eq!(error.error_code().as_str(), "E120");

        let range = bin(BinaryOp::RangeTo, id("a"), id("b"));
        assert!(emitter.expression(&range).is_err());
    }

    #[test]
    fn test_placeholder_renders_todo() {
        let mut emitter = emitter();
        let placeholder = Expr::Placeholder {
            description: "scope function 'let' */".into(),
            span: Span::dummy(),
        };
        assert_eq!(
            emitter.expression(&placeholder).unwrap(),
            "null /* TODO: scope function 'let' * / */"
        );
    }
}
