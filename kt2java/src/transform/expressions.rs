//! Expression rewrites
//!
//! Every rewrite produces nodes that rewrite to themselves, so running the
//! transformer over its own output changes nothing. Kept `==` comparisons
//! become [`BinaryOp::RefEq`], library calls keep their Java names, and
//! null-safe chains are flattened into explicit guards.

use super::statements::{branch_condition, is_conditional_expression};
use super::types::{boxed, is_list, is_map, is_primitive, is_void, named, unboxed};
use super::{ParamSig, TransformError, Transformer};
use crate::config::compile_time::transform::MAX_TRANSFORM_DEPTH;
use crate::grammar::ast::nodes::*;
use crate::utils::Span;

/// Java generic classes constructed with `<>`, and their imports
const GENERIC_CLASSES: &[(&str, &str)] = &[
    ("ArrayList", "java.util.ArrayList"),
    ("LinkedList", "java.util.LinkedList"),
    ("HashMap", "java.util.HashMap"),
    ("LinkedHashMap", "java.util.LinkedHashMap"),
    ("TreeMap", "java.util.TreeMap"),
    ("HashSet", "java.util.HashSet"),
    ("LinkedHashSet", "java.util.LinkedHashSet"),
    ("TreeSet", "java.util.TreeSet"),
];

const SCOPE_FUNCTIONS: &[&str] = &["let", "also", "apply", "run", "with", "takeIf", "takeUnless"];

/// Kotlin top-level functions that are never an implicit receiver call
const GLOBAL_FUNCTIONS: &[&str] = &["require", "check", "error", "repeat", "assert", "TODO"];

/// `Map.of` takes at most this many key/value pairs
const MAP_OF_LIMIT: usize = 10;

const OPTIONAL_PARAM: &str = "it$";

/// Bounds of `a..b`, `a until b` or `a downTo b`
#[derive(Debug)]
pub(super) struct RangeBounds {
    pub start: Expr,
    pub end: Expr,
    pub inclusive: bool,
    pub descending: bool,
}

/// Split a range expression into its bounds, or hand the expression back
pub(super) fn split_range(expr: Expr) -> Result<RangeBounds, Expr> {
    match expr {
        Expr::Binary {
            op: BinaryOp::RangeTo,
            left,
            right,
            ..
        } => Ok(RangeBounds {
            start: *left,
            end: *right,
            inclusive: true,
            descending: false,
        }),
        Expr::Call { callee, mut args, span } if args.len() == 1 && args[0].name.is_none() => match *callee {
            Expr::FieldAccess { target, name, .. } if name == "until" || name == "downTo" => {
                let descending = name == "downTo";
                Ok(RangeBounds {
                    start: *target,
                    end: args.remove(0).value,
                    inclusive: descending,
                    descending,
                })
            }
            callee => Err(Expr::Call {
                callee: Box::new(callee),
                args,
                span,
            }),
        },
        Expr::Paren { inner, span } => split_range(*inner).map_err(|inner| Expr::Paren {
            inner: Box::new(inner),
            span,
        }),
        expr => Err(expr),
    }
}

/// A null-safe chain whose receivers can be evaluated twice
pub(super) fn is_flattenable(expr: &Expr) -> bool {
    match expr {
        Expr::SafeCall { target, .. } => match target.as_ref() {
            Expr::SafeCall { args: None, .. } => is_flattenable(target),
            Expr::SafeCall { .. } => false,
            target => target.is_pure_reference(),
        },
        _ => false,
    }
}

fn conjunction(conditions: Vec<Expr>, span: Span) -> Expr {
    conditions
        .into_iter()
        .reduce(|left, right| Expr::binary(BinaryOp::And, left, right, span))
        .unwrap_or_else(|| Expr::literal(LiteralValue::Boolean(true), span))
}

fn not(expr: Expr, span: Span) -> Expr {
    Expr::Unary {
        op: UnaryOp::Not,
        operand: Box::new(Expr::paren(expr)),
        span,
    }
}

/// Type argument list `<>`
fn diamond(span: Span) -> TypeRef {
    named("", span)
}

impl Transformer {
    pub(super) fn transform_expr(&mut self, expr: Expr) -> Expr {
        if self.depth >= MAX_TRANSFORM_DEPTH {
            let span = expr.span();
            if !self.depth_reported {
                self.depth_reported = true;
                self.report(TransformError::MaxDepth { span });
            }
            return Expr::Placeholder {
                description: "expression nested too deeply".to_string(),
                span,
            };
        }
        self.depth += 1;
        let result = self.rewrite_expr(expr);
        self.depth -= 1;
        result
    }

    fn rewrite_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Literal(_) | Expr::Super { .. } | Expr::Placeholder { .. } => expr,
            Expr::Identifier { name, span } => self.transform_identifier(name, span),
            Expr::Binary { op, left, right, span } => self.transform_binary(op, *left, *right, span),
            Expr::Unary {
                op: UnaryOp::NotNullAssert,
                operand,
                span,
            } => {
                self.imports.insert("java.util.Objects".to_string());
                let operand = self.transform_expr(*operand);
                Expr::static_call("Objects.requireNonNull", vec![operand], span)
            }
            Expr::Unary { op, operand, span } => Expr::Unary {
                op,
                operand: Box::new(self.transform_expr(*operand)),
                span,
            },
            Expr::Call { callee, args, span } => self.transform_call(*callee, args, span),
            Expr::FieldAccess { target, name, span } => {
                let receiver = self.transform_expr(*target);
                self.property_access(receiver, &name, span)
            }
            Expr::Index { target, index, span } => self.transform_index(*target, *index, span),
            Expr::SafeCall { .. } => self.transform_safe_call(expr),
            Expr::Elvis { value, default, span } => self.transform_elvis(*value, *default, span),
            Expr::When(when) => self.when_expression(when),
            Expr::If(if_expr) => {
                if !is_conditional_expression(&if_expr) {
                    return self.unsupported_expr("if expression with statement branches", if_expr.span);
                }
                self.conditional_from_if(if_expr)
            }
            Expr::Lambda(lambda) => self.transform_lambda(lambda),
            Expr::StringTemplate { parts, span } => self.transform_template(parts, span),
            Expr::TypeCheck {
                value,
                type_ref,
                negated,
                span,
            } => {
                let type_ref = boxed(self.java_type(&type_ref));
                Expr::TypeCheck {
                    value: Box::new(self.transform_expr(*value)),
                    type_ref,
                    negated,
                    span,
                }
            }
            Expr::Cast {
                value,
                type_ref,
                safe: false,
                span,
            } => {
                let type_ref = self.java_type(&type_ref);
                Expr::Cast {
                    value: Box::new(self.transform_expr(*value)),
                    type_ref,
                    safe: false,
                    span,
                }
            }
            Expr::Cast {
                value,
                type_ref,
                safe: true,
                span,
            } => self.safe_cast(*value, type_ref, span),
            Expr::Assign { target, op, value, span } => self.transform_assign(*target, op, *value, span),
            Expr::Jump { kind, span, .. } => {
                self.unsupported_expr(&format!("'{}' inside an expression", kind.as_str()), span)
            }
            Expr::Paren { inner, span } => Expr::Paren {
                inner: Box::new(self.transform_expr(*inner)),
                span,
            },
            Expr::Conditional {
                condition,
                then_value,
                else_value,
                span,
            } => {
                let condition = self.transform_expr(*condition);
                let then_value = self.transform_expr(*then_value);
                let else_value = self.transform_expr(*else_value);
                Expr::conditional(condition, then_value, else_value, span)
            }
            Expr::New { type_ref, args, span } => {
                let type_ref = self.java_type(&type_ref);
                let args = self.transform_arguments(args, None, span);
                Expr::New { type_ref, args, span }
            }
        }
    }

    // ========================================================================
    // NAMES AND MEMBERS
    // ========================================================================

    fn transform_identifier(&mut self, name: Identifier, span: Span) -> Expr {
        if name == "this" {
            let name = if self.in_extension { "receiver".to_string() } else { name };
            return Expr::identifier(name, span);
        }
        if self.is_local(&name) {
            return Expr::identifier(name, span);
        }
        if self.in_extension && self.is_receiver_member(&name) {
            return self.property_access(Expr::identifier("receiver", span), &name, span);
        }
        if !self.in_holder() && self.has_field(&self.holder_name, &name) {
            let own_field = self
                .current_class
                .as_deref()
                .is_some_and(|class| self.has_field(class, &name));
            if !own_field {
                let holder = Expr::identifier(self.holder_name.clone(), span);
                return Expr::field(holder, name, span);
            }
        }
        Expr::identifier(name, span)
    }

    fn has_field(&self, class: &str, name: &str) -> bool {
        self.classes.get(class).is_some_and(|info| info.fields.contains_key(name))
    }

    fn has_method(&self, class: Option<&str>, name: &str) -> bool {
        class
            .and_then(|class| self.classes.get(class))
            .is_some_and(|info| info.methods.contains_key(name))
    }

    /// Bare name inside an extension function that refers to the receiver
    fn is_receiver_member(&self, name: &str) -> bool {
        let shadowed = self
            .current_class
            .as_deref()
            .is_some_and(|class| self.has_field(class, name))
            || self.has_field(&self.holder_name, name);
        if shadowed {
            return false;
        }
        let receiver_field = self
            .lookup("receiver")
            .is_some_and(|ty| self.has_field(&ty.name, name));
        receiver_field || matches!(name, "size" | "length")
    }

    fn property_access(&mut self, receiver: Expr, name: &str, span: Span) -> Expr {
        let receiver_type = self.infer(&receiver);
        if let Some(ty) = receiver_type.as_ref().filter(|ty| is_primitive(ty)) {
            return match name {
                "code" if ty.name == "char" => Expr::Cast {
                    value: Box::new(Expr::paren(receiver)),
                    type_ref: named("int", span),
                    safe: false,
                    span,
                },
                _ => self.unsupported_expr(&format!("property '{}' of primitive type '{}'", name, ty), span),
            };
        }
        let user_field = receiver_type
            .as_ref()
            .is_some_and(|ty| self.has_field(&ty.name, name));
        let static_member = receiver
            .as_identifier()
            .is_some_and(|class| self.lookup(class).is_none() && self.classes.contains_key(class));

        match name {
            "size" | "length" if !user_field && !static_member => {
                if receiver_type.is_some_and(|ty| ty.array_dims > 0) {
                    Expr::field(receiver, "length", span)
                } else {
                    Expr::call(Expr::field(receiver, name, span), Vec::new(), span)
                }
            }
            _ => Expr::field(receiver, name, span),
        }
    }

    fn member_access(&mut self, receiver: Expr, name: &str, args: Option<Vec<Argument>>, span: Span) -> Expr {
        match args {
            Some(args) => self.method_call(receiver, name, args, span),
            None => self.property_access(receiver, name, span),
        }
    }

    /// Bare reference to a top-level function, qualified outside the holder
    fn function_reference(&self, name: &str, span: Span) -> Expr {
        if self.in_holder() {
            Expr::identifier(name, span)
        } else {
            Expr::field(Expr::identifier(self.holder_name.clone(), span), name, span)
        }
    }

    fn transform_index(&mut self, target: Expr, index: Expr, span: Span) -> Expr {
        let target_type = self.infer(&target);
        let target = self.transform_expr(target);
        let index = self.transform_expr(index);
        match target_type {
            Some(ty) if is_list(&ty) || is_map(&ty) => Expr::call(Expr::field(target, "get", span), vec![index], span),
            Some(ty) if ty.name == "String" && ty.array_dims == 0 => {
                Expr::call(Expr::field(target, "charAt", span), vec![index], span)
            }
            _ => Expr::Index {
                target: Box::new(target),
                index: Box::new(index),
                span,
            },
        }
    }

    fn transform_assign(&mut self, target: Expr, op: AssignOp, value: Expr, span: Span) -> Expr {
        let collection_method = match &target {
            Expr::Index { target: container, .. } => self.infer(container).and_then(|ty| {
                if is_map(&ty) {
                    Some("put")
                } else if is_list(&ty) {
                    Some("set")
                } else {
                    None
                }
            }),
            _ => None,
        };

        if let Some(method) = collection_method {
            return match target {
                Expr::Index {
                    target: container,
                    index,
                    ..
                } if op == AssignOp::Assign => {
                    let container = self.transform_expr(*container);
                    let index = self.transform_expr(*index);
                    let value = self.transform_expr(value);
                    Expr::call(Expr::field(container, method, span), vec![index, value], span)
                }
                _ => self.unsupported_expr("compound assignment to a collection element", span),
            };
        }

        let target = self.transform_expr(target);
        let value = self.transform_expr(value);
        Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value),
            span,
        }
    }

    // ========================================================================
    // OPERATORS
    // ========================================================================

    fn transform_binary(&mut self, op: BinaryOp, left: Expr, right: Expr, span: Span) -> Expr {
        match op {
            BinaryOp::Eq | BinaryOp::NotEq => self.equality(left, right, op == BinaryOp::NotEq, span),
            BinaryOp::In | BinaryOp::NotIn => self.membership(left, right, op == BinaryOp::NotIn, span),
            BinaryOp::RangeTo => self.unsupported_expr("range outside a for loop or 'in' test", span),
            op => {
                let left = self.transform_expr(left);
                let right = self.transform_expr(right);
                Expr::binary(op, left, right, span)
            }
        }
    }

    /// Kotlin `==` is structural: identity only for null, primitives and
    /// enum constants, `Objects.equals` otherwise
    fn equality(&mut self, left: Expr, right: Expr, negated: bool, span: Span) -> Expr {
        let is_null = |expr: &Expr| matches!(expr.as_literal(), Some(LiteralValue::Null));
        let left_type = self.infer(&left);
        let right_type = self.infer(&right);
        let is_enum = |ty: &TypeRef| self.classes.get(&ty.name).is_some_and(|info| !info.enum_entries.is_empty());
        let identity = is_null(&left)
            || is_null(&right)
            || matches!((&left_type, &right_type), (Some(l), Some(r)) if is_primitive(l) || is_primitive(r))
            || [&left_type, &right_type].iter().any(|ty| ty.as_ref().is_some_and(|ty| is_enum(ty)));

        let left = self.transform_expr(left);
        let right = self.transform_expr(right);
        if identity {
            let op = if negated { BinaryOp::RefNotEq } else { BinaryOp::RefEq };
            return Expr::binary(op, left, right, span);
        }

        self.imports.insert("java.util.Objects".to_string());
        let equals = Expr::static_call("Objects.equals", vec![left, right], span);
        if negated {
            not(equals, span)
        } else {
            equals
        }
    }

    fn membership(&mut self, element: Expr, container: Expr, negated: bool, span: Span) -> Expr {
        let test = match split_range(container) {
            Ok(bounds) => {
                if !element.is_pure_reference() {
                    return self.unsupported_expr("range test on an expression with side effects", span);
                }
                let value = self.transform_expr(element);
                let start = self.transform_expr(bounds.start);
                let end = self.transform_expr(bounds.end);
                let (low, high) = if bounds.descending { (end, start) } else { (start, end) };
                let upper = if bounds.inclusive { BinaryOp::LtEq } else { BinaryOp::Lt };
                Expr::binary(
                    BinaryOp::And,
                    Expr::binary(BinaryOp::GtEq, value.clone(), low, span),
                    Expr::binary(upper, value, high, span),
                    span,
                )
            }
            Err(container) => {
                let container_type = self.infer(&container);
                let element_type = self.infer(&element);
                let element = self.transform_expr(element);
                let container = self.transform_expr(container);
                match container_type {
                    Some(ty) if is_map(&ty) => {
                        Expr::call(Expr::field(container, "containsKey", span), vec![element], span)
                    }
                    // String.contains takes a CharSequence
                    Some(ty) if ty.name == "String" && element_type.is_some_and(|e| e.name == "char") => {
                        let index = Expr::call(Expr::field(container, "indexOf", span), vec![element], span);
                        Expr::binary(BinaryOp::GtEq, index, Expr::literal(LiteralValue::Integer("0".into()), span), span)
                    }
                    _ => Expr::call(Expr::field(container, "contains", span), vec![element], span),
                }
            }
        };
        if negated {
            not(test, span)
        } else {
            test
        }
    }

    fn safe_cast(&mut self, value: Expr, type_ref: TypeRef, span: Span) -> Expr {
        let type_ref = boxed(self.java_type(&type_ref));
        if !value.is_pure_reference() {
            return self.unsupported_expr("safe cast of an expression with side effects", span);
        }
        let value = self.transform_expr(value);
        let check = Expr::TypeCheck {
            value: Box::new(value.clone()),
            type_ref: type_ref.clone(),
            negated: false,
            span,
        };
        let cast = Expr::Cast {
            value: Box::new(value),
            type_ref,
            safe: false,
            span,
        };
        Expr::conditional(check, cast, Expr::null(span), span)
    }

    // ========================================================================
    // NULL SAFETY
    // ========================================================================

    fn transform_safe_call(&mut self, expr: Expr) -> Expr {
        let span = expr.span();
        if is_flattenable(&expr) {
            let (guards, access) = self.flatten_safe_chain(expr);
            if guards.is_empty() {
                return access;
            }
            return Expr::conditional(conjunction(guards, span), access, Expr::null(span), span);
        }

        match expr {
            Expr::SafeCall {
                target, name, args, span,
            } => {
                let receiver = self.transform_expr(*target);
                let receiver_type = self.infer(&receiver);
                let mapper = self.optional_lambda(receiver_type, &name, args, span);
                self.imports.insert("java.util.Optional".to_string());
                let optional = Expr::static_call("Optional.ofNullable", vec![receiver], span);
                let mapped = Expr::call(Expr::field(optional, "map", span), vec![mapper], span);
                Expr::call(Expr::field(mapped, "orElse", span), vec![Expr::null(span)], span)
            }
            other => self.transform_expr(other),
        }
    }

    /// Null guards for every receiver of a chain, and the guarded access
    pub(super) fn flatten_safe_chain(&mut self, expr: Expr) -> (Vec<Expr>, Expr) {
        match expr {
            Expr::SafeCall {
                target, name, args, span,
            } => {
                let (mut guards, receiver) = match *target {
                    inner @ Expr::SafeCall { .. } => self.flatten_safe_chain(inner),
                    other => (Vec::new(), self.transform_expr(other)),
                };
                // A primitive is never null
                if !self.infer(&receiver).is_some_and(|ty| is_primitive(&ty)) {
                    guards.push(Expr::binary(BinaryOp::RefNotEq, receiver.clone(), Expr::null(span), span));
                }
                let access = self.member_access(receiver, &name, args, span);
                (guards, access)
            }
            other => (Vec::new(), self.transform_expr(other)),
        }
    }

    /// `it$ -> it$.name(args)` applied to a value known to be non-null
    pub(super) fn optional_lambda(
        &mut self,
        receiver_type: Option<TypeRef>,
        name: &str,
        args: Option<Vec<Argument>>,
        span: Span,
    ) -> Expr {
        self.with_scope(|t| {
            // Unboxed so primitive members map to operators; Java unboxes `it$`
            let param_type = receiver_type.map(unboxed).unwrap_or_else(|| named("Object", span));
            t.declare(OPTIONAL_PARAM, param_type);
            let access = t.member_access(Expr::identifier(OPTIONAL_PARAM, span), name, args, span);
            Expr::Lambda(LambdaExpr {
                params: vec![Parameter {
                    name: OPTIONAL_PARAM.to_string(),
                    type_ref: None,
                    default: None,
                    property: None,
                    vararg: false,
                    span,
                }],
                body: Block::new(vec![Stmt::Expression(access)], span),
                span,
            })
        })
    }

    fn transform_elvis(&mut self, value: Expr, default: Expr, span: Span) -> Expr {
        if matches!(default, Expr::Jump { .. }) {
            return self.unsupported_expr("jump in an Elvis default inside an expression", span);
        }

        if is_flattenable(&value) {
            let (mut guards, access) = self.flatten_safe_chain(value);
            let default = self.transform_expr(default);
            let primitive = self.infer(&access).is_some_and(|ty| is_primitive(&ty));
            if primitive {
                if guards.is_empty() {
                    return access;
                }
                return Expr::conditional(conjunction(guards, span), access, default, span);
            }
            if access.is_pure_reference() {
                guards.push(Expr::binary(BinaryOp::RefNotEq, access.clone(), Expr::null(span), span));
                return Expr::conditional(conjunction(guards, span), access, default, span);
            }
            let value = Expr::conditional(conjunction(guards, span), access, Expr::null(span), span);
            return self.non_null_or(value, default, span);
        }

        if value.is_pure_reference() {
            let value = self.transform_expr(value);
            let default = self.transform_expr(default);
            let check = Expr::binary(BinaryOp::RefNotEq, value.clone(), Expr::null(span), span);
            return Expr::conditional(check, value, default, span);
        }

        let value = self.transform_expr(value);
        let default = self.transform_expr(default);
        self.non_null_or(value, default, span)
    }

    /// `value` once, falling back to `default` when it is null
    fn non_null_or(&mut self, value: Expr, default: Expr, span: Span) -> Expr {
        self.imports.insert("java.util.Objects".to_string());
        if default.is_pure_reference() {
            return Expr::static_call("Objects.requireNonNullElse", vec![value, default], span);
        }
        let supplier = Expr::Lambda(LambdaExpr {
            params: Vec::new(),
            body: Block::new(vec![Stmt::Expression(default)], span),
            span,
        });
        Expr::static_call("Objects.requireNonNullElseGet", vec![value, supplier], span)
    }

    // ========================================================================
    // CALLS
    // ========================================================================

    fn transform_call(&mut self, callee: Expr, args: Vec<Argument>, span: Span) -> Expr {
        match callee {
            Expr::Identifier { name, .. } => self.call_by_name(name, args, span),
            Expr::FieldAccess { target, name, .. } => {
                let receiver = self.transform_expr(*target);
                self.method_call(receiver, &name, args, span)
            }
            callee => {
                let callee = self.transform_expr(callee);
                let args = self.transform_arguments(args, None, span);
                Expr::Call {
                    callee: Box::new(callee),
                    args,
                    span,
                }
            }
        }
    }

    fn transform_values(&mut self, args: Vec<Argument>, span: Span) -> Vec<Expr> {
        self.transform_arguments(args, None, span)
            .into_iter()
            .map(|arg| arg.value)
            .collect()
    }

    fn call_by_name(&mut self, name: Identifier, args: Vec<Argument>, span: Span) -> Expr {
        let plain_call = |callee: Expr, args: Vec<Argument>| Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        };

        if self.is_local(&name) {
            return self.unsupported_expr(&format!("invocation of function value '{}'", name), span);
        }

        match name.as_str() {
            "println" | "print" => {
                let values = self.transform_values(args, span);
                return Expr::static_call(&format!("System.out.{}", name), values, span);
            }
            "listOf" | "emptyList" | "setOf" | "emptySet" => {
                let class = if name.contains("List") || name == "listOf" { "List" } else { "Set" };
                self.imports.insert(format!("java.util.{}", class));
                let values = self.transform_values(args, span);
                return Expr::static_call(&format!("{}.of", class), values, span);
            }
            "mapOf" | "emptyMap" => return self.map_of(args, span),
            "mutableListOf" | "arrayListOf" => return self.mutable_collection("ArrayList", args, span),
            "mutableSetOf" => return self.mutable_collection("LinkedHashSet", args, span),
            "hashSetOf" => return self.mutable_collection("HashSet", args, span),
            "mutableMapOf" => return self.mutable_map("LinkedHashMap", args, span),
            "hashMapOf" => return self.mutable_map("HashMap", args, span),
            "maxOf" | "minOf" if args.len() == 2 => {
                let method = if name == "maxOf" { "Math.max" } else { "Math.min" };
                let values = self.transform_values(args, span);
                return Expr::static_call(method, values, span);
            }
            _ => {}
        }

        let current_class = self.current_class.clone();
        if !self.in_holder() && self.has_method(current_class.as_deref(), &name) {
            let args = self.transform_arguments(args, None, span);
            return plain_call(Expr::identifier(name, span), args);
        }

        if let Some(signature) = self.functions.get(&name).cloned() {
            let callee = self.function_reference(&name, span);
            if signature.extension && self.in_extension {
                // Implicit receiver passed on to another extension
                let mut java_args = vec![Argument::positional(Expr::identifier("receiver", span))];
                java_args.extend(self.transform_arguments(args, Some(&signature.params), span));
                return plain_call(callee, java_args);
            }
            let params = (!signature.extension).then_some(signature.params.as_slice());
            let args = self.transform_arguments(args, params, span);
            return plain_call(callee, args);
        }

        if let Some(info) = self.classes.get(&name) {
            let generic = !info.type_params.is_empty();
            let constructor = info.constructor.clone();
            let mut type_ref = named(&name, span);
            if generic {
                type_ref = type_ref.with_arguments(vec![diamond(span)]);
            }
            let args = self.transform_arguments(args, Some(&constructor), span);
            return Expr::New { type_ref, args, span };
        }

        if name.starts_with(char::is_uppercase) && !GLOBAL_FUNCTIONS.contains(&name.as_str()) {
            let mut type_ref = named(&name, span);
            if let Some(&(_, import)) = GENERIC_CLASSES.iter().find(|(class, _)| *class == name) {
                self.imports.insert(import.to_string());
                type_ref = type_ref.with_arguments(vec![diamond(span)]);
            }
            let args = self.transform_arguments(args, None, span);
            return Expr::New { type_ref, args, span };
        }

        if self.in_extension
            && !GLOBAL_FUNCTIONS.contains(&name.as_str())
            && !self.has_method(current_class.as_deref(), &name)
        {
            return self.method_call(Expr::identifier("receiver", span), &name, args, span);
        }

        let args = self.transform_arguments(args, None, span);
        plain_call(Expr::identifier(name, span), args)
    }

    fn method_call(&mut self, receiver: Expr, name: &str, mut args: Vec<Argument>, span: Span) -> Expr {
        if SCOPE_FUNCTIONS.contains(&name) {
            return self.unsupported_expr(&format!("scope function '{}'", name), span);
        }
        match name {
            "until" | "downTo" | "step" => {
                return self.unsupported_expr("range outside a for loop or 'in' test", span);
            }
            "to" if args.len() == 1 => {
                self.imports.insert("java.util.Map".to_string());
                let value = self.transform_expr(args.remove(0).value);
                return Expr::static_call("Map.entry", vec![receiver, value], span);
            }
            _ => {}
        }

        let holder_receiver =
            receiver.as_identifier() == Some(self.holder_name.as_str()) && !self.is_local(&self.holder_name);
        if !holder_receiver {
            if let Some(signature) = self.functions.get(name).filter(|s| s.extension).cloned() {
                let mut java_args = vec![Argument::positional(receiver)];
                java_args.extend(self.transform_arguments(args, Some(&signature.params), span));
                return Expr::Call {
                    callee: Box::new(self.function_reference(name, span)),
                    args: java_args,
                    span,
                };
            }
        }

        let receiver_type = self.infer(&receiver);
        if args.is_empty() {
            let is_string = receiver_type
                .as_ref()
                .is_some_and(|ty| ty.name == "String" && ty.array_dims == 0);
            let numeric = receiver_type.as_ref().is_some_and(is_primitive);
            match name {
                "isNotEmpty" => {
                    let empty = Expr::call(Expr::field(receiver, "isEmpty", span), Vec::new(), span);
                    return not(empty, span);
                }
                "toInt" | "toLong" | "toDouble" if is_string => {
                    let parser = match name {
                        "toInt" => "Integer.parseInt",
                        "toLong" => "Long.parseLong",
                        _ => "Double.parseDouble",
                    };
                    return Expr::static_call(parser, vec![receiver], span);
                }
                "toInt" | "toLong" | "toDouble" | "toFloat" | "toChar" if numeric => {
                    let target = match name {
                        "toInt" => "int",
                        "toLong" => "long",
                        "toDouble" => "double",
                        "toFloat" => "float",
                        _ => "char",
                    };
                    return Expr::Cast {
                        value: Box::new(Expr::paren(receiver)),
                        type_ref: named(target, span),
                        safe: false,
                        span,
                    };
                }
                _ => {}
            }
        }

        if let Some(ty) = receiver_type.filter(is_primitive) {
            return self.primitive_method(receiver, &ty, name, args, span);
        }

        let java_name = match name {
            "uppercase" => "toUpperCase",
            "lowercase" => "toLowerCase",
            other => other,
        };
        let args = self.transform_arguments(args, None, span);
        Expr::Call {
            callee: Box::new(Expr::field(receiver, java_name, span)),
            args,
            span,
        }
    }

    /// Members of Kotlin's number, char and boolean types: Java operators or
    /// static helpers on the box class
    fn primitive_method(&mut self, receiver: Expr, ty: &TypeRef, name: &str, args: Vec<Argument>, span: Span) -> Expr {
        let box_class = boxed(ty.clone()).name;
        let mut values = self.transform_values(args, span);
        let operator = match name {
            "plus" => Some(BinaryOp::Add),
            "minus" => Some(BinaryOp::Sub),
            "times" => Some(BinaryOp::Mul),
            "div" => Some(BinaryOp::Div),
            "rem" | "mod" => Some(BinaryOp::Rem),
            "equals" => Some(BinaryOp::RefEq),
            _ => None,
        };
        let boolean = ty.name == "boolean";
        if let Some(op) = operator.filter(|op| values.len() == 1 && (!boolean || *op == BinaryOp::RefEq)) {
            return Expr::binary(op, receiver, values.remove(0), span);
        }

        match (name, values.len()) {
            ("toString", 0) => Expr::static_call("String.valueOf", vec![receiver], span),
            ("hashCode", 0) => Expr::static_call(&format!("{}.hashCode", box_class), vec![receiver], span),
            ("unaryMinus", 0) => Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(receiver),
                span,
            },
            ("not", 0) if boolean => not(receiver, span),
            ("toByte" | "toShort", 0) => Expr::Cast {
                value: Box::new(Expr::paren(receiver)),
                type_ref: named(if name == "toByte" { "byte" } else { "short" }, span),
                safe: false,
                span,
            },
            ("compareTo", 1) => {
                let other = values.remove(0);
                Expr::static_call(&format!("{}.compare", box_class), vec![receiver, other], span)
            }
            ("coerceAtLeast" | "coerceAtMost", 1) => {
                let method = if name == "coerceAtLeast" { "Math.max" } else { "Math.min" };
                let other = values.remove(0);
                Expr::static_call(method, vec![receiver, other], span)
            }
            _ => self.unsupported_expr(&format!("member '{}' of primitive type '{}'", name, ty), span),
        }
    }

    /// Match arguments to parameters: named arguments are reordered, skipped
    /// parameters before the last supplied one take their default, and
    /// trailing defaults are left to the generated overloads
    pub(super) fn transform_arguments(
        &mut self,
        args: Vec<Argument>,
        signature: Option<&[ParamSig]>,
        span: Span,
    ) -> Vec<Argument> {
        let has_named = args.iter().any(|arg| arg.name.is_some());
        let params = match signature {
            Some(params) if has_named => params,
            _ => {
                if has_named {
                    self.report(TransformError::unsupported(
                        "named arguments to a function with unknown parameters",
                        span,
                    ));
                }
                return args
                    .into_iter()
                    .map(|arg| Argument::positional(self.transform_expr(arg.value)))
                    .collect();
            }
        };

        let mut slots: Vec<Option<Expr>> = vec![None; params.len()];
        let mut extra = Vec::new();
        let mut position = 0;
        for arg in args {
            match arg.name {
                None => {
                    match slots.get_mut(position) {
                        Some(Some(_)) => self.report(TransformError::unsupported(
                            format!("argument '{}' passed more than once", params[position].name),
                            arg.span,
                        )),
                        Some(slot) => *slot = Some(arg.value),
                        None => extra.push(arg.value),
                    }
                    position += 1;
                }
                Some(name) => match params.iter().position(|param| param.name == name) {
                    Some(index) if slots[index].is_some() => self.report(TransformError::unsupported(
                        format!("argument '{}' passed more than once", name),
                        arg.span,
                    )),
                    Some(index) => slots[index] = Some(arg.value),
                    None => self.report(TransformError::unsupported(
                        format!("unknown named argument '{}'", name),
                        arg.span,
                    )),
                },
            }
        }

        let supplied = slots.iter().rposition(Option::is_some).map_or(0, |last| last + 1);
        let mut java_args = Vec::new();
        for (slot, param) in slots.into_iter().zip(params).take(supplied) {
            let value = match (slot, &param.default) {
                (Some(value), _) => self.transform_expr(value),
                (None, Some(default)) => self.transform_expr(default.clone()),
                (None, None) => self.unsupported_expr(&format!("missing argument '{}'", param.name), span),
            };
            java_args.push(Argument::positional(value));
        }
        for value in extra {
            java_args.push(Argument::positional(self.transform_expr(value)));
        }
        java_args
    }

    /// `Map.of(k, v, ...)`, or `Map.ofEntries` past the `Map.of` arity
    fn map_of(&mut self, args: Vec<Argument>, span: Span) -> Expr {
        self.imports.insert("java.util.Map".to_string());
        let mut pairs = Vec::new();
        for arg in args {
            match split_pair(arg.value) {
                Ok((key, value)) => {
                    let key = self.transform_expr(key);
                    let value = self.transform_expr(value);
                    pairs.push((key, value));
                }
                Err(other) => {
                    let placeholder = self.unsupported_expr("map entry that is not a 'to' pair", other.span());
                    pairs.push((placeholder, Expr::null(span)));
                }
            }
        }

        if pairs.len() <= MAP_OF_LIMIT {
            let values = pairs.into_iter().flat_map(|(key, value)| [key, value]).collect();
            return Expr::static_call("Map.of", values, span);
        }
        let entries = pairs
            .into_iter()
            .map(|(key, value)| Expr::static_call("Map.entry", vec![key, value], span))
            .collect();
        Expr::static_call("Map.ofEntries", entries, span)
    }

    /// `new ArrayList<>(List.of(...))`, or an empty `new ArrayList<>()`
    fn mutable_collection(&mut self, class: &str, args: Vec<Argument>, span: Span) -> Expr {
        self.imports.insert(format!("java.util.{}", class));
        let type_ref = named(class, span).with_arguments(vec![diamond(span)]);
        let args = if args.is_empty() {
            Vec::new()
        } else {
            self.imports.insert("java.util.List".to_string());
            let values = self.transform_values(args, span);
            vec![Argument::positional(Expr::static_call("List.of", values, span))]
        };
        Expr::New { type_ref, args, span }
    }

    fn mutable_map(&mut self, class: &str, args: Vec<Argument>, span: Span) -> Expr {
        self.imports.insert(format!("java.util.{}", class));
        let type_ref = named(class, span).with_arguments(vec![diamond(span)]);
        let args = if args.is_empty() {
            Vec::new()
        } else {
            vec![Argument::positional(self.map_of(args, span))]
        };
        Expr::New { type_ref, args, span }
    }

    // ========================================================================
    // CONDITIONALS
    // ========================================================================

    fn conditional_from_if(&mut self, if_expr: IfExpr) -> Expr {
        let IfExpr {
            condition,
            then_branch,
            else_branch,
            span,
        } = if_expr;
        let condition = self.transform_expr(*condition);
        let then_value = self.block_value(then_branch);
        let else_value = match else_branch {
            Some(ElseBranch::Block(block)) => self.block_value(block),
            Some(ElseBranch::If(nested)) => self.conditional_from_if(*nested),
            None => Expr::null(span),
        };
        Expr::conditional(condition, then_value, else_value, span)
    }

    fn block_value(&mut self, block: Block) -> Expr {
        let span = block.span;
        match block.statements.into_iter().next() {
            Some(Stmt::Expression(expr)) => self.transform_expr(expr),
            _ => Expr::null(span),
        }
    }

    /// A `when` in value position where statement lowering is not possible:
    /// nested conditionals when every branch is a single expression
    fn when_expression(&mut self, when: WhenExpr) -> Expr {
        let single = |block: &Block| {
            block
                .as_single_expression()
                .is_some_and(|expr| !matches!(expr, Expr::Jump { .. }))
        };
        let convertible = when.else_branch.as_ref().is_some_and(single)
            && when.branches.iter().all(|branch| single(&branch.body))
            && when.subject.as_deref().map_or(true, Expr::is_pure_reference);
        if !convertible {
            return self.unsupported_expr("when expression outside a statement", when.span);
        }

        let WhenExpr {
            subject,
            branches,
            else_branch,
            span,
        } = when;
        let first_value = |block: Block| match block.statements.into_iter().next() {
            Some(Stmt::Expression(expr)) => expr,
            _ => Expr::null(span),
        };
        let mut value = else_branch.map(first_value).unwrap_or_else(|| Expr::null(span));
        for branch in branches.into_iter().rev() {
            let condition = branch_condition(subject.as_deref(), branch.conditions, branch.span);
            value = Expr::conditional(condition, first_value(branch.body), value, branch.span);
        }
        self.transform_expr(value)
    }

    // ========================================================================
    // LAMBDAS AND TEMPLATES
    // ========================================================================

    fn transform_lambda(&mut self, lambda: LambdaExpr) -> Expr {
        let LambdaExpr { params, body, span } = lambda;
        let mut params: Vec<Parameter> = params
            .into_iter()
            .map(|param| Parameter {
                type_ref: param.type_ref.as_ref().map(|ty| self.java_type(ty)),
                ..param
            })
            .collect();
        if params.is_empty() && block_mentions_it(&body) {
            params.push(Parameter {
                name: "it".to_string(),
                type_ref: None,
                default: None,
                property: None,
                vararg: false,
                span,
            });
        }

        self.with_scope(|t| {
            for param in &params {
                let ty = param.type_ref.clone().unwrap_or_else(|| named("Object", span));
                t.declare(&param.name, ty);
            }
            let body = if body.as_single_expression().is_some() {
                let Block { statements, span } = body;
                let statements = statements
                    .into_iter()
                    .map(|statement| match statement {
                        Stmt::Expression(expr) => Stmt::Expression(t.transform_expr(expr)),
                        other => other,
                    })
                    .collect();
                Block::new(statements, span)
            } else {
                let body = t.lambda_tail(body);
                t.transform_block(body)
            };
            Expr::Lambda(LambdaExpr { params, body, span })
        })
    }

    /// The last expression of a block lambda is its result when it has a value
    fn lambda_tail(&self, mut block: Block) -> Block {
        let returns_value = match block.statements.last() {
            Some(Stmt::Expression(expr)) => match expr {
                Expr::Assign { .. }
                | Expr::Jump { .. }
                | Expr::If(_)
                | Expr::When(_)
                | Expr::Placeholder { .. }
                | Expr::Unary {
                    op: UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement,
                    ..
                } => false,
                Expr::Call { .. } | Expr::New { .. } | Expr::SafeCall { .. } => {
                    self.infer(expr).is_some_and(|ty| !is_void(&ty))
                }
                _ => true,
            },
            _ => false,
        };
        if returns_value {
            if let Some(Stmt::Expression(expr)) = block.statements.pop() {
                let span = expr.span();
                block.statements.push(Stmt::Return { value: Some(expr), span });
            }
        }
        block
    }

    /// Concatenation that starts from a `String` operand
    fn transform_template(&mut self, parts: Vec<TemplatePart>, span: Span) -> Expr {
        let mut pieces: Vec<Expr> = parts
            .into_iter()
            .map(|part| match part {
                TemplatePart::Text(text) => Expr::string(text, span),
                TemplatePart::Expr(expr) => self.transform_expr(expr),
            })
            .collect();
        let starts_with_string = pieces
            .first()
            .and_then(|piece| self.infer(piece))
            .is_some_and(|ty| ty.name == "String" && ty.array_dims == 0);
        if !starts_with_string {
            pieces.insert(0, Expr::string("", span));
        }
        pieces
            .into_iter()
            .reduce(|left, right| Expr::binary(BinaryOp::Add, left, right, span))
            .unwrap_or_else(|| Expr::string("", span))
    }
}

/// `key to value`
fn split_pair(expr: Expr) -> Result<(Expr, Expr), Expr> {
    match expr {
        Expr::Call { callee, mut args, span } if args.len() == 1 => match *callee {
            Expr::FieldAccess { target, name, .. } if name == "to" => Ok((*target, args.remove(0).value)),
            callee => Err(Expr::Call {
                callee: Box::new(callee),
                args,
                span,
            }),
        },
        other => Err(other),
    }
}

// === IMPLICIT `it` ===

fn block_mentions_it(block: &Block) -> bool {
    block.statements.iter().any(stmt_mentions_it)
}

fn stmt_mentions_it(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Variable(variable) => variable.initializer.as_ref().is_some_and(expr_mentions_it),
        Stmt::Expression(expr) | Stmt::Throw { value: expr, .. } => expr_mentions_it(expr),
        Stmt::Return { value, .. } => value.as_ref().is_some_and(expr_mentions_it),
        Stmt::While { condition, body, .. } | Stmt::DoWhile { condition, body, .. } => {
            expr_mentions_it(condition) || block_mentions_it(body)
        }
        Stmt::For { iterable, body, .. } => expr_mentions_it(iterable) || block_mentions_it(body),
        Stmt::Try {
            body, catches, finally, ..
        } => {
            block_mentions_it(body)
                || catches.iter().any(|catch| block_mentions_it(&catch.body))
                || finally.as_ref().is_some_and(block_mentions_it)
        }
        Stmt::Switch {
            subject,
            cases,
            default,
            ..
        } => {
            expr_mentions_it(subject)
                || cases.iter().any(|case| block_mentions_it(&case.body))
                || default.as_ref().is_some_and(block_mentions_it)
        }
        Stmt::CountedFor { start, end, body, .. } => {
            expr_mentions_it(start) || expr_mentions_it(end) || block_mentions_it(body)
        }
        Stmt::Block(block) => block_mentions_it(block),
        Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Placeholder { .. } => false,
    }
}

fn args_mention_it(args: &[Argument]) -> bool {
    args.iter().any(|arg| expr_mentions_it(&arg.value))
}

fn if_mentions_it(if_expr: &IfExpr) -> bool {
    expr_mentions_it(&if_expr.condition)
        || block_mentions_it(&if_expr.then_branch)
        || match &if_expr.else_branch {
            Some(ElseBranch::Block(block)) => block_mentions_it(block),
            Some(ElseBranch::If(nested)) => if_mentions_it(nested),
            None => false,
        }
}

fn expr_mentions_it(expr: &Expr) -> bool {
    match expr {
        Expr::Identifier { name, .. } => name == "it",
        Expr::Literal(_) | Expr::Super { .. } | Expr::Placeholder { .. } => false,
        Expr::Binary { left, right, .. }
        | Expr::Elvis {
            value: left,
            default: right,
            ..
        }
        | Expr::Assign {
            target: left,
            value: right,
            ..
        }
        | Expr::Index {
            target: left,
            index: right,
            ..
        } => expr_mentions_it(left) || expr_mentions_it(right),
        Expr::Unary { operand, .. }
        | Expr::Paren { inner: operand, .. }
        | Expr::TypeCheck { value: operand, .. }
        | Expr::Cast { value: operand, .. }
        | Expr::FieldAccess { target: operand, .. } => expr_mentions_it(operand),
        Expr::Call { callee, args, .. } => expr_mentions_it(callee) || args_mention_it(args),
        Expr::New { args, .. } => args_mention_it(args),
        Expr::SafeCall { target, args, .. } => {
            expr_mentions_it(target) || args.as_deref().is_some_and(args_mention_it)
        }
        Expr::When(when) => {
            when.subject.as_deref().is_some_and(expr_mentions_it)
                || when.branches.iter().any(|branch| {
                    block_mentions_it(&branch.body)
                        || branch.conditions.iter().any(|condition| match condition {
                            WhenCondition::Value(value) | WhenCondition::In { range: value, .. } => {
                                expr_mentions_it(value)
                            }
                            WhenCondition::Is { .. } => false,
                        })
                })
                || when.else_branch.as_ref().is_some_and(block_mentions_it)
        }
        Expr::If(if_expr) => if_mentions_it(if_expr),
        // A lambda without parameters has its own `it`
        Expr::Lambda(lambda) => {
            !lambda.params.is_empty()
                && !lambda.params.iter().any(|param| param.name == "it")
                && block_mentions_it(&lambda.body)
        }
        Expr::StringTemplate { parts, .. } => parts
            .iter()
            .any(|part| matches!(part, TemplatePart::Expr(expr) if expr_mentions_it(expr))),
        Expr::Jump { value, .. } => value.as_deref().is_some_and(expr_mentions_it),
        Expr::Conditional {
            condition,
            then_value,
            else_value,
            ..
        } => expr_mentions_it(condition) || expr_mentions_it(then_value) || expr_mentions_it(else_value),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{class, method, transform_source};
    use super::*;
    use assert_matches::assert_matches;

    /// Transformed value of `f`'s single return statement
    fn returned(source: &str) -> Expr {
        let outcome = transform_source(source, "T");
        assert!(outcome.issues.is_empty(), "issues: {:?}", outcome.issues);
        let holder = class(&outcome.program, "T");
        let FunctionBody::Block(block) = &method(holder, "f").body else {
            panic!("expected block body");
        };
        match block.statements.last() {
            Some(Stmt::Return { value: Some(value), .. }) => value.clone(),
            other => panic!("expected return, got {:?}", other),
        }
    }

    fn callee_path(expr: &Expr) -> String {
        match expr {
            Expr::Identifier { name, .. } => name.clone(),
            Expr::FieldAccess { target, name, .. } => format!("{}.{}", callee_path(target), name),
            _ => "?".to_string(),
        }
    }

    fn call_path(expr: &Expr) -> String {
        match expr {
            Expr::Call { callee, .. } => callee_path(callee),
            _ => panic!("expected call, got {:?}", expr),
        }
    }

    #[test]
    fn test_safe_call_becomes_guarded_conditional() {
        let value = returned("class P(val name: String)\nfun f(p: P?): String? { return p?.name }");
        let Expr::Conditional {
            condition, else_value, ..
        } = value
        else {
            panic!("expected conditional");
        };
        assert_matches!(*condition, Expr::Binary { op: BinaryOp::RefNotEq, .. });
        assert_matches!(else_value.as_literal(), Some(LiteralValue::Null));
    }

    #[test]
    fn test_safe_call_on_call_result_uses_optional() {
        // trim() cannot be evaluated twice
        let value = returned("fun f(s: String?): Int? { return s?.trim()?.length }");
        assert!(call_path(&value).ends_with(".orElse"));
    }

    #[test]
    fn test_elvis_on_pure_value() {
        let value = returned("fun f(s: String?): String { return s ?: \"none\" }");
        assert_matches!(value, Expr::Conditional { .. });
    }

    #[test]
    fn test_elvis_on_call_uses_objects() {
        let value = returned("fun g(): String? = null\nfun f(): String { return g() ?: \"none\" }");
        assert_eq!(call_path(&value), "Objects.requireNonNullElse");
    }

    #[test]
    fn test_string_template_concatenation() {
        let value = returned("fun f(name: String, n: Int): String { return \"Hi $name, you are ${n + 1}\" }");
        let Expr::Binary { op: BinaryOp::Add, left, right, .. } = value else {
            panic!("expected concatenation");
        };
        assert_matches!(*right, Expr::Binary { op: BinaryOp::Add, .. });
        assert_matches!(*left, Expr::Binary { op: BinaryOp::Add, .. });

        let value = returned("fun f(n: Int): String { return \"$n\" }");
        let Expr::Binary { left, .. } = value else {
            panic!("expected concatenation");
        };
        assert_matches!(left.as_literal(), Some(LiteralValue::String(s)) if s.is_empty());
    }

    #[test]
    fn test_structural_and_primitive_equality() {
        let value = returned("fun f(a: String, b: String): Boolean { return a == b }");
        assert_eq!(call_path(&value), "Objects.equals");

        let value = returned("fun f(a: Int, b: Int): Boolean { return a != b }");
        assert_matches!(value, Expr::Binary { op: BinaryOp::RefNotEq, .. });

        let value = returned("fun f(a: String?): Boolean { return a == null }");
        assert_matches!(value, Expr::Binary { op: BinaryOp::RefEq, .. });
    }

    #[test]
    fn test_range_membership() {
        let value = returned("fun f(x: Int): Boolean { return x in 1..10 }");
        assert_matches!(value, Expr::Binary { op: BinaryOp::And, .. });

        let value = returned("fun f(x: Int, xs: List<Int>): Boolean { return x !in xs }");
        assert_matches!(value, Expr::Unary { op: UnaryOp::Not, .. });
    }

    #[test]
    fn test_collection_builders() {
        assert_eq!(call_path(&returned("fun f(): List<Int> { return listOf(1, 2) }")), "List.of");
        assert_eq!(
            call_path(&returned("fun f(): Map<String, Int> { return mapOf(\"a\" to 1) }")),
            "Map.of"
        );
        let value = returned("fun f(): MutableList<String> { return mutableListOf() }");
        assert_matches!(value, Expr::New { ref type_ref, ref args, .. } if type_ref.name == "ArrayList" && args.is_empty());
    }

    #[test]
    fn test_size_and_length_become_calls() {
        let value = returned("fun f(xs: List<Int>): Int { return xs.size }");
        assert_eq!(call_path(&value), "xs.size");

        let value = returned("fun f(xs: IntArray): Int { return xs.size }");
        assert_matches!(value, Expr::FieldAccess { ref name, .. } if name == "length");
    }

    #[test]
    fn test_named_arguments_are_reordered() {
        let value = returned(
            "fun box(w: Int, h: Int = 1, d: Int = 2): Int = w * h * d\nfun f(): Int { return box(d = 5, w = 3) }",
        );
        let Expr::Call { args, .. } = value else {
            panic!("expected call");
        };
        let values: Vec<_> = args.iter().map(|arg| arg.value.as_literal().cloned()).collect();
        assert_eq!(
            values,
            vec![
                Some(LiteralValue::Integer("3".into())),
                Some(LiteralValue::Integer("1".into())),
                Some(LiteralValue::Integer("5".into())),
            ]
        );
    }

    #[test]
    fn test_duplicate_named_argument_is_reported() {
        let outcome = transform_source("fun g(x: Int, y: Int = 0): Int = x + y\nfun f(): Int { return g(1, x = 2) }", "T");
        assert_eq!(outcome.error_count(), 1);
        assert_matches!(
            &outcome.issues[0],
            TransformError::UnsupportedConstruct { construct, .. } if construct.contains("'x' passed more than once")
        );
    }

    #[test]
    fn test_safe_chain_has_no_guard_on_primitive_receiver() {
        let value = returned("fun f(a: String?): String? { return a?.length?.toString() }");
        let Expr::Conditional {
            condition, then_value, ..
        } = value
        else {
            panic!("expected conditional");
        };
        assert_matches!(*condition, Expr::Binary { op: BinaryOp::RefNotEq, ref left, .. } if left.as_identifier() == Some("a"));
        assert_eq!(call_path(&then_value), "String.valueOf");
    }

    #[test]
    fn test_primitive_members_map_to_java() {
        let value = returned("fun f(n: Int): String { return n.toString() }");
        assert_eq!(call_path(&value), "String.valueOf");

        let value = returned("fun f(n: Int): Int { return n.plus(1) }");
        assert_matches!(value, Expr::Binary { op: BinaryOp::Add, .. });

        let value = returned("fun f(n: Long): Int { return n.compareTo(2L) }");
        assert_eq!(call_path(&value), "Long.compare");

        let value = returned("fun f(c: Char): Int { return c.code }");
        assert_matches!(value, Expr::Cast { ref type_ref, .. } if type_ref.name == "int");
    }

    #[test]
    fn test_unknown_primitive_member_is_unsupported() {
        let outcome = transform_source("fun f(n: Int): Int { return n.countOneBits() }", "T");
        assert_eq!(outcome.error_count(), 1);
        assert_matches!(
            &outcome.issues[0],
            TransformError::UnsupportedConstruct { construct, .. } if construct.contains("countOneBits")
        );
    }

    #[test]
    fn test_constructor_call_becomes_new() {
        let value = returned("class Point(val x: Int, val y: Int)\nfun f(): Point { return Point(y = 2, x = 1) }");
        assert_matches!(value, Expr::New { ref type_ref, ref args, .. } if type_ref.name == "Point" && args.len() == 2);
    }

    #[test]
    fn test_scope_function_is_unsupported() {
        let outcome = transform_source("fun f(s: String) { s.let { println(it) } }", "T");
        assert_eq!(outcome.error_count(), 1);
        assert_matches!(&outcome.issues[0], TransformError::UnsupportedConstruct { construct, .. } if construct.contains("let"));
    }

    #[test]
    fn test_lambda_gets_implicit_it() {
        let value = returned("fun f(xs: List<Int>): Any { return xs.map { it * 2 } }");
        let Expr::Call { args, .. } = value else {
            panic!("expected call");
        };
        assert_matches!(&args[0].value, Expr::Lambda(lambda) if lambda.params.len() == 1 && lambda.params[0].name == "it");
    }

    #[test]
    fn test_not_null_assertion() {
        let value = returned("fun f(s: String?): String { return s!! }");
        assert_eq!(call_path(&value), "Objects.requireNonNull");
    }

    #[test]
    fn test_extension_call_passes_receiver() {
        let value = returned("fun String.twice(): String = this + this\nfun f(s: String): String { return s.twice() }");
        let Expr::Call { callee, args, .. } = value else {
            panic!("expected call");
        };
        assert_eq!(callee_path(&callee), "twice");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_split_range_returns_other_expressions() {
        let span = Span::dummy();
        let expr = Expr::identifier("xs", span);
        assert_matches!(split_range(expr), Err(Expr::Identifier { .. }));
    }
}
