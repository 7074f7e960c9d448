//! Type mapping and local type inference
//!
//! Kotlin type names are mapped to their Java spelling, boxing where Java
//! needs a reference type (nullable types and generic arguments). Mapping a
//! type that is already Java leaves it unchanged.

use super::{TransformError, Transformer};
use crate::grammar::ast::nodes::*;
use crate::utils::Span;
use std::collections::BTreeSet;

/// Kotlin name, Java primitive, Java box
const PRIMITIVES: &[(&str, &str, &str)] = &[
    ("Int", "int", "Integer"),
    ("Long", "long", "Long"),
    ("Double", "double", "Double"),
    ("Float", "float", "Float"),
    ("Boolean", "boolean", "Boolean"),
    ("Char", "char", "Character"),
    ("Short", "short", "Short"),
    ("Byte", "byte", "Byte"),
];

const PRIMITIVE_ARRAYS: &[(&str, &str)] = &[
    ("IntArray", "int"),
    ("LongArray", "long"),
    ("DoubleArray", "double"),
    ("FloatArray", "float"),
    ("BooleanArray", "boolean"),
    ("CharArray", "char"),
    ("ShortArray", "short"),
    ("ByteArray", "byte"),
];

/// Kotlin collection name, Java name, import
const COLLECTIONS: &[(&str, &str, &str)] = &[
    ("List", "List", "java.util.List"),
    ("MutableList", "List", "java.util.List"),
    ("ArrayList", "ArrayList", "java.util.ArrayList"),
    ("LinkedList", "LinkedList", "java.util.LinkedList"),
    ("Map", "Map", "java.util.Map"),
    ("MutableMap", "Map", "java.util.Map"),
    ("HashMap", "HashMap", "java.util.HashMap"),
    ("LinkedHashMap", "LinkedHashMap", "java.util.LinkedHashMap"),
    ("Set", "Set", "java.util.Set"),
    ("MutableSet", "Set", "java.util.Set"),
    ("HashSet", "HashSet", "java.util.HashSet"),
    ("LinkedHashSet", "LinkedHashSet", "java.util.LinkedHashSet"),
    ("Collection", "Collection", "java.util.Collection"),
    ("MutableCollection", "Collection", "java.util.Collection"),
    ("MutableIterable", "Iterable", ""),
];

fn strip_kotlin_prefix(name: &str) -> &str {
    name.strip_prefix("kotlin.collections.")
        .or_else(|| name.strip_prefix("kotlin."))
        .unwrap_or(name)
}

/// Map a Kotlin type to Java, recording `java.util` imports it needs
pub fn map_type(ty: &TypeRef, imports: &mut BTreeSet<String>) -> TypeRef {
    let name = strip_kotlin_prefix(&ty.name);
    let span = ty.span;

    if ty.array_dims == 0 {
        // `Long`, `Double` and friends are both Kotlin primitives and Java boxes
        if let Some(&(_, primitive, boxed)) = PRIMITIVES
            .iter()
            .find(|(kotlin, primitive, _)| (*kotlin == name && !ty.resolved) || *primitive == name)
        {
            let name = if ty.nullable { boxed } else { primitive };
            return TypeRef::java(name, span);
        }

        match name {
            "Unit" | "Nothing" | "void" => {
                return TypeRef::java(if ty.nullable { "Void" } else { "void" }, span);
            }
            "Any" => return TypeRef::java("Object", span),
            "Array" => {
                let mut element = ty
                    .arguments
                    .first()
                    .map(|arg| map_type_argument(arg, imports))
                    .unwrap_or_else(|| TypeRef::java("Object", span));
                element.array_dims += 1;
                element.span = span;
                return element;
            }
            _ => {}
        }

        if let Some(&(_, element)) = PRIMITIVE_ARRAYS.iter().find(|(kotlin, _)| *kotlin == name) {
            return TypeRef::java(element, span).array_of();
        }
    }

    let java_name = match COLLECTIONS.iter().find(|(kotlin, java, _)| *kotlin == name || *java == name) {
        Some(&(_, java, import)) => {
            if !import.is_empty() {
                imports.insert(import.to_string());
            }
            java
        }
        None => name,
    };

    TypeRef {
        name: java_name.to_string(),
        arguments: ty
            .arguments
            .iter()
            .map(|arg| map_type_argument(arg, imports))
            .collect(),
        nullable: false,
        array_dims: ty.array_dims,
        resolved: true,
        span,
    }
}

/// Generic arguments must be reference types; `*` becomes `?`
pub fn map_type_argument(ty: &TypeRef, imports: &mut BTreeSet<String>) -> TypeRef {
    match ty.name.as_str() {
        "*" | "?" => TypeRef::java("?", ty.span),
        // Diamond marker produced for `new T<>()`
        "" => ty.clone(),
        _ => boxed(map_type(ty, imports)),
    }
}

pub(crate) fn is_primitive(ty: &TypeRef) -> bool {
    ty.array_dims == 0 && PRIMITIVES.iter().any(|(_, primitive, _)| *primitive == ty.name)
}

pub(crate) fn is_void(ty: &TypeRef) -> bool {
    ty.array_dims == 0 && ty.name == "void"
}

pub(crate) fn boxed(ty: TypeRef) -> TypeRef {
    if ty.array_dims > 0 {
        return ty;
    }
    match PRIMITIVES.iter().find(|(_, primitive, _)| *primitive == ty.name) {
        Some(&(_, _, boxed)) => TypeRef::java(boxed, ty.span),
        None if ty.name == "void" => TypeRef::java("Void", ty.span),
        None => ty,
    }
}

pub(crate) fn unboxed(ty: TypeRef) -> TypeRef {
    match PRIMITIVES.iter().find(|(_, _, boxed)| *boxed == ty.name && ty.array_dims == 0) {
        Some(&(_, primitive, _)) => TypeRef::java(primitive, ty.span),
        None => ty,
    }
}

/// Mark an inferred type, and its arguments, as Java
fn resolved(mut ty: TypeRef) -> TypeRef {
    ty.resolved = true;
    ty.arguments = ty.arguments.into_iter().map(resolved).collect();
    ty
}

pub(crate) fn named(name: &str, span: Span) -> TypeRef {
    TypeRef::java(name, span)
}

/// Element type when iterating over `ty`
pub(crate) fn element_type(ty: &TypeRef) -> Option<TypeRef> {
    if ty.array_dims > 0 {
        let mut element = ty.clone();
        element.array_dims -= 1;
        return Some(element);
    }
    match ty.name.as_str() {
        "List" | "ArrayList" | "LinkedList" | "Set" | "HashSet" | "LinkedHashSet" | "Collection"
        | "Iterable" => ty.arguments.first().cloned().filter(|arg| arg.name != "?" && !arg.name.is_empty()),
        "String" => Some(named("char", ty.span)),
        _ => None,
    }
}

pub(crate) fn is_map(ty: &TypeRef) -> bool {
    ty.array_dims == 0 && matches!(ty.name.as_str(), "Map" | "HashMap" | "LinkedHashMap")
}

pub(crate) fn is_list(ty: &TypeRef) -> bool {
    ty.array_dims == 0 && matches!(ty.name.as_str(), "List" | "ArrayList" | "LinkedList")
}

fn numeric_rank(ty: &TypeRef) -> Option<u8> {
    match unboxed(ty.clone()).name.as_str() {
        "double" => Some(4),
        "float" => Some(3),
        "long" => Some(2),
        "int" | "short" | "byte" | "char" => Some(1),
        _ => None,
    }
}

/// Binary numeric promotion
fn promote(left: &TypeRef, right: &TypeRef, span: Span) -> Option<TypeRef> {
    let rank = numeric_rank(left)?.max(numeric_rank(right)?);
    let name = match rank {
        4 => "double",
        3 => "float",
        2 => "long",
        _ => "int",
    };
    Some(named(name, span))
}

/// Java type of a Kotlin literal
pub(crate) fn literal_type(value: &LiteralValue, span: Span) -> Option<TypeRef> {
    let name = match value {
        LiteralValue::Integer(text) if text.ends_with(['L', 'l']) => "long",
        LiteralValue::Integer(_) => "int",
        LiteralValue::Float(text) if text.ends_with(['f', 'F']) => "float",
        LiteralValue::Float(_) => "double",
        LiteralValue::Boolean(_) => "boolean",
        LiteralValue::Char(_) => "char",
        LiteralValue::String(_) => "String",
        LiteralValue::Null => return None,
    };
    Some(named(name, span))
}

/// Return type of well-known members, by name
fn library_method_type(target: Option<&TypeRef>, name: &str, span: Span) -> Option<TypeRef> {
    let simple = match name {
        "toString" | "trim" | "uppercase" | "lowercase" | "toUpperCase" | "toLowerCase" | "substring"
        | "replace" | "repeat" | "joinToString" | "capitalize" | "padStart" | "padEnd" => "String",
        "length" | "size" | "indexOf" | "lastIndexOf" | "toInt" | "compareTo" | "hashCode" | "count" => "int",
        "toLong" => "long",
        "toShort" => "short",
        "toByte" => "byte",
        "plus" | "minus" | "times" | "div" | "rem" | "mod" | "unaryMinus" | "coerceAtLeast" | "coerceAtMost" => {
            return target.filter(|t| is_primitive(t)).cloned();
        }
        "toDouble" => "double",
        "toFloat" => "float",
        "toChar" => "char",
        "equals" | "contains" | "containsKey" | "containsValue" | "isEmpty" | "isNotEmpty" | "isBlank"
        | "isNotBlank" | "startsWith" | "endsWith" | "any" | "all" | "none" | "add" | "remove" => "boolean",
        "get" | "first" | "last" | "getOrNull" | "firstOrNull" | "lastOrNull" | "removeAt" => {
            let target = target?;
            if target.name == "String" {
                return Some(named("char", span));
            }
            if is_map(target) {
                return target.arguments.get(1).cloned();
            }
            return element_type(target).map(boxed);
        }
        _ => return None,
    };
    Some(named(simple, span))
}

impl Transformer {
    pub(super) fn java_type(&mut self, ty: &TypeRef) -> TypeRef {
        map_type(ty, &mut self.imports)
    }

    /// Declared type, else the initializer's type, else `Object`
    pub(super) fn resolve_type(
        &mut self,
        declared: Option<&TypeRef>,
        value: Option<&Expr>,
        name: &str,
        span: Span,
    ) -> TypeRef {
        if let Some(declared) = declared {
            return self.java_type(declared);
        }
        if let Some(ty) = value.and_then(|value| self.infer(value)) {
            if is_void(&ty) {
                return named("Object", span);
            }
            if let Some(import) = COLLECTIONS.iter().find(|(_, java, _)| *java == ty.name).map(|c| c.2) {
                if !import.is_empty() {
                    self.imports.insert(import.to_string());
                }
            }
            return resolved(ty);
        }
        self.fallback_type(name, span)
    }

    pub(super) fn fallback_type(&mut self, name: &str, span: Span) -> TypeRef {
        if self.preferences.warn_on_type_fallback {
            self.report(TransformError::TypeFallback {
                name: name.to_string(),
                span,
            });
        }
        named("Object", span)
    }

    /// Java type of a Kotlin or already-transformed expression, when known
    pub(super) fn infer(&self, expr: &Expr) -> Option<TypeRef> {
        let span = expr.span();
        match expr {
            Expr::Literal(lit) => literal_type(&lit.value, span),
            Expr::StringTemplate { .. } => Some(named("String", span)),
            Expr::Identifier { name, .. } => self.lookup(name),
            Expr::Binary { op, left, right, .. } => {
                if op.is_comparison() || op.is_logical() {
                    return Some(named("boolean", span));
                }
                if *op == BinaryOp::RangeTo {
                    return None;
                }
                let left = self.infer(left);
                let right = self.infer(right);
                if *op == BinaryOp::Add
                    && [&left, &right].iter().any(|t| t.as_ref().is_some_and(|t| t.name == "String"))
                {
                    return Some(named("String", span));
                }
                promote(left.as_ref()?, right.as_ref()?, span)
            }
            Expr::Unary { op, operand, .. } => match op {
                UnaryOp::Not => Some(named("boolean", span)),
                UnaryOp::NotNullAssert => self.infer(operand).map(unboxed),
                _ => self.infer(operand),
            },
            Expr::Paren { inner, .. } => self.infer(inner),
            Expr::Conditional {
                then_value,
                else_value,
                ..
            } => self.infer(then_value).or_else(|| self.infer(else_value)),
            Expr::TypeCheck { .. } => Some(named("boolean", span)),
            Expr::Cast { type_ref, safe, .. } => {
                let ty = map_type(type_ref, &mut BTreeSet::new());
                Some(if *safe { boxed(ty) } else { ty })
            }
            Expr::New { type_ref, .. } => Some(type_ref.clone()),
            Expr::Call { callee, args, .. } => self.call_type(callee, args),
            Expr::FieldAccess { target, name, .. } => self.property_type(target, name),
            Expr::Index { target, .. } => {
                let target = self.infer(target)?;
                library_method_type(Some(&target), "get", span)
            }
            Expr::SafeCall {
                target, name, args, ..
            } => {
                let target = self.infer(target);
                let member = match args {
                    Some(_) => self.member_method_type(target.as_ref(), name, span),
                    None => self.member_property_type(target.as_ref(), name, span),
                };
                member.map(boxed)
            }
            Expr::Elvis { value, default, .. } => match default.as_ref() {
                Expr::Jump { .. } => self.infer(value),
                default => self.infer(default).or_else(|| self.infer(value)),
            },
            Expr::If(if_expr) => if_expr
                .then_branch
                .as_single_expression()
                .and_then(|e| self.infer(e))
                .or_else(|| match &if_expr.else_branch {
                    Some(ElseBranch::Block(block)) => block.as_single_expression().and_then(|e| self.infer(e)),
                    Some(ElseBranch::If(nested)) => self.infer(&Expr::If(nested.as_ref().clone())),
                    None => None,
                }),
            Expr::When(when) => when
                .branches
                .iter()
                .map(|branch| &branch.body)
                .chain(when.else_branch.iter())
                .find_map(|body| body.as_single_expression().and_then(|e| self.infer(e))),
            Expr::Assign { .. }
            | Expr::Lambda(_)
            | Expr::Super { .. }
            | Expr::Jump { .. }
            | Expr::Placeholder { .. } => None,
        }
    }

    /// Type of a name visible at this point
    pub(super) fn lookup(&self, name: &str) -> Option<TypeRef> {
        if let Some(ty) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return Some(ty.clone());
        }
        if name == "this" {
            return self.current_class.as_ref().map(|class| named(class, Span::dummy()));
        }
        let class_field = |class: &str| self.classes.get(class).and_then(|info| info.fields.get(name)).cloned();
        self.current_class
            .as_deref()
            .and_then(class_field)
            .or_else(|| class_field(&self.holder_name))
    }

    fn property_type(&self, target: &Expr, name: &str) -> Option<TypeRef> {
        let span = target.span();
        if let Some(class) = target.as_identifier().filter(|n| self.lookup(n).is_none()) {
            if let Some(info) = self.classes.get(class) {
                if info.enum_entries.iter().any(|entry| entry == name) {
                    return Some(named(class, span));
                }
                return info.fields.get(name).cloned();
            }
        }
        let target = self.infer(target);
        self.member_property_type(target.as_ref(), name, span)
    }

    fn member_property_type(&self, target: Option<&TypeRef>, name: &str, span: Span) -> Option<TypeRef> {
        if let Some(info) = target.and_then(|t| self.classes.get(&t.name)) {
            if let Some(field) = info.fields.get(name) {
                return Some(field.clone());
            }
        }
        match name {
            "size" | "length" => Some(named("int", span)),
            _ => None,
        }
    }

    fn member_method_type(&self, target: Option<&TypeRef>, name: &str, span: Span) -> Option<TypeRef> {
        if let Some(info) = target.and_then(|t| self.classes.get(&t.name)) {
            if let Some(method) = info.methods.get(name) {
                return Some(method.clone());
            }
        }
        if let Some(signature) = self.functions.get(name).filter(|s| s.extension) {
            return signature.return_type.clone();
        }
        library_method_type(target, name, span)
    }

    fn call_type(&self, callee: &Expr, args: &[Argument]) -> Option<TypeRef> {
        let span = callee.span();
        let first_arg = args.first().and_then(|arg| self.infer(&arg.value));
        let element = || first_arg.clone().map(boxed).unwrap_or_else(|| named("Object", span));

        match callee {
            Expr::Identifier { name, .. } => match name.as_str() {
                "println" | "print" => Some(named("void", span)),
                "listOf" | "mutableListOf" | "arrayListOf" | "emptyList" => {
                    Some(named("List", span).with_arguments(vec![element()]))
                }
                "setOf" | "mutableSetOf" | "hashSetOf" | "emptySet" => {
                    Some(named("Set", span).with_arguments(vec![element()]))
                }
                "mapOf" | "mutableMapOf" | "hashMapOf" | "emptyMap" => {
                    let pair = args.first().and_then(|arg| match &arg.value {
                        Expr::Call { callee, args, .. } => match callee.as_ref() {
                            Expr::FieldAccess { target, name, .. } if name == "to" => Some((
                                self.infer(target),
                                args.first().and_then(|arg| self.infer(&arg.value)),
                            )),
                            _ => None,
                        },
                        _ => None,
                    });
                    let (key, value) = pair.unwrap_or((None, None));
                    let object = || named("Object", span);
                    Some(named("Map", span).with_arguments(vec![
                        key.map(boxed).unwrap_or_else(object),
                        value.map(boxed).unwrap_or_else(object),
                    ]))
                }
                "maxOf" | "minOf" => first_arg.clone(),
                _ if self.lookup(name).is_some() => None,
                _ => {
                    if let Some(signature) = self.functions.get(name) {
                        return signature.return_type.clone();
                    }
                    if name.starts_with(char::is_uppercase) {
                        return Some(named(name, span));
                    }
                    None
                }
            },
            Expr::FieldAccess { target, name, .. } => {
                if target.as_identifier() == Some("Objects") && name == "equals" {
                    return Some(named("boolean", span));
                }
                if let Some(class) = target.as_identifier().filter(|n| self.lookup(n).is_none()) {
                    if let Some(method) = self.classes.get(class).and_then(|info| info.methods.get(name)) {
                        return Some(method.clone());
                    }
                }
                let target = self.infer(target);
                self.member_method_type(target.as_ref(), name, span)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kotlin(name: &str) -> TypeRef {
        TypeRef::simple(name, Span::dummy())
    }

    fn nullable(name: &str) -> TypeRef {
        TypeRef {
            nullable: true,
            ..kotlin(name)
        }
    }

    #[test]
    fn test_primitive_mapping() {
        let mut imports = BTreeSet::new();
        assert_eq!(map_type(&kotlin("Int"), &mut imports).to_string(), "int");
        assert_eq!(map_type(&nullable("Int"), &mut imports).to_string(), "Integer");
        assert_eq!(map_type(&kotlin("Boolean"), &mut imports).to_string(), "boolean");
        assert_eq!(map_type(&kotlin("Unit"), &mut imports).to_string(), "void");
        assert_eq!(map_type(&kotlin("Any"), &mut imports).to_string(), "Object");
        assert_eq!(map_type(&nullable("String"), &mut imports).to_string(), "String");
        assert_eq!(map_type(&kotlin("kotlin.Long"), &mut imports).to_string(), "long");
        assert!(imports.is_empty());
    }

    #[test]
    fn test_collection_mapping_boxes_arguments() {
        let mut imports = BTreeSet::new();
        let list = kotlin("MutableList").with_arguments(vec![kotlin("Int")]);
        assert_eq!(map_type(&list, &mut imports).to_string(), "List<Integer>");

        let map = kotlin("Map").with_arguments(vec![kotlin("String"), kotlin("*")]);
        assert_eq!(map_type(&map, &mut imports).to_string(), "Map<String, ?>");

        assert_eq!(
            imports.into_iter().collect::<Vec<_>>(),
            vec!["java.util.List".to_string(), "java.util.Map".to_string()]
        );
    }

    #[test]
    fn test_array_mapping() {
        let mut imports = BTreeSet::new();
        assert_eq!(map_type(&kotlin("IntArray"), &mut imports).to_string(), "int[]");
        let array = kotlin("Array").with_arguments(vec![kotlin("Int")]);
        assert_eq!(map_type(&array, &mut imports).to_string(), "Integer[]");
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let mut imports = BTreeSet::new();
        let kotlin_types = [
            kotlin("Int"),
            nullable("Double"),
            nullable("Long"),
            nullable("Boolean"),
            kotlin("List").with_arguments(vec![nullable("Char"), nullable("Short")]),
            kotlin("Array").with_arguments(vec![kotlin("String")]),
            kotlin("Unit"),
        ];
        for ty in kotlin_types {
            let once = map_type(&ty, &mut imports);
            let twice = map_type(&once, &mut imports);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_java_box_is_not_unboxed() {
        let mut imports = BTreeSet::new();
        let boxed = map_type(&nullable("Double"), &mut imports);
        assert_eq!(boxed.to_string(), "Double");
        assert!(boxed.resolved);
        assert_eq!(map_type(&boxed, &mut imports).to_string(), "Double");
        assert_eq!(map_type(&kotlin("Double"), &mut imports).to_string(), "double");
    }

    #[test]
    fn test_element_type() {
        let list = kotlin("List").with_arguments(vec![kotlin("Integer")]);
        assert_eq!(element_type(&list).map(|t| t.name), Some("Integer".to_string()));
        assert_eq!(element_type(&kotlin("int").array_of()).map(|t| t.name), Some("int".to_string()));
        assert_eq!(element_type(&kotlin("String")).map(|t| t.name), Some("char".to_string()));
        assert_eq!(element_type(&kotlin("Object")), None);
    }

    #[test]
    fn test_literal_types() {
        let span = Span::dummy();
        let long = literal_type(&LiteralValue::Integer("10L".into()), span);
        assert_eq!(long.map(|t| t.name), Some("long".to_string()));
        let float = literal_type(&LiteralValue::Float("1.5f".into()), span);
        assert_eq!(float.map(|t| t.name), Some("float".to_string()));
        assert!(literal_type(&LiteralValue::Null, span).is_none());
    }
}
