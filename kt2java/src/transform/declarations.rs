//! Classes, functions and properties
//!
//! Primary constructors become fields plus a constructor, companions and
//! objects become static members, data classes gain `equals`, `hashCode`
//! and `toString`, and trailing default parameters become overloads.

use super::types::{is_primitive, is_void, named};
use super::{ClassInfo, FunctionSignature, ParamSig, TransformError, Transformer};
use crate::grammar::ast::nodes::*;
use crate::utils::Span;

/// Where a member function lives
#[derive(Debug, Clone, Copy, Default)]
struct MemberContext {
    is_static: bool,
    in_interface: bool,
}

impl Transformer {
    // ========================================================================
    // DECLARATION COLLECTION
    // ========================================================================

    /// Record signatures and field types before any body is rewritten, so
    /// calls and references can be resolved regardless of source order
    pub(super) fn collect_declarations(&mut self, declarations: &[Declaration]) {
        let mut holder = self.classes.remove(&self.holder_name).unwrap_or_default();

        for declaration in declarations {
            match declaration {
                Declaration::Function(function) => {
                    let signature = self.signature(function);
                    if function.receiver.is_none() {
                        if let Some(return_type) = &signature.return_type {
                            holder.methods.insert(function.name.clone(), return_type.clone());
                        }
                    }
                    self.functions.entry(function.name.clone()).or_insert(signature);
                }
                Declaration::Variable(variable) => {
                    if let Some(declared) = &variable.type_ref {
                        let ty = self.java_type(declared);
                        holder.fields.insert(variable.name.clone(), ty);
                    }
                }
                Declaration::Class(class) => self.collect_class(class),
            }
        }

        match self.classes.get_mut(&self.holder_name) {
            Some(existing) => {
                existing.fields.extend(holder.fields);
                existing.methods.extend(holder.methods);
            }
            None => {
                self.classes.insert(self.holder_name.clone(), holder);
            }
        }

        self.infer_signatures(declarations);
    }

    fn signature(&mut self, function: &FunctionDecl) -> FunctionSignature {
        let return_type = match (&function.return_type, &function.body) {
            (Some(declared), _) => Some(self.java_type(declared)),
            (None, FunctionBody::Expression(_)) => None,
            (None, _) => Some(named("void", function.span)),
        };
        FunctionSignature {
            params: param_signatures(&function.params),
            return_type,
            extension: function.receiver.is_some(),
        }
    }

    fn collect_class(&mut self, class: &ClassDecl) {
        let mut info = ClassInfo {
            type_params: class.type_params.clone(),
            constructor: param_signatures(&class.constructor_params),
            enum_entries: class.enum_entries.iter().map(|e| e.name.clone()).collect(),
            ..ClassInfo::default()
        };

        for param in class.constructor_params.iter().filter(|p| p.property.is_some()) {
            if let Some(declared) = &param.type_ref {
                let ty = self.java_type(declared);
                info.fields.insert(param.name.clone(), ty);
            }
        }

        for member in class.members.iter().chain(&class.companion) {
            match member {
                Declaration::Function(function) if function.kind == FunctionKind::Constructor => {
                    if info.constructor.is_empty() {
                        info.constructor = param_signatures(&function.params);
                    }
                }
                Declaration::Function(function) => {
                    if let Some(return_type) = self.signature(function).return_type {
                        info.methods.insert(function.name.clone(), return_type);
                    }
                }
                Declaration::Variable(variable) => {
                    if let Some(declared) = &variable.type_ref {
                        let ty = self.java_type(declared);
                        info.fields.insert(variable.name.clone(), ty);
                    }
                }
                Declaration::Class(nested) => self.collect_class(nested),
            }
        }

        self.classes.insert(class.name.clone(), info);
    }

    /// Fill in types that depend on other declarations: expression-bodied
    /// return types and untyped property initializers
    fn infer_signatures(&mut self, declarations: &[Declaration]) {
        let holder = self.holder_name.clone();
        for declaration in declarations {
            match declaration {
                Declaration::Function(function) => {
                    if let Some(return_type) = self.infer_return_type(function, &holder) {
                        if let Some(signature) = self.functions.get_mut(&function.name) {
                            signature.return_type.get_or_insert(return_type.clone());
                        }
                        if function.receiver.is_none() {
                            self.record_method(&holder, &function.name, return_type);
                        }
                    }
                }
                Declaration::Variable(variable) => self.infer_field(&holder, variable, &[]),
                Declaration::Class(class) => self.infer_class(class),
            }
        }
    }

    fn infer_class(&mut self, class: &ClassDecl) {
        for member in class.members.iter().chain(&class.companion) {
            match member {
                Declaration::Function(function) => {
                    if let Some(return_type) = self.infer_return_type(function, &class.name) {
                        self.record_method(&class.name, &function.name, return_type);
                    }
                }
                Declaration::Variable(variable) => {
                    self.infer_field(&class.name, variable, &class.constructor_params)
                }
                Declaration::Class(nested) => self.infer_class(nested),
            }
        }
    }

    fn infer_return_type(&mut self, function: &FunctionDecl, owner: &str) -> Option<TypeRef> {
        let FunctionBody::Expression(body) = &function.body else {
            return None;
        };
        if function.return_type.is_some() {
            return None;
        }
        let saved = self.current_class.replace(owner.to_string());
        let inferred = self.with_scope(|t| {
            t.declare_params(&function.params);
            if let Some(receiver) = &function.receiver {
                let ty = t.java_type(receiver);
                t.declare("this", ty);
            }
            t.infer(body)
        });
        self.current_class = saved;
        inferred
    }

    fn infer_field(&mut self, owner: &str, variable: &VariableDecl, params: &[Parameter]) {
        if variable.type_ref.is_some() {
            return;
        }
        let Some(initializer) = &variable.initializer else {
            return;
        };
        let saved = self.current_class.replace(owner.to_string());
        let inferred = self.with_scope(|t| {
            t.declare_params(params);
            t.infer(initializer)
        });
        self.current_class = saved;
        if let (Some(ty), Some(info)) = (inferred, self.classes.get_mut(owner)) {
            info.fields.entry(variable.name.clone()).or_insert(ty);
        }
    }

    fn record_method(&mut self, owner: &str, name: &str, return_type: TypeRef) {
        if let Some(info) = self.classes.get_mut(owner) {
            info.methods.entry(name.to_string()).or_insert(return_type);
        }
    }

    fn declare_params(&mut self, params: &[Parameter]) {
        for param in params {
            let ty = match &param.type_ref {
                Some(declared) => self.java_type(declared),
                None => named("Object", param.span),
            };
            self.declare(&param.name, ty);
        }
    }

    // ========================================================================
    // CLASSES
    // ========================================================================

    pub(super) fn transform_class(&mut self, class: ClassDecl, nested: bool) -> ClassDecl {
        let saved_class = self.current_class.replace(class.name.clone());
        let saved_extension = std::mem::replace(&mut self.in_extension, false);
        let result = self.with_scope(|t| t.transform_class_body(class, nested));
        self.in_extension = saved_extension;
        self.current_class = saved_class;
        result
    }

    fn transform_class_body(&mut self, class: ClassDecl, nested: bool) -> ClassDecl {
        let ClassDecl {
            kind,
            name,
            type_params,
            mut modifiers,
            constructor_params,
            supertypes,
            members,
            init_blocks,
            companion,
            enum_entries,
            span,
        } = class;

        let is_object = kind == ClassKind::Object;
        let kind = if is_object { ClassKind::Class } else { kind };
        let is_interface = kind == ClassKind::Interface;

        modifiers.visibility.get_or_insert(Visibility::Public);
        modifiers.is_static = nested && kind == ClassKind::Class;
        modifiers.is_final = kind == ClassKind::Class && !modifiers.is_open && !modifiers.is_abstract;
        modifiers.is_override = false;
        modifiers.is_default = false;
        modifiers.is_enum = false;
        let is_data = std::mem::take(&mut modifiers.is_data);

        let params: Vec<Parameter> = constructor_params
            .into_iter()
            .map(|param| self.transform_param(param))
            .collect();

        let mut constructor_body = Vec::new();
        let supertypes = supertypes
            .into_iter()
            .map(|supertype| {
                let type_ref = self.java_type(&supertype.type_ref);
                let constructor_args = match supertype.constructor_args {
                    Some(args) if kind == ClassKind::Class => {
                        if !args.is_empty() {
                            let signature = self.classes.get(&type_ref.name).map(|c| c.constructor.clone());
                            let args = self.transform_arguments(args, signature.as_deref(), supertype.span);
                            constructor_body.push(Stmt::Expression(Expr::Call {
                                callee: Box::new(Expr::Super { span: supertype.span }),
                                args,
                                span: supertype.span,
                            }));
                        }
                        Some(Vec::new())
                    }
                    Some(_) | None => None,
                };
                SuperType {
                    type_ref,
                    constructor_args,
                    span: supertype.span,
                }
            })
            .collect();

        let enum_entries = enum_entries
            .into_iter()
            .map(|entry| {
                let signature = self.classes.get(&name).map(|c| c.constructor.clone());
                let args = self.transform_arguments(entry.args, signature.as_deref(), entry.span);
                EnumEntry { args, ..entry }
            })
            .collect();

        let mut fields = Vec::new();
        for param in params.iter() {
            let Some(mutability) = param.property else {
                continue;
            };
            fields.push(Declaration::Variable(VariableDecl {
                name: param.name.clone(),
                mutability,
                modifiers: Modifiers {
                    visibility: Some(Visibility::Public),
                    is_final: mutability == Mutability::Immutable,
                    ..Modifiers::default()
                },
                type_ref: param.type_ref.clone(),
                initializer: None,
                span: param.span,
            }));
            constructor_body.push(Stmt::Expression(this_assignment(&param.name, param.span)));
        }
        let data_properties: Vec<Parameter> = params.iter().filter(|p| p.property.is_some()).cloned().collect();

        // Property initializers and init blocks run in source order
        let move_initializers = !params.is_empty() || !init_blocks.is_empty();
        let mut initialization: Vec<(usize, Vec<Stmt>)> = Vec::new();
        for block in init_blocks {
            let offset = block.span.start().offset;
            let block = self.transform_block(block);
            let declares_locals = block.statements.iter().any(|s| matches!(s, Stmt::Variable(_)));
            let statements = if declares_locals {
                vec![Stmt::Block(block)]
            } else {
                block.statements
            };
            initialization.push((offset, statements));
        }

        let mut others = Vec::new();
        let sources = members
            .into_iter()
            .map(|member| (member, false))
            .chain(companion.into_iter().map(|member| (member, true)));
        for (member, from_companion) in sources {
            match member {
                Declaration::Variable(variable) => {
                    if is_interface {
                        self.report(TransformError::unsupported(
                            format!("interface property '{}'", variable.name),
                            variable.span,
                        ));
                        continue;
                    }
                    let is_static = variable.modifiers.is_static || is_object || from_companion;
                    let offset = variable.span.start().offset;
                    let (field, assignment) = self.transform_field(variable, is_static, move_initializers && !is_static);
                    if let Some(assignment) = assignment {
                        initialization.push((offset, vec![assignment]));
                    }
                    fields.push(Declaration::Variable(field));
                }
                Declaration::Function(function) => {
                    let context = MemberContext {
                        is_static: (is_object || from_companion) && function.kind == FunctionKind::Method,
                        in_interface: is_interface,
                    };
                    others.extend(self.transform_function(function, context));
                }
                Declaration::Class(nested_class) => {
                    others.push(Declaration::Class(self.transform_class(nested_class, true)));
                }
            }
        }

        initialization.sort_by_key(|(offset, _)| *offset);
        constructor_body.extend(initialization.into_iter().flat_map(|(_, statements)| statements));

        let mut constructors = Vec::new();
        let needs_constructor = !params.is_empty() || !constructor_body.is_empty() || is_object;
        if needs_constructor && !is_interface {
            let visibility = if is_object || kind == ClassKind::Enum {
                Visibility::Private
            } else {
                Visibility::Public
            };
            let constructor = FunctionDecl {
                kind: FunctionKind::Constructor,
                name: name.clone(),
                type_params: Vec::new(),
                modifiers: Modifiers {
                    visibility: Some(visibility),
                    ..Modifiers::default()
                },
                receiver: None,
                params: params
                    .into_iter()
                    .map(|param| Parameter {
                        property: None,
                        ..param
                    })
                    .collect(),
                return_type: None,
                body: FunctionBody::Block(Block::new(constructor_body, span)),
                span,
            };
            constructors = self.with_default_overloads(constructor, MemberContext::default());
        }

        let mut generated = Vec::new();
        if is_data {
            let defined = |method: &str| {
                others
                    .iter()
                    .any(|d| matches!(d, Declaration::Function(f) if f.name == method))
            };
            let skip_equals = defined("equals");
            let skip_hash = defined("hashCode");
            let skip_string = defined("toString");
            if !skip_equals {
                generated.push(self.data_equals(&name, &type_params, &data_properties, span));
            }
            if !skip_hash {
                generated.push(self.data_hash_code(&data_properties, span));
            }
            if !skip_string {
                generated.push(data_to_string(&name, &data_properties, span));
            }
        }

        let mut all_members = fields;
        all_members.extend(constructors);
        all_members.extend(others);
        all_members.extend(generated.into_iter().map(Declaration::Function));

        ClassDecl {
            kind,
            name,
            type_params,
            modifiers,
            constructor_params: Vec::new(),
            supertypes,
            members: all_members,
            init_blocks: Vec::new(),
            companion: Vec::new(),
            enum_entries,
            span,
        }
    }

    /// Field declaration, plus the constructor assignment its initializer
    /// moves into when `move_initializer` is set
    fn transform_field(
        &mut self,
        variable: VariableDecl,
        is_static: bool,
        move_initializer: bool,
    ) -> (VariableDecl, Option<Stmt>) {
        let VariableDecl {
            name,
            mutability,
            mut modifiers,
            type_ref,
            initializer,
            span,
        } = variable;

        let type_ref = self.resolve_type(type_ref.as_ref(), initializer.as_ref(), &name, span);
        modifiers.visibility.get_or_insert(Visibility::Public);
        modifiers.is_static = is_static;
        modifiers.is_final = mutability == Mutability::Immutable;

        let initializer = initializer.map(|value| self.transform_expr(value));
        let (initializer, assignment) = match initializer {
            Some(value) if move_initializer => {
                let target = Expr::field(Expr::identifier("this", span), name.clone(), span);
                let assignment = Expr::Assign {
                    target: Box::new(target),
                    op: AssignOp::Assign,
                    value: Box::new(value),
                    span,
                };
                (None, Some(Stmt::Expression(assignment)))
            }
            other => (other, None),
        };

        let field = VariableDecl {
            name,
            mutability,
            modifiers,
            type_ref: Some(type_ref),
            initializer,
            span,
        };
        (field, assignment)
    }

    // ========================================================================
    // FUNCTIONS
    // ========================================================================

    fn transform_function(&mut self, function: FunctionDecl, context: MemberContext) -> Vec<Declaration> {
        self.with_scope(|t| t.transform_function_in_scope(function, context))
    }

    fn transform_function_in_scope(&mut self, function: FunctionDecl, context: MemberContext) -> Vec<Declaration> {
        let FunctionDecl {
            kind,
            name,
            type_params,
            mut modifiers,
            receiver,
            params,
            return_type,
            body,
            span,
        } = function;

        modifiers.visibility.get_or_insert(Visibility::Public);
        modifiers.is_static = kind == FunctionKind::Method && (modifiers.is_static || context.is_static);
        modifiers.is_final = false;

        let is_extension = receiver.is_some();
        let mut java_params = Vec::new();
        if let Some(receiver) = receiver {
            let ty = self.java_type(&receiver);
            self.declare("receiver", ty.clone());
            self.declare("this", ty.clone());
            java_params.push(Parameter {
                name: "receiver".to_string(),
                type_ref: Some(ty),
                default: None,
                property: None,
                vararg: false,
                span: receiver.span,
            });
        }
        for param in params {
            let param = self.transform_param(param);
            java_params.push(Parameter { property: None, ..param });
        }

        if name == "main" && java_params.is_empty() && modifiers.is_static && kind == FunctionKind::Method {
            let args_type = named("String", span).array_of();
            self.declare("args", args_type.clone());
            java_params.push(Parameter {
                name: "args".to_string(),
                type_ref: Some(args_type),
                default: None,
                property: None,
                vararg: false,
                span,
            });
        }

        let return_type = match kind {
            FunctionKind::Constructor => None,
            FunctionKind::Method => Some(match (&return_type, &body) {
                (Some(declared), _) => self.java_type(declared),
                (None, FunctionBody::Expression(expr)) => match self.infer(expr) {
                    Some(ty) => ty,
                    None => self.fallback_type(&name, span),
                },
                (None, _) => named("void", span),
            }),
        };
        let returns_value = return_type.as_ref().is_some_and(|ty| !is_void(ty));

        let saved_extension = std::mem::replace(&mut self.in_extension, is_extension);
        let body = match body {
            FunctionBody::Block(block) => FunctionBody::Block(self.transform_block(block)),
            FunctionBody::Expression(expr) => {
                let expr_span = expr.span();
                let statement = if returns_value {
                    Stmt::Return {
                        value: Some(expr),
                        span: expr_span,
                    }
                } else {
                    Stmt::Expression(expr)
                };
                FunctionBody::Block(self.transform_block(Block::new(vec![statement], expr_span)))
            }
            FunctionBody::None => FunctionBody::None,
        };
        self.in_extension = saved_extension;

        if context.in_interface {
            modifiers.is_default = !matches!(body, FunctionBody::None) && !modifiers.is_static;
            modifiers.is_abstract = false;
        } else if matches!(body, FunctionBody::None) {
            modifiers.is_abstract = true;
        }

        let function = FunctionDecl {
            kind,
            name,
            type_params,
            modifiers,
            receiver: None,
            params: java_params,
            return_type,
            body,
            span,
        };
        self.with_default_overloads(function, context)
    }

    /// Maps the parameter's type and brings it into scope; the Kotlin
    /// default stays attached for overload generation
    fn transform_param(&mut self, param: Parameter) -> Parameter {
        let ty = match &param.type_ref {
            Some(declared) => self.java_type(declared),
            None => self.fallback_type(&param.name, param.span),
        };
        let scope_type = if param.vararg { ty.clone().array_of() } else { ty.clone() };
        self.declare(&param.name, scope_type);
        Parameter {
            type_ref: Some(ty),
            ..param
        }
    }

    /// `function` followed by one overload per droppable trailing default;
    /// each overload forwards to the full signature
    fn with_default_overloads(&mut self, mut function: FunctionDecl, context: MemberContext) -> Vec<Declaration> {
        if function.params.iter().all(|p| p.default.is_none()) {
            return vec![Declaration::Function(function)];
        }

        let defaults: Vec<Option<Expr>> = function.params.iter_mut().map(|p| p.default.take()).collect();
        let trailing = defaults.iter().rev().take_while(|d| d.is_some()).count();
        let total = function.params.len();
        let span = function.span;
        let returns_value = function.return_type.as_ref().is_some_and(|ty| !is_void(ty));

        let mut overloads = vec![Declaration::Function(function.clone())];
        for kept in (total - trailing..total).rev() {
            let mut args: Vec<Expr> = function.params[..kept]
                .iter()
                .map(|p| Expr::identifier(p.name.clone(), p.span))
                .collect();
            for default in defaults[kept..].iter().flatten() {
                args.push(self.transform_expr(default.clone()));
            }

            let (callee, statement_is_call) = match function.kind {
                FunctionKind::Constructor => (Expr::identifier("this", span), true),
                FunctionKind::Method => (Expr::identifier(function.name.clone(), span), !returns_value),
            };
            let call = Expr::call(callee, args, span);
            let statement = if statement_is_call {
                Stmt::Expression(call)
            } else {
                Stmt::Return {
                    value: Some(call),
                    span,
                }
            };

            let mut modifiers = function.modifiers.clone();
            modifiers.is_override = false;
            modifiers.is_abstract = false;
            modifiers.is_default = context.in_interface && !modifiers.is_static;

            overloads.push(Declaration::Function(FunctionDecl {
                modifiers,
                params: function.params[..kept].to_vec(),
                body: FunctionBody::Block(Block::new(vec![statement], span)),
                ..function.clone()
            }));
        }
        overloads
    }

    // ========================================================================
    // DATA CLASSES
    // ========================================================================

    fn data_equals(
        &mut self,
        class_name: &str,
        type_params: &[Identifier],
        properties: &[Parameter],
        span: Span,
    ) -> FunctionDecl {
        self.imports.insert("java.util.Objects".to_string());

        let class_type = named(class_name, span)
            .with_arguments(type_params.iter().map(|_| named("?", span)).collect());
        let identifier = |name: &str| Expr::identifier(name, span);
        let boolean = |value: bool| Expr::literal(LiteralValue::Boolean(value), span);
        let early_return = |condition: Expr, value: bool| {
            Stmt::Expression(Expr::If(IfExpr {
                condition: Box::new(condition),
                then_branch: Block::new(
                    vec![Stmt::Return {
                        value: Some(boolean(value)),
                        span,
                    }],
                    span,
                ),
                else_branch: None,
                span,
            }))
        };

        let same_instance = early_return(
            Expr::binary(BinaryOp::RefEq, identifier("this"), identifier("o"), span),
            true,
        );
        let wrong_type = early_return(
            Expr::TypeCheck {
                value: Box::new(identifier("o")),
                type_ref: class_type.clone(),
                negated: true,
                span,
            },
            false,
        );
        let other = Stmt::Variable(VariableDecl {
            name: "other".to_string(),
            mutability: Mutability::Immutable,
            modifiers: Modifiers {
                is_final: true,
                ..Modifiers::default()
            },
            type_ref: Some(class_type.clone()),
            initializer: Some(Expr::Cast {
                value: Box::new(identifier("o")),
                type_ref: class_type,
                safe: false,
                span,
            }),
            span,
        });

        let comparison = properties
            .iter()
            .map(|property| {
                let mine = identifier(&property.name);
                let theirs = Expr::field(identifier("other"), property.name.clone(), span);
                match property.type_ref.as_ref() {
                    Some(ty) if ty.name == "double" || ty.name == "float" => {
                        let compare = if ty.name == "double" { "Double.compare" } else { "Float.compare" };
                        Expr::binary(
                            BinaryOp::RefEq,
                            Expr::static_call(compare, vec![mine, theirs], span),
                            Expr::literal(LiteralValue::Integer("0".into()), span),
                            span,
                        )
                    }
                    Some(ty) if is_primitive(ty) => Expr::binary(BinaryOp::RefEq, mine, theirs, span),
                    _ => Expr::static_call("Objects.equals", vec![mine, theirs], span),
                }
            })
            .reduce(|left, right| Expr::binary(BinaryOp::And, left, right, span))
            .unwrap_or_else(|| boolean(true));

        generated_method(
            "equals",
            named("boolean", span),
            vec![Parameter {
                name: "o".to_string(),
                type_ref: Some(named("Object", span)),
                default: None,
                property: None,
                vararg: false,
                span,
            }],
            vec![
                same_instance,
                wrong_type,
                other,
                Stmt::Return {
                    value: Some(comparison),
                    span,
                },
            ],
            span,
        )
    }

    fn data_hash_code(&mut self, properties: &[Parameter], span: Span) -> FunctionDecl {
        self.imports.insert("java.util.Objects".to_string());
        let fields = properties
            .iter()
            .map(|property| Expr::identifier(property.name.clone(), span))
            .collect();
        generated_method(
            "hashCode",
            named("int", span),
            Vec::new(),
            vec![Stmt::Return {
                value: Some(Expr::static_call("Objects.hash", fields, span)),
                span,
            }],
            span,
        )
    }
}

/// `Point(x=1, y=2)` rendering
fn data_to_string(class_name: &str, properties: &[Parameter], span: Span) -> FunctionDecl {
    let mut parts = Vec::new();
    for (index, property) in properties.iter().enumerate() {
        let separator = if index == 0 { "" } else { ", " };
        let prefix = if index == 0 { format!("{}(", class_name) } else { String::new() };
        parts.push(Expr::string(format!("{}{}{}=", prefix, separator, property.name), span));
        parts.push(Expr::identifier(property.name.clone(), span));
    }
    if parts.is_empty() {
        parts.push(Expr::string(format!("{}(", class_name), span));
    }
    parts.push(Expr::string(")", span));

    let value = parts
        .into_iter()
        .reduce(|left, right| Expr::binary(BinaryOp::Add, left, right, span))
        .unwrap_or_else(|| Expr::string("", span));

    generated_method(
        "toString",
        named("String", span),
        Vec::new(),
        vec![Stmt::Return {
            value: Some(value),
            span,
        }],
        span,
    )
}

fn generated_method(
    name: &str,
    return_type: TypeRef,
    params: Vec<Parameter>,
    statements: Vec<Stmt>,
    span: Span,
) -> FunctionDecl {
    FunctionDecl {
        kind: FunctionKind::Method,
        name: name.to_string(),
        type_params: Vec::new(),
        modifiers: Modifiers {
            visibility: Some(Visibility::Public),
            is_override: true,
            ..Modifiers::default()
        },
        receiver: None,
        params,
        return_type: Some(return_type),
        body: FunctionBody::Block(Block::new(statements, span)),
        span,
    }
}

fn this_assignment(name: &str, span: Span) -> Expr {
    Expr::Assign {
        target: Box::new(Expr::field(Expr::identifier("this", span), name, span)),
        op: AssignOp::Assign,
        value: Box::new(Expr::identifier(name, span)),
        span,
    }
}

fn param_signatures(params: &[Parameter]) -> Vec<ParamSig> {
    params
        .iter()
        .map(|param| ParamSig {
            name: param.name.clone(),
            default: param.default.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{class, method, transform_source};
    use super::*;
    use assert_matches::assert_matches;

    fn fields(class: &ClassDecl) -> Vec<&VariableDecl> {
        class
            .members
            .iter()
            .filter_map(|d| match d {
                Declaration::Variable(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn constructors(class: &ClassDecl) -> Vec<&FunctionDecl> {
        class
            .members
            .iter()
            .filter_map(|d| match d {
                Declaration::Function(f) if f.kind == FunctionKind::Constructor => Some(f),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_data_class_members() {
        let outcome = transform_source("data class Point(val x: Int, var label: String)", "Point");
        assert!(outcome.issues.is_empty());
        let point = class(&outcome.program, "Point");

        let fields = fields(point);
        assert_eq!(fields.len(), 2);
        assert!(fields[0].modifiers.is_final);
        assert!(!fields[1].modifiers.is_final);
        assert_eq!(fields[0].type_ref.as_ref().map(|t| t.name.as_str()), Some("int"));

        let constructor = constructors(point);
        assert_eq!(constructor.len(), 1);
        assert_eq!(constructor[0].params.len(), 2);

        for name in ["equals", "hashCode", "toString"] {
            assert!(method(point, name).modifiers.is_override);
        }
        assert!(outcome.program.imports.iter().any(|i| i.path == "java.util.Objects"));
    }

    #[test]
    fn test_data_class_keeps_user_to_string() {
        let outcome = transform_source(
            "data class P(val x: Int) { override fun toString() = \"p\" }",
            "P",
        );
        let p = class(&outcome.program, "P");
        let count = p
            .members
            .iter()
            .filter(|d| matches!(d, Declaration::Function(f) if f.name == "toString"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_default_parameters_become_overloads() {
        let outcome = transform_source(
            "fun pad(text: String, width: Int = 10, fill: Char = ' '): String = text",
            "Pad",
        );
        let holder = class(&outcome.program, "Pad");
        let arities: Vec<usize> = holder
            .members
            .iter()
            .filter_map(|d| match d {
                Declaration::Function(f) if f.name == "pad" => Some(f.params.len()),
                _ => None,
            })
            .collect();
        assert_eq!(arities, vec![3, 2, 1]);

        let shortest = holder
            .members
            .iter()
            .find_map(|d| match d {
                Declaration::Function(f) if f.params.len() == 1 => Some(f),
                _ => None,
            })
            .expect("overload");
        let FunctionBody::Block(body) = &shortest.body else {
            panic!("expected body");
        };
        assert_matches!(
            body.statements.as_slice(),
            [Stmt::Return { value: Some(Expr::Call { args, .. }), .. }] if args.len() == 3
        );
        assert!(holder
            .members
            .iter()
            .all(|d| !matches!(d, Declaration::Function(f) if f.params.iter().any(|p| p.default.is_some()))));
    }

    #[test]
    fn test_constructor_defaults_call_this() {
        let outcome = transform_source("class Box(val size: Int = 1)", "Other");
        let boxed = class(&outcome.program, "Box");
        let constructors = constructors(boxed);
        assert_eq!(constructors.len(), 2);
        let FunctionBody::Block(body) = &constructors[1].body else {
            panic!("expected body");
        };
        assert_matches!(
            body.statements.as_slice(),
            [Stmt::Expression(Expr::Call { callee, .. })] if callee.as_identifier() == Some("this")
        );
    }

    #[test]
    fn test_init_blocks_and_initializers_in_order() {
        let outcome = transform_source(
            "class Rect(val w: Int, val h: Int) {\n val area = w * h\n init { println(area) }\n}",
            "Other",
        );
        let rect = class(&outcome.program, "Rect");
        let area = fields(rect).into_iter().find(|f| f.name == "area").expect("area");
        assert!(area.initializer.is_none());
        assert_eq!(area.type_ref.as_ref().map(|t| t.name.as_str()), Some("int"));

        let FunctionBody::Block(body) = &constructors(rect)[0].body else {
            panic!("expected body");
        };
        // this.w = w; this.h = h; this.area = w * h; System.out.println(area)
        assert_eq!(body.statements.len(), 4);
        assert_matches!(&body.statements[2], Stmt::Expression(Expr::Assign { .. }));
    }

    #[test]
    fn test_superclass_arguments_become_super_call() {
        let outcome = transform_source(
            "open class Base(val id: Int)\nclass Child(id: Int) : Base(id)",
            "Other",
        );
        let base = class(&outcome.program, "Base");
        assert!(!base.modifiers.is_final);
        let child = class(&outcome.program, "Child");
        assert!(child.modifiers.is_final);
        assert_eq!(child.supertypes[0].constructor_args, Some(Vec::new()));
        let FunctionBody::Block(body) = &constructors(child)[0].body else {
            panic!("expected body");
        };
        assert_matches!(
            body.statements.as_slice(),
            [Stmt::Expression(Expr::Call { callee, .. })] if matches!(**callee, Expr::Super { .. })
        );
    }

    #[test]
    fn test_companion_and_object_members_are_static() {
        let outcome = transform_source(
            "class A { companion object { val ZERO = 0\n fun make() = A() } }\nobject Registry { fun size() = 0 }",
            "Other",
        );
        let a = class(&outcome.program, "A");
        assert!(fields(a)[0].modifiers.is_static);
        assert!(method(a, "make").modifiers.is_static);

        let registry = class(&outcome.program, "Registry");
        assert_eq!(registry.kind, ClassKind::Class);
        assert!(method(registry, "size").modifiers.is_static);
        let constructor = constructors(registry);
        assert_eq!(constructor[0].modifiers.visibility, Some(Visibility::Private));
    }

    #[test]
    fn test_interface_methods() {
        let outcome = transform_source(
            "interface Named { val id: Int\n fun name(): String\n fun greet() = \"hi \" + name() }",
            "Other",
        );
        assert_eq!(outcome.issues.len(), 1);
        let named = class(&outcome.program, "Named");
        assert!(!method(named, "name").modifiers.is_default);
        assert!(method(named, "greet").modifiers.is_default);
        assert!(fields(named).is_empty());
    }

    #[test]
    fn test_abstract_members() {
        let outcome = transform_source("abstract class Shape { abstract fun area(): Double }", "Other");
        let shape = class(&outcome.program, "Shape");
        assert!(!shape.modifiers.is_final);
        assert!(method(shape, "area").modifiers.is_abstract);
    }

    #[test]
    fn test_extension_function_takes_receiver() {
        let outcome = transform_source("fun String.shout() = this.uppercase() + \"!\"", "Ext");
        let holder = class(&outcome.program, "Ext");
        let shout = method(holder, "shout");
        assert_eq!(shout.params[0].name, "receiver");
        assert_eq!(shout.return_type.as_ref().map(|t| t.name.as_str()), Some("String"));
    }

    #[test]
    fn test_main_gets_args() {
        let outcome = transform_source("fun main() { println(\"hi\") }", "App");
        let main = method(class(&outcome.program, "App"), "main");
        assert_eq!(main.params.len(), 1);
        assert_eq!(main.params[0].type_ref.as_ref().map(|t| t.to_string()).as_deref(), Some("String[]"));
        assert_eq!(main.return_type.as_ref().map(|t| t.name.as_str()), Some("void"));
    }

    #[test]
    fn test_enum_class() {
        let outcome = transform_source("enum class Color(val rgb: Int) { RED(1), GREEN(2) }", "Other");
        let color = class(&outcome.program, "Color");
        assert_eq!(color.kind, ClassKind::Enum);
        assert!(!color.modifiers.is_final);
        assert_eq!(color.enum_entries.len(), 2);
        assert_eq!(constructors(color)[0].modifiers.visibility, Some(Visibility::Private));
    }
}
