//! Statement rewrites
//!
//! `when` and statement-shaped `if` used as values are lowered into
//! statements by pushing the consumer of the value (a `return`, or an
//! assignment to the declared variable) into the last statement of every
//! branch. Range loops become counted `for` loops.

use super::expressions::{split_range, RangeBounds};
use super::types::{boxed, element_type, is_map, is_primitive, named};
use super::Transformer;
use crate::grammar::ast::nodes::*;
use crate::tokens::LiteralKind;
use crate::utils::Span;

/// What happens to the value of a lowered `when`/`if`
#[derive(Debug, Clone)]
enum Tail {
    Discard,
    Return,
    /// Assign to this (untransformed) target
    Assign(Expr),
}

/// Label family of a `when` that can become a Java `switch`
#[derive(Debug, Clone, Copy, PartialEq)]
enum SwitchKind {
    Literal(LiteralKind),
    Enum,
}

impl Transformer {
    pub(super) fn transform_block(&mut self, block: Block) -> Block {
        self.with_scope(|t| {
            let mut statements = Vec::new();
            for statement in block.statements {
                t.transform_statement(statement, &mut statements);
            }
            Block::new(statements, block.span)
        })
    }

    fn transform_statement(&mut self, statement: Stmt, out: &mut Vec<Stmt>) {
        match statement {
            Stmt::Variable(variable) => self.transform_local(variable, out),
            Stmt::Expression(expr) => self.transform_expression_statement(expr, out),
            Stmt::Return { value: Some(value), span } => self.transform_return(value, span, out),
            Stmt::Return { value: None, span } => out.push(Stmt::Return { value: None, span }),
            Stmt::While { condition, body, span } => {
                let condition = self.transform_expr(condition);
                let body = self.transform_block(body);
                out.push(Stmt::While { condition, body, span });
            }
            Stmt::DoWhile { body, condition, span } => {
                let body = self.transform_block(body);
                let condition = self.transform_expr(condition);
                out.push(Stmt::DoWhile { body, condition, span });
            }
            Stmt::For {
                variable,
                type_ref,
                iterable,
                body,
                span,
            } => out.push(self.transform_for(variable, type_ref, iterable, body, span)),
            Stmt::Throw { value, span } => {
                let value = self.transform_expr(value);
                out.push(Stmt::Throw { value, span });
            }
            Stmt::Try {
                body,
                catches,
                finally,
                span,
            } => {
                let body = self.transform_block(body);
                let catches = catches
                    .into_iter()
                    .map(|catch| {
                        let type_ref = self.java_type(&catch.type_ref);
                        self.with_scope(|t| {
                            t.declare(&catch.name, type_ref.clone());
                            CatchClause {
                                body: t.transform_block(catch.body),
                                type_ref,
                                ..catch
                            }
                        })
                    })
                    .collect();
                let finally = finally.map(|block| self.transform_block(block));
                out.push(Stmt::Try {
                    body,
                    catches,
                    finally,
                    span,
                });
            }
            Stmt::Switch {
                subject,
                cases,
                default,
                span,
            } => {
                let subject = self.transform_expr(subject);
                let cases = cases
                    .into_iter()
                    .map(|case| SwitchCase {
                        labels: case.labels.into_iter().map(|l| self.transform_expr(l)).collect(),
                        body: self.transform_block(case.body),
                        span: case.span,
                    })
                    .collect();
                let default = default.map(|block| self.transform_block(block));
                out.push(Stmt::Switch {
                    subject,
                    cases,
                    default,
                    span,
                });
            }
            Stmt::CountedFor {
                variable,
                type_ref,
                start,
                end,
                inclusive,
                descending,
                body,
                span,
            } => {
                let type_ref = self.java_type(&type_ref);
                let start = self.transform_expr(start);
                let end = self.transform_expr(end);
                let body = self.with_scope(|t| {
                    t.declare(&variable, type_ref.clone());
                    t.transform_block(body)
                });
                out.push(Stmt::CountedFor {
                    variable,
                    type_ref,
                    start,
                    end,
                    inclusive,
                    descending,
                    body,
                    span,
                });
            }
            Stmt::Block(block) => out.push(Stmt::Block(self.transform_block(block))),
            statement @ (Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Placeholder { .. }) => {
                out.push(statement)
            }
        }
    }

    fn transform_local(&mut self, variable: VariableDecl, out: &mut Vec<Stmt>) {
        let VariableDecl {
            name,
            mutability,
            mut modifiers,
            type_ref,
            initializer,
            span,
        } = variable;
        modifiers.is_final = mutability == Mutability::Immutable;

        let declaration = |type_ref: TypeRef, initializer: Option<Expr>, modifiers: Modifiers| {
            Stmt::Variable(VariableDecl {
                name: name.clone(),
                mutability,
                modifiers,
                type_ref: Some(type_ref),
                initializer,
                span,
            })
        };

        match initializer {
            Some(value) if self.needs_statement_lowering(&value) => {
                let ty = self.resolve_type(type_ref.as_ref(), Some(&value), &name, span);
                out.push(declaration(ty.clone(), None, modifiers));
                self.declare(&name, ty);
                self.lower_value(value, Tail::Assign(Expr::identifier(name.clone(), span)), out);
            }
            Some(Expr::Elvis { value, default, .. }) if matches!(*default, Expr::Jump { .. }) => {
                // `val x = v ?: return` checks x itself after the declaration
                let ty = self.resolve_type(type_ref.as_ref(), Some(&value), &name, span);
                let ty = if is_primitive(&ty) { boxed(ty) } else { ty };
                let value = self.transform_expr(*value);
                out.push(declaration(ty.clone(), Some(value), modifiers));
                self.declare(&name, ty);
                let check = self.null_check(Expr::identifier(name.clone(), span), *default, span);
                out.push(check);
            }
            initializer => {
                let ty = self.resolve_type(type_ref.as_ref(), initializer.as_ref(), &name, span);
                let initializer = initializer.map(|value| self.transform_expr(value));
                self.declare(&name, ty.clone());
                out.push(declaration(ty, initializer, modifiers));
            }
        }
    }

    fn transform_expression_statement(&mut self, expr: Expr, out: &mut Vec<Stmt>) {
        match expr {
            Expr::If(if_expr) => {
                let lowered = self.lower_if(if_expr, &Tail::Discard);
                out.push(Stmt::Expression(Expr::If(lowered)));
            }
            Expr::When(when) => self.lower_when(when, &Tail::Discard, out),
            Expr::Elvis { value, default, span } if matches!(*default, Expr::Jump { .. }) => {
                let value = self.transform_expr(*value);
                out.push(self.null_check(value, *default, span));
            }
            Expr::SafeCall {
                target,
                name,
                args: Some(args),
                span,
            } => out.push(self.safe_call_statement(*target, name, args, span)),
            Expr::Assign {
                target,
                op: AssignOp::Assign,
                value,
                span,
            } if self.needs_statement_lowering(&value) || is_elvis_jump(&value) => match *value {
                Expr::Elvis { value, default, .. } if matches!(*default, Expr::Jump { .. }) => {
                    let checked = self.hoist_elvis_jump(*value, *default, span, out);
                    let assignment = Expr::Assign {
                        target: Box::new(self.transform_expr(*target)),
                        op: AssignOp::Assign,
                        value: Box::new(checked),
                        span,
                    };
                    out.push(Stmt::Expression(assignment));
                }
                value => self.lower_value(value, Tail::Assign(*target), out),
            },
            Expr::Jump { kind, value, span } => out.push(self.jump_statement(kind, value, span)),
            expr => {
                let expr = self.transform_expr(expr);
                out.push(Stmt::Expression(expr));
            }
        }
    }

    fn transform_return(&mut self, value: Expr, span: Span, out: &mut Vec<Stmt>) {
        if self.needs_statement_lowering(&value) {
            return self.lower_value(value, Tail::Return, out);
        }
        match value {
            Expr::Elvis { value, default, .. } if matches!(*default, Expr::Jump { .. }) => {
                let checked = self.hoist_elvis_jump(*value, *default, span, out);
                out.push(Stmt::Return {
                    value: Some(checked),
                    span,
                });
            }
            value => {
                let value = self.transform_expr(value);
                out.push(Stmt::Return {
                    value: Some(value),
                    span,
                });
            }
        }
    }

    /// `when`, and `if` whose branches are not single expressions, can only
    /// be expressed as statements
    fn needs_statement_lowering(&self, value: &Expr) -> bool {
        match value {
            Expr::When(_) => true,
            Expr::If(if_expr) => !is_conditional_expression(if_expr),
            _ => false,
        }
    }

    fn lower_value(&mut self, value: Expr, tail: Tail, out: &mut Vec<Stmt>) {
        match value {
            Expr::When(when) => self.lower_when(when, &tail, out),
            Expr::If(if_expr) => {
                let lowered = self.lower_if(if_expr, &tail);
                out.push(Stmt::Expression(Expr::If(lowered)));
            }
            value => {
                let statement = apply_tail_to_expr(value, &tail);
                self.transform_statement(statement, out);
            }
        }
    }

    /// Evaluate `value` once, run the Elvis jump when it is null, and return
    /// the expression to use afterwards
    fn hoist_elvis_jump(&mut self, value: Expr, jump: Expr, span: Span, out: &mut Vec<Stmt>) -> Expr {
        if value.is_pure_reference() {
            let value = self.transform_expr(value);
            out.push(self.null_check(value.clone(), jump, span));
            return value;
        }

        let ty = self.resolve_type(None, Some(&value), "elvisValue", span);
        let ty = if is_primitive(&ty) { boxed(ty) } else { ty };
        let name = self.fresh_name("elvisValue");
        let initializer = self.transform_expr(value);
        out.push(Stmt::Variable(VariableDecl {
            name: name.clone(),
            mutability: Mutability::Immutable,
            modifiers: Modifiers {
                is_final: true,
                ..Modifiers::default()
            },
            type_ref: Some(ty.clone()),
            initializer: Some(initializer),
            span,
        }));
        self.declare(&name, ty);
        let temp = Expr::identifier(name, span);
        out.push(self.null_check(temp.clone(), jump, span));
        temp
    }

    /// `if (value == null) <jump>;`
    fn null_check(&mut self, value: Expr, jump: Expr, span: Span) -> Stmt {
        let condition = Expr::binary(BinaryOp::RefEq, value, Expr::null(span), span);
        let jump = match jump {
            Expr::Jump { kind, value, span } => self.jump_statement(kind, value, span),
            other => Stmt::Expression(self.transform_expr(other)),
        };
        Stmt::Expression(Expr::If(IfExpr {
            condition: Box::new(condition),
            then_branch: Block::new(vec![jump], span),
            else_branch: None,
            span,
        }))
    }

    fn jump_statement(&mut self, kind: JumpKind, value: Option<Box<Expr>>, span: Span) -> Stmt {
        let value = value.map(|value| self.transform_expr(*value));
        match (kind, value) {
            (JumpKind::Return, value) => Stmt::Return { value, span },
            (JumpKind::Throw, Some(value)) => Stmt::Throw { value, span },
            (JumpKind::Throw, None) => self.unsupported_stmt("throw without a value", span),
            (JumpKind::Break, _) => Stmt::Break { span },
            (JumpKind::Continue, _) => Stmt::Continue { span },
        }
    }

    /// `r?.m(args)` as a statement: a null check, or `Optional.ifPresent`
    /// when the receiver must be evaluated once
    fn safe_call_statement(&mut self, target: Expr, name: Identifier, args: Vec<Argument>, span: Span) -> Stmt {
        let chain = Expr::SafeCall {
            target: Box::new(target),
            name,
            args: Some(args),
            span,
        };
        if super::expressions::is_flattenable(&chain) {
            let (guards, access) = self.flatten_safe_chain(chain);
            let condition = guards
                .into_iter()
                .reduce(|left, right| Expr::binary(BinaryOp::And, left, right, span))
                .unwrap_or_else(|| Expr::literal(LiteralValue::Boolean(true), span));
            return Stmt::Expression(Expr::If(IfExpr {
                condition: Box::new(condition),
                then_branch: Block::new(vec![Stmt::Expression(access)], span),
                else_branch: None,
                span,
            }));
        }

        let Expr::SafeCall { target, name, args, .. } = chain else {
            return self.unsupported_stmt("null-safe call", span);
        };
        let receiver = self.transform_expr(*target);
        let receiver_type = self.infer(&receiver);
        let action = self.optional_lambda(receiver_type, &name, args, span);
        self.imports.insert("java.util.Optional".to_string());
        let optional = Expr::static_call("Optional.ofNullable", vec![receiver], span);
        Stmt::Expression(Expr::call(Expr::field(optional, "ifPresent", span), vec![action], span))
    }

    // ========================================================================
    // IF / WHEN LOWERING
    // ========================================================================

    fn lower_if(&mut self, if_expr: IfExpr, tail: &Tail) -> IfExpr {
        let IfExpr {
            condition,
            then_branch,
            else_branch,
            span,
        } = if_expr;

        let condition = self.transform_expr(*condition);
        let then_branch = self.transform_block(apply_tail(then_branch, tail));
        let else_branch = else_branch.map(|branch| match branch {
            ElseBranch::Block(block) => ElseBranch::Block(self.transform_block(apply_tail(block, tail))),
            ElseBranch::If(nested) => ElseBranch::If(Box::new(self.lower_if(*nested, tail))),
        });

        IfExpr {
            condition: Box::new(condition),
            then_branch,
            else_branch,
            span,
        }
    }

    fn lower_when(&mut self, when: WhenExpr, tail: &Tail, out: &mut Vec<Stmt>) {
        let WhenExpr {
            subject,
            branches,
            else_branch,
            span,
        } = when;

        // A value-producing when must assign or return on every path
        let else_branch = match (else_branch, tail) {
            (Some(block), _) => Some(block),
            (None, Tail::Discard) => None,
            (None, _) => Some(unhandled_when(span)),
        };

        if let Some(subject) = subject {
            match self.switch_kind(&subject, &branches) {
                Some(kind) => self.lower_when_to_switch(*subject, kind, branches, else_branch, tail, span, out),
                None => self.lower_when_to_if_chain(Some(*subject), branches, else_branch, tail, span, out),
            }
        } else {
            self.lower_when_to_if_chain(None, branches, else_branch, tail, span, out);
        }
    }

    /// Labels must all be constants of one switchable kind (or entries of
    /// one enum), and the subject must not be a type Java cannot switch on
    fn switch_kind(&self, subject: &Expr, branches: &[WhenBranch]) -> Option<SwitchKind> {
        if branches.is_empty() {
            return None;
        }
        let subject_type = self.infer(subject);
        let enum_entries = subject_type
            .as_ref()
            .and_then(|ty| self.classes.get(&ty.name))
            .map(|info| info.enum_entries.as_slice())
            .filter(|entries| !entries.is_empty());

        if let Some(entries) = enum_entries {
            let all_entries = branches.iter().flat_map(|b| &b.conditions).all(|condition| {
                matches!(condition, WhenCondition::Value(label) if enum_label(label).is_some_and(|name| entries.iter().any(|e| e == name)))
            });
            return all_entries.then_some(SwitchKind::Enum);
        }

        if subject_type
            .as_ref()
            .is_some_and(|ty| matches!(ty.name.as_str(), "long" | "double" | "float" | "boolean" | "Long" | "Double" | "Float" | "Boolean"))
        {
            return None;
        }

        let mut kind = None;
        for condition in branches.iter().flat_map(|b| &b.conditions) {
            let WhenCondition::Value(label) = condition else {
                return None;
            };
            let label_kind = switch_label_kind(label)?;
            if *kind.get_or_insert(label_kind) != label_kind {
                return None;
            }
        }
        kind.map(SwitchKind::Literal)
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_when_to_switch(
        &mut self,
        subject: Expr,
        kind: SwitchKind,
        branches: Vec<WhenBranch>,
        else_branch: Option<Block>,
        tail: &Tail,
        span: Span,
        out: &mut Vec<Stmt>,
    ) {
        let subject = self.transform_expr(subject);
        let cases = branches
            .into_iter()
            .map(|branch| {
                let labels = branch
                    .conditions
                    .into_iter()
                    .filter_map(|condition| match condition {
                        WhenCondition::Value(label) => Some(label),
                        _ => None,
                    })
                    .map(|label| match kind {
                        // Java case labels name enum constants unqualified
                        SwitchKind::Enum => {
                            let name = enum_label(&label).unwrap_or_default().to_string();
                            Expr::identifier(name, label.span())
                        }
                        SwitchKind::Literal(_) => self.transform_expr(label),
                    })
                    .collect();
                SwitchCase {
                    labels,
                    body: self.transform_block(apply_tail(branch.body, tail)),
                    span: branch.span,
                }
            })
            .collect();
        let default = else_branch.map(|block| self.transform_block(apply_tail(block, tail)));

        out.push(Stmt::Switch {
            subject,
            cases,
            default,
            span,
        });
    }

    fn lower_when_to_if_chain(
        &mut self,
        subject: Option<Expr>,
        branches: Vec<WhenBranch>,
        else_branch: Option<Block>,
        tail: &Tail,
        span: Span,
        out: &mut Vec<Stmt>,
    ) {
        // A subject with side effects is evaluated once into a temporary
        let mut prelude = None;
        let subject = match subject {
            Some(subject) if !subject.is_pure_reference() => {
                let ty = self.resolve_type(None, Some(&subject), "when subject", span);
                let name = self.fresh_name("whenSubject");
                let initializer = self.transform_expr(subject);
                self.declare(&name, ty.clone());
                prelude = Some(Stmt::Variable(VariableDecl {
                    name: name.clone(),
                    mutability: Mutability::Immutable,
                    modifiers: Modifiers {
                        is_final: true,
                        ..Modifiers::default()
                    },
                    type_ref: Some(ty),
                    initializer: Some(initializer),
                    span,
                }));
                Some(Expr::identifier(name, span))
            }
            subject => subject,
        };

        let mut chain = else_branch.map(ElseBranch::Block);
        for branch in branches.into_iter().rev() {
            let condition = branch_condition(subject.as_ref(), branch.conditions, branch.span);
            chain = Some(ElseBranch::If(Box::new(IfExpr {
                condition: Box::new(condition),
                then_branch: branch.body,
                else_branch: chain,
                span: branch.span,
            })));
        }

        let lowered = match chain {
            Some(ElseBranch::If(first)) => Some(Stmt::Expression(Expr::If(self.lower_if(*first, tail)))),
            Some(ElseBranch::Block(block)) => Some(Stmt::Block(self.transform_block(apply_tail(block, tail)))),
            None => None,
        };

        match (prelude, lowered) {
            (Some(prelude), Some(lowered)) => out.push(Stmt::Block(Block::new(vec![prelude, lowered], span))),
            (Some(prelude), None) => out.push(prelude),
            (None, Some(lowered)) => out.push(lowered),
            (None, None) => {}
        }
    }

    // ========================================================================
    // LOOPS
    // ========================================================================

    fn transform_for(
        &mut self,
        variable: Identifier,
        type_ref: Option<TypeRef>,
        iterable: Expr,
        body: Block,
        span: Span,
    ) -> Stmt {
        let iterable = match split_range(iterable) {
            Ok(RangeBounds {
                start,
                end,
                inclusive,
                descending,
            }) => {
                let ty = match &type_ref {
                    Some(declared) => self.java_type(declared),
                    None => self.counter_type(&start, &end, span),
                };
                let start = self.transform_expr(start);
                let end = self.transform_expr(end);
                let body = self.with_scope(|t| {
                    t.declare(&variable, ty.clone());
                    t.transform_block(body)
                });
                return Stmt::CountedFor {
                    variable,
                    type_ref: ty,
                    start,
                    end,
                    inclusive,
                    descending,
                    body,
                    span,
                };
            }
            Err(iterable) => iterable,
        };

        if is_step_call(&iterable) {
            return self.unsupported_stmt("stepped range loop", span);
        }

        let iterable_type = self.infer(&iterable);
        let mut iterable = self.transform_expr(iterable);
        let element = match (&type_ref, iterable_type) {
            (Some(declared), _) => self.java_type(declared),
            (None, Some(ty)) if ty.name == "String" && ty.array_dims == 0 => {
                iterable = Expr::call(Expr::field(iterable, "toCharArray", span), Vec::new(), span);
                named("char", span)
            }
            (None, Some(ty)) if is_map(&ty) => {
                iterable = Expr::call(Expr::field(iterable, "entrySet", span), Vec::new(), span);
                named("Map.Entry", span).with_arguments(ty.arguments.clone())
            }
            (None, Some(ty)) => match element_type(&ty) {
                Some(element) => element,
                None => self.fallback_type(&variable, span),
            },
            (None, None) => self.fallback_type(&variable, span),
        };

        let body = self.with_scope(|t| {
            t.declare(&variable, element.clone());
            t.transform_block(body)
        });
        Stmt::For {
            variable,
            type_ref: Some(element),
            iterable,
            body,
            span,
        }
    }

    fn counter_type(&self, start: &Expr, end: &Expr, span: Span) -> TypeRef {
        let types = [self.infer(start), self.infer(end)];
        let names: Vec<&str> = types.iter().flatten().map(|t| t.name.as_str()).collect();
        let name = if names.iter().any(|n| matches!(*n, "long" | "Long")) {
            "long"
        } else if !names.is_empty() && names.iter().all(|n| matches!(*n, "char" | "Character")) {
            "char"
        } else {
            "int"
        };
        named(name, span)
    }
}

/// If both branches are single expressions the `if` is a Java conditional
pub(super) fn is_conditional_expression(if_expr: &IfExpr) -> bool {
    let single = |block: &Block| {
        block
            .as_single_expression()
            .is_some_and(|expr| !matches!(expr, Expr::Jump { .. } | Expr::When(_)) && !matches!(expr, Expr::If(nested) if !is_conditional_expression(nested)))
    };
    single(&if_expr.then_branch)
        && match &if_expr.else_branch {
            Some(ElseBranch::Block(block)) => single(block),
            Some(ElseBranch::If(nested)) => is_conditional_expression(nested),
            None => false,
        }
}

fn is_elvis_jump(expr: &Expr) -> bool {
    matches!(expr, Expr::Elvis { default, .. } if matches!(**default, Expr::Jump { .. }))
}

fn is_step_call(expr: &Expr) -> bool {
    matches!(expr, Expr::Call { callee, .. } if matches!(callee.as_ref(), Expr::FieldAccess { name, .. } if name == "step"))
}

/// Route a branch's value into the tail: its last expression statement
/// becomes a `return` or an assignment
fn apply_tail(mut block: Block, tail: &Tail) -> Block {
    if matches!(tail, Tail::Discard) {
        return block;
    }
    if let Some(Stmt::Expression(expr)) = block.statements.last() {
        if !matches!(expr, Expr::Jump { .. }) {
            if let Some(Stmt::Expression(expr)) = block.statements.pop() {
                block.statements.push(apply_tail_to_expr(expr, tail));
            }
        }
    }
    block
}

fn apply_tail_to_expr(expr: Expr, tail: &Tail) -> Stmt {
    let span = expr.span();
    match tail {
        Tail::Discard => Stmt::Expression(expr),
        Tail::Return => Stmt::Return {
            value: Some(expr),
            span,
        },
        Tail::Assign(target) => Stmt::Expression(Expr::Assign {
            target: Box::new(target.clone()),
            op: AssignOp::Assign,
            value: Box::new(expr),
            span,
        }),
    }
}

fn unhandled_when(span: Span) -> Block {
    let exception = Expr::New {
        type_ref: named("IllegalStateException", span),
        args: vec![Argument::positional(Expr::string("Unhandled when value", span))],
        span,
    };
    Block::new(vec![Stmt::Throw { value: exception, span }], span)
}

/// Kotlin condition testing one `when` branch
pub(super) fn branch_condition(subject: Option<&Expr>, conditions: Vec<WhenCondition>, span: Span) -> Expr {
    conditions
        .into_iter()
        .map(|condition| match (subject, condition) {
            (Some(subject), WhenCondition::Value(value)) => {
                Expr::binary(BinaryOp::Eq, subject.clone(), value, span)
            }
            (None, WhenCondition::Value(value)) => value,
            (Some(subject), WhenCondition::Is { type_ref, negated }) => Expr::TypeCheck {
                value: Box::new(subject.clone()),
                type_ref,
                negated,
                span,
            },
            (Some(subject), WhenCondition::In { range, negated }) => {
                let op = if negated { BinaryOp::NotIn } else { BinaryOp::In };
                Expr::binary(op, subject.clone(), range, span)
            }
            (None, WhenCondition::Is { .. } | WhenCondition::In { .. }) => Expr::Placeholder {
                description: "type or range test without a when subject".to_string(),
                span,
            },
        })
        .reduce(|left, right| Expr::binary(BinaryOp::Or, left, right, span))
        .unwrap_or_else(|| Expr::literal(LiteralValue::Boolean(false), span))
}

fn switch_label_kind(label: &Expr) -> Option<LiteralKind> {
    if !label.is_constant() {
        return None;
    }
    match label {
        Expr::Literal(lit) => match &lit.value {
            LiteralValue::Integer(text) if text.ends_with(['L', 'l']) => None,
            LiteralValue::Integer(_) => Some(LiteralKind::Integer),
            LiteralValue::Char(_) => Some(LiteralKind::Char),
            LiteralValue::String(_) => Some(LiteralKind::String),
            _ => None,
        },
        Expr::Unary { operand, .. } => switch_label_kind(operand),
        Expr::Paren { inner, .. } => switch_label_kind(inner),
        _ => None,
    }
}

/// Entry name of `RED` or `Color.RED`
fn enum_label(label: &Expr) -> Option<&str> {
    match label {
        Expr::Identifier { name, .. } => Some(name),
        Expr::FieldAccess { target, name, .. } if target.as_identifier().is_some() => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{class, method, transform_source};
    use super::*;
    use assert_matches::assert_matches;

    fn body_of(source: &str, function: &str) -> Vec<Stmt> {
        let outcome = transform_source(source, "T");
        assert!(outcome.issues.is_empty(), "issues: {:?}", outcome.issues);
        let holder = class(&outcome.program, "T");
        match &method(holder, function).body {
            FunctionBody::Block(block) => block.statements.clone(),
            _ => panic!("expected block body"),
        }
    }

    #[test]
    fn test_val_and_var_declarations() {
        let body = body_of("fun f() { val a = 1\n var b = \"s\"\n val c: Long? = null }", "f");
        let Stmt::Variable(a) = &body[0] else { panic!("expected variable") };
        assert!(a.modifiers.is_final);
        assert_eq!(a.type_ref.as_ref().map(|t| t.name.as_str()), Some("int"));
        let Stmt::Variable(b) = &body[1] else { panic!("expected variable") };
        assert!(!b.modifiers.is_final);
        assert_eq!(b.type_ref.as_ref().map(|t| t.name.as_str()), Some("String"));
        let Stmt::Variable(c) = &body[2] else { panic!("expected variable") };
        assert_eq!(c.type_ref.as_ref().map(|t| t.name.as_str()), Some("Long"));
    }

    #[test]
    fn test_constant_when_becomes_switch() {
        let body = body_of(
            "fun f(x: Int): String { return when (x) { 1, 2 -> \"small\"\n 3 -> \"three\"\n else -> \"big\" } }",
            "f",
        );
        assert_matches!(
            body.as_slice(),
            [Stmt::Switch { cases, default: Some(_), .. }] if cases.len() == 2 && cases[0].labels.len() == 2
        );
        let Stmt::Switch { cases, .. } = &body[0] else { unreachable!() };
        assert_matches!(cases[1].body.statements.as_slice(), [Stmt::Return { value: Some(_), .. }]);
    }

    #[test]
    fn test_non_constant_when_becomes_if_chain() {
        let body = body_of(
            "fun f(x: Int) { when { x < 0 -> println(\"neg\")\n x == 0 -> println(\"zero\")\n else -> println(\"pos\") } }",
            "f",
        );
        let [Stmt::Expression(Expr::If(first))] = body.as_slice() else {
            panic!("expected if chain, got {:?}", body);
        };
        assert_matches!(first.else_branch, Some(ElseBranch::If(ref second)) if matches!(second.else_branch, Some(ElseBranch::Block(_))));
    }

    #[test]
    fn test_when_with_type_tests_uses_instanceof() {
        let body = body_of(
            "fun f(x: Any): Int { return when (x) { is String -> 1\n else -> 0 } }",
            "f",
        );
        let [Stmt::Expression(Expr::If(chain))] = body.as_slice() else {
            panic!("expected if chain");
        };
        assert_matches!(*chain.condition, Expr::TypeCheck { negated: false, .. });
    }

    #[test]
    fn test_when_value_assigned_to_declared_local() {
        let body = body_of(
            "fun f(c: Char) { val kind = when (c) { 'a' -> \"vowel\"\n else -> \"other\" }\n println(kind) }",
            "f",
        );
        let Stmt::Variable(kind) = &body[0] else { panic!("expected declaration") };
        assert!(kind.initializer.is_none());
        assert_eq!(kind.type_ref.as_ref().map(|t| t.name.as_str()), Some("String"));
        let Stmt::Switch { default: Some(default), .. } = &body[1] else {
            panic!("expected switch");
        };
        assert_matches!(default.statements.as_slice(), [Stmt::Expression(Expr::Assign { .. })]);
    }

    #[test]
    fn test_when_without_else_gets_throwing_default() {
        let body = body_of("fun f(x: Int): Int { return when (x) { 1 -> 10\n 2 -> 20 } }", "f");
        let Stmt::Switch { default: Some(default), .. } = &body[0] else {
            panic!("expected switch");
        };
        assert_matches!(default.statements.as_slice(), [Stmt::Throw { .. }]);
    }

    #[test]
    fn test_impure_when_subject_is_hoisted() {
        let body = body_of(
            "fun next(): Any = 1\nfun f() { when (next()) { is Int -> println(\"int\") } }",
            "f",
        );
        let [Stmt::Block(block)] = body.as_slice() else {
            panic!("expected hoisting block, got {:?}", body);
        };
        assert_matches!(&block.statements[0], Stmt::Variable(v) if v.name == "whenSubject");
    }

    #[test]
    fn test_range_loops() {
        let body = body_of(
            "fun f(n: Int) { for (i in 0..n) {}\n for (j in 0 until n) {}\n for (k in n downTo 1) {} }",
            "f",
        );
        assert_matches!(&body[0], Stmt::CountedFor { inclusive: true, descending: false, .. });
        assert_matches!(&body[1], Stmt::CountedFor { inclusive: false, descending: false, .. });
        assert_matches!(&body[2], Stmt::CountedFor { inclusive: true, descending: true, .. });
        let Stmt::CountedFor { type_ref, .. } = &body[0] else { unreachable!() };
        assert_eq!(type_ref.name, "int");
    }

    #[test]
    fn test_collection_and_string_loops() {
        let body = body_of(
            "fun f(xs: List<String>, s: String) { for (x in xs) println(x)\n for (c in s) println(c) }",
            "f",
        );
        assert_matches!(&body[0], Stmt::For { type_ref: Some(t), .. } if t.name == "String");
        assert_matches!(&body[1], Stmt::For { type_ref: Some(t), iterable: Expr::Call { .. }, .. } if t.name == "char");
    }

    #[test]
    fn test_elvis_return_in_declaration() {
        let body = body_of("fun f(s: String?): Int { val t = s ?: return 0\n return t.length }", "f");
        assert_matches!(&body[0], Stmt::Variable(v) if v.name == "t");
        let Stmt::Expression(Expr::If(check)) = &body[1] else {
            panic!("expected null check");
        };
        assert_matches!(*check.condition, Expr::Binary { op: BinaryOp::RefEq, .. });
        assert_matches!(check.then_branch.statements.as_slice(), [Stmt::Return { value: Some(_), .. }]);
    }

    #[test]
    fn test_safe_call_statement_becomes_null_check() {
        let body = body_of("fun f(s: String?) { s?.trim() }", "f");
        let [Stmt::Expression(Expr::If(check))] = body.as_slice() else {
            panic!("expected null check");
        };
        assert_matches!(*check.condition, Expr::Binary { op: BinaryOp::RefNotEq, .. });
    }

    #[test]
    fn test_if_expression_value_becomes_conditional() {
        let body = body_of("fun f(a: Int, b: Int): Int { return if (a > b) a else b }", "f");
        assert_matches!(
            body.as_slice(),
            [Stmt::Return { value: Some(Expr::Conditional { .. }), .. }]
        );
    }

    #[test]
    fn test_block_if_value_is_lowered() {
        let body = body_of(
            "fun f(a: Int): Int { val r = if (a > 0) { println(a)\n a } else { 0 }\n return r }",
            "f",
        );
        assert_matches!(&body[0], Stmt::Variable(v) if v.initializer.is_none());
        let Stmt::Expression(Expr::If(lowered)) = &body[1] else {
            panic!("expected if statement");
        };
        assert_eq!(lowered.then_branch.statements.len(), 2);
        assert_matches!(&lowered.then_branch.statements[1], Stmt::Expression(Expr::Assign { .. }));
    }
}
