//! Lowers the surface [`crate::ast::Expr`] into a slot-indexed `IrExpr`.
//!
//! Every `pre` and `fold` subterm gets a compile-time slot index into the
//! node's flat temporal-state vector (`crate::temporal::TemporalState`),
//! assigned by a single unconditional pre-order traversal that visits
//! both branches of an `if` regardless of which one runs at evaluation
//! time. That's what keeps the numbering stable: a slot is a property of
//! the syntax tree, not of any one evaluation path through it, so the
//! evaluator can always find the right cell even though it only walks
//! one branch of a conditional on any given tick.

use crate::ast::{BinOp, Expr, Lambda, UnOp};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct IrLambda {
    pub params: Vec<String>,
    pub body: Box<IrExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ident(String),
    Binary(BinOp, Box<IrExpr>, Box<IrExpr>),
    Unary(UnOp, Box<IrExpr>),
    If(Box<IrExpr>, Box<IrExpr>, Box<IrExpr>),
    Let(String, Box<IrExpr>, Box<IrExpr>),
    Lambda(IrLambda),
    Call(String, Vec<IrExpr>),
    StructLit(BTreeMap<String, IrExpr>),
    FieldAccess(Box<IrExpr>, String),
    ArrayLit(Vec<IrExpr>),
    ArrayAccess(Box<IrExpr>, Box<IrExpr>),
    Pre { stream: String, init: Box<IrExpr>, slot: usize },
    Fold { source: Box<IrExpr>, init: Box<IrExpr>, accumulator: IrLambda, slot: usize },
    Map(Box<IrExpr>, IrLambda),
    Filter(Box<IrExpr>, IrLambda),
    Reduce(Box<IrExpr>, Box<IrExpr>, IrLambda),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Pre,
    Fold,
}

/// Number of temporal-state slots a lowered node's formula occupies, and
/// what kind of cell each one needs. The node's `TemporalState` vec is
/// allocated from `slot_kinds` directly.
pub struct Lowered {
    pub expr: IrExpr,
    pub slot_kinds: Vec<SlotKind>,
}

/// Lowers one node's formula, assigning slot indices in a fixed pre-order
/// walk of the whole tree.
pub fn lower(expr: &Expr) -> Lowered {
    let mut slot_kinds = Vec::new();
    let ir = lower_expr(expr, &mut slot_kinds);
    Lowered { expr: ir, slot_kinds }
}

fn lower_lambda(lambda: &Lambda, slots: &mut Vec<SlotKind>) -> IrLambda {
    IrLambda { params: lambda.params.clone(), body: Box::new(lower_expr(&lambda.body, slots)) }
}

fn lower_expr(expr: &Expr, slots: &mut Vec<SlotKind>) -> IrExpr {
    match expr {
        Expr::Int(n) => IrExpr::Int(*n),
        Expr::Float(x) => IrExpr::Float(*x),
        Expr::Bool(b) => IrExpr::Bool(*b),
        Expr::Str(s) => IrExpr::Str(s.clone()),
        Expr::Ident(name) => IrExpr::Ident(name.clone()),
        Expr::Binary(op, lhs, rhs) => IrExpr::Binary(
            *op,
            Box::new(lower_expr(lhs, slots)),
            Box::new(lower_expr(rhs, slots)),
        ),
        Expr::Unary(op, operand) => IrExpr::Unary(*op, Box::new(lower_expr(operand, slots))),
        Expr::If(c, t, e) => IrExpr::If(
            Box::new(lower_expr(c, slots)),
            Box::new(lower_expr(t, slots)),
            Box::new(lower_expr(e, slots)),
        ),
        Expr::Let(name, value, body) => IrExpr::Let(
            name.clone(),
            Box::new(lower_expr(value, slots)),
            Box::new(lower_expr(body, slots)),
        ),
        Expr::Lambda(lambda) => IrExpr::Lambda(lower_lambda(lambda, slots)),
        Expr::Call(name, args) => {
            IrExpr::Call(name.clone(), args.iter().map(|a| lower_expr(a, slots)).collect())
        }
        Expr::StructLit(fields) => IrExpr::StructLit(
            fields.iter().map(|(k, v)| (k.clone(), lower_expr(v, slots))).collect(),
        ),
        Expr::FieldAccess(base, field) => {
            IrExpr::FieldAccess(Box::new(lower_expr(base, slots)), field.clone())
        }
        Expr::ArrayLit(items) => {
            IrExpr::ArrayLit(items.iter().map(|i| lower_expr(i, slots)).collect())
        }
        Expr::ArrayAccess(array, index) => IrExpr::ArrayAccess(
            Box::new(lower_expr(array, slots)),
            Box::new(lower_expr(index, slots)),
        ),
        Expr::Pre(stream, init) => {
            // Slot assigned before lowering `init` so a `pre` nested
            // inside its own init expression gets a strictly later slot,
            // matching the pre-order walk everywhere else.
            let slot = slots.len();
            slots.push(SlotKind::Pre);
            let init = Box::new(lower_expr(init, slots));
            IrExpr::Pre { stream: stream.clone(), init, slot }
        }
        Expr::Fold(source, init, accumulator) => {
            let slot = slots.len();
            slots.push(SlotKind::Fold);
            let source = Box::new(lower_expr(source, slots));
            let init = Box::new(lower_expr(init, slots));
            let accumulator = lower_lambda(accumulator, slots);
            IrExpr::Fold { source, init, accumulator, slot }
        }
        Expr::Map(array, mapper) => {
            IrExpr::Map(Box::new(lower_expr(array, slots)), lower_lambda(mapper, slots))
        }
        Expr::Filter(array, predicate) => IrExpr::Filter(
            Box::new(lower_expr(array, slots)),
            lower_lambda(predicate, slots),
        ),
        Expr::Reduce(array, init, accumulator) => IrExpr::Reduce(
            Box::new(lower_expr(array, slots)),
            Box::new(lower_expr(init, slots)),
            lower_lambda(accumulator, slots),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;

    #[test]
    fn pre_gets_slot_zero_in_simple_formula() {
        let expr = Expr::Pre("counter".to_string(), Box::new(Expr::Int(0)));
        let lowered = lower(&expr);
        assert_eq!(lowered.slot_kinds.len(), 1);
        match lowered.expr {
            IrExpr::Pre { slot, .. } => assert_eq!(slot, 0),
            _ => panic!("expected Pre"),
        }
    }

    #[test]
    fn if_assigns_slots_in_both_branches_unconditionally() {
        let expr = Expr::If(
            Box::new(Expr::ident("cond")),
            Box::new(Expr::Pre("a".to_string(), Box::new(Expr::Int(0)))),
            Box::new(Expr::Pre("b".to_string(), Box::new(Expr::Int(0)))),
        );
        let lowered = lower(&expr);
        assert_eq!(lowered.slot_kinds.len(), 2);
        if let IrExpr::If(_, t, e) = lowered.expr {
            match (*t, *e) {
                (IrExpr::Pre { slot: s1, .. }, IrExpr::Pre { slot: s2, .. }) => {
                    assert_eq!((s1, s2), (0, 1));
                }
                _ => panic!("expected Pre in both branches"),
            }
        } else {
            panic!("expected If");
        }
    }

    #[test]
    fn fold_reserves_one_slot_before_its_subterms() {
        let expr = Expr::Fold(
            Box::new(Expr::ident("v")),
            Box::new(Expr::Pre("seed".to_string(), Box::new(Expr::Int(0)))),
            ast::Lambda::new(
                vec!["acc", "x"],
                Expr::Binary(ast::BinOp::Add, Box::new(Expr::ident("acc")), Box::new(Expr::ident("x"))),
            ),
        );
        let lowered = lower(&expr);
        assert_eq!(lowered.slot_kinds.len(), 2);
        match lowered.expr {
            IrExpr::Fold { slot, init, .. } => {
                assert_eq!(slot, 0);
                match *init {
                    IrExpr::Pre { slot, .. } => assert_eq!(slot, 1),
                    _ => panic!("expected Pre in init"),
                }
            }
            _ => panic!("expected Fold"),
        }
    }
}
