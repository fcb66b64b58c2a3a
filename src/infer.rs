//! Best-effort structural type inference. Unlike the three analyses in
//! `crate::analysis`, this pass never blocks compilation on its own — a
//! mismatch it finds is recorded as a `TypeMismatch` diagnostic and
//! surfaces purely for documentation, unless the caller opts in to
//! `CompileOptions::promote_type_mismatch_to_blocking`.
//!
//! It also fills in the inferred type of every stream that has no
//! explicit annotation, which `crate::compiler` uses when expanding a
//! struct source into its field sources.

use crate::ast::{BinOp, Decl, Expr, Lambda, Program, UnOp};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::stdlib::BUILTIN_NAMES;
use crate::ty::{promote_arith, Type};
use std::collections::BTreeMap;

pub struct InferenceResult {
    pub diagnostics: Diagnostics,
    /// Inferred (or declared, if present) type of every source and
    /// stream, keyed by name.
    pub node_types: BTreeMap<String, Type>,
}

pub fn run(program: &Program, aliases: &BTreeMap<String, Type>) -> InferenceResult {
    let mut diagnostics = Diagnostics::new();
    let mut env: BTreeMap<String, Type> = BTreeMap::new();

    for decl in &program.decls {
        if let Decl::Source(s) = decl {
            env.insert(s.name.clone(), s.type_sig.clone().unwrap_or(Type::Any));
        }
    }

    // Streams are visited in declaration order. A forward reference to a
    // stream not yet inferred just resolves to `Type::Any` here — that's
    // a property of this being a documentation pass, not the blocking
    // undefined-reference check, which has already run by this point.
    for decl in &program.decls {
        if let Decl::Stream(s) = decl {
            let inferred = infer_expr(&s.expr, &env, aliases);
            if let Some(declared) = &s.type_sig {
                if !inferred.compatible_with(declared, aliases) {
                    diagnostics.push(Diagnostic::TypeMismatch {
                        declared: declared.clone(),
                        inferred: inferred.clone(),
                        context: s.name.clone(),
                    });
                }
            }
            env.insert(s.name.clone(), s.type_sig.clone().unwrap_or(inferred));
        }
    }

    for decl in &program.decls {
        if let Decl::Sink(s) = decl {
            // A sink has nothing to check against, but running inference
            // still surfaces internal mismatches (e.g. `a + "text"`) as
            // documentation-only diagnostics.
            let _ = infer_expr(&s.expr, &env, aliases);
        }
    }

    InferenceResult { diagnostics, node_types: env }
}

fn infer_expr(expr: &Expr, env: &BTreeMap<String, Type>, aliases: &BTreeMap<String, Type>) -> Type {
    match expr {
        Expr::Int(_) => Type::Int,
        Expr::Float(_) => Type::Float,
        Expr::Bool(_) => Type::Bool,
        Expr::Str(_) => Type::String,
        Expr::Ident(name) => env.get(name).cloned().unwrap_or(Type::Any),
        Expr::Binary(op, lhs, rhs) => infer_binary(*op, lhs, rhs, env, aliases),
        Expr::Unary(op, operand) => match op {
            UnOp::Neg => infer_expr(operand, env, aliases),
            UnOp::Not => Type::Bool,
        },
        Expr::If(_, t, e) => {
            let t_ty = infer_expr(t, env, aliases);
            let e_ty = infer_expr(e, env, aliases);
            t_ty.lub(&e_ty, aliases)
        }
        Expr::Let(name, value, body) => {
            let value_ty = infer_expr(value, env, aliases);
            let mut inner = env.clone();
            inner.insert(name.clone(), value_ty);
            infer_expr(body, &inner, aliases)
        }
        Expr::Lambda(lambda) => infer_lambda(lambda, env, aliases).1,
        Expr::Call(name, args) => infer_call(name, args, env, aliases),
        Expr::StructLit(fields) => {
            Type::Struct(fields.iter().map(|(k, v)| (k.clone(), infer_expr(v, env, aliases))).collect())
        }
        Expr::FieldAccess(base, field) => match infer_expr(base, env, aliases).resolve(aliases) {
            Type::Struct(fields) => fields.get(field).cloned().unwrap_or(Type::Any),
            _ => Type::Any,
        },
        Expr::ArrayLit(items) => {
            let mut elem = Type::Any;
            for (i, item) in items.iter().enumerate() {
                let ty = infer_expr(item, env, aliases);
                elem = if i == 0 { ty } else { elem.lub(&ty, aliases) };
            }
            Type::Array(Box::new(elem))
        }
        Expr::ArrayAccess(array, _) => match infer_expr(array, env, aliases).resolve(aliases) {
            Type::Array(elem) => (*elem).clone(),
            _ => Type::Any,
        },
        Expr::Pre(stream, init) => env.get(stream).cloned().unwrap_or_else(|| infer_expr(init, env, aliases)),
        Expr::Fold(_, init, _) => infer_expr(init, env, aliases),
        Expr::Map(array, mapper) => {
            let elem = array_elem_type(array, env, aliases);
            let mut inner = env.clone();
            if let Some(param) = mapper.params.first() {
                inner.insert(param.clone(), elem);
            }
            Type::Array(Box::new(infer_expr(&mapper.body, &inner, aliases)))
        }
        Expr::Filter(array, _) => infer_expr(array, env, aliases),
        Expr::Reduce(_, init, _) => infer_expr(init, env, aliases),
    }
}

fn array_elem_type(array: &Expr, env: &BTreeMap<String, Type>, aliases: &BTreeMap<String, Type>) -> Type {
    match infer_expr(array, env, aliases).resolve(aliases) {
        Type::Array(elem) => (*elem).clone(),
        _ => Type::Any,
    }
}

fn infer_lambda(lambda: &Lambda, env: &BTreeMap<String, Type>, aliases: &BTreeMap<String, Type>) -> (Vec<Type>, Type) {
    let mut inner = env.clone();
    let params: Vec<Type> = lambda.params.iter().map(|_| Type::Any).collect();
    for param in &lambda.params {
        inner.insert(param.clone(), Type::Any);
    }
    (params, infer_expr(&lambda.body, &inner, aliases))
}

fn infer_binary(op: BinOp, lhs: &Expr, rhs: &Expr, env: &BTreeMap<String, Type>, aliases: &BTreeMap<String, Type>) -> Type {
    let l = infer_expr(lhs, env, aliases);
    let r = infer_expr(rhs, env, aliases);
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul => promote_arith(&l, &r),
        BinOp::Div => Type::Float,
        BinOp::Rem => Type::Int,
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::And | BinOp::Or => {
            Type::Bool
        }
    }
}

fn infer_call(name: &str, args: &[Expr], env: &BTreeMap<String, Type>, aliases: &BTreeMap<String, Type>) -> Type {
    if !BUILTIN_NAMES.contains(&name) {
        // A user function or an undefined one — the undefined-reference
        // check already flags the latter; inference just returns `Any`.
        return Type::Any;
    }
    match name {
        "abs" | "max" | "min" => args.first().map(|a| infer_expr(a, env, aliases)).unwrap_or(Type::Any),
        "sqrt" | "avg" => Type::Float,
        "len" | "count" | "count_if" => Type::Int,
        "head" | "last" => args
            .first()
            .map(|a| array_elem_type(a, env, aliases))
            .unwrap_or(Type::Any),
        "tail" | "reverse" | "transpose" => {
            args.first().map(|a| infer_expr(a, env, aliases)).unwrap_or(Type::Any)
        }
        "sum" => args
            .first()
            .map(|a| array_elem_type(a, env, aliases))
            .unwrap_or(Type::Any),
        _ => Type::Any,
    }
}
