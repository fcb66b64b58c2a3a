//! The expression evaluator: walks a lowered [`crate::ir::IrExpr`] against
//! an environment of currently-visible values, producing a [`Value`] or a
//! stratum-3 [`EvalError`] (errors here poison one node for one tick; they
//! never abort the pass, see `crate::engine`).

use crate::ast::{BinOp, UnOp};
use crate::error::EvalError;
use crate::ir::{IrExpr, IrLambda};
use crate::temporal::{Cell, TemporalState};
use crate::value::{self, Value};
use std::collections::BTreeMap;
use std::collections::HashMap;

/// A user-defined function: pure, so it carries no temporal state of its
/// own. A lowered function body that still contained `pre`/`fold` would
/// have nowhere to keep that state across calls from different nodes, so
/// the compiler rejects that combination before it reaches here (see
/// `crate::compiler`).
#[derive(Debug, Clone)]
pub struct UserFunction {
    pub params: Vec<String>,
    pub body: IrExpr,
}

pub type FuncTable = HashMap<String, UserFunction>;

/// Lexical environment: a global map of every other node's current value,
/// overlaid with `let`/lambda-parameter bindings introduced during this
/// evaluation. Lookups scan the overlay from the most recently pushed
/// binding back to the global scope.
pub struct Env<'a> {
    globals: &'a HashMap<String, Value>,
    locals: Vec<(String, Value)>,
}

impl<'a> Env<'a> {
    pub fn new(globals: &'a HashMap<String, Value>) -> Self {
        Env { globals, locals: Vec::new() }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v).or_else(|| self.globals.get(name))
    }

    fn push(&mut self, name: String, value: Value) {
        self.locals.push((name, value));
    }

    fn pop(&mut self) {
        self.locals.pop();
    }
}

/// Evaluates `expr` for `current_node`. Self-referential `pre` reads are
/// deferred: instead of writing `state[slot]` inline, the slot index is
/// appended to `pending_self_commits` and the caller (`crate::engine`)
/// commits the node's final output value into those slots once it's
/// known, after `eval` returns. Non-self-referential `pre` has no such
/// chicken-and-egg problem and commits its read inline.
pub fn eval(
    expr: &IrExpr,
    env: &mut Env,
    state: &mut TemporalState,
    current_node: &str,
    functions: &FuncTable,
    pending_self_commits: &mut Vec<usize>,
) -> Result<Value, EvalError> {
    match expr {
        IrExpr::Int(n) => Ok(Value::Int(*n)),
        IrExpr::Float(x) => Ok(Value::Float(*x)),
        IrExpr::Bool(b) => Ok(Value::Bool(*b)),
        IrExpr::Str(s) => Ok(Value::Str(s.clone())),
        IrExpr::Ident(name) => env
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownIdentifier(name.clone())),
        IrExpr::Binary(op, lhs, rhs) => {
            eval_binary(*op, lhs, rhs, env, state, current_node, functions, pending_self_commits)
        }
        IrExpr::Unary(op, operand) => {
            let v = eval(operand, env, state, current_node, functions, pending_self_commits)?;
            match op {
                UnOp::Neg => value::neg(&v),
                UnOp::Not => value::not(&v),
            }
        }
        IrExpr::If(c, t, e) => {
            let cond = eval(c, env, state, current_node, functions, pending_self_commits)?;
            if cond.as_bool()? {
                eval(t, env, state, current_node, functions, pending_self_commits)
            } else {
                eval(e, env, state, current_node, functions, pending_self_commits)
            }
        }
        IrExpr::Let(name, value_expr, body) => {
            let v = eval(value_expr, env, state, current_node, functions, pending_self_commits)?;
            env.push(name.clone(), v);
            let result = eval(body, env, state, current_node, functions, pending_self_commits);
            env.pop();
            result
        }
        IrExpr::Lambda(_) => Err(EvalError::Type("a lambda is not a first-class value here".to_string())),
        IrExpr::Call(name, args) => {
            eval_call(name, args, env, state, current_node, functions, pending_self_commits)
        }
        IrExpr::StructLit(fields) => {
            let mut out = BTreeMap::new();
            for (name, field_expr) in fields {
                out.insert(
                    name.clone(),
                    eval(field_expr, env, state, current_node, functions, pending_self_commits)?,
                );
            }
            Ok(Value::Struct(out))
        }
        IrExpr::FieldAccess(base, field) => {
            let v = eval(base, env, state, current_node, functions, pending_self_commits)?;
            v.as_struct()?
                .get(field)
                .cloned()
                .ok_or_else(|| EvalError::UnknownField(field.clone()))
        }
        IrExpr::ArrayLit(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, env, state, current_node, functions, pending_self_commits)?);
            }
            Ok(Value::Array(out))
        }
        IrExpr::ArrayAccess(array, index) => {
            let array_v = eval(array, env, state, current_node, functions, pending_self_commits)?;
            let index_v = eval(index, env, state, current_node, functions, pending_self_commits)?;
            let items = array_v.as_array()?;
            let i = index_v.as_index()?;
            if i < 0 || i as usize >= items.len() {
                return Err(EvalError::IndexOutOfBounds { index: i, len: items.len() });
            }
            Ok(items[i as usize].clone())
        }
        IrExpr::Pre { stream, init, slot } => {
            eval_pre(stream, init, *slot, env, state, current_node, functions, pending_self_commits)
        }
        IrExpr::Fold { source, init, accumulator, slot } => {
            eval_fold(source, init, accumulator, *slot, env, state, current_node, functions, pending_self_commits)
        }
        IrExpr::Map(array, mapper) => {
            let items = eval(array, env, state, current_node, functions, pending_self_commits)?
                .as_array()?
                .to_vec();
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(apply_lambda(mapper, &[item], env, state, current_node, functions, pending_self_commits)?);
            }
            Ok(Value::Array(out))
        }
        IrExpr::Filter(array, predicate) => {
            let items = eval(array, env, state, current_node, functions, pending_self_commits)?
                .as_array()?
                .to_vec();
            let mut out = Vec::new();
            for item in items {
                let keep = apply_lambda(predicate, &[item.clone()], env, state, current_node, functions, pending_self_commits)?;
                if keep.as_bool()? {
                    out.push(item);
                }
            }
            Ok(Value::Array(out))
        }
        IrExpr::Reduce(array, init, accumulator) => {
            let items = eval(array, env, state, current_node, functions, pending_self_commits)?
                .as_array()?
                .to_vec();
            let mut acc = eval(init, env, state, current_node, functions, pending_self_commits)?;
            for item in items {
                acc = apply_lambda(accumulator, &[acc, item], env, state, current_node, functions, pending_self_commits)?;
            }
            Ok(acc)
        }
    }
}

fn eval_binary(
    op: BinOp,
    lhs: &IrExpr,
    rhs: &IrExpr,
    env: &mut Env,
    state: &mut TemporalState,
    current_node: &str,
    functions: &FuncTable,
    pending: &mut Vec<usize>,
) -> Result<Value, EvalError> {
    // `&&`/`||` short-circuit; everything else evaluates both sides.
    if op == BinOp::And {
        let l = eval(lhs, env, state, current_node, functions, pending)?;
        if !l.as_bool()? {
            return Ok(Value::Bool(false));
        }
        return Ok(Value::Bool(eval(rhs, env, state, current_node, functions, pending)?.as_bool()?));
    }
    if op == BinOp::Or {
        let l = eval(lhs, env, state, current_node, functions, pending)?;
        if l.as_bool()? {
            return Ok(Value::Bool(true));
        }
        return Ok(Value::Bool(eval(rhs, env, state, current_node, functions, pending)?.as_bool()?));
    }
    let l = eval(lhs, env, state, current_node, functions, pending)?;
    let r = eval(rhs, env, state, current_node, functions, pending)?;
    match op {
        BinOp::Add => value::add(&l, &r),
        BinOp::Sub => value::sub(&l, &r),
        BinOp::Mul => value::mul(&l, &r),
        BinOp::Div => value::div(&l, &r),
        BinOp::Rem => value::rem(&l, &r),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            value::compare(&op, &l, &r)
        }
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

fn eval_pre(
    stream: &str,
    init: &IrExpr,
    slot: usize,
    env: &mut Env,
    state: &mut TemporalState,
    current_node: &str,
    functions: &FuncTable,
    pending: &mut Vec<usize>,
) -> Result<Value, EvalError> {
    let last = match state.get(slot) {
        Cell::Pre { last } => last.clone(),
        Cell::Fold { .. } => unreachable!("slot assigned to Pre but holds Fold"),
    };
    let value = match last {
        Some(v) => v,
        None => eval(init, env, state, current_node, functions, pending)?,
    };
    if stream == current_node {
        // Self-reference: defer the commit until this node's own output
        // is known, so `recompute` writes the value this tick produced,
        // not a stale read of it.
        pending.push(slot);
    } else {
        *state.get_mut(slot) = Cell::Pre { last: Some(value.clone()) };
    }
    Ok(value)
}

fn eval_fold(
    source: &IrExpr,
    init: &IrExpr,
    accumulator: &IrLambda,
    slot: usize,
    env: &mut Env,
    state: &mut TemporalState,
    current_node: &str,
    functions: &FuncTable,
    pending: &mut Vec<usize>,
) -> Result<Value, EvalError> {
    let (initialized, acc) = match state.get(slot) {
        Cell::Fold { initialized, acc } => (*initialized, acc.clone()),
        Cell::Pre { .. } => unreachable!("slot assigned to Fold but holds Pre"),
    };
    if !initialized {
        let init_value = eval(init, env, state, current_node, functions, pending)?;
        *state.get_mut(slot) = Cell::Fold { initialized: true, acc: init_value.clone() };
        return Ok(init_value);
    }
    let current = eval(source, env, state, current_node, functions, pending)?;
    let next = apply_lambda(accumulator, &[acc, current], env, state, current_node, functions, pending)?;
    *state.get_mut(slot) = Cell::Fold { initialized: true, acc: next.clone() };
    Ok(next)
}

fn apply_lambda(
    lambda: &IrLambda,
    args: &[Value],
    env: &mut Env,
    state: &mut TemporalState,
    current_node: &str,
    functions: &FuncTable,
    pending: &mut Vec<usize>,
) -> Result<Value, EvalError> {
    if lambda.params.len() != args.len() {
        return Err(EvalError::ArityMismatch {
            name: "<lambda>".to_string(),
            expected: lambda.params.len(),
            got: args.len(),
        });
    }
    for (param, arg) in lambda.params.iter().zip(args) {
        env.push(param.clone(), arg.clone());
    }
    let result = eval(&lambda.body, env, state, current_node, functions, pending);
    for _ in &lambda.params {
        env.pop();
    }
    result
}

fn eval_call(
    name: &str,
    args: &[IrExpr],
    env: &mut Env,
    state: &mut TemporalState,
    current_node: &str,
    functions: &FuncTable,
    pending: &mut Vec<usize>,
) -> Result<Value, EvalError> {
    // `count_if` is the one builtin that takes a lambda literal
    // syntactically rather than a first-evaluated array of values.
    if name == "count_if" {
        if args.len() != 2 {
            return Err(EvalError::ArityMismatch { name: name.to_string(), expected: 2, got: args.len() });
        }
        let items =
            eval(&args[0], env, state, current_node, functions, pending)?.as_array()?.to_vec();
        let lambda = match &args[1] {
            IrExpr::Lambda(l) => l,
            _ => return Err(EvalError::Type("count_if's second argument must be a lambda".to_string())),
        };
        let mut count = 0i64;
        for item in items {
            if apply_lambda(lambda, &[item], env, state, current_node, functions, pending)?.as_bool()? {
                count += 1;
            }
        }
        return Ok(Value::Int(count));
    }

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(arg, env, state, current_node, functions, pending)?);
    }

    if let Some(func) = functions.get(name) {
        if func.params.len() != values.len() {
            return Err(EvalError::ArityMismatch {
                name: name.to_string(),
                expected: func.params.len(),
                got: values.len(),
            });
        }
        for (param, v) in func.params.iter().zip(&values) {
            env.push(param.clone(), v.clone());
        }
        let result = eval(&func.body, env, state, current_node, functions, pending);
        for _ in &func.params {
            env.pop();
        }
        return result;
    }

    call_builtin(name, &values)
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let expected = *crate::stdlib::BUILTIN_ARITY
        .get(name)
        .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
    if args.len() != expected {
        return Err(EvalError::ArityMismatch { name: name.to_string(), expected, got: args.len() });
    }
    match name {
        "abs" => match &args[0] {
            Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
            Value::Float(x) => Ok(Value::Float(x.abs())),
            _ => Err(EvalError::Type("abs requires a numeric argument".to_string())),
        },
        "sqrt" => Ok(Value::Float(args[0].as_f64()?.sqrt())),
        "max" => Ok(if args[0].as_f64()? >= args[1].as_f64()? { args[0].clone() } else { args[1].clone() }),
        "min" => Ok(if args[0].as_f64()? <= args[1].as_f64()? { args[0].clone() } else { args[1].clone() }),
        "len" | "count" => Ok(Value::Int(args[0].as_array()?.len() as i64)),
        "head" => args[0].as_array()?.first().cloned().ok_or(EvalError::IndexOutOfBounds { index: 0, len: 0 }),
        "tail" => {
            let items = args[0].as_array()?;
            Ok(Value::Array(items.iter().skip(1).cloned().collect()))
        }
        "last" => args[0].as_array()?.last().cloned().ok_or(EvalError::IndexOutOfBounds { index: 0, len: 0 }),
        "sum" => sum_array(args[0].as_array()?),
        "reverse" => {
            let mut items = args[0].as_array()?.to_vec();
            items.reverse();
            Ok(Value::Array(items))
        }
        "avg" => {
            let items = args[0].as_array()?;
            if items.is_empty() {
                return Err(EvalError::DivisionByZero);
            }
            let total = sum_array(items)?.as_f64()?;
            Ok(Value::Float(total / items.len() as f64))
        }
        "transpose" => transpose(args[0].as_array()?),
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn sum_array(items: &[Value]) -> Result<Value, EvalError> {
    let mut acc = Value::Int(0);
    for item in items {
        acc = value::add(&acc, item)?;
    }
    Ok(acc)
}

fn transpose(rows: &[Value]) -> Result<Value, EvalError> {
    let mut matrix = Vec::with_capacity(rows.len());
    for row in rows {
        matrix.push(row.as_array()?.to_vec());
    }
    let width = matrix.first().map_or(0, |r| r.len());
    let mut out = Vec::with_capacity(width);
    for col in 0..width {
        let mut column = Vec::with_capacity(matrix.len());
        for row in &matrix {
            column.push(row.get(col).cloned().ok_or(EvalError::IndexOutOfBounds { index: col as i64, len: row.len() })?);
        }
        out.push(Value::Array(column));
    }
    Ok(Value::Array(out))
}
