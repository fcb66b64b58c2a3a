//! Second static check: every identifier a stream, sink, or function body
//! depends on must resolve to a declared source or stream (dotted field
//! paths are checked by their root only — struct-field validity is a
//! type-system concern, not a blocking one), and every function it calls
//! must be declared or built in.

use crate::ast::{extract_dependencies, Decl, Expr, Program};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::stdlib::BUILTIN_NAMES;
use std::collections::BTreeSet;

pub fn check(program: &Program) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let mut known_nodes = BTreeSet::new();
    let mut known_functions = BTreeSet::new();
    for decl in &program.decls {
        match decl {
            Decl::Source(s) => {
                known_nodes.insert(s.name.clone());
            }
            Decl::Stream(s) => {
                known_nodes.insert(s.name.clone());
            }
            Decl::Func(f) => {
                known_functions.insert(f.name.clone());
            }
            Decl::Sink(_) | Decl::Type(_) => {}
        }
    }

    for decl in &program.decls {
        let empty: Vec<String> = Vec::new();
        let (context, expr, extra_scope): (&str, &Expr, &[String]) = match decl {
            Decl::Stream(s) => (&s.name, &s.expr, &empty),
            Decl::Sink(s) => (&s.name, &s.expr, &empty),
            Decl::Func(f) => (&f.name, &f.body, f.params.as_slice()),
            Decl::Source(_) | Decl::Type(_) => continue,
        };

        for dep in extract_dependencies(expr) {
            let root = dep.split('.').next().unwrap().to_string();
            if extra_scope.contains(&root) {
                continue;
            }
            if !known_nodes.contains(&root) {
                diagnostics.push(Diagnostic::UndefinedReference {
                    name: dep,
                    in_context: context.to_string(),
                });
            }
        }

        if let Decl::Stream(s) = decl {
            if let Some(trigger) = &s.trigger {
                if !known_nodes.contains(trigger) {
                    diagnostics.push(Diagnostic::UndefinedReference {
                        name: trigger.clone(),
                        in_context: s.name.clone(),
                    });
                }
            }
        }

        for call in collect_calls(expr) {
            if !known_functions.contains(&call) && !BUILTIN_NAMES.contains(&call.as_str()) {
                diagnostics.push(Diagnostic::UndefinedReference {
                    name: call,
                    in_context: context.to_string(),
                });
            }
        }
    }
    diagnostics
}

fn collect_calls(expr: &Expr) -> Vec<String> {
    let mut out = Vec::new();
    walk_calls(expr, &mut out);
    out
}

fn walk_calls(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Str(_) | Expr::Ident(_) => {}
        Expr::Binary(_, lhs, rhs) => {
            walk_calls(lhs, out);
            walk_calls(rhs, out);
        }
        Expr::Unary(_, operand) => walk_calls(operand, out),
        Expr::If(c, t, e) => {
            walk_calls(c, out);
            walk_calls(t, out);
            walk_calls(e, out);
        }
        Expr::Let(_, value, body) => {
            walk_calls(value, out);
            walk_calls(body, out);
        }
        Expr::Lambda(lambda) => walk_calls(&lambda.body, out),
        Expr::Call(name, args) => {
            out.push(name.clone());
            for arg in args {
                walk_calls(arg, out);
            }
        }
        Expr::StructLit(fields) => {
            for v in fields.values() {
                walk_calls(v, out);
            }
        }
        Expr::FieldAccess(base, _) => walk_calls(base, out),
        Expr::ArrayLit(items) => {
            for item in items {
                walk_calls(item, out);
            }
        }
        Expr::ArrayAccess(array, index) => {
            walk_calls(array, out);
            walk_calls(index, out);
        }
        Expr::Pre(_, init) => walk_calls(init, out),
        Expr::Fold(source, init, accumulator) => {
            walk_calls(source, out);
            walk_calls(init, out);
            walk_calls(&accumulator.body, out);
        }
        Expr::Map(array, mapper) => {
            walk_calls(array, out);
            walk_calls(&mapper.body, out);
        }
        Expr::Filter(array, predicate) => {
            walk_calls(array, out);
            walk_calls(&predicate.body, out);
        }
        Expr::Reduce(array, init, accumulator) => {
            walk_calls(array, out);
            walk_calls(init, out);
            walk_calls(&accumulator.body, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    #[test]
    fn flags_reference_to_undeclared_stream() {
        let program = Program::new().stream("y", Expr::ident("nope"));
        assert!(check(&program).has_blocking());
    }

    #[test]
    fn flags_call_to_unknown_function() {
        let program = Program::new().stream("y", Expr::call("mystery", vec![Expr::Int(1)]));
        assert!(check(&program).has_blocking());
    }

    #[test]
    fn builtin_calls_are_not_flagged() {
        let program = Program::new().stream(
            "y",
            Expr::call("abs", vec![Expr::Int(-1)]),
        );
        assert!(check(&program).is_empty());
    }
}
