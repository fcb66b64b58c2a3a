//! First of the three fixed-order static checks: every source, stream,
//! sink, function, and type-alias name must be unique within its own
//! namespace. Source/stream/sink share one namespace (the node graph
//! itself - a stream could otherwise shadow a source of the same name
//! and silently change which one other nodes resolve against), while
//! functions and type aliases each get their own, disjoint namespace: a
//! type alias and a stream of the same name don't collide.

use crate::ast::{Decl, Program};
use crate::diagnostics::{Diagnostic, Diagnostics};
use std::collections::HashMap;

#[derive(PartialEq, Eq, Hash)]
enum Namespace {
    Node,
    Func,
    Type,
}

pub fn check(program: &Program) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let mut seen: HashMap<(Namespace, &str), ()> = HashMap::new();
    for decl in &program.decls {
        let (namespace, name) = decl_namespace_and_name(decl);
        if seen.insert((namespace, name), ()).is_some() {
            diagnostics.push(Diagnostic::DuplicateDefinition {
                name: name.to_string(),
                first: None,
                redefinition: None,
            });
        }
    }
    diagnostics
}

fn decl_namespace_and_name(decl: &Decl) -> (Namespace, &str) {
    match decl {
        Decl::Source(s) => (Namespace::Node, &s.name),
        Decl::Stream(s) => (Namespace::Node, &s.name),
        Decl::Sink(s) => (Namespace::Node, &s.name),
        Decl::Func(f) => (Namespace::Func, &f.name),
        Decl::Type(t) => (Namespace::Type, &t.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    #[test]
    fn flags_a_stream_reusing_a_source_name() {
        let program = Program::new().source("x", None, None).stream("x", Expr::Int(1));
        let diagnostics = check(&program);
        assert!(diagnostics.has_blocking());
    }

    #[test]
    fn distinct_names_are_clean() {
        let program = Program::new().source("x", None, None).stream("y", Expr::ident("x"));
        assert!(check(&program).is_empty());
    }

    #[test]
    fn a_type_alias_and_a_stream_sharing_a_name_do_not_collide() {
        let program = Program::new().type_alias("P", crate::ty::Type::Int).stream("P", Expr::Int(1));
        assert!(check(&program).is_empty());
    }
}
