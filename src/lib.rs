//! A glitch-free reactive dataflow core: given a program of sources,
//! derived streams, and sinks, [`compile`] builds a rank-ordered
//! dependency graph and hands back an [`Engine`] that can be fed events
//! one at a time via [`Engine::push_event`], propagating each one to
//! every transitively-affected node in a single ordered pass.
//!
//! No parser lives in this crate — a `Program` is built directly through
//! the `ast` constructors (or by a parser layered on top). This mirrors
//! the separation between a frontend's AST/IR and its evaluator.

#![deny(unsafe_code)]
#![forbid(unused_must_use)]

pub mod analysis;
pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod eval;
pub mod infer;
pub mod ir;
pub mod rank;
pub mod stdlib;
pub mod temporal;
pub mod ty;
pub mod value;

pub use compiler::{compile, CompileOptions};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use engine::Engine;
pub use error::{CompileError, EvalError};
pub use ty::Type;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{BinOp, Expr, Program};

    #[test]
    fn diamond_propagates_in_rank_order() {
        let program = Program::new()
            .source("root", Some(Type::Int), Some(Expr::Int(0)))
            .stream("left", Expr::ident("root"))
            .stream("right", Expr::ident("root"))
            .stream(
                "bottom",
                Expr::Binary(BinOp::Add, Box::new(Expr::ident("left")), Box::new(Expr::ident("right"))),
            );
        let mut engine = compile(program, CompileOptions::default()).unwrap();
        engine.push_event("root", Value::Int(5)).unwrap();
        assert_eq!(engine.read("bottom"), Some(&Value::Int(10)));
    }

    #[test]
    fn rejects_a_circular_program() {
        let program = Program::new().stream("a", Expr::ident("b")).stream("b", Expr::ident("a"));
        assert!(compile(program, CompileOptions::default()).is_err());
    }
}
