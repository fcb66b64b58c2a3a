//! End-to-end scenarios exercising the public `compile`/`push_event`/`read`
//! surface against small, literal programs built directly through the
//! `ast` constructors (no parser lives in this crate).

use ripple_core::ast::{self, BinOp, Decl, Expr, Program, StreamDecl};
use ripple_core::{compile, CompileError, CompileOptions, Diagnostic, Type, Value};
use std::collections::BTreeMap;

fn assert_close(actual: Option<&Value>, expected: f64) {
    match actual {
        Some(Value::Float(x)) => assert!((x - expected).abs() < 1e-9, "{} not close to {}", x, expected),
        other => panic!("expected a float close to {}, got {:?}", expected, other),
    }
}

/// Path reported by `CircularDependency` always repeats its start node at
/// the end; rotations of the same cycle are considered equal.
fn is_rotation_of(path: &[String], expected: &[&str]) -> bool {
    if path.len() != expected.len() + 1 || path.first() != path.last() {
        return false;
    }
    let cycle = &path[..path.len() - 1];
    let n = cycle.len();
    (0..n).any(|start| (0..n).all(|i| cycle[(start + i) % n] == expected[i]))
}

#[test]
fn diamond() {
    let program = Program::new()
        .source("A", Some(Type::Int), Some(Expr::Int(1)))
        .stream("B", Expr::Binary(BinOp::Mul, Box::new(Expr::ident("A")), Box::new(Expr::Int(2))))
        .stream("C", Expr::Binary(BinOp::Add, Box::new(Expr::ident("A")), Box::new(Expr::Int(1))))
        .stream("D", Expr::Binary(BinOp::Add, Box::new(Expr::ident("B")), Box::new(Expr::ident("C"))))
        .sink("out", Expr::ident("D"));
    let mut engine = compile(program, CompileOptions::default()).unwrap();

    assert_eq!(engine.read("out"), Some(&Value::Int(4)));

    engine.push_event("A", Value::Int(2)).unwrap();
    assert_eq!(engine.read("out"), Some(&Value::Int(7)));

    engine.push_event("A", Value::Int(5)).unwrap();
    assert_eq!(engine.read("out"), Some(&Value::Int(16)));

    engine.push_event("A", Value::Int(10)).unwrap();
    assert_eq!(engine.read("out"), Some(&Value::Int(31)));
}

#[test]
fn triggered_counter() {
    let program = Program::new().source("tick", Some(Type::Int), Some(Expr::Int(0))).push(Decl::Stream(StreamDecl {
        name: "n".to_string(),
        type_sig: Some(Type::Int),
        expr: Expr::Binary(
            BinOp::Add,
            Box::new(Expr::Pre("n".to_string(), Box::new(Expr::Int(0)))),
            Box::new(Expr::Int(1)),
        ),
        trigger: Some("tick".to_string()),
    }));
    let mut engine = compile(program, CompileOptions::default()).unwrap();

    assert_eq!(engine.read("n"), Some(&Value::Int(0)));

    engine.push_event("tick", Value::Int(1)).unwrap();
    assert_eq!(engine.read("n"), Some(&Value::Int(1)));

    // Same tick value pushed again: the trigger still fires on push, not
    // on a change of its own value.
    engine.push_event("tick", Value::Int(1)).unwrap();
    assert_eq!(engine.read("n"), Some(&Value::Int(2)));

    for _ in 0..3 {
        engine.push_event("tick", Value::Int(1)).unwrap();
    }
    assert_eq!(engine.read("n"), Some(&Value::Int(5)));
}

#[test]
fn struct_diamond_with_field_update() {
    let mut fields = BTreeMap::new();
    fields.insert("x".to_string(), Type::Int);
    fields.insert("y".to_string(), Type::Int);

    let mut initial = BTreeMap::new();
    initial.insert("x".to_string(), Expr::Int(3));
    initial.insert("y".to_string(), Expr::Int(4));

    let program = Program::new()
        .type_alias("P", Type::Struct(fields))
        .source("p", Some(Type::Named("P".to_string())), Some(Expr::StructLit(initial)))
        .stream(
            "d",
            Expr::call(
                "sqrt",
                vec![Expr::Binary(
                    BinOp::Add,
                    Box::new(Expr::Binary(
                        BinOp::Mul,
                        Box::new(Expr::ident("p").field("x")),
                        Box::new(Expr::ident("p").field("x")),
                    )),
                    Box::new(Expr::Binary(
                        BinOp::Mul,
                        Box::new(Expr::ident("p").field("y")),
                        Box::new(Expr::ident("p").field("y")),
                    )),
                )],
            ),
        )
        .sink("out", Expr::ident("d"));
    let mut engine = compile(program, CompileOptions::default()).unwrap();

    assert_close(engine.read("out"), 5.0);

    engine.push_event("p.x", Value::Int(6)).unwrap();
    assert_close(engine.read("out"), 52f64.sqrt());

    let mut zeroed = BTreeMap::new();
    zeroed.insert("x".to_string(), Value::Int(0));
    zeroed.insert("y".to_string(), Value::Int(0));
    engine.push_event("p", Value::Struct(zeroed)).unwrap();
    assert_close(engine.read("out"), 0.0);
}

#[test]
fn temporal_fold_averaging() {
    let program = Program::new()
        .source("v", Some(Type::Int), Some(Expr::Int(0)))
        .stream(
            "sum",
            Expr::Fold(
                Box::new(Expr::ident("v")),
                Box::new(Expr::Int(0)),
                ast::Lambda::new(vec!["a", "x"], Expr::Binary(BinOp::Add, Box::new(Expr::ident("a")), Box::new(Expr::ident("x")))),
            ),
        )
        .stream(
            "cnt",
            Expr::Fold(
                Box::new(Expr::ident("v")),
                Box::new(Expr::Int(0)),
                ast::Lambda::new(vec!["a", "x"], Expr::Binary(BinOp::Add, Box::new(Expr::ident("a")), Box::new(Expr::Int(1)))),
            ),
        )
        .sink("avg", Expr::Binary(BinOp::Div, Box::new(Expr::ident("sum")), Box::new(Expr::ident("cnt"))));
    let mut engine = compile(program, CompileOptions::default()).unwrap();

    engine.push_event("v", Value::Int(10)).unwrap();
    engine.push_event("v", Value::Int(20)).unwrap();
    engine.push_event("v", Value::Int(30)).unwrap();

    assert_eq!(engine.read("sum"), Some(&Value::Int(60)));
    assert_eq!(engine.read("cnt"), Some(&Value::Int(3)));
    assert_eq!(engine.read("avg"), Some(&Value::Float(20.0)));
}

#[test]
fn cycle_rejection() {
    let program = Program::new()
        .stream("A", Expr::Binary(BinOp::Add, Box::new(Expr::ident("B")), Box::new(Expr::Int(1))))
        .stream("B", Expr::Binary(BinOp::Add, Box::new(Expr::ident("C")), Box::new(Expr::Int(1))))
        .stream("C", Expr::Binary(BinOp::Add, Box::new(Expr::ident("A")), Box::new(Expr::Int(1))));

    match compile(program, CompileOptions::default()) {
        Err(CompileError::Diagnostics(diags)) => {
            let found = diags
                .iter()
                .any(|d| matches!(d, Diagnostic::CircularDependency { path } if is_rotation_of(path, &["A", "B", "C"])));
            assert!(found, "expected a circular dependency covering A, B, C");
        }
        other => panic!("expected a diagnostics failure, got {:?}", other),
    }
}

#[test]
fn undefined_reference() {
    let program = Program::new()
        .source("A", Some(Type::Int), Some(Expr::Int(1)))
        .stream("B", Expr::Binary(BinOp::Add, Box::new(Expr::ident("A")), Box::new(Expr::ident("Z"))));

    match compile(program, CompileOptions::default()) {
        Err(CompileError::Diagnostics(diags)) => {
            let found = diags
                .iter()
                .any(|d| matches!(d, Diagnostic::UndefinedReference { name, in_context } if name == "Z" && in_context == "B"));
            assert!(found, "expected an undefined reference to Z in B");
        }
        other => panic!("expected a diagnostics failure, got {:?}", other),
    }
}
