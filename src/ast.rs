//! Surface AST. This is what an external parser is expected to hand the
//! compiler; dependency extraction and the statefulness flag are
//! computed purely from this tree.

use crate::ty::Type;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Box<Expr>,
}

impl Lambda {
    pub fn new(params: Vec<&str>, body: Expr) -> Self {
        Lambda { params: params.into_iter().map(String::from).collect(), body: Box::new(body) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ident(String),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Let(String, Box<Expr>, Box<Expr>),
    Lambda(Lambda),
    Call(String, Vec<Expr>),
    StructLit(BTreeMap<String, Expr>),
    FieldAccess(Box<Expr>, String),
    ArrayLit(Vec<Expr>),
    ArrayAccess(Box<Expr>, Box<Expr>),
    /// `pre(stream, init)`.
    Pre(String, Box<Expr>),
    /// `fold(source, init, (acc, x) => body)`.
    Fold(Box<Expr>, Box<Expr>, Lambda),
    Map(Box<Expr>, Lambda),
    Filter(Box<Expr>, Lambda),
    /// `reduce(array, init, (acc, x) => body)` — eager, over all elements.
    Reduce(Box<Expr>, Box<Expr>, Lambda),
}

impl Expr {
    pub fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call(name.to_string(), args)
    }

    pub fn field(self, name: &str) -> Expr {
        Expr::FieldAccess(Box::new(self), name.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SourceDecl {
    pub name: String,
    pub type_sig: Option<Type>,
    pub initial: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct StreamDecl {
    pub name: String,
    pub type_sig: Option<Type>,
    pub expr: Expr,
    /// `on X` clause. `None` means `trigger = dependencies`.
    pub trigger: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SinkDecl {
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Source(SourceDecl),
    Stream(StreamDecl),
    Sink(SinkDecl),
    Func(FuncDecl),
    Type(TypeDecl),
}

/// The whole program, as handed to [`crate::compile`]. Built directly by
/// callers (or by a parser, once one exists) rather than parsed from text
/// — the parser is an external collaborator.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub decls: Vec<Decl>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn push(mut self, decl: Decl) -> Self {
        self.decls.push(decl);
        self
    }

    pub fn source(self, name: &str, type_sig: Option<Type>, initial: Option<Expr>) -> Self {
        self.push(Decl::Source(SourceDecl { name: name.to_string(), type_sig, initial }))
    }

    pub fn stream(self, name: &str, expr: Expr) -> Self {
        self.push(Decl::Stream(StreamDecl {
            name: name.to_string(),
            type_sig: None,
            expr,
            trigger: None,
        }))
    }

    pub fn stream_on(self, name: &str, expr: Expr, trigger: &str) -> Self {
        self.push(Decl::Stream(StreamDecl {
            name: name.to_string(),
            type_sig: None,
            expr,
            trigger: Some(trigger.to_string()),
        }))
    }

    pub fn sink(self, name: &str, expr: Expr) -> Self {
        self.push(Decl::Sink(SinkDecl { name: name.to_string(), expr }))
    }

    pub fn func(self, name: &str, params: Vec<&str>, body: Expr) -> Self {
        self.push(Decl::Func(FuncDecl {
            name: name.to_string(),
            params: params.into_iter().map(String::from).collect(),
            body,
        }))
    }

    pub fn type_alias(self, name: &str, ty: Type) -> Self {
        self.push(Decl::Type(TypeDecl { name: name.to_string(), ty }))
    }
}

/// Resolves the dotted field-access path of an expression, e.g. `p.x` ->
/// `Some("p.x")`, `line.start.x` -> `Some("line.start.x")`. Returns `None`
/// for anything that isn't a chain of field accesses rooted at an
/// identifier.
pub fn field_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(name) => Some(name.clone()),
        Expr::FieldAccess(base, field) => field_path(base).map(|b| format!("{}.{}", b, field)),
        _ => None,
    }
}

/// Extracts the set of free-variable dependencies of `expr`, given a scope
/// of locally-bound names (lambda parameters, `let` bindings). A dotted
/// field access contributes its full path as a single symbol; a
/// `pre(s, init)` contributes `s` even when `s` is the node's own name —
/// callers filter self-references out of the graph edge set afterwards
///.
pub fn extract_dependencies(expr: &Expr) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    let mut scope = BTreeSet::new();
    walk(expr, &mut scope, &mut deps);
    deps
}

fn walk(expr: &Expr, scope: &mut BTreeSet<String>, deps: &mut BTreeSet<String>) {
    match expr {
        Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Str(_) => {}
        Expr::Ident(name) => {
            if !scope.contains(name) {
                deps.insert(name.clone());
            }
        }
        Expr::Binary(_, lhs, rhs) => {
            walk(lhs, scope, deps);
            walk(rhs, scope, deps);
        }
        Expr::Unary(_, operand) => walk(operand, scope, deps),
        Expr::If(c, t, e) => {
            walk(c, scope, deps);
            walk(t, scope, deps);
            walk(e, scope, deps);
        }
        Expr::Let(name, value, body) => {
            walk(value, scope, deps);
            let added = scope.insert(name.clone());
            walk(body, scope, deps);
            if added {
                scope.remove(name);
            }
        }
        Expr::Lambda(lambda) => walk_lambda(lambda, scope, deps),
        Expr::Call(_, args) => {
            for arg in args {
                walk(arg, scope, deps);
            }
        }
        Expr::StructLit(fields) => {
            for value in fields.values() {
                walk(value, scope, deps);
            }
        }
        Expr::FieldAccess(..) => {
            // A field-access chain contributes exactly one symbol: its
            // full dotted path, rooted at the base identifier (if that
            // base is in scope, e.g. a lambda-bound struct, it's not a
            // dependency at all).
            if let Some(path) = field_path(expr) {
                let root = path.split('.').next().unwrap().to_string();
                if !scope.contains(&root) {
                    deps.insert(path);
                }
            } else if let Expr::FieldAccess(base, _) = expr {
                walk(base, scope, deps);
            }
        }
        Expr::ArrayLit(items) => {
            for item in items {
                walk(item, scope, deps);
            }
        }
        Expr::ArrayAccess(array, index) => {
            walk(array, scope, deps);
            walk(index, scope, deps);
        }
        Expr::Pre(stream, init) => {
            if !scope.contains(stream) {
                deps.insert(stream.clone());
            }
            walk(init, scope, deps);
        }
        Expr::Fold(source, init, accumulator) => {
            walk(source, scope, deps);
            walk(init, scope, deps);
            walk_lambda(accumulator, scope, deps);
        }
        Expr::Map(array, mapper) => {
            walk(array, scope, deps);
            walk_lambda(mapper, scope, deps);
        }
        Expr::Filter(array, predicate) => {
            walk(array, scope, deps);
            walk_lambda(predicate, scope, deps);
        }
        Expr::Reduce(array, init, accumulator) => {
            walk(array, scope, deps);
            walk(init, scope, deps);
            walk_lambda(accumulator, scope, deps);
        }
    }
}

fn walk_lambda(lambda: &Lambda, scope: &mut BTreeSet<String>, deps: &mut BTreeSet<String>) {
    let mut added = Vec::new();
    for param in &lambda.params {
        if scope.insert(param.clone()) {
            added.push(param.clone());
        }
    }
    walk(&lambda.body, scope, deps);
    for param in added {
        scope.remove(&param);
    }
}

/// True iff any subterm of `expr` is `pre` or `fold`.
pub fn is_stateful(expr: &Expr) -> bool {
    match expr {
        Expr::Pre(..) | Expr::Fold(..) => true,
        Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Str(_) | Expr::Ident(_) => false,
        Expr::Binary(_, lhs, rhs) => is_stateful(lhs) || is_stateful(rhs),
        Expr::Unary(_, operand) => is_stateful(operand),
        Expr::If(c, t, e) => is_stateful(c) || is_stateful(t) || is_stateful(e),
        Expr::Let(_, value, body) => is_stateful(value) || is_stateful(body),
        Expr::Lambda(lambda) => is_stateful(&lambda.body),
        Expr::Call(_, args) => args.iter().any(is_stateful),
        Expr::StructLit(fields) => fields.values().any(is_stateful),
        Expr::FieldAccess(base, _) => is_stateful(base),
        Expr::ArrayLit(items) => items.iter().any(is_stateful),
        Expr::ArrayAccess(array, index) => is_stateful(array) || is_stateful(index),
        Expr::Map(array, lambda) => is_stateful(array) || is_stateful(&lambda.body),
        Expr::Filter(array, lambda) => is_stateful(array) || is_stateful(&lambda.body),
        Expr::Reduce(array, init, lambda) => {
            is_stateful(array) || is_stateful(init) || is_stateful(&lambda.body)
        }
    }
}
