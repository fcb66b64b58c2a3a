//! The compilation pipeline: a fixed sequence of phases that takes a
//! surface [`Program`] to a ready-to-run [`Engine`]. Each phase either
//! extends a shared accumulator (aliases, functions, node types) or
//! contributes diagnostics to a single batch; nothing is checked in
//! isolation; the whole batch is judged together before any node is
//! built.

use crate::analysis;
use crate::ast::{self, Decl, Program};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::engine::node::{GraphNode, NodeKind};
use crate::engine::Engine;
use crate::error::CompileError;
use crate::eval::{self, Env, FuncTable, UserFunction};
use crate::infer;
use crate::ir;
use crate::temporal::{Cell, TemporalState};
use crate::ty::Type;
use crate::value::{default_of, Value};
use std::collections::{BTreeMap, HashMap};

/// Knobs the surrounding analyses/checks respect. The one interesting
/// setting today governs whether `TypeMismatch` — non-blocking by
/// default — aborts compilation like the other
/// three diagnostics.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub promote_type_mismatch_to_blocking: bool,
}

pub fn compile(program: Program, options: CompileOptions) -> Result<Engine, CompileError> {
    log::debug!("compiling program with {} declarations", program.decls.len());

    // Phase 1: alias table.
    let aliases: BTreeMap<String, Type> = program
        .decls
        .iter()
        .filter_map(|d| match d {
            Decl::Type(t) => Some((t.name.clone(), t.ty.clone())),
            _ => None,
        })
        .collect();

    let mut diagnostics = Diagnostics::new();

    // Phase 2: function table. A function whose body is stateful is
    // rejected outright — it has no per-call slot vector to hold that
    // state in, see crate::diagnostics::Diagnostic::StatefulFunction.
    let mut functions = FuncTable::new();
    for decl in &program.decls {
        if let Decl::Func(f) = decl {
            if ast::is_stateful(&f.body) {
                diagnostics.push(Diagnostic::StatefulFunction { name: f.name.clone() });
                continue;
            }
            let lowered = ir::lower(&f.body);
            functions.insert(f.name.clone(), UserFunction { params: f.params.clone(), body: lowered.expr });
        }
    }

    // Phase 3: best-effort type inference (documentation pass).
    let inference = infer::run(&program, &aliases);
    diagnostics.extend(inference.diagnostics.into_vec());

    // Phases 4-6: the three blocking static checks, in fixed order.
    diagnostics.extend(analysis::run(&program).into_vec());

    let blocking = diagnostics.iter().any(|d| {
        d.is_blocking() || (options.promote_type_mismatch_to_blocking && matches!(d, Diagnostic::TypeMismatch { .. }))
    });
    if blocking {
        log::warn!("compilation rejected with {} diagnostic(s)", diagnostics.iter().count());
        return Err(CompileError::Diagnostics(diagnostics));
    }

    // Phase 7: register sources, expanding struct-typed sources into one
    // field source per member plus a synthetic assembly stream.
    let mut name_to_id: HashMap<String, usize> = HashMap::new();
    let mut kinds: Vec<NodeKind> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    // Deferred work, filled in once every name has an id.
    let mut source_initials: HashMap<usize, Value> = HashMap::new();
    let mut stream_exprs: HashMap<usize, ast::Expr> = HashMap::new();
    let mut stream_triggers: HashMap<usize, String> = HashMap::new();
    let mut stream_types: HashMap<usize, Type> = HashMap::new();
    // Struct source name -> its field names, e.g. "p" -> ["x", "y"]. Lets
    // a whole-record push fan out to the expanded field sources, and lets
    // the assembly stream's dependency edges skip the generic
    // field-path-to-first-segment truncation below (it really does read
    // every field source directly, unlike a user formula's `p.x`).
    let mut struct_sources: HashMap<String, Vec<String>> = HashMap::new();

    fn declare(names: &mut Vec<String>, kinds: &mut Vec<NodeKind>, name_to_id: &mut HashMap<String, usize>, name: String, kind: NodeKind) -> usize {
        let id = names.len();
        name_to_id.insert(name.clone(), id);
        names.push(name);
        kinds.push(kind);
        id
    }

    /// A dotted dependency (`p.x`) keeps its full path when that path
    /// itself names a registered field-source node, so a consumer reading
    /// one field of a struct-expanded source depends on just that field
    /// rather than the whole assembled stream. Otherwise (the base isn't
    /// struct-expanded, or the dotted name isn't a node at all) it is
    /// truncated to its base name.
    fn normalize_dependency(dep: &str, name_to_id: &HashMap<String, usize>) -> String {
        if name_to_id.contains_key(dep) {
            dep.to_string()
        } else {
            dep.split('.').next().unwrap().to_string()
        }
    }

    for decl in &program.decls {
        if let Decl::Source(s) = decl {
            let resolved_ty = s.type_sig.as_ref().map(|t| t.resolve(&aliases).clone());
            match resolved_ty {
                Some(Type::Struct(fields)) => {
                    let initial_fields: Option<BTreeMap<String, Value>> = match &s.initial {
                        Some(expr) => match eval_constant(&s.name, expr, &functions)? {
                            Value::Struct(map) => Some(map),
                            _ => None,
                        },
                        None => None,
                    };
                    let mut field_names = Vec::new();
                    for (field_name, field_ty) in &fields {
                        let full = format!("{}.{}", s.name, field_name);
                        let id = declare(&mut names, &mut kinds, &mut name_to_id, full, NodeKind::Source);
                        let value = initial_fields
                            .as_ref()
                            .and_then(|m| m.get(field_name).cloned())
                            .unwrap_or_else(|| default_of(field_ty));
                        source_initials.insert(id, value);
                        field_names.push(field_name.clone());
                    }
                    let assembly_expr = ast::Expr::StructLit(
                        fields.keys().map(|f| (f.clone(), ast::Expr::ident(&format!("{}.{}", s.name, f)))).collect(),
                    );
                    let id = declare(&mut names, &mut kinds, &mut name_to_id, s.name.clone(), NodeKind::Stream);
                    stream_exprs.insert(id, assembly_expr);
                    struct_sources.insert(s.name.clone(), field_names);
                }
                other => {
                    let id = declare(&mut names, &mut kinds, &mut name_to_id, s.name.clone(), NodeKind::Source);
                    let initial = match &s.initial {
                        Some(expr) => eval_constant(&s.name, expr, &functions)?,
                        None => default_of(&other.unwrap_or(Type::Any)),
                    };
                    source_initials.insert(id, initial);
                }
            }
        }
    }

    for decl in &program.decls {
        if let Decl::Stream(s) = decl {
            let id = declare(&mut names, &mut kinds, &mut name_to_id, s.name.clone(), NodeKind::Stream);
            stream_exprs.insert(id, s.expr.clone());
            if let Some(trigger) = &s.trigger {
                stream_triggers.insert(id, trigger.clone());
            }
            if let Some(ty) = &s.type_sig {
                stream_types.insert(id, ty.resolve(&aliases).clone());
            }
        }
    }

    for decl in &program.decls {
        if let Decl::Sink(s) = decl {
            let id = declare(&mut names, &mut kinds, &mut name_to_id, s.name.clone(), NodeKind::Sink);
            stream_exprs.insert(id, s.expr.clone());
        }
    }

    // Phase 8: rank assignment.
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for name in &names {
        adjacency.entry(name.clone()).or_default();
    }
    for (&id, expr) in &stream_exprs {
        let name = &names[id];
        let deps: Vec<String> = match struct_sources.get(name) {
            Some(fields) => fields.iter().map(|f| format!("{}.{}", name, f)).collect(),
            None => ast::extract_dependencies(expr)
                .into_iter()
                .map(|d| normalize_dependency(&d, &name_to_id))
                .filter(|d| d != name)
                .collect(),
        };
        adjacency.insert(name.clone(), deps);
    }
    let ranks = crate::rank::assign_ranks(&adjacency);

    // Phases 9-10: build every non-source node's formula, state, rank,
    // and scheduling edges, then push it into the engine in rank order
    // (sinks are built in the same pass; they just never appear on the
    // left-hand side of a dependents edge).
    let mut nodes: Vec<Option<GraphNode>> = (0..names.len()).map(|_| None).collect();
    let mut schedule_on: Vec<Vec<usize>> = vec![Vec::new(); names.len()];

    for (id, name) in names.iter().enumerate() {
        match kinds[id] {
            NodeKind::Source => {
                nodes[id] = Some(GraphNode {
                    name: name.clone(),
                    kind: NodeKind::Source,
                    rank: 0,
                    formula: None,
                    dependency_ids: Vec::new(),
                    trigger: None,
                    cached_value: source_initials.remove(&id).unwrap_or(Value::Unit),
                    state: TemporalState::new(Vec::new()),
                });
            }
            NodeKind::Stream | NodeKind::Sink => {
                let expr = stream_exprs.get(&id).expect("every stream/sink has a recorded formula");
                let lowered = ir::lower(expr);
                let state = TemporalState::new(
                    lowered
                        .slot_kinds
                        .iter()
                        .map(|k| match k {
                            ir::SlotKind::Pre => Cell::new_pre(),
                            ir::SlotKind::Fold => Cell::new_fold(),
                        })
                        .collect(),
                );
                let trigger_name = stream_triggers.get(&id);
                let trigger_id = trigger_name.map(|t| name_to_id[t]);
                let dependency_ids: Vec<usize> = match struct_sources.get(name) {
                    Some(fields) => {
                        fields.iter().map(|f| name_to_id[&format!("{}.{}", name, f)]).collect()
                    }
                    None => ast::extract_dependencies(expr)
                        .into_iter()
                        .map(|d| normalize_dependency(&d, &name_to_id))
                        .filter(|d| d != name)
                        .filter_map(|d| name_to_id.get(&d).copied())
                        .collect(),
                };
                schedule_on[id] = match trigger_id {
                    Some(t) => vec![t],
                    None => dependency_ids.clone(),
                };
                // A triggered stream's formula never runs until its
                // trigger fires for the first time; until then it holds
                // its declared type's zero value.
                let initial_cached = trigger_id
                    .map(|_| default_of(stream_types.get(&id).unwrap_or(&Type::Any)))
                    .unwrap_or(Value::Unit);
                nodes[id] = Some(GraphNode {
                    name: name.clone(),
                    kind: kinds[id],
                    rank: ranks.get(name).copied().unwrap_or(0),
                    formula: Some(lowered.expr),
                    dependency_ids,
                    trigger: trigger_id,
                    cached_value: initial_cached,
                    state,
                });
            }
        }
    }

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
    for (id, deps) in schedule_on.iter().enumerate() {
        for &dep in deps {
            dependents[dep].push(id);
        }
    }

    let mut nodes: Vec<GraphNode> = nodes.into_iter().map(|n| n.expect("every node built above")).collect();
    for node in &nodes {
        log::debug!("registered '{}' ({:?}) at rank {}", node.name, node.kind, node.rank);
    }
    let sink_ids: Vec<usize> = (0..names.len()).filter(|&id| kinds[id] == NodeKind::Sink).collect();

    // Phase 11: topological (cold-start) initialization. Every source
    // already has its value; every stream and sink gets one recompute in
    // rank order so the graph starts in a settled state rather than all
    // zeros. Triggered streams skip this and keep their declared/zero
    // default until their trigger actually fires.
    let mut order: Vec<usize> = (0..nodes.len()).filter(|&id| kinds[id] != NodeKind::Source).collect();
    order.sort_by_key(|&id| nodes[id].rank);
    for id in order {
        if nodes[id].trigger.is_some() {
            continue;
        }
        let values_by_name: HashMap<String, Value> =
            nodes.iter().map(|n| (n.name.clone(), n.cached_value.clone())).collect();
        match nodes[id].recompute(&values_by_name, &functions) {
            Ok(value) => nodes[id].cached_value = value,
            Err(err) => log::warn!("node '{}' failed to initialize: {}", nodes[id].name, err),
        }
    }

    Ok(Engine { nodes, name_to_id, dependents, functions, sink_ids, struct_sources })
}

/// Evaluates a source's literal initializer, which by construction reads
/// no other node (sources are always rank 0).
fn eval_constant(source_name: &str, expr: &ast::Expr, functions: &FuncTable) -> Result<Value, CompileError> {
    let lowered = ir::lower(expr);
    let mut state = TemporalState::new(
        lowered
            .slot_kinds
            .iter()
            .map(|k| match k {
                ir::SlotKind::Pre => Cell::new_pre(),
                ir::SlotKind::Fold => Cell::new_fold(),
            })
            .collect(),
    );
    let globals = HashMap::new();
    let mut env = Env::new(&globals);
    let mut pending = Vec::new();
    eval::eval(&lowered.expr, &mut env, &mut state, source_name, functions, &mut pending)
        .map_err(|cause| CompileError::InvalidSourceInitializer { name: source_name.to_string(), cause })
}
