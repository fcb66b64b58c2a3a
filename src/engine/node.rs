//! A single node in the compiled dependency graph: a source, a derived
//! stream, a struct field-assembly stream, or a sink. All four share one
//! representation — a name, a rank, an optional formula, the dependency
//! ids it reads from, and the cached value/temporal state a recompute
//! leaves behind.

use crate::eval::{self, Env, FuncTable};
use crate::ir::IrExpr;
use crate::temporal::{Cell, TemporalState};
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Stream,
    Sink,
}

pub struct GraphNode {
    pub name: String,
    pub kind: NodeKind,
    pub rank: u32,
    /// `None` for sources: they only ever receive pushed values.
    pub formula: Option<IrExpr>,
    /// Node ids this node reads from. For a triggered stream this is
    /// still every identifier the formula mentions (struct field access
    /// on another node, say) — `trigger` below is what actually gates
    /// recomputation, not this list.
    pub dependency_ids: Vec<usize>,
    /// `on X` clause: when set, only a push that changed `trigger`'s
    /// value schedules a recompute, even if other dependencies changed
    /// too, and the formula is skipped entirely at graph-build time in
    /// favor of `default_of(declared type)`.
    pub trigger: Option<usize>,
    pub cached_value: Value,
    pub state: TemporalState,
}

impl GraphNode {
    /// Re-evaluates this node's formula against the current values of its
    /// dependencies. `values_by_id` is the whole graph's cached values —
    /// passing it wholesale keeps lookups O(1) without threading a
    /// dependency-specific slice through `crate::eval`.
    pub fn recompute(
        &mut self,
        values_by_name: &HashMap<String, Value>,
        functions: &FuncTable,
    ) -> Result<Value, crate::error::EvalError> {
        let formula = self.formula.as_ref().expect("recompute called on a source");
        let mut env = Env::new(values_by_name);
        let mut pending_self_commits = Vec::new();
        let result = eval::eval(
            formula,
            &mut env,
            &mut self.state,
            &self.name,
            functions,
            &mut pending_self_commits,
        )?;
        log::trace!("recomputed '{}': {} -> {}", self.name, self.cached_value, result);
        for slot in pending_self_commits {
            *self.state.get_mut(slot) = Cell::Pre { last: Some(result.clone()) };
        }
        Ok(result)
    }
}
