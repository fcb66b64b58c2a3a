//! The runtime: a compiled dependency graph plus the rank-ordered
//! propagation pass that keeps it glitch-free. Built exclusively by
//! [`crate::compile`] — there is no public constructor here, since a
//! graph's ranks, slots, and dependency edges only make sense as the
//! output of the fixed compilation pipeline.

pub mod node;
pub mod scheduler;

use crate::error::EvalError;
use crate::eval::FuncTable;
use crate::value::Value;
use node::{GraphNode, NodeKind};
use scheduler::Scheduler;
use std::collections::HashMap;

pub struct Engine {
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) name_to_id: HashMap<String, usize>,
    /// Reverse edges used purely to decide what to re-schedule when a
    /// node changes. For a triggered stream this is just `[trigger_id]`,
    /// not its full formula dependency set.
    pub(crate) dependents: Vec<Vec<usize>>,
    pub(crate) functions: FuncTable,
    pub(crate) sink_ids: Vec<usize>,
    /// Struct source name -> its field names, e.g. `"p" -> ["x", "y"]`.
    /// Lets `push_event` fan a whole-record push out into one push per
    /// expanded field source before a single propagation pass.
    pub(crate) struct_sources: HashMap<String, Vec<String>>,
}

impl Engine {
    pub fn node_id(&self, name: &str) -> Option<usize> {
        self.name_to_id.get(name).copied()
    }

    /// Pushes a new value into a source, or a struct source's field, or a
    /// whole record into a struct-expanded source name — which is
    /// rewritten into one push per expanded field, followed by a single
    /// propagation pass. Triggers one glitch-free propagation pass over
    /// every transitively-dependent node, in rank order. A runtime error
    /// in any one node poisons only that node for this tick — its cached
    /// value is left untouched and it does not propagate further, but
    /// every other node still updates normally.
    pub fn push_event(&mut self, source_name: &str, value: Value) -> Result<(), EvalError> {
        if let Some(fields) = self.struct_sources.get(source_name).cloned() {
            let mut remaining = value.as_struct()?.clone();
            let touched: Vec<usize> = fields
                .iter()
                .map(|field| {
                    let full = format!("{}.{}", source_name, field);
                    let id = self.name_to_id[&full];
                    if let Some(field_value) = remaining.remove(field) {
                        self.nodes[id].cached_value = field_value;
                    }
                    id
                })
                .collect();
            log::debug!("push '{}': {} field node(s) touched", source_name, touched.len());
            self.propagate(&touched);
            return Ok(());
        }

        let id = self
            .name_to_id
            .get(source_name)
            .copied()
            .ok_or_else(|| EvalError::UnknownSource(source_name.to_string()))?;
        if self.nodes[id].kind != NodeKind::Source {
            return Err(EvalError::PushToNonSource(source_name.to_string()));
        }
        self.nodes[id].cached_value = value;
        log::debug!("push '{}': 1 node touched", source_name);
        self.propagate(&[id]);
        Ok(())
    }

    pub fn read(&self, name: &str) -> Option<&Value> {
        self.name_to_id.get(name).map(|&id| &self.nodes[id].cached_value)
    }

    /// Current value of every sink, in declaration order.
    pub fn sink_values(&self) -> Vec<(&str, &Value)> {
        self.sink_ids.iter().map(|&id| (self.nodes[id].name.as_str(), &self.nodes[id].cached_value)).collect()
    }

    /// A human-readable dump of every node's name, rank, and current
    /// value, ordered by rank then name.
    pub fn debug_dump(&self) -> String {
        let mut order: Vec<usize> = (0..self.nodes.len()).collect();
        order.sort_by_key(|&id| (self.nodes[id].rank, self.nodes[id].name.clone()));
        let mut out = String::new();
        for id in order {
            let node = &self.nodes[id];
            out.push_str(&format!(
                "[rank {}] {} ({:?}) = {}\n",
                node.rank, node.name, node.kind, node.cached_value
            ));
        }
        out
    }

    fn propagate(&mut self, fired_seeds: &[usize]) {
        let mut scheduler = Scheduler::new();
        for &seed in fired_seeds {
            for &dependent in &self.dependents[seed] {
                scheduler.schedule(dependent, self.nodes[dependent].rank);
            }
        }

        while let Some(id) = scheduler.pop() {
            let values_by_name: HashMap<String, Value> =
                self.nodes.iter().map(|n| (n.name.clone(), n.cached_value.clone())).collect();

            let triggered = self.nodes[id].trigger.is_some();
            let old_value = self.nodes[id].cached_value.clone();
            match self.nodes[id].recompute(&values_by_name, &self.functions) {
                Ok(new_value) => {
                    let changed = new_value != old_value;
                    self.nodes[id].cached_value = new_value;
                    let should_fire = if triggered { true } else { changed };
                    if should_fire {
                        for &dependent in &self.dependents[id] {
                            scheduler.schedule(dependent, self.nodes[dependent].rank);
                        }
                    }
                }
                Err(err) => {
                    log::warn!("node '{}' failed to evaluate: {}", self.nodes[id].name, err);
                }
            }
        }
    }
}
