//! Per-node temporal state: a flat `Vec` of slots, one per `pre`/`fold`
//! subterm in the node's formula, indexed by the slot number `crate::ir`
//! assigned at lowering time. Dense and tagged-variant, not a sentinel
//! string-keyed map — a node's state shape is fixed at compile time and
//! never grows at runtime.

use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Cell {
    Pre { last: Option<Value> },
    Fold { initialized: bool, acc: Value },
}

impl Cell {
    pub fn new_pre() -> Self {
        Cell::Pre { last: None }
    }

    pub fn new_fold() -> Self {
        Cell::Fold { initialized: false, acc: Value::Unit }
    }
}

/// One node's full temporal state, sized to its lowered formula's
/// `slot_count` at construction time.
#[derive(Debug, Clone, Default)]
pub struct TemporalState {
    cells: Vec<Cell>,
}

impl TemporalState {
    pub fn new(cells: Vec<Cell>) -> Self {
        TemporalState { cells }
    }

    pub fn get(&self, slot: usize) -> &Cell {
        &self.cells[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut Cell {
        &mut self.cells[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_pre_cell_has_no_last_value() {
        let state = TemporalState::new(vec![Cell::new_pre()]);
        match state.get(0) {
            Cell::Pre { last } => assert!(last.is_none()),
            _ => panic!("expected Pre"),
        }
    }

    #[test]
    fn fresh_fold_cell_is_uninitialized() {
        let state = TemporalState::new(vec![Cell::new_fold()]);
        match state.get(0) {
            Cell::Fold { initialized, .. } => assert!(!initialized),
            _ => panic!("expected Fold"),
        }
    }
}
