//! The fixed table of built-in functions, shared by the undefined-
//! reference check (a call to anything outside this list and the user's
//! own function declarations is flagged) and the evaluator's builtin
//! dispatch in [`crate::eval`]. `lazy_static` mirrors how interned,
//! process-lifetime lookup tables like this one are built elsewhere in
//! this codebase's lineage, rather than reconstructing the table (or a
//! `OnceCell`) by hand at every call site.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// name -> expected argument count, used for the builtin arity check.
    pub static ref BUILTIN_ARITY: HashMap<&'static str, usize> = {
        let mut m = HashMap::new();
        m.insert("abs", 1);
        m.insert("sqrt", 1);
        m.insert("max", 2);
        m.insert("min", 2);
        m.insert("len", 1);
        m.insert("head", 1);
        m.insert("tail", 1);
        m.insert("last", 1);
        m.insert("sum", 1);
        m.insert("reverse", 1);
        m.insert("avg", 1);
        m.insert("count", 1);
        m.insert("count_if", 2);
        m.insert("transpose", 1);
        m
    };
}

pub const BUILTIN_NAMES: &[&str] = &[
    "abs", "sqrt", "max", "min", "len", "head", "tail", "last", "sum", "reverse", "avg", "count",
    "count_if", "transpose",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_name_has_an_arity_entry() {
        for name in BUILTIN_NAMES {
            assert!(BUILTIN_ARITY.contains_key(name), "missing arity for {}", name);
        }
    }
}
