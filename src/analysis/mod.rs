//! The three blocking static checks, run as a fixed sequence of phases:
//! duplicate names, then undefined references, then cycles. Each phase
//! either passes clean or aborts the whole sequence with just its own
//! diagnostics - a program with both a duplicate stream name and an
//! undefined reference only ever reports the duplicate, since fixing it
//! may well resolve the undefined reference too, and undefined-reference
//! checking over a name table with duplicates in it isn't meaningful
//! anyway.

pub mod cycle;
pub mod duplicate;
pub mod undefined;

use crate::ast::Program;
use crate::diagnostics::Diagnostics;

pub fn run(program: &Program) -> Diagnostics {
    let duplicates = duplicate::check(program);
    if duplicates.has_blocking() {
        return duplicates;
    }
    let undefined = undefined::check(program);
    if undefined.has_blocking() {
        return undefined;
    }
    cycle::check(program)
}
