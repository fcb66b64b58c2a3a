//! Static-diagnostic collection: each analysis phase pushes everything it
//! finds into a [`Diagnostics`] batch before the orchestrator decides
//! whether to abort.

use crate::ty::Type;
use std::fmt;

/// Source position the parser would have attached, were one plugged in.
/// Always `None` in this crate since no parser is wired up; kept as a
/// field so a parser can attach real spans later without changing this
/// enum's shape.
pub type Span = Option<(u32, u32)>;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    DuplicateDefinition { name: String, first: Span, redefinition: Span },
    UndefinedReference { name: String, in_context: String },
    CircularDependency { path: Vec<String> },
    TypeMismatch { declared: Type, inferred: Type, context: String },
    /// A user-defined function body contains `pre` or `fold`. Functions
    /// are reusable and called from any number of nodes, so they have no
    /// slot-indexed state vector of their own to hold such a cell.
    StatefulFunction { name: String },
}

impl Diagnostic {
    /// Blocking diagnostics abort compilation; type mismatches are
    /// collected for documentation purposes only.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Diagnostic::TypeMismatch { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateDefinition { name, .. } => {
                write!(f, "duplicate definition of '{}'", name)
            }
            Diagnostic::UndefinedReference { name, in_context } => {
                write!(f, "undefined reference to '{}' in '{}'", name, in_context)
            }
            Diagnostic::CircularDependency { path } => {
                write!(f, "circular dependency: {}", path.join(" -> "))
            }
            Diagnostic::TypeMismatch { declared, inferred, context } => {
                write!(
                    f,
                    "type mismatch in '{}': declared {:?}, inferred {:?}",
                    context, declared, inferred
                )
            }
            Diagnostic::StatefulFunction { name } => {
                write!(f, "function '{}' uses 'pre' or 'fold', which functions cannot hold state for", name)
            }
        }
    }
}

/// A batch of diagnostics collected across the compiler's fixed phase order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(other);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True iff at least one collected diagnostic must abort compilation.
    pub fn has_blocking(&self) -> bool {
        self.items.iter().any(Diagnostic::is_blocking)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}
