//! The structural type universe: basic types, arrays, structs,
//! function types, and named aliases. Kept separate from [`crate::value`]
//! because annotations and inferred shapes exist even for nodes whose
//! formula never runs (e.g. a triggered stream before its first trigger).

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    /// Universally compatible; also the fallback for anything the
    /// inferencer can't pin down.
    Any,
    Array(Box<Type>),
    Struct(BTreeMap<String, Type>),
    Function(Vec<Type>, Box<Type>),
    /// An alias reference, resolved against the program's type-alias
    /// table before use. Left unresolved only transiently during
    /// compilation.
    Named(String),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Any => write!(f, "any"),
            Type::Array(t) => write!(f, "[{}]", t),
            Type::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, "}}")
            }
            Type::Function(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Named(name) => write!(f, "{}", name),
        }
    }
}

impl Type {
    /// Resolves a single level of `Named` indirection against `aliases`.
    /// Does not recurse into `Array`/`Struct`/`Function` members — callers
    /// resolve the whole program's alias table once up front. A name
    /// missing from `aliases` (a caller referencing an alias it never
    /// declared) is left as the unresolved `Named` variant rather than
    /// erroring here; nothing in this crate currently declares that an
    /// error.
    pub fn resolve<'a>(&'a self, aliases: &'a BTreeMap<String, Type>) -> &'a Type {
        match self {
            Type::Named(name) => match aliases.get(name) {
                Some(resolved) if !matches!(resolved, Type::Named(_)) => resolved,
                Some(resolved) => resolved, // best effort: one level only
                None => self,
            },
            other => other,
        }
    }

    /// Structural equality after alias resolution, used by the numeric
    /// promotion and LUB rules below.
    fn resolved_eq(&self, other: &Type, aliases: &BTreeMap<String, Type>) -> bool {
        self.resolve(aliases) == other.resolve(aliases)
    }

    /// Least upper bound under the lattice `any ⊔ T = T`, `int ⊔ float =
    /// float`, otherwise identity if equal else `any`.
    pub fn lub(&self, other: &Type, aliases: &BTreeMap<String, Type>) -> Type {
        let a = self.resolve(aliases);
        let b = other.resolve(aliases);
        match (a, b) {
            (Type::Any, t) | (t, Type::Any) => t.clone(),
            (Type::Int, Type::Float) | (Type::Float, Type::Int) => Type::Float,
            (x, y) if x == y => x.clone(),
            _ => Type::Any,
        }
    }

    /// Assignability of an inferred expression type against a declared
    /// annotation. Not symmetric: `int` is
    /// assignable to `float`, not vice versa.
    pub fn compatible_with(&self, declared: &Type, aliases: &BTreeMap<String, Type>) -> bool {
        let inferred = self.resolve(aliases);
        let declared = declared.resolve(aliases);
        match (inferred, declared) {
            (_, Type::Any) | (Type::Any, _) => true,
            (Type::Int, Type::Float) => true,
            (Type::Array(i), Type::Array(d)) => i.compatible_with(d, aliases),
            (Type::Struct(i), Type::Struct(d)) => {
                i.len() == d.len()
                    && i.iter().all(|(name, ity)| {
                        d.get(name).map_or(false, |dty| ity.compatible_with(dty, aliases))
                    })
            }
            (Type::Function(ip, ir), Type::Function(dp, dr)) => {
                ip.len() == dp.len()
                    && ip.iter().zip(dp.iter()).all(|(i, d)| i.compatible_with(d, aliases))
                    && ir.compatible_with(dr, aliases)
            }
            (i, d) => i.resolved_eq(d, aliases),
        }
    }
}

/// Numeric type of an arithmetic binary operator's result, per the fixed
/// promotion table. `op` uses [`crate::ast::BinOp`] but this module
/// stays AST-agnostic by taking the three classification booleans
/// directly — see `crate::infer` and `crate::eval` for the call sites.
pub fn promote_arith(lhs: &Type, rhs: &Type) -> Type {
    match (lhs, rhs) {
        (Type::Float, _) | (_, Type::Float) => Type::Float,
        (Type::Any, _) | (_, Type::Any) => Type::Any,
        _ => Type::Int,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lub_matches_fixed_lattice() {
        let aliases = BTreeMap::new();
        assert_eq!(Type::Any.lub(&Type::Int, &aliases), Type::Int);
        assert_eq!(Type::Int.lub(&Type::Float, &aliases), Type::Float);
        assert_eq!(Type::Bool.lub(&Type::Bool, &aliases), Type::Bool);
        assert_eq!(Type::Bool.lub(&Type::Int, &aliases), Type::Any);
    }

    #[test]
    fn int_assignable_to_float_not_reverse() {
        let aliases = BTreeMap::new();
        assert!(Type::Int.compatible_with(&Type::Float, &aliases));
        assert!(!Type::Float.compatible_with(&Type::Int, &aliases));
    }

    #[test]
    fn struct_compatibility_is_structural() {
        let aliases = BTreeMap::new();
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), Type::Int);
        let mut b = BTreeMap::new();
        b.insert("x".to_string(), Type::Float);
        assert!(Type::Struct(a).compatible_with(&Type::Struct(b), &aliases));
    }
}
