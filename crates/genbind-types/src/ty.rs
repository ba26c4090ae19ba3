//! Type descriptors for generic closing.
//!
//! Defines `Ty`, the structural description of a (possibly open) type, along
//! with nominal identities (`TyCon`) and references to unbound generic
//! parameters (`ParamRef`). A closed `Ty` doubles as a deterministic identity
//! key: two closings with the same nominal name and argument list are equal
//! and hash the same.

use std::fmt;

use serde::{Serialize, Serializer};

/// A nominal type identity, e.g. `Handler` or `ICommand`.
///
/// Identities are compared by name only. For generic definitions the same
/// `TyCon` is shared by the open definition and every closing of it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyCon {
    pub name: String,
}

impl TyCon {
    pub fn new(name: impl Into<String>) -> Self {
        TyCon { name: name.into() }
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An unbound generic parameter: position `position` of definition `owner`.
///
/// The `name` field is used ONLY for display. It is excluded from
/// `PartialEq` and `Hash` so that identity is `(owner, position)`.
#[derive(Clone, Debug)]
pub struct ParamRef {
    pub owner: TyCon,
    pub position: u32,
    pub name: String,
}

impl PartialEq for ParamRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.position == other.position
    }
}

impl Eq for ParamRef {}

impl std::hash::Hash for ParamRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.position.hash(state);
    }
}

/// A type shape.
///
/// - `Con`: a nominal type applied to zero or more arguments
/// - `Param`: a generic parameter of some definition, not yet bound
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A concrete nominal type with ordered arguments (empty if non-generic).
    Con(TyCon, Vec<Ty>),
    /// An unbound generic parameter.
    Param(ParamRef),
}

impl Ty {
    /// A non-generic nominal type.
    pub fn named(name: &str) -> Ty {
        Ty::Con(TyCon::new(name), Vec::new())
    }

    /// A nominal type applied to arguments: `Ty::generic("Map", vec![k, v])`.
    pub fn generic(name: &str, args: Vec<Ty>) -> Ty {
        Ty::Con(TyCon::new(name), args)
    }

    /// Parameter `position` of `owner`, displayed as `name`.
    pub fn param(owner: &str, position: u32, name: &str) -> Ty {
        Ty::Param(ParamRef {
            owner: TyCon::new(owner),
            position,
            name: name.to_string(),
        })
    }

    /// The nominal identity, if this is a concrete type.
    pub fn con(&self) -> Option<&TyCon> {
        match self {
            Ty::Con(con, _) => Some(con),
            Ty::Param(_) => None,
        }
    }

    /// Type arguments of a concrete type; empty for parameters.
    pub fn args(&self) -> &[Ty] {
        match self {
            Ty::Con(_, args) => args,
            Ty::Param(_) => &[],
        }
    }

    /// Whether this is a concrete type with at least one argument.
    pub fn is_generic(&self) -> bool {
        matches!(self, Ty::Con(_, args) if !args.is_empty())
    }

    /// Whether no parameter occurs anywhere in this shape.
    pub fn is_closed(&self) -> bool {
        match self {
            Ty::Con(_, args) => args.iter().all(Ty::is_closed),
            Ty::Param(_) => false,
        }
    }

    /// Collect every parameter occurrence, left to right.
    pub fn params(&self) -> Vec<&ParamRef> {
        let mut out = Vec::new();
        collect_params(self, &mut out);
        out
    }

    /// Replace parameters of `owner` with the matching entry of `args`.
    ///
    /// Parameters of other owners, and positions beyond `args`, are kept.
    pub fn substitute(&self, owner: &TyCon, args: &[Ty]) -> Ty {
        match self {
            Ty::Con(con, inner) => Ty::Con(
                con.clone(),
                inner.iter().map(|a| a.substitute(owner, args)).collect(),
            ),
            Ty::Param(p) if &p.owner == owner => args
                .get(p.position as usize)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Ty::Param(_) => self.clone(),
        }
    }

    /// Replace every occurrence of the single parameter `param` with `with`.
    pub fn replace_param(&self, param: &ParamRef, with: &Ty) -> Ty {
        match self {
            Ty::Con(con, inner) => Ty::Con(
                con.clone(),
                inner.iter().map(|a| a.replace_param(param, with)).collect(),
            ),
            Ty::Param(p) if p == param => with.clone(),
            Ty::Param(_) => self.clone(),
        }
    }
}

fn collect_params<'a>(ty: &'a Ty, out: &mut Vec<&'a ParamRef>) {
    match ty {
        Ty::Con(_, args) => args.iter().for_each(|a| collect_params(a, out)),
        Ty::Param(p) => out.push(p),
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Param(p) => write!(f, "{}", p.name),
            Ty::Con(con, args) => {
                write!(f, "{}", con)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Ty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Key into the binding table used while matching, one per parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamKey(pub u32);

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for ParamKey {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        ParamKey(u)
    }

    fn tag() -> &'static str {
        "ParamKey"
    }
}

impl ena::unify::EqUnifyValue for Ty {}
