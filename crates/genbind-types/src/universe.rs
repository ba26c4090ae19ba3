//! The type universe: nominal definitions and the supertype relation.
//!
//! Every nominal type the engine reasons about is registered here as a
//! `TypeDef`. Definitions may be generic; their base class and interfaces
//! are written in terms of their own parameters and are substituted on
//! demand when a closed instantiation is queried.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ClosingError;
use crate::ty::{ParamRef, Ty, TyCon};

/// Whether a definition is a class or an interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

/// A generic parameter declaration with its constraints.
#[derive(Clone, Debug)]
pub struct ParamDef {
    /// Display name, e.g. `T`.
    pub name: String,
    /// Supertypes a binding must be assignable to. May mention parameters
    /// of the declaring definition (`T: IComparable<T>`).
    pub constraints: Vec<Ty>,
    /// Whether a binding must expose a public parameterless constructor.
    pub default_ctor: bool,
}

impl ParamDef {
    pub fn new(name: impl Into<String>) -> Self {
        ParamDef {
            name: name.into(),
            constraints: Vec::new(),
            default_ctor: false,
        }
    }

    pub fn with_constraint(mut self, constraint: Ty) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn requiring_default_ctor(mut self) -> Self {
        self.default_ctor = true;
        self
    }

    /// Whether this parameter restricts its bindings at all.
    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty() || self.default_ctor
    }
}

/// A nominal type definition.
#[derive(Clone, Debug)]
pub struct TypeDef {
    pub name: TyCon,
    pub kind: TypeKind,
    pub is_abstract: bool,
    /// Whether the type exposes a public parameterless constructor.
    pub default_ctor: bool,
    /// Generic parameters; index is the parameter position.
    pub params: Vec<ParamDef>,
    pub base: Option<Ty>,
    pub interfaces: Vec<Ty>,
}

impl TypeDef {
    /// A concrete class with a default constructor and no supertypes.
    pub fn class(name: &str) -> Self {
        TypeDef {
            name: TyCon::new(name),
            kind: TypeKind::Class,
            is_abstract: false,
            default_ctor: true,
            params: Vec::new(),
            base: None,
            interfaces: Vec::new(),
        }
    }

    pub fn interface(name: &str) -> Self {
        TypeDef {
            kind: TypeKind::Interface,
            is_abstract: true,
            default_ctor: false,
            ..TypeDef::class(name)
        }
    }

    pub fn with_param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_base(mut self, base: Ty) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implementing(mut self, interface: Ty) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn without_default_ctor(mut self) -> Self {
        self.default_ctor = false;
        self
    }

    /// Number of generic parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Parameter `position` of this definition as a type shape.
    pub fn param_ty(&self, position: usize) -> Option<Ty> {
        self.params.get(position).map(|p| {
            Ty::Param(ParamRef {
                owner: self.name.clone(),
                position: position as u32,
                name: p.name.clone(),
            })
        })
    }

    /// The open self-descriptor `Name<P0, P1, ...>`.
    pub fn open_self(&self) -> Ty {
        let args = (0..self.params.len())
            .filter_map(|i| self.param_ty(i))
            .collect();
        Ty::Con(self.name.clone(), args)
    }
}

/// The set of all known nominal definitions.
#[derive(Default, Debug)]
pub struct TypeUniverse {
    /// Definitions in registration order.
    defs: Vec<TypeDef>,
    /// Maps type names to their index in `defs`.
    by_name: FxHashMap<String, usize>,
}

impl TypeUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition.
    ///
    /// Every parameter mentioned by the definition's base, interfaces or
    /// constraints must be one of its own parameters.
    pub fn register(&mut self, def: TypeDef) -> Result<(), ClosingError> {
        if self.by_name.contains_key(&def.name.name) {
            return Err(ClosingError::DuplicateType {
                name: def.name.name.clone(),
            });
        }
        let mentioned = def
            .base
            .iter()
            .chain(&def.interfaces)
            .chain(def.params.iter().flat_map(|p| &p.constraints));
        for shape in mentioned {
            for p in shape.params() {
                if p.owner != def.name || p.position as usize >= def.params.len() {
                    return Err(ClosingError::UnknownParameter {
                        owner: def.name.name.clone(),
                        position: p.position,
                    });
                }
            }
        }
        self.by_name.insert(def.name.name.clone(), self.defs.len());
        self.defs.push(def);
        Ok(())
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.by_name.get(name).map(|&i| &self.defs[i])
    }

    /// Look up a definition, failing with `UnknownType`.
    pub fn lookup(&self, con: &TyCon) -> Result<&TypeDef, ClosingError> {
        self.get(&con.name).ok_or_else(|| ClosingError::UnknownType {
            name: con.name.clone(),
        })
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &TypeDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// The declaration behind a parameter reference.
    pub fn param_def(&self, param: &ParamRef) -> Option<&ParamDef> {
        self.get(&param.owner.name)?
            .params
            .get(param.position as usize)
    }

    /// Whether `ty` names an interface definition.
    pub fn is_interface(&self, ty: &Ty) -> bool {
        ty.con()
            .and_then(|c| self.get(&c.name))
            .is_some_and(|d| d.kind == TypeKind::Interface)
    }

    /// Non-generic, non-abstract classes: the types that can be offered as
    /// concrete implementations.
    pub fn concrete_types(&self) -> impl Iterator<Item = Ty> + '_ {
        self.defs
            .iter()
            .filter(|d| d.kind == TypeKind::Class && !d.is_abstract && d.params.is_empty())
            .map(|d| Ty::Con(d.name.clone(), Vec::new()))
    }

    /// Immediate supertypes of `ty` with arguments substituted.
    fn direct_supertypes(&self, ty: &Ty) -> Vec<Ty> {
        match ty {
            Ty::Con(con, args) => match self.get(&con.name) {
                Some(def) => def
                    .base
                    .iter()
                    .chain(&def.interfaces)
                    .map(|s| s.substitute(con, args))
                    .collect(),
                None => Vec::new(),
            },
            Ty::Param(p) => self
                .param_def(p)
                .map(|d| d.constraints.clone())
                .unwrap_or_default(),
        }
    }

    /// `ty` itself followed by every transitive supertype, in breadth-first
    /// discovery order, without duplicates.
    pub fn supertypes(&self, ty: &Ty) -> Vec<Ty> {
        let mut seen: FxHashSet<Ty> = FxHashSet::default();
        let mut out = vec![ty.clone()];
        seen.insert(ty.clone());
        let mut next = 0;
        while next < out.len() {
            for s in self.direct_supertypes(&out[next]) {
                if seen.insert(s.clone()) {
                    out.push(s);
                }
            }
            next += 1;
        }
        out
    }

    /// Whether a value of `candidate` can be used where a closed `target` is
    /// expected.
    pub fn is_assignable(&self, candidate: &Ty, target: &Ty) -> bool {
        candidate == target || self.supertypes(candidate).iter().any(|s| s == target)
    }

    /// Whether `ty` exposes a public parameterless constructor.
    pub fn has_default_ctor(&self, ty: &Ty) -> bool {
        match ty {
            Ty::Con(con, _) => self.get(&con.name).is_some_and(|d| {
                d.kind == TypeKind::Class && !d.is_abstract && d.default_ctor
            }),
            Ty::Param(p) => self.param_def(p).is_some_and(|d| d.default_ctor),
        }
    }
}
