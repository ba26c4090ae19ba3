//! Structural matching of type patterns against candidate types.
//!
//! Matching is one-directional: parameters in the pattern bind to the
//! candidate's sub-types, and each binding must satisfy the parameter's
//! declared constraints. Bindings are recorded in an `ena` table keyed per
//! parameter, so a second occurrence of the same parameter must bind to the
//! same candidate sub-type or the whole match is rejected.

use ena::unify::InPlaceUnificationTable;
use rustc_hash::FxHashMap;

use crate::ty::{ParamKey, ParamRef, Ty, TyCon};
use crate::universe::TypeUniverse;

/// A single matching session. Owns the binding table for one
/// `(pattern, candidate)` walk.
pub struct Matcher<'u> {
    universe: &'u TypeUniverse,
    /// One key per distinct parameter seen in the pattern.
    table: InPlaceUnificationTable<ParamKey>,
    keys: FxHashMap<ParamRef, ParamKey>,
    /// Disabled when matching generic constraints, which only need shape.
    check_constraints: bool,
}

impl<'u> Matcher<'u> {
    /// A matcher that enforces parameter constraints.
    pub fn new(universe: &'u TypeUniverse) -> Self {
        Matcher {
            universe,
            table: InPlaceUnificationTable::new(),
            keys: FxHashMap::default(),
            check_constraints: true,
        }
    }

    fn structural(universe: &'u TypeUniverse) -> Self {
        Matcher {
            check_constraints: false,
            ..Matcher::new(universe)
        }
    }

    /// Walk `pattern` and `candidate` in lock-step.
    ///
    /// A candidate that is itself an open parameter matches anything: it
    /// can still be closed to fit. This only arises when checking whether a
    /// component's open family could ever satisfy a dependency shape.
    pub fn matches(&mut self, pattern: &Ty, candidate: &Ty) -> bool {
        match (pattern, candidate) {
            (_, Ty::Param(_)) => true,
            (Ty::Param(p), _) => self.bind(p, candidate),
            (Ty::Con(pc, pargs), Ty::Con(cc, cargs)) => {
                pc == cc
                    && pargs.len() == cargs.len()
                    && pargs.iter().zip(cargs).all(|(p, c)| self.matches(p, c))
            }
        }
    }

    /// The sub-type bound to `param` so far, if any.
    pub fn binding(&mut self, param: &ParamRef) -> Option<Ty> {
        let key = *self.keys.get(param)?;
        self.table.probe_value(key)
    }

    fn key_for(&mut self, param: &ParamRef) -> ParamKey {
        if let Some(&key) = self.keys.get(param) {
            return key;
        }
        let key = self.table.new_key(None);
        self.keys.insert(param.clone(), key);
        key
    }

    fn bind(&mut self, param: &ParamRef, candidate: &Ty) -> bool {
        if self.check_constraints && !param_admits(self.universe, param, candidate) {
            return false;
        }
        let key = self.key_for(param);
        self.table
            .unify_var_value(key, Some(candidate.clone()))
            .is_ok()
    }
}

/// Whether `pattern` can be matched against `candidate`.
pub fn can_match(universe: &TypeUniverse, pattern: &Ty, candidate: &Ty) -> bool {
    Matcher::new(universe).matches(pattern, candidate)
}

/// Whether `candidate` satisfies the constraints on the first parameter of
/// `owner`. Non-generic or unknown owners admit nothing.
pub fn satisfies_owner_constraints(universe: &TypeUniverse, owner: &TyCon, candidate: &Ty) -> bool {
    let Some(Ty::Param(first)) = universe.get(&owner.name).and_then(|d| d.param_ty(0)) else {
        return false;
    };
    param_admits(universe, &first, candidate)
}

/// Whether every position of `tuple` satisfies the matching parameter of
/// `owner`. Constraints mentioning other parameters see the whole tuple.
pub fn satisfies_owner_tuple(universe: &TypeUniverse, owner: &TyCon, tuple: &[Ty]) -> bool {
    let Some(def) = universe.get(&owner.name) else {
        return false;
    };
    if def.arity() != tuple.len() {
        return false;
    }
    def.params.iter().zip(tuple).all(|(param, arg)| {
        if param.default_ctor && !universe.has_default_ctor(arg) {
            return false;
        }
        param
            .constraints
            .iter()
            .all(|c| constraint_holds(universe, &c.substitute(owner, tuple), arg))
    })
}

fn param_admits(universe: &TypeUniverse, param: &ParamRef, candidate: &Ty) -> bool {
    let Some(def) = universe.param_def(param) else {
        return true;
    };
    if def.default_ctor && !universe.has_default_ctor(candidate) {
        return false;
    }
    def.constraints
        .iter()
        .all(|c| constraint_holds(universe, &c.replace_param(param, candidate), candidate))
}

/// A closed constraint is plain assignability. A constraint that still
/// mentions parameters holds when some supertype of the candidate has its
/// shape.
fn constraint_holds(universe: &TypeUniverse, constraint: &Ty, candidate: &Ty) -> bool {
    if constraint.is_closed() {
        return universe.is_assignable(candidate, constraint);
    }
    universe
        .supertypes(candidate)
        .iter()
        .any(|s| Matcher::structural(universe).matches(constraint, s))
}
