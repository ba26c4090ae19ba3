//! Positional argument extraction.
//!
//! Once a dependency shape is known to match a closed candidate, the
//! bindings of the shape owner's parameters, ordered by position, form the
//! argument tuple that closes the owner.

use crate::error::ClosingError;
use crate::matcher::Matcher;
use crate::ty::{Ty, TyCon};
use crate::universe::TypeUniverse;

/// Extract the argument tuple that `candidate` implies for `owner`.
///
/// Every parameter in `pattern` must belong to `owner`, and together they
/// must cover each of `owner`'s positions. The pair must match and the
/// candidate must be closed; anything else is a contract fault, not a
/// silent mismatch.
pub fn extract_arguments(
    universe: &TypeUniverse,
    owner: &TyCon,
    pattern: &Ty,
    candidate: &Ty,
) -> Result<Vec<Ty>, ClosingError> {
    let arity = universe.lookup(owner)?.arity();

    let mut matcher = Matcher::new(universe);
    if !candidate.is_closed() || !matcher.matches(pattern, candidate) {
        return Err(ClosingError::MatchContract {
            pattern: pattern.to_string(),
            candidate: candidate.to_string(),
        });
    }

    let mut slots: Vec<Option<Ty>> = vec![None; arity];
    for param in pattern.params() {
        let position = param.position as usize;
        if &param.owner != owner || position >= arity {
            return Err(ClosingError::UnknownParameter {
                owner: param.owner.name.clone(),
                position: param.position,
            });
        }
        if slots[position].is_none() {
            slots[position] = matcher.binding(param);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(position, bound)| {
            bound.ok_or_else(|| ClosingError::ParameterGap {
                owner: owner.name.clone(),
                pattern: pattern.to_string(),
                position,
            })
        })
        .collect()
}
