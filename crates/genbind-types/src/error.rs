//! Configuration-integrity faults raised while closing generics.
//!
//! A constraint mismatch is never an error: the candidate is simply not a
//! closing. Everything in `ClosingError` means the type catalogue itself is
//! inconsistent and the whole pass must stop.

use thiserror::Error;

/// A fatal fault in the generic catalogue or in how it was fed to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ClosingError {
    /// A type name was referenced but never defined.
    #[error("unknown type `{name}`")]
    UnknownType { name: String },
    /// Two definitions share a name.
    #[error("type `{name}` is defined more than once")]
    DuplicateType { name: String },
    /// A parameter reference points past the owner's parameter list, or at
    /// a definition that is not the shape's owner.
    #[error("`{owner}` has no type parameter at position {position}")]
    UnknownParameter { owner: String, position: u32 },
    /// A dependency shape leaves one of its owner's parameters unbound, so
    /// a closing of the owner can never be derived from it.
    #[error("shape `{pattern}` never binds parameter {position} of `{owner}`")]
    ParameterGap {
        owner: String,
        pattern: String,
        position: usize,
    },
    /// An argument tuple of the wrong length was supplied.
    #[error("`{ty}` expects {expected} type argument(s), found {found}")]
    ArityMismatch {
        ty: String,
        expected: usize,
        found: usize,
    },
    /// Arguments were extracted from a pair that does not match.
    #[error("cannot extract arguments: `{pattern}` does not match `{candidate}`")]
    MatchContract { pattern: String, candidate: String },
    /// A component was requested for a type that is not an open generic.
    #[error("`{name}` is not an open generic definition")]
    NotGeneric { name: String },
    /// A component was referenced by a name that has no component.
    #[error("unknown component `{name}`")]
    UnknownComponent { name: String },
    /// A pin or demand argument still mentions generic parameters.
    #[error("`{ty}` is not a closed type")]
    OpenArgument { ty: String },
    /// Propagation nested deeper than the configured limit.
    #[error("propagation exceeded depth {limit} while closing `{ty}`")]
    PropagationDepth { ty: String, limit: usize },
}

impl ClosingError {
    /// Stable diagnostic code for each fault kind.
    pub fn code(&self) -> &'static str {
        match self {
            ClosingError::UnknownType { .. } => "G0001",
            ClosingError::DuplicateType { .. } => "G0002",
            ClosingError::UnknownParameter { .. } => "G0003",
            ClosingError::ParameterGap { .. } => "G0004",
            ClosingError::ArityMismatch { .. } => "G0005",
            ClosingError::MatchContract { .. } => "G0006",
            ClosingError::NotGeneric { .. } => "G0007",
            ClosingError::UnknownComponent { .. } => "G0008",
            ClosingError::OpenArgument { .. } => "G0009",
            ClosingError::PropagationDepth { .. } => "G0010",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ClosingError::ParameterGap {
            owner: "Pair".into(),
            pattern: "IFoo<A>".into(),
            position: 1,
        };
        assert_eq!(
            err.to_string(),
            "shape `IFoo<A>` never binds parameter 1 of `Pair`"
        );
        assert_eq!(err.code(), "G0004");

        let err = ClosingError::ArityMismatch {
            ty: "Handler<T>".into(),
            expected: 1,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "`Handler<T>` expects 1 type argument(s), found 2"
        );
    }
}
