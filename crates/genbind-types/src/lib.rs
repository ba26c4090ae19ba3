//! Type model for closing open generic services.
//!
//! This crate answers one question in several forms: does a (possibly open)
//! type shape fit a candidate type, and if so, which arguments does the fit
//! imply?
//!
//! # Architecture
//!
//! - [`ty`]: type descriptors (`Ty`, `TyCon`, `ParamRef`)
//! - [`universe`]: nominal definitions, supertypes and assignability
//! - [`matcher`]: structural pattern matching with constraint checks
//! - [`binder`]: positional argument extraction from a successful match
//! - [`surface`]: the generic shapes a type can be matched through
//! - [`error`]: configuration-integrity faults

pub mod binder;
pub mod error;
pub mod matcher;
pub mod surface;
pub mod ty;
pub mod universe;

pub use binder::extract_arguments;
pub use error::ClosingError;
pub use matcher::{can_match, satisfies_owner_constraints, satisfies_owner_tuple};
pub use surface::{closable_surfaces, generic_interfaces};
pub use ty::{ParamRef, Ty, TyCon};
pub use universe::{ParamDef, TypeDef, TypeKind, TypeUniverse};
