//! Loads a TOML catalog describing a type universe, its open generic
//! components and the closing demands, and feeds it to the engine.

pub mod catalog;
pub mod error;
pub mod shape;

pub use catalog::{Catalog, CatalogFile};
pub use error::{CatalogError, Span};
pub use shape::{parse_shape, Scope, ShapeError};
