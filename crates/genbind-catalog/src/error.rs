//! Errors raised while loading a catalog.
//!
//! Every variant that comes from the catalog text carries the byte span of
//! the offending value so it can be rendered against the source.

use std::ops::Range;
use std::path::PathBuf;

use thiserror::Error;

use genbind_types::ClosingError;

/// Byte range into the catalog source.
pub type Span = Range<usize>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Malformed TOML or a value of the wrong type.
    #[error("invalid catalog: {message}")]
    Toml { message: String, span: Option<Span> },
    #[error("invalid shape `{shape}`: {message}")]
    Shape {
        shape: String,
        message: String,
        span: Span,
    },
    #[error("component for `{name}` is declared more than once")]
    DuplicateComponent { name: String, span: Span },
    #[error("demand {index} must name either a component or an offered type")]
    InvalidDemand { index: usize, span: Option<Span> },
    /// A fault from the type universe or the engine, anchored at the catalog
    /// value it was traced back to.
    #[error("{source}")]
    Closing {
        #[source]
        source: ClosingError,
        span: Option<Span>,
    },
}

impl CatalogError {
    pub(crate) fn closing(source: ClosingError, span: Span) -> Self {
        CatalogError::Closing {
            source,
            span: Some(span),
        }
    }

    /// Where in the source the error points, if anywhere.
    pub fn span(&self) -> Option<Span> {
        match self {
            CatalogError::Io { .. } => None,
            CatalogError::Toml { span, .. }
            | CatalogError::InvalidDemand { span, .. }
            | CatalogError::Closing { span, .. } => span.clone(),
            CatalogError::Shape { span, .. } | CatalogError::DuplicateComponent { span, .. } => {
                Some(span.clone())
            }
        }
    }

    /// Stable diagnostic code. Engine faults keep their own codes.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Io { .. } => "C0001",
            CatalogError::Toml { .. } => "C0002",
            CatalogError::Shape { .. } => "C0003",
            CatalogError::DuplicateComponent { .. } => "C0004",
            CatalogError::InvalidDemand { .. } => "C0005",
            CatalogError::Closing { source, .. } => source.code(),
        }
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(err: toml::de::Error) -> Self {
        CatalogError::Toml {
            message: err.message().to_string(),
            span: err.span(),
        }
    }
}
