//! Closing engine for open generic services.
//!
//! Given open generic implementations (components) and the shapes they
//! depend on, decides which closed instantiations must exist, binds them
//! into a registry, and propagates each closing to the components whose
//! dependencies it determines.
//!
//! # Architecture
//!
//! - [`graph`]: component and dependency nodes, provider links, pins
//! - [`ledger`]: the visited set shared across one pass
//! - [`registry`]: the registry sink interface and a recording builder
//! - [`closer`]: the close/propagate algorithm
//! - [`pass`]: demand processing and universe scans

pub mod closer;
pub mod graph;
pub mod ledger;
pub mod pass;
pub mod registry;

pub use closer::{CloseOutcome, CloseStats, Closer};
pub use graph::{ComponentGraph, ComponentId, ComponentNode, DependencyNode, DependencyRef};
pub use ledger::VisitedSet;
pub use pass::{ClosingPass, Demand, PassOptions, PassReport};
pub use registry::{Registry, RegistryBuilder, RegistryOp, RegistrySink};
