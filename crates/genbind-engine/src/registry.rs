//! The registry-builder interface and a recording implementation.
//!
//! The closing engine only ever talks to a [`RegistrySink`]. The
//! [`RegistryBuilder`] provided here records every operation in order and
//! freezes into an immutable [`Registry`] that can be shared across threads
//! for resolution.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use genbind_types::Ty;

/// Receiver of the bindings produced by each successful close.
pub trait RegistrySink {
    /// The open owner must never be selected as-is.
    fn disable_auto_discovery(&mut self, open: &Ty);
    /// `interface` takes part in collection ("all implementations of") resolution.
    fn enable_auto_collection(&mut self, interface: &Ty);
    /// Resolve `service` with `implementation`.
    fn bind(&mut self, service: &Ty, implementation: &Ty);
}

/// One recorded registry call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryOp {
    DisableAutoDiscovery { ty: Ty },
    EnableAutoCollection { ty: Ty },
    Bind { service: Ty, implementation: Ty },
}

impl RegistryOp {
    /// Replay this operation against a sink.
    pub fn apply(&self, sink: &mut dyn RegistrySink) {
        match self {
            RegistryOp::DisableAutoDiscovery { ty } => sink.disable_auto_discovery(ty),
            RegistryOp::EnableAutoCollection { ty } => sink.enable_auto_collection(ty),
            RegistryOp::Bind {
                service,
                implementation,
            } => sink.bind(service, implementation),
        }
    }
}

impl fmt::Display for RegistryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryOp::DisableAutoDiscovery { ty } => write!(f, "no-autowire {}", ty),
            RegistryOp::EnableAutoCollection { ty } => write!(f, "collect {}", ty),
            RegistryOp::Bind {
                service,
                implementation,
            } => write!(f, "bind {} -> {}", service, implementation),
        }
    }
}

/// Records registry operations in call order.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    ops: Vec<RegistryOp>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> &[RegistryOp] {
        &self.ops
    }

    /// Publish the recorded bindings as an immutable snapshot.
    pub fn freeze(self) -> Arc<Registry> {
        let mut registry = Registry {
            bindings: FxHashMap::default(),
            auto_collected: FxHashSet::default(),
            auto_discovery_disabled: FxHashSet::default(),
            ops: Vec::new(),
        };
        for op in &self.ops {
            match op {
                RegistryOp::DisableAutoDiscovery { ty } => {
                    registry.auto_discovery_disabled.insert(ty.clone());
                }
                RegistryOp::EnableAutoCollection { ty } => {
                    registry.auto_collected.insert(ty.clone());
                }
                RegistryOp::Bind {
                    service,
                    implementation,
                } => {
                    let impls = registry.bindings.entry(service.clone()).or_default();
                    if !impls.contains(implementation) {
                        impls.push(implementation.clone());
                    }
                }
            }
        }
        registry.ops = self.ops;
        Arc::new(registry)
    }
}

impl RegistrySink for RegistryBuilder {
    fn disable_auto_discovery(&mut self, open: &Ty) {
        self.ops
            .push(RegistryOp::DisableAutoDiscovery { ty: open.clone() });
    }

    fn enable_auto_collection(&mut self, interface: &Ty) {
        self.ops
            .push(RegistryOp::EnableAutoCollection { ty: interface.clone() });
    }

    fn bind(&mut self, service: &Ty, implementation: &Ty) {
        self.ops.push(RegistryOp::Bind {
            service: service.clone(),
            implementation: implementation.clone(),
        });
    }
}

/// A frozen registry. Read-only after construction.
#[derive(Debug)]
pub struct Registry {
    /// Service -> implementations, in binding order.
    bindings: FxHashMap<Ty, Vec<Ty>>,
    auto_collected: FxHashSet<Ty>,
    auto_discovery_disabled: FxHashSet<Ty>,
    ops: Vec<RegistryOp>,
}

impl Registry {
    /// Implementations bound to `service`; empty if none.
    pub fn implementations(&self, service: &Ty) -> &[Ty] {
        self.bindings.get(service).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_auto_collected(&self, interface: &Ty) -> bool {
        self.auto_collected.contains(interface)
    }

    pub fn is_auto_discovery_disabled(&self, open: &Ty) -> bool {
        self.auto_discovery_disabled.contains(open)
    }

    /// Total number of distinct (service, implementation) bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    /// The operation log the snapshot was built from.
    pub fn operations(&self) -> &[RegistryOp] {
        &self.ops
    }
}
