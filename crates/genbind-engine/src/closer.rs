//! The closing orchestrator.
//!
//! `Closer::close` turns one argument tuple into a closed identity, emits
//! its bindings, and then propagates: every dependency node linked to the
//! component is re-matched against the closed identity's surfaces, and each
//! fit closes the dependency's owner in turn. The shared [`VisitedSet`]
//! terminates the recursion.
//!
//! `Closer::offer` handles a closed type found at a usage site. Components
//! whose own open surfaces match it are closed directly; dependency nodes
//! whose shape fits one of its surfaces close their owners.

use serde::Serialize;
use tracing::{debug, trace};

use genbind_types::{
    can_match, closable_surfaces, extract_arguments, generic_interfaces, satisfies_owner_tuple,
    ClosingError, Ty, TypeUniverse,
};

use crate::graph::{ComponentGraph, ComponentId, DependencyRef};
use crate::ledger::VisitedSet;
use crate::registry::{RegistryOp, RegistrySink};

/// Default bound on propagation depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// What a single `close` call did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Bindings were emitted and propagation ran.
    Closed,
    /// An override already fixes this single argument.
    Pinned,
    /// The closed identity was bound earlier in this pass.
    AlreadyClosed,
    /// The tuple does not satisfy the owner's constraints.
    ConstraintViolation,
}

/// Counters for a closing session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CloseStats {
    pub closed: usize,
    pub pinned: usize,
    pub duplicates: usize,
    pub constraint_skips: usize,
}

/// A closing session over one graph, one visited set and one sink.
pub struct Closer<'a> {
    universe: &'a TypeUniverse,
    graph: &'a mut ComponentGraph,
    visited: &'a mut VisitedSet,
    sink: &'a mut dyn RegistrySink,
    max_depth: usize,
    depth: usize,
    stats: CloseStats,
}

impl<'a> Closer<'a> {
    pub fn new(
        universe: &'a TypeUniverse,
        graph: &'a mut ComponentGraph,
        visited: &'a mut VisitedSet,
        sink: &'a mut dyn RegistrySink,
    ) -> Self {
        Closer {
            universe,
            graph,
            visited,
            sink,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            stats: CloseStats::default(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn stats(&self) -> CloseStats {
        self.stats
    }

    /// Close `component` with `arguments` and propagate to its dependents.
    pub fn close(
        &mut self,
        component: ComponentId,
        arguments: &[Ty],
    ) -> Result<CloseOutcome, ClosingError> {
        let node = self.graph.try_get(component)?;
        if let [only] = arguments {
            if node.is_pinned_to(only) {
                trace!(component = %node.owner, argument = %only, "pinned, not closing");
                self.stats.pinned += 1;
                return Ok(CloseOutcome::Pinned);
            }
        }
        if arguments.len() != node.arity() {
            return Err(ClosingError::ArityMismatch {
                ty: node.open.to_string(),
                expected: node.arity(),
                found: arguments.len(),
            });
        }
        if let Some(open) = arguments.iter().find(|a| !a.is_closed()) {
            return Err(ClosingError::OpenArgument {
                ty: open.to_string(),
            });
        }
        if !satisfies_owner_tuple(self.universe, &node.owner, arguments) {
            trace!(component = %node.owner, "arguments violate constraints");
            self.stats.constraint_skips += 1;
            return Ok(CloseOutcome::ConstraintViolation);
        }

        let closed = node.open.substitute(&node.owner, arguments);
        if self.visited.contains(&closed) {
            self.stats.duplicates += 1;
            return Ok(CloseOutcome::AlreadyClosed);
        }
        if self.depth >= self.max_depth {
            return Err(ClosingError::PropagationDepth {
                ty: closed.to_string(),
                limit: self.max_depth,
            });
        }

        // Build the whole batch before touching the sink.
        let batch = binding_batch(self.universe, &node.open, &closed);
        let links = node.provider_links.clone();
        for op in &batch {
            op.apply(&mut *self.sink);
        }
        debug!(closed = %closed, depth = self.depth, bindings = batch.len(), "closed");
        self.visited.insert(closed.clone());
        self.graph.record_closed(component, arguments.to_vec());
        self.stats.closed += 1;

        if links.is_empty() {
            return Ok(CloseOutcome::Closed);
        }
        let surfaces = closable_surfaces(self.universe, &closed);
        self.depth += 1;
        let propagated = links
            .iter()
            .try_for_each(|&dref| self.close_from_dependency(dref, &surfaces));
        self.depth -= 1;
        propagated?;
        Ok(CloseOutcome::Closed)
    }

    /// Present a closed type found at a usage site to the graph.
    ///
    /// First every component is matched through its own open surfaces, so a
    /// demand for `IHandler<Cmd1>` closes `Handler<Cmd1>`. All components
    /// that fit are closed. Then each dependency whose shape fits one of the
    /// candidate's surfaces closes its owner with the implied arguments.
    pub fn offer(&mut self, candidate: &Ty) -> Result<(), ClosingError> {
        if !candidate.is_closed() {
            return Err(ClosingError::OpenArgument {
                ty: candidate.to_string(),
            });
        }
        let components: Vec<ComponentId> = self.graph.components().map(|c| c.id).collect();
        for component in components {
            self.close_from_surface(component, candidate)?;
        }

        let surfaces = closable_surfaces(self.universe, candidate);
        if surfaces.is_empty() {
            return Ok(());
        }
        trace!(candidate = %candidate, surfaces = surfaces.len(), "offer");
        let deps: Vec<DependencyRef> = self.graph.dependency_refs().collect();
        for dref in deps {
            self.close_from_dependency(dref, &surfaces)?;
        }
        Ok(())
    }

    /// Close `component` for each distinct tuple implied by one of its open
    /// surfaces matching `candidate`.
    ///
    /// Surfaces that leave a parameter undetermined cannot drive a closing
    /// and are skipped.
    fn close_from_surface(
        &mut self,
        component: ComponentId,
        candidate: &Ty,
    ) -> Result<(), ClosingError> {
        let node = self.graph.try_get(component)?;
        let owner = node.owner.clone();
        let arity = node.arity();
        let mut tuples: Vec<Vec<Ty>> = Vec::new();
        for surface in closable_surfaces(self.universe, &node.open) {
            if !determines_all(&surface, arity) || !can_match(self.universe, &surface, candidate) {
                continue;
            }
            let arguments = extract_arguments(self.universe, &owner, &surface, candidate)?;
            trace!(component = %owner, surface = %surface, candidate = %candidate, "surface fits");
            if !tuples.contains(&arguments) {
                tuples.push(arguments);
            }
        }
        for arguments in tuples {
            self.close(component, &arguments)?;
        }
        Ok(())
    }

    fn close_from_dependency(
        &mut self,
        dref: DependencyRef,
        surfaces: &[Ty],
    ) -> Result<(), ClosingError> {
        let owner = self.graph.try_get(dref.component)?.owner.clone();
        let pattern = self.graph.dependency(dref).pattern.clone();
        for surface in surfaces {
            if !can_match(self.universe, &pattern, surface) {
                continue;
            }
            let arguments = extract_arguments(self.universe, &owner, &pattern, surface)?;
            trace!(dependency = %pattern, surface = %surface, "dependency fits");
            self.close(dref.component, &arguments)?;
        }
        Ok(())
    }
}

/// Whether `surface` mentions every one of its owner's `arity` positions.
fn determines_all(surface: &Ty, arity: usize) -> bool {
    let mut seen = vec![false; arity];
    for param in surface.params() {
        if let Some(slot) = seen.get_mut(param.position as usize) {
            *slot = true;
        }
    }
    seen.into_iter().all(|s| s)
}

/// The registry calls for one closing, in their fixed order.
pub fn binding_batch(universe: &TypeUniverse, open: &Ty, closed: &Ty) -> Vec<RegistryOp> {
    let mut batch = vec![RegistryOp::DisableAutoDiscovery { ty: open.clone() }];
    for iface in generic_interfaces(universe, closed) {
        batch.push(RegistryOp::EnableAutoCollection { ty: iface.clone() });
        batch.push(RegistryOp::Bind {
            service: iface,
            implementation: closed.clone(),
        });
    }
    batch.push(RegistryOp::Bind {
        service: closed.clone(),
        implementation: closed.clone(),
    });
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use genbind_types::{ParamDef, TypeDef};

    /// `Producer<T> : IProduce<T>` and `Consumer<T>` depending on `IProduce<T>`.
    fn setup() -> (TypeUniverse, ComponentGraph, ComponentId, ComponentId) {
        let mut u = TypeUniverse::new();
        u.register(TypeDef::class("X")).unwrap();
        u.register(TypeDef::class("Y")).unwrap();
        u.register(TypeDef::interface("IProduce").with_param(ParamDef::new("T")))
            .unwrap();
        u.register(
            TypeDef::class("Producer")
                .with_param(ParamDef::new("T"))
                .implementing(Ty::generic("IProduce", vec![Ty::param("Producer", 0, "T")])),
        )
        .unwrap();
        u.register(TypeDef::class("Consumer").with_param(ParamDef::new("T")))
            .unwrap();

        let mut g = ComponentGraph::new();
        let producer = g.add_component(&u, "Producer").unwrap();
        let consumer = g.add_component(&u, "Consumer").unwrap();
        g.add_dependency(
            consumer,
            Ty::generic("IProduce", vec![Ty::param("Consumer", 0, "T")]),
            false,
        )
        .unwrap();
        g.link_providers(&u);
        (u, g, producer, consumer)
    }

    #[test]
    fn close_propagates_to_consumer() {
        let (u, mut g, producer, _) = setup();
        let mut visited = VisitedSet::new();
        let mut sink = RegistryBuilder::new();
        let mut closer = Closer::new(&u, &mut g, &mut visited, &mut sink);
        let outcome = closer.close(producer, &[Ty::named("X")]).unwrap();
        assert_eq!(outcome, CloseOutcome::Closed);
        assert_eq!(closer.stats().closed, 2);

        let closed: Vec<String> = visited.iter().map(|t| t.to_string()).collect();
        assert_eq!(closed, vec!["Producer<X>", "Consumer<X>"]);
    }

    #[test]
    fn second_close_is_a_no_op() {
        let (u, mut g, producer, _) = setup();
        let mut visited = VisitedSet::new();
        let mut sink = RegistryBuilder::new();
        {
            let mut closer = Closer::new(&u, &mut g, &mut visited, &mut sink);
            closer.close(producer, &[Ty::named("X")]).unwrap();
            let again = closer.close(producer, &[Ty::named("X")]).unwrap();
            assert_eq!(again, CloseOutcome::Pinned);
        }
        let binds = sink
            .operations()
            .iter()
            .filter(|op| matches!(op, RegistryOp::Bind { .. }))
            .count();
        // Producer<X>: IProduce<X> + self; Consumer<X>: self.
        assert_eq!(binds, 3);
    }

    #[test]
    fn arity_and_open_arguments_are_faults() {
        let (u, mut g, producer, _) = setup();
        let mut visited = VisitedSet::new();
        let mut sink = RegistryBuilder::new();
        let mut closer = Closer::new(&u, &mut g, &mut visited, &mut sink);
        assert!(matches!(
            closer.close(producer, &[Ty::named("X"), Ty::named("Y")]),
            Err(ClosingError::ArityMismatch { expected: 1, found: 2, .. })
        ));
        assert!(matches!(
            closer.close(producer, &[Ty::param("Producer", 0, "T")]),
            Err(ClosingError::OpenArgument { .. })
        ));
        assert!(sink.operations().is_empty());
    }

    #[test]
    fn depth_limit_stops_runaway_propagation() {
        let (u, mut g, producer, _) = setup();
        let mut visited = VisitedSet::new();
        let mut sink = RegistryBuilder::new();
        let mut closer = Closer::new(&u, &mut g, &mut visited, &mut sink).with_max_depth(1);
        let err = closer.close(producer, &[Ty::named("X")]).unwrap_err();
        assert_eq!(
            err,
            ClosingError::PropagationDepth {
                ty: "Consumer<X>".into(),
                limit: 1
            }
        );
    }

    #[test]
    fn offer_closes_matching_components_then_dependency_owners() {
        let (u, mut g, _, _) = setup();
        let mut visited = VisitedSet::new();
        let mut sink = RegistryBuilder::new();
        let mut closer = Closer::new(&u, &mut g, &mut visited, &mut sink);
        closer
            .offer(&Ty::generic("IProduce", vec![Ty::named("Y")]))
            .unwrap();
        let closed: Vec<String> = visited.iter().map(|t| t.to_string()).collect();
        assert_eq!(closed, vec!["Producer<Y>", "Consumer<Y>"]);
    }

    #[test]
    fn offer_of_a_component_shape_closes_that_component() {
        let (u, mut g, _, _) = setup();
        let mut visited = VisitedSet::new();
        let mut sink = RegistryBuilder::new();
        let mut closer = Closer::new(&u, &mut g, &mut visited, &mut sink);
        closer
            .offer(&Ty::generic("Consumer", vec![Ty::named("X")]))
            .unwrap();
        let closed: Vec<String> = visited.iter().map(|t| t.to_string()).collect();
        assert_eq!(closed, vec!["Consumer<X>"]);
    }

    #[test]
    fn unknown_component_is_a_fault() {
        let (u, mut g, _, _) = setup();
        let mut visited = VisitedSet::new();
        let mut sink = RegistryBuilder::new();
        let mut closer = Closer::new(&u, &mut g, &mut visited, &mut sink);
        assert_eq!(
            closer.close(ComponentId(7), &[Ty::named("X")]),
            Err(ClosingError::UnknownComponent { name: "#7".into() })
        );
    }

    #[test]
    fn surfaces_must_determine_every_parameter() {
        let open = Ty::generic(
            "Pair",
            vec![Ty::param("Pair", 0, "A"), Ty::param("Pair", 1, "B")],
        );
        let half = Ty::generic("IFirst", vec![Ty::param("Pair", 0, "A")]);
        assert!(determines_all(&open, 2));
        assert!(!determines_all(&half, 2));
        assert!(!determines_all(&Ty::named("IMarker"), 1));
    }

    #[test]
    fn batch_order_is_fixed() {
        let (u, _, _, _) = setup();
        let open = u.get("Producer").unwrap().open_self();
        let closed = Ty::generic("Producer", vec![Ty::named("X")]);
        let lines: Vec<String> = binding_batch(&u, &open, &closed)
            .iter()
            .map(|op| op.to_string())
            .collect();
        insta::assert_snapshot!(lines.join("\n"), @r"
        no-autowire Producer<T>
        collect IProduce<X>
        bind IProduce<X> -> Producer<X>
        bind Producer<X> -> Producer<X>
        ");
    }
}
