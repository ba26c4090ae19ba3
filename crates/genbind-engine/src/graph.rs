//! The component graph: open generic implementations and their dependencies.
//!
//! Components are stored in insertion order and identified by
//! [`ComponentId`]. Each component owns its dependency nodes; provider links
//! point from a component to dependency nodes of *other* components whose
//! shape the component's family of closings can satisfy.

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use genbind_types::{can_match, closable_surfaces, ClosingError, Ty, TyCon, TypeUniverse};

/// A unique identifier for a component within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of a dependency node: the owning component plus its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyRef {
    pub component: ComponentId,
    pub index: u32,
}

/// One open dependency occurrence inside a component.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub owner: ComponentId,
    /// The dependency's shape, open in the owner's parameters.
    pub pattern: Ty,
    /// Satisfied through a producer function rather than a direct instance.
    pub via_factory: bool,
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.via_factory {
            write!(f, "Fn() -> {}", self.pattern)
        } else {
            write!(f, "{}", self.pattern)
        }
    }
}

/// One open generic implementation.
#[derive(Debug)]
pub struct ComponentNode {
    pub id: ComponentId,
    pub owner: TyCon,
    /// The owner's open self-descriptor.
    pub open: Ty,
    pub dependencies: Vec<DependencyNode>,
    pub provider_links: Vec<DependencyRef>,
    /// Pinned and previously closed argument tuples. Append-only.
    overrides: Vec<Vec<Ty>>,
}

impl ComponentNode {
    pub fn arity(&self) -> usize {
        self.open.args().len()
    }

    pub fn overrides(&self) -> &[Vec<Ty>] {
        &self.overrides
    }

    /// Whether an override fixes the single parameter to exactly `ty`.
    pub fn is_pinned_to(&self, ty: &Ty) -> bool {
        self.overrides
            .iter()
            .any(|o| matches!(o.as_slice(), [only] if only == ty))
    }
}

/// All components discovered by the scan phase.
#[derive(Debug, Default)]
pub struct ComponentGraph {
    components: Vec<ComponentNode>,
    by_owner: FxHashMap<TyCon, ComponentId>,
    linked: bool,
}

impl ComponentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component for the open generic definition `owner`.
    ///
    /// Adding the same owner twice returns the existing id.
    pub fn add_component(
        &mut self,
        universe: &TypeUniverse,
        owner: &str,
    ) -> Result<ComponentId, ClosingError> {
        if let Some(&id) = self.by_owner.get(&TyCon::new(owner)) {
            return Ok(id);
        }
        let def = universe.lookup(&TyCon::new(owner))?;
        if def.arity() == 0 {
            return Err(ClosingError::NotGeneric {
                name: owner.to_string(),
            });
        }
        let id = ComponentId(self.components.len() as u32);
        self.by_owner.insert(def.name.clone(), id);
        self.components.push(ComponentNode {
            id,
            owner: def.name.clone(),
            open: def.open_self(),
            dependencies: Vec::new(),
            provider_links: Vec::new(),
            overrides: Vec::new(),
        });
        self.linked = false;
        Ok(id)
    }

    /// Record a dependency of `component`.
    ///
    /// Closed shapes cannot drive a closing and are skipped (`Ok(None)`).
    /// Parameters in the shape must belong to the component's owner.
    pub fn add_dependency(
        &mut self,
        component: ComponentId,
        pattern: Ty,
        via_factory: bool,
    ) -> Result<Option<DependencyRef>, ClosingError> {
        let node = self.try_node_mut(component)?;
        if pattern.is_closed() {
            trace!(component = %node.owner, dependency = %pattern, "closed dependency skipped");
            return Ok(None);
        }
        let arity = node.arity();
        for p in pattern.params() {
            if p.owner != node.owner || p.position as usize >= arity {
                return Err(ClosingError::UnknownParameter {
                    owner: p.owner.name.clone(),
                    position: p.position,
                });
            }
        }
        let index = node.dependencies.len() as u32;
        node.dependencies.push(DependencyNode {
            owner: component,
            pattern,
            via_factory,
        });
        self.linked = false;
        Ok(Some(DependencyRef { component, index }))
    }

    /// Pin the single parameter of `component` to the closed type `ty`.
    ///
    /// A pinned argument is never closed generically: some other type
    /// (typically a non-generic subclass) already provides that closing.
    pub fn pin(&mut self, component: ComponentId, ty: Ty) -> Result<(), ClosingError> {
        if !ty.is_closed() {
            return Err(ClosingError::OpenArgument { ty: ty.to_string() });
        }
        let node = self.try_node_mut(component)?;
        if node.arity() != 1 {
            return Err(ClosingError::ArityMismatch {
                ty: node.open.to_string(),
                expected: node.arity(),
                found: 1,
            });
        }
        debug!(component = %node.owner, pin = %ty, "pinned");
        node.overrides.push(vec![ty]);
        Ok(())
    }

    pub(crate) fn record_closed(&mut self, component: ComponentId, arguments: Vec<Ty>) {
        self.components[component.0 as usize]
            .overrides
            .push(arguments);
    }

    /// Link every component as provider of the dependency nodes of other
    /// components that its open family can satisfy. Idempotent.
    pub fn link_providers(&mut self, universe: &TypeUniverse) {
        let all: Vec<DependencyRef> = self.dependency_refs().collect();
        for i in 0..self.components.len() {
            self.link_as_provider_of(universe, ComponentId(i as u32), &all);
        }
        self.linked = true;
    }

    /// Link `provider` to each of `candidates` whose shape matches one of the
    /// provider's open closable surfaces. Dependencies of `provider` itself
    /// are ignored.
    fn link_as_provider_of(
        &mut self,
        universe: &TypeUniverse,
        provider: ComponentId,
        candidates: &[DependencyRef],
    ) {
        let surfaces = closable_surfaces(universe, &self.get(provider).open);
        let mut found = Vec::new();
        for &dref in candidates {
            if dref.component == provider {
                continue;
            }
            let pattern = &self.dependency(dref).pattern;
            if surfaces.iter().any(|s| can_match(universe, pattern, s)) {
                found.push(dref);
            }
        }
        let node = &mut self.components[provider.0 as usize];
        for dref in found {
            if !node.provider_links.contains(&dref) {
                trace!(provider = %node.owner, consumer = dref.component.0, "provider link");
                node.provider_links.push(dref);
            }
        }
    }

    /// Whether `link_providers` ran since the last structural change.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// The component behind `id`.
    ///
    /// Panics if `id` was not issued by this graph; use [`Self::try_get`]
    /// for ids that arrive from outside.
    pub fn get(&self, id: ComponentId) -> &ComponentNode {
        &self.components[id.0 as usize]
    }

    /// The component behind `id`, failing with `UnknownComponent` for ids
    /// this graph never issued.
    pub fn try_get(&self, id: ComponentId) -> Result<&ComponentNode, ClosingError> {
        self.components
            .get(id.0 as usize)
            .ok_or_else(|| unknown_id(id))
    }

    fn try_node_mut(&mut self, id: ComponentId) -> Result<&mut ComponentNode, ClosingError> {
        self.components
            .get_mut(id.0 as usize)
            .ok_or_else(|| unknown_id(id))
    }

    /// Look up a component by its owner's name.
    pub fn find(&self, owner: &str) -> Option<ComponentId> {
        self.by_owner.get(&TyCon::new(owner)).copied()
    }

    /// Look up a component, failing with `UnknownComponent`.
    pub fn resolve(&self, owner: &str) -> Result<ComponentId, ClosingError> {
        self.find(owner).ok_or_else(|| ClosingError::UnknownComponent {
            name: owner.to_string(),
        })
    }

    pub fn dependency(&self, dref: DependencyRef) -> &DependencyNode {
        &self.get(dref.component).dependencies[dref.index as usize]
    }

    /// Every dependency node in the graph, component by component.
    pub fn dependency_refs(&self) -> impl Iterator<Item = DependencyRef> + '_ {
        self.components.iter().flat_map(|c| {
            (0..c.dependencies.len()).map(move |i| DependencyRef {
                component: c.id,
                index: i as u32,
            })
        })
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentNode> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

fn unknown_id(id: ComponentId) -> ClosingError {
    ClosingError::UnknownComponent {
        name: id.to_string(),
    }
}
