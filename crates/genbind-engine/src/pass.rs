//! A complete closing pass over one scan result.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use genbind_types::{satisfies_owner_constraints, ClosingError, Ty, TyCon, TypeUniverse};

use crate::closer::{CloseStats, Closer, DEFAULT_MAX_DEPTH};
use crate::graph::{ComponentGraph, ComponentId};
use crate::ledger::VisitedSet;
use crate::registry::RegistrySink;

/// Knobs for a closing pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassOptions {
    /// Offer every concrete universe type to the dependency nodes.
    pub scan_universe: bool,
    /// Close constrained single-parameter components that have no open
    /// dependencies with every concrete type satisfying their constraints.
    pub close_constrained: bool,
    /// Bound on propagation depth.
    pub max_depth: usize,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            scan_universe: true,
            close_constrained: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// An explicit closing request from the scan collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Demand {
    /// Close `component` with a concrete argument tuple.
    Close {
        component: ComponentId,
        arguments: Vec<Ty>,
    },
    /// A closed type found at a usage site. Components whose own surfaces
    /// match it close, as do owners of dependencies it fits.
    Offer(Ty),
}

/// What a pass produced.
#[derive(Clone, Debug, Serialize)]
pub struct PassReport {
    /// Closed identities in the order they were bound.
    pub closed: Vec<Ty>,
    pub stats: CloseStats,
}

/// Runs demands and universe scans against one graph.
pub struct ClosingPass<'u> {
    universe: &'u TypeUniverse,
    options: PassOptions,
}

impl<'u> ClosingPass<'u> {
    pub fn new(universe: &'u TypeUniverse, options: PassOptions) -> Self {
        ClosingPass { universe, options }
    }

    /// Run the pass. Any fault aborts it; bindings already handed to `sink`
    /// belong to components that closed successfully.
    ///
    /// The graph carries closing history between passes: every closed
    /// argument tuple is kept as an override, so a later pass over the same
    /// graph treats those tuples as pinned and emits nothing for them, even
    /// into a fresh sink. Build a new graph to replay a closing from scratch.
    pub fn run(
        &self,
        graph: &mut ComponentGraph,
        demands: &[Demand],
        sink: &mut dyn RegistrySink,
    ) -> Result<PassReport, ClosingError> {
        let span = info_span!(
            "closing_pass",
            components = graph.len(),
            demands = demands.len()
        );
        let _enter = span.enter();

        if !graph.is_linked() {
            graph.link_providers(self.universe);
        }
        let constrained = if self.options.close_constrained {
            self.constrained_components(graph)
        } else {
            Vec::new()
        };

        let mut visited = VisitedSet::new();
        let stats = {
            let mut closer = Closer::new(self.universe, graph, &mut visited, sink)
                .with_max_depth(self.options.max_depth);

            for demand in demands {
                match demand {
                    Demand::Close {
                        component,
                        arguments,
                    } => {
                        closer.close(*component, arguments)?;
                    }
                    Demand::Offer(ty) => closer.offer(ty)?,
                }
            }

            if self.options.scan_universe {
                for ty in self.universe.concrete_types() {
                    closer.offer(&ty)?;
                }
            }

            for (component, owner) in &constrained {
                for ty in self.universe.concrete_types() {
                    if satisfies_owner_constraints(self.universe, owner, &ty) {
                        debug!(component = %owner, argument = %ty, "constraint scan");
                        closer.close(*component, &[ty])?;
                    }
                }
            }
            closer.stats()
        };

        info!(
            closed = stats.closed,
            pinned = stats.pinned,
            duplicates = stats.duplicates,
            "closing pass finished"
        );
        Ok(PassReport {
            closed: visited.iter().cloned().collect(),
            stats,
        })
    }

    /// Single-parameter components with a constrained parameter and no
    /// dependency that could drive their closing instead.
    fn constrained_components(&self, graph: &ComponentGraph) -> Vec<(ComponentId, TyCon)> {
        graph
            .components()
            .filter(|c| c.arity() == 1 && c.dependencies.is_empty())
            .filter(|c| {
                self.universe
                    .get(&c.owner.name)
                    .and_then(|d| d.params.first())
                    .is_some_and(|p| p.is_constrained())
            })
            .map(|c| (c.id, c.owner.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RegistryBuilder, RegistryOp};
    use genbind_types::{ParamDef, TypeDef};

    #[test]
    fn options_fill_missing_fields_with_defaults() {
        let options: PassOptions = serde_json::from_str(r#"{ "max_depth": 4 }"#).unwrap();
        assert_eq!(
            options,
            PassOptions {
                max_depth: 4,
                ..PassOptions::default()
            }
        );
    }

    #[test]
    fn report_and_operations_serialize() {
        let mut u = TypeUniverse::new();
        u.register(TypeDef::class("Int")).unwrap();
        u.register(TypeDef::class("Box").with_param(ParamDef::new("T")))
            .unwrap();
        let mut graph = ComponentGraph::new();
        let boxed = graph.add_component(&u, "Box").unwrap();
        let mut sink = RegistryBuilder::new();
        let demands = [Demand::Close {
            component: boxed,
            arguments: vec![Ty::named("Int")],
        }];
        let report = ClosingPass::new(&u, PassOptions::default())
            .run(&mut graph, &demands, &mut sink)
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["closed"], serde_json::json!(["Box<Int>"]));
        assert_eq!(json["stats"]["closed"], 1);

        let op = serde_json::to_value(&sink.operations()[0]).unwrap();
        assert_eq!(
            op,
            serde_json::json!({ "op": "disable_auto_discovery", "ty": "Box<T>" })
        );
        assert!(matches!(
            sink.operations()[1],
            RegistryOp::Bind { .. }
        ));
    }
}
