//! The TOML catalog: types, components, pins and demands for one pass.
//!
//! ```toml
//! [options]
//! max_depth = 32
//!
//! [[type]]
//! name = "IHandler"
//! kind = "interface"
//! params = [{ name = "T" }]
//!
//! [[type]]
//! name = "Handler"
//! params = [{ name = "T", constraints = ["ICommand"] }]
//! interfaces = ["IHandler<T>"]
//!
//! [[component]]
//! type = "Handler"
//! pins = ["SpecialCommand"]
//!
//! [[demand]]
//! component = "Handler"
//! arguments = ["Cmd1"]
//! ```

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use toml::Spanned;
use tracing::{debug, info};

use genbind_engine::{ClosingPass, ComponentGraph, Demand, PassOptions, PassReport, RegistrySink};
use genbind_types::{ClosingError, ParamDef, Ty, TypeDef, TypeUniverse};

use crate::error::{CatalogError, Span};
use crate::shape::{parse_shape, Scope};

/// The raw file, as deserialized.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub options: PassOptions,
    #[serde(default, rename = "type")]
    pub types: Vec<TypeEntry>,
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentEntry>,
    #[serde(default, rename = "demand")]
    pub demands: Vec<DemandEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Class,
    Interface,
}

/// A `[[type]]` entry.
#[derive(Debug, Deserialize)]
pub struct TypeEntry {
    pub name: Spanned<String>,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default = "default_true")]
    pub default_ctor: bool,
    #[serde(default)]
    pub params: Vec<ParamEntry>,
    #[serde(default)]
    pub base: Option<Spanned<String>>,
    #[serde(default)]
    pub interfaces: Vec<Spanned<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ParamEntry {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<Spanned<String>>,
    #[serde(default)]
    pub default_ctor: bool,
}

/// A `[[component]]` entry.
#[derive(Debug, Deserialize)]
pub struct ComponentEntry {
    #[serde(rename = "type")]
    pub ty: Spanned<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    pub pins: Vec<Spanned<String>>,
}

#[derive(Debug, Deserialize)]
pub struct DependencyEntry {
    pub shape: Spanned<String>,
    /// Injected through a producer function.
    #[serde(default)]
    pub factory: bool,
}

/// A `[[demand]]` entry: either `component` + `arguments`, or `offer`.
#[derive(Debug, Deserialize)]
pub struct DemandEntry {
    #[serde(default)]
    pub component: Option<Spanned<String>>,
    #[serde(default)]
    pub arguments: Vec<Spanned<String>>,
    #[serde(default)]
    pub offer: Option<Spanned<String>>,
}

fn default_true() -> bool {
    true
}

/// A loaded, validated and linked catalog.
#[derive(Debug)]
pub struct Catalog {
    pub universe: TypeUniverse,
    pub graph: ComponentGraph,
    pub demands: Vec<Demand>,
    pub options: PassOptions,
    /// Span of each type definition's name.
    definitions: FxHashMap<String, Span>,
}

impl Catalog {
    /// Read and load a catalog from a file path.
    pub fn from_file(path: &Path) -> Result<Catalog, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load a catalog from TOML text.
    pub fn from_str(content: &str) -> Result<Catalog, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Loader::default().load(file)
    }

    /// Where the type `name` is defined.
    pub fn definition_span(&self, name: &str) -> Option<Span> {
        self.definitions.get(name).cloned()
    }

    /// Run a closing pass with the catalog's demands and options.
    ///
    /// Engine faults are anchored at the definition of the type they name.
    pub fn run(&mut self, sink: &mut dyn RegistrySink) -> Result<PassReport, CatalogError> {
        let pass = ClosingPass::new(&self.universe, self.options.clone());
        pass.run(&mut self.graph, &self.demands, sink)
            .map_err(|source| {
                let span = self.definition_span(subject(&source));
                CatalogError::Closing { source, span }
            })
    }
}

/// The type name a fault is about, without its arguments.
fn subject(err: &ClosingError) -> &str {
    let text: &str = match err {
        ClosingError::UnknownType { name }
        | ClosingError::DuplicateType { name }
        | ClosingError::NotGeneric { name }
        | ClosingError::UnknownComponent { name } => name,
        ClosingError::UnknownParameter { owner, .. } | ClosingError::ParameterGap { owner, .. } => {
            owner
        }
        ClosingError::ArityMismatch { ty, .. }
        | ClosingError::OpenArgument { ty }
        | ClosingError::PropagationDepth { ty, .. } => ty,
        ClosingError::MatchContract { pattern, .. } => pattern,
    };
    text.split('<').next().unwrap_or(text).trim()
}

/// Shapes waiting for the whole universe before they can be checked.
#[derive(Default)]
struct Loader {
    universe: TypeUniverse,
    definitions: FxHashMap<String, Span>,
    pending: Vec<(Ty, Span)>,
}

impl Loader {
    fn load(mut self, file: CatalogFile) -> Result<Catalog, CatalogError> {
        for entry in &file.types {
            self.define(entry)?;
        }
        for (shape, span) in std::mem::take(&mut self.pending) {
            self.check_shape(&shape, &span)?;
        }
        debug!(types = self.universe.len(), "universe loaded");

        let mut graph = ComponentGraph::new();
        let mut seen: FxHashMap<String, Span> = FxHashMap::default();
        for entry in &file.components {
            let name = entry.ty.get_ref();
            if seen.contains_key(name) {
                return Err(CatalogError::DuplicateComponent {
                    name: name.clone(),
                    span: entry.ty.span(),
                });
            }
            seen.insert(name.clone(), entry.ty.span());
            self.component(&mut graph, entry)?;
        }

        let demands = file
            .demands
            .iter()
            .enumerate()
            .map(|(index, entry)| self.demand(&graph, index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        graph.link_providers(&self.universe);
        info!(
            types = self.universe.len(),
            components = graph.len(),
            demands = demands.len(),
            "catalog loaded"
        );
        Ok(Catalog {
            universe: self.universe,
            graph,
            demands,
            options: file.options,
            definitions: self.definitions,
        })
    }

    fn define(&mut self, entry: &TypeEntry) -> Result<(), CatalogError> {
        let name = entry.name.get_ref();
        let params: Vec<String> = entry.params.iter().map(|p| p.name.clone()).collect();
        let scope = Scope::of(name, &params);

        let mut def = match entry.kind {
            Kind::Class => TypeDef::class(name),
            Kind::Interface => TypeDef::interface(name),
        };
        if entry.is_abstract {
            def = def.abstract_class();
        }
        if !entry.default_ctor {
            def = def.without_default_ctor();
        }
        for param in &entry.params {
            let mut p = ParamDef::new(param.name.clone());
            for constraint in &param.constraints {
                p = p.with_constraint(self.shape(constraint, scope)?);
            }
            if param.default_ctor {
                p = p.requiring_default_ctor();
            }
            def = def.with_param(p);
        }
        if let Some(base) = &entry.base {
            def = def.with_base(self.shape(base, scope)?);
        }
        for iface in &entry.interfaces {
            def = def.implementing(self.shape(iface, scope)?);
        }

        self.universe
            .register(def)
            .map_err(|e| CatalogError::closing(e, entry.name.span()))?;
        self.definitions.insert(name.clone(), entry.name.span());
        Ok(())
    }

    /// Parse a shape and queue it for checking against the universe.
    fn shape(&mut self, text: &Spanned<String>, scope: Scope<'_>) -> Result<Ty, CatalogError> {
        let ty = parse(text, scope)?;
        self.pending.push((ty.clone(), text.span()));
        Ok(ty)
    }

    /// Every constructor must be defined with a matching number of arguments.
    fn check_shape(&self, ty: &Ty, span: &Span) -> Result<(), CatalogError> {
        let Ty::Con(con, args) = ty else {
            return Ok(());
        };
        let def = self
            .universe
            .lookup(con)
            .map_err(|e| CatalogError::closing(e, span.clone()))?;
        if def.arity() != args.len() {
            return Err(CatalogError::closing(
                ClosingError::ArityMismatch {
                    ty: ty.to_string(),
                    expected: def.arity(),
                    found: args.len(),
                },
                span.clone(),
            ));
        }
        args.iter().try_for_each(|a| self.check_shape(a, span))
    }

    fn closed(&self, text: &Spanned<String>) -> Result<Ty, CatalogError> {
        let ty = parse(text, Scope::empty())?;
        self.check_shape(&ty, &text.span())?;
        Ok(ty)
    }

    fn component(
        &self,
        graph: &mut ComponentGraph,
        entry: &ComponentEntry,
    ) -> Result<(), CatalogError> {
        let span = entry.ty.span();
        let id = graph
            .add_component(&self.universe, entry.ty.get_ref())
            .map_err(|e| CatalogError::closing(e, span.clone()))?;
        let params: Vec<String> = self
            .universe
            .get(entry.ty.get_ref())
            .map(|d| d.params.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default();
        let scope = Scope::of(entry.ty.get_ref(), &params);

        for dep in &entry.dependencies {
            let pattern = parse(&dep.shape, scope)?;
            self.check_shape(&pattern, &dep.shape.span())?;
            let added = graph
                .add_dependency(id, pattern, dep.factory)
                .map_err(|e| CatalogError::closing(e, dep.shape.span()))?;
            if added.is_none() {
                debug!(
                    component = %entry.ty.get_ref(),
                    dependency = %dep.shape.get_ref(),
                    "closed dependency ignored"
                );
            }
        }
        for pin in &entry.pins {
            let ty = self.closed(pin)?;
            graph
                .pin(id, ty)
                .map_err(|e| CatalogError::closing(e, pin.span()))?;
        }
        Ok(())
    }

    fn demand(
        &self,
        graph: &ComponentGraph,
        index: usize,
        entry: &DemandEntry,
    ) -> Result<Demand, CatalogError> {
        match (&entry.component, &entry.offer) {
            (Some(component), None) => {
                let id = graph
                    .resolve(component.get_ref())
                    .map_err(|e| CatalogError::closing(e, component.span()))?;
                let arguments = entry
                    .arguments
                    .iter()
                    .map(|a| self.closed(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let arity = graph.get(id).arity();
                if arguments.len() != arity {
                    return Err(CatalogError::closing(
                        ClosingError::ArityMismatch {
                            ty: graph.get(id).open.to_string(),
                            expected: arity,
                            found: arguments.len(),
                        },
                        component.span(),
                    ));
                }
                Ok(Demand::Close {
                    component: id,
                    arguments,
                })
            }
            (None, Some(offer)) if entry.arguments.is_empty() => {
                Ok(Demand::Offer(self.closed(offer)?))
            }
            (component, offer) => Err(CatalogError::InvalidDemand {
                index,
                span: offer.as_ref().or(component.as_ref()).map(Spanned::span),
            }),
        }
    }
}

fn parse(text: &Spanned<String>, scope: Scope<'_>) -> Result<Ty, CatalogError> {
    parse_shape(text.get_ref(), scope).map_err(|e| {
        let value = text.span();
        // Offsets map one to one only for a value quoted once with no escapes.
        let span = if value.len() == text.get_ref().len() + 2 {
            let start = (value.start + 1 + e.offset).min(value.end.saturating_sub(1));
            start..start + 1
        } else {
            value
        };
        CatalogError::Shape {
            shape: text.get_ref().clone(),
            message: e.message,
            span,
        }
    })
}
