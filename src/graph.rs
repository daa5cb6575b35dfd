//! # Link Graph
//!
//! [`LinkGraph`] owns every actor tree of one generation pass together with the symbol
//! [`Compilation`] and [`Schematic`] they were built from.
//!
//! A pass runs in two stages:
//!
//! 1. **Visit.** Actors are processed in supertype order (an actor is visited after every graph
//!    actor it implements) and each tree top-down. Visiting a node is a pure function of the
//!    arena, the compilation and the states stored before it; the result is written into a
//!    per-node [`VisitState`] slot.
//! 2. **Build.** Every actor tree is turned into declarations. Building only reads visited state,
//!    so actors are built in parallel, and cross-node data (inherited extension properties,
//!    back-link redefinition) is resolved here rather than during the visit.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tracing::{debug, info, instrument, trace};

use crate::{
    error::LinkGenError,
    nodes::{
        self,
        actor::ActorState,
        backlink::BackLinkState,
        extension::ExtensionState,
        hierarchy::HierarchyState,
        implementation::{ImplConstructor, Implementation},
        link_type::LinkTypeState,
        NodeArena, NodeId, NodeKind,
    },
    schematic::Schematic,
    symbols::{Compilation, TypeSymbol},
    syntax::TypeDecl,
    target::LinkTarget,
};

/// Everything derived for one node during the visit stage.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitState {
    /// Graph actors the node's root actor derives from, nearest first.
    pub ancestors: Vec<NodeId>,
    /// The full semantic composition of the node.
    pub implicit_composition: BTreeSet<NodeId>,
    /// The implicit composition minus whatever the parent already composes.
    pub composition: BTreeSet<NodeId>,
    pub detail: NodeState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Actor(ActorState),
    LinkType(LinkTypeState),
    Extension(ExtensionState),
    Hierarchy(HierarchyState),
    BackLink(BackLinkState),
}

impl NodeState {
    pub fn implementation(&self) -> &Implementation {
        match self {
            NodeState::Actor(state) => &state.implementation,
            NodeState::LinkType(state) => &state.implementation,
            NodeState::Extension(state) => &state.implementation,
            NodeState::Hierarchy(state) => &state.implementation,
            NodeState::BackLink(state) => &state.implementation,
        }
    }
}

/// Options that only affect how declarations are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Prefix each actor declaration with a comment describing its tree.
    pub tree_view: bool,
}

pub struct LinkGraph {
    arena: NodeArena,
    actors: BTreeMap<String, NodeId>,
    compilation: Compilation,
    schematic: Schematic,
    states: Vec<Option<VisitState>>,
}

impl LinkGraph {
    /// Builds one tree per target. A target whose actor is already present is skipped.
    pub fn new(
        compilation: Compilation,
        schematic: Schematic,
        targets: impl IntoIterator<Item = LinkTarget>,
    ) -> Self {
        let mut arena = NodeArena::new();
        let mut actors = BTreeMap::new();

        for target in targets {
            if actors.contains_key(&target.actor) {
                debug!(actor = %target.actor, "duplicate target skipped");
                continue;
            }
            let actor = target.actor.clone();
            let id = nodes::actor::attach(&mut arena, &compilation, &schematic, target);
            actors.insert(actor, id);
        }

        info!(actors = actors.len(), nodes = arena.len(), "link graph constructed");

        let states = vec![None; arena.len()];
        LinkGraph {
            arena,
            actors,
            compilation,
            schematic,
            states,
        }
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn compilation(&self) -> &Compilation {
        &self.compilation
    }

    pub fn schematic(&self) -> &Schematic {
        &self.schematic
    }

    /// Actor roots keyed by actor display name.
    pub fn actors(&self) -> &BTreeMap<String, NodeId> {
        &self.actors
    }

    pub fn actor(&self, name: &str) -> Option<NodeId> {
        self.actors.get(name).copied()
    }

    pub fn state(&self, id: NodeId) -> Option<&VisitState> {
        self.states.get(id.index()).and_then(Option::as_ref)
    }

    pub fn is_visited(&self) -> bool {
        !self.states.is_empty() && self.states.iter().all(Option::is_some)
    }

    pub fn context(&self) -> NodeContext<'_> {
        NodeContext {
            graph: self,
            options: BuildOptions::default(),
        }
    }

    pub fn context_with(&self, options: BuildOptions) -> NodeContext<'_> {
        NodeContext {
            graph: self,
            options,
        }
    }

    /// Actor roots ordered so that every actor follows the graph actors it implements.
    pub fn visit_order(&self) -> Vec<NodeId> {
        let mut order = self
            .actors
            .iter()
            .map(|(name, id)| (self.compilation.supertypes(name).len(), name.as_str(), *id))
            .collect::<Vec<_>>();
        order.sort();
        order.into_iter().map(|(_, _, id)| id).collect()
    }

    #[instrument(skip(self), fields(actors = self.actors.len()))]
    pub fn visit(&mut self) -> Result<(), LinkGenError> {
        for actor in self.visit_order() {
            for id in self.arena.descendants(actor) {
                let state = {
                    let ctx = self.context();
                    visit_node(&ctx, id)?
                };
                trace!(node = %id, "visited {}", self.arena.describe(id));
                self.states[id.index()] = Some(state);
            }
        }
        Ok(())
    }

    /// Builds one declaration per actor. Actors that produce nothing are left out.
    pub fn build(&self, options: BuildOptions) -> Result<Vec<(String, TypeDecl)>, LinkGenError> {
        if !self.is_visited() && !self.arena.is_empty() {
            return Err(LinkGenError::Emit("link graph has not been visited".to_string()));
        }

        let ctx = self.context_with(options);
        let built = self
            .actors
            .par_iter()
            .map(|(name, id)| Ok(nodes::actor::build(&ctx, *id)?.map(|decl| (name.clone(), decl))))
            .collect::<Result<Vec<_>, LinkGenError>>()?;

        Ok(built.into_iter().flatten().collect())
    }

    /// Builds a single actor's declaration.
    pub fn build_actor(&self, actor: &str, options: BuildOptions) -> Result<Option<TypeDecl>, LinkGenError> {
        let id = self
            .actor(actor)
            .ok_or_else(|| LinkGenError::NotFound(format!("actor {actor}")))?;
        if self.state(id).is_none() {
            return Err(LinkGenError::Emit(format!("{actor} has not been visited")));
        }
        nodes::actor::build(&self.context_with(options), id)
    }
}

fn visit_node(ctx: &NodeContext, id: NodeId) -> Result<VisitState, LinkGenError> {
    let arena = ctx.arena();
    let ancestors = match ctx.actor_root(id) {
        Some(root) => ctx.ancestors(root),
        None => Vec::new(),
    };

    let (implicit_composition, composition) = if arena.kind(id).is_actor() {
        (BTreeSet::new(), BTreeSet::new())
    } else {
        let implicit = arena.semantic_composition(id, true, None);
        let inherited = arena
            .parent(id)
            .and_then(|parent| ctx.state(parent))
            .map(|state| &state.implicit_composition);
        let explicit = match inherited {
            Some(parent) => implicit.difference(parent).copied().collect(),
            None => implicit.clone(),
        };
        (implicit, explicit)
    };

    let detail = match arena.kind(id) {
        NodeKind::Actor { .. } => NodeState::Actor(nodes::actor::visit(ctx, id, &ancestors)?),
        NodeKind::LinkType { .. } => NodeState::LinkType(nodes::link_type::visit(ctx, id, &ancestors)?),
        NodeKind::Extension { .. } => NodeState::Extension(nodes::extension::visit(ctx, id)?),
        NodeKind::Hierarchy { .. } => NodeState::Hierarchy(nodes::hierarchy::visit(ctx, id)?),
        NodeKind::BackLink => NodeState::BackLink(nodes::backlink::visit(ctx, id)?),
    };

    Ok(VisitState {
        ancestors,
        implicit_composition,
        composition,
        detail,
    })
}

/// Read-only view of a [`LinkGraph`] handed to every visit and build step.
#[derive(Clone, Copy)]
pub struct NodeContext<'g> {
    graph: &'g LinkGraph,
    options: BuildOptions,
}

impl<'g> NodeContext<'g> {
    pub fn graph(&self) -> &'g LinkGraph {
        self.graph
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    pub fn arena(&self) -> &'g NodeArena {
        &self.graph.arena
    }

    pub fn compilation(&self) -> &'g Compilation {
        &self.graph.compilation
    }

    pub fn target(&self, id: NodeId) -> &'g LinkTarget {
        &self.graph.arena.get(id).target
    }

    pub fn is_core(&self, id: NodeId) -> bool {
        self.target(id).is_core()
    }

    pub fn state(&self, id: NodeId) -> Option<&'g VisitState> {
        self.graph.state(id)
    }

    /// The visited state, or an emission error when the node has not been visited.
    pub fn expect_state(&self, id: NodeId) -> Result<&'g VisitState, LinkGenError> {
        self.state(id).ok_or_else(|| {
            LinkGenError::Emit(format!("{} {id} has not been visited", self.arena().describe(id)))
        })
    }

    pub fn actor_state(&self, id: NodeId) -> Option<&'g ActorState> {
        match &self.state(id)?.detail {
            NodeState::Actor(state) => Some(state),
            _ => None,
        }
    }

    pub fn link_type_state(&self, id: NodeId) -> Option<&'g LinkTypeState> {
        match &self.state(id)?.detail {
            NodeState::LinkType(state) => Some(state),
            _ => None,
        }
    }

    pub fn extension_state(&self, id: NodeId) -> Option<&'g ExtensionState> {
        match &self.state(id)?.detail {
            NodeState::Extension(state) => Some(state),
            _ => None,
        }
    }

    pub fn hierarchy_state(&self, id: NodeId) -> Option<&'g HierarchyState> {
        match &self.state(id)?.detail {
            NodeState::Hierarchy(state) => Some(state),
            _ => None,
        }
    }

    pub fn back_link_state(&self, id: NodeId) -> Option<&'g BackLinkState> {
        match &self.state(id)?.detail {
            NodeState::BackLink(state) => Some(state),
            _ => None,
        }
    }

    /// `id` itself when it is an actor, else its nearest actor.
    pub fn actor_root(&self, id: NodeId) -> Option<NodeId> {
        if self.arena().kind(id).is_actor() {
            Some(id)
        } else {
            self.arena().root_actor(id)
        }
    }

    pub fn actor_symbol(&self, id: NodeId) -> Option<&'g TypeSymbol> {
        match self.arena().kind(self.actor_root(id)?) {
            NodeKind::Actor { symbol } => Some(symbol),
            _ => None,
        }
    }

    pub fn actor_node(&self, actor: &str) -> Option<NodeId> {
        self.graph.actor(actor)
    }

    /// The graph actor whose core counterpart is `core_actor`.
    pub fn actor_by_core(&self, core_actor: &str) -> Option<NodeId> {
        self.graph
            .actors
            .values()
            .copied()
            .find(|id| self.target(*id).core_actor() == core_actor)
    }

    /// Graph actors `actor` implements, nearest first, without any entity filter.
    pub fn supertype_actors(&self, actor: NodeId) -> Vec<NodeId> {
        let compilation = self.compilation();
        let mut found = compilation
            .supertypes(&self.target(actor).actor)
            .iter()
            .filter_map(|name| self.actor_node(name))
            .map(|id| {
                let depth = compilation.supertypes(&self.target(id).actor).len();
                (std::cmp::Reverse(depth), id)
            })
            .collect::<Vec<_>>();
        found.sort();
        found.into_iter().map(|(_, id)| id).collect()
    }

    /// Supertype actors whose entity is this actor's entity or one of its supertypes.
    pub fn ancestors(&self, actor: NodeId) -> Vec<NodeId> {
        let target = self.target(actor);
        self.supertype_actors(actor)
            .into_iter()
            .filter(|id| {
                let entity = &self.target(*id).entity;
                *entity == target.entity || self.compilation().implements(&target.entity, entity)
            })
            .collect()
    }

    /// The nearest graph actor along the actor symbol's base-class chain.
    pub fn base_target(&self, actor: NodeId) -> Option<NodeId> {
        let mut seen = BTreeSet::new();
        let mut current = self.actor_symbol(actor)?.base_type.clone();

        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                break;
            }
            if let Some(id) = self.actor_node(&name) {
                return Some(id);
            }
            current = self
                .compilation()
                .get_type_by_metadata_name(&name)
                .and_then(|symbol| symbol.base_type.clone());
        }
        None
    }

    /// Whether another graph actor's class derives from this one.
    pub fn has_child_target(&self, actor: NodeId) -> bool {
        let name = &self.target(actor).actor;
        self.graph.actors.values().any(|id| {
            *id != actor
                && self
                    .actor_symbol(*id)
                    .and_then(|symbol| symbol.base_type.as_ref())
                    .is_some_and(|base| base == name)
        })
    }

    /// The constructor of the nearest parent that generates an implementation class.
    pub fn parent_constructor(&self, id: NodeId) -> Option<&'g ImplConstructor> {
        let arena = self.arena();
        let parent = arena
            .parents(id)
            .find(|p| arena.will_generate_implementation(*p))?;
        self.state(parent)?.detail.implementation().constructor.as_ref()
    }
}
