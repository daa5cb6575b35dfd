//! # Link Nodes
//!
//! The per-actor generation trees. Every node lives in a [`NodeArena`] and is addressed by a
//! [`NodeId`]; a node stores its parent index and its ordered child indices, so the tree has no
//! ownership cycles and a whole pass is discarded by dropping the arena.
//!
//! ## Node kinds
//!
//! | Kind | Produces | Children |
//! |------|----------|----------|
//! | [`NodeKind::Actor`] | the actor's `partial` declaration | BackLink, Extensions, Hierarchy, LinkTypes |
//! | [`NodeKind::LinkType`] | `Indexable`, `Enumerable`, `Defined`, `Paged<..>` | BackLink, Extensions, Hierarchy, compatible LinkTypes |
//! | [`NodeKind::Extension`] | a user-declared extension interface | BackLink, other Extensions |
//! | [`NodeKind::Hierarchy`] | `Hierarchy` | BackLink, Extensions |
//! | [`NodeKind::BackLink`] | `BackLink<TSource>` | none |
//!
//! Child order is the schema's declaration order; the composition search in [`composition`]
//! depends on it.
//!
//! Each kind module exposes the same three stages: construction (`attach`/`add_to`), a pure
//! `visit` that derives that kind's [`crate::graph::NodeState`], and `build`, which turns the
//! visited state into [`crate::syntax::TypeDecl`]s.

pub mod actor;
pub mod backlink;
pub mod composition;
pub mod extension;
pub mod format;
pub mod hierarchy;
pub mod implementation;
pub mod link_type;

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::LinkGenError,
    graph::NodeContext,
    schematic::{LinkTypeKind, SchematicEntry},
    symbols::{AttributeData, TypeSymbol},
    syntax::TypeDecl,
    target::LinkTarget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Actor { symbol: TypeSymbol },
    LinkType { kind: LinkTypeKind, entry: SchematicEntry },
    Extension { symbol: TypeSymbol },
    Hierarchy { attribute: AttributeData },
    BackLink,
}

/// Coarse node classification. All link-type shapes share one category, which is the bucket the
/// composition search groups consecutive ancestors by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeCategory {
    Actor,
    LinkType,
    Extension,
    Hierarchy,
    BackLink,
}

impl NodeKind {
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::Actor { .. } => NodeCategory::Actor,
            NodeKind::LinkType { .. } => NodeCategory::LinkType,
            NodeKind::Extension { .. } => NodeCategory::Extension,
            NodeKind::Hierarchy { .. } => NodeCategory::Hierarchy,
            NodeKind::BackLink => NodeCategory::BackLink,
        }
    }

    pub fn is_actor(&self) -> bool {
        matches!(self, NodeKind::Actor { .. })
    }

    pub fn is_link_type(&self) -> bool {
        matches!(self, NodeKind::LinkType { .. })
    }

    pub fn is_back_link(&self) -> bool {
        matches!(self, NodeKind::BackLink)
    }

    pub fn link_entry(&self) -> Option<&SchematicEntry> {
        match self {
            NodeKind::LinkType { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub target: Arc<LinkTarget>,
    pub kind: NodeKind,
}

impl LinkNode {
    pub fn is_core(&self) -> bool {
        self.target.is_core()
    }
}

#[derive(Debug, Default, Clone)]
pub struct NodeArena {
    nodes: Vec<LinkNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        NodeArena::default()
    }

    /// Allocates a node and appends it to `parent`'s children.
    pub fn alloc(&mut self, parent: Option<NodeId>, target: Arc<LinkTarget>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(LinkNode {
            parent,
            children: Vec::new(),
            target,
            kind,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn get(&self, id: NodeId) -> &LinkNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    /// The parent chain, nearest first.
    pub fn parents(&self, id: NodeId) -> Parents<'_> {
        Parents {
            arena: self,
            next: self.parent(id),
        }
    }

    /// Nearest actor strictly above `id`.
    pub fn root_actor(&self, id: NodeId) -> Option<NodeId> {
        self.parents(id).find(|p| self.kind(*p).is_actor())
    }

    /// `id` and every node below it, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// First child of `id` with the given category.
    pub fn child_of(&self, id: NodeId, category: NodeCategory) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.kind(*c).category() == category)
    }
}

pub struct Parents<'a> {
    arena: &'a NodeArena,
    next: Option<NodeId>,
}

impl Iterator for Parents<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.parent(current);
        Some(current)
    }
}

/// Builds one non-actor node. Implementation classes and other out-of-line types go to
/// `additional`; they are emitted at the actor level.
pub fn build(ctx: &NodeContext, id: NodeId, additional: &mut Vec<TypeDecl>) -> Result<Option<TypeDecl>, LinkGenError> {
    match ctx.arena().kind(id) {
        NodeKind::Actor { .. } => Err(LinkGenError::Emit(format!(
            "actor {id} cannot be built as a child node"
        ))),
        NodeKind::LinkType { .. } => link_type::build(ctx, id, additional),
        NodeKind::Extension { .. } => extension::build(ctx, id, additional),
        NodeKind::Hierarchy { .. } => hierarchy::build(ctx, id, additional),
        NodeKind::BackLink => backlink::build(ctx, id, additional),
    }
}

/// Builds every child of `id` in declaration order, skipping children that produce nothing.
pub fn build_children(
    ctx: &NodeContext,
    id: NodeId,
    additional: &mut Vec<TypeDecl>,
) -> Result<Vec<TypeDecl>, LinkGenError> {
    let mut built = Vec::new();
    for child in ctx.arena().children(id) {
        if let Some(decl) = build(ctx, *child, additional)? {
            built.push(decl);
        }
    }
    Ok(built)
}
