//! Type-path and naming helpers shared by every node kind.

use crate::nodes::{NodeArena, NodeId, NodeKind};

impl NodeArena {
    /// The name of the type a node declares.
    pub fn type_name(&self, id: NodeId) -> String {
        let node = self.get(id);
        match &node.kind {
            NodeKind::Actor { .. } => node.target.actor.clone(),
            NodeKind::LinkType { entry, .. } => entry.format_type_name(),
            NodeKind::Extension { symbol } => symbol.simple_name().replace("Extension", ""),
            NodeKind::Hierarchy { .. } => "Hierarchy".to_string(),
            NodeKind::BackLink => "BackLink<TSource>".to_string(),
        }
    }

    pub fn will_generate_implementation(&self, id: NodeId) -> bool {
        let node = self.get(id);
        match node.kind {
            NodeKind::Actor { .. } | NodeKind::Extension { .. } => !node.is_core(),
            NodeKind::LinkType { .. } | NodeKind::Hierarchy { .. } | NodeKind::BackLink => {
                self.root_actor(id).is_some() && !node.is_core()
            }
        }
    }

    /// Names of the parents accepted by `predicate`, root first, joined with `.`.
    pub fn format_type_path<P>(&self, id: NodeId, predicate: P) -> String
    where
        P: Fn(NodeId) -> bool,
    {
        let mut parts = self
            .parents(id)
            .filter(|parent| predicate(*parent))
            .map(|parent| self.type_name(parent))
            .collect::<Vec<_>>();
        parts.reverse();
        parts.join(".")
    }

    pub fn type_path(&self, id: NodeId) -> String {
        self.format_type_path(id, |_| true)
    }

    /// The full path of the node's own type, or an empty string for a detached node.
    pub fn format_as_type_path(&self, id: NodeId) -> String {
        let path = self.type_path(id);
        if path.is_empty() {
            return path;
        }
        format!("{path}.{}", self.type_name(id))
    }

    /// The parent path without its actor segment, prefixed with `.`; empty when nothing remains.
    pub fn format_relative_type_path<P>(&self, id: NodeId, predicate: P) -> String
    where
        P: Fn(NodeId) -> bool,
    {
        let path = self.format_type_path(id, |parent| {
            !self.kind(parent).is_actor() && predicate(parent)
        });
        if path.is_empty() {
            path
        } else {
            format!(".{path}")
        }
    }

    pub fn relative_type_path(&self, id: NodeId) -> String {
        self.format_relative_type_path(id, |_| true)
    }

    /// Finds the node occupying the same relative position as `id` inside `target`'s tree.
    pub fn node_with_equivalent_pathing(&self, id: NodeId, target: NodeId) -> Option<NodeId> {
        let mut path = self.parents(id).collect::<Vec<_>>();
        path.reverse();
        path.push(id);

        path.into_iter().skip(1).try_fold(target, |current, part| {
            self.children(current)
                .iter()
                .copied()
                .find(|child| self.semantic_eq(*child, part))
        })
    }

    /// Generic parameters and constraint clauses introduced along the path, nearest first.
    pub fn path_generics(&self, id: NodeId) -> (Vec<String>, Vec<String>) {
        let mut generics = Vec::new();
        let mut constraints = Vec::new();

        for node in std::iter::once(id).chain(self.parents(id)) {
            match self.kind(node) {
                NodeKind::LinkType { entry, .. } if entry.is_generic() => {
                    generics.extend(entry.type_parameters.iter().cloned());
                    constraints.extend(entry.constraint_clauses.iter().cloned());
                }
                NodeKind::BackLink => {
                    generics.push("TSource".to_string());
                    constraints.push("where TSource : class, IPathable".to_string());
                }
                _ => {}
            }
        }

        (generics, constraints)
    }

    /// `Name<T1, T2>` when the path carries generics, else `Name`.
    pub fn with_path_generics(&self, id: NodeId, name: &str) -> String {
        let (generics, _) = self.path_generics(id);
        if generics.is_empty() {
            name.to_string()
        } else {
            format!("{name}<{}>", generics.join(", "))
        }
    }

    pub fn implementation_class_name(&self, id: NodeId) -> String {
        let node = self.get(id);
        let assembly = node.target.assembly;
        let segments = |include_self: bool, accept: fn(&NodeKind) -> bool| -> String {
            let mut chain = self.parents(id).collect::<Vec<_>>();
            if include_self {
                chain.insert(0, id);
            }
            chain
                .into_iter()
                .rev()
                .filter(|n| accept(self.kind(*n)))
                .map(|n| match self.kind(n) {
                    NodeKind::LinkType { entry, .. } => entry.implementation_segment(),
                    _ => self.type_name(n),
                })
                .collect::<String>()
        };

        match &node.kind {
            NodeKind::Actor { .. } => "__LinkBase".to_string(),
            NodeKind::LinkType { .. } => {
                format!("__{assembly}Link{}", segments(true, |k| k.is_link_type()))
            }
            NodeKind::Hierarchy { .. } => format!(
                "__{assembly}Hierarchy{}",
                segments(false, |k| matches!(k, NodeKind::LinkType { .. } | NodeKind::Extension { .. }))
            ),
            NodeKind::Extension { .. } => format!(
                "__{assembly}LinkExtension{}{}",
                segments(false, |k| matches!(k, NodeKind::LinkType { .. } | NodeKind::Hierarchy { .. })),
                self.type_name(id)
            ),
            NodeKind::BackLink => format!(
                "__{assembly}{}BackLink",
                segments(false, |k| {
                    matches!(
                        k,
                        NodeKind::LinkType { .. } | NodeKind::Extension { .. } | NodeKind::Hierarchy { .. }
                    )
                })
            ),
        }
    }

    /// One-line description used by the tree view.
    pub fn describe(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Actor { .. } => format!("{} (Actor)", self.type_name(id)),
            NodeKind::LinkType { kind, .. } => format!("{} Link ({kind:?})", self.type_name(id)),
            NodeKind::Extension { symbol } => format!("{} (Extension: {})", self.type_name(id), symbol.name),
            NodeKind::Hierarchy { .. } => "Hierarchy".to_string(),
            NodeKind::BackLink => "BackLink<TSource>".to_string(),
        }
    }

    /// Indented `- node` lines for `id` and its descendants.
    pub fn tree_view(&self, id: NodeId) -> Vec<String> {
        let mut lines = Vec::new();
        self.tree_view_into(id, 0, &mut lines);
        lines
    }

    fn tree_view_into(&self, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        lines.push(format!("{}- {}", "  ".repeat(depth), self.describe(id)));
        for child in self.children(id) {
            self.tree_view_into(*child, depth + 1, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::helpers::{core_target, sample_tree};

    #[test]
    fn test_relative_path_is_empty_directly_under_actor() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        assert_eq!(arena.relative_type_path(ids.indexable), "");
        assert_eq!(arena.type_path(ids.indexable), "Discord.IFooActor");
        assert_eq!(arena.format_as_type_path(ids.indexable), "Discord.IFooActor.Indexable");
    }

    #[test]
    fn test_nested_paths() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        assert_eq!(arena.relative_type_path(ids.enumerable_indexable), ".Enumerable");
        assert_eq!(
            arena.format_as_type_path(ids.enumerable_indexable_backlink),
            "Discord.IFooActor.Enumerable.Indexable.BackLink<TSource>"
        );
        assert_eq!(
            arena.format_relative_type_path(ids.enumerable_indexable_backlink, |n| {
                arena.kind(n).is_link_type()
            }),
            ".Enumerable.Indexable"
        );
        assert_eq!(arena.format_as_type_path(ids.actor), "");
    }

    #[test]
    fn test_implementation_class_names() {
        let (arena, ids) = sample_tree(crate::tests::helpers::rest_target("IFoo"));
        assert_eq!(arena.implementation_class_name(ids.actor), "__LinkBase");
        assert_eq!(arena.implementation_class_name(ids.enumerable_indexable), "__RestLinkEnumerableIndexable");
        assert_eq!(arena.implementation_class_name(ids.paged), "__RestLinkPaged2");
        assert_eq!(
            arena.implementation_class_name(ids.enumerable_indexable_backlink),
            "__RestEnumerableIndexableBackLink"
        );
    }

    #[test]
    fn test_path_generics_collects_paged_and_backlink() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        let (generics, constraints) = arena.path_generics(ids.paged_backlink);
        assert_eq!(generics, vec!["TSource", "TPaged", "TPageParams"]);
        assert_eq!(constraints.len(), 2);
        assert_eq!(arena.with_path_generics(ids.indexable, "X"), "X");
    }

    #[test]
    fn test_equivalent_pathing_across_trees() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        assert_eq!(
            arena.node_with_equivalent_pathing(ids.enumerable_indexable, ids.actor),
            Some(ids.enumerable_indexable)
        );
        assert_eq!(arena.node_with_equivalent_pathing(ids.actor, ids.actor), Some(ids.actor));
    }
}
