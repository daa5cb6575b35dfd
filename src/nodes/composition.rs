//! # Semantic composition
//!
//! A node's *semantic composition* is the set of other nodes in its actor tree that it also
//! behaves as. `Actor.Enumerable.Indexable.Extension` is, among others, an `Indexable.Extension`
//! and an `Enumerable`: every subset of its ancestor chain that still exists as a path in the tree
//! names a node whose surface this one must re-expose.
//!
//! The search walks the parent chain upward and groups consecutive ancestors of the same
//! category. Link-type and extension groups expand into every order-preserving non-empty subset
//! ([`get_product`]); other groups stay whole. Each non-empty mask over the groups is then
//! replayed from the root actor, matching children with [`NodeArena::semantic_eq`] one segment at
//! a time. Within a group the current frontier is searched in parallel with rayon; every
//! frontier node is independent so the fan-out needs no shared state.
//!
//! Two nodes are semantically equal when they share a category and:
//! - for link types, declare the same schematic entry;
//! - otherwise, agree on whether they generate an implementation and on their type name.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::nodes::{NodeArena, NodeCategory, NodeId, NodeKind};

/// Every order-preserving non-empty subset of `source`, in bitmask order.
///
/// With `remove_last` the full set is excluded. An empty source yields no subsets at all.
pub fn get_product<T: Clone>(source: &[T], remove_last: bool) -> Vec<Vec<T>> {
    if source.is_empty() {
        return Vec::new();
    }

    let upper = (1usize << source.len()) - if remove_last { 2 } else { 1 };
    (1..=upper)
        .map(|mask| {
            source
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, item)| item.clone())
                .collect()
        })
        .collect()
}

impl NodeArena {
    pub fn semantic_eq(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }

        match (self.kind(a), self.kind(b)) {
            (NodeKind::LinkType { entry: left, .. }, NodeKind::LinkType { entry: right, .. }) => {
                left.symbol == right.symbol
            }
            (left, right) if left.category() == right.category() => {
                self.will_generate_implementation(a) == self.will_generate_implementation(b)
                    && self.type_name(a) == self.type_name(b)
            }
            _ => false,
        }
    }

    /// The semantic composition of `id`.
    ///
    /// `exclude` removes results already claimed elsewhere (the parent's composition when a
    /// node's exclusive contribution is wanted).
    pub fn semantic_composition(
        &self,
        id: NodeId,
        exclude_self: bool,
        exclude: Option<&BTreeSet<NodeId>>,
    ) -> BTreeSet<NodeId> {
        let Some(root) = self.root_actor(id) else {
            return BTreeSet::new();
        };

        let product = self.search_product(id);
        let mut result = BTreeSet::new();

        if product.is_empty() {
            return result;
        }

        let bounds = (1usize << product.len()) - 1;
        let width = product.len();

        for sample in 1..=bounds {
            let mut search_nodes = BTreeSet::from([root]);

            for (index, group) in product.iter().enumerate() {
                if search_nodes.is_empty() {
                    break;
                }

                let identity = 1usize << index;
                if identity & sample == 0 {
                    tracing::trace!("{id} sample {sample:0width$b}: {identity:0width$b} skipped");
                    continue;
                }

                let bag = search_nodes
                    .par_iter()
                    .flat_map_iter(|start| {
                        group
                            .iter()
                            .filter_map(|set| self.walk(*start, set))
                            .filter(|found| !exclude.is_some_and(|excluded| excluded.contains(found)))
                            .filter(|found| !(exclude_self && *found == id))
                            .collect::<Vec<_>>()
                    })
                    .collect::<BTreeSet<_>>();

                if bag.is_empty() {
                    tracing::trace!(
                        "{id} sample {sample:0width$b}: ending at group {}/{}",
                        index + 1,
                        product.len()
                    );
                    search_nodes.clear();
                    break;
                }

                tracing::trace!(
                    "{id} sample {sample:0width$b}: {identity:0width$b} -> {} nodes from {}",
                    bag.len(),
                    search_nodes.len()
                );
                search_nodes = bag;
            }

            result.extend(search_nodes);
        }

        result
    }

    /// Follows `set` down from `start`, one semantically equal child per step.
    fn walk(&self, start: NodeId, set: &[NodeId]) -> Option<NodeId> {
        set.iter().try_fold(start, |current, segment| {
            self.children(current)
                .iter()
                .copied()
                .find(|child| self.semantic_eq(*child, *segment))
        })
    }

    /// Groups `id` and its ancestors (up to the nearest actor or backlink) by category, root
    /// group first; each group lists the candidate node sequences for that position.
    fn search_product(&self, id: NodeId) -> Vec<Vec<Vec<NodeId>>> {
        let mut product = Vec::new();
        let mut search_category = self.kind(id).category();
        let mut search_set = vec![id];

        for parent in self.parents(id) {
            let category = self.kind(parent).category();
            if matches!(category, NodeCategory::Actor | NodeCategory::BackLink) {
                break;
            }

            if category != search_category {
                product.push(self.expand_group(std::mem::take(&mut search_set)));
                search_category = category;
            }
            search_set.push(parent);
        }

        if !search_set.is_empty() {
            product.push(self.expand_group(search_set));
        }

        product.reverse();
        product
    }

    fn expand_group(&self, mut group: Vec<NodeId>) -> Vec<Vec<NodeId>> {
        group.reverse();
        match group.last().map(|last| self.kind(*last).category()) {
            Some(NodeCategory::LinkType | NodeCategory::Extension) => get_product(&group, false),
            _ => vec![group],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{core_target, sample_tree};

    #[test]
    fn test_get_product_counts() {
        assert!(get_product::<u8>(&[], false).is_empty());
        assert!(get_product::<u8>(&[], true).is_empty());
        assert_eq!(get_product(&[1, 2, 3], false).len(), 7);
        assert_eq!(get_product(&[1, 2, 3], true).len(), 6);
        assert_eq!(get_product(&[1, 2], false), vec![vec![1], vec![2], vec![1, 2]]);
    }

    #[test]
    fn test_semantic_eq_matches_across_link_positions() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        assert!(arena.semantic_eq(ids.indexable, ids.enumerable_indexable));
        assert!(!arena.semantic_eq(ids.indexable, ids.enumerable));
        assert!(arena.semantic_eq(ids.actor_backlink, ids.indexable_backlink));
    }

    #[test]
    fn test_nested_indexable_composes_with_root_links() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        let composition = arena.semantic_composition(ids.enumerable_indexable, true, None);

        assert!(composition.contains(&ids.indexable));
        assert!(composition.contains(&ids.enumerable));
        assert!(!composition.contains(&ids.enumerable_indexable));
    }

    #[test]
    fn test_backlink_composition_stops_at_backlink() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        let composition = arena.semantic_composition(ids.enumerable_indexable_backlink, true, None);

        assert!(composition.contains(&ids.indexable_backlink));
        assert!(composition.contains(&ids.enumerable_backlink));
        assert!(composition.contains(&ids.actor_backlink));
        assert!(composition.contains(&ids.enumerable));
        assert!(!composition.contains(&ids.enumerable_indexable_backlink));
    }

    #[test]
    fn test_actor_has_no_composition() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        assert!(arena.semantic_composition(ids.actor, true, None).is_empty());
    }

    #[test]
    fn test_exclusion_removes_claimed_nodes() {
        let (arena, ids) = sample_tree(core_target("IFoo"));
        let claimed = BTreeSet::from([ids.indexable]);
        let composition = arena.semantic_composition(ids.enumerable_indexable, true, Some(&claimed));
        assert!(!composition.contains(&ids.indexable));
        assert!(composition.contains(&ids.enumerable));
    }
}
