//! Link-type nodes: `Indexable`, `Enumerable`, `Defined` and `Paged<..>` under an actor, nested
//! according to the schematic.
//!
//! A link type's interface derives from every link type in its composition, so
//! `IFooActor.Enumerable.Indexable` is both an `IFooActor.Enumerable` and an `IFooActor.Indexable`.
//! Each kind redeclares its operations with the actor's concrete types whenever the node redefines
//! link members (non-core, or the actor has ancestors) and forwards the inherited signatures to
//! them.

use std::{collections::BTreeSet, sync::Arc};

use tracing::{trace, warn};

use crate::{
    error::LinkGenError,
    graph::NodeContext,
    nodes::{self, extension, hierarchy, implementation::Implementation, NodeArena, NodeId, NodeKind},
    schematic::{LinkTypeKind, SchematicEntry},
    symbols::Compilation,
    syntax::{
        Accessibility, IndexerDecl, Member, MethodDecl, Modifier, Parameter, PropertyDecl, TypeDecl,
    },
    target::LinkTarget,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LinkTypeState {
    /// The equivalent link type on the base actor, when that one generates an implementation.
    pub implementation_base: Option<NodeId>,
    pub redefines_link_members: bool,
    pub should_declare_new: bool,
    pub implementation: Implementation,
}

/// Attaches `entry` under `parent` when the compatibility matrix allows it, then recurses into
/// the entry's children.
pub fn try_attach(
    arena: &mut NodeArena,
    compilation: &Compilation,
    target: &Arc<LinkTarget>,
    parent: NodeId,
    entry: &SchematicEntry,
) -> Option<NodeId> {
    let Some(kind) = entry.kind() else {
        warn!(symbol = %entry.symbol, "schematic entry is not a known link type");
        return None;
    };

    if let NodeKind::LinkType { kind: parent_kind, .. } = arena.kind(parent) {
        if !parent_kind.accepts().contains(kind) {
            warn!(parent = ?parent_kind, child = ?kind, "incompatible link type nesting skipped");
            return None;
        }
    }

    let id = arena.alloc(
        Some(parent),
        target.clone(),
        NodeKind::LinkType {
            kind,
            entry: entry.clone(),
        },
    );
    arena.alloc(Some(id), target.clone(), NodeKind::BackLink);
    extension::add_to(arena, compilation, target, id);
    hierarchy::add_to(arena, compilation, target, id);

    for child in &entry.children {
        try_attach(arena, compilation, target, id, child);
    }
    Some(id)
}

pub fn visit(ctx: &NodeContext, id: NodeId, ancestors: &[NodeId]) -> Result<LinkTypeState, LinkGenError> {
    let arena = ctx.arena();
    let target = ctx.target(id);
    let root = arena.root_actor(id);

    let implementation_base = if target.is_core() {
        None
    } else {
        root.and_then(|r| ctx.actor_state(r))
            .and_then(|state| state.base_actor)
            .and_then(|base| arena.node_with_equivalent_pathing(id, base))
            .filter(|node| arena.kind(*node).is_link_type() && arena.will_generate_implementation(*node))
    };

    let implementation = if arena.will_generate_implementation(id) {
        let root_constructor = root
            .and_then(|r| ctx.actor_state(r))
            .and_then(|state| state.implementation.constructor.as_ref());
        Implementation::new(&arena.implementation_class_name(id), Vec::new(), root_constructor)
    } else {
        Implementation::default()
    };

    let should_declare_new = ancestors
        .iter()
        .any(|ancestor| arena.node_with_equivalent_pathing(id, *ancestor).is_some());

    Ok(LinkTypeState {
        implementation_base,
        redefines_link_members: !target.is_core() || !ancestors.is_empty(),
        should_declare_new,
        implementation,
    })
}

fn indexer(type_name: &str, parameter: Parameter, expression: impl Into<String>) -> IndexerDecl {
    IndexerDecl {
        accessibility: Accessibility::Unspecified,
        modifiers: Default::default(),
        type_name: type_name.to_string(),
        explicit_interface: None,
        parameters: vec![parameter],
        expression: expression.into(),
    }
}

fn explicit_indexer(type_name: &str, iface: String, parameter: Parameter, expression: &str) -> IndexerDecl {
    IndexerDecl {
        explicit_interface: Some(iface),
        ..indexer(type_name, parameter, expression)
    }
}

/// An interface this node's operations are forwarded from, with the types it is declared over.
struct Forwarded<'a> {
    iface: String,
    actor: &'a str,
    entity: &'a str,
}

fn kind_members(
    ctx: &NodeContext,
    id: NodeId,
    kind: LinkTypeKind,
    entry: &SchematicEntry,
    redefines: bool,
    ancestors: &[NodeId],
) -> Vec<Member> {
    let arena = ctx.arena();
    let target = ctx.target(id);
    let rel = arena.relative_type_path(id);
    let type_name = arena.type_name(id);
    let mut members: Vec<Member> = Vec::new();

    if !redefines && kind != LinkTypeKind::Indexable {
        return members;
    }

    let mut forwarded = vec![Forwarded {
        iface: format!("{}.{}", target.link_type(), entry.format_type_name()),
        actor: &target.actor,
        entity: &target.entity,
    }];
    if !target.is_core() {
        forwarded.push(Forwarded {
            iface: format!("{}.{}", target.core_link_type(), entry.format_type_name()),
            actor: target.core_actor(),
            entity: target.core_entity(),
        });
    }
    for ancestor in ancestors {
        if arena.node_with_equivalent_pathing(id, *ancestor).is_none() {
            continue;
        }
        let ancestor_target = ctx.target(*ancestor);
        forwarded.push(Forwarded {
            iface: format!("{}{rel}.{type_name}", ancestor_target.actor),
            actor: &ancestor_target.actor,
            entity: &ancestor_target.entity,
        });
    }

    let id_param = || Parameter::new(&target.id, "id");
    let provider_lookup = format!("(this as {}).GetActor(id)", target.actor_provider());

    match kind {
        LinkTypeKind::Indexable => {
            let mut by_identity = indexer(
                &target.actor,
                Parameter::new(target.identifiable(), "identity"),
                "identity.Actor ?? GetActor(identity.Id)",
            );
            by_identity.accessibility = Accessibility::Internal;
            if redefines {
                by_identity.modifiers.insert(Modifier::New);
            }
            members.push(by_identity.into());

            if !target.is_core() {
                members.push(
                    explicit_indexer(
                        target.core_actor(),
                        format!("{}{rel}.{type_name}", target.core_actor()),
                        Parameter::new(target.core_identifiable(), "identity"),
                        "identity.Actor ?? GetActor(identity.Id)",
                    )
                    .into(),
                );
            }

            if redefines {
                let mut by_id = indexer(&target.actor, id_param(), &provider_lookup);
                by_id.modifiers.insert(Modifier::New);
                members.push(by_id.into());
                members.push(
                    MethodDecl::new(&target.actor, "Specifically")
                        .with_modifiers(Modifier::New)
                        .with_parameter(id_param())
                        .returning(&provider_lookup)
                        .into(),
                );

                for forward in &forwarded {
                    members.push(explicit_indexer(forward.actor, forward.iface.clone(), id_param(), "this[id]").into());
                    members.push(
                        MethodDecl::new(forward.actor, "Specifically")
                            .implementing(&forward.iface)
                            .with_parameter(id_param())
                            .returning("Specifically(id)")
                            .into(),
                    );
                }
            }
        }
        LinkTypeKind::Enumerable => {
            let all_async = |entity: &str| {
                MethodDecl::new(format!("ITask<IReadOnlyCollection<{entity}>>"), "AllAsync")
            };
            members.push(
                all_async(&target.entity)
                    .with_modifiers(Modifier::New)
                    .with_parameters([
                        Parameter::new("RequestOptions?", "options").with_default("null"),
                        Parameter::new("CancellationToken", "token").with_default("default"),
                    ])
                    .into(),
            );
            for forward in &forwarded {
                members.push(
                    all_async(forward.entity)
                        .implementing(&forward.iface)
                        .with_parameters([
                            Parameter::new("RequestOptions?", "options"),
                            Parameter::new("CancellationToken", "token"),
                        ])
                        .returning("AllAsync(options, token)")
                        .into(),
                );
            }
        }
        LinkTypeKind::Defined => {
            let ids = format!("IReadOnlyCollection<{}>", target.id);
            members.push(PropertyDecl::get(&ids, "Ids").with_modifiers(Modifier::New).into());
            for forward in &forwarded {
                members.push(PropertyDecl::explicit(&ids, &forward.iface, "Ids", "Ids").into());
            }
        }
        LinkTypeKind::Paged => {
            let paged = entry.type_parameters.first().cloned().unwrap_or_else(|| "TPaged".to_string());
            let params = entry
                .type_parameters
                .get(1)
                .cloned()
                .unwrap_or_else(|| "TPageParams".to_string());
            let returns = format!("IAsyncPaged<{paged}>");

            members.push(
                MethodDecl::new(&returns, "PagedAsync")
                    .with_modifiers(Modifier::New)
                    .with_parameters([
                        Parameter::new(format!("{params}?"), "args").with_default("default"),
                        Parameter::new("RequestOptions?", "options").with_default("null"),
                    ])
                    .into(),
            );
            for forward in &forwarded {
                members.push(
                    MethodDecl::new(&returns, "PagedAsync")
                        .implementing(&forward.iface)
                        .with_parameters([
                            Parameter::new(format!("{params}?"), "args"),
                            Parameter::new("RequestOptions?", "options"),
                        ])
                        .returning("PagedAsync(args, options)")
                        .into(),
                );
            }
        }
    }

    members
}

fn build_implementation(
    ctx: &NodeContext,
    id: NodeId,
    state: &LinkTypeState,
    additional: &mut Vec<TypeDecl>,
) -> Option<MethodDecl> {
    let arena = ctx.arena();
    let target = ctx.target(id);
    let root = arena.root_actor(id)?;
    let impl_name = arena.implementation_class_name(id);
    let impl_type = arena.with_path_generics(id, &impl_name);
    let (_, constraints) = arena.path_generics(id);
    let path = arena.format_as_type_path(id);

    let mut class = TypeDecl::class(&impl_type).with_accessibility(Accessibility::PrivateProtected);
    class.add_base(&path);
    let first = match state.implementation_base {
        Some(base) => format!(
            "{}.{}",
            ctx.target(base).actor,
            arena.with_path_generics(base, &arena.implementation_class_name(base))
        ),
        None => format!("{}.__LinkBase", ctx.target(root).actor),
    };
    class.insert_base(0, first);
    for clause in constraints {
        class.add_constraint(clause);
    }
    class.extend_members(state.implementation.properties.iter().map(|p| p.to_decl()));
    if let Some(ctor) = &state.implementation.constructor {
        class.add_member(ctor.to_decl());
    }
    additional.push(class);

    Some(
        MethodDecl::new(&path, "Create")
            .with_accessibility(Accessibility::Internal)
            .with_modifiers(Modifier::Static | Modifier::New)
            .with_parameters(state.implementation.constructor_parameters())
            .returning(format!(
                "new {}.{impl_type}({})",
                target.actor,
                state.implementation.constructor_arguments().join(", ")
            )),
    )
}

pub fn build(ctx: &NodeContext, id: NodeId, additional: &mut Vec<TypeDecl>) -> Result<Option<TypeDecl>, LinkGenError> {
    let arena = ctx.arena();
    let target = ctx.target(id);
    let visit = ctx.expect_state(id)?;
    let state = ctx
        .link_type_state(id)
        .ok_or_else(|| LinkGenError::Emit(format!("{id} is not a link type")))?;
    let NodeKind::LinkType { kind, entry } = arena.kind(id) else {
        return Err(LinkGenError::Emit(format!("{id} is not a link type")));
    };

    if !target.is_core() && target.assembly_link_type().is_none() {
        trace!(node = %id, assembly = %target.assembly, "no link types for assembly");
        return Ok(None);
    }

    let rel = arena.relative_type_path(id);
    let type_name = arena.type_name(id);
    let mut bases = BTreeSet::new();

    if arena.parent(id).is_some_and(|p| arena.kind(p).is_actor()) {
        bases.insert(format!("{}.Link", target.actor));
        bases.insert(format!("{}{rel}.{type_name}", target.link_type()));
    } else {
        bases.extend(
            visit
                .composition
                .iter()
                .filter(|n| arena.kind(**n).is_link_type())
                .map(|n| arena.format_as_type_path(*n)),
        );
    }

    if !target.is_core() {
        bases.insert(format!("{}{rel}.{type_name}", target.core_actor()));
        if let Some(assembly_link_type) = target.assembly_link_type() {
            bases.insert(assembly_link_type);
        }
    }

    for ancestor in &visit.ancestors {
        if arena.node_with_equivalent_pathing(id, *ancestor).is_some() {
            bases.insert(format!("{}{rel}.{type_name}", ctx.target(*ancestor).actor));
        }
    }

    let mut decl = TypeDecl::interface(&type_name);
    decl.set_new(state.should_declare_new);
    for base in bases {
        decl.add_base(base);
    }
    for clause in &entry.constraint_clauses {
        decl.add_constraint(clause);
    }

    decl.extend_members(kind_members(
        ctx,
        id,
        *kind,
        entry,
        state.redefines_link_members,
        &visit.ancestors,
    ));

    if arena.will_generate_implementation(id) {
        if let Some(create) = build_implementation(ctx, id, state, additional) {
            decl.add_member(create);
        }
    }

    for child in nodes::build_children(ctx, id, additional)? {
        decl.add_member(child);
    }

    Ok(Some(decl))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::LinkGraph,
        schematic::Schematic,
        symbols::TypeKind,
        tests::helpers::{core_actor_symbol, core_target, rest_actor_symbol, rest_target},
        target::Assembly,
    };

    fn find(graph: &LinkGraph, actor: &str, path: &[&str]) -> NodeId {
        let arena = graph.arena();
        let mut current = graph.actor(actor).unwrap();
        for segment in path {
            current = arena
                .children(current)
                .iter()
                .copied()
                .find(|c| arena.kind(*c).is_link_type() && arena.type_name(*c).starts_with(segment))
                .unwrap();
        }
        current
    }

    #[test]
    fn test_matrix_rejects_incompatible_nesting() {
        let mut arena = NodeArena::new();
        let target = Arc::new(core_target("IFoo"));
        let actor = arena.alloc(
            None,
            target.clone(),
            NodeKind::Actor {
                symbol: crate::symbols::TypeSymbol::new("Discord.IFooActor", TypeKind::Interface),
            },
        );
        let compilation = Compilation::default();
        let indexable = try_attach(
            &mut arena,
            &compilation,
            &target,
            actor,
            &SchematicEntry::new("Discord.ILinkType.Indexable")
                .with_children(vec![SchematicEntry::new("Discord.ILinkType.Enumerable")]),
        )
        .unwrap();

        assert_eq!(arena.children(indexable).len(), 1);
        assert!(arena.kind(arena.children(indexable)[0]).is_back_link());
        assert!(try_attach(&mut arena, &compilation, &target, actor, &SchematicEntry::new("X.Unknown")).is_none());
    }

    #[test]
    fn test_core_root_link_type_bases() {
        let mut graph = LinkGraph::new(Compilation::default(), Schematic::standard(), [core_target("IFoo")]);
        graph.visit().unwrap();
        let ctx = graph.context();
        let id = find(&graph, "Discord.IFooActor", &["Indexable"]);

        let decl = build(&ctx, id, &mut Vec::new()).unwrap().unwrap();
        assert_eq!(
            decl.bases,
            vec![
                "Discord.IFooActor.Link".to_string(),
                format!("{}.Indexable", core_target("IFoo").link_type()),
            ]
        );
        assert!(!decl.modifiers.contains(Modifier::New));
        // Core without ancestors only keeps the identity indexer.
        assert_eq!(decl.members.iter().filter(|m| matches!(m, Member::Indexer(_))).count(), 1);
    }

    #[test]
    fn test_nested_link_type_derives_from_composition() {
        let mut graph = LinkGraph::new(Compilation::default(), Schematic::standard(), [core_target("IFoo")]);
        graph.visit().unwrap();
        let ctx = graph.context();
        let id = find(&graph, "Discord.IFooActor", &["Enumerable", "Indexable"]);

        let decl = build(&ctx, id, &mut Vec::new()).unwrap().unwrap();
        assert!(decl.bases.contains(&"Discord.IFooActor.Indexable".to_string()));
        assert!(decl.bases.contains(&"Discord.IFooActor.Enumerable".to_string()));
    }

    #[test]
    fn test_rest_link_type_emits_implementation_and_factory() {
        let mut graph = LinkGraph::new(
            Compilation::new([rest_actor_symbol("IFoo", None)]),
            Schematic::standard(),
            [rest_target("IFoo")],
        );
        graph.visit().unwrap();
        let ctx = graph.context();
        let id = find(&graph, "Discord.Rest.RestFooActor", &["Enumerable", "Indexable"]);

        let mut additional = Vec::new();
        let decl = build(&ctx, id, &mut additional).unwrap().unwrap();
        assert!(decl.bases.contains(&"Discord.IFooActor.Enumerable.Indexable".to_string()));
        assert!(decl.methods().any(|m| m.name == "Create" && m.modifiers.contains(Modifier::Static)));

        let class = additional
            .iter()
            .find(|c| c.name == "__RestLinkEnumerableIndexable")
            .unwrap();
        assert_eq!(class.bases[0], "Discord.Rest.RestFooActor.__LinkBase");
        assert_eq!(class.accessibility, Accessibility::PrivateProtected);
    }

    #[test]
    fn test_gateway_link_types_emit_nothing() {
        let gateway = LinkTarget::new(
            "Discord.Gateway.GatewayFooActor",
            "Discord.Gateway.GatewayFoo",
            "ulong",
            "Discord.Models.IFooModel",
            Assembly::Gateway,
        )
        .with_core("Discord.IFooActor", "Discord.IFoo");
        let mut graph = LinkGraph::new(Compilation::default(), Schematic::standard(), [gateway]);
        graph.visit().unwrap();
        let ctx = graph.context();
        let id = find(&graph, "Discord.Gateway.GatewayFooActor", &["Indexable"]);
        assert!(build(&ctx, id, &mut Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_ancestor_link_types_are_redeclared() {
        let mut child = core_actor_symbol("IThreadChannel");
        child.interfaces.push("Discord.IChannelActor".to_string());
        let mut entity = crate::symbols::TypeSymbol::new("Discord.IThreadChannel", TypeKind::Interface);
        entity.interfaces.push("Discord.IChannel".to_string());
        let mut graph = LinkGraph::new(
            Compilation::new([core_actor_symbol("IChannel"), child, entity]),
            Schematic::standard(),
            [core_target("IChannel"), core_target("IThreadChannel")],
        );
        graph.visit().unwrap();
        let ctx = graph.context();
        let id = find(&graph, "Discord.IThreadChannelActor", &["Indexable"]);

        let decl = build(&ctx, id, &mut Vec::new()).unwrap().unwrap();
        assert!(decl.modifiers.contains(Modifier::New));
        assert!(decl.bases.contains(&"Discord.IChannelActor.Indexable".to_string()));
        assert!(decl.methods().any(|m| {
            m.name == "Specifically" && m.explicit_interface.as_deref() == Some("Discord.IChannelActor.Indexable")
        }));
    }
}
