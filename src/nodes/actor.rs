//! # Actor nodes
//!
//! The root of every target's tree. An actor node produces the actor's `partial` declaration,
//! which nests:
//!
//! - `Link`, the link interface every link type of the actor derives from;
//! - `__LinkBase`, the abstract implementation root for Rest actors;
//! - `DefaultActorProvider`/`GetProvider` factories for non-core actors with identity-bearing
//!   constructors;
//! - `Relationship` and `CanonicalRelationship` for core actors;
//! - every child node's declaration, then the implementation classes those children hoisted.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tracing::{debug, trace};

use crate::{
    error::LinkGenError,
    graph::NodeContext,
    nodes::{
        self, extension, hierarchy,
        implementation::{ImplProperty, Implementation},
        link_type, NodeArena, NodeId, NodeKind,
    },
    schematic::Schematic,
    symbols::{simple_name, Compilation, MarkerAttribute, TypeKind, TypeSymbol},
    syntax::{
        to_parameter_name, Accessibility, FieldDecl, Member, MethodDecl, Modifier, Parameter,
        PropertyDecl, TypeDecl,
    },
    target::{friendly_name, Assembly, LinkTarget},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    pub relationship_name: String,
    pub base_actor: Option<NodeId>,
    pub has_child_target: bool,
    /// The model carries its own id (`IEntityModel`), so entities are created through the actor.
    pub model_has_id: bool,
    pub redefines_root_members: bool,
    /// Relationship name to the actors related through a `CanonicalRelationship` supertype.
    pub additional_relationships: BTreeMap<String, Vec<NodeId>>,
    pub canonical_relationship_redefined: bool,
    pub implementation: Implementation,
}

/// Creates the actor root and its direct children: back link, extensions, hierarchy and one
/// link type per schematic root entry.
pub fn attach(
    arena: &mut NodeArena,
    compilation: &Compilation,
    schematic: &Schematic,
    target: LinkTarget,
) -> NodeId {
    let symbol = compilation
        .get_type_by_metadata_name(&target.actor)
        .cloned()
        .unwrap_or_else(|| {
            debug!(actor = %target.actor, "actor is not declared in the compilation");
            let kind = if target.is_core() {
                TypeKind::Interface
            } else {
                TypeKind::Class
            };
            TypeSymbol::new(&target.actor, kind)
        });

    let target = Arc::new(target);
    let actor = arena.alloc(None, target.clone(), NodeKind::Actor { symbol });
    arena.alloc(Some(actor), target.clone(), NodeKind::BackLink);
    extension::add_to(arena, compilation, &target, actor);
    hierarchy::add_to(arena, compilation, &target, actor);
    for entry in &schematic.root.children {
        link_type::try_attach(arena, compilation, &target, actor, entry);
    }
    actor
}

/// The relationship name declared on the actor itself.
pub fn user_relationship_name(ctx: &NodeContext, actor: NodeId) -> Option<String> {
    ctx.actor_symbol(actor)?
        .attribute(MarkerAttribute::RelationshipName)?
        .arguments
        .first()?
        .as_str()
        .map(str::to_string)
}

/// Declared name, else the nearest ancestor's declared name, else the actor's friendly name.
pub fn relationship_name(ctx: &NodeContext, actor: NodeId) -> String {
    if let Some(name) = user_relationship_name(ctx, actor) {
        return name;
    }
    if let Some(name) = ctx
        .ancestors(actor)
        .into_iter()
        .find_map(|ancestor| user_relationship_name(ctx, ancestor))
    {
        return name;
    }
    let kind = ctx.actor_symbol(actor).map(|s| s.kind).unwrap_or_default();
    friendly_name(&ctx.target(actor).actor, kind)
}

/// Relationship name to the actors reachable through `CanonicalRelationship` interfaces.
///
/// Starts from the core actor's direct interfaces. Each newly named relationship is followed into
/// the related actor's own interfaces, so relationships the related actor carries are inherited.
fn additional_relationships(ctx: &NodeContext, actor: NodeId) -> BTreeMap<String, Vec<NodeId>> {
    let mut relationships = BTreeMap::new();
    let Some(core) = ctx.compilation().get_type_by_metadata_name(ctx.target(actor).core_actor()) else {
        return relationships;
    };
    collect_relationships(ctx, actor, &core.interfaces, &mut relationships);
    relationships
}

fn collect_relationships(
    ctx: &NodeContext,
    actor: NodeId,
    interfaces: &[String],
    relationships: &mut BTreeMap<String, Vec<NodeId>>,
) {
    for iface in interfaces {
        let Some(related) = iface.strip_suffix(".CanonicalRelationship") else {
            continue;
        };
        let Some(node) = ctx.actor_by_core(related) else {
            trace!(%iface, "canonical relationship has no graph actor");
            continue;
        };
        if node == actor {
            continue;
        }

        let name = relationship_name_of(ctx, node);
        if let Some(nodes) = relationships.get_mut(&name) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
            continue;
        }

        relationships.insert(name, vec![node]);
        if let Some(symbol) = ctx.actor_symbol(node) {
            collect_relationships(ctx, actor, &symbol.interfaces, relationships);
        }
    }
}

fn root_properties(target: &LinkTarget, model_has_id: bool, has_base: bool, has_child: bool) -> Vec<ImplProperty> {
    let mut properties = vec![
        ImplProperty::new("Client", target.client_type()).with_accessibility(Accessibility::Public),
        ImplProperty::new("ActorProvider", target.actor_provider()).overridable(has_base, has_child),
    ];
    if !model_has_id {
        properties.push(ImplProperty::new("EntityProvider", target.entity_provider()).overridable(has_base, has_child));
    }
    properties
}

pub fn visit(ctx: &NodeContext, id: NodeId, ancestors: &[NodeId]) -> Result<ActorState, LinkGenError> {
    let target = ctx.target(id);
    let relationship_name = relationship_name(ctx, id);
    let base_actor = ctx.base_target(id);
    let has_child_target = ctx.has_child_target(id);
    let model_has_id = ctx.compilation().implements_simple(&target.model, "IEntityModel");

    let implementation = if target.is_core() {
        Implementation::default()
    } else {
        let base = base_actor
            .and_then(|base| ctx.actor_state(base))
            .and_then(|state| state.implementation.constructor.as_ref());
        Implementation::new(
            "__LinkBase",
            root_properties(target, model_has_id, base_actor.is_some(), has_child_target),
            base,
        )
    };

    let additional_relationships = additional_relationships(ctx, id);
    let canonical_relationship_redefined = additional_relationships.contains_key(&relationship_name)
        || ancestors
            .iter()
            .any(|ancestor| relationship_name_of(ctx, *ancestor) == relationship_name);

    Ok(ActorState {
        relationship_name,
        base_actor,
        has_child_target,
        model_has_id,
        redefines_root_members: !target.is_core() || !ancestors.is_empty(),
        additional_relationships,
        canonical_relationship_redefined,
        implementation,
    })
}

/// Stored name when the actor was already visited, else derived.
fn relationship_name_of(ctx: &NodeContext, actor: NodeId) -> String {
    ctx.actor_state(actor)
        .map(|state| state.relationship_name.clone())
        .unwrap_or_else(|| relationship_name(ctx, actor))
}

fn get_actor(target: &LinkTarget) -> MethodDecl {
    MethodDecl::new(&target.actor, "GetActor").with_parameter(Parameter::new(&target.id, "id"))
}

fn create_entity(target: &LinkTarget) -> MethodDecl {
    MethodDecl::new(&target.entity, "CreateEntity").with_parameter(Parameter::new(&target.model, "model"))
}

fn core_get_actor(target: &LinkTarget) -> MethodDecl {
    MethodDecl::new(target.core_actor(), "GetActor").with_parameter(Parameter::new(&target.id, "id"))
}

fn core_create_entity(target: &LinkTarget) -> MethodDecl {
    MethodDecl::new(target.core_entity(), "CreateEntity").with_parameter(Parameter::new(&target.model, "model"))
}

fn build_link_interface(ctx: &NodeContext, id: NodeId, state: &ActorState, ancestors: &[NodeId]) -> TypeDecl {
    let target = ctx.target(id);
    let mut link = TypeDecl::interface("Link");
    link.set_new(!ancestors.is_empty());
    link.add_base(target.link());

    if !target.is_core() {
        link.add_base(target.core_link());
    }

    if target.assembly == Assembly::Rest {
        link.add_base(target.rest_link_type());
        link.add_base(format!("{}.Link", target.core_actor()));
        link.add_member(
            get_actor(target)
                .with_accessibility(Accessibility::Internal)
                .with_modifiers(Modifier::New)
                .returning("Provider.GetActor(id)"),
        );
        link.add_member(
            create_entity(target)
                .with_accessibility(Accessibility::Internal)
                .with_modifiers(Modifier::New),
        );
    } else if target.is_core() && state.redefines_root_members {
        link.add_member(
            get_actor(target)
                .with_accessibility(Accessibility::Internal)
                .with_modifiers(Modifier::New),
        );
        link.add_member(
            create_entity(target)
                .with_accessibility(Accessibility::Internal)
                .with_modifiers(Modifier::New),
        );
    }

    if state.redefines_root_members || !ancestors.is_empty() {
        link.add_member(
            get_actor(target)
                .implementing(target.actor_provider())
                .returning("GetActor(id)"),
        );
        link.add_member(
            create_entity(target)
                .implementing(target.entity_provider())
                .returning("CreateEntity(model)"),
        );
        if !target.is_core() {
            link.add_member(
                core_get_actor(target)
                    .implementing(target.core_actor_provider())
                    .returning("GetActor(id)"),
            );
            link.add_member(
                core_create_entity(target)
                    .implementing(target.core_entity_provider())
                    .returning("CreateEntity(model)"),
            );
        }
    }

    for ancestor in ancestors {
        let ancestor_target = ctx.target(*ancestor);
        let redefines = ctx
            .actor_state(*ancestor)
            .is_some_and(|s| s.redefines_root_members);
        let ancestor_link = format!("{}.Link", ancestor_target.actor);
        let (actor_provider, entity_provider) = if redefines {
            (ancestor_link.clone(), ancestor_link.clone())
        } else {
            (ancestor_target.actor_provider(), ancestor_target.entity_provider())
        };

        link.add_base(ancestor_link);
        link.add_member(
            get_actor(ancestor_target)
                .implementing(actor_provider)
                .returning("GetActor(id)"),
        );
        link.add_member(
            create_entity(ancestor_target)
                .implementing(entity_provider)
                .returning("CreateEntity(model)"),
        );
    }

    link
}

fn build_link_base(ctx: &NodeContext, id: NodeId, state: &ActorState) -> TypeDecl {
    let target = ctx.target(id);
    let mut class = TypeDecl::class("__LinkBase")
        .with_accessibility(Accessibility::PrivateProtected)
        .with_modifiers(Modifier::Abstract);
    class.set_new(state.base_actor.is_some());
    class.add_base(format!("{}.Link", target.actor));
    if let Some(base) = state.base_actor {
        class.insert_base(0, format!("{}.__LinkBase", ctx.target(base).actor));
    }

    let inheritance = if state.base_actor.is_some() {
        Modifier::Override
    } else {
        Modifier::Virtual
    };

    class.extend_members(state.implementation.properties.iter().map(ImplProperty::to_decl));

    class.add_member(
        get_actor(target)
            .with_accessibility(Accessibility::Internal)
            .with_modifiers(inheritance)
            .returning("ActorProvider.GetActor(id)"),
    );
    let entity_factory = if state.model_has_id {
        "GetActor(model.Id).CreateEntity(model)"
    } else {
        "EntityProvider.CreateEntity(model)"
    };
    class.add_member(
        create_entity(target)
            .with_accessibility(Accessibility::Internal)
            .with_modifiers(inheritance)
            .returning(entity_factory),
    );

    let link = format!("{}.Link", target.actor);
    class.add_member(get_actor(target).implementing(&link).returning("GetActor(id)"));
    class.add_member(create_entity(target).implementing(&link).returning("CreateEntity(model)"));
    class.add_member(PropertyDecl::explicit(
        target.actor_provider(),
        target.rest_link_type(),
        "Provider",
        "ActorProvider",
    ));

    if let Some(ctor) = &state.implementation.constructor {
        class.add_member(ctor.to_decl());
    }
    class
}

fn is_identity_parameter(target: &LinkTarget, type_name: &str, friendly: &str) -> bool {
    simple_name(type_name) == target.client_type()
        || type_name == target.identifiable()
        || simple_name(type_name) == format!("{friendly}Identity")
}

/// `DefaultActorProvider` and `GetProvider` for each identity-bearing constructor.
fn build_provider_factories(ctx: &NodeContext, id: NodeId, state: &ActorState) -> Vec<Member> {
    let target = ctx.target(id);
    let Some(symbol) = ctx.actor_symbol(id) else {
        return Vec::new();
    };
    let friendly = friendly_name(&target.actor, symbol.kind);
    let mut members = Vec::new();

    for ctor in &symbol.constructors {
        let identity_params = ctor
            .parameters
            .iter()
            .filter(|p| is_identity_parameter(target, &p.type_name, &friendly))
            .count();
        if identity_params < 2 {
            continue;
        }

        let mut pending = state
            .additional_relationships
            .values()
            .flatten()
            .copied()
            .collect::<Vec<_>>();
        let mut cache_keys = Vec::new();
        // (name, Some(parameter)) when the factory takes it, None when it is the provider's id.
        let mut arguments: Vec<(String, Option<Parameter>)> = Vec::new();

        for param in &ctor.parameters {
            if param.type_simple_name() == "IIdentifiable" {
                if param.type_name == target.identifiable() {
                    arguments.push((param.name.clone(), None));
                    continue;
                }
                let before = pending.len();
                pending.retain(|n| ctx.target(*n).identifiable() != param.type_name);
                if pending.len() != before {
                    cache_keys.push(param.name.clone());
                }
            }

            let mut parameter = Parameter::new(&param.type_name, &param.name);
            parameter.default = param.default.clone();
            arguments.push((param.name.clone(), Some(parameter)));
        }

        for related in pending {
            let related_target = ctx.target(related);
            let kind = ctx.actor_symbol(related).map(|s| s.kind).unwrap_or_default();
            let name = to_parameter_name(&friendly_name(&related_target.actor, kind));
            cache_keys.push(name.clone());
            arguments.push((name.clone(), Some(Parameter::new(related_target.identifiable(), name))));
        }

        let mut ordered = arguments
            .iter()
            .enumerate()
            .filter_map(|(i, (_, p))| p.clone().map(|p| (i, p)))
            .map(|(i, p)| {
                let key = if p.default.is_none() { i } else { usize::MAX - i };
                (key, p)
            })
            .collect::<Vec<_>>();
        ordered.sort_by_key(|(key, _)| *key);
        let parameters = ordered.into_iter().map(|(_, p)| p).collect::<Vec<_>>();

        let constructor_args = arguments
            .iter()
            .map(|(name, param)| match param {
                Some(_) => name.clone(),
                None => format!("{}.Of(id)", target.identifiable()),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let factory = format!("(client, id) => new {}({constructor_args})", target.actor);

        let invocation = if state.additional_relationships.is_empty() {
            format!("CreateRoot<{}, {}>(client, {factory})", target.actor, target.id)
        } else {
            let keys = cache_keys
                .iter()
                .map(|k| format!("{k}.Id"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "CreateStateful<{}, {}>(client, HashCode.Combine({keys}), {factory})",
                target.actor, target.id
            )
        };

        let func_types = parameters
            .iter()
            .map(|p| p.type_name.clone())
            .chain(std::iter::once(target.actor_provider()))
            .collect::<Vec<_>>()
            .join(", ");

        members.push(Member::from(FieldDecl {
            accessibility: Accessibility::Internal,
            modifiers: Modifier::Static | Modifier::Readonly | Modifier::New,
            type_name: format!("Func<{func_types}>"),
            name: "DefaultActorProvider".to_string(),
            initializer: Some("GetProvider".to_string()),
        }));
        members.push(Member::from(
            MethodDecl::new(target.actor_provider(), "GetProvider")
                .with_accessibility(Accessibility::Internal)
                .with_modifiers(Modifier::Static | Modifier::New)
                .with_parameters(parameters)
                .returning(format!("RestActorProvider.{invocation}")),
        ));
    }

    members
}

fn build_relationships(ctx: &NodeContext, id: NodeId, state: &ActorState, ancestors: &[NodeId]) -> Vec<TypeDecl> {
    let target = ctx.target(id);
    let name = &state.relationship_name;

    let mut relationship = TypeDecl::interface("Relationship");
    relationship.set_new(!ancestors.is_empty());
    relationship.add_base(target.relationship());
    relationship.add_member(PropertyDecl::explicit(
        &target.actor,
        target.relationship(),
        "RelationshipActor",
        name,
    ));
    relationship.add_member(PropertyDecl::get(&target.actor, name).with_accessibility(Accessibility::Internal));

    let mut canonical = TypeDecl::interface("CanonicalRelationship");
    canonical.set_new(!ancestors.is_empty());
    canonical.add_base("Relationship");
    canonical.add_base(target.canonical_relationship());

    for ancestor in ancestors {
        let ancestor_target = ctx.target(*ancestor);
        canonical.add_base(format!("{}.CanonicalRelationship", ancestor_target.actor));
        canonical.add_member(PropertyDecl::explicit(
            &ancestor_target.actor,
            format!("{}.Relationship", ancestor_target.actor),
            relationship_name_of(ctx, *ancestor),
            name,
        ));
    }

    // Actors sharing an entity relate through the same id.
    let mut by_entity: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
    for node in ancestors.iter().copied().chain(std::iter::once(id)) {
        by_entity.entry(&ctx.target(node).entity).or_default().push(node);
    }
    for (entity, nodes) in by_entity.iter().filter(|(_, nodes)| nodes.len() > 1) {
        canonical.add_member(PropertyDecl::explicit(
            &target.id,
            format!("Discord.IRelation<{}, {entity}>", target.id),
            "RelationshipId",
            format!("{}.Id", relationship_name_of(ctx, nodes[0])),
        ));
    }

    if state.canonical_relationship_redefined {
        canonical.add_member(
            PropertyDecl::get(&target.actor, name)
                .with_accessibility(Accessibility::Internal)
                .with_modifiers(Modifier::New),
        );
        canonical.add_member(PropertyDecl::explicit(
            &target.actor,
            format!("{}.Relationship", target.actor),
            name,
            name,
        ));
    }

    let mut seen = BTreeSet::new();
    for (key, nodes) in &state.additional_relationships {
        for node in nodes {
            let related = ctx.target(*node);
            if !seen.insert(related.actor.clone()) {
                continue;
            }
            canonical.add_base(format!("{}.CanonicalRelationship", related.actor));
            if state.canonical_relationship_redefined {
                // A redefined relationship is redeclared on the related CanonicalRelationship.
                let owner = if ctx
                    .actor_state(*node)
                    .is_some_and(|related| related.canonical_relationship_redefined)
                {
                    "CanonicalRelationship"
                } else {
                    "Relationship"
                };
                canonical.add_member(PropertyDecl::explicit(
                    &related.actor,
                    format!("{}.{owner}", related.actor),
                    key,
                    format!("{name}.{key}"),
                ));
            }
        }
    }

    vec![relationship, canonical]
}

fn view_comment(ctx: &NodeContext, id: NodeId, ancestors: &[NodeId]) -> Vec<String> {
    let target = ctx.target(id);
    let mut lines = vec![
        format!("Actor: {}", target.actor),
        format!("Model: {}", target.model),
        format!("Entity: {}", target.entity),
        format!("Id: {}", target.id),
        "Interfaces:".to_string(),
    ];
    lines.extend(ancestors.iter().map(|a| format!("  - {}", ctx.target(*a).actor)));
    lines.push("Nodes:".to_string());
    lines.extend(ctx.arena().tree_view(id).into_iter().map(|l| format!("  {l}")));
    lines
}

/// Wraps `decl` in `partial` redeclarations of the actor's containing types.
fn wrap_in_containing_types(ctx: &NodeContext, symbol: &TypeSymbol, mut decl: TypeDecl) -> TypeDecl {
    let mut seen = BTreeSet::new();
    let mut container = symbol.containing_type.clone();

    while let Some(name) = container {
        if !seen.insert(name.clone()) {
            break;
        }
        let declared = ctx.compilation().get_type_by_metadata_name(&name);
        let (kind, declared_name) = declared
            .map(|s| (s.kind, s.declared_name()))
            .unwrap_or((TypeKind::Class, simple_name(&name).to_string()));

        let mut outer = TypeDecl::new(kind, declared_name)
            .with_accessibility(Accessibility::Unspecified)
            .with_modifiers(Modifier::Partial);
        outer.add_member(decl);
        decl = outer;
        container = declared.and_then(|s| s.containing_type.clone());
    }
    decl
}

pub fn build(ctx: &NodeContext, id: NodeId) -> Result<Option<TypeDecl>, LinkGenError> {
    let visit = ctx.expect_state(id)?;
    let Some(state) = ctx.actor_state(id) else {
        return Err(LinkGenError::Emit(format!("{id} is not an actor")));
    };
    let Some(symbol) = ctx.actor_symbol(id) else {
        return Err(LinkGenError::Emit(format!("{id} has no actor symbol")));
    };
    let target = ctx.target(id);
    let ancestors = &visit.ancestors;

    let mut decl = TypeDecl::new(symbol.kind, symbol.declared_name()).with_modifiers(Modifier::Partial);
    if ctx.options().tree_view {
        decl.leading_comments = view_comment(ctx, id, ancestors);
    }
    for clause in &symbol.constraint_clauses {
        decl.add_constraint(clause);
    }

    decl.add_member(build_link_interface(ctx, id, state, ancestors));

    if target.assembly == Assembly::Rest {
        decl.add_member(build_link_base(ctx, id, state));
    }

    if !target.is_core() {
        decl.extend_members(build_provider_factories(ctx, id, state));
    } else {
        decl.extend_members(build_relationships(ctx, id, state, ancestors));
    }

    let mut additional = Vec::new();
    for child in nodes::build_children(ctx, id, &mut additional)? {
        decl.add_member(child);
    }
    decl.extend_members(additional);

    Ok(Some(wrap_in_containing_types(ctx, symbol, decl)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{BuildOptions, LinkGraph},
        symbols::{AttributeData, ConstructorSymbol, ParameterSymbol, TypedConstant},
        syntax::{Body, PropertyBody},
        tests::helpers::{core_actor_symbol, core_target, rest_actor_symbol, rest_target},
    };

    fn named(mut symbol: TypeSymbol, relationship: &str) -> TypeSymbol {
        symbol.attributes.push(AttributeData {
            class: MarkerAttribute::RelationshipName.metadata_name().to_string(),
            arguments: vec![TypedConstant::Primitive(relationship.to_string())],
            ..Default::default()
        });
        symbol
    }

    fn implementing(mut symbol: TypeSymbol, interfaces: &[&str]) -> TypeSymbol {
        symbol.interfaces.extend(interfaces.iter().map(|i| i.to_string()));
        symbol
    }

    fn param(type_name: impl Into<String>, name: &str) -> ParameterSymbol {
        ParameterSymbol {
            name: name.to_string(),
            type_name: type_name.into(),
            default: None,
        }
    }

    fn constructor(parameters: Vec<ParameterSymbol>) -> ConstructorSymbol {
        ConstructorSymbol { parameters }
    }

    /// Threads are channels related to a guild; the guild is itself related to foo and bar, and
    /// bar shares the guild's relationship name.
    fn related_graph() -> LinkGraph {
        let mut thread_entity = TypeSymbol::new("Discord.IThread", TypeKind::Interface);
        thread_entity.interfaces.push("Discord.IChannel".to_string());
        visited(
            vec![
                implementing(
                    core_actor_symbol("IThread"),
                    &["Discord.IChannelActor", "Discord.IGuildActor.CanonicalRelationship"],
                ),
                named(core_actor_symbol("IChannel"), "Channel"),
                implementing(
                    core_actor_symbol("IGuild"),
                    &["Discord.IFooActor.CanonicalRelationship", "Discord.IBarActor.CanonicalRelationship"],
                ),
                core_actor_symbol("IFoo"),
                named(core_actor_symbol("IBar"), "Guild"),
                thread_entity,
                TypeSymbol::new("Discord.IChannel", TypeKind::Interface),
            ],
            ["IThread", "IChannel", "IGuild", "IFoo", "IBar"]
                .into_iter()
                .map(core_target)
                .collect(),
        )
    }

    fn visited(types: Vec<TypeSymbol>, targets: Vec<LinkTarget>) -> LinkGraph {
        let mut graph = LinkGraph::new(Compilation::new(types), Schematic::standard(), targets);
        graph.visit().unwrap();
        graph
    }

    #[test]
    fn test_attach_orders_children() {
        let graph = visited(vec![], vec![core_target("IFoo")]);
        let arena = graph.arena();
        let actor = graph.actor("Discord.IFooActor").unwrap();
        let kinds = arena
            .children(actor)
            .iter()
            .map(|c| arena.type_name(*c))
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec!["BackLink<TSource>", "Defined", "Enumerable", "Indexable", "Paged<TPaged, TPageParams>"]);
    }

    #[test]
    fn test_relationship_name_prefers_attribute() {
        let mut symbol = core_actor_symbol("IGuildChannel");
        symbol.attributes.push(AttributeData {
            class: MarkerAttribute::RelationshipName.metadata_name().to_string(),
            arguments: vec![TypedConstant::Primitive("Channel".to_string())],
            ..Default::default()
        });
        let graph = visited(vec![symbol], vec![core_target("IGuildChannel"), core_target("IGuild")]);
        let ctx = graph.context();

        let channel = graph.actor("Discord.IGuildChannelActor").unwrap();
        let guild = graph.actor("Discord.IGuildActor").unwrap();
        assert_eq!(ctx.actor_state(channel).unwrap().relationship_name, "Channel");
        assert_eq!(ctx.actor_state(guild).unwrap().relationship_name, "Guild");
    }

    #[test]
    fn test_core_actor_without_ancestors_keeps_link_minimal() {
        let graph = visited(vec![], vec![core_target("IFoo")]);
        let decl = graph.build_actor("Discord.IFooActor", BuildOptions::default()).unwrap().unwrap();

        let link = decl.find_type("Link").unwrap();
        assert_eq!(link.bases, vec![core_target("IFoo").link()]);
        assert!(link.methods().next().is_none());
        assert!(decl.find_type("__LinkBase").is_none());
        assert!(decl.find_type("Relationship").is_some());
        assert!(decl.find_type("CanonicalRelationship").is_some());
    }

    #[test]
    fn test_rest_actor_emits_link_base_and_redeclares_members() {
        let graph = visited(
            vec![rest_actor_symbol("IFoo", None)],
            vec![rest_target("IFoo")],
        );
        let decl = graph
            .build_actor("Discord.Rest.RestFooActor", BuildOptions::default())
            .unwrap()
            .unwrap();

        let link = decl.find_type("Link").unwrap();
        assert!(link.bases.contains(&"Discord.IFooActor.Link".to_string()));
        assert!(link.methods().any(|m| m.name == "GetActor" && m.explicit_interface.is_none()));

        let base = decl.find_type("__LinkBase").unwrap();
        assert_eq!(base.bases, vec!["Discord.Rest.RestFooActor.Link".to_string()]);
        assert!(base.modifiers.contains(Modifier::Abstract));
        assert!(base.properties().any(|p| p.name == "Client"));
        assert!(base.properties().any(|p| p.name == "EntityProvider"));
        assert!(decl.find_type("Relationship").is_none());
    }

    #[test]
    fn test_rest_link_base_chains_to_base_actor() {
        let graph = visited(
            vec![
                rest_actor_symbol("IChannel", None),
                rest_actor_symbol("ITextChannel", Some("Discord.Rest.RestChannelActor")),
            ],
            vec![rest_target("IChannel"), rest_target("ITextChannel")],
        );
        let decl = graph
            .build_actor("Discord.Rest.RestTextChannelActor", BuildOptions::default())
            .unwrap()
            .unwrap();

        let base = decl.find_type("__LinkBase").unwrap();
        assert_eq!(base.bases[0], "Discord.Rest.RestChannelActor.__LinkBase");
        assert!(base.modifiers.contains(Modifier::New));
        let provider = base.properties().find(|p| p.name == "ActorProvider").unwrap();
        assert!(provider.modifiers.contains(Modifier::Override));
    }

    #[test]
    fn test_tree_view_comment() {
        let graph = visited(vec![], vec![core_target("IFoo")]);
        let decl = graph
            .build_actor("Discord.IFooActor", BuildOptions { tree_view: true })
            .unwrap()
            .unwrap();
        assert_eq!(decl.leading_comments[0], "Actor: Discord.IFooActor");
        assert!(decl.leading_comments.iter().any(|l| l.contains("Indexable Link (Indexable)")));
    }

    #[test]
    fn test_additional_relationships_follow_related_actors() {
        let graph = related_graph();
        let ctx = graph.context();
        let id = |name: &str| graph.actor(&format!("Discord.{name}Actor")).unwrap();

        let thread = ctx.actor_state(id("IThread")).unwrap();
        assert_eq!(
            thread.additional_relationships,
            BTreeMap::from([
                ("Foo".to_string(), vec![id("IFoo")]),
                ("Guild".to_string(), vec![id("IGuild"), id("IBar")]),
            ])
        );
        assert_eq!(thread.relationship_name, "Channel");
        assert!(thread.canonical_relationship_redefined);

        let guild = ctx.actor_state(id("IGuild")).unwrap();
        assert!(guild.canonical_relationship_redefined);
        assert!(!ctx.actor_state(id("IFoo")).unwrap().canonical_relationship_redefined);
    }

    #[test]
    fn test_redefined_relationships_target_canonical_interface() {
        let graph = related_graph();
        let decl = graph
            .build_actor("Discord.IThreadActor", BuildOptions::default())
            .unwrap()
            .unwrap();
        let canonical = decl.find_type("CanonicalRelationship").unwrap();

        for related in ["IGuild", "IFoo", "IBar", "IChannel"] {
            assert!(canonical
                .bases
                .contains(&format!("Discord.{related}Actor.CanonicalRelationship")));
        }

        let explicit = |iface: &str| {
            canonical
                .properties()
                .find(|p| p.explicit_interface.as_deref() == Some(iface))
                .unwrap()
        };
        let guild = explicit("Discord.IGuildActor.CanonicalRelationship");
        assert_eq!(guild.name, "Guild");
        assert_eq!(guild.body, PropertyBody::Expression("Channel.Guild".to_string()));
        assert_eq!(explicit("Discord.IBarActor.Relationship").name, "Guild");
        assert_eq!(explicit("Discord.IFooActor.Relationship").name, "Foo");

        // The inherited name is redeclared and routed to the ancestor's relationship.
        assert!(canonical
            .properties()
            .any(|p| p.name == "Channel" && p.explicit_interface.is_none() && p.modifiers.contains(Modifier::New)));
        assert_eq!(explicit("Discord.IChannelActor.Relationship").name, "Channel");
        assert!(canonical.modifiers.contains(Modifier::New));
    }

    #[test]
    fn test_relationship_is_new_only_with_entity_ancestors() {
        // IFooActor extends IBarActor, but their entities are unrelated.
        let graph = visited(
            vec![
                implementing(core_actor_symbol("IFoo"), &["Discord.IBarActor"]),
                core_actor_symbol("IBar"),
            ],
            vec![core_target("IFoo"), core_target("IBar")],
        );
        let decl = graph
            .build_actor("Discord.IFooActor", BuildOptions::default())
            .unwrap()
            .unwrap();

        let relationship = decl.find_type("Relationship").unwrap();
        let canonical = decl.find_type("CanonicalRelationship").unwrap();
        assert!(!relationship.modifiers.contains(Modifier::New));
        assert!(!canonical.modifiers.contains(Modifier::New));
        assert!(!canonical.bases.contains(&"Discord.IBarActor.CanonicalRelationship".to_string()));
    }

    fn provider_of(decl: &TypeDecl) -> Option<&MethodDecl> {
        decl.methods().find(|m| m.name == "GetProvider")
    }

    fn expression(method: &MethodDecl) -> &str {
        match &method.body {
            Body::Expression(expression) => expression,
            other => panic!("expected an expression body, got {other:?}"),
        }
    }

    fn parameter_names(method: &MethodDecl) -> Vec<&str> {
        method.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_root_provider_for_identity_constructor() {
        let target = rest_target("IFoo");
        let mut symbol = rest_actor_symbol("IFoo", None);
        symbol.constructors = vec![
            // Only one identity parameter: skipped.
            constructor(vec![param("Discord.Rest.DiscordRestClient", "client")]),
            constructor(vec![
                ParameterSymbol {
                    default: Some("null".to_string()),
                    ..param("string", "label")
                },
                param("Discord.Rest.DiscordRestClient", "client"),
                param(target.identifiable(), "foo"),
            ]),
        ];
        let graph = visited(vec![symbol], vec![target.clone()]);
        let decl = graph
            .build_actor("Discord.Rest.RestFooActor", BuildOptions::default())
            .unwrap()
            .unwrap();

        assert_eq!(decl.methods().filter(|m| m.name == "GetProvider").count(), 1);
        let provider = provider_of(&decl).unwrap();
        assert_eq!(parameter_names(provider), vec!["client", "label"]);
        assert_eq!(
            expression(provider),
            format!(
                "RestActorProvider.CreateRoot<Discord.Rest.RestFooActor, ulong>(client, (client, id) => \
                 new Discord.Rest.RestFooActor(label, client, {}.Of(id)))",
                target.identifiable()
            )
        );
        assert!(decl.members.iter().any(|m| matches!(
            m,
            Member::Field(field) if field.name == "DefaultActorProvider"
                && field.type_name == format!("Func<Discord.Rest.DiscordRestClient, string, {}>", target.actor_provider())
        )));
    }

    #[test]
    fn test_constructor_without_identity_pair_has_no_provider() {
        let mut symbol = rest_actor_symbol("IFoo", None);
        symbol.constructors = vec![constructor(vec![
            param("Discord.Rest.DiscordRestClient", "client"),
            param("string", "name"),
        ])];
        let graph = visited(vec![symbol], vec![rest_target("IFoo")]);
        let decl = graph
            .build_actor("Discord.Rest.RestFooActor", BuildOptions::default())
            .unwrap()
            .unwrap();
        assert!(provider_of(&decl).is_none());
    }

    fn related_rest_graph(parameters: Vec<ParameterSymbol>) -> LinkGraph {
        let mut thread = rest_actor_symbol("IThread", None);
        thread.constructors = vec![constructor(parameters)];
        visited(
            vec![
                thread,
                implementing(core_actor_symbol("IThread"), &["Discord.IGuildActor.CanonicalRelationship"]),
            ],
            vec![rest_target("IThread"), rest_target("IGuild")],
        )
    }

    #[test]
    fn test_relationship_parameter_becomes_cache_key() {
        let thread = rest_target("IThread");
        let guild = rest_target("IGuild");
        let graph = related_rest_graph(vec![
            param("Discord.Rest.DiscordRestClient", "client"),
            param(guild.identifiable(), "guild"),
            param(thread.identifiable(), "thread"),
        ]);
        let decl = graph
            .build_actor("Discord.Rest.RestThreadActor", BuildOptions::default())
            .unwrap()
            .unwrap();

        let provider = provider_of(&decl).unwrap();
        assert_eq!(parameter_names(provider), vec!["client", "guild"]);
        assert!(expression(provider).starts_with(
            "RestActorProvider.CreateStateful<Discord.Rest.RestThreadActor, ulong>(client, HashCode.Combine(guild.Id), "
        ));
    }

    #[test]
    fn test_missing_relationship_is_appended_as_parameter() {
        let thread = rest_target("IThread");
        let guild = rest_target("IGuild");
        let graph = related_rest_graph(vec![
            param("Discord.Rest.DiscordRestClient", "client"),
            param(thread.identifiable(), "thread"),
        ]);
        let decl = graph
            .build_actor("Discord.Rest.RestThreadActor", BuildOptions::default())
            .unwrap()
            .unwrap();

        let provider = provider_of(&decl).unwrap();
        assert_eq!(parameter_names(provider), vec!["client", "guild"]);
        assert_eq!(provider.parameters[1].type_name, guild.identifiable());
        assert!(expression(provider).contains("HashCode.Combine(guild.Id)"));
        assert!(expression(provider).ends_with(&format!(
            "new Discord.Rest.RestThreadActor(client, {}.Of(id), guild))",
            thread.identifiable()
        )));
    }
}
