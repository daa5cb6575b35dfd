//! Shared fixtures for link graph tests

use std::sync::Arc;

use crate::{
    nodes::{NodeArena, NodeId, NodeKind},
    schematic::{LinkTypeKind, SchematicEntry},
    symbols::{AttributeData, MarkerAttribute, PropertySymbol, TypeKind, TypeSymbol},
    target::{Assembly, LinkTarget},
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

fn bare(name: &str) -> &str {
    name.strip_prefix('I').unwrap_or(name)
}

/// `IFoo` -> the core target of `Discord.IFooActor`.
pub fn core_target(name: &str) -> LinkTarget {
    LinkTarget::new(
        format!("Discord.{name}Actor"),
        format!("Discord.{name}"),
        "ulong",
        format!("Discord.Models.{name}Model"),
        Assembly::Core,
    )
}

/// `IFoo` -> the Rest target of `Discord.Rest.RestFooActor`, backed by `Discord.IFooActor`.
pub fn rest_target(name: &str) -> LinkTarget {
    let bare = bare(name);
    LinkTarget::new(
        format!("Discord.Rest.Rest{bare}Actor"),
        format!("Discord.Rest.Rest{bare}"),
        "ulong",
        format!("Discord.Models.{name}Model"),
        Assembly::Rest,
    )
    .with_core(format!("Discord.{name}Actor"), format!("Discord.{name}"))
}

pub fn core_actor_symbol(name: &str) -> TypeSymbol {
    TypeSymbol::new(format!("Discord.{name}Actor"), TypeKind::Interface)
}

pub fn rest_actor_symbol(name: &str, base: Option<&str>) -> TypeSymbol {
    let mut symbol = TypeSymbol::new(format!("Discord.Rest.Rest{}Actor", bare(name)), TypeKind::Class);
    symbol.base_type = base.map(str::to_string);
    symbol.interfaces.push(format!("Discord.{name}Actor"));
    symbol
}

/// `[LinkExtension] interface {name}Extension` nested in the core actor of `actor`.
pub fn extension_symbol(actor: &str, name: &str, properties: Vec<PropertySymbol>) -> TypeSymbol {
    let container = format!("Discord.{actor}Actor");
    let mut symbol = TypeSymbol::new(format!("{container}.{name}Extension"), TypeKind::Interface);
    symbol.containing_type = Some(container);
    symbol.attributes.push(AttributeData {
        class: MarkerAttribute::LinkExtension.metadata_name().to_string(),
        ..Default::default()
    });
    symbol.properties = properties;
    symbol
}

pub struct SampleIds {
    pub actor: NodeId,
    pub actor_backlink: NodeId,
    pub indexable: NodeId,
    pub indexable_backlink: NodeId,
    pub enumerable: NodeId,
    pub enumerable_backlink: NodeId,
    pub enumerable_indexable: NodeId,
    pub enumerable_indexable_backlink: NodeId,
    pub paged: NodeId,
    pub paged_backlink: NodeId,
}

/// A hand-built actor tree with back links at every level:
///
/// ```text
/// actor
/// - BackLink
/// - Indexable (BackLink)
/// - Enumerable (BackLink, Indexable (BackLink))
/// - Paged<TPaged, TPageParams> (BackLink, Indexable)
/// ```
pub fn sample_tree(target: LinkTarget) -> (NodeArena, SampleIds) {
    let target = Arc::new(target);
    let mut arena = NodeArena::new();
    let symbol_kind = if target.is_core() {
        TypeKind::Interface
    } else {
        TypeKind::Class
    };

    let actor = arena.alloc(
        None,
        target.clone(),
        NodeKind::Actor {
            symbol: TypeSymbol::new(target.actor.clone(), symbol_kind),
        },
    );
    let link = |arena: &mut NodeArena, parent: NodeId, kind: LinkTypeKind, entry: SchematicEntry| {
        arena.alloc(Some(parent), target.clone(), NodeKind::LinkType { kind, entry })
    };
    let indexable_entry = || SchematicEntry::new("Discord.ILinkType.Indexable");

    let actor_backlink = arena.alloc(Some(actor), target.clone(), NodeKind::BackLink);

    let indexable = link(&mut arena, actor, LinkTypeKind::Indexable, indexable_entry());
    let indexable_backlink = arena.alloc(Some(indexable), target.clone(), NodeKind::BackLink);

    let enumerable = link(
        &mut arena,
        actor,
        LinkTypeKind::Enumerable,
        SchematicEntry::new("Discord.ILinkType.Enumerable"),
    );
    let enumerable_backlink = arena.alloc(Some(enumerable), target.clone(), NodeKind::BackLink);
    let enumerable_indexable = link(&mut arena, enumerable, LinkTypeKind::Indexable, indexable_entry());
    let enumerable_indexable_backlink =
        arena.alloc(Some(enumerable_indexable), target.clone(), NodeKind::BackLink);

    let paged = link(
        &mut arena,
        actor,
        LinkTypeKind::Paged,
        SchematicEntry::new("Discord.ILinkType.Paged")
            .with_type_parameters(&["TPaged", "TPageParams"], &["where TPageParams : IPagingParams"]),
    );
    let paged_backlink = arena.alloc(Some(paged), target.clone(), NodeKind::BackLink);
    link(&mut arena, paged, LinkTypeKind::Indexable, indexable_entry());

    (
        arena,
        SampleIds {
            actor,
            actor_backlink,
            indexable,
            indexable_backlink,
            enumerable,
            enumerable_backlink,
            enumerable_indexable,
            enumerable_indexable_backlink,
            paged,
            paged_backlink,
        },
    )
}
