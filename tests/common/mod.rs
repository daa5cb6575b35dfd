//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use linkgen_core::{
    graph::LinkGraph,
    schematic::Schematic,
    symbols::{AttributeData, Compilation, MarkerAttribute, PropertySymbol, TypeKind, TypeSymbol, TypedConstant},
    target::{Assembly, LinkTarget},
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// `IGuild` -> `Discord.IGuildActor` in the Core assembly.
#[allow(dead_code)]
pub fn core_target(name: &str) -> LinkTarget {
    LinkTarget::new(
        format!("Discord.{name}Actor"),
        format!("Discord.{name}"),
        "ulong",
        format!("Discord.Models.{name}Model"),
        Assembly::Core,
    )
}

/// `IGuild` -> `Discord.Rest.RestGuildActor`, backed by the Core `IGuildActor`.
#[allow(dead_code)]
pub fn rest_target(name: &str) -> LinkTarget {
    let bare = name.strip_prefix('I').unwrap_or(name);
    LinkTarget::new(
        format!("Discord.Rest.Rest{bare}Actor"),
        format!("Discord.Rest.Rest{bare}"),
        "ulong",
        format!("Discord.Models.{name}Model"),
        Assembly::Rest,
    )
    .with_core(format!("Discord.{name}Actor"), format!("Discord.{name}"))
}

#[allow(dead_code)]
pub fn interface(name: &str, supertypes: &[&str]) -> TypeSymbol {
    let mut symbol = TypeSymbol::new(name, TypeKind::Interface);
    symbol.interfaces = supertypes.iter().map(|s| s.to_string()).collect();
    symbol
}

#[allow(dead_code)]
pub fn marker(marker: MarkerAttribute) -> AttributeData {
    AttributeData {
        class: marker.metadata_name().to_string(),
        ..Default::default()
    }
}

/// `[LinkMirror] {type} {name} { get; }`
#[allow(dead_code)]
pub fn mirror(name: &str, type_name: &str) -> PropertySymbol {
    PropertySymbol {
        attributes: vec![marker(MarkerAttribute::LinkMirror)],
        ..PropertySymbol::new(name, type_name)
    }
}

/// A Core slice of the Discord actor model:
///
/// - `IGuildActor` with a `ChannelsExtension` mirroring `IChannelActor`
/// - `IChannelActor`, a hierarchical root
/// - `IGuildChannelActor` and `IThreadChannelActor`, both specializing `IChannelActor`
#[allow(dead_code)]
pub fn discord_types() -> Vec<TypeSymbol> {
    let mut guild = interface("Discord.IGuildActor", &[]);
    guild.attributes.push(AttributeData {
        arguments: vec![TypedConstant::Primitive("Guild".to_string())],
        ..marker(MarkerAttribute::RelationshipName)
    });

    let mut extension = interface("Discord.IGuildActor.ChannelsExtension", &[]);
    extension.containing_type = Some("Discord.IGuildActor".to_string());
    extension.attributes.push(marker(MarkerAttribute::LinkExtension));
    extension.properties.push(mirror("Channels", "Discord.IChannelActor"));

    let mut channel = interface("Discord.IChannelActor", &[]);
    channel.attributes.push(marker(MarkerAttribute::LinkHierarchicalRoot));

    vec![
        guild,
        extension,
        channel,
        interface("Discord.IGuildChannelActor", &["Discord.IChannelActor"]),
        interface("Discord.IThreadChannelActor", &["Discord.IGuildChannelActor"]),
        interface("Discord.IChannel", &[]),
        interface("Discord.IGuildChannel", &["Discord.IChannel"]),
        interface("Discord.IThreadChannel", &["Discord.IGuildChannel"]),
    ]
}

#[allow(dead_code)]
pub fn discord_targets() -> Vec<LinkTarget> {
    ["IGuild", "IChannel", "IGuildChannel", "IThreadChannel"]
        .into_iter()
        .map(core_target)
        .collect()
}

/// The Discord slice, visited against the standard schematic.
#[allow(dead_code)]
pub fn discord_graph() -> LinkGraph {
    let mut graph = LinkGraph::new(
        Compilation::new(discord_types()),
        Schematic::standard(),
        discord_targets(),
    );
    graph.visit().unwrap();
    graph
}
