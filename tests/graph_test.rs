//! End-to-end behavior of the visit and build stages.

mod common;

use common::{core_target, discord_graph, interface, marker, rest_target};
use linkgen_core::{
    error::LinkGenError,
    graph::{BuildOptions, LinkGraph},
    nodes::NodeCategory,
    schematic::{Schematic, SchematicEntry},
    symbols::{Compilation, MarkerAttribute, PropertySymbol, TypeKind, TypeSymbol, TypedConstant},
    syntax::{Member, TypeDecl},
    target::{Assembly, LinkTarget},
};

fn empty_schematic() -> Schematic {
    Schematic::new(SchematicEntry::new("Discord.ILinkType"))
}

fn foo_target(assembly: Assembly) -> LinkTarget {
    LinkTarget::new("Discord.IFooActor", "Discord.IFooEntity", "ulong", "Discord.IFooModel", assembly)
}

fn method_names(decl: &TypeDecl) -> Vec<String> {
    decl.methods().map(|m| m.name.clone()).collect()
}

#[test_log::test]
fn test_lone_core_actor_has_minimal_link() {
    let mut graph = LinkGraph::new(
        Compilation::new([interface("Discord.IFooActor", &[])]),
        empty_schematic(),
        [foo_target(Assembly::Core)],
    );
    graph.visit().unwrap();

    let decl = graph
        .build_actor("Discord.IFooActor", BuildOptions::default())
        .unwrap()
        .unwrap();

    let link = decl.find_type("Link").unwrap();
    assert!(!method_names(link).iter().any(|m| m == "GetActor" || m == "CreateEntity"));
    assert_eq!(link.bases.len(), 1);

    let relationship = decl.find_type("Relationship").unwrap();
    assert_eq!(relationship.properties().count(), 2);
    let canonical = decl.find_type("CanonicalRelationship").unwrap();
    assert!(canonical.members.is_empty());

    assert!(decl.find_type("Indexable").is_none());
    assert!(decl.find_type("BackLink").is_some());
}

#[test_log::test]
fn test_rest_link_base_chains_to_base_actor() {
    let mut foo = TypeSymbol::new("Discord.Rest.RestFooActor", TypeKind::Class);
    foo.base_type = Some("Discord.Rest.RestBarActor".to_string());
    let bar = TypeSymbol::new("Discord.Rest.RestBarActor", TypeKind::Class);
    let foo_entity = interface("Discord.Rest.RestFoo", &["Discord.Rest.RestBar"]);
    let bar_entity = interface("Discord.Rest.RestBar", &[]);

    let mut graph = LinkGraph::new(
        Compilation::new([foo, bar, foo_entity, bar_entity]),
        empty_schematic(),
        [rest_target("IFoo"), rest_target("IBar")],
    );
    graph.visit().unwrap();

    let decl = graph
        .build_actor("Discord.Rest.RestFooActor", BuildOptions::default())
        .unwrap()
        .unwrap();
    let link_base = decl.find_type("__LinkBase").unwrap();
    assert_eq!(link_base.bases[0], "Discord.Rest.RestBarActor.__LinkBase");
    assert!(link_base.bases.contains(&"Discord.Rest.RestFooActor.Link".to_string()));
}

#[test_log::test]
fn test_unresolvable_extension_property_renders_invalid_comment() {
    let mut extension = interface("Discord.IFooActor.GhostsExtension", &[]);
    extension.containing_type = Some("Discord.IFooActor".to_string());
    extension.attributes.push(marker(MarkerAttribute::LinkExtension));
    extension.properties.push(PropertySymbol {
        type_kind: TypeKind::Unknown,
        ..PropertySymbol::new("Ghost", "Discord.IGhostActor")
    });

    let mut graph = LinkGraph::new(
        Compilation::new([interface("Discord.IFooActor", &[]), extension]),
        empty_schematic(),
        [foo_target(Assembly::Core)],
    );
    graph.visit().unwrap();

    let decl = graph
        .build_actor("Discord.IFooActor", BuildOptions::default())
        .unwrap()
        .unwrap();
    let ghosts = decl.find_type("Ghosts").unwrap();
    assert!(ghosts
        .members
        .iter()
        .any(|m| matches!(m, Member::Comment(text) if text == "Ghost is invalid")));
    assert!(decl.render(4).unwrap().contains("// Ghost is invalid"));
}

#[test_log::test]
fn test_composition_is_exclusive_of_parent() {
    let graph = discord_graph();
    let arena = graph.arena();

    for id in arena.ids() {
        let Some(parent) = arena.parent(id) else {
            continue;
        };
        let state = graph.state(id).unwrap();
        let parent_state = graph.state(parent).unwrap();
        assert!(
            state.composition.is_disjoint(&parent_state.implicit_composition),
            "{} overlaps its parent",
            arena.describe(id)
        );
    }
}

#[test_log::test]
fn test_semantically_equal_nodes_share_type_names() {
    let graph = discord_graph();
    let arena = graph.arena();
    let ids = arena.ids().collect::<Vec<_>>();

    for a in &ids {
        for b in &ids {
            if arena.semantic_eq(*a, *b) {
                assert_eq!(arena.kind(*a).category(), arena.kind(*b).category());
                assert_eq!(arena.type_name(*a), arena.type_name(*b));
            }
        }
    }
}

#[test_log::test]
fn test_composition_search_is_idempotent() {
    let graph = discord_graph();
    let arena = graph.arena();
    for id in arena.ids() {
        let first = arena.semantic_composition(id, true, None);
        let second = arena.semantic_composition(id, true, None);
        assert_eq!(first, second);
    }
}

#[test_log::test]
fn test_relative_path_is_never_a_bare_dot() {
    let graph = discord_graph();
    let arena = graph.arena();
    for actor in graph.actors().values() {
        for child in arena.children(*actor) {
            assert_eq!(arena.relative_type_path(*child), "");
        }
    }
    for id in arena.ids() {
        assert_ne!(arena.relative_type_path(id), ".");
    }
}

#[test_log::test]
fn test_hierarchy_lists_specializations() {
    let graph = discord_graph();
    let decl = graph
        .build_actor("Discord.IChannelActor", BuildOptions::default())
        .unwrap()
        .unwrap();

    let hierarchy = decl.find_type("Hierarchy").unwrap();
    let names = hierarchy.properties().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Guild", "Thread"]);
    assert!(hierarchy.bases.contains(&"Discord.IChannelActor.Link".to_string()));
}

#[test_log::test]
fn test_extension_is_exposed_under_link_types() {
    let graph = discord_graph();
    let arena = graph.arena();
    let guild = graph.actor("Discord.IGuildActor").unwrap();

    let extension_parents = arena
        .descendants(guild)
        .into_iter()
        .filter(|id| arena.kind(*id).category() == NodeCategory::Extension)
        .filter_map(|id| arena.parent(id))
        .filter(|p| arena.kind(*p).is_link_type())
        .count();
    assert!(extension_parents > 0);

    let decl = graph
        .build_actor("Discord.IGuildActor", BuildOptions::default())
        .unwrap()
        .unwrap();
    let channels = decl.find_type("Channels").unwrap();
    let prop = channels.properties().find(|p| p.name == "Channels").unwrap();
    assert_eq!(prop.type_name, core_target("IChannel").link());
}

#[test_log::test]
fn test_parallel_build_is_deterministic() {
    let graph = discord_graph();
    let first = graph.build(BuildOptions { tree_view: true }).unwrap();
    let second = graph.build(BuildOptions { tree_view: true }).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), graph.actors().len());
}

#[test_log::test]
fn test_build_before_visit_is_an_error() {
    let graph = LinkGraph::new(
        Compilation::new([interface("Discord.IFooActor", &[])]),
        Schematic::standard(),
        [foo_target(Assembly::Core)],
    );
    assert!(matches!(graph.build(BuildOptions::default()), Err(LinkGenError::Emit(_))));
}

#[test_log::test]
fn test_malformed_hierarchy_types_abort_the_pass() {
    let mut root = interface("Discord.IFooActor", &[]);
    let mut attribute = marker(MarkerAttribute::LinkHierarchicalRoot);
    attribute
        .named
        .insert("Types".to_string(), TypedConstant::Bool(true));
    root.attributes.push(attribute);

    let mut graph = LinkGraph::new(Compilation::new([root]), Schematic::standard(), [foo_target(Assembly::Core)]);
    let err = graph.visit().unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, LinkGenError::Schema { .. }));
}
