//! `BackLink<TSource>` nodes: a link that remembers the entity it was reached from.
//!
//! Every actor, link type, extension and hierarchy carries one. A back link directly under a
//! non-core actor is emitted as a concrete class; everywhere else it is an interface, with a
//! sealed implementation class when the assembly generates implementations.

use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    error::LinkGenError,
    graph::NodeContext,
    nodes::{
        self, extension, hierarchy,
        implementation::{ImplProperty, Implementation},
        NodeCategory, NodeId, NodeKind,
    },
    syntax::{Accessibility, MethodDecl, Modifier, PropertyDecl, TypeDecl},
};

const SOURCE_CONSTRAINT: &str = "where TSource : class, IPathable";

#[derive(Debug, Clone, PartialEq)]
pub struct BackLinkState {
    /// Emitted as a class rather than an interface.
    pub is_class: bool,
    /// `TSource` is declared `out`.
    pub is_covariant: bool,
    pub implementation: Implementation,
}

fn parent_of(ctx: &NodeContext, id: NodeId) -> Result<NodeId, LinkGenError> {
    ctx.arena()
        .parent(id)
        .ok_or_else(|| LinkGenError::Emit(format!("back link {id} has no parent")))
}

pub fn visit(ctx: &NodeContext, id: NodeId) -> Result<BackLinkState, LinkGenError> {
    let arena = ctx.arena();
    let target = ctx.target(id);
    let parent = parent_of(ctx, id)?;

    let is_class = !target.is_core() && arena.kind(parent).is_actor();
    let is_covariant = target.is_core()
        || ctx
            .extension_state(parent)
            .map_or(true, |state| !state.properties.iter().any(|p| p.is_back_link_mirror));

    let implementation = if arena.will_generate_implementation(id) {
        let class_name = if is_class {
            "BackLink".to_string()
        } else {
            arena.implementation_class_name(id)
        };
        Implementation::new(
            &class_name,
            vec![ImplProperty::new("Source", "TSource")],
            ctx.parent_constructor(id),
        )
    } else {
        Implementation::default()
    };

    Ok(BackLinkState {
        is_class,
        is_covariant,
        implementation,
    })
}

/// Back links `id` derives from: its own composition's back links and those of its parent's.
pub fn inherited_back_links(ctx: &NodeContext, id: NodeId) -> BTreeSet<NodeId> {
    let arena = ctx.arena();
    let mut inherited = BTreeSet::new();

    if let Some(state) = ctx.state(id) {
        inherited.extend(
            state
                .composition
                .iter()
                .copied()
                .filter(|n| arena.kind(*n).is_back_link()),
        );
    }

    let parent_composition = arena
        .parent(id)
        .and_then(|parent| ctx.state(parent))
        .map(|state| &state.composition);
    for node in parent_composition.into_iter().flatten() {
        inherited.extend(arena.child_of(*node, NodeCategory::BackLink));
    }

    inherited.remove(&id);
    inherited
}

/// Whether the back link redeclares `Source`.
pub fn redefines_source(ctx: &NodeContext, id: NodeId) -> bool {
    let mut visited = BTreeSet::new();
    redefines_source_inner(ctx, id, &mut visited)
}

fn redefines_source_inner(ctx: &NodeContext, id: NodeId, visited: &mut BTreeSet<NodeId>) -> bool {
    if !visited.insert(id) {
        return false;
    }
    if !ctx.is_core(id) {
        return true;
    }
    let arena = ctx.arena();
    let has_ancestor = ctx.state(id).is_some_and(|state| {
        state
            .ancestors
            .iter()
            .any(|a| arena.node_with_equivalent_pathing(id, *a).is_some())
    });
    has_ancestor
        || inherited_back_links(ctx, id)
            .into_iter()
            .any(|other| redefines_source_inner(ctx, other, visited))
}

/// Properties of the parent extension or hierarchy, redeclared with back-link types.
fn redeclared_members(ctx: &NodeContext, id: NodeId, parent: NodeId, decl: &mut TypeDecl) {
    let arena = ctx.arena();
    let parent_path = arena.format_as_type_path(parent);

    match arena.kind(parent) {
        NodeKind::Extension { .. } => {
            let Some(state) = ctx.extension_state(parent) else {
                return;
            };
            let template = extension::is_template(arena, parent);
            for prop in state.properties.iter().filter(|p| p.is_valid && !p.is_overload()) {
                if prop.is_back_link_mirror {
                    decl.add_member(PropertyDecl::get(
                        prop.property_type(ctx, parent, true, false),
                        prop.name(),
                    ));
                    continue;
                }
                if !prop.is_defined_on_path(template) || prop.target.is_none() {
                    continue;
                }
                decl.add_member(
                    PropertyDecl::get(prop.property_type(ctx, parent, true, false), prop.name())
                        .with_modifiers(Modifier::New),
                );
                decl.add_member(PropertyDecl::explicit(
                    prop.property_type(ctx, parent, false, false),
                    &parent_path,
                    prop.name(),
                    prop.name(),
                ));
            }
        }
        NodeKind::Hierarchy { .. } => {
            let Some(state) = ctx.hierarchy_state(parent) else {
                return;
            };
            let template = hierarchy::is_template(arena, parent);
            for member in &state.members {
                let name = hierarchy::member_name(ctx, parent, *member);
                let member_target = ctx.target(*member);
                let back_link_type = if template {
                    member_target.back_link_type()
                } else {
                    format!("{}{}.BackLink<TSource>", member_target.actor, arena.relative_type_path(parent))
                };
                decl.add_member(PropertyDecl::get(back_link_type, &name).with_modifiers(Modifier::New));
                decl.add_member(PropertyDecl::explicit(
                    hierarchy::member_type(ctx, parent, *member, false),
                    &parent_path,
                    &name,
                    &name,
                ));
            }
        }
        _ => {}
    }

    trace!(node = %id, parent = %parent, "redeclared parent members");
}

fn build_class(ctx: &NodeContext, id: NodeId, state: &BackLinkState) -> TypeDecl {
    let target = ctx.target(id);
    let core_back_link = format!("{}.BackLink<TSource>", target.core_actor());

    let mut class = TypeDecl::class("BackLink<TSource>");
    class.add_base(ctx.arena().type_path(id));
    class.add_base(target.back_link_type());
    class.add_base(&core_back_link);
    class.add_constraint(SOURCE_CONSTRAINT);

    class.add_member(PropertyDecl::get("TSource", "Source").with_accessibility(Accessibility::Internal));
    class.add_member(PropertyDecl::explicit("TSource", target.back_link_type(), "Source", "Source"));
    class.add_member(PropertyDecl::explicit("TSource", &core_back_link, "Source", "Source"));

    if let Some(ctor) = &state.implementation.constructor {
        let mut decl = ctor.to_decl();
        decl.accessibility = Accessibility::Internal;
        class.add_member(decl);
    }

    class.add_member(
        MethodDecl::new(&target.actor, "GetActor")
            .implementing(target.back_link_type())
            .returning("this"),
    );
    class
}

fn build_implementation(
    ctx: &NodeContext,
    id: NodeId,
    state: &BackLinkState,
    additional: &mut Vec<TypeDecl>,
) -> Option<MethodDecl> {
    let arena = ctx.arena();
    let target = ctx.target(id);
    arena.root_actor(id)?;

    let impl_name = arena.implementation_class_name(id);
    let impl_type = arena.with_path_generics(id, &impl_name);
    let (_, constraints) = arena.path_generics(id);
    let path = arena.format_as_type_path(id);

    let mut class = TypeDecl::class(&impl_type)
        .with_accessibility(Accessibility::Private)
        .with_modifiers(Modifier::Sealed);
    class.add_base(&path);
    if let Some(parent) = arena.parents(id).find(|p| arena.will_generate_implementation(*p)) {
        let parent_impl = arena.with_path_generics(parent, &arena.implementation_class_name(parent));
        class.insert_base(0, format!("{}.{parent_impl}", target.actor));
    }
    for clause in constraints {
        class.add_constraint(clause);
    }

    class.extend_members(state.implementation.properties.iter().map(ImplProperty::to_decl));
    class.add_member(PropertyDecl::explicit("TSource", &path, "Source", "Source"));
    if let Some(ctor) = &state.implementation.constructor {
        class.add_member(ctor.to_decl());
    }
    additional.push(class);

    Some(
        MethodDecl::new(&path, "Create")
            .with_accessibility(Accessibility::Internal)
            .with_modifiers(Modifier::Static)
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
        .back_link_state(id)
        .ok_or_else(|| LinkGenError::Emit(format!("{id} is not a back link")))?;
    let parent = parent_of(ctx, id)?;

    if state.is_class {
        return Ok(Some(build_class(ctx, id, state)));
    }

    let name = if state.is_covariant {
        "BackLink<out TSource>"
    } else {
        "BackLink<TSource>"
    };
    let mut decl = TypeDecl::interface(name);
    decl.add_constraint(SOURCE_CONSTRAINT);

    let mut bases = BTreeSet::new();
    bases.insert(arena.type_path(id));
    if arena.kind(parent).is_actor() {
        bases.insert(target.back_link_type());
    }
    if !target.is_core() {
        bases.insert(format!(
            "{}{}.BackLink<TSource>",
            target.core_actor(),
            arena.relative_type_path(id)
        ));
    }

    let inherited = inherited_back_links(ctx, id);
    for other in &inherited {
        bases.insert(arena.format_as_type_path(*other));
    }

    let equivalents = visit
        .ancestors
        .iter()
        .filter_map(|a| arena.node_with_equivalent_pathing(id, *a))
        .collect::<Vec<_>>();
    for equivalent in &equivalents {
        bases.insert(arena.format_as_type_path(*equivalent));
    }
    decl.set_new(!equivalents.is_empty());

    if redefines_source(ctx, id) {
        decl.add_member(PropertyDecl::get("TSource", "Source").with_modifiers(Modifier::New));
        let overridden = inherited
            .iter()
            .chain(&equivalents)
            .map(|n| arena.format_as_type_path(*n))
            .chain(arena.kind(parent).is_actor().then(|| target.back_link_type()))
            .collect::<BTreeSet<_>>();
        for iface in overridden {
            decl.add_member(PropertyDecl::explicit("TSource", iface, "Source", "Source"));
        }
    }

    redeclared_members(ctx, id, parent, &mut decl);

    for base in bases {
        decl.add_base(base);
    }

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
