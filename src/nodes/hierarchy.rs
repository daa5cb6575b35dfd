//! Hierarchy nodes, declared by `[LinkHierarchicalRoot]` on a core actor.
//!
//! A hierarchy exposes one property per member actor (the actors that specialize the root, or the
//! ones listed in the attribute's `Types` argument), named after what distinguishes the member from
//! its owner: `IChannelActor`'s hierarchy calls `IGuildChannelActor` `Guild`.
//!
//! When the core entity has an enum property marked `[TypeHeuristic]` whose fields carry
//! `[TypeHeuristic<TEntity>]`, an `OfType(delimiter)` method dispatches the enum value to the
//! matching member.

use std::{collections::BTreeSet, sync::Arc};

use tracing::{debug, warn};

use crate::{
    error::LinkGenError,
    graph::NodeContext,
    nodes::{
        self, extension,
        implementation::{ImplProperty, Implementation},
        NodeArena, NodeCategory, NodeId, NodeKind,
    },
    symbols::{Compilation, MarkerAttribute, TypeKind, TypedConstant},
    syntax::{Accessibility, MethodDecl, Modifier, Parameter, PropertyDecl, TypeDecl},
    target::{friendly_name, name_parts, LinkTarget},
};

/// One `OfType` dispatch: an enum-typed entity property and the member each field selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    pub enum_type: String,
    /// `(qualified enum field, member actor)`
    pub cases: Vec<(String, NodeId)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyState {
    pub members: Vec<NodeId>,
    pub delimiters: Vec<Delimiter>,
    pub implementation: Implementation,
}

pub fn add_to(arena: &mut NodeArena, compilation: &Compilation, target: &Arc<LinkTarget>, parent: NodeId) {
    let Some(attribute) = compilation
        .get_type_by_metadata_name(target.core_actor())
        .and_then(|symbol| symbol.attribute(MarkerAttribute::LinkHierarchicalRoot))
    else {
        return;
    };

    let id = arena.alloc(
        Some(parent),
        target.clone(),
        NodeKind::Hierarchy {
            attribute: attribute.clone(),
        },
    );
    arena.alloc(Some(id), target.clone(), NodeKind::BackLink);
    extension::add_to(arena, compilation, target, id);
}

pub fn is_template(arena: &NodeArena, id: NodeId) -> bool {
    arena.parent(id).is_some_and(|p| arena.kind(p).is_actor())
}

/// The member's friendly-name words that its owner does not share, or all of them.
pub fn member_name(ctx: &NodeContext, owner: NodeId, member: NodeId) -> String {
    let owner_parts = name_parts(&friendly_name(ctx.target(owner).core_actor(), TypeKind::Interface));
    let member_parts = name_parts(&friendly_name(ctx.target(member).core_actor(), TypeKind::Interface));

    let remaining = member_parts
        .iter()
        .filter(|part| !owner_parts.contains(part))
        .cloned()
        .collect::<String>();
    if remaining.is_empty() {
        member_parts.concat()
    } else {
        remaining
    }
}

/// The member's type on a hierarchy at `owner`.
pub fn member_type(ctx: &NodeContext, owner: NodeId, member: NodeId, use_core: bool) -> String {
    let arena = ctx.arena();
    let target = ctx.target(member);
    if is_template(arena, owner) {
        if use_core {
            target.core_link()
        } else {
            target.link()
        }
    } else {
        let actor = if use_core {
            target.core_actor()
        } else {
            target.actor.as_str()
        };
        format!("{actor}{}", arena.relative_type_path(owner))
    }
}

fn member_by_core(ctx: &NodeContext, target: &LinkTarget, core_actor: &str) -> Option<NodeId> {
    ctx.graph()
        .actors()
        .values()
        .copied()
        .find(|id| {
            let candidate = ctx.target(*id);
            candidate.core_actor() == core_actor && candidate.assembly == target.assembly
        })
}

fn resolve_members(ctx: &NodeContext, id: NodeId) -> Result<Vec<NodeId>, LinkGenError> {
    let NodeKind::Hierarchy { attribute } = ctx.arena().kind(id) else {
        return Err(LinkGenError::Emit(format!("{id} is not a hierarchy")));
    };
    let target = ctx.target(id);

    let named = |name: &str| {
        let found = member_by_core(ctx, target, name);
        if found.is_none() {
            warn!(hierarchy = %target.core_actor(), member = %name, "hierarchy member is not part of the graph");
        }
        found
    };

    match attribute.named_argument("Types") {
        None | Some(TypedConstant::Error) => {
            let compilation = ctx.compilation();
            Ok(ctx
                .graph()
                .actors()
                .values()
                .copied()
                .filter(|n| {
                    let candidate = ctx.target(*n);
                    candidate.assembly == target.assembly
                        && compilation.implements(candidate.core_actor(), target.core_actor())
                })
                .collect())
        }
        Some(TypedConstant::Type(name)) => Ok(named(name).into_iter().collect()),
        Some(TypedConstant::Array(values)) => {
            let mut members = Vec::new();
            for value in values {
                let name = value.as_type().ok_or_else(|| {
                    LinkGenError::schema(target.core_actor(), format!("Types entries must be types, found {value:?}"))
                })?;
                members.extend(named(name));
            }
            Ok(members)
        }
        Some(other) => Err(LinkGenError::schema(
            target.core_actor(),
            format!("Types must be a type or an array of types, found {other:?}"),
        )),
    }
}

fn resolve_delimiters(ctx: &NodeContext, id: NodeId, members: &[NodeId]) -> Vec<Delimiter> {
    let compilation = ctx.compilation();
    let core_entity = ctx.target(id).core_entity();

    let entity_types = std::iter::once(core_entity.to_string())
        .chain(compilation.supertypes(core_entity))
        .filter_map(|name| compilation.get_type_by_metadata_name(&name))
        .collect::<Vec<_>>();

    let mut delimiters = Vec::new();
    for prop in entity_types
        .iter()
        .flat_map(|symbol| symbol.properties.iter())
        .filter(|prop| prop.attribute(MarkerAttribute::TypeHeuristic).is_some())
    {
        let Some(enum_symbol) = compilation
            .get_type_by_metadata_name(&prop.type_name)
            .filter(|symbol| symbol.kind == TypeKind::Enum)
        else {
            debug!(property = %prop.name, "type heuristic property is not an enum");
            continue;
        };

        let cases = enum_symbol
            .fields
            .iter()
            .filter_map(|field| {
                let attr = field
                    .attributes
                    .iter()
                    .find(|a| a.is(MarkerAttribute::TypeHeuristic))?;
                let [entity] = attr.type_arguments.as_slice() else {
                    return None;
                };
                let member = members
                    .iter()
                    .copied()
                    .find(|m| ctx.target(*m).core_entity() == entity)?;
                Some((format!("{}.{}", enum_symbol.name, field.name), member))
            })
            .collect::<Vec<_>>();

        if !cases.is_empty() {
            delimiters.push(Delimiter {
                enum_type: enum_symbol.name.clone(),
                cases,
            });
        }
    }
    delimiters
}

pub fn visit(ctx: &NodeContext, id: NodeId) -> Result<HierarchyState, LinkGenError> {
    let arena = ctx.arena();
    let members = resolve_members(ctx, id)?;
    let delimiters = resolve_delimiters(ctx, id, &members);

    let implementation = if arena.will_generate_implementation(id) {
        let virtual_members = is_template(arena, id) || arena.child_of(id, NodeCategory::BackLink).is_some();
        let properties = members
            .iter()
            .map(|m| {
                ImplProperty::new(member_name(ctx, id, *m), member_type(ctx, id, *m, false))
                    .virtual_if(virtual_members)
            })
            .collect();
        Implementation::new(
            &arena.implementation_class_name(id),
            properties,
            ctx.parent_constructor(id),
        )
    } else {
        Implementation::default()
    };

    Ok(HierarchyState {
        members,
        delimiters,
        implementation,
    })
}

fn owner_type(ctx: &NodeContext, id: NodeId) -> String {
    let target = ctx.target(id);
    if is_template(ctx.arena(), id) {
        target.link()
    } else {
        format!("{}{}", target.actor, ctx.arena().relative_type_path(id))
    }
}

fn build_implementation(
    ctx: &NodeContext,
    id: NodeId,
    state: &HierarchyState,
    additional: &mut Vec<TypeDecl>,
) -> Option<MethodDecl> {
    let arena = ctx.arena();
    let target = ctx.target(id);
    arena.root_actor(id)?;

    let impl_name = arena.implementation_class_name(id);
    let impl_type = arena.with_path_generics(id, &impl_name);
    let (_, constraints) = arena.path_generics(id);
    let path = arena.format_as_type_path(id);

    let mut class = TypeDecl::class(&impl_type).with_accessibility(Accessibility::PrivateProtected);
    class.add_base(&path);
    if let Some(parent) = arena.parents(id).find(|p| arena.will_generate_implementation(*p)) {
        let parent_impl = arena.with_path_generics(parent, &arena.implementation_class_name(parent));
        class.insert_base(0, format!("{}.{parent_impl}", target.actor));
    }
    for clause in constraints {
        class.add_constraint(clause);
    }

    for prop in &state.implementation.properties {
        class.add_member(prop.to_decl());
        class.add_member(PropertyDecl::explicit(&prop.type_name, &path, &prop.name, &prop.name));
    }
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
        .hierarchy_state(id)
        .ok_or_else(|| LinkGenError::Emit(format!("{id} is not a hierarchy")))?;

    if state.members.is_empty() {
        debug!(node = %id, "hierarchy has no members");
        return Ok(None);
    }

    let template = is_template(arena, id);
    let rel = arena.relative_type_path(id);
    let core_hierarchy = format!("{}{rel}.Hierarchy", target.core_actor());
    let relatives = visit
        .composition
        .iter()
        .copied()
        .filter(|n| arena.kind(*n).category() == NodeCategory::Hierarchy)
        .collect::<Vec<_>>();

    let mut decl = TypeDecl::interface("Hierarchy");
    decl.set_new(
        visit
            .ancestors
            .iter()
            .any(|a| arena.node_with_equivalent_pathing(id, *a).is_some()),
    );
    let mut bases = BTreeSet::new();

    for member in &state.members {
        let name = member_name(ctx, id, *member);
        let mut prop = PropertyDecl::get(member_type(ctx, id, *member, false), &name);
        if !target.is_core() || !template {
            prop = prop.with_modifiers(Modifier::New);
        }
        decl.add_member(prop);

        if !target.is_core() {
            decl.add_member(PropertyDecl::explicit(
                member_type(ctx, id, *member, true),
                &core_hierarchy,
                &name,
                &name,
            ));
        }
    }

    if !target.is_core() {
        bases.insert(core_hierarchy.clone());
    }

    if template {
        bases.insert(format!("{}.Link", target.actor));
    } else {
        for relative in &relatives {
            let relative_path = arena.format_as_type_path(*relative);
            bases.insert(relative_path.clone());
            let Some(relative_state) = ctx.hierarchy_state(*relative) else {
                continue;
            };
            for member in &relative_state.members {
                let name = member_name(ctx, *relative, *member);
                decl.add_member(PropertyDecl::explicit(
                    member_type(ctx, *relative, *member, false),
                    &relative_path,
                    &name,
                    &name,
                ));
            }
        }
    }

    for delimiter in &state.delimiters {
        let mut lines = vec!["return delimiter switch".to_string(), "{".to_string()];
        lines.extend(
            delimiter
                .cases
                .iter()
                .map(|(case, member)| format!("    {case} => {},", member_name(ctx, id, *member))),
        );
        lines.push("    _ => this".to_string());
        lines.push("};".to_string());

        let overrides = relatives
            .iter()
            .copied()
            .filter(|r| {
                ctx.hierarchy_state(*r)
                    .is_some_and(|s| s.delimiters.iter().any(|d| d.enum_type == delimiter.enum_type))
            })
            .collect::<Vec<_>>();

        let mut method = MethodDecl::new(owner_type(ctx, id), "OfType")
            .with_accessibility(Accessibility::Internal)
            .with_parameter(Parameter::new(&delimiter.enum_type, "delimiter"))
            .with_block(lines);
        if !target.is_core() || !overrides.is_empty() {
            method = method.with_modifiers(Modifier::New);
        }
        decl.add_member(method);

        for relative in overrides {
            decl.add_member(
                MethodDecl::new(owner_type(ctx, relative), "OfType")
                    .implementing(arena.format_as_type_path(relative))
                    .with_parameter(Parameter::new(&delimiter.enum_type, "delimiter"))
                    .returning("OfType(delimiter)"),
            );
        }
    }

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
