//! Extension nodes: user-declared nested `*Extension` interfaces on a core actor, re-exposed at
//! every position of the actor's link tree.
//!
//! Each declared property is classified once during the visit:
//!
//! | Class | Marker | Emitted as |
//! |-------|--------|------------|
//! | link mirror | `[LinkMirror]` | the target actor's link surface at this node's relative path |
//! | backlink mirror | `[LinkMirror(OnlyBackLinks = true)]` | the target's `BackLink<TSource>`, under back links only |
//! | overload | explicit interface implementation | nothing of its own; extends the base extension |
//! | raw | none | its declared type, on the actor-level declaration only |
//!
//! A property that cannot be resolved is kept and rendered as a `// {name} is invalid` line.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    error::LinkGenError,
    graph::NodeContext,
    nodes::{
        self,
        implementation::{ImplProperty, Implementation},
        NodeArena, NodeCategory, NodeId, NodeKind,
    },
    symbols::{Compilation, MarkerAttribute, PropertySymbol, TypeKind, TypeSymbol},
    syntax::{Accessibility, Member, MethodDecl, Modifier, PropertyDecl, TypeDecl},
    target::LinkTarget,
};

const STRUCTURAL_PREFIXES: [&str; 4] = ["Indexable", "Enumerable", "Defined", "Paged<"];

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionProperty {
    pub symbol: PropertySymbol,
    pub is_link_mirror: bool,
    pub is_back_link_mirror: bool,
    /// Actor root the property mirrors.
    pub target: Option<NodeId>,
    /// Extension node an overload redeclares.
    pub overloaded_base: Option<NodeId>,
    pub is_valid: bool,
}

impl ExtensionProperty {
    pub fn name(&self) -> &str {
        &self.symbol.name
    }

    pub fn is_overload(&self) -> bool {
        self.symbol.explicit_interface.is_some()
    }

    pub fn is_defined_on_path(&self, is_template: bool) -> bool {
        self.is_valid && (is_template || (self.is_link_mirror && !self.is_back_link_mirror))
    }

    /// The type the property is declared with on `owner`.
    pub fn property_type(&self, ctx: &NodeContext, owner: NodeId, back_link: bool, use_core: bool) -> String {
        let Some(target_id) = self.target.filter(|_| self.is_link_mirror) else {
            return self.symbol.type_name.clone();
        };
        let arena = ctx.arena();
        let target = ctx.target(target_id);
        let actor = if use_core {
            target.core_actor()
        } else {
            target.actor.as_str()
        };

        if self.is_back_link_mirror {
            return if back_link {
                format!("{actor}.BackLink<TSource>")
            } else {
                actor.to_string()
            };
        }

        if is_template(arena, owner) {
            match (back_link, use_core) {
                (true, true) => target.core_back_link_type(),
                (true, false) => target.back_link_type(),
                (false, true) => target.core_link(),
                (false, false) => target.link(),
            }
        } else {
            let rel = arena.format_relative_type_path(owner, |n| arena.kind(n).is_link_type());
            if back_link {
                format!("{actor}{rel}.BackLink<TSource>")
            } else {
                format!("{actor}{rel}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionState {
    pub properties: Vec<ExtensionProperty>,
    pub implementation: Implementation,
}

/// An extension declared directly under its actor.
pub fn is_template(arena: &NodeArena, id: NodeId) -> bool {
    arena.parent(id).is_some_and(|p| arena.kind(p).is_actor())
}

/// Attaches one node per `[LinkExtension]` type nested in the core actor.
pub fn add_to(arena: &mut NodeArena, compilation: &Compilation, target: &Arc<LinkTarget>, parent: NodeId) {
    let extensions = compilation
        .nested_types(target.core_actor())
        .filter(|symbol| symbol.has_attribute(MarkerAttribute::LinkExtension))
        .cloned()
        .collect::<Vec<_>>();
    attach_all(arena, target, parent, &extensions);
}

fn attach_all(arena: &mut NodeArena, target: &Arc<LinkTarget>, parent: NodeId, extensions: &[TypeSymbol]) {
    for (index, symbol) in extensions.iter().enumerate() {
        let id = arena.alloc(
            Some(parent),
            target.clone(),
            NodeKind::Extension {
                symbol: symbol.clone(),
            },
        );
        arena.alloc(Some(id), target.clone(), NodeKind::BackLink);

        let others = extensions
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, s)| s.clone())
            .collect::<Vec<_>>();
        attach_all(arena, target, id, &others);
    }
}

fn extension_symbol(arena: &NodeArena, id: NodeId) -> Option<&TypeSymbol> {
    match arena.kind(id) {
        NodeKind::Extension { symbol } => Some(symbol),
        _ => None,
    }
}

/// Actor-level extension node declared by `symbol_name`, searched across every actor.
fn find_template_extension(ctx: &NodeContext, symbol_name: &str) -> Option<NodeId> {
    let arena = ctx.arena();
    ctx.graph().actors().values().find_map(|actor| {
        arena
            .children(*actor)
            .iter()
            .copied()
            .find(|c| extension_symbol(arena, *c).is_some_and(|s| s.name == symbol_name))
    })
}

fn resolve_target(ctx: &NodeContext, id: NodeId, prop: &PropertySymbol) -> Option<NodeId> {
    let target = ctx.target(id);
    let direct = if target.is_core() {
        ctx.actor_node(&prop.type_name)
    } else {
        ctx.actor_by_core(&prop.type_name)
    };
    if direct.is_some() {
        return direct;
    }

    if prop.type_kind != TypeKind::Unknown {
        return None;
    }

    let prefix = target.assembly.to_string();
    let fuzzy = prop
        .type_name
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|part| part.starts_with(&prefix) && (part.ends_with("Actor") || part.ends_with("Trait")))
        .find_map(|part| ctx.actor_node(&format!("{}.{part}", target.assembly.namespace())));
    if fuzzy.is_some() {
        return fuzzy;
    }

    // Unbound link-type shapes refer to the actor being extended.
    if STRUCTURAL_PREFIXES.iter().any(|p| prop.type_name.starts_with(p)) {
        return ctx.actor_root(id);
    }
    None
}

fn classify(ctx: &NodeContext, id: NodeId, prop: &PropertySymbol) -> ExtensionProperty {
    let mirror = prop.attribute(MarkerAttribute::LinkMirror);
    let is_link_mirror = mirror.is_some();
    let is_back_link_mirror = mirror
        .and_then(|attr| attr.named_argument("OnlyBackLinks"))
        .and_then(|value| value.as_bool())
        .unwrap_or(false);

    let overloaded_base = prop
        .explicit_interface
        .as_deref()
        .and_then(|iface| find_template_extension(ctx, iface));
    let target = resolve_target(ctx, id, prop);

    let is_valid = !(prop.explicit_interface.is_some() && overloaded_base.is_none())
        && !(is_link_mirror && target.is_none())
        && !(prop.type_kind == TypeKind::Unknown && target.is_none());

    if !is_valid {
        debug!(node = %id, property = %prop.name, r#type = %prop.type_name, "extension property is invalid");
    }

    ExtensionProperty {
        symbol: prop.clone(),
        is_link_mirror,
        is_back_link_mirror,
        target,
        overloaded_base,
        is_valid,
    }
}

pub fn visit(ctx: &NodeContext, id: NodeId) -> Result<ExtensionState, LinkGenError> {
    let arena = ctx.arena();
    let symbol = extension_symbol(arena, id)
        .ok_or_else(|| LinkGenError::Emit(format!("{id} is not an extension")))?;

    let properties = symbol
        .properties
        .iter()
        .map(|prop| classify(ctx, id, prop))
        .collect::<Vec<_>>();

    let implementation = if arena.will_generate_implementation(id) {
        let has_back_link = arena.child_of(id, NodeCategory::BackLink).is_some();
        let props = properties
            .iter()
            .filter(|p| p.is_valid && !p.is_overload())
            .map(|p| ImplProperty::new(p.name(), p.property_type(ctx, id, false, false)).virtual_if(has_back_link))
            .collect();
        Implementation::new(
            &arena.implementation_class_name(id),
            props,
            ctx.parent_constructor(id),
        )
    } else {
        Implementation::default()
    };

    Ok(ExtensionState {
        properties,
        implementation,
    })
}

/// Same-named properties defined by the extension nodes in `id`'s composition.
pub fn inherited_properties<'g>(
    ctx: &NodeContext<'g>,
    id: NodeId,
) -> BTreeMap<String, Vec<(NodeId, &'g ExtensionProperty)>> {
    let arena = ctx.arena();
    let mut inherited: BTreeMap<String, Vec<(NodeId, &'g ExtensionProperty)>> = BTreeMap::new();
    let Some(visit) = ctx.state(id) else {
        return inherited;
    };

    for node in &visit.implicit_composition {
        if arena.kind(*node).category() != NodeCategory::Extension {
            continue;
        }
        let Some(state) = ctx.extension_state(*node) else {
            continue;
        };
        for prop in state
            .properties
            .iter()
            .filter(|p| p.is_defined_on_path(is_template(arena, *node)))
        {
            inherited.entry(prop.name().to_string()).or_default().push((*node, prop));
        }
    }
    inherited
}

fn build_implementation(
    ctx: &NodeContext,
    id: NodeId,
    state: &ExtensionState,
    inherited: &BTreeMap<String, Vec<(NodeId, &ExtensionProperty)>>,
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

    class.extend_members(state.implementation.properties.iter().map(ImplProperty::to_decl));

    let is_template = is_template(arena, id);
    for prop in state.properties.iter().filter(|p| p.is_valid && !p.is_overload()) {
        let closest = if prop.is_defined_on_path(is_template) {
            Some((id, prop))
        } else {
            inherited.get(prop.name()).and_then(|defs| defs.first().copied())
        };
        if let Some((node, defined)) = closest {
            class.add_member(PropertyDecl::explicit(
                defined.property_type(ctx, node, false, false),
                arena.format_as_type_path(node),
                defined.name(),
                defined.name(),
            ));
        }
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
        .extension_state(id)
        .ok_or_else(|| LinkGenError::Emit(format!("{id} is not an extension")))?;
    let symbol = extension_symbol(arena, id)
        .ok_or_else(|| LinkGenError::Emit(format!("{id} is not an extension")))?;

    let is_template = is_template(arena, id);
    let rel = arena.relative_type_path(id);
    let type_name = arena.type_name(id);
    let core_path = format!("{}{rel}.{type_name}", target.core_actor());
    let inherited = inherited_properties(ctx, id);

    let mut decl = TypeDecl::interface(&type_name);
    decl.set_new(
        visit
            .ancestors
            .iter()
            .any(|a| arena.node_with_equivalent_pathing(id, *a).is_some()),
    );

    for prop in &state.properties {
        if !prop.is_valid {
            decl.add_member(Member::Comment(format!("{} is invalid", prop.name())));
            continue;
        }
        if prop.is_overload() || !prop.is_defined_on_path(is_template) {
            continue;
        }

        let existing = inherited.get(prop.name());
        let mut declared = PropertyDecl::get(prop.property_type(ctx, id, false, false), prop.name());
        if !target.is_core() || existing.is_some() {
            declared = declared.with_modifiers(Modifier::New);
        }
        decl.add_member(declared);

        if !target.is_core() {
            decl.add_member(PropertyDecl::explicit(
                prop.property_type(ctx, id, false, true),
                &core_path,
                prop.name(),
                prop.name(),
            ));
        }

        for (node, other) in existing.into_iter().flatten() {
            decl.add_member(PropertyDecl::explicit(
                other.property_type(ctx, *node, false, false),
                arena.format_as_type_path(*node),
                other.name(),
                other.name(),
            ));
        }
    }

    let mut bases = BTreeSet::new();
    if !target.is_core() {
        bases.insert(core_path.clone());
    }
    if !is_template {
        bases.insert(arena.type_path(id));
        for relative in visit
            .composition
            .iter()
            .filter(|n| arena.kind(**n).category() == NodeCategory::Extension)
        {
            bases.insert(arena.format_as_type_path(*relative));
            if !target.is_core() {
                bases.insert(format!(
                    "{}{}.{type_name}",
                    target.core_actor(),
                    arena.relative_type_path(*relative)
                ));
            }
        }
    }

    // Extensions this one builds on: overload bases and declared extension interfaces.
    for base in state.properties.iter().filter_map(|p| p.overloaded_base) {
        bases.insert(arena.format_as_type_path(base));
    }
    for iface in &symbol.interfaces {
        match find_template_extension(ctx, iface) {
            Some(extended) => {
                bases.insert(arena.format_as_type_path(extended));
            }
            None => {
                if ctx.compilation().get_type_by_metadata_name(iface).is_some_and(|s| s.has_attribute(MarkerAttribute::LinkExtension)) {
                    warn!(node = %id, %iface, "extended extension is not part of the graph");
                }
            }
        }
    }

    for base in bases {
        decl.add_base(base);
    }

    if arena.will_generate_implementation(id) {
        if let Some(create) = build_implementation(ctx, id, state, &inherited, additional) {
            decl.add_member(create);
        }
    }

    for child in nodes::build_children(ctx, id, additional)? {
        decl.add_member(child);
    }

    Ok(Some(decl))
}
