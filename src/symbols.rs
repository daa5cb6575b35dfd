//! # Symbols
//!
//! A serializable snapshot of the type information the generator consumes. The host's symbol
//! analysis produces these records; the generator never inspects source text itself.
//!
//! Every type is addressed by its fully-qualified display string (`Discord.IGuildActor`,
//! `Discord.IGuildActor.Extension`). [`Compilation`] indexes the declared types and keeps a
//! supertype graph (base class + interfaces) so that `implements` queries are a graph walk
//! rather than repeated recursive lookups.
//!
//! Marker attributes are resolved through [`MarkerAttribute`], which pins each marker to a
//! stable fully-qualified metadata name.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{depth_first_search, Control, DfsEvent},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Interface,
    #[default]
    Class,
    Struct,
    Enum,
    /// The host could not bind the type (an error type).
    Unknown,
}

impl TypeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Interface => "interface",
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Enum => "enum",
            TypeKind::Unknown => "class",
        }
    }
}

/// The value of an attribute argument, shaped after the host's typed constant kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypedConstant {
    Primitive(String),
    Bool(bool),
    Enum(String),
    Type(String),
    Array(Vec<TypedConstant>),
    Error,
}

impl TypedConstant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedConstant::Primitive(value) | TypedConstant::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedConstant::Bool(value) => Some(*value),
            TypedConstant::Primitive(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&str> {
        match self {
            TypedConstant::Type(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TypedConstant]> {
        match self {
            TypedConstant::Array(values) => Some(values),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeData {
    /// Fully-qualified attribute class name.
    pub class: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<TypedConstant>,
    #[serde(default)]
    pub named: BTreeMap<String, TypedConstant>,
}

impl AttributeData {
    pub fn is(&self, marker: MarkerAttribute) -> bool {
        marker.matches(&self.class)
    }

    pub fn named_argument(&self, name: &str) -> Option<&TypedConstant> {
        self.named.get(name)
    }
}

/// The attributes the generator understands, keyed by their metadata names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerAttribute {
    RelationshipName,
    LinkMirror,
    LinkExtension,
    LinkHierarchicalRoot,
    TypeHeuristic,
}

impl MarkerAttribute {
    pub fn metadata_name(&self) -> &'static str {
        match self {
            MarkerAttribute::RelationshipName => "Discord.RelationshipNameAttribute",
            MarkerAttribute::LinkMirror => "Discord.LinkMirrorAttribute",
            MarkerAttribute::LinkExtension => "Discord.LinkExtensionAttribute",
            MarkerAttribute::LinkHierarchicalRoot => "Discord.LinkHierarchicalRootAttribute",
            MarkerAttribute::TypeHeuristic => "Discord.TypeHeuristicAttribute",
        }
    }

    /// Generic attributes are displayed with their type arguments, which are ignored here.
    pub fn matches(&self, class: &str) -> bool {
        let unbound = class.split('<').next().unwrap_or(class);
        unbound == self.metadata_name()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySymbol {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Kind of the property's type; [`TypeKind::Unknown`] when the host could not bind it.
    #[serde(default)]
    pub type_kind: TypeKind,
    /// Set when the property is an explicit interface implementation.
    #[serde(default)]
    pub explicit_interface: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
}

impl PropertySymbol {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        PropertySymbol {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, marker: MarkerAttribute) -> Option<&AttributeData> {
        self.attributes.iter().find(|attr| attr.is(marker))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSymbol {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// The explicit default value, already rendered as a literal.
    #[serde(default)]
    pub default: Option<String>,
}

impl ParameterSymbol {
    /// Simple (unqualified, ungeneric) name of the parameter type.
    pub fn type_simple_name(&self) -> &str {
        simple_name(&self.type_name)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorSymbol {
    #[serde(default)]
    pub parameters: Vec<ParameterSymbol>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSymbol {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSymbol {
    /// Fully-qualified display string.
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub constraint_clauses: Vec<String>,
    #[serde(default)]
    pub base_type: Option<String>,
    /// Directly declared interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub containing_type: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeData>,
    #[serde(default)]
    pub properties: Vec<PropertySymbol>,
    #[serde(default)]
    pub constructors: Vec<ConstructorSymbol>,
    #[serde(default)]
    pub fields: Vec<FieldSymbol>,
}

impl TypeSymbol {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        TypeSymbol {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }

    /// `Name<T1, T2>` or `Name` when the type is not generic.
    pub fn declared_name(&self) -> String {
        if self.type_parameters.is_empty() {
            self.simple_name().to_string()
        } else {
            format!("{}<{}>", self.simple_name(), self.type_parameters.join(", "))
        }
    }

    pub fn attribute(&self, marker: MarkerAttribute) -> Option<&AttributeData> {
        self.attributes.iter().find(|attr| attr.is(marker))
    }

    pub fn has_attribute(&self, marker: MarkerAttribute) -> bool {
        self.attribute(marker).is_some()
    }
}

/// The last dotted segment of a display string, without generic arguments.
pub fn simple_name(display: &str) -> &str {
    let unbound = display.split('<').next().unwrap_or(display);
    unbound.rsplit('.').next().unwrap_or(unbound)
}

/// The declared types of one analysis pass, plus their supertype graph.
#[derive(Debug, Default, Clone)]
pub struct Compilation {
    types: BTreeMap<String, TypeSymbol>,
    hierarchy: DiGraph<String, ()>,
    indices: BTreeMap<String, NodeIndex>,
}

impl Compilation {
    pub fn new(types: impl IntoIterator<Item = TypeSymbol>) -> Self {
        let mut compilation = Compilation::default();
        for symbol in types {
            compilation.types.insert(symbol.name.clone(), symbol);
        }

        let edges = compilation
            .types
            .values()
            .flat_map(|symbol| {
                symbol
                    .base_type
                    .iter()
                    .chain(symbol.interfaces.iter())
                    .map(move |parent| (symbol.name.clone(), parent.clone()))
            })
            .collect::<Vec<_>>();

        let names = compilation.types.keys().cloned().collect::<Vec<_>>();
        for name in names {
            compilation.index_of(&name);
        }
        for (child, parent) in edges {
            let child_idx = compilation.index_of(&child);
            let parent_idx = compilation.index_of(&parent);
            compilation.hierarchy.update_edge(child_idx, parent_idx, ());
        }

        compilation
    }

    fn index_of(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.indices.get(name) {
            return *idx;
        }
        let idx = self.hierarchy.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    pub fn get_type_by_metadata_name(&self, name: &str) -> Option<&TypeSymbol> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeSymbol> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types declared directly inside `container`, in name order.
    pub fn nested_types<'a>(&'a self, container: &'a str) -> impl Iterator<Item = &'a TypeSymbol> {
        self.types
            .values()
            .filter(move |symbol| symbol.containing_type.as_deref() == Some(container))
    }

    /// Every transitive supertype of `name`, excluding `name` itself.
    pub fn supertypes(&self, name: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let Some(start) = self.indices.get(name) else {
            return found;
        };

        depth_first_search(&self.hierarchy, Some(*start), |event| {
            if let DfsEvent::Discover(idx, _) = event {
                if idx != *start {
                    found.insert(self.hierarchy[idx].clone());
                }
            }
            Control::<()>::Continue
        });

        found
    }

    /// Whether `other` is a proper supertype of `name`.
    pub fn implements(&self, name: &str, other: &str) -> bool {
        if name == other {
            return false;
        }
        let (Some(start), Some(goal)) = (self.indices.get(name), self.indices.get(other)) else {
            return false;
        };

        let mut hit = false;
        depth_first_search(&self.hierarchy, Some(*start), |event| {
            if let DfsEvent::Discover(idx, _) = event {
                if idx == *goal {
                    hit = true;
                    return Control::Break(());
                }
            }
            Control::Continue
        });
        hit
    }

    /// Every interface `name` implements, transitively, by simple name.
    pub fn implements_simple(&self, name: &str, simple: &str) -> bool {
        self.supertypes(name)
            .iter()
            .any(|parent| simple_name(parent) == simple)
    }
}
