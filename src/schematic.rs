//! The link schematic: which link-type shapes exist and how they nest.
//!
//! A schematic is declared once (on `Discord.ILinkType`) and applied to every target. Each entry
//! names a nested link-type interface (`Indexable`, `Enumerable`, `Defined`, `Paged<...>`) and its
//! children in the order they were declared; that order is significant to the composition search.

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::symbols::simple_name;

#[derive(EnumSetType, Debug, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
pub enum LinkTypeKind {
    Defined,
    Enumerable,
    Indexable,
    Paged,
}

impl LinkTypeKind {
    pub fn from_name(name: &str) -> Option<LinkTypeKind> {
        match name {
            "Defined" => Some(LinkTypeKind::Defined),
            "Enumerable" => Some(LinkTypeKind::Enumerable),
            "Indexable" => Some(LinkTypeKind::Indexable),
            "Paged" => Some(LinkTypeKind::Paged),
            _ => None,
        }
    }

    /// Link kinds that may nest directly inside this one.
    pub fn accepts(&self) -> EnumSet<LinkTypeKind> {
        match self {
            LinkTypeKind::Defined => LinkTypeKind::Enumerable | LinkTypeKind::Indexable,
            LinkTypeKind::Enumerable => EnumSet::only(LinkTypeKind::Indexable),
            LinkTypeKind::Paged => EnumSet::only(LinkTypeKind::Indexable),
            LinkTypeKind::Indexable => EnumSet::empty(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchematicEntry {
    /// Fully-qualified display name of the declared link-type interface.
    pub symbol: String,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub constraint_clauses: Vec<String>,
    #[serde(default)]
    pub children: Vec<SchematicEntry>,
}

impl SchematicEntry {
    pub fn new(symbol: impl Into<String>) -> Self {
        SchematicEntry {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn with_type_parameters(mut self, params: &[&str], constraints: &[&str]) -> Self {
        self.type_parameters = params.iter().map(|p| p.to_string()).collect();
        self.constraint_clauses = constraints.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_children(mut self, children: Vec<SchematicEntry>) -> Self {
        self.children = children;
        self
    }

    pub fn name(&self) -> &str {
        simple_name(&self.symbol)
    }

    pub fn kind(&self) -> Option<LinkTypeKind> {
        LinkTypeKind::from_name(self.name())
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }

    /// `Paged<TPaged, TParams>`, or the bare name for non-generic entries.
    pub fn format_type_name(&self) -> String {
        if self.type_parameters.is_empty() {
            self.name().to_string()
        } else {
            format!("{}<{}>", self.name(), self.type_parameters.join(", "))
        }
    }

    /// Name segment used when composing implementation class names (`Paged2`).
    pub fn implementation_segment(&self) -> String {
        if self.type_parameters.is_empty() {
            self.name().to_string()
        } else {
            format!("{}{}", self.name(), self.type_parameters.len())
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schematic {
    pub root: SchematicEntry,
}

impl Schematic {
    pub fn new(root: SchematicEntry) -> Self {
        Schematic { root }
    }

    /// The conventional four-shape schematic.
    pub fn standard() -> Self {
        let indexable = || SchematicEntry::new("Discord.ILinkType.Indexable");
        Schematic::new(SchematicEntry::new("Discord.ILinkType").with_children(vec![
            SchematicEntry::new("Discord.ILinkType.Defined").with_children(vec![
                SchematicEntry::new("Discord.ILinkType.Enumerable").with_children(vec![indexable()]),
                indexable(),
            ]),
            SchematicEntry::new("Discord.ILinkType.Enumerable").with_children(vec![indexable()]),
            indexable(),
            SchematicEntry::new("Discord.ILinkType.Paged")
                .with_type_parameters(&["TPaged", "TPageParams"], &["where TPageParams : IPagingParams"])
                .with_children(vec![indexable()]),
        ]))
    }
}
