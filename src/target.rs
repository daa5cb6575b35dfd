//! Link targets: the `{Actor, Entity, Id, Model, Assembly}` tuples the generator builds a tree
//! for, together with the interface signatures each target is expected to satisfy.
//!
//! Every `*_signature` helper must match the hand-written `Discord.*` interface contracts exactly;
//! a mismatch surfaces as a compile error in the emitted code rather than here.

use std::fmt::{self, Display, Formatter};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::symbols::{simple_name, TypeKind};

static NAME_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z][a-z0-9]*|[a-z0-9]+").expect("static regex is valid"));

/// The assembly a target is generated into.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Assembly {
    #[default]
    Core,
    Rest,
    Gateway,
}

impl Display for Assembly {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Assembly {
    /// Namespace prefix used when resolving assembly-scoped actor names.
    pub fn namespace(&self) -> String {
        match self {
            Assembly::Core => "Discord".to_string(),
            other => format!("Discord.{other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkTarget {
    pub actor: String,
    pub entity: String,
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub assembly: Assembly,
    /// Core-assembly counterpart of `actor` for non-Core targets.
    #[serde(default)]
    pub core_actor: Option<String>,
    #[serde(default)]
    pub core_entity: Option<String>,
}

impl LinkTarget {
    pub fn new(
        actor: impl Into<String>,
        entity: impl Into<String>,
        id: impl Into<String>,
        model: impl Into<String>,
        assembly: Assembly,
    ) -> Self {
        LinkTarget {
            actor: actor.into(),
            entity: entity.into(),
            id: id.into(),
            model: model.into(),
            assembly,
            core_actor: None,
            core_entity: None,
        }
    }

    pub fn with_core(mut self, core_actor: impl Into<String>, core_entity: impl Into<String>) -> Self {
        self.core_actor = Some(core_actor.into());
        self.core_entity = Some(core_entity.into());
        self
    }

    pub fn is_core(&self) -> bool {
        self.assembly == Assembly::Core
    }

    pub fn core_actor(&self) -> &str {
        match (&self.core_actor, self.is_core()) {
            (Some(core), false) => core,
            _ => &self.actor,
        }
    }

    pub fn core_entity(&self) -> &str {
        match (&self.core_entity, self.is_core()) {
            (Some(core), false) => core,
            _ => &self.entity,
        }
    }

    pub fn actor_name(&self) -> &str {
        simple_name(&self.actor)
    }

    pub fn client_type(&self) -> String {
        format!("Discord{}Client", self.assembly)
    }

    pub fn link(&self) -> String {
        format!("Discord.ILink<{}, {}, {}, {}>", self.actor, self.id, self.entity, self.model)
    }

    pub fn core_link(&self) -> String {
        format!(
            "Discord.ILink<{}, {}, {}, {}>",
            self.core_actor(),
            self.id,
            self.core_entity(),
            self.model
        )
    }

    pub fn link_type(&self) -> String {
        format!("Discord.ILinkType<{}, {}, {}, {}>", self.actor, self.id, self.entity, self.model)
    }

    pub fn core_link_type(&self) -> String {
        format!(
            "Discord.ILinkType<{}, {}, {}, {}>",
            self.core_actor(),
            self.id,
            self.core_entity(),
            self.model
        )
    }

    pub fn rest_link_type(&self) -> String {
        format!(
            "Discord.Rest.IRestLinkType<{}, {}, {}, {}>",
            self.actor, self.id, self.entity, self.model
        )
    }

    /// The assembly-specific link type interface, if the assembly has one.
    pub fn assembly_link_type(&self) -> Option<String> {
        match self.assembly {
            Assembly::Rest => Some(self.rest_link_type()),
            _ => None,
        }
    }

    pub fn back_link_type(&self) -> String {
        format!(
            "Discord.IBackLink<TSource, {}, {}, {}, {}>",
            self.actor, self.id, self.entity, self.model
        )
    }

    pub fn core_back_link_type(&self) -> String {
        format!(
            "Discord.IBackLink<TSource, {}, {}, {}, {}>",
            self.core_actor(),
            self.id,
            self.core_entity(),
            self.model
        )
    }

    pub fn actor_provider(&self) -> String {
        format!("Discord.IActorProvider<{}, {}>", self.actor, self.id)
    }

    pub fn core_actor_provider(&self) -> String {
        format!("Discord.IActorProvider<{}, {}>", self.core_actor(), self.id)
    }

    pub fn rest_actor_provider(&self) -> String {
        format!("Discord.Rest.RestActorProvider<{}, {}>", self.actor, self.id)
    }

    pub fn entity_provider(&self) -> String {
        format!("Discord.IEntityProvider<{}, {}>", self.entity, self.model)
    }

    pub fn core_entity_provider(&self) -> String {
        format!("Discord.IEntityProvider<{}, {}>", self.core_entity(), self.model)
    }

    pub fn identifiable(&self) -> String {
        format!(
            "Discord.IIdentifiable<{}, {}, {}, {}>",
            self.id, self.entity, self.actor, self.model
        )
    }

    pub fn core_identifiable(&self) -> String {
        format!(
            "Discord.IIdentifiable<{}, {}, {}, {}>",
            self.id,
            self.core_entity(),
            self.core_actor(),
            self.model
        )
    }

    pub fn relationship(&self) -> String {
        format!("Discord.IRelationship<{}, {}, {}>", self.actor, self.id, self.entity)
    }

    pub fn canonical_relationship(&self) -> String {
        format!(
            "Discord.ICanonicalRelationship<{}, {}, {}>",
            self.actor, self.id, self.entity
        )
    }
}

impl Display for LinkTarget {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}; entity {}, id {}, model {})",
            self.actor, self.assembly, self.entity, self.id, self.model
        )
    }
}

/// `IGuildChannelActor` -> `GuildChannel`, `RestGuildActor` -> `Guild`.
pub fn friendly_name(type_name: &str, kind: TypeKind) -> String {
    let name = simple_name(type_name);
    let name = if kind == TypeKind::Interface {
        name.get(1..).unwrap_or_default()
    } else {
        name
    };

    name.replace("Trait", "")
        .replace("Actor", "")
        .replace("Gateway", "")
        .replace("Rest", "")
}

/// Splits a PascalCase identifier into its words.
pub fn name_parts(name: &str) -> Vec<String> {
    NAME_PART
        .find_iter(name)
        .map(|m| m.as_str().to_string())
        .collect()
}
