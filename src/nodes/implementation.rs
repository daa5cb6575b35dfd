//! Members of the generated implementation classes.
//!
//! Every non-core node that generates an implementation class carries a set of
//! [`ImplProperty`]s and an [`ImplConstructor`]. Constructors chain: a node's constructor takes
//! its base's parameters first, then its own, and forwards the base parameters to `: base(..)`.

use enumset::EnumSet;
use serde::{Deserialize, Serialize};

use crate::syntax::{to_parameter_name, Accessibility, ConstructorDecl, Modifier, Parameter, PropertyDecl};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplProperty {
    pub name: String,
    pub type_name: String,
    pub accessibility: Accessibility,
    pub modifiers: EnumSet<Modifier>,
}

impl ImplProperty {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        ImplProperty {
            name: name.into(),
            type_name: type_name.into(),
            accessibility: Accessibility::Internal,
            modifiers: EnumSet::empty(),
        }
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// `override` when a base implementation exists, else `virtual` when something derives.
    pub fn overridable(mut self, has_base: bool, has_child: bool) -> Self {
        if has_base {
            self.modifiers.insert(Modifier::Override);
        } else if has_child {
            self.modifiers.insert(Modifier::Virtual);
        }
        self
    }

    pub fn virtual_if(mut self, condition: bool) -> Self {
        if condition {
            self.modifiers.insert(Modifier::Virtual);
        }
        self
    }

    pub fn parameter_name(&self) -> String {
        to_parameter_name(&self.name)
    }

    pub fn to_decl(&self) -> PropertyDecl {
        PropertyDecl::get(&self.type_name, &self.name)
            .with_accessibility(self.accessibility)
            .with_modifiers(self.modifiers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplParameter {
    pub type_name: String,
    pub name: String,
    /// The property this parameter initializes, if any.
    pub initializes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplConstructor {
    pub class_name: String,
    pub parameters: Vec<ImplParameter>,
    pub base: Option<Box<ImplConstructor>>,
}

impl ImplConstructor {
    pub fn from_properties(
        class_name: impl Into<String>,
        properties: &[ImplProperty],
        base: Option<&ImplConstructor>,
    ) -> Self {
        ImplConstructor {
            class_name: class_name.into(),
            parameters: properties
                .iter()
                .map(|prop| ImplParameter {
                    type_name: prop.type_name.clone(),
                    name: prop.parameter_name(),
                    initializes: Some(prop.name.clone()),
                })
                .collect(),
            base: base.cloned().map(Box::new),
        }
    }

    /// Base parameters first, then this constructor's own; names are unique.
    pub fn actual_parameters(&self) -> Vec<Parameter> {
        let mut params = self
            .base
            .as_ref()
            .map(|base| base.actual_parameters())
            .unwrap_or_default();

        for param in &self.parameters {
            if params.iter().all(|p| p.name != param.name) {
                params.push(Parameter::new(&param.type_name, &param.name));
            }
        }
        params
    }

    /// The argument list a factory forwards to this constructor.
    pub fn argument_names(&self) -> Vec<String> {
        self.actual_parameters().into_iter().map(|p| p.name).collect()
    }

    pub fn to_decl(&self) -> ConstructorDecl {
        ConstructorDecl {
            accessibility: Accessibility::Public,
            name: self.class_name.clone(),
            parameters: self.actual_parameters(),
            base_arguments: self.base.as_ref().map(|base| base.argument_names()),
            body: self
                .parameters
                .iter()
                .filter_map(|param| {
                    param
                        .initializes
                        .as_ref()
                        .map(|prop| format!("{prop} = {};", param.name))
                })
                .collect(),
        }
    }
}

/// The generated implementation surface of one node.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub properties: Vec<ImplProperty>,
    pub constructor: Option<ImplConstructor>,
}

impl Implementation {
    pub fn new(class_name: &str, properties: Vec<ImplProperty>, base: Option<&ImplConstructor>) -> Self {
        let constructor = ImplConstructor::from_properties(class_name, &properties, base);
        Implementation {
            properties,
            constructor: Some(constructor),
        }
    }

    pub fn constructor_parameters(&self) -> Vec<Parameter> {
        self.constructor
            .as_ref()
            .map(ImplConstructor::actual_parameters)
            .unwrap_or_default()
    }

    pub fn constructor_arguments(&self) -> Vec<String> {
        self.constructor
            .as_ref()
            .map(ImplConstructor::argument_names)
            .unwrap_or_default()
    }
}
