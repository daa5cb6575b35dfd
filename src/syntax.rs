//! # Syntax
//!
//! A small declaration tree for the C#-shaped output. Nodes assemble [`TypeDecl`]s out of
//! [`Member`]s with explicit modifiers, base lists and constraint clauses, and the whole tree is
//! written out once by [`Emitter`]. Keeping emission structured means the link rules can be
//! asserted on (`decl.bases`, `decl.find_type("Link")`) without diffing text.
//!
//! Members and bases are de-duplicated on insertion: several composition paths routinely
//! contribute the same explicit implementation, and the output must declare it once.

use std::fmt::{self, Display, Formatter, Write};

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

use crate::{error::LinkGenError, symbols::TypeKind};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accessibility {
    #[default]
    Unspecified,
    Public,
    Internal,
    Protected,
    PrivateProtected,
    Private,
}

impl Accessibility {
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Accessibility::Unspecified => None,
            Accessibility::Public => Some("public"),
            Accessibility::Internal => Some("internal"),
            Accessibility::Protected => Some("protected"),
            Accessibility::PrivateProtected => Some("private protected"),
            Accessibility::Private => Some("private"),
        }
    }
}

/// Declaration modifiers, rendered in declaration order.
#[derive(EnumSetType, Debug, Serialize, Deserialize)]
#[enumset(serialize_repr = "list")]
pub enum Modifier {
    Static,
    Readonly,
    New,
    Abstract,
    Sealed,
    Virtual,
    Override,
    Partial,
}

impl Modifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Modifier::Static => "static",
            Modifier::Readonly => "readonly",
            Modifier::New => "new",
            Modifier::Abstract => "abstract",
            Modifier::Sealed => "sealed",
            Modifier::Virtual => "virtual",
            Modifier::Override => "override",
            Modifier::Partial => "partial",
        }
    }
}

fn prefix(accessibility: Accessibility, modifiers: EnumSet<Modifier>) -> String {
    let mut parts = Vec::new();
    if let Some(keyword) = accessibility.keyword() {
        parts.push(keyword);
    }
    parts.extend(modifiers.iter().map(|m| m.keyword()));
    if parts.is_empty() {
        String::new()
    } else {
        format!("{} ", parts.join(" "))
    }
}

fn member_name(explicit_interface: &Option<String>, name: &str) -> String {
    match explicit_interface {
        Some(iface) => format!("{iface}.{name}"),
        None => name.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub type_name: String,
    pub name: String,
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Parameter {
            type_name: type_name.into(),
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name, self.name)?;
        if let Some(default) = &self.default {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyBody {
    /// `{ get; }`
    Get,
    /// `=> expression;`
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub accessibility: Accessibility,
    pub modifiers: EnumSet<Modifier>,
    pub type_name: String,
    pub name: String,
    pub explicit_interface: Option<String>,
    pub body: PropertyBody,
}

impl PropertyDecl {
    pub fn get(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        PropertyDecl {
            accessibility: Accessibility::Unspecified,
            modifiers: EnumSet::empty(),
            type_name: type_name.into(),
            name: name.into(),
            explicit_interface: None,
            body: PropertyBody::Get,
        }
    }

    /// `{type} {iface}.{name} => {expression};`
    pub fn explicit(
        type_name: impl Into<String>,
        iface: impl Into<String>,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        PropertyDecl {
            explicit_interface: Some(iface.into()),
            body: PropertyBody::Expression(expression.into()),
            ..PropertyDecl::get(type_name, name)
        }
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn with_modifiers(mut self, modifiers: impl Into<EnumSet<Modifier>>) -> Self {
        self.modifiers |= modifiers.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    /// Declaration only, terminated with `;`.
    Declaration,
    Expression(String),
    Block(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub accessibility: Accessibility,
    pub modifiers: EnumSet<Modifier>,
    pub return_type: String,
    pub name: String,
    pub explicit_interface: Option<String>,
    pub parameters: Vec<Parameter>,
    pub body: Body,
}

impl MethodDecl {
    pub fn new(return_type: impl Into<String>, name: impl Into<String>) -> Self {
        MethodDecl {
            accessibility: Accessibility::Unspecified,
            modifiers: EnumSet::empty(),
            return_type: return_type.into(),
            name: name.into(),
            explicit_interface: None,
            parameters: Vec::new(),
            body: Body::Declaration,
        }
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn with_modifiers(mut self, modifiers: impl Into<EnumSet<Modifier>>) -> Self {
        self.modifiers |= modifiers.into();
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn implementing(mut self, iface: impl Into<String>) -> Self {
        self.explicit_interface = Some(iface.into());
        self
    }

    pub fn returning(mut self, expression: impl Into<String>) -> Self {
        self.body = Body::Expression(expression.into());
        self
    }

    pub fn with_block(mut self, lines: Vec<String>) -> Self {
        self.body = Body::Block(lines);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerDecl {
    pub accessibility: Accessibility,
    pub modifiers: EnumSet<Modifier>,
    pub type_name: String,
    pub explicit_interface: Option<String>,
    pub parameters: Vec<Parameter>,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub accessibility: Accessibility,
    pub modifiers: EnumSet<Modifier>,
    pub type_name: String,
    pub name: String,
    pub initializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub accessibility: Accessibility,
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// `: base(..)` arguments; `None` when the constructor does not chain.
    pub base_arguments: Option<Vec<String>>,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Member {
    Comment(String),
    Property(PropertyDecl),
    Method(MethodDecl),
    Indexer(IndexerDecl),
    Field(FieldDecl),
    Constructor(ConstructorDecl),
    Type(TypeDecl),
}

impl Member {
    pub fn as_type(&self) -> Option<&TypeDecl> {
        match self {
            Member::Type(decl) => Some(decl),
            _ => None,
        }
    }
}

impl From<PropertyDecl> for Member {
    fn from(value: PropertyDecl) -> Self {
        Member::Property(value)
    }
}

impl From<MethodDecl> for Member {
    fn from(value: MethodDecl) -> Self {
        Member::Method(value)
    }
}

impl From<IndexerDecl> for Member {
    fn from(value: IndexerDecl) -> Self {
        Member::Indexer(value)
    }
}

impl From<FieldDecl> for Member {
    fn from(value: FieldDecl) -> Self {
        Member::Field(value)
    }
}

impl From<ConstructorDecl> for Member {
    fn from(value: ConstructorDecl) -> Self {
        Member::Constructor(value)
    }
}

impl From<TypeDecl> for Member {
    fn from(value: TypeDecl) -> Self {
        Member::Type(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub leading_comments: Vec<String>,
    pub accessibility: Accessibility,
    pub modifiers: EnumSet<Modifier>,
    pub kind: TypeKind,
    /// Name including any generic parameter list.
    pub name: String,
    pub bases: Vec<String>,
    pub constraints: Vec<String>,
    pub members: Vec<Member>,
}

impl TypeDecl {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        TypeDecl {
            leading_comments: Vec::new(),
            accessibility: Accessibility::Public,
            modifiers: EnumSet::empty(),
            kind,
            name: name.into(),
            bases: Vec::new(),
            constraints: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        TypeDecl::new(TypeKind::Interface, name)
    }

    pub fn class(name: impl Into<String>) -> Self {
        TypeDecl::new(TypeKind::Class, name)
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn with_modifiers(mut self, modifiers: impl Into<EnumSet<Modifier>>) -> Self {
        self.modifiers |= modifiers.into();
        self
    }

    pub fn set_new(&mut self, is_new: bool) {
        if is_new {
            self.modifiers.insert(Modifier::New);
        }
    }

    pub fn add_base(&mut self, base: impl Into<String>) {
        let base = base.into();
        if !base.is_empty() && !self.bases.contains(&base) {
            self.bases.push(base);
        }
    }

    pub fn insert_base(&mut self, index: usize, base: impl Into<String>) {
        let base = base.into();
        self.bases.retain(|existing| existing != &base);
        let index = index.min(self.bases.len());
        self.bases.insert(index, base);
    }

    pub fn add_constraint(&mut self, clause: impl Into<String>) {
        let clause = clause.into();
        if !self.constraints.contains(&clause) {
            self.constraints.push(clause);
        }
    }

    pub fn add_member(&mut self, member: impl Into<Member>) {
        let member = member.into();
        if !self.members.contains(&member) {
            self.members.push(member);
        }
    }

    pub fn extend_members<M: Into<Member>>(&mut self, members: impl IntoIterator<Item = M>) {
        for member in members {
            self.add_member(member);
        }
    }

    /// First nested type declared with `name`, ignoring generic parameters.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.members
            .iter()
            .filter_map(Member::as_type)
            .find(|decl| decl.name.split('<').next() == Some(name))
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Property(prop) => Some(prop),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn render(&self, indent: usize) -> Result<String, LinkGenError> {
        let mut emitter = Emitter::new(indent);
        emitter.type_decl(self)?;
        Ok(emitter.finish())
    }
}

impl Display for TypeDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut emitter = Emitter::new(4);
        emitter.type_decl(self).map_err(|_| fmt::Error)?;
        f.write_str(emitter.finish().trim_end())
    }
}

/// Writes a declaration tree as indented text.
pub struct Emitter {
    out: String,
    depth: usize,
    unit: String,
}

impl Emitter {
    pub fn new(indent: usize) -> Self {
        Emitter {
            out: String::new(),
            depth: 0,
            unit: " ".repeat(indent),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn line(&mut self, text: &str) -> Result<(), LinkGenError> {
        if text.is_empty() {
            writeln!(self.out)?;
            return Ok(());
        }
        for _ in 0..self.depth {
            self.out.push_str(&self.unit);
        }
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    fn indented<F>(&mut self, body: F) -> Result<(), LinkGenError>
    where
        F: FnOnce(&mut Self) -> Result<(), LinkGenError>,
    {
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    pub fn type_decl(&mut self, decl: &TypeDecl) -> Result<(), LinkGenError> {
        for comment in &decl.leading_comments {
            self.line(&format!("// {comment}"))?;
        }

        let header = format!(
            "{}{} {}",
            prefix(decl.accessibility, decl.modifiers),
            decl.kind.keyword(),
            decl.name
        );

        if decl.bases.is_empty() {
            self.line(&header)?;
        } else {
            self.line(&format!("{header} :"))?;
            let last = decl.bases.len() - 1;
            self.indented(|e| {
                for (i, base) in decl.bases.iter().enumerate() {
                    let sep = if i == last { "" } else { "," };
                    e.line(&format!("{base}{sep}"))?;
                }
                Ok(())
            })?;
        }

        if !decl.constraints.is_empty() {
            self.indented(|e| {
                for clause in &decl.constraints {
                    e.line(clause)?;
                }
                Ok(())
            })?;
        }

        self.line("{")?;
        self.indented(|e| {
            let mut previous: Option<&Member> = None;
            for member in &decl.members {
                let spaced = matches!(member, Member::Type(_))
                    || matches!(previous, Some(Member::Type(_)) | Some(Member::Constructor(_)))
                    || matches!(member, Member::Constructor(_));
                if previous.is_some() && spaced {
                    e.line("")?;
                }
                e.member(member)?;
                previous = Some(member);
            }
            Ok(())
        })?;
        self.line("}")?;
        Ok(())
    }

    fn member(&mut self, member: &Member) -> Result<(), LinkGenError> {
        match member {
            Member::Comment(text) => self.line(&format!("// {text}")),
            Member::Property(prop) => {
                let head = format!(
                    "{}{} {}",
                    prefix(prop.accessibility, prop.modifiers),
                    prop.type_name,
                    member_name(&prop.explicit_interface, &prop.name)
                );
                match &prop.body {
                    PropertyBody::Get => self.line(&format!("{head} {{ get; }}")),
                    PropertyBody::Expression(expr) => self.line(&format!("{head} => {expr};")),
                }
            }
            Member::Indexer(indexer) => {
                let params = join_parameters(&indexer.parameters);
                self.line(&format!(
                    "{}{} {}[{params}] => {};",
                    prefix(indexer.accessibility, indexer.modifiers),
                    indexer.type_name,
                    member_name(&indexer.explicit_interface, "this"),
                    indexer.expression
                ))
            }
            Member::Field(field) => {
                let head = format!(
                    "{}{} {}",
                    prefix(field.accessibility, field.modifiers),
                    field.type_name,
                    field.name
                );
                match &field.initializer {
                    Some(init) => self.line(&format!("{head} = {init};")),
                    None => self.line(&format!("{head};")),
                }
            }
            Member::Method(method) => self.method(method),
            Member::Constructor(ctor) => self.constructor(ctor),
            Member::Type(decl) => self.type_decl(decl),
        }
    }

    fn method(&mut self, method: &MethodDecl) -> Result<(), LinkGenError> {
        let head = format!(
            "{}{} {}",
            prefix(method.accessibility, method.modifiers),
            method.return_type,
            member_name(&method.explicit_interface, &method.name)
        );

        let signature_end = if method.parameters.len() > 2 {
            self.line(&format!("{head}("))?;
            self.parameter_lines(&method.parameters)?;
            ")".to_string()
        } else {
            format!("{head}({})", join_parameters(&method.parameters))
        };

        match &method.body {
            Body::Declaration => self.line(&format!("{signature_end};")),
            Body::Expression(expr) => self.line(&format!("{signature_end} => {expr};")),
            Body::Block(lines) => {
                self.line(&signature_end)?;
                self.line("{")?;
                self.indented(|e| {
                    for line in lines {
                        e.line(line)?;
                    }
                    Ok(())
                })?;
                self.line("}")
            }
        }
    }

    fn constructor(&mut self, ctor: &ConstructorDecl) -> Result<(), LinkGenError> {
        let head = format!("{}{}", prefix(ctor.accessibility, EnumSet::empty()), ctor.name);
        let chain = match &ctor.base_arguments {
            Some(args) => format!(" : base({})", args.join(", ")),
            None => String::new(),
        };

        if ctor.parameters.is_empty() {
            self.line(&format!("{head}(){chain}"))?;
        } else {
            self.line(&format!("{head}("))?;
            self.parameter_lines(&ctor.parameters)?;
            self.line(&format!("){chain}"))?;
        }

        self.line("{")?;
        self.indented(|e| {
            for line in &ctor.body {
                e.line(line)?;
            }
            Ok(())
        })?;
        self.line("}")
    }

    fn parameter_lines(&mut self, parameters: &[Parameter]) -> Result<(), LinkGenError> {
        let last = parameters.len().saturating_sub(1);
        self.indented(|e| {
            for (i, param) in parameters.iter().enumerate() {
                let sep = if i == last { "" } else { "," };
                e.line(&format!("{param}{sep}"))?;
            }
            Ok(())
        })
    }
}

fn join_parameters(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Converts a member name into a parameter name: `ActorProvider` -> `actorProvider`,
/// `IDValue` -> `idValue`, `_Client` -> `client`, `ID` -> `id`.
pub fn to_parameter_name(name: &str) -> String {
    let name = name.strip_prefix('_').unwrap_or(name);
    if name.is_empty() {
        return String::new();
    }

    let chars = name.chars().collect::<Vec<_>>();
    let mut upper_run = chars.iter().take_while(|c| !c.is_lowercase()).count();

    if upper_run == chars.len() {
        return name.to_lowercase();
    }

    if upper_run > 1 {
        upper_run -= 1;
    }

    let head = chars[..upper_run].iter().collect::<String>().to_lowercase();
    let tail = chars[upper_run..].iter().collect::<String>();
    format!("{head}{tail}")
}
