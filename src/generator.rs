//! One generation pass from a [`Manifest`] to source files.
//!
//! [`LinkGenerator`] builds the [`LinkGraph`], visits it, builds every actor and wraps each
//! declaration in its namespace. A separate alias source declares `{Friendly}Link` and
//! `{Friendly}LinkType` shorthands for every target.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    config::{current_config, OutputConfig},
    error::LinkGenError,
    graph::{BuildOptions, LinkGraph},
    manifest::Manifest,
    symbols::{simple_name, Compilation, TypeKind},
    syntax::TypeDecl,
    target::{friendly_name, Assembly, LinkTarget},
};

const SUPPRESSED_WARNINGS: &str = "CS0108, CS0109";
pub const ALIAS_SOURCE_NAME: &str = "LinkAliases";

/// A generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSource {
    /// File name without the `.g.cs` suffix.
    pub hint_name: String,
    pub text: String,
}

impl GeneratedSource {
    pub fn file_name(&self) -> String {
        format!("{}.g.cs", self.hint_name)
    }
}

pub struct LinkGenerator {
    graph: LinkGraph,
    output: OutputConfig,
}

impl LinkGenerator {
    pub fn new(manifest: &Manifest, output: OutputConfig) -> Self {
        let graph = LinkGraph::new(
            manifest.compilation(),
            manifest.schematic.clone(),
            manifest.targets.iter().cloned(),
        );
        LinkGenerator { graph, output }
    }

    /// Builds a generator with the output settings of the installed config provider.
    pub fn with_current_config(manifest: &Manifest) -> Result<Self, LinkGenError> {
        Ok(LinkGenerator::new(manifest, current_config()?.output))
    }

    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    /// Visits the graph. Called by [`LinkGenerator::generate`]; exposed for inspection.
    pub fn visit(&mut self) -> Result<(), LinkGenError> {
        if !self.graph.is_visited() {
            self.graph.visit()?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(actors = self.graph.actors().len()))]
    pub fn generate(&mut self) -> Result<Vec<GeneratedSource>, LinkGenError> {
        self.visit()?;
        let built = self.graph.build(BuildOptions {
            tree_view: self.output.emit_tree_view,
        })?;

        let mut sources = Vec::with_capacity(built.len() + 1);
        for (actor, decl) in built {
            let namespace = self.namespace_of(&actor);
            sources.push(GeneratedSource {
                hint_name: actor,
                text: self.wrap(&namespace, &decl)?,
            });
        }

        let targets = self
            .graph
            .actors()
            .values()
            .map(|id| self.graph.arena().get(*id).target.as_ref())
            .collect::<Vec<_>>();
        if !targets.is_empty() {
            sources.push(GeneratedSource {
                hint_name: ALIAS_SOURCE_NAME.to_string(),
                text: alias_source(self.graph.compilation(), targets),
            });
        }

        info!(sources = sources.len(), "generation complete");
        Ok(sources)
    }

    /// Tree view of every actor, for `inspect`.
    pub fn tree_view(&mut self) -> Result<Vec<String>, LinkGenError> {
        self.visit()?;
        let arena = self.graph.arena();
        Ok(self
            .graph
            .actors()
            .values()
            .flat_map(|id| arena.tree_view(*id))
            .collect())
    }

    /// The namespace of the actor's outermost containing type.
    fn namespace_of(&self, actor: &str) -> String {
        let compilation = self.graph.compilation();
        let mut seen = BTreeSet::new();
        let mut outermost = actor.to_string();
        while let Some(container) = compilation
            .get_type_by_metadata_name(&outermost)
            .and_then(|s| s.containing_type.clone())
        {
            if !seen.insert(container.clone()) {
                break;
            }
            outermost = container;
        }

        let unbound = outermost.split('<').next().unwrap_or(&outermost);
        match unbound.rsplit_once('.') {
            Some((namespace, _)) if !namespace.is_empty() => namespace.to_string(),
            _ => {
                warn!(actor, "actor has no namespace, using the default");
                self.output.default_namespace.clone()
            }
        }
    }

    fn wrap(&self, namespace: &str, decl: &TypeDecl) -> Result<String, LinkGenError> {
        let mut text = String::new();
        if self.output.emit_pragmas {
            text.push_str(&format!("#pragma warning disable {SUPPRESSED_WARNINGS}\n"));
        }
        text.push_str(&format!("namespace {namespace};\n\n"));
        text.push_str(&decl.render(self.output.indent)?);
        if self.output.emit_pragmas {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&format!("#pragma warning restore {SUPPRESSED_WARNINGS}\n"));
        }
        Ok(text)
    }
}

/// `{Assembly}{Friendly}` for non-core targets, so Core and Rest aliases never collide.
fn alias_prefix(compilation: &Compilation, target: &LinkTarget) -> String {
    let kind = compilation
        .get_type_by_metadata_name(&target.actor)
        .map(|s| s.kind)
        .unwrap_or(if target.is_core() {
            TypeKind::Interface
        } else {
            TypeKind::Class
        });
    let friendly = friendly_name(&target.actor, kind);
    match target.assembly {
        Assembly::Core => friendly,
        other => format!("{other}{friendly}"),
    }
}

pub fn alias_source<'a>(compilation: &Compilation, targets: impl IntoIterator<Item = &'a LinkTarget>) -> String {
    let mut seen = BTreeSet::new();
    let mut text = String::new();
    for target in targets {
        let prefix = alias_prefix(compilation, target);
        if !seen.insert(prefix.clone()) {
            warn!(actor = %simple_name(&target.actor), alias = %prefix, "duplicate link alias skipped");
            continue;
        }
        text.push_str(&format!("global using {prefix}Link = {};\n", target.link()));
        text.push_str(&format!("global using {prefix}LinkType = {};\n", target.link_type()));
    }
    text
}
