//! # linkgen-core
//!
//! A link-graph generator. Given a snapshot of actor, entity and model types and a link schematic,
//! it synthesizes the nested declarations ("Links", "Relationships", "Hierarchies", "BackLinks",
//! "Extensions") that describe how Discord API entities can be navigated from one another.
//!
//! ## Overview
//!
//! Every [`target::LinkTarget`] (an actor/entity/id/model tuple bound to an assembly) becomes an
//! actor tree of link nodes. The trees share one arena and are processed in two stages:
//!
//! - **Visit**: actors in supertype order, each tree top-down. Every node derives an immutable
//!   [`graph::VisitState`]: its ancestors, its semantic composition, and its kind-specific
//!   implementation surface.
//! - **Build**: each actor tree turns its visited state into a [`syntax::TypeDecl`] tree. Actors
//!   are built in parallel.
//!
//! ### Key Features
//!
//! - **Semantic composition**: a powerset search over a node's ancestor groups finds the nodes it
//!   must derive from (`Enumerable.Indexable` composes `Indexable` and `Enumerable`)
//! - **Compatibility matrix**: link types only nest where the schematic allows it
//! - **Structured emission**: declarations are data until [`syntax::Emitter`] renders them
//! - **Error tolerance**: lookup misses degrade locally with a `tracing` warning; only schema
//!   violations abort a pass
//!
//! ## Architecture
//!
//! - **[`symbols`]**: the type snapshot (`Compilation`, `TypeSymbol`, attributes)
//! - **[`target`]**: link targets and the interface signatures they satisfy
//! - **[`schematic`]**: link-type shapes and how they nest
//! - **[`nodes`]**: the node arena, path formatting, composition search and per-kind visit/build
//! - **[`graph`]**: `LinkGraph`, `NodeContext` and the two-stage pass
//! - **[`syntax`]**: the declaration model and renderer
//! - **[`manifest`]** / **[`generator`]**: input files and source output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use linkgen_core::{config::OutputConfig, generator::LinkGenerator, manifest::Manifest};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manifest = Manifest::from_file(Path::new("links.toml"))?;
//!     let mut generator = LinkGenerator::new(&manifest, OutputConfig::default());
//!     for source in generator.generate()? {
//!         println!("// {}\n{}", source.file_name(), source.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Building a graph directly
//!
//! ```rust
//! use linkgen_core::{
//!     graph::{BuildOptions, LinkGraph},
//!     schematic::Schematic,
//!     symbols::{Compilation, TypeKind, TypeSymbol},
//!     target::{Assembly, LinkTarget},
//! };
//!
//! let target = LinkTarget::new(
//!     "Discord.IGuildActor",
//!     "Discord.IGuild",
//!     "ulong",
//!     "Discord.Models.IGuildModel",
//!     Assembly::Core,
//! );
//! let compilation = Compilation::new([TypeSymbol::new("Discord.IGuildActor", TypeKind::Interface)]);
//! let mut graph = LinkGraph::new(compilation, Schematic::standard(), [target]);
//! graph.visit()?;
//!
//! let decl = graph
//!     .build_actor("Discord.IGuildActor", BuildOptions::default())?
//!     .expect("core actors always produce a declaration");
//! assert!(decl.to_string().contains("interface Link"));
//! # Ok::<(), linkgen_core::error::LinkGenError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`bin`**: the `linkgen` command line tool (`generate`, `inspect`)

pub mod config;
pub mod error;
pub mod generator;
pub mod graph;
pub mod manifest;
pub mod nodes;
pub mod schematic;
pub mod symbols;
pub mod syntax;
pub mod target;

pub use error::*;
