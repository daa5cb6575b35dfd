//! linkgen CLI tool
//!
//! Command-line interface for generating link declarations from manifests.
//!
//! ## Commands
//!
//! - `generate <path>`: Generate sources from one manifest or every manifest under a directory
//! - `inspect <path>`: Print the visited node tree of each manifest
//!
//! Sources are written as `<hint>.g.cs` under `--out`, or printed to stdout when no output
//! directory is given.

use clap::{Parser, Subcommand};
use linkgen_core::{
    config::{current_config, set_content, set_provider, GeneratorConfig, TomlConfigProvider},
    generator::LinkGenerator,
    manifest::Manifest,
};
use std::{fs::create_dir_all, path::PathBuf, sync::Arc};

#[derive(Parser)]
#[command(name = "linkgen")]
#[command(author, version, about = "A tool for generating link declarations from actor manifests", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./linkgen.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate sources from a manifest or a directory of manifests
    Generate {
        /// Path to a .toml/.json manifest or a directory containing them
        path: PathBuf,

        /// Directory to write generated files to (default: print to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Visit a manifest and print its node trees
    Inspect {
        /// Path to a .toml/.json manifest or a directory containing them
        path: PathBuf,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
    let provider = TomlConfigProvider::new(path.unwrap_or_else(|| PathBuf::from("linkgen.toml")));
    set_provider(Arc::new(provider))?;
    Ok(current_config()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate { path, out } => {
            if let Some(out) = &out {
                create_dir_all(out)?;
            }
            for (manifest_path, manifest) in Manifest::load(&path)? {
                tracing::info!("Generating {}", manifest_path.display());
                let mut generator = LinkGenerator::with_current_config(&manifest)?;
                let sources = match generator.generate() {
                    Ok(sources) => sources,
                    Err(e) if !e.is_fatal() => {
                        tracing::warn!("Skipping {}: {e}", manifest_path.display());
                        continue;
                    }
                    Err(e) => {
                        eprintln!("Error: {}: {e}", manifest_path.display());
                        std::process::exit(1);
                    }
                };

                for source in sources {
                    match &out {
                        Some(dir) => {
                            let file = dir.join(format!("{}.{}", manifest.output_name(), source.file_name()));
                            set_content(&file, &source.text)?;
                            println!("{}", file.display());
                        }
                        None => {
                            println!("// {}", source.file_name());
                            println!("{}", source.text);
                        }
                    }
                }
            }
        }
        Commands::Inspect { path } => {
            for (manifest_path, manifest) in Manifest::load(&path)? {
                println!("{}", manifest_path.display());
                let mut generator = LinkGenerator::with_current_config(&manifest)?;
                for line in generator.tree_view()? {
                    println!("  {line}");
                }
            }
        }
    }

    Ok(())
}
