//! Resources CLI
//!
//! Normalizes payload files and validates store/dataset definitions.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use familiar_resources::normalize::Diagnostics;
use familiar_resources::{
    normalize_with_diagnostics, DatasetDefinition, ResourcesConfig, StoreDefinition,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resources")]
#[command(about = "Normalize resource payloads and validate store/dataset definitions")]
struct Cli {
    /// Config file to load on top of the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a JSON payload into a {type, partial, data} envelope
    Normalize {
        /// Payload file, or "-" for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Validate a store definition file
    ValidateStore { file: PathBuf },

    /// Validate a dataset definition file
    ValidateDataset { file: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ResourcesConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Normalize { input } => {
            let payload = read_json(&input)?;
            let mut diagnostics = Diagnostics::new();
            let envelope = normalize_with_diagnostics(&payload, None, &mut diagnostics)?;

            println!("{}", serde_json::to_string_pretty(&envelope)?);

            if config.normalizer.collect_warnings && !diagnostics.is_empty() {
                eprint!("{}", diagnostics);
            }
        }

        Commands::ValidateStore { file } => {
            let definition = StoreDefinition::from_value(&read_json(&file)?)?;
            match definition.type_name {
                Some(type_name) => println!("✅ Valid store definition `{}`", type_name),
                None => println!("✅ Valid anonymous store definition"),
            }
        }

        Commands::ValidateDataset { file } => {
            let definition = DatasetDefinition::from_value(&read_json(&file)?)?;
            match definition.partial {
                Some(partial) => println!("✅ Valid dataset definition (partial `{}`)", partial),
                None => println!("✅ Valid dataset definition"),
            }
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };

    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
