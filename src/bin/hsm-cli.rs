//! HSM CLI - inspect and run authored state-machine assets
//!
//! Provides subcommands for printing an asset's controller tree, ticking an
//! instance of it from the command line, and writing a default config.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use hsm::runtime::catalog::BehaviorCatalog;
use hsm::runtime::value::ParameterValue;
use hsm::runtime::{ControllerId, EngineConfig, Graph, Instance, TickOutcome};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hsm")]
#[command(about = "Hierarchical state-machine asset tool", long_about = None)]
struct Cli {
    /// Engine configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the controller tree of an asset
    Inspect {
        /// Asset file (JSON)
        asset: PathBuf,
    },

    /// Instantiate an asset and tick it
    Run {
        /// Asset file (JSON)
        asset: PathBuf,

        /// Number of ticks to run
        #[arg(short, long, default_value = "10")]
        ticks: usize,

        /// Parameter assignment applied before the first tick (name=value)
        #[arg(long = "set")]
        assignments: Vec<String>,
    },

    /// Write a default engine configuration
    InitConfig {
        /// Output path
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => EngineConfig::default(),
    };

    let level = if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Inspect { asset } => {
            let graph = load_graph(&asset)?;
            print_controller(&graph, graph.root());
        }

        Commands::Run {
            asset,
            ticks,
            assignments,
        } => {
            let graph = load_graph(&asset)?;
            let mut instance = Instance::new(&graph, &config)?;
            for assignment in &assignments {
                apply_assignment(&mut instance, assignment)?;
            }

            if !instance.start() {
                bail!("Asset has no root Entry state");
            }
            println!("start: {}", current_name(&instance));
            for tick in 1..=ticks {
                match instance.update_current_state() {
                    TickOutcome::Changed { source, .. } => {
                        println!("tick {tick}: -> {} ({source:?})", current_name(&instance));
                    }
                    TickOutcome::Locked => println!("tick {tick}: locked"),
                    TickOutcome::Stayed | TickOutcome::Idle => {}
                }
            }
            println!("final: {}", current_name(&instance));
        }

        Commands::InitConfig { path } => {
            EngineConfig::default().save(&path)?;
            println!("Wrote default config to {:?}", path);
        }
    }

    Ok(())
}

fn load_graph(path: &Path) -> anyhow::Result<Graph> {
    let registry = BehaviorCatalog::global().snapshot();
    Graph::load(path, &registry).with_context(|| format!("Failed to load asset {:?}", path))
}

fn current_name(instance: &Instance) -> &str {
    instance
        .current_state()
        .map(|s| s.name.as_str())
        .unwrap_or("<none>")
}

fn apply_assignment(instance: &mut Instance, assignment: &str) -> anyhow::Result<()> {
    let (name, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected name=value, got '{assignment}'"))?;
    let current = instance
        .get_parameter(name)
        .ok_or_else(|| anyhow!("Unknown parameter '{name}'"))?;
    let value = match current {
        ParameterValue::Float(_) => ParameterValue::Float(raw.parse()?),
        ParameterValue::Int(_) => ParameterValue::Int(raw.parse()?),
        ParameterValue::Bool(_) => ParameterValue::Bool(raw.parse()?),
    };
    instance.set_parameter(name, value);
    Ok(())
}

fn print_controller(graph: &Graph, id: ControllerId) {
    let Some(controller) = graph.controller(id) else {
        return;
    };
    let indent = "  ".repeat(controller.depth as usize);
    println!("{indent}{} [{}]", controller.name, graph.path(id));
    for state in graph.states_of(id) {
        println!("{indent}  - {} ({:?}) {}", state.name, state.role, state.id);
        for transition in &state.transitions {
            let target = graph
                .state(transition.target)
                .map(|s| s.name.as_str())
                .unwrap_or("<dangling>");
            let outward = if transition.outward { " outward" } else { "" };
            println!(
                "{indent}      -> {target}{outward} ({} conditions)",
                transition.conditions.len()
            );
        }
    }
    for child in &controller.children {
        print_controller(graph, *child);
    }
}
