// crates/loomcli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use loomcore::{ExecutionEvent, FlowDefinition, NodeDefinition, Value};
use loomruntime::{ExecuteOptions, FlowEngine, NodeRegistry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "Loom Flow Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a flow definition file
    Run {
        /// Path to flow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input data as JSON string
        #[arg(short, long)]
        input: Option<String>,

        /// Session id to resume or pin
        #[arg(short, long)]
        session: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a flow definition file
    Validate {
        /// Path to flow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example flow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "flow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            session,
            verbose,
        } => {
            // Initialize logging
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::INFO)
                    .init();
            }

            run_flow(file, input, session).await?;
        }

        Commands::Validate { file } => {
            validate_flow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_flow(output)?;
        }
    }

    Ok(())
}

fn engine_with_standard_nodes() -> FlowEngine {
    let mut registry = NodeRegistry::new();
    loomnodes::register_all(&mut registry);
    FlowEngine::new(Arc::new(registry))
}

fn parse_inputs(input: Option<String>) -> Result<HashMap<String, Value>> {
    let Some(input_str) = input else {
        return Ok(HashMap::new());
    };

    let json: serde_json::Value = serde_json::from_str(&input_str)?;
    if let serde_json::Value::Object(obj) = json {
        Ok(obj
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(v)))
            .collect())
    } else {
        Err(anyhow::anyhow!("Input must be a JSON object"))
    }
}

async fn run_flow(file: PathBuf, input: Option<String>, session: Option<String>) -> Result<()> {
    println!("🚀 Loading flow from: {}", file.display());

    let flow_json = std::fs::read_to_string(&file)?;
    let definition: FlowDefinition = serde_json::from_str(&flow_json)?;

    println!("📋 Flow:");
    println!("   Nodes: {}", definition.nodes.len());
    println!("   Edges: {}", definition.edges.len());
    println!();

    let inputs = parse_inputs(input)?;
    let engine = engine_with_standard_nodes();

    // Subscribe to events for real-time output
    let mut events = engine.event_bus().subscribe();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::FlowStarted { session_id, .. } => {
                    println!("▶️  Flow started (session {})", session_id);
                }
                ExecutionEvent::NodeStarted {
                    node_id, node_type, ..
                } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeCompleted {
                    node_id,
                    duration_ms,
                    ..
                } => {
                    println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
                    loomcore::NodeEvent::Info { message } => {
                        println!("     ℹ️  [{}] {}", node_id, message);
                    }
                    loomcore::NodeEvent::Warning { message } => {
                        println!("     ⚠️  [{}] {}", node_id, message);
                    }
                    loomcore::NodeEvent::Progress { percent, message } => {
                        if let Some(msg) = message {
                            println!("     📊 [{}] {}% - {}", node_id, percent, msg);
                        } else {
                            println!("     📊 [{}] {}%", node_id, percent);
                        }
                    }
                    _ => {}
                },
                ExecutionEvent::FlowCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Flow completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Flow failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let compiled = engine.build(&definition)?;
    let report = engine
        .execute(
            &compiled,
            ExecuteOptions {
                inputs,
                session_id: session,
                ..ExecuteOptions::default()
            },
        )
        .await;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📊 Execution Summary:");
    println!("   Session: {}", report.session_id);
    println!("   Success: {}", report.success);
    println!("   Executed: {} nodes", report.executed_nodes.len());

    if let Some(result) = &report.result {
        println!();
        println!("📤 Result:");
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    }

    if let Some(error) = &report.error {
        println!();
        println!(
            "❗ Error ({}): {}",
            report.error_type.as_deref().unwrap_or("unknown"),
            error
        );
    }

    Ok(())
}

fn validate_flow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating flow: {}", file.display());

    let flow_json = std::fs::read_to_string(&file)?;
    let definition: FlowDefinition = serde_json::from_str(&flow_json)?;

    let engine = engine_with_standard_nodes();
    let report = engine.validate(&definition);

    if report.valid {
        println!("✅ Flow is valid:");
    } else {
        println!("❌ Flow is invalid:");
    }
    println!("   Nodes: {}", report.node_count);
    println!("   Edges: {}", report.edge_count);

    for error in &report.errors {
        println!("   error: {}", error);
    }
    for warning in &report.warnings {
        println!("   warning: {}", warning);
    }

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let engine = engine_with_standard_nodes();
    let registry = engine.registry();

    for node_type in registry.list_node_types() {
        let role = engine.classifier().classify(&node_type).role;
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  • {} ({}, {:?})", node_type, metadata.category, role);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", node_type);
        }
    }
}

fn create_example_flow(output: PathBuf) -> Result<()> {
    let mut flow = FlowDefinition::new();

    let input_id = flow.add_node(
        NodeDefinition::new("greeting_input", "input.text").with_data("text", "world"),
    );
    let template_id = flow.add_node(
        NodeDefinition::new("greeting_template", "text.template")
            .with_data("template", "Hello, {input}!"),
    );
    let output_id = flow.add_node(NodeDefinition::new("result", "output.collect"));

    flow.connect(input_id, "text", template_id.clone(), "input");
    flow.connect(template_id, "text", output_id, "input");

    let json = serde_json::to_string_pretty(&flow)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example flow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  loom run --file {} --input '{{\"text\": \"loom\"}}'",
        output.display()
    );

    Ok(())
}
