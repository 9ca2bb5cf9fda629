//! JSON Diagram CLI - inspect document diagrams from the terminal
//!
//! Builds the same node/edge model as the viewer, without a window.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use serde::Serialize;
use std::path::{Path, PathBuf};

use json_diagram::diagram::graph::{DiagramEdge, DiagramNode, NodeKind};
use json_diagram::diagram::metrics::EstimatedMetrics;
use json_diagram::diagram::navigation::NoopObserver;
use json_diagram::diagram::{convert, Action, DocumentFormat};
use json_diagram::{DiagramConfig, Session};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "+ ");
static ARROW: Emoji<'_, '_> = Emoji("→ ", "-> ");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "? ");

#[derive(Parser)]
#[command(name = "json-diagram-cli")]
#[command(version)]
#[command(about = "Inspect JSON and XML documents as node-link diagrams")]
#[command(long_about = r#"
Builds the diagram model of a JSON or XML document and reports on it.

Examples:
  json-diagram-cli build data.json           # Node/edge summary
  json-diagram-cli build data.xml --json     # Full model as JSON
  json-diagram-cli search data.json alice    # Matching paths in document order
  json-diagram-cli convert data.json --to xml
  json-diagram-cli paths data.json           # Every leaf path
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the diagram and summarize it
    Build {
        file: PathBuf,

        /// Input format (default: from the file extension)
        #[arg(short, long)]
        format: Option<DocumentFormat>,

        /// Print every node and edge as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search leaf text (case-insensitive)
    Search {
        file: PathBuf,
        query: String,

        #[arg(short, long)]
        format: Option<DocumentFormat>,
    },

    /// Convert between JSON and XML
    Convert {
        file: PathBuf,

        /// Target format
        #[arg(short, long)]
        to: DocumentFormat,

        #[arg(short, long)]
        format: Option<DocumentFormat>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the path of every leaf
    Paths {
        file: PathBuf,

        #[arg(short, long)]
        format: Option<DocumentFormat>,
    },
}

#[derive(Serialize)]
struct Model<'a> {
    nodes: &'a [DiagramNode],
    edges: &'a [DiagramEdge],
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DiagramConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DiagramConfig::load(),
    };

    match cli.command {
        Commands::Build { file, format, json } => cmd_build(&config, &file, format, json),
        Commands::Search { file, query, format } => cmd_search(&config, &file, format, &query),
        Commands::Convert {
            file,
            to,
            format,
            output,
        } => cmd_convert(&config, &file, format, to, output.as_deref()),
        Commands::Paths { file, format } => cmd_paths(&config, &file, format),
    }
}

fn detect_format(config: &DiagramConfig, file: &Path, format: Option<DocumentFormat>) -> DocumentFormat {
    format
        .or_else(|| {
            file.extension()
                .and_then(|e| e.to_str())
                .and_then(DocumentFormat::from_extension)
        })
        .unwrap_or(config.default_format)
}

fn read(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn open_session(config: &DiagramConfig, file: &Path, format: Option<DocumentFormat>) -> Result<Session> {
    let format = detect_format(config, file, format);
    let text = read(file)?;

    let mut session = Session::new(
        config.clone(),
        Box::new(EstimatedMetrics::default()),
        Box::new(NoopObserver),
    );
    session
        .load(text, format)
        .with_context(|| format!("{} is not a valid {} document", file.display(), format))?;
    Ok(session)
}

fn cmd_build(config: &DiagramConfig, file: &Path, format: Option<DocumentFormat>, json: bool) -> Result<()> {
    let session = open_session(config, file, format)?;
    let graph = session.graph();

    if json {
        let model = Model {
            nodes: graph.nodes(),
            edges: graph.edges(),
        };
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    let count = |kind: NodeKind| graph.nodes().iter().filter(|n| n.kind == kind).count();
    println!("{}{}", CHECK, style(file.display()).bold());
    println!("  Format:      {}", session.format());
    println!("  Nodes:       {}", graph.len());
    println!("  Edges:       {}", graph.edges().len());
    println!("  Containers:  {}", count(NodeKind::Container));
    println!("  Leaves:      {}", count(NodeKind::Leaf));
    println!(
        "  Extent:      {:.0} x {:.0}",
        session.layout().bounds.width(),
        session.layout().bounds.height()
    );
    Ok(())
}

fn cmd_search(config: &DiagramConfig, file: &Path, format: Option<DocumentFormat>, query: &str) -> Result<()> {
    let mut session = open_session(config, file, format)?;
    session.apply(Action::Search(query.to_string()))?;

    let matches = session.search_state().matches.clone();
    if matches.is_empty() {
        println!("{}No matches for {}", SEARCH, style(query).yellow());
        return Ok(());
    }

    println!("{}{} matches for {}", SEARCH, matches.len(), style(query).yellow());
    for (i, id) in matches.iter().enumerate() {
        let details = session.details(id)?;
        println!("{:>4}. {}", i + 1, style(&details.path).cyan());
        for line in details.text.lines() {
            println!("        {}", line);
        }
    }
    Ok(())
}

fn cmd_convert(
    config: &DiagramConfig,
    file: &Path,
    format: Option<DocumentFormat>,
    to: DocumentFormat,
    output: Option<&Path>,
) -> Result<()> {
    let from = detect_format(config, file, format);
    let text = read(file)?;
    let converted = convert(&text, from, to).with_context(|| format!("Cannot convert {} to {}", from, to))?;

    match output {
        Some(path) => {
            std::fs::write(path, converted).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}{} {}{}", CHECK, file.display(), ARROW, path.display());
        }
        None => print!("{}", converted),
    }
    Ok(())
}

fn cmd_paths(config: &DiagramConfig, file: &Path, format: Option<DocumentFormat>) -> Result<()> {
    let session = open_session(config, file, format)?;
    for node in session.graph().nodes().iter().filter(|n| n.is_leaf()) {
        println!("{}", node.path);
    }
    Ok(())
}
