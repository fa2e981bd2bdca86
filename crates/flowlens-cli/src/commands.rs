//! CLI command implementations.

use crate::config::{Config, CONFIG_DIR, CONFIG_FILE};
use crate::{OutputFormat, ViewArgs};
use colored::Colorize;
use flowlens_core::MetadataDocument;
use flowlens_graph::{details_html, LineageGraph, NeighborhoodView, ViewOptions};
use flowlens_server::{
    run_cycle, source_for, watch_document, FlowlensServer, ServerConfig, SessionController,
    WatchConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write as _;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{error, warn};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Initialize Flowlens in a directory.
pub fn init(path: &Path) -> Result<()> {
    let config_dir = path.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    fs::create_dir_all(&config_dir)?;
    fs::write(&config_path, serde_json::to_string_pretty(&Config::default())?)?;

    println!("{} Initialized Flowlens in {}", "✓".green(), path.display());
    println!("  Run {} to explore your pipeline", "flowlens view".cyan());

    Ok(())
}

/// Print document statistics.
pub async fn info(document: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let location = document.unwrap_or(config.document);
    let doc = fetch_document(&location).await?;
    let graph = LineageGraph::from_document(&doc);
    let stats = graph.stats();

    println!("{}", "Flowlens Info".cyan().bold());
    println!();
    println!("  {} {}", "Document:".dimmed(), location);
    println!("  {} {}", "Files:".dimmed(), stats.node_count);
    println!("  {} {}", "Edges:".dimmed(), stats.edge_count);

    let steps = files_per_step(&doc, &graph);
    println!();
    println!("{} ({})", "Steps".bold(), steps.len());
    for (step, count) in &steps {
        println!("  • {} {}", step, format!("{} files", count).dimmed());
    }

    let terminal = doc.terminal_outputs();
    println!();
    println!("{} ({})", "Terminal outputs".bold(), terminal.len());
    for file in &terminal {
        println!("  • {} {}", file.name, format!("[{}]", file.uuid).dimmed());
    }

    let direct = doc.direct_inputs();
    println!();
    println!("{} ({})", "Direct inputs".bold(), direct.len());
    for file in &direct {
        println!("  • {} {}", file.name, format!("[{}]", file.uuid).dimmed());
    }

    let dangling = doc.dangling_references();
    if !dangling.is_empty() {
        println!();
        println!(
            "{} {} input references point at missing files:",
            "⚠".yellow(),
            dangling.len()
        );
        for (file, missing) in dangling.iter().take(10) {
            println!("  {} -> {}", file, missing.red());
        }
        if dangling.len() > 10 {
            println!("  ... and {} more", dangling.len() - 10);
        }
    }

    Ok(())
}

/// Print the neighborhood of a file.
pub async fn view(args: ViewArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let options = view_options(&args, &config);
    let location = args.document.unwrap_or(config.document);

    let graph = LineageGraph::from(fetch_document(&location).await?);
    let selected = selected_id(&graph, args.node)?;
    let view = graph.build_view(&selected, &options);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Dot => print!("{}", view.to_dot()),
        OutputFormat::Text => {
            if !view.found {
                warn!("No file found with id {}", selected);
            }
            print!("{}", render_text(&view));
        }
    }

    Ok(())
}

/// Show the details of a file.
pub async fn details(id: &str, document: Option<String>, html: bool, json: bool) -> Result<()> {
    let config = Config::load()?;
    let location = document.unwrap_or(config.document);
    let graph = LineageGraph::from(fetch_document(&location).await?);
    let details = graph.details(id);

    if html {
        print!("{}", details_html(details.as_ref(), id));
        return Ok(());
    }

    match details {
        Some(details) if json => println!("{}", serde_json::to_string_pretty(&details)?),
        Some(details) => print!("{}", details),
        None => return Err(format!("No file found with id {}", id).into()),
    }

    Ok(())
}

/// List every file needed to produce `id`.
pub async fn lineage(id: &str, document: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let location = document.unwrap_or(config.document);
    let doc = fetch_document(&location).await?;

    let target = doc
        .get(id)
        .ok_or_else(|| format!("No file found with id {}", id))?;
    let needed = doc.files_needed_to_generate(id);

    println!("{} {}", "Lineage of".bold(), target.name.cyan());
    if needed.is_empty() {
        println!("  No inputs: this file is a source");
        return Ok(());
    }

    println!("{} files needed:\n", needed.len());
    for file in needed {
        let step = file.step_name().unwrap_or(flowlens_core::NOT_AVAILABLE);
        println!(
            "  • {} {} {}",
            file.name,
            format!("({})", step).yellow(),
            format!("[{}]", file.uuid).dimmed()
        );
    }

    Ok(())
}

/// Export a view and its details to JSON.
pub async fn export(args: ViewArgs, output: &Path) -> Result<()> {
    let config = Config::load()?;
    let options = view_options(&args, &config);
    let location = args.document.unwrap_or(config.document);

    let graph = LineageGraph::from(fetch_document(&location).await?);
    let selected = selected_id(&graph, args.node)?;
    let cycle = run_cycle(&graph, &selected, &options);

    let export = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "document": location,
        "stats": graph.stats(),
        "view": cycle.view,
        "details": cycle.details,
        "details_html": cycle.details_html,
    });

    fs::write(output, serde_json::to_string_pretty(&export)?)?;
    println!("{} Exported to {}", "✓".green(), output.display());

    Ok(())
}

/// Start the session server.
pub async fn serve(
    document: Option<String>,
    port: Option<u16>,
    headless: bool,
    watch: bool,
) -> Result<()> {
    let config = Config::load()?;
    let location = document.unwrap_or(config.document.clone());
    let port = port.unwrap_or(config.port);

    if headless {
        println!("{}", "Starting Flowlens server in headless mode...".cyan());
    } else {
        println!("{}", "Starting Flowlens server...".cyan());
    }

    let mut options = ViewOptions::new(config.depth);
    if let Some(step) = config.exclude_step {
        options = options.excluding(step);
    }
    let session = SessionController::new(source_for(&location), options);

    let spinner = spinner(&format!("Loading {}...", location))?;
    let loaded = session.load().await;
    spinner.finish_and_clear();
    let output = loaded?;

    println!(
        "{} Loaded {} (selected {}, {} files in view)",
        "✓".green(),
        location,
        output.view.selected.cyan(),
        output.view.nodes.len()
    );

    let ip = if headless { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
    let addr = SocketAddr::from((ip, port));
    let server = FlowlensServer::new(session, ServerConfig { addr });

    if watch {
        let shared = server.session();
        match shared.source().local_path().map(Path::to_path_buf) {
            Some(path) => {
                let session = server.session();
                tokio::spawn(async move {
                    if let Err(e) = watch_document(WatchConfig::new(path), session).await {
                        error!("File watcher error: {}", e);
                    }
                });
                println!("{} Watching {} for changes", "✓".green(), location);
            }
            None => warn!("--watch only applies to local files, ignoring for {}", location),
        }
    }

    println!("{} Listening on ws://{}", "✓".green(), addr);
    if headless {
        println!("  Headless mode: accepting connections from any host");
    }
    println!("  Press {} to stop", "Ctrl+C".cyan());

    server.run().await.map_err(|e| e.to_string())?;

    Ok(())
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.to_string());
    Ok(spinner)
}

async fn fetch_document(location: &str) -> Result<MetadataDocument> {
    let spinner = spinner(&format!("Fetching {}...", location))?;
    let result = source_for(location).fetch().await;
    spinner.finish_and_clear();
    Ok(result?)
}

/// Flags first, then config.
fn view_options(args: &ViewArgs, config: &Config) -> ViewOptions {
    let options = ViewOptions::new(args.depth.unwrap_or(config.depth));
    match args.exclude_step.as_ref().or(config.exclude_step.as_ref()) {
        Some(step) => options.excluding(step.clone()),
        None => options,
    }
}

/// Distinct step names with the number of files each produced.
fn files_per_step<'a>(doc: &'a MetadataDocument, graph: &LineageGraph) -> Vec<(&'a str, usize)> {
    doc.step_names()
        .into_iter()
        .map(|step| (step, graph.find_by_step(step).len()))
        .collect()
}

fn selected_id(graph: &LineageGraph, node: Option<String>) -> Result<String> {
    match node {
        Some(id) => Ok(id),
        None => graph
            .first()
            .map(|f| f.uuid.clone())
            .ok_or_else(|| "document contains no files".into()),
    }
}

/// Formats a view as text, one block per level.
fn render_text(view: &NeighborhoodView) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "{} {} (depth {}",
        "Neighborhood of".bold(),
        view.selected.cyan(),
        view.depth
    );
    if let Some(step) = &view.exclude_step {
        let _ = write!(out, ", excluding step {}", step.yellow());
    }
    out.push_str(")\n");

    if view.is_empty() {
        out.push_str("  No files in view\n");
        return out;
    }

    for (level, nodes) in view.by_level() {
        let heading = match level {
            0 => "Selected".to_string(),
            l if l < 0 => format!("Inputs, level {}", l),
            l => format!("Consumers, level +{}", l),
        };
        let _ = writeln!(out, "\n{}", heading.bold());

        for node in nodes {
            let step = node.step_name.as_deref().unwrap_or(flowlens_core::NOT_AVAILABLE);
            let name = if node.selected {
                node.name.green().bold().to_string()
            } else {
                node.name.clone()
            };
            let _ = writeln!(
                out,
                "  • {} ({}) {} {}",
                name,
                node.file_type,
                step.yellow(),
                format!("[{}]", node.id).dimmed()
            );
        }
    }

    let _ = writeln!(out, "\n{} edges", view.edges.len());
    out
}
