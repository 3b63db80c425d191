use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::config::ScanConfig;
use crate::index_storage::NameOverrides;
use crate::indexer::Scanner;
use crate::indexer::tree::is_root;
use crate::models::{ConversationMetadata, ConversationNode};
use crate::utils::environment::CLAUDE_CONFIG_DIR_ENV;
use crate::utils::terminal::sanitize_line;

#[derive(Parser)]
#[command(name = "conversation-scanner")]
#[command(version = "0.1.0")]
#[command(about = "Index Claude Code conversation logs into a conversation tree", long_about = None)]
pub struct Cli {
    /// Claude config directory containing `projects/` [default: ~/.claude]
    #[arg(long, global = true, env = CLAUDE_CONFIG_DIR_ENV)]
    pub claude_dir: Option<PathBuf>,

    /// Cache file [default: platform cache directory]
    #[arg(long, global = true)]
    pub cache_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan conversation logs and update the cache
    Scan {
        /// Re-read every log and re-resolve every parent
        #[arg(long)]
        full: bool,
    },
    /// Print cached conversations as a tree, newest first
    Tree {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the chain from the root conversation down to ID
    Lineage { id: String },
    /// Show statistics about the cache
    Stats,
    /// Give a conversation a custom display name
    Rename { id: String, name: String },
}

pub fn run() -> Result<()> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<()> {
    let Some(command) = &cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };

    let config = ScanConfig::resolve(cli.claude_dir.clone(), cli.cache_file.clone())?;

    match command {
        Commands::Scan { full } => scan(config, *full),
        Commands::Tree { json } => show_tree(config, *json),
        Commands::Lineage { id } => show_lineage(config, id),
        Commands::Stats => show_stats(config),
        Commands::Rename { id, name } => rename(config, id, name),
    }
}

fn scan(config: ScanConfig, full: bool) -> Result<()> {
    let scanner = Scanner::from_config(config);

    let persist_error = if full {
        let outcome = scanner.scan_full()?;
        println!(
            "Full scan: {} conversations in {} ms",
            outcome.report.total_count, outcome.report.elapsed_ms
        );
        report_failures(outcome.report.failed_count);
        outcome.persist_error
    } else {
        let outcome = scanner.scan_incremental()?;
        println!(
            "Incremental scan: {} conversations ({} updated, {} deleted)",
            outcome.report.total_count, outcome.report.updated_count, outcome.report.deleted_count
        );
        report_failures(outcome.report.failed_count);
        outcome.persist_error
    };

    if let Some(e) = persist_error {
        eprintln!("Warning: scan results could not be saved: {:#}", e);
    }

    Ok(())
}

fn report_failures(failed: usize) {
    if failed > 0 {
        eprintln!("Warning: {} log file(s) could not be read", failed);
    }
}

fn show_tree(config: ScanConfig, json: bool) -> Result<()> {
    let forest = Scanner::from_config(config).tree();

    if json {
        let output = serde_json::to_string_pretty(&forest).context("Failed to serialize tree")?;
        println!("{}", output);
        return Ok(());
    }

    if forest.is_empty() {
        println!("No conversations cached. Run `conversation-scanner scan` first.");
        return Ok(());
    }

    // Pre-order walk; children are pushed reversed so they print newest first
    let mut stack: Vec<(&ConversationNode, usize)> = forest.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        println!("{}{}", "  ".repeat(depth), format_entry(&node.conversation));
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }

    Ok(())
}

fn show_lineage(config: ScanConfig, id: &str) -> Result<()> {
    let chain = Scanner::from_config(config).lineage(id);

    if chain.is_empty() {
        println!("No cached conversation with id {}", sanitize_line(id));
        return Ok(());
    }

    for (depth, meta) in chain.iter().enumerate() {
        let marker = if depth == 0 { "" } else { "└─ " };
        println!("{}{}{}", "   ".repeat(depth.saturating_sub(1)), marker, format_entry(meta));
    }

    Ok(())
}

fn show_stats(config: ScanConfig) -> Result<()> {
    let cache_path = config.cache_file.clone();
    let claude_dir = config.claude_dir.clone();
    let cache = Scanner::from_config(config).cache();
    let conversations = &cache.conversations;

    let roots = conversations.values().filter(|meta| is_root(meta, conversations)).count();
    let continuations = conversations.values().filter(|meta| meta.is_continuation_summary).count();
    let sidechains = conversations.values().filter(|meta| meta.is_sidechain).count();
    let named = conversations.values().filter(|meta| meta.custom_name.is_some()).count();
    let total_bytes: u64 = conversations.values().map(|meta| meta.file_size_bytes).sum();

    println!("Conversation Cache Statistics");
    println!("=============================");
    println!("Total conversations: {}", conversations.len());
    println!("  Roots: {}", roots);
    println!("  Continuations: {}", conversations.len() - roots);
    println!("  Continuation summaries: {}", continuations);
    println!("  Sidechains: {}", sidechains);
    println!("  Custom names: {}", named);
    println!("Total log size: {} bytes", total_bytes);
    println!();
    println!("Claude directory: {}", claude_dir.display());
    println!("Cache file: {}", cache_path.display());

    match cache.last_scan_timestamp {
        Some(ts) => println!("Last scan: {}", ts.format("%Y-%m-%d %H:%M:%S")),
        None => println!("Last scan: never"),
    }

    if let Some(newest) = conversations.values().max_by_key(|meta| meta.created_at) {
        println!("Newest conversation: {}", newest.created_at.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

fn rename(config: ScanConfig, id: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Display name must not be empty");
    }

    NameOverrides::update(&config.names_file, &config.lock_file, config.lock_timeout, id, name)?;

    let scanner = Scanner::from_config(config);
    let outcome = scanner.scan_incremental()?;
    if let Some(e) = outcome.persist_error {
        eprintln!("Warning: scan results could not be saved: {:#}", e);
    }

    if scanner.cache().conversations.contains_key(id) {
        println!("Renamed {} to \"{}\"", sanitize_line(id), sanitize_line(name.trim()));
    } else {
        println!(
            "Saved name \"{}\" for {}; no such conversation is cached yet",
            sanitize_line(name.trim()),
            sanitize_line(id)
        );
    }

    Ok(())
}

fn format_entry(meta: &ConversationMetadata) -> String {
    format!(
        "{}  [{}]  {}  {}",
        sanitize_line(meta.display_title()),
        meta.id,
        meta.created_at.format("%Y-%m-%d %H:%M"),
        sanitize_line(&meta.source_directory)
    )
}
