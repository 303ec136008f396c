//! DiskPulse — incremental disk usage analyser.
//!
//! Thin binary entry point. Drives a `diskpulse-core` session headlessly:
//! analyse a directory, optionally expand some subdirectories, wait for the
//! background sizes to settle and print the tree level plus the breakdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use diskpulse_core::analysis::BreakdownConfig;
use diskpulse_core::expansion::ExpandRequest;
use diskpulse_core::model::size::{format_count, format_optional_size, format_size, percent_of};
use diskpulse_core::model::NodeRef;
use diskpulse_core::{FsBackend, Session, SessionConfig, SessionPhase};

#[derive(Parser, Debug)]
#[command(name = "diskpulse")]
#[command(about = "Show where the space under a directory goes")]
#[command(version)]
struct Args {
    /// Directory to analyse (only the first one is used)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Also expand these directories (absolute, or relative to the root)
    #[arg(short = 'e', long = "expand", value_name = "DIR")]
    expand: Vec<PathBuf>,

    /// Print the tree and breakdown as JSON
    #[arg(long)]
    json: bool,

    /// Fraction of the total below which items fold into "Other"
    #[arg(long, value_name = "FRACTION", default_value_t = BreakdownConfig::default().threshold_fraction)]
    threshold: f64,

    /// Maximum number of named breakdown slices ("Other" not counted)
    #[arg(long = "max-slices", value_name = "N", default_value_t = BreakdownConfig::default().max_slices)]
    max_slices: usize,

    /// Seconds to wait for sizes to settle
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    timeout: u64,

    /// Open the analysed directory in the file manager when done
    #[arg(long)]
    reveal: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so JSON on stdout stays clean.
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("DiskPulse starting");

    let config = SessionConfig {
        breakdown: BreakdownConfig {
            threshold_fraction: args.threshold,
            max_slices: args.max_slices,
        },
        ..SessionConfig::default()
    };
    config.validate().context("invalid options")?;

    let backend = FsBackend::new().context("cannot start scanner")?;
    let mut session = Session::new(Arc::new(backend), config);
    let timeout = Duration::from_secs(args.timeout);

    if !session.ingest_paths(&args.paths) {
        bail!("no usable path given");
    }
    settle(&mut session, timeout);
    if session.phase() == SessionPhase::Failed {
        bail!(
            "analysis failed: {}",
            session.last_error().unwrap_or("unknown error")
        );
    }

    let root_path = PathBuf::from(session.root_path().unwrap_or_default());
    for dir in &args.expand {
        let target = root_path.join(dir);
        let target = target.to_string_lossy();
        match session.expand(&target) {
            ExpandRequest::NotFound => tracing::warn!("{target} is not in the tree"),
            ExpandRequest::NotADirectory => tracing::warn!("{target} is not a directory"),
            _ => settle(&mut session, timeout),
        }
    }
    for (path, message) in session.expansion_errors() {
        tracing::warn!("Could not expand {path}: {message}");
    }

    if args.json {
        let out = serde_json::json!({
            "root": session.root(),
            "breakdown": session.breakdown(),
            "expanded": session.expanded_paths(),
            "settled": !session.is_busy(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_report(&session);
    }

    if args.reveal {
        if let Some(path) = session.root_path() {
            session.reveal(path);
        }
    }
    Ok(())
}

fn settle(session: &mut Session, timeout: Duration) {
    if !session.wait_until_settled(timeout) {
        tracing::warn!(
            "Gave up waiting after {}s; some sizes are still being computed",
            timeout.as_secs()
        );
    }
}

fn print_report(session: &Session) {
    let Some(root) = session.root() else {
        return;
    };
    let total = root.size.unwrap_or(0);
    println!(
        "{}  {}  ({} files)",
        root.path,
        format_optional_size(root.size),
        format_count(root.file_count)
    );
    print_children(session, root, total, 1);

    let slices = session.breakdown();
    if slices.is_empty() {
        return;
    }
    let slice_total: u64 = slices.iter().map(|s| s.value).sum();
    println!();
    println!("Breakdown");
    for slice in slices {
        let label = if slice.is_other() {
            format!("{} ({} items)", slice.label, slice.item_count)
        } else {
            slice.label.clone()
        };
        println!(
            "  {:>6.1}%  {:>10}  {label}",
            percent_of(slice.value, slice_total),
            format_size(slice.value)
        );
    }
}

/// Print loaded children, descending into directories that are expanded.
fn print_children(session: &Session, node: &NodeRef, total: u64, depth: usize) {
    let indent = "  ".repeat(depth);
    for child in node.children() {
        let marker = if child.is_dir() { "/" } else { "" };
        let share = match child.size {
            Some(size) if total > 0 => format!("{:>5.1}%", percent_of(size, total)),
            _ => "    -".to_string(),
        };
        println!(
            "{indent}{share}  {:>10}  {}{marker}",
            format_optional_size(child.size),
            child.name
        );
        if child.is_dir() && child.is_expanded() && session.is_expanded(&child.path) {
            print_children(session, child, total, depth + 1);
        }
    }
}
