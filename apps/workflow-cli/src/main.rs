//! pdf-workflow: edit, combine and export PDFs from the command line
//!
//! ```text
//! pdf-workflow a.pdf b.pdf scan.png --script steps.json --out-dir out
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pdf_workflow::{run, RunOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdf-workflow")]
#[command(version, about = "Rotate, reorder, group and combine PDF pages")]
struct Args {
    /// PDF or image files to load
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON edit script to apply before exporting
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Directory that receives the exported PDFs
    #[arg(short, long, default_value = "out")]
    out_dir: PathBuf,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Number of undo steps kept (0 = unbounded)
    #[arg(long)]
    history_limit: Option<usize>,

    /// Print the final workspace as JSON
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Log to stderr so --summary output stays clean
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let options = RunOptions {
        inputs: args.inputs,
        script: args.script,
        out_dir: args.out_dir,
        assume_yes: args.yes,
        history_limit: args.history_limit,
        summary: args.summary,
    };

    let summary = run(&options)?;
    tracing::info!(
        "Exported {} document(s) to {}",
        summary.exported.len(),
        options.out_dir.display()
    );
    for name in &summary.failed {
        tracing::warn!("Not loaded: {}", name);
    }

    Ok(())
}
