//! Batch driver for the PDF workflow workspace
//!
//! Loads files, replays an edit script against the workspace and exports
//! every remaining document to a directory.

pub mod script;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use workflow_core::{
    view, ConfirmGate, ExportOutcome, Notice, SaveTarget, SourceFile, WorkflowConfig,
    WorkflowError, Workspace,
};

/// Everything a run needs, usually filled from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub inputs: Vec<PathBuf>,
    pub script: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub assume_yes: bool,
    /// Overrides the configured history limit; `0` means unbounded
    pub history_limit: Option<usize>,
    pub summary: bool,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub loaded: usize,
    pub failed: Vec<String>,
    pub notices: Vec<Notice>,
    pub exported: Vec<PathBuf>,
}

/// Writes exports into a fixed directory under their suggested names
pub struct FsSaveTarget {
    out_dir: PathBuf,
}

impl FsSaveTarget {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

impl SaveTarget for FsSaveTarget {
    fn prompt_save_location(&mut self, suggested: &str) -> Result<Option<PathBuf>, WorkflowError> {
        Ok(Some(self.out_dir.join(suggested)))
    }

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<(), WorkflowError> {
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Confirms on a `y`/`yes` answer from `input`, or always with `assume_yes`
pub struct PromptConfirm<R> {
    input: R,
    assume_yes: bool,
}

impl<R: BufRead> PromptConfirm<R> {
    pub fn new(input: R, assume_yes: bool) -> Self {
        Self { input, assume_yes }
    }
}

impl<R: BufRead> ConfirmGate for PromptConfirm<R> {
    fn confirm(&mut self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!("{}: {} [y/N] ", title, message);
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

pub fn run(options: &RunOptions) -> Result<RunSummary> {
    let stdin = std::io::stdin();
    let mut gate = PromptConfirm::new(stdin.lock(), options.assume_yes);
    run_with(options, &mut gate)
}

/// Same as [`run`] with an explicit confirmation source
pub fn run_with(options: &RunOptions, gate: &mut dyn ConfirmGate) -> Result<RunSummary> {
    let mut config = WorkflowConfig::from_env();
    if let Some(limit) = options.history_limit {
        config = config.with_history_limit(if limit == 0 { None } else { Some(limit) });
    }
    let mut ws = Workspace::new(config);
    let mut summary = RunSummary::default();

    let files = options
        .inputs
        .iter()
        .map(|path| read_source(path))
        .collect::<Result<Vec<_>>>()?;

    let report = ws.ingest(files, None);
    for (name, error) in &report.failed {
        warn!("Skipping {}: {}", name, error);
        summary.failed.push(name.clone());
    }
    if report.added.is_empty() {
        bail!("None of the input files could be loaded");
    }
    summary.loaded = report.added.len();
    info!("Loaded {} document(s)", summary.loaded);

    if let Some(script_path) = &options.script {
        let json = std::fs::read_to_string(script_path)
            .with_context(|| format!("Failed to read {}", script_path.display()))?;
        let steps = script::parse(&json)?;

        for (n, step) in steps.iter().enumerate() {
            let commands = step
                .resolve(&ws)
                .with_context(|| format!("Step {} ({:?})", n + 1, step))?;
            for command in commands {
                let notice = ws
                    .dispatch(command, gate)
                    .with_context(|| format!("Step {} failed", n + 1))?;
                info!("Step {}: {}", n + 1, notice.message);
                summary.notices.push(notice);
            }
        }
    }

    std::fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("Failed to create {}", options.out_dir.display()))?;
    let mut target = FsSaveTarget::new(&options.out_dir);

    for (doc_id, outcome) in ws.export_all(&mut target)? {
        match outcome {
            Ok(ExportOutcome::Saved { path, .. }) => summary.exported.push(path),
            Ok(ExportOutcome::Canceled) => {}
            Err(e) => warn!("Export of {} failed: {}", doc_id, e),
        }
    }

    if options.summary {
        let state = serde_json::to_string_pretty(&view::render(&ws))?;
        println!("{}", state);
    }

    Ok(summary)
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_confirm_reads_answer() {
        let mut yes = PromptConfirm::new(Cursor::new("yes\n"), false);
        assert!(yes.confirm("Delete", "Delete a.pdf?"));

        let mut no = PromptConfirm::new(Cursor::new("n\n"), false);
        assert!(!no.confirm("Delete", "Delete a.pdf?"));

        let mut empty = PromptConfirm::new(Cursor::new(""), false);
        assert!(!empty.confirm("Delete", "Delete a.pdf?"));
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        let mut gate = PromptConfirm::new(Cursor::new("n\n"), true);
        assert!(gate.confirm("Delete", "Delete a.pdf?"));
    }

    #[test]
    fn test_fs_save_target_joins_out_dir() {
        let mut target = FsSaveTarget::new("exports");
        let path = target.prompt_save_location("a.pdf").unwrap();
        assert_eq!(path, Some(PathBuf::from("exports/a.pdf")));
    }
}
