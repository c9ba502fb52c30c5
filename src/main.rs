//! hunkcommit - CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hunkcommit::claude::check_claude_installed;
use hunkcommit::codex::check_codex_installed;
use hunkcommit::config::{FileConfig, Overrides, Settings, config_path};
use hunkcommit::diff::{ChunkLevel, HunkSplitter};
use hunkcommit::dispatch::{Analyzer, ParallelDispatcher, run_commit_phase};
use hunkcommit::llm::{LlmRouter, Provider, ProviderSelection};
use hunkcommit::pipeline::{CommitPipeline, RunSummary};
use hunkcommit::report::{ConsoleReporter, Reporter};
use hunkcommit::status::{
    ChangeStatus, FileChangeSet, TerminalPrompt, collect, open_repository, repo_root,
    triage_untracked,
};
use hunkcommit::vcs::{GitCli, Vcs};

/// Environment variable holding the log filter.
const LOG_ENV_VAR: &str = "HUNKCOMMIT_LOG";

/// Split uncommitted changes into small, grouped commits with AI-written messages.
#[derive(Parser, Debug)]
#[command(name = "hunkcommit")]
#[command(about = "Split uncommitted changes into small, grouped commits with AI-written messages")]
#[command(version)]
struct Cli {
    /// Chunking granularity: 0=file, 1=hunk, 2=logical units, 3=atomic
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(0..=3))]
    chunk_level: Option<u8>,

    /// Analysis workers (0 = twice the CPU count)
    #[arg(short = 'p', long)]
    parallel: Option<usize>,

    /// Primary LLM provider (claude or codex); the other one is the fallback
    #[arg(long)]
    provider: Option<Provider>,

    /// Push after committing
    #[arg(long)]
    push: bool,

    /// Remote to push to
    #[arg(long)]
    remote: Option<String>,

    /// Branch to push (defaults to the current branch)
    #[arg(long)]
    branch: Option<String>,

    /// Add untracked files without asking
    #[arg(long)]
    auto_track: bool,

    /// Show the commit plan without committing
    #[arg(long)]
    dry_run: bool,

    /// Process at most N files (adds untracked files without asking)
    #[arg(long, value_name = "N")]
    max_files: Option<usize>,

    /// Write each applied patch to DIR
    #[arg(long, value_name = "DIR")]
    dump_patches: Option<PathBuf>,

    /// Config file (defaults to .hunkcommit.toml in the repository root)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn overrides(&self) -> Result<Overrides> {
        let chunk_level = self
            .chunk_level
            .map(ChunkLevel::try_from)
            .transpose()
            .map_err(anyhow::Error::msg)?;

        Ok(Overrides {
            chunk_level,
            parallel: self.parallel,
            provider: self.provider,
            remote: self.remote.clone(),
            branch: self.branch.clone(),
            auto_track: self.auto_track || self.max_files.is_some(),
        })
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "hunkcommit=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    // Step 1: Open git repository and load settings
    let repo = open_repository(Path::new("."))
        .context("Not a git repository. Run hunkcommit from within a git repository.")?;
    let root = repo_root(&repo)?;

    let path = config_path(&root, cli.config.as_deref());
    let file_config = FileConfig::load(&path, cli.config.is_some())
        .context("Failed to load configuration")?;
    let settings = Settings::resolve(file_config, cli.overrides()?)
        .context("Invalid configuration")?;

    let reporter = Arc::new(ConsoleReporter::new(cli.debug));

    // Step 2: Check prerequisites
    let selection = select_provider(settings.provider, reporter.as_ref()).await?;

    // Step 3: Collect changes
    let changes = collect(&repo).context("Failed to read working tree status")?;
    drop(repo);
    if changes.is_empty() {
        println!("No changes to commit.");
        return Ok(ExitCode::SUCCESS);
    }

    // Every collected path is unstaged before committing, including the ones
    // triage or --max-files leave out of the run.
    let reset_paths: Vec<String> = changes
        .iter()
        .filter(|c| c.status != ChangeStatus::Unmerged)
        .flat_map(FileChangeSet::index_paths)
        .collect();

    let mut changes = triage_untracked(changes, &root, settings.auto_track, &mut TerminalPrompt)
        .context("Failed to triage untracked files")?;
    if let Some(max) = cli.max_files {
        changes.truncate(max);
    }
    if changes.is_empty() {
        println!("No files selected. Nothing to commit.");
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "Analyzing {} files at chunk level {} with {}...",
        changes.len(),
        settings.chunk_level,
        selection.primary
    );

    // Step 4: Analyze every file in parallel
    let splitter = HunkSplitter::new(settings.chunk_level).with_options(settings.split);
    let analyzer = Analyzer::new(splitter, Arc::new(LlmRouter::new(selection)));
    let drafts = ParallelDispatcher::new(analyzer, settings.parallel)
        .run_analysis(&changes)
        .await;

    reporter.plan(&drafts);
    if cli.dry_run {
        println!("Dry run - nothing committed.");
        return Ok(ExitCode::SUCCESS);
    }

    // Step 5: Commit, one group at a time
    let pipeline = CommitPipeline::new(GitCli::new(&root), reporter.clone())
        .with_dump_dir(cli.dump_patches.clone())
        .with_reset_paths(reset_paths);
    let (pipeline, drafts) = run_commit_phase(pipeline, drafts)
        .await
        .context("Commit phase panicked")?;

    let summary = RunSummary::from_drafts(&drafts);
    reporter.summary(&summary);

    // Step 6: Optional push
    if cli.push {
        if summary.committed == 0 {
            println!("Nothing committed, skipping push.");
        } else {
            push(pipeline.into_vcs(), &settings, reporter.as_ref());
        }
    }

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn provider_available(provider: Provider) -> bool {
    match provider {
        Provider::Claude => check_claude_installed().await.is_ok(),
        Provider::Codex => check_codex_installed().await.is_ok(),
    }
}

/// Use `preferred` when its CLI is installed, otherwise the other provider.
async fn select_provider(preferred: Provider, reporter: &dyn Reporter) -> Result<ProviderSelection> {
    if provider_available(preferred).await {
        return Ok(ProviderSelection::from_primary(preferred));
    }

    let other = preferred.other();
    if provider_available(other).await {
        reporter.warn(&format!("{preferred} CLI not found, using {other}"));
        return Ok(ProviderSelection::from_primary(other));
    }

    bail!(
        "Neither Claude Code nor Codex CLI is installed. Install one with:\n  npm install -g @anthropic-ai/claude-code\n  npm install -g @openai/codex"
    )
}

fn push(mut vcs: GitCli, settings: &Settings, reporter: &dyn Reporter) {
    let branch = match settings.branch.clone() {
        Some(branch) => branch,
        None => match vcs.current_branch() {
            Ok(branch) => branch,
            Err(e) => {
                reporter.warn(&format!("Could not determine branch to push: {e}"));
                return;
            }
        },
    };

    println!("Pushing to {}/{branch}...", settings.remote);
    match vcs.push(&settings.remote, &branch) {
        Ok(()) => println!("✓ Pushed to {}/{branch}", settings.remote),
        Err(e) => reporter.warn(&format!("Push failed: {e}")),
    }
}
