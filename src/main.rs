mod codebase;
mod config;
mod generation;
mod git;
mod pipeline;
mod pr;
mod snapshot;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::git::CommitResult;
use crate::pipeline::{Pipeline, PipelineError, RunOutcome};

/// PR Doc Agent: CI bot that reviews a GitHub Pull Request with Gemini,
/// posts the review as a comment, and regenerates architecture docs on the
/// PR branch.
#[derive(Parser, Debug)]
#[command(name = "pr-doc-agent", version, about)]
struct Cli {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// GitHub token with pull-request and contents write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Repository in owner/repo form
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Pull request number
    #[arg(long, env = "PR_NUMBER")]
    pr_number: Option<String>,

    /// PR head branch that receives the documentation commit
    #[arg(long, env = "GITHUB_HEAD_REF")]
    branch: Option<String>,

    /// Repository checkout to document and commit into
    #[arg(long, default_value = ".")]
    repo_root: PathBuf,

    /// Settings file (defaults to .doc-agent.toml in the repository root)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(outcome) => {
            print_summary(&outcome);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run failed");
            eprintln!("{} {}", "✖ pr-doc-agent failed:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunOutcome, PipelineError> {
    info!("loading configuration");
    let ctx = pr::PullRequestContext::load(config::ContextValues {
        ai_credential: cli.gemini_api_key,
        hosting_token: cli.github_token,
        repository: cli.repository,
        pr_number: cli.pr_number,
        branch: cli.branch,
    })?;
    let settings = config::Settings::load(cli.config.as_deref(), &cli.repo_root)?;
    debug!(?ctx, ?settings, "configuration loaded");

    let hosting = pr::GitHubClient::new(&settings.github)?;
    let generator = generation::GeminiClient::new(&settings.generation, &ctx.ai_credential)?;
    let git = git::GitCli::new(&cli.repo_root);

    let pipeline = Pipeline {
        settings: &settings,
        hosting: &hosting,
        generator: &generator,
        git: &git,
        repo_root: cli.repo_root.clone(),
    };
    let outcome = pipeline.run(&ctx).await?;
    info!(?outcome, "done");
    Ok(outcome)
}

fn print_summary(outcome: &RunOutcome) {
    let line = match outcome {
        RunOutcome::NoChanges => "⚠ No changes detected in PR diff.".yellow().bold(),
        RunOutcome::Published(CommitResult::NoOpNothingToCommit) => {
            "✔ AI report posted; documentation already up to date.".green().bold()
        }
        RunOutcome::Published(result) => format!("✔ AI report posted; {result}.").as_str().green().bold(),
    };
    println!("{line}");
}
