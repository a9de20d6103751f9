//! End-to-end run for one pull request.
//!
//! Stages run strictly in order and the first error ends the run. Nothing
//! already done is rolled back: a failed push still leaves the posted comment
//! and the written snapshots behind.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

use crate::codebase::{self, CollectError, FileFilter};
use crate::config::{ConfigError, Settings};
use crate::generation::{self, AiReport, GenerationError, GenerationService};
use crate::git::{self, CommitResult, GitError, GitRunner};
use crate::pr::{self, DiffFetch, HostingApi, PrError, PullRequestContext};
use crate::snapshot::{self, SnapshotError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("GitHub: {0}")]
    Hosting(#[from] PrError),

    #[error("AI generation: {0}")]
    Generation(#[from] GenerationError),

    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("codebase collection: {0}")]
    Collect(#[from] CollectError),

    #[error("git: {0}")]
    Git(#[from] GitError),

    #[error("git push to {branch} failed: {detail}")]
    GitPush { branch: String, detail: String },
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The PR diff was empty; nothing was generated
    NoChanges,
    /// Docs were generated; carries `Created` or `NoOpNothingToCommit`
    Published(CommitResult),
}

/// External collaborators plus the settings for one run.
pub struct Pipeline<'a> {
    pub settings: &'a Settings,
    pub hosting: &'a dyn HostingApi,
    pub generator: &'a dyn GenerationService,
    pub git: &'a dyn GitRunner,
    /// Working tree to collect, write docs into, and commit
    pub repo_root: PathBuf,
}

impl Pipeline<'_> {
    fn docs_dir(&self) -> PathBuf {
        self.repo_root.join(&self.settings.docs.dir)
    }

    pub async fn run(&self, ctx: &PullRequestContext) -> Result<RunOutcome, PipelineError> {
        let span = info_span!("pipeline", repo = %ctx.repository, pr = ctx.pr_number);
        self.run_stages(ctx).instrument(span).await
    }

    async fn run_stages(&self, ctx: &PullRequestContext) -> Result<RunOutcome, PipelineError> {
        info!("fetching PR diff");
        let diff = match pr::fetch_diff(self.hosting, ctx, self.settings.limits.max_diff_chars).await? {
            DiffFetch::NoChanges => return Ok(RunOutcome::NoChanges),
            DiffFetch::Changes(payload) => payload,
        };

        info!(truncated = diff.truncated, "generating PR analysis");
        let pr_report = generation::analyze_pr(self.generator, &diff).await?;
        log_report(&pr_report);

        pr::publish_comment(self.hosting, ctx, &pr_report).await?;

        let docs_dir = self.docs_dir();
        snapshot::write(&snapshot::pr_snapshot(&docs_dir, ctx.pr_number, &pr_report))?;

        info!("collecting codebase");
        let filter = FileFilter::from_settings(self.settings);
        let bundle = codebase::collect(
            &self.repo_root,
            &filter,
            self.settings.limits.max_bundle_chars,
        )?;
        if bundle.files.is_empty() {
            warn!("no source files matched the collector filter");
        }

        info!(files = bundle.files.len(), "generating architecture document");
        let arch_report = generation::analyze_architecture(self.generator, &bundle).await?;
        log_report(&arch_report);
        snapshot::write(&snapshot::architecture_doc(&docs_dir, &arch_report))?;

        info!("publishing documentation");
        let docs_arg = git_pathspec(Path::new(&self.settings.docs.dir));
        match git::publish(self.git, &self.settings.git, &ctx.branch, &docs_arg).await? {
            CommitResult::PushFailed(detail) => Err(PipelineError::GitPush {
                branch: ctx.branch.clone(),
                detail,
            }),
            result => Ok(RunOutcome::Published(result)),
        }
    }
}

fn log_report(report: &AiReport) {
    info!(
        kind = %report.kind,
        prompt_chars = report.prompt_text.chars().count(),
        result_chars = report.result_text.chars().count(),
        "report ready"
    );
}

fn git_pathspec(docs_dir: &Path) -> String {
    docs_dir
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::tests::FakeGenerator;
    use crate::generation::EMPTY_RESPONSE_SENTINEL;
    use crate::git::tests::{failure, nothing_to_commit, FakeGit};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;

    struct FakeHosting {
        diff: Result<String, (u16, String)>,
        comment_status: u16,
        fetches: Mutex<usize>,
        comments: Mutex<Vec<String>>,
    }

    impl FakeHosting {
        fn with_diff(diff: &str) -> Self {
            Self {
                diff: Ok(diff.to_string()),
                comment_status: 201,
                fetches: Mutex::new(0),
                comments: Mutex::new(Vec::new()),
            }
        }

        fn comments(&self) -> Vec<String> {
            self.comments.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HostingApi for FakeHosting {
        async fn fetch_diff(&self, _ctx: &PullRequestContext) -> Result<String, PrError> {
            *self.fetches.lock().unwrap() += 1;
            match &self.diff {
                Ok(diff) => Ok(diff.clone()),
                Err((status, body)) => Err(PrError::UpstreamFetch {
                    status: *status,
                    body: body.clone(),
                }),
            }
        }

        async fn post_comment(&self, _ctx: &PullRequestContext, body: &str) -> Result<(), PrError> {
            if self.comment_status != 201 {
                return Err(PrError::CommentPublish {
                    status: self.comment_status,
                    body: "denied".to_string(),
                });
            }
            self.comments.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    fn test_context() -> PullRequestContext {
        PullRequestContext {
            repository: "org/repo".to_string(),
            pr_number: 42,
            branch: "feature".to_string(),
            hosting_token: "ghp_token".to_string(),
            ai_credential: "key".to_string(),
        }
    }

    fn source_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/foo.rs"), "pub fn foo() {}\n").unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() { foo(); }\n").unwrap();
        dir
    }

    async fn run(
        root: &Path,
        hosting: &FakeHosting,
        generator: &FakeGenerator,
        git: &FakeGit,
    ) -> Result<RunOutcome, PipelineError> {
        let settings = Settings::default();
        let pipeline = Pipeline {
            settings: &settings,
            hosting,
            generator,
            git,
            repo_root: root.to_path_buf(),
        };
        pipeline.run(&test_context()).await
    }

    #[tokio::test]
    async fn test_end_to_end_happy_path() {
        let tree = source_tree();
        let hosting = FakeHosting::with_diff("+ added function foo()");
        let generator = FakeGenerator::new(vec![
            Ok(Some("Summary: adds foo".to_string())),
            Ok(Some("## Overview\nOne module.".to_string())),
        ]);
        let git = FakeGit::default();

        let outcome = run(tree.path(), &hosting, &generator, &git).await.unwrap();
        assert_eq!(outcome, RunOutcome::Published(CommitResult::Created));

        let snapshot = fs::read_to_string(tree.path().join("docs/pr-history/pr-42.md")).unwrap();
        assert_eq!(snapshot, "# PR #42 Technical Snapshot\n\nSummary: adds foo");

        let comments = hosting.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].starts_with("## 🤖"));
        assert!(comments[0].ends_with("Summary: adds foo"));

        let arch = fs::read_to_string(tree.path().join("docs/architecture.md")).unwrap();
        assert_eq!(arch, "# System Architecture\n\n## Overview\nOne module.");

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("+ added function foo()"));
        assert!(prompts[1].contains("### File: src/foo.rs"));
        assert!(!prompts[1].contains("Technical Snapshot"));

        let calls = git.calls.lock().unwrap();
        assert!(calls.contains(&vec!["add".to_string(), "--".to_string(), "docs".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_diff_short_circuits() {
        let tree = source_tree();
        let hosting = FakeHosting::with_diff("   \n");
        let generator = FakeGenerator::new(vec![]);
        let git = FakeGit::default();

        let outcome = run(tree.path(), &hosting, &generator, &git).await.unwrap();
        assert_eq!(outcome, RunOutcome::NoChanges);
        assert_eq!(generator.calls(), 0);
        assert!(hosting.comments().is_empty());
        assert!(git.subcommands().is_empty());
        assert!(!tree.path().join("docs").exists());
    }

    #[tokio::test]
    async fn test_upstream_fetch_error_carries_status() {
        let tree = source_tree();
        let mut hosting = FakeHosting::with_diff("");
        hosting.diff = Err((502, "Bad Gateway".to_string()));
        let generator = FakeGenerator::new(vec![]);
        let git = FakeGit::default();

        let err = run(tree.path(), &hosting, &generator, &git).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Hosting(PrError::UpstreamFetch { status: 502, .. })
        ));
        assert!(err.to_string().contains("502"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_generation_uses_sentinel_and_completes() {
        let tree = source_tree();
        let hosting = FakeHosting::with_diff("+ added function foo()");
        let generator = FakeGenerator::new(vec![Ok(None)]);
        let git = FakeGit::default();

        let outcome = run(tree.path(), &hosting, &generator, &git).await.unwrap();
        assert_eq!(outcome, RunOutcome::Published(CommitResult::Created));
        let snapshot = fs::read_to_string(tree.path().join("docs/pr-history/pr-42.md")).unwrap();
        assert!(snapshot.ends_with(EMPTY_RESPONSE_SENTINEL));
        assert!(hosting.comments()[0].ends_with(EMPTY_RESPONSE_SENTINEL));
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal() {
        let tree = source_tree();
        let hosting = FakeHosting::with_diff("+ added function foo()");
        let generator = FakeGenerator::new(vec![Err(GenerationError::Decode("bad json".to_string()))]);
        let git = FakeGit::default();

        let err = run(tree.path(), &hosting, &generator, &git).await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(hosting.comments().is_empty());
        assert!(git.subcommands().is_empty());
    }

    #[tokio::test]
    async fn test_comment_failure_is_fatal() {
        let tree = source_tree();
        let mut hosting = FakeHosting::with_diff("+ added function foo()");
        hosting.comment_status = 403;
        let generator = FakeGenerator::new(vec![]);
        let git = FakeGit::default();

        let err = run(tree.path(), &hosting, &generator, &git).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Hosting(PrError::CommentPublish { status: 403, .. })
        ));
        assert_eq!(generator.calls(), 1);
        assert!(!tree.path().join("docs/pr-history/pr-42.md").exists());
    }

    #[tokio::test]
    async fn test_nothing_to_commit_skips_push_and_succeeds() {
        let tree = source_tree();
        let hosting = FakeHosting::with_diff("+ added function foo()");
        let generator = FakeGenerator::new(vec![]);
        let git = FakeGit::default().with_reply("commit", nothing_to_commit());

        let outcome = run(tree.path(), &hosting, &generator, &git).await.unwrap();
        assert_eq!(outcome, RunOutcome::Published(CommitResult::NoOpNothingToCommit));
        assert!(!git.subcommands().contains(&"push".to_string()));
    }

    #[tokio::test]
    async fn test_push_failure_is_fatal_but_keeps_local_docs() {
        let tree = source_tree();
        let hosting = FakeHosting::with_diff("+ added function foo()");
        let generator = FakeGenerator::new(vec![]);
        let git = FakeGit::default().with_reply("push", failure("remote rejected"));

        let err = run(tree.path(), &hosting, &generator, &git).await.unwrap_err();
        match err {
            PipelineError::GitPush { branch, detail } => {
                assert_eq!(branch, "feature");
                assert_eq!(detail, "remote rejected");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(hosting.comments().len(), 1);
        assert!(tree.path().join("docs/architecture.md").exists());
    }

    #[tokio::test]
    async fn test_checkout_failure_is_fatal() {
        let tree = source_tree();
        let hosting = FakeHosting::with_diff("+ added function foo()");
        let generator = FakeGenerator::new(vec![]);
        let git = FakeGit::default().with_reply("checkout", failure("did not match any file"));

        let err = run(tree.path(), &hosting, &generator, &git).await.unwrap_err();
        assert!(matches!(err, PipelineError::Git(GitError::Checkout(_))));
    }

    #[tokio::test]
    async fn test_repeat_runs_produce_identical_architecture_doc() {
        let tree = source_tree();
        let arch_path = tree.path().join("docs/architecture.md");

        let hosting = FakeHosting::with_diff("+ added function foo()");
        let generator = FakeGenerator::new(vec![]);
        run(tree.path(), &hosting, &generator, &FakeGit::default())
            .await
            .unwrap();
        let first = fs::read(&arch_path).unwrap();

        let generator = FakeGenerator::new(vec![]);
        run(tree.path(), &hosting, &generator, &FakeGit::default())
            .await
            .unwrap();
        let second = fs::read(&arch_path).unwrap();

        assert_eq!(first, second);
        assert_eq!(*hosting.fetches.lock().unwrap(), 2);
    }

    #[test]
    fn test_git_pathspec_uses_forward_slashes() {
        assert_eq!(git_pathspec(Path::new("docs")), "docs");
        assert_eq!(git_pathspec(Path::new("site/docs")), "site/docs");
    }
}
